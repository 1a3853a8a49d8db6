//! Ricardian contracts: the human-readable terms a contract attaches to its
//! actions.
//!
//! A ricardian template is markdown with handlebars placeholders for the
//! action's fields, optionally topped with YAML front matter:
//!
//! ```text
//! ---
//! spec_version: "0.2.0"
//! title: Transfer Tokens
//! summary: 'Send {{nowrap quantity}} from {{nowrap from}} to {{nowrap to}}'
//! ---
//!
//! # Transfer
//! {{from}} agrees to send {{quantity}} to {{to}}.
//! ```
//!
//! Rendering fills in the placeholders from the decoded action data (plus
//! `$action` and, when there's exactly one signer, `$signer`) and turns the
//! top two heading levels into styled blocks.

use crate::error::{Error, Result};
use handlebars::{Context, Handlebars, Helper, HelperResult, Output, RenderContext, RenderError};
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;

/// Front matter from a ricardian template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RicardianMetadata {
    pub spec_version: Option<String>,
    pub title: Option<String>,
    /// The summary, with placeholders filled in
    pub summary: Option<String>,
    pub icon: Option<String>,
}

/// A rendered ricardian contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, getset::Getters)]
#[getset(get = "pub")]
pub struct RicardianContract {
    metadata: RicardianMetadata,
    html: String,
}

/// Keeps a value from breaking across lines.
fn nowrap_helper(h: &Helper, _: &Handlebars, _: &Context, _: &mut RenderContext, out: &mut dyn Output) -> HelperResult {
    let value = h.param(0)
        .map(|p| p.value())
        .ok_or_else(|| RenderError::new("nowrap needs a value"))?;
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    };
    out.write(&format!("<span class=\"nowrap\">{}</span>", handlebars::html_escape(&text)))?;
    Ok(())
}

fn registry() -> Handlebars<'static> {
    let mut reg = Handlebars::new();
    reg.register_helper("nowrap", Box::new(nowrap_helper));
    reg
}

/// Split YAML front matter (between `---` lines) from the template body.
fn split_front_matter(template: &str) -> Result<(Option<String>, String)> {
    let mut lines = template.lines().skip_while(|l| l.trim().is_empty()).peekable();
    if lines.peek().map(|l| l.trim()) != Some("---") {
        return Ok((None, template.to_string()));
    }
    lines.next();
    let mut yaml = vec![];
    let mut closed = false;
    for line in lines.by_ref() {
        if line.trim() == "---" {
            closed = true;
            break;
        }
        yaml.push(line);
    }
    if !closed {
        Err(Error::RicardianRenderFailed("unterminated front matter".into()))?;
    }
    let body = lines.collect::<Vec<_>>().join("\n");
    Ok((Some(yaml.join("\n")), body))
}

/// Turn `#` and `##` headings into styled blocks.
fn format_headings(body: &str) -> String {
    body.lines()
        .map(|line| {
            if let Some(text) = line.strip_prefix("## ") {
                format!("<div class=\"ricardian-description\">{}</div>", text.trim())
            } else if let Some(text) = line.strip_prefix("# ") {
                format!("<div class=\"ricardian-action\">{}</div>", text.trim())
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render a ricardian template for one action.
pub fn render(account: &str, action: &str, data: &Value, template: &str, signer: Option<&str>) -> Result<RicardianContract> {
    let (front_matter, body) = split_front_matter(template)?;
    let mut metadata = match front_matter {
        Some(yaml) if !yaml.trim().is_empty() => {
            serde_yaml::from_str::<RicardianMetadata>(&yaml)
                .map_err(|e| Error::RicardianRenderFailed(format!("bad front matter: {}", e)))?
        }
        _ => RicardianMetadata::default(),
    };

    let mut context = match data {
        Value::Object(obj) => obj.clone(),
        Value::Null => serde_json::Map::new(),
        other => {
            let mut obj = serde_json::Map::new();
            obj.insert("data".into(), other.clone());
            obj
        }
    };
    context.insert("$action".into(), serde_json::json!({"account": account, "name": action}));
    if let Some(signer) = signer {
        context.insert("$signer".into(), Value::from(signer));
    }

    let reg = registry();
    let rendered = reg.render_template(&body, &context)
        .map_err(|e| Error::RicardianRenderFailed(e.to_string()))?;
    if let Some(summary) = metadata.summary.take() {
        let summary = reg.render_template(&summary, &context)
            .map_err(|e| Error::RicardianRenderFailed(e.to_string()))?;
        metadata.summary = Some(summary);
    }
    Ok(RicardianContract {
        metadata,
        html: format_headings(rendered.trim()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TRANSFER: &str = r#"---
spec_version: "0.2.0"
title: Transfer Tokens
summary: 'Send {{nowrap quantity}} from {{nowrap from}} to {{nowrap to}}'
icon: https://example.com/token.png
---

# Transfer
## Move tokens between accounts
{{from}} agrees to send {{quantity}} to {{to}}.
{{#if memo}}Memo: {{memo}}{{/if}}"#;

    fn transfer_data() -> Value {
        json!({"from": "butch", "to": "sundance", "quantity": "1.0000 EOS", "memo": ""})
    }

    #[test]
    fn ricardian_renders_front_matter_and_body() {
        let contract = render("eosio.token", "transfer", &transfer_data(), TRANSFER, Some("butch")).unwrap();
        let meta = contract.metadata();
        assert_eq!(meta.spec_version.as_deref(), Some("0.2.0"));
        assert_eq!(meta.title.as_deref(), Some("Transfer Tokens"));
        assert_eq!(meta.icon.as_deref(), Some("https://example.com/token.png"));
        assert_eq!(
            meta.summary.as_deref(),
            Some(r#"Send <span class="nowrap">1.0000 EOS</span> from <span class="nowrap">butch</span> to <span class="nowrap">sundance</span>"#),
        );
        let html = contract.html();
        assert!(html.starts_with(r#"<div class="ricardian-action">Transfer</div>"#));
        assert!(html.contains(r#"<div class="ricardian-description">Move tokens between accounts</div>"#));
        assert!(html.contains("butch agrees to send 1.0000 EOS to sundance."));
        assert!(!html.contains("Memo:"));
    }

    #[test]
    fn ricardian_signer_and_action() {
        let template = "# {{[$action].name}}\nSigned by {{[$signer]}}.";
        let contract = render("eosio", "buyram", &json!({}), template, Some("butch")).unwrap();
        assert_eq!(contract.html(), "<div class=\"ricardian-action\">buyram</div>\nSigned by butch.");
        let contract = render("eosio", "buyram", &json!({}), template, None).unwrap();
        assert_eq!(contract.html(), "<div class=\"ricardian-action\">buyram</div>\nSigned by .");
        assert_eq!(contract.metadata(), &RicardianMetadata::default());
    }

    #[test]
    fn ricardian_escapes_data() {
        let contract = render("eosio.token", "transfer", &json!({"memo": "<script>"}), "{{memo}}", None).unwrap();
        assert_eq!(contract.html(), "&lt;script&gt;");
    }

    #[test]
    fn ricardian_failures() {
        let res = render("eosio.token", "transfer", &transfer_data(), "---\ntitle: oops\n\nno end", None);
        assert_eq!(res.err(), Some(Error::RicardianRenderFailed("unterminated front matter".into())));
        let res = render("eosio.token", "transfer", &transfer_data(), "{{#if from}}never closed", None);
        assert!(matches!(res, Err(Error::RicardianRenderFailed(_))));
    }
}
