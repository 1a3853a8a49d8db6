//! Requirement sets describe what an application wants to know about an
//! identity: some personal fields, some location fields, and accounts on some
//! set of networks.
//!
//! Requirement sets come in from the outside world as JSON, so we're strict
//! about their shape: exactly `accounts`, `personal`, and `location`, nothing
//! else. Once granted, they're stored as a flat, sorted list of permission
//! tokens (`personal:email`, `location:country`, `account:eos:chain:...`) so
//! two equal grants always look the same.

use crate::{
    error::{Error, Result},
    identity::fields::{AccountField, LocationField, PersonalField},
    network::Network,
};
use serde_derive::Serialize;
use serde_json::Value;
use std::str::FromStr;

/// Permission token prefix for account requirements
pub const TOKEN_ACCOUNT: &str = "account:";
/// Permission token prefix for location requirements
pub const TOKEN_LOCATION: &str = "location:";
/// Permission token prefix for personal requirements
pub const TOKEN_PERSONAL: &str = "personal:";

/// What an application is asking for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, getset::Getters, getset::MutGetters)]
#[getset(get = "pub", get_mut = "pub")]
pub struct RequirementSet {
    /// Networks the application wants an account on
    accounts: Vec<Network>,
    /// Personal fields the application wants
    personal: Vec<PersonalField>,
    /// Location fields the application wants. These are always pulled from a
    /// single location.
    location: Vec<LocationField>,
}

/// Grab a list of strings under the given key, treating a missing key as
/// empty.
fn string_list<'a>(obj: &'a serde_json::Map<String, Value>, key: &str) -> Result<Vec<&'a str>> {
    match obj.get(key) {
        None => Ok(vec![]),
        Some(Value::Array(items)) => {
            items.iter()
                .map(|x| x.as_str().ok_or_else(|| Error::RequirementsInvalid(format!("{} entries must be strings", key))))
                .collect()
        }
        Some(_) => Err(Error::RequirementsInvalid(format!("{} must be a list", key))),
    }
}

/// Accounts are requested either as a bare network object or as
/// `{blockchain, network: {...}}`.
fn account_network(entry: &Value) -> Result<Network> {
    let obj = entry.as_object()
        .ok_or_else(|| Error::RequirementsInvalid("accounts entries must be objects".into()))?;
    let blockchain = obj.get(AccountField::Blockchain.as_str())
        .or_else(|| obj.get(AccountField::Network.as_str()).and_then(|n| n.get(AccountField::Blockchain.as_str())))
        .ok_or_else(|| Error::RequirementsAccountFieldMissing(AccountField::Blockchain.to_string()))?
        .clone();
    let mut net_obj = match obj.get(AccountField::Network.as_str()) {
        Some(Value::Object(net)) => net.clone(),
        Some(_) => Err(Error::RequirementsInvalid("account network must be an object".into()))?,
        None => obj.clone(),
    };
    net_obj.insert(AccountField::Blockchain.to_string(), blockchain);
    let network: Network = serde_json::from_value(Value::Object(net_obj))
        .map_err(|e| Error::RequirementsInvalid(format!("bad account network: {}", e)))?;
    if !network.is_valid() {
        Err(Error::RequirementsInvalid(format!("account network {} has no chain id or node", network.unique())))?;
    }
    Ok(network)
}

impl RequirementSet {
    /// An empty requirement set.
    pub fn placeholder() -> Self {
        Self::default()
    }

    /// Create a requirement set from its parts.
    pub fn new(accounts: Vec<Network>, personal: Vec<PersonalField>, location: Vec<LocationField>) -> Self {
        Self { accounts, personal, location }
    }

    /// Build a requirement set from an application's request.
    ///
    /// Missing keys are treated as empty, but any key other than `accounts`,
    /// `personal`, or `location` fails, as does any field not in the field
    /// catalog.
    pub fn from_request(request: &Value) -> Result<Self> {
        let obj = request.as_object()
            .ok_or_else(|| Error::RequirementsInvalid("requirements must be an object".into()))?;
        if let Some(key) = obj.keys().find(|k| !["accounts", "personal", "location"].contains(&k.as_str())) {
            Err(Error::RequirementsInvalid(format!("unexpected key: {}", key)))?;
        }
        let personal = string_list(obj, "personal")?
            .into_iter()
            .map(PersonalField::from_str)
            .collect::<Result<Vec<_>>>()?;
        let location = string_list(obj, "location")?
            .into_iter()
            .map(LocationField::from_str)
            .collect::<Result<Vec<_>>>()?;
        let accounts = match obj.get("accounts") {
            None => vec![],
            Some(Value::Array(entries)) => entries.iter().map(account_network).collect::<Result<Vec<_>>>()?,
            Some(_) => Err(Error::RequirementsInvalid("accounts must be a list".into()))?,
        };
        Ok(Self { accounts, personal, location })
    }

    /// Check a request's shape without keeping the result.
    pub fn validate(request: &Value) -> bool {
        Self::from_request(request).is_ok()
    }

    /// True if no personal or location fields are requested. Accounts are not
    /// considered: an accounts-only request counts as empty.
    pub fn is_empty(&self) -> bool {
        self.personal.is_empty() && self.location.is_empty()
    }

    /// Flatten into sorted permission tokens.
    pub fn to_permission_tokens(&self) -> Vec<String> {
        let mut tokens = self.accounts.iter()
            .map(|net| format!("{}{}", TOKEN_ACCOUNT, net.unique()))
            .chain(self.location.iter().map(|f| format!("{}{}", TOKEN_LOCATION, f)))
            .chain(self.personal.iter().map(|f| format!("{}{}", TOKEN_PERSONAL, f)))
            .collect::<Vec<_>>();
        tokens.sort();
        tokens
    }

    /// Rebuild a requirement set from permission tokens. Tokens with a prefix
    /// we don't recognize are skipped.
    pub fn from_permission_tokens<S: AsRef<str>>(tokens: &[S]) -> Result<Self> {
        let mut set = Self::placeholder();
        for token in tokens {
            let token = token.as_ref();
            if let Some(unique) = token.strip_prefix(TOKEN_ACCOUNT) {
                set.accounts.push(Network::from_unique(unique)?);
            } else if let Some(field) = token.strip_prefix(TOKEN_LOCATION) {
                set.location.push(LocationField::from_str(field)?);
            } else if let Some(field) = token.strip_prefix(TOKEN_PERSONAL) {
                set.personal.push(PersonalField::from_str(field)?);
            } else {
                tracing::debug!(token = token, "skipping unknown permission token");
            }
        }
        Ok(set)
    }
}

impl TryFrom<&Value> for RequirementSet {
    type Error = Error;

    fn try_from(request: &Value) -> std::result::Result<Self, Self::Error> {
        Self::from_request(request)
    }
}
