//! Runtime configuration for chain plugins and key derivation.
//!
//! Everything has a sane default, so an empty config is a valid config.
//! Config can be loaded from YAML:
//!
//! ```yaml
//! chain:
//!   discovery_timeout_ms: 2000
//!   endorsed_network:
//!     name: EOS Mainnet
//!     protocol: https
//!     host: nodes.get-scatter.com
//!     port: 443
//!     blockchain: eos
//!     chainId: aca376f206b8fc25a6ed44dbdc66547c36c6c33e3a119ffbeaef943642f0e906
//! kdf:
//!   ops: 2
//!   mem: 65536
//! ```

use crate::{
    crypto::base::{KDF_MEM_INTERACTIVE, KDF_OPS_INTERACTIVE},
    error::Result,
    network::{Blockchain, Network},
};
use serde_derive::{Deserialize, Serialize};
use std::time::Duration;

/// Chain id of the EOS mainnet.
pub const EOS_MAINNET_CHAIN_ID: &str = "aca376f206b8fc25a6ed44dbdc66547c36c6c33e3a119ffbeaef943642f0e906";

fn default_discovery_timeout_ms() -> u64 {
    2000
}

fn default_endorsed_network() -> Network {
    Network::new("EOS Mainnet", "https", "nodes.get-scatter.com", Some(443), Blockchain::Eos, EOS_MAINNET_CHAIN_ID)
}

/// Chain plugin configuration.
#[derive(Debug, Clone, Serialize, Deserialize, getset::Getters, getset::Setters)]
#[getset(get = "pub", set = "pub")]
pub struct ChainConfig {
    /// How long account discovery may run before we give up and return
    /// nothing.
    #[serde(default = "default_discovery_timeout_ms")]
    discovery_timeout_ms: u64,
    /// The network the plugin vouches for.
    #[serde(default = "default_endorsed_network")]
    endorsed_network: Network,
}

impl ChainConfig {
    /// The discovery deadline as a duration.
    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery_timeout_ms)
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            discovery_timeout_ms: default_discovery_timeout_ms(),
            endorsed_network: default_endorsed_network(),
        }
    }
}

fn default_kdf_ops() -> u32 {
    KDF_OPS_INTERACTIVE
}

fn default_kdf_mem() -> u32 {
    KDF_MEM_INTERACTIVE
}

/// Argon2id cost for passphrase-derived keys.
#[derive(Debug, Clone, Serialize, Deserialize, getset::Getters, getset::Setters)]
#[getset(get = "pub", set = "pub")]
pub struct KdfConfig {
    #[serde(default = "default_kdf_ops")]
    ops: u32,
    #[serde(default = "default_kdf_mem")]
    mem: u32,
}

impl Default for KdfConfig {
    fn default() -> Self {
        Self {
            ops: default_kdf_ops(),
            mem: default_kdf_mem(),
        }
    }
}

/// Top-level config.
#[derive(Debug, Clone, Default, Serialize, Deserialize, getset::Getters, getset::MutGetters)]
#[getset(get = "pub", get_mut = "pub")]
pub struct Config {
    #[serde(default)]
    chain: ChainConfig,
    #[serde(default)]
    kdf: KdfConfig,
}

impl Config {
    /// Load config from a YAML string. Missing keys get their defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = Config::default();
        assert_eq!(config.chain().discovery_timeout(), Duration::from_millis(2000));
        assert_eq!(config.chain().endorsed_network().unique(), format!("eos:chain:{}", EOS_MAINNET_CHAIN_ID));
        assert_eq!(config.chain().endorsed_network().hostport(), "nodes.get-scatter.com:443");
        assert_eq!(config.kdf().ops(), &KDF_OPS_INTERACTIVE);
        assert_eq!(config.kdf().mem(), &KDF_MEM_INTERACTIVE);
        let empty = Config::from_yaml("").unwrap();
        assert_eq!(empty.chain().discovery_timeout_ms(), &2000);
    }

    #[test]
    fn config_from_yaml() {
        let yaml = r#"
chain:
  discovery_timeout_ms: 500
  endorsed_network:
    name: Jungle
    protocol: https
    host: jungle.example.com
    port: 443
    blockchain: eos
    chainId: e70aaab8997e1dfce58fbfac80cbbb8fecec7b99cf982a9444273cbc64c41473
kdf:
  ops: 3
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.chain().discovery_timeout(), Duration::from_millis(500));
        assert_eq!(config.chain().endorsed_network().name(), "Jungle");
        assert_eq!(config.kdf().ops(), &3);
        assert_eq!(config.kdf().mem(), &KDF_MEM_INTERACTIVE);

        let partial = Config::from_yaml("kdf:\n  mem: 1024\n").unwrap();
        assert_eq!(partial.chain().discovery_timeout_ms(), &2000);
        assert_eq!(partial.kdf().mem(), &1024);

        assert!(Config::from_yaml("chain: [1, 2").is_err());
    }
}
