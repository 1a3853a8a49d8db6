//! Networks: which blockchain, and which node/chain on that blockchain.
//!
//! A network is identified by its unique id, which is what ends up in
//! `account:<unique>` permission tokens. The grammar is
//! `<blockchain>:chain:<chain id>` when the chain id is known and
//! `<blockchain>:<host>[:<port>]` otherwise, always lowercased.

use crate::error::{Error, Result};
use serde::{de, Deserialize as _, Deserializer};
use serde_derive::{Deserialize, Serialize};
use std::str::FromStr;

/// The blockchains we know how to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Blockchain {
    Eos,
    Eth,
    Trx,
}

impl Blockchain {
    /// The lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eos => "eos",
            Self::Eth => "eth",
            Self::Trx => "trx",
        }
    }
}

impl FromStr for Blockchain {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "eos" => Ok(Self::Eos),
            "eth" => Ok(Self::Eth),
            "trx" => Ok(Self::Trx),
            _ => Err(Error::BlockchainUnknown(s.into())),
        }
    }
}

impl std::fmt::Display for Blockchain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ports show up as numbers, numeric strings, or empty strings depending on
/// who built the JSON.
fn port_from_any<'de, D>(deserializer: D) -> std::result::Result<Option<u16>, D::Error>
    where D: Deserializer<'de>,
{
    let val = serde_json::Value::deserialize(deserializer)?;
    match val {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Number(num) => {
            let port = num.as_u64()
                .and_then(|x| u16::try_from(x).ok())
                .ok_or_else(|| de::Error::custom(format!("bad port: {}", num)))?;
            Ok(if port == 0 { None } else { Some(port) })
        }
        serde_json::Value::String(s) if s.trim().is_empty() => Ok(None),
        serde_json::Value::String(s) => {
            let port = s.trim().parse::<u16>().map_err(|_| de::Error::custom(format!("bad port: {}", s)))?;
            Ok(Some(port))
        }
        _ => Err(de::Error::custom("port must be a number or string")),
    }
}

/// A blockchain network (node + chain).
#[derive(Debug, Clone, Serialize, Deserialize, getset::Getters, getset::Setters)]
#[getset(get = "pub", set = "pub")]
#[serde(rename_all = "camelCase")]
pub struct Network {
    /// A display name for the network
    #[serde(default)]
    name: String,
    /// `https` or `http`
    #[serde(default = "default_protocol")]
    protocol: String,
    /// Node host
    #[serde(default)]
    host: String,
    /// Node port, if any
    #[serde(default, deserialize_with = "port_from_any", skip_serializing_if = "Option::is_none")]
    port: Option<u16>,
    /// Which blockchain this network runs
    blockchain: Blockchain,
    /// The chain id, empty if unknown
    #[serde(default)]
    chain_id: String,
}

fn default_protocol() -> String {
    String::from("https")
}

impl Network {
    /// Create a new network.
    pub fn new<T: Into<String>>(name: T, protocol: T, host: T, port: Option<u16>, blockchain: Blockchain, chain_id: T) -> Self {
        Self {
            name: name.into(),
            protocol: protocol.into(),
            host: host.into(),
            port,
            blockchain,
            chain_id: chain_id.into(),
        }
    }

    /// A network needs either a node address or a chain id to be usable.
    pub fn is_valid(&self) -> bool {
        (!self.host.is_empty() && self.port.is_some()) || !self.chain_id.is_empty()
    }

    /// `host[:port]`
    pub fn hostport(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{}", self.host, port),
            None => self.host.clone(),
        }
    }

    /// `protocol://host[:port]`
    pub fn fullhost(&self) -> String {
        format!("{}://{}", self.protocol, self.hostport())
    }

    /// This network's unique id. Two networks with the same unique id are the
    /// same network, regardless of display name or protocol.
    pub fn unique(&self) -> String {
        let tail = if self.chain_id.is_empty() {
            self.hostport()
        } else {
            format!("chain:{}", self.chain_id)
        };
        format!("{}:{}", self.blockchain, tail).to_lowercase()
    }

    /// Parse a unique id back into a (minimal) network.
    pub fn from_unique(unique: &str) -> Result<Self> {
        let (blockchain_str, rest) = unique.split_once(':')
            .ok_or_else(|| Error::NetworkUniqueInvalid(unique.into()))?;
        let blockchain = Blockchain::from_str(blockchain_str)
            .map_err(|_| Error::NetworkUniqueInvalid(unique.into()))?;
        if rest.is_empty() {
            Err(Error::NetworkUniqueInvalid(unique.into()))?;
        }
        if let Some(chain_id) = rest.strip_prefix("chain:") {
            if chain_id.is_empty() {
                Err(Error::NetworkUniqueInvalid(unique.into()))?;
            }
            return Ok(Self::new("", "https", "", None, blockchain, chain_id));
        }
        let (host, port) = match rest.rsplit_once(':') {
            Some((host, port_str)) => {
                let port = port_str.parse::<u16>().map_err(|_| Error::NetworkUniqueInvalid(unique.into()))?;
                (host, Some(port))
            }
            None => (rest, None),
        };
        if host.is_empty() {
            Err(Error::NetworkUniqueInvalid(unique.into()))?;
        }
        Ok(Self::new("", "https", host, port, blockchain, ""))
    }
}

impl PartialEq for Network {
    fn eq(&self, other: &Self) -> bool {
        self.unique() == other.unique()
    }
}

impl Eq for Network {}
