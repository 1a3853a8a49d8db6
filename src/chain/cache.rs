//! The contract metadata cache.
//!
//! Decoding a transaction requires the interface (ABI) of every contract it
//! touches, and fetching those from a node is slow. Descriptors are cached
//! per `(contract, chain id)` along with the time we cached them. An entry is
//! only trusted if it was cached *after* the contract's code last changed.
//!
//! The cache is advisory. Two requests that miss on the same key at the same
//! time will both fetch and both write, and the last write wins. Cache read
//! and write failures are logged and treated as misses.

use crate::{
    error::Result,
    util::Timestamp,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use tokio::sync::RwLock;

/// A cached contract descriptor and when it was cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, getset::Getters)]
#[getset(get = "pub")]
pub struct CachedDescriptor {
    descriptor: Value,
    timestamp: Timestamp,
}

impl CachedDescriptor {
    pub fn new(descriptor: Value, timestamp: Timestamp) -> Self {
        Self { descriptor, timestamp }
    }

    /// Whether this entry is newer than the contract's last code update.
    pub fn is_fresh(&self, last_code_update: &Timestamp) -> bool {
        &self.timestamp > last_code_update
    }
}

/// Somewhere to keep contract descriptors.
#[async_trait]
pub trait ContractCache: Send + Sync {
    /// Grab a cached descriptor.
    async fn get(&self, contract: &str, chain_id: &str) -> Result<Option<CachedDescriptor>>;

    /// Store a descriptor, replacing whatever was there.
    async fn put(&self, contract: &str, chain_id: &str, entry: CachedDescriptor) -> Result<()>;
}

/// A contract cache that lives in memory.
#[derive(Debug, Default)]
pub struct MemoryContractCache {
    entries: RwLock<HashMap<(String, String), CachedDescriptor>>,
}

impl MemoryContractCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many descriptors we're holding.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl ContractCache for MemoryContractCache {
    async fn get(&self, contract: &str, chain_id: &str) -> Result<Option<CachedDescriptor>> {
        let key = (contract.to_string(), chain_id.to_string());
        Ok(self.entries.read().await.get(&key).cloned())
    }

    async fn put(&self, contract: &str, chain_id: &str, entry: CachedDescriptor) -> Result<()> {
        let key = (contract.to_string(), chain_id.to_string());
        self.entries.write().await.insert(key, entry);
        Ok(())
    }
}

/// A contract descriptor that can be cached.
pub trait Descriptor: serde::Serialize + DeserializeOwned + Send {
    /// A copy with everything we don't need for decoding removed.
    fn stripped(&self) -> Self;
}

/// Resolve a contract descriptor through the cache.
///
/// On a hit, `last_code_update` is awaited to decide whether the entry is
/// still good. On a miss (or a stale entry) `fetch` is awaited and a stripped
/// copy is written back. Neither future runs if it isn't needed. Failures of
/// `last_code_update` or `fetch` are returned; cache failures are not.
pub async fn resolve_cached<D, L, F>(cache: &dyn ContractCache, contract: &str, chain_id: &str, last_code_update: L, fetch: F) -> Result<D>
    where D: Descriptor,
          L: Future<Output = Result<Timestamp>> + Send,
          F: Future<Output = Result<D>> + Send,
{
    match cache.get(contract, chain_id).await {
        Ok(Some(entry)) => {
            let last_update = last_code_update.await?;
            if entry.is_fresh(&last_update) {
                match serde_json::from_value::<D>(entry.descriptor().clone()) {
                    Ok(descriptor) => {
                        tracing::debug!(contract = contract, chain_id = chain_id, "contract cache hit");
                        return Ok(descriptor);
                    }
                    Err(err) => {
                        tracing::warn!(contract = contract, chain_id = chain_id, error = %err, "unreadable cached descriptor, refetching");
                    }
                }
            } else {
                tracing::debug!(contract = contract, chain_id = chain_id, cached = %entry.timestamp(), updated = %last_update, "cached descriptor is stale");
            }
        }
        Ok(None) => {
            tracing::debug!(contract = contract, chain_id = chain_id, "contract cache miss");
        }
        Err(err) => {
            tracing::warn!(contract = contract, chain_id = chain_id, error = %err, "contract cache read failed");
        }
    }

    let descriptor = fetch.await?;
    match serde_json::to_value(descriptor.stripped()) {
        Ok(value) => {
            let entry = CachedDescriptor::new(value, Timestamp::now());
            if let Err(err) = cache.put(contract, chain_id, entry).await {
                tracing::warn!(contract = contract, chain_id = chain_id, error = %err, "contract cache write failed");
            }
        }
        Err(err) => {
            tracing::warn!(contract = contract, chain_id = chain_id, error = %err, "could not serialize descriptor for caching");
        }
    }
    Ok(descriptor)
}
