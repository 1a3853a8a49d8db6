//! The EOS chain plugin.
//!
//! Talks to EOS nodes through an [`EosClient`] (one per network, handed out
//! by a [`ClientFactory`]), caches contract ABIs in a
//! [`ContractCache`], and pulls private keys from a [`KeyPairResolver`] only
//! at the moment of signing.

use crate::{
    chain::{
        cache::{resolve_cached, ContractCache},
        ricardian,
        AccountPermission, ChainPlugin, CryptoRngCore, DecodedAction, KeyPairResolver, SignMode, SignPayload,
    },
    config::{ChainConfig, Config},
    error::{Error, Result},
    network::{Blockchain, Network},
    util::Timestamp,
};
use async_trait::async_trait;
use futures::future::try_join_all;
use serde_derive::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use zeroize::Zeroizing;

pub mod abi;
pub mod key;

pub use abi::{Abi, Contract, Name};
pub use key::{PrivateKey, PublicKey, Signature};

/// A permission on an on-chain account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, getset::Getters)]
#[getset(get = "pub")]
pub struct ChainPermission {
    perm_name: String,
}

impl ChainPermission {
    pub fn new<T: Into<String>>(perm_name: T) -> Self {
        Self { perm_name: perm_name.into() }
    }
}

/// The parts of `get_account` we use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, getset::Getters)]
#[getset(get = "pub")]
pub struct ChainAccount {
    account_name: String,
    last_code_update: Timestamp,
    permissions: Vec<ChainPermission>,
}

impl ChainAccount {
    pub fn new<T: Into<String>>(account_name: T, last_code_update: Timestamp, permissions: Vec<ChainPermission>) -> Self {
        Self { account_name: account_name.into(), last_code_update, permissions }
    }
}

/// The node API the plugin needs. Implementations do the HTTP.
#[async_trait]
pub trait EosClient: Send + Sync {
    /// The chain id the node reports.
    async fn get_info(&self) -> Result<String>;

    async fn get_account(&self, account: &str) -> Result<ChainAccount>;

    /// Accounts that have `public_key` somewhere in their permissions.
    async fn get_key_accounts(&self, public_key: &str) -> Result<Vec<String>>;

    async fn get_abi(&self, account: &str) -> Result<Abi>;
}

/// Hands out a client for a network.
pub trait ClientFactory: Send + Sync {
    fn connect(&self, network: &Network) -> Result<Arc<dyn EosClient>>;
}

/// The EOS plugin.
pub struct Eos {
    config: ChainConfig,
    clients: Arc<dyn ClientFactory>,
    cache: Arc<dyn ContractCache>,
    keys: Arc<dyn KeyPairResolver>,
}

impl Eos {
    pub fn new(config: &Config, clients: Arc<dyn ClientFactory>, cache: Arc<dyn ContractCache>, keys: Arc<dyn KeyPairResolver>) -> Self {
        Self {
            config: config.chain().clone(),
            clients,
            cache,
            keys,
        }
    }

    /// The network this plugin vouches for.
    pub fn endorsed_network(&self) -> &Network {
        self.config.endorsed_network()
    }

    /// Whether a network points at the same node as the endorsed network.
    pub fn is_endorsed_network(&self, network: &Network) -> bool {
        network.hostport() == self.endorsed_network().hostport()
    }

    /// Ask a network for its chain id. Returns an empty string if the node
    /// can't be reached.
    pub async fn chain_id(&self, network: &Network) -> String {
        let res = match self.clients.connect(network) {
            Ok(client) => client.get_info().await,
            Err(err) => Err(err),
        };
        match res {
            Ok(chain_id) => chain_id,
            Err(err) => {
                tracing::warn!(network = %network.fullhost(), error = %err, "could not fetch chain id");
                String::new()
            }
        }
    }

    /// EOS accounts have to be created on chain and then imported, as opposed
    /// to being derived from a key.
    pub fn accounts_are_imported(&self) -> bool {
        true
    }

    /// Turn a hex private key (as exported by some wallets) into WIF.
    pub fn convert_hex_private_key(&self, hex_key: &str) -> Result<Zeroizing<String>> {
        let bytes = Zeroizing::new(hex::decode(hex_key.trim().trim_start_matches("0x"))?);
        Ok(PrivateKey::from_bytes(&bytes)?.to_wif())
    }

    async fn resolve_contract(&self, client: &Arc<dyn EosClient>, contract: &str, cache_scope: &str) -> Result<Contract> {
        let last_code_update = async {
            client.get_account(contract).await.map(|acc| acc.last_code_update().clone())
        };
        let abi: Abi = resolve_cached(self.cache.as_ref(), contract, cache_scope, last_code_update, client.get_abi(contract)).await?;
        Contract::new(contract, abi)
    }
}

#[async_trait]
impl ChainPlugin for Eos {
    fn blockchain(&self) -> Blockchain {
        Blockchain::Eos
    }

    fn chain_config(&self) -> &ChainConfig {
        &self.config
    }

    fn validate_private_key(&self, private_key: &str) -> bool {
        PrivateKey::from_str(private_key).is_ok()
    }

    fn validate_public_key(&self, public_key: &str) -> bool {
        PublicKey::from_str(public_key).is_ok()
    }

    fn derive_public_key(&self, private_key: &str) -> Result<String> {
        Ok(PrivateKey::from_str(private_key)?.public_key().to_string())
    }

    fn generate_random_private_key(&self, rng: &mut dyn CryptoRngCore) -> Result<String> {
        Ok(PrivateKey::generate(rng)?.to_wif().to_string())
    }

    async fn lookup_accounts(&self, public_key: &str, network: &Network) -> Result<Vec<AccountPermission>> {
        let client = self.clients.connect(network)?;
        let names = client.get_key_accounts(public_key).await?;
        let accounts = try_join_all(names.iter().map(|name| client.get_account(name))).await?;
        let permissions = accounts.into_iter()
            .flat_map(|acc| {
                let name = acc.account_name().clone();
                acc.permissions().iter()
                    .map(move |perm| AccountPermission::new(name.clone(), perm.perm_name().clone()))
                    .collect::<Vec<_>>()
            })
            .collect();
        Ok(permissions)
    }

    async fn parse_transaction(&self, payload: &SignPayload, network: &Network) -> Result<Vec<DecodedAction>> {
        let actions = payload.transaction().actions();
        let mut contracts: Vec<&str> = vec![];
        let mut contract_index = Vec::with_capacity(actions.len());
        for action in actions {
            let idx = match contracts.iter().position(|c| *c == action.account().as_str()) {
                Some(idx) => idx,
                None => {
                    contracts.push(action.account());
                    contracts.len() - 1
                }
            };
            contract_index.push(idx);
        }

        let client = self.clients.connect(network)?;
        // without a chain id, keep each node's contracts apart
        let cache_scope = if network.chain_id().is_empty() {
            network.unique()
        } else {
            network.chain_id().clone()
        };
        let resolved = try_join_all(contracts.iter().map(|contract| {
            let client = &client;
            let cache_scope = cache_scope.as_str();
            async move {
                self.resolve_contract(client, contract, cache_scope).await
                    .map_err(|err| Error::ContractResolutionFailed { contract: contract.to_string(), source: Box::new(err) })
            }
        })).await?;

        let mut decoded = Vec::with_capacity(actions.len());
        for (action, idx) in actions.iter().zip(contract_index) {
            let contract = &resolved[idx];
            let data = contract.decode_action(action.name(), action.data())?;
            // the signer is only unambiguous with a single authorization
            let signer = match action.authorization().as_slice() {
                [auth] => Some(auth.actor().as_str()),
                _ => None,
            };
            let ricardian = contract.ricardian(action.name())
                .map(|template| ricardian::render(action.account(), action.name(), &data, template, signer))
                .transpose()?;
            decoded.push(DecodedAction::new(data, action.account().clone(), action.name().clone(), action.authorization().clone(), ricardian));
        }
        tracing::debug!(actions = decoded.len(), contracts = contracts.len(), "parsed transaction");
        Ok(decoded)
    }

    async fn sign(&self, payload: &SignPayload, public_key: &str, mode: SignMode) -> Result<Option<String>> {
        let private_key = match self.keys.private_key(public_key) {
            Some(key) => key,
            None => {
                tracing::debug!(public_key = public_key, "no private key for signing");
                return Ok(None);
            }
        };
        let key = PrivateKey::from_str(&private_key)?;
        let signature = match mode {
            SignMode::Transaction => key.sign(payload.buf())?,
            SignMode::Arbitrary => key.sign(payload.data().as_bytes())?,
            SignMode::ArbitraryHash => {
                let digest = hex::decode(payload.data().trim())?;
                key.sign_hash(&digest)?
            }
        };
        Ok(Some(signature.to_string()))
    }
}
