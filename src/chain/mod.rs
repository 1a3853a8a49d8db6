//! Chain plugins: the per-blockchain half of the system.
//!
//! Every blockchain we support implements [`ChainPlugin`], which covers key
//! handling (validation, derivation, generation), account discovery,
//! transaction parsing (turning an opaque signing request into something a
//! human can read), and signing.
//!
//! Plugins lean on a few collaborators they don't own: a [`KeyPairResolver`]
//! that maps public keys to private keys, a
//! [contract cache](crate::chain::cache::ContractCache), and whatever client
//! the plugin uses to talk to its nodes.

use crate::{
    config::ChainConfig,
    error::Result,
    network::{Blockchain, Network},
};
use async_trait::async_trait;
use rand::{CryptoRng, RngCore};
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;
use zeroize::Zeroizing;

pub mod cache;
pub mod eos;
pub mod ricardian;

use ricardian::RicardianContract;

/// An RNG that's fit for generating keys. Exists so we can pass one around as
/// a trait object.
pub trait CryptoRngCore: RngCore + CryptoRng {}

impl<T: RngCore + CryptoRng> CryptoRngCore for T {}

/// A signer on an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, getset::Getters)]
#[getset(get = "pub")]
pub struct Authorization {
    actor: String,
    permission: String,
}

impl Authorization {
    pub fn new<T: Into<String>>(actor: T, permission: T) -> Self {
        Self { actor: actor.into(), permission: permission.into() }
    }
}

/// One action within a transaction. The data is the contract-specific binary
/// payload, hex encoded on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, getset::Getters)]
#[getset(get = "pub")]
pub struct Action {
    /// The contract account
    account: String,
    /// The action name
    name: String,
    authorization: Vec<Authorization>,
    #[serde(with = "hex")]
    data: Vec<u8>,
}

impl Action {
    pub fn new<T: Into<String>>(account: T, name: T, authorization: Vec<Authorization>, data: Vec<u8>) -> Self {
        Self { account: account.into(), name: name.into(), authorization, data }
    }
}

/// The parts of a transaction we care about.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, getset::Getters)]
#[getset(get = "pub")]
pub struct Transaction {
    actions: Vec<Action>,
}

impl Transaction {
    pub fn new(actions: Vec<Action>) -> Self {
        Self { actions }
    }
}

/// A request to sign something.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, getset::Getters)]
#[getset(get = "pub")]
pub struct SignPayload {
    /// The transaction being signed
    #[serde(default)]
    transaction: Transaction,
    /// The exact bytes signed in transaction mode (for EOS, chain id +
    /// serialized transaction + context-free data hash)
    #[serde(default, with = "hex")]
    buf: Vec<u8>,
    /// Arbitrary data, or a hex digest, for arbitrary signing
    #[serde(default)]
    data: String,
}

impl SignPayload {
    /// Payload for signing a transaction.
    pub fn for_transaction(transaction: Transaction, buf: Vec<u8>) -> Self {
        Self { transaction, buf, data: String::new() }
    }

    /// Payload for signing arbitrary data (or a hex digest).
    pub fn for_arbitrary<T: Into<String>>(data: T) -> Self {
        Self { transaction: Transaction::default(), buf: vec![], data: data.into() }
    }
}

/// What exactly we're signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignMode {
    /// The transaction's signing buffer
    Transaction,
    /// The payload's arbitrary data, as utf8 bytes
    Arbitrary,
    /// The payload's arbitrary data is a hex digest that gets signed as-is
    ArbitraryHash,
}

impl SignMode {
    /// Map the `(arbitrary, is_hash)` flag pair apps send us onto a mode. A
    /// hash flag without the arbitrary flag means nothing.
    pub fn from_flags(arbitrary: bool, is_hash: bool) -> Self {
        match (arbitrary, is_hash) {
            (true, true) => Self::ArbitraryHash,
            (true, false) => Self::Arbitrary,
            (false, _) => Self::Transaction,
        }
    }
}

/// An action, decoded and ready for a human to look at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, getset::Getters)]
#[getset(get = "pub")]
pub struct DecodedAction {
    /// The decoded action fields
    data: Value,
    /// The contract account
    code: String,
    /// The action name
    #[serde(rename = "type")]
    action_type: String,
    authorization: Vec<Authorization>,
    /// Rendered contract terms, if the contract has them for this action
    ricardian: Option<RicardianContract>,
}

impl DecodedAction {
    pub fn new(data: Value, code: String, action_type: String, authorization: Vec<Authorization>, ricardian: Option<RicardianContract>) -> Self {
        Self { data, code, action_type, authorization, ricardian }
    }
}

/// An account/permission pair found on chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, getset::Getters)]
#[getset(get = "pub")]
pub struct AccountPermission {
    name: String,
    authority: String,
}

impl AccountPermission {
    pub fn new<T: Into<String>>(name: T, authority: T) -> Self {
        Self { name: name.into(), authority: authority.into() }
    }
}

/// An on-chain account controlled by one of our keys, at a given permission
/// level, on a given network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, getset::Getters)]
#[getset(get = "pub")]
#[serde(rename_all = "camelCase")]
pub struct Account {
    name: String,
    authority: String,
    public_key: String,
    blockchain: Blockchain,
    network_unique: String,
}

/// The version of an account we hand to applications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnableAccount {
    pub name: String,
    pub authority: String,
    pub public_key: String,
    pub blockchain: Blockchain,
}

impl Account {
    pub fn new(permission: AccountPermission, public_key: &str, network: &Network) -> Self {
        Self {
            name: permission.name,
            authority: permission.authority,
            public_key: public_key.into(),
            blockchain: *network.blockchain(),
            network_unique: network.unique(),
        }
    }

    /// `name@authority`
    pub fn formatted(&self) -> String {
        format!("{}@{}", self.name, self.authority)
    }

    /// Strip the account down to what applications get to see.
    pub fn returnable(&self) -> ReturnableAccount {
        ReturnableAccount {
            name: self.name.clone(),
            authority: self.authority.clone(),
            public_key: self.public_key.clone(),
            blockchain: self.blockchain,
        }
    }
}

/// Maps a public key to the private key we hold for it, if any.
pub trait KeyPairResolver: Send + Sync {
    /// Get the private key (in the chain's text encoding) for a public key.
    fn private_key(&self, public_key: &str) -> Option<Zeroizing<String>>;
}

/// The capabilities every supported blockchain provides.
#[async_trait]
pub trait ChainPlugin: Send + Sync {
    /// Which blockchain this plugin handles.
    fn blockchain(&self) -> Blockchain;

    /// The plugin's config.
    fn chain_config(&self) -> &ChainConfig;

    /// Is this a well-formed private key for this chain?
    fn validate_private_key(&self, private_key: &str) -> bool;

    /// Is this a well-formed public key for this chain?
    fn validate_public_key(&self, public_key: &str) -> bool;

    /// Get the public key for a private key.
    fn derive_public_key(&self, private_key: &str) -> Result<String>;

    /// Make a new private key.
    fn generate_random_private_key(&self, rng: &mut dyn CryptoRngCore) -> Result<String>;

    /// Clean up a private key pasted in by a user.
    fn normalize_private_key_input(&self, input: &str) -> String {
        input.trim().to_string()
    }

    /// Display an account/permission pair.
    fn format_account(&self, account: &AccountPermission) -> String {
        format!("{}@{}", account.name(), account.authority())
    }

    /// Ask the network which accounts/permissions a public key controls. This
    /// may fail or take forever; callers should use
    /// [`ChainPlugin::discover_accounts`].
    async fn lookup_accounts(&self, public_key: &str, network: &Network) -> Result<Vec<AccountPermission>>;

    /// Find every account a public key controls on a network. This is a
    /// convenience for the UI: it gives up after the configured timeout and
    /// returns nothing on any failure.
    async fn discover_accounts(&self, public_key: &str, network: &Network) -> Vec<Account> {
        let deadline = self.chain_config().discovery_timeout();
        match tokio::time::timeout(deadline, self.lookup_accounts(public_key, network)).await {
            Ok(Ok(permissions)) => {
                permissions.into_iter()
                    .map(|perm| Account::new(perm, public_key, network))
                    .collect()
            }
            Ok(Err(err)) => {
                tracing::warn!(network = %network.unique(), error = %err, "account discovery failed");
                vec![]
            }
            Err(_) => {
                tracing::warn!(network = %network.unique(), timeout_ms = deadline.as_millis() as u64, "account discovery timed out");
                vec![]
            }
        }
    }

    /// Who needs to sign this transaction, as `actor@permission` strings.
    fn action_participants(&self, transaction: &Transaction) -> Vec<String> {
        transaction.actions().iter()
            .flat_map(|action| action.authorization().iter())
            .map(|auth| format!("{}@{}", auth.actor(), auth.permission()))
            .collect()
    }

    /// Decode a signing request into readable actions. Any failure to
    /// understand any action fails the whole thing.
    async fn parse_transaction(&self, payload: &SignPayload, network: &Network) -> Result<Vec<DecodedAction>>;

    /// Sign a payload with the private key for `public_key`. Returns `None` if
    /// we don't hold that key.
    async fn sign(&self, payload: &SignPayload, public_key: &str, mode: SignMode) -> Result<Option<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    enum Lookup {
        Works,
        Fails,
        Hangs,
    }

    struct TestPlugin {
        config: ChainConfig,
        lookup: Lookup,
        calls: AtomicUsize,
    }

    impl TestPlugin {
        fn new(lookup: Lookup) -> Self {
            Self { config: ChainConfig::default(), lookup, calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl ChainPlugin for TestPlugin {
        fn blockchain(&self) -> Blockchain { Blockchain::Eos }
        fn chain_config(&self) -> &ChainConfig { &self.config }
        fn validate_private_key(&self, _private_key: &str) -> bool { true }
        fn validate_public_key(&self, _public_key: &str) -> bool { true }
        fn derive_public_key(&self, private_key: &str) -> Result<String> { Ok(format!("pub-{}", private_key)) }
        fn generate_random_private_key(&self, rng: &mut dyn CryptoRngCore) -> Result<String> {
            Ok(format!("{}", rng.next_u32()))
        }

        async fn lookup_accounts(&self, _public_key: &str, _network: &Network) -> Result<Vec<AccountPermission>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.lookup {
                Lookup::Works => Ok(vec![AccountPermission::new("butch", "active"), AccountPermission::new("butch", "owner")]),
                Lookup::Fails => Err(Error::ChainRequestFailed("connection refused".into())),
                Lookup::Hangs => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(vec![AccountPermission::new("never", "active")])
                }
            }
        }

        async fn parse_transaction(&self, _payload: &SignPayload, _network: &Network) -> Result<Vec<DecodedAction>> {
            Ok(vec![])
        }

        async fn sign(&self, _payload: &SignPayload, _public_key: &str, _mode: SignMode) -> Result<Option<String>> {
            Ok(None)
        }
    }

    fn network() -> Network {
        Network::new("local", "http", "localhost", Some(8888), Blockchain::Eos, "abc")
    }

    #[tokio::test]
    async fn discover_accounts_works() {
        let plugin = TestPlugin::new(Lookup::Works);
        let accounts = plugin.discover_accounts("EOS6MRyAjQq8ud7hVNYcfnVPJqcVpscN5So8BhtHuGYqET5GDW5CV", &network()).await;
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].formatted(), "butch@active");
        assert_eq!(accounts[1].formatted(), "butch@owner");
        assert_eq!(accounts[0].network_unique(), "eos:chain:abc");
        assert_eq!(accounts[0].public_key(), "EOS6MRyAjQq8ud7hVNYcfnVPJqcVpscN5So8BhtHuGYqET5GDW5CV");
        let returnable = serde_json::to_value(accounts[0].returnable()).unwrap();
        assert_eq!(returnable, serde_json::json!({
            "name": "butch",
            "authority": "active",
            "publicKey": "EOS6MRyAjQq8ud7hVNYcfnVPJqcVpscN5So8BhtHuGYqET5GDW5CV",
            "blockchain": "eos",
        }));
    }

    #[tokio::test]
    async fn discover_accounts_swallows_failure() {
        let plugin = TestPlugin::new(Lookup::Fails);
        let accounts = plugin.discover_accounts("EOSxyz", &network()).await;
        assert_eq!(accounts, vec![]);
        assert_eq!(plugin.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn discover_accounts_times_out_empty() {
        let plugin = TestPlugin::new(Lookup::Hangs);
        let start = tokio::time::Instant::now();
        let accounts = plugin.discover_accounts("EOSxyz", &network()).await;
        assert_eq!(accounts, vec![]);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(2000));
        assert!(elapsed < Duration::from_secs(3600));
    }

    #[test]
    fn plugin_defaults() {
        let plugin = TestPlugin::new(Lookup::Works);
        assert_eq!(plugin.normalize_private_key_input("  5KQwrPbwdL6PhXujxW37FSSQZ1JiwsST4cqQzDeyXtP79zkvFD3 \n"), "5KQwrPbwdL6PhXujxW37FSSQZ1JiwsST4cqQzDeyXtP79zkvFD3");
        assert_eq!(plugin.format_account(&AccountPermission::new("butch", "active")), "butch@active");
        let tx = Transaction::new(vec![
            Action::new("eosio.token", "transfer", vec![Authorization::new("butch", "active")], vec![]),
            Action::new("eosio", "buyram", vec![Authorization::new("butch", "owner"), Authorization::new("sundance", "active")], vec![]),
        ]);
        assert_eq!(plugin.action_participants(&tx), vec!["butch@active", "butch@owner", "sundance@active"]);
    }

    #[test]
    fn sign_mode_from_flags() {
        assert_eq!(SignMode::from_flags(false, false), SignMode::Transaction);
        assert_eq!(SignMode::from_flags(false, true), SignMode::Transaction);
        assert_eq!(SignMode::from_flags(true, false), SignMode::Arbitrary);
        assert_eq!(SignMode::from_flags(true, true), SignMode::ArbitraryHash);
    }

    #[test]
    fn sign_payload_serde() {
        let payload: SignPayload = serde_json::from_value(serde_json::json!({
            "transaction": {
                "actions": [{
                    "account": "eosio.token",
                    "name": "transfer",
                    "authorization": [{"actor": "butch", "permission": "active"}],
                    "data": "0a0b",
                }],
            },
            "buf": "deadbeef",
        })).unwrap();
        assert_eq!(payload.buf(), &vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(payload.transaction().actions()[0].data(), &vec![0x0a, 0x0b]);
        assert_eq!(payload.data(), "");
    }
}
