//! The main error enum for the project lives here, and documents the various
//! conditions that can arise while interacting with the system.

use thiserror::Error;

/// This is our error enum. It contains an entry for any part of the system in
/// which an expectation is not met or a problem occurs.
#[derive(Error, Debug)]
pub enum Error {
    /// A contract's ABI does not define the action we're trying to decode.
    #[error("contract {contract} has no action named {action}")]
    AbiActionNotFound {
        /// The contract account
        contract: String,
        /// The action that was missing
        action: String,
    },

    /// Binary action data ended before the ABI said it would.
    #[error("unexpected end of action data")]
    AbiDecodeUnexpectedEnd,

    /// Binary action data had bytes left over after decoding.
    #[error("action data has {0} trailing bytes")]
    AbiDecodeTrailingBytes(usize),

    /// A value inside the action data was malformed (bad utf8, bad bool, etc).
    #[error("malformed value in action data: {0}")]
    AbiDecodeInvalidValue(String),

    /// A name failed to encode (too long or has characters outside `.1-5a-z`).
    #[error("invalid account name: {0}")]
    AbiInvalidName(String),

    /// Type resolution went too deep, probably a self-referencing ABI.
    #[error("ABI type nesting is too deep")]
    AbiRecursionLimit,

    /// A type referenced by the ABI could not be found.
    #[error("ABI type not found: {0}")]
    AbiUnknownType(String),

    /// We only speak `eosio::abi/1.x`.
    #[error("unsupported ABI version: {0}")]
    AbiUnsupportedVersion(String),

    /// Given bytes were the wrong length.
    #[error("bad length")]
    BadLength,

    /// A blockchain identifier we don't know about.
    #[error("unknown blockchain: {0}")]
    BlockchainUnknown(String),

    /// A request to a chain node failed.
    #[error("chain request failed: {0}")]
    ChainRequestFailed(String),

    /// We could not resolve a contract interface during transaction parsing.
    /// This always aborts the entire parse.
    #[error("could not resolve the interface for contract {contract}: {source}")]
    ContractResolutionFailed {
        /// The contract account
        contract: String,
        /// Whatever went wrong
        #[source]
        source: Box<Error>,
    },

    /// Bad key.
    #[error("key is invalid")]
    CryptoBadKey,

    /// Bad salt given to a cryptographic function.
    #[error("incorrect salt given for kdf")]
    CryptoBadSalt,

    /// Could not generate key from password
    #[error("key derivation from password failed")]
    CryptoKDFFailed,

    /// Failed to open a sealed message. This is a bummer, man.
    #[error("failed to open a sealed object")]
    CryptoOpenFailed,

    /// Failed to seal a message.
    #[error("failed to seal an object")]
    CryptoSealFailed,

    /// Failed to produce a signature
    #[error("failed to create a signature")]
    CryptoSignatureFailed,

    /// A signature failed to verify.
    #[error("the given signature/public key/data combo does not verify")]
    CryptoSignatureVerificationFailed,

    /// An error while engaging in base64 deserialization.
    #[error("deserialization error")]
    DeserializeBase64(#[from] base64::DecodeError),

    /// An error while engaging in base58 deserialization.
    #[error("base58 deserialization error")]
    DeserializeBase58(#[from] bs58::decode::Error),

    /// An error while engaging in hex deserialization.
    #[error("hex deserialization error")]
    DeserializeHex(#[from] hex::FromHexError),

    /// The private key is encrypted and needs to be decrypted before use.
    #[error("identity private key is encrypted")]
    IdentityKeyEncrypted,

    /// The identity has not been initialized with a keypair.
    #[error("identity has no keypair")]
    IdentityKeyMissing,

    /// An identity must always have at least one location.
    #[error("an identity must have at least one location")]
    IdentityLocationsEmpty,

    /// The location being operated on wasn't found.
    #[error("location not found")]
    IdentityLocationNotFound,

    /// Identity names are `[A-Za-z0-9_-]{3,20}`.
    #[error("invalid identity name")]
    IdentityNameInvalid,

    /// Keygen failed
    #[error("keygen failed")]
    KeygenFailed,

    /// A network unique id could not be parsed.
    #[error("invalid network unique id: {0}")]
    NetworkUniqueInvalid(String),

    /// An account descriptor is missing one of its required fields.
    #[error("account descriptor missing field: {0}")]
    RequirementsAccountFieldMissing(String),

    /// A requirement set did not have the expected shape.
    #[error("malformed requirement set: {0}")]
    RequirementsInvalid(String),

    /// A requirement named a field outside of the field catalog.
    #[error("unknown field requested: {0}")]
    RequirementsUnknownField(String),

    /// A ricardian template failed to render.
    #[error("ricardian contract failed to render: {0}")]
    RicardianRenderFailed(String),

    /// An error while engaging in JSON (de)serialization.
    #[error("json serialization error")]
    SerializeJson(#[from] serde_json::Error),

    /// An error while engaging in yaml (de)serialization.
    #[error("yaml serialization error")]
    SerializeYaml(#[from] serde_yaml::Error),
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        // serde_json::Error et al are not eq-able, so compare the debug output
        format!("{:?}", self) == format!("{:?}", other)
    }
}

/// Wraps `std::result::Result` around our `Error` enum
pub type Result<T> = std::result::Result<T, Error>;
