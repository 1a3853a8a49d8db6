//! This module holds the identity record and its key lifecycle.
//!
//! An identity is a bag of personal information and locations plus an EOS
//! (secp256k1) keypair that proves the identity is who it says it is. The
//! private half of the keypair is either plaintext (in use) or sealed with a
//! passphrase-derived key (at rest), and the record tracks which one
//! explicitly.

use crate::{
    chain::eos::{PrivateKey, PublicKey, Signature},
    crypto::base::{SecretKey, Sealed},
    error::{Error, Result},
    identity::info::{Location, Locations, PersonalInformation},
    util::ser,
};
use rand::{rngs::OsRng, CryptoRng, RngCore};
use serde_derive::{Deserialize, Serialize};
use std::str::FromStr;
use zeroize::Zeroizing;

/// Encoded private keys longer than this are ciphertext. A WIF key is 51
/// characters, a sealed one 122.
pub const ENCRYPTED_KEY_THRESHOLD: usize = 70;

/// The private half of an identity's keypair, either usable or locked up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum IdentityKey {
    /// A raw signing key, ready to go.
    Plaintext(PrivateKey),
    /// A WIF signing key sealed with a passphrase-derived key.
    Encrypted(Sealed),
}

impl IdentityKey {
    /// Whether this key needs decrypting before use.
    pub fn is_encrypted(&self) -> bool {
        matches!(self, Self::Encrypted(_))
    }

    /// The flat string encoding of the key: WIF when open, url-safe base64 of
    /// `nonce || ciphertext` when sealed.
    pub fn encoded(&self) -> Zeroizing<String> {
        match self {
            Self::Plaintext(secret) => secret.to_wif(),
            Self::Encrypted(sealed) => Zeroizing::new(ser::base64_encode(sealed.to_bytes())),
        }
    }

    /// Read a flat string encoding. Since the string carries no state flag,
    /// anything longer than [`ENCRYPTED_KEY_THRESHOLD`] is treated as sealed.
    pub fn from_encoded(encoded: &str) -> Result<Self> {
        let encoded = encoded.trim();
        if encoded.len() > ENCRYPTED_KEY_THRESHOLD {
            let bytes = ser::base64_decode(encoded)?;
            Ok(Self::Encrypted(Sealed::from_bytes(&bytes)?))
        } else {
            Ok(Self::Plaintext(PrivateKey::from_str(encoded)?))
        }
    }
}

/// Records saved before locations existed get a single blank one.
fn default_locations() -> Locations {
    Locations::new(Location::new(&mut OsRng))
}

/// An identity record.
#[derive(Debug, Clone, Serialize, Deserialize, getset::Getters, getset::MutGetters, getset::Setters)]
#[getset(get = "pub")]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// An opaque identifier handed to us by whoever stores identities
    hash: String,
    /// Our private key, if we've been initialized
    private_key: Option<IdentityKey>,
    /// The encoded public key
    public_key: String,
    /// What this identity calls itself
    name: String,
    /// Personal information
    #[getset(get = "pub", get_mut = "pub")]
    personal: PersonalInformation,
    /// Locations. Never empty.
    #[serde(default = "default_locations")]
    #[getset(get = "pub", get_mut = "pub")]
    locations: Locations,
    /// Has this identity passed KYC?
    #[getset(get = "pub", set = "pub")]
    kyc: bool,
    /// RIDL reference, -1 if the identity isn't registered
    #[getset(get = "pub", set = "pub")]
    ridl: i64,
}

impl Identity {
    /// Create an empty identity with a single location and no keys.
    pub fn placeholder<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self {
            hash: String::new(),
            private_key: None,
            public_key: String::new(),
            name: String::new(),
            personal: PersonalInformation::default(),
            locations: Locations::new(Location::new(rng)),
            kyc: false,
            ridl: -1,
        }
    }

    /// Generate a fresh keypair for this identity and bind its hash.
    pub fn initialize<R: RngCore + CryptoRng, T: Into<String>>(&mut self, rng: &mut R, hash: T) -> Result<()> {
        let secret = PrivateKey::generate(rng)?;
        self.public_key = secret.public_key().to_string();
        self.private_key = Some(IdentityKey::Plaintext(secret));
        self.hash = hash.into();
        Ok(())
    }

    /// Whether the private key is currently sealed.
    pub fn is_encrypted(&self) -> bool {
        self.private_key.as_ref().map(|k| k.is_encrypted()).unwrap_or(false)
    }

    /// Seal the private key. Does nothing if it's already sealed (or if there
    /// is no key yet).
    pub fn encrypt<R: RngCore + CryptoRng>(&mut self, rng: &mut R, key: &SecretKey) -> Result<()> {
        let sealed = match self.private_key.as_ref() {
            Some(IdentityKey::Plaintext(secret)) => key.seal(rng, secret.to_wif().as_bytes())?,
            _ => return Ok(()),
        };
        self.private_key = Some(IdentityKey::Encrypted(sealed));
        Ok(())
    }

    /// Open the private key. Does nothing if it's already open.
    pub fn decrypt(&mut self, key: &SecretKey) -> Result<()> {
        let secret = match self.private_key.as_ref() {
            Some(IdentityKey::Encrypted(sealed)) => {
                let opened = Zeroizing::new(key.open(sealed)?);
                let wif = std::str::from_utf8(opened.as_slice()).map_err(|_| Error::CryptoBadKey)?;
                PrivateKey::from_str(wif)?
            }
            _ => return Ok(()),
        };
        self.private_key = Some(IdentityKey::Plaintext(secret));
        Ok(())
    }

    /// The location we disclose when nobody picks one.
    pub fn default_location(&self) -> &Location {
        self.locations.default_location()
    }

    /// Names are 3-20 characters of `A-Z`, `a-z`, `0-9`, `_`, or `-`.
    pub fn is_valid_name(name: &str) -> bool {
        (3..=20).contains(&name.len())
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    }

    /// Set this identity's name, if it's valid.
    pub fn set_name<T: Into<String>>(&mut self, name: T) -> Result<()> {
        let name = name.into();
        if !Self::is_valid_name(&name) {
            Err(Error::IdentityNameInvalid)?;
        }
        self.name = name;
        Ok(())
    }

    /// Sign a message with the identity key. The key must be decrypted.
    pub fn sign(&self, data: &[u8]) -> Result<Signature> {
        match self.private_key.as_ref() {
            Some(IdentityKey::Plaintext(secret)) => secret.sign(data),
            Some(IdentityKey::Encrypted(_)) => Err(Error::IdentityKeyEncrypted),
            None => Err(Error::IdentityKeyMissing),
        }
    }

    /// Verify a signature made by this identity.
    pub fn verify(&self, signature: &Signature, data: &[u8]) -> Result<()> {
        if self.public_key.is_empty() {
            Err(Error::IdentityKeyMissing)?;
        }
        PublicKey::from_str(&self.public_key)?.verify(signature, data)
    }
}
