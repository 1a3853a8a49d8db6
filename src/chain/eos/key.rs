//! EOS keys and signatures (secp256k1).
//!
//! Text encodings:
//!
//! - private keys are WIF: `base58(0x80 || key || sha256d(0x80 || key)[..4])`,
//!   or `PVT_K1_` + `base58(key || ripemd160(key || "K1")[..4])`
//! - public keys are `EOS` + `base58(point || ripemd160(point)[..4])`, or
//!   `PUB_K1_` + `base58(point || ripemd160(point || "K1")[..4])`
//! - signatures are `SIG_K1_` + `base58(sig || ripemd160(sig || "K1")[..4])`
//!   where `sig` is the recovery byte followed by `r || s`

use crate::{
    chain::CryptoRngCore,
    error::{Error, Result},
};
use k256::ecdsa::{RecoveryId, SigningKey, VerifyingKey};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};
use std::str::FromStr;
use zeroize::Zeroizing;

const WIF_VERSION: u8 = 0x80;
const LEGACY_PUBKEY_PREFIX: &str = "EOS";
const PUBKEY_K1_PREFIX: &str = "PUB_K1_";
const PRIVKEY_K1_PREFIX: &str = "PVT_K1_";
const SIG_K1_PREFIX: &str = "SIG_K1_";

/// Checksum for the `_K1_` style encodings.
fn ripemd_checksum(data: &[u8], suffix: &[u8]) -> [u8; 4] {
    let mut hasher = Ripemd160::new();
    hasher.update(data);
    hasher.update(suffix);
    let digest = hasher.finalize();
    let mut out = [0u8; 4];
    out.copy_from_slice(&digest[0..4]);
    out
}

fn double_sha256_checksum(data: &[u8]) -> [u8; 4] {
    let digest = Sha256::digest(Sha256::digest(data));
    let mut out = [0u8; 4];
    out.copy_from_slice(&digest[0..4]);
    out
}

/// Decode base58 and split off (and check) a 4 byte checksum.
fn decode_checked(encoded: &str, expected_len: usize, checksum: impl Fn(&[u8]) -> [u8; 4]) -> Result<Zeroizing<Vec<u8>>> {
    let bytes = Zeroizing::new(bs58::decode(encoded).into_vec()?);
    if bytes.len() != expected_len + 4 {
        Err(Error::BadLength)?;
    }
    let (body, check) = bytes.split_at(expected_len);
    if checksum(body) != check {
        Err(Error::CryptoBadKey)?;
    }
    Ok(Zeroizing::new(body.to_vec()))
}

/// `_K1_` style encoding of raw key material, for curves we only display.
pub(super) fn encode_with_suffix(body: &[u8], suffix: &[u8]) -> String {
    encode_checked(body, ripemd_checksum(body, suffix))
}

fn encode_checked(body: &[u8], checksum: [u8; 4]) -> String {
    let mut bytes = Zeroizing::new(Vec::with_capacity(body.len() + 4));
    bytes.extend_from_slice(body);
    bytes.extend_from_slice(&checksum);
    bs58::encode(bytes.as_slice()).into_string()
}

/// An EOS private key.
#[derive(Clone)]
pub struct PrivateKey(SigningKey);

impl PrivateKey {
    /// Create a key from raw scalar bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 32 {
            Err(Error::BadLength)?;
        }
        SigningKey::from_slice(bytes)
            .map(Self)
            .map_err(|_| Error::CryptoBadKey)
    }

    /// Generate a new random key.
    pub fn generate(rng: &mut dyn CryptoRngCore) -> Result<Self> {
        // a random 32 bytes is outside the curve order roughly never, but we
        // don't loop forever on a broken rng either.
        for _ in 0..16 {
            let mut bytes = Zeroizing::new([0u8; 32]);
            rng.fill_bytes(&mut bytes[..]);
            if let Ok(key) = Self::from_bytes(&bytes[..]) {
                return Ok(key);
            }
        }
        Err(Error::KeygenFailed)
    }

    /// Raw scalar bytes.
    pub fn to_bytes(&self) -> Zeroizing<[u8; 32]> {
        let mut out = Zeroizing::new([0u8; 32]);
        out.copy_from_slice(self.0.to_bytes().as_slice());
        out
    }

    /// Legacy WIF encoding.
    pub fn to_wif(&self) -> Zeroizing<String> {
        let mut body = Zeroizing::new(Vec::with_capacity(33));
        body.push(WIF_VERSION);
        body.extend_from_slice(&self.to_bytes()[..]);
        let checksum = double_sha256_checksum(&body);
        Zeroizing::new(encode_checked(&body, checksum))
    }

    /// The matching public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0.verifying_key().clone())
    }

    /// Sign the sha256 of `data`.
    pub fn sign(&self, data: &[u8]) -> Result<Signature> {
        let digest = Sha256::digest(data);
        self.sign_hash(digest.as_slice())
    }

    /// Sign a 32 byte digest as-is.
    pub fn sign_hash(&self, digest: &[u8]) -> Result<Signature> {
        if digest.len() != 32 {
            Err(Error::BadLength)?;
        }
        let (sig, recid) = self.0.sign_prehash_recoverable(digest)
            .map_err(|_| Error::CryptoSignatureFailed)?;
        Ok(Signature { sig, recid })
    }
}

impl FromStr for PrivateKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(rest) = s.strip_prefix(PRIVKEY_K1_PREFIX) {
            let body = decode_checked(rest, 32, |b| ripemd_checksum(b, b"K1"))?;
            return Self::from_bytes(&body);
        }
        let body = decode_checked(s, 33, double_sha256_checksum)?;
        if body[0] != WIF_VERSION {
            Err(Error::CryptoBadKey)?;
        }
        Self::from_bytes(&body[1..])
    }
}

impl serde::Serialize for PrivateKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_wif())
    }
}

impl<'de> serde::Deserialize<'de> for PrivateKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let encoded = Zeroizing::new(<String as serde::Deserialize>::deserialize(deserializer)?);
        Self::from_str(&encoded).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PrivateKey({})", self.public_key())
    }
}

/// An EOS public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey(VerifyingKey);

impl PublicKey {
    /// Read a compressed SEC1 point.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 33 {
            Err(Error::BadLength)?;
        }
        VerifyingKey::from_sec1_bytes(bytes)
            .map(Self)
            .map_err(|_| Error::CryptoBadKey)
    }

    /// The compressed SEC1 point.
    pub fn to_bytes(&self) -> [u8; 33] {
        let point = self.0.to_encoded_point(true);
        let mut out = [0u8; 33];
        out.copy_from_slice(point.as_bytes());
        out
    }

    /// Check that this key signed the sha256 of `data`.
    pub fn verify(&self, signature: &Signature, data: &[u8]) -> Result<()> {
        let digest = Sha256::digest(data);
        if &signature.recover(digest.as_slice())? != self {
            Err(Error::CryptoSignatureVerificationFailed)?;
        }
        Ok(())
    }

    /// `PUB_K1_` encoding.
    pub fn to_k1_string(&self) -> String {
        let bytes = self.to_bytes();
        format!("{}{}", PUBKEY_K1_PREFIX, encode_checked(&bytes, ripemd_checksum(&bytes, b"K1")))
    }
}

impl FromStr for PublicKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let body = if let Some(rest) = s.strip_prefix(PUBKEY_K1_PREFIX) {
            decode_checked(rest, 33, |b| ripemd_checksum(b, b"K1"))?
        } else if let Some(rest) = s.strip_prefix(LEGACY_PUBKEY_PREFIX) {
            decode_checked(rest, 33, |b| ripemd_checksum(b, b""))?
        } else {
            Err(Error::CryptoBadKey)?
        };
        Self::from_bytes(&body)
    }
}

impl std::fmt::Display for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bytes = self.to_bytes();
        write!(f, "{}{}", LEGACY_PUBKEY_PREFIX, encode_checked(&bytes, ripemd_checksum(&bytes, b"")))
    }
}

/// A recoverable signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    sig: k256::ecdsa::Signature,
    recid: RecoveryId,
}

impl Signature {
    /// `recovery byte || r || s`. The recovery byte is offset by 27, plus 4
    /// for compressed keys.
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[0] = self.recid.to_byte() + 31;
        out[1..].copy_from_slice(self.sig.to_bytes().as_slice());
        out
    }

    /// Read `recovery byte || r || s`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 65 {
            Err(Error::BadLength)?;
        }
        let recid = bytes[0].checked_sub(31)
            .and_then(RecoveryId::from_byte)
            .ok_or(Error::CryptoBadKey)?;
        let sig = k256::ecdsa::Signature::from_slice(&bytes[1..]).map_err(|_| Error::CryptoBadKey)?;
        Ok(Self { sig, recid })
    }

    /// Figure out which key signed a digest.
    pub fn recover(&self, digest: &[u8]) -> Result<PublicKey> {
        VerifyingKey::recover_from_prehash(digest, &self.sig, self.recid)
            .map(PublicKey)
            .map_err(|_| Error::CryptoSignatureVerificationFailed)
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bytes = self.to_bytes();
        write!(f, "{}{}", SIG_K1_PREFIX, encode_checked(&bytes, ripemd_checksum(&bytes, b"K1")))
    }
}

impl FromStr for Signature {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let rest = s.trim().strip_prefix(SIG_K1_PREFIX).ok_or(Error::CryptoBadKey)?;
        let body = decode_checked(rest, 65, |b| ripemd_checksum(b, b"K1"))?;
        Self::from_bytes(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::signature::hazmat::PrehashVerifier;

    // the well-known eosio development key
    const DEV_PRIV: &str = "5KQwrPbwdL6PhXujxW37FSSQZ1JiwsST4cqQzDeyXtP79zkvFD3";
    const DEV_PUB: &str = "EOS6MRyAjQq8ud7hVNYcfnVPJqcVpscN5So8BhtHuGYqET5GDW5CV";

    #[test]
    fn key_wif_to_public() {
        let key = PrivateKey::from_str(DEV_PRIV).unwrap();
        assert_eq!(key.public_key().to_string(), DEV_PUB);
        assert_eq!(key.to_wif().as_str(), DEV_PRIV);
        let pubkey = PublicKey::from_str(DEV_PUB).unwrap();
        assert_eq!(pubkey, key.public_key());
        let k1 = pubkey.to_k1_string();
        assert!(k1.starts_with("PUB_K1_"));
        assert_eq!(PublicKey::from_str(&k1).unwrap(), pubkey);
    }

    #[test]
    fn key_bad_encodings() {
        // flip the last char, breaking the checksum
        let broken = format!("{}4", &DEV_PRIV[..DEV_PRIV.len() - 1]);
        assert!(PrivateKey::from_str(&broken).is_err());
        let broken = format!("{}D", &DEV_PUB[..DEV_PUB.len() - 1]);
        assert!(PublicKey::from_str(&broken).is_err());
        assert_eq!(PublicKey::from_str("BTC6MRyAjQq8ud7hVNYcfnVPJqcVpscN5So8BhtHuGYqET5GDW5CV").err(), Some(Error::CryptoBadKey));
        assert!(PrivateKey::from_str("hello").is_err());
        assert!(PrivateKey::from_str("0OIl").is_err());
        assert_eq!(PrivateKey::from_bytes(&[0u8; 32]).err(), Some(Error::CryptoBadKey));
        assert_eq!(PrivateKey::from_bytes(&[1u8; 31]).err(), Some(Error::BadLength));
    }

    #[test]
    fn key_generate() {
        let mut rng = crate::util::test::rng();
        let key1 = PrivateKey::generate(&mut rng).unwrap();
        let key2 = PrivateKey::generate(&mut rng).unwrap();
        assert!(key1.public_key() != key2.public_key());
        let wif = key1.to_wif();
        assert!(wif.starts_with('5'));
        let key1_again = PrivateKey::from_str(&wif).unwrap();
        assert_eq!(key1_again.public_key(), key1.public_key());
    }

    #[test]
    fn key_sign_recover_verify() {
        let key = PrivateKey::from_str(DEV_PRIV).unwrap();
        let data = b"some transaction bytes";
        let sig = key.sign(data).unwrap();
        let digest = Sha256::digest(data);
        assert_eq!(sig.recover(digest.as_slice()).unwrap(), key.public_key());
        key.public_key().0.verify_prehash(digest.as_slice(), &sig.sig).unwrap();

        let encoded = sig.to_string();
        assert!(encoded.starts_with("SIG_K1_"));
        let sig2 = Signature::from_str(&encoded).unwrap();
        assert_eq!(sig2, sig);

        let sig_hash = key.sign_hash(digest.as_slice()).unwrap();
        assert_eq!(sig_hash.recover(digest.as_slice()).unwrap(), key.public_key());
        assert_eq!(key.sign_hash(b"too short").err(), Some(Error::BadLength));

        key.public_key().verify(&sig, data).unwrap();
        assert_eq!(key.public_key().verify(&sig, b"other bytes").err(), Some(Error::CryptoSignatureVerificationFailed));
        let mut rng = crate::util::test::rng();
        let stranger = PrivateKey::generate(&mut rng).unwrap().public_key();
        assert_eq!(stranger.verify(&sig, data).err(), Some(Error::CryptoSignatureVerificationFailed));
    }

    #[test]
    fn key_serde_as_wif() {
        let key = PrivateKey::from_str(DEV_PRIV).unwrap();
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, format!("\"{}\"", DEV_PRIV));
        let key2: PrivateKey = serde_json::from_str(&json).unwrap();
        assert_eq!(key2.public_key(), key.public_key());
        assert!(serde_json::from_str::<PrivateKey>("\"nope\"").is_err());
    }
}
