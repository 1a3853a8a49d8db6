use crate::{
    config::KdfConfig,
    crypto::base::{derive_secret_key, Hash},
    error::{Error, Result},
    util::ser::{Binary, BinarySecret, BinaryVec},
};
use chacha20poly1305::aead::{Aead, KeyInit};
use rand::{CryptoRng, RngCore};
use serde_derive::{Deserialize, Serialize};
use std::ops::Deref;

/// A self-describing, encrypted object that can be opened with the right key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, getset::Getters)]
#[getset(get = "pub")]
pub struct Sealed {
    /// Our heroic nonce
    nonce: SecretKeyNonce,
    /// The ciphertext
    ciphertext: BinaryVec,
}

impl Sealed {
    fn new(nonce: SecretKeyNonce, ciphertext: Vec<u8>) -> Self {
        Self {
            nonce,
            ciphertext: BinaryVec::from(ciphertext),
        }
    }

    /// Flatten into `nonce || ciphertext`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = match self.nonce() {
            SecretKeyNonce::XChaCha20Poly1305(bin) => Vec::from(&bin.deref()[..]),
        };
        out.extend_from_slice(self.ciphertext().as_slice());
        out
    }

    /// Read back a flattened `nonce || ciphertext`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() <= 24 {
            Err(Error::BadLength)?;
        }
        let nonce: [u8; 24] = bytes[0..24].try_into().map_err(|_| Error::BadLength)?;
        Ok(Self::new(SecretKeyNonce::XChaCha20Poly1305(Binary::new(nonce)), Vec::from(&bytes[24..])))
    }
}

/// A symmetric encryption key nonce
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SecretKeyNonce {
    XChaCha20Poly1305(Binary<24>),
}

/// A symmetric encryption key
#[derive(Debug, Serialize, Deserialize)]
pub enum SecretKey {
    XChaCha20Poly1305(BinarySecret<32>),
}

impl SecretKey {
    /// Create a new xchacha20poly1305 key
    pub fn new_xchacha20poly1305<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Self> {
        let mut randbuf = [0u8; 32];
        rng.fill_bytes(&mut randbuf);
        Ok(Self::XChaCha20Poly1305(BinarySecret::new(randbuf)))
    }

    /// Derive a key from a passphrase. The salt input is hashed down so any
    /// stable value (a username, an identity hash) can be used as the salt.
    pub fn from_passphrase(passphrase: &[u8], salt: &[u8], kdf: &KdfConfig) -> Result<Self> {
        let salt_hash = Hash::new_blake3(salt)?;
        derive_secret_key(passphrase, salt_hash.as_bytes(), *kdf.ops(), *kdf.mem())
    }

    /// Create a nonce for use with this secret key
    pub fn gen_nonce<R: RngCore + CryptoRng>(&self, rng: &mut R) -> Result<SecretKeyNonce> {
        match self {
            SecretKey::XChaCha20Poly1305(_) => {
                let mut randbuf = [0u8; 24];
                rng.fill_bytes(&mut randbuf);
                Ok(SecretKeyNonce::XChaCha20Poly1305(Binary::new(randbuf)))
            }
        }
    }

    /// Encrypt a value with a secret key/nonce
    pub fn seal<R: RngCore + CryptoRng>(&self, rng: &mut R, data: &[u8]) -> Result<Sealed> {
        match self {
            SecretKey::XChaCha20Poly1305(ref key) => {
                let nonce = self.gen_nonce(rng)?;
                let nonce_bin = match nonce {
                    SecretKeyNonce::XChaCha20Poly1305(ref bin) => bin.deref(),
                };
                let cipher = chacha20poly1305::XChaCha20Poly1305::new(chacha20poly1305::Key::from_slice(key.expose_secret().as_slice()));
                let enc = cipher
                    .encrypt(chacha20poly1305::XNonce::from_slice(nonce_bin.as_slice()), data)
                    .map_err(|_| Error::CryptoSealFailed)?;
                Ok(Sealed::new(nonce, enc))
            }
        }
    }

    /// Decrypt a value with a secret key/nonce
    pub fn open(&self, sealed: &Sealed) -> Result<Vec<u8>> {
        match (self, sealed.nonce()) {
            (SecretKey::XChaCha20Poly1305(ref key), SecretKeyNonce::XChaCha20Poly1305(ref nonce)) => {
                let cipher = chacha20poly1305::XChaCha20Poly1305::new(chacha20poly1305::Key::from_slice(key.expose_secret().as_slice()));
                let dec = cipher
                    .decrypt(chacha20poly1305::XNonce::from_slice(nonce.as_slice()), sealed.ciphertext().deref().as_slice())
                    .map_err(|_| Error::CryptoOpenFailed)?;
                Ok(dec)
            }
        }
    }
}

impl Clone for SecretKey {
    fn clone(&self) -> Self {
        match self {
            Self::XChaCha20Poly1305(secret) => Self::XChaCha20Poly1305(BinarySecret::new(*secret.expose_secret())),
        }
    }
}

impl AsRef<[u8]> for SecretKey {
    fn as_ref(&self) -> &[u8] {
        match self {
            Self::XChaCha20Poly1305(ref key) => key.expose_secret().as_ref(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    #[test]
    fn secretkey_xchacha20poly1305_enc_dec() {
        let mut rng = crate::util::test::rng();
        let key = SecretKey::new_xchacha20poly1305(&mut rng).unwrap();
        let val = String::from("get a job");
        let enc = key.seal(&mut rng, val.as_bytes()).unwrap();
        let dec_bytes = key.open(&enc).unwrap();
        let dec = String::from_utf8(dec_bytes).unwrap();
        assert_eq!(dec, String::from("get a job"));

        let other = SecretKey::new_xchacha20poly1305(&mut rng).unwrap();
        assert_eq!(other.open(&enc).err(), Some(Error::CryptoOpenFailed));
    }

    #[test]
    fn sealed_bytes_roundtrip() {
        let mut rng = crate::util::test::rng();
        let key = SecretKey::new_xchacha20poly1305(&mut rng).unwrap();
        let sealed = key.seal(&mut rng, b"HI HUNGRY IM DAD").unwrap();
        let bytes = sealed.to_bytes();
        assert_eq!(bytes.len(), 24 + 16 + 16);
        let sealed2 = Sealed::from_bytes(&bytes).unwrap();
        assert_eq!(sealed, sealed2);
        assert_eq!(key.open(&sealed2).unwrap().as_slice(), b"HI HUNGRY IM DAD");
        assert_eq!(Sealed::from_bytes(&bytes[0..10]).err(), Some(Error::BadLength));
    }

    #[test]
    fn secretkey_from_passphrase() {
        let kdf = KdfConfig::default();
        let key1 = SecretKey::from_passphrase(b"correct horse", b"identity-hash", &kdf).unwrap();
        let key2 = SecretKey::from_passphrase(b"correct horse", b"identity-hash", &kdf).unwrap();
        let key3 = SecretKey::from_passphrase(b"correct horse", b"other-hash", &kdf).unwrap();
        assert_eq!(key1.as_ref(), key2.as_ref());
        assert!(key1.as_ref() != key3.as_ref());
    }
}
