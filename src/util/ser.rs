//! Helpful serialization tools.
//!
//! Everything we store or hand out is meant to survive a trip through JSON or
//! YAML, so binary values are wrapped in types that serialize as url-safe
//! base64 strings.

use crate::error::Result;
use base64::Engine;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::ops::Deref;
use zeroize::Zeroize;

/// Convert bytes to base64
pub fn base64_encode<T: AsRef<[u8]>>(bytes: T) -> String {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes.as_ref())
}

/// Convert base64 to bytes
pub fn base64_decode<T: AsRef<[u8]>>(bytes: T) -> Result<Vec<u8>> {
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(bytes.as_ref())?)
}

fn fixed_from_base64<'de, D, const N: usize>(deserializer: D) -> std::result::Result<[u8; N], D::Error>
    where D: Deserializer<'de>,
{
    let s = <String>::deserialize(deserializer)?;
    let vec = base64_decode(s).map_err(de::Error::custom)?;
    vec.try_into().map_err(|_| de::Error::custom(String::from("bad slice length")))
}

/// A fixed-length byte array that serializes as base64.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binary<const N: usize>([u8; N]);

impl<const N: usize> Binary<N> {
    /// Wrap a byte array
    pub fn new(bytes: [u8; N]) -> Self {
        Self(bytes)
    }
}

impl<const N: usize> Deref for Binary<N> {
    type Target = [u8; N];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<const N: usize> AsRef<[u8]> for Binary<N> {
    fn as_ref(&self) -> &[u8] {
        &self.0[..]
    }
}

impl<const N: usize> Serialize for Binary<N> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
        where S: Serializer,
    {
        serializer.serialize_str(&base64_encode(&self.0[..]))
    }
}

impl<'de, const N: usize> Deserialize<'de> for Binary<N> {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
        where D: Deserializer<'de>,
    {
        Ok(Self(fixed_from_base64(deserializer)?))
    }
}

/// A fixed-length byte array holding secret material. Wiped on drop and never
/// printed.
#[derive(Clone)]
pub struct BinarySecret<const N: usize>([u8; N]);

impl<const N: usize> BinarySecret<N> {
    /// Wrap a byte array
    pub fn new(bytes: [u8; N]) -> Self {
        Self(bytes)
    }

    /// Grab the secret bytes. Try not to hold onto them.
    pub fn expose_secret(&self) -> &[u8; N] {
        &self.0
    }
}

impl<const N: usize> Drop for BinarySecret<N> {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl<const N: usize> std::fmt::Debug for BinarySecret<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BinarySecret(<{} bytes>)", N)
    }
}

impl<const N: usize> Serialize for BinarySecret<N> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
        where S: Serializer,
    {
        serializer.serialize_str(&base64_encode(&self.0[..]))
    }
}

impl<'de, const N: usize> Deserialize<'de> for BinarySecret<N> {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
        where D: Deserializer<'de>,
    {
        Ok(Self(fixed_from_base64(deserializer)?))
    }
}

/// A variable-length byte vector that serializes as base64.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BinaryVec(Vec<u8>);

impl Deref for BinaryVec {
    type Target = Vec<u8>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<u8>> for BinaryVec {
    fn from(vec: Vec<u8>) -> Self {
        Self(vec)
    }
}

impl Serialize for BinaryVec {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
        where S: Serializer,
    {
        serializer.serialize_str(&base64_encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for BinaryVec {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
        where D: Deserializer<'de>,
    {
        let s = <String>::deserialize(deserializer)?;
        Ok(Self(base64_decode(s).map_err(de::Error::custom)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_serde_base64() {
        let bin = Binary::new([1u8, 2, 3, 250]);
        let json = serde_json::to_string(&bin).unwrap();
        assert_eq!(json, "\"AQID-g\"");
        let back: Binary<4> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, bin);
        let wrong: std::result::Result<Binary<5>, _> = serde_json::from_str(&json);
        assert!(wrong.is_err());
    }

    #[test]
    fn binary_secret_hides_itself() {
        let secret = BinarySecret::new([42u8; 32]);
        let dbg = format!("{:?}", secret);
        assert!(!dbg.contains("42"));
        assert_eq!(secret.expose_secret(), &[42u8; 32]);
    }
}
