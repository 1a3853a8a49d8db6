//! The crypto module contains all of our cryptographic primitives for identity
//! key generation, signing, and encrypting private key material at rest.

pub mod base;
