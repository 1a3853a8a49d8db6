//! Welcome to the Dossier core, the engine behind a wallet that holds a
//! person's identity and blockchain keys and hands out only what an
//! application asks for.
//!
//! An identity here is a name, a signing keypair, some personal information
//! and one or more physical locations. Applications don't get the identity.
//! Instead they send a requirement set (a list of the personal fields,
//! location fields and blockchain accounts they want) and get back a
//! projection containing exactly those fields, or nothing at all if the
//! identity can't satisfy the request.
//!
//! The other half of the system is the chain plugins. Each supported
//! blockchain validates and derives its own keys, discovers which on-chain
//! accounts a key controls, decodes signing requests into something a human
//! can read (including the contract's ricardian terms), and signs. The EOS
//! plugin is the reference implementation.
//!
//! The goals of this library are as follows:
//!
//! 1. To disclose the minimum. An application gets the fields it asked for and
//! nothing else, and never gets a private key.
//! 1. To keep key material encrypted at rest and in memory only as long as it
//! has to be.
//! 1. To make signing requests readable before anyone signs them.
//! 1. To stay out of the way of whatever storage, transport and UI sit around
//! it.

pub mod error;
pub(crate) mod util;
pub mod config;
pub mod crypto;
pub mod network;
pub mod identity;
pub mod chain;

pub use util::Timestamp;
