//! The identity module defines the identity record and everything needed to
//! selectively disclose parts of it.
//!
//! An identity is some personal information, one or more locations, and a
//! keypair. Applications ask for a subset of that data via a
//! [requirement set](crate::identity::requirements::RequirementSet), and the
//! [disclosure](crate::identity::disclosure) functions decide whether the
//! identity can satisfy it and produce exactly the fields asked for.

pub mod fields;
pub mod requirements;
pub mod info;
pub mod identity;
pub mod disclosure;

pub use fields::*;
pub use requirements::*;
pub use info::*;
pub use identity::*;
pub use disclosure::*;
