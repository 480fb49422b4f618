//! Cryptographic interfaces and definitions.
//!
//! FAPI 2.0 client authentication and `DPoP` both require JWS signatures
//! from asymmetric keys. This module provides the signing interface, native
//! RSA (PS256) and P-256 (ES256) implementations, and [`PrivateKey`], which
//! selects between them from the type of key that was loaded.

pub(crate) mod key;
pub mod signer;

pub use key::{KeyError, MINIMUM_EC_KEY_BITS, MINIMUM_RSA_KEY_BITS, PrivateKey};
