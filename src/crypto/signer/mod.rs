//! Cryptographic signing key traits.

mod error;
pub mod native;
mod r#trait;

pub use error::JwsSignerError;
pub use r#trait::{
    HasPublicKey, JwsAlgorithm, JwsSigningKey, SigningKeyMetadata, UnsupportedAlgorithmError,
};
