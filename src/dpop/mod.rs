//! Demonstrating Proof-of-Possession (`DPoP`) support (RFC 9449).
//!
//! A [`DPoPKeyProvider`] supplies the key pair that access tokens are bound
//! to, [`DPoPProof`] creates the signed proofs sent with each request, and
//! [`NonceCell`] holds the latest server-provided nonce.

mod nonce;
mod proof;

use std::sync::Arc;

use crate::crypto::PrivateKey;

pub use nonce::NonceCell;
pub use proof::{DPoPProof, DPoPProofBuilder, access_token_hash, htu};

/// A `DPoP` key pair and the key ID advertised in proof headers.
#[derive(Debug, Clone)]
pub struct DPoPKey {
    key: PrivateKey,
    key_id: String,
}

impl DPoPKey {
    /// Creates a key that advertises `key_id` as its JOSE `kid`.
    #[must_use]
    pub fn new(key: PrivateKey, key_id: impl Into<String>) -> Self {
        let key_id = key_id.into();
        Self {
            key: key.with_key_id(key_id.clone()),
            key_id,
        }
    }

    /// The private key; the public key is derived from it.
    #[must_use]
    pub fn key(&self) -> &PrivateKey {
        &self.key
    }

    /// The key ID.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// The RFC 7638 thumbprint of the public key (`jkt`).
    #[must_use]
    pub fn thumbprint(&self) -> String {
        self.key.thumbprint()
    }
}

/// Supplies `DPoP` keys.
///
/// Implementations that rotate keys must keep returning retired keys from
/// [`DPoPKeyProvider::key`] for as long as tokens bound to them may be used.
pub trait DPoPKeyProvider: Send + Sync {
    /// The key to bind new tokens to.
    fn current_key(&self) -> DPoPKey;

    /// Looks up a key by its key ID.
    fn key(&self, key_id: &str) -> Option<DPoPKey>;
}

impl<P: DPoPKeyProvider + ?Sized> DPoPKeyProvider for Arc<P> {
    fn current_key(&self) -> DPoPKey {
        self.as_ref().current_key()
    }

    fn key(&self, key_id: &str) -> Option<DPoPKey> {
        self.as_ref().key(key_id)
    }
}

/// A provider with a single, fixed key.
///
/// The key ID is the thumbprint of the public key, and the same key is
/// returned whatever key ID is requested.
#[derive(Debug, Clone)]
pub struct StaticDPoPKeyProvider {
    key: DPoPKey,
}

impl StaticDPoPKeyProvider {
    /// Creates a provider for `key`.
    #[must_use]
    pub fn new(key: PrivateKey) -> Self {
        let key_id = key.thumbprint();
        Self {
            key: DPoPKey::new(key, key_id),
        }
    }
}

impl DPoPKeyProvider for StaticDPoPKeyProvider {
    fn current_key(&self) -> DPoPKey {
        self.key.clone()
    }

    fn key(&self, _key_id: &str) -> Option<DPoPKey> {
        Some(self.key.clone())
    }
}
