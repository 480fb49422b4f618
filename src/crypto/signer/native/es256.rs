use p256::ecdsa::{Signature, SigningKey, signature::Signer as _};
use std::borrow::Cow;
use std::convert::Infallible;
use std::sync::Arc;

use crate::crypto::signer::{HasPublicKey, JwsAlgorithm, JwsSigningKey, SigningKeyMetadata};
use crate::jwk::{self, PublicJwk};

/// The JWK curve name of P-256.
pub(crate) const CURVE: &str = "P-256";

struct Es256PrivateKeyInner {
    signing_key: SigningKey,
    jwk: PublicJwk,
}

/// An ES256 private key.
///
/// Signatures are emitted in the fixed-width `r‖s` form (32 + 32 bytes)
/// required by RFC 7518 §3.4, not ASN.1 DER.
#[derive(Clone)]
pub struct Es256PrivateKey {
    inner: Arc<Es256PrivateKeyInner>,
    key_metadata: SigningKeyMetadata,
}

impl std::fmt::Debug for Es256PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Es256PrivateKey")
            .field("key_metadata", &self.key_metadata)
            .field("jwk", &self.inner.jwk)
            .finish_non_exhaustive()
    }
}

impl From<SigningKey> for Es256PrivateKey {
    fn from(value: SigningKey) -> Self {
        let encoded_point = value.verifying_key().to_encoded_point(false);
        let key = jwk::EcPublicKey::builder()
            .crv(CURVE)
            .x(encoded_point
                .x()
                .expect("uncompressed point always has x coordinate")
                .to_vec())
            .y(encoded_point
                .y()
                .expect("uncompressed point always has y coordinate")
                .to_vec())
            .build();

        Self {
            inner: Arc::new(Es256PrivateKeyInner {
                signing_key: value,
                jwk: PublicJwk::builder().key(key).build(),
            }),
            key_metadata: SigningKeyMetadata::builder()
                .jws_algorithm(JwsAlgorithm::Es256)
                .build(),
        }
    }
}

impl Es256PrivateKey {
    /// Generates an ES256 private key in memory.
    #[must_use]
    pub fn generate() -> Self {
        SigningKey::random(&mut rand::rngs::OsRng).into()
    }

    /// Returns a copy of this key that advertises the given key ID.
    #[must_use]
    pub fn with_key_id(mut self, key_id: impl Into<String>) -> Self {
        self.key_metadata.key_id = Some(key_id.into());
        self
    }

    /// Returns the public half of the key.
    #[must_use]
    pub fn verifying_key(&self) -> p256::ecdsa::VerifyingKey {
        *self.inner.signing_key.verifying_key()
    }
}

impl JwsSigningKey for Es256PrivateKey {
    type Error = Infallible;

    fn key_metadata(&self) -> Cow<'_, SigningKeyMetadata> {
        Cow::Borrowed(&self.key_metadata)
    }

    fn sign_unchecked(&self, input: &[u8]) -> Result<Vec<u8>, Self::Error> {
        let signature: Signature = self.inner.signing_key.sign(input);
        Ok(signature.to_bytes().to_vec())
    }
}

impl HasPublicKey for Es256PrivateKey {
    fn public_key_jwk(&self) -> &jwk::PublicJwk {
        &self.inner.jwk
    }
}
