use rsa::signature::RandomizedSigner as _;
use rsa::signature::SignatureEncoding as _;
use rsa::traits::PublicKeyParts as _;
use sha2::Sha256;
use std::borrow::Cow;
use std::convert::Infallible;
use std::sync::Arc;

use crate::crypto::signer::{HasPublicKey, JwsAlgorithm, JwsSigningKey, SigningKeyMetadata};
use crate::jwk::{self, PublicJwk};

/// PSS salt length in bytes; equal to the SHA-256 output size.
const PSS_SALT_LEN: usize = 32;

struct RsaPrivateKeyInner {
    private_key: rsa::RsaPrivateKey,
    signing_key: rsa::pss::SigningKey<Sha256>,
    jwk: PublicJwk,
}

impl std::fmt::Debug for RsaPrivateKeyInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaPrivateKeyInner")
            .field("jwk", &self.jwk)
            .finish_non_exhaustive()
    }
}

/// An RSA private key, signing with PS256.
///
/// Signatures use RSASSA-PSS with SHA-256, MGF1 with SHA-256, a 32 byte salt
/// and trailer field 1, as required by RFC 7518 §3.5.
#[derive(Debug, Clone)]
pub struct RsaPrivateKey {
    inner: Arc<RsaPrivateKeyInner>,
    key_metadata: SigningKeyMetadata,
}

impl From<rsa::RsaPrivateKey> for RsaPrivateKey {
    fn from(private_key: rsa::RsaPrivateKey) -> Self {
        let public_key = jwk::RsaPublicKey::builder()
            .e(private_key.e().to_bytes_be())
            .n(private_key.n().to_bytes_be())
            .build();

        let signing_key = rsa::pss::SigningKey::<Sha256>::new_with_salt_len(
            private_key.clone(),
            PSS_SALT_LEN,
        );

        Self {
            inner: Arc::new(RsaPrivateKeyInner {
                private_key,
                signing_key,
                jwk: PublicJwk::builder().key(public_key).build(),
            }),
            key_metadata: SigningKeyMetadata::builder()
                .jws_algorithm(JwsAlgorithm::Ps256)
                .build(),
        }
    }
}

impl RsaPrivateKey {
    /// Generates a private key with a modulus of the given size.
    ///
    /// # Errors
    ///
    /// Returns an error if the size is not usable for RSA.
    pub fn generate(bits: usize) -> Result<Self, rsa::Error> {
        Ok(rsa::RsaPrivateKey::new(&mut rand::thread_rng(), bits)?.into())
    }

    /// Returns a copy of this key that advertises the given key ID.
    #[must_use]
    pub fn with_key_id(mut self, key_id: impl Into<String>) -> Self {
        self.key_metadata.key_id = Some(key_id.into());
        self
    }

    /// The size of the modulus in bits.
    #[must_use]
    pub fn key_size_bits(&self) -> usize {
        self.inner.private_key.n().bits()
    }

    /// Returns the public half of the key.
    #[must_use]
    pub fn public_key(&self) -> rsa::RsaPublicKey {
        self.inner.private_key.to_public_key()
    }
}

impl JwsSigningKey for RsaPrivateKey {
    type Error = Infallible;

    fn key_metadata(&self) -> Cow<'_, SigningKeyMetadata> {
        Cow::Borrowed(&self.key_metadata)
    }

    fn sign_unchecked(&self, input: &[u8]) -> Result<Vec<u8>, Self::Error> {
        Ok(self
            .inner
            .signing_key
            .sign_with_rng(&mut rand::thread_rng(), input)
            .to_vec())
    }
}

impl HasPublicKey for RsaPrivateKey {
    fn public_key_jwk(&self) -> &jwk::PublicJwk {
        &self.inner.jwk
    }
}
