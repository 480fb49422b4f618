//! Signing key traits.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use bon::Builder;
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::Error;
use crate::crypto::signer::error::{MismatchedKeyMetadataSnafu, UnderlyingSnafu};
use crate::jwk::PublicJwk;

/// JWS algorithms that can be produced by this library.
///
/// FAPI 2.0 only permits PS256, ES256 and `EdDSA`; of these, the RSA and
/// P-256 variants are supported. The algorithm is always derived from the
/// key type and is never chosen by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JwsAlgorithm {
    /// RSASSA-PSS using SHA-256 and MGF1 with SHA-256, 32 byte salt.
    #[serde(rename = "PS256")]
    Ps256,
    /// ECDSA using P-256 and SHA-256, with the signature as `r‖s`.
    #[serde(rename = "ES256")]
    Es256,
}

impl JwsAlgorithm {
    /// Returns the identifier used in the JWS `alg` header parameter.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            JwsAlgorithm::Ps256 => "PS256",
            JwsAlgorithm::Es256 => "ES256",
        }
    }
}

impl AsRef<str> for JwsAlgorithm {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for JwsAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The algorithm identifier was not one of the supported JWS algorithms.
#[derive(Debug, Snafu)]
#[snafu(display("Unsupported JWS algorithm: {alg}"))]
pub struct UnsupportedAlgorithmError {
    /// The rejected identifier.
    pub alg: String,
}

impl FromStr for JwsAlgorithm {
    type Err = UnsupportedAlgorithmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PS256" => Ok(JwsAlgorithm::Ps256),
            "ES256" => Ok(JwsAlgorithm::Es256),
            other => UnsupportedAlgorithmSnafu { alg: other }.fail(),
        }
    }
}

/// Key metadata.
#[derive(Debug, Clone, Builder, PartialEq, Eq)]
pub struct SigningKeyMetadata {
    /// Returns the JWS algorithm.
    ///
    /// This is specifically for use in the JWT `alg` header parameter.
    pub jws_algorithm: JwsAlgorithm,
    /// Returns the key ID of the signer.
    ///
    /// This is specifically for use in the JWT `kid` header parameter.
    #[builder(into)]
    pub key_id: Option<String>,
}

/// Trait for signers that produce RFC 7515 (JWS) / RFC 7518 (JWA) compatible signatures.
pub trait JwsSigningKey: Send + Sync {
    /// The error type returned by this signer's operations.
    type Error: Error + 'static;

    /// Returns the key metadata for this signer.
    fn key_metadata(&self) -> Cow<'_, SigningKeyMetadata>;

    /// Signs the given input data and returns the raw signature bytes.
    ///
    /// This should not be called directly, as it does not verify that the metadata
    /// match the values signed.
    ///
    /// # Errors
    ///
    /// Returns an error if the signing operation fails.
    fn sign_unchecked(&self, input: &[u8]) -> Result<Vec<u8>, Self::Error>;

    /// Signs the given input data, after verifying the caller's expected key metadata.
    ///
    /// The metadata must match the values signed, otherwise the header of the
    /// JWS would advertise an algorithm or key that did not produce the signature.
    ///
    /// # Errors
    ///
    /// Returns [`super::JwsSignerError::MismatchedKeyMetadata`] if the key metadata is mismatched, or
    /// [`super::JwsSignerError::UnderlyingError`] if the signing operation fails.
    fn sign(
        &self,
        input: &[u8],
        key_metadata: &SigningKeyMetadata,
    ) -> Result<Vec<u8>, super::JwsSignerError<Self::Error>> {
        if &*self.key_metadata() == key_metadata {
            self.sign_unchecked(input).context(UnderlyingSnafu)
        } else {
            MismatchedKeyMetadataSnafu.fail()
        }
    }
}

/// Trait for asymmetric keys that provides its public key in JWK (RFC 7517) format.
pub trait HasPublicKey: Send + Sync {
    /// Returns the public key for this asymmetric key as a JSON Web Key.
    fn public_key_jwk(&self) -> &PublicJwk;
}

#[cfg(test)]
mod tests {
    use std::{borrow::Cow, convert::Infallible};

    use super::*;
    use crate::crypto::signer::JwsSignerError;

    #[derive(Debug, Clone)]
    struct MockSigningKey {
        key_metadata: SigningKeyMetadata,
    }

    impl MockSigningKey {
        pub fn new() -> Self {
            Self {
                key_metadata: SigningKeyMetadata::builder()
                    .jws_algorithm(JwsAlgorithm::Es256)
                    .build(),
            }
        }
    }

    impl JwsSigningKey for MockSigningKey {
        type Error = Infallible;

        fn key_metadata(&self) -> Cow<'_, SigningKeyMetadata> {
            Cow::Borrowed(&self.key_metadata)
        }

        fn sign_unchecked(&self, _input: &[u8]) -> Result<Vec<u8>, Self::Error> {
            Ok(vec![])
        }
    }

    #[test]
    fn test_metadata_no_mismatch_succeeds() {
        MockSigningKey::new()
            .sign(
                &[],
                &SigningKeyMetadata {
                    jws_algorithm: JwsAlgorithm::Es256,
                    key_id: None,
                },
            )
            .expect("no mismatch");
    }

    #[test]
    fn test_metadata_different_alg_fails() {
        let result = MockSigningKey::new().sign(
            &[],
            &SigningKeyMetadata::builder()
                .jws_algorithm(JwsAlgorithm::Ps256)
                .build(),
        );

        assert!(matches!(result, Err(JwsSignerError::MismatchedKeyMetadata)));
    }

    #[test]
    fn test_metadata_different_kid_fails() {
        let result = MockSigningKey::new().sign(
            &[],
            &SigningKeyMetadata::builder()
                .jws_algorithm(JwsAlgorithm::Es256)
                .key_id("key-id")
                .build(),
        );

        assert!(matches!(result, Err(JwsSignerError::MismatchedKeyMetadata)));
    }

    #[test]
    fn test_algorithm_round_trips_through_its_identifier() {
        assert_eq!("PS256".parse::<JwsAlgorithm>().unwrap(), JwsAlgorithm::Ps256);
        assert_eq!("ES256".parse::<JwsAlgorithm>().unwrap(), JwsAlgorithm::Es256);
        assert!("RS256".parse::<JwsAlgorithm>().is_err());
        assert_eq!(JwsAlgorithm::Ps256.to_string(), "PS256");
    }
}
