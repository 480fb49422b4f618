use std::borrow::Cow;
use std::convert::Infallible;

use p12_keystore::{KeyStore, KeyStoreEntry};
use p256::pkcs8::DecodePrivateKey as _;
use rsa::pkcs1::DecodeRsaPrivateKey as _;
use rsa::pkcs8::der::Decode as _;
use rsa::pkcs8::{ObjectIdentifier, PrivateKeyInfo, SecretDocument};
use secrecy::{ExposeSecret as _, SecretString};
use snafu::prelude::*;

use crate::crypto::signer::native::{Es256PrivateKey, RsaPrivateKey};
use crate::crypto::signer::{HasPublicKey, JwsAlgorithm, JwsSigningKey, SigningKeyMetadata};
use crate::jwk::{PrivateJwk, PublicJwk};

/// Minimum modulus size accepted for RSA keys.
pub const MINIMUM_RSA_KEY_BITS: usize = 2048;
/// Minimum field size accepted for elliptic curve keys.
pub const MINIMUM_EC_KEY_BITS: usize = 224;

const P256_FIELD_BITS: usize = 256;

const RSA_ENCRYPTION: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
const ID_EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
const PRIME256V1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");

const PKCS1_PEM_LABEL: &str = "RSA PRIVATE KEY";
const PKCS8_PEM_LABEL: &str = "PRIVATE KEY";

/// Errors raised when importing, generating or validating a private key.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum KeyError {
    /// The input is not a valid PEM document.
    #[snafu(display("Failed to decode PEM document"))]
    Pem {
        /// The underlying error.
        source: rsa::pkcs8::der::Error,
    },
    /// The PEM document holds something other than a private key.
    #[snafu(display("Unsupported PEM label: {label}"))]
    UnsupportedPemLabel {
        /// The label found.
        label: String,
    },
    /// The input is not a valid PKCS#8 private key.
    #[snafu(display("Failed to decode PKCS#8 private key"))]
    Pkcs8 {
        /// The underlying error.
        source: rsa::pkcs8::Error,
    },
    /// The input is not a valid PKCS#1 RSA private key.
    #[snafu(display("Failed to decode PKCS#1 RSA private key"))]
    Pkcs1 {
        /// The underlying error.
        source: rsa::pkcs1::Error,
    },
    /// The PKCS#12 keystore could not be decrypted or decoded.
    #[snafu(display("Failed to read PKCS#12 keystore"))]
    Pkcs12 {
        /// The underlying error.
        source: p12_keystore::error::Error,
    },
    /// The PKCS#12 keystore has no private key under the alias.
    #[snafu(display("No private key with alias {alias} in PKCS#12 keystore"))]
    Pkcs12AliasNotFound {
        /// The alias looked up.
        alias: String,
    },
    /// The key is neither RSA nor EC.
    #[snafu(display("Key algorithm must be RSA or EC, but was: {algorithm}"))]
    UnsupportedAlgorithm {
        /// The algorithm identifier found.
        algorithm: String,
    },
    /// The key is an EC key on a curve other than P-256.
    #[snafu(display("Unsupported elliptic curve: {curve}"))]
    UnsupportedCurve {
        /// The curve identifier found.
        curve: String,
    },
    /// The key is smaller than the minimum allowed size.
    #[snafu(display(
        "{kind} keys must have a minimum length of {minimum} bits, but key length was: {bits}"
    ))]
    KeyTooSmall {
        /// `RSA` or `Elliptic curve`.
        kind: &'static str,
        /// The size of the key.
        bits: usize,
        /// The minimum size.
        minimum: usize,
    },
    /// The RSA key material is inconsistent or could not be generated.
    #[snafu(display("Invalid RSA key"))]
    InvalidRsaKey {
        /// The underlying error.
        source: rsa::Error,
    },
    /// The EC private scalar is not valid for P-256.
    #[snafu(display("Invalid EC key"))]
    InvalidEcKey {
        /// The underlying error.
        source: p256::ecdsa::Error,
    },
    /// The JWK could not be parsed.
    #[snafu(display("Failed to parse JWK"))]
    InvalidJwk {
        /// The underlying error.
        source: serde_json::Error,
    },
    /// The JWK public members do not belong to its private members.
    #[snafu(display("JWK public members do not match the private key"))]
    InconsistentJwk,
}

impl crate::Error for KeyError {
    fn is_retryable(&self) -> bool {
        false
    }
}

/// A private key usable for FAPI 2.0 signatures.
///
/// The JWS algorithm is fixed by the key type: RSA keys sign with PS256 and
/// P-256 keys sign with ES256.
#[derive(Debug, Clone)]
pub enum PrivateKey {
    /// An RSA key.
    Rsa(RsaPrivateKey),
    /// A P-256 key.
    Es256(Es256PrivateKey),
}

impl From<RsaPrivateKey> for PrivateKey {
    fn from(value: RsaPrivateKey) -> Self {
        Self::Rsa(value)
    }
}

impl From<Es256PrivateKey> for PrivateKey {
    fn from(value: Es256PrivateKey) -> Self {
        Self::Es256(value)
    }
}

impl PrivateKey {
    /// Decodes a PKCS#8 DER encoded private key.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not PKCS#8, or holds a key that is
    /// neither RSA nor EC P-256.
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self, KeyError> {
        let info = PrivateKeyInfo::from_der(der)
            .map_err(rsa::pkcs8::Error::from)
            .context(Pkcs8Snafu)?;
        let oid = info.algorithm.oid;

        if oid == RSA_ENCRYPTION {
            let key = rsa::RsaPrivateKey::from_pkcs8_der(der).context(Pkcs8Snafu)?;
            return Ok(RsaPrivateKey::from(key).into());
        }

        if oid == ID_EC_PUBLIC_KEY {
            let curve = info.algorithm.parameters_oid().ok();
            ensure!(
                curve == Some(PRIME256V1),
                UnsupportedCurveSnafu {
                    curve: curve.map_or_else(|| "<none>".to_owned(), |c| c.to_string()),
                }
            );
            let key = p256::ecdsa::SigningKey::from_pkcs8_der(der).context(Pkcs8Snafu)?;
            return Ok(Es256PrivateKey::from(key).into());
        }

        UnsupportedAlgorithmSnafu {
            algorithm: oid.to_string(),
        }
        .fail()
    }

    /// Decodes a PKCS#8 PEM encoded private key (`BEGIN PRIVATE KEY`).
    ///
    /// # Errors
    ///
    /// Returns an error if the PEM document cannot be decoded or does not
    /// contain a supported key.
    pub fn from_pkcs8_pem(pem: &str) -> Result<Self, KeyError> {
        let (label, document) = SecretDocument::from_pem(pem).context(PemSnafu)?;
        ensure!(
            label == PKCS8_PEM_LABEL,
            UnsupportedPemLabelSnafu { label }
        );
        Self::from_pkcs8_der(document.as_bytes())
    }

    /// Decodes a PKCS#1 PEM encoded RSA private key (`BEGIN RSA PRIVATE KEY`).
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a PKCS#1 RSA key.
    pub fn from_pkcs1_pem(pem: &str) -> Result<Self, KeyError> {
        let key = rsa::RsaPrivateKey::from_pkcs1_pem(pem).context(Pkcs1Snafu)?;
        Ok(RsaPrivateKey::from(key).into())
    }

    /// Decodes a private key from a JWK JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if the JWK is malformed, of an unsupported type, or
    /// internally inconsistent.
    pub fn from_jwk_json(json: &str) -> Result<Self, KeyError> {
        PrivateJwk::from_json(json)?.into_private_key()
    }

    /// Extracts the private key stored under `alias` in a PKCS#12 keystore.
    ///
    /// The same password protects the keystore and the key.
    ///
    /// # Errors
    ///
    /// Returns an error if the keystore cannot be decrypted, has no private
    /// key under `alias`, or holds an unsupported key.
    pub fn from_pkcs12(
        bytes: &[u8],
        alias: &str,
        password: &SecretString,
    ) -> Result<Self, KeyError> {
        let keystore =
            KeyStore::from_pkcs12(bytes, password.expose_secret()).context(Pkcs12Snafu)?;
        match keystore.entry(alias) {
            Some(KeyStoreEntry::PrivateKeyChain(chain)) => Self::from_pkcs8_der(chain.key()),
            _ => Pkcs12AliasNotFoundSnafu { alias }.fail(),
        }
    }

    /// Loads a private key, detecting PKCS#1 PEM, PKCS#8 PEM or PKCS#8 DER.
    ///
    /// Input that is not recognisable PEM is treated as DER.
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be decoded in the detected format.
    pub fn load(bytes: &[u8]) -> Result<Self, KeyError> {
        if let Ok(text) = std::str::from_utf8(bytes) {
            if text.contains(&format!("-----BEGIN {PKCS1_PEM_LABEL}-----")) {
                return Self::from_pkcs1_pem(text);
            }
            if text.contains(&format!("-----BEGIN {PKCS8_PEM_LABEL}-----")) {
                return Self::from_pkcs8_pem(text);
            }
        }

        Self::from_pkcs8_der(bytes)
    }

    /// Generates an RSA key of the given size.
    ///
    /// # Errors
    ///
    /// Returns an error if the size is not usable for RSA.
    pub fn generate_rsa(bits: usize) -> Result<Self, KeyError> {
        Ok(RsaPrivateKey::generate(bits)
            .context(InvalidRsaKeySnafu)?
            .into())
    }

    /// Generates a P-256 key.
    #[must_use]
    pub fn generate_es256() -> Self {
        Es256PrivateKey::generate().into()
    }

    /// The JWS algorithm this key signs with.
    #[must_use]
    pub fn algorithm(&self) -> JwsAlgorithm {
        match self {
            PrivateKey::Rsa(_) => JwsAlgorithm::Ps256,
            PrivateKey::Es256(_) => JwsAlgorithm::Es256,
        }
    }

    /// The key size: modulus bits for RSA, field bits for EC.
    #[must_use]
    pub fn key_size_bits(&self) -> usize {
        match self {
            PrivateKey::Rsa(key) => key.key_size_bits(),
            PrivateKey::Es256(_) => P256_FIELD_BITS,
        }
    }

    /// Returns a copy of this key that advertises the given key ID.
    #[must_use]
    pub fn with_key_id(self, key_id: impl Into<String>) -> Self {
        match self {
            PrivateKey::Rsa(key) => key.with_key_id(key_id).into(),
            PrivateKey::Es256(key) => key.with_key_id(key_id).into(),
        }
    }

    /// Checks the key meets the minimum size for FAPI 2.0.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::KeyTooSmall`] for RSA keys under 2048 bits or
    /// EC keys under 224 bits.
    pub fn validate(&self) -> Result<(), KeyError> {
        let bits = self.key_size_bits();
        let (kind, minimum) = match self {
            PrivateKey::Rsa(_) => ("RSA", MINIMUM_RSA_KEY_BITS),
            PrivateKey::Es256(_) => ("Elliptic curve", MINIMUM_EC_KEY_BITS),
        };
        ensure!(
            bits >= minimum,
            KeyTooSmallSnafu {
                kind,
                bits,
                minimum
            }
        );
        Ok(())
    }

    /// The RFC 7638 thumbprint of the public key.
    #[must_use]
    pub fn thumbprint(&self) -> String {
        PublicJwk::from_key(self).thumbprint()
    }
}

impl JwsSigningKey for PrivateKey {
    type Error = Infallible;

    fn key_metadata(&self) -> Cow<'_, SigningKeyMetadata> {
        match self {
            PrivateKey::Rsa(key) => key.key_metadata(),
            PrivateKey::Es256(key) => key.key_metadata(),
        }
    }

    fn sign_unchecked(&self, input: &[u8]) -> Result<Vec<u8>, Self::Error> {
        match self {
            PrivateKey::Rsa(key) => key.sign_unchecked(input),
            PrivateKey::Es256(key) => key.sign_unchecked(input),
        }
    }
}

impl HasPublicKey for PrivateKey {
    fn public_key_jwk(&self) -> &PublicJwk {
        match self {
            PrivateKey::Rsa(key) => key.public_key_jwk(),
            PrivateKey::Es256(key) => key.public_key_jwk(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSA_2048_PKCS8: &str = include_str!("../../tests/fixtures/rsa-2048-pkcs8.pem");
    const RSA_2048_PKCS8_DER: &[u8] = include_bytes!("../../tests/fixtures/rsa-2048-pkcs8.der");
    const RSA_2048_PKCS12: &[u8] = include_bytes!("../../tests/fixtures/rsa-2048.p12");
    const RSA_2048_PKCS1: &str = include_str!("../../tests/fixtures/rsa-2048-pkcs1.pem");
    const RSA_1024_PKCS8: &str = include_str!("../../tests/fixtures/rsa-1024-pkcs8.pem");
    const EC_P256_PKCS8: &str = include_str!("../../tests/fixtures/ec-p256-pkcs8.pem");
    const EC_P384_PKCS8: &str = include_str!("../../tests/fixtures/ec-p384-pkcs8.pem");
    const ED25519_PKCS8: &str = include_str!("../../tests/fixtures/ed25519-pkcs8.pem");

    const RSA_THUMBPRINT: &str = "5en7m16L2yXAKWjjtAtgPrcrssMbG7pcbQMKTLGFhOM";
    const EC_THUMBPRINT: &str = "PWUtF2Ty3vMwGtWcpwJH_-b4k_43BZ3TN5XMkSkAw40";

    #[test]
    fn test_all_rsa_encodings_load_the_same_key() {
        let pem = PrivateKey::load(RSA_2048_PKCS8.as_bytes()).unwrap();
        let der = PrivateKey::load(RSA_2048_PKCS8_DER).unwrap();
        let pkcs1 = PrivateKey::load(RSA_2048_PKCS1.as_bytes()).unwrap();

        assert_eq!(pem.algorithm(), JwsAlgorithm::Ps256);
        assert_eq!(pem.thumbprint(), RSA_THUMBPRINT);
        assert_eq!(der.thumbprint(), RSA_THUMBPRINT);
        assert_eq!(pkcs1.thumbprint(), RSA_THUMBPRINT);
        assert!(pem.validate().is_ok());
    }

    #[test]
    fn test_pkcs12_keystore_loads_key_by_alias() {
        let password = SecretString::from("Password1");
        let key = PrivateKey::from_pkcs12(RSA_2048_PKCS12, "mykeyalias", &password).unwrap();

        assert_eq!(key.algorithm(), JwsAlgorithm::Ps256);
        assert_eq!(key.thumbprint(), RSA_THUMBPRINT);
    }

    #[test]
    fn test_pkcs12_unknown_alias_is_rejected() {
        let password = SecretString::from("Password1");
        let err = PrivateKey::from_pkcs12(RSA_2048_PKCS12, "other", &password).unwrap_err();

        assert!(
            matches!(err, KeyError::Pkcs12AliasNotFound { ref alias } if alias == "other"),
            "{err:?}"
        );
    }

    #[test]
    fn test_pkcs12_wrong_password_is_rejected() {
        let password = SecretString::from("wrong");
        let err = PrivateKey::from_pkcs12(RSA_2048_PKCS12, "mykeyalias", &password).unwrap_err();

        assert!(matches!(err, KeyError::Pkcs12 { .. }), "{err:?}");
    }

    #[test]
    fn test_p256_key_selects_es256() {
        let key = PrivateKey::from_pkcs8_pem(EC_P256_PKCS8).unwrap();

        assert_eq!(key.algorithm(), JwsAlgorithm::Es256);
        assert_eq!(key.thumbprint(), EC_THUMBPRINT);
        assert_eq!(key.key_size_bits(), 256);
        assert!(key.validate().is_ok());
    }

    #[test]
    fn test_other_curves_are_rejected() {
        let err = PrivateKey::from_pkcs8_pem(EC_P384_PKCS8).unwrap_err();
        assert!(matches!(err, KeyError::UnsupportedCurve { .. }), "{err:?}");
    }

    #[test]
    fn test_other_algorithms_are_rejected() {
        let err = PrivateKey::from_pkcs8_pem(ED25519_PKCS8).unwrap_err();
        assert!(
            matches!(err, KeyError::UnsupportedAlgorithm { ref algorithm } if algorithm == "1.3.101.112"),
            "{err:?}"
        );
    }

    #[test]
    fn test_small_rsa_key_fails_validation() {
        let key = PrivateKey::from_pkcs8_pem(RSA_1024_PKCS8).unwrap();
        let err = key.validate().unwrap_err();

        assert!(matches!(
            err,
            KeyError::KeyTooSmall {
                bits: 1024,
                minimum: 2048,
                ..
            }
        ));
        assert_eq!(
            err.to_string(),
            "RSA keys must have a minimum length of 2048 bits, but key length was: 1024"
        );
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(PrivateKey::load(b"not a key").is_err());
    }

    #[test]
    fn test_key_id_flows_into_metadata() {
        let key = PrivateKey::generate_es256().with_key_id("kid-1");

        assert_eq!(key.key_metadata().key_id.as_deref(), Some("kid-1"));
        assert_eq!(key.key_metadata().jws_algorithm, JwsAlgorithm::Es256);
    }
}
