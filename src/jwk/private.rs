use rsa::BigUint;
use serde::Deserialize;
use snafu::prelude::*;

use crate::crypto::signer::HasPublicKey as _;
use crate::crypto::signer::native::{Es256PrivateKey, P256_CURVE, RsaPrivateKey};
use crate::crypto::{KeyError, PrivateKey};
use crate::crypto::key::{
    InconsistentJwkSnafu, InvalidEcKeySnafu, InvalidJwkSnafu, InvalidRsaKeySnafu,
    UnsupportedCurveSnafu,
};
use crate::jwk::PublicKey;
use crate::jwk::serde_utils::{base64url, base64url_option};

/// A private JSON Web Key, as accepted for key import.
#[derive(Debug, Deserialize)]
#[serde(tag = "kty")]
pub enum PrivateJwk {
    /// An RSA private key.
    #[serde(rename = "RSA")]
    Rsa(RsaPrivateJwk),
    /// An Elliptic Curve private key.
    #[serde(rename = "EC")]
    Ec(EcPrivateJwk),
}

/// The members of an RSA private JWK (RFC 7518 §6.3).
///
/// The CRT members other than `p` and `q` are recomputed from the primes.
#[derive(Deserialize)]
pub struct RsaPrivateJwk {
    #[serde(with = "base64url")]
    n: Vec<u8>,
    #[serde(with = "base64url")]
    e: Vec<u8>,
    #[serde(with = "base64url")]
    d: Vec<u8>,
    #[serde(default, with = "base64url_option")]
    p: Option<Vec<u8>>,
    #[serde(default, with = "base64url_option")]
    q: Option<Vec<u8>>,
}

impl std::fmt::Debug for RsaPrivateJwk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaPrivateJwk").finish_non_exhaustive()
    }
}

/// The members of an EC private JWK (RFC 7518 §6.2).
#[derive(Deserialize)]
pub struct EcPrivateJwk {
    crv: String,
    #[serde(with = "base64url")]
    x: Vec<u8>,
    #[serde(with = "base64url")]
    y: Vec<u8>,
    #[serde(with = "base64url")]
    d: Vec<u8>,
}

impl std::fmt::Debug for EcPrivateJwk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EcPrivateJwk")
            .field("crv", &self.crv)
            .finish_non_exhaustive()
    }
}

impl PrivateJwk {
    /// Parses a private JWK from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if `kty` is missing or unsupported, a required
    /// member is missing, or a member is not valid base64url.
    pub fn from_json(json: &str) -> Result<Self, KeyError> {
        serde_json::from_str(json).context(InvalidJwkSnafu)
    }

    /// Converts the JWK into a signing key.
    ///
    /// # Errors
    ///
    /// Returns an error if the curve is not P-256 or the public members do
    /// not match the private key.
    pub fn into_private_key(self) -> Result<PrivateKey, KeyError> {
        match self {
            PrivateJwk::Rsa(jwk) => jwk.into_private_key(),
            PrivateJwk::Ec(jwk) => jwk.into_private_key(),
        }
    }
}

impl RsaPrivateJwk {
    fn into_private_key(self) -> Result<PrivateKey, KeyError> {
        let primes = match (self.p, self.q) {
            (Some(p), Some(q)) => vec![BigUint::from_bytes_be(&p), BigUint::from_bytes_be(&q)],
            _ => Vec::new(),
        };

        let key = rsa::RsaPrivateKey::from_components(
            BigUint::from_bytes_be(&self.n),
            BigUint::from_bytes_be(&self.e),
            BigUint::from_bytes_be(&self.d),
            primes,
        )
        .context(InvalidRsaKeySnafu)?;
        key.validate().context(InvalidRsaKeySnafu)?;

        Ok(RsaPrivateKey::from(key).into())
    }
}

impl EcPrivateJwk {
    fn into_private_key(self) -> Result<PrivateKey, KeyError> {
        ensure!(
            self.crv == P256_CURVE,
            UnsupportedCurveSnafu { curve: self.crv }
        );

        let signing_key = p256::ecdsa::SigningKey::from_slice(&self.d).context(InvalidEcKeySnafu)?;
        let key = Es256PrivateKey::from(signing_key);

        let PublicKey::Ec(derived) = &key.public_key_jwk().key else {
            return InconsistentJwkSnafu.fail();
        };
        ensure!(
            derived.x == self.x && derived.y == self.y,
            InconsistentJwkSnafu
        );

        Ok(key.into())
    }
}
