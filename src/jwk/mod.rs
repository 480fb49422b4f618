//! JSON Web Key (JWK) types per RFC 7517/7518, and thumbprints per RFC 7638.
//!
//! Only the key types that can sign FAPI 2.0 artifacts are modelled: RSA
//! and P-256 elliptic curve keys.

mod private;
mod serde_utils;

use crate::crypto::PrivateKey;
use crate::crypto::signer::HasPublicKey as _;
use crate::jwk::serde_utils::{base64url, base64url_uint};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use bon::Builder;
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

pub use private::{EcPrivateJwk, PrivateJwk, RsaPrivateJwk};

/// A public JSON Web Key (RFC 7517 §4).
#[derive(Debug, Serialize, Deserialize, Builder, PartialEq, Eq, Clone)]
#[builder(derive(Into), builder_type(
    doc {
        /// Builder for creating a [`PublicJwk`] value (call `build()` or `into()` to finish).
    }
))]
pub struct PublicJwk {
    /// The key details.
    #[builder(into)]
    #[serde(flatten)]
    pub key: PublicKey,
    /// The algorithm of this key.
    #[builder(into)]
    #[serde(rename = "alg", skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
    /// The key ID of this key.
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
}

impl PublicJwk {
    /// Derives the public JWK of a private key.
    ///
    /// The result carries only the required members (`kty`, `e`, `n` or
    /// `kty`, `crv`, `x`, `y`), as embedded in a `DPoP` proof header.
    #[must_use]
    pub fn from_key(key: &PrivateKey) -> Self {
        key.public_key_jwk().clone()
    }

    /// Computes the RFC 7638 thumbprint of the key.
    ///
    /// The required members are serialized in lexicographic order without
    /// whitespace, hashed with SHA-256 and encoded as unpadded base64url.
    #[must_use]
    pub fn thumbprint(&self) -> String {
        let canonical = match &self.key {
            PublicKey::Rsa(rsa_public_key) => rsa_public_key.canonical_form(),
            PublicKey::Ec(ec_public_key) => ec_public_key.canonical_form(),
        };

        let hash = Sha256::digest(canonical.as_bytes());
        URL_SAFE_NO_PAD.encode(hash)
    }
}

/// The parts of a public key that vary structurally between types (RFC 7517 §4).
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(tag = "kty")]
pub enum PublicKey {
    /// An RSA public key.
    #[serde(rename = "RSA")]
    Rsa(RsaPublicKey),
    /// An Elliptic Curve public key.
    #[serde(rename = "EC")]
    Ec(EcPublicKey),
}

/// An RSA public key.
#[derive(Debug, Serialize, Deserialize, Builder, PartialEq, Eq, Clone)]
#[builder(derive(Into), builder_type(
    doc {
        /// Builder for creating an [`RsaPublicKey`] value (call `build()` or `into()` to finish).
    }
))]
pub struct RsaPublicKey {
    /// The modulus, unsigned big-endian.
    #[builder(with = <_>::from_iter)]
    #[serde(with = "base64url_uint")]
    pub n: Vec<u8>,
    /// The public exponent, unsigned big-endian.
    #[builder(with = <_>::from_iter)]
    #[serde(with = "base64url_uint")]
    pub e: Vec<u8>,
}

impl RsaPublicKey {
    pub(super) fn canonical_form(&self) -> String {
        let e = URL_SAFE_NO_PAD.encode(base64url_uint::trim_leading_zeros(&self.e));
        let n = URL_SAFE_NO_PAD.encode(base64url_uint::trim_leading_zeros(&self.n));

        format!(r#"{{"e":"{e}","kty":"RSA","n":"{n}"}}"#)
    }
}

impl From<RsaPublicKey> for PublicKey {
    fn from(value: RsaPublicKey) -> Self {
        Self::Rsa(value)
    }
}

impl<S: rsa_public_key_builder::State> From<RsaPublicKeyBuilder<S>> for PublicKey
where
    S: rsa_public_key_builder::IsComplete,
{
    fn from(value: RsaPublicKeyBuilder<S>) -> Self {
        Self::Rsa(value.build())
    }
}

/// An Elliptic Curve public key.
///
/// Parameters are defined in RFC 7518 §6.2.
#[derive(Debug, Serialize, Deserialize, Builder, PartialEq, Eq, Clone)]
#[builder(derive(Into), builder_type(
    doc {
        /// Builder for creating a [`EcPublicKey`] value (call `build()` or `into()` to finish).
    }
))]
pub struct EcPublicKey {
    /// The curve name.
    #[builder(into)]
    pub crv: String,
    /// The x coordinate of the point.
    #[builder(with = <_>::from_iter)]
    #[serde(with = "base64url")]
    pub x: Vec<u8>,
    /// The y coordinate of the point.
    #[builder(with = <_>::from_iter)]
    #[serde(with = "base64url")]
    pub y: Vec<u8>,
}

impl EcPublicKey {
    pub(super) fn canonical_form(&self) -> String {
        let crv = &self.crv;
        let x = URL_SAFE_NO_PAD.encode(&self.x);
        let y = URL_SAFE_NO_PAD.encode(&self.y);

        format!(r#"{{"crv":"{crv}","kty":"EC","x":"{x}","y":"{y}"}}"#)
    }
}

impl From<EcPublicKey> for PublicKey {
    fn from(value: EcPublicKey) -> Self {
        Self::Ec(value)
    }
}

impl<S: ec_public_key_builder::State> From<EcPublicKeyBuilder<S>> for PublicKey
where
    S: ec_public_key_builder::IsComplete,
{
    fn from(value: EcPublicKeyBuilder<S>) -> Self {
        Self::Ec(value.build())
    }
}

#[cfg(test)]
mod tests {
    use base64::{Engine, prelude::BASE64_URL_SAFE_NO_PAD};
    use pretty_assertions::assert_eq;

    use super::*;

    const RFC7638_N: &str = "0vx7agoebGcQSuuPiLJXZptN9nndrQmbXEps2aiAFbWhM78LhWx4cbbfAAtVT86zwu1RK7aPFFxuhDR1L6tSoc_BJECPebWKRXjBZCiFV4n3oknjhMstn64tZ_2W-5JsGY4Hc5n9yBXArwl93lqt7_RN5w6Cf0h4QyQ5v-65YGjQR0_FDW2QvzqY368QQMicAtaSqzs8KJZgnYb9c7d0zgdAZHzu6qMQvRL5hajrn1n91CbOpbISD08qNLyrdkt-bFTWhAI4vMQFh6WeZu0fM4lFd2NcRwr3XPksINHaQ-G_xBniIqbw0Ls1jF44-csFCur-kEgU8awapJzKnqDKgw";

    fn rfc7638_key() -> PublicJwk {
        PublicJwk::builder()
            .key(
                RsaPublicKey::builder()
                    .n(BASE64_URL_SAFE_NO_PAD.decode(RFC7638_N).unwrap())
                    .e(BASE64_URL_SAFE_NO_PAD.decode("AQAB").unwrap()),
            )
            .build()
    }

    // https://www.rfc-editor.org/rfc/rfc7638.html#section-3.1
    #[test]
    fn test_rsa_thumbprint_matches_rfc7638_example() {
        assert_eq!(
            rfc7638_key().thumbprint(),
            "NzbLsXh8uDCcd-6MNwXF4W_7noWXFZAfHkxZsRGC9Xs"
        );
    }

    #[test]
    fn test_thumbprint_ignores_optional_members_and_leading_zeros() {
        let mut jwk = rfc7638_key();
        let expected = jwk.thumbprint();

        jwk.kid = Some("2011-04-29".to_owned());
        jwk.algorithm = Some("RS256".to_owned());
        if let PublicKey::Rsa(rsa) = &mut jwk.key {
            rsa.n.insert(0, 0);
        }

        assert_eq!(jwk.thumbprint(), expected);
    }

    #[test]
    fn test_serialized_rsa_key_has_only_required_members() {
        let json = serde_json::to_value(rfc7638_key()).unwrap();

        assert_eq!(
            json,
            serde_json::json!({"kty": "RSA", "n": RFC7638_N, "e": "AQAB"})
        );
    }

    // Example public key from https://www.rfc-editor.org/rfc/rfc7517.html#appendix-A.1
    #[test]
    fn test_parse_ec_key_appendix_a1() {
        let json = r#"{"kty":"EC","crv":"P-256","x":"MKBCTNIcKUSDii11ySs3526iDZ8AiTo7Tu6KPAqv7D4","y":"4Etl6SRW2YiLUrN5vfvVHuhp7x8PxltmWWlbbM4IFyM","kid":"1"}"#;
        let jwk: PublicJwk = serde_json::from_str(json).unwrap();

        let expected = PublicJwk::builder()
            .key(
                EcPublicKey::builder()
                    .crv("P-256")
                    .x(BASE64_URL_SAFE_NO_PAD
                        .decode("MKBCTNIcKUSDii11ySs3526iDZ8AiTo7Tu6KPAqv7D4")
                        .unwrap())
                    .y(BASE64_URL_SAFE_NO_PAD
                        .decode("4Etl6SRW2YiLUrN5vfvVHuhp7x8PxltmWWlbbM4IFyM")
                        .unwrap()),
            )
            .kid("1")
            .build();

        assert_eq!(jwk, expected);
    }

    #[test]
    fn test_ec_canonical_form_orders_members() {
        let key = EcPublicKey::builder()
            .crv("P-256")
            .x(vec![1, 2, 3])
            .y(vec![4, 5, 6])
            .build();

        assert_eq!(
            key.canonical_form(),
            r#"{"crv":"P-256","kty":"EC","x":"AQID","y":"BAUG"}"#
        );
    }

    #[test]
    fn test_unknown_key_type_is_rejected() {
        let okp = r#"{"kty":"OKP","crv":"Ed25519","x":"11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo"}"#;
        assert!(serde_json::from_str::<PublicJwk>(okp).is_err());
    }
}
