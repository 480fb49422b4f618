use std::{convert::Infallible, sync::Arc, time::Duration};

use base64::prelude::*;
use bon::Builder;
use http::Method;
use secrecy::{ExposeSecret as _, SecretString};
use serde::Serialize;
use sha2::{Digest as _, Sha256};
use url::Url;

use crate::{
    crypto::signer::HasPublicKey as _,
    dpop::DPoPKey,
    jwk::PublicJwk,
    jwt::{JwsSerializationError, Jwt, unix_now},
};

/// How long a proof is valid for, before clock skew is added.
const PROOF_LIFETIME: Duration = Duration::from_secs(90);

/// A `DPoP` proof for a single HTTP request (RFC 9449 §4).
///
/// The header is `{alg, typ: "dpop+jwt", kid, jwk}` and the claims are
/// `{jti, htm, htu, iat, exp, ath?, nonce?}`. `ath` is only present for
/// resource requests, `nonce` only once a server has provided one.
#[derive(Debug, Clone, Builder)]
pub struct DPoPProof<'a> {
    /// The HTTP method of the request.
    method: &'a Method,
    /// The target URL of the request.
    url: &'a Url,
    /// The access token presented with the request, if any.
    access_token: Option<&'a SecretString>,
    /// The server-provided nonce.
    nonce: Option<Arc<String>>,
    /// Allowance for clock differences with the server.
    clock_skew_tolerance: Duration,
}

#[derive(Debug, Clone, Serialize)]
struct DPoPHeaders<'a> {
    jwk: &'a PublicJwk,
}

#[derive(Debug, Clone, Serialize)]
struct DPoPClaims<'a> {
    htm: &'a str,
    htu: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    ath: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    nonce: Option<&'a str>,
}

impl DPoPProof<'_> {
    /// Signs the proof with `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the proof could not be serialized or signed.
    pub fn sign(&self, key: &DPoPKey) -> Result<SecretString, JwsSerializationError<Infallible>> {
        let now = unix_now();
        let expiration = now
            .saturating_add(PROOF_LIFETIME.as_secs())
            .saturating_add(self.clock_skew_tolerance.as_secs());

        let extra_headers = DPoPHeaders {
            jwk: key.key().public_key_jwk(),
        };
        let extra_claims = DPoPClaims {
            htm: self.method.as_str(),
            htu: htu(self.url),
            ath: self.access_token.map(access_token_hash),
            nonce: self.nonce.as_deref().map(String::as_str),
        };

        Jwt::builder()
            .typ("dpop+jwt")
            .issued_at(now)
            .expiration(expiration)
            .extra_headers(extra_headers)
            .extra_claims(extra_claims)
            .build()
            .to_jws_compact(key.key())
    }
}

/// The `htu` value for a URL: scheme, host, port and path only.
///
/// Userinfo, query and fragment are removed.
#[must_use]
pub fn htu(url: &Url) -> String {
    let mut url = url.clone();
    // Fails only for URLs that cannot carry credentials.
    url.set_username("").ok();
    url.set_password(None).ok();
    url.set_query(None);
    url.set_fragment(None);
    url.into()
}

/// The `ath` value for an access token: base64url(SHA-256(token)).
#[must_use]
pub fn access_token_hash(access_token: &SecretString) -> String {
    let hash = Sha256::digest(access_token.expose_secret().as_bytes());
    BASE64_URL_SAFE_NO_PAD.encode(hash)
}
