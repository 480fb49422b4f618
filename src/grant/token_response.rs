use std::{
    collections::BTreeSet,
    time::{Duration, SystemTime},
};

use secrecy::SecretString;
use serde::Deserialize;
use snafu::prelude::*;

/// Errors when reading a successful token endpoint response.
#[derive(Debug, Snafu)]
pub enum TokenResponseError {
    /// The response body was empty.
    #[snafu(display("Empty access token response"))]
    Empty,
    /// The response body was not a JSON object.
    #[snafu(display("Failed to parse JSON access token response"))]
    InvalidJson {
        /// The underlying error.
        source: serde_json::Error,
    },
    /// A required member was missing.
    #[snafu(display("Missing value in access token response: {member}"))]
    MissingValue {
        /// The name of the member.
        member: &'static str,
    },
    /// `expires_in` was not a non-negative whole number of seconds.
    #[snafu(display("Invalid expires_in in access token response: {value}"))]
    InvalidExpiresIn {
        /// The value received.
        value: serde_json::Value,
    },
}

impl crate::Error for TokenResponseError {
    fn is_retryable(&self) -> bool {
        false
    }
}

#[derive(Deserialize)]
struct RawTokenResponse {
    access_token: Option<String>,
    expires_in: Option<serde_json::Value>,
    scope: Option<String>,
}

/// A successful token response (RFC 6749 §5.1).
#[derive(Debug)]
pub struct TokenResponse {
    /// The access token.
    pub access_token: SecretString,
    /// The lifetime of the token.
    pub expires_in: Duration,
    /// The granted scopes; empty when the server omitted `scope`.
    pub scopes: BTreeSet<String>,
}

impl TokenResponse {
    /// Parses a token response body.
    ///
    /// Scopes are not inferred from the request when `scope` is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is empty or not JSON, or if
    /// `access_token` or `expires_in` are missing or invalid.
    pub fn parse(body: &str) -> Result<Self, TokenResponseError> {
        ensure!(!body.trim().is_empty(), EmptySnafu);

        let raw: RawTokenResponse = serde_json::from_str(body).context(InvalidJsonSnafu)?;

        let access_token = raw.access_token.context(MissingValueSnafu {
            member: "access_token",
        })?;
        let expires_in = raw.expires_in.context(MissingValueSnafu {
            member: "expires_in",
        })?;
        let seconds = expires_in
            .as_u64()
            .context(InvalidExpiresInSnafu { value: expires_in.clone() })?;
        let scopes = raw
            .scope
            .as_deref()
            .map(|scope| scope.split_whitespace().map(ToOwned::to_owned).collect())
            .unwrap_or_default();

        Ok(Self {
            access_token: access_token.into(),
            expires_in: Duration::from_secs(seconds),
            scopes,
        })
    }
}

impl TokenResponse {
    /// When the token expires, counting `expires_in` from `now`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenResponseError::InvalidExpiresIn`] if the expiry time
    /// cannot be represented.
    pub fn expires_at(&self, now: SystemTime) -> Result<SystemTime, TokenResponseError> {
        now.checked_add(self.expires_in)
            .context(InvalidExpiresInSnafu {
                value: self.expires_in.as_secs(),
            })
    }
}
