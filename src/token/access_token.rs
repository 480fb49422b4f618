use std::{
    collections::BTreeSet,
    time::{Duration, SystemTime},
};

use bon::Builder;
use secrecy::{ExposeSecret, SecretString};

/// Tokens this close to expiry are treated as already expired.
pub const EXPIRY_HORIZON: Duration = Duration::from_secs(60);

/// An `OAuth2` access token, with what it was issued for.
///
/// `jkt` is the thumbprint of the `DPoP` key the token is bound to, or
/// `None` for a bearer token.
#[derive(Debug, Clone, Builder)]
pub struct AccessToken {
    #[builder(into)]
    client_id: String,
    #[builder(default, with = |scopes: impl IntoIterator<Item = impl Into<String>>| {
        scopes.into_iter().map(Into::into).collect()
    })]
    scopes: BTreeSet<String>,
    expires_at: SystemTime,
    #[builder(into)]
    jkt: Option<String>,
    #[builder(into)]
    token: SecretString,
}

impl AccessToken {
    /// The client the token was issued to.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// The scopes granted by the authorization server.
    #[must_use]
    pub fn scopes(&self) -> &BTreeSet<String> {
        &self.scopes
    }

    /// When the token expires.
    #[must_use]
    pub fn expires_at(&self) -> SystemTime {
        self.expires_at
    }

    /// The thumbprint of the key the token is bound to.
    #[must_use]
    pub fn jkt(&self) -> Option<&str> {
        self.jkt.as_deref()
    }

    /// The token value.
    #[must_use]
    pub fn token(&self) -> &SecretString {
        &self.token
    }

    /// Whether the token is still usable at `now`.
    ///
    /// A token is unusable once it is within [`EXPIRY_HORIZON`] of expiry.
    #[must_use]
    pub fn is_usable_at(&self, now: SystemTime) -> bool {
        self.expires_at
            .duration_since(now)
            .is_ok_and(|remaining| remaining > EXPIRY_HORIZON)
    }

    /// Whether the expiry time has passed at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: SystemTime) -> bool {
        self.expires_at <= now
    }
}

impl ExposeSecret<str> for AccessToken {
    fn expose_secret(&self) -> &str {
        self.token.expose_secret()
    }
}
