//! Client configuration.
//!
//! [`OAuth2Config`] is built once, validated as a whole, and then shared
//! read-only by the handler. Every check fails closed: a configuration that
//! would not satisfy the security profile cannot be constructed.

use std::{fmt, str::FromStr, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use url::Url;

use crate::{
    crypto::{KeyError, PrivateKey},
    dpop::DPoPKeyProvider,
    scope::ScopeResolver,
    token::{AccessTokenCache, InMemoryAccessTokenCache},
    user_agent::default_user_agent,
};

/// The default allowance for clock differences with servers.
pub const DEFAULT_CLOCK_SKEW_TOLERANCE: Duration = Duration::from_secs(5);

/// Errors raised when building an [`OAuth2Config`].
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ConfigError {
    /// A required text value was empty or whitespace.
    #[snafu(display("{field} is required"))]
    Blank {
        /// The name of the field.
        field: &'static str,
    },
    /// A URL could not be parsed.
    #[snafu(display("{field} is not a valid absolute URL"))]
    InvalidUrl {
        /// The name of the field.
        field: &'static str,
        /// The underlying error.
        source: url::ParseError,
    },
    /// A URL uses a scheme other than `http` or `https`.
    #[snafu(display("{field} must use http or https, but was: {scheme}"))]
    UnsupportedScheme {
        /// The name of the field.
        field: &'static str,
        /// The scheme found.
        scheme: String,
    },
    /// The clock skew tolerance was zero.
    #[snafu(display("Clock skew tolerance must be positive"))]
    NonPositiveClockSkew,
    /// A key does not meet the security profile's requirements.
    #[snafu(display("Invalid {role} key"))]
    WeakKey {
        /// `client` or `DPoP`.
        role: &'static str,
        /// The underlying error.
        source: KeyError,
    },
    /// The security profile is not supported.
    #[snafu(display(
        "Security profile must be FAPI 2.0 with private_key_jwt and DPoP, but was: {value}"
    ))]
    UnsupportedSecurityProfile {
        /// The rejected value.
        value: String,
    },
}

impl crate::Error for ConfigError {
    fn is_retryable(&self) -> bool {
        false
    }
}

/// The `OAuth2` security profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SecurityProfile {
    /// FAPI 2.0 Security Profile with `private_key_jwt` client
    /// authentication and `DPoP` sender-constrained tokens.
    #[default]
    #[serde(rename = "FAPI2SP_PRIVATE_KEY_DPOP")]
    Fapi2PrivateKeyDPoP,
}

impl SecurityProfile {
    /// The profile's identifier.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityProfile::Fapi2PrivateKeyDPoP => "FAPI2SP_PRIVATE_KEY_DPOP",
        }
    }
}

impl fmt::Display for SecurityProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SecurityProfile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "FAPI2SP_PRIVATE_KEY_DPOP" => Ok(SecurityProfile::Fapi2PrivateKeyDPoP),
            other => UnsupportedSecurityProfileSnafu { value: other }.fail(),
        }
    }
}

/// Validated client configuration.
#[derive(Clone)]
pub struct OAuth2Config {
    client_id: String,
    token_endpoint: Url,
    issuer: String,
    client_key: PrivateKey,
    kid: String,
    clock_skew_tolerance: Duration,
    user_agent: String,
    scope_resolver: Arc<dyn ScopeResolver>,
    access_token_cache: Arc<dyn AccessTokenCache>,
    dpop_key_provider: Arc<dyn DPoPKeyProvider>,
    security_profile: SecurityProfile,
}

#[bon::bon]
impl OAuth2Config {
    /// Builds and validates a configuration.
    ///
    /// `client_id` and `kid` are trimmed. `issuer` is kept exactly as given,
    /// since it is the audience of client assertions.
    ///
    /// # Errors
    ///
    /// Returns an error if a text value is blank, a URL is invalid, the
    /// clock skew tolerance is zero, or the client key or the provider's
    /// current `DPoP` key is too weak.
    #[builder(finish_fn = build)]
    pub fn new(
        #[builder(into)] client_id: String,
        #[builder(into)] token_endpoint: String,
        #[builder(into)] issuer: String,
        client_key: PrivateKey,
        #[builder(into)] kid: String,
        #[builder(default = DEFAULT_CLOCK_SKEW_TOLERANCE)] clock_skew_tolerance: Duration,
        #[builder(into, default = default_user_agent())] user_agent: String,
        scope_resolver: Arc<dyn ScopeResolver>,
        #[builder(default = default_access_token_cache())] access_token_cache: Arc<
            dyn AccessTokenCache,
        >,
        dpop_key_provider: Arc<dyn DPoPKeyProvider>,
        #[builder(default)] security_profile: SecurityProfile,
    ) -> Result<Self, ConfigError> {
        let client_id = client_id.trim().to_owned();
        ensure!(!client_id.is_empty(), BlankSnafu { field: "Client ID" });

        let kid = kid.trim().to_owned();
        ensure!(!kid.is_empty(), BlankSnafu { field: "Key ID (kid)" });

        ensure!(
            !user_agent.trim().is_empty(),
            BlankSnafu { field: "User agent" }
        );

        let token_endpoint = parse_http_url("Token endpoint", &token_endpoint)?;

        ensure!(!issuer.trim().is_empty(), BlankSnafu { field: "Issuer" });
        parse_http_url("Issuer", &issuer)?;

        ensure!(!clock_skew_tolerance.is_zero(), NonPositiveClockSkewSnafu);

        client_key
            .validate()
            .context(WeakKeySnafu { role: "client" })?;
        dpop_key_provider
            .current_key()
            .key()
            .validate()
            .context(WeakKeySnafu { role: "DPoP" })?;

        Ok(Self {
            client_key: client_key.with_key_id(kid.clone()),
            client_id,
            token_endpoint,
            issuer,
            kid,
            clock_skew_tolerance,
            user_agent,
            scope_resolver,
            access_token_cache,
            dpop_key_provider,
            security_profile,
        })
    }
}

fn default_access_token_cache() -> Arc<dyn AccessTokenCache> {
    Arc::new(InMemoryAccessTokenCache::new())
}

fn parse_http_url(field: &'static str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value.trim()).context(InvalidUrlSnafu { field })?;
    ensure!(
        matches!(url.scheme(), "http" | "https"),
        UnsupportedSchemeSnafu {
            field,
            scheme: url.scheme(),
        }
    );
    Ok(url)
}

impl OAuth2Config {
    /// The client ID.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// The token endpoint.
    #[must_use]
    pub fn token_endpoint(&self) -> &Url {
        &self.token_endpoint
    }

    /// The authorization server's issuer identifier.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// The client authentication key, advertising [`Self::kid`].
    #[must_use]
    pub fn client_key(&self) -> &PrivateKey {
        &self.client_key
    }

    /// The key ID of the client authentication key.
    #[must_use]
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// The allowance for clock differences with servers.
    #[must_use]
    pub fn clock_skew_tolerance(&self) -> Duration {
        self.clock_skew_tolerance
    }

    /// The `User-Agent` header value.
    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// The scope resolver.
    #[must_use]
    pub fn scope_resolver(&self) -> &dyn ScopeResolver {
        self.scope_resolver.as_ref()
    }

    /// The access token cache.
    #[must_use]
    pub fn access_token_cache(&self) -> &dyn AccessTokenCache {
        self.access_token_cache.as_ref()
    }

    /// The `DPoP` key provider.
    #[must_use]
    pub fn dpop_key_provider(&self) -> &dyn DPoPKeyProvider {
        self.dpop_key_provider.as_ref()
    }

    /// The security profile.
    #[must_use]
    pub fn security_profile(&self) -> SecurityProfile {
        self.security_profile
    }
}

impl fmt::Debug for OAuth2Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2Config")
            .field("client_id", &self.client_id)
            .field("token_endpoint", &self.token_endpoint.as_str())
            .field("issuer", &self.issuer)
            .field("kid", &self.kid)
            .field("clock_skew_tolerance", &self.clock_skew_tolerance)
            .field("user_agent", &self.user_agent)
            .field("security_profile", &self.security_profile)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dpop::StaticDPoPKeyProvider, scope::StaticScopeResolver};

    const RSA_2048: &str = include_str!("../tests/fixtures/rsa-2048-pkcs8.pem");
    const RSA_1024: &str = include_str!("../tests/fixtures/rsa-1024-pkcs8.pem");

    fn rsa_2048() -> PrivateKey {
        PrivateKey::from_pkcs8_pem(RSA_2048).unwrap()
    }

    fn build(
        client_id: &str,
        token_endpoint: &str,
        issuer: &str,
        client_key: PrivateKey,
        kid: &str,
        clock_skew_tolerance: Duration,
        dpop_key: PrivateKey,
    ) -> Result<OAuth2Config, ConfigError> {
        OAuth2Config::builder()
            .client_id(client_id)
            .token_endpoint(token_endpoint)
            .issuer(issuer)
            .client_key(client_key)
            .kid(kid)
            .clock_skew_tolerance(clock_skew_tolerance)
            .scope_resolver(Arc::new(StaticScopeResolver::new(["s1"])))
            .dpop_key_provider(Arc::new(StaticDPoPKeyProvider::new(dpop_key)))
            .build()
    }

    fn valid() -> Result<OAuth2Config, ConfigError> {
        build(
            "  client  ",
            "https://as.example/token",
            "https://as.example",
            rsa_2048(),
            " kid-1 ",
            DEFAULT_CLOCK_SKEW_TOLERANCE,
            PrivateKey::generate_es256(),
        )
    }

    #[test]
    fn test_valid_config_trims_and_defaults() {
        let config = valid().unwrap();

        assert_eq!(config.client_id(), "client");
        assert_eq!(config.kid(), "kid-1");
        assert_eq!(config.issuer(), "https://as.example");
        assert_eq!(config.token_endpoint().as_str(), "https://as.example/token");
        assert_eq!(config.clock_skew_tolerance(), Duration::from_secs(5));
        assert_eq!(config.user_agent(), default_user_agent());
        assert_eq!(config.security_profile(), SecurityProfile::Fapi2PrivateKeyDPoP);
    }

    #[test]
    fn test_blank_values_are_rejected() {
        let err = build(
            "   ",
            "https://as.example/token",
            "https://as.example",
            rsa_2048(),
            "kid",
            DEFAULT_CLOCK_SKEW_TOLERANCE,
            PrivateKey::generate_es256(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Blank { field: "Client ID" }));

        let err = build(
            "client",
            "https://as.example/token",
            "https://as.example",
            rsa_2048(),
            "",
            DEFAULT_CLOCK_SKEW_TOLERANCE,
            PrivateKey::generate_es256(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Blank { field: "Key ID (kid)" }));
    }

    #[test]
    fn test_bad_urls_are_rejected() {
        let err = build(
            "client",
            "/token",
            "https://as.example",
            rsa_2048(),
            "kid",
            DEFAULT_CLOCK_SKEW_TOLERANCE,
            PrivateKey::generate_es256(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { field: "Token endpoint", .. }));

        let err = build(
            "client",
            "ftp://as.example/token",
            "https://as.example",
            rsa_2048(),
            "kid",
            DEFAULT_CLOCK_SKEW_TOLERANCE,
            PrivateKey::generate_es256(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedScheme { .. }));
    }

    #[test]
    fn test_zero_clock_skew_is_rejected() {
        let err = build(
            "client",
            "https://as.example/token",
            "https://as.example",
            rsa_2048(),
            "kid",
            Duration::ZERO,
            PrivateKey::generate_es256(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::NonPositiveClockSkew));
    }

    #[test]
    fn test_weak_keys_are_rejected() {
        let weak = || PrivateKey::from_pkcs8_pem(RSA_1024).unwrap();

        let err = build(
            "client",
            "https://as.example/token",
            "https://as.example",
            weak(),
            "kid",
            DEFAULT_CLOCK_SKEW_TOLERANCE,
            PrivateKey::generate_es256(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::WeakKey { role: "client", .. }));

        let err = build(
            "client",
            "https://as.example/token",
            "https://as.example",
            rsa_2048(),
            "kid",
            DEFAULT_CLOCK_SKEW_TOLERANCE,
            weak(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::WeakKey { role: "DPoP", .. }));
    }

    #[test]
    fn test_security_profile_parsing() {
        assert_eq!(
            "FAPI2SP_PRIVATE_KEY_DPOP".parse::<SecurityProfile>().unwrap(),
            SecurityProfile::Fapi2PrivateKeyDPoP
        );
        assert!(matches!(
            "FAPI2SP_MTLS".parse::<SecurityProfile>().unwrap_err(),
            ConfigError::UnsupportedSecurityProfile { .. }
        ));
        assert_eq!(
            serde_json::to_string(&SecurityProfile::Fapi2PrivateKeyDPoP).unwrap(),
            r#""FAPI2SP_PRIVATE_KEY_DPOP""#
        );
    }

    #[test]
    fn test_debug_omits_keys() {
        let debug = format!("{:?}", valid().unwrap());
        assert!(debug.contains("client_id: \"client\""));
        assert!(!debug.contains("client_key"));
    }
}
