use std::collections::BTreeSet;

/// Selects a cached access token by scopes and, optionally, key binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccessTokenFilter {
    jkt: Option<String>,
    scopes: BTreeSet<String>,
}

impl AccessTokenFilter {
    /// Matches tokens with exactly these scopes, bound or not.
    #[must_use]
    pub fn by_scopes(scopes: BTreeSet<String>) -> Self {
        Self { jkt: None, scopes }
    }

    /// Matches tokens with exactly these scopes bound to the key with
    /// thumbprint `jkt`.
    #[must_use]
    pub fn by_jkt_and_scopes(jkt: impl Into<String>, scopes: BTreeSet<String>) -> Self {
        Self {
            jkt: Some(jkt.into()),
            scopes,
        }
    }

    /// The key thumbprint to match.
    #[must_use]
    pub fn jkt(&self) -> Option<&str> {
        self.jkt.as_deref()
    }

    /// The scopes to match.
    #[must_use]
    pub fn scopes(&self) -> &BTreeSet<String> {
        &self.scopes
    }
}
