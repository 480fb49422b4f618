use std::{sync::Arc, time::SystemTime};

use dashmap::DashMap;

use crate::token::{AccessToken, AccessTokenFilter};

/// Storage for access tokens between requests.
///
/// Implementations must be safe to share across threads.
pub trait AccessTokenCache: Send + Sync {
    /// Stores a token.
    fn put(&self, access_token: AccessToken);

    /// Returns a usable token matching the filter, if one is cached.
    fn get(&self, filter: &AccessTokenFilter) -> Option<AccessToken>;
}

impl<C: AccessTokenCache + ?Sized> AccessTokenCache for Arc<C> {
    fn put(&self, access_token: AccessToken) {
        self.as_ref().put(access_token);
    }

    fn get(&self, filter: &AccessTokenFilter) -> Option<AccessToken> {
        self.as_ref().get(filter)
    }
}

/// An in-process token cache.
///
/// Each token is stored under its scopes alone and, when it is `DPoP`
/// bound, also under its key thumbprint and scopes. Bound tokens therefore
/// satisfy both kinds of lookup, while bearer tokens never satisfy a
/// lookup by thumbprint. Entries are keyed by the filter itself, so scope
/// sets are compared member by member.
#[derive(Debug, Default)]
pub struct InMemoryAccessTokenCache {
    tokens: DashMap<AccessTokenFilter, Arc<AccessToken>>,
}

impl InMemoryAccessTokenCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of cache entries (a bound token occupies two).
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl AccessTokenCache for InMemoryAccessTokenCache {
    fn put(&self, access_token: AccessToken) {
        let now = SystemTime::now();
        self.tokens.retain(|_, token| !token.is_expired_at(now));

        let access_token = Arc::new(access_token);
        self.tokens.insert(
            AccessTokenFilter::by_scopes(access_token.scopes().clone()),
            Arc::clone(&access_token),
        );
        if let Some(jkt) = access_token.jkt() {
            self.tokens.insert(
                AccessTokenFilter::by_jkt_and_scopes(jkt, access_token.scopes().clone()),
                Arc::clone(&access_token),
            );
        }
    }

    fn get(&self, filter: &AccessTokenFilter) -> Option<AccessToken> {
        let token = self
            .tokens
            .get(filter)
            .map(|entry| Arc::clone(entry.value()))?;

        if token.is_usable_at(SystemTime::now()) {
            return Some(AccessToken::clone(&token));
        }

        self.tokens
            .remove_if(filter, |_, cached| Arc::ptr_eq(cached, &token));
        None
    }
}
