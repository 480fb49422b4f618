//! Resolution of the scopes a request needs.

use std::{collections::BTreeSet, sync::Arc};

use http::Method;
use url::Url;

/// Decides which scopes to request an access token for.
pub trait ScopeResolver: Send + Sync {
    /// The scopes needed to call `url` with `method`.
    fn resolve(&self, method: &Method, url: &Url) -> BTreeSet<String>;

    /// Every scope this resolver can return.
    fn all_scopes(&self) -> BTreeSet<String>;
}

impl<R: ScopeResolver + ?Sized> ScopeResolver for Arc<R> {
    fn resolve(&self, method: &Method, url: &Url) -> BTreeSet<String> {
        self.as_ref().resolve(method, url)
    }

    fn all_scopes(&self) -> BTreeSet<String> {
        self.as_ref().all_scopes()
    }
}

/// Returns the same scopes for every request.
#[derive(Debug, Clone, Default)]
pub struct StaticScopeResolver {
    scopes: BTreeSet<String>,
}

impl StaticScopeResolver {
    /// Creates a resolver that always returns `scopes`.
    pub fn new(scopes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            scopes: scopes.into_iter().map(Into::into).collect(),
        }
    }
}

impl ScopeResolver for StaticScopeResolver {
    fn resolve(&self, _method: &Method, _url: &Url) -> BTreeSet<String> {
        self.scopes.clone()
    }

    fn all_scopes(&self) -> BTreeSet<String> {
        self.scopes.clone()
    }
}
