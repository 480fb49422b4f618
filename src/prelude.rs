//! Imports for syntax extensions.

pub use crate::client_auth::ClientAuthentication as _;
pub use crate::crypto::signer::{HasPublicKey as _, JwsSigningKey as _};
pub use crate::dpop::DPoPKeyProvider as _;
pub use crate::http::HttpResponse as _;
pub use crate::scope::ScopeResolver as _;
pub use crate::token::AccessTokenCache as _;
