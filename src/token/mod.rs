//! Access tokens and the cache that holds them between requests.

mod access_token;
mod cache;
mod filter;

pub use access_token::{AccessToken, EXPIRY_HORIZON};
pub use cache::{AccessTokenCache, InMemoryAccessTokenCache};
pub use filter::AccessTokenFilter;
