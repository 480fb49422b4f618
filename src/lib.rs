//! A FAPI 2.0 `OAuth2` client for machine-to-machine API calls.
//!
//! [`OAuth2Handler`] adds a `DPoP`-bound access token (RFC 9449) to each
//! outgoing request. Tokens come from the client credentials grant, with the
//! client authenticating by `private_key_jwt` (RFC 7523), and are cached
//! until shortly before they expire.
//!
//! The handler is transport-agnostic: implement [`http::HttpTransport`] for
//! your HTTP client, or enable the `http-client-reqwest-0_12` feature.

#![forbid(unsafe_code)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod client_auth;
pub mod config;
pub mod crypto;
pub mod dpop;
mod error;
pub mod grant;
pub mod handler;
pub mod http;
mod jti;
pub mod jwk;
pub mod jwt;
pub mod prelude;
pub mod scope;
pub mod token;
mod user_agent;

pub use config::OAuth2Config;
pub use error::Error;
pub use handler::{ClientError, ExecuteError, OAuth2Handler};
pub use user_agent::default_user_agent;

/// Re-export of parts of the `secrecy` crate.
pub mod secrecy {
    pub use ::secrecy::{ExposeSecret, SecretString};
}
