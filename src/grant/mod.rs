//! Token endpoint plumbing for the client credentials grant (RFC 6749 §4.4).

mod client_credentials;
mod token_response;

pub use client_credentials::{ClientCredentialsRequest, FormEncodeError, GRANT_TYPE};
pub use token_response::{TokenResponse, TokenResponseError};
