//! `OAuth2` client authentication support.
//!
//! FAPI 2.0 requires `private_key_jwt` (RFC 7523) client authentication,
//! implemented by [`JwtBearer`].

mod form_value;
mod jwt_bearer;

use std::sync::Arc;

use bon::Builder;

pub use form_value::FormValue;
pub use jwt_bearer::{CLIENT_ASSERTION_TYPE, JwtBearer};

/// Abstracts over client authentication types.
///
/// The client authentication provided here is mixed in with parameters
/// specific to the grant in use when authenticating to the authorization
/// server.
pub trait ClientAuthentication: Send + Sync {
    /// The error type that may be returned during authentication.
    type Error: crate::Error;

    /// Returns the authentication parameters for the token request.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials could not be produced.
    fn authentication_params<'a>(
        &'a self,
        client_id: &'a str,
    ) -> Result<AuthenticationParams<'a>, Self::Error>;
}

impl<Auth: ClientAuthentication> ClientAuthentication for Arc<Auth> {
    type Error = Auth::Error;

    fn authentication_params<'a>(
        &'a self,
        client_id: &'a str,
    ) -> Result<AuthenticationParams<'a>, Self::Error> {
        self.as_ref().authentication_params(client_id)
    }
}

/// The authentication credentials that need to be added to the request.
#[derive(Debug, Clone, Builder)]
pub struct AuthenticationParams<'a> {
    /// Additional form parameters to include in the request body.
    #[builder(default)]
    pub form_params: Vec<(&'static str, FormValue<'a>)>,
}
