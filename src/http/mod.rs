//! HTTP transport abstractions.
//!
//! This module defines traits that decouple the library from any specific HTTP
//! implementation. A binding implements [`HttpTransport`] for its own request
//! and response types, and [`crate::OAuth2Handler`] drives it.

#[cfg(feature = "http-client-reqwest-0_12")]
mod reqwest_0_12;

use http::{HeaderMap, HeaderName, Method, StatusCode};
use url::Url;

#[cfg(feature = "http-client-reqwest-0_12")]
pub use reqwest_0_12::{ReqwestResponse, ReqwestTransport, ReqwestTransportError};

/// The `DPoP` request header (RFC 9449 §4.1).
pub const DPOP: HeaderName = HeaderName::from_static("dpop");
/// The `DPoP-Nonce` response header (RFC 9449 §8).
pub const DPOP_NONCE: HeaderName = HeaderName::from_static("dpop-nonce");

pub use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT, WWW_AUTHENTICATE};

/// Sends requests on behalf of the handler.
///
/// `Request` is the caller's outgoing API request. The handler reads its
/// method and URL, asks for a token request to be sent alongside it, and
/// finally asks for the request itself to be sent with extra headers.
pub trait HttpTransport: Send + Sync {
    /// The caller's request type.
    type Request;
    /// The response type.
    type Response: HttpResponse<Error = Self::Error>;
    /// The error type for failed exchanges.
    type Error: crate::Error;

    /// The HTTP method of the request.
    fn method(&self, request: &Self::Request) -> Method;

    /// The absolute URL of the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the request does not have a valid absolute URL.
    fn url(&self, request: &Self::Request) -> Result<Url, Self::Error>;

    /// POSTs a form-encoded body to the token endpoint.
    ///
    /// `headers` are to be set on the token request; `request` is provided
    /// for context only and must not be sent.
    ///
    /// # Errors
    ///
    /// Returns an error if no response was received.
    fn send_token_request(
        &self,
        request: &Self::Request,
        token_endpoint: &Url,
        form_body: String,
        headers: HeaderMap,
    ) -> Result<Self::Response, Self::Error>;

    /// Sends the caller's request with `headers` added, replacing any
    /// existing values of the same name.
    ///
    /// May be called twice for one request when a nonce retry is needed.
    ///
    /// # Errors
    ///
    /// Returns an error if no response was received.
    fn send_resource_request(
        &self,
        request: &Self::Request,
        headers: HeaderMap,
    ) -> Result<Self::Response, Self::Error>;
}

/// Defines the common interface for HTTP responses.
pub trait HttpResponse {
    /// The error type when reading the response body.
    type Error: crate::Error;

    /// Returns the HTTP status code of the response.
    fn status(&self) -> StatusCode;

    /// Returns the first value of a header, matched case-insensitively.
    fn header(&self, name: &str) -> Option<String>;

    /// Returns the response body as text.
    ///
    /// May be called more than once; later calls return the same text.
    ///
    /// # Errors
    ///
    /// Returns an error if the body could not be read.
    fn body(&mut self) -> Result<String, Self::Error>;

    /// Releases the response when it will not be returned to the caller.
    fn close(self)
    where
        Self: Sized,
    {
    }
}
