//! The request orchestrator.
//!
//! [`OAuth2Handler::execute`] attaches a `DPoP`-bound access token to an
//! outgoing request:
//!
//! 1. resolve the scopes the request needs;
//! 2. look for a cached token bound to the current `DPoP` key;
//! 3. otherwise request one with a `private_key_jwt` client assertion;
//! 4. send the request with `Authorization: DPoP <token>` and a proof.
//!
//! A `use_dpop_nonce` error from either server is retried once with the
//! nonce the server supplied. Error responses from either server are
//! returned to the caller unchanged.

use std::{collections::BTreeSet, convert::Infallible, sync::Arc, time::SystemTime};

use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use secrecy::{ExposeSecret as _, SecretString};
use serde::Deserialize;
use snafu::prelude::*;
use tracing::{debug, error, info};
use url::Url;

use crate::{
    client_auth::{ClientAuthentication as _, JwtBearer},
    config::OAuth2Config,
    crypto::PrivateKey,
    dpop::{DPoPKey, DPoPProof, NonceCell},
    grant::{ClientCredentialsRequest, FormEncodeError, TokenResponse, TokenResponseError},
    http::{
        ACCEPT, AUTHORIZATION, CONTENT_TYPE, DPOP, DPOP_NONCE, HttpResponse, HttpTransport,
        USER_AGENT, WWW_AUTHENTICATE,
    },
    jwt::JwsSerializationError,
    token::{AccessToken, AccessTokenFilter},
};

const USE_DPOP_NONCE: &str = "use_dpop_nonce";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const JSON_CONTENT_TYPE: &str = "application/json";

/// Failures of the client itself, as opposed to the transport.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ClientError {
    /// The client assertion could not be created.
    #[snafu(display("Failed to create client assertion"))]
    ClientAssertion {
        /// The underlying error.
        source: JwsSerializationError<Infallible>,
    },
    /// A `DPoP` proof could not be created.
    #[snafu(display("Failed to create DPoP proof"))]
    DPoPProof {
        /// The underlying error.
        source: JwsSerializationError<Infallible>,
    },
    /// The key provider no longer knows the key a token is bound to.
    #[snafu(display("DPoP key provider has no key with ID: {key_id}"))]
    UnknownDPoPKey {
        /// The missing key ID.
        key_id: String,
    },
    /// The token request body could not be encoded.
    #[snafu(display("Failed to encode access token request"))]
    TokenRequest {
        /// The underlying error.
        source: FormEncodeError,
    },
    /// The token endpoint returned a success status with an unusable body.
    #[snafu(display("Invalid access token response"))]
    TokenResponse {
        /// The underlying error.
        source: TokenResponseError,
    },
    /// A value could not be used as an HTTP header value.
    #[snafu(display("Invalid value for header {name}"))]
    InvalidHeaderValue {
        /// The header name.
        name: HeaderName,
        /// The underlying error.
        source: http::header::InvalidHeaderValue,
    },
}

impl crate::Error for ClientError {
    fn is_retryable(&self) -> bool {
        false
    }
}

/// Errors returned by [`OAuth2Handler::execute`].
#[derive(Debug, Snafu)]
pub enum ExecuteError<E: crate::Error> {
    /// The client failed to build or interpret a request.
    #[snafu(display("OAuth2 client error"))]
    Client {
        /// The underlying error.
        source: ClientError,
    },
    /// The transport failed; the error is passed through unchanged.
    #[snafu(display("HTTP transport error"))]
    Transport {
        /// The transport's error.
        source: E,
    },
}

impl<E: crate::Error> From<ClientError> for ExecuteError<E> {
    fn from(source: ClientError) -> Self {
        ExecuteError::Client { source }
    }
}

impl<E: crate::Error> crate::Error for ExecuteError<E> {
    fn is_retryable(&self) -> bool {
        match self {
            ExecuteError::Client { source } => source.is_retryable(),
            ExecuteError::Transport { source } => source.is_retryable(),
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

enum TokenOutcome<R> {
    Token(AccessToken),
    ErrorResponse(R),
}

/// Adds FAPI 2.0 `OAuth2` authentication to requests.
///
/// One handler is meant to be shared (by reference or [`Arc`]) by every
/// request to the same authorization server, so that tokens and nonces are
/// reused.
#[derive(Debug)]
pub struct OAuth2Handler {
    config: OAuth2Config,
    client_auth: JwtBearer<PrivateKey>,
    nonce: NonceCell,
}

impl OAuth2Handler {
    /// Creates a handler for `config`.
    #[must_use]
    pub fn new(config: OAuth2Config) -> Self {
        let client_auth = JwtBearer::builder()
            .signer(config.client_key().clone())
            .audience(config.issuer())
            .clock_skew_tolerance(config.clock_skew_tolerance())
            .build();

        Self {
            config,
            client_auth,
            nonce: NonceCell::new(),
        }
    }

    /// The handler's configuration.
    #[must_use]
    pub fn config(&self) -> &OAuth2Config {
        &self.config
    }

    /// The most recent `DPoP` nonce received from either server.
    #[must_use]
    pub fn current_nonce(&self) -> Option<Arc<String>> {
        self.nonce.current()
    }

    /// Sends `request` through `transport` with a `DPoP`-bound access token.
    ///
    /// Blocks for up to two token endpoint and two resource server round
    /// trips. Non-success responses from either server are returned as
    /// `Ok`.
    ///
    /// # Errors
    ///
    /// Returns [`ExecuteError::Transport`] if the transport fails, and
    /// [`ExecuteError::Client`] if a proof or assertion cannot be created or
    /// a successful token response cannot be used.
    pub fn execute<T: HttpTransport>(
        &self,
        request: &T::Request,
        transport: &T,
    ) -> Result<T::Response, ExecuteError<T::Error>> {
        let method = transport.method(request);
        let url = transport.url(request).context(TransportSnafu)?;
        info!(%method, %url, "Intercepting API request");
        debug!(config = ?self.config, "Using configuration");

        let dpop_key = self.current_dpop_key();
        let scopes = self.resolve_scopes(&method, &url);

        let access_token =
            match self.retrieve_access_token(request, transport, &scopes, &dpop_key)? {
                TokenOutcome::Token(access_token) => access_token,
                TokenOutcome::ErrorResponse(response) => return Ok(response),
            };

        self.send_original_request(
            request,
            transport,
            &method,
            &url,
            access_token.token(),
            dpop_key.key_id(),
        )
    }

    fn current_dpop_key(&self) -> DPoPKey {
        info!("Retrieving DPoP key");
        let dpop_key = self.config.dpop_key_provider().current_key();
        debug!(key_id = dpop_key.key_id(), "DPoP key");
        dpop_key
    }

    fn resolve_scopes(&self, method: &Method, url: &Url) -> BTreeSet<String> {
        info!("Resolving scopes");
        let scopes = self.config.scope_resolver().resolve(method, url);
        debug!(?scopes, "Scopes");
        scopes
    }

    fn retrieve_access_token<T: HttpTransport>(
        &self,
        request: &T::Request,
        transport: &T,
        scopes: &BTreeSet<String>,
        dpop_key: &DPoPKey,
    ) -> Result<TokenOutcome<T::Response>, ExecuteError<T::Error>> {
        let jkt = dpop_key.thumbprint();

        info!("Checking access token cache");
        let filter = AccessTokenFilter::by_jkt_and_scopes(jkt.clone(), scopes.clone());
        debug!(?filter, "Filter");
        if let Some(access_token) = self.config.access_token_cache().get(&filter) {
            debug!(?access_token, "Valid access token found");
            return Ok(TokenOutcome::Token(access_token));
        }

        info!(
            token_endpoint = %self.config.token_endpoint(),
            "No valid access token, requesting new access token"
        );
        let key_id = dpop_key.key_id();
        let mut response = self.send_token_request(request, transport, key_id, scopes)?;
        if must_retry(&mut response).context(TransportSnafu)? {
            response.close();
            debug!("`use_dpop_nonce` returned, retrying access token request");
            response = self.send_token_request(request, transport, key_id, scopes)?;
        }

        let status = response.status();
        let body = response.body().context(TransportSnafu)?;
        if !status.is_success() {
            error!(status = status.as_u16(), body = %body, "Access token request failed");
            return Ok(TokenOutcome::ErrorResponse(response));
        }
        debug!(status = status.as_u16(), "Access token request succeeded");
        response.close();

        let token_response = TokenResponse::parse(&body).context(TokenResponseSnafu)?;
        let expires_at = token_response
            .expires_at(SystemTime::now())
            .context(TokenResponseSnafu)?;
        let access_token = AccessToken::builder()
            .client_id(self.config.client_id())
            .scopes(token_response.scopes)
            .expires_at(expires_at)
            .jkt(jkt)
            .token(token_response.access_token)
            .build();

        debug!(?access_token, "Adding access token to cache");
        self.config.access_token_cache().put(access_token.clone());
        Ok(TokenOutcome::Token(access_token))
    }

    fn send_token_request<T: HttpTransport>(
        &self,
        request: &T::Request,
        transport: &T,
        key_id: &str,
        scopes: &BTreeSet<String>,
    ) -> Result<T::Response, ExecuteError<T::Error>> {
        let token_endpoint = self.config.token_endpoint();
        let nonce = self.nonce.current();
        debug!(nonce = nonce.as_deref().map(String::as_str), "Creating token request DPoP proof");
        let proof = self.dpop_proof(
            DPoPProof::builder()
                .method(&Method::POST)
                .url(token_endpoint)
                .maybe_nonce(nonce)
                .clock_skew_tolerance(self.config.clock_skew_tolerance())
                .build(),
            key_id,
        )?;

        debug!("Creating client assertion");
        let auth_params = self
            .client_auth
            .authentication_params(self.config.client_id())
            .context(ClientAssertionSnafu)?;
        let token_request = ClientCredentialsRequest::builder()
            .client_id(self.config.client_id())
            .scopes(scopes)
            .auth_params(auth_params)
            .build();
        let form_body = token_request.form_body().context(TokenRequestSnafu)?;
        debug!(
            scope = ?scopes,
            auth_params = ?token_request.redacted_form_params(),
            "Sending access token request"
        );

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, header_value(USER_AGENT, self.config.user_agent())?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
        headers.insert(ACCEPT, HeaderValue::from_static(JSON_CONTENT_TYPE));
        headers.insert(DPOP, secret_header_value(DPOP, &proof)?);

        let response = transport
            .send_token_request(request, token_endpoint, form_body, headers)
            .context(TransportSnafu)?;
        self.update_nonce(&response);
        Ok(response)
    }

    fn send_original_request<T: HttpTransport>(
        &self,
        request: &T::Request,
        transport: &T,
        method: &Method,
        url: &Url,
        access_token: &SecretString,
        key_id: &str,
    ) -> Result<T::Response, ExecuteError<T::Error>> {
        info!(%method, %url, "Making API call");
        let mut response =
            self.send_resource_request(request, transport, method, url, access_token, key_id)?;
        if must_retry(&mut response).context(TransportSnafu)? {
            response.close();
            debug!("`use_dpop_nonce` returned, retrying API call");
            response =
                self.send_resource_request(request, transport, method, url, access_token, key_id)?;
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.body().context(TransportSnafu)?;
            error!(status = status.as_u16(), body = %body, "API call failed");
        } else if tracing::enabled!(tracing::Level::DEBUG) {
            let body = response.body().context(TransportSnafu)?;
            debug!(status = status.as_u16(), body = %body, "API call successful");
        }

        Ok(response)
    }

    fn send_resource_request<T: HttpTransport>(
        &self,
        request: &T::Request,
        transport: &T,
        method: &Method,
        url: &Url,
        access_token: &SecretString,
        key_id: &str,
    ) -> Result<T::Response, ExecuteError<T::Error>> {
        let nonce = self.nonce.current();
        debug!(nonce = nonce.as_deref().map(String::as_str), "Creating resource request DPoP proof");
        let proof = self.dpop_proof(
            DPoPProof::builder()
                .method(method)
                .url(url)
                .access_token(access_token)
                .maybe_nonce(nonce)
                .clock_skew_tolerance(self.config.clock_skew_tolerance())
                .build(),
            key_id,
        )?;

        let authorization: SecretString =
            format!("DPoP {}", access_token.expose_secret()).into();

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, header_value(USER_AGENT, self.config.user_agent())?);
        headers.insert(AUTHORIZATION, secret_header_value(AUTHORIZATION, &authorization)?);
        headers.insert(DPOP, secret_header_value(DPOP, &proof)?);

        debug!("Sending request");
        let response = transport
            .send_resource_request(request, headers)
            .context(TransportSnafu)?;
        self.update_nonce(&response);
        Ok(response)
    }

    fn dpop_proof(&self, proof: DPoPProof<'_>, key_id: &str) -> Result<SecretString, ClientError> {
        let dpop_key = self
            .config
            .dpop_key_provider()
            .key(key_id)
            .context(UnknownDPoPKeySnafu { key_id })?;
        proof.sign(&dpop_key).context(DPoPProofSnafu)
    }

    fn update_nonce<R: HttpResponse>(&self, response: &R) {
        if let Some(nonce) = self.nonce.update(response.header(DPOP_NONCE.as_str())) {
            debug!(nonce = nonce.as_str(), "New DPoP nonce from server");
        }
    }
}

/// Whether a response is a `use_dpop_nonce` error (RFC 9449 §8 and §9).
///
/// Only 400 and 401 responses qualify, and only when the JSON body's `error`
/// or the `WWW-Authenticate` header names `use_dpop_nonce`.
fn must_retry<R: HttpResponse>(response: &mut R) -> Result<bool, R::Error> {
    let status = response.status();
    if status != StatusCode::BAD_REQUEST && status != StatusCode::UNAUTHORIZED {
        return Ok(false);
    }

    let body = response.body()?;
    if serde_json::from_str::<ErrorBody>(&body)
        .is_ok_and(|error_body| error_body.error.as_deref() == Some(USE_DPOP_NONCE))
    {
        return Ok(true);
    }

    Ok(response
        .header(WWW_AUTHENTICATE.as_str())
        .is_some_and(|header| header.contains(USE_DPOP_NONCE)))
}

fn header_value(name: HeaderName, value: &str) -> Result<HeaderValue, ClientError> {
    HeaderValue::from_str(value).context(InvalidHeaderValueSnafu { name })
}

fn secret_header_value(name: HeaderName, value: &SecretString) -> Result<HeaderValue, ClientError> {
    let mut value = header_value(name, value.expose_secret())?;
    value.set_sensitive(true);
    Ok(value)
}
