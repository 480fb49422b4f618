use http::{HeaderMap, Method, StatusCode};
use snafu::prelude::*;
use url::Url;

use super::{HttpResponse, HttpTransport};

/// Errors from the blocking `reqwest` transport.
#[derive(Debug, Snafu)]
pub enum ReqwestTransportError {
    /// The request could not be sent or the response could not be read.
    #[snafu(display("HTTP request failed"))]
    Request {
        /// The underlying error.
        source: reqwest::Error,
    },
    /// The request body is a stream, so the request cannot be sent again.
    #[snafu(display("Request body cannot be cloned"))]
    UnclonableBody,
}

impl crate::Error for ReqwestTransportError {
    fn is_retryable(&self) -> bool {
        match self {
            ReqwestTransportError::Request { source } => source.is_connect() || source.is_timeout(),
            ReqwestTransportError::UnclonableBody => false,
        }
    }
}

/// A transport backed by a blocking `reqwest` client.
///
/// Requests must have a cloneable body, since they are sent again when a
/// resource server asks for a `DPoP` nonce.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    /// Creates a transport using `client`.
    #[must_use]
    pub fn new(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }
}

impl HttpTransport for ReqwestTransport {
    type Request = reqwest::blocking::Request;
    type Response = ReqwestResponse;
    type Error = ReqwestTransportError;

    fn method(&self, request: &Self::Request) -> Method {
        request.method().clone()
    }

    fn url(&self, request: &Self::Request) -> Result<Url, Self::Error> {
        Ok(request.url().clone())
    }

    fn send_token_request(
        &self,
        _request: &Self::Request,
        token_endpoint: &Url,
        form_body: String,
        headers: HeaderMap,
    ) -> Result<Self::Response, Self::Error> {
        self.client
            .post(token_endpoint.clone())
            .headers(headers)
            .body(form_body)
            .send()
            .map(ReqwestResponse::new)
            .context(RequestSnafu)
    }

    fn send_resource_request(
        &self,
        request: &Self::Request,
        headers: HeaderMap,
    ) -> Result<Self::Response, Self::Error> {
        let mut request = request.try_clone().context(UnclonableBodySnafu)?;
        request.headers_mut().extend(headers);

        self.client
            .execute(request)
            .map(ReqwestResponse::new)
            .context(RequestSnafu)
    }
}

/// A response whose body is buffered on first read.
#[derive(Debug)]
pub struct ReqwestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Option<String>,
    response: Option<reqwest::blocking::Response>,
}

impl ReqwestResponse {
    fn new(response: reqwest::blocking::Response) -> Self {
        Self {
            status: response.status(),
            headers: response.headers().clone(),
            body: None,
            response: Some(response),
        }
    }

    /// The response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

impl HttpResponse for ReqwestResponse {
    type Error = ReqwestTransportError;

    fn status(&self) -> StatusCode {
        self.status
    }

    fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(ToOwned::to_owned)
    }

    fn body(&mut self) -> Result<String, Self::Error> {
        if let Some(response) = self.response.take() {
            self.body = Some(response.text().context(RequestSnafu)?);
        }
        Ok(self.body.clone().unwrap_or_default())
    }
}
