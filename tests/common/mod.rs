//! Shared helpers: a scripted transport, a JWS verifier and key fixtures.

#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::{Duration, SystemTime},
};

use base64::prelude::*;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use rsa::signature::Verifier as _;
use sha2::Sha256;
use snafu::prelude::*;
use url::Url;

use oauth2_dpop_client::{
    OAuth2Config, OAuth2Handler,
    crypto::PrivateKey,
    dpop::StaticDPoPKeyProvider,
    http::{HttpResponse, HttpTransport},
    scope::StaticScopeResolver,
    token::{AccessToken, AccessTokenCache as _, InMemoryAccessTokenCache},
};

pub const RSA_2048: &str = include_str!("../fixtures/rsa-2048-pkcs8.pem");
pub const EC_P256: &str = include_str!("../fixtures/ec-p256-pkcs8.pem");

pub const TOKEN_ENDPOINT: &str = "https://as.example/token";
pub const ISSUER: &str = "https://as.example";
pub const API_URL: &str = "https://rs.example/items?page=2#top";

#[derive(Debug, Snafu)]
#[snafu(display("Stub transport failure"))]
pub struct StubError;

impl oauth2_dpop_client::Error for StubError {
    fn is_retryable(&self) -> bool {
        true
    }
}

#[derive(Debug)]
pub struct StubResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

impl StubResponse {
    pub fn new(status: u16, body: &str) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap(),
            headers: HeaderMap::new(),
            body: body.to_owned(),
        }
    }

    pub fn with_header(mut self, name: &'static str, value: &'static str) -> Self {
        self.headers.insert(
            HeaderName::from_bytes(name.as_bytes()).unwrap(),
            HeaderValue::from_static(value),
        );
        self
    }
}

impl HttpResponse for StubResponse {
    type Error = StubError;

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
        Ok(self.body.clone())
    }
}

#[derive(Debug)]
pub enum Call {
    Token {
        url: Url,
        form_body: String,
        headers: HeaderMap,
    },
    Resource { headers: HeaderMap },
}

pub struct StubRequest {
    pub method: Method,
    pub url: &'static str,
}

/// Replays scripted responses in order and records what was sent.
#[derive(Default)]
pub struct StubTransport {
    responses: Mutex<VecDeque<Result<StubResponse, StubError>>>,
    calls: Mutex<Vec<Call>>,
}

impl StubTransport {
    pub fn new(responses: impl IntoIterator<Item = StubResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Ok).collect()),
            calls: Mutex::default(),
        }
    }

    pub fn failing() -> Self {
        Self {
            responses: Mutex::new(VecDeque::from([Err(StubError)])),
            calls: Mutex::default(),
        }
    }

    fn next_response(&self) -> Result<StubResponse, StubError> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected request")
    }

    pub fn calls(&self) -> Vec<Call> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }
}

impl HttpTransport for StubTransport {
    type Request = StubRequest;
    type Response = StubResponse;
    type Error = StubError;

    fn method(&self, request: &StubRequest) -> Method {
        request.method.clone()
    }

    fn url(&self, request: &StubRequest) -> Result<Url, StubError> {
        Url::parse(request.url).map_err(|_| StubError)
    }

    fn send_token_request(
        &self,
        _request: &StubRequest,
        token_endpoint: &Url,
        form_body: String,
        headers: HeaderMap,
    ) -> Result<StubResponse, StubError> {
        self.calls.lock().unwrap().push(Call::Token {
            url: token_endpoint.clone(),
            form_body,
            headers,
        });
        self.next_response()
    }

    fn send_resource_request(
        &self,
        _request: &StubRequest,
        headers: HeaderMap,
    ) -> Result<StubResponse, StubError> {
        self.calls.lock().unwrap().push(Call::Resource { headers });
        self.next_response()
    }
}

pub struct Fixture {
    pub handler: OAuth2Handler,
    pub cache: Arc<InMemoryAccessTokenCache>,
    pub client_key: PrivateKey,
    pub dpop_key: PrivateKey,
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn fixture() -> Fixture {
    init_tracing();

    let client_key = PrivateKey::from_pkcs8_pem(RSA_2048).unwrap();
    let dpop_key = PrivateKey::from_pkcs8_pem(EC_P256).unwrap();
    let cache = Arc::new(InMemoryAccessTokenCache::new());

    let config = OAuth2Config::builder()
        .client_id("client-1")
        .token_endpoint(TOKEN_ENDPOINT)
        .issuer(ISSUER)
        .client_key(client_key.clone())
        .kid("client-kid")
        .scope_resolver(Arc::new(StaticScopeResolver::new(["s2", "s1"])))
        .access_token_cache(cache.clone())
        .dpop_key_provider(Arc::new(StaticDPoPKeyProvider::new(dpop_key.clone())))
        .build()
        .unwrap();

    Fixture {
        handler: OAuth2Handler::new(config),
        cache,
        client_key,
        dpop_key,
    }
}

pub fn get_request() -> StubRequest {
    StubRequest {
        method: Method::GET,
        url: API_URL,
    }
}

pub fn token_ok() -> StubResponse {
    StubResponse::new(
        200,
        r#"{"access_token":"T","token_type":"DPoP","expires_in":3600,"scope":"s1 s2"}"#,
    )
}

pub fn nonce_error(status: u16, nonce: &'static str) -> StubResponse {
    StubResponse::new(status, r#"{"error":"use_dpop_nonce"}"#).with_header("DPoP-Nonce", nonce)
}

pub fn header<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers.get(name).unwrap().to_str().unwrap()
}

pub fn decode(segment: &str) -> serde_json::Value {
    serde_json::from_slice(&BASE64_URL_SAFE_NO_PAD.decode(segment).unwrap()).unwrap()
}

/// Verifies a compact JWS with `key` and returns its header and claims.
pub fn verify(jws: &str, key: &PrivateKey) -> (serde_json::Value, serde_json::Value) {
    let parts: Vec<&str> = jws.split('.').collect();
    assert_eq!(parts.len(), 3);

    let signing_input = format!("{}.{}", parts[0], parts[1]);
    let signature = BASE64_URL_SAFE_NO_PAD.decode(parts[2]).unwrap();
    match key {
        PrivateKey::Rsa(key) => {
            let verifying_key = rsa::pss::VerifyingKey::<Sha256>::new(key.public_key());
            let signature = rsa::pss::Signature::try_from(signature.as_slice()).unwrap();
            verifying_key
                .verify(signing_input.as_bytes(), &signature)
                .expect("valid PS256 signature");
        }
        PrivateKey::Es256(key) => {
            let signature = p256::ecdsa::Signature::from_slice(&signature).unwrap();
            p256::ecdsa::signature::Verifier::verify(
                &key.verifying_key(),
                signing_input.as_bytes(),
                &signature,
            )
            .expect("valid ES256 signature");
        }
    }

    (decode(parts[0]), decode(parts[1]))
}

pub fn form(form_body: &str) -> Vec<(String, String)> {
    serde_html_form::from_str(form_body).unwrap()
}

pub fn form_value<'a>(form: &'a [(String, String)], name: &str) -> &'a str {
    form.iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
        .unwrap()
}

pub fn cache_token(cache: &InMemoryAccessTokenCache, jkt: String, token: &str) {
    cache.put(
        AccessToken::builder()
            .client_id("client-1")
            .scopes(["s1", "s2"])
            .expires_at(SystemTime::now() + Duration::from_secs(3600))
            .jkt(jkt)
            .token(token)
            .build(),
    );
}

