use std::collections::BTreeSet;

use bon::Builder;
use serde::Serialize;
use snafu::prelude::*;

use crate::client_auth::AuthenticationParams;

/// The `grant_type` of the client credentials grant.
pub const GRANT_TYPE: &str = "client_credentials";

/// The form body could not be encoded.
#[derive(Debug, Snafu)]
#[snafu(display("Failed to serialize token request parameters"))]
pub struct FormEncodeError {
    source: serde_html_form::ser::Error,
}

impl crate::Error for FormEncodeError {
    fn is_retryable(&self) -> bool {
        false
    }
}

#[derive(Debug, Serialize)]
struct ClientCredentialsForm<'a> {
    client_id: &'a str,
    grant_type: &'static str,
    scope: String,
}

/// A client credentials token request.
///
/// The body is `client_id`, `grant_type`, `scope` (space separated, sent
/// even when empty), followed by the client authentication parameters.
#[derive(Debug, Builder)]
pub struct ClientCredentialsRequest<'a> {
    client_id: &'a str,
    scopes: &'a BTreeSet<String>,
    auth_params: AuthenticationParams<'a>,
}

impl ClientCredentialsRequest<'_> {
    /// Encodes the request as `application/x-www-form-urlencoded`.
    ///
    /// # Errors
    ///
    /// Returns an error if a parameter could not be encoded.
    pub fn form_body(&self) -> Result<String, FormEncodeError> {
        let form = ClientCredentialsForm {
            client_id: self.client_id,
            grant_type: GRANT_TYPE,
            scope: self
                .scopes
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(" "),
        };

        let mut body = serde_html_form::to_string(&form).context(FormEncodeSnafu)?;
        if !self.auth_params.form_params.is_empty() {
            body.push('&');
            serde_html_form::push_to_string(&mut body, &self.auth_params.form_params)
                .context(FormEncodeSnafu)?;
        }

        Ok(body)
    }

    /// The body with sensitive values redacted, for logging.
    #[must_use]
    pub fn redacted_form_params(&self) -> Vec<(&'static str, &str)> {
        self.auth_params
            .form_params
            .iter()
            .map(|(name, value)| (*name, value.redacted()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn scopes(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_form_body_order_and_encoding() {
        let scopes = scopes(&["svc:write", "svc:read"]);
        let request = ClientCredentialsRequest::builder()
            .client_id("client id")
            .scopes(&scopes)
            .auth_params(
                AuthenticationParams::builder()
                    .form_params(vec![
                        ("client_assertion_type", "urn:x".into()),
                        ("client_assertion", SecretString::from("a.b.c").into()),
                    ])
                    .build(),
            )
            .build();

        assert_eq!(
            request.form_body().unwrap(),
            "client_id=client+id&grant_type=client_credentials&scope=svc%3Aread+svc%3Awrite\
             &client_assertion_type=urn%3Ax&client_assertion=a.b.c"
        );
        assert_eq!(
            request.redacted_form_params(),
            vec![("client_assertion_type", "urn:x"), ("client_assertion", "[REDACTED]")]
        );
    }

    #[test]
    fn test_empty_scope_is_still_sent() {
        let scopes = BTreeSet::new();
        let request = ClientCredentialsRequest::builder()
            .client_id("c")
            .scopes(&scopes)
            .auth_params(AuthenticationParams::builder().build())
            .build();

        assert_eq!(
            request.form_body().unwrap(),
            "client_id=c&grant_type=client_credentials&scope="
        );
    }
}
