use std::time::Duration;

use bon::Builder;
use secrecy::SecretString;

use crate::{
    client_auth::{AuthenticationParams, ClientAuthentication},
    crypto::signer::JwsSigningKey,
    jwt::{JwsSerializationError, SimpleJwt, unix_now},
};

/// The `client_assertion_type` of a JWT bearer assertion (RFC 7523 §2.2).
pub const CLIENT_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

/// How long an assertion is valid for, before clock skew is added.
const ASSERTION_LIFETIME: Duration = Duration::from_secs(90);

/// JWT Authentication with a private key (RFC 7523, `private_key_jwt`).
///
/// The client authenticates using a JWT signed with its private key. The
/// assertion carries these claims:
///  - iss and sub (client ID)
///  - aud (the authorization server's issuer identifier, as FAPI 2.0 requires)
///  - jti (unique ID for replay protection)
///  - iat (current time)
///  - exp (current time + 90 seconds + clock skew tolerance)
///  - nbf (current time - clock skew tolerance)
///
/// The JOSE header is `{alg, typ: "JWT", kid}`, with `alg` derived from the
/// key type and `kid` from the key metadata.
#[derive(Debug, Clone, Builder)]
pub struct JwtBearer<Sgn: JwsSigningKey> {
    /// The signer of the JWT.
    signer: Sgn,
    /// The audience, used verbatim.
    #[builder(into)]
    audience: String,
    /// Allowance for clock differences with the authorization server.
    clock_skew_tolerance: Duration,
}

impl<Sgn: JwsSigningKey> JwtBearer<Sgn> {
    /// Creates a signed client assertion for `client_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the assertion could not be serialized or signed.
    pub fn assertion(
        &self,
        client_id: &str,
    ) -> Result<SecretString, JwsSerializationError<Sgn::Error>> {
        let now = unix_now();
        let skew = self.clock_skew_tolerance.as_secs();

        SimpleJwt::builder()
            .audience(self.audience.as_str())
            .issuer(client_id)
            .subject(client_id)
            .issued_at(now)
            .expiration(now.saturating_add(ASSERTION_LIFETIME.as_secs()).saturating_add(skew))
            .not_before(now.saturating_sub(skew))
            .build()
            .to_jws_compact(&self.signer)
    }
}

impl<Sgn: JwsSigningKey> ClientAuthentication for JwtBearer<Sgn> {
    type Error = JwsSerializationError<Sgn::Error>;

    fn authentication_params<'a>(
        &'a self,
        client_id: &'a str,
    ) -> Result<AuthenticationParams<'a>, Self::Error> {
        Ok(AuthenticationParams::builder()
            .form_params(vec![
                ("client_assertion_type", CLIENT_ASSERTION_TYPE.into()),
                ("client_assertion", self.assertion(client_id)?.into()),
            ])
            .build())
    }
}
