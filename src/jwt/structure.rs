use std::borrow::Cow;

use serde::{Serialize, Serializer};

fn serialize_string_or_vec<S>(values: &'_ [Cow<'_, str>], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    use serde::ser::SerializeSeq as _;

    match values.len() {
        0 => serializer.serialize_none(),
        1 => serializer.serialize_str(values[0].as_ref()),
        n => {
            let mut seq = serializer.serialize_seq(Some(n))?;
            for element in values {
                seq.serialize_element(element)?;
            }
            seq.end()
        }
    }
}

/// The JOSE header of a signed JWT.
#[derive(Debug, Clone, Serialize)]
pub struct JwtHeader<'a, ExtraHeaders: Clone> {
    pub alg: Cow<'a, str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typ: Option<Cow<'a, str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<Cow<'a, str>>,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub extra_headers: Option<Cow<'a, ExtraHeaders>>,
}

/// The registered claims of a JWT, plus any extra claims flattened in.
///
/// Absent claims are omitted rather than serialized as `null`.
#[derive(Debug, Clone, Serialize)]
pub struct JwtClaims<'a, ExtraClaims: Clone> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<Cow<'a, str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<Cow<'a, str>>,
    #[serde(
        skip_serializing_if = "Vec::is_empty",
        serialize_with = "serialize_string_or_vec"
    )]
    pub aud: Vec<Cow<'a, str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<Cow<'a, str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nbf: Option<u64>,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub extra_claims: Option<Cow<'a, ExtraClaims>>,
}
