use base64::prelude::*;
use rand::RngCore as _;

const JTI_LEN: usize = 12;

/// Generates a 96 bit random JWT ID, encoded as unpadded base64url.
///
/// Bytes come from the operating system; if that source fails the
/// thread-local CSPRNG is used instead.
#[must_use]
pub fn random_jti() -> String {
    let mut bytes = [0u8; JTI_LEN];
    if rand::rngs::OsRng.try_fill_bytes(&mut bytes).is_err() {
        tracing::debug!("OS random source unavailable, using thread-local generator for jti");
        rand::thread_rng().fill_bytes(&mut bytes);
    }
    BASE64_URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jti_is_16_chars_of_base64url() {
        let jti = random_jti();

        assert_eq!(jti.len(), 16);
        assert_eq!(BASE64_URL_SAFE_NO_PAD.decode(&jti).unwrap().len(), JTI_LEN);
    }

    #[test]
    fn test_jti_values_differ() {
        assert_ne!(random_jti(), random_jti());
    }
}
