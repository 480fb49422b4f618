use snafu::Snafu;

/// The error type returned by signing key operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(super)))]
pub enum JwsSignerError<E: crate::Error + 'static> {
    /// Key metadata is mismatched.
    ///
    /// The algorithm or key ID advertised for the JWS does not belong to the
    /// key asked to sign it.
    #[snafu(display("Signing key does not match the requested algorithm or key ID"))]
    MismatchedKeyMetadata,
    /// The error from the underlying implementation.
    UnderlyingError {
        /// The underlying error.
        source: E,
    },
}

impl<E: crate::Error> crate::Error for JwsSignerError<E> {
    fn is_retryable(&self) -> bool {
        match self {
            JwsSignerError::MismatchedKeyMetadata => false,
            JwsSignerError::UnderlyingError { source } => source.is_retryable(),
        }
    }
}
