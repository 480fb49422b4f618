//! The default `User-Agent` header value.

/// Builds `<product>/<version> (Rust; <os> <arch>)`, for example
/// `oauth2-dpop-client/0.1.0 (Rust; linux x86_64)`.
#[must_use]
pub fn default_user_agent() -> String {
    format!(
        "{}/{} (Rust; {} {})",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH,
    )
}
