//! JWT support
//!
//! Supports the following operations:
//!  - Typesafe JWT builder
//!  - Creation of a JWT using JWS compact serialization

mod builder;
mod structure;

pub use builder::{JwsSerializationError, Jwt, JwtBuilder, SimpleJwt, unix_now};
