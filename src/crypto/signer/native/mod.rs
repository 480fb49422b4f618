mod es256;
mod rsa;

pub(crate) use es256::CURVE as P256_CURVE;
pub use es256::Es256PrivateKey;
pub use rsa::RsaPrivateKey;
