//! Implementations of the JSON Web Algorithms (JWA) standard
//!
//! The specifications for this standard can be found in [RFC7518][].
//!
//! Each submodule covers one algorithm family. The algorithm identifiers of a
//! family are plain enums, and each identifier is itself the capability that
//! the [`Registry`][crate::Registry] dispatches to: a [`jws::Signer`], a
//! [`jwe::ContentEncryption`] or a [`jwe::KeyManagement`].
//!
//! [RFC7518]: https://tools.ietf.org/html/rfc7518
//! [`jws::Signer`]: crate::jws::Signer
//! [`jwe::ContentEncryption`]: crate::jwe::ContentEncryption
//! [`jwe::KeyManagement`]: crate::jwe::KeyManagement

use ring::rand::SecureRandom;

use crate::error;

pub mod aes_cbc_hmac;
pub mod aes_gcm;
pub mod aes_gcm_kw;
pub mod aes_kw;
pub mod direct;
pub mod ec;
pub mod ecdh;
pub mod hmac;
pub mod pbes2;
pub mod rsa;

#[doc(inline)]
pub use ec::EllipticCurve;
#[doc(inline)]
pub use rsa::Rsa;

/// Fills a new buffer with `len` bytes from the system's secure RNG
pub(crate) fn random(len: usize) -> Result<Vec<u8>, error::Unexpected> {
    let mut buf = vec![0; len];
    ring::rand::SystemRandom::new()
        .fill(&mut buf)
        .map_err(|_| error::unexpected("random number generator failure"))?;
    Ok(buf)
}
