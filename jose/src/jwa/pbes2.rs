//! Password-based key wrapping (PBES2)
//!
//! A key-encryption key is stretched from the password with PBKDF2, salted
//! with `alg || 0x00 || p2s`, and then wraps a random content encryption key
//! with AES Key Wrap. The salt input (`p2s`) and iteration count (`p2c`) are
//! carried in the protected header.

use std::{convert::TryFrom, fmt, num::NonZeroU32};

use zeroize::Zeroizing;

use super::aes_kw;
use crate::{
    error, header,
    header::Header,
    jwa, jwe,
    jwe::{Cek, KeyContext, WrappedKey},
    Key,
};

/// PBES2 algorithms
///
/// This list may be expanded in the future.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
#[allow(non_camel_case_types, clippy::upper_case_acronyms)]
#[non_exhaustive]
pub enum Algorithm {
    /// PBES2 with HMAC SHA-256 and A128KW wrapping
    PBES2_HS256_A128KW,
    /// PBES2 with HMAC SHA-384 and A192KW wrapping
    PBES2_HS384_A192KW,
    /// PBES2 with HMAC SHA-512 and A256KW wrapping
    PBES2_HS512_A256KW,
}

impl Algorithm {
    /// The identifier as it appears in the `alg` header parameter
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::PBES2_HS256_A128KW => "PBES2-HS256+A128KW",
            Self::PBES2_HS384_A192KW => "PBES2-HS384+A192KW",
            Self::PBES2_HS512_A256KW => "PBES2-HS512+A256KW",
        }
    }

    const fn key_wrap(self) -> aes_kw::Algorithm {
        match self {
            Self::PBES2_HS256_A128KW => aes_kw::Algorithm::A128KW,
            Self::PBES2_HS384_A192KW => aes_kw::Algorithm::A192KW,
            Self::PBES2_HS512_A256KW => aes_kw::Algorithm::A256KW,
        }
    }

    fn prf(self) -> ring::pbkdf2::Algorithm {
        match self {
            Self::PBES2_HS256_A128KW => ring::pbkdf2::PBKDF2_HMAC_SHA256,
            Self::PBES2_HS384_A192KW => ring::pbkdf2::PBKDF2_HMAC_SHA384,
            Self::PBES2_HS512_A256KW => ring::pbkdf2::PBKDF2_HMAC_SHA512,
        }
    }

    fn derive(self, password: &[u8], p2s: &[u8], iterations: NonZeroU32) -> Zeroizing<Vec<u8>> {
        let mut salt = Vec::with_capacity(self.name().len() + 1 + p2s.len());
        salt.extend_from_slice(self.name().as_bytes());
        salt.push(0);
        salt.extend_from_slice(p2s);

        let mut kek = Zeroizing::new(vec![0; self.key_wrap().key_len()]);
        ring::pbkdf2::derive(self.prf(), iterations, &salt, password, &mut kek);
        kek
    }
}

impl From<Algorithm> for jwe::Algorithm {
    fn from(alg: Algorithm) -> Self {
        Self::Pbes2(alg)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A configured PBES2 key management algorithm
///
/// The iteration count and salt length only affect the producing side.
/// Consumers take both from the received header, within fixed bounds.
///
/// ```
/// use jose::jwa::pbes2::{Algorithm, Pbes2};
///
/// let pbes2 = Pbes2::new(Algorithm::PBES2_HS256_A128KW).with_iterations(310_000);
/// assert_eq!(pbes2.iterations(), 310_000);
/// ```
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
#[must_use]
pub struct Pbes2 {
    alg: Algorithm,
    iterations: u32,
    salt_len: usize,
}

impl Pbes2 {
    /// Iteration count used when none is configured
    pub const DEFAULT_ITERATIONS: u32 = 8192;

    /// Salt length in bytes used when none is configured
    pub const DEFAULT_SALT_LEN: usize = 12;

    /// Largest iteration count accepted from a received header
    pub const MAX_ITERATIONS: u32 = 1_000_000;

    /// Shortest salt accepted from a received header
    pub const MIN_SALT_LEN: usize = 8;

    /// The algorithm with the default iteration count and salt length
    pub const fn new(alg: Algorithm) -> Self {
        Self {
            alg,
            iterations: Self::DEFAULT_ITERATIONS,
            salt_len: Self::DEFAULT_SALT_LEN,
        }
    }

    /// Sets the iteration count, kept between 1 and [`MAX_ITERATIONS`](Self::MAX_ITERATIONS)
    pub fn with_iterations(self, iterations: u32) -> Self {
        Self {
            iterations: iterations.max(1).min(Self::MAX_ITERATIONS),
            ..self
        }
    }

    /// Sets the salt length, no shorter than [`MIN_SALT_LEN`](Self::MIN_SALT_LEN)
    pub fn with_salt_len(self, salt_len: usize) -> Self {
        Self {
            salt_len: salt_len.max(Self::MIN_SALT_LEN),
            ..self
        }
    }

    /// The algorithm
    #[must_use]
    pub const fn algorithm(&self) -> Algorithm {
        self.alg
    }

    /// The iteration count written to `p2c`
    #[must_use]
    pub const fn iterations(&self) -> u32 {
        self.iterations
    }

    /// The length of the salt written to `p2s`
    #[must_use]
    pub const fn salt_len(&self) -> usize {
        self.salt_len
    }
}

impl From<Algorithm> for Pbes2 {
    fn from(alg: Algorithm) -> Self {
        Self::new(alg)
    }
}

impl jwe::KeyManagement for Pbes2 {
    fn wrap(&self, key: &Key, ctx: &KeyContext<'_>) -> Result<WrappedKey, error::EncryptionError> {
        let password = key.as_secret(self.alg.name())?.as_slice();

        let p2s = jwa::random(self.salt_len)?;
        let iterations = NonZeroU32::new(self.iterations)
            .ok_or_else(|| error::unexpected("iteration count must be positive"))?;
        let kek = self.alg.derive(password, &p2s, iterations);

        let cek = Cek::random(ctx.cek_len())?;
        let encrypted_key = aes_kw::wrap(&kek, &cek)?;

        let additions = Header::new()
            .with(header::P2C, self.iterations)
            .with(header::P2S, jose_base64::encode(&p2s));

        Ok(WrappedKey::new(cek, encrypted_key).with_header(additions))
    }

    fn unwrap(
        &self,
        key: &Key,
        encrypted_key: &[u8],
        ctx: &KeyContext<'_>,
    ) -> Result<Cek, error::JoseError> {
        let password = key.as_secret(self.alg.name())?.as_slice();

        let p2c = ctx
            .header()
            .get(header::P2C)
            .ok_or_else(|| header::missing(header::P2C))?
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .filter(|&n| n <= Self::MAX_ITERATIONS)
            .and_then(NonZeroU32::new)
            .ok_or_else(|| header::invalid(header::P2C, "iteration count out of range"))?;

        let p2s = ctx.header().require_bytes(header::P2S)?;
        if p2s.len() < Self::MIN_SALT_LEN {
            return Err(header::invalid(header::P2S, "salt input too short").into());
        }

        let kek = self.alg.derive(password, &p2s, p2c);

        let cek = aes_kw::unwrap(&kek, encrypted_key)?;
        if cek.len() != ctx.cek_len() {
            return Err(error::integrity_violation().into());
        }

        Ok(cek)
    }
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;

    use super::*;
    use crate::jwe::KeyManagement;

    #[test]
    fn writes_count_then_salt() -> Result<()> {
        let empty = Header::new();
        let ctx = KeyContext::new(jwe::Encryption::A128CBC_HS256, &empty);
        let pbes2 = Pbes2::new(Algorithm::PBES2_HS256_A128KW).with_iterations(1000);

        let wrapped = pbes2.wrap(&Key::password("top secret"), &ctx)?;
        let names: Vec<_> = wrapped.header().iter().map(|(k, _)| k).collect();
        assert_eq!(names, ["p2c", "p2s"]);
        assert_eq!(wrapped.header().p2c(), Some(1000));
        assert_eq!(wrapped.header().require_bytes(header::P2S)?.len(), 12);
        assert_eq!(wrapped.encrypted_key().len(), 40);

        let received = KeyContext::new(jwe::Encryption::A128CBC_HS256, wrapped.header());
        let cek = pbes2.unwrap(&Key::password("top secret"), wrapped.encrypted_key(), &received)?;
        assert_eq!(&*cek, &**wrapped.cek());

        let err = pbes2
            .unwrap(&Key::password("top secreT"), wrapped.encrypted_key(), &received)
            .unwrap_err();
        assert!(err.is_integrity());

        Ok(())
    }

    #[test]
    fn builder_clamps_parameters() {
        let pbes2 = Pbes2::new(Algorithm::PBES2_HS512_A256KW)
            .with_iterations(0)
            .with_salt_len(2);
        assert_eq!(pbes2.iterations(), 1);
        assert_eq!(pbes2.salt_len(), Pbes2::MIN_SALT_LEN);

        let pbes2 = pbes2.with_iterations(u32::MAX);
        assert_eq!(pbes2.iterations(), Pbes2::MAX_ITERATIONS);
    }

    #[test]
    fn refuses_excessive_iteration_counts() {
        let pbes2 = Pbes2::new(Algorithm::PBES2_HS256_A128KW);
        let key = Key::password("top secret");

        for p2c in &[0_u64, 1_000_001, u64::from(u32::MAX) + 1] {
            let header = Header::new()
                .with(header::P2C, *p2c)
                .with(header::P2S, "b0YEVlLzkZ5oTR0L");
            let ctx = KeyContext::new(jwe::Encryption::A128GCM, &header);

            let err = pbes2.unwrap(&key, &[0; 24], &ctx).unwrap_err();
            assert!(err.is_deserialization(), "p2c = {}", p2c);
        }
    }

    #[test]
    fn refuses_short_salts() {
        let pbes2 = Pbes2::new(Algorithm::PBES2_HS256_A128KW);
        let header = Header::new()
            .with(header::P2C, 8192)
            .with(header::P2S, "AAECAw");
        let ctx = KeyContext::new(jwe::Encryption::A128GCM, &header);

        let err = pbes2
            .unwrap(&Key::password("top secret"), &[0; 24], &ctx)
            .unwrap_err();
        assert!(err.is_deserialization());
    }
}
