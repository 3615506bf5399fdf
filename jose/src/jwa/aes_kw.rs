//! AES Key Wrap (RFC 3394) key management

use std::fmt;

use openssl::aes::{self, AesKey};

use crate::{
    error, jwe,
    jwe::{Cek, KeyContext, WrappedKey},
    Key,
};

/// AES Key Wrap algorithms
///
/// This list may be expanded in the future.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
#[allow(clippy::upper_case_acronyms)]
#[non_exhaustive]
pub enum Algorithm {
    /// AES Key Wrap using a 128-bit key
    A128KW,
    /// AES Key Wrap using a 192-bit key
    A192KW,
    /// AES Key Wrap using a 256-bit key
    A256KW,
}

impl Algorithm {
    /// The identifier as it appears in the `alg` header parameter
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::A128KW => "A128KW",
            Self::A192KW => "A192KW",
            Self::A256KW => "A256KW",
        }
    }

    /// The length in bytes of the key-encryption key
    #[must_use]
    pub const fn key_len(self) -> usize {
        match self {
            Self::A128KW => 16,
            Self::A192KW => 24,
            Self::A256KW => 32,
        }
    }

    fn kek<'k>(self, key: &'k Key) -> Result<&'k [u8], error::EncryptionError> {
        Ok(key
            .as_secret(self.name())?
            .require_len(self.name(), self.key_len())?)
    }
}

/// Wraps `cek` under `kek` with the default initial value
pub(crate) fn wrap(kek: &[u8], cek: &[u8]) -> Result<Vec<u8>, error::Unexpected> {
    if cek.len() < 16 || cek.len() % 8 != 0 {
        return Err(error::unexpected("key data must be a multiple of 64 bits"));
    }

    let key = AesKey::new_encrypt(kek).map_err(|_| error::unexpected("invalid AES key"))?;

    let mut wrapped = vec![0; cek.len() + 8];
    aes::wrap_key(&key, None, &mut wrapped, cek)
        .map_err(|_| error::unexpected("AES key wrap failed"))?;

    Ok(wrapped)
}

/// Unwraps a key, checking the integrity of the default initial value
pub(crate) fn unwrap(kek: &[u8], wrapped: &[u8]) -> Result<Cek, error::IntegrityError> {
    if wrapped.len() < 24 || wrapped.len() % 8 != 0 {
        return Err(error::integrity_violation());
    }

    let key = AesKey::new_decrypt(kek).map_err(|_| error::integrity_violation())?;

    let mut cek = Cek::new(vec![0; wrapped.len() - 8]);
    aes::unwrap_key(&key, None, cek.as_mut_slice(), wrapped)
        .map_err(|_| error::integrity_violation())?;

    Ok(cek)
}

impl From<Algorithm> for jwe::Algorithm {
    fn from(alg: Algorithm) -> Self {
        Self::AesKw(alg)
    }
}

impl jwe::KeyManagement for Algorithm {
    fn wrap(&self, key: &Key, ctx: &KeyContext<'_>) -> Result<WrappedKey, error::EncryptionError> {
        let kek = self.kek(key)?;

        let cek = Cek::random(ctx.cek_len())?;
        let encrypted_key = wrap(kek, &cek)?;

        Ok(WrappedKey::new(cek, encrypted_key))
    }

    fn unwrap(
        &self,
        key: &Key,
        encrypted_key: &[u8],
        ctx: &KeyContext<'_>,
    ) -> Result<Cek, error::JoseError> {
        let kek = self.kek(key)?;

        let cek = unwrap(kek, encrypted_key)?;
        if cek.len() != ctx.cek_len() {
            return Err(error::integrity_violation().into());
        }

        Ok(cek)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}
