//! Key wrapping with AES-GCM
//!
//! The content encryption key is sealed with AES-GCM under the shared key and
//! a fresh IV. The IV and tag travel as the `iv` and `tag` header parameters;
//! the encrypted key segment holds only the ciphertext.

use std::fmt;

use jose_base64::encode;

use super::aes_gcm;
use crate::{
    error, header,
    header::Header,
    jwe,
    jwe::{Cek, KeyContext, Sealed, WrappedKey},
    Key,
};

/// AES-GCM key wrapping algorithms
///
/// This list may be expanded in the future.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
#[allow(clippy::upper_case_acronyms)]
#[non_exhaustive]
pub enum Algorithm {
    /// Key wrapping with AES-GCM using a 128-bit key
    A128GCMKW,
    /// Key wrapping with AES-GCM using a 192-bit key
    A192GCMKW,
    /// Key wrapping with AES-GCM using a 256-bit key
    A256GCMKW,
}

impl Algorithm {
    /// The identifier as it appears in the `alg` header parameter
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::A128GCMKW => "A128GCMKW",
            Self::A192GCMKW => "A192GCMKW",
            Self::A256GCMKW => "A256GCMKW",
        }
    }

    /// The length in bytes of the key-encryption key
    #[must_use]
    pub const fn key_len(self) -> usize {
        self.cipher().cek_len()
    }

    const fn cipher(self) -> aes_gcm::Algorithm {
        match self {
            Self::A128GCMKW => aes_gcm::Algorithm::A128GCM,
            Self::A192GCMKW => aes_gcm::Algorithm::A192GCM,
            Self::A256GCMKW => aes_gcm::Algorithm::A256GCM,
        }
    }

    fn kek<'k>(self, key: &'k Key) -> Result<&'k [u8], error::EncryptionError> {
        Ok(key
            .as_secret(self.name())?
            .require_len(self.name(), self.key_len())?)
    }
}

impl From<Algorithm> for jwe::Algorithm {
    fn from(alg: Algorithm) -> Self {
        Self::AesGcmKw(alg)
    }
}

impl jwe::KeyManagement for Algorithm {
    fn wrap(&self, key: &Key, ctx: &KeyContext<'_>) -> Result<WrappedKey, error::EncryptionError> {
        let kek = self.kek(key)?;

        let cek = Cek::random(ctx.cek_len())?;
        let sealed = self.cipher().seal(kek, &[], &cek)?;

        let additions = Header::new()
            .with(header::IV, encode(sealed.iv()))
            .with(header::TAG, encode(sealed.tag()));

        Ok(WrappedKey::new(cek, sealed.ciphertext().to_vec()).with_header(additions))
    }

    fn unwrap(
        &self,
        key: &Key,
        encrypted_key: &[u8],
        ctx: &KeyContext<'_>,
    ) -> Result<Cek, error::JoseError> {
        let kek = self.kek(key)?;

        let iv = ctx.header().require_bytes(header::IV)?;
        let tag = ctx.header().require_bytes(header::TAG)?;
        let sealed = Sealed::new(iv, encrypted_key.to_vec(), tag);

        let cek = Cek::new(self.cipher().open(kek, &[], &sealed)?);
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

#[cfg(test)]
mod tests {
    use color_eyre::Result;

    use super::*;
    use crate::jwe::KeyManagement;

    #[test]
    fn carries_iv_and_tag_in_header() -> Result<()> {
        let key = Key::secret(vec![0x61; 24]);
        let empty = Header::new();
        let ctx = KeyContext::new(jwe::Encryption::A256CBC_HS512, &empty);

        let wrapped = Algorithm::A192GCMKW.wrap(&key, &ctx)?;
        assert_eq!(wrapped.encrypted_key().len(), 64);

        let names: Vec<_> = wrapped.header().iter().map(|(k, _)| k).collect();
        assert_eq!(names, ["iv", "tag"]);
        assert_eq!(wrapped.header().iv().map(str::len), Some(16));
        assert_eq!(wrapped.header().tag().map(str::len), Some(22));

        let received = KeyContext::new(jwe::Encryption::A256CBC_HS512, wrapped.header());
        let cek = Algorithm::A192GCMKW.unwrap(&key, wrapped.encrypted_key(), &received)?;
        assert_eq!(&*cek, &**wrapped.cek());

        Ok(())
    }

    #[test]
    fn missing_header_parameters_are_malformed() -> Result<()> {
        let key = Key::secret(vec![0x61; 16]);
        let empty = Header::new();
        let ctx = KeyContext::new(jwe::Encryption::A128GCM, &empty);

        let err = Algorithm::A128GCMKW
            .unwrap(&key, &[0; 16], &ctx)
            .unwrap_err();
        assert!(err.is_deserialization());

        Ok(())
    }

    #[test]
    fn rejects_altered_tag() -> Result<()> {
        let key = Key::secret(vec![0x61; 32]);
        let empty = Header::new();
        let ctx = KeyContext::new(jwe::Encryption::A128GCM, &empty);

        let wrapped = Algorithm::A256GCMKW.wrap(&key, &ctx)?;
        let mut tag = wrapped.header().require_bytes(header::TAG)?;
        tag[0] ^= 0x80;
        let altered = wrapped.header().clone().with(header::TAG, encode(&tag));

        let received = KeyContext::new(jwe::Encryption::A128GCM, &altered);
        let err = Algorithm::A256GCMKW
            .unwrap(&key, wrapped.encrypted_key(), &received)
            .unwrap_err();
        assert!(err.is_integrity());

        Ok(())
    }
}
