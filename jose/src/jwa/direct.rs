//! Direct use of a shared symmetric key as the content encryption key

use crate::{
    error, jwe,
    jwe::{Cek, KeyContext, WrappedKey},
    Key,
};

/// The `dir` key management algorithm
///
/// The provided secret is the content encryption key, so its length must
/// match the content encryption algorithm exactly. The encrypted key segment
/// is always empty.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub struct Direct;

impl Direct {
    /// The identifier as it appears in the `alg` header parameter
    pub const NAME: &'static str = "dir";

    fn cek(key: &Key, ctx: &KeyContext<'_>) -> Result<Cek, error::EncryptionError> {
        let secret = key
            .as_secret(Self::NAME)?
            .require_len(Self::NAME, ctx.cek_len())?;

        Ok(Cek::new(secret.to_vec()))
    }
}

impl From<Direct> for jwe::Algorithm {
    fn from(_: Direct) -> Self {
        Self::Direct
    }
}

impl jwe::KeyManagement for Direct {
    fn wrap(&self, key: &Key, ctx: &KeyContext<'_>) -> Result<WrappedKey, error::EncryptionError> {
        Ok(WrappedKey::new(Self::cek(key, ctx)?, Vec::new()))
    }

    fn unwrap(
        &self,
        key: &Key,
        encrypted_key: &[u8],
        ctx: &KeyContext<'_>,
    ) -> Result<Cek, error::JoseError> {
        if !encrypted_key.is_empty() {
            return Err(error::malformed("encrypted key must be empty with 'dir'").into());
        }

        Ok(Self::cek(key, ctx)?)
    }
}
