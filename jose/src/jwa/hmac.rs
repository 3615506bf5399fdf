//! HMAC JSON Web Algorithm implementations

use std::fmt;

use crate::{error, jws, Key};

/// HMAC signing algorithms
///
/// This list may be expanded in the future.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
#[allow(clippy::upper_case_acronyms)]
#[non_exhaustive]
pub enum SigningAlgorithm {
    /// HMAC using SHA-256
    HS256,
    /// HMAC using SHA-384
    HS384,
    /// HMAC using SHA-512
    HS512,
}

impl SigningAlgorithm {
    /// The identifier as it appears in the `alg` header parameter
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::HS256 => "HS256",
            Self::HS384 => "HS384",
            Self::HS512 => "HS512",
        }
    }

    /// Recommended key size in bytes for an HMAC secret
    #[must_use]
    pub const fn recommended_key_size(self) -> usize {
        self.signature_size()
    }

    /// The size in bytes of an HMAC signature
    #[must_use]
    pub const fn signature_size(self) -> usize {
        match self {
            Self::HS256 => 256 / 8,
            Self::HS384 => 384 / 8,
            Self::HS512 => 512 / 8,
        }
    }

    fn into_ring_algorithm(self) -> ring::hmac::Algorithm {
        match self {
            Self::HS256 => ring::hmac::HMAC_SHA256,
            Self::HS384 => ring::hmac::HMAC_SHA384,
            Self::HS512 => ring::hmac::HMAC_SHA512,
        }
    }

    fn ring_key(self, key: Option<&Key>) -> Result<ring::hmac::Key, error::EncryptionError> {
        let secret = key
            .ok_or_else(|| error::missing_key(self.name()))?
            .as_secret(self.name())?;
        Ok(ring::hmac::Key::new(
            self.into_ring_algorithm(),
            secret.as_slice(),
        ))
    }
}

impl From<SigningAlgorithm> for jws::Algorithm {
    fn from(alg: SigningAlgorithm) -> Self {
        Self::Hmac(alg)
    }
}

impl jws::Signer for SigningAlgorithm {
    fn sign(&self, key: Option<&Key>, data: &[u8]) -> Result<Vec<u8>, error::EncryptionError> {
        let key = self.ring_key(key)?;
        let digest = ring::hmac::sign(&key, data);
        Ok(digest.as_ref().to_owned())
    }

    fn verify(
        &self,
        key: Option<&Key>,
        data: &[u8],
        signature: &[u8],
    ) -> Result<(), error::JoseError> {
        let key = self.ring_key(key)?;
        ring::hmac::verify(&key, data, signature).map_err(|_| error::integrity_violation())?;
        Ok(())
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;

    use super::*;
    use crate::jws::Signer;

    const DATA: &[u8] = b"eyJhbGciOiJIUzI1NiJ9.eyJoZWxsbyI6ICJ3b3JsZCJ9";

    #[test]
    fn signatures_are_deterministic() -> Result<()> {
        let key = Key::secret(vec![0x5a; 32]);

        for alg in &[
            SigningAlgorithm::HS256,
            SigningAlgorithm::HS384,
            SigningAlgorithm::HS512,
        ] {
            let first = alg.sign(Some(&key), DATA)?;
            let second = alg.sign(Some(&key), DATA)?;

            assert_eq!(first.len(), alg.signature_size());
            assert_eq!(first, second);
            alg.verify(Some(&key), DATA, &first)?;
        }

        Ok(())
    }

    #[test]
    fn rejects_altered_signature() -> Result<()> {
        let key = Key::secret(vec![0x5a; 32]);
        let mut sig = SigningAlgorithm::HS256.sign(Some(&key), DATA)?;
        sig[0] ^= 1;

        let err = SigningAlgorithm::HS256
            .verify(Some(&key), DATA, &sig)
            .unwrap_err();
        assert!(err.is_integrity());

        Ok(())
    }

    #[test]
    fn requires_a_symmetric_key() {
        let err = SigningAlgorithm::HS512.sign(None, DATA).unwrap_err();
        assert!(matches!(err, error::EncryptionError::MissingKey(_)));
    }
}
