//! Key material handed to the signing and encryption engines
//!
//! A [`Key`] is one of three families. Which family an algorithm accepts is
//! fixed by the algorithm; supplying a key from another family is reported as
//! an [`IncompatibleKey`][crate::error::IncompatibleKey] error before any
//! cryptographic operation runs.
//!
//! | Family | Algorithms |
//! |---|---|
//! | [`Secret`] | `HS*`, `dir`, `A*KW`, `A*GCMKW`, `PBES2-*` (as the password) |
//! | [`jwa::Rsa`] | `RS*`, `PS*`, `RSA1_5`, `RSA-OAEP`, `RSA-OAEP-256` |
//! | [`jwa::EllipticCurve`] | `ES*`, `ECDH-ES`, `ECDH-ES+A*KW` |

use std::fmt;

use jose_base64::Base64Url;
use ring::rand::SecureRandom;
use zeroize::Zeroize;

use crate::{error, jwa};

/// Key material for a JOSE operation
#[derive(Clone, Debug)]
#[must_use]
pub enum Key {
    /// Symmetric secret or password
    Secret(Secret),

    /// RSA public key or key pair
    Rsa(jwa::Rsa),

    /// Elliptic curve public key or key pair
    EllipticCurve(jwa::EllipticCurve),
}

impl Key {
    /// A symmetric key from raw bytes
    ///
    /// ```
    /// use jose::Key;
    ///
    /// let key = Key::secret(*b"a0a2abd8-6162-41c3-83d6-1cf559b46afc");
    /// # let _ = key;
    /// ```
    pub fn secret(secret: impl Into<Vec<u8>>) -> Self {
        Self::Secret(Secret::new(secret.into()))
    }

    /// A password for the `PBES2-*` algorithms, used as its UTF-8 bytes
    pub fn password(password: &str) -> Self {
        Self::secret(password.as_bytes())
    }

    /// Removes any private key components
    ///
    /// Symmetric secrets are returned unchanged.
    pub fn public_only(self) -> Self {
        match self {
            Self::Secret(_) => self,
            Self::Rsa(rsa) => Self::Rsa(rsa.public_only()),
            Self::EllipticCurve(ec) => Self::EllipticCurve(ec.public_only()),
        }
    }

    fn family(&self) -> &'static str {
        match self {
            Self::Secret(_) => "symmetric",
            Self::Rsa(_) => "RSA",
            Self::EllipticCurve(_) => "EC",
        }
    }

    pub(crate) fn as_secret(&self, alg: &'static str) -> Result<&Secret, error::IncompatibleKey> {
        match self {
            Self::Secret(secret) => Ok(secret),
            _ => Err(error::incompatible_key(self.family(), alg)),
        }
    }

    pub(crate) fn as_rsa(&self, alg: &'static str) -> Result<&jwa::Rsa, error::IncompatibleKey> {
        match self {
            Self::Rsa(rsa) => Ok(rsa),
            _ => Err(error::incompatible_key(self.family(), alg)),
        }
    }

    pub(crate) fn as_ec(
        &self,
        alg: &'static str,
    ) -> Result<&jwa::EllipticCurve, error::IncompatibleKey> {
        match self {
            Self::EllipticCurve(ec) => Ok(ec),
            _ => Err(error::incompatible_key(self.family(), alg)),
        }
    }
}

impl From<Secret> for Key {
    fn from(secret: Secret) -> Self {
        Self::Secret(secret)
    }
}

impl From<jwa::Rsa> for Key {
    fn from(rsa: jwa::Rsa) -> Self {
        Self::Rsa(rsa)
    }
}

impl From<jwa::EllipticCurve> for Key {
    fn from(ec: jwa::EllipticCurve) -> Self {
        Self::EllipticCurve(ec)
    }
}

/// Symmetric secret
///
/// The bytes are scrubbed from memory when the secret is dropped.
#[derive(Clone)]
#[must_use]
pub struct Secret {
    secret: Base64Url,
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Secret")
            .field("len", &self.len())
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl Secret {
    /// A secret holding the provided bytes
    pub fn new(secret: impl Into<Base64Url>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Generates a new random secret of `len` bytes
    ///
    /// # Errors
    ///
    /// Unable to generate a new secret.
    pub fn generate(len: usize) -> Result<Self, error::Unexpected> {
        Self::generate_with_rng(len, &ring::rand::SystemRandom::new())
    }

    /// Generates a new random secret of `len` bytes using the provided source
    /// of randomness
    ///
    /// # Errors
    ///
    /// Unable to generate a new secret from the provided RNG.
    pub fn generate_with_rng(
        len: usize,
        rng: &dyn SecureRandom,
    ) -> Result<Self, error::Unexpected> {
        let mut secret = Base64Url::from_raw(vec![0; len]);

        rng.fill(secret.as_mut_slice())
            .map_err(|_| error::unexpected("random number generator failure"))?;

        Ok(Self { secret })
    }

    /// The length of the secret in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.secret.len()
    }

    /// Indicates whether the secret is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.secret.is_empty()
    }

    pub(crate) fn as_slice(&self) -> &[u8] {
        self.secret.as_slice()
    }

    /// Ensures the secret has exactly the length required by `alg`
    pub(crate) fn require_len(
        &self,
        alg: &'static str,
        expected: usize,
    ) -> Result<&[u8], error::InvalidKeyLength> {
        if self.len() == expected {
            Ok(self.as_slice())
        } else {
            Err(error::invalid_key_length(alg, expected, self.len()))
        }
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.secret.as_mut_slice().zeroize();
    }
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;

    use super::*;

    #[test]
    fn generated_secrets_have_requested_length() -> Result<()> {
        let a = Secret::generate(32)?;
        let b = Secret::generate(32)?;

        assert_eq!(a.len(), 32);
        assert_ne!(a.as_slice(), b.as_slice());

        Ok(())
    }

    #[test]
    fn debug_does_not_reveal_secret() {
        let key = Key::password("top secret");
        let debug = format!("{:?}", key);

        assert!(!debug.contains("top secret"));
        assert!(debug.contains("redacted"));
    }

    #[test]
    fn wrong_family_is_incompatible() {
        let key = Key::secret(vec![0; 16]);

        assert!(key.as_secret("A128KW").is_ok());
        let err = key.as_ec("ECDH-ES").unwrap_err();
        assert_eq!(
            err.to_string(),
            "symmetric key incompatible with algorithm 'ECDH-ES'"
        );
    }

    #[test]
    fn requires_exact_length() -> Result<()> {
        let secret = Secret::new(vec![7; 24]);

        assert_eq!(secret.require_len("A192KW", 24)?.len(), 24);
        assert!(secret.require_len("A128KW", 16).is_err());

        Ok(())
    }
}
