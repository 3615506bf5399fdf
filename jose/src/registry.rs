//! Algorithm registries
//!
//! A [`Registry`] maps algorithm identifiers to the capabilities that
//! implement them. Registries are immutable once built and can be shared
//! freely between threads. Every engine entry point has a `*_with` variant
//! taking a registry, so an alternative implementation can be registered for
//! any identifier (a deterministic signer in tests, for example).

use std::{collections::HashMap, fmt, sync::Arc};

use once_cell::sync::Lazy;

use crate::{
    error,
    jwa::{self, pbes2::Pbes2},
    jwe::{self, ContentEncryption, KeyManagement},
    jws::{self, Signer},
    zip::{self, Compression},
};

static GLOBAL: Lazy<Registry> = Lazy::new(Registry::standard);

/// A set of algorithm implementations
///
/// ```
/// use jose::{jws, Registry};
///
/// let registry = Registry::empty().with_signer(jws::Algorithm::NONE, jws::Unsecured);
///
/// assert!(registry.signer(jws::Algorithm::NONE).is_ok());
/// assert!(registry.signer(jws::Algorithm::HS256).is_err());
/// ```
#[derive(Clone, Default)]
#[must_use]
pub struct Registry {
    signers: HashMap<jws::Algorithm, Arc<dyn Signer>>,
    content_encryption: HashMap<jwe::Encryption, Arc<dyn ContentEncryption>>,
    key_management: HashMap<jwe::Algorithm, Arc<dyn KeyManagement>>,
    compression: HashMap<zip::Algorithm, Arc<dyn Compression>>,
}

impl Registry {
    /// A registry with no algorithms
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry with every algorithm this crate implements
    ///
    /// PBES2 is registered with the default iteration count and salt length.
    pub fn standard() -> Self {
        use jwa::{aes_cbc_hmac, aes_gcm, aes_gcm_kw, aes_kw, direct, ec, ecdh, hmac, pbes2, rsa};

        let mut registry = Self::empty().with_signer(jws::Algorithm::NONE, jws::Unsecured);

        for &alg in &[
            hmac::SigningAlgorithm::HS256,
            hmac::SigningAlgorithm::HS384,
            hmac::SigningAlgorithm::HS512,
        ] {
            registry = registry.with_signer(alg, alg);
        }

        for &alg in &[
            rsa::SigningAlgorithm::RS256,
            rsa::SigningAlgorithm::RS384,
            rsa::SigningAlgorithm::RS512,
            rsa::SigningAlgorithm::PS256,
            rsa::SigningAlgorithm::PS384,
            rsa::SigningAlgorithm::PS512,
        ] {
            registry = registry.with_signer(alg, alg);
        }

        for &alg in &[
            ec::SigningAlgorithm::ES256,
            ec::SigningAlgorithm::ES384,
            ec::SigningAlgorithm::ES512,
        ] {
            registry = registry.with_signer(alg, alg);
        }

        for &enc in &[
            aes_cbc_hmac::Algorithm::A128CBC_HS256,
            aes_cbc_hmac::Algorithm::A192CBC_HS384,
            aes_cbc_hmac::Algorithm::A256CBC_HS512,
        ] {
            registry = registry.with_content_encryption(enc, enc);
        }

        for &enc in &[
            aes_gcm::Algorithm::A128GCM,
            aes_gcm::Algorithm::A192GCM,
            aes_gcm::Algorithm::A256GCM,
        ] {
            registry = registry.with_content_encryption(enc, enc);
        }

        registry = registry.with_key_management(direct::Direct, direct::Direct);

        for &alg in &[
            aes_kw::Algorithm::A128KW,
            aes_kw::Algorithm::A192KW,
            aes_kw::Algorithm::A256KW,
        ] {
            registry = registry.with_key_management(alg, alg);
        }

        for &alg in &[
            aes_gcm_kw::Algorithm::A128GCMKW,
            aes_gcm_kw::Algorithm::A192GCMKW,
            aes_gcm_kw::Algorithm::A256GCMKW,
        ] {
            registry = registry.with_key_management(alg, alg);
        }

        for &alg in &[
            rsa::KeyManagementAlgorithm::RSA1_5,
            rsa::KeyManagementAlgorithm::RSA_OAEP,
            rsa::KeyManagementAlgorithm::RSA_OAEP_256,
        ] {
            registry = registry.with_key_management(alg, alg);
        }

        for &alg in &[
            pbes2::Algorithm::PBES2_HS256_A128KW,
            pbes2::Algorithm::PBES2_HS384_A192KW,
            pbes2::Algorithm::PBES2_HS512_A256KW,
        ] {
            registry = registry.with_key_management(alg, Pbes2::new(alg));
        }

        for &alg in &[
            ecdh::Algorithm::ECDH_ES,
            ecdh::Algorithm::ECDH_ES_A128KW,
            ecdh::Algorithm::ECDH_ES_A192KW,
            ecdh::Algorithm::ECDH_ES_A256KW,
        ] {
            registry = registry.with_key_management(alg, alg);
        }

        #[cfg(feature = "deflate")]
        {
            registry = registry.with_compression(zip::Algorithm::Deflate, zip::Deflate::new());
        }

        registry
    }

    /// The process-wide standard registry, built on first use
    pub fn global() -> &'static Self {
        &GLOBAL
    }

    /// Registers a signer for `alg`, replacing any previous one
    pub fn with_signer(
        mut self,
        alg: impl Into<jws::Algorithm>,
        signer: impl Signer + 'static,
    ) -> Self {
        self.signers.insert(alg.into(), Arc::new(signer));
        self
    }

    /// Removes the signer for `alg`, so tokens using it fail as unsupported
    ///
    /// The standard registry accepts `none` tokens whether or not a key is
    /// supplied. A consumer that only expects secured tokens should drop it:
    ///
    /// ```
    /// use jose::{jws, Registry};
    ///
    /// let registry = Registry::standard().without_signer(jws::Algorithm::NONE);
    /// assert!(registry.signer(jws::Algorithm::NONE).is_err());
    /// ```
    pub fn without_signer(mut self, alg: impl Into<jws::Algorithm>) -> Self {
        self.signers.remove(&alg.into());
        self
    }

    /// Registers a content encryption implementation for `enc`
    pub fn with_content_encryption(
        mut self,
        enc: impl Into<jwe::Encryption>,
        content: impl ContentEncryption + 'static,
    ) -> Self {
        self.content_encryption
            .insert(enc.into(), Arc::new(content));
        self
    }

    /// Registers a key management implementation for `alg`
    pub fn with_key_management(
        mut self,
        alg: impl Into<jwe::Algorithm>,
        key_management: impl KeyManagement + 'static,
    ) -> Self {
        self.key_management
            .insert(alg.into(), Arc::new(key_management));
        self
    }

    /// Registers a compression implementation for `zip`
    pub fn with_compression(
        mut self,
        zip: zip::Algorithm,
        compression: impl Compression + 'static,
    ) -> Self {
        self.compression.insert(zip, Arc::new(compression));
        self
    }

    /// The signer registered for `alg`
    ///
    /// # Errors
    ///
    /// Nothing is registered for `alg`.
    pub fn signer(&self, alg: jws::Algorithm) -> Result<&dyn Signer, error::UnsupportedAlgorithm> {
        self.signers
            .get(&alg)
            .map(|s| &**s)
            .ok_or_else(|| error::unsupported_algorithm(alg.name()))
    }

    /// The content encryption implementation registered for `enc`
    ///
    /// # Errors
    ///
    /// Nothing is registered for `enc`.
    pub fn content_encryption(
        &self,
        enc: jwe::Encryption,
    ) -> Result<&dyn ContentEncryption, error::UnsupportedAlgorithm> {
        self.content_encryption
            .get(&enc)
            .map(|c| &**c)
            .ok_or_else(|| error::unsupported_algorithm(enc.name()))
    }

    /// The key management implementation registered for `alg`
    ///
    /// # Errors
    ///
    /// Nothing is registered for `alg`.
    pub fn key_management(
        &self,
        alg: jwe::Algorithm,
    ) -> Result<&dyn KeyManagement, error::UnsupportedAlgorithm> {
        self.key_management
            .get(&alg)
            .map(|k| &**k)
            .ok_or_else(|| error::unsupported_algorithm(alg.name()))
    }

    /// The compression implementation registered for `zip`
    ///
    /// # Errors
    ///
    /// Nothing is registered for `zip`.
    pub fn compression(
        &self,
        zip: zip::Algorithm,
    ) -> Result<&dyn Compression, error::UnsupportedAlgorithm> {
        self.compression
            .get(&zip)
            .map(|c| &**c)
            .ok_or_else(|| error::unsupported_algorithm(zip.name()))
    }
}

fn sorted_names<'a>(names: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut names: Vec<_> = names.collect();
    names.sort_unstable();
    names
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Registry")
            .field("signers", &sorted_names(self.signers.keys().map(|a| a.name())))
            .field(
                "content_encryption",
                &sorted_names(self.content_encryption.keys().map(|e| e.name())),
            )
            .field(
                "key_management",
                &sorted_names(self.key_management.keys().map(|a| a.name())),
            )
            .field(
                "compression",
                &sorted_names(self.compression.keys().map(|z| z.name())),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;

    use super::*;
    use crate::{jws::Jws, test, Key};

    #[test]
    fn standard_covers_every_identifier() -> Result<()> {
        let registry = Registry::standard();

        for &alg in &jws::Algorithm::ALL {
            registry.signer(alg)?;
        }
        for &enc in &jwe::Encryption::ALL {
            registry.content_encryption(enc)?;
        }
        for &alg in &jwe::Algorithm::ALL {
            registry.key_management(alg)?;
        }
        registry.compression(zip::Algorithm::Deflate)?;

        Ok(())
    }

    #[test]
    fn debug_lists_identifiers() {
        let registry = Registry::empty()
            .with_signer(jws::Algorithm::HS256, jwa::hmac::SigningAlgorithm::HS256)
            .with_signer(jws::Algorithm::NONE, jws::Unsecured);

        assert_eq!(
            format!("{:?}", registry),
            r#"Registry { signers: ["HS256", "none"], content_encryption: [], key_management: [], compression: [] }"#
        );
    }

    #[derive(Debug)]
    struct FixedSignature;

    impl Signer for FixedSignature {
        fn sign(&self, _: Option<&Key>, _: &[u8]) -> Result<Vec<u8>, error::EncryptionError> {
            Ok(b"fixed".to_vec())
        }

        fn verify(
            &self,
            _: Option<&Key>,
            _: &[u8],
            signature: &[u8],
        ) -> Result<(), error::JoseError> {
            if signature == b"fixed" {
                Ok(())
            } else {
                Err(error::integrity_violation().into())
            }
        }
    }

    #[test]
    fn substitutes_replace_standard_implementations() -> Result<()> {
        let registry = Registry::standard().with_signer(jws::Algorithm::ES256, FixedSignature);
        let key = Key::from(test::p256_key());

        let first = Jws::new(jws::Algorithm::ES256, "payload").sign_with(&registry, Some(&key))?;
        let second = Jws::new(jws::Algorithm::ES256, "payload").sign_with(&registry, Some(&key))?;
        assert_eq!(first, second);
        assert!(first.as_str().ends_with(".Zml4ZWQ"));

        let decoded = jws::verify_with(&registry, &first, None)?;
        assert_eq!(decoded.payload(), b"payload");
        assert!(jws::verify(&first, Some(&key)).unwrap_err().is_integrity());

        Ok(())
    }

    #[test]
    fn unsecured_tokens_are_refused_once_none_is_removed() -> Result<()> {
        let registry = Registry::standard().without_signer(jws::Algorithm::NONE);
        let key = test::hmac_key();

        let token = Jws::new(jws::Algorithm::NONE, "payload").sign(None)?;
        let decoded = jws::verify(&token, Some(&key))?;
        assert_eq!(decoded.payload(), b"payload");

        for key in &[None, Some(&key)] {
            let err = jws::verify_with(&registry, &token, *key).unwrap_err();
            assert!(err.is_encryption());
        }
        assert!(Jws::new(jws::Algorithm::NONE, "payload")
            .sign_with(&registry, None)
            .is_err());

        let secured = Jws::new(jws::Algorithm::HS256, "payload").sign(Some(&key))?;
        let decoded = jws::verify_with(&registry, &secured, Some(&key))?;
        assert_eq!(decoded.header().alg(), Some("HS256"));

        Ok(())
    }
}
