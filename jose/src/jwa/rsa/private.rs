use std::{fmt, sync::Arc};

use openssl::{
    pkey::{PKey, Private},
    rsa::Rsa,
};
use ring::signature::RsaKeyPair;
use zeroize::Zeroize;

use super::{PublicKey, SigningAlgorithm};
use crate::error;

/// RSA private key components
#[derive(Clone)]
#[must_use]
pub struct PrivateKey {
    public_key: PublicKey,
    der: Vec<u8>,
    ring_cache: Arc<RsaKeyPair>,
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for PrivateKey {}

impl PrivateKey {
    /// Generates a new 2048-bit RSA key pair
    ///
    /// # Errors
    ///
    /// Unable to generate a private key.
    pub fn generate() -> Result<Self, error::Unexpected> {
        let rsa = Rsa::generate(2048).map_err(error::unexpected)?;
        Self::from_openssl_key(&rsa).map_err(error::unexpected)
    }

    /// Imports an RSA key pair from a PEM file
    ///
    /// # Errors
    ///
    /// The provided PEM file is not a valid RSA private key of at least
    /// 2048 bits.
    pub fn from_pem(pem: &str) -> Result<Self, error::KeyRejected> {
        let rsa = Rsa::private_key_from_pem(pem.as_bytes()).map_err(error::key_rejected)?;
        Self::from_openssl_key(&rsa)
    }

    fn from_openssl_key(rsa: &Rsa<Private>) -> Result<Self, error::KeyRejected> {
        let public_key = PublicKey::from_components(rsa.n().to_vec(), rsa.e().to_vec())?;

        let der = rsa.private_key_to_der().map_err(error::key_rejected)?;

        let ring_cache =
            Arc::new(RsaKeyPair::from_der(&der).map_err(|e| error::key_rejected(e.to_string()))?);

        Ok(Self {
            public_key,
            der,
            ring_cache,
        })
    }

    /// Exports the RSA key pair as a PEM file
    ///
    /// # Errors
    ///
    /// The key could not be encoded.
    pub fn to_pem(&self) -> Result<String, error::Unexpected> {
        let key = Rsa::private_key_from_der(&self.der).map_err(error::unexpected)?;
        let pem = key.private_key_to_pem().map_err(error::unexpected)?;
        String::from_utf8(pem).map_err(error::unexpected)
    }

    /// Provides access to the public key parameters
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Extracts the public key
    pub fn into_public_key(self) -> PublicKey {
        self.public_key.clone()
    }

    pub(crate) fn to_pkey(&self) -> Result<PKey<Private>, error::Unexpected> {
        let rsa = Rsa::private_key_from_der(&self.der).map_err(error::unexpected)?;
        PKey::from_rsa(rsa).map_err(error::unexpected)
    }

    pub(crate) fn sign(
        &self,
        alg: SigningAlgorithm,
        data: &[u8],
    ) -> Result<Vec<u8>, error::Unexpected> {
        let mut buf = vec![0; self.ring_cache.public().modulus_len()];
        self.ring_cache
            .sign(
                alg.into_signing_params(),
                &ring::rand::SystemRandom::new(),
                data,
                &mut buf,
            )
            .map_err(|e| error::unexpected(e.to_string()))?;
        Ok(buf)
    }
}

impl Drop for PrivateKey {
    fn drop(&mut self) {
        self.der.zeroize();
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}
