//! RSA JSON Web Algorithm implementations
//!
//! RSA keys serve two purposes: the `RS*`/`PS*` signature algorithms and the
//! `RSA1_5`/`RSA-OAEP`/`RSA-OAEP-256` key management algorithms.

use std::fmt;

use jose_base64::Base64Url;
use openssl::{
    encrypt::{Decrypter, Encrypter},
    hash::MessageDigest,
    pkey::{HasPublic, PKeyRef},
    rsa::Padding,
};

use crate::{
    error, jwe,
    jwe::{Cek, KeyContext, WrappedKey},
    jws, Key,
};

mod private;
mod public;

pub use private::PrivateKey;
pub use public::PublicKey;

/// RSA key
#[derive(Debug, Clone, Eq, PartialEq)]
#[must_use]
pub struct Rsa {
    key: MaybePrivate,
}

#[derive(Debug, Clone, Eq, PartialEq)]
enum MaybePrivate {
    PublicAndPrivate(PrivateKey),
    PublicOnly(PublicKey),
}

impl Rsa {
    /// Generates a newly minted 2048-bit RSA public/private key pair
    ///
    /// # Errors
    ///
    /// Unable to generate a private key.
    pub fn generate() -> Result<Self, error::Unexpected> {
        let private_key = PrivateKey::generate()?;

        Ok(Self::from(private_key))
    }

    /// Constructs a private key from a PEM file
    ///
    /// # Errors
    ///
    /// The provided PEM file is not a valid RSA private key.
    pub fn private_key_from_pem(pem: &str) -> Result<Self, error::KeyRejected> {
        let private_key = PrivateKey::from_pem(pem)?;

        Ok(Self::from(private_key))
    }

    /// Constructs a public key from a PEM file
    ///
    /// # Errors
    ///
    /// The provided PEM file is not a valid RSA public key.
    pub fn public_key_from_pem(pem: &str) -> Result<Self, error::KeyRejected> {
        let public_key = PublicKey::from_pem(pem)?;

        Ok(Self::from(public_key))
    }

    /// Constructs a public key from the modulus and exponent
    ///
    /// # Errors
    ///
    /// The modulus and exponent were not valid as a public key.
    pub fn from_public_components(
        modulus: impl Into<Base64Url>,
        exponent: impl Into<Base64Url>,
    ) -> Result<Self, error::KeyRejected> {
        let public_key = PublicKey::from_components(modulus, exponent)?;

        Ok(Self::from(public_key))
    }

    /// The private key, if present
    #[must_use]
    pub fn private_key(&self) -> Option<&PrivateKey> {
        match &self.key {
            MaybePrivate::PublicAndPrivate(p) => Some(p),
            MaybePrivate::PublicOnly(_) => None,
        }
    }

    /// The public key
    #[must_use]
    pub fn public_key(&self) -> &PublicKey {
        match &self.key {
            MaybePrivate::PublicAndPrivate(p) => p.public_key(),
            MaybePrivate::PublicOnly(p) => p,
        }
    }

    /// Removes the private key components, if any
    pub fn public_only(self) -> Self {
        match self.key {
            MaybePrivate::PublicAndPrivate(p) => Self::from(p.into_public_key()),
            MaybePrivate::PublicOnly(_) => self,
        }
    }
}

impl From<PublicKey> for Rsa {
    fn from(key: PublicKey) -> Self {
        Self {
            key: MaybePrivate::PublicOnly(key),
        }
    }
}

impl From<PrivateKey> for Rsa {
    fn from(key: PrivateKey) -> Self {
        Self {
            key: MaybePrivate::PublicAndPrivate(key),
        }
    }
}

/// RSA public/private key signing algorithms
///
/// This list may be expanded in the future.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
#[allow(clippy::upper_case_acronyms)]
#[non_exhaustive]
pub enum SigningAlgorithm {
    /// RSASSA-PKCS1-v1_5 using SHA-256
    RS256,
    /// RSASSA-PKCS1-v1_5 using SHA-384
    RS384,
    /// RSASSA-PKCS1-v1_5 using SHA-512
    RS512,
    /// RSASSA-PSS using SHA-256 and MGF1 with SHA-256
    PS256,
    /// RSASSA-PSS using SHA-384 and MGF1 with SHA-384
    PS384,
    /// RSASSA-PSS using SHA-512 and MGF1 with SHA-512
    PS512,
}

impl SigningAlgorithm {
    /// The identifier as it appears in the `alg` header parameter
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::RS512 => "RS512",
            Self::PS256 => "PS256",
            Self::PS384 => "PS384",
            Self::PS512 => "PS512",
        }
    }

    fn into_verification_params(self) -> &'static ring::signature::RsaParameters {
        match self {
            Self::RS256 => &ring::signature::RSA_PKCS1_2048_8192_SHA256,
            Self::RS384 => &ring::signature::RSA_PKCS1_2048_8192_SHA384,
            Self::RS512 => &ring::signature::RSA_PKCS1_2048_8192_SHA512,
            Self::PS256 => &ring::signature::RSA_PSS_2048_8192_SHA256,
            Self::PS384 => &ring::signature::RSA_PSS_2048_8192_SHA384,
            Self::PS512 => &ring::signature::RSA_PSS_2048_8192_SHA512,
        }
    }

    fn into_signing_params(self) -> &'static dyn ring::signature::RsaEncoding {
        match self {
            Self::RS256 => &ring::signature::RSA_PKCS1_SHA256,
            Self::RS384 => &ring::signature::RSA_PKCS1_SHA384,
            Self::RS512 => &ring::signature::RSA_PKCS1_SHA512,
            Self::PS256 => &ring::signature::RSA_PSS_SHA256,
            Self::PS384 => &ring::signature::RSA_PSS_SHA384,
            Self::PS512 => &ring::signature::RSA_PSS_SHA512,
        }
    }
}

impl From<SigningAlgorithm> for jws::Algorithm {
    fn from(alg: SigningAlgorithm) -> Self {
        Self::Rsa(alg)
    }
}

impl jws::Signer for SigningAlgorithm {
    fn sign(&self, key: Option<&Key>, data: &[u8]) -> Result<Vec<u8>, error::EncryptionError> {
        let rsa = key
            .ok_or_else(|| error::missing_key(self.name()))?
            .as_rsa(self.name())?;
        let private_key = rsa.private_key().ok_or_else(error::missing_private_key)?;

        Ok(private_key.sign(*self, data)?)
    }

    fn verify(
        &self,
        key: Option<&Key>,
        data: &[u8],
        signature: &[u8],
    ) -> Result<(), error::JoseError> {
        let rsa = key
            .ok_or_else(|| error::missing_key(self.name()))?
            .as_rsa(self.name())?;

        rsa.public_key()
            .verify(self.into_verification_params(), data, signature)?;
        Ok(())
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// RSA key encryption algorithms
///
/// This list may be expanded in the future.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
#[allow(non_camel_case_types, clippy::upper_case_acronyms)]
#[non_exhaustive]
pub enum KeyManagementAlgorithm {
    /// RSAES-PKCS1-v1_5
    RSA1_5,
    /// RSAES OAEP using SHA-1 and MGF1 with SHA-1
    RSA_OAEP,
    /// RSAES OAEP using SHA-256 and MGF1 with SHA-256
    RSA_OAEP_256,
}

impl KeyManagementAlgorithm {
    /// The identifier as it appears in the `alg` header parameter
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::RSA1_5 => "RSA1_5",
            Self::RSA_OAEP => "RSA-OAEP",
            Self::RSA_OAEP_256 => "RSA-OAEP-256",
        }
    }

    fn configure_encrypter(
        self,
        encrypter: &mut Encrypter<'_>,
    ) -> Result<(), openssl::error::ErrorStack> {
        match self {
            Self::RSA1_5 => encrypter.set_rsa_padding(Padding::PKCS1),
            Self::RSA_OAEP => encrypter.set_rsa_padding(Padding::PKCS1_OAEP),
            Self::RSA_OAEP_256 => {
                encrypter.set_rsa_padding(Padding::PKCS1_OAEP)?;
                encrypter.set_rsa_oaep_md(MessageDigest::sha256())?;
                encrypter.set_rsa_mgf1_md(MessageDigest::sha256())
            }
        }
    }

    fn configure_decrypter(
        self,
        decrypter: &mut Decrypter<'_>,
    ) -> Result<(), openssl::error::ErrorStack> {
        match self {
            Self::RSA1_5 => decrypter.set_rsa_padding(Padding::PKCS1),
            Self::RSA_OAEP => decrypter.set_rsa_padding(Padding::PKCS1_OAEP),
            Self::RSA_OAEP_256 => {
                decrypter.set_rsa_padding(Padding::PKCS1_OAEP)?;
                decrypter.set_rsa_oaep_md(MessageDigest::sha256())?;
                decrypter.set_rsa_mgf1_md(MessageDigest::sha256())
            }
        }
    }

    fn encrypt<T: HasPublic>(
        self,
        key: &PKeyRef<T>,
        cek: &[u8],
    ) -> Result<Vec<u8>, openssl::error::ErrorStack> {
        let mut encrypter = Encrypter::new(key)?;
        self.configure_encrypter(&mut encrypter)?;

        let mut encrypted = vec![0; encrypter.encrypt_len(cek)?];
        let len = encrypter.encrypt(cek, &mut encrypted)?;
        encrypted.truncate(len);
        Ok(encrypted)
    }
}

impl From<KeyManagementAlgorithm> for jwe::Algorithm {
    fn from(alg: KeyManagementAlgorithm) -> Self {
        Self::Rsa(alg)
    }
}

impl jwe::KeyManagement for KeyManagementAlgorithm {
    fn wrap(&self, key: &Key, ctx: &KeyContext<'_>) -> Result<WrappedKey, error::EncryptionError> {
        let rsa = key.as_rsa(self.name())?;
        let public_key = rsa.public_key().to_pkey()?;

        let cek = Cek::random(ctx.cek_len())?;
        let encrypted_key = self
            .encrypt(&public_key, &cek)
            .map_err(error::unexpected)?;

        Ok(WrappedKey::new(cek, encrypted_key))
    }

    fn unwrap(
        &self,
        key: &Key,
        encrypted_key: &[u8],
        ctx: &KeyContext<'_>,
    ) -> Result<Cek, error::JoseError> {
        let rsa = key.as_rsa(self.name())?;
        let private_key = rsa
            .private_key()
            .ok_or_else(error::missing_private_key)?
            .to_pkey()?;

        let mut decrypter = Decrypter::new(&private_key).map_err(error::unexpected)?;
        self.configure_decrypter(&mut decrypter)
            .map_err(error::unexpected)?;

        let mut cek = vec![0; rsa.public_key().modulus_len()];
        let decrypted = decrypter
            .decrypt(encrypted_key, &mut cek)
            .ok()
            .filter(|&len| len == ctx.cek_len())
            .map(|len| {
                cek.truncate(len);
                Cek::new(cek)
            });

        match (self, decrypted) {
            (_, Some(cek)) => Ok(cek),

            // continue with a random CEK; the content tag check rejects it
            (Self::RSA1_5, None) => Ok(Cek::random(ctx.cek_len())?),

            (_, None) => Err(error::integrity_violation().into()),
        }
    }
}

impl fmt::Display for KeyManagementAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}
