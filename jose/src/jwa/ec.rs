//! ECC JSON Web Algorithm implementations
//!
//! Elliptic curve keys serve the `ES*` signature algorithms and the `ECDH-ES`
//! key agreement algorithms (see [`ecdh`][super::ecdh]).

use std::fmt;

use jose_base64::Base64Url;
use openssl::{
    bn::{BigNum, BigNumRef},
    ec::EcGroup,
    ecdsa::EcdsaSig,
    hash::{hash, MessageDigest},
    nid::Nid,
};
use serde::{Deserialize, Serialize};

use crate::{error, jws, Key};

mod private;
mod public;

pub use private::PrivateKey;
pub use public::PublicKey;

/// A named ECC curve
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Curve {
    /// The P-256 curve (prime256v1/secp256r1)
    #[serde(rename = "P-256")]
    P256,

    /// The P-384 curve (secp384r1)
    #[serde(rename = "P-384")]
    P384,

    /// The P-521 curve (secp521r1)
    #[serde(rename = "P-521")]
    P521,
}

impl Curve {
    /// The curve's name as it appears in the `crv` parameter
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::P256 => "P-256",
            Self::P384 => "P-384",
            Self::P521 => "P-521",
        }
    }

    /// The size in bytes of a field element, and so of each coordinate
    #[must_use]
    pub const fn coordinate_size(self) -> usize {
        match self {
            Self::P256 => 32,
            Self::P384 => 48,
            Self::P521 => 66,
        }
    }

    const fn nid(self) -> Nid {
        match self {
            Self::P256 => Nid::X9_62_PRIME256V1,
            Self::P384 => Nid::SECP384R1,
            Self::P521 => Nid::SECP521R1,
        }
    }

    fn from_nid(nid: Nid) -> Option<Self> {
        [Self::P256, Self::P384, Self::P521]
            .iter()
            .copied()
            .find(|c| c.nid() == nid)
    }

    pub(crate) fn group(self) -> Result<EcGroup, openssl::error::ErrorStack> {
        EcGroup::from_curve_name(self.nid())
    }
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Elliptic curve cryptography key
#[derive(Debug, Clone, Eq, PartialEq)]
#[must_use]
pub struct EllipticCurve {
    key: MaybePrivate,
}

#[derive(Debug, Clone, Eq, PartialEq)]
enum MaybePrivate {
    PublicAndPrivate(PrivateKey),
    PublicOnly(PublicKey),
}

impl EllipticCurve {
    /// Generates a newly minted key pair using the specified curve
    ///
    /// # Errors
    ///
    /// Unable to generate a private key.
    pub fn generate(curve: Curve) -> Result<Self, error::Unexpected> {
        let private_key = PrivateKey::generate(curve)?;

        Ok(Self::from(private_key))
    }

    /// Constructs a key pair from its coordinates and private scalar
    ///
    /// # Errors
    ///
    /// The components do not describe a valid key pair on the curve.
    pub fn from_components(
        curve: Curve,
        x: impl Into<Base64Url>,
        y: impl Into<Base64Url>,
        d: impl Into<Base64Url>,
    ) -> Result<Self, error::KeyRejected> {
        let private_key = PrivateKey::from_components(curve, x, y, d)?;

        Ok(Self::from(private_key))
    }

    /// Constructs a public key from its coordinates
    ///
    /// # Errors
    ///
    /// The point is not on the curve.
    pub fn from_public_components(
        curve: Curve,
        x: impl Into<Base64Url>,
        y: impl Into<Base64Url>,
    ) -> Result<Self, error::KeyRejected> {
        let public_key = PublicKey::from_coordinates(curve, x, y)?;

        Ok(Self::from(public_key))
    }

    /// Constructs a private key from a PEM file
    ///
    /// # Errors
    ///
    /// The provided PEM file is not a valid ECC private key.
    pub fn private_key_from_pem(pem: &str) -> Result<Self, error::KeyRejected> {
        let private_key = PrivateKey::from_pem(pem)?;

        Ok(Self::from(private_key))
    }

    /// Constructs a public key from a PEM file
    ///
    /// # Errors
    ///
    /// The provided PEM file is not a valid ECC public key.
    pub fn public_key_from_pem(pem: &str) -> Result<Self, error::KeyRejected> {
        let public_key = PublicKey::from_pem(pem)?;

        Ok(Self::from(public_key))
    }

    /// The curve the key is on
    #[must_use]
    pub fn curve(&self) -> Curve {
        self.public_key().curve()
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

    /// Removes the private key components
    pub fn public_only(self) -> Self {
        match self.key {
            MaybePrivate::PublicAndPrivate(p) => Self::from(p.into_public_key()),
            MaybePrivate::PublicOnly(_) => self,
        }
    }
}

impl From<PublicKey> for EllipticCurve {
    fn from(key: PublicKey) -> Self {
        Self {
            key: MaybePrivate::PublicOnly(key),
        }
    }
}

impl From<PrivateKey> for EllipticCurve {
    fn from(key: PrivateKey) -> Self {
        Self {
            key: MaybePrivate::PublicAndPrivate(key),
        }
    }
}

/// Elliptic curve cryptography signing algorithms
///
/// This list may be expanded in the future.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
#[allow(clippy::upper_case_acronyms)]
#[non_exhaustive]
pub enum SigningAlgorithm {
    /// ECDSA using the P-256 curve and SHA-256
    ES256,
    /// ECDSA using the P-384 curve and SHA-384
    ES384,
    /// ECDSA using the P-521 curve and SHA-512
    ES512,
}

impl SigningAlgorithm {
    /// The identifier as it appears in the `alg` header parameter
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ES256 => "ES256",
            Self::ES384 => "ES384",
            Self::ES512 => "ES512",
        }
    }

    /// The curve keys for this algorithm must be on
    #[must_use]
    pub const fn curve(self) -> Curve {
        match self {
            Self::ES256 => Curve::P256,
            Self::ES384 => Curve::P384,
            Self::ES512 => Curve::P521,
        }
    }

    /// Size in bytes of an ECDSA signature: `r` and `s`, each padded to the
    /// curve's field size
    #[must_use]
    pub const fn signature_size(self) -> usize {
        self.curve().coordinate_size() * 2
    }

    fn digest(self) -> MessageDigest {
        match self {
            Self::ES256 => MessageDigest::sha256(),
            Self::ES384 => MessageDigest::sha384(),
            Self::ES512 => MessageDigest::sha512(),
        }
    }

    fn key<'k>(self, key: Option<&'k Key>) -> Result<&'k EllipticCurve, error::EncryptionError> {
        let ec = key
            .ok_or_else(|| error::missing_key(self.name()))?
            .as_ec(self.name())?;

        if ec.curve() != self.curve() {
            return Err(error::incompatible_key(ec.curve().name(), self.name()).into());
        }

        Ok(ec)
    }
}

impl From<SigningAlgorithm> for jws::Algorithm {
    fn from(alg: SigningAlgorithm) -> Self {
        Self::EllipticCurve(alg)
    }
}

impl From<SigningAlgorithm> for Curve {
    fn from(alg: SigningAlgorithm) -> Self {
        alg.curve()
    }
}

impl jws::Signer for SigningAlgorithm {
    fn sign(&self, key: Option<&Key>, data: &[u8]) -> Result<Vec<u8>, error::EncryptionError> {
        let private_key = self
            .key(key)?
            .private_key()
            .ok_or_else(error::missing_private_key)?;

        let ec = private_key.to_openssl().map_err(error::unexpected)?;
        let digest = hash(self.digest(), data).map_err(error::unexpected)?;
        let sig = EcdsaSig::sign(&digest, &ec).map_err(error::unexpected)?;

        let size = self.curve().coordinate_size();
        let mut signature = padded(sig.r(), size)?;
        signature.extend(padded(sig.s(), size)?);

        Ok(signature)
    }

    fn verify(
        &self,
        key: Option<&Key>,
        data: &[u8],
        signature: &[u8],
    ) -> Result<(), error::JoseError> {
        let public_key = self.key(key)?.public_key();

        if signature.len() != self.signature_size() {
            return Err(error::integrity_violation().into());
        }

        let (r, s) = signature.split_at(self.curve().coordinate_size());
        let r = BigNum::from_slice(r).map_err(error::unexpected)?;
        let s = BigNum::from_slice(s).map_err(error::unexpected)?;
        let sig = EcdsaSig::from_private_components(r, s).map_err(error::unexpected)?;

        let ec = public_key.to_openssl().map_err(error::unexpected)?;
        let digest = hash(self.digest(), data).map_err(error::unexpected)?;

        match sig.verify(&digest, &ec) {
            Ok(true) => Ok(()),
            _ => Err(error::integrity_violation().into()),
        }
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Big-endian bytes of `n`, left-padded with zeroes to `len` bytes
pub(crate) fn padded(n: &BigNumRef, len: usize) -> Result<Vec<u8>, error::Unexpected> {
    let bytes = n.to_vec();
    if bytes.len() > len {
        return Err(error::unexpected("value exceeds the curve's field size"));
    }

    let mut buf = vec![0; len - bytes.len()];
    buf.extend_from_slice(&bytes);
    Ok(buf)
}
