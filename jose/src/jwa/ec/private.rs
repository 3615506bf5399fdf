use std::fmt;

use jose_base64::Base64Url;
use openssl::{
    bn::BigNum,
    ec::EcKey,
    pkey::{PKey, Private},
};
use zeroize::Zeroize;

use super::{padded, Curve, PublicKey};
use crate::error;

/// ECC private key parameters
#[derive(Clone)]
#[must_use]
pub struct PrivateKey {
    public_key: PublicKey,
    d: Base64Url,
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.public_key == other.public_key && openssl::memcmp::eq(&self.d, &other.d)
    }
}

impl Eq for PrivateKey {}

impl PrivateKey {
    /// Generates a new ECC key pair using the specified curve
    ///
    /// # Errors
    ///
    /// Unable to generate a private key.
    pub fn generate(curve: Curve) -> Result<Self, error::Unexpected> {
        let group = curve.group().map_err(error::unexpected)?;
        let key = EcKey::generate(&group).map_err(error::unexpected)?;

        Self::from_openssl_eckey(&key).map_err(error::unexpected)
    }

    /// Constructs an ECC key pair from a PEM file
    ///
    /// # Errors
    ///
    /// The provided PEM file is not a valid ECC private key on a supported
    /// curve.
    pub fn from_pem(pem: &str) -> Result<Self, error::KeyRejected> {
        let key = PKey::private_key_from_pem(pem.as_bytes()).map_err(error::key_rejected)?;
        Self::from_openssl_eckey(&key.ec_key().map_err(error::key_rejected)?)
    }

    /// Constructs an ECC key pair from the public coordinates and the private
    /// scalar
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
        let public_key = PublicKey::from_coordinates(curve, x, y)?;

        let d = d.into();
        let scalar = BigNum::from_slice(d.as_slice()).map_err(error::key_rejected)?;
        let d = padded(&scalar, curve.coordinate_size()).map_err(error::key_rejected)?;

        let key = Self {
            public_key,
            d: Base64Url::from_raw(d),
        };

        key.to_openssl()
            .and_then(|k| k.check_key())
            .map_err(error::key_rejected)?;

        Ok(key)
    }

    fn from_openssl_eckey(key: &EcKey<Private>) -> Result<Self, error::KeyRejected> {
        let public_key = PublicKey::from_openssl_eckey(key)?;
        let d = padded(key.private_key(), public_key.curve().coordinate_size())
            .map_err(error::key_rejected)?;

        Ok(Self {
            public_key,
            d: Base64Url::from_raw(d),
        })
    }

    pub(crate) fn to_openssl(&self) -> Result<EcKey<Private>, openssl::error::ErrorStack> {
        let public = self.public_key.to_openssl()?;
        let group = self.curve().group()?;
        let d = BigNum::from_slice(self.d.as_slice())?;
        EcKey::from_private_components(&group, &d, public.public_key())
    }

    /// Exports the key pair as a PKCS #8 PEM file
    ///
    /// # Errors
    ///
    /// The key could not be encoded.
    pub fn to_pem(&self) -> Result<String, error::Unexpected> {
        let key = self.to_openssl().map_err(error::unexpected)?;
        let pem = PKey::from_ec_key(key)
            .and_then(|k| k.private_key_to_pem_pkcs8())
            .map_err(error::unexpected)?;
        String::from_utf8(pem).map_err(error::unexpected)
    }

    /// The curve the key is on
    #[must_use]
    pub fn curve(&self) -> Curve {
        self.public_key.curve()
    }

    /// Provides access to the public key parameters
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Extracts the public key
    pub fn into_public_key(self) -> PublicKey {
        self.public_key.clone()
    }
}

impl Drop for PrivateKey {
    fn drop(&mut self) {
        self.d.as_mut_slice().zeroize();
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

#[cfg(test)]
mod tests {
    use color_eyre::Result;

    use super::*;
    use crate::test;

    #[test]
    fn generated_key_survives_pem() -> Result<()> {
        for &curve in &[Curve::P256, Curve::P384, Curve::P521] {
            let key = PrivateKey::generate(curve)?;
            let pem = key.to_pem()?;

            assert_eq!(PrivateKey::from_pem(&pem)?, key);
            assert_eq!(key.public_key().x().len(), curve.coordinate_size());
        }

        Ok(())
    }

    #[test]
    fn rejects_mismatched_scalar() -> Result<()> {
        let public = test::p256_public_key();
        let other = PrivateKey::generate(Curve::P256)?;

        let err = PrivateKey::from_components(
            Curve::P256,
            public.x().to_vec(),
            public.y().to_vec(),
            other.d.to_vec(),
        );
        assert!(err.is_err());

        Ok(())
    }

    #[test]
    fn debug_redacts_scalar() -> Result<()> {
        let key = PrivateKey::generate(Curve::P384)?;
        assert!(format!("{:?}", key).contains("<redacted>"));

        Ok(())
    }
}
