use std::convert::TryFrom;

use jose_base64::Base64Url;
use openssl::{
    bn::{BigNum, BigNumContext},
    ec::{EcKey, EcKeyRef},
    pkey::{HasPublic, Public},
};
use serde::{Deserialize, Serialize};

use super::{padded, Curve};
use crate::error;

/// ECC public key parameters
///
/// Coordinates are held left-padded to the curve's field size. When
/// serialized, the key takes the JWK form used by the `epk` header parameter:
/// `{"kty":"EC","x":..,"y":..,"crv":..}`.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PublicKeyDto", into = "PublicKeyDto")]
pub struct PublicKey {
    curve: Curve,
    x: Base64Url,
    y: Base64Url,
}

impl PublicKey {
    /// Constructs a public key from its affine coordinates
    ///
    /// Coordinates shorter than the curve's field size are left-padded.
    ///
    /// # Errors
    ///
    /// A coordinate is longer than the field size, or the point is not on the
    /// curve.
    pub fn from_coordinates(
        curve: Curve,
        x: impl Into<Base64Url>,
        y: impl Into<Base64Url>,
    ) -> Result<Self, error::KeyRejected> {
        let size = curve.coordinate_size();
        let key = Self {
            curve,
            x: left_pad(x.into(), size)?,
            y: left_pad(y.into(), size)?,
        };

        let openssl = key.to_openssl().map_err(error::key_rejected)?;
        openssl.check_key().map_err(error::key_rejected)?;

        Ok(key)
    }

    /// Imports an ECC public key from a PEM file
    ///
    /// # Errors
    ///
    /// The provided PEM file is not a valid ECC public key on a supported
    /// curve.
    pub fn from_pem(pem: &str) -> Result<Self, error::KeyRejected> {
        let key = EcKey::public_key_from_pem(pem.as_bytes()).map_err(error::key_rejected)?;
        Self::from_openssl_eckey(&key)
    }

    pub(crate) fn from_openssl_eckey<T: HasPublic>(
        key: &EcKeyRef<T>,
    ) -> Result<Self, error::KeyRejected> {
        let curve = key
            .group()
            .curve_name()
            .and_then(Curve::from_nid)
            .ok_or_else(|| error::key_rejected("unsupported curve"))?;

        let mut ctx = BigNumContext::new().map_err(error::key_rejected)?;
        let mut x = BigNum::new().map_err(error::key_rejected)?;
        let mut y = BigNum::new().map_err(error::key_rejected)?;
        key.public_key()
            .affine_coordinates_gfp(key.group(), &mut x, &mut y, &mut ctx)
            .map_err(error::key_rejected)?;

        let size = curve.coordinate_size();
        Ok(Self {
            curve,
            x: Base64Url::from_raw(padded(&x, size).map_err(error::key_rejected)?),
            y: Base64Url::from_raw(padded(&y, size).map_err(error::key_rejected)?),
        })
    }

    pub(crate) fn to_openssl(&self) -> Result<EcKey<Public>, openssl::error::ErrorStack> {
        let group = self.curve.group()?;
        let x = BigNum::from_slice(self.x.as_slice())?;
        let y = BigNum::from_slice(self.y.as_slice())?;
        EcKey::from_public_key_affine_coordinates(&group, &x, &y)
    }

    /// The curve the key is on
    #[must_use]
    pub fn curve(&self) -> Curve {
        self.curve
    }

    /// The x coordinate
    #[must_use]
    pub fn x(&self) -> &[u8] {
        &self.x
    }

    /// The y coordinate
    #[must_use]
    pub fn y(&self) -> &[u8] {
        &self.y
    }
}

fn left_pad(value: Base64Url, size: usize) -> Result<Base64Url, error::KeyRejected> {
    match value.len() {
        len if len == size => Ok(value),
        len if len < size => {
            let mut buf = vec![0; size - len];
            buf.extend_from_slice(&value);
            Ok(Base64Url::from_raw(buf))
        }
        _ => Err(error::key_rejected("coordinate exceeds the curve's field size")),
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
enum KeyType {
    #[serde(rename = "EC")]
    EllipticCurve,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
struct PublicKeyDto {
    kty: KeyType,
    x: Base64Url,
    y: Base64Url,
    #[serde(rename = "crv")]
    curve: Curve,
}

impl From<PublicKey> for PublicKeyDto {
    fn from(key: PublicKey) -> Self {
        Self {
            kty: KeyType::EllipticCurve,
            x: key.x,
            y: key.y,
            curve: key.curve,
        }
    }
}

impl TryFrom<PublicKeyDto> for PublicKey {
    type Error = error::KeyRejected;

    fn try_from(dto: PublicKeyDto) -> Result<Self, Self::Error> {
        Self::from_coordinates(dto.curve, dto.x, dto.y)
    }
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;

    use super::*;
    use crate::test;

    #[test]
    fn serializes_as_epk() -> Result<()> {
        let key = test::p256_public_key();
        let json = serde_json::to_string(&key)?;

        assert_eq!(
            json,
            r#"{"kty":"EC","x":"BHId3zoDv6pDgOUh8rKdloUZ0YumRTcaVDCppUPoYgk","y":"g3QIDhaWEksYtZ9OWjNHn9a6-i_P9o5_NrdISP0VWDU","crv":"P-256"}"#
        );

        let parsed: PublicKey = serde_json::from_str(&json)?;
        assert_eq!(parsed, key);

        Ok(())
    }

    #[test]
    fn rejects_point_off_curve() {
        let key = test::p256_public_key();
        let mut y = key.y().to_vec();
        y[31] ^= 1;

        assert!(PublicKey::from_coordinates(Curve::P256, key.x().to_vec(), y).is_err());
    }

    #[test]
    fn rejects_other_key_types() {
        let json = r#"{"kty":"RSA","x":"BHId3zoDv6pDgOUh8rKdloUZ0YumRTcaVDCppUPoYgk","y":"g3QIDhaWEksYtZ9OWjNHn9a6-i_P9o5_NrdISP0VWDU","crv":"P-256"}"#;
        assert!(serde_json::from_str::<PublicKey>(json).is_err());
    }
}
