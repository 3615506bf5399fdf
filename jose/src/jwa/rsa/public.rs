use jose_base64::Base64Url;
use openssl::{
    bn::BigNum,
    pkey::{PKey, Public},
    rsa::Rsa,
};

use crate::error;

/// Smallest accepted modulus, in bytes
const MIN_MODULUS_LEN: usize = 2048 / 8;

/// Largest accepted modulus, in bytes
const MAX_MODULUS_LEN: usize = 8192 / 8;

/// RSA public key components
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PublicKey {
    /// The public modulus
    modulus: Base64Url,

    /// The public exponent
    exponent: Base64Url,
}

impl PublicKey {
    /// The public key's modulus
    #[must_use]
    pub fn modulus(&self) -> &[u8] {
        &self.modulus
    }

    /// The public key's exponent
    #[must_use]
    pub fn exponent(&self) -> &[u8] {
        &self.exponent
    }

    /// The size of the modulus, and so of signatures and encrypted keys, in
    /// bytes
    #[must_use]
    pub fn modulus_len(&self) -> usize {
        self.modulus.len()
    }

    /// Imports an RSA public key from a PEM file
    ///
    /// # Errors
    ///
    /// The provided PEM file is not a valid RSA public key.
    pub fn from_pem(pem: &str) -> Result<Self, error::KeyRejected> {
        let rsa = Rsa::public_key_from_pem(pem.as_bytes()).map_err(error::key_rejected)?;
        Self::from_components(rsa.n().to_vec(), rsa.e().to_vec())
    }

    /// Exports an RSA public key to a PEM file
    ///
    /// # Errors
    ///
    /// The key could not be encoded.
    pub fn to_pem(&self) -> Result<String, error::Unexpected> {
        let key = self.to_openssl().map_err(error::unexpected)?;
        let pem = key.public_key_to_pem().map_err(error::unexpected)?;
        String::from_utf8(pem).map_err(error::unexpected)
    }

    /// Constructs a public key from the modulus and exponent
    ///
    /// Leading zero bytes are ignored.
    ///
    /// # Errors
    ///
    /// The modulus is shorter than 2048 bits or longer than 8192 bits, or the
    /// exponent is empty.
    pub fn from_components(
        modulus: impl Into<Base64Url>,
        exponent: impl Into<Base64Url>,
    ) -> Result<Self, error::KeyRejected> {
        let modulus = minimal(modulus.into());
        let exponent = minimal(exponent.into());

        if modulus.len() < MIN_MODULUS_LEN {
            return Err(error::key_rejected("key modulus must be at least 2048 bits"));
        }

        if modulus.len() > MAX_MODULUS_LEN {
            return Err(error::key_rejected("key modulus must be at most 8192 bits"));
        }

        if exponent.is_empty() {
            return Err(error::key_rejected("key exponent must not be zero"));
        }

        Ok(Self { modulus, exponent })
    }

    fn to_openssl(&self) -> Result<Rsa<Public>, openssl::error::ErrorStack> {
        let modulus = BigNum::from_slice(self.modulus.as_slice())?;
        let exponent = BigNum::from_slice(self.exponent.as_slice())?;
        Rsa::from_public_components(modulus, exponent)
    }

    pub(crate) fn to_pkey(&self) -> Result<PKey<Public>, error::Unexpected> {
        let rsa = self.to_openssl().map_err(error::unexpected)?;
        PKey::from_rsa(rsa).map_err(error::unexpected)
    }

    pub(crate) fn verify(
        &self,
        params: &'static ring::signature::RsaParameters,
        data: &[u8],
        signature: &[u8],
    ) -> Result<(), error::IntegrityError> {
        let pk = ring::signature::RsaPublicKeyComponents {
            n: self.modulus.as_slice(),
            e: self.exponent.as_slice(),
        };

        pk.verify(params, data, signature)
            .map_err(|_| error::integrity_violation())
    }
}

fn minimal(value: Base64Url) -> Base64Url {
    let bytes = value.as_slice();
    match bytes.iter().position(|&b| b != 0) {
        Some(0) => value,
        Some(start) => Base64Url::from(&bytes[start..]),
        None => Base64Url::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_modulus() {
        let err = PublicKey::from_components(vec![0xc5; 128], vec![1, 0, 1]).unwrap_err();
        assert_eq!(err.to_string(), "key rejected");
    }

    #[test]
    fn ignores_leading_zeroes() {
        let mut modulus = vec![0; 3];
        modulus.extend(vec![0xc5; 256]);

        let key = PublicKey::from_components(modulus, vec![0, 1, 0, 1]).unwrap();
        assert_eq!(key.modulus_len(), 256);
        assert_eq!(key.exponent(), [1, 0, 1]);
    }
}
