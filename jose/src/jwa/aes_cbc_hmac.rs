//! AES-CBC with HMAC-SHA2 composite content encryption
//!
//! The content encryption key is split in two halves. The first half keys the
//! HMAC, the second half keys AES in CBC mode. The authentication tag is the
//! HMAC over `AAD || IV || ciphertext || AL`, truncated to the length of the
//! MAC key, where `AL` is the bit length of the AAD as a big-endian 64-bit
//! integer.

use std::fmt;

use openssl::symm::{self, Cipher};

use crate::{
    error, jwa, jwe,
    jwe::{ContentEncryption, Sealed},
};

const IV_LEN: usize = 16;

/// AES-CBC-HMAC content encryption algorithms
///
/// This list may be expanded in the future.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
#[allow(non_camel_case_types, clippy::upper_case_acronyms)]
#[non_exhaustive]
pub enum Algorithm {
    /// AES-128-CBC with HMAC-SHA-256
    A128CBC_HS256,
    /// AES-192-CBC with HMAC-SHA-384
    A192CBC_HS384,
    /// AES-256-CBC with HMAC-SHA-512
    A256CBC_HS512,
}

impl Algorithm {
    /// The identifier as it appears in the `enc` header parameter
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::A128CBC_HS256 => "A128CBC-HS256",
            Self::A192CBC_HS384 => "A192CBC-HS384",
            Self::A256CBC_HS512 => "A256CBC-HS512",
        }
    }

    /// The length in bytes of the content encryption key, MAC half included
    #[must_use]
    pub const fn cek_len(self) -> usize {
        match self {
            Self::A128CBC_HS256 => 32,
            Self::A192CBC_HS384 => 48,
            Self::A256CBC_HS512 => 64,
        }
    }

    fn cipher(self) -> Cipher {
        match self {
            Self::A128CBC_HS256 => Cipher::aes_128_cbc(),
            Self::A192CBC_HS384 => Cipher::aes_192_cbc(),
            Self::A256CBC_HS512 => Cipher::aes_256_cbc(),
        }
    }

    fn hmac(self) -> ring::hmac::Algorithm {
        match self {
            Self::A128CBC_HS256 => ring::hmac::HMAC_SHA256,
            Self::A192CBC_HS384 => ring::hmac::HMAC_SHA384,
            Self::A256CBC_HS512 => ring::hmac::HMAC_SHA512,
        }
    }

    fn split(self, cek: &[u8]) -> Result<(&[u8], &[u8]), error::InvalidKeyLength> {
        if cek.len() != self.cek_len() {
            return Err(error::invalid_key_length(
                self.name(),
                self.cek_len(),
                cek.len(),
            ));
        }

        Ok(cek.split_at(self.cek_len() / 2))
    }

    fn tag(self, mac_key: &[u8], aad: &[u8], iv: &[u8], ciphertext: &[u8]) -> Vec<u8> {
        let key = ring::hmac::Key::new(self.hmac(), mac_key);
        let mut ctx = ring::hmac::Context::with_key(&key);
        ctx.update(aad);
        ctx.update(iv);
        ctx.update(ciphertext);
        ctx.update(&(aad.len() as u64 * 8).to_be_bytes());

        let mut tag = ctx.sign().as_ref().to_vec();
        tag.truncate(mac_key.len());
        tag
    }
}

impl From<Algorithm> for jwe::Encryption {
    fn from(alg: Algorithm) -> Self {
        Self::AesCbcHmac(alg)
    }
}

impl ContentEncryption for Algorithm {
    fn cek_len(&self) -> usize {
        Algorithm::cek_len(*self)
    }

    fn encrypt(
        &self,
        cek: &[u8],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<Sealed, error::EncryptionError> {
        let (mac_key, enc_key) = self.split(cek)?;

        let iv = jwa::random(IV_LEN)?;
        let ciphertext =
            symm::encrypt(self.cipher(), enc_key, Some(&iv), plaintext).map_err(error::unexpected)?;
        let tag = self.tag(mac_key, aad, &iv, &ciphertext);

        Ok(Sealed::new(iv, ciphertext, tag))
    }

    fn decrypt(
        &self,
        cek: &[u8],
        aad: &[u8],
        sealed: &Sealed,
    ) -> Result<Vec<u8>, error::JoseError> {
        let (mac_key, enc_key) = self.split(cek)?;

        if sealed.iv().len() != IV_LEN {
            return Err(error::integrity_violation().into());
        }

        let expected = self.tag(mac_key, aad, sealed.iv(), sealed.ciphertext());
        if sealed.tag().len() != expected.len() || !openssl::memcmp::eq(sealed.tag(), &expected) {
            return Err(error::integrity_violation().into());
        }

        let plaintext = symm::decrypt(
            self.cipher(),
            enc_key,
            Some(sealed.iv()),
            sealed.ciphertext(),
        )
        .map_err(|_| error::integrity_violation())?;

        Ok(plaintext)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;

    use super::*;

    // RFC 7518, Appendix B.1
    const KEY: [u8; 32] = [
        0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e,
        0x0f, 0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18, 0x19, 0x1a, 0x1b, 0x1c, 0x1d,
        0x1e, 0x1f,
    ];

    const PLAINTEXT: &[u8] = b"A cipher system must not be required to be secret, and it must be able to fall into the hands of the enemy without inconvenience";

    const IV: [u8; 16] = [
        0x1a, 0xf3, 0x8c, 0x2d, 0xc2, 0xb9, 0x6f, 0xfd, 0xd8, 0x66, 0x94, 0x09, 0x23, 0x41, 0xbc,
        0x04,
    ];

    const AAD: &[u8] = b"The second principle of Auguste Kerckhoffs";

    const TAG: [u8; 16] = [
        0x65, 0x2c, 0x3f, 0xa3, 0x6b, 0x0a, 0x7c, 0x5b, 0x32, 0x19, 0xfa, 0xb3, 0xa3, 0x0b, 0xc1,
        0xc4,
    ];

    #[test]
    fn matches_published_tag() -> Result<()> {
        let alg = Algorithm::A128CBC_HS256;
        let (mac_key, enc_key) = alg.split(&KEY)?;

        let ciphertext = symm::encrypt(alg.cipher(), enc_key, Some(&IV), PLAINTEXT)?;
        assert_eq!(ciphertext.len(), 144);
        assert_eq!(&ciphertext[..4], &[0xc8, 0x0e, 0xdf, 0xa3]);

        let tag = alg.tag(mac_key, AAD, &IV, &ciphertext);
        assert_eq!(tag, TAG);

        let sealed = Sealed::new(IV.to_vec(), ciphertext, tag);
        assert_eq!(alg.decrypt(&KEY, AAD, &sealed)?, PLAINTEXT);

        Ok(())
    }

    #[test]
    fn tag_is_half_the_key() -> Result<()> {
        for &alg in &[
            Algorithm::A128CBC_HS256,
            Algorithm::A192CBC_HS384,
            Algorithm::A256CBC_HS512,
        ] {
            let cek = vec![0x11; alg.cek_len()];
            let sealed = alg.encrypt(&cek, b"aad", b"")?;

            assert_eq!(sealed.iv().len(), 16);
            assert_eq!(sealed.ciphertext().len(), 16);
            assert_eq!(sealed.tag().len(), alg.cek_len() / 2);
            assert!(alg.decrypt(&cek, b"aad", &sealed)?.is_empty());
        }

        Ok(())
    }

    #[test]
    fn rejects_any_tampering() -> Result<()> {
        let alg = Algorithm::A256CBC_HS512;
        let cek = vec![0x22; 64];
        let sealed = alg.encrypt(&cek, b"header", b"payload")?;

        assert!(alg.decrypt(&cek, b"headeR", &sealed).unwrap_err().is_integrity());

        let mut tag = sealed.tag().to_vec();
        tag[0] ^= 1;
        let forged = Sealed::new(sealed.iv().to_vec(), sealed.ciphertext().to_vec(), tag);
        assert!(alg.decrypt(&cek, b"header", &forged).unwrap_err().is_integrity());

        let mut iv = sealed.iv().to_vec();
        iv[15] ^= 1;
        let forged = Sealed::new(iv, sealed.ciphertext().to_vec(), sealed.tag().to_vec());
        assert!(alg.decrypt(&cek, b"header", &forged).unwrap_err().is_integrity());

        let truncated = Sealed::new(
            sealed.iv().to_vec(),
            sealed.ciphertext().to_vec(),
            sealed.tag()[..16].to_vec(),
        );
        assert!(alg.decrypt(&cek, b"header", &truncated).unwrap_err().is_integrity());

        Ok(())
    }

    #[test]
    fn rejects_wrong_key_length() {
        let err = Algorithm::A128CBC_HS256
            .encrypt(&[0; 16], b"", b"payload")
            .unwrap_err();
        assert!(matches!(err, error::EncryptionError::InvalidKeyLength(_)));
    }
}
