//! AES-GCM content encryption

use std::fmt;

use openssl::symm::{self, Cipher};

use crate::{
    error, jwa, jwe,
    jwe::{ContentEncryption, Sealed},
};

const IV_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// AES-GCM content encryption algorithms
///
/// This list may be expanded in the future.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
#[allow(clippy::upper_case_acronyms)]
#[non_exhaustive]
pub enum Algorithm {
    /// AES-GCM using a 128-bit key
    A128GCM,
    /// AES-GCM using a 192-bit key
    A192GCM,
    /// AES-GCM using a 256-bit key
    A256GCM,
}

impl Algorithm {
    /// The identifier as it appears in the `enc` header parameter
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::A128GCM => "A128GCM",
            Self::A192GCM => "A192GCM",
            Self::A256GCM => "A256GCM",
        }
    }

    /// The length in bytes of the content encryption key
    #[must_use]
    pub const fn cek_len(self) -> usize {
        match self {
            Self::A128GCM => 16,
            Self::A192GCM => 24,
            Self::A256GCM => 32,
        }
    }

    fn cipher(self) -> Cipher {
        match self {
            Self::A128GCM => Cipher::aes_128_gcm(),
            Self::A192GCM => Cipher::aes_192_gcm(),
            Self::A256GCM => Cipher::aes_256_gcm(),
        }
    }

    /// Encrypts under a fresh 96-bit IV
    pub(crate) fn seal(
        self,
        key: &[u8],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<Sealed, error::Unexpected> {
        let iv = jwa::random(IV_LEN)?;
        let mut tag = vec![0; TAG_LEN];
        let ciphertext = symm::encrypt_aead(self.cipher(), key, Some(&iv), aad, plaintext, &mut tag)
            .map_err(error::unexpected)?;

        Ok(Sealed::new(iv, ciphertext, tag))
    }

    /// Authenticates and decrypts; nothing is returned unless the tag matches
    pub(crate) fn open(
        self,
        key: &[u8],
        aad: &[u8],
        sealed: &Sealed,
    ) -> Result<Vec<u8>, error::IntegrityError> {
        if sealed.iv().len() != IV_LEN || sealed.tag().len() != TAG_LEN {
            return Err(error::integrity_violation());
        }

        symm::decrypt_aead(
            self.cipher(),
            key,
            Some(sealed.iv()),
            aad,
            sealed.ciphertext(),
            sealed.tag(),
        )
        .map_err(|_| error::integrity_violation())
    }

    fn check_key(self, cek: &[u8]) -> Result<(), error::InvalidKeyLength> {
        if cek.len() == self.cek_len() {
            Ok(())
        } else {
            Err(error::invalid_key_length(
                self.name(),
                self.cek_len(),
                cek.len(),
            ))
        }
    }
}

impl From<Algorithm> for jwe::Encryption {
    fn from(alg: Algorithm) -> Self {
        Self::AesGcm(alg)
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
        self.check_key(cek)?;
        Ok(self.seal(cek, aad, plaintext)?)
    }

    fn decrypt(
        &self,
        cek: &[u8],
        aad: &[u8],
        sealed: &Sealed,
    ) -> Result<Vec<u8>, error::JoseError> {
        self.check_key(cek)?;
        Ok(self.open(cek, aad, sealed)?)
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

    #[test]
    fn produces_standard_iv_and_tag() -> Result<()> {
        for &alg in &[Algorithm::A128GCM, Algorithm::A192GCM, Algorithm::A256GCM] {
            let cek = vec![0x42; alg.cek_len()];
            let sealed = alg.encrypt(&cek, b"aad", b"{\"hello\": \"world\"}")?;

            assert_eq!(sealed.iv().len(), 12);
            assert_eq!(sealed.tag().len(), 16);
            assert_eq!(sealed.ciphertext().len(), 18);
            assert_eq!(alg.decrypt(&cek, b"aad", &sealed)?, b"{\"hello\": \"world\"}");
        }

        Ok(())
    }

    #[test]
    fn fresh_iv_per_message() -> Result<()> {
        let cek = [0x42; 16];
        let first = Algorithm::A128GCM.encrypt(&cek, b"", b"same")?;
        let second = Algorithm::A128GCM.encrypt(&cek, b"", b"same")?;

        assert_ne!(first.iv(), second.iv());
        assert_ne!(first.ciphertext(), second.ciphertext());

        Ok(())
    }

    #[test]
    fn rejects_tampering() -> Result<()> {
        let alg = Algorithm::A256GCM;
        let cek = [0x17; 32];
        let sealed = alg.encrypt(&cek, b"header", b"payload")?;

        let mut ciphertext = sealed.ciphertext().to_vec();
        ciphertext[3] ^= 0x40;
        let forged = Sealed::new(sealed.iv().to_vec(), ciphertext, sealed.tag().to_vec());
        assert!(alg.decrypt(&cek, b"header", &forged).unwrap_err().is_integrity());

        assert!(alg.decrypt(&cek, b"Header", &sealed).unwrap_err().is_integrity());

        let short_iv = Sealed::new(
            sealed.iv()[..8].to_vec(),
            sealed.ciphertext().to_vec(),
            sealed.tag().to_vec(),
        );
        assert!(alg.decrypt(&cek, b"header", &short_iv).unwrap_err().is_integrity());

        Ok(())
    }

    #[test]
    fn rejects_wrong_key_length() {
        let err = Algorithm::A192GCM
            .decrypt(&[0; 16], b"", &Sealed::new(vec![0; 12], vec![], vec![0; 16]))
            .unwrap_err();
        assert!(err.is_encryption());
    }
}
