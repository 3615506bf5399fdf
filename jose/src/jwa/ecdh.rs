//! Elliptic Curve Diffie-Hellman Ephemeral Static key agreement
//!
//! A fresh key pair is generated on the recipient's curve for every message.
//! The shared secret is run through the Concat KDF (NIST SP 800-56A, with
//! SHA-256) to produce either the content encryption key itself (`ECDH-ES`)
//! or a key-encryption key for AES Key Wrap (`ECDH-ES+A*KW`). The ephemeral
//! public key is carried in the `epk` header parameter.
//!
//! If the header carries `apu` or `apv`, their decoded values are used as
//! PartyUInfo and PartyVInfo on both sides. Otherwise both are empty.

use std::fmt;

use openssl::{derive::Deriver, pkey::PKey};
use zeroize::Zeroizing;

use super::{aes_kw, ec};
use crate::{
    error, header,
    header::Header,
    jwe,
    jwe::{Cek, KeyContext, WrappedKey},
    Key,
};

/// ECDH-ES key management algorithms
///
/// This list may be expanded in the future.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
#[allow(non_camel_case_types, clippy::upper_case_acronyms)]
#[non_exhaustive]
pub enum Algorithm {
    /// Direct key agreement; the derived key is the CEK
    ECDH_ES,
    /// Key agreement followed by A128KW
    ECDH_ES_A128KW,
    /// Key agreement followed by A192KW
    ECDH_ES_A192KW,
    /// Key agreement followed by A256KW
    ECDH_ES_A256KW,
}

impl Algorithm {
    /// The identifier as it appears in the `alg` header parameter
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ECDH_ES => "ECDH-ES",
            Self::ECDH_ES_A128KW => "ECDH-ES+A128KW",
            Self::ECDH_ES_A192KW => "ECDH-ES+A192KW",
            Self::ECDH_ES_A256KW => "ECDH-ES+A256KW",
        }
    }

    const fn key_wrap(self) -> Option<aes_kw::Algorithm> {
        match self {
            Self::ECDH_ES => None,
            Self::ECDH_ES_A128KW => Some(aes_kw::Algorithm::A128KW),
            Self::ECDH_ES_A192KW => Some(aes_kw::Algorithm::A192KW),
            Self::ECDH_ES_A256KW => Some(aes_kw::Algorithm::A256KW),
        }
    }

    fn derive(
        self,
        shared_secret: &[u8],
        ctx: &KeyContext<'_>,
        party_info: &PartyInfo,
    ) -> Zeroizing<Vec<u8>> {
        let (algorithm_id, key_len) = match self.key_wrap() {
            None => (ctx.enc().name(), ctx.cek_len()),
            Some(kw) => (self.name(), kw.key_len()),
        };

        concat_kdf(
            shared_secret,
            algorithm_id,
            &party_info.apu,
            &party_info.apv,
            key_len,
        )
    }
}

impl From<Algorithm> for jwe::Algorithm {
    fn from(alg: Algorithm) -> Self {
        Self::Ecdh(alg)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Default)]
struct PartyInfo {
    apu: Vec<u8>,
    apv: Vec<u8>,
}

impl PartyInfo {
    fn from_header(header: &Header) -> Result<Self, error::DeserializationError> {
        Ok(Self {
            apu: header.optional_bytes(header::APU)?.unwrap_or_default(),
            apv: header.optional_bytes(header::APV)?.unwrap_or_default(),
        })
    }
}

/// Concat KDF over SHA-256
///
/// `OtherInfo` is `AlgorithmID || PartyUInfo || PartyVInfo || SuppPubInfo`,
/// where the first three are prefixed with their 32-bit big-endian length and
/// `SuppPubInfo` is the output length in bits.
pub(crate) fn concat_kdf(
    shared_secret: &[u8],
    algorithm_id: &str,
    apu: &[u8],
    apv: &[u8],
    key_len: usize,
) -> Zeroizing<Vec<u8>> {
    let mut other_info = Vec::new();
    for field in &[algorithm_id.as_bytes(), apu, apv] {
        other_info.extend_from_slice(&(field.len() as u32).to_be_bytes());
        other_info.extend_from_slice(field);
    }
    other_info.extend_from_slice(&((key_len * 8) as u32).to_be_bytes());

    let mut derived = Zeroizing::new(Vec::with_capacity(key_len + 32));
    let mut counter = 1_u32;
    while derived.len() < key_len {
        let mut digest = ring::digest::Context::new(&ring::digest::SHA256);
        digest.update(&counter.to_be_bytes());
        digest.update(shared_secret);
        digest.update(&other_info);
        derived.extend_from_slice(digest.finish().as_ref());
        counter += 1;
    }

    derived.truncate(key_len);
    derived
}

fn agree(
    private_key: &ec::PrivateKey,
    public_key: &ec::PublicKey,
) -> Result<Zeroizing<Vec<u8>>, error::Unexpected> {
    let private_key = private_key
        .to_openssl()
        .and_then(PKey::from_ec_key)
        .map_err(error::unexpected)?;
    let public_key = public_key
        .to_openssl()
        .and_then(PKey::from_ec_key)
        .map_err(error::unexpected)?;

    let mut deriver = Deriver::new(&private_key).map_err(error::unexpected)?;
    deriver.set_peer(&public_key).map_err(error::unexpected)?;

    Ok(Zeroizing::new(
        deriver.derive_to_vec().map_err(error::unexpected)?,
    ))
}

impl jwe::KeyManagement for Algorithm {
    fn wrap(&self, key: &Key, ctx: &KeyContext<'_>) -> Result<WrappedKey, error::EncryptionError> {
        let recipient = key.as_ec(self.name())?.public_key();
        let party_info = PartyInfo::from_header(ctx.header()).map_err(error::unexpected)?;

        let ephemeral = ec::PrivateKey::generate(recipient.curve())?;
        let shared_secret = agree(&ephemeral, recipient)?;
        let derived = self.derive(&shared_secret, ctx, &party_info);

        let epk = serde_json::to_value(ephemeral.public_key()).map_err(error::unexpected)?;
        let additions = Header::new().with(header::EPK, epk);

        let wrapped = match self.key_wrap() {
            None => WrappedKey::new(Cek::from(derived), Vec::new()),
            Some(_) => {
                let cek = Cek::random(ctx.cek_len())?;
                let encrypted_key = aes_kw::wrap(&derived, &cek)?;
                WrappedKey::new(cek, encrypted_key)
            }
        };

        Ok(wrapped.with_header(additions))
    }

    fn unwrap(
        &self,
        key: &Key,
        encrypted_key: &[u8],
        ctx: &KeyContext<'_>,
    ) -> Result<Cek, error::JoseError> {
        let private_key = key
            .as_ec(self.name())?
            .private_key()
            .ok_or_else(error::missing_private_key)?;

        let epk = ctx
            .header()
            .epk()
            .ok_or_else(|| header::missing(header::EPK))?;
        let epk: ec::PublicKey =
            serde_json::from_value(epk.clone()).map_err(|e| header::invalid(header::EPK, e))?;
        if epk.curve() != private_key.curve() {
            return Err(header::invalid(header::EPK, "ephemeral key is on another curve").into());
        }

        let party_info = PartyInfo::from_header(ctx.header())?;

        let shared_secret = agree(private_key, &epk)?;
        let derived = self.derive(&shared_secret, ctx, &party_info);

        match self.key_wrap() {
            None if !encrypted_key.is_empty() => {
                Err(error::malformed("encrypted key must be empty with 'ECDH-ES'").into())
            }
            None => Ok(Cek::from(derived)),
            Some(_) => {
                let cek = aes_kw::unwrap(&derived, encrypted_key)?;
                if cek.len() != ctx.cek_len() {
                    return Err(error::integrity_violation().into());
                }
                Ok(cek)
            }
        }
    }
}
