//! Implementations of the JSON Web Encryption (JWE) standard
//!
//! The specifications for this standard can be found in [RFC7516][].
//!
//! Encryption happens in two steps. The key management algorithm (`alg`)
//! produces a content encryption key (CEK), possibly wrapping it for the
//! encrypted key segment and adding header parameters. The content encryption
//! algorithm (`enc`) then seals the payload under the CEK, authenticating the
//! base64url protected header as additional data.
//!
//! ```
//! use jose::{jwe, Key};
//!
//! # fn main() -> Result<(), jose::error::JoseError> {
//! let key = Key::secret(vec![0x42; 16]);
//!
//! let token = jwe::Jwe::new(jwe::Algorithm::DIR, jwe::Encryption::A128GCM, "hello").encrypt(&key)?;
//! let segments: Vec<&str> = token.as_str().split('.').collect();
//! assert_eq!(segments.len(), 5);
//! assert_eq!(segments[1].len(), 0);
//! assert_eq!(segments[2].len(), 16);
//! assert_eq!(segments[4].len(), 22);
//!
//! let decoded = jwe::decrypt(&token, &key)?;
//! assert_eq!(decoded.payload(), b"hello");
//! # Ok(())
//! # }
//! ```
//!
//! [RFC7516]: https://tools.ietf.org/html/rfc7516

use std::{borrow::Cow, convert::TryFrom, fmt, ops::Deref, str::FromStr};

use zeroize::Zeroizing;

use crate::{
    compact::{self, Compact, CompactRef, Decoded},
    error, header,
    header::Header,
    jwa, zip, Key, Registry,
};

/// JSON Web Encryption key management algorithms
///
/// This list may be expanded in the future.
#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum Algorithm {
    /// Direct use of a shared symmetric key
    Direct,

    /// AES Key Wrap
    AesKw(jwa::aes_kw::Algorithm),

    /// Key wrapping with AES-GCM
    AesGcmKw(jwa::aes_gcm_kw::Algorithm),

    /// RSA key encryption
    Rsa(jwa::rsa::KeyManagementAlgorithm),

    /// Password-based key wrapping
    Pbes2(jwa::pbes2::Algorithm),

    /// Elliptic curve key agreement
    Ecdh(jwa::ecdh::Algorithm),
}

impl Algorithm {
    /// The `dir` algorithm
    pub const DIR: Algorithm = Self::Direct;
    /// The A128KW algorithm
    pub const A128KW: Algorithm = Self::AesKw(jwa::aes_kw::Algorithm::A128KW);
    /// The A192KW algorithm
    pub const A192KW: Algorithm = Self::AesKw(jwa::aes_kw::Algorithm::A192KW);
    /// The A256KW algorithm
    pub const A256KW: Algorithm = Self::AesKw(jwa::aes_kw::Algorithm::A256KW);
    /// The A128GCMKW algorithm
    pub const A128GCMKW: Algorithm = Self::AesGcmKw(jwa::aes_gcm_kw::Algorithm::A128GCMKW);
    /// The A192GCMKW algorithm
    pub const A192GCMKW: Algorithm = Self::AesGcmKw(jwa::aes_gcm_kw::Algorithm::A192GCMKW);
    /// The A256GCMKW algorithm
    pub const A256GCMKW: Algorithm = Self::AesGcmKw(jwa::aes_gcm_kw::Algorithm::A256GCMKW);
    /// The RSA1_5 algorithm
    pub const RSA1_5: Algorithm = Self::Rsa(jwa::rsa::KeyManagementAlgorithm::RSA1_5);
    /// The RSA-OAEP algorithm
    pub const RSA_OAEP: Algorithm = Self::Rsa(jwa::rsa::KeyManagementAlgorithm::RSA_OAEP);
    /// The RSA-OAEP-256 algorithm
    pub const RSA_OAEP_256: Algorithm = Self::Rsa(jwa::rsa::KeyManagementAlgorithm::RSA_OAEP_256);
    /// The PBES2-HS256+A128KW algorithm
    pub const PBES2_HS256_A128KW: Algorithm =
        Self::Pbes2(jwa::pbes2::Algorithm::PBES2_HS256_A128KW);
    /// The PBES2-HS384+A192KW algorithm
    pub const PBES2_HS384_A192KW: Algorithm =
        Self::Pbes2(jwa::pbes2::Algorithm::PBES2_HS384_A192KW);
    /// The PBES2-HS512+A256KW algorithm
    pub const PBES2_HS512_A256KW: Algorithm =
        Self::Pbes2(jwa::pbes2::Algorithm::PBES2_HS512_A256KW);
    /// The ECDH-ES algorithm
    pub const ECDH_ES: Algorithm = Self::Ecdh(jwa::ecdh::Algorithm::ECDH_ES);
    /// The ECDH-ES+A128KW algorithm
    pub const ECDH_ES_A128KW: Algorithm = Self::Ecdh(jwa::ecdh::Algorithm::ECDH_ES_A128KW);
    /// The ECDH-ES+A192KW algorithm
    pub const ECDH_ES_A192KW: Algorithm = Self::Ecdh(jwa::ecdh::Algorithm::ECDH_ES_A192KW);
    /// The ECDH-ES+A256KW algorithm
    pub const ECDH_ES_A256KW: Algorithm = Self::Ecdh(jwa::ecdh::Algorithm::ECDH_ES_A256KW);

    pub(crate) const ALL: [Algorithm; 17] = [
        Self::DIR,
        Self::A128KW,
        Self::A192KW,
        Self::A256KW,
        Self::A128GCMKW,
        Self::A192GCMKW,
        Self::A256GCMKW,
        Self::RSA1_5,
        Self::RSA_OAEP,
        Self::RSA_OAEP_256,
        Self::PBES2_HS256_A128KW,
        Self::PBES2_HS384_A192KW,
        Self::PBES2_HS512_A256KW,
        Self::ECDH_ES,
        Self::ECDH_ES_A128KW,
        Self::ECDH_ES_A192KW,
        Self::ECDH_ES_A256KW,
    ];

    /// The identifier as it appears in the `alg` header parameter
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Direct => jwa::direct::Direct::NAME,
            Self::AesKw(alg) => alg.name(),
            Self::AesGcmKw(alg) => alg.name(),
            Self::Rsa(alg) => alg.name(),
            Self::Pbes2(alg) => alg.name(),
            Self::Ecdh(alg) => alg.name(),
        }
    }
}

impl TryFrom<&'_ str> for Algorithm {
    type Error = error::UnknownAlgorithm;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::ALL
            .iter()
            .copied()
            .find(|alg| alg.name() == s)
            .ok_or_else(|| error::unknown_algorithm(s))
    }
}

impl FromStr for Algorithm {
    type Err = error::UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// JSON Web Encryption content encryption algorithms
///
/// This list may be expanded in the future.
#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum Encryption {
    /// AES-CBC with HMAC-SHA2
    AesCbcHmac(jwa::aes_cbc_hmac::Algorithm),

    /// AES-GCM
    AesGcm(jwa::aes_gcm::Algorithm),
}

impl Encryption {
    /// The A128CBC-HS256 algorithm
    pub const A128CBC_HS256: Encryption =
        Self::AesCbcHmac(jwa::aes_cbc_hmac::Algorithm::A128CBC_HS256);
    /// The A192CBC-HS384 algorithm
    pub const A192CBC_HS384: Encryption =
        Self::AesCbcHmac(jwa::aes_cbc_hmac::Algorithm::A192CBC_HS384);
    /// The A256CBC-HS512 algorithm
    pub const A256CBC_HS512: Encryption =
        Self::AesCbcHmac(jwa::aes_cbc_hmac::Algorithm::A256CBC_HS512);
    /// The A128GCM algorithm
    pub const A128GCM: Encryption = Self::AesGcm(jwa::aes_gcm::Algorithm::A128GCM);
    /// The A192GCM algorithm
    pub const A192GCM: Encryption = Self::AesGcm(jwa::aes_gcm::Algorithm::A192GCM);
    /// The A256GCM algorithm
    pub const A256GCM: Encryption = Self::AesGcm(jwa::aes_gcm::Algorithm::A256GCM);

    pub(crate) const ALL: [Encryption; 6] = [
        Self::A128CBC_HS256,
        Self::A192CBC_HS384,
        Self::A256CBC_HS512,
        Self::A128GCM,
        Self::A192GCM,
        Self::A256GCM,
    ];

    /// The identifier as it appears in the `enc` header parameter
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AesCbcHmac(alg) => alg.name(),
            Self::AesGcm(alg) => alg.name(),
        }
    }

    /// The length in bytes of the content encryption key
    #[must_use]
    pub const fn cek_len(self) -> usize {
        match self {
            Self::AesCbcHmac(alg) => alg.cek_len(),
            Self::AesGcm(alg) => alg.cek_len(),
        }
    }
}

impl TryFrom<&'_ str> for Encryption {
    type Error = error::UnknownAlgorithm;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::ALL
            .iter()
            .copied()
            .find(|enc| enc.name() == s)
            .ok_or_else(|| error::unknown_algorithm(s))
    }
}

impl FromStr for Encryption {
    type Err = error::UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s)
    }
}

impl fmt::Display for Encryption {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A content encryption capability
pub trait ContentEncryption: fmt::Debug + Send + Sync {
    /// The length in bytes of the content encryption key
    fn cek_len(&self) -> usize;

    /// Encrypts and authenticates the plaintext together with `aad`
    ///
    /// # Errors
    ///
    /// The CEK has the wrong length, or the cipher failed.
    fn encrypt(
        &self,
        cek: &[u8],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<Sealed, error::EncryptionError>;

    /// Authenticates and decrypts
    ///
    /// No plaintext is returned unless the tag matches.
    ///
    /// # Errors
    ///
    /// * [`IntegrityError`][error::IntegrityError] on any authentication or padding failure
    /// * [`EncryptionError`][error::EncryptionError] if the CEK has the wrong length
    fn decrypt(
        &self,
        cek: &[u8],
        aad: &[u8],
        sealed: &Sealed,
    ) -> Result<Vec<u8>, error::JoseError>;
}

/// A key management capability
pub trait KeyManagement: fmt::Debug + Send + Sync {
    /// Produces the CEK for a new message
    ///
    /// # Errors
    ///
    /// The key is unsuitable for the algorithm, or a primitive failed.
    fn wrap(&self, key: &Key, ctx: &KeyContext<'_>) -> Result<WrappedKey, error::EncryptionError>;

    /// Recovers the CEK of a received message
    ///
    /// # Errors
    ///
    /// * [`DeserializationError`][error::DeserializationError] if a header
    ///   parameter the algorithm needs is absent or malformed
    /// * [`IntegrityError`][error::IntegrityError] if the CEK cannot be recovered
    /// * [`EncryptionError`][error::EncryptionError] if the key is unsuitable
    fn unwrap(
        &self,
        key: &Key,
        encrypted_key: &[u8],
        ctx: &KeyContext<'_>,
    ) -> Result<Cek, error::JoseError>;
}

/// What a key management algorithm knows about the message
///
/// When producing, the header holds the parameters set by the caller. When
/// consuming, it is the complete received header.
#[derive(Clone, Copy, Debug)]
pub struct KeyContext<'a> {
    enc: Encryption,
    cek_len: usize,
    header: &'a Header,
}

impl<'a> KeyContext<'a> {
    /// A context for the content encryption algorithm `enc`
    #[must_use]
    pub fn new(enc: Encryption, header: &'a Header) -> Self {
        Self::with_cek_len(enc, enc.cek_len(), header)
    }

    pub(crate) fn with_cek_len(enc: Encryption, cek_len: usize, header: &'a Header) -> Self {
        Self {
            enc,
            cek_len,
            header,
        }
    }

    /// The content encryption algorithm
    #[must_use]
    pub fn enc(&self) -> Encryption {
        self.enc
    }

    /// The length in bytes of the CEK
    #[must_use]
    pub fn cek_len(&self) -> usize {
        self.cek_len
    }

    /// The header
    #[must_use]
    pub fn header(&self) -> &'a Header {
        self.header
    }
}

/// A content encryption key
///
/// Scrubbed from memory when dropped.
#[derive(Clone)]
pub struct Cek(Zeroizing<Vec<u8>>);

impl Cek {
    /// Wraps raw key bytes
    #[must_use]
    pub fn new(cek: Vec<u8>) -> Self {
        Self(Zeroizing::new(cek))
    }

    /// Generates a random key of `len` bytes
    ///
    /// # Errors
    ///
    /// Unable to generate the key.
    pub fn random(len: usize) -> Result<Self, error::Unexpected> {
        jwa::random(len).map(Self::new)
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

impl From<Zeroizing<Vec<u8>>> for Cek {
    fn from(cek: Zeroizing<Vec<u8>>) -> Self {
        Self(cek)
    }
}

impl Deref for Cek {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Cek {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Cek")
            .field("len", &self.len())
            .field("key", &"<redacted>")
            .finish()
    }
}

/// The output of a key management algorithm
#[derive(Debug)]
#[must_use]
pub struct WrappedKey {
    cek: Cek,
    encrypted_key: Vec<u8>,
    header: Header,
}

impl WrappedKey {
    /// A CEK and its encrypted key segment
    pub fn new(cek: Cek, encrypted_key: Vec<u8>) -> Self {
        Self {
            cek,
            encrypted_key,
            header: Header::new(),
        }
    }

    /// Adds parameters to the protected header
    pub fn with_header(self, header: Header) -> Self {
        Self { header, ..self }
    }

    /// The content encryption key
    pub fn cek(&self) -> &Cek {
        &self.cek
    }

    /// The encrypted key segment
    #[must_use]
    pub fn encrypted_key(&self) -> &[u8] {
        &self.encrypted_key
    }

    /// Parameters added to the protected header
    pub fn header(&self) -> &Header {
        &self.header
    }
}

/// Output of a content encryption algorithm
#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use]
pub struct Sealed {
    iv: Vec<u8>,
    ciphertext: Vec<u8>,
    tag: Vec<u8>,
}

impl Sealed {
    /// Collects the IV, ciphertext and authentication tag
    pub fn new(iv: Vec<u8>, ciphertext: Vec<u8>, tag: Vec<u8>) -> Self {
        Self {
            iv,
            ciphertext,
            tag,
        }
    }

    /// The initialization vector
    #[must_use]
    pub fn iv(&self) -> &[u8] {
        &self.iv
    }

    /// The ciphertext
    #[must_use]
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// The authentication tag
    #[must_use]
    pub fn tag(&self) -> &[u8] {
        &self.tag
    }
}

/// A payload to be encrypted
///
/// The protected header is `alg`, `enc`, `zip` (when compressing), the
/// parameters added by the key management algorithm, and then any parameters
/// added through [`header_mut`](Self::header_mut).
#[derive(Clone, Debug)]
#[must_use]
pub struct Jwe {
    alg: Algorithm,
    enc: Encryption,
    zip: Option<zip::Algorithm>,
    header: Header,
    payload: Vec<u8>,
}

impl Jwe {
    /// A payload to be encrypted with `alg` and `enc`
    pub fn new(
        alg: impl Into<Algorithm>,
        enc: impl Into<Encryption>,
        payload: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            alg: alg.into(),
            enc: enc.into(),
            zip: None,
            header: Header::new(),
            payload: payload.into(),
        }
    }

    /// Compresses the payload before encryption
    ///
    /// Compressing secrets together with attacker-controlled data reveals
    /// information through the ciphertext length.
    pub fn with_compression(self, zip: zip::Algorithm) -> Self {
        Self {
            zip: Some(zip),
            ..self
        }
    }

    /// Adds a header parameter, builder style
    pub fn with_parameter(
        mut self,
        name: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.header.set(name, value);
        self
    }

    /// The additional header parameters
    pub fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    /// Encrypts using the global registry
    ///
    /// # Errors
    ///
    /// See [`encrypt_with`](Self::encrypt_with).
    pub fn encrypt(&self, key: &Key) -> Result<Compact, error::EncryptionError> {
        self.encrypt_with(Registry::global(), key)
    }

    /// Encrypts using the algorithms of `registry`
    ///
    /// # Errors
    ///
    /// * An algorithm is not registered
    /// * An added header parameter conflicts with one set by the engine
    /// * The key is unsuitable for the key management algorithm
    pub fn encrypt_with(
        &self,
        registry: &Registry,
        key: &Key,
    ) -> Result<Compact, error::EncryptionError> {
        tracing::trace!(alg = %self.alg, enc = %self.enc, zip = ?self.zip, "encrypting JWE");

        let key_management = registry.key_management(self.alg)?;
        let content = registry.content_encryption(self.enc)?;
        let compression = self.zip.map(|z| registry.compression(z)).transpose()?;

        let ctx = KeyContext::with_cek_len(self.enc, content.cek_len(), &self.header);
        let wrapped = key_management.wrap(key, &ctx)?;

        let mut header = Header::with_algorithm(self.alg.name()).with(header::ENC, self.enc.name());
        if let Some(zip) = self.zip {
            header.set(header::ZIP, zip.name());
        }
        let protected = header.merge(wrapped.header())?.merge(&self.header)?.encode()?;

        let plaintext = match compression {
            Some(c) => Cow::Owned(c.compress(&self.payload)?),
            None => Cow::Borrowed(self.payload.as_slice()),
        };

        let sealed = content.encrypt(wrapped.cek(), protected.as_bytes(), &plaintext)?;

        let token = [
            protected.as_str(),
            &jose_base64::encode(wrapped.encrypted_key()),
            &jose_base64::encode(sealed.iv()),
            &jose_base64::encode(sealed.ciphertext()),
            &jose_base64::encode(sealed.tag()),
        ]
        .join(".");

        Ok(Compact::new(token))
    }
}

/// Decrypts a JWE using the global registry
///
/// # Errors
///
/// See [`decrypt_with`].
pub fn decrypt(token: &CompactRef, key: &Key) -> Result<Decoded, error::JoseError> {
    decrypt_with(Registry::global(), token, key)
}

/// Decrypts a JWE using the algorithms of `registry`
///
/// The algorithms are taken from the received header.
///
/// # Errors
///
/// * [`DeserializationError`][error::DeserializationError] if the token is not
///   five base64url segments, the header is not a JSON object with `alg` and
///   `enc`, or a parameter needed by the key management algorithm is malformed
/// * [`EncryptionError`][error::EncryptionError] if an algorithm is unknown or
///   not registered, or the key is unsuitable
/// * [`IntegrityError`][error::IntegrityError] if the CEK cannot be recovered,
///   the tag does not match, or the payload does not decompress
pub fn decrypt_with(
    registry: &Registry,
    token: &CompactRef,
    key: &Key,
) -> Result<Decoded, error::JoseError> {
    let [h, k, i, c, t] = compact::split_exact::<5>(token.as_str(), "JWE must have 5 segments")?;

    let header = Header::decode(h)?;
    let alg = Algorithm::try_from(header.alg().ok_or_else(|| header::missing(header::ALG))?)?;
    let enc = Encryption::try_from(header.enc().ok_or_else(|| header::missing(header::ENC))?)?;
    let zip = header
        .zip()
        .filter(|&z| z != "none")
        .map(zip::Algorithm::try_from)
        .transpose()?;

    let encrypted_key = compact::decode_segment(k, "JWE encrypted key is not base64url")?;
    let sealed = Sealed::new(
        compact::decode_segment(i, "JWE IV is not base64url")?,
        compact::decode_segment(c, "JWE ciphertext is not base64url")?,
        compact::decode_segment(t, "JWE tag is not base64url")?,
    );

    tracing::trace!(%alg, %enc, ?zip, "decrypting JWE");

    let key_management = registry.key_management(alg)?;
    let content = registry.content_encryption(enc)?;
    let compression = zip.map(|z| registry.compression(z)).transpose()?;

    let ctx = KeyContext::with_cek_len(enc, content.cek_len(), &header);
    let plaintext = key_management
        .unwrap(key, &encrypted_key, &ctx)
        .and_then(|cek| content.decrypt(&cek, h.as_bytes(), &sealed))
        .map_err(|err| {
            tracing::debug!(%alg, %enc, error = %err, "JWE rejected");
            err
        })?;

    let payload = match compression {
        Some(c) => c.decompress(&plaintext)?,
        None => plaintext,
    };

    Ok(Decoded::new(header, payload))
}
