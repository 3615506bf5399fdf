//! JSON Web Tokens
//!
//! A [`Jwt`] produces signed, encrypted, or nested tokens from a claim set, and
//! a [`Deserializer`] opens any of them again. Every header produced here
//! carries `typ: "JWT"`. When one token becomes the payload of another, the
//! outer header also carries `cty: "JWT"`, which is what tells the
//! deserializer to descend.
//!
//! ```
//! use jose::{jws, jwt, Key};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let key = Key::secret(*b"a0a2abd8-6162-41c3-83d6-1cf559b46afc");
//!
//! let token = jwt::Jwt::signed(jws::Algorithm::HS256, Some(key.clone()))?
//!     .signed_token(r#"{"sub":"alice"}"#)?;
//!
//! let decoded = jwt::deserialize(&token, Some(&key), None)?;
//! assert_eq!(decoded.payload_str()?, r#"{"sub":"alice"}"#);
//! # Ok(())
//! # }
//! ```

use std::convert::TryFrom;

use serde::Serialize;

use crate::{
    compact::{self, Compact, CompactRef, Decoded},
    error, header,
    header::Header,
    jwe::{self, Jwe},
    jws::{self, Jws},
    zip, Key, Registry,
};

const JWT: &str = "JWT";

/// Serializes a claim set as JSON
///
/// # Errors
///
/// The value cannot be represented as JSON (a map with non-string keys, for
/// example).
pub fn json_claims(claims: &impl Serialize) -> Result<String, error::Unexpected> {
    serde_json::to_string(claims).map_err(error::unexpected)
}

/// A token producer configured with signing and/or encryption
///
/// Preconditions are checked when the value is built, so a missing signing
/// key is reported by [`signed`](Self::signed) rather than when a token is
/// produced.
#[derive(Clone, Debug)]
#[must_use]
pub struct Jwt<'r> {
    registry: &'r Registry,
    signing: Option<(jws::Algorithm, Option<Key>)>,
    encryption: Option<(jwe::Algorithm, jwe::Encryption, Key)>,
    zip: Option<zip::Algorithm>,
    header: Header,
}

impl Jwt<'static> {
    /// A producer of signed tokens
    ///
    /// # Errors
    ///
    /// No key was given and `alg` is not `none`.
    pub fn signed(
        alg: impl Into<jws::Algorithm>,
        key: Option<Key>,
    ) -> Result<Self, error::MissingKey> {
        let signing = signing(alg.into(), key)?;
        Ok(Self {
            registry: Registry::global(),
            signing: Some(signing),
            encryption: None,
            zip: None,
            header: Header::new(),
        })
    }

    /// A producer of encrypted tokens
    pub fn encrypted(
        alg: impl Into<jwe::Algorithm>,
        enc: impl Into<jwe::Encryption>,
        key: Key,
    ) -> Self {
        Self {
            registry: Registry::global(),
            signing: None,
            encryption: Some((alg.into(), enc.into(), key)),
            zip: None,
            header: Header::new(),
        }
    }

    /// A producer of tokens that are both signed and encrypted
    ///
    /// The nesting order is chosen when producing, through
    /// [`signed_then_encrypted_token`](Self::signed_then_encrypted_token) or
    /// [`encrypted_then_signed_token`](Self::encrypted_then_signed_token).
    ///
    /// # Errors
    ///
    /// No signing key was given and `sign_alg` is not `none`.
    pub fn signed_and_encrypted(
        sign_alg: impl Into<jws::Algorithm>,
        sign_key: Option<Key>,
        alg: impl Into<jwe::Algorithm>,
        enc: impl Into<jwe::Encryption>,
        key: Key,
    ) -> Result<Self, error::MissingKey> {
        let signing = signing(sign_alg.into(), sign_key)?;
        Ok(Self {
            signing: Some(signing),
            ..Self::encrypted(alg, enc, key)
        })
    }
}

fn signing(
    alg: jws::Algorithm,
    key: Option<Key>,
) -> Result<(jws::Algorithm, Option<Key>), error::MissingKey> {
    if key.is_none() && alg != jws::Algorithm::NONE {
        return Err(error::missing_key(alg.name()));
    }

    Ok((alg, key))
}

impl<'r> Jwt<'r> {
    /// Uses the algorithms of `registry` instead of the global registry
    pub fn with_registry<'a>(self, registry: &'a Registry) -> Jwt<'a> {
        Jwt {
            registry,
            signing: self.signing,
            encryption: self.encryption,
            zip: self.zip,
            header: self.header,
        }
    }

    /// Compresses the payload of every JWE produced
    pub fn with_compression(self, zip: zip::Algorithm) -> Self {
        Self {
            zip: Some(zip),
            ..self
        }
    }

    /// Adds a header parameter to every token produced
    ///
    /// A parameter that disagrees with `typ` or `cty` as set for the token
    /// being produced causes production to fail with
    /// [`HeaderConflict`][error::HeaderConflict].
    pub fn with_parameter(
        mut self,
        name: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.header.set(name, value);
        self
    }

    /// A JWS over the claim set
    ///
    /// # Errors
    ///
    /// No signing algorithm is configured, or signing fails.
    pub fn signed_token(
        &self,
        claims: impl AsRef<[u8]>,
    ) -> Result<Compact, error::EncryptionError> {
        self.sign(claims.as_ref(), false)
    }

    /// A JWE over the claim set
    ///
    /// # Errors
    ///
    /// No encryption algorithm is configured, or encryption fails.
    pub fn encrypted_token(
        &self,
        claims: impl AsRef<[u8]>,
    ) -> Result<Compact, error::EncryptionError> {
        self.encrypt(claims.as_ref(), false)
    }

    /// A JWE whose payload is a JWS over the claim set
    ///
    /// # Errors
    ///
    /// Either algorithm is not configured, or either step fails.
    pub fn signed_then_encrypted_token(
        &self,
        claims: impl AsRef<[u8]>,
    ) -> Result<Compact, error::EncryptionError> {
        self.check_configured()?;
        let inner = self.sign(claims.as_ref(), false)?;
        self.encrypt(inner.as_str().as_bytes(), true)
    }

    /// A JWS whose payload is a JWE over the claim set
    ///
    /// # Errors
    ///
    /// Either algorithm is not configured, or either step fails.
    pub fn encrypted_then_signed_token(
        &self,
        claims: impl AsRef<[u8]>,
    ) -> Result<Compact, error::EncryptionError> {
        self.check_configured()?;
        let inner = self.encrypt(claims.as_ref(), false)?;
        self.sign(inner.as_str().as_bytes(), true)
    }

    fn check_configured(&self) -> Result<(), error::MissingAlgorithm> {
        if self.signing.is_none() {
            return Err(error::missing_algorithm("signing"));
        }
        if self.encryption.is_none() {
            return Err(error::missing_algorithm("encryption"));
        }
        Ok(())
    }

    fn header(&self, nested: bool) -> Result<Header, error::HeaderConflict> {
        let mut header = Header::new().with(header::TYP, JWT);
        if nested {
            header.set(header::CTY, JWT);
        }
        header.merge(&self.header)
    }

    fn sign(&self, payload: &[u8], nested: bool) -> Result<Compact, error::EncryptionError> {
        let (alg, key) = self
            .signing
            .as_ref()
            .ok_or_else(|| error::missing_algorithm("signing"))?;

        let mut jws = Jws::new(*alg, payload);
        *jws.header_mut() = self.header(nested)?;
        jws.sign_with(self.registry, key.as_ref())
    }

    fn encrypt(&self, payload: &[u8], nested: bool) -> Result<Compact, error::EncryptionError> {
        let (alg, enc, key) = self
            .encryption
            .as_ref()
            .ok_or_else(|| error::missing_algorithm("encryption"))?;

        let mut jwe = Jwe::new(*alg, *enc, payload);
        if let Some(zip) = self.zip {
            jwe = jwe.with_compression(zip);
        }
        *jwe.header_mut() = self.header(nested)?;
        jwe.encrypt_with(self.registry, key)
    }
}

/// Opens signed, encrypted and nested tokens
///
/// A token is first verified as a JWS. Only if it is not shaped like one is
/// it decrypted as a JWE. When the recovered header has `cty` equal to `JWT`
/// (in any case), the payload is opened again with the same keys, up to
/// [`max_depth`](Self::with_max_depth) objects in total. The innermost
/// object's header and payload are returned.
#[derive(Clone, Copy, Debug)]
#[must_use]
pub struct Deserializer<'r> {
    registry: &'r Registry,
    max_depth: usize,
}

impl Deserializer<'static> {
    /// A deserializer over the global registry
    pub fn new() -> Self {
        Self::with_registry(Registry::global())
    }
}

impl Default for Deserializer<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'r> Deserializer<'r> {
    /// The number of nested objects accepted by default
    pub const DEFAULT_MAX_DEPTH: usize = 8;

    /// A deserializer over the algorithms of `registry`
    pub fn with_registry(registry: &'r Registry) -> Self {
        Self {
            registry,
            max_depth: Self::DEFAULT_MAX_DEPTH,
        }
    }

    /// Bounds the number of nested objects, counting the outermost one
    pub fn with_max_depth(self, max_depth: usize) -> Self {
        Self { max_depth, ..self }
    }

    /// Verifies and decrypts every layer of `token`
    ///
    /// # Errors
    ///
    /// * [`DeserializationError`][error::DeserializationError] if the token is
    ///   neither a JWS nor a JWE, a nested payload is not text, or nesting is
    ///   deeper than allowed
    /// * [`IntegrityError`][error::IntegrityError] if any layer fails
    ///   verification or decryption
    /// * [`EncryptionError`][error::EncryptionError] if a layer needs a key
    ///   that was not given, or uses an unknown or unregistered algorithm
    pub fn deserialize(
        &self,
        token: &CompactRef,
        signing_key: Option<&Key>,
        encryption_key: Option<&Key>,
    ) -> Result<Decoded, error::JoseError> {
        let mut decoded = self.open(token, signing_key, encryption_key)?;
        let mut depth = 1;

        while decoded.header().is_nested_jwt() {
            if depth >= self.max_depth {
                tracing::debug!(depth, "nested JWT exceeds maximum depth");
                return Err(error::malformed("JOSE objects are nested too deeply").into());
            }

            let inner = decoded.payload_str()?.to_owned();
            tracing::debug!(depth, "descending into nested JWT");

            decoded = self.open(CompactRef::from_str(&inner), signing_key, encryption_key)?;
            depth += 1;
        }

        Ok(decoded)
    }

    fn open(
        &self,
        token: &CompactRef,
        signing_key: Option<&Key>,
        encryption_key: Option<&Key>,
    ) -> Result<Decoded, error::JoseError> {
        match jws::verify_with(self.registry, token, signing_key) {
            Err(error::JoseError::Deserialization(err)) => {
                tracing::debug!(error = %err, "not a JWS, trying JWE");
                match encryption_key {
                    Some(key) => jwe::decrypt_with(self.registry, token, key),
                    None => Err(missing_encryption_key(token)),
                }
            }
            result => result,
        }
    }
}

fn missing_encryption_key(token: &CompactRef) -> error::JoseError {
    let header = match compact::split_exact::<5>(token.as_str(), "JWE must have 5 segments")
        .and_then(|[h, ..]| Header::decode(h))
    {
        Ok(header) => header,
        Err(err) => return err.into(),
    };

    match header.alg().map(jwe::Algorithm::try_from) {
        Some(Ok(alg)) => error::missing_key(alg.name()).into(),
        Some(Err(err)) => err.into(),
        None => header::missing(header::ALG).into(),
    }
}

/// Opens a token with the global registry and default nesting bound
///
/// The global registry accepts unsecured (`none`) JWS layers even when
/// `signing_key` is given. To refuse them, use
/// [`Deserializer::with_registry`] with a registry built by
/// [`Registry::without_signer`].
///
/// # Errors
///
/// See [`Deserializer::deserialize`].
pub fn deserialize(
    token: &CompactRef,
    signing_key: Option<&Key>,
    encryption_key: Option<&Key>,
) -> Result<Decoded, error::JoseError> {
    Deserializer::new().deserialize(token, signing_key, encryption_key)
}
