//! Common errors
//!
//! Failures fall into three kinds:
//!
//! * [`DeserializationError`]: the input is not a well-formed JOSE object of the
//!   expected shape. The JWT deserializer treats this as "wrong shape" and tries the
//!   other one.
//! * [`IntegrityError`]: a signature, authentication tag, padding, key unwrap or
//!   decompression check failed. It carries no detail about which one.
//! * [`EncryptionError`]: the operation cannot be attempted with the requested
//!   algorithm or key. Raised before any cryptographic primitive runs.
//!
//! [`JoseError`] aggregates the three.

#![allow(missing_copy_implementations)]

use std::error::Error as StdError;

use thiserror::Error;

/// The input is not a well-formed JOSE object
#[derive(Debug, Error)]
#[error("malformed JOSE object: {reason}")]
pub struct DeserializationError {
    reason: &'static str,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl DeserializationError {
    /// A short description of what was malformed
    #[must_use]
    pub fn reason(&self) -> &'static str {
        self.reason
    }
}

pub(crate) const fn malformed(reason: &'static str) -> DeserializationError {
    DeserializationError {
        reason,
        source: None,
    }
}

pub(crate) fn malformed_with(
    reason: &'static str,
    source: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
) -> DeserializationError {
    DeserializationError {
        reason,
        source: Some(source.into()),
    }
}

/// Verification or decryption rejected the object
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Error)]
#[error("integrity check failed")]
pub struct IntegrityError {
    _p: (),
}

pub(crate) const fn integrity_violation() -> IntegrityError {
    IntegrityError { _p: () }
}

/// The provided name could not be matched with known algorithms
#[derive(Debug, Error)]
#[error("'{alg}' does not match known algorithms")]
pub struct UnknownAlgorithm {
    alg: String,
}

#[inline]
pub(crate) fn unknown_algorithm(alg: impl Into<String>) -> UnknownAlgorithm {
    UnknownAlgorithm { alg: alg.into() }
}

/// The algorithm is known but no implementation is registered for it
#[derive(Debug, Error)]
#[error("no implementation registered for '{alg}'")]
pub struct UnsupportedAlgorithm {
    alg: &'static str,
}

#[inline]
pub(crate) fn unsupported_algorithm(alg: &'static str) -> UnsupportedAlgorithm {
    UnsupportedAlgorithm { alg }
}

/// The operation needs an algorithm that was never configured
#[derive(Debug, Error)]
#[error("no {usage} algorithm was configured")]
pub struct MissingAlgorithm {
    usage: &'static str,
}

pub(crate) const fn missing_algorithm(usage: &'static str) -> MissingAlgorithm {
    MissingAlgorithm { usage }
}

/// The key cannot be used with the requested algorithm
#[derive(Debug, Error)]
#[error("{key} key incompatible with algorithm '{alg}'")]
pub struct IncompatibleKey {
    key: &'static str,
    alg: &'static str,
}

#[inline]
pub(crate) fn incompatible_key(key: &'static str, alg: &'static str) -> IncompatibleKey {
    IncompatibleKey { key, alg }
}

/// The key material has the wrong length for the requested algorithm
#[derive(Debug, Error)]
#[error("algorithm '{alg}' requires a {expected}-byte key, got {actual} bytes")]
pub struct InvalidKeyLength {
    alg: &'static str,
    expected: usize,
    actual: usize,
}

#[inline]
pub(crate) fn invalid_key_length(
    alg: &'static str,
    expected: usize,
    actual: usize,
) -> InvalidKeyLength {
    InvalidKeyLength {
        alg,
        expected,
        actual,
    }
}

/// A key is required for this operation but none was provided
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Error)]
#[error("a key is required for algorithm '{alg}'")]
pub struct MissingKey {
    alg: &'static str,
}

pub(crate) const fn missing_key(alg: &'static str) -> MissingKey {
    MissingKey { alg }
}

/// Missing private key
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Error)]
#[error("operation requires a private key")]
pub struct MissingPrivateKey {
    _p: (),
}

pub(crate) const fn missing_private_key() -> MissingPrivateKey {
    MissingPrivateKey { _p: () }
}

/// The key was rejected
#[derive(Debug, Error)]
#[error("key rejected")]
pub struct KeyRejected {
    #[from]
    source: Box<dyn StdError + Send + Sync + 'static>,
}

pub(crate) fn key_rejected(
    source: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
) -> KeyRejected {
    KeyRejected {
        source: source.into(),
    }
}

/// Two headers disagree on the value of a parameter
#[derive(Debug, Error)]
#[error("conflicting values for header parameter '{name}'")]
pub struct HeaderConflict {
    name: String,
}

impl HeaderConflict {
    /// The name of the conflicting parameter
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

pub(crate) fn header_conflict(name: impl Into<String>) -> HeaderConflict {
    HeaderConflict { name: name.into() }
}

/// An unexpected error
#[derive(Debug, Error)]
#[error("unexpected error")]
pub struct Unexpected {
    #[from]
    source: Box<dyn StdError + Send + Sync + 'static>,
}

pub(crate) fn unexpected(
    source: impl Into<Box<dyn StdError + Send + Sync + 'static>>,
) -> Unexpected {
    Unexpected {
        source: source.into(),
    }
}

/// The operation could not be attempted with the given algorithm, key or input
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EncryptionError {
    /// The algorithm identifier is not known
    #[error(transparent)]
    UnknownAlgorithm(#[from] UnknownAlgorithm),

    /// The algorithm is known but not registered
    #[error(transparent)]
    UnsupportedAlgorithm(#[from] UnsupportedAlgorithm),

    /// The operation needs an algorithm that was not configured
    #[error(transparent)]
    MissingAlgorithm(#[from] MissingAlgorithm),

    /// The key is of the wrong family for the algorithm
    #[error(transparent)]
    IncompatibleKey(#[from] IncompatibleKey),

    /// The key is of the wrong length for the algorithm
    #[error(transparent)]
    InvalidKeyLength(#[from] InvalidKeyLength),

    /// No key was provided
    #[error(transparent)]
    MissingKey(#[from] MissingKey),

    /// A public key was provided where a private key is needed
    #[error(transparent)]
    MissingPrivateKey(#[from] MissingPrivateKey),

    /// The key material was rejected
    #[error(transparent)]
    KeyRejected(#[from] KeyRejected),

    /// Headers could not be combined
    #[error(transparent)]
    HeaderConflict(#[from] HeaderConflict),

    /// An underlying primitive failed unexpectedly
    #[error(transparent)]
    Unexpected(#[from] Unexpected),
}

/// Any error produced while producing or consuming a JOSE object
#[derive(Debug, Error)]
pub enum JoseError {
    /// The input is malformed
    #[error(transparent)]
    Deserialization(#[from] DeserializationError),

    /// The input failed verification or decryption
    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    /// The operation could not be attempted
    #[error(transparent)]
    Encryption(#[from] EncryptionError),
}

impl JoseError {
    /// Indicates whether the input was malformed
    #[must_use]
    pub fn is_deserialization(&self) -> bool {
        matches!(self, Self::Deserialization(_))
    }

    /// Indicates whether the input failed verification or decryption
    #[must_use]
    pub fn is_integrity(&self) -> bool {
        matches!(self, Self::Integrity(_))
    }

    /// Indicates whether the operation could not be attempted
    #[must_use]
    pub fn is_encryption(&self) -> bool {
        matches!(self, Self::Encryption(_))
    }
}

macro_rules! encryption_error_kinds {
    ($($kind:ident),* $(,)?) => {
        $(
            impl From<$kind> for JoseError {
                fn from(err: $kind) -> Self {
                    Self::Encryption(EncryptionError::from(err))
                }
            }
        )*
    };
}

encryption_error_kinds!(
    UnknownAlgorithm,
    UnsupportedAlgorithm,
    MissingAlgorithm,
    IncompatibleKey,
    InvalidKeyLength,
    MissingKey,
    MissingPrivateKey,
    KeyRejected,
    HeaderConflict,
    Unexpected,
);
