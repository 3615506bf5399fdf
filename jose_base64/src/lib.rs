//! Unpadded base64url byte buffers
//!
//! Every segment of a JOSE compact serialization is the URL-safe base64
//! encoding of some byte string, without padding. The [`Base64Url`][] type
//! holds those bytes in their raw form and only pays the cost of encoding
//! when it is displayed or serialized.
//!
//! Decoding is strict: padding characters, characters outside the URL-safe
//! alphabet, impossible lengths and non-canonical trailing bits are all
//! rejected with [`InvalidBase64Data`].
//!
//! The underlying encoding/decoding mechanism is provided by the [`base64`][]
//! crate.
//!
//!   [`base64`]: https://docs.rs/base64
//!
//! # Example
//!
//! ```
//! use jose_base64::Base64Url;
//!
//! let data = Base64Url::from_raw(r#"{"alg":"HS256"}"#);
//! assert_eq!(data.to_string(), "eyJhbGciOiJIUzI1NiJ9");
//!
//! let decoded = Base64Url::from_encoded("eyJhbGciOiJIUzI1NiJ9").unwrap();
//! assert_eq!(decoded.as_slice(), br#"{"alg":"HS256"}"#);
//! ```
//!
//! Note that the output data is fenced in backticks when formatted for
//! debugging.
//!
//! ```
//! use jose_base64::Base64Url;
//!
//! let data = Base64Url::from_raw(vec![0xfb, 0xff]);
//! assert_eq!(format!("{:?}", data), "`-_8`");
//! ```
//!
//! # Serde
//!
//! With the `serde` feature enabled, the buffer serializes as its encoded
//! string and deserializes by decoding one.

#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]
#![cfg_attr(docsrs, feature(doc_cfg))]

use std::{error::Error, fmt, ops};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

/// An error while decoding a value which is not properly formatted
/// base64url data
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InvalidBase64Data {
    source: base64::DecodeError,
}

impl From<base64::DecodeError> for InvalidBase64Data {
    fn from(err: base64::DecodeError) -> Self {
        Self { source: err }
    }
}

impl fmt::Display for InvalidBase64Data {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("invalid base64url data")
    }
}

impl Error for InvalidBase64Data {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

/// Encodes a byte string as unpadded base64url
#[must_use]
pub fn encode(data: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(data)
}

/// Decodes an unpadded base64url string
///
/// # Errors
///
/// The input contains characters outside of the URL-safe alphabet, padding,
/// or has a length that no byte string encodes to.
pub fn decode(enc: impl AsRef<[u8]>) -> Result<Vec<u8>, InvalidBase64Data> {
    Ok(URL_SAFE_NO_PAD.decode(enc)?)
}

/// Owned data to be encoded as URL-safe base64 (no padding)
///
/// Encoding alphabet: `A`–`Z`, `a`–`z`, `0`–`9`, `-`, `_`
///
/// Data is held in memory in its raw form. Costs of serialization
/// are only incurred when serializing or displaying the value in
/// its base64 representation.
///
/// Implementations of the [`From`] trait assume that the underlying
/// structure is in raw form.
#[derive(Clone, Default, Eq, PartialEq, Hash)]
#[repr(transparent)]
#[must_use]
pub struct Base64Url(Vec<u8>);

impl Base64Url {
    /// Creates an empty buffer
    #[inline]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Creates a new buffer from an owned value
    ///
    /// This function has no cost for [`Vec<u8>`]. Other types incur
    /// the cost of copying into a buffer.
    ///
    /// To decode a base64url-encoded buffer, use [`from_encoded()`][Self::from_encoded()].
    #[inline]
    pub fn from_raw<T: Into<Vec<u8>>>(raw: T) -> Self {
        Self(raw.into())
    }

    /// Constructs a new buffer from a base64url-encoded slice
    ///
    /// # Errors
    ///
    /// The slice is not valid unpadded base64url.
    pub fn from_encoded<T: AsRef<[u8]>>(enc: T) -> Result<Self, InvalidBase64Data> {
        decode(enc).map(Self)
    }

    /// Unwraps the underlying buffer
    #[inline]
    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }

    /// Provides access to the underlying bytes
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Provides mutable access to the underlying bytes
    #[inline]
    #[must_use]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.0
    }

    /// The length of the encoded form of this buffer
    #[inline]
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        Self::calc_encoded_len(self.0.len())
    }

    /// Calculates the expected length of the base64url-encoding for a buffer of size `len`
    #[inline]
    #[must_use]
    pub const fn calc_encoded_len(len: usize) -> usize {
        let d = len / 3 * 4;
        match len % 3 {
            0 => d,
            m => d + m + 1,
        }
    }
}

impl From<Vec<u8>> for Base64Url {
    #[inline]
    fn from(buf: Vec<u8>) -> Self {
        Self(buf)
    }
}

impl From<&'_ [u8]> for Base64Url {
    #[inline]
    fn from(slice: &[u8]) -> Self {
        Self(slice.to_owned())
    }
}

impl From<Base64Url> for Vec<u8> {
    #[inline]
    fn from(val: Base64Url) -> Self {
        val.0
    }
}

impl ops::Deref for Base64Url {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<[u8]> for Base64Url {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Base64Url {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&encode(&self.0))
    }
}

impl fmt::Debug for Base64Url {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "`{}`", self)
    }
}

/// Serialize the underlying byte array as a base64url string
#[cfg(any(feature = "serde", docsrs))]
#[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
impl serde::Serialize for Base64Url {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Deserialize a base64url string and decode it into a byte array
#[cfg(any(feature = "serde", docsrs))]
#[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
impl<'de> serde::Deserialize<'de> for Base64Url {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct Visitor;

        impl<'de> serde::de::Visitor<'de> for Visitor {
            type Value = Base64Url;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an unpadded base64url string")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Base64Url::from_encoded(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_str(Visitor)
    }
}

#[cfg(doctest)]
#[doc(hidden)]
mod doctests {
    /// Verifies that `serde` serialization round-trips
    ///
    /// ```
    /// use serde::{Serialize, Deserialize};
    /// use jose_base64::Base64Url;
    ///
    /// #[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
    /// struct Epk {
    ///     x: Base64Url,
    /// }
    ///
    /// let data = Epk {
    ///     x: Base64Url::from_raw(vec![0xfb, 0xff, 0x01]),
    /// };
    ///
    /// let serialized = serde_json::to_string(&data).unwrap();
    /// assert_eq!(serialized, r#"{"x":"-_8B"}"#);
    ///
    /// let value: serde_json::Value = serde_json::from_str(&serialized).unwrap();
    /// let deserialized: Epk = serde_json::from_value(value).unwrap();
    /// assert_eq!(data, deserialized);
    /// ```
    #[cfg(feature = "serde")]
    fn base64url_round_trips_through_serde() -> ! {
        loop {}
    }
}
