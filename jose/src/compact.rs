//! Compact serialization
//!
//! A JWS is three base64url segments, `header.payload.signature`. A JWE is
//! five, `header.encrypted_key.iv.ciphertext.tag`. Any other segment count is
//! malformed.

use std::fmt;

use aliri_braid::braid;
use serde::de::DeserializeOwned;

use crate::{error, header::Header};

/// A JOSE object in compact serialization
///
/// This type provides custom implementations of [`Display`][CompactRef#impl-Display] and
/// [`Debug`][CompactRef#impl-Debug] to prevent unintentional disclosures of sensitive values.
/// See the documentation on those trait implementations on the [`CompactRef`] type for more
/// information.
#[braid(
    serde,
    debug = "owned",
    display = "owned",
    ord = "omit",
    ref_doc = "\
    A borrowed reference to a compact JOSE object ([`Compact`])\n\
    \n\
    This type provides custom implementations of [`Display`][Self#impl-Display] and \
    [`Debug`][Self#impl-Debug] to prevent unintentional disclosures of sensitive values. \
    See the documentation on those trait implementations for more information.
    "
)]
#[must_use]
pub struct Compact;

impl CompactRef {
    /// The shape indicated by the segment count
    #[must_use]
    pub fn shape(&self) -> Option<Shape> {
        Shape::of(self.as_str())
    }
}

impl fmt::Debug for CompactRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if f.alternate() {
            f.write_str("\"")?;
            let last_period = &self.0.rfind('.');
            if let Some(last_period) = *last_period {
                f.write_str(&self.0[..=last_period])?;
                limited_reveal(&self.0[last_period + 1..], &mut *f, 0)?;
            } else {
                limited_reveal(&self.0, &mut *f, 0)?;
            }
            f.write_str("\"")
        } else {
            f.write_str(concat!("***", "JOSE", "***"))
        }
    }
}

/// By default, this type holds potentially sensitive information. To prevent
/// unintentional disclosure of this value, this type will not print out its
/// contents without explicitly specifying the alternate format,
/// i.e. `{:#}`. When specified in this form, it will print out the entire token by default.
/// However, if it is preferable to elide some of the characters in the final segment, then
/// that can be modified by specify the quantity as a width in the format string, i.e. `{:#10}`.
///
/// # Example
///
/// ```
/// # use jose::CompactRef;
/// #
/// let token = CompactRef::from_str(concat!(
///     "eyJhbGciOiJIUzI1NiJ9.",
///     "eyJoZWxsbyI6ICJ3b3JsZCJ9.",
///     "bIVgBXtNSWB0p9tb0G0HW5NpP9C3Uoot4wMtFxUbcyI"
/// ));
///
/// assert_eq!(format!("{}", token), "***JOSE***");
/// assert_eq!(format!("{:#12}", token), concat!(
///     "eyJhbGciOiJIUzI1NiJ9.",
///     "eyJoZWxsbyI6ICJ3b3JsZCJ9.",
///     "bIVgBXtNSWB…"
/// ));
/// ```
impl fmt::Display for CompactRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if f.alternate() {
            let last_period = &self.0.rfind('.');
            if let Some(last_period) = *last_period {
                f.write_str(&self.0[..=last_period])?;
                limited_reveal(&self.0[last_period + 1..], &mut *f, usize::MAX)
            } else {
                limited_reveal(&self.0, &mut *f, usize::MAX)
            }
        } else {
            f.write_str(concat!("***", "JOSE", "***"))
        }
    }
}

fn limited_reveal(unprotected: &str, f: &mut fmt::Formatter, default_len: usize) -> fmt::Result {
    let max_len = f.width().unwrap_or(default_len);
    if max_len <= 1 {
        f.write_str("…")
    } else if max_len > unprotected.len() {
        f.write_str(unprotected)
    } else {
        match unprotected.char_indices().nth(max_len - 2) {
            Some((idx, c)) if idx + c.len_utf8() < unprotected.len() => {
                f.write_str(&unprotected[0..idx + c.len_utf8()])?;
                f.write_str("…")
            }
            _ => f.write_str(unprotected),
        }
    }
}

/// The shape of a compact JOSE object
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum Shape {
    /// Three segments
    Jws,
    /// Five segments
    Jwe,
}

impl Shape {
    /// Determines the shape from the number of segments
    ///
    /// Nothing is decoded, so a `Some` result says nothing about whether the
    /// token is well formed.
    ///
    /// ```
    /// use jose::compact::Shape;
    ///
    /// assert_eq!(Shape::of("a.b.c"), Some(Shape::Jws));
    /// assert_eq!(Shape::of("a..c.d.e"), Some(Shape::Jwe));
    /// assert_eq!(Shape::of("a.b"), None);
    /// ```
    #[must_use]
    pub fn of(token: &str) -> Option<Self> {
        match token.split('.').count() {
            3 => Some(Self::Jws),
            5 => Some(Self::Jwe),
            _ => None,
        }
    }
}

/// Splits a token into exactly `N` segments
pub(crate) fn split_exact<'a, const N: usize>(
    token: &'a str,
    reason: &'static str,
) -> Result<[&'a str; N], error::DeserializationError> {
    let mut segments = [""; N];
    let mut parts = token.split('.');

    for segment in segments.iter_mut() {
        *segment = parts.next().ok_or_else(|| error::malformed(reason))?;
    }

    if parts.next().is_some() {
        return Err(error::malformed(reason));
    }

    Ok(segments)
}

/// Decodes one base64url segment
pub(crate) fn decode_segment(
    segment: &str,
    reason: &'static str,
) -> Result<Vec<u8>, error::DeserializationError> {
    jose_base64::decode(segment).map_err(|e| error::malformed_with(reason, e))
}

/// Decodes the protected header without verifying or decrypting anything
///
/// Intended for choosing a key by `kid` or `alg` before calling
/// [`jws::verify`][crate::jws::verify] or [`jwe::decrypt`][crate::jwe::decrypt].
/// Nothing in the returned header can be trusted yet.
///
/// # Errors
///
/// The token is not a JWS or JWE, or its header is not a base64url JSON object.
pub fn peek_header(token: &CompactRef) -> Result<Header, error::DeserializationError> {
    if token.shape().is_none() {
        return Err(error::malformed("token must have 3 or 5 segments"));
    }

    let segment = token.as_str().split('.').next().unwrap_or_default();
    Header::decode(segment)
}

/// A verified or decrypted JOSE object
#[derive(Clone, Debug, PartialEq)]
#[must_use]
pub struct Decoded {
    header: Header,
    payload: Vec<u8>,
}

impl Decoded {
    pub(crate) fn new(header: Header, payload: Vec<u8>) -> Self {
        Self { header, payload }
    }

    /// The protected header of the object
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// The payload bytes
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// The payload as UTF-8 text
    ///
    /// # Errors
    ///
    /// The payload is not valid UTF-8.
    pub fn payload_str(&self) -> Result<&str, error::DeserializationError> {
        std::str::from_utf8(&self.payload)
            .map_err(|e| error::malformed_with("payload is not UTF-8", e))
    }

    /// Consumes the object, returning the payload bytes
    #[must_use]
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Parses the payload as a JSON claim set
    ///
    /// # Errors
    ///
    /// The payload does not deserialize into `T`.
    pub fn claims<T: DeserializeOwned>(&self) -> Result<T, error::DeserializationError> {
        serde_json::from_slice(&self.payload)
            .map_err(|e| error::malformed_with("payload is not the expected JSON", e))
    }
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;

    use super::*;

    #[test]
    fn debug_is_redacted() {
        let token = Compact::new(String::from("eyJhbGciOiJub25lIn0.eyJoZWxsbyI6ICJ3b3JsZCJ9."));

        assert_eq!(format!("{:?}", token), "***JOSE***");
        assert_eq!(
            format!("{:#?}", token),
            "\"eyJhbGciOiJub25lIn0.eyJoZWxsbyI6ICJ3b3JsZCJ9.…\""
        );
        assert_eq!(
            format!("{:#}", token),
            "eyJhbGciOiJub25lIn0.eyJoZWxsbyI6ICJ3b3JsZCJ9."
        );
    }

    #[test]
    fn splits_exact_segment_counts() -> Result<()> {
        let [h, p, s] = split_exact::<3>("a.b.", "bad")?;
        assert_eq!((h, p, s), ("a", "b", ""));

        assert!(split_exact::<3>("a.b", "bad").is_err());
        assert!(split_exact::<3>("a.b.c.d", "bad").is_err());
        assert!(split_exact::<5>("a.b.c.d.e.f", "bad").is_err());

        let segments = split_exact::<5>("a..c.d.e", "bad")?;
        assert_eq!(segments[1], "");

        Ok(())
    }

    #[test]
    fn peeks_at_header() -> Result<()> {
        let token = CompactRef::from_str("eyJhbGciOiJub25lIn0.eyJoZWxsbyI6ICJ3b3JsZCJ9.");
        assert_eq!(peek_header(token)?.alg(), Some("none"));

        let token = CompactRef::from_str("eyJhbGciOiJub25lIn0.eyJoZWxsbyI6ICJ3b3JsZCJ9");
        assert!(peek_header(token).is_err());

        Ok(())
    }

    #[test]
    fn claims_parse_from_payload() -> Result<()> {
        let decoded = Decoded::new(Header::new(), br#"{"hello": "world"}"#.to_vec());

        let claims: serde_json::Value = decoded.claims()?;
        assert_eq!(claims["hello"], "world");
        assert_eq!(decoded.payload_str()?, r#"{"hello": "world"}"#);

        let err = decoded.claims::<Vec<u8>>().unwrap_err();
        assert_eq!(err.reason(), "payload is not the expected JSON");

        Ok(())
    }
}
