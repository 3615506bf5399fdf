//! Implementations of the JSON Web Signature (JWS) standard
//!
//! The specifications for this standard can be found in [RFC7515][].
//!
//! The signing input is always the ASCII string `header.payload`, with both
//! parts base64url encoded. Verification works on the exact header segment
//! received; the header is never re-serialized.
//!
//! ```
//! use jose::{jws, Key};
//!
//! # fn main() -> Result<(), jose::error::JoseError> {
//! let key = Key::secret(*b"a0a2abd8-6162-41c3-83d6-1cf559b46afc");
//!
//! let token = jws::Jws::new(jws::Algorithm::HS256, r#"{"hello": "world"}"#).sign(Some(&key))?;
//! assert!(token.as_str().starts_with("eyJhbGciOiJIUzI1NiJ9.eyJoZWxsbyI6ICJ3b3JsZCJ9."));
//!
//! let decoded = jws::verify(&token, Some(&key))?;
//! assert_eq!(decoded.payload(), br#"{"hello": "world"}"#);
//! # Ok(())
//! # }
//! ```
//!
//! [RFC7515]: https://tools.ietf.org/html/rfc7515

use std::{convert::TryFrom, fmt, str::FromStr};

use crate::{
    compact::{self, Compact, CompactRef, Decoded},
    error, header,
    header::Header,
    jwa, Key, Registry,
};

/// JSON Web Signature signing algorithms
///
/// This list may be expanded in the future.
#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum Algorithm {
    /// No signature
    None,

    /// HMAC symmetric
    Hmac(jwa::hmac::SigningAlgorithm),

    /// RSA public/private key pair
    Rsa(jwa::rsa::SigningAlgorithm),

    /// Elliptic curve cryptography
    EllipticCurve(jwa::ec::SigningAlgorithm),
}

impl Algorithm {
    /// The unsecured `none` algorithm
    pub const NONE: Algorithm = Self::None;
    /// The HS256 signing algorithm
    pub const HS256: Algorithm = Self::Hmac(jwa::hmac::SigningAlgorithm::HS256);
    /// The HS384 signing algorithm
    pub const HS384: Algorithm = Self::Hmac(jwa::hmac::SigningAlgorithm::HS384);
    /// The HS512 signing algorithm
    pub const HS512: Algorithm = Self::Hmac(jwa::hmac::SigningAlgorithm::HS512);
    /// The RS256 signing algorithm
    pub const RS256: Algorithm = Self::Rsa(jwa::rsa::SigningAlgorithm::RS256);
    /// The RS384 signing algorithm
    pub const RS384: Algorithm = Self::Rsa(jwa::rsa::SigningAlgorithm::RS384);
    /// The RS512 signing algorithm
    pub const RS512: Algorithm = Self::Rsa(jwa::rsa::SigningAlgorithm::RS512);
    /// The PS256 signing algorithm
    pub const PS256: Algorithm = Self::Rsa(jwa::rsa::SigningAlgorithm::PS256);
    /// The PS384 signing algorithm
    pub const PS384: Algorithm = Self::Rsa(jwa::rsa::SigningAlgorithm::PS384);
    /// The PS512 signing algorithm
    pub const PS512: Algorithm = Self::Rsa(jwa::rsa::SigningAlgorithm::PS512);
    /// The ES256 signing algorithm
    pub const ES256: Algorithm = Self::EllipticCurve(jwa::ec::SigningAlgorithm::ES256);
    /// The ES384 signing algorithm
    pub const ES384: Algorithm = Self::EllipticCurve(jwa::ec::SigningAlgorithm::ES384);
    /// The ES512 signing algorithm
    pub const ES512: Algorithm = Self::EllipticCurve(jwa::ec::SigningAlgorithm::ES512);

    pub(crate) const ALL: [Algorithm; 13] = [
        Self::NONE,
        Self::HS256,
        Self::HS384,
        Self::HS512,
        Self::RS256,
        Self::RS384,
        Self::RS512,
        Self::PS256,
        Self::PS384,
        Self::PS512,
        Self::ES256,
        Self::ES384,
        Self::ES512,
    ];

    /// The identifier as it appears in the `alg` header parameter
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Hmac(alg) => alg.name(),
            Self::Rsa(alg) => alg.name(),
            Self::EllipticCurve(alg) => alg.name(),
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

/// A JWS signing capability
///
/// Every signing algorithm in [`jwa`] implements this trait. A [`Registry`]
/// maps each [`Algorithm`] to one implementation, so substitutes can be
/// registered for testing.
pub trait Signer: fmt::Debug + Send + Sync {
    /// Signs the signing input
    ///
    /// # Errors
    ///
    /// The key is missing or unsuitable for the algorithm.
    fn sign(&self, key: Option<&Key>, data: &[u8]) -> Result<Vec<u8>, error::EncryptionError>;

    /// Verifies a signature over the signing input
    ///
    /// # Errors
    ///
    /// * [`IntegrityError`][error::IntegrityError] if the signature does not match
    /// * [`EncryptionError`][error::EncryptionError] if the key is missing or
    ///   unsuitable for the algorithm
    fn verify(
        &self,
        key: Option<&Key>,
        data: &[u8],
        signature: &[u8],
    ) -> Result<(), error::JoseError>;
}

/// The `none` algorithm
///
/// Produces an empty signature and accepts only an empty signature. Any key
/// supplied is ignored, so a `none` token verifies even when the caller passed
/// a key. Verify through a registry built with
/// [`Registry::standard().without_signer(Algorithm::NONE)`][Registry::without_signer]
/// to refuse unsecured tokens.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq)]
pub struct Unsecured;

impl Signer for Unsecured {
    fn sign(&self, _: Option<&Key>, _: &[u8]) -> Result<Vec<u8>, error::EncryptionError> {
        Ok(Vec::new())
    }

    fn verify(&self, _: Option<&Key>, _: &[u8], signature: &[u8]) -> Result<(), error::JoseError> {
        if signature.is_empty() {
            Ok(())
        } else {
            Err(error::integrity_violation().into())
        }
    }
}

/// A payload to be signed
///
/// The protected header starts with `alg`, followed by any parameters added
/// through [`header_mut`](Self::header_mut) in the order they were set.
#[derive(Clone, Debug)]
#[must_use]
pub struct Jws {
    alg: Algorithm,
    header: Header,
    payload: Vec<u8>,
}

impl Jws {
    /// A payload to be signed with `alg`
    pub fn new(alg: impl Into<Algorithm>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            alg: alg.into(),
            header: Header::new(),
            payload: payload.into(),
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

    /// The signing algorithm
    #[must_use]
    pub fn algorithm(&self) -> Algorithm {
        self.alg
    }

    /// Signs using the global registry
    ///
    /// # Errors
    ///
    /// See [`sign_with`](Self::sign_with).
    pub fn sign(&self, key: Option<&Key>) -> Result<Compact, error::EncryptionError> {
        self.sign_with(Registry::global(), key)
    }

    /// Signs using the algorithms of `registry`
    ///
    /// # Errors
    ///
    /// * The algorithm is not registered
    /// * An added header parameter conflicts with `alg`
    /// * The key is missing or unsuitable for the algorithm
    pub fn sign_with(
        &self,
        registry: &Registry,
        key: Option<&Key>,
    ) -> Result<Compact, error::EncryptionError> {
        tracing::trace!(alg = %self.alg, "signing JWS");

        let signer = registry.signer(self.alg)?;
        let header = Header::with_algorithm(self.alg.name()).merge(&self.header)?;

        let mut token = header.encode()?;
        token.push('.');
        token.push_str(&jose_base64::encode(&self.payload));

        let signature = signer.sign(key, token.as_bytes())?;

        token.push('.');
        token.push_str(&jose_base64::encode(&signature));

        Ok(Compact::new(token))
    }
}

/// Verifies a JWS using the global registry
///
/// # Errors
///
/// See [`verify_with`].
pub fn verify(token: &CompactRef, key: Option<&Key>) -> Result<Decoded, error::JoseError> {
    verify_with(Registry::global(), token, key)
}

/// Verifies a JWS using the algorithms of `registry`
///
/// The algorithm is taken from the received header. Use
/// [`peek_header`][compact::peek_header] beforehand to choose a key. A
/// registry that still holds [`Unsecured`] accepts `none` tokens regardless of
/// `key`; see [`Registry::without_signer`].
///
/// # Errors
///
/// * [`DeserializationError`][error::DeserializationError] if the token is not
///   three base64url segments, or the header is not a JSON object with `alg`
/// * [`EncryptionError`][error::EncryptionError] if the algorithm is unknown or
///   not registered, or the key is unsuitable
/// * [`IntegrityError`][error::IntegrityError] if the signature does not match
pub fn verify_with(
    registry: &Registry,
    token: &CompactRef,
    key: Option<&Key>,
) -> Result<Decoded, error::JoseError> {
    let [h, p, s] = compact::split_exact::<3>(token.as_str(), "JWS must have 3 segments")?;

    let header = Header::decode(h)?;
    let alg = Algorithm::try_from(header.alg().ok_or_else(|| header::missing(header::ALG))?)?;
    let payload = compact::decode_segment(p, "JWS payload is not base64url")?;
    let signature = compact::decode_segment(s, "JWS signature is not base64url")?;

    tracing::trace!(%alg, "verifying JWS");

    let signing_input = &token.as_str()[..h.len() + 1 + p.len()];
    registry
        .signer(alg)?
        .verify(key, signing_input.as_bytes(), &signature)
        .map_err(|err| {
            tracing::debug!(%alg, error = %err, "JWS rejected");
            err
        })?;

    Ok(Decoded::new(header, payload))
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;

    use super::*;
    use crate::test;

    const PAYLOAD: &str = r#"{"hello": "world"}"#;

    #[test]
    fn parses_every_identifier() -> Result<()> {
        for alg in &Algorithm::ALL {
            assert_eq!(alg.name().parse::<Algorithm>()?, *alg);
        }

        assert!("HS1024".parse::<Algorithm>().is_err());
        assert!("NONE".parse::<Algorithm>().is_err());

        Ok(())
    }

    #[test]
    fn hs256_matches_known_token() -> Result<()> {
        let key = test::hmac_key();
        let token = Jws::new(Algorithm::HS256, PAYLOAD).sign(Some(&key))?;

        assert_eq!(token.as_str(), test::HS256_TOKEN);
        assert_eq!(token.as_str().rsplit('.').next().map(str::len), Some(43));

        Ok(())
    }

    #[test]
    fn none_produces_empty_signature() -> Result<()> {
        let token = Jws::new(Algorithm::NONE, PAYLOAD).sign(None)?;
        assert_eq!(
            token.as_str(),
            "eyJhbGciOiJub25lIn0.eyJoZWxsbyI6ICJ3b3JsZCJ9."
        );

        let decoded = verify(&token, None)?;
        assert_eq!(decoded.payload(), PAYLOAD.as_bytes());

        let key = test::hmac_key();
        let decoded = verify(&token, Some(&key))?;
        assert_eq!(decoded.header().alg(), Some("none"));

        Ok(())
    }

    #[test]
    fn none_rejects_any_signature() {
        let token = CompactRef::from_str("eyJhbGciOiJub25lIn0.eyJoZWxsbyI6ICJ3b3JsZCJ9.AA");
        assert!(verify(token, None).unwrap_err().is_integrity());
    }

    #[test]
    fn verifies_golden_tokens() -> Result<()> {
        let key = test::hmac_key();
        for token in &[test::HS256_CTY_TOKEN, test::HS384_TOKEN, test::HS512_TOKEN] {
            let decoded = verify(CompactRef::from_str(token), Some(&key))?;
            assert_eq!(decoded.payload(), PAYLOAD.as_bytes());
        }

        let checks = [
            (test::ES256_TOKEN, test::p256_public()),
            (test::ES384_TOKEN, test::p384_public()),
            (test::ES512_TOKEN, test::p521_public()),
        ];
        for (token, key) in &checks {
            let decoded = verify(CompactRef::from_str(token), Some(key))?;
            assert_eq!(decoded.payload(), PAYLOAD.as_bytes());
            assert_eq!(decoded.header().cty(), Some("text/plain"));
        }

        Ok(())
    }

    #[test]
    fn round_trips_every_algorithm() -> Result<()> {
        let keys = [
            (Algorithm::HS256, test::hmac_key()),
            (Algorithm::HS384, test::hmac_key()),
            (Algorithm::HS512, test::hmac_key()),
            (Algorithm::RS256, test::rsa_key()),
            (Algorithm::RS384, test::rsa_key()),
            (Algorithm::RS512, test::rsa_key()),
            (Algorithm::PS256, test::rsa_key()),
            (Algorithm::PS384, test::rsa_key()),
            (Algorithm::PS512, test::rsa_key()),
            (Algorithm::ES256, Key::from(test::p256_key())),
            (Algorithm::ES384, Key::from(test::p384_key())),
            (Algorithm::ES512, Key::from(test::p521_key())),
        ];

        for (alg, key) in &keys {
            for payload in &["", PAYLOAD, "ünïcödé ✓"] {
                let token = Jws::new(*alg, *payload).sign(Some(key))?;
                assert_eq!(token.shape(), Some(compact::Shape::Jws));

                let public = key.clone().public_only();
                let decoded = verify(&token, Some(&public))?;
                assert_eq!(decoded.payload_str()?, *payload, "{}", alg);

                for altered in test::altered(&token)? {
                    let err = verify(&altered, Some(&public)).unwrap_err();
                    assert!(err.is_integrity(), "{}: {}", alg, altered);
                }
            }
        }

        Ok(())
    }

    #[test]
    #[tracing_test::traced_test]
    fn tampering_is_an_integrity_failure() -> Result<()> {
        let key = test::hmac_key();
        let token = Jws::new(Algorithm::HS256, PAYLOAD)
            .with_parameter("typ", "JWT")
            .sign(Some(&key))?;
        let [h, p, s] = compact::split_exact::<3>(token.as_str(), "")?;

        let other_header = Header::with_algorithm("HS256").with("typ", "JWS").encode()?;
        let other_payload = jose_base64::encode(br#"{"hello": "World"}"#);
        let mut sig = jose_base64::decode(s)?;
        sig[7] ^= 0x01;
        let other_sig = jose_base64::encode(&sig);

        for forged in &[
            format!("{}.{}.{}", other_header, p, s),
            format!("{}.{}.{}", h, other_payload, s),
            format!("{}.{}.{}", h, p, other_sig),
        ] {
            let err = verify(CompactRef::from_str(forged), Some(&key)).unwrap_err();
            assert!(err.is_integrity());
        }

        assert!(logs_contain("JWS rejected"));

        Ok(())
    }

    #[test]
    fn header_parameters_follow_alg() -> Result<()> {
        let key = test::hmac_key();
        let token = Jws::new(Algorithm::HS256, PAYLOAD)
            .with_parameter("typ", "JWT")
            .with_parameter("kid", "key-1")
            .sign(Some(&key))?;

        let header = compact::peek_header(&token)?;
        assert_eq!(header.to_json()?, br#"{"alg":"HS256","typ":"JWT","kid":"key-1"}"#);

        let err = Jws::new(Algorithm::HS256, PAYLOAD)
            .with_parameter("alg", "none")
            .sign(Some(&key))
            .unwrap_err();
        assert!(matches!(err, error::EncryptionError::HeaderConflict(_)));

        Ok(())
    }

    #[test]
    fn malformed_tokens_are_deserialization_errors() {
        let key = test::hmac_key();
        for token in &[
            "eyJhbGciOiJIUzI1NiJ9.eyJoZWxsbyI6ICJ3b3JsZCJ9",
            "eyJhbGciOiJIUzI1NiJ9.eyJoZWxsbyI6ICJ3b3JsZCJ9.a.b",
            "!!!.eyJoZWxsbyI6ICJ3b3JsZCJ9.",
            "WzFd.eyJoZWxsbyI6ICJ3b3JsZCJ9.",
            "e30.eyJoZWxsbyI6ICJ3b3JsZCJ9.",
            "eyJhbGciOiJIUzI1NiJ9.!!!.",
        ] {
            let err = verify(CompactRef::from_str(token), Some(&key)).unwrap_err();
            assert!(err.is_deserialization(), "{}", token);
        }
    }

    #[test]
    fn unknown_and_unregistered_algorithms_are_encryption_errors() -> Result<()> {
        let key = test::hmac_key();

        let token = CompactRef::from_str("eyJhbGciOiJIUzEwMjQifQ.eyJoZWxsbyI6ICJ3b3JsZCJ9.");
        assert!(verify(token, Some(&key)).unwrap_err().is_encryption());

        let registry = Registry::empty();
        let err = Jws::new(Algorithm::HS256, PAYLOAD)
            .sign_with(&registry, Some(&key))
            .unwrap_err();
        assert!(matches!(err, error::EncryptionError::UnsupportedAlgorithm(_)));

        Ok(())
    }

    #[test]
    fn wrong_key_family_is_rejected_up_front() {
        let err = Jws::new(Algorithm::RS256, PAYLOAD)
            .sign(Some(&test::hmac_key()))
            .unwrap_err();
        assert!(matches!(err, error::EncryptionError::IncompatibleKey(_)));

        let err = Jws::new(Algorithm::HS256, PAYLOAD).sign(None).unwrap_err();
        assert!(matches!(err, error::EncryptionError::MissingKey(_)));
    }
}
