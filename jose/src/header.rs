//! The JOSE protected header
//!
//! A [`Header`] is an ordered mapping from parameter names to JSON values.
//! Parameters serialize in insertion order, so the header produced for a
//! given sequence of `set` calls is byte-stable. The canonical order used by
//! the engines in this crate is `alg`, `enc`, `zip`, then parameters added by
//! the key management algorithm (`epk`, `p2c`, `p2s`, `iv`, `tag`), then
//! parameters added by the caller (`typ`, `cty`, `kid`, ...).
//!
//! Once a JWS or JWE has been produced, its header is never re-serialized.
//! Verifiers work from the exact header segment they received.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error;

pub(crate) const ALG: &str = "alg";
pub(crate) const ENC: &str = "enc";
pub(crate) const ZIP: &str = "zip";
pub(crate) const TYP: &str = "typ";
pub(crate) const CTY: &str = "cty";
pub(crate) const KID: &str = "kid";
pub(crate) const EPK: &str = "epk";
pub(crate) const APU: &str = "apu";
pub(crate) const APV: &str = "apv";
pub(crate) const P2S: &str = "p2s";
pub(crate) const P2C: &str = "p2c";
pub(crate) const IV: &str = "iv";
pub(crate) const TAG: &str = "tag";

/// An ordered JOSE header
///
/// ```
/// use jose::Header;
///
/// let mut header = Header::with_algorithm("HS256");
/// header.set("typ", "JWT");
///
/// assert_eq!(header.alg(), Some("HS256"));
/// assert_eq!(header.to_json().unwrap(), br#"{"alg":"HS256","typ":"JWT"}"#);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
#[must_use]
pub struct Header(Map<String, Value>);

impl Header {
    /// An empty header
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// A header containing only the `alg` parameter
    pub fn with_algorithm(alg: impl Into<String>) -> Self {
        let mut header = Self::new();
        header.set(ALG, alg.into());
        header
    }

    /// Sets a parameter
    ///
    /// A new parameter is appended; an existing parameter keeps its position and
    /// has its value replaced. Returns the previous value, if any.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(name.into(), value.into())
    }

    /// Sets a parameter, builder style
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Gets a parameter
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Gets a parameter whose value is a string
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Indicates whether the parameter is present
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// The number of parameters
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Indicates whether the header has no parameters
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the parameters in serialization order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Combines two headers
    ///
    /// The result holds this header's parameters followed by those of `other`
    /// that are not already present. A parameter present in both with equal
    /// values is kept once.
    ///
    /// # Errors
    ///
    /// A parameter is present in both headers with different values.
    pub fn merge(&self, other: &Header) -> Result<Header, error::HeaderConflict> {
        let mut merged = self.clone();
        for (name, value) in &other.0 {
            match merged.0.get(name) {
                Some(existing) if existing != value => {
                    return Err(error::header_conflict(name.as_str()))
                }
                Some(_) => {}
                None => {
                    merged.0.insert(name.clone(), value.clone());
                }
            }
        }
        Ok(merged)
    }

    /// Serializes the header as compact JSON in parameter order
    ///
    /// # Errors
    ///
    /// The JSON serializer failed.
    pub fn to_json(&self) -> Result<Vec<u8>, error::Unexpected> {
        serde_json::to_vec(&self.0).map_err(error::unexpected)
    }

    /// Parses a header from JSON
    ///
    /// # Errors
    ///
    /// The input is not a JSON object.
    pub fn from_json(json: &[u8]) -> Result<Self, error::DeserializationError> {
        serde_json::from_slice(json)
            .map(Self)
            .map_err(|e| error::malformed_with("header is not a JSON object", e))
    }

    /// The base64url encoding of the JSON form, as it appears in a token
    pub(crate) fn encode(&self) -> Result<String, error::Unexpected> {
        Ok(jose_base64::encode(self.to_json()?))
    }

    /// Parses the first segment of a compact serialization
    pub(crate) fn decode(segment: &str) -> Result<Self, error::DeserializationError> {
        let json = jose_base64::decode(segment)
            .map_err(|e| error::malformed_with("header is not base64url", e))?;
        Self::from_json(&json)
    }

    /// The `alg` (algorithm) parameter
    #[must_use]
    pub fn alg(&self) -> Option<&str> {
        self.get_str(ALG)
    }

    /// The `enc` (content encryption algorithm) parameter
    #[must_use]
    pub fn enc(&self) -> Option<&str> {
        self.get_str(ENC)
    }

    /// The `zip` (compression algorithm) parameter
    #[must_use]
    pub fn zip(&self) -> Option<&str> {
        self.get_str(ZIP)
    }

    /// The `typ` (type) parameter
    #[must_use]
    pub fn typ(&self) -> Option<&str> {
        self.get_str(TYP)
    }

    /// The `cty` (content type) parameter
    #[must_use]
    pub fn cty(&self) -> Option<&str> {
        self.get_str(CTY)
    }

    /// The `kid` (key ID) parameter
    #[must_use]
    pub fn kid(&self) -> Option<&str> {
        self.get_str(KID)
    }

    /// The `epk` (ephemeral public key) parameter
    #[must_use]
    pub fn epk(&self) -> Option<&Value> {
        self.get(EPK)
    }

    /// The `apu` (agreement PartyUInfo) parameter, still encoded
    #[must_use]
    pub fn apu(&self) -> Option<&str> {
        self.get_str(APU)
    }

    /// The `apv` (agreement PartyVInfo) parameter, still encoded
    #[must_use]
    pub fn apv(&self) -> Option<&str> {
        self.get_str(APV)
    }

    /// The `p2s` (PBES2 salt input) parameter, still encoded
    #[must_use]
    pub fn p2s(&self) -> Option<&str> {
        self.get_str(P2S)
    }

    /// The `p2c` (PBES2 iteration count) parameter
    #[must_use]
    pub fn p2c(&self) -> Option<u64> {
        self.get(P2C).and_then(Value::as_u64)
    }

    /// The `iv` (key wrap initialization vector) parameter, still encoded
    #[must_use]
    pub fn iv(&self) -> Option<&str> {
        self.get_str(IV)
    }

    /// The `tag` (key wrap authentication tag) parameter, still encoded
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        self.get_str(TAG)
    }

    /// Indicates whether the content type marks a nested JWT
    pub(crate) fn is_nested_jwt(&self) -> bool {
        self.cty()
            .map_or(false, |cty| cty.eq_ignore_ascii_case("JWT"))
    }

    /// Decodes a base64url-valued parameter that must be present
    pub(crate) fn require_bytes(
        &self,
        name: &'static str,
    ) -> Result<Vec<u8>, error::DeserializationError> {
        let encoded = self
            .get_str(name)
            .ok_or_else(|| error::malformed(missing_parameter(name)))?;
        jose_base64::decode(encoded).map_err(|e| error::malformed_with(invalid_parameter(name), e))
    }

    /// Decodes a base64url-valued parameter that may be absent
    pub(crate) fn optional_bytes(
        &self,
        name: &'static str,
    ) -> Result<Option<Vec<u8>>, error::DeserializationError> {
        if self.contains(name) {
            self.require_bytes(name).map(Some)
        } else {
            Ok(None)
        }
    }
}

fn missing_parameter(name: &'static str) -> &'static str {
    match name {
        ALG => "header is missing 'alg'",
        ENC => "header is missing 'enc'",
        EPK => "header is missing 'epk'",
        P2S => "header is missing 'p2s'",
        P2C => "header is missing 'p2c'",
        IV => "header is missing 'iv'",
        TAG => "header is missing 'tag'",
        _ => "header is missing a required parameter",
    }
}

fn invalid_parameter(name: &'static str) -> &'static str {
    match name {
        EPK => "header 'epk' is invalid",
        APU => "header 'apu' is not base64url",
        APV => "header 'apv' is not base64url",
        P2S => "header 'p2s' is not base64url",
        P2C => "header 'p2c' is invalid",
        IV => "header 'iv' is not base64url",
        TAG => "header 'tag' is not base64url",
        _ => "header parameter is invalid",
    }
}

pub(crate) fn missing(name: &'static str) -> error::DeserializationError {
    error::malformed(missing_parameter(name))
}

pub(crate) fn invalid(
    name: &'static str,
    source: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
) -> error::DeserializationError {
    error::malformed_with(invalid_parameter(name), source)
}
