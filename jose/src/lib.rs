//! This crate implements the Javascript/JSON Object Signing and Encryption (JOSE)
//! standards in compact serialization, including:
//!
//! * JSON Web Signature (JWS): [RFC7515][]
//! * JSON Web Encryption (JWE): [RFC7516][]
//! * JSON Web Algorithms (JWA): [RFC7518][]
//! * JSON Web Token (JWT): [RFC7519][], including nested tokens
//!
//! JSON serialization and JSON Web Keys are not supported.
//!
//! [RFC7515]: https://tools.ietf.org/html/rfc7515
//! [RFC7516]: https://tools.ietf.org/html/rfc7516
//! [RFC7518]: https://tools.ietf.org/html/rfc7518
//! [RFC7519]: https://tools.ietf.org/html/rfc7519
//!
//! # Example
//!
//! ```
//! use jose::{jwe, jws, jwt, jwa, Key};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let signing_key = Key::secret(*b"a0a2abd8-6162-41c3-83d6-1cf559b46afc");
//! let recipient = Key::from(jwa::EllipticCurve::generate(jwa::ec::Curve::P256)?);
//!
//! let producer = jwt::Jwt::signed_and_encrypted(
//!     jws::Algorithm::HS256,
//!     Some(signing_key.clone()),
//!     jwe::Algorithm::ECDH_ES_A128KW,
//!     jwe::Encryption::A128GCM,
//!     recipient.clone().public_only(),
//! )?;
//!
//! let token = producer.signed_then_encrypted_token(r#"{"sub":"alice"}"#)?;
//! assert_eq!(token.shape(), Some(jose::compact::Shape::Jwe));
//!
//! let decoded = jwt::deserialize(&token, Some(&signing_key), Some(&recipient))?;
//! assert_eq!(decoded.payload_str()?, r#"{"sub":"alice"}"#);
//! assert_eq!(decoded.header().alg(), Some("HS256"));
//! # Ok(())
//! # }
//! ```
//!
//! Every algorithm is looked up in a [`Registry`]. The functions above use
//! [`Registry::global`]; each engine also has a `*_with` variant that takes a
//! registry, so implementations can be replaced or removed.

#![cfg_attr(docsrs, feature(doc_cfg))]
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

pub mod compact;
pub mod error;
mod header;
pub mod jwa;
pub mod jwe;
pub mod jws;
pub mod jwt;
mod key;
mod registry;
pub mod zip;


#[doc(inline)]
pub use compact::{Compact, CompactRef, Decoded};
#[doc(inline)]
pub use header::Header;
#[doc(inline)]
pub use key::{Key, Secret};
#[doc(inline)]
pub use registry::Registry;
