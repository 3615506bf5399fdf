//! Payload compression for JWE (`zip`)
//!
//! Compression is applied to the plaintext before content encryption and
//! removed after content decryption. Compressing attacker-influenced data next
//! to secrets before encrypting it leaks information through the ciphertext
//! length (CRIME-style), so compression is only ever applied when requested.

use std::{convert::TryFrom, fmt, str::FromStr};

use crate::error;

/// A compression capability
pub trait Compression: fmt::Debug + Send + Sync {
    /// Compresses a plaintext
    ///
    /// # Errors
    ///
    /// The compressor failed.
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, error::Unexpected>;

    /// Decompresses a decrypted plaintext
    ///
    /// # Errors
    ///
    /// The stream is corrupt or inflates beyond the provider's limits. Partial
    /// output is never returned.
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, error::IntegrityError>;
}

/// Compression algorithm identifiers
///
/// This list may be expanded in the future.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
#[non_exhaustive]
pub enum Algorithm {
    /// Raw DEFLATE (RFC 1951), without a zlib wrapper
    Deflate,
}

impl Algorithm {
    /// The identifier as it appears in the `zip` header parameter
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Deflate => "DEF",
        }
    }
}

impl TryFrom<&'_ str> for Algorithm {
    type Error = error::UnknownAlgorithm;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "DEF" => Ok(Self::Deflate),
            _ => Err(error::unknown_algorithm(s)),
        }
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

#[cfg(feature = "deflate")]
pub use deflate::Deflate;

#[cfg(feature = "deflate")]
mod deflate {
    use std::{convert::TryFrom, io::Write};

    use flate2::{write::DeflateEncoder, Decompress, FlushDecompress, Status};

    use super::Compression;
    use crate::error;

    /// Raw DEFLATE
    #[derive(Clone, Copy, Debug)]
    #[cfg_attr(docsrs, doc(cfg(feature = "deflate")))]
    pub struct Deflate {
        level: flate2::Compression,
        limit: usize,
    }

    impl Deflate {
        /// Largest inflated payload accepted by default
        pub const DEFAULT_LIMIT: usize = 16 * 1024 * 1024;

        /// The default compression level and inflation limit
        #[must_use]
        pub fn new() -> Self {
            Self {
                level: flate2::Compression::default(),
                limit: Self::DEFAULT_LIMIT,
            }
        }

        /// Sets the largest inflated payload accepted
        #[must_use]
        pub fn with_limit(self, limit: usize) -> Self {
            Self { limit, ..self }
        }

        /// Sets the compression level, from 0 (none) to 9 (best)
        #[must_use]
        pub fn with_level(self, level: u32) -> Self {
            Self {
                level: flate2::Compression::new(level.min(9)),
                ..self
            }
        }
    }

    impl Default for Deflate {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Compression for Deflate {
        fn compress(&self, data: &[u8]) -> Result<Vec<u8>, error::Unexpected> {
            let mut encoder = DeflateEncoder::new(Vec::new(), self.level);
            encoder.write_all(data).map_err(error::unexpected)?;
            encoder.finish().map_err(error::unexpected)
        }

        fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, error::IntegrityError> {
            // one byte past the limit is enough to notice a breach
            let ceiling = self.limit.saturating_add(1);

            let mut inflater = Decompress::new(false);
            let initial = data.len().saturating_mul(4).max(64).min(ceiling);
            let mut inflated = Vec::with_capacity(initial);

            loop {
                if inflated.len() == inflated.capacity() {
                    let room = inflated.len().max(64).min(ceiling - inflated.len());
                    inflated.reserve_exact(room);
                }

                let consumed = total(inflater.total_in())?;
                let produced = inflated.len();

                let status = inflater
                    .decompress_vec(&data[consumed..], &mut inflated, FlushDecompress::None)
                    .map_err(|_| error::integrity_violation())?;

                if inflated.len() > self.limit {
                    tracing::debug!(limit = self.limit, "inflated payload exceeds limit");
                    return Err(error::integrity_violation());
                }

                match status {
                    Status::StreamEnd => break,
                    Status::Ok | Status::BufError => {
                        let stalled = total(inflater.total_in())? == consumed
                            && inflated.len() == produced;
                        if stalled && inflated.len() < inflated.capacity() {
                            // input ran out before the final block
                            return Err(error::integrity_violation());
                        }
                    }
                }
            }

            if total(inflater.total_in())? != data.len() {
                return Err(error::integrity_violation());
            }

            Ok(inflated)
        }
    }

    fn total(count: u64) -> Result<usize, error::IntegrityError> {
        usize::try_from(count).map_err(|_| error::integrity_violation())
    }
}
