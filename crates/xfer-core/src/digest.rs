//! Integrity digests for transferred buffers.
//!
//! The header of every transfer carries a lowercase hex digest of the whole
//! buffer. The receiver recomputes it after reassembly; a mismatch means the
//! transfer is incomplete or corrupt.
//!
//! SHA-1 is the default so that digests line up with existing senders
//! (40 hex chars). BLAKE3 is available for new deployments (64 hex chars).
//! Neither is used for anything adversarial here, only for accidental
//! corruption and truncation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha1::Digest as _;

/// A digest primitive the session can verify against.
///
/// Implementations must be deterministic and return lowercase hex.
pub trait Digest: Send + Sync {
    /// Short algorithm name, used in logs.
    fn name(&self) -> &'static str;

    /// Length in hex characters of every digest this produces.
    fn hex_len(&self) -> usize;

    /// Digest `data`, returning lowercase hex.
    fn hex_digest(&self, data: &[u8]) -> String;
}

/// Built-in digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    #[default]
    Sha1,
    Blake3,
}

impl DigestAlgorithm {
    /// Guess which built-in algorithm produced a hex digest of this length.
    pub fn from_hex_len(len: usize) -> Option<Self> {
        match len {
            40 => Some(DigestAlgorithm::Sha1),
            64 => Some(DigestAlgorithm::Blake3),
            _ => None,
        }
    }

    /// Start an incremental hasher for this algorithm.
    pub fn hasher(self) -> Hasher {
        match self {
            DigestAlgorithm::Sha1 => Hasher::Sha1(sha1::Sha1::new()),
            DigestAlgorithm::Blake3 => Hasher::Blake3(Box::new(blake3::Hasher::new())),
        }
    }
}

impl Digest for DigestAlgorithm {
    fn name(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha1 => "sha1",
            DigestAlgorithm::Blake3 => "blake3",
        }
    }

    fn hex_len(&self) -> usize {
        match self {
            DigestAlgorithm::Sha1 => 40,
            DigestAlgorithm::Blake3 => 64,
        }
    }

    fn hex_digest(&self, data: &[u8]) -> String {
        let mut h = self.hasher();
        h.update(data);
        h.finalize_hex()
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha1" | "sha-1" => Ok(DigestAlgorithm::Sha1),
            "blake3" => Ok(DigestAlgorithm::Blake3),
            _ => Err(UnknownAlgorithm(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown digest algorithm: {0}")]
pub struct UnknownAlgorithm(pub String);

/// Digest `data` with the default algorithm.
pub fn digest(data: &[u8]) -> String {
    DigestAlgorithm::default().hex_digest(data)
}

/// Incremental hasher for buffers that arrive in pieces.
///
/// # Example
/// ```
/// use xfer_core::digest::{digest, DigestAlgorithm};
/// let mut h = DigestAlgorithm::Sha1.hasher();
/// h.update(b"hello ");
/// h.update(b"world");
/// assert_eq!(h.finalize_hex(), digest(b"hello world"));
/// ```
pub enum Hasher {
    Sha1(sha1::Sha1),
    Blake3(Box<blake3::Hasher>),
}

impl Hasher {
    pub fn update(&mut self, data: &[u8]) {
        match self {
            Hasher::Sha1(h) => h.update(data),
            Hasher::Blake3(h) => {
                h.update(data);
            }
        }
    }

    pub fn finalize_hex(self) -> String {
        match self {
            Hasher::Sha1(h) => hex::encode(h.finalize()),
            Hasher::Blake3(h) => h.finalize().to_hex().to_string(),
        }
    }
}
