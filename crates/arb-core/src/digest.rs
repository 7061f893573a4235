//! # Content Digest — Opaque Content References
//!
//! Defines [`ContentDigest`] and [`DigestAlgorithm`]. Claims, evidence and
//! ruling justifications are anchored by digest only; the arbitration engine
//! never sees or stores the underlying documents.
//!
//! Callers that hold the content compute the digest with [`sha256_bytes`] or
//! [`sha256_digest`]; callers that already have a hash reconstruct it with
//! [`ContentDigest::from_hex`].

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::ValidationError;

/// The hash algorithm used to produce a content digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    /// SHA-256.
    Sha256,
}

impl DigestAlgorithm {
    /// Returns the algorithm identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
        }
    }
}

impl std::fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A content-addressed digest with its algorithm tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest {
    /// The hash algorithm that produced this digest.
    pub algorithm: DigestAlgorithm,
    /// The raw 32-byte digest value.
    pub bytes: [u8; 32],
}

impl ContentDigest {
    /// Create a new content digest from raw bytes and algorithm.
    pub fn new(algorithm: DigestAlgorithm, bytes: [u8; 32]) -> Self {
        Self { algorithm, bytes }
    }

    /// Reconstruct a SHA-256 digest from its lowercase or uppercase hex form.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidDigestHex`] unless the input is
    /// exactly 64 hex characters.
    pub fn from_hex(hex: &str) -> Result<Self, ValidationError> {
        if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ValidationError::InvalidDigestHex(hex.to_string()));
        }
        let mut bytes = [0u8; 32];
        for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
            let pair = std::str::from_utf8(chunk)
                .map_err(|_| ValidationError::InvalidDigestHex(hex.to_string()))?;
            bytes[i] = u8::from_str_radix(pair, 16)
                .map_err(|_| ValidationError::InvalidDigestHex(hex.to_string()))?;
        }
        Ok(Self::new(DigestAlgorithm::Sha256, bytes))
    }

    /// Render the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.to_hex())
    }
}

/// Compute a SHA-256 content digest over raw bytes.
pub fn sha256_bytes(data: &[u8]) -> ContentDigest {
    let hash = Sha256::digest(data);
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    ContentDigest::new(DigestAlgorithm::Sha256, bytes)
}

/// Compute a SHA-256 content digest over the compact JSON encoding of `value`.
///
/// Object keys are emitted in the order `serde_json` produces them, so
/// callers that need a stable digest across processes should hash values
/// whose maps are ordered (structs or `BTreeMap`).
///
/// # Errors
///
/// Returns the underlying `serde_json` error if `value` cannot be serialized.
pub fn sha256_digest<T: Serialize + ?Sized>(value: &T) -> Result<ContentDigest, serde_json::Error> {
    let encoded = serde_json::to_vec(value)?;
    Ok(sha256_bytes(&encoded))
}
