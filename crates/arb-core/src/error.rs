//! # Validation Errors
//!
//! Errors raised while constructing domain primitives, built with `thiserror`.
//! Each variant carries the rejected input so that operators can diagnose
//! misconfiguration without guesswork.

use thiserror::Error;

/// Validation errors for domain primitive newtypes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Party identifier is empty or contains whitespace.
    #[error("invalid party identifier: \"{0}\" (expected a non-empty token without whitespace)")]
    InvalidPartyId(String),

    /// Hex digest string has the wrong length or non-hex characters.
    #[error("invalid digest hex: \"{0}\" (expected 64 hex characters)")]
    InvalidDigestHex(String),

    /// Timestamp string is not valid UTC ISO 8601.
    #[error("invalid timestamp: \"{value}\" ({reason})")]
    InvalidTimestamp {
        /// The string that failed to parse.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A duration could not be added to a timestamp without overflow.
    #[error("timestamp overflow adding {secs}s to {base}")]
    TimestampOverflow {
        /// The base timestamp.
        base: String,
        /// The duration in seconds that overflowed.
        secs: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_party_id_display() {
        let err = ValidationError::InvalidPartyId("bad id".to_string());
        let msg = format!("{err}");
        assert!(msg.contains("bad id"));
        assert!(msg.contains("whitespace"));
    }

    #[test]
    fn invalid_digest_hex_display() {
        let err = ValidationError::InvalidDigestHex("zz".to_string());
        assert!(format!("{err}").contains("64 hex"));
    }

    #[test]
    fn invalid_timestamp_display() {
        let err = ValidationError::InvalidTimestamp {
            value: "not-a-date".to_string(),
            reason: "parse failed".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("not-a-date"));
        assert!(msg.contains("parse failed"));
    }

    #[test]
    fn timestamp_overflow_display() {
        let err = ValidationError::TimestampOverflow {
            base: "2026-01-15T12:00:00Z".to_string(),
            secs: u64::MAX,
        };
        assert!(format!("{err}").contains("2026-01-15T12:00:00Z"));
    }
}
