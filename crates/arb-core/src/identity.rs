//! # Identity Newtypes
//!
//! Identifiers for the participants of an arbitration and for the linked
//! agreements that hold disputed funds. Each identifier is a distinct type.
//!
//! [`PartyId`] validates its format at construction. [`AgreementId`] is
//! UUID-based; the nil UUID is representable so that the registry can reject
//! an agreement that reports no identity at all.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

// ---------------------------------------------------------------------------
// PartyId
// ---------------------------------------------------------------------------

/// The identity of a disputing party or an arbitrator.
///
/// Any non-empty token without whitespace is accepted (account addresses,
/// DIDs, internal user handles). The arbitration engine only compares
/// identities for equality.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PartyId(String);

impl PartyId {
    /// Create a party identifier, validating format.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidPartyId`] if the value is empty or
    /// contains whitespace.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if s.is_empty() || s.chars().any(char::is_whitespace) {
            return Err(ValidationError::InvalidPartyId(s));
        }
        Ok(Self(s))
    }

    /// Access the identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PartyId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PartyId> for String {
    fn from(id: PartyId) -> Self {
        id.0
    }
}

impl std::fmt::Display for PartyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// AgreementId
// ---------------------------------------------------------------------------

/// A unique identifier for a linked agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgreementId(Uuid);

impl AgreementId {
    /// Create a new random agreement identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an agreement identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// The nil identifier, used by agreements that have not been assigned one.
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Whether this is the nil identifier.
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AgreementId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AgreementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "agreement:{}", self.0)
    }
}
