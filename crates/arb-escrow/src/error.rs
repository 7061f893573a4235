//! # Escrow Error Types

use thiserror::Error;

use arb_arbitration::DisputableError;
use arb_core::AgreementId;

/// Errors arising from escrow agreement operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EscrowError {
    /// The ruling for this dispute was already applied.
    #[error("{dispute} is already resolved")]
    AlreadyResolved {
        /// The agreement-local dispute.
        dispute: String,
    },

    /// The dispute is not linked to the instance delivering the ruling.
    #[error("{dispute} is not linked to {instance}")]
    NotLinked {
        /// The agreement-local dispute.
        dispute: String,
        /// The instance that called back.
        instance: String,
    },

    /// The agreement has no such dispute.
    #[error("unknown {0}")]
    UnknownDispute(String),

    /// The caller does not hold the role the operation requires.
    #[error("{caller} is not authorized to {operation}: requires {required}")]
    Unauthorized {
        /// The rejected caller.
        caller: String,
        /// The attempted operation.
        operation: String,
        /// The role the operation requires.
        required: String,
    },

    /// Another dispute is still open on the agreement.
    #[error("{0} is still open")]
    DisputeOpen(String),

    /// Depositor and beneficiary are invalid.
    #[error("invalid parties: {0}")]
    InvalidParties(String),

    /// An obligation operation is invalid in the obligation's status.
    #[error("obligation {index}: {reason}")]
    InvalidObligation {
        /// Obligation index.
        index: usize,
        /// Why the operation was rejected.
        reason: String,
    },

    /// The ruling cannot be settled.
    #[error("cannot settle ruling: {0}")]
    InvalidRuling(String),

    /// Summing obligation amounts overflowed.
    #[error("amount overflow while {0}")]
    AmountOverflow(String),

    /// No rating window is open for the dispute.
    #[error("rating window for {dispute} is closed: {reason}")]
    RatingClosed {
        /// The agreement-local dispute.
        dispute: String,
        /// Why it is closed.
        reason: String,
    },

    /// The party already rated the arbitrator for this dispute.
    #[error("{party} already rated the arbitrator of {dispute}")]
    AlreadyRated {
        /// The agreement-local dispute.
        dispute: String,
        /// The rating party.
        party: String,
    },

    /// Scores run from 1 to 5.
    #[error("invalid rating score {0}: expected 1..=5")]
    InvalidScore(u8),
}

impl EscrowError {
    /// Translate into the error reported through the [`arb_arbitration::Disputable`]
    /// capability.
    pub fn into_disputable(self, agreement: AgreementId) -> DisputableError {
        match self {
            Self::AlreadyResolved { dispute } => DisputableError::AlreadyResolved {
                agreement: agreement.to_string(),
                dispute,
            },
            Self::UnknownDispute(dispute) => DisputableError::UnknownDispute {
                agreement: agreement.to_string(),
                dispute,
            },
            other => DisputableError::Rejected {
                agreement: agreement.to_string(),
                reason: other.to_string(),
            },
        }
    }
}
