//! # Disputable Capability
//!
//! The contract every linked agreement exposes so the registry can check
//! eligibility, look up the disputing parties, register the link, and call
//! back with the final ruling.
//!
//! ## Linking
//!
//! The registry holds each agreement as an [`AgreementHandle`]
//! (`Rc<RefCell<dyn Disputable>>`); the agreement holds the registry side by
//! value, as the [`InstanceId`] passed to [`Disputable::link_arbitration`].
//! Calls are synchronous and single-threaded. A callback that finds the
//! agreement already borrowed fails with [`DisputableError::Busy`].

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use arb_core::{AgreementId, PartyId, Timestamp};

use crate::instance::InstanceId;
use crate::ruling::Ruling;

/// A dispute identifier local to one linked agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgreementDisputeId(pub u64);

impl std::fmt::Display for AgreementDisputeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "dispute#{}", self.0)
    }
}

/// The final instruction delivered to a linked agreement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulingOrder {
    /// The arbitration instance that produced the ruling.
    pub instance: InstanceId,
    /// The agreement-local dispute the ruling settles.
    pub dispute: AgreementDisputeId,
    /// The final ruling.
    pub ruling: Ruling,
    /// Split ratio in basis points (meaningful for [`Ruling::Split`]).
    pub split_ratio_bps: u16,
    /// The presiding arbitrator, when the registry can resolve one.
    pub arbitrator: Option<PartyId>,
    /// When execution was triggered.
    pub executed_at: Timestamp,
}

/// What the agreement did with a ruling, in the agreement's own units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementSummary {
    /// Total released to the beneficiary side.
    pub released: u64,
    /// Total refunded to the depositor side.
    pub refunded: u64,
}

impl SettlementSummary {
    /// Everything that moved.
    pub fn total(&self) -> u64 {
        self.released.saturating_add(self.refunded)
    }
}

/// Errors reported by a linked agreement.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DisputableError {
    /// The agreement does not know the dispute.
    #[error("{agreement} has no {dispute}")]
    UnknownDispute {
        /// The agreement identifier.
        agreement: String,
        /// The agreement-local dispute.
        dispute: String,
    },

    /// The dispute is already linked to an arbitration instance.
    #[error("{dispute} on {agreement} is already linked to {instance}")]
    AlreadyLinked {
        /// The agreement identifier.
        agreement: String,
        /// The agreement-local dispute.
        dispute: String,
        /// The instance it is linked to.
        instance: String,
    },

    /// A ruling for the dispute was already applied.
    #[error("{dispute} on {agreement} is already resolved")]
    AlreadyResolved {
        /// The agreement identifier.
        agreement: String,
        /// The agreement-local dispute.
        dispute: String,
    },

    /// The agreement is mid-call and cannot be re-entered.
    #[error("linked agreement is busy during {context}")]
    Busy {
        /// The registry operation that found it busy.
        context: String,
    },

    /// The agreement refused the request for its own reasons.
    #[error("{agreement} rejected the request: {reason}")]
    Rejected {
        /// The agreement identifier.
        agreement: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Capability every linked agreement implements.
pub trait Disputable {
    /// The agreement's identity. A nil identifier is rejected by the registry.
    fn agreement_id(&self) -> AgreementId;

    /// Whether the agreement permits arbitration of `dispute` right now.
    fn is_disputable(&self, dispute: AgreementDisputeId) -> bool;

    /// The two parties to `dispute`, as (claimant, respondent) in storage order.
    fn dispute_parties(
        &self,
        dispute: AgreementDisputeId,
    ) -> Result<(PartyId, PartyId), DisputableError>;

    /// Record that `dispute` is governed by arbitration instance `instance`.
    fn link_arbitration(
        &mut self,
        dispute: AgreementDisputeId,
        instance: InstanceId,
    ) -> Result<(), DisputableError>;

    /// Settle `order.dispute` according to the final ruling.
    ///
    /// Must reject a second invocation for the same dispute with
    /// [`DisputableError::AlreadyResolved`] without moving funds.
    fn apply_ruling(&mut self, order: &RulingOrder) -> Result<SettlementSummary, DisputableError>;

    /// Whether `dispute` is linked to an arbitration instance.
    fn is_linked(&self, dispute: AgreementDisputeId) -> bool;

    /// Whether a ruling has been applied to `dispute`.
    fn is_resolved(&self, dispute: AgreementDisputeId) -> bool;

    /// Notification that the arbitration for `dispute` was withdrawn.
    fn arbitration_withdrawn(&mut self, _dispute: AgreementDisputeId, _instance: InstanceId) {}
}

/// Shared handle through which the registry reaches a linked agreement.
pub type AgreementHandle = Rc<RefCell<dyn Disputable>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispute_id_display() {
        assert_eq!(AgreementDisputeId(7).to_string(), "dispute#7");
    }

    #[test]
    fn summary_total() {
        let summary = SettlementSummary {
            released: 300,
            refunded: 700,
        };
        assert_eq!(summary.total(), 1000);
    }

    #[test]
    fn already_resolved_display() {
        let err = DisputableError::AlreadyResolved {
            agreement: "agreement:x".to_string(),
            dispute: "dispute#1".to_string(),
        };
        assert!(format!("{err}").contains("already resolved"));
    }
}
