//! # Arbitration Notifications
//!
//! Every state change in the registry emits an [`ArbitrationEvent`]. Events
//! are logged through `tracing` as they happen and appended to an in-memory
//! [`EventLog`] that callers read or drain.

use serde::{Deserialize, Serialize};

use arb_core::{AgreementId, ContentDigest, PartyId, Timestamp};

use crate::disputable::{AgreementDisputeId, SettlementSummary};
use crate::instance::InstanceId;
use crate::preset::PresetId;
use crate::ruling::Ruling;

// ---------------------------------------------------------------------------
// ArbitrationEvent
// ---------------------------------------------------------------------------

/// A notification emitted by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ArbitrationEvent {
    /// An instance was created and linked.
    InstanceCreated {
        /// The new instance.
        instance: InstanceId,
        /// The linked agreement.
        agreement: AgreementId,
        /// The agreement-local dispute.
        dispute: AgreementDisputeId,
        /// The preset used.
        preset: PresetId,
        /// The creating party.
        creator: PartyId,
    },
    /// An arbitrator seat was filled or changed while configuring.
    ArbitratorSet {
        /// The instance.
        instance: InstanceId,
        /// The slot.
        slot: usize,
        /// The seated arbitrator.
        arbitrator: PartyId,
    },
    /// The appeal backup was named while configuring.
    BackupArbitratorSet {
        /// The instance.
        instance: InstanceId,
        /// The backup arbitrator.
        backup: PartyId,
    },
    /// A party consented to the arbitrator.
    ArbitratorConfirmed {
        /// The instance.
        instance: InstanceId,
        /// The consenting party.
        party: PartyId,
    },
    /// An arbitrator was replaced after seating.
    ArbitratorReplaced {
        /// The instance.
        instance: InstanceId,
        /// The slot.
        slot: usize,
        /// The outgoing arbitrator.
        previous: PartyId,
        /// The incoming arbitrator.
        replacement: PartyId,
    },
    /// A claim was filed.
    ClaimFiled {
        /// The instance.
        instance: InstanceId,
        /// The filing party.
        claimant: PartyId,
        /// The other party.
        respondent: PartyId,
        /// Digest of the claim.
        claim: ContentDigest,
        /// Last moment evidence is accepted.
        evidence_deadline: Timestamp,
    },
    /// Evidence was submitted.
    EvidenceSubmitted {
        /// The instance.
        instance: InstanceId,
        /// The submitting party.
        submitter: PartyId,
        /// Digest of the evidence.
        content: ContentDigest,
    },
    /// The evidence window closed.
    EvidenceClosed {
        /// The instance.
        instance: InstanceId,
        /// Who closed it, or `None` when a ruling closed it implicitly.
        closed_by: Option<PartyId>,
    },
    /// An arbitrator cast or overwrote a vote.
    VoteCast {
        /// The instance.
        instance: InstanceId,
        /// The voting arbitrator.
        arbitrator: PartyId,
        /// The ruling voted for.
        ruling: Ruling,
        /// The split ratio voted for.
        split_ratio_bps: u16,
    },
    /// Consensus reached; the ruling is final for this cycle.
    RulingIssued {
        /// The instance.
        instance: InstanceId,
        /// The final ruling.
        ruling: Ruling,
        /// The final split ratio.
        split_ratio_bps: u16,
        /// Digest of the final justification.
        justification: ContentDigest,
        /// Last moment the ruling may be appealed.
        appeal_deadline: Timestamp,
    },
    /// A ruling was appealed.
    AppealFiled {
        /// The instance.
        instance: InstanceId,
        /// The appealing party.
        appellant: PartyId,
        /// Appeals filed so far, this one included.
        appeal_count: u8,
    },
    /// The ruling was delivered to the linked agreement.
    RulingExecuted {
        /// The instance.
        instance: InstanceId,
        /// The executed ruling.
        ruling: Ruling,
        /// What the agreement moved.
        settlement: SettlementSummary,
    },
    /// One party asked for a mutual withdrawal.
    WithdrawalRequested {
        /// The instance.
        instance: InstanceId,
        /// The requesting party.
        requested_by: PartyId,
    },
    /// The dispute was withdrawn.
    DisputeWithdrawn {
        /// The instance.
        instance: InstanceId,
        /// The party whose call completed the withdrawal.
        withdrawn_by: PartyId,
    },
}

impl ArbitrationEvent {
    /// The instance this event concerns.
    pub fn instance(&self) -> InstanceId {
        match self {
            Self::InstanceCreated { instance, .. }
            | Self::ArbitratorSet { instance, .. }
            | Self::BackupArbitratorSet { instance, .. }
            | Self::ArbitratorConfirmed { instance, .. }
            | Self::ArbitratorReplaced { instance, .. }
            | Self::ClaimFiled { instance, .. }
            | Self::EvidenceSubmitted { instance, .. }
            | Self::EvidenceClosed { instance, .. }
            | Self::VoteCast { instance, .. }
            | Self::RulingIssued { instance, .. }
            | Self::AppealFiled { instance, .. }
            | Self::RulingExecuted { instance, .. }
            | Self::WithdrawalRequested { instance, .. }
            | Self::DisputeWithdrawn { instance, .. } => *instance,
        }
    }

    /// The event name, as serialized in the `event` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InstanceCreated { .. } => "instance_created",
            Self::ArbitratorSet { .. } => "arbitrator_set",
            Self::BackupArbitratorSet { .. } => "backup_arbitrator_set",
            Self::ArbitratorConfirmed { .. } => "arbitrator_confirmed",
            Self::ArbitratorReplaced { .. } => "arbitrator_replaced",
            Self::ClaimFiled { .. } => "claim_filed",
            Self::EvidenceSubmitted { .. } => "evidence_submitted",
            Self::EvidenceClosed { .. } => "evidence_closed",
            Self::VoteCast { .. } => "vote_cast",
            Self::RulingIssued { .. } => "ruling_issued",
            Self::AppealFiled { .. } => "appeal_filed",
            Self::RulingExecuted { .. } => "ruling_executed",
            Self::WithdrawalRequested { .. } => "withdrawal_requested",
            Self::DisputeWithdrawn { .. } => "dispute_withdrawn",
        }
    }
}

impl std::fmt::Display for ArbitrationEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} on {}", self.kind(), self.instance())
    }
}

// ---------------------------------------------------------------------------
// EventLog
// ---------------------------------------------------------------------------

/// One logged event with its position and time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Monotonic sequence number, starting at 0.
    pub sequence: u64,
    /// Clock reading of the operation that emitted it.
    pub at: Timestamp,
    /// The event.
    pub event: ArbitrationEvent,
}

/// Append-only in-memory event log.
///
/// Draining hands the buffered records to the caller; sequence numbers keep
/// counting across drains.
#[derive(Debug, Default)]
pub struct EventLog {
    records: Vec<EventRecord>,
    next_sequence: u64,
}

impl EventLog {
    /// An empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `event` and emit it as a `tracing` event.
    pub fn append(&mut self, at: Timestamp, event: ArbitrationEvent) {
        tracing::info!(
            event = event.kind(),
            instance = %event.instance(),
            sequence = self.next_sequence,
            "arbitration notification"
        );
        self.records.push(EventRecord {
            sequence: self.next_sequence,
            at,
            event,
        });
        self.next_sequence += 1;
    }

    /// Buffered records in emission order.
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Buffered records concerning `instance`.
    pub fn for_instance(&self, instance: InstanceId) -> Vec<&EventRecord> {
        self.records
            .iter()
            .filter(|r| r.event.instance() == instance)
            .collect()
    }

    /// Number of buffered records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Take every buffered record, leaving the log empty.
    pub fn drain(&mut self) -> Vec<EventRecord> {
        std::mem::take(&mut self.records)
    }
}
