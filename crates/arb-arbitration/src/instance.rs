//! # Arbitration Instances
//!
//! The per-dispute record owned by the registry: parties, arbitrator panel,
//! embedded configuration, status, deadlines, ruling and counters.
//!
//! ## Status Graph
//!
//! ```text
//! CONFIGURED ──file_claim──▶ FILED ──close_evidence / rule──▶ AWAITING_RULING
//!                                                                  │
//!                              ┌───────────── appeal ◀─────────┐   rule (consensus)
//!                              ▼                               │   ▼
//!                          APPEALED ──close_evidence / rule──▶ │ RULED ──execute_ruling──▶ EXECUTED
//!                                                              └──┘
//!
//! any non-terminal ──withdraw (per policy)──▶ WITHDRAWN
//! ```
//!
//! The status is a plain enum checked against an explicit transition table
//! ([`ArbitrationStatus::valid_transitions`]). EXECUTED and WITHDRAWN are
//! terminal; instances are never deleted.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use arb_core::{AgreementId, ContentDigest, PartyId, Timestamp};

use crate::config::ArbitrationConfig;
use crate::disputable::AgreementDisputeId;
use crate::error::ArbitrationError;
use crate::ruling::{Ruling, Vote};

/// Capacity of an arbitrator panel.
pub const MAX_ARBITRATORS: usize = 3;

// ── Identifiers ────────────────────────────────────────────────────────

/// A unique identifier for an arbitration instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstanceId(Uuid);

impl InstanceId {
    /// Create a new random instance identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an instance identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "arbitration:{}", self.0)
    }
}

// ── Status ─────────────────────────────────────────────────────────────

/// The lifecycle status of an arbitration instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArbitrationStatus {
    /// Created and linked; arbitrators may still be set.
    Configured,
    /// Claim filed; evidence window open.
    Filed,
    /// Evidence closed; arbitrators voting.
    AwaitingRuling,
    /// Ruling final; appeal window may be open.
    Ruled,
    /// Ruling appealed; a fresh evidence window is open.
    Appealed,
    /// Ruling delivered to the linked agreement. Terminal.
    Executed,
    /// Dispute withdrawn. Terminal.
    Withdrawn,
}

impl ArbitrationStatus {
    /// The wire code of this status.
    pub fn code(&self) -> u8 {
        match self {
            Self::Configured => 0,
            Self::Filed => 1,
            Self::AwaitingRuling => 2,
            Self::Ruled => 3,
            Self::Appealed => 4,
            Self::Executed => 5,
            Self::Withdrawn => 6,
        }
    }

    /// The canonical string name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configured => "CONFIGURED",
            Self::Filed => "FILED",
            Self::AwaitingRuling => "AWAITING_RULING",
            Self::Ruled => "RULED",
            Self::Appealed => "APPEALED",
            Self::Executed => "EXECUTED",
            Self::Withdrawn => "WITHDRAWN",
        }
    }

    /// Whether this status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Executed | Self::Withdrawn)
    }

    /// Valid target statuses from this status.
    pub fn valid_transitions(&self) -> &'static [ArbitrationStatus] {
        match self {
            Self::Configured => &[Self::Filed, Self::Withdrawn],
            Self::Filed => &[Self::AwaitingRuling, Self::Withdrawn],
            Self::AwaitingRuling => &[Self::Ruled, Self::Withdrawn],
            Self::Ruled => &[Self::Executed, Self::Appealed, Self::Withdrawn],
            Self::Appealed => &[Self::AwaitingRuling, Self::Withdrawn],
            Self::Executed | Self::Withdrawn => &[],
        }
    }

    /// Whether `to` is reachable in one step.
    pub fn can_transition_to(&self, to: ArbitrationStatus) -> bool {
        self.valid_transitions().contains(&to)
    }
}

impl TryFrom<u8> for ArbitrationStatus {
    type Error = ArbitrationError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Configured),
            1 => Ok(Self::Filed),
            2 => Ok(Self::AwaitingRuling),
            3 => Ok(Self::Ruled),
            4 => Ok(Self::Appealed),
            5 => Ok(Self::Executed),
            6 => Ok(Self::Withdrawn),
            other => Err(ArbitrationError::configuration(format!(
                "unknown status code {other}"
            ))),
        }
    }
}

impl std::fmt::Display for ArbitrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Arbitrator panel ───────────────────────────────────────────────────

/// Up to three arbitrator seats, addressed by slot index.
///
/// Seats are filled contiguously from slot 0; `count` is the number of
/// filled seats.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArbitratorPanel {
    slots: [Option<PartyId>; MAX_ARBITRATORS],
    count: u8,
}

impl ArbitratorPanel {
    /// An empty panel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seat `arbitrators` in slots 0.. in order.
    ///
    /// # Errors
    ///
    /// Returns [`ArbitrationError::Configuration`] for more than three
    /// arbitrators or a duplicate.
    pub fn from_slice(arbitrators: &[PartyId]) -> Result<Self, ArbitrationError> {
        if arbitrators.len() > MAX_ARBITRATORS {
            return Err(ArbitrationError::configuration(format!(
                "at most {MAX_ARBITRATORS} arbitrators, got {}",
                arbitrators.len()
            )));
        }
        let mut panel = Self::new();
        for (slot, arbitrator) in arbitrators.iter().enumerate() {
            panel.seat(slot, arbitrator.clone())?;
        }
        Ok(panel)
    }

    /// Number of filled seats.
    pub fn count(&self) -> usize {
        usize::from(self.count)
    }

    /// Whether no seat is filled.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The arbitrator in `slot`, if seated.
    pub fn get(&self, slot: usize) -> Option<&PartyId> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    /// The slot `arbitrator` sits in.
    pub fn slot_of(&self, arbitrator: &PartyId) -> Option<usize> {
        self.slots
            .iter()
            .position(|seat| seat.as_ref() == Some(arbitrator))
    }

    /// Whether `arbitrator` holds any seat.
    pub fn contains(&self, arbitrator: &PartyId) -> bool {
        self.slot_of(arbitrator).is_some()
    }

    /// Seated arbitrators in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &PartyId> {
        self.slots.iter().flatten()
    }

    /// Fill or replace `slot`. Returns the previous occupant.
    ///
    /// `slot` may be any filled seat or the first empty one.
    ///
    /// # Errors
    ///
    /// Returns [`ArbitrationError::Configuration`] if the slot would leave a
    /// gap or the arbitrator already sits in another slot.
    pub fn seat(
        &mut self,
        slot: usize,
        arbitrator: PartyId,
    ) -> Result<Option<PartyId>, ArbitrationError> {
        if slot >= MAX_ARBITRATORS || slot > self.count() {
            return Err(ArbitrationError::configuration(format!(
                "slot {slot} is not addressable with {} seated",
                self.count
            )));
        }
        if let Some(existing) = self.slot_of(&arbitrator) {
            if existing != slot {
                return Err(ArbitrationError::configuration(format!(
                    "{arbitrator} already sits in slot {existing}"
                )));
            }
        }
        let previous = self.slots[slot].replace(arbitrator);
        if previous.is_none() {
            self.count += 1;
        }
        Ok(previous)
    }
}

// ── Evidence ───────────────────────────────────────────────────────────

/// One piece of evidence, referenced by digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    /// The submitting party.
    pub submitter: PartyId,
    /// Digest of the evidence content.
    pub content: ContentDigest,
    /// When it was submitted.
    pub submitted_at: Timestamp,
}

/// Which side of the dispute a party is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyRole {
    /// The party that filed.
    Claimant,
    /// The other party.
    Respondent,
}

// ── The instance ───────────────────────────────────────────────────────

/// A single arbitration, from configuration to execution or withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArbitrationInstance {
    /// Unique instance identifier.
    pub id: InstanceId,
    /// The linked agreement.
    pub agreement: AgreementId,
    /// The agreement-local dispute.
    pub dispute: AgreementDisputeId,
    /// The party that asked for the instance.
    pub creator: PartyId,
    /// The suing party (whoever filed).
    pub claimant: PartyId,
    /// The other party.
    pub respondent: PartyId,
    /// Seated arbitrators.
    pub panel: ArbitratorPanel,
    /// Embedded configuration.
    pub config: ArbitrationConfig,
    /// Current status.
    pub status: ArbitrationStatus,
    /// When the instance was created.
    pub created_at: Timestamp,
    /// When the claim was filed.
    pub filed_at: Option<Timestamp>,
    /// Last moment evidence is accepted.
    pub evidence_deadline: Option<Timestamp>,
    /// When the current evidence window was closed.
    pub evidence_closed_at: Option<Timestamp>,
    /// Start of the current arbitrator-timeout period: evidence close, or the
    /// last replacement of a stalled arbitrator.
    pub timeout_started_at: Option<Timestamp>,
    /// When the current ruling was finalized.
    pub ruled_at: Option<Timestamp>,
    /// Last moment the current ruling may be appealed.
    pub appeal_deadline: Option<Timestamp>,
    /// When the ruling was executed or the dispute withdrawn.
    pub closed_at: Option<Timestamp>,
    /// Digest of the claim.
    pub claim: Option<ContentDigest>,
    /// Evidence submitted by the claimant.
    pub claimant_evidence_count: u32,
    /// Evidence submitted by the respondent.
    pub respondent_evidence_count: u32,
    /// Final ruling of the current cycle.
    pub ruling: Ruling,
    /// Final split ratio in basis points.
    pub split_ratio_bps: u16,
    /// Digest of the final justification.
    pub justification: Option<ContentDigest>,
    /// Appeals filed so far.
    pub appeal_count: u8,
    /// Claimant confirmed the arbitrator.
    pub claimant_consent: bool,
    /// Respondent confirmed the arbitrator.
    pub respondent_consent: bool,
    /// Party with a pending mutual-withdrawal request.
    pub withdrawal_requested_by: Option<PartyId>,
    /// Current-cycle votes, indexed by panel slot.
    pub votes: [Option<Vote>; MAX_ARBITRATORS],
}

impl ArbitrationInstance {
    /// The role `party` plays, if any.
    pub fn role_of(&self, party: &PartyId) -> Option<PartyRole> {
        if *party == self.claimant {
            Some(PartyRole::Claimant)
        } else if *party == self.respondent {
            Some(PartyRole::Respondent)
        } else {
            None
        }
    }

    /// Whether `party` is the claimant or respondent.
    pub fn is_party(&self, party: &PartyId) -> bool {
        self.role_of(party).is_some()
    }

    /// Whether appeals remain under the configuration and budget.
    pub fn appeals_remaining(&self) -> bool {
        self.config.appeals_allowed && self.appeal_count < self.config.max_appeals
    }

    /// Number of votes cast in the current cycle.
    pub fn votes_cast(&self) -> usize {
        self.votes.iter().flatten().count()
    }

    /// Exchange claimant and respondent, along with their per-role fields.
    pub(crate) fn swap_roles(&mut self) {
        std::mem::swap(&mut self.claimant, &mut self.respondent);
        std::mem::swap(
            &mut self.claimant_consent,
            &mut self.respondent_consent,
        );
        std::mem::swap(
            &mut self.claimant_evidence_count,
            &mut self.respondent_evidence_count,
        );
    }

    /// Clear the ruling fields and votes ahead of a new cycle.
    pub(crate) fn reset_ruling(&mut self) {
        self.ruling = Ruling::None;
        self.split_ratio_bps = 0;
        self.justification = None;
        self.ruled_at = None;
        self.appeal_deadline = None;
        self.evidence_closed_at = None;
        self.timeout_started_at = None;
        self.votes = Default::default();
    }

    // ── Guards ─────────────────────────────────────────────────────────

    /// Fail unless the status is one of `allowed`.
    pub(crate) fn require_status(
        &self,
        operation: &str,
        allowed: &[ArbitrationStatus],
    ) -> Result<(), ArbitrationError> {
        if allowed.contains(&self.status) {
            return Ok(());
        }
        let expected = allowed
            .iter()
            .map(ArbitrationStatus::as_str)
            .collect::<Vec<_>>()
            .join(" | ");
        Err(ArbitrationError::InvalidState {
            instance: self.id.to_string(),
            operation: operation.to_string(),
            expected,
            actual: self.status.as_str().to_string(),
        })
    }

    /// Fail unless `caller` is the claimant or respondent.
    pub(crate) fn require_party(
        &self,
        caller: &PartyId,
        operation: &str,
    ) -> Result<PartyRole, ArbitrationError> {
        self.role_of(caller)
            .ok_or_else(|| self.unauthorized(caller, operation, "claimant or respondent"))
    }

    /// Fail unless `caller` holds a seat. Returns the slot.
    pub(crate) fn require_arbitrator(
        &self,
        caller: &PartyId,
        operation: &str,
    ) -> Result<usize, ArbitrationError> {
        self.panel
            .slot_of(caller)
            .ok_or_else(|| self.unauthorized(caller, operation, "seated arbitrator"))
    }

    pub(crate) fn unauthorized(
        &self,
        caller: &PartyId,
        operation: &str,
        required: &str,
    ) -> ArbitrationError {
        ArbitrationError::Unauthorized {
            instance: self.id.to_string(),
            caller: caller.to_string(),
            operation: operation.to_string(),
            required: required.to_string(),
        }
    }

    pub(crate) fn policy(&self, operation: &str, reason: impl Into<String>) -> ArbitrationError {
        ArbitrationError::Policy {
            instance: self.id.to_string(),
            operation: operation.to_string(),
            reason: reason.into(),
        }
    }

    /// Move along the transition table. Callers have already checked the
    /// source status.
    pub(crate) fn transition(&mut self, to: ArbitrationStatus) {
        debug_assert!(
            self.status.can_transition_to(to),
            "{} -> {} is not in the transition table",
            self.status,
            to
        );
        self.status = to;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn party(name: &str) -> PartyId {
        PartyId::new(name).unwrap()
    }

    #[test]
    fn status_codes_roundtrip() {
        for code in 0..=6u8 {
            assert_eq!(ArbitrationStatus::try_from(code).unwrap().code(), code);
        }
        assert!(ArbitrationStatus::try_from(7).is_err());
    }

    #[test]
    fn terminal_statuses_have_no_transitions() {
        for status in [ArbitrationStatus::Executed, ArbitrationStatus::Withdrawn] {
            assert!(status.is_terminal());
            assert!(status.valid_transitions().is_empty());
        }
    }

    #[test]
    fn every_non_terminal_status_can_withdraw() {
        for status in [
            ArbitrationStatus::Configured,
            ArbitrationStatus::Filed,
            ArbitrationStatus::AwaitingRuling,
            ArbitrationStatus::Ruled,
            ArbitrationStatus::Appealed,
        ] {
            assert!(status.can_transition_to(ArbitrationStatus::Withdrawn));
        }
    }

    #[test]
    fn ruled_branches_to_executed_or_appealed() {
        let from = ArbitrationStatus::Ruled;
        assert!(from.can_transition_to(ArbitrationStatus::Executed));
        assert!(from.can_transition_to(ArbitrationStatus::Appealed));
        assert!(!from.can_transition_to(ArbitrationStatus::Filed));
    }

    #[test]
    fn appealed_returns_to_awaiting_ruling() {
        assert!(ArbitrationStatus::Appealed.can_transition_to(ArbitrationStatus::AwaitingRuling));
        assert!(!ArbitrationStatus::Appealed.can_transition_to(ArbitrationStatus::Ruled));
    }

    #[test]
    fn status_serializes_screaming() {
        let json = serde_json::to_string(&ArbitrationStatus::AwaitingRuling).unwrap();
        assert_eq!(json, "\"AWAITING_RULING\"");
    }

    #[test]
    fn panel_seats_in_order() {
        let panel =
            ArbitratorPanel::from_slice(&[party("a1"), party("a2"), party("a3")]).unwrap();
        assert_eq!(panel.count(), 3);
        assert_eq!(panel.get(1), Some(&party("a2")));
        assert_eq!(panel.slot_of(&party("a3")), Some(2));
        assert_eq!(panel.iter().count(), 3);
    }

    #[test]
    fn panel_rejects_four() {
        let four: Vec<PartyId> = (0..4).map(|i| party(&format!("a{i}"))).collect();
        assert!(ArbitratorPanel::from_slice(&four).is_err());
    }

    #[test]
    fn panel_rejects_duplicates() {
        assert!(ArbitratorPanel::from_slice(&[party("a1"), party("a1")]).is_err());
    }

    #[test]
    fn panel_rejects_gaps() {
        let mut panel = ArbitratorPanel::new();
        assert!(panel.seat(1, party("a1")).is_err());
        assert!(panel.seat(0, party("a1")).unwrap().is_none());
        assert_eq!(panel.count(), 1);
    }

    #[test]
    fn panel_replacement_keeps_count() {
        let mut panel = ArbitratorPanel::from_slice(&[party("a1")]).unwrap();
        let previous = panel.seat(0, party("b1")).unwrap();
        assert_eq!(previous, Some(party("a1")));
        assert_eq!(panel.count(), 1);
        assert!(!panel.contains(&party("a1")));
    }

    #[test]
    fn instance_id_display() {
        assert!(InstanceId::new().to_string().starts_with("arbitration:"));
    }
}
