//! # Arbitration Registry
//!
//! Owns every [`ArbitrationInstance`] and drives it through its status
//! graph. Each operation reads the clock once, validates every precondition,
//! and only then writes. An operation that returns an error has changed
//! nothing: not the instance, not the evidence list, not the event log.
//!
//! Linked agreements are reached through their [`AgreementHandle`]. The
//! registry calls them synchronously: eligibility and party lookup on
//! creation, [`Disputable::link_arbitration`] once, the withdrawal hook, and
//! [`Disputable::apply_ruling`] exactly once on execution.
//!
//! [`Disputable::link_arbitration`]: crate::disputable::Disputable::link_arbitration
//! [`Disputable::apply_ruling`]: crate::disputable::Disputable::apply_ruling

use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use arb_core::{Clock, ContentDigest, PartyId, SystemClock, Timestamp};

use crate::config::{
    AppealArbitratorMethod, ArbitrationConfig, RegistryConfig, ReplacementMethod,
    WithdrawalPolicy,
};
use crate::disputable::{
    AgreementDisputeId, AgreementHandle, DisputableError, RulingOrder, SettlementSummary,
};
use crate::error::ArbitrationError;
use crate::events::{ArbitrationEvent, EventLog, EventRecord};
use crate::instance::{
    ArbitrationInstance, ArbitrationStatus, ArbitratorPanel, Evidence, InstanceId, PartyRole,
};
use crate::preset::{PresetCatalogue, PresetId};
use crate::ruling::{validate_ruling, Ruling, Vote};
use crate::voting::{ConsensusOutcome, VotingConsensusEngine};

use crate::instance::ArbitrationStatus::{
    Appealed, AwaitingRuling, Configured, Executed, Filed, Ruled, Withdrawn,
};

const NON_TERMINAL: [ArbitrationStatus; 5] = [Configured, Filed, AwaitingRuling, Ruled, Appealed];

// ---------------------------------------------------------------------------
// InstanceStore
// ---------------------------------------------------------------------------

/// One stored instance with its evidence and agreement handle.
pub struct InstanceRecord {
    instance: ArbitrationInstance,
    evidence: Vec<Evidence>,
    agreement: AgreementHandle,
}

impl InstanceRecord {
    /// The instance.
    pub fn instance(&self) -> &ArbitrationInstance {
        &self.instance
    }

    /// Evidence in submission order.
    pub fn evidence(&self) -> &[Evidence] {
        &self.evidence
    }

    /// The linked agreement.
    pub fn agreement(&self) -> &AgreementHandle {
        &self.agreement
    }
}

/// Instances keyed by identifier. Records are never removed.
#[derive(Default)]
pub struct InstanceStore {
    records: BTreeMap<InstanceId, InstanceRecord>,
}

impl InstanceStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a record.
    pub fn get(&self, id: InstanceId) -> Result<&InstanceRecord, ArbitrationError> {
        self.records
            .get(&id)
            .ok_or_else(|| ArbitrationError::InstanceNotFound(id.to_string()))
    }

    fn get_mut(&mut self, id: InstanceId) -> Result<&mut InstanceRecord, ArbitrationError> {
        self.records
            .get_mut(&id)
            .ok_or_else(|| ArbitrationError::InstanceNotFound(id.to_string()))
    }

    fn insert(&mut self, record: InstanceRecord) {
        self.records.insert(record.instance.id, record);
    }

    /// Stored instance identifiers in order.
    pub fn ids(&self) -> impl Iterator<Item = InstanceId> + '_ {
        self.records.keys().copied()
    }

    /// Number of stored instances.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Result of a withdrawal call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalOutcome {
    /// Recorded; the other party must also ask.
    Pending,
    /// The instance is now WITHDRAWN.
    Withdrawn,
}

// ---------------------------------------------------------------------------
// ArbitrationRegistry
// ---------------------------------------------------------------------------

/// The arbitration state machine over all instances.
pub struct ArbitrationRegistry {
    store: InstanceStore,
    limits: RegistryConfig,
    clock: Arc<dyn Clock>,
    events: EventLog,
}

impl Default for ArbitrationRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl ArbitrationRegistry {
    /// A registry on the system clock.
    pub fn new(limits: RegistryConfig) -> Self {
        Self::with_clock(limits, Arc::new(SystemClock))
    }

    /// A registry reading time from `clock`.
    pub fn with_clock(limits: RegistryConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: InstanceStore::new(),
            limits,
            clock,
            events: EventLog::new(),
        }
    }

    // ── Creation ───────────────────────────────────────────────────────

    /// Create an instance from a named preset and link it to `agreement`.
    ///
    /// `arbitrators` seats slots 0.. and may be shorter than the preset's
    /// count; remaining seats are filled with [`Self::set_arbitrator`].
    pub fn create_instance(
        &mut self,
        agreement: AgreementHandle,
        dispute: AgreementDisputeId,
        preset: PresetId,
        arbitrators: &[PartyId],
        creator: PartyId,
    ) -> Result<InstanceId, ArbitrationError> {
        let config = PresetCatalogue::defaults(preset)?;
        self.create(agreement, dispute, config, arbitrators, creator)
    }

    /// Create an instance from a caller-supplied configuration.
    ///
    /// Every seat must be supplied. The stored preset is CUSTOM.
    pub fn create_instance_custom(
        &mut self,
        agreement: AgreementHandle,
        dispute: AgreementDisputeId,
        mut config: ArbitrationConfig,
        arbitrators: &[PartyId],
        creator: PartyId,
    ) -> Result<InstanceId, ArbitrationError> {
        config.preset = PresetId::Custom;
        if arbitrators.len() != usize::from(config.arbitrator_count) {
            return Err(ArbitrationError::configuration(format!(
                "custom configuration seats {} arbitrator(s), {} supplied",
                config.arbitrator_count,
                arbitrators.len()
            )));
        }
        self.create(agreement, dispute, config, arbitrators, creator)
    }

    fn create(
        &mut self,
        agreement: AgreementHandle,
        dispute: AgreementDisputeId,
        config: ArbitrationConfig,
        arbitrators: &[PartyId],
        creator: PartyId,
    ) -> Result<InstanceId, ArbitrationError> {
        const OP: &str = "create_instance";
        config.validate(&self.limits)?;
        if arbitrators.len() > usize::from(config.arbitrator_count) {
            return Err(ArbitrationError::configuration(format!(
                "{} arbitrators supplied for {} seat(s)",
                arbitrators.len(),
                config.arbitrator_count
            )));
        }
        let panel = ArbitratorPanel::from_slice(arbitrators)?;
        let now = self.clock.now();

        let (agreement_id, claimant, respondent) = {
            let linked = agreement.try_borrow().map_err(|_| busy(OP))?;
            let agreement_id = linked.agreement_id();
            if agreement_id.is_nil() {
                return Err(ArbitrationError::configuration(
                    "linked agreement reports a nil identifier",
                ));
            }
            if !linked.is_disputable(dispute) {
                return Err(ArbitrationError::configuration(format!(
                    "{agreement_id} does not permit arbitration of {dispute}"
                )));
            }
            let (claimant, respondent) = linked.dispute_parties(dispute)?;
            (agreement_id, claimant, respondent)
        };

        if creator != claimant && creator != respondent {
            return Err(ArbitrationError::Unauthorized {
                instance: format!("{agreement_id}/{dispute}"),
                caller: creator.to_string(),
                operation: OP.to_string(),
                required: "claimant or respondent".to_string(),
            });
        }
        for arbitrator in panel.iter().chain(config.backup_arbitrator.iter()) {
            if *arbitrator == claimant || *arbitrator == respondent {
                return Err(ArbitrationError::configuration(format!(
                    "{arbitrator} is a party to {dispute} and cannot arbitrate it"
                )));
            }
        }

        let id = InstanceId::new();
        agreement
            .try_borrow_mut()
            .map_err(|_| busy(OP))?
            .link_arbitration(dispute, id)?;

        let preset = config.preset;
        let instance = ArbitrationInstance {
            id,
            agreement: agreement_id,
            dispute,
            creator: creator.clone(),
            claimant,
            respondent,
            panel,
            config,
            status: Configured,
            created_at: now,
            filed_at: None,
            evidence_deadline: None,
            evidence_closed_at: None,
            timeout_started_at: None,
            ruled_at: None,
            appeal_deadline: None,
            closed_at: None,
            claim: None,
            claimant_evidence_count: 0,
            respondent_evidence_count: 0,
            ruling: Ruling::None,
            split_ratio_bps: 0,
            justification: None,
            appeal_count: 0,
            claimant_consent: false,
            respondent_consent: false,
            withdrawal_requested_by: None,
            votes: Default::default(),
        };
        self.store.insert(InstanceRecord {
            instance,
            evidence: Vec::new(),
            agreement,
        });
        self.events.append(
            now,
            ArbitrationEvent::InstanceCreated {
                instance: id,
                agreement: agreement_id,
                dispute,
                preset,
                creator,
            },
        );
        Ok(id)
    }

    // ── Configuring ────────────────────────────────────────────────────

    /// Seat or change the arbitrator in `slot`. Creator only, CONFIGURED only.
    ///
    /// Changing slot 0 clears both consent flags.
    pub fn set_arbitrator(
        &mut self,
        id: InstanceId,
        caller: &PartyId,
        slot: usize,
        arbitrator: PartyId,
    ) -> Result<(), ArbitrationError> {
        const OP: &str = "set_arbitrator";
        let now = self.clock.now();
        let instance = &mut self.store.get_mut(id)?.instance;
        if *caller != instance.creator {
            return Err(instance.unauthorized(caller, OP, "instance creator"));
        }
        instance.require_status(OP, &[Configured])?;
        if slot >= usize::from(instance.config.arbitrator_count) {
            return Err(ArbitrationError::configuration(format!(
                "slot {slot} is outside the configured {} seat(s)",
                instance.config.arbitrator_count
            )));
        }
        if instance.is_party(&arbitrator) {
            return Err(ArbitrationError::configuration(format!(
                "{arbitrator} is a party and cannot arbitrate"
            )));
        }
        let mut panel = instance.panel.clone();
        let previous = panel.seat(slot, arbitrator.clone())?;

        instance.panel = panel;
        if slot == 0 && previous.as_ref() != Some(&arbitrator) {
            instance.claimant_consent = false;
            instance.respondent_consent = false;
        }
        self.events.append(
            now,
            ArbitrationEvent::ArbitratorSet {
                instance: id,
                slot,
                arbitrator,
            },
        );
        Ok(())
    }

    /// Name the arbitrator who takes slot 0 on appeal. Creator only,
    /// CONFIGURED only.
    ///
    /// The backup may be neither a party nor a seated arbitrator.
    pub fn set_backup_arbitrator(
        &mut self,
        id: InstanceId,
        caller: &PartyId,
        backup: PartyId,
    ) -> Result<(), ArbitrationError> {
        const OP: &str = "set_backup_arbitrator";
        let now = self.clock.now();
        let instance = &mut self.store.get_mut(id)?.instance;
        if *caller != instance.creator {
            return Err(instance.unauthorized(caller, OP, "instance creator"));
        }
        instance.require_status(OP, &[Configured])?;
        if instance.is_party(&backup) {
            return Err(ArbitrationError::configuration(format!(
                "{backup} is a party and cannot arbitrate"
            )));
        }
        if instance.panel.contains(&backup) {
            return Err(ArbitrationError::configuration(format!(
                "{backup} already sits on the panel"
            )));
        }

        instance.config.backup_arbitrator = Some(backup.clone());
        self.events.append(
            now,
            ArbitrationEvent::BackupArbitratorSet {
                instance: id,
                backup,
            },
        );
        Ok(())
    }

    /// Record the caller's consent to the seated arbitrator.
    pub fn confirm_arbitrator(
        &mut self,
        id: InstanceId,
        caller: &PartyId,
    ) -> Result<(), ArbitrationError> {
        const OP: &str = "confirm_arbitrator";
        let now = self.clock.now();
        let instance = &mut self.store.get_mut(id)?.instance;
        let role = instance.require_party(caller, OP)?;
        instance.require_status(OP, &[Configured])?;
        if instance.panel.is_empty() {
            return Err(ArbitrationError::configuration(format!(
                "{id} has no arbitrator to confirm"
            )));
        }

        match role {
            PartyRole::Claimant => instance.claimant_consent = true,
            PartyRole::Respondent => instance.respondent_consent = true,
        }
        self.events.append(
            now,
            ArbitrationEvent::ArbitratorConfirmed {
                instance: id,
                party: caller.clone(),
            },
        );
        Ok(())
    }

    // ── Claim and evidence ─────────────────────────────────────────────

    /// File the claim. Whoever files becomes the claimant.
    pub fn file_claim(
        &mut self,
        id: InstanceId,
        caller: &PartyId,
        claim: ContentDigest,
    ) -> Result<(), ArbitrationError> {
        const OP: &str = "file_claim";
        let now = self.clock.now();
        let instance = &mut self.store.get_mut(id)?.instance;
        let role = instance.require_party(caller, OP)?;
        instance.require_status(OP, &[Configured])?;
        if instance.panel.count() != usize::from(instance.config.arbitrator_count) {
            return Err(ArbitrationError::configuration(format!(
                "{id} has {} of {} arbitrator(s) seated",
                instance.panel.count(),
                instance.config.arbitrator_count
            )));
        }
        let deadline = now.plus(instance.config.evidence_window)?;

        if role == PartyRole::Respondent {
            instance.swap_roles();
        }
        instance.claim = Some(claim.clone());
        instance.filed_at = Some(now);
        instance.evidence_deadline = Some(deadline);
        instance.transition(Filed);
        self.events.append(
            now,
            ArbitrationEvent::ClaimFiled {
                instance: id,
                claimant: instance.claimant.clone(),
                respondent: instance.respondent.clone(),
                claim,
                evidence_deadline: deadline,
            },
        );
        Ok(())
    }

    /// Submit evidence while the window is open (`now <= deadline`).
    pub fn submit_evidence(
        &mut self,
        id: InstanceId,
        caller: &PartyId,
        content: ContentDigest,
    ) -> Result<(), ArbitrationError> {
        const OP: &str = "submit_evidence";
        let now = self.clock.now();
        let record = self.store.get_mut(id)?;
        let instance = &mut record.instance;
        let role = instance.require_party(caller, OP)?;
        instance.require_status(OP, &[Filed, Appealed])?;
        let deadline = evidence_deadline(instance)?;
        if now > deadline {
            return Err(window_closed(instance, "evidence", deadline, now));
        }

        record.evidence.push(Evidence {
            submitter: caller.clone(),
            content: content.clone(),
            submitted_at: now,
        });
        let counter = match role {
            PartyRole::Claimant => &mut instance.claimant_evidence_count,
            PartyRole::Respondent => &mut instance.respondent_evidence_count,
        };
        *counter = counter.saturating_add(1);
        self.events.append(
            now,
            ArbitrationEvent::EvidenceSubmitted {
                instance: id,
                submitter: caller.clone(),
                content,
            },
        );
        Ok(())
    }

    /// Close the evidence window. Before the deadline only a seated
    /// arbitrator may close it; after the deadline anyone may.
    pub fn close_evidence(
        &mut self,
        id: InstanceId,
        caller: &PartyId,
    ) -> Result<(), ArbitrationError> {
        const OP: &str = "close_evidence";
        let now = self.clock.now();
        let instance = &mut self.store.get_mut(id)?.instance;
        instance.require_status(OP, &[Filed, Appealed])?;
        let deadline = evidence_deadline(instance)?;
        if now <= deadline && !instance.panel.contains(caller) {
            return Err(instance.unauthorized(
                caller,
                OP,
                "seated arbitrator while the evidence window is open",
            ));
        }

        instance.evidence_closed_at = Some(now);
        instance.timeout_started_at = Some(now);
        instance.transition(AwaitingRuling);
        self.events.append(
            now,
            ArbitrationEvent::EvidenceClosed {
                instance: id,
                closed_by: Some(caller.clone()),
            },
        );
        Ok(())
    }

    // ── Ruling ─────────────────────────────────────────────────────────

    /// Cast (or overwrite) the caller's vote and tally.
    ///
    /// The ratio is recorded only for [`Ruling::Split`]; any other ruling
    /// stores 0.
    ///
    /// A FILED or APPEALED instance whose evidence deadline has passed is
    /// moved to AWAITING_RULING first.
    pub fn rule(
        &mut self,
        id: InstanceId,
        caller: &PartyId,
        ruling: Ruling,
        split_ratio_bps: u16,
        justification: ContentDigest,
    ) -> Result<ConsensusOutcome, ArbitrationError> {
        const OP: &str = "rule";
        let now = self.clock.now();
        let instance = &mut self.store.get_mut(id)?.instance;
        let slot = instance.require_arbitrator(caller, OP)?;
        validate_ruling(ruling, split_ratio_bps)?;
        let split_ratio_bps = ruling.effective_ratio(split_ratio_bps);
        instance.require_status(OP, &[Filed, AwaitingRuling, Appealed])?;
        let closes_evidence = instance.status != AwaitingRuling;
        if closes_evidence {
            let deadline = evidence_deadline(instance)?;
            if now <= deadline {
                return Err(window_open(instance, "evidence", deadline));
            }
        }

        let mut votes = instance.votes.clone();
        votes[slot] = Some(Vote {
            ruling,
            split_ratio_bps,
            justification,
            cast_at: now,
        });
        let outcome = VotingConsensusEngine::tally(
            instance.config.voting_method,
            instance.panel.count(),
            &votes,
            slot,
        );
        let appeal_deadline = match outcome {
            ConsensusOutcome::Finalized(_) => Some(now.plus(instance.config.appeal_window)?),
            ConsensusOutcome::Pending { .. } => None,
        };

        if closes_evidence {
            instance.evidence_closed_at = Some(now);
            instance.timeout_started_at = Some(now);
            instance.transition(AwaitingRuling);
            self.events.append(
                now,
                ArbitrationEvent::EvidenceClosed {
                    instance: id,
                    closed_by: None,
                },
            );
        }
        instance.votes = votes;
        tracing::debug!(
            instance = %id,
            arbitrator = %caller,
            slot,
            ruling = %ruling,
            split_ratio_bps,
            "vote recorded"
        );
        self.events.append(
            now,
            ArbitrationEvent::VoteCast {
                instance: id,
                arbitrator: caller.clone(),
                ruling,
                split_ratio_bps,
            },
        );

        if let (ConsensusOutcome::Finalized(vote), Some(appeal_deadline)) =
            (&outcome, appeal_deadline)
        {
            instance.ruling = vote.ruling;
            instance.split_ratio_bps = vote.split_ratio_bps;
            instance.justification = Some(vote.justification.clone());
            instance.ruled_at = Some(now);
            instance.appeal_deadline = Some(appeal_deadline);
            instance.transition(Ruled);
            self.events.append(
                now,
                ArbitrationEvent::RulingIssued {
                    instance: id,
                    ruling: vote.ruling,
                    split_ratio_bps: vote.split_ratio_bps,
                    justification: vote.justification.clone(),
                    appeal_deadline,
                },
            );
        }
        Ok(outcome)
    }

    /// Appeal the current ruling and reopen evidence.
    ///
    /// Under [`AppealArbitratorMethod::DifferentArbitrator`] the backup takes
    /// slot 0. Without a backup that is not already seated the appeal fails
    /// with [`ArbitrationError::Policy`].
    pub fn appeal(&mut self, id: InstanceId, caller: &PartyId) -> Result<(), ArbitrationError> {
        const OP: &str = "appeal";
        let now = self.clock.now();
        let instance = &mut self.store.get_mut(id)?.instance;
        instance.require_party(caller, OP)?;
        instance.require_status(OP, &[Ruled])?;
        if !instance.config.appeals_allowed {
            return Err(instance.policy(OP, "appeals are not allowed"));
        }
        if instance.appeal_count >= instance.config.max_appeals {
            return Err(instance.policy(
                OP,
                format!("appeal budget of {} is exhausted", instance.config.max_appeals),
            ));
        }
        let deadline = instance
            .appeal_deadline
            .ok_or_else(|| ArbitrationError::configuration(format!("{id} has no appeal deadline")))?;
        if now > deadline {
            return Err(window_closed(instance, "appeal", deadline, now));
        }
        let evidence_deadline = now.plus(instance.config.evidence_window)?;

        let mut panel = instance.panel.clone();
        let mut replaced = None;
        if instance.config.appeal_arbitrator_method == AppealArbitratorMethod::DifferentArbitrator {
            let backup = instance
                .config
                .backup_arbitrator
                .clone()
                .filter(|backup| !panel.contains(backup))
                .ok_or_else(|| {
                    instance.policy(OP, "no backup arbitrator is available to hear the appeal")
                })?;
            if let Some(previous) = panel.seat(0, backup.clone())? {
                replaced = Some((previous, backup));
            }
        }

        instance.reset_ruling();
        instance.panel = panel;
        instance.appeal_count += 1;
        instance.evidence_deadline = Some(evidence_deadline);
        instance.transition(Appealed);
        if let Some((previous, replacement)) = replaced {
            self.events.append(
                now,
                ArbitrationEvent::ArbitratorReplaced {
                    instance: id,
                    slot: 0,
                    previous,
                    replacement,
                },
            );
        }
        self.events.append(
            now,
            ArbitrationEvent::AppealFiled {
                instance: id,
                appellant: caller.clone(),
                appeal_count: instance.appeal_count,
            },
        );
        Ok(())
    }

    // ── Closing ────────────────────────────────────────────────────────

    /// Withdraw the dispute under the configured policy.
    pub fn withdraw(
        &mut self,
        id: InstanceId,
        caller: &PartyId,
    ) -> Result<WithdrawalOutcome, ArbitrationError> {
        const OP: &str = "withdraw";
        let now = self.clock.now();
        let record = self.store.get_mut(id)?;
        let instance = &mut record.instance;
        instance.require_party(caller, OP)?;
        instance.require_status(OP, &NON_TERMINAL)?;

        let completes = match instance.config.withdrawal_policy {
            WithdrawalPolicy::NotAllowed => {
                return Err(instance.policy(OP, "withdrawal is not allowed"));
            }
            WithdrawalPolicy::Anytime => {
                instance.require_status(OP, &[Configured, Filed, AwaitingRuling, Appealed])?;
                true
            }
            WithdrawalPolicy::Mutual => match &instance.withdrawal_requested_by {
                Some(requester) if requester != caller => true,
                Some(_) => return Ok(WithdrawalOutcome::Pending),
                None => false,
            },
        };
        if !completes {
            instance.withdrawal_requested_by = Some(caller.clone());
            self.events.append(
                now,
                ArbitrationEvent::WithdrawalRequested {
                    instance: id,
                    requested_by: caller.clone(),
                },
            );
            return Ok(WithdrawalOutcome::Pending);
        }

        let handle = Rc::clone(&record.agreement);
        let mut linked = handle.try_borrow_mut().map_err(|_| busy(OP))?;
        instance.withdrawal_requested_by = None;
        instance.closed_at = Some(now);
        instance.transition(Withdrawn);
        linked.arbitration_withdrawn(instance.dispute, id);
        drop(linked);
        self.events.append(
            now,
            ArbitrationEvent::DisputeWithdrawn {
                instance: id,
                withdrawn_by: caller.clone(),
            },
        );
        Ok(WithdrawalOutcome::Withdrawn)
    }

    /// Deliver the final ruling to the linked agreement. Anyone may call.
    ///
    /// Allowed once no appeal can still be filed: appeals disallowed,
    /// exhausted, or the appeal window has passed. If the agreement rejects
    /// the ruling the instance stays RULED.
    pub fn execute_ruling(
        &mut self,
        id: InstanceId,
        caller: &PartyId,
    ) -> Result<SettlementSummary, ArbitrationError> {
        const OP: &str = "execute_ruling";
        let now = self.clock.now();
        let record = self.store.get_mut(id)?;
        let instance = &mut record.instance;
        instance.require_status(OP, &[Ruled])?;
        if instance.appeals_remaining() {
            let deadline = instance.appeal_deadline.ok_or_else(|| {
                ArbitrationError::configuration(format!("{id} has no appeal deadline"))
            })?;
            if now <= deadline {
                return Err(window_open(instance, "appeal", deadline));
            }
        }

        let order = RulingOrder {
            instance: id,
            dispute: instance.dispute,
            ruling: instance.ruling,
            split_ratio_bps: instance.split_ratio_bps,
            arbitrator: instance.panel.get(0).cloned(),
            executed_at: now,
        };
        let handle = Rc::clone(&record.agreement);
        let applied = handle
            .try_borrow_mut()
            .map_err(|_| busy(OP))
            .and_then(|mut linked| linked.apply_ruling(&order));
        let settlement = match applied {
            Ok(settlement) => settlement,
            Err(err) => {
                tracing::warn!(
                    instance = %id,
                    caller = %caller,
                    error = %err,
                    "linked agreement rejected the ruling; instance stays RULED"
                );
                return Err(err.into());
            }
        };

        instance.closed_at = Some(now);
        instance.transition(Executed);
        self.events.append(
            now,
            ArbitrationEvent::RulingExecuted {
                instance: id,
                ruling: order.ruling,
                settlement,
            },
        );
        Ok(settlement)
    }

    // ── Replacement ────────────────────────────────────────────────────

    /// Replace an arbitrator who has not voted within the arbitrator timeout.
    ///
    /// With [`ReplacementMethod::Backup`] anyone may call and the configured
    /// backup is seated; `replacement` is ignored. With
    /// [`ReplacementMethod::CreatorPicks`] only the creator may call and
    /// `replacement` names the new arbitrator. Returns who was seated.
    pub fn replace_stalled_arbitrator(
        &mut self,
        id: InstanceId,
        caller: &PartyId,
        slot: usize,
        replacement: Option<PartyId>,
    ) -> Result<PartyId, ArbitrationError> {
        const OP: &str = "replace_stalled_arbitrator";
        let now = self.clock.now();
        let instance = &mut self.store.get_mut(id)?.instance;
        instance.require_status(OP, &[AwaitingRuling])?;
        if !instance.config.replacement_triggers.on_timeout {
            return Err(instance.policy(OP, "timeout replacement is not enabled"));
        }
        let incoming = match instance.config.replacement_method {
            ReplacementMethod::None => {
                return Err(instance.policy(OP, "no replacement method is configured"));
            }
            ReplacementMethod::Backup => instance
                .config
                .backup_arbitrator
                .clone()
                .ok_or_else(|| instance.policy(OP, "no backup arbitrator is configured"))?,
            ReplacementMethod::CreatorPicks => {
                if *caller != instance.creator {
                    return Err(instance.unauthorized(caller, OP, "instance creator"));
                }
                replacement.ok_or_else(|| {
                    ArbitrationError::configuration("the creator must name a replacement")
                })?
            }
        };
        let outgoing = instance.panel.get(slot).cloned().ok_or_else(|| {
            ArbitrationError::configuration(format!("slot {slot} of {id} is empty"))
        })?;
        if instance.votes.get(slot).and_then(Option::as_ref).is_some() {
            return Err(instance.policy(OP, format!("{outgoing} has already voted")));
        }
        let started = instance.timeout_started_at.ok_or_else(|| {
            ArbitrationError::configuration(format!("{id} has no arbitrator timeout running"))
        })?;
        let stall_deadline = started.plus(instance.config.arbitrator_timeout)?;
        if now <= stall_deadline {
            return Err(window_open(instance, "arbitrator timeout", stall_deadline));
        }
        if incoming == outgoing {
            return Err(ArbitrationError::configuration(format!(
                "{incoming} already holds slot {slot}"
            )));
        }
        if instance.is_party(&incoming) {
            return Err(ArbitrationError::configuration(format!(
                "{incoming} is a party and cannot arbitrate"
            )));
        }
        let mut panel = instance.panel.clone();
        panel.seat(slot, incoming.clone())?;

        instance.panel = panel;
        instance.timeout_started_at = Some(now);
        self.events.append(
            now,
            ArbitrationEvent::ArbitratorReplaced {
                instance: id,
                slot,
                previous: outgoing,
                replacement: incoming.clone(),
            },
        );
        Ok(incoming)
    }

    // ── Queries ────────────────────────────────────────────────────────

    /// The instance with identifier `id`.
    pub fn instance(&self, id: InstanceId) -> Result<&ArbitrationInstance, ArbitrationError> {
        self.store.get(id).map(InstanceRecord::instance)
    }

    /// Evidence submitted to `id`, in order.
    pub fn evidence(&self, id: InstanceId) -> Result<&[Evidence], ArbitrationError> {
        self.store.get(id).map(InstanceRecord::evidence)
    }

    /// Current-cycle votes of `id`, by slot.
    pub fn votes(&self, id: InstanceId) -> Result<&[Option<Vote>], ArbitrationError> {
        self.store.get(id).map(|r| &r.instance.votes[..])
    }

    /// The underlying store.
    pub fn store(&self) -> &InstanceStore {
        &self.store
    }

    /// The operator limits in force.
    pub fn limits(&self) -> &RegistryConfig {
        &self.limits
    }

    /// Number of instances ever created.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether no instance was ever created.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Buffered notifications.
    pub fn events(&self) -> &[EventRecord] {
        self.events.records()
    }

    /// Take the buffered notifications.
    pub fn drain_events(&mut self) -> Vec<EventRecord> {
        self.events.drain()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn busy(context: &str) -> DisputableError {
    DisputableError::Busy {
        context: context.to_string(),
    }
}

fn evidence_deadline(instance: &ArbitrationInstance) -> Result<Timestamp, ArbitrationError> {
    instance.evidence_deadline.ok_or_else(|| {
        ArbitrationError::configuration(format!("{} has no evidence deadline", instance.id))
    })
}

fn window_closed(
    instance: &ArbitrationInstance,
    window: &str,
    deadline: Timestamp,
    now: Timestamp,
) -> ArbitrationError {
    ArbitrationError::WindowClosed {
        instance: instance.id.to_string(),
        window: window.to_string(),
        deadline: deadline.to_iso8601(),
        now: now.to_iso8601(),
    }
}

fn window_open(instance: &ArbitrationInstance, window: &str, deadline: Timestamp) -> ArbitrationError {
    ArbitrationError::WindowOpen {
        instance: instance.id.to_string(),
        window: window.to_string(),
        deadline: deadline.to_iso8601(),
    }
}
