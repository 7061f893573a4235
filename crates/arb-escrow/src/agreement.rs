//! # Escrow Agreement
//!
//! A two-party agreement that holds a list of obligations in escrow and can
//! hand a dispute over to an arbitration registry.
//!
//! ## Lifecycle
//!
//! 1. The depositor declares and funds obligations.
//! 2. Outside a dispute, the depositor releases funded obligations to the
//!    beneficiary as work is accepted.
//! 3. Either party raises a dispute. While it is open, obligations are
//!    frozen.
//! 4. The registry links an arbitration instance to the dispute and, once
//!    the ruling is final, calls [`Disputable::apply_ruling`]. The
//!    [`RulingSettlementCalculator`] decides which outstanding obligations
//!    are released and which refunded. A second call for the same dispute
//!    fails with [`DisputableError::AlreadyResolved`] and moves nothing.
//! 5. If enabled, a rating window opens for the presiding arbitrator.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use arb_arbitration::{
    AgreementDisputeId, Disputable, DisputableError, InstanceId, RulingOrder, SettlementSummary,
};
use arb_core::{AgreementId, Clock, ContentDigest, PartyId, Timestamp};

use crate::config::EscrowConfig;
use crate::error::EscrowError;
use crate::obligation::Obligation;
use crate::rating::RatingWindow;
use crate::settlement::{RulingSettlementCalculator, SettlementReport};

/// One dispute raised on the agreement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisputeRecord {
    /// The dispute identifier.
    pub id: AgreementDisputeId,
    /// The raising party.
    pub raised_by: PartyId,
    /// The other party.
    pub counterparty: PartyId,
    /// Digest of the stated reason.
    pub reason: ContentDigest,
    /// When it was raised.
    pub raised_at: Timestamp,
    /// The linked arbitration instance.
    pub instance: Option<InstanceId>,
    /// The applied settlement.
    pub report: Option<SettlementReport>,
    /// Whether the arbitration was withdrawn.
    pub withdrawn: bool,
}

impl DisputeRecord {
    /// Whether a ruling was applied.
    pub fn is_resolved(&self) -> bool {
        self.report.is_some()
    }

    /// Neither resolved nor withdrawn.
    pub fn is_open(&self) -> bool {
        !self.is_resolved() && !self.withdrawn
    }
}

/// Reference linked agreement: escrowed obligations between a depositor and
/// a beneficiary.
pub struct EscrowAgreement {
    id: AgreementId,
    depositor: PartyId,
    beneficiary: PartyId,
    obligations: Vec<Obligation>,
    disputes: BTreeMap<AgreementDisputeId, DisputeRecord>,
    ratings: BTreeMap<AgreementDisputeId, RatingWindow>,
    next_dispute: u64,
    config: EscrowConfig,
    clock: Arc<dyn Clock>,
}

impl EscrowAgreement {
    /// Create an agreement between two distinct parties.
    pub fn new(
        depositor: PartyId,
        beneficiary: PartyId,
        config: EscrowConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, EscrowError> {
        if depositor == beneficiary {
            return Err(EscrowError::InvalidParties(format!(
                "{depositor} cannot be both depositor and beneficiary"
            )));
        }
        Ok(Self {
            id: AgreementId::new(),
            depositor,
            beneficiary,
            obligations: Vec::new(),
            disputes: BTreeMap::new(),
            ratings: BTreeMap::new(),
            next_dispute: 1,
            config,
            clock,
        })
    }

    /// Wrap for sharing with an arbitration registry.
    pub fn shared(self) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(self))
    }

    // ── Obligations ────────────────────────────────────────────────────

    /// Declare a pending obligation. Depositor only. Returns its index.
    pub fn add_obligation(&mut self, caller: &PartyId, amount: u64) -> Result<usize, EscrowError> {
        self.require_depositor(caller, "add_obligation")?;
        let index = self.obligations.len();
        self.obligations.push(Obligation::new(index, amount)?);
        Ok(index)
    }

    /// Fund a pending obligation. Depositor only.
    pub fn fund_obligation(&mut self, caller: &PartyId, index: usize) -> Result<(), EscrowError> {
        self.require_depositor(caller, "fund_obligation")?;
        let now = self.clock.now();
        self.obligation_mut(index)?.fund(now)
    }

    /// Release a funded obligation to the beneficiary outside any dispute.
    /// Depositor only.
    pub fn release_obligation(&mut self, caller: &PartyId, index: usize) -> Result<(), EscrowError> {
        self.require_depositor(caller, "release_obligation")?;
        if let Some(open) = self.disputes.values().find(|d| d.is_open()) {
            return Err(EscrowError::InvalidObligation {
                index,
                reason: format!("frozen while {} is open", open.id),
            });
        }
        let now = self.clock.now();
        self.obligation_mut(index)?.release(now)
    }

    // ── Disputes ───────────────────────────────────────────────────────

    /// Raise a dispute over the outstanding obligations. Either party.
    ///
    /// At most one dispute is open at a time.
    pub fn raise_dispute(
        &mut self,
        caller: &PartyId,
        reason: ContentDigest,
    ) -> Result<AgreementDisputeId, EscrowError> {
        let counterparty = if *caller == self.depositor {
            self.beneficiary.clone()
        } else if *caller == self.beneficiary {
            self.depositor.clone()
        } else {
            return Err(EscrowError::Unauthorized {
                caller: caller.to_string(),
                operation: "raise_dispute".to_string(),
                required: "depositor or beneficiary".to_string(),
            });
        };
        if let Some(open) = self.disputes.values().find(|d| d.is_open()) {
            return Err(EscrowError::DisputeOpen(open.id.to_string()));
        }
        if RulingSettlementCalculator::outstanding_total(&self.obligations)? == 0 {
            return Err(EscrowError::InvalidObligation {
                index: self.obligations.len(),
                reason: "nothing outstanding to dispute".to_string(),
            });
        }

        let id = AgreementDisputeId(self.next_dispute);
        self.next_dispute += 1;
        self.disputes.insert(
            id,
            DisputeRecord {
                id,
                raised_by: caller.clone(),
                counterparty,
                reason,
                raised_at: self.clock.now(),
                instance: None,
                report: None,
                withdrawn: false,
            },
        );
        tracing::info!(agreement = %self.id, dispute = %id, raised_by = %caller, "dispute raised");
        Ok(id)
    }

    /// Rate the arbitrator of a settled dispute. Disputing parties only.
    pub fn rate_arbitrator(
        &mut self,
        caller: &PartyId,
        dispute: AgreementDisputeId,
        score: u8,
    ) -> Result<(), EscrowError> {
        if *caller != self.depositor && *caller != self.beneficiary {
            return Err(EscrowError::Unauthorized {
                caller: caller.to_string(),
                operation: "rate_arbitrator".to_string(),
                required: "depositor or beneficiary".to_string(),
            });
        }
        let now = self.clock.now();
        let window = self
            .ratings
            .get_mut(&dispute)
            .ok_or_else(|| EscrowError::RatingClosed {
                dispute: dispute.to_string(),
                reason: "no rating window was opened".to_string(),
            })?;
        window.rate(caller, score, now)
    }

    // ── Queries ────────────────────────────────────────────────────────

    /// The agreement identifier.
    pub fn id(&self) -> AgreementId {
        self.id
    }

    /// The depositor.
    pub fn depositor(&self) -> &PartyId {
        &self.depositor
    }

    /// The beneficiary.
    pub fn beneficiary(&self) -> &PartyId {
        &self.beneficiary
    }

    /// Every obligation in stored order.
    pub fn obligations(&self) -> &[Obligation] {
        &self.obligations
    }

    /// Sum of outstanding obligations.
    pub fn outstanding_total(&self) -> Result<u64, EscrowError> {
        RulingSettlementCalculator::outstanding_total(&self.obligations)
    }

    /// A dispute record.
    pub fn dispute(&self, id: AgreementDisputeId) -> Option<&DisputeRecord> {
        self.disputes.get(&id)
    }

    /// The rating window of a settled dispute.
    pub fn rating(&self, id: AgreementDisputeId) -> Option<&RatingWindow> {
        self.ratings.get(&id)
    }

    // ── Internals ──────────────────────────────────────────────────────

    fn require_depositor(&self, caller: &PartyId, operation: &str) -> Result<(), EscrowError> {
        if *caller != self.depositor {
            return Err(EscrowError::Unauthorized {
                caller: caller.to_string(),
                operation: operation.to_string(),
                required: "depositor".to_string(),
            });
        }
        Ok(())
    }

    fn obligation_mut(&mut self, index: usize) -> Result<&mut Obligation, EscrowError> {
        self.obligations
            .get_mut(index)
            .ok_or_else(|| EscrowError::InvalidObligation {
                index,
                reason: "no such obligation".to_string(),
            })
    }

    fn settle(&mut self, order: &RulingOrder) -> Result<SettlementSummary, EscrowError> {
        let record = self
            .disputes
            .get(&order.dispute)
            .ok_or_else(|| EscrowError::UnknownDispute(order.dispute.to_string()))?;
        if record.is_resolved() {
            return Err(EscrowError::AlreadyResolved {
                dispute: order.dispute.to_string(),
            });
        }
        if record.instance != Some(order.instance) || record.withdrawn {
            return Err(EscrowError::NotLinked {
                dispute: order.dispute.to_string(),
                instance: order.instance.to_string(),
            });
        }
        let plan = RulingSettlementCalculator::plan(
            order.ruling,
            order.split_ratio_bps,
            &self.obligations,
        )?;
        let rating = match (&order.arbitrator, self.config.rating_enabled) {
            (Some(arbitrator), true) => Some(
                RatingWindow::open(
                    order.dispute,
                    arbitrator.clone(),
                    order.executed_at,
                    self.config.rating_window,
                )
                .map_err(|e| EscrowError::InvalidRuling(e.to_string()))?,
            ),
            (None, true) => {
                tracing::warn!(
                    agreement = %self.id,
                    dispute = %order.dispute,
                    "arbitrator identity unavailable; rating window skipped"
                );
                None
            }
            (_, false) => None,
        };

        // Every check has passed; the plan only names funded obligations.
        for &index in &plan.releases {
            self.obligation_mut(index)?.release(order.executed_at)?;
        }
        for &index in &plan.refunds {
            self.obligation_mut(index)?.refund(order.executed_at)?;
        }
        let summary = SettlementSummary {
            released: plan.released,
            refunded: plan.refunded,
        };
        let report = SettlementReport {
            dispute: order.dispute,
            instance: order.instance,
            ruling: order.ruling,
            split_ratio_bps: order.split_ratio_bps,
            arbitrator: order.arbitrator.clone(),
            plan,
            settled_at: order.executed_at,
        };
        if let Some(record) = self.disputes.get_mut(&order.dispute) {
            record.report = Some(report);
        }
        if let Some(window) = rating {
            self.ratings.insert(order.dispute, window);
        }
        tracing::info!(
            agreement = %self.id,
            dispute = %order.dispute,
            ruling = %order.ruling,
            released = summary.released,
            refunded = summary.refunded,
            "ruling settled"
        );
        Ok(summary)
    }
}

impl Disputable for EscrowAgreement {
    fn agreement_id(&self) -> AgreementId {
        self.id
    }

    fn is_disputable(&self, dispute: AgreementDisputeId) -> bool {
        self.disputes
            .get(&dispute)
            .is_some_and(|d| d.is_open() && d.instance.is_none())
    }

    fn dispute_parties(
        &self,
        dispute: AgreementDisputeId,
    ) -> Result<(PartyId, PartyId), DisputableError> {
        self.disputes
            .get(&dispute)
            .map(|d| (d.raised_by.clone(), d.counterparty.clone()))
            .ok_or_else(|| EscrowError::UnknownDispute(dispute.to_string()).into_disputable(self.id))
    }

    fn link_arbitration(
        &mut self,
        dispute: AgreementDisputeId,
        instance: InstanceId,
    ) -> Result<(), DisputableError> {
        let agreement = self.id;
        let record = self.disputes.get_mut(&dispute).ok_or_else(|| {
            EscrowError::UnknownDispute(dispute.to_string()).into_disputable(agreement)
        })?;
        if let Some(existing) = record.instance {
            return Err(DisputableError::AlreadyLinked {
                agreement: agreement.to_string(),
                dispute: dispute.to_string(),
                instance: existing.to_string(),
            });
        }
        if !record.is_open() {
            return Err(EscrowError::AlreadyResolved {
                dispute: dispute.to_string(),
            }
            .into_disputable(agreement));
        }
        record.instance = Some(instance);
        tracing::info!(agreement = %agreement, dispute = %dispute, instance = %instance, "arbitration linked");
        Ok(())
    }

    fn apply_ruling(&mut self, order: &RulingOrder) -> Result<SettlementSummary, DisputableError> {
        self.settle(order).map_err(|e| e.into_disputable(self.id))
    }

    fn is_linked(&self, dispute: AgreementDisputeId) -> bool {
        self.disputes
            .get(&dispute)
            .is_some_and(|d| d.instance.is_some())
    }

    fn is_resolved(&self, dispute: AgreementDisputeId) -> bool {
        self.disputes
            .get(&dispute)
            .is_some_and(DisputeRecord::is_resolved)
    }

    fn arbitration_withdrawn(&mut self, dispute: AgreementDisputeId, instance: InstanceId) {
        match self.disputes.get_mut(&dispute) {
            Some(record) if record.instance == Some(instance) => {
                record.withdrawn = true;
                tracing::info!(agreement = %self.id, dispute = %dispute, "arbitration withdrawn; obligations unfrozen");
            }
            _ => tracing::warn!(
                agreement = %self.id,
                dispute = %dispute,
                instance = %instance,
                "withdrawal notice for a dispute not linked to that instance"
            ),
        }
    }
}
