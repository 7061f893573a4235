//! # Ruling Settlement
//!
//! Decides which outstanding obligations a final ruling releases to the
//! beneficiary and which it refunds to the depositor.
//!
//! - Claimant wins: release every outstanding obligation.
//! - Respondent wins: refund every outstanding obligation.
//! - Split at `r` basis points: `target = outstanding * r / 10000`. Walk the
//!   obligations in stored order releasing whole obligations while the
//!   running total plus the next one stays within the target. From the first
//!   obligation that would overshoot, refund it and every later one.
//!
//! Settlement is obligation-granular, so with uneven amounts the realized
//! ratio only approximates the requested one. Released plus refunded always
//! equals the outstanding total.

use serde::{Deserialize, Serialize};

use arb_arbitration::{AgreementDisputeId, InstanceId, Ruling, MAX_BASIS_POINTS};
use arb_core::{PartyId, Timestamp};

use crate::error::EscrowError;
use crate::obligation::Obligation;

/// What a ruling does to each outstanding obligation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementPlan {
    /// Obligation indices to release, in order.
    pub releases: Vec<usize>,
    /// Obligation indices to refund, in order.
    pub refunds: Vec<usize>,
    /// Total to release.
    pub released: u64,
    /// Total to refund.
    pub refunded: u64,
}

impl SettlementPlan {
    /// Everything the plan moves.
    pub fn total(&self) -> u64 {
        self.released.saturating_add(self.refunded)
    }
}

/// Record of an applied ruling, kept by the agreement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementReport {
    /// The settled dispute.
    pub dispute: AgreementDisputeId,
    /// The instance that delivered the ruling.
    pub instance: InstanceId,
    /// The applied ruling.
    pub ruling: Ruling,
    /// The applied split ratio.
    pub split_ratio_bps: u16,
    /// The presiding arbitrator, when known.
    pub arbitrator: Option<PartyId>,
    /// The plan that was executed.
    pub plan: SettlementPlan,
    /// When it was applied.
    pub settled_at: Timestamp,
}

/// Stateless settlement arithmetic.
pub struct RulingSettlementCalculator;

impl RulingSettlementCalculator {
    /// Sum of outstanding obligation amounts.
    pub fn outstanding_total(obligations: &[Obligation]) -> Result<u64, EscrowError> {
        obligations
            .iter()
            .filter(|o| o.is_outstanding())
            .try_fold(0u64, |acc, o| acc.checked_add(o.amount))
            .ok_or_else(|| EscrowError::AmountOverflow("summing outstanding obligations".to_string()))
    }

    /// Plan the settlement of `ruling` over `obligations`.
    ///
    /// # Errors
    ///
    /// [`EscrowError::InvalidRuling`] for [`Ruling::None`] or a split ratio
    /// above 10000 basis points; [`EscrowError::AmountOverflow`] if the
    /// outstanding total does not fit in `u64`. The ratio of a non-split
    /// ruling is ignored.
    pub fn plan(
        ruling: Ruling,
        split_ratio_bps: u16,
        obligations: &[Obligation],
    ) -> Result<SettlementPlan, EscrowError> {
        if ruling == Ruling::Split && split_ratio_bps > MAX_BASIS_POINTS {
            return Err(EscrowError::InvalidRuling(format!(
                "split ratio {split_ratio_bps} bps exceeds {MAX_BASIS_POINTS}"
            )));
        }
        let outstanding = Self::outstanding_total(obligations)?;
        let pending = obligations.iter().filter(|o| o.is_outstanding());
        let mut plan = SettlementPlan::default();

        match ruling {
            Ruling::None => {
                return Err(EscrowError::InvalidRuling("no ruling to settle".to_string()));
            }
            Ruling::ClaimantWins => {
                plan.releases = pending.map(|o| o.index).collect();
                plan.released = outstanding;
            }
            Ruling::RespondentWins => {
                plan.refunds = pending.map(|o| o.index).collect();
                plan.refunded = outstanding;
            }
            Ruling::Split => {
                let target = u128::from(outstanding) * u128::from(split_ratio_bps)
                    / u128::from(MAX_BASIS_POINTS);
                let mut running: u128 = 0;
                let mut overshot = false;
                for obligation in pending {
                    let amount = u128::from(obligation.amount);
                    if !overshot && running + amount <= target {
                        running += amount;
                        plan.releases.push(obligation.index);
                        plan.released += obligation.amount;
                    } else {
                        overshot = true;
                        plan.refunds.push(obligation.index);
                        plan.refunded += obligation.amount;
                    }
                }
            }
        }
        Ok(plan)
    }
}
