//! Deadline boundaries and the ways an instance closes.
//!
//! Windows are inclusive: an action at exactly the deadline is inside the
//! window, one second later is outside. Execution is gated on the appeal
//! window, withdrawal follows the configured policy, and a rejected ruling
//! callback leaves the instance RULED for a retry.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use arb_arbitration::{
    AgreementDisputeId, AgreementHandle, ArbitrationError, ArbitrationRegistry,
    ArbitrationStatus, ConsensusOutcome, Disputable, DisputableError, InstanceId, PresetId,
    RegistryConfig, Ruling, RulingOrder, WithdrawalOutcome,
};
use arb_core::{sha256_bytes, Clock, ContentDigest, ManualClock, PartyId, Timestamp};
use arb_escrow::{EscrowAgreement, EscrowConfig, ObligationStatus};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn party(name: &str) -> PartyId {
    PartyId::new(name).unwrap()
}

fn digest(label: &str) -> ContentDigest {
    sha256_bytes(label.as_bytes())
}

fn days(n: u64) -> Duration {
    Duration::from_secs(n * 86_400)
}

fn second() -> Duration {
    Duration::from_secs(1)
}

struct World {
    clock: Arc<ManualClock>,
    registry: ArbitrationRegistry,
    escrow: Rc<RefCell<EscrowAgreement>>,
}

impl World {
    fn new() -> Self {
        let clock = Arc::new(ManualClock::starting_at(
            Timestamp::from_epoch_secs(1_767_225_600).unwrap(),
        ));
        let shared: Arc<dyn Clock> = clock.clone();
        let mut escrow = EscrowAgreement::new(
            party("alice"),
            party("bob"),
            EscrowConfig::default(),
            shared.clone(),
        )
        .unwrap();
        for amount in [100, 100] {
            let index = escrow.add_obligation(&party("alice"), amount).unwrap();
            escrow.fund_obligation(&party("alice"), index).unwrap();
        }
        Self {
            clock,
            registry: ArbitrationRegistry::with_clock(RegistryConfig::default(), shared),
            escrow: escrow.shared(),
        }
    }

    fn handle(&self) -> AgreementHandle {
        self.escrow.clone()
    }

    fn raise(&self) -> AgreementDisputeId {
        self.escrow
            .borrow_mut()
            .raise_dispute(&party("alice"), digest("short shipment"))
            .unwrap()
    }

    /// A FILED instance under `preset` with alice as claimant.
    fn filed(&mut self, preset: PresetId, panel: &[PartyId]) -> (InstanceId, AgreementDisputeId) {
        let dispute = self.raise();
        let id = self
            .registry
            .create_instance(self.handle(), dispute, preset, panel, party("alice"))
            .unwrap();
        self.registry
            .file_claim(id, &party("alice"), digest("claim"))
            .unwrap();
        (id, dispute)
    }

    /// A RULED instance with a single arbitrator.
    fn ruled(&mut self, preset: PresetId) -> (InstanceId, AgreementDisputeId) {
        let (id, dispute) = self.filed(preset, &[party("arb1")]);
        self.registry.close_evidence(id, &party("arb1")).unwrap();
        self.registry
            .rule(id, &party("arb1"), Ruling::ClaimantWins, 0, digest("reasons"))
            .unwrap();
        (id, dispute)
    }

    fn status(&self, id: InstanceId) -> ArbitrationStatus {
        self.registry.instance(id).unwrap().status
    }
}

// ---------------------------------------------------------------------------
// Evidence window
// ---------------------------------------------------------------------------

#[test]
fn evidence_accepted_at_deadline_and_refused_after() {
    let mut w = World::new();
    let (id, _) = w.filed(PresetId::Simple, &[party("arb1")]);

    w.clock.advance(days(7));
    w.registry
        .submit_evidence(id, &party("bob"), digest("at deadline"))
        .unwrap();
    assert!(matches!(
        w.registry
            .rule(id, &party("arb1"), Ruling::ClaimantWins, 0, digest("early")),
        Err(ArbitrationError::WindowOpen { .. })
    ));

    w.clock.advance(second());
    assert!(matches!(
        w.registry
            .submit_evidence(id, &party("bob"), digest("late")),
        Err(ArbitrationError::WindowClosed { .. })
    ));
    assert_eq!(w.registry.evidence(id).unwrap().len(), 1);
    assert_eq!(w.registry.instance(id).unwrap().respondent_evidence_count, 1);
}

#[test]
fn ruling_after_deadline_closes_evidence_itself() {
    let mut w = World::new();
    let (id, _) = w.filed(PresetId::Simple, &[party("arb1")]);
    w.clock.advance(days(7) + second());

    w.registry
        .rule(id, &party("arb1"), Ruling::Split, 2500, digest("reasons"))
        .unwrap();
    let instance = w.registry.instance(id).unwrap();
    assert_eq!(instance.status, ArbitrationStatus::Ruled);
    assert!(instance.evidence_closed_at.is_some());
    assert_eq!(instance.split_ratio_bps, 2500);
}

#[test]
fn only_arbitrator_closes_early_anyone_closes_late() {
    let mut w = World::new();
    let (id, _) = w.filed(PresetId::Simple, &[party("arb1")]);
    assert!(matches!(
        w.registry.close_evidence(id, &party("alice")),
        Err(ArbitrationError::Unauthorized { .. })
    ));

    w.clock.advance(days(7) + second());
    w.registry.close_evidence(id, &party("carol")).unwrap();
    assert_eq!(w.status(id), ArbitrationStatus::AwaitingRuling);
}

// ---------------------------------------------------------------------------
// Execution gating
// ---------------------------------------------------------------------------

#[test]
fn execution_waits_for_appeal_window() {
    let mut w = World::new();
    let (id, _) = w.ruled(PresetId::Balanced);

    w.clock.advance(days(7));
    assert!(matches!(
        w.registry.execute_ruling(id, &party("carol")),
        Err(ArbitrationError::WindowOpen { .. })
    ));

    w.clock.advance(second());
    assert!(matches!(
        w.registry.appeal(id, &party("bob")),
        Err(ArbitrationError::WindowClosed { .. })
    ));
    let summary = w.registry.execute_ruling(id, &party("carol")).unwrap();
    assert_eq!(summary.released, 200);
    assert_eq!(w.status(id), ArbitrationStatus::Executed);
}

#[test]
fn failed_callback_leaves_instance_ruled() {
    let mut w = World::new();
    let (id, _) = w.ruled(PresetId::Simple);

    let escrow = w.escrow.clone();
    let held = escrow.borrow();
    assert!(matches!(
        w.registry.execute_ruling(id, &party("bob")),
        Err(ArbitrationError::Agreement(DisputableError::Busy { .. }))
    ));
    drop(held);
    assert_eq!(w.status(id), ArbitrationStatus::Ruled);
    assert!(w.registry.instance(id).unwrap().closed_at.is_none());

    w.registry.execute_ruling(id, &party("bob")).unwrap();
    assert_eq!(w.status(id), ArbitrationStatus::Executed);
}

#[test]
fn ruling_applies_once() {
    let mut w = World::new();
    let (id, dispute) = w.ruled(PresetId::Simple);
    w.registry.execute_ruling(id, &party("bob")).unwrap();

    assert!(matches!(
        w.registry.execute_ruling(id, &party("bob")),
        Err(ArbitrationError::InvalidState { .. })
    ));

    let replay = RulingOrder {
        instance: id,
        dispute,
        ruling: Ruling::RespondentWins,
        split_ratio_bps: 0,
        arbitrator: Some(party("arb1")),
        executed_at: w.clock.now(),
    };
    assert!(matches!(
        w.escrow.borrow_mut().apply_ruling(&replay),
        Err(DisputableError::AlreadyResolved { .. })
    ));
    let statuses: Vec<ObligationStatus> =
        w.escrow.borrow().obligations().iter().map(|o| o.status).collect();
    assert_eq!(statuses, vec![ObligationStatus::Released; 2]);
}

// ---------------------------------------------------------------------------
// Withdrawal
// ---------------------------------------------------------------------------

#[test]
fn mutual_withdrawal_needs_both_parties() {
    let mut w = World::new();
    let (id, dispute) = w.filed(PresetId::Balanced, &[party("arb1")]);

    assert_eq!(
        w.registry.withdraw(id, &party("alice")).unwrap(),
        WithdrawalOutcome::Pending
    );
    assert_eq!(
        w.registry.withdraw(id, &party("alice")).unwrap(),
        WithdrawalOutcome::Pending
    );
    assert_eq!(w.status(id), ArbitrationStatus::Filed);

    assert_eq!(
        w.registry.withdraw(id, &party("bob")).unwrap(),
        WithdrawalOutcome::Withdrawn
    );
    assert_eq!(w.status(id), ArbitrationStatus::Withdrawn);
    assert!(w.registry.instance(id).unwrap().status.is_terminal());

    // The agreement is free again.
    let mut escrow = w.escrow.borrow_mut();
    assert!(escrow.dispute(dispute).unwrap().withdrawn);
    escrow.release_obligation(&party("alice"), 0).unwrap();
    escrow
        .raise_dispute(&party("bob"), digest("second thoughts"))
        .unwrap();
}

#[test]
fn anytime_withdrawal_refused_once_ruled() {
    let mut w = World::new();
    let (id, _) = w.ruled(PresetId::Simple);
    assert!(matches!(
        w.registry.withdraw(id, &party("alice")),
        Err(ArbitrationError::InvalidState { .. })
    ));
}

#[test]
fn outsiders_cannot_withdraw() {
    let mut w = World::new();
    let (id, _) = w.filed(PresetId::Simple, &[party("arb1")]);
    assert!(matches!(
        w.registry.withdraw(id, &party("arb1")),
        Err(ArbitrationError::Unauthorized { .. })
    ));
    assert_eq!(
        w.registry.withdraw(id, &party("bob")).unwrap(),
        WithdrawalOutcome::Withdrawn
    );
}

// ---------------------------------------------------------------------------
// Stalled arbitrators
// ---------------------------------------------------------------------------

#[test]
fn creator_replaces_stalled_panel_member() {
    let mut w = World::new();
    let panel = [party("arb1"), party("arb2"), party("arb3")];
    let (id, _) = w.filed(PresetId::Panel, &panel);
    w.registry.close_evidence(id, &party("arb1")).unwrap();
    w.registry
        .rule(id, &party("arb1"), Ruling::ClaimantWins, 0, digest("a"))
        .unwrap();

    w.clock.advance(days(30));
    assert!(matches!(
        w.registry
            .replace_stalled_arbitrator(id, &party("alice"), 1, Some(party("arb4"))),
        Err(ArbitrationError::WindowOpen { .. })
    ));

    w.clock.advance(second());
    assert!(matches!(
        w.registry
            .replace_stalled_arbitrator(id, &party("bob"), 1, Some(party("arb4"))),
        Err(ArbitrationError::Unauthorized { .. })
    ));
    assert!(matches!(
        w.registry
            .replace_stalled_arbitrator(id, &party("alice"), 0, Some(party("arb4"))),
        Err(ArbitrationError::Policy { .. })
    ));
    let seated = w
        .registry
        .replace_stalled_arbitrator(id, &party("alice"), 1, Some(party("arb4")))
        .unwrap();
    assert_eq!(seated, party("arb4"));

    let outcome = w
        .registry
        .rule(id, &party("arb4"), Ruling::ClaimantWins, 0, digest("b"))
        .unwrap();
    assert!(matches!(outcome, ConsensusOutcome::Finalized(_)));
}
