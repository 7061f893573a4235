//! End-to-end dispute flows between an escrow agreement and the
//! arbitration registry.
//!
//! Each test drives a real [`EscrowAgreement`] through the registry with a
//! shared manual clock: raise a dispute, configure an instance, file, rule,
//! appeal where allowed, execute, and check the obligations that moved.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use arb_arbitration::{
    AgreementDisputeId, AgreementHandle, ArbitrationError, ArbitrationRegistry,
    ArbitrationStatus, ConsensusOutcome, InstanceId, PresetCatalogue, PresetId, RegistryConfig,
    Ruling, SettlementSummary, VotingMethod,
};
use arb_core::{sha256_bytes, Clock, ContentDigest, ManualClock, PartyId, Timestamp};
use arb_escrow::{EscrowAgreement, EscrowConfig, ObligationStatus};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const DAY: u64 = 86_400;

fn party(name: &str) -> PartyId {
    PartyId::new(name).unwrap()
}

fn digest(label: &str) -> ContentDigest {
    sha256_bytes(label.as_bytes())
}

fn days(n: u64) -> Duration {
    Duration::from_secs(n * DAY)
}

struct World {
    clock: Arc<ManualClock>,
    registry: ArbitrationRegistry,
    escrow: Rc<RefCell<EscrowAgreement>>,
}

impl World {
    /// alice deposits, bob receives, every amount is funded.
    fn new(amounts: &[u64]) -> Self {
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
        for &amount in amounts {
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

    fn raise(&self, by: &str) -> AgreementDisputeId {
        self.escrow
            .borrow_mut()
            .raise_dispute(&party(by), digest("late delivery"))
            .unwrap()
    }

    fn statuses(&self) -> Vec<ObligationStatus> {
        self.escrow
            .borrow()
            .obligations()
            .iter()
            .map(|o| o.status)
            .collect()
    }

    fn status(&self, id: InstanceId) -> ArbitrationStatus {
        self.registry.instance(id).unwrap().status
    }
}

// ---------------------------------------------------------------------------
// SIMPLE preset
// ---------------------------------------------------------------------------

#[test]
fn simple_claimant_wins_releases_outstanding_obligations() {
    let mut w = World::new(&[100, 200, 300]);
    w.escrow
        .borrow_mut()
        .release_obligation(&party("alice"), 0)
        .unwrap();
    let dispute = w.raise("bob");

    let id = w
        .registry
        .create_instance(w.handle(), dispute, PresetId::Simple, &[party("arb1")], party("bob"))
        .unwrap();
    assert_eq!(w.escrow.borrow().dispute(dispute).unwrap().instance, Some(id));

    w.registry
        .file_claim(id, &party("bob"), digest("claim"))
        .unwrap();
    w.registry
        .submit_evidence(id, &party("bob"), digest("invoice"))
        .unwrap();
    w.clock.advance(days(8));

    let outcome = w
        .registry
        .rule(id, &party("arb1"), Ruling::ClaimantWins, 0, digest("reasons"))
        .unwrap();
    assert!(matches!(outcome, ConsensusOutcome::Finalized(_)));
    assert_eq!(w.status(id), ArbitrationStatus::Ruled);

    // No appeals under SIMPLE, so anyone may execute at once.
    let summary = w.registry.execute_ruling(id, &party("carol")).unwrap();
    assert_eq!(
        summary,
        SettlementSummary {
            released: 500,
            refunded: 0
        }
    );
    assert_eq!(w.status(id), ArbitrationStatus::Executed);
    assert_eq!(
        w.statuses(),
        vec![ObligationStatus::Released; 3],
        "the pre-released obligation stays released"
    );

    let escrow = w.escrow.borrow();
    let record = escrow.dispute(dispute).unwrap();
    assert!(record.is_resolved());
    assert_eq!(record.report.as_ref().unwrap().plan.releases, vec![1, 2]);
    assert_eq!(escrow.outstanding_total().unwrap(), 0);
}

#[test]
fn simple_event_trail_in_order() {
    let mut w = World::new(&[100]);
    let dispute = w.raise("alice");
    let id = w
        .registry
        .create_instance(w.handle(), dispute, PresetId::Simple, &[party("arb1")], party("alice"))
        .unwrap();
    w.registry
        .file_claim(id, &party("alice"), digest("claim"))
        .unwrap();
    w.clock.advance(days(7) + Duration::from_secs(1));
    w.registry
        .rule(id, &party("arb1"), Ruling::RespondentWins, 0, digest("reasons"))
        .unwrap();
    w.registry.execute_ruling(id, &party("alice")).unwrap();

    let kinds: Vec<&str> = w.registry.events().iter().map(|r| r.event.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            "instance_created",
            "claim_filed",
            "evidence_closed",
            "vote_cast",
            "ruling_issued",
            "ruling_executed",
        ]
    );
    let sequences: Vec<u64> = w.registry.events().iter().map(|r| r.sequence).collect();
    assert!(sequences.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(w.statuses(), vec![ObligationStatus::Refunded]);
}

#[test]
fn respondent_filing_swaps_roles() {
    let mut w = World::new(&[100]);
    let dispute = w.raise("alice");
    let id = w
        .registry
        .create_instance(w.handle(), dispute, PresetId::Simple, &[party("arb1")], party("alice"))
        .unwrap();
    assert_eq!(w.registry.instance(id).unwrap().claimant, party("alice"));

    w.registry
        .submit_evidence(id, &party("bob"), digest("early"))
        .unwrap_err();
    w.registry
        .file_claim(id, &party("bob"), digest("claim"))
        .unwrap();

    let instance = w.registry.instance(id).unwrap();
    assert_eq!(instance.claimant, party("bob"));
    assert_eq!(instance.respondent, party("alice"));
    assert_eq!(instance.status, ArbitrationStatus::Filed);
}

#[test]
fn rating_window_follows_settlement() {
    let mut w = World::new(&[100, 100]);
    let dispute = w.raise("bob");
    let id = w
        .registry
        .create_instance(w.handle(), dispute, PresetId::Simple, &[party("arb1")], party("bob"))
        .unwrap();
    w.registry
        .file_claim(id, &party("bob"), digest("claim"))
        .unwrap();
    w.clock.advance(days(8));
    w.registry
        .rule(id, &party("arb1"), Ruling::ClaimantWins, 0, digest("reasons"))
        .unwrap();
    w.registry.execute_ruling(id, &party("bob")).unwrap();

    w.escrow
        .borrow_mut()
        .rate_arbitrator(&party("alice"), dispute, 2)
        .unwrap();
    w.escrow
        .borrow_mut()
        .rate_arbitrator(&party("bob"), dispute, 5)
        .unwrap();
    assert!(w
        .escrow
        .borrow_mut()
        .rate_arbitrator(&party("bob"), dispute, 1)
        .is_err());
    assert!(w
        .escrow
        .borrow_mut()
        .rate_arbitrator(&party("arb1"), dispute, 5)
        .is_err());

    let escrow = w.escrow.borrow();
    let window = escrow.rating(dispute).unwrap();
    assert_eq!(window.arbitrator, party("arb1"));
    assert_eq!(window.average(), Some(3.5));
}

// ---------------------------------------------------------------------------
// BALANCED with an appeal
// ---------------------------------------------------------------------------

#[test]
fn balanced_appeal_is_heard_by_backup_and_split_settles() {
    let mut w = World::new(&[100, 100, 100]);
    let dispute = w.raise("alice");

    let mut config = PresetCatalogue::balanced();
    config.backup_arbitrator = Some(party("arb2"));
    let id = w
        .registry
        .create_instance_custom(w.handle(), dispute, config, &[party("arb1")], party("alice"))
        .unwrap();
    assert_eq!(w.registry.instance(id).unwrap().config.preset, PresetId::Custom);

    w.registry.confirm_arbitrator(id, &party("alice")).unwrap();
    w.registry.confirm_arbitrator(id, &party("bob")).unwrap();
    w.registry
        .file_claim(id, &party("alice"), digest("claim"))
        .unwrap();
    w.registry
        .submit_evidence(id, &party("alice"), digest("contract"))
        .unwrap();
    w.registry
        .submit_evidence(id, &party("bob"), digest("receipt"))
        .unwrap();
    w.clock.advance(days(15));
    w.registry
        .rule(id, &party("arb1"), Ruling::RespondentWins, 0, digest("first"))
        .unwrap();

    // The appeal window is still open.
    assert!(matches!(
        w.registry.execute_ruling(id, &party("bob")),
        Err(ArbitrationError::WindowOpen { .. })
    ));

    w.clock.advance(days(1));
    w.registry.appeal(id, &party("alice")).unwrap();
    let instance = w.registry.instance(id).unwrap();
    assert_eq!(instance.status, ArbitrationStatus::Appealed);
    assert_eq!(instance.appeal_count, 1);
    assert_eq!(instance.ruling, Ruling::None);
    assert_eq!(instance.panel.get(0), Some(&party("arb2")));
    assert_eq!(instance.claimant_evidence_count, 1);
    assert_eq!(instance.respondent_evidence_count, 1);

    // The replaced arbitrator no longer sits.
    w.clock.advance(days(15));
    assert!(matches!(
        w.registry
            .rule(id, &party("arb1"), Ruling::ClaimantWins, 0, digest("stale")),
        Err(ArbitrationError::Unauthorized { .. })
    ));
    w.registry
        .rule(id, &party("arb2"), Ruling::Split, 5000, digest("second"))
        .unwrap();

    // Budget exhausted: execution needs no waiting.
    let summary = w.registry.execute_ruling(id, &party("bob")).unwrap();
    assert_eq!(summary.released, 100);
    assert_eq!(summary.refunded, 200);
    assert_eq!(summary.total(), 300);
    assert_eq!(
        w.statuses(),
        vec![
            ObligationStatus::Released,
            ObligationStatus::Refunded,
            ObligationStatus::Refunded,
        ]
    );
    assert_eq!(
        w.escrow.borrow().rating(dispute).unwrap().arbitrator,
        party("arb2")
    );
}

#[test]
fn preset_appeal_needs_a_named_backup() {
    let mut w = World::new(&[100]);
    let dispute = w.raise("alice");
    let id = w
        .registry
        .create_instance(w.handle(), dispute, PresetId::Balanced, &[party("arb1")], party("alice"))
        .unwrap();
    w.registry
        .file_claim(id, &party("alice"), digest("claim"))
        .unwrap();
    w.clock.advance(days(15));
    w.registry
        .rule(id, &party("arb1"), Ruling::RespondentWins, 0, digest("first"))
        .unwrap();

    // The sitting arbitrator never hears its own appeal.
    assert!(matches!(
        w.registry.appeal(id, &party("alice")),
        Err(ArbitrationError::Policy { .. })
    ));
    let instance = w.registry.instance(id).unwrap();
    assert_eq!(instance.status, ArbitrationStatus::Ruled);
    assert_eq!(instance.panel.get(0), Some(&party("arb1")));
}

#[test]
fn second_appeal_is_refused() {
    let mut w = World::new(&[100]);
    let dispute = w.raise("alice");
    let id = w
        .registry
        .create_instance(w.handle(), dispute, PresetId::Balanced, &[party("arb1")], party("alice"))
        .unwrap();
    w.registry
        .set_backup_arbitrator(id, &party("alice"), party("arb2"))
        .unwrap();
    w.registry
        .file_claim(id, &party("alice"), digest("claim"))
        .unwrap();
    w.clock.advance(days(15));
    w.registry
        .rule(id, &party("arb1"), Ruling::RespondentWins, 0, digest("first"))
        .unwrap();
    w.registry.appeal(id, &party("alice")).unwrap();
    assert_eq!(
        w.registry.instance(id).unwrap().panel.get(0),
        Some(&party("arb2"))
    );

    w.clock.advance(days(15));
    w.registry
        .rule(id, &party("arb2"), Ruling::RespondentWins, 0, digest("second"))
        .unwrap();
    assert!(matches!(
        w.registry.appeal(id, &party("alice")),
        Err(ArbitrationError::Policy { .. })
    ));
    let kinds: Vec<&str> = w.registry.events().iter().map(|r| r.event.kind()).collect();
    assert_eq!(kinds.iter().filter(|k| **k == "appeal_filed").count(), 1);
    assert!(kinds.contains(&"backup_arbitrator_set"));
}

// ---------------------------------------------------------------------------
// PANEL voting
// ---------------------------------------------------------------------------

#[test]
fn panel_majority_decides() {
    let mut w = World::new(&[50, 50]);
    let dispute = w.raise("bob");
    let panel = [party("arb1"), party("arb2"), party("arb3")];
    let id = w
        .registry
        .create_instance(w.handle(), dispute, PresetId::Panel, &panel, party("bob"))
        .unwrap();
    w.registry
        .file_claim(id, &party("bob"), digest("claim"))
        .unwrap();
    w.registry.close_evidence(id, &party("arb2")).unwrap();

    let first = w
        .registry
        .rule(id, &party("arb1"), Ruling::ClaimantWins, 0, digest("a"))
        .unwrap();
    assert_eq!(
        first,
        ConsensusOutcome::Pending {
            votes_cast: 1,
            required: 2
        }
    );
    let second = w
        .registry
        .rule(id, &party("arb2"), Ruling::RespondentWins, 0, digest("b"))
        .unwrap();
    assert!(matches!(second, ConsensusOutcome::Pending { votes_cast: 2, .. }));
    let third = w
        .registry
        .rule(id, &party("arb3"), Ruling::RespondentWins, 0, digest("c"))
        .unwrap();
    match third {
        ConsensusOutcome::Finalized(vote) => {
            assert_eq!(vote.ruling, Ruling::RespondentWins);
            assert_eq!(vote.justification, digest("c"));
        }
        other => panic!("expected a finalized ruling, got {other:?}"),
    }

    let summary = w.registry.execute_ruling(id, &party("alice")).unwrap();
    assert_eq!(summary.refunded, 100);
    assert_eq!(w.statuses(), vec![ObligationStatus::Refunded; 2]);
}

#[test]
fn unanimous_mismatch_stays_pending_until_revised() {
    let mut w = World::new(&[100]);
    let dispute = w.raise("bob");
    let mut config = PresetCatalogue::panel();
    config.arbitrator_count = 2;
    config.voting_method = VotingMethod::Unanimous;
    let id = w
        .registry
        .create_instance_custom(
            w.handle(),
            dispute,
            config,
            &[party("arb1"), party("arb2")],
            party("bob"),
        )
        .unwrap();
    w.registry
        .file_claim(id, &party("bob"), digest("claim"))
        .unwrap();
    w.registry.close_evidence(id, &party("arb1")).unwrap();

    w.registry
        .rule(id, &party("arb1"), Ruling::ClaimantWins, 0, digest("a"))
        .unwrap();
    let split = w
        .registry
        .rule(id, &party("arb2"), Ruling::Split, 5000, digest("b"))
        .unwrap();
    assert_eq!(
        split,
        ConsensusOutcome::Pending {
            votes_cast: 2,
            required: 2
        }
    );
    assert_eq!(w.status(id), ArbitrationStatus::AwaitingRuling);

    // A revised vote overwrites the earlier one.
    let revised = w
        .registry
        .rule(id, &party("arb2"), Ruling::ClaimantWins, 0, digest("b2"))
        .unwrap();
    assert!(matches!(revised, ConsensusOutcome::Finalized(_)));
    assert_eq!(w.status(id), ArbitrationStatus::Ruled);
    assert_eq!(w.registry.instance(id).unwrap().ruling, Ruling::ClaimantWins);
}
