//! # arb-arbitration — Arbitration Engine
//!
//! A reusable arbitration service for agreements that hold escrowed funds.
//! Any number of unrelated agreements register a dispute here and later
//! receive a single callback telling them how to distribute what they hold.
//!
//! - **Capability** ([`disputable`]): the [`Disputable`] trait every linked
//!   agreement implements, and the [`RulingOrder`] it receives.
//!
//! - **Configuration** ([`config`], [`preset`]): per-instance
//!   [`ArbitrationConfig`], the fixed SIMPLE / BALANCED / PANEL presets, and
//!   the operator's [`RegistryConfig`] minimums.
//!
//! - **Instances** ([`instance`]): status graph, arbitrator panel, evidence.
//!
//! - **Voting** ([`voting`]): single, unanimous and majority consensus over
//!   per-slot votes.
//!
//! - **Registry** ([`registry`]): the state machine. Claim, evidence, ruling,
//!   appeal, execution, withdrawal and stalled-arbitrator replacement.
//!
//! - **Notifications** ([`events`]): one [`ArbitrationEvent`] per state
//!   change, logged through `tracing` and buffered for callers.

pub mod config;
pub mod disputable;
pub mod error;
pub mod events;
pub mod instance;
pub mod preset;
pub mod registry;
pub mod ruling;
pub mod voting;

// Re-export primary types.
pub use config::{
    AppealArbitratorMethod, ArbitrationConfig, ArbitratorSelection, ConfigError,
    DeadlockResolution, FeeMethod, RegistryConfig, ReplacementMethod, ReplacementTriggers,
    ResolutionMethod, VotingMethod, WithdrawalPolicy,
};
pub use disputable::{
    AgreementDisputeId, AgreementHandle, Disputable, DisputableError, RulingOrder,
    SettlementSummary,
};
pub use error::ArbitrationError;
pub use events::{ArbitrationEvent, EventLog, EventRecord};
pub use instance::{
    ArbitrationInstance, ArbitrationStatus, ArbitratorPanel, Evidence, InstanceId, PartyRole,
    MAX_ARBITRATORS,
};
pub use preset::{PresetCatalogue, PresetId};
pub use registry::{ArbitrationRegistry, InstanceRecord, InstanceStore, WithdrawalOutcome};
pub use ruling::{validate_ruling, Ruling, Vote, MAX_BASIS_POINTS};
pub use voting::{ConsensusOutcome, VotingConsensusEngine};
