//! # arb-escrow — Escrow Agreement with Arbitrated Settlement
//!
//! A reference implementation of the [`arb_arbitration::Disputable`]
//! capability:
//!
//! - **Agreement** ([`agreement`]): depositor, beneficiary, obligations, and
//!   the disputes raised over them.
//!
//! - **Obligations** ([`obligation`]): `Pending → Funded → Released | Refunded`.
//!
//! - **Settlement** ([`settlement`]): the [`RulingSettlementCalculator`]
//!   that turns a final ruling into releases and refunds.
//!
//! - **Rating** ([`rating`]): a once-per-party, 1–5 rating of the presiding
//!   arbitrator after settlement.

pub mod agreement;
pub mod config;
pub mod error;
pub mod obligation;
pub mod rating;
pub mod settlement;

// Re-export primary types.
pub use agreement::{DisputeRecord, EscrowAgreement};
pub use config::{ConfigError, EscrowConfig};
pub use error::EscrowError;
pub use obligation::{Obligation, ObligationStatus};
pub use rating::{RatingWindow, MAX_SCORE, MIN_SCORE};
pub use settlement::{RulingSettlementCalculator, SettlementPlan, SettlementReport};
