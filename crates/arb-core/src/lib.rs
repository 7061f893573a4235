#![deny(missing_docs)]

//! # arb-core — Foundational Types for the Disputable Arbitration Stack
//!
//! This crate defines the types every other crate in the workspace depends
//! on. It has no internal crate dependencies, only `serde`, `serde_json`,
//! `thiserror`, `chrono`, `uuid`, and `sha2` from the external ecosystem.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** Every identifier is a
//!    distinct type. You cannot pass an [`AgreementId`] where a [`PartyId`]
//!    is expected.
//!
//! 2. **Hashes are opaque.** Claims, evidence and justifications are
//!    referenced by [`ContentDigest`] only. Storing the content itself is
//!    somebody else's job.
//!
//! 3. **Time is injected.** Deadlines are compared against the reading of a
//!    [`Clock`] taken at the start of each call. Nothing in the stack runs a
//!    background timer.
//!
//! 4. **[`ValidationError`] at construction.** Invalid identifiers never
//!    exist; no `.unwrap()` outside tests.

pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;

// Re-export primary types at crate root for ergonomic imports.
pub use digest::{sha256_bytes, sha256_digest, ContentDigest, DigestAlgorithm};
pub use error::ValidationError;
pub use identity::{AgreementId, PartyId};
pub use temporal::{duration_secs, Clock, ManualClock, SystemClock, Timestamp};
