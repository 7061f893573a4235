//! # Arbitration Error Types
//!
//! Structured error hierarchy for the arbitration engine. Every operation is
//! fail-fast: when an error is returned, no field of the instance has been
//! written. Variants fall into five families:
//!
//! - **configuration**: bad preset, malformed custom config, nil agreement,
//!   sub-minimum windows, incomplete panel, refused eligibility;
//! - **authorization**: caller lacks the role the operation needs;
//! - **state**: operation attempted from a disallowed status;
//! - **window**: action outside (or before the end of) its evidence or
//!   appeal window;
//! - **policy**: withdrawal, appeal or replacement disallowed by
//!   configuration or budget.
//!
//! Nothing inside the engine retries. Correcting and resubmitting is the
//! caller's job.

use thiserror::Error;

use crate::disputable::DisputableError;

/// Errors arising from arbitration operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArbitrationError {
    /// Preset, custom configuration, agreement reference or panel is invalid.
    #[error("configuration error: {reason}")]
    Configuration {
        /// Human-readable reason for the rejection.
        reason: String,
    },

    /// The caller does not hold the role required for the operation.
    #[error("{caller} is not authorized to {operation} on {instance}: requires {required}")]
    Unauthorized {
        /// The instance identifier.
        instance: String,
        /// The rejected caller.
        caller: String,
        /// The attempted operation.
        operation: String,
        /// The role the operation requires.
        required: String,
    },

    /// The instance is not in a status that permits the operation.
    #[error("cannot {operation} on {instance}: expected status {expected}, found {actual}")]
    InvalidState {
        /// The instance identifier.
        instance: String,
        /// The attempted operation.
        operation: String,
        /// The acceptable status or statuses.
        expected: String,
        /// The current status.
        actual: String,
    },

    /// The action came after its window closed.
    #[error("{window} window for {instance} closed at {deadline} (now {now})")]
    WindowClosed {
        /// The instance identifier.
        instance: String,
        /// Which window (evidence, appeal).
        window: String,
        /// The deadline that passed (ISO 8601).
        deadline: String,
        /// The clock reading of the rejected call (ISO 8601).
        now: String,
    },

    /// The action requires a window to have closed, and it has not.
    #[error("{window} window for {instance} is open until {deadline}")]
    WindowOpen {
        /// The instance identifier.
        instance: String,
        /// Which window (appeal, arbitrator timeout).
        window: String,
        /// When the window closes (ISO 8601).
        deadline: String,
    },

    /// Configuration or budget forbids the operation.
    #[error("policy forbids {operation} on {instance}: {reason}")]
    Policy {
        /// The instance identifier.
        instance: String,
        /// The attempted operation.
        operation: String,
        /// Why the policy rejected it.
        reason: String,
    },

    /// Ruling code or split ratio is out of range.
    #[error("invalid ruling: {reason}")]
    InvalidRuling {
        /// What was wrong with the ruling.
        reason: String,
    },

    /// No instance with the given identifier exists.
    #[error("arbitration instance {0} not found")]
    InstanceNotFound(String),

    /// The linked agreement rejected a query or callback.
    #[error("linked agreement error: {0}")]
    Agreement(#[from] DisputableError),

    /// A deadline computation or identifier failed validation.
    #[error("validation error: {0}")]
    Validation(#[from] arb_core::ValidationError),
}

impl ArbitrationError {
    /// Shorthand for a configuration error.
    pub(crate) fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }
}
