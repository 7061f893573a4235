//! # Arbitration Configuration
//!
//! Two layers:
//!
//! - [`ArbitrationConfig`] is embedded in every instance and decides how
//!   that dispute is run (windows, appeals, voting, withdrawal, replacement).
//!   Presets fill it in; the custom path accepts it whole.
//! - [`RegistryConfig`] is the operator's configuration of the registry
//!   itself: the minimum windows any instance config must respect. Load it
//!   from the environment with [`RegistryConfig::from_env`] or from YAML
//!   with [`RegistryConfig::from_yaml_str`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

use arb_core::PartyId;

use crate::error::ArbitrationError;
use crate::instance::MAX_ARBITRATORS;
use crate::preset::PresetId;

const DAY_SECS: u64 = 86_400;

// ── Configuration enums ────────────────────────────────────────────────

/// How the dispute is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    /// One arbitrator decides.
    SingleArbitrator,
    /// Two or three arbitrators vote.
    Panel,
}

/// How arbitrators come to be seated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArbitratorSelection {
    /// The instance creator picks.
    CreatorPicked,
    /// Both parties are expected to confirm the pick.
    Mutual,
    /// Seats supplied with the configuration.
    CallerSpecified,
}

/// Who pays the arbitration fee. Recorded only; fees are not collected here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeMethod {
    /// No fee.
    None,
    /// The claimant pays.
    ClaimantPays,
    /// Both parties pay half.
    SplitEqually,
    /// The losing party pays.
    LoserPays,
}

/// Who hears an appeal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppealArbitratorMethod {
    /// The original panel.
    SameArbitrator,
    /// A different arbitrator (the configured backup).
    DifferentArbitrator,
}

/// When a dispute may be withdrawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalPolicy {
    /// Either party, alone, in any non-terminal status except RULED.
    Anytime,
    /// Both parties must ask.
    Mutual,
    /// Never.
    NotAllowed,
}

/// Events that allow an arbitrator to be replaced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReplacementTriggers {
    /// The arbitrator has not voted within the arbitrator timeout.
    pub on_timeout: bool,
    /// The arbitrator recused.
    pub on_recusal: bool,
}

/// Where a replacement arbitrator comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplacementMethod {
    /// No replacement.
    None,
    /// The creator picks.
    CreatorPicks,
    /// The configured backup arbitrator is seated.
    Backup,
}

/// How votes become a ruling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VotingMethod {
    /// One arbitrator; the vote is the ruling.
    Single,
    /// Every seated arbitrator must cast the same outcome.
    Unanimous,
    /// `floor(count / 2) + 1` matching votes.
    Majority,
}

/// Declared response to a panel that cannot agree.
///
/// Recorded in the configuration; the engine does not apply it and a
/// deadlocked panel stays in AWAITING_RULING.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlockResolution {
    /// No declared resolution.
    None,
    /// A tiebreaker arbitrator decides.
    Tiebreaker,
    /// Funds return to the depositor.
    FundsReturned,
    /// A default ruling applies after a timeout.
    TimeoutDefault,
}

// ── ArbitrationConfig ──────────────────────────────────────────────────

/// Per-instance configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArbitrationConfig {
    /// The preset this configuration came from.
    pub preset: PresetId,
    /// Single arbitrator or panel.
    pub resolution_method: ResolutionMethod,
    /// How arbitrators are chosen.
    pub arbitrator_selection: ArbitratorSelection,
    /// Seats that must be filled before a claim can be filed (1–3).
    pub arbitrator_count: u8,
    /// Evidence window, measured from filing (and from each appeal).
    #[serde(with = "arb_core::duration_secs")]
    pub evidence_window: Duration,
    /// How long an arbitrator may sit on a closed record without voting.
    #[serde(with = "arb_core::duration_secs")]
    pub arbitrator_timeout: Duration,
    /// Fee payment method.
    pub fee_method: FeeMethod,
    /// Fee amount in the agreement's smallest unit.
    pub fee_amount: u64,
    /// Whether rulings may be appealed.
    pub appeals_allowed: bool,
    /// Appeal budget.
    pub max_appeals: u8,
    /// Who hears an appeal.
    pub appeal_arbitrator_method: AppealArbitratorMethod,
    /// Appeal window, measured from the ruling.
    #[serde(with = "arb_core::duration_secs")]
    pub appeal_window: Duration,
    /// Withdrawal policy.
    pub withdrawal_policy: WithdrawalPolicy,
    /// Replacement triggers.
    pub replacement_triggers: ReplacementTriggers,
    /// Replacement method.
    pub replacement_method: ReplacementMethod,
    /// Voting method.
    pub voting_method: VotingMethod,
    /// Declared deadlock resolution (not applied by the engine).
    pub deadlock_resolution: DeadlockResolution,
    /// Backup arbitrator for appeals and replacement.
    pub backup_arbitrator: Option<PartyId>,
}

impl ArbitrationConfig {
    /// Check internal consistency and the registry's minimum windows.
    ///
    /// # Errors
    ///
    /// Returns [`ArbitrationError::Configuration`] describing the first
    /// violated rule.
    pub fn validate(&self, limits: &RegistryConfig) -> Result<(), ArbitrationError> {
        let count = usize::from(self.arbitrator_count);
        if count == 0 || count > MAX_ARBITRATORS {
            return Err(ArbitrationError::configuration(format!(
                "arbitrator count must be 1..={MAX_ARBITRATORS}, got {count}"
            )));
        }
        match (self.resolution_method, count) {
            (ResolutionMethod::SingleArbitrator, 1) | (ResolutionMethod::Panel, 2..) => {}
            (method, n) => {
                return Err(ArbitrationError::configuration(format!(
                    "resolution method {method:?} does not fit {n} arbitrator(s)"
                )))
            }
        }
        match (self.voting_method, count) {
            (VotingMethod::Single, 1) => {}
            (VotingMethod::Unanimous | VotingMethod::Majority, _) => {}
            (method, n) => {
                return Err(ArbitrationError::configuration(format!(
                    "voting method {method:?} cannot decide between {n} arbitrators"
                )))
            }
        }
        if self.evidence_window < limits.min_evidence_window {
            return Err(ArbitrationError::configuration(format!(
                "evidence window {}s is below the minimum {}s",
                self.evidence_window.as_secs(),
                limits.min_evidence_window.as_secs()
            )));
        }
        if self.arbitrator_timeout < limits.min_arbitrator_timeout {
            return Err(ArbitrationError::configuration(format!(
                "arbitrator timeout {}s is below the minimum {}s",
                self.arbitrator_timeout.as_secs(),
                limits.min_arbitrator_timeout.as_secs()
            )));
        }
        if self.appeals_allowed {
            if self.max_appeals == 0 {
                return Err(ArbitrationError::configuration(
                    "appeals are allowed but the appeal budget is zero",
                ));
            }
            if self.appeal_window < limits.min_appeal_window {
                return Err(ArbitrationError::configuration(format!(
                    "appeal window {}s is below the minimum {}s",
                    self.appeal_window.as_secs(),
                    limits.min_appeal_window.as_secs()
                )));
            }
        } else if self.max_appeals != 0 {
            return Err(ArbitrationError::configuration(
                "appeal budget set while appeals are disallowed",
            ));
        }
        if self.fee_method == FeeMethod::None && self.fee_amount != 0 {
            return Err(ArbitrationError::configuration(
                "fee amount set while fee method is none",
            ));
        }
        if self.replacement_method == ReplacementMethod::Backup && self.backup_arbitrator.is_none()
        {
            return Err(ArbitrationError::configuration(
                "backup replacement requires a backup arbitrator",
            ));
        }
        Ok(())
    }
}

// ── RegistryConfig ─────────────────────────────────────────────────────

/// Operator configuration of the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Smallest evidence window any instance may use.
    #[serde(with = "arb_core::duration_secs")]
    pub min_evidence_window: Duration,
    /// Smallest appeal window any appealable instance may use.
    #[serde(with = "arb_core::duration_secs")]
    pub min_appeal_window: Duration,
    /// Smallest arbitrator timeout any instance may use.
    #[serde(with = "arb_core::duration_secs")]
    pub min_arbitrator_timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            min_evidence_window: Duration::from_secs(DAY_SECS),
            min_appeal_window: Duration::from_secs(DAY_SECS),
            min_arbitrator_timeout: Duration::from_secs(DAY_SECS),
        }
    }
}

impl RegistryConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables (all in seconds, each defaulting to one day):
    /// - `ARB_MIN_EVIDENCE_WINDOW_SECS`
    /// - `ARB_MIN_APPEAL_WINDOW_SECS`
    /// - `ARB_MIN_ARBITRATOR_TIMEOUT_SECS`
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            min_evidence_window: env_secs(
                "ARB_MIN_EVIDENCE_WINDOW_SECS",
                defaults.min_evidence_window,
            )?,
            min_appeal_window: env_secs("ARB_MIN_APPEAL_WINDOW_SECS", defaults.min_appeal_window)?,
            min_arbitrator_timeout: env_secs(
                "ARB_MIN_ARBITRATOR_TIMEOUT_SECS",
                defaults.min_arbitrator_timeout,
            )?,
        })
    }

    /// Parse configuration from a YAML document. Missing keys take defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::Yaml(e.to_string()))
    }
}

fn env_secs(var: &str, default: Duration) -> Result<Duration, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| ConfigError::InvalidValue(var.to_string(), raw)),
        Err(_) => Ok(default),
    }
}

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1:?} (expected whole seconds)")]
    InvalidValue(String, String),
    #[error("invalid registry YAML: {0}")]
    Yaml(String),
}
