//! # Preset Catalogue
//!
//! Named bundles of default [`ArbitrationConfig`]. The defaults can only be
//! overridden through the custom creation path.
//!
//! | Preset | Arbitrators | Evidence | Appeals | Voting | Withdrawal |
//! |---|---|---|---|---|---|
//! | SIMPLE | 1, creator-picked | 7 days | none | single | anytime |
//! | BALANCED | 1, mutual | 14 days | 1, different arbitrator, 7-day window | single | mutual |
//! | PANEL | 3 | 21 days | none | majority | mutual |
//! | CUSTOM | 1–3 | caller | caller | caller | caller |

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{
    AppealArbitratorMethod, ArbitrationConfig, ArbitratorSelection, DeadlockResolution, FeeMethod,
    ReplacementMethod, ReplacementTriggers, ResolutionMethod, VotingMethod, WithdrawalPolicy,
};
use crate::error::ArbitrationError;

const fn days(n: u64) -> Duration {
    Duration::from_secs(n * 86_400)
}

/// Preset identifiers. Numeric codes 0–3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresetId {
    /// One creator-picked arbitrator, no appeals.
    Simple,
    /// One mutually chosen arbitrator, one appeal.
    Balanced,
    /// Three arbitrators, majority vote.
    Panel,
    /// Everything caller-specified.
    Custom,
}

impl PresetId {
    /// The wire code of this preset.
    pub fn code(&self) -> u8 {
        match self {
            Self::Simple => 0,
            Self::Balanced => 1,
            Self::Panel => 2,
            Self::Custom => 3,
        }
    }

    /// The canonical string name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "SIMPLE",
            Self::Balanced => "BALANCED",
            Self::Panel => "PANEL",
            Self::Custom => "CUSTOM",
        }
    }
}

impl TryFrom<u8> for PresetId {
    type Error = ArbitrationError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Simple),
            1 => Ok(Self::Balanced),
            2 => Ok(Self::Panel),
            3 => Ok(Self::Custom),
            other => Err(ArbitrationError::configuration(format!(
                "unknown preset code {other}"
            ))),
        }
    }
}

impl std::fmt::Display for PresetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The fixed preset defaults.
pub struct PresetCatalogue;

impl PresetCatalogue {
    /// Defaults for `preset`.
    ///
    /// # Errors
    ///
    /// [`PresetId::Custom`] has no defaults and yields
    /// [`ArbitrationError::Configuration`].
    pub fn defaults(preset: PresetId) -> Result<ArbitrationConfig, ArbitrationError> {
        match preset {
            PresetId::Simple => Ok(Self::simple()),
            PresetId::Balanced => Ok(Self::balanced()),
            PresetId::Panel => Ok(Self::panel()),
            PresetId::Custom => Err(ArbitrationError::configuration(
                "the CUSTOM preset has no defaults; use the custom creation path",
            )),
        }
    }

    /// SIMPLE: one creator-picked arbitrator, 7-day evidence, no appeals,
    /// withdraw anytime.
    pub fn simple() -> ArbitrationConfig {
        ArbitrationConfig {
            preset: PresetId::Simple,
            resolution_method: ResolutionMethod::SingleArbitrator,
            arbitrator_selection: ArbitratorSelection::CreatorPicked,
            arbitrator_count: 1,
            evidence_window: days(7),
            arbitrator_timeout: days(14),
            fee_method: FeeMethod::None,
            fee_amount: 0,
            appeals_allowed: false,
            max_appeals: 0,
            appeal_arbitrator_method: AppealArbitratorMethod::SameArbitrator,
            appeal_window: Duration::ZERO,
            withdrawal_policy: WithdrawalPolicy::Anytime,
            replacement_triggers: ReplacementTriggers::default(),
            replacement_method: ReplacementMethod::None,
            voting_method: VotingMethod::Single,
            deadlock_resolution: DeadlockResolution::None,
            backup_arbitrator: None,
        }
    }

    /// BALANCED: one mutually chosen arbitrator, 14-day evidence, one appeal
    /// heard by a different arbitrator within 7 days, mutual withdrawal.
    pub fn balanced() -> ArbitrationConfig {
        ArbitrationConfig {
            preset: PresetId::Balanced,
            resolution_method: ResolutionMethod::SingleArbitrator,
            arbitrator_selection: ArbitratorSelection::Mutual,
            arbitrator_count: 1,
            evidence_window: days(14),
            arbitrator_timeout: days(21),
            fee_method: FeeMethod::None,
            fee_amount: 0,
            appeals_allowed: true,
            max_appeals: 1,
            appeal_arbitrator_method: AppealArbitratorMethod::DifferentArbitrator,
            appeal_window: days(7),
            withdrawal_policy: WithdrawalPolicy::Mutual,
            replacement_triggers: ReplacementTriggers::default(),
            replacement_method: ReplacementMethod::None,
            voting_method: VotingMethod::Single,
            deadlock_resolution: DeadlockResolution::None,
            backup_arbitrator: None,
        }
    }

    /// PANEL: three arbitrators, 21-day evidence, majority vote, no appeals,
    /// mutual withdrawal.
    pub fn panel() -> ArbitrationConfig {
        ArbitrationConfig {
            preset: PresetId::Panel,
            resolution_method: ResolutionMethod::Panel,
            arbitrator_selection: ArbitratorSelection::CreatorPicked,
            arbitrator_count: 3,
            evidence_window: days(21),
            arbitrator_timeout: days(30),
            fee_method: FeeMethod::None,
            fee_amount: 0,
            appeals_allowed: false,
            max_appeals: 0,
            appeal_arbitrator_method: AppealArbitratorMethod::SameArbitrator,
            appeal_window: Duration::ZERO,
            withdrawal_policy: WithdrawalPolicy::Mutual,
            replacement_triggers: ReplacementTriggers {
                on_timeout: true,
                on_recusal: false,
            },
            replacement_method: ReplacementMethod::CreatorPicks,
            voting_method: VotingMethod::Majority,
            deadlock_resolution: DeadlockResolution::None,
            backup_arbitrator: None,
        }
    }

    /// Every preset with defaults, in code order.
    pub fn all() -> [(PresetId, ArbitrationConfig); 3] {
        [
            (PresetId::Simple, Self::simple()),
            (PresetId::Balanced, Self::balanced()),
            (PresetId::Panel, Self::panel()),
        ]
    }
}
