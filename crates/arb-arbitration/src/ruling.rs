//! # Rulings and Votes
//!
//! A ruling is one of three outcomes plus, for splits, a ratio in basis
//! points (1/10000). Arbitrators cast [`Vote`]s; the voting consensus engine
//! turns votes into the final ruling.

use serde::{Deserialize, Serialize};

use arb_core::{ContentDigest, Timestamp};

use crate::error::ArbitrationError;

/// 100% expressed in basis points.
pub const MAX_BASIS_POINTS: u16 = 10_000;

/// The outcome of an arbitration.
///
/// Numeric codes: 0 none, 1 claimant wins, 2 respondent wins, 3 split.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ruling {
    /// No ruling yet.
    #[default]
    None,
    /// Every outstanding obligation goes to the beneficiary side.
    ClaimantWins,
    /// Every outstanding obligation returns to the depositor side.
    RespondentWins,
    /// Outstanding obligations are divided by the split ratio.
    Split,
}

impl Ruling {
    /// The wire code of this ruling.
    pub fn code(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::ClaimantWins => 1,
            Self::RespondentWins => 2,
            Self::Split => 3,
        }
    }

    /// The canonical string name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::ClaimantWins => "CLAIMANT_WINS",
            Self::RespondentWins => "RESPONDENT_WINS",
            Self::Split => "SPLIT",
        }
    }

    /// Whether this is a decision an arbitrator may cast.
    pub fn is_decision(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// The ratio that applies under this ruling. Only a split carries one;
    /// every other ruling reads as 0.
    pub fn effective_ratio(&self, split_ratio_bps: u16) -> u16 {
        match self {
            Self::Split => split_ratio_bps,
            _ => 0,
        }
    }
}

impl TryFrom<u8> for Ruling {
    type Error = ArbitrationError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::None),
            1 => Ok(Self::ClaimantWins),
            2 => Ok(Self::RespondentWins),
            3 => Ok(Self::Split),
            other => Err(ArbitrationError::InvalidRuling {
                reason: format!("unknown ruling code {other}"),
            }),
        }
    }
}

impl std::fmt::Display for Ruling {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check a ruling an arbitrator wants to cast.
///
/// # Errors
///
/// Returns [`ArbitrationError::InvalidRuling`] for [`Ruling::None`] or a
/// split whose ratio is above [`MAX_BASIS_POINTS`]. The ratio of any other
/// ruling is ignored.
pub fn validate_ruling(ruling: Ruling, split_ratio_bps: u16) -> Result<(), ArbitrationError> {
    if !ruling.is_decision() {
        return Err(ArbitrationError::InvalidRuling {
            reason: "ruling must be claimant-wins, respondent-wins or split".to_string(),
        });
    }
    if ruling == Ruling::Split && split_ratio_bps > MAX_BASIS_POINTS {
        return Err(ArbitrationError::InvalidRuling {
            reason: format!(
                "split ratio {split_ratio_bps} bps exceeds {MAX_BASIS_POINTS} bps"
            ),
        });
    }
    Ok(())
}

/// One arbitrator's vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    /// The outcome voted for.
    pub ruling: Ruling,
    /// Split ratio in basis points; 0 unless the ruling is a split.
    pub split_ratio_bps: u16,
    /// Digest of the written justification.
    pub justification: ContentDigest,
    /// When the vote was cast (or last overwritten).
    pub cast_at: Timestamp,
}

impl Vote {
    /// The part of the vote that must match for votes to agree.
    pub fn outcome(&self) -> (Ruling, u16) {
        (self.ruling, self.ruling.effective_ratio(self.split_ratio_bps))
    }
}
