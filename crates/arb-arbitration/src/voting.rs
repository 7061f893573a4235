//! # Voting Consensus
//!
//! Turns the current cycle's per-slot votes into either a final ruling or
//! "still pending". The engine is a pure function of the voting method, the
//! number of seated arbitrators and the vote slots; the registry stores the
//! votes and applies the outcome.
//!
//! An outcome is the pair (ruling, split ratio), where the ratio counts only
//! for a split. Two non-split votes agree whenever their rulings match. The
//! finalized justification is the one carried by the
//! vote that completed consensus.

use serde::{Deserialize, Serialize};

use crate::config::VotingMethod;
use crate::ruling::Vote;

/// Result of tallying the votes after one was cast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ConsensusOutcome {
    /// No consensus yet.
    Pending {
        /// Votes cast in the current cycle.
        votes_cast: usize,
        /// Matching votes the method needs.
        required: usize,
    },
    /// Consensus reached; the vote that completed it.
    Finalized(Vote),
}

impl ConsensusOutcome {
    /// Whether consensus was reached.
    pub fn is_finalized(&self) -> bool {
        matches!(self, Self::Finalized(_))
    }
}

/// Stateless tally over a panel's vote slots.
pub struct VotingConsensusEngine;

impl VotingConsensusEngine {
    /// Matching votes `method` needs from a panel of `seated`.
    pub fn required_votes(method: VotingMethod, seated: usize) -> usize {
        match method {
            VotingMethod::Single => 1,
            VotingMethod::Unanimous => seated,
            VotingMethod::Majority => seated / 2 + 1,
        }
    }

    /// Tally `votes` after the arbitrator in `last_slot` voted.
    ///
    /// Only the slots `0..seated` are considered. A deadlocked panel stays
    /// pending; there is no forced resolution.
    pub fn tally(
        method: VotingMethod,
        seated: usize,
        votes: &[Option<Vote>],
        last_slot: usize,
    ) -> ConsensusOutcome {
        let seated_votes = &votes[..seated.min(votes.len())];
        let votes_cast = seated_votes.iter().flatten().count();
        let required = Self::required_votes(method, seated);
        let pending = ConsensusOutcome::Pending {
            votes_cast,
            required,
        };

        let Some(last) = seated_votes.get(last_slot).and_then(Option::as_ref) else {
            return pending;
        };

        match method {
            VotingMethod::Single => ConsensusOutcome::Finalized(last.clone()),
            VotingMethod::Unanimous => {
                let all_cast = votes_cast == seated;
                let all_agree = seated_votes
                    .iter()
                    .flatten()
                    .all(|v| v.outcome() == last.outcome());
                if all_cast && all_agree {
                    ConsensusOutcome::Finalized(last.clone())
                } else {
                    pending
                }
            }
            VotingMethod::Majority => {
                // Before this vote no outcome had reached the threshold, so
                // only the last voter's outcome can have crossed it.
                let matching = seated_votes
                    .iter()
                    .flatten()
                    .filter(|v| v.outcome() == last.outcome())
                    .count();
                if matching >= required {
                    ConsensusOutcome::Finalized(last.clone())
                } else {
                    pending
                }
            }
        }
    }
}
