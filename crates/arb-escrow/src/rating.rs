//! Post-settlement arbitrator rating.
//!
//! After a ruling is applied the two disputing parties may each rate the
//! presiding arbitrator once, with a score from 1 to 5, until the window
//! closes.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use arb_arbitration::AgreementDisputeId;
use arb_core::{PartyId, Timestamp, ValidationError};

use crate::error::EscrowError;

/// Lowest accepted score.
pub const MIN_SCORE: u8 = 1;
/// Highest accepted score.
pub const MAX_SCORE: u8 = 5;

/// An open (or expired) rating window for one dispute's arbitrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingWindow {
    /// The settled dispute.
    pub dispute: AgreementDisputeId,
    /// The arbitrator being rated.
    pub arbitrator: PartyId,
    /// When the window opened.
    pub opened_at: Timestamp,
    /// Last moment a rating is accepted.
    pub closes_at: Timestamp,
    scores: BTreeMap<PartyId, u8>,
}

impl RatingWindow {
    /// Open a window of length `window` starting at `opened_at`.
    pub fn open(
        dispute: AgreementDisputeId,
        arbitrator: PartyId,
        opened_at: Timestamp,
        window: Duration,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            dispute,
            arbitrator,
            opened_at,
            closes_at: opened_at.plus(window)?,
            scores: BTreeMap::new(),
        })
    }

    /// Record `party`'s score. The caller checks that `party` is a disputant.
    pub fn rate(&mut self, party: &PartyId, score: u8, now: Timestamp) -> Result<(), EscrowError> {
        if now > self.closes_at {
            return Err(EscrowError::RatingClosed {
                dispute: self.dispute.to_string(),
                reason: format!("closed at {}", self.closes_at),
            });
        }
        if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
            return Err(EscrowError::InvalidScore(score));
        }
        if self.scores.contains_key(party) {
            return Err(EscrowError::AlreadyRated {
                dispute: self.dispute.to_string(),
                party: party.to_string(),
            });
        }
        self.scores.insert(party.clone(), score);
        Ok(())
    }

    /// The score `party` gave, if any.
    pub fn score_of(&self, party: &PartyId) -> Option<u8> {
        self.scores.get(party).copied()
    }

    /// Number of ratings received.
    pub fn count(&self) -> usize {
        self.scores.len()
    }

    /// Mean score, or `None` with no ratings.
    pub fn average(&self) -> Option<f64> {
        if self.scores.is_empty() {
            return None;
        }
        let sum: u32 = self.scores.values().map(|&s| u32::from(s)).sum();
        Some(f64::from(sum) / self.scores.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> RatingWindow {
        RatingWindow::open(
            AgreementDisputeId(1),
            PartyId::new("arb1").unwrap(),
            Timestamp::from_epoch_secs(1_767_225_600).unwrap(),
            Duration::from_secs(3600),
        )
        .unwrap()
    }

    fn party(name: &str) -> PartyId {
        PartyId::new(name).unwrap()
    }

    #[test]
    fn each_party_rates_once() {
        let mut w = window();
        let now = w.opened_at;
        w.rate(&party("alice"), 5, now).unwrap();
        assert!(matches!(
            w.rate(&party("alice"), 4, now),
            Err(EscrowError::AlreadyRated { .. })
        ));
        w.rate(&party("bob"), 2, now).unwrap();
        assert_eq!(w.count(), 2);
        assert_eq!(w.average(), Some(3.5));
    }

    #[test]
    fn score_range() {
        let mut w = window();
        let now = w.opened_at;
        assert!(matches!(w.rate(&party("alice"), 0, now), Err(EscrowError::InvalidScore(0))));
        assert!(matches!(w.rate(&party("alice"), 6, now), Err(EscrowError::InvalidScore(6))));
        assert_eq!(w.score_of(&party("alice")), None);
    }

    #[test]
    fn closes_after_deadline() {
        let mut w = window();
        let at_close = w.closes_at;
        w.rate(&party("alice"), 3, at_close).unwrap();
        let late = at_close.plus(Duration::from_secs(1)).unwrap();
        assert!(matches!(
            w.rate(&party("bob"), 3, late),
            Err(EscrowError::RatingClosed { .. })
        ));
    }

    #[test]
    fn empty_average_is_none() {
        assert_eq!(window().average(), None);
    }
}
