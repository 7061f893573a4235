//! # Obligations
//!
//! An obligation is one escrow-held commitment from the depositor to the
//! beneficiary, in the agreement's smallest unit.
//!
//! Status machine: `Pending → Funded → [Released | Refunded]`
//!
//! Terminal states: `Released`, `Refunded`. Only `Funded` obligations are
//! outstanding and take part in settlement.

use serde::{Deserialize, Serialize};

use arb_core::Timestamp;

use crate::error::EscrowError;

/// The status of an obligation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObligationStatus {
    /// Declared but not yet funded.
    Pending,
    /// Funds are held.
    Funded,
    /// Paid to the beneficiary. Terminal state.
    Released,
    /// Returned to the depositor. Terminal state.
    Refunded,
}

impl ObligationStatus {
    /// Whether this status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Released | Self::Refunded)
    }

    /// The canonical string name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Funded => "FUNDED",
            Self::Released => "RELEASED",
            Self::Refunded => "REFUNDED",
        }
    }
}

impl std::fmt::Display for ObligationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One escrow-held commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obligation {
    /// Position in the agreement's obligation list.
    pub index: usize,
    /// Amount in the smallest unit.
    pub amount: u64,
    /// Current status.
    pub status: ObligationStatus,
    /// When it was funded.
    pub funded_at: Option<Timestamp>,
    /// When it was released or refunded.
    pub settled_at: Option<Timestamp>,
}

impl Obligation {
    /// Declare a new pending obligation.
    pub fn new(index: usize, amount: u64) -> Result<Self, EscrowError> {
        if amount == 0 {
            return Err(EscrowError::InvalidObligation {
                index,
                reason: "amount must be positive".to_string(),
            });
        }
        Ok(Self {
            index,
            amount,
            status: ObligationStatus::Pending,
            funded_at: None,
            settled_at: None,
        })
    }

    /// Funded and neither released nor refunded.
    pub fn is_outstanding(&self) -> bool {
        self.status == ObligationStatus::Funded
    }

    /// `Pending → Funded`.
    pub fn fund(&mut self, at: Timestamp) -> Result<(), EscrowError> {
        self.require(ObligationStatus::Pending, "fund")?;
        self.status = ObligationStatus::Funded;
        self.funded_at = Some(at);
        Ok(())
    }

    /// `Funded → Released`.
    pub fn release(&mut self, at: Timestamp) -> Result<(), EscrowError> {
        self.require(ObligationStatus::Funded, "release")?;
        self.status = ObligationStatus::Released;
        self.settled_at = Some(at);
        Ok(())
    }

    /// `Funded → Refunded`.
    pub fn refund(&mut self, at: Timestamp) -> Result<(), EscrowError> {
        self.require(ObligationStatus::Funded, "refund")?;
        self.status = ObligationStatus::Refunded;
        self.settled_at = Some(at);
        Ok(())
    }

    fn require(&self, expected: ObligationStatus, operation: &str) -> Result<(), EscrowError> {
        if self.status != expected {
            return Err(EscrowError::InvalidObligation {
                index: self.index,
                reason: format!("cannot {operation} in status {}, expected {expected}", self.status),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at() -> Timestamp {
        Timestamp::from_epoch_secs(1_767_225_600).unwrap()
    }

    #[test]
    fn zero_amount_rejected() {
        assert!(Obligation::new(0, 0).is_err());
    }

    #[test]
    fn fund_then_release() {
        let mut o = Obligation::new(0, 100).unwrap();
        assert!(!o.is_outstanding());
        o.fund(at()).unwrap();
        assert!(o.is_outstanding());
        o.release(at()).unwrap();
        assert_eq!(o.status, ObligationStatus::Released);
        assert!(o.status.is_terminal());
        assert!(!o.is_outstanding());
    }

    #[test]
    fn cannot_release_unfunded() {
        let mut o = Obligation::new(3, 100).unwrap();
        let err = o.release(at()).unwrap_err();
        assert!(format!("{err}").contains("obligation 3"));
    }

    #[test]
    fn terminal_rejects_everything() {
        let mut o = Obligation::new(0, 100).unwrap();
        o.fund(at()).unwrap();
        o.refund(at()).unwrap();
        assert!(o.fund(at()).is_err());
        assert!(o.release(at()).is_err());
        assert!(o.refund(at()).is_err());
    }
}
