//! Value conservation invariant checker.
//!
//! Invariant enforced by the ledger:
//! ```text
//! Σ(account balances) + vault held == Σ(deposits) - Σ(withdrawals)
//! ```
//!
//! Escrow funding and release only move value between accounts and the
//! vault. If the totals ever disagree, value was created or destroyed and
//! the triggering operation is treated as fatal.

use freightline_types::{FreightError, Result};
use rust_decimal::Decimal;

/// Tracks external inflows and outflows of the funding source.
#[derive(Debug, Default)]
pub struct ValueConservation {
    deposits: Decimal,
    withdrawals: Decimal,
}

impl ValueConservation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    /// `AmountOverflow` if total deposits would exceed `Decimal::MAX`.
    pub fn record_deposit(&mut self, amount: Decimal) -> Result<()> {
        self.deposits = checked_add(self.deposits, amount)?;
        Ok(())
    }

    /// Withdrawals never exceed deposits, so this total stays in range
    /// whenever deposits do.
    ///
    /// # Errors
    /// `AmountOverflow` if total withdrawals would exceed `Decimal::MAX`.
    pub fn record_withdrawal(&mut self, amount: Decimal) -> Result<()> {
        self.withdrawals = checked_add(self.withdrawals, amount)?;
        Ok(())
    }

    /// Value that should exist in the system: deposits - withdrawals.
    #[must_use]
    pub fn expected_supply(&self) -> Decimal {
        self.deposits - self.withdrawals
    }

    #[must_use]
    pub fn total_deposits(&self) -> Decimal {
        self.deposits
    }

    #[must_use]
    pub fn total_withdrawals(&self) -> Decimal {
        self.withdrawals
    }

    /// Compare the observed total against the expected supply.
    ///
    /// # Errors
    /// [`FreightError::InvariantViolation`] if they differ.
    pub fn verify(&self, actual_supply: Decimal) -> Result<()> {
        let expected = self.expected_supply();
        if actual_supply != expected {
            return Err(FreightError::InvariantViolation {
                reason: format!(
                    "actual supply {actual_supply} != expected {expected} \
                     (deposits={}, withdrawals={})",
                    self.deposits, self.withdrawals,
                ),
            });
        }
        Ok(())
    }
}

/// `total + amount`, or `AmountOverflow` instead of a panic.
pub(crate) fn checked_add(total: Decimal, amount: Decimal) -> Result<Decimal> {
    total
        .checked_add(amount)
        .ok_or(FreightError::AmountOverflow { amount })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_supply_is_zero() {
        let vc = ValueConservation::new();
        assert_eq!(vc.expected_supply(), Decimal::ZERO);
        assert!(vc.verify(Decimal::ZERO).is_ok());
    }

    #[test]
    fn deposits_and_withdrawals_net_out() {
        let mut vc = ValueConservation::new();
        vc.record_deposit(Decimal::new(1000, 0)).unwrap();
        vc.record_deposit(Decimal::new(500, 0)).unwrap();
        vc.record_withdrawal(Decimal::new(300, 0)).unwrap();
        assert_eq!(vc.expected_supply(), Decimal::new(1200, 0));
        assert_eq!(vc.total_deposits(), Decimal::new(1500, 0));
        assert_eq!(vc.total_withdrawals(), Decimal::new(300, 0));
    }

    #[test]
    fn verify_fails_when_imbalanced() {
        let mut vc = ValueConservation::new();
        vc.record_deposit(Decimal::new(10, 0)).unwrap();
        let err = vc.verify(Decimal::new(11, 0)).unwrap_err();
        assert!(matches!(err, FreightError::InvariantViolation { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn deposit_overflow_rejected_unchanged() {
        let mut vc = ValueConservation::new();
        vc.record_deposit(Decimal::MAX).unwrap();
        let err = vc.record_deposit(Decimal::ONE).unwrap_err();
        assert_eq!(err, FreightError::AmountOverflow { amount: Decimal::ONE });
        assert!(!err.is_fatal());
        assert_eq!(vc.total_deposits(), Decimal::MAX);
    }
}
