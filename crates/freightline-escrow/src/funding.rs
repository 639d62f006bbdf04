//! Funding sources for escrow.
//!
//! The vault never holds account balances itself: it debits the payer from a
//! [`FundingSource`] when a trip is funded and credits the payee when escrow
//! is released. [`AccountBook`] is the bounded in-memory backend; a native
//! currency or external ledger integration would implement the same trait.

use std::collections::HashMap;

use freightline_types::{AccountId, FreightError, Result};
use rust_decimal::Decimal;

use crate::conservation::{ValueConservation, checked_add};

/// Where escrowed value comes from and where it is paid to.
pub trait FundingSource: Send {
    /// Spendable balance of `account`.
    fn available(&self, account: AccountId) -> Decimal;

    /// Take `amount` from `account`. Must leave the balance untouched on error.
    ///
    /// # Errors
    /// `InsufficientFunds` if the account cannot cover `amount`.
    fn debit(&mut self, account: AccountId, amount: Decimal) -> Result<()>;

    /// Pay `amount` into `account`.
    fn credit(&mut self, account: AccountId, amount: Decimal) -> Result<()>;

    /// Cross-check the backend's totals against the value the vault holds.
    /// Backends without a notion of total supply have nothing to audit.
    fn audit(&self, _escrowed: Decimal) -> Result<()> {
        Ok(())
    }
}

/// Bounded per-account balances.
///
/// All mutations are atomic: either the full operation succeeds or the
/// balance is unchanged.
#[derive(Debug, Default)]
pub struct AccountBook {
    balances: HashMap<AccountId, Decimal>,
    supply: ValueConservation,
}

impl AccountBook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring external value into the book.
    ///
    /// # Errors
    /// - `InvalidAmount` if `amount <= 0`
    /// - `AmountOverflow` if the balance or total supply would pass `Decimal::MAX`
    pub fn deposit(&mut self, account: AccountId, amount: Decimal) -> Result<()> {
        ensure_positive(amount)?;
        let balance = checked_add(self.balance(account), amount)?;
        self.supply.record_deposit(amount)?;
        self.balances.insert(account, balance);
        Ok(())
    }

    /// Take value out of the book.
    ///
    /// # Errors
    /// - `InvalidAmount` if `amount <= 0`
    /// - `InsufficientFunds` if the balance cannot cover it
    pub fn withdraw(&mut self, account: AccountId, amount: Decimal) -> Result<()> {
        ensure_positive(amount)?;
        self.debit(account, amount)?;
        if let Err(err) = self.supply.record_withdrawal(amount) {
            self.credit(account, amount)?;
            return Err(err);
        }
        Ok(())
    }

    #[must_use]
    pub fn balance(&self, account: AccountId) -> Decimal {
        self.balances.get(&account).copied().unwrap_or_default()
    }

    /// Sum of all account balances.
    #[must_use]
    pub fn total_balance(&self) -> Decimal {
        self.balances.values().copied().sum()
    }

    #[must_use]
    pub fn supply(&self) -> &ValueConservation {
        &self.supply
    }
}

impl FundingSource for AccountBook {
    fn available(&self, account: AccountId) -> Decimal {
        self.balance(account)
    }

    fn debit(&mut self, account: AccountId, amount: Decimal) -> Result<()> {
        let available = self.balance(account);
        if available < amount {
            return Err(FreightError::InsufficientFunds {
                needed: amount,
                available,
            });
        }
        // `available >= amount > 0` implies the entry exists.
        if let Some(balance) = self.balances.get_mut(&account) {
            *balance -= amount;
        }
        Ok(())
    }

    fn credit(&mut self, account: AccountId, amount: Decimal) -> Result<()> {
        let balance = checked_add(self.balance(account), amount)?;
        self.balances.insert(account, balance);
        Ok(())
    }

    fn audit(&self, escrowed: Decimal) -> Result<()> {
        let total = self
            .balances
            .values()
            .try_fold(escrowed, |acc, balance| checked_add(acc, *balance))
            .map_err(|_| FreightError::InvariantViolation {
                reason: "balances plus escrow exceed the representable supply".to_string(),
            })?;
        self.supply.verify(total)
    }
}

fn ensure_positive(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(FreightError::InvalidAmount { amount });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deposit_increases_balance() {
        let mut book = AccountBook::new();
        let user = AccountId::new();
        book.deposit(user, Decimal::new(1000, 0)).unwrap();
        assert_eq!(book.balance(user), Decimal::new(1000, 0));
        assert_eq!(book.available(user), Decimal::new(1000, 0));
    }

    #[test]
    fn non_positive_deposit_rejected() {
        let mut book = AccountBook::new();
        let err = book.deposit(AccountId::new(), Decimal::ZERO).unwrap_err();
        assert!(matches!(err, FreightError::InvalidAmount { .. }));
        assert!(book.deposit(AccountId::new(), Decimal::NEGATIVE_ONE).is_err());
    }

    #[test]
    fn debit_insufficient_fails_unchanged() {
        let mut book = AccountBook::new();
        let user = AccountId::new();
        book.deposit(user, Decimal::new(100, 0)).unwrap();
        let err = book.debit(user, Decimal::new(200, 0)).unwrap_err();
        assert_eq!(
            err,
            FreightError::InsufficientFunds {
                needed: Decimal::new(200, 0),
                available: Decimal::new(100, 0),
            }
        );
        assert_eq!(book.balance(user), Decimal::new(100, 0));
    }

    #[test]
    fn debit_unknown_account_fails() {
        let mut book = AccountBook::new();
        let err = book.debit(AccountId::new(), Decimal::ONE).unwrap_err();
        assert!(matches!(err, FreightError::InsufficientFunds { .. }));
    }

    #[test]
    fn withdraw_reduces_expected_supply() {
        let mut book = AccountBook::new();
        let user = AccountId::new();
        book.deposit(user, Decimal::new(10, 0)).unwrap();
        book.withdraw(user, Decimal::new(4, 0)).unwrap();
        assert_eq!(book.balance(user), Decimal::new(6, 0));
        assert_eq!(book.supply().expected_supply(), Decimal::new(6, 0));
        assert!(book.audit(Decimal::ZERO).is_ok());
    }

    #[test]
    fn audit_accounts_for_escrowed_value() {
        let mut book = AccountBook::new();
        let user = AccountId::new();
        book.deposit(user, Decimal::new(10, 0)).unwrap();
        book.debit(user, Decimal::new(3, 0)).unwrap();

        // 7 in the book + 3 held in escrow == 10 deposited.
        assert!(book.audit(Decimal::new(3, 0)).is_ok());
        assert!(book.audit(Decimal::ZERO).is_err());
    }

    #[test]
    fn credit_creates_account() {
        let mut book = AccountBook::new();
        let carrier = AccountId::new();
        book.credit(carrier, Decimal::TWO).unwrap();
        assert_eq!(book.balance(carrier), Decimal::TWO);
        assert_eq!(book.total_balance(), Decimal::TWO);
    }

    #[test]
    fn deposit_overflow_is_typed_error() {
        let mut book = AccountBook::new();
        let user = AccountId::new();
        book.deposit(user, Decimal::MAX).unwrap();
        let err = book.deposit(user, Decimal::MAX).unwrap_err();
        assert_eq!(err, FreightError::AmountOverflow { amount: Decimal::MAX });
        assert_eq!(book.balance(user), Decimal::MAX);
        assert!(book.audit(Decimal::ZERO).is_ok());

        // A second account cannot push total supply past the limit either.
        let other = AccountId::new();
        assert!(matches!(
            book.deposit(other, Decimal::ONE),
            Err(FreightError::AmountOverflow { .. })
        ));
        assert_eq!(book.balance(other), Decimal::ZERO);
    }

    #[test]
    fn credit_overflow_leaves_balance() {
        let mut book = AccountBook::new();
        let carrier = AccountId::new();
        book.credit(carrier, Decimal::MAX).unwrap();
        let err = book.credit(carrier, Decimal::ONE).unwrap_err();
        assert_eq!(err.code(), "FL_ERR_404");
        assert_eq!(book.balance(carrier), Decimal::MAX);

        // Credits without matching deposits break conservation; the audit
        // reports it instead of overflowing.
        book.credit(AccountId::new(), Decimal::ONE).unwrap();
        assert!(book.audit(Decimal::ZERO).unwrap_err().is_fatal());
    }
}
