//! Escrow vault: funds and releases per-trip escrow.
//!
//! Funding debits the payer and locks the amount under the trip id.
//! Release credits the payee with the full amount, marks the record
//! RELEASED and signs an [`EscrowReceipt`]. A record is released at most
//! once; a second attempt is rejected with `AlreadyReleased`.

use std::collections::HashMap;

use ed25519_dalek::{SigningKey, VerifyingKey};
use freightline_types::{
    AccountId, EscrowReceipt, EscrowRecord, FreightError, IdentityContext, Result, TripId,
};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::conservation::checked_add;
use crate::funding::FundingSource;

/// Who gets paid on release, and who may trigger it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseInstruction {
    pub trip_id: TripId,
    pub payee: AccountId,
    /// The only identity allowed to trigger this release.
    pub confirmer: AccountId,
}

pub struct EscrowVault {
    records: HashMap<TripId, EscrowRecord>,
    receipts: HashMap<TripId, EscrowReceipt>,
    /// Total value currently locked.
    held: Decimal,
    signing_key: SigningKey,
}

impl EscrowVault {
    /// Create a vault that signs receipts with `signing_key`.
    #[must_use]
    pub fn new(signing_key: SigningKey) -> Self {
        Self {
            records: HashMap::new(),
            receipts: HashMap::new(),
            held: Decimal::ZERO,
            signing_key,
        }
    }

    /// Create a vault with a fresh random signing key.
    #[must_use]
    pub fn generate() -> Self {
        Self::new(SigningKey::generate(&mut rand::rngs::OsRng))
    }

    /// Lock `amount` for `trip_id`, debiting `payer`.
    ///
    /// Fails without side effects: if the debit fails no record is created.
    ///
    /// # Errors
    /// - `InvalidAmount` if `amount <= 0`
    /// - `EscrowAlreadyFunded` if the trip already has escrow
    /// - `AmountOverflow` if the vault cannot hold any more value
    /// - `InsufficientFunds` from the funding source
    pub fn fund<F: FundingSource + ?Sized>(
        &mut self,
        source: &mut F,
        trip_id: TripId,
        amount: Decimal,
        payer: AccountId,
    ) -> Result<()> {
        if amount <= Decimal::ZERO {
            return Err(FreightError::InvalidAmount { amount });
        }
        if self.records.contains_key(&trip_id) {
            return Err(FreightError::EscrowAlreadyFunded(trip_id));
        }

        let held = checked_add(self.held, amount)?;
        source.debit(payer, amount)?;

        self.records
            .insert(trip_id, EscrowRecord::locked(trip_id, amount, payer));
        self.held = held;
        debug!(trip = %trip_id, payer = %payer, amount = %amount, "Escrow funded");
        Ok(())
    }

    /// Check that `caller` may release escrow for the instruction's trip,
    /// without changing anything.
    ///
    /// # Errors
    /// - `EscrowNotFound` if the trip has no escrow
    /// - `AlreadyReleased` if it was already paid out
    /// - `Unauthorized` if `caller` is not the designated confirmer
    pub fn check_release(
        &self,
        instruction: &ReleaseInstruction,
        caller: &IdentityContext,
    ) -> Result<&EscrowRecord> {
        let record = self
            .records
            .get(&instruction.trip_id)
            .ok_or(FreightError::EscrowNotFound(instruction.trip_id))?;
        if record.is_released() {
            return Err(FreightError::AlreadyReleased(instruction.trip_id));
        }
        if !caller.is(instruction.confirmer) {
            return Err(FreightError::Unauthorized {
                action: "release escrow",
                caller: caller.caller(),
            });
        }
        if self.held < record.amount {
            return Err(FreightError::InvariantViolation {
                reason: format!(
                    "vault holds {} but trip {} has {} locked",
                    self.held, record.trip_id, record.amount
                ),
            });
        }
        Ok(record)
    }

    /// Pay the full locked amount to the payee and mark the record released.
    ///
    /// The payee is credited before the record changes, so a failing
    /// funding source leaves the escrow locked.
    ///
    /// # Errors
    /// Everything [`EscrowVault::check_release`] returns, plus funding
    /// source errors.
    pub fn release<F: FundingSource + ?Sized>(
        &mut self,
        source: &mut F,
        instruction: &ReleaseInstruction,
        caller: &IdentityContext,
    ) -> Result<EscrowReceipt> {
        let amount = self.check_release(instruction, caller)?.amount;

        source.credit(instruction.payee, amount)?;

        let record = self
            .records
            .get_mut(&instruction.trip_id)
            .ok_or(FreightError::EscrowNotFound(instruction.trip_id))?;
        record.mark_released(instruction.payee)?;
        self.held -= amount;

        let receipt = EscrowReceipt::issue(record, &self.signing_key)?;
        self.receipts.insert(instruction.trip_id, receipt.clone());

        info!(
            trip = %instruction.trip_id,
            payee = %instruction.payee,
            amount = %amount,
            receipt = %receipt.hash_hex(),
            "Escrow released"
        );
        Ok(receipt)
    }

    /// Verify that the sum of locked records equals the value held.
    ///
    /// # Errors
    /// `InvariantViolation` if they differ.
    pub fn verify_consistency(&self) -> Result<()> {
        let locked: Decimal = self.records.values().map(EscrowRecord::locked_amount).sum();
        if locked != self.held {
            return Err(FreightError::InvariantViolation {
                reason: format!("locked escrow {locked} != vault held {}", self.held),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn get(&self, trip_id: &TripId) -> Option<&EscrowRecord> {
        self.records.get(trip_id)
    }

    #[must_use]
    pub fn receipt(&self, trip_id: &TripId) -> Option<&EscrowReceipt> {
        self.receipts.get(trip_id)
    }

    /// Total value currently locked.
    #[must_use]
    pub fn held(&self) -> Decimal {
        self.held
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn locked_count(&self) -> usize {
        self.records.values().filter(|r| !r.is_released()).count()
    }

    #[must_use]
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }
}
