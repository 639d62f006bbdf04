//! # Escrow records
//!
//! Each trip owns exactly one escrow record, funded when the trip is
//! scheduled and released once when it is delivered.
//!
//! ```text
//!   ┌────────┐  delivery attested   ┌──────────┐
//!   │ LOCKED ├─────────────────────▶│ RELEASED │
//!   └────────┘                      └──────────┘
//! ```
//!
//! - The amount never changes after funding.
//! - `LOCKED → RELEASED` is irreversible; this is what prevents double payout.
//! - Release pays the full amount to exactly one payee.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AccountId, FreightError, Result, TripId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EscrowState {
    /// Funds are held by the vault on behalf of the trip.
    Locked,
    /// Funds were paid out. **Irreversible.**
    Released,
}

impl EscrowState {
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!((self, target), (Self::Locked, Self::Released))
    }
}

impl std::fmt::Display for EscrowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Locked => write!(f, "LOCKED"),
            Self::Released => write!(f, "RELEASED"),
        }
    }
}

/// Escrowed value bound 1:1 to a trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowRecord {
    pub trip_id: TripId,
    pub amount: Decimal,
    pub payer: AccountId,
    pub state: EscrowState,
    /// Set exactly once, on release.
    pub payee: Option<AccountId>,
    pub funded_at: DateTime<Utc>,
    pub released_at: Option<DateTime<Utc>>,
}

impl EscrowRecord {
    #[must_use]
    pub fn locked(trip_id: TripId, amount: Decimal, payer: AccountId) -> Self {
        Self {
            trip_id,
            amount,
            payer,
            state: EscrowState::Locked,
            payee: None,
            funded_at: Utc::now(),
            released_at: None,
        }
    }

    #[must_use]
    pub fn is_released(&self) -> bool {
        self.state == EscrowState::Released
    }

    /// Amount still held for this trip (zero once released).
    #[must_use]
    pub fn locked_amount(&self) -> Decimal {
        match self.state {
            EscrowState::Locked => self.amount,
            EscrowState::Released => Decimal::ZERO,
        }
    }

    /// Transition to RELEASED in favour of `payee`.
    ///
    /// # Errors
    /// `AlreadyReleased` if the record was already paid out.
    pub fn mark_released(&mut self, payee: AccountId) -> Result<()> {
        if !self.state.can_transition_to(EscrowState::Released) {
            return Err(FreightError::AlreadyReleased(self.trip_id));
        }
        self.state = EscrowState::Released;
        self.payee = Some(payee);
        self.released_at = Some(Utc::now());
        Ok(())
    }
}
