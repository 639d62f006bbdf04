//! # Trip: the unit of the freight state machine
//!
//! ## State Machine
//!
//! ```text
//!   ┌───────────┐  assign   ┌──────────┐  deliver   ┌───────────┐
//!   │ SCHEDULED ├──────────▶│ ASSIGNED ├───────────▶│ DELIVERED │
//!   └───────────┘           └──────────┘            └───────────┘
//! ```
//!
//! Transitions are **monotonic**: no state is skipped and none is revisited.
//! A trip is created with its escrow already funded and is never deleted.
//!
//! Forward trips carry the shipper's cargo outbound. Reverse trips are return
//! legs that reference the vehicle they originate from and need a
//! [`ProofOfDelivery`] to complete.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AccountId, FreightError, ProofOfDelivery, Result, TripId, VehicleId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TripDirection {
    Forward,
    Reverse,
}

impl std::fmt::Display for TripDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Forward => write!(f, "FORWARD"),
            Self::Reverse => write!(f, "REVERSE"),
        }
    }
}

/// Lifecycle status of a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum TripStatus {
    /// Created and escrow-funded; no vehicle yet.
    Scheduled,
    /// A vehicle has been reserved for the trip.
    Assigned,
    /// Terminal. Escrow has been released.
    Delivered,
}

impl TripStatus {
    /// Can this trip move to `target` in a single step?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Scheduled, Self::Assigned) | (Self::Assigned, Self::Delivered)
        )
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        *self == Self::Delivered
    }
}

impl std::fmt::Display for TripStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scheduled => write!(f, "SCHEDULED"),
            Self::Assigned => write!(f, "ASSIGNED"),
            Self::Delivered => write!(f, "DELIVERED"),
        }
    }
}

/// A forward or reverse trip record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trip {
    pub id: TripId,
    pub direction: TripDirection,
    pub origin: String,
    pub destination: String,
    pub cargo_weight: u64,
    /// Amount locked in escrow when the trip was scheduled.
    pub escrow_amount: Decimal,
    /// Shipper (forward) or initiator (reverse); the escrow payer.
    pub payer: AccountId,
    /// For reverse trips, the vehicle whose return leg this is.
    pub origin_vehicle: Option<VehicleId>,
    pub assigned_vehicle: Option<VehicleId>,
    pub proof_of_delivery: Option<ProofOfDelivery>,
    pub status: TripStatus,
    pub scheduled_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Trip {
    /// Check that this trip is in `expected` without changing anything.
    ///
    /// # Errors
    /// `WrongState` naming both the required and the actual status.
    pub fn ensure_status(&self, expected: TripStatus) -> Result<()> {
        if self.status == expected {
            Ok(())
        } else {
            Err(FreightError::WrongState {
                trip: self.id,
                expected,
                actual: self.status,
            })
        }
    }

    /// # Errors
    /// `WrongDirection` if this trip runs the other way.
    pub fn ensure_direction(&self, expected: TripDirection) -> Result<()> {
        if self.direction == expected {
            Ok(())
        } else {
            Err(FreightError::WrongDirection {
                trip: self.id,
                expected,
            })
        }
    }

    /// `SCHEDULED → ASSIGNED`, recording the reserved vehicle.
    ///
    /// # Errors
    /// `WrongState` unless the trip is SCHEDULED.
    pub fn mark_assigned(&mut self, vehicle: VehicleId) -> Result<()> {
        self.transition(TripStatus::Assigned)?;
        self.assigned_vehicle = Some(vehicle);
        Ok(())
    }

    /// `ASSIGNED → DELIVERED`. Reverse trips must supply a proof.
    ///
    /// # Errors
    /// - `WrongState` unless the trip is ASSIGNED
    /// - `InvalidInput` if a reverse trip has no proof
    pub fn mark_delivered(&mut self, proof: Option<ProofOfDelivery>) -> Result<()> {
        if self.direction == TripDirection::Reverse && proof.is_none() {
            return Err(FreightError::InvalidInput {
                field: "proof_of_delivery",
                reason: format!("reverse trip {} requires a proof of delivery", self.id),
            });
        }
        self.transition(TripStatus::Delivered)?;
        self.proof_of_delivery = proof;
        Ok(())
    }

    fn transition(&mut self, target: TripStatus) -> Result<()> {
        if !self.status.can_transition_to(target) {
            let expected = match target {
                TripStatus::Assigned => TripStatus::Scheduled,
                TripStatus::Scheduled | TripStatus::Delivered => TripStatus::Assigned,
            };
            return Err(FreightError::WrongState {
                trip: self.id,
                expected,
                actual: self.status,
            });
        }
        self.status = target;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Dummy trips for unit tests. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl Trip {
    pub fn dummy(id: u64, direction: TripDirection, cargo_weight: u64, escrow: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id: TripId(id),
            direction,
            origin: "NYC".to_string(),
            destination: "LA".to_string(),
            cargo_weight,
            escrow_amount: escrow,
            payer: AccountId::new(),
            origin_vehicle: None,
            assigned_vehicle: None,
            proof_of_delivery: None,
            status: TripStatus::Scheduled,
            scheduled_at: now,
            updated_at: now,
        }
    }
}
