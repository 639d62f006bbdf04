//! Vehicle records held by the registry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccountId, VehicleId};

/// Whether a vehicle is free to take a new trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehicleStatus {
    Idle,
    /// Reserved by exactly one trip that has not yet been delivered.
    Assigned,
}

impl std::fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "IDLE"),
            Self::Assigned => write!(f, "ASSIGNED"),
        }
    }
}

/// A registered freight vehicle. Never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    /// Identity that registered the vehicle.
    pub owner: AccountId,
    /// Maximum cargo weight, in cargo-weight units.
    pub capacity: u64,
    pub status: VehicleStatus,
    pub registered_at: DateTime<Utc>,
}

impl Vehicle {
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.status == VehicleStatus::Idle
    }

    #[must_use]
    pub fn can_carry(&self, cargo_weight: u64) -> bool {
        cargo_weight <= self.capacity
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl Vehicle {
    pub fn dummy(id: u64, owner: AccountId, capacity: u64) -> Self {
        Self {
            id: VehicleId(id),
            owner,
            capacity,
            status: VehicleStatus::Idle,
            registered_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_bound_is_inclusive() {
        let v = Vehicle::dummy(1, AccountId::new(), 1000);
        assert!(v.can_carry(1000));
        assert!(v.can_carry(1));
        assert!(!v.can_carry(1001));
    }

    #[test]
    fn new_vehicle_is_idle() {
        let v = Vehicle::dummy(1, AccountId::new(), 10);
        assert!(v.is_idle());
        assert_eq!(v.status.to_string(), "IDLE");
    }
}
