//! Vehicle registry.
//!
//! Owns every [`Vehicle`] record. Vehicles are never removed; their status
//! only changes when a trip reserves or releases them.

use std::collections::BTreeMap;

use chrono::Utc;
use freightline_types::{
    AccountId, AssignmentPolicy, FreightError, IdentityContext, Result, Vehicle, VehicleId,
    VehicleStatus,
};
use tracing::debug;

#[derive(Debug)]
pub struct VehicleRegistry {
    vehicles: BTreeMap<VehicleId, Vehicle>,
    /// Last issued id; `VehicleId(0)` before the first registration.
    last_id: VehicleId,
}

impl VehicleRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            vehicles: BTreeMap::new(),
            last_id: VehicleId(0),
        }
    }

    /// Register a vehicle owned by the caller. It starts IDLE.
    ///
    /// # Errors
    /// `InvalidInput` on `capacity` if it is zero.
    pub fn register(&mut self, caller: &IdentityContext, capacity: u64) -> Result<VehicleId> {
        if capacity == 0 {
            return Err(FreightError::InvalidInput {
                field: "capacity",
                reason: "must be greater than zero".to_string(),
            });
        }
        let id = self.last_id.next();
        self.vehicles.insert(
            id,
            Vehicle {
                id,
                owner: caller.caller(),
                capacity,
                status: VehicleStatus::Idle,
                registered_at: Utc::now(),
            },
        );
        self.last_id = id;
        debug!(vehicle = %id, owner = %caller.caller(), capacity, "Vehicle registered");
        Ok(id)
    }

    /// Check that `caller` could reserve `vehicle_id` right now.
    ///
    /// # Errors
    /// - `VehicleNotFound` if the id is unknown
    /// - `NotOwner` if the policy requires ownership and the caller lacks it
    /// - `AlreadyAssigned` if the vehicle is not IDLE
    pub fn check_reservable(
        &self,
        vehicle_id: VehicleId,
        caller: &IdentityContext,
        policy: AssignmentPolicy,
    ) -> Result<&Vehicle> {
        let vehicle = self.get_or_err(vehicle_id)?;
        if policy == AssignmentPolicy::OwnerOnly && !caller.is(vehicle.owner) {
            return Err(FreightError::NotOwner {
                vehicle: vehicle_id,
                caller: caller.caller(),
            });
        }
        if !vehicle.is_idle() {
            return Err(FreightError::AlreadyAssigned(vehicle_id));
        }
        Ok(vehicle)
    }

    /// `IDLE → ASSIGNED`.
    ///
    /// # Errors
    /// Everything [`VehicleRegistry::check_reservable`] returns.
    pub fn reserve(
        &mut self,
        vehicle_id: VehicleId,
        caller: &IdentityContext,
        policy: AssignmentPolicy,
    ) -> Result<()> {
        self.check_reservable(vehicle_id, caller, policy)?;
        if let Some(vehicle) = self.vehicles.get_mut(&vehicle_id) {
            vehicle.status = VehicleStatus::Assigned;
        }
        Ok(())
    }

    /// `ASSIGNED → IDLE`, once the vehicle's trip is delivered.
    ///
    /// # Errors
    /// - `VehicleNotFound` if the id is unknown
    /// - `InvariantViolation` if the vehicle was not reserved
    pub fn release(&mut self, vehicle_id: VehicleId) -> Result<()> {
        let vehicle = self
            .vehicles
            .get_mut(&vehicle_id)
            .ok_or(FreightError::VehicleNotFound(vehicle_id))?;
        if vehicle.status != VehicleStatus::Assigned {
            return Err(FreightError::InvariantViolation {
                reason: format!("released vehicle {vehicle_id} was {}", vehicle.status),
            });
        }
        vehicle.status = VehicleStatus::Idle;
        Ok(())
    }

    #[must_use]
    pub fn get(&self, vehicle_id: &VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(vehicle_id)
    }

    /// # Errors
    /// `VehicleNotFound` if the id is unknown.
    pub fn get_or_err(&self, vehicle_id: VehicleId) -> Result<&Vehicle> {
        self.vehicles
            .get(&vehicle_id)
            .ok_or(FreightError::VehicleNotFound(vehicle_id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.values()
    }

    #[must_use]
    pub fn owned_by(&self, owner: AccountId) -> Vec<&Vehicle> {
        self.vehicles.values().filter(|v| v.owner == owner).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }
}

impl Default for VehicleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
