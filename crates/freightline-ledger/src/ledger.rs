//! Trip ledger: the trip/escrow state machine.
//!
//! The ledger owns the trip records together with the [`VehicleRegistry`],
//! the [`EscrowVault`] and the funding source, so that every transition can
//! update all three as one unit:
//!
//! ```text
//! schedule  → vault.fund()                          → trip SCHEDULED
//! assign    → registry.reserve()                    → trip ASSIGNED
//! deliver   → vault.release() + registry.release()  → trip DELIVERED
//! ```
//!
//! Each operation validates everything it can before it mutates anything.
//! The only fallible mutations (`vault.fund`, `vault.release`,
//! `registry.reserve`) are themselves all-or-nothing and run before the trip
//! record changes, so a failure leaves every store as it was.
//!
//! The ledger takes `&mut self`; callers that share it across threads wrap
//! it in a lock (see [`crate::FreightManager`]).

use std::collections::BTreeMap;

use chrono::Utc;
use freightline_escrow::{EscrowVault, FundingSource, ReleaseInstruction};
use freightline_types::{
    AccountId, EscrowReceipt, FreightConfig, FreightError, IdentityContext, ProofOfDelivery,
    ReversePayee, Result, Trip, TripDirection, TripId, TripStatus, VehicleId, VehicleStatus,
};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::registry::VehicleRegistry;

/// What a shipper or initiator asks to move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Consignment {
    pub origin: String,
    pub destination: String,
    pub cargo_weight: u64,
    pub escrow_amount: Decimal,
}

pub struct TripLedger<F> {
    config: FreightConfig,
    trips: BTreeMap<TripId, Trip>,
    /// Last issued id, shared by both directions.
    last_trip: TripId,
    registry: VehicleRegistry,
    vault: EscrowVault,
    funds: F,
}

impl<F: FundingSource> TripLedger<F> {
    #[must_use]
    pub fn new(config: FreightConfig, vault: EscrowVault, funds: F) -> Self {
        Self {
            config,
            trips: BTreeMap::new(),
            last_trip: TripId(0),
            registry: VehicleRegistry::new(),
            vault,
            funds,
        }
    }

    // -----------------------------------------------------------------
    // Vehicles
    // -----------------------------------------------------------------

    /// # Errors
    /// `InvalidInput` if `capacity` is zero.
    pub fn register_vehicle(&mut self, caller: &IdentityContext, capacity: u64) -> Result<VehicleId> {
        self.registry.register(caller, capacity)
    }

    // -----------------------------------------------------------------
    // Scheduling
    // -----------------------------------------------------------------

    /// Create a forward trip in SCHEDULED, funding escrow from the caller.
    ///
    /// # Errors
    /// - `InvalidInput` for an empty location, zero cargo or non-positive escrow
    /// - `InsufficientFunds` if the caller cannot fund the escrow
    pub fn schedule_forward_trip(
        &mut self,
        caller: &IdentityContext,
        consignment: Consignment,
    ) -> Result<TripId> {
        self.schedule(caller, TripDirection::Forward, None, consignment)
    }

    /// Create a reverse trip for the return leg of `vehicle_id`.
    ///
    /// # Errors
    /// `VehicleNotFound`, plus everything [`TripLedger::schedule_forward_trip`] returns.
    pub fn schedule_reverse_trip(
        &mut self,
        caller: &IdentityContext,
        vehicle_id: VehicleId,
        consignment: Consignment,
    ) -> Result<TripId> {
        self.registry.get_or_err(vehicle_id)?;
        self.schedule(caller, TripDirection::Reverse, Some(vehicle_id), consignment)
    }

    fn schedule(
        &mut self,
        caller: &IdentityContext,
        direction: TripDirection,
        origin_vehicle: Option<VehicleId>,
        consignment: Consignment,
    ) -> Result<TripId> {
        let Consignment {
            origin,
            destination,
            cargo_weight,
            escrow_amount,
        } = consignment;
        self.check_location("origin", &origin)?;
        self.check_location("destination", &destination)?;
        if cargo_weight == 0 {
            return Err(FreightError::InvalidInput {
                field: "cargo_weight",
                reason: "must be greater than zero".to_string(),
            });
        }
        if escrow_amount <= Decimal::ZERO {
            return Err(FreightError::InvalidInput {
                field: "escrow_amount",
                reason: format!("{escrow_amount} must be greater than zero"),
            });
        }

        // Funding and record creation succeed or fail together: the vault
        // leaves no trace on error, and the insert below cannot fail.
        let trip_id = self.last_trip.next();
        self.vault
            .fund(&mut self.funds, trip_id, escrow_amount, caller.caller())?;

        let now = Utc::now();
        self.trips.insert(
            trip_id,
            Trip {
                id: trip_id,
                direction,
                origin,
                destination,
                cargo_weight,
                escrow_amount,
                payer: caller.caller(),
                origin_vehicle,
                assigned_vehicle: None,
                proof_of_delivery: None,
                status: TripStatus::Scheduled,
                scheduled_at: now,
                updated_at: now,
            },
        );
        self.last_trip = trip_id;

        info!(
            trip = %trip_id,
            direction = %direction,
            payer = %caller.caller(),
            cargo_weight,
            escrow = %escrow_amount,
            "Trip scheduled"
        );
        Ok(trip_id)
    }

    fn check_location(&self, field: &'static str, value: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(FreightError::InvalidInput {
                field,
                reason: "must not be empty".to_string(),
            });
        }
        if value.chars().count() > self.config.max_location_len {
            return Err(FreightError::InvalidInput {
                field,
                reason: format!("longer than {} characters", self.config.max_location_len),
            });
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Assignment
    // -----------------------------------------------------------------

    /// # Errors
    /// See [`TripLedger::assign_vehicle`].
    pub fn assign_vehicle_to_forward_trip(
        &mut self,
        caller: &IdentityContext,
        trip_id: TripId,
        vehicle_id: VehicleId,
    ) -> Result<()> {
        self.assign_vehicle(caller, TripDirection::Forward, trip_id, vehicle_id)
    }

    /// # Errors
    /// See [`TripLedger::assign_vehicle`].
    pub fn assign_vehicle_to_reverse_trip(
        &mut self,
        caller: &IdentityContext,
        trip_id: TripId,
        vehicle_id: VehicleId,
    ) -> Result<()> {
        self.assign_vehicle(caller, TripDirection::Reverse, trip_id, vehicle_id)
    }

    /// Reserve `vehicle_id` for a SCHEDULED trip.
    ///
    /// # Errors
    /// - `TripNotFound` / `WrongDirection` / `WrongState` for the trip
    /// - `VehicleNotFound` / `NotOwner` / `AlreadyAssigned` for the vehicle
    /// - `CapacityExceeded` if the cargo is heavier than the vehicle's capacity
    pub fn assign_vehicle(
        &mut self,
        caller: &IdentityContext,
        direction: TripDirection,
        trip_id: TripId,
        vehicle_id: VehicleId,
    ) -> Result<()> {
        let trip = self.trip_or_err(trip_id)?;
        trip.ensure_direction(direction)?;
        trip.ensure_status(TripStatus::Scheduled)?;
        let cargo_weight = trip.cargo_weight;

        let policy = self.config.assignment_policy;
        let vehicle = self
            .registry
            .check_reservable(vehicle_id, caller, policy)?;
        if !vehicle.can_carry(cargo_weight) {
            return Err(FreightError::CapacityExceeded {
                vehicle: vehicle_id,
                capacity: vehicle.capacity,
                cargo_weight,
            });
        }

        self.registry.reserve(vehicle_id, caller, policy)?;
        let trip = self.trip_mut(trip_id)?;
        if let Err(err) = trip.mark_assigned(vehicle_id) {
            // Compensate: the trip did not move, so neither may the vehicle.
            self.registry.release(vehicle_id)?;
            return Err(err);
        }

        info!(trip = %trip_id, vehicle = %vehicle_id, direction = %direction, "Vehicle assigned");
        Ok(())
    }

    // -----------------------------------------------------------------
    // Delivery
    // -----------------------------------------------------------------

    /// Shipper confirms a forward trip; escrow goes to the carrier.
    ///
    /// # Errors
    /// See [`TripLedger::deliver`].
    pub fn mark_forward_trip_delivered(
        &mut self,
        caller: &IdentityContext,
        trip_id: TripId,
    ) -> Result<EscrowReceipt> {
        self.deliver(caller, TripDirection::Forward, trip_id, None)
    }

    /// Carrier submits proof for a reverse trip; escrow goes to the payee
    /// chosen by [`ReversePayee`].
    ///
    /// # Errors
    /// See [`TripLedger::deliver`].
    pub fn mark_reverse_trip_delivered(
        &mut self,
        caller: &IdentityContext,
        trip_id: TripId,
        proof: ProofOfDelivery,
    ) -> Result<EscrowReceipt> {
        self.deliver(caller, TripDirection::Reverse, trip_id, Some(proof))
    }

    /// `ASSIGNED → DELIVERED`: release escrow, free the vehicle.
    ///
    /// # Errors
    /// - `TripNotFound` / `WrongDirection` / `WrongState` for the trip
    /// - `InvalidInput` if a reverse trip has no proof
    /// - `Unauthorized` if `caller` is not the trip's confirmer
    /// - `InvariantViolation` if the vehicle or escrow records disagree with the trip
    pub fn deliver(
        &mut self,
        caller: &IdentityContext,
        direction: TripDirection,
        trip_id: TripId,
        proof: Option<ProofOfDelivery>,
    ) -> Result<EscrowReceipt> {
        let trip = self.trip_or_err(trip_id)?;
        trip.ensure_direction(direction)?;
        trip.ensure_status(TripStatus::Assigned)?;

        let vehicle_id = trip.assigned_vehicle.ok_or_else(|| FreightError::InvariantViolation {
            reason: format!("trip {trip_id} is ASSIGNED without a vehicle"),
        })?;
        let vehicle = self
            .registry
            .get(&vehicle_id)
            .ok_or_else(|| FreightError::InvariantViolation {
                reason: format!("trip {trip_id} references missing vehicle {vehicle_id}"),
            })?;
        if vehicle.status != VehicleStatus::Assigned {
            return Err(FreightError::InvariantViolation {
                reason: format!("vehicle {vehicle_id} of trip {trip_id} is {}", vehicle.status),
            });
        }

        let instruction = self.release_instruction(trip, vehicle.owner);

        // Stage the trip transition on a copy so that every check has run
        // before value moves.
        let mut delivered = trip.clone();
        delivered.mark_delivered(proof)?;

        self.vault
            .check_release(&instruction, caller)
            .map_err(|err| escalate_missing_escrow(trip_id, err))?;

        let receipt = self
            .vault
            .release(&mut self.funds, &instruction, caller)
            .map_err(|err| escalate_missing_escrow(trip_id, err))?;
        self.trips.insert(trip_id, delivered);
        self.registry.release(vehicle_id)?;

        info!(
            trip = %trip_id,
            vehicle = %vehicle_id,
            payee = %instruction.payee,
            amount = %receipt.amount,
            "Trip delivered"
        );
        Ok(receipt)
    }

    /// Who confirms delivery and who is paid, by direction.
    fn release_instruction(&self, trip: &Trip, carrier: AccountId) -> ReleaseInstruction {
        let (confirmer, payee) = match trip.direction {
            TripDirection::Forward => (trip.payer, carrier),
            TripDirection::Reverse => match self.config.reverse_payee {
                ReversePayee::Initiator => (carrier, trip.payer),
                ReversePayee::Carrier => (carrier, carrier),
            },
        };
        ReleaseInstruction {
            trip_id: trip.id,
            payee,
            confirmer,
        }
    }

    // -----------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------

    #[must_use]
    pub fn trip(&self, trip_id: &TripId) -> Option<&Trip> {
        self.trips.get(trip_id)
    }

    /// # Errors
    /// `TripNotFound` if the id is unknown.
    pub fn trip_or_err(&self, trip_id: TripId) -> Result<&Trip> {
        self.trips
            .get(&trip_id)
            .ok_or(FreightError::TripNotFound(trip_id))
    }

    fn trip_mut(&mut self, trip_id: TripId) -> Result<&mut Trip> {
        self.trips
            .get_mut(&trip_id)
            .ok_or(FreightError::TripNotFound(trip_id))
    }

    pub fn trips(&self) -> impl Iterator<Item = &Trip> {
        self.trips.values()
    }

    /// Trips the vehicle has been assigned to, oldest first.
    #[must_use]
    pub fn trips_for_vehicle(&self, vehicle_id: VehicleId) -> Vec<&Trip> {
        self.trips
            .values()
            .filter(|t| t.assigned_vehicle == Some(vehicle_id))
            .collect()
    }

    #[must_use]
    pub fn registry(&self) -> &VehicleRegistry {
        &self.registry
    }

    #[must_use]
    pub fn vault(&self) -> &EscrowVault {
        &self.vault
    }

    #[must_use]
    pub fn funds(&self) -> &F {
        &self.funds
    }

    pub fn funds_mut(&mut self) -> &mut F {
        &mut self.funds
    }

    #[must_use]
    pub fn config(&self) -> &FreightConfig {
        &self.config
    }

    // -----------------------------------------------------------------
    // Audit
    // -----------------------------------------------------------------

    /// Cross-check every store against the others.
    ///
    /// - each trip has exactly one escrow record with the trip's amount,
    ///   locked iff the trip is not DELIVERED
    /// - a vehicle is ASSIGNED iff exactly one undelivered trip holds it
    /// - the vault's held value equals the sum of locked escrow
    /// - the funding source accounts for all value
    ///
    /// # Errors
    /// `InvariantViolation` describing the first discrepancy found.
    pub fn audit(&self) -> Result<()> {
        let violation = |reason: String| Err(FreightError::InvariantViolation { reason });

        for trip in self.trips.values() {
            let Some(record) = self.vault.get(&trip.id) else {
                return violation(format!("trip {} has no escrow record", trip.id));
            };
            if record.amount != trip.escrow_amount {
                return violation(format!(
                    "trip {} escrow {} != trip amount {}",
                    trip.id, record.amount, trip.escrow_amount
                ));
            }
            if record.is_released() != trip.status.is_terminal() {
                return violation(format!(
                    "trip {} is {} but escrow is {}",
                    trip.id, trip.status, record.state
                ));
            }
        }
        if self.vault.count() != self.trips.len() {
            return violation(format!(
                "{} escrow records for {} trips",
                self.vault.count(),
                self.trips.len()
            ));
        }

        for vehicle in self.registry.iter() {
            let holders = self
                .trips
                .values()
                .filter(|t| t.assigned_vehicle == Some(vehicle.id) && !t.status.is_terminal())
                .count();
            let assigned = vehicle.status == VehicleStatus::Assigned;
            if assigned != (holders == 1) || holders > 1 {
                return violation(format!(
                    "vehicle {} is {} with {holders} open trips",
                    vehicle.id, vehicle.status
                ));
            }
        }

        self.vault.verify_consistency()?;
        self.funds.audit(self.vault.held())?;
        debug!(trips = self.trips.len(), vehicles = self.registry.len(), "Ledger audit passed");
        Ok(())
    }
}

/// A trip that exists always has escrow; if the vault disagrees the ledger
/// is corrupt, which must not surface as an ordinary user error.
fn escalate_missing_escrow(trip_id: TripId, err: FreightError) -> FreightError {
    match err {
        FreightError::EscrowNotFound(_) | FreightError::AlreadyReleased(_) => {
            FreightError::InvariantViolation {
                reason: format!("escrow for open trip {trip_id} is inconsistent: {err}"),
            }
        }
        other => other,
    }
}
