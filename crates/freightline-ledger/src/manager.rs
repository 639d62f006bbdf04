//! `FreightManager`: the single entry point for the presentation layer.
//!
//! Parses raw requests, runs the operation on the [`TripLedger`] under one
//! lock, publishes the resulting events, and hands back a confirmation or a
//! typed error. Rejections are logged at `warn!`, ledger inconsistencies at
//! `error!`.
//!
//! The lock serializes every mutation, which gives the per-entity ordering
//! the ledger needs: of two concurrent assignments of one vehicle exactly one
//! wins. Events are published before the lock is released, so journal order
//! matches commit order.

use ed25519_dalek::VerifyingKey;
use freightline_escrow::{AccountBook, EscrowVault, FundingSource};
use freightline_types::constants::{LEDGER_NAME, VERSION};
use freightline_types::{
    AccountId, EscrowReceipt, EscrowRecord, EscrowState, EventEnvelope, FreightConfig,
    FreightError, FreightEvent, IdentityContext, Result, Trip, TripDirection, TripId, TripStatus,
    Vehicle, VehicleId, VehicleStatus,
};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::events::EventBus;
use crate::ledger::TripLedger;
use crate::request::{
    AssignVehicleRequest, ConfirmDeliveryRequest, DeliveryConfirmation, RegisterVehicleRequest,
    ScheduleForwardTripRequest, ScheduleReverseTripRequest, TripAssignment, TripScheduling,
    VehicleRegistration,
};

pub struct FreightManager<F = AccountBook> {
    config: FreightConfig,
    ledger: Mutex<TripLedger<F>>,
    events: EventBus,
}

impl FreightManager<AccountBook> {
    /// A manager with an empty in-memory account book and a fresh vault key.
    ///
    /// # Errors
    /// `Configuration` if `config` is invalid.
    pub fn new(config: FreightConfig) -> Result<Self> {
        Self::with_parts(config, EscrowVault::generate(), AccountBook::new())
    }

    /// Credit `account` from outside the ledger. Returns the new balance.
    ///
    /// # Errors
    /// `InvalidAmount` if `amount <= 0`, `AmountOverflow` if the ledger
    /// cannot hold it.
    pub fn deposit(&self, account: AccountId, amount: Decimal) -> Result<Decimal> {
        let mut ledger = self.ledger.lock();
        let book = ledger.funds_mut();
        observe("deposit", book.deposit(account, amount))?;
        info!(account = %account, amount = %amount, "Deposit");
        Ok(book.balance(account))
    }

    /// Pay out of the ledger from the caller's own balance.
    ///
    /// # Errors
    /// `InvalidAmount` or `InsufficientFunds`.
    pub fn withdraw(&self, caller: &IdentityContext, amount: Decimal) -> Result<Decimal> {
        let mut ledger = self.ledger.lock();
        let book = ledger.funds_mut();
        observe("withdraw", book.withdraw(caller.caller(), amount))?;
        info!(account = %caller.caller(), amount = %amount, "Withdrawal");
        Ok(book.balance(caller.caller()))
    }

    #[must_use]
    pub fn balance(&self, account: AccountId) -> Decimal {
        self.ledger.lock().funds().balance(account)
    }
}

impl<F: FundingSource> FreightManager<F> {
    /// Assemble a manager from an explicit vault and funding backend.
    ///
    /// # Errors
    /// `Configuration` if `config` is invalid.
    pub fn with_parts(config: FreightConfig, vault: EscrowVault, funds: F) -> Result<Self> {
        config.validate()?;
        info!(
            ledger = LEDGER_NAME,
            version = VERSION,
            assignment_policy = ?config.assignment_policy,
            reverse_payee = ?config.reverse_payee,
            "Freight manager ready"
        );
        Ok(Self {
            events: EventBus::with_capacity(config.event_capacity),
            ledger: Mutex::new(TripLedger::new(config.clone(), vault, funds)),
            config,
        })
    }

    // -----------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------

    /// # Errors
    /// `InvalidInput` if the capacity is not a positive whole number.
    pub fn register_vehicle(
        &self,
        caller: &IdentityContext,
        request: &RegisterVehicleRequest,
    ) -> Result<VehicleRegistration> {
        observe("register_vehicle", self.try_register_vehicle(caller, request))
    }

    fn try_register_vehicle(
        &self,
        caller: &IdentityContext,
        request: &RegisterVehicleRequest,
    ) -> Result<VehicleRegistration> {
        let capacity = request.capacity()?;
        let mut ledger = self.ledger.lock();
        let vehicle_id = ledger.register_vehicle(caller, capacity)?;
        self.events.publish(FreightEvent::VehicleRegistered {
            vehicle_id,
            owner: caller.caller(),
            capacity,
            status: VehicleStatus::Idle,
        });
        info!(vehicle = %vehicle_id, owner = %caller.caller(), capacity, "Vehicle registered");
        Ok(VehicleRegistration {
            vehicle_id,
            capacity,
            status: VehicleStatus::Idle,
        })
    }

    /// # Errors
    /// `InvalidInput` for malformed fields, `InsufficientFunds` if the
    /// caller cannot cover the escrow.
    pub fn schedule_forward_trip(
        &self,
        caller: &IdentityContext,
        request: &ScheduleForwardTripRequest,
    ) -> Result<TripScheduling> {
        let result = request.consignment(&self.config).and_then(|consignment| {
            let mut ledger = self.ledger.lock();
            let amount = consignment.escrow_amount;
            let trip_id = ledger.schedule_forward_trip(caller, consignment)?;
            Ok(self.scheduled(trip_id, TripDirection::Forward, amount))
        });
        observe("schedule_forward_trip", result)
    }

    /// # Errors
    /// As [`FreightManager::schedule_forward_trip`], plus `VehicleNotFound`.
    pub fn schedule_reverse_trip(
        &self,
        caller: &IdentityContext,
        request: &ScheduleReverseTripRequest,
    ) -> Result<TripScheduling> {
        observe(
            "schedule_reverse_trip",
            self.try_schedule_reverse_trip(caller, request),
        )
    }

    fn try_schedule_reverse_trip(
        &self,
        caller: &IdentityContext,
        request: &ScheduleReverseTripRequest,
    ) -> Result<TripScheduling> {
        let vehicle_id = request.vehicle_id()?;
        let consignment = request.consignment(&self.config)?;
        let amount = consignment.escrow_amount;
        let mut ledger = self.ledger.lock();
        let trip_id = ledger.schedule_reverse_trip(caller, vehicle_id, consignment)?;
        Ok(self.scheduled(trip_id, TripDirection::Reverse, amount))
    }

    /// Must be called with the ledger lock held.
    fn scheduled(&self, trip_id: TripId, direction: TripDirection, amount: Decimal) -> TripScheduling {
        self.events.publish(FreightEvent::TripScheduled {
            trip_id,
            direction,
            escrow_amount: amount,
            status: TripStatus::Scheduled,
        });
        TripScheduling {
            trip_id,
            direction,
            escrow_amount: amount,
            status: TripStatus::Scheduled,
        }
    }

    /// # Errors
    /// See [`TripLedger::assign_vehicle`].
    pub fn assign_vehicle_to_forward_trip(
        &self,
        caller: &IdentityContext,
        request: &AssignVehicleRequest,
    ) -> Result<TripAssignment> {
        observe(
            "assign_vehicle_to_forward_trip",
            self.assign(caller, TripDirection::Forward, request),
        )
    }

    /// # Errors
    /// See [`TripLedger::assign_vehicle`].
    pub fn assign_vehicle_to_reverse_trip(
        &self,
        caller: &IdentityContext,
        request: &AssignVehicleRequest,
    ) -> Result<TripAssignment> {
        observe(
            "assign_vehicle_to_reverse_trip",
            self.assign(caller, TripDirection::Reverse, request),
        )
    }

    fn assign(
        &self,
        caller: &IdentityContext,
        direction: TripDirection,
        request: &AssignVehicleRequest,
    ) -> Result<TripAssignment> {
        let (trip_id, vehicle_id) = request.ids()?;
        let mut ledger = self.ledger.lock();
        ledger.assign_vehicle(caller, direction, trip_id, vehicle_id)?;
        self.events.publish(FreightEvent::TripAssigned {
            trip_id,
            vehicle_id,
            status: TripStatus::Assigned,
        });
        Ok(TripAssignment {
            trip_id,
            vehicle_id,
            status: TripStatus::Assigned,
        })
    }

    /// Shipper attests a forward delivery; escrow goes to the carrier.
    ///
    /// # Errors
    /// See [`TripLedger::deliver`].
    pub fn mark_forward_trip_delivered(
        &self,
        caller: &IdentityContext,
        request: &ConfirmDeliveryRequest,
    ) -> Result<DeliveryConfirmation> {
        let result = request.trip_id().and_then(|trip_id| {
            let mut ledger = self.ledger.lock();
            let receipt = ledger.mark_forward_trip_delivered(caller, trip_id)?;
            self.delivered(&ledger, trip_id, receipt)
        });
        observe("mark_forward_trip_delivered", result)
    }

    /// Carrier submits proof for a reverse delivery.
    ///
    /// # Errors
    /// `InvalidInput` if the proof is missing or malformed; otherwise see
    /// [`TripLedger::deliver`].
    pub fn mark_reverse_trip_delivered(
        &self,
        caller: &IdentityContext,
        request: &ConfirmDeliveryRequest,
    ) -> Result<DeliveryConfirmation> {
        observe(
            "mark_reverse_trip_delivered",
            self.try_mark_reverse_trip_delivered(caller, request),
        )
    }

    fn try_mark_reverse_trip_delivered(
        &self,
        caller: &IdentityContext,
        request: &ConfirmDeliveryRequest,
    ) -> Result<DeliveryConfirmation> {
        let trip_id = request.trip_id()?;
        let proof = request.proof()?;
        let mut ledger = self.ledger.lock();
        let receipt = ledger.mark_reverse_trip_delivered(caller, trip_id, proof)?;
        self.delivered(&ledger, trip_id, receipt)
    }

    fn delivered(
        &self,
        ledger: &TripLedger<F>,
        trip_id: TripId,
        receipt: EscrowReceipt,
    ) -> Result<DeliveryConfirmation> {
        let trip = ledger.trip_or_err(trip_id)?;
        let vehicle_id = trip
            .assigned_vehicle
            .ok_or_else(|| FreightError::InvariantViolation {
                reason: format!("delivered trip {trip_id} has no vehicle"),
            })?;
        self.events.publish(FreightEvent::TripDelivered {
            trip_id,
            vehicle_id,
            proof_of_delivery: trip.proof_of_delivery.as_ref().map(ToString::to_string),
            status: TripStatus::Delivered,
        });
        self.events.publish(FreightEvent::EscrowReleased {
            trip_id,
            payee: receipt.payee,
            amount: receipt.amount,
            state: EscrowState::Released,
        });
        Ok(DeliveryConfirmation {
            trip_id,
            vehicle_id,
            status: TripStatus::Delivered,
            receipt,
        })
    }

    // -----------------------------------------------------------------
    // Queries (snapshots)
    // -----------------------------------------------------------------

    #[must_use]
    pub fn vehicle(&self, vehicle_id: VehicleId) -> Option<Vehicle> {
        self.ledger.lock().registry().get(&vehicle_id).cloned()
    }

    #[must_use]
    pub fn trip(&self, trip_id: TripId) -> Option<Trip> {
        self.ledger.lock().trip(&trip_id).cloned()
    }

    #[must_use]
    pub fn escrow(&self, trip_id: TripId) -> Option<EscrowRecord> {
        self.ledger.lock().vault().get(&trip_id).cloned()
    }

    #[must_use]
    pub fn receipt(&self, trip_id: TripId) -> Option<EscrowReceipt> {
        self.ledger.lock().vault().receipt(&trip_id).cloned()
    }

    #[must_use]
    pub fn trips_for_vehicle(&self, vehicle_id: VehicleId) -> Vec<Trip> {
        self.ledger
            .lock()
            .trips_for_vehicle(vehicle_id)
            .into_iter()
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn vehicles_owned_by(&self, owner: AccountId) -> Vec<Vehicle> {
        self.ledger
            .lock()
            .registry()
            .owned_by(owner)
            .into_iter()
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn vehicle_count(&self) -> usize {
        self.ledger.lock().registry().len()
    }

    #[must_use]
    pub fn trip_count(&self) -> usize {
        self.ledger.lock().trips().count()
    }

    /// Value currently locked in escrow.
    #[must_use]
    pub fn escrow_held(&self) -> Decimal {
        self.ledger.lock().vault().held()
    }

    // -----------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.events.subscribe()
    }

    #[must_use]
    pub fn events_since(&self, after: u64) -> Vec<EventEnvelope> {
        self.events.events_since(after)
    }

    // -----------------------------------------------------------------
    // Integrity
    // -----------------------------------------------------------------

    /// Audit the whole ledger: trip/escrow/vehicle agreement and value
    /// conservation.
    ///
    /// # Errors
    /// `InvariantViolation` describing the first discrepancy.
    pub fn verify_conservation(&self) -> Result<()> {
        observe("verify_conservation", self.ledger.lock().audit())
    }

    /// Key that verifies every [`EscrowReceipt`] this manager issues.
    #[must_use]
    pub fn vault_verifying_key(&self) -> VerifyingKey {
        self.ledger.lock().vault().verifying_key()
    }

    #[must_use]
    pub fn config(&self) -> &FreightConfig {
        &self.config
    }
}

fn observe<T>(action: &'static str, result: Result<T>) -> Result<T> {
    if let Err(err) = &result {
        if err.is_fatal() {
            error!(action, code = err.code(), error = %err, "Ledger inconsistency, operation aborted");
        } else {
            warn!(action, code = err.code(), kind = %err.kind(), error = %err, "Operation rejected");
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use freightline_types::ErrorKind;

    use super::*;

    const CID: &str = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";

    fn forward_request(cargo: &str, escrow: &str) -> ScheduleForwardTripRequest {
        ScheduleForwardTripRequest {
            origin: "NYC".to_string(),
            destination: "LA".to_string(),
            cargo_weight: cargo.to_string(),
            escrow_amount: escrow.to_string(),
        }
    }

    fn assign(trip: &str, vehicle: &str) -> AssignVehicleRequest {
        AssignVehicleRequest {
            trip_id: trip.to_string(),
            vehicle_id: vehicle.to_string(),
        }
    }

    fn funded(manager: &FreightManager) -> IdentityContext {
        let ctx = IdentityContext::new(AccountId::new());
        manager.deposit(ctx.caller(), Decimal::new(50, 0)).unwrap();
        ctx
    }

    #[test]
    fn invalid_config_rejected() {
        let config = FreightConfig {
            event_capacity: 0,
            ..FreightConfig::default()
        };
        assert!(matches!(
            FreightManager::new(config),
            Err(FreightError::Configuration(_))
        ));
    }

    #[test]
    fn forward_flow_emits_events_in_order() {
        let manager = FreightManager::new(FreightConfig::default()).unwrap();
        let carrier = funded(&manager);
        let shipper = funded(&manager);
        let mut rx = manager.subscribe();

        let reg = manager
            .register_vehicle(&carrier, &RegisterVehicleRequest { capacity: "1000".into() })
            .unwrap();
        assert_eq!(reg.vehicle_id, VehicleId(1));
        let sched = manager
            .schedule_forward_trip(&shipper, &forward_request("500", "2.0"))
            .unwrap();
        assert_eq!(sched.trip_id, TripId(1));
        manager
            .assign_vehicle_to_forward_trip(&carrier, &assign("T1", "V1"))
            .unwrap();
        let done = manager
            .mark_forward_trip_delivered(&shipper, &ConfirmDeliveryRequest::forward("1"))
            .unwrap();
        assert_eq!(done.status, TripStatus::Delivered);
        assert!(done.receipt.verify(&manager.vault_verifying_key()));

        let names: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| e.event.name())
            .collect();
        assert_eq!(
            names,
            vec![
                "VehicleRegistered",
                "TripScheduled",
                "TripAssigned",
                "TripDelivered",
                "EscrowReleased"
            ]
        );
        assert_eq!(manager.balance(carrier.caller()), Decimal::new(520, 1));
        manager.verify_conservation().unwrap();
    }

    #[test]
    fn rejected_operation_emits_nothing() {
        let manager = FreightManager::new(FreightConfig::default()).unwrap();
        let shipper = funded(&manager);
        let err = manager
            .schedule_forward_trip(&shipper, &forward_request("abc", "1"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(manager.events_since(0).is_empty());
        assert_eq!(manager.trip_count(), 0);
    }

    #[test]
    fn withdraw_limited_to_balance() {
        let manager = FreightManager::new(FreightConfig::default()).unwrap();
        let ctx = funded(&manager);
        assert_eq!(
            manager.withdraw(&ctx, Decimal::new(20, 0)).unwrap(),
            Decimal::new(30, 0)
        );
        let err = manager.withdraw(&ctx, Decimal::new(31, 0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
        manager.verify_conservation().unwrap();
    }

    #[test]
    fn reverse_delivery_requires_proof() {
        let manager = FreightManager::new(FreightConfig::default()).unwrap();
        let carrier = funded(&manager);
        let initiator = funded(&manager);
        manager
            .register_vehicle(&carrier, &RegisterVehicleRequest { capacity: "300".into() })
            .unwrap();
        manager
            .schedule_reverse_trip(
                &initiator,
                &ScheduleReverseTripRequest {
                    vehicle_id: "V1".into(),
                    origin: "LA".into(),
                    destination: "NYC".into(),
                    cargo_weight: "250".into(),
                    escrow_amount: "1.5".into(),
                },
            )
            .unwrap();
        manager
            .assign_vehicle_to_reverse_trip(&carrier, &assign("1", "1"))
            .unwrap();

        let err = manager
            .mark_reverse_trip_delivered(&carrier, &ConfirmDeliveryRequest::reverse("1", ""))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(manager.trip(TripId(1)).unwrap().status, TripStatus::Assigned);
        assert!(!manager.escrow(TripId(1)).unwrap().is_released());

        let done = manager
            .mark_reverse_trip_delivered(&carrier, &ConfirmDeliveryRequest::reverse("1", CID))
            .unwrap();
        assert_eq!(done.receipt.payee, initiator.caller());
        assert_eq!(
            manager.trip(TripId(1)).unwrap().proof_of_delivery.unwrap().as_str(),
            CID
        );
    }
}
