//! # freightline-ledger
//!
//! Vehicle registry, trip state machine and the [`FreightManager`] entry
//! point of the Freightline ledger.
//!
//! ## Trip lifecycle
//!
//! ```text
//! scheduleForwardTrip / scheduleReverseTrip   escrow funded      SCHEDULED
//!        │
//! assignVehicleTo{Forward,Reverse}Trip        vehicle reserved   ASSIGNED
//!        │
//! mark{Forward,Reverse}TripDelivered          escrow released,   DELIVERED
//!                                             vehicle freed
//! ```
//!
//! Forward trips are confirmed by their shipper and pay the carrier. Reverse
//! trips are confirmed by the carrier with a content-addressed proof of
//! delivery and pay the party chosen by
//! [`ReversePayee`](freightline_types::ReversePayee).
//!
//! ## Components
//!
//! - [`VehicleRegistry`]: vehicles and their IDLE/ASSIGNED status
//! - [`TripLedger`]: trips, plus orchestration of registry and escrow vault
//! - [`EventBus`]: sequenced event journal with live broadcast
//! - [`FreightManager`]: request parsing, locking, events, logging
//! - [`telemetry`]: `tracing` subscriber bootstrap

pub mod events;
pub mod ledger;
pub mod manager;
pub mod registry;
pub mod request;
pub mod telemetry;

pub use events::EventBus;
pub use ledger::{Consignment, TripLedger};
pub use manager::FreightManager;
pub use registry::VehicleRegistry;
pub use request::{
    AssignVehicleRequest, ConfirmDeliveryRequest, DeliveryConfirmation, RegisterVehicleRequest,
    ScheduleForwardTripRequest, ScheduleReverseTripRequest, TripAssignment, TripScheduling,
    VehicleRegistration,
};
