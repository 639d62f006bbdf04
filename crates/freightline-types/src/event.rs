//! Ledger events.
//!
//! One event is emitted per committed state change, after the change is
//! visible. Each carries the affected entity id and its new state.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    AccountId, EscrowState, TripDirection, TripId, TripStatus, VehicleId, VehicleStatus,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FreightEvent {
    VehicleRegistered {
        vehicle_id: VehicleId,
        owner: AccountId,
        capacity: u64,
        status: VehicleStatus,
    },
    TripScheduled {
        trip_id: TripId,
        direction: TripDirection,
        escrow_amount: Decimal,
        status: TripStatus,
    },
    TripAssigned {
        trip_id: TripId,
        vehicle_id: VehicleId,
        status: TripStatus,
    },
    TripDelivered {
        trip_id: TripId,
        vehicle_id: VehicleId,
        proof_of_delivery: Option<String>,
        status: TripStatus,
    },
    EscrowReleased {
        trip_id: TripId,
        payee: AccountId,
        amount: Decimal,
        state: EscrowState,
    },
}

impl FreightEvent {
    /// Short name for logs and topic filters.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::VehicleRegistered { .. } => "VehicleRegistered",
            Self::TripScheduled { .. } => "TripScheduled",
            Self::TripAssigned { .. } => "TripAssigned",
            Self::TripDelivered { .. } => "TripDelivered",
            Self::EscrowReleased { .. } => "EscrowReleased",
        }
    }

    /// The trip this event concerns, if any.
    #[must_use]
    pub fn trip_id(&self) -> Option<TripId> {
        match self {
            Self::VehicleRegistered { .. } => None,
            Self::TripScheduled { trip_id, .. }
            | Self::TripAssigned { trip_id, .. }
            | Self::TripDelivered { trip_id, .. }
            | Self::EscrowReleased { trip_id, .. } => Some(*trip_id),
        }
    }

    /// The vehicle this event concerns, if any.
    #[must_use]
    pub fn vehicle_id(&self) -> Option<VehicleId> {
        match self {
            Self::VehicleRegistered { vehicle_id, .. }
            | Self::TripAssigned { vehicle_id, .. }
            | Self::TripDelivered { vehicle_id, .. } => Some(*vehicle_id),
            Self::TripScheduled { .. } | Self::EscrowReleased { .. } => None,
        }
    }
}

/// An event stamped with its position in the ledger's journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Strictly increasing, starting at 1.
    pub sequence: u64,
    pub at: DateTime<Utc>,
    pub event: FreightEvent,
}
