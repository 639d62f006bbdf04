//! Error types for the Freightline ledger.
//!
//! All errors use the `FL_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Input validation errors
//! - 2xx: Vehicle registry errors
//! - 3xx: Trip ledger errors
//! - 4xx: Escrow / funding errors
//! - 8xx: Authorization errors
//! - 9xx: Internal / configuration errors
//!
//! Every variant also maps onto a coarse [`ErrorKind`], the stable taxonomy
//! the presentation layer switches on.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{AccountId, TripDirection, TripId, TripStatus, VehicleId};

/// Central error enum for all Freightline operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FreightError {
    // =================================================================
    // Input Errors (1xx)
    // =================================================================
    /// A field supplied by the caller is empty, malformed or out of range.
    #[error("FL_ERR_100: Invalid input for '{field}': {reason}")]
    InvalidInput { field: &'static str, reason: String },

    /// Escrow funding with a zero or negative amount.
    #[error("FL_ERR_101: Invalid escrow amount: {amount} (must be > 0)")]
    InvalidAmount { amount: Decimal },

    // =================================================================
    // Vehicle Errors (2xx)
    // =================================================================
    #[error("FL_ERR_200: Vehicle not found: {0}")]
    VehicleNotFound(VehicleId),

    /// The vehicle is already carrying a non-terminal trip.
    #[error("FL_ERR_201: Vehicle {0} is already assigned")]
    AlreadyAssigned(VehicleId),

    /// Cargo heavier than the vehicle can carry.
    #[error(
        "FL_ERR_202: Cargo weight {cargo_weight} exceeds capacity {capacity} of vehicle {vehicle}"
    )]
    CapacityExceeded {
        vehicle: VehicleId,
        capacity: u64,
        cargo_weight: u64,
    },

    // =================================================================
    // Trip Errors (3xx)
    // =================================================================
    #[error("FL_ERR_300: Trip not found: {0}")]
    TripNotFound(TripId),

    /// A transition was attempted from a state that does not permit it.
    #[error("FL_ERR_301: Trip {trip} is {actual}, expected {expected}")]
    WrongState {
        trip: TripId,
        expected: TripStatus,
        actual: TripStatus,
    },

    /// A forward-trip operation was invoked on a reverse trip, or vice versa.
    #[error("FL_ERR_302: Trip {trip} is not a {expected} trip")]
    WrongDirection {
        trip: TripId,
        expected: TripDirection,
    },

    // =================================================================
    // Escrow / Funding Errors (4xx)
    // =================================================================
    #[error("FL_ERR_400: No escrow record for trip {0}")]
    EscrowNotFound(TripId),

    /// Escrow for this trip was already paid out (idempotency guard).
    #[error("FL_ERR_401: Escrow for trip {0} already released")]
    AlreadyReleased(TripId),

    /// The payer's funding source cannot cover the escrow amount.
    #[error("FL_ERR_402: Insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: Decimal, available: Decimal },

    /// A second funding attempt for a trip that already has escrow.
    #[error("FL_ERR_403: Escrow for trip {0} already funded")]
    EscrowAlreadyFunded(TripId),

    /// Adding `amount` would exceed the largest representable balance.
    #[error("FL_ERR_404: Amount {amount} overflows the balance it is added to")]
    AmountOverflow { amount: Decimal },

    // =================================================================
    // Authorization Errors (8xx)
    // =================================================================
    /// The caller does not own the vehicle it tried to commit.
    #[error("FL_ERR_800: {caller} does not own vehicle {vehicle}")]
    NotOwner {
        vehicle: VehicleId,
        caller: AccountId,
    },

    /// The caller is not the party entitled to perform this action.
    #[error("FL_ERR_801: {caller} is not authorized to {action}")]
    Unauthorized {
        action: &'static str,
        caller: AccountId,
    },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Value conservation or cross-store consistency broke. Critical.
    #[error("FL_ERR_900: Invariant violation: {reason}")]
    InvariantViolation { reason: String },

    /// Unrecoverable internal error.
    #[error("FL_ERR_901: Internal error: {0}")]
    Internal(String),

    /// Configuration error (invalid config document, bad values, etc.).
    #[error("FL_ERR_902: Configuration error: {0}")]
    Configuration(String),

    /// Serialization / deserialization error.
    #[error("FL_ERR_903: Serialization error: {0}")]
    Serialization(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, FreightError>;

impl From<serde_json::Error> for FreightError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Coarse error taxonomy exposed to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    NotOwner,
    Unauthorized,
    AlreadyAssigned,
    WrongState,
    AlreadyReleased,
    InsufficientFunds,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::InvalidInput => "INVALID_INPUT",
            Self::NotFound => "NOT_FOUND",
            Self::NotOwner => "NOT_OWNER",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::AlreadyAssigned => "ALREADY_ASSIGNED",
            Self::WrongState => "WRONG_STATE",
            Self::AlreadyReleased => "ALREADY_RELEASED",
            Self::InsufficientFunds => "INSUFFICIENT_FUNDS",
            Self::Internal => "INTERNAL",
        };
        f.write_str(s)
    }
}

impl FreightError {
    /// Stable `FL_ERR_nnn` code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "FL_ERR_100",
            Self::InvalidAmount { .. } => "FL_ERR_101",
            Self::VehicleNotFound(_) => "FL_ERR_200",
            Self::AlreadyAssigned(_) => "FL_ERR_201",
            Self::CapacityExceeded { .. } => "FL_ERR_202",
            Self::TripNotFound(_) => "FL_ERR_300",
            Self::WrongState { .. } => "FL_ERR_301",
            Self::WrongDirection { .. } => "FL_ERR_302",
            Self::EscrowNotFound(_) => "FL_ERR_400",
            Self::AlreadyReleased(_) => "FL_ERR_401",
            Self::InsufficientFunds { .. } => "FL_ERR_402",
            Self::EscrowAlreadyFunded(_) => "FL_ERR_403",
            Self::AmountOverflow { .. } => "FL_ERR_404",
            Self::NotOwner { .. } => "FL_ERR_800",
            Self::Unauthorized { .. } => "FL_ERR_801",
            Self::InvariantViolation { .. } => "FL_ERR_900",
            Self::Internal(_) => "FL_ERR_901",
            Self::Configuration(_) => "FL_ERR_902",
            Self::Serialization(_) => "FL_ERR_903",
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { .. }
            | Self::InvalidAmount { .. }
            | Self::AmountOverflow { .. }
            | Self::CapacityExceeded { .. }
            | Self::Configuration(_)
            | Self::Serialization(_) => ErrorKind::InvalidInput,
            Self::VehicleNotFound(_)
            | Self::TripNotFound(_)
            | Self::WrongDirection { .. }
            | Self::EscrowNotFound(_) => ErrorKind::NotFound,
            Self::AlreadyAssigned(_) => ErrorKind::AlreadyAssigned,
            Self::WrongState { .. } => ErrorKind::WrongState,
            Self::AlreadyReleased(_) => ErrorKind::AlreadyReleased,
            Self::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            Self::NotOwner { .. } => ErrorKind::NotOwner,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::EscrowAlreadyFunded(_) | Self::InvariantViolation { .. } | Self::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Internal inconsistencies that abort an operation outright. These are
    /// never caused by caller input and must not be shown as user errors.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Internal
    }

    /// Stable, serializable shape for the presentation layer.
    #[must_use]
    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            code: self.code().to_string(),
            kind: self.kind(),
            message: self.to_string(),
            fatal: self.is_fatal(),
        }
    }
}

/// What the presentation layer receives for a failed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub code: String,
    pub kind: ErrorKind,
    pub message: String,
    pub fatal: bool,
}

impl From<&FreightError> for ErrorReport {
    fn from(err: &FreightError) -> Self {
        err.report()
    }
}
