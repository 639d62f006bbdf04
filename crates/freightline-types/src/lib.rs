//! # freightline-types
//!
//! Shared types, errors, and configuration for the **Freightline** ledger.
//!
//! This crate is the leaf dependency of the workspace. It defines:
//!
//! - **Identifiers**: [`VehicleId`], [`TripId`], [`AccountId`]
//! - **Identity**: [`IdentityContext`]
//! - **Vehicle model**: [`Vehicle`], [`VehicleStatus`]
//! - **Trip model**: [`Trip`], [`TripDirection`], [`TripStatus`], [`ProofOfDelivery`]
//! - **Escrow model**: [`EscrowRecord`], [`EscrowState`], [`EscrowReceipt`]
//! - **Events**: [`FreightEvent`], [`EventEnvelope`]
//! - **Configuration**: [`FreightConfig`], [`AssignmentPolicy`], [`ReversePayee`], [`LogConfig`]
//! - **Errors**: [`FreightError`] with `FL_ERR_` prefix codes, [`ErrorKind`], [`ErrorReport`]
//! - **Constants**: system-wide limits and defaults

pub mod config;
pub mod constants;
pub mod error;
pub mod escrow;
pub mod event;
pub mod identity;
pub mod ids;
pub mod proof;
pub mod receipt;
pub mod trip;
pub mod vehicle;

pub use config::*;
pub use error::*;
pub use escrow::*;
pub use event::*;
pub use identity::*;
pub use ids::*;
pub use proof::*;
pub use receipt::*;
pub use trip::*;
pub use vehicle::*;

// Constants are accessed via `freightline_types::constants::FOO`
// (not re-exported to avoid name collisions).
