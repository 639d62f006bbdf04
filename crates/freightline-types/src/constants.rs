//! System-wide constants for the Freightline ledger.

/// Maximum fractional digits of an escrow amount (native-currency base unit).
pub const DEFAULT_AMOUNT_SCALE: u32 = 18;

/// Maximum length of an origin or destination identifier, in characters.
pub const DEFAULT_MAX_LOCATION_LEN: usize = 256;

/// Default capacity of the live event broadcast channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Default `tracing` filter directive.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Ledger name.
pub const LEDGER_NAME: &str = "Freightline";
