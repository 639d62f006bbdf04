//! Ledger configuration and authorization policy.

use serde::{Deserialize, Serialize};

use crate::{FreightError, Result, constants};

/// Who may commit a vehicle to a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentPolicy {
    /// Only the identity that registered the vehicle.
    #[default]
    OwnerOnly,
    /// Any identity; the vehicle owner is still the carrier that gets paid.
    AnyParticipant,
}

/// Who receives the escrow when a reverse trip is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReversePayee {
    /// The identity that scheduled and funded the reverse trip.
    #[default]
    Initiator,
    /// The owner of the vehicle that carried the reverse trip.
    Carrier,
}

/// `tracing-subscriber` settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directive, e.g. `"info,freightline_ledger=debug"`.
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: constants::DEFAULT_LOG_FILTER.to_string(),
            json: false,
        }
    }
}

/// Configuration for one ledger instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FreightConfig {
    pub assignment_policy: AssignmentPolicy,
    pub reverse_payee: ReversePayee,
    /// Maximum fractional digits accepted in an escrow amount.
    pub amount_scale: u32,
    /// Maximum length of origin / destination identifiers.
    pub max_location_len: usize,
    /// Capacity of the live event channel.
    pub event_capacity: usize,
    pub log: LogConfig,
}

impl Default for FreightConfig {
    fn default() -> Self {
        Self {
            assignment_policy: AssignmentPolicy::default(),
            reverse_payee: ReversePayee::default(),
            amount_scale: constants::DEFAULT_AMOUNT_SCALE,
            max_location_len: constants::DEFAULT_MAX_LOCATION_LEN,
            event_capacity: constants::DEFAULT_EVENT_CAPACITY,
            log: LogConfig::default(),
        }
    }
}

impl FreightConfig {
    /// Parse a JSON config document. Missing fields take their defaults.
    ///
    /// # Errors
    /// `Configuration` if the document is malformed or fails validation.
    pub fn from_json(doc: &str) -> Result<Self> {
        let cfg: Self =
            serde_json::from_str(doc).map_err(|e| FreightError::Configuration(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// # Errors
    /// `Configuration` naming the offending field.
    pub fn validate(&self) -> Result<()> {
        // rust_decimal carries at most 28 fractional digits.
        if self.amount_scale > 28 {
            return Err(FreightError::Configuration(format!(
                "amount_scale {} exceeds 28",
                self.amount_scale
            )));
        }
        if self.max_location_len == 0 {
            return Err(FreightError::Configuration(
                "max_location_len must be > 0".to_string(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(FreightError::Configuration(
                "event_capacity must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
