//! Identifiers used throughout Freightline.
//!
//! Vehicles and trips are numbered sequentially from 1 by the registry and
//! ledger that own them (`V1`, `T1`, ...). Trip ids share one namespace
//! across both directions. Parties are identified by UUIDv7 account ids.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::FreightError;

/// Parse `"<prefix><n>"` or a bare `"<n>"` into a positive sequence number.
fn parse_sequential(field: &'static str, prefix: char, raw: &str) -> crate::Result<u64> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix(prefix)
        .or_else(|| trimmed.strip_prefix(prefix.to_ascii_lowercase()))
        .unwrap_or(trimmed);
    match digits.parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(FreightError::InvalidInput {
            field,
            reason: format!("'{raw}' is not a valid identifier"),
        }),
    }
}

// ---------------------------------------------------------------------------
// VehicleId
// ---------------------------------------------------------------------------

/// Registry-assigned vehicle identifier. Immutable once issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct VehicleId(pub u64);

impl VehicleId {
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "V{}", self.0)
    }
}

impl FromStr for VehicleId {
    type Err = FreightError;

    fn from_str(s: &str) -> crate::Result<Self> {
        parse_sequential("vehicle_id", 'V', s).map(Self)
    }
}

// ---------------------------------------------------------------------------
// TripId
// ---------------------------------------------------------------------------

/// Ledger-assigned trip identifier, unique across forward and reverse trips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct TripId(pub u64);

impl TripId {
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for TripId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

impl FromStr for TripId {
    type Err = FreightError;

    fn from_str(s: &str) -> crate::Result<Self> {
        parse_sequential("trip_id", 'T', s).map(Self)
    }
}

// ---------------------------------------------------------------------------
// AccountId
// ---------------------------------------------------------------------------

/// A party on the ledger: vehicle owner, shipper, reverse-trip initiator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct AccountId(pub Uuid);

impl AccountId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "acct:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_prefixes() {
        assert_eq!(VehicleId(1).to_string(), "V1");
        assert_eq!(TripId(42).to_string(), "T42");
    }

    #[test]
    fn parse_accepts_prefixed_and_bare() {
        assert_eq!("V7".parse::<VehicleId>().unwrap(), VehicleId(7));
        assert_eq!(" v7 ".parse::<VehicleId>().unwrap(), VehicleId(7));
        assert_eq!("12".parse::<TripId>().unwrap(), TripId(12));
        assert_eq!("T3".parse::<TripId>().unwrap(), TripId(3));
    }

    #[test]
    fn parse_rejects_zero_and_garbage() {
        let err = "0".parse::<VehicleId>().unwrap_err();
        assert!(matches!(
            err,
            FreightError::InvalidInput {
                field: "vehicle_id",
                ..
            }
        ));
        assert!("".parse::<TripId>().is_err());
        assert!("T-1".parse::<TripId>().is_err());
        assert!("V1".parse::<TripId>().is_err());
    }

    #[test]
    fn next_increments() {
        assert_eq!(TripId(1).next(), TripId(2));
        assert_eq!(VehicleId(9).next(), VehicleId(10));
    }

    #[test]
    fn account_id_uniqueness() {
        assert_ne!(AccountId::new(), AccountId::new());
    }

    #[test]
    fn serde_roundtrips() {
        let acct = AccountId::new();
        let json = serde_json::to_string(&acct).unwrap();
        let back: AccountId = serde_json::from_str(&json).unwrap();
        assert_eq!(acct, back);

        let json = serde_json::to_string(&TripId(5)).unwrap();
        assert_eq!(json, "5");
    }
}
