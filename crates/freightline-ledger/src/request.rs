//! Raw requests from the presentation layer and the confirmations returned
//! to it.
//!
//! Requests carry the form fields exactly as entered: every field is a
//! string. Parsing trims, rejects empty values, and checks numeric syntax
//! before anything reaches the ledger.

use freightline_types::{
    EscrowReceipt, FreightConfig, FreightError, ProofOfDelivery, Result, TripDirection, TripId,
    TripStatus, VehicleId, VehicleStatus,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger::Consignment;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterVehicleRequest {
    pub capacity: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleForwardTripRequest {
    pub origin: String,
    pub destination: String,
    pub cargo_weight: String,
    pub escrow_amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleReverseTripRequest {
    pub vehicle_id: String,
    pub origin: String,
    pub destination: String,
    pub cargo_weight: String,
    pub escrow_amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignVehicleRequest {
    pub trip_id: String,
    pub vehicle_id: String,
}

/// Forward confirmations leave `proof_of_delivery` empty.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmDeliveryRequest {
    pub trip_id: String,
    #[serde(default)]
    pub proof_of_delivery: Option<String>,
}

impl RegisterVehicleRequest {
    /// # Errors
    /// `InvalidInput` on `capacity`.
    pub fn capacity(&self) -> Result<u64> {
        parse_positive("capacity", &self.capacity)
    }
}

impl ScheduleForwardTripRequest {
    /// # Errors
    /// `InvalidInput` naming the first malformed field.
    pub fn consignment(&self, config: &FreightConfig) -> Result<Consignment> {
        parse_consignment(
            &self.origin,
            &self.destination,
            &self.cargo_weight,
            &self.escrow_amount,
            config,
        )
    }
}

impl ScheduleReverseTripRequest {
    /// # Errors
    /// `InvalidInput` on `vehicle_id`.
    pub fn vehicle_id(&self) -> Result<VehicleId> {
        self.vehicle_id.parse()
    }

    /// # Errors
    /// `InvalidInput` naming the first malformed field.
    pub fn consignment(&self, config: &FreightConfig) -> Result<Consignment> {
        parse_consignment(
            &self.origin,
            &self.destination,
            &self.cargo_weight,
            &self.escrow_amount,
            config,
        )
    }
}

impl AssignVehicleRequest {
    /// # Errors
    /// `InvalidInput` on `trip_id` or `vehicle_id`.
    pub fn ids(&self) -> Result<(TripId, VehicleId)> {
        Ok((self.trip_id.parse()?, self.vehicle_id.parse()?))
    }
}

impl ConfirmDeliveryRequest {
    #[must_use]
    pub fn forward(trip_id: impl Into<String>) -> Self {
        Self {
            trip_id: trip_id.into(),
            proof_of_delivery: None,
        }
    }

    #[must_use]
    pub fn reverse(trip_id: impl Into<String>, proof: impl Into<String>) -> Self {
        Self {
            trip_id: trip_id.into(),
            proof_of_delivery: Some(proof.into()),
        }
    }

    /// # Errors
    /// `InvalidInput` on `trip_id`.
    pub fn trip_id(&self) -> Result<TripId> {
        self.trip_id.parse()
    }

    /// The parsed proof. A missing or blank proof is an `InvalidInput`.
    ///
    /// # Errors
    /// `InvalidInput` on `proof_of_delivery`.
    pub fn proof(&self) -> Result<ProofOfDelivery> {
        ProofOfDelivery::parse(self.proof_of_delivery.as_deref().unwrap_or_default())
    }
}

fn parse_consignment(
    origin: &str,
    destination: &str,
    cargo_weight: &str,
    escrow_amount: &str,
    config: &FreightConfig,
) -> Result<Consignment> {
    Ok(Consignment {
        origin: required("origin", origin)?.to_string(),
        destination: required("destination", destination)?.to_string(),
        cargo_weight: parse_positive("cargo_weight", cargo_weight)?,
        escrow_amount: parse_amount(escrow_amount, config.amount_scale)?,
    })
}

fn required<'a>(field: &'static str, raw: &'a str) -> Result<&'a str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FreightError::InvalidInput {
            field,
            reason: "is required".to_string(),
        });
    }
    Ok(trimmed)
}

/// A strictly positive whole number.
pub(crate) fn parse_positive(field: &'static str, raw: &str) -> Result<u64> {
    let value = required(field, raw)?;
    match value.parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        Ok(_) => Err(FreightError::InvalidInput {
            field,
            reason: "must be greater than zero".to_string(),
        }),
        Err(_) => Err(FreightError::InvalidInput {
            field,
            reason: format!("'{value}' is not a whole number"),
        }),
    }
}

/// A strictly positive decimal with at most `max_scale` fractional digits
/// (trailing zeros do not count). Input finer than `Decimal` can represent
/// is rejected, never rounded.
pub(crate) fn parse_amount(raw: &str, max_scale: u32) -> Result<Decimal> {
    const FIELD: &str = "escrow_amount";
    let value = required(FIELD, raw)?;
    let amount = Decimal::from_str_exact(value).map_err(|_| FreightError::InvalidInput {
        field: FIELD,
        reason: format!("'{value}' is not a decimal amount"),
    })?;
    if amount <= Decimal::ZERO {
        return Err(FreightError::InvalidInput {
            field: FIELD,
            reason: format!("{amount} must be greater than zero"),
        });
    }
    if amount.normalize().scale() > max_scale {
        return Err(FreightError::InvalidInput {
            field: FIELD,
            reason: format!("more than {max_scale} fractional digits"),
        });
    }
    Ok(amount)
}

// ---------------------------------------------------------------------------
// Confirmations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleRegistration {
    pub vehicle_id: VehicleId,
    pub capacity: u64,
    pub status: VehicleStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripScheduling {
    pub trip_id: TripId,
    pub direction: TripDirection,
    pub escrow_amount: Decimal,
    pub status: TripStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripAssignment {
    pub trip_id: TripId,
    pub vehicle_id: VehicleId,
    pub status: TripStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryConfirmation {
    pub trip_id: TripId,
    pub vehicle_id: VehicleId,
    pub status: TripStatus,
    pub receipt: EscrowReceipt,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forward(cargo: &str, escrow: &str) -> ScheduleForwardTripRequest {
        ScheduleForwardTripRequest {
            origin: " NYC ".to_string(),
            destination: "LA".to_string(),
            cargo_weight: cargo.to_string(),
            escrow_amount: escrow.to_string(),
        }
    }

    fn field_of(err: &FreightError) -> &'static str {
        match err {
            FreightError::InvalidInput { field, .. } => *field,
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn forward_request_parses_and_trims() {
        let c = forward("500", "2.0")
            .consignment(&FreightConfig::default())
            .unwrap();
        assert_eq!(c.origin, "NYC");
        assert_eq!(c.cargo_weight, 500);
        assert_eq!(c.escrow_amount, Decimal::new(20, 1));
    }

    #[test]
    fn malformed_fields_named() {
        let config = FreightConfig::default();
        let cases = [
            (forward("", "1"), "cargo_weight"),
            (forward("0", "1"), "cargo_weight"),
            (forward("-3", "1"), "cargo_weight"),
            (forward("1.5", "1"), "cargo_weight"),
            (forward("5", ""), "escrow_amount"),
            (forward("5", "0"), "escrow_amount"),
            (forward("5", "-1"), "escrow_amount"),
            (forward("5", "two"), "escrow_amount"),
        ];
        for (req, field) in cases {
            let err = req.consignment(&config).unwrap_err();
            assert_eq!(field_of(&err), field, "{req:?}");
        }

        let blank_origin = ScheduleForwardTripRequest {
            origin: "   ".to_string(),
            ..forward("5", "1")
        };
        let err = blank_origin.consignment(&config).unwrap_err();
        assert_eq!(field_of(&err), "origin");
    }

    #[test]
    fn amount_scale_limit() {
        assert!(parse_amount("0.001", 3).is_ok());
        assert!(parse_amount("0.0010000", 3).is_ok());
        let err = parse_amount("0.0001", 3).unwrap_err();
        assert_eq!(field_of(&err), "escrow_amount");
    }

    #[test]
    fn excess_precision_rejected_not_rounded() {
        for raw in [
            "1.0000000000000000000000000000000001",
            "0.00000000000000000000000000000001",
            "99999999999999999999999999999999",
        ] {
            let err = parse_amount(raw, 28).unwrap_err();
            assert_eq!(field_of(&err), "escrow_amount", "{raw}");
        }
        assert_eq!(
            parse_amount("1.000000000000000000000000001", 28).unwrap(),
            Decimal::from_str_exact("1.000000000000000000000000001").unwrap()
        );
    }

    #[test]
    fn ids_accept_prefixed_and_bare() {
        let req = AssignVehicleRequest {
            trip_id: "T3".to_string(),
            vehicle_id: " 7 ".to_string(),
        };
        assert_eq!(req.ids().unwrap(), (TripId(3), VehicleId(7)));

        let bad = AssignVehicleRequest {
            trip_id: "3".to_string(),
            vehicle_id: "truck".to_string(),
        };
        assert_eq!(field_of(&bad.ids().unwrap_err()), "vehicle_id");
    }

    #[test]
    fn missing_proof_is_invalid_input() {
        let req = ConfirmDeliveryRequest::forward("T1");
        assert_eq!(field_of(&req.proof().unwrap_err()), "proof_of_delivery");
        let req = ConfirmDeliveryRequest::reverse("T1", "");
        assert_eq!(field_of(&req.proof().unwrap_err()), "proof_of_delivery");
    }

    #[test]
    fn requests_deserialize_from_form_json() {
        let req: ScheduleReverseTripRequest = serde_json::from_str(
            r#"{"vehicleId":"V1","origin":"LA","destination":"NYC","cargoWeight":"250","escrowAmount":"1.5"}"#,
        )
        .unwrap();
        assert_eq!(req.vehicle_id().unwrap(), VehicleId(1));

        let confirm: ConfirmDeliveryRequest = serde_json::from_str(r#"{"tripId":"2"}"#).unwrap();
        assert_eq!(confirm.trip_id().unwrap(), TripId(2));
        assert!(confirm.proof_of_delivery.is_none());
    }
}
