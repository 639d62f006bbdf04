//! Signed escrow release receipts.
//!
//! Every escrow payout produces an [`EscrowReceipt`]: a SHA-256 hash of the
//! canonical release payload, signed with the vault's ed25519 key. Anyone
//! holding the vault's verifying key can check that a payout happened, to
//! whom, and for how much.

use chrono::{DateTime, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{AccountId, EscrowRecord, FreightError, Result, TripId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowReceipt {
    pub trip_id: TripId,
    pub payer: AccountId,
    pub payee: AccountId,
    pub amount: Decimal,
    pub released_at: DateTime<Utc>,
    /// SHA-256 of [`EscrowReceipt::signing_payload`].
    pub payload_hash: [u8; 32],
    /// Ed25519 signature over `payload_hash`.
    pub signature: Vec<u8>,
    /// Verifying key of the vault that signed.
    pub signer: [u8; 32],
}

impl EscrowReceipt {
    /// Build and sign a receipt for a released record.
    ///
    /// # Errors
    /// `Internal` if the record has not been released.
    pub fn issue(record: &EscrowRecord, key: &SigningKey) -> Result<Self> {
        let (Some(payee), Some(released_at)) = (record.payee, record.released_at) else {
            return Err(FreightError::Internal(format!(
                "receipt requested for unreleased escrow of trip {}",
                record.trip_id
            )));
        };
        let mut receipt = Self {
            trip_id: record.trip_id,
            payer: record.payer,
            payee,
            amount: record.amount,
            released_at,
            payload_hash: [0u8; 32],
            signature: Vec::new(),
            signer: key.verifying_key().to_bytes(),
        };
        receipt.payload_hash = Sha256::digest(receipt.signing_payload()).into();
        receipt.signature = key.sign(&receipt.payload_hash).to_bytes().to_vec();
        Ok(receipt)
    }

    /// Canonical bytes that are hashed and signed.
    ///
    /// Format: `"freightline:release:v1:" || trip_id || payer || payee || amount || released_at_ms`
    #[must_use]
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(128);
        payload.extend_from_slice(b"freightline:release:v1:");
        payload.extend_from_slice(&self.trip_id.0.to_le_bytes());
        payload.extend_from_slice(self.payer.0.as_bytes());
        payload.extend_from_slice(self.payee.0.as_bytes());
        payload.extend_from_slice(self.amount.normalize().to_string().as_bytes());
        payload.extend_from_slice(&self.released_at.timestamp_millis().to_le_bytes());
        payload
    }

    /// Check the hash and the signature against `key`.
    #[must_use]
    pub fn verify(&self, key: &VerifyingKey) -> bool {
        let expected: [u8; 32] = Sha256::digest(self.signing_payload()).into();
        if expected != self.payload_hash || key.to_bytes() != self.signer {
            return false;
        }
        Signature::from_slice(&self.signature)
            .is_ok_and(|sig| key.verify(&self.payload_hash, &sig).is_ok())
    }

    #[must_use]
    pub fn hash_hex(&self) -> String {
        hex::encode(self.payload_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> SigningKey {
        SigningKey::from_bytes(&[7u8; 32])
    }

    fn released() -> EscrowRecord {
        let mut rec = EscrowRecord::locked(TripId(1), Decimal::new(20, 1), AccountId::new());
        rec.mark_released(AccountId::new()).unwrap();
        rec
    }

    #[test]
    fn issued_receipt_verifies() {
        let key = key();
        let receipt = EscrowReceipt::issue(&released(), &key).unwrap();
        assert!(receipt.verify(&key.verifying_key()));
        assert_eq!(receipt.hash_hex().len(), 64);
    }

    #[test]
    fn tampered_amount_fails() {
        let key = key();
        let mut receipt = EscrowReceipt::issue(&released(), &key).unwrap();
        receipt.amount = Decimal::new(200, 1);
        assert!(!receipt.verify(&key.verifying_key()));
    }

    #[test]
    fn wrong_key_fails() {
        let receipt = EscrowReceipt::issue(&released(), &key()).unwrap();
        let other = SigningKey::from_bytes(&[9u8; 32]);
        assert!(!receipt.verify(&other.verifying_key()));
    }

    #[test]
    fn unreleased_record_has_no_receipt() {
        let rec = EscrowRecord::locked(TripId(2), Decimal::ONE, AccountId::new());
        assert!(matches!(
            EscrowReceipt::issue(&rec, &key()),
            Err(FreightError::Internal(_))
        ));
    }

    #[test]
    fn serde_roundtrip_keeps_signature_valid() {
        let key = key();
        let receipt = EscrowReceipt::issue(&released(), &key).unwrap();
        let json = serde_json::to_string(&receipt).unwrap();
        let back: EscrowReceipt = serde_json::from_str(&json).unwrap();
        assert!(back.verify(&key.verifying_key()));
    }
}
