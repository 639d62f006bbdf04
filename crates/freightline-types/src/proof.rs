//! Proof-of-delivery references.
//!
//! A reverse trip completes only with a content-addressed reference to an
//! off-ledger delivery artifact. Accepted forms:
//!
//! - CIDv0: `Qm` followed by 44 base58btc characters (46 total)
//! - CIDv1 in base32: `b` followed by at least 58 characters of `[a-z2-7]`
//! - A raw SHA-256 digest: 64 hex digits, optionally `0x`-prefixed
//!
//! Nothing is fetched or dereferenced; only the shape is checked.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{FreightError, Result};

const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";
const CID_V0_LEN: usize = 46;
const CID_V1_MIN_LEN: usize = 59;

/// Which content-hash encoding a proof uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProofFormat {
    CidV0,
    CidV1Base32,
    Sha256Hex,
}

/// A validated content-addressed delivery reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProofOfDelivery {
    value: String,
    format: ProofFormat,
}

impl ProofOfDelivery {
    /// Validate a raw proof reference.
    ///
    /// # Errors
    /// `InvalidInput` on `proof_of_delivery` if the value is empty or not a
    /// recognized content hash.
    pub fn parse(raw: &str) -> Result<Self> {
        let value = raw.trim();
        if value.is_empty() {
            return Err(invalid("proof of delivery is required"));
        }
        let format = detect(value).ok_or_else(|| {
            invalid(&format!(
                "'{value}' is not a CIDv0, CIDv1 (base32) or SHA-256 hex digest"
            ))
        })?;
        Ok(Self {
            value: value.to_string(),
            format,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    #[must_use]
    pub fn format(&self) -> ProofFormat {
        self.format
    }
}

fn invalid(reason: &str) -> FreightError {
    FreightError::InvalidInput {
        field: "proof_of_delivery",
        reason: reason.to_string(),
    }
}

fn detect(value: &str) -> Option<ProofFormat> {
    if value.len() == CID_V0_LEN
        && value.starts_with("Qm")
        && value.chars().all(|c| BASE58_ALPHABET.contains(c))
    {
        return Some(ProofFormat::CidV0);
    }
    if value.len() >= CID_V1_MIN_LEN
        && value.starts_with('b')
        && value[1..]
            .chars()
            .all(|c| c.is_ascii_lowercase() || ('2'..='7').contains(&c))
    {
        return Some(ProofFormat::CidV1Base32);
    }
    let digest = value.strip_prefix("0x").unwrap_or(value);
    if digest.len() == 64 && hex::decode(digest).is_ok() {
        return Some(ProofFormat::Sha256Hex);
    }
    None
}

impl fmt::Display for ProofOfDelivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl TryFrom<String> for ProofOfDelivery {
    type Error = FreightError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ProofOfDelivery> for String {
    fn from(proof: ProofOfDelivery) -> Self {
        proof.value
    }
}
