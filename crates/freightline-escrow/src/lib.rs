//! # freightline-escrow
//!
//! Escrow plane of the Freightline ledger: locks value when a trip is
//! scheduled and pays it out exactly once when delivery is attested.
//!
//! ## Components
//!
//! 1. **FundingSource**: where escrow comes from and is paid to
//!    ([`AccountBook`] is the bounded in-memory backend)
//! 2. **EscrowVault**: per-trip locked records, authorization-checked release,
//!    signed release receipts
//! 3. **ValueConservation**: deposits − withdrawals must equal balances plus
//!    value held in escrow
//!
//! ```text
//! schedule trip → EscrowVault.fund()    → FundingSource.debit(payer)
//! deliver trip  → EscrowVault.release() → FundingSource.credit(payee) → EscrowReceipt
//! ```

pub mod conservation;
pub mod funding;
pub mod vault;

pub use conservation::ValueConservation;
pub use funding::{AccountBook, FundingSource};
pub use vault::{EscrowVault, ReleaseInstruction};
