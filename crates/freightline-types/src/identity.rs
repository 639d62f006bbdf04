//! Caller identity.
//!
//! Every mutating operation receives the resolved caller explicitly; nothing
//! is read from ambient session state.

use serde::{Deserialize, Serialize};

use crate::AccountId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityContext {
    pub caller: AccountId,
}

impl IdentityContext {
    #[must_use]
    pub fn new(caller: AccountId) -> Self {
        Self { caller }
    }

    #[must_use]
    pub fn caller(&self) -> AccountId {
        self.caller
    }

    #[must_use]
    pub fn is(&self, account: AccountId) -> bool {
        self.caller == account
    }
}

impl From<AccountId> for IdentityContext {
    fn from(caller: AccountId) -> Self {
        Self::new(caller)
    }
}
