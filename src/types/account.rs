//! Account-related types for the transfer engine
//!
//! This module defines the Account structure and the identifiers used to
//! address accounts in the store.

use serde::{Deserialize, Serialize};

/// Account identifier (the user id the identity layer hands us)
pub type AccountId = i64;

/// Account number printed on statements, used to cross-check the receiver
pub type AccountNumber = i64;

/// Balance in the smallest currency unit
pub type Balance = i64;

/// A stored account row
///
/// Accounts are created outside the engine and only ever mutated through
/// the account store's atomic write operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Primary key used by transfer requests
    pub id: AccountId,

    /// Secondary identifier the sender must declare for the receiver
    pub account_number: AccountNumber,

    /// Current balance
    ///
    /// Must never become negative as a result of a transfer between two
    /// different accounts. Self-adjustments are not guarded.
    pub balance: Balance,

    /// Write version, bumped by the store on every committed change
    ///
    /// The optimistic coordinator passes the version it read to
    /// `compare_and_set`, which refuses the write if the row has moved on.
    #[serde(default)]
    pub version: u64,
}

impl Account {
    /// Create a fresh account row at version zero
    pub fn new(id: AccountId, account_number: AccountNumber, balance: Balance) -> Self {
        Account {
            id,
            account_number,
            balance,
            version: 0,
        }
    }
}
