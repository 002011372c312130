//! Core traits for account storage, coordination and the audit ledger
//!
//! These are the seams the transfer engine is written against. Each has an
//! in-crate implementation, and tests substitute their own to inject faults.

use crate::core::deadline::Deadline;
use crate::core::ledger::{LedgerFilter, LedgerQuery};
use crate::types::{
    Account, AccountId, Balance, CoordinationError, LedgerEntry, LedgerError, StoreError,
};

/// Condition attached to a balance write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceGuard {
    /// Reject the write if the resulting balance would be negative
    NonNegative,
    /// Apply the write regardless of the resulting balance
    Unchecked,
}

impl BalanceGuard {
    /// Balance after adding `delta` to `current`, without writing it
    pub fn apply(
        self,
        id: AccountId,
        current: Balance,
        delta: Balance,
    ) -> Result<Balance, StoreError> {
        let balance = current
            .checked_add(delta)
            .ok_or(StoreError::Overflow { id })?;

        if self == BalanceGuard::NonNegative && balance < 0 {
            return Err(StoreError::WouldOverdraw {
                id,
                balance: current,
                delta,
            });
        }

        Ok(balance)
    }
}

/// One leg of an all-or-nothing batch write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConditionalWrite {
    pub id: AccountId,
    pub delta: Balance,
    pub guard: BalanceGuard,
}

/// Persistent store of accounts
///
/// Implementations must be safe to share across worker threads. Every write
/// is atomic with respect to the rows it touches; callers never perform
/// read-modify-write themselves.
pub trait AccountStore: Send + Sync {
    /// Point lookup of an account row
    fn get(&self, id: AccountId) -> Result<Account, StoreError>;

    /// Add `delta` to the balance as one conditional update
    ///
    /// Returns the new balance.
    fn increment(
        &self,
        id: AccountId,
        delta: Balance,
        guard: BalanceGuard,
    ) -> Result<Balance, StoreError>;

    /// Apply every write or none of them
    ///
    /// All conditions (existence, guards, overflow) are checked against a
    /// consistent view before anything becomes visible.
    fn apply_atomic(&self, writes: &[ConditionalWrite]) -> Result<(), StoreError>;

    /// Set the balance only if the row is still at `expected_version`
    ///
    /// Single-row compare-and-swap; returns the new version. Fails with
    /// `VersionConflict` when another writer got there first.
    fn compare_and_set(
        &self,
        id: AccountId,
        expected_version: u64,
        balance: Balance,
    ) -> Result<u64, StoreError>;
}

/// Factory for atomic units of account mutations
///
/// One unit is created per transfer and never reused.
pub trait TransactionCoordinator: Send + Sync {
    type Unit: CoordinatedUnit;

    /// Open a new unit bounded by the caller's deadline
    fn begin(&self, deadline: Deadline) -> Result<Self::Unit, CoordinationError>;
}

/// A group of balance increments that commit together
///
/// Dropping a unit without committing aborts it.
pub trait CoordinatedUnit {
    /// Add an increment to the unit
    fn increment(
        &mut self,
        id: AccountId,
        delta: Balance,
        guard: BalanceGuard,
    ) -> Result<(), CoordinationError>;

    /// Make every increment visible, or none
    fn commit(self) -> Result<(), CoordinationError>;

    /// Discard the unit, leaving every participating account untouched
    fn abort(self);
}

/// Append-only log of transfer attempts
pub trait LedgerLog: Send + Sync {
    /// Durably append one entry
    fn append(&self, entry: LedgerEntry) -> Result<(), LedgerError>;

    /// Run the filter once and return the matching entries in order
    fn scan(&self, filter: &LedgerFilter) -> Result<Vec<LedgerEntry>, LedgerError>;

    /// Lazy, restartable view over the entries matching `filter`
    ///
    /// Nothing is read until the query is iterated, and every iteration
    /// re-runs the scan.
    fn query(&self, filter: LedgerFilter) -> LedgerQuery<'_, Self>
    where
        Self: Sized,
    {
        LedgerQuery::new(self, filter)
    }
}
