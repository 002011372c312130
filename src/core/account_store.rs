//! Thread-safe in-memory account store
//!
//! This module provides `InMemoryAccountStore`, the account store the engine
//! runs against in the batch tool and in tests.
//!
//! # Design
//!
//! Rows live in a `DashMap` keyed by account id. Each row sits behind its own
//! `parking_lot::Mutex`, and the map only hands out `Arc` clones of those
//! mutexes, so no shard lock is held while a row is being written.
//!
//! # Atomicity
//!
//! - `increment` locks a single row, checks the guard and writes.
//! - `compare_and_set` locks a single row and writes only if its version is
//!   unchanged.
//! - `apply_atomic` locks every participating row in ascending id order,
//!   validates every write against the locked rows, then applies them all.
//!   Ordered acquisition rules out deadlock between concurrent batches, and
//!   validate-then-apply means a failed batch leaves no trace.

use crate::core::traits::{AccountStore, BalanceGuard, ConditionalWrite};
use crate::types::{Account, AccountId, Balance, StoreError};
use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard};
use std::collections::BTreeMap;
use std::sync::Arc;

type Row = Arc<Mutex<Account>>;

/// Thread-safe account store backed by `DashMap`
///
/// Operations on different accounts proceed in parallel; operations on the
/// same account are serialized by the row mutex.
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    /// Row handles by account id
    rows: DashMap<AccountId, Row>,
}

impl InMemoryAccountStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
        }
    }

    /// Create a store seeded with the given accounts
    pub fn with_accounts(accounts: impl IntoIterator<Item = Account>) -> Self {
        let store = Self::new();
        for account in accounts {
            store.insert(account);
        }
        store
    }

    /// Insert or replace an account row
    ///
    /// Used to seed the store; the engine never creates accounts.
    pub fn insert(&self, account: Account) {
        self.rows.insert(account.id, Arc::new(Mutex::new(account)));
    }

    /// Snapshot of every account, sorted by id
    pub fn all_accounts(&self) -> Vec<Account> {
        let mut accounts: Vec<Account> = self
            .rows
            .iter()
            .map(|entry| entry.value().lock().clone())
            .collect();
        accounts.sort_by_key(|account| account.id);
        accounts
    }

    /// Sum of all balances
    pub fn total_balance(&self) -> i128 {
        self.rows
            .iter()
            .map(|entry| i128::from(entry.value().lock().balance))
            .sum()
    }

    fn row(&self, id: AccountId) -> Result<Row, StoreError> {
        self.rows
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(StoreError::AccountNotFound { id })
    }
}

impl AccountStore for InMemoryAccountStore {
    fn get(&self, id: AccountId) -> Result<Account, StoreError> {
        let row = self.row(id)?;
        let account = row.lock().clone();
        Ok(account)
    }

    fn increment(
        &self,
        id: AccountId,
        delta: Balance,
        guard: BalanceGuard,
    ) -> Result<Balance, StoreError> {
        let row = self.row(id)?;
        let mut account = row.lock();

        let balance = guard.apply(id, account.balance, delta)?;
        account.balance = balance;
        account.version += 1;

        Ok(balance)
    }

    fn apply_atomic(&self, writes: &[ConditionalWrite]) -> Result<(), StoreError> {
        // Resolve row handles first; BTreeMap gives the lock order
        let mut rows: BTreeMap<AccountId, Row> = BTreeMap::new();
        for write in writes {
            if !rows.contains_key(&write.id) {
                rows.insert(write.id, self.row(write.id)?);
            }
        }

        let mut locked: BTreeMap<AccountId, MutexGuard<'_, Account>> = rows
            .iter()
            .map(|(id, row)| (*id, row.lock()))
            .collect();

        // Validate against a scratch copy so repeated ids accumulate
        let mut staged: BTreeMap<AccountId, Balance> = locked
            .iter()
            .map(|(id, account)| (*id, account.balance))
            .collect();

        for write in writes {
            let balance = write.guard.apply(write.id, staged[&write.id], write.delta)?;
            staged.insert(write.id, balance);
        }

        for (id, balance) in staged {
            if let Some(account) = locked.get_mut(&id) {
                account.balance = balance;
                account.version += 1;
            }
        }

        Ok(())
    }

    fn compare_and_set(
        &self,
        id: AccountId,
        expected_version: u64,
        balance: Balance,
    ) -> Result<u64, StoreError> {
        let row = self.row(id)?;
        let mut account = row.lock();

        if account.version != expected_version {
            return Err(StoreError::VersionConflict {
                id,
                expected: expected_version,
                actual: account.version,
            });
        }

        account.balance = balance;
        account.version += 1;
        Ok(account.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> InMemoryAccountStore {
        InMemoryAccountStore::with_accounts([
            Account::new(1, 1001, 500),
            Account::new(2, 1002, 200),
        ])
    }

    fn write(id: AccountId, delta: Balance, guard: BalanceGuard) -> ConditionalWrite {
        ConditionalWrite {
            id,
            delta,
            guard,
        }
    }

    #[test]
    fn test_get_returns_seeded_account() {
        let store = store();
        let account = store.get(1).unwrap();
        assert_eq!(account.account_number, 1001);
        assert_eq!(account.balance, 500);
        assert_eq!(account.version, 0);
    }

    #[test]
    fn test_get_missing_account() {
        let store = store();
        assert_eq!(store.get(9), Err(StoreError::AccountNotFound { id: 9 }));
    }

    #[test]
    fn test_increment_updates_balance_and_version() {
        let store = store();
        let balance = store.increment(1, -100, BalanceGuard::NonNegative).unwrap();

        assert_eq!(balance, 400);
        let account = store.get(1).unwrap();
        assert_eq!(account.balance, 400);
        assert_eq!(account.version, 1);
    }

    #[test]
    fn test_guarded_increment_rejects_overdraft() {
        let store = store();
        let result = store.increment(2, -201, BalanceGuard::NonNegative);

        assert_eq!(
            result,
            Err(StoreError::WouldOverdraw {
                id: 2,
                balance: 200,
                delta: -201
            })
        );
        assert_eq!(store.get(2).unwrap().balance, 200);
        assert_eq!(store.get(2).unwrap().version, 0);
    }

    #[test]
    fn test_unchecked_increment_may_go_negative() {
        let store = store();
        let balance = store.increment(2, -300, BalanceGuard::Unchecked).unwrap();
        assert_eq!(balance, -100);
    }

    #[test]
    fn test_increment_overflow() {
        let store = InMemoryAccountStore::with_accounts([Account::new(1, 1, i64::MAX)]);
        assert_eq!(
            store.increment(1, 1, BalanceGuard::Unchecked),
            Err(StoreError::Overflow { id: 1 })
        );
    }

    #[test]
    fn test_apply_atomic_applies_every_write() {
        let store = store();
        store
            .apply_atomic(&[
                write(1, -100, BalanceGuard::NonNegative),
                write(2, 100, BalanceGuard::Unchecked),
            ])
            .unwrap();

        assert_eq!(store.get(1).unwrap().balance, 400);
        assert_eq!(store.get(2).unwrap().balance, 300);
        assert_eq!(store.total_balance(), 700);
    }

    #[test]
    fn test_apply_atomic_rejects_whole_batch_on_guard_failure() {
        let store = store();
        let result = store.apply_atomic(&[
            write(2, 600, BalanceGuard::Unchecked),
            write(1, -600, BalanceGuard::NonNegative),
        ]);

        assert!(matches!(result, Err(StoreError::WouldOverdraw { id: 1, .. })));
        assert_eq!(store.get(1).unwrap().balance, 500);
        assert_eq!(store.get(2).unwrap().balance, 200);
        assert_eq!(store.get(2).unwrap().version, 0);
    }

    #[test]
    fn test_apply_atomic_rejects_missing_account_before_writing() {
        let store = store();
        let result = store.apply_atomic(&[
            write(1, -100, BalanceGuard::NonNegative),
            write(3, 100, BalanceGuard::Unchecked),
        ]);

        assert_eq!(result, Err(StoreError::AccountNotFound { id: 3 }));
        assert_eq!(store.get(1).unwrap().balance, 500);
    }

    #[test]
    fn test_compare_and_set_requires_current_version() {
        let store = store();
        store.increment(1, 10, BalanceGuard::Unchecked).unwrap();

        let stale = store.compare_and_set(1, 0, 0);
        assert_eq!(
            stale,
            Err(StoreError::VersionConflict {
                id: 1,
                expected: 0,
                actual: 1
            })
        );
        assert_eq!(store.get(1).unwrap().balance, 510);

        assert_eq!(store.compare_and_set(1, 1, 480), Ok(2));
        let account = store.get(1).unwrap();
        assert_eq!(account.balance, 480);
        assert_eq!(account.version, 2);
    }

    #[test]
    fn test_compare_and_set_missing_account() {
        let store = store();
        assert_eq!(
            store.compare_and_set(9, 0, 10),
            Err(StoreError::AccountNotFound { id: 9 })
        );
    }

    #[test]
    fn test_apply_atomic_accumulates_repeated_ids() {
        let store = store();
        let result = store.apply_atomic(&[
            write(2, -150, BalanceGuard::NonNegative),
            write(2, -100, BalanceGuard::NonNegative),
        ]);

        assert!(matches!(result, Err(StoreError::WouldOverdraw { id: 2, .. })));
        assert_eq!(store.get(2).unwrap().balance, 200);
    }

    #[test]
    fn test_all_accounts_sorted_by_id() {
        let store = InMemoryAccountStore::with_accounts([
            Account::new(3, 3003, 0),
            Account::new(1, 1001, 0),
            Account::new(2, 1002, 0),
        ]);
        let ids: Vec<AccountId> = store.all_accounts().iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_concurrent_guarded_increments_never_overdraw() {
        let store = Arc::new(InMemoryAccountStore::with_accounts([Account::new(1, 1, 100)]));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.increment(1, -30, BalanceGuard::NonNegative))
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(Result::is_ok)
            .count();

        assert_eq!(successes, 3);
        assert_eq!(store.get(1).unwrap().balance, 10);
    }
}
