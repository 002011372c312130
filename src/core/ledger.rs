//! Append-only audit ledger
//!
//! This module provides the query types shared by every `LedgerLog`
//! implementation, plus `InMemoryLedger`.
//!
//! # Queries
//!
//! `LedgerLog::query` returns a `LedgerQuery`: a description of the scan, not
//! its result. Iterating a query runs the scan; iterating it again runs it
//! again, so a query value can be kept and replayed without holding any state
//! between calls.

use crate::core::traits::LedgerLog;
use crate::types::{AccountId, LedgerEntry, LedgerError, Timestamp};
use parking_lot::RwLock;

/// Timestamp ordering of query results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Oldest first, used for statements
    #[default]
    Ascending,
    /// Newest first, used for recent activity
    Descending,
}

/// Which entries a query selects and how they are ordered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerFilter {
    /// Entries where the user is sender or receiver
    pub user_id: AccountId,
    /// Inclusive lower bound
    pub from: Option<Timestamp>,
    /// Inclusive upper bound
    pub to: Option<Timestamp>,
    pub order: SortOrder,
    pub limit: Option<usize>,
}

impl LedgerFilter {
    /// Every entry involving the user, oldest first
    pub fn for_user(user_id: AccountId) -> Self {
        LedgerFilter {
            user_id,
            from: None,
            to: None,
            order: SortOrder::Ascending,
            limit: None,
        }
    }

    pub fn between(mut self, from: Timestamp, to: Timestamp) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, entry: &LedgerEntry) -> bool {
        entry.involves(self.user_id)
            && self.from.is_none_or(|from| entry.timestamp >= from)
            && self.to.is_none_or(|to| entry.timestamp <= to)
    }

    /// Filter, order and truncate entries given in append order
    ///
    /// Sorting is stable, so entries sharing a timestamp keep append order
    /// (reversed for descending).
    pub fn select<'a>(&self, entries: impl Iterator<Item = &'a LedgerEntry>) -> Vec<LedgerEntry> {
        let mut selected: Vec<LedgerEntry> =
            entries.filter(|entry| self.matches(entry)).cloned().collect();

        match self.order {
            SortOrder::Ascending => selected.sort_by_key(|entry| entry.timestamp),
            SortOrder::Descending => {
                selected.reverse();
                selected.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
            }
        }

        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }
        selected
    }
}

/// Lazy, restartable ledger query
pub struct LedgerQuery<'a, L: LedgerLog + ?Sized> {
    log: &'a L,
    filter: LedgerFilter,
}

impl<'a, L: LedgerLog + ?Sized> LedgerQuery<'a, L> {
    pub fn new(log: &'a L, filter: LedgerFilter) -> Self {
        LedgerQuery { log, filter }
    }

    pub fn filter(&self) -> &LedgerFilter {
        &self.filter
    }

    /// Run the scan now and collect every entry
    pub fn fetch(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
        self.log.scan(&self.filter)
    }

    /// Start a fresh pass over the query
    pub fn iter(&self) -> QueryIter<'_, L> {
        QueryIter {
            log: self.log,
            filter: &self.filter,
            state: IterState::Pending,
        }
    }
}

impl<'q, 'a, L: LedgerLog + ?Sized> IntoIterator for &'q LedgerQuery<'a, L> {
    type Item = Result<LedgerEntry, LedgerError>;
    type IntoIter = QueryIter<'q, L>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

enum IterState {
    Pending,
    Running(std::vec::IntoIter<LedgerEntry>),
    Done,
}

/// One pass over a `LedgerQuery`
///
/// The scan runs on the first call to `next`. A failed scan yields its error
/// once and then ends.
pub struct QueryIter<'q, L: LedgerLog + ?Sized> {
    log: &'q L,
    filter: &'q LedgerFilter,
    state: IterState,
}

impl<L: LedgerLog + ?Sized> Iterator for QueryIter<'_, L> {
    type Item = Result<LedgerEntry, LedgerError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match &mut self.state {
                IterState::Pending => match self.log.scan(self.filter) {
                    Ok(entries) => self.state = IterState::Running(entries.into_iter()),
                    Err(e) => {
                        self.state = IterState::Done;
                        return Some(Err(e));
                    }
                },
                IterState::Running(entries) => {
                    let next = entries.next();
                    if next.is_none() {
                        self.state = IterState::Done;
                    }
                    return next.map(Ok);
                }
                IterState::Done => return None,
            }
        }
    }
}

/// Ledger kept in process memory
///
/// Entries are stored in append order behind a read-write lock; appends never
/// block queries for longer than a push.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    entries: RwLock<Vec<LedgerEntry>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Every entry in append order
    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl LedgerLog for InMemoryLedger {
    fn append(&self, entry: LedgerEntry) -> Result<(), LedgerError> {
        self.entries.write().push(entry);
        Ok(())
    }

    fn scan(&self, filter: &LedgerFilter) -> Result<Vec<LedgerEntry>, LedgerError> {
        Ok(filter.select(self.entries.read().iter()))
    }
}
