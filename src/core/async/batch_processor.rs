//! Batch processing with account-based partitioning
//!
//! This module provides the `BatchProcessor` struct, which runs a batch of
//! transfer requests through a `TransferService` concurrently while keeping
//! every account's requests in submission order.
//!
//! # Design
//!
//! A batch is split into groups: two requests land in the same group when
//! they share an account, as sender or receiver, directly or through a chain
//! of other requests. Groups run concurrently, at most `max_concurrent` at a
//! time; requests inside a group run one after another in input order.
//! Different groups touch disjoint accounts, so the balances and outcomes
//! match a run of the whole batch in input order.
//!
//! ```text
//! BatchProcessor
//!     ├── TransferService  (spawn_blocking per request)
//!     └── max_concurrent   (groups in flight)
//! ```

use std::collections::BTreeMap;

use futures::stream::{self, StreamExt};

use super::TransferService;
use crate::core::traits::{AccountStore, LedgerLog, TransactionCoordinator};
use crate::types::{AccountId, Receipt, Rejection, TransferRequest};

/// A request tagged with its position in the input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencedRequest {
    pub seq: usize,
    pub request: TransferRequest,
}

/// Result of processing a single request
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    /// Position of the request in the input
    pub seq: usize,
    pub request: TransferRequest,
    pub outcome: Result<Receipt, Rejection>,
}

/// Disjoint sets of account ids
#[derive(Debug, Default)]
struct AccountSets {
    parent: BTreeMap<AccountId, AccountId>,
}

impl AccountSets {
    fn find(&mut self, id: AccountId) -> AccountId {
        let mut root = *self.parent.entry(id).or_insert(id);
        while let Some(&parent) = self.parent.get(&root) {
            if parent == root {
                break;
            }
            root = parent;
        }

        // Point every id on the path straight at the root
        let mut current = id;
        while current != root {
            let next = self.parent.get(&current).copied().unwrap_or(root);
            self.parent.insert(current, root);
            current = next;
        }
        root
    }

    fn union(&mut self, a: AccountId, b: AccountId) {
        let (root_a, root_b) = (self.find(a), self.find(b));
        if root_a != root_b {
            self.parent.insert(root_a.max(root_b), root_a.min(root_b));
        }
    }
}

/// Concurrent batch runner over a shared service
#[derive(Debug)]
pub struct BatchProcessor<S, C, L>
where
    S: AccountStore + 'static,
    C: TransactionCoordinator + 'static,
    L: LedgerLog + 'static,
{
    service: TransferService<S, C, L>,
    max_concurrent: usize,
}

impl<S, C, L> BatchProcessor<S, C, L>
where
    S: AccountStore + 'static,
    C: TransactionCoordinator + 'static,
    L: LedgerLog + 'static,
{
    /// Create a processor running at most `max_concurrent` groups at once
    ///
    /// A zero limit is treated as one.
    pub fn new(service: TransferService<S, C, L>, max_concurrent: usize) -> Self {
        Self {
            service,
            max_concurrent: max_concurrent.max(1),
        }
    }

    pub fn service(&self) -> &TransferService<S, C, L> {
        &self.service
    }

    /// Partition a batch into groups of requests sharing accounts
    ///
    /// # Guarantees
    ///
    /// - Each request appears in exactly one group
    /// - No account is touched by two groups
    /// - Requests in a group keep their original order
    /// - Groups are ordered by their first request
    pub fn partition_by_accounts(
        &self,
        batch: Vec<SequencedRequest>,
    ) -> Vec<Vec<SequencedRequest>> {
        let mut sets = AccountSets::default();
        for item in &batch {
            sets.union(item.request.sender_id, item.request.receiver_id);
        }

        let mut groups: Vec<Vec<SequencedRequest>> = Vec::new();
        let mut group_of_root: BTreeMap<AccountId, usize> = BTreeMap::new();

        for item in batch {
            let root = sets.find(item.request.sender_id);
            let index = *group_of_root.entry(root).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[index].push(item);
        }

        groups
    }

    /// Run one group's requests in order
    pub async fn process_group(
        &self,
        requests: Vec<SequencedRequest>,
    ) -> Vec<ProcessingResult> {
        let mut results = Vec::with_capacity(requests.len());

        for SequencedRequest { seq, request } in requests {
            let outcome = self.service.submit(request.clone()).await;
            results.push(ProcessingResult {
                seq,
                request,
                outcome,
            });
        }

        results
    }

    /// Process a batch and return results sorted by `seq`
    ///
    /// Failed requests are captured in their result and never stop the batch.
    pub async fn process_batch(&self, batch: Vec<SequencedRequest>) -> Vec<ProcessingResult> {
        let groups = self.partition_by_accounts(batch);

        let mut results: Vec<ProcessingResult> = stream::iter(groups)
            .map(|requests| self.process_group(requests))
            .buffer_unordered(self.max_concurrent)
            .flat_map(stream::iter)
            .collect()
            .await;

        results.sort_by_key(|result| result.seq);
        results
    }
}
