//! Async front for the transfer engine
//!
//! `TransferService` runs each request on tokio's blocking pool, so store and
//! ledger I/O never stalls a runtime worker. Every submission carries its own
//! deadline, started when the request is submitted rather than when a
//! blocking thread picks it up.
//!
//! ```text
//! TransferService
//!     └── Arc<TransferEngine<S, C, L>>  (shared, no engine-level lock)
//! ```

use crate::core::deadline::Deadline;
use crate::core::engine::TransferEngine;
use crate::core::traits::{AccountStore, LedgerLog, TransactionCoordinator};
use crate::types::{Receipt, Rejection, TransferError, TransferRequest};
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

/// Cloneable async handle over a shared engine
#[derive(Debug)]
pub struct TransferService<S, C, L>
where
    S: AccountStore + 'static,
    C: TransactionCoordinator + 'static,
    L: LedgerLog + 'static,
{
    engine: Arc<TransferEngine<S, C, L>>,
}

impl<S, C, L> Clone for TransferService<S, C, L>
where
    S: AccountStore + 'static,
    C: TransactionCoordinator + 'static,
    L: LedgerLog + 'static,
{
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
        }
    }
}

impl<S, C, L> TransferService<S, C, L>
where
    S: AccountStore + 'static,
    C: TransactionCoordinator + 'static,
    L: LedgerLog + 'static,
{
    pub fn new(engine: Arc<TransferEngine<S, C, L>>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<TransferEngine<S, C, L>> {
        &self.engine
    }

    /// Execute under the engine's configured request timeout
    pub async fn submit(&self, request: TransferRequest) -> Result<Receipt, Rejection> {
        let timeout = self.engine.config().request_timeout;
        self.submit_within(request, timeout).await
    }

    /// Execute with a deadline `timeout` from now
    pub async fn submit_within(
        &self,
        request: TransferRequest,
        timeout: Duration,
    ) -> Result<Receipt, Rejection> {
        let deadline = Deadline::after(timeout);
        let engine = Arc::clone(&self.engine);

        let handle =
            tokio::task::spawn_blocking(move || engine.execute_with_deadline(&request, deadline));

        match handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "Transfer worker failed");
                let error = TransferError::ApplyFailed {
                    reason: format!("transfer worker failed: {}", e),
                };
                Err(Rejection::new(error, 0))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::account_store::InMemoryAccountStore;
    use crate::core::config::EngineConfig;
    use crate::core::coordinator::StagedCoordinator;
    use crate::core::ledger::InMemoryLedger;
    use crate::types::Account;

    type Service =
        TransferService<InMemoryAccountStore, StagedCoordinator<InMemoryAccountStore>, InMemoryLedger>;

    fn service(balance: i64) -> Service {
        let store = Arc::new(InMemoryAccountStore::with_accounts([
            Account::new(1, 1001, balance),
            Account::new(2, 1002, 0),
        ]));
        let coordinator = StagedCoordinator::new(Arc::clone(&store));
        let engine = TransferEngine::new(
            store,
            coordinator,
            Arc::new(InMemoryLedger::new()),
            EngineConfig::default(),
        );
        TransferService::new(Arc::new(engine))
    }

    fn request(amount: i64) -> TransferRequest {
        TransferRequest {
            sender_id: 1,
            receiver_id: 2,
            account_number: 1002,
            amount,
            remarks: String::new(),
            timestamp: 1_700_000_000,
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_submit_runs_transfer() {
        let service = service(100);

        let receipt = service.submit(request(40)).await.unwrap();

        assert_eq!(receipt.sender_balance, 60);
        assert_eq!(service.engine().store().get(2).unwrap().balance, 40);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_zero_timeout_expires_before_work() {
        let service = service(100);

        let rejection = service
            .submit_within(request(40), Duration::ZERO)
            .await
            .unwrap_err();

        assert_eq!(rejection.error, TransferError::DeadlineExceeded);
        assert_eq!(service.engine().store().get(1).unwrap().balance, 100);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_submissions_never_overdraw() {
        let service = service(100);

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.submit(request(60)).await })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(service.engine().store().get(1).unwrap().balance, 40);
        assert_eq!(service.engine().store().get(2).unwrap().balance, 60);
    }
}
