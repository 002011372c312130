//! Funds-transfer engine
//!
//! This module provides the `TransferEngine` that orchestrates one transfer
//! request: validation against the account store, the coordinated balance
//! mutation, and the audit ledger append.
//!
//! The engine enforces these business rules, in order, before touching any
//! balance:
//! - the amount is non-zero, and positive when two accounts are involved
//! - the sender exists
//! - a sender paying someone else has enough funds (advisory; the store's
//!   guarded decrement is the authoritative check)
//! - the receiver exists and its account number matches the declared one
//!
//! Self-transfers (sender == receiver) are deposits or withdrawals and skip
//! the funds and receiver checks.

use crate::core::config::EngineConfig;
use crate::core::deadline::Deadline;
use crate::core::history::{self, StatementLine, StatementQuery};
use crate::core::traits::{
    AccountStore, BalanceGuard, CoordinatedUnit, LedgerLog, TransactionCoordinator,
};
use crate::types::{
    Account, AccountId, Balance, HistoryError, LedgerEntry, LedgerError, LedgerStatus, Receipt,
    Rejection, StoreError, TransferError, TransferRequest,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How failure records reach the ledger
///
/// Failure records are best-effort: their own errors are logged and never
/// returned to the caller.
#[derive(Debug, Clone, Default)]
pub enum AuditDispatch {
    /// Append on the calling thread before returning
    #[default]
    Inline,
    /// Hand the append to a blocking task on the runtime and return at once
    Detached(tokio::runtime::Handle),
}

/// One balance change inside the atomic unit
type Leg = (AccountId, Balance, BalanceGuard);

/// Transfer orchestrator
///
/// The engine holds no lock of its own and can be shared across workers
/// behind an `Arc`; every consistency guarantee comes from the coordinator
/// and the store.
#[derive(Debug)]
pub struct TransferEngine<S, C, L>
where
    S: AccountStore,
    C: TransactionCoordinator,
    L: LedgerLog + 'static,
{
    store: Arc<S>,
    coordinator: C,
    ledger: Arc<L>,
    config: EngineConfig,
    audit: AuditDispatch,
}

impl<S, C, L> TransferEngine<S, C, L>
where
    S: AccountStore,
    C: TransactionCoordinator,
    L: LedgerLog + 'static,
{
    /// Create an engine over an explicit store, coordinator and ledger
    pub fn new(store: Arc<S>, coordinator: C, ledger: Arc<L>, config: EngineConfig) -> Self {
        TransferEngine {
            store,
            coordinator,
            ledger,
            config,
            audit: AuditDispatch::Inline,
        }
    }

    /// Choose how failure records are written
    pub fn with_audit(mut self, audit: AuditDispatch) -> Self {
        self.audit = audit;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Execute a request under the configured request timeout
    pub fn execute(&self, request: &TransferRequest) -> Result<Receipt, Rejection> {
        self.execute_with_deadline(request, Deadline::after(self.config.request_timeout))
    }

    /// Execute a request under the caller's deadline
    ///
    /// # Returns
    ///
    /// * `Ok(Receipt)` with the sender balance re-read after commit
    /// * `Err(Rejection)` with the error and the sender's current balance
    ///   (zero if the sender does not exist)
    pub fn execute_with_deadline(
        &self,
        request: &TransferRequest,
        deadline: Deadline,
    ) -> Result<Receipt, Rejection> {
        debug!(
            sender = request.sender_id,
            receiver = request.receiver_id,
            amount = request.amount,
            "Executing transfer"
        );

        // Malformed requests never reach the store or the ledger
        if request.amount == 0 {
            return Err(Rejection::new(TransferError::ZeroAmount, 0));
        }
        if !request.is_self_transfer() && request.amount < 0 {
            return Err(Rejection::new(TransferError::NegativeAmount, 0));
        }

        if deadline.is_expired() {
            return Err(self.reject(request, TransferError::DeadlineExceeded, 0));
        }

        let sender = match self.store.get(request.sender_id) {
            Ok(account) => account,
            Err(StoreError::AccountNotFound { .. }) => {
                return Err(self.reject(request, TransferError::SenderNotFound, 0));
            }
            Err(e) => {
                let error = TransferError::LookupFailed {
                    reason: e.to_string(),
                };
                return Err(self.reject(request, error, 0));
            }
        };

        let legs = if request.is_self_transfer() {
            // Deposit when positive, withdrawal when negative
            vec![(sender.id, request.amount, BalanceGuard::Unchecked)]
        } else {
            self.validate_counterparty(request, &sender)?;
            vec![
                (sender.id, -request.amount, BalanceGuard::NonNegative),
                (request.receiver_id, request.amount, BalanceGuard::Unchecked),
            ]
        };

        if let Err(error) = self.run_unit(&legs, deadline) {
            let balance = self.current_balance(&sender);
            return Err(self.reject(request, error, balance));
        }

        let sender_balance = self.current_balance(&sender);

        if let Err(e) = self
            .ledger
            .append(LedgerEntry::from_request(request, LedgerStatus::Success))
        {
            warn!(
                sender = request.sender_id,
                receiver = request.receiver_id,
                error = %e,
                "Transfer committed but the ledger append failed"
            );
            let error = TransferError::LogFailed {
                reason: e.to_string(),
            };
            return Err(Rejection::new(error, sender_balance));
        }

        info!(
            sender = request.sender_id,
            receiver = request.receiver_id,
            amount = request.amount,
            sender_balance,
            "Transfer committed"
        );
        Ok(Receipt { sender_balance })
    }

    /// Funds, receiver existence and account number checks
    fn validate_counterparty(
        &self,
        request: &TransferRequest,
        sender: &Account,
    ) -> Result<(), Rejection> {
        if sender.balance < request.amount {
            return Err(self.reject(request, TransferError::InsufficientFunds, sender.balance));
        }

        let receiver = match self.store.get(request.receiver_id) {
            Ok(account) => account,
            Err(StoreError::AccountNotFound { .. }) => {
                return Err(self.reject(
                    request,
                    TransferError::ReceiverNotFound,
                    sender.balance,
                ));
            }
            Err(e) => {
                let error = TransferError::LookupFailed {
                    reason: e.to_string(),
                };
                return Err(self.reject(request, error, sender.balance));
            }
        };

        if receiver.account_number != request.account_number {
            return Err(self.reject(request, TransferError::AccountMismatch, sender.balance));
        }

        Ok(())
    }

    /// Apply every leg in one coordinated unit
    fn run_unit(&self, legs: &[Leg], deadline: Deadline) -> Result<(), TransferError> {
        let mut unit = self
            .coordinator
            .begin(deadline)
            .map_err(TransferError::from_apply)?;

        for &(id, delta, guard) in legs {
            if let Err(e) = unit.increment(id, delta, guard) {
                unit.abort();
                return Err(TransferError::from_apply(e));
            }
        }

        unit.commit().map_err(TransferError::from_commit)
    }

    /// Authoritative sender balance, falling back to the snapshot
    fn current_balance(&self, sender: &Account) -> Balance {
        match self.store.get(sender.id) {
            Ok(account) => account.balance,
            Err(e) => {
                warn!(sender = sender.id, error = %e, "Could not re-read sender balance");
                sender.balance
            }
        }
    }

    /// Record a failed attempt and build the rejection
    fn reject(&self, request: &TransferRequest, error: TransferError, balance: Balance) -> Rejection {
        warn!(
            sender = request.sender_id,
            receiver = request.receiver_id,
            amount = request.amount,
            error = %error,
            "Transfer rejected"
        );
        self.record_failure(LedgerEntry::from_request(request, LedgerStatus::Failed));
        Rejection::new(error, balance)
    }

    /// Fire-and-forget append of a failure record
    fn record_failure(&self, entry: LedgerEntry) {
        match &self.audit {
            AuditDispatch::Inline => log_append_failure(self.ledger.append(entry)),
            AuditDispatch::Detached(handle) => {
                let ledger = Arc::clone(&self.ledger);
                // The join handle is dropped; the append outlives this call
                drop(handle.spawn_blocking(move || log_append_failure(ledger.append(entry))));
            }
        }
    }

    /// Most recent ledger entries involving the user, newest first
    pub fn recent_activity(&self, user_id: AccountId) -> Result<Vec<LedgerEntry>, LedgerError> {
        history::recent_activity(self.ledger.as_ref(), user_id, self.config.recent_limit)
    }

    /// Statement lines for one calendar month, oldest first
    pub fn monthly_statement(
        &self,
        query: &StatementQuery,
    ) -> Result<Vec<StatementLine>, HistoryError> {
        history::monthly_statement(self.ledger.as_ref(), query)
    }
}

fn log_append_failure(result: Result<(), LedgerError>) {
    if let Err(e) = result {
        warn!(error = %e, "Failed to log failed transaction");
    }
}
