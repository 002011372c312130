//! Error types for the transfer engine
//!
//! Each layer owns one error enum:
//!
//! - **StoreError**: account store failures (missing rows, guard violations, version conflicts)
//! - **CoordinationError**: failures inside an atomic unit, including deadlines
//! - **LedgerError**: audit log I/O and encoding failures
//! - **TransferError**: the closed set of outcomes reported to the caller
//! - **HistoryError**: statement query failures

use super::account::{AccountId, Balance};
use thiserror::Error;

/// Errors raised by an account store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No row exists for the id
    #[error("Account {id} not found")]
    AccountNotFound { id: AccountId },

    /// A guarded decrement would drive the balance below zero
    #[error("Account {id} would overdraw: balance {balance}, delta {delta}")]
    WouldOverdraw {
        id: AccountId,
        balance: Balance,
        delta: Balance,
    },

    /// The row changed since the caller read it
    #[error("Version conflict on account {id}: expected {expected}, found {actual}")]
    VersionConflict {
        id: AccountId,
        expected: u64,
        actual: u64,
    },

    /// Balance arithmetic left the i64 range
    #[error("Arithmetic overflow on account {id}")]
    Overflow { id: AccountId },

    /// The backing store could not serve the request
    #[error("Store unavailable: {message}")]
    Unavailable { message: String },
}

/// Errors raised while running a coordinated unit
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinationError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The caller's deadline passed before the unit finished
    #[error("Deadline exceeded during {operation}")]
    DeadlineExceeded { operation: &'static str },

    /// Optimistic commit kept losing races
    #[error("Gave up after {attempts} conflicting commit attempts")]
    RetriesExhausted { attempts: u32 },
}

/// Errors raised by a ledger log
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Ledger I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Ledger encoding error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Ledger unavailable: {message}")]
    Unavailable { message: String },
}

/// Outcome kinds of a rejected transfer
///
/// The pre-mutation kinds never touch the store. The mutation-phase kinds are
/// reported after the coordinated unit has been aborted. `LogFailed` means the
/// money moved but the audit record could not be written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("Amount is required.")]
    ZeroAmount,

    /// Two-party transfers must move a positive amount
    #[error("Amount must be positive for a transfer between accounts.")]
    NegativeAmount,

    #[error("Sender not found.")]
    SenderNotFound,

    #[error("Receiver not found.")]
    ReceiverNotFound,

    /// An account lookup failed for a reason other than a missing row
    #[error("Failed to fetch account data: {reason}")]
    LookupFailed { reason: String },

    #[error("Receiver's account number does not match.")]
    AccountMismatch,

    #[error("Insufficient balance.")]
    InsufficientFunds,

    #[error("Failed to update balance: {reason}")]
    ApplyFailed { reason: String },

    #[error("Failed to commit transaction: {reason}")]
    CommitFailed { reason: String },

    #[error("Transaction deadline exceeded.")]
    DeadlineExceeded,

    #[error("Failed to log transaction: {reason}")]
    LogFailed { reason: String },
}

impl TransferError {
    /// True for rejections caused by the request itself rather than the backend
    ///
    /// The presentation layer maps these to a 4xx status.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            TransferError::ZeroAmount
                | TransferError::NegativeAmount
                | TransferError::SenderNotFound
                | TransferError::ReceiverNotFound
                | TransferError::AccountMismatch
                | TransferError::InsufficientFunds
        )
    }

    /// True when the error was raised inside the atomic unit
    pub fn is_mutation_phase(&self) -> bool {
        matches!(
            self,
            TransferError::ApplyFailed { .. }
                | TransferError::CommitFailed { .. }
                | TransferError::DeadlineExceeded
        )
    }

    /// Map a failed increment inside the unit
    ///
    /// A late overdraft rejection means another transfer won the race; the
    /// caller sees it as insufficient funds.
    pub fn from_apply(error: CoordinationError) -> Self {
        match error {
            CoordinationError::Store(StoreError::WouldOverdraw { .. }) => {
                TransferError::InsufficientFunds
            }
            CoordinationError::DeadlineExceeded { .. } => TransferError::DeadlineExceeded,
            other => TransferError::ApplyFailed {
                reason: other.to_string(),
            },
        }
    }

    /// Map a failed commit
    pub fn from_commit(error: CoordinationError) -> Self {
        match error {
            CoordinationError::Store(StoreError::WouldOverdraw { .. }) => {
                TransferError::InsufficientFunds
            }
            CoordinationError::DeadlineExceeded { .. } => TransferError::DeadlineExceeded,
            other => TransferError::CommitFailed {
                reason: other.to_string(),
            },
        }
    }
}

/// Errors raised by history queries
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("invalid month provided: {month}")]
    InvalidMonth { month: u32 },

    #[error("invalid year provided: {year}")]
    InvalidYear { year: i32 },

    #[error("No transactions found for the specified criteria")]
    NotFound,

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
