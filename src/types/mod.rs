//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `account`: Account rows and identifiers
//! - `transfer`: Requests, ledger entries and responses
//! - `error`: Error types for every layer

pub mod account;
pub mod error;
pub mod transfer;

pub use account::{Account, AccountId, AccountNumber, Balance};
pub use error::{CoordinationError, HistoryError, LedgerError, StoreError, TransferError};
pub use transfer::{
    LedgerEntry, LedgerStatus, Receipt, Rejection, ResponseStatus, Timestamp, TransferRequest,
    TransferResponse,
};
