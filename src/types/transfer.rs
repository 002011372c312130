//! Transfer request, ledger and response types
//!
//! A `TransferRequest` is built once per call and never persisted. Its outcome
//! is recorded as a `LedgerEntry` and reported to the caller as either a
//! `Receipt` or a `Rejection`, which the presentation layer renders as a
//! `TransferResponse`.

use super::account::{AccountId, AccountNumber, Balance};
use super::error::TransferError;
use serde::{Deserialize, Serialize};

/// Unix timestamp in seconds
pub type Timestamp = i64;

/// A single transfer, deposit or withdrawal request
///
/// When `sender_id == receiver_id` the request is a self-adjustment: a
/// positive amount deposits, a negative amount withdraws.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub sender_id: AccountId,
    pub receiver_id: AccountId,

    /// Receiver account number as declared by the sender
    pub account_number: AccountNumber,

    /// Non-zero amount in the smallest currency unit
    pub amount: Balance,

    #[serde(default)]
    pub remarks: String,

    /// When the client issued the request
    pub timestamp: Timestamp,
}

impl TransferRequest {
    /// True when the request adjusts a single account
    pub fn is_self_transfer(&self) -> bool {
        self.sender_id == self.receiver_id
    }
}

/// Outcome recorded in the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerStatus {
    Success,
    Failed,
}

impl LedgerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerStatus::Success => "success",
            LedgerStatus::Failed => "failed",
        }
    }
}

/// Immutable audit record of one transfer attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub sender_id: AccountId,
    pub receiver_id: AccountId,
    pub amount: Balance,
    pub remarks: String,
    pub timestamp: Timestamp,
    pub status: LedgerStatus,
}

impl LedgerEntry {
    /// Build the ledger record for a request with the given outcome
    pub fn from_request(request: &TransferRequest, status: LedgerStatus) -> Self {
        LedgerEntry {
            sender_id: request.sender_id,
            receiver_id: request.receiver_id,
            amount: request.amount,
            remarks: request.remarks.clone(),
            timestamp: request.timestamp,
            status,
        }
    }

    /// True when the user is either side of the entry
    pub fn involves(&self, user_id: AccountId) -> bool {
        self.sender_id == user_id || self.receiver_id == user_id
    }
}

/// Successful transfer result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Receipt {
    /// Sender balance re-read from the store after commit
    pub sender_balance: Balance,
}

/// Failed transfer result
///
/// Carries the sender balance so the client can refresh its view without a
/// second round trip.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{error}")]
pub struct Rejection {
    #[source]
    pub error: TransferError,
    pub sender_balance: Balance,
}

impl Rejection {
    pub fn new(error: TransferError, sender_balance: Balance) -> Self {
        Rejection {
            error,
            sender_balance,
        }
    }
}

/// Wire status of a transfer response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Response body handed to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResponse {
    pub status: ResponseStatus,
    pub message: String,
    pub updated_balance: Balance,
}

impl From<&Result<Receipt, Rejection>> for TransferResponse {
    fn from(outcome: &Result<Receipt, Rejection>) -> Self {
        match outcome {
            Ok(receipt) => TransferResponse {
                status: ResponseStatus::Success,
                message: "Transaction completed successfully.".to_string(),
                updated_balance: receipt.sender_balance,
            },
            Err(rejection) => TransferResponse {
                status: ResponseStatus::Error,
                message: rejection.error.to_string(),
                updated_balance: rejection.sender_balance,
            },
        }
    }
}
