//! Funds-Transfer Engine Library
//! # Overview
//!
//! This library moves money between accounts with all-or-nothing consistency
//! and an append-only audit ledger. A batch CLI replays transfer requests from
//! CSV using either a sync or an async strategy.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Account, TransferRequest, LedgerEntry, errors)
//! - [`cli`] - CLI arguments parsing
//! - [`core`] - Business logic components:
//!   - [`core::account_store`] - Account rows with atomic conditional writes
//!   - [`core::coordinator`] - Staged and optimistic atomic units
//!   - [`core::ledger`] - Audit ledger queries
//!   - [`core::engine`] - Transfer validation and orchestration
//!   - [`core::history`] - Recent activity and monthly statements
//! - [`io`] - CSV formats, readers and the file-backed ledger
//! - [`strategy`] - Sync and async replay pipelines
//!
//! # Transfers
//!
//! - **Cross transfer** (`sender != receiver`): the amount must be positive,
//!   the sender must hold enough funds and the declared account number must
//!   match the receiver. Both balances change in one atomic unit.
//! - **Self adjustment** (`sender == receiver`): a positive amount deposits,
//!   a negative amount withdraws. No funds check is applied.
//!
//! Every outcome other than a zero or negative-cross amount leaves a ledger
//! entry marked `success` or `failed`.

// Module declarations
pub mod cli;
pub mod core;
pub mod io;
pub mod strategy;
pub mod types;

pub use core::{
    AccountStore, CoordinatorKind, EngineConfig, InMemoryAccountStore, InMemoryLedger, LedgerLog,
    OptimisticCoordinator, StagedCoordinator, TransferEngine, TransferService,
};
pub use io::{write_accounts_csv, CsvLedger};
pub use types::{
    Account, AccountId, Balance, LedgerEntry, LedgerStatus, Receipt, Rejection, TransferError,
    TransferRequest, TransferResponse,
};
