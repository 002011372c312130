//! Core business logic module
//!
//! This module contains the transfer processing components:
//! - `traits` - Store, coordinator and ledger abstractions
//! - `account_store` - In-memory account rows with per-row locks
//! - `coordinator` - Staged and optimistic atomic units
//! - `ledger` - Audit ledger queries and the in-memory ledger
//! - `engine` - Transfer validation and orchestration
//! - `history` - Recent activity and monthly statements
//! - `config` - Engine settings
//! - `deadline` - Caller deadlines
//! - `async` - Async service and batch processing

pub mod account_store;
pub mod r#async;
pub mod config;
pub mod coordinator;
pub mod deadline;
pub mod engine;
pub mod history;
pub mod ledger;
pub mod traits;

pub use account_store::InMemoryAccountStore;
pub use config::EngineConfig;
pub use coordinator::{CoordinatorKind, OptimisticCoordinator, StagedCoordinator};
pub use deadline::Deadline;
pub use engine::{AuditDispatch, TransferEngine};
pub use history::{StatementLine, StatementQuery};
pub use ledger::{InMemoryLedger, LedgerFilter, LedgerQuery, SortOrder};
pub use r#async::{BatchProcessor, TransferService};
pub use traits::{
    AccountStore, BalanceGuard, ConditionalWrite, CoordinatedUnit, LedgerLog,
    TransactionCoordinator,
};
