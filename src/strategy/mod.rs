//! Processing strategy module for request replay
//!
//! This module defines the Strategy pattern for complete replay pipelines:
//! seeding the account store, reading transfer requests, running them through
//! the engine and writing the final account states. Different implementations
//! (synchronous, asynchronous batch) are selected at runtime.

use crate::cli::StrategyType;
use crate::core::config::EngineConfig;
use crate::core::ledger::{InMemoryLedger, LedgerFilter};
use crate::core::traits::{AccountStore, LedgerLog};
use crate::core::InMemoryAccountStore;
use crate::io::csv_format::read_accounts_csv;
use crate::io::csv_ledger::CsvLedger;
use crate::types::{LedgerEntry, LedgerError};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use sync::SyncProcessingStrategy;

/// Processing strategy trait for complete replay pipelines
pub trait ProcessingStrategy: Send + Sync {
    /// Replay the requests in `input_path` and write final account states
    ///
    /// # Returns
    ///
    /// * `Ok(())` if the replay completed; rejected requests are not errors
    /// * `Err(String)` on a fatal error (missing file, unreadable seeds,
    ///   ledger or output I/O)
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), String>;
}

/// Inputs and settings shared by every strategy
#[derive(Clone, Debug)]
pub struct RunOptions {
    /// CSV seed with columns `id,account_number,balance`
    pub accounts_path: PathBuf,
    /// Durable ledger file; entries stay in memory when unset
    pub ledger_path: Option<PathBuf>,
    /// JSON-lines file receiving one response per request, in input order
    pub responses_path: Option<PathBuf>,
    pub engine: EngineConfig,
}

impl RunOptions {
    pub fn new(accounts_path: impl Into<PathBuf>) -> Self {
        Self {
            accounts_path: accounts_path.into(),
            ledger_path: None,
            responses_path: None,
            engine: EngineConfig::default(),
        }
    }

    /// Load the seed file into a fresh store
    pub fn seed_store(&self) -> Result<Arc<InMemoryAccountStore>, String> {
        let file = File::open(&self.accounts_path).map_err(|e| {
            format!(
                "Failed to open file '{}': {}",
                self.accounts_path.display(),
                e
            )
        })?;

        let store = InMemoryAccountStore::new();
        for account in read_accounts_csv(BufReader::new(file))? {
            if store.get(account.id).is_ok() {
                warn!(account = account.id, "Duplicate account in seed, keeping the last row");
            }
            store.insert(account);
        }

        info!(accounts = store.all_accounts().len(), "Account store seeded");
        Ok(Arc::new(store))
    }

    pub fn open_ledger(&self) -> Result<LedgerBackend, String> {
        match &self.ledger_path {
            Some(path) => CsvLedger::open(path)
                .map(LedgerBackend::File)
                .map_err(|e| format!("Failed to open ledger '{}': {}", path.display(), e)),
            None => Ok(LedgerBackend::Memory(InMemoryLedger::new())),
        }
    }

    pub fn open_responses(&self) -> Result<Option<BufWriter<File>>, String> {
        self.responses_path
            .as_ref()
            .map(|path| {
                File::create(path).map(BufWriter::new).map_err(|e| {
                    format!("Failed to create responses file '{}': {}", path.display(), e)
                })
            })
            .transpose()
    }
}

/// Ledger selected at startup
#[derive(Debug)]
pub enum LedgerBackend {
    Memory(InMemoryLedger),
    File(CsvLedger),
}

impl LedgerLog for LedgerBackend {
    fn append(&self, entry: LedgerEntry) -> Result<(), LedgerError> {
        match self {
            LedgerBackend::Memory(ledger) => ledger.append(entry),
            LedgerBackend::File(ledger) => ledger.append(entry),
        }
    }

    fn scan(&self, filter: &LedgerFilter) -> Result<Vec<LedgerEntry>, LedgerError> {
        match self {
            LedgerBackend::Memory(ledger) => ledger.scan(filter),
            LedgerBackend::File(ledger) => ledger.scan(filter),
        }
    }
}

/// Running tally of replay outcomes
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    pub committed: usize,
    pub rejected: usize,
    pub unreadable: usize,
}

impl ReplaySummary {
    pub fn log(&self) {
        info!(
            committed = self.committed,
            rejected = self.rejected,
            unreadable = self.unreadable,
            "Replay finished"
        );
    }
}

/// Create a processing strategy based on the specified strategy type
///
/// `batch` is only used by the async strategy and falls back to defaults.
pub fn create_strategy(
    strategy_type: StrategyType,
    options: RunOptions,
    batch: Option<BatchConfig>,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy::new(options)),
        StrategyType::Async => Box::new(AsyncProcessingStrategy::new(
            options,
            batch.unwrap_or_default(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_seed_store_loads_accounts() {
        let dir = TempDir::new().unwrap();
        let accounts = write(&dir, "accounts.csv", "id,account_number,balance\n1,1001,10\n2,1002,20\n");

        let store = RunOptions::new(accounts).seed_store().unwrap();

        assert_eq!(store.get(2).unwrap().balance, 20);
        assert_eq!(store.total_balance(), 30);
    }

    #[test]
    fn test_seed_store_missing_file() {
        let err = RunOptions::new("missing.csv").seed_store().unwrap_err();
        assert!(err.contains("Failed to open file"));
    }

    #[test]
    fn test_open_ledger_selects_backend() {
        let dir = TempDir::new().unwrap();
        let mut options = RunOptions::new("unused.csv");
        assert!(matches!(options.open_ledger(), Ok(LedgerBackend::Memory(_))));

        options.ledger_path = Some(dir.path().join("ledger.csv"));
        assert!(matches!(options.open_ledger(), Ok(LedgerBackend::File(_))));
    }

    #[test]
    fn test_open_responses_only_when_requested() {
        let dir = TempDir::new().unwrap();
        let mut options = RunOptions::new("unused.csv");
        assert!(options.open_responses().unwrap().is_none());

        options.responses_path = Some(dir.path().join("responses.jsonl"));
        assert!(options.open_responses().unwrap().is_some());
    }
}
