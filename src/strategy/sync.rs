//! Synchronous processing strategy
//!
//! This module provides a single-threaded implementation of the
//! ProcessingStrategy trait. It orchestrates the replay by coordinating
//! between the SyncReader (for CSV input) and TransferEngine (for business
//! logic).
//!
//! # Design
//!
//! The SyncProcessingStrategy focuses on orchestration, delegating:
//! - CSV parsing to `SyncReader` (iterator interface)
//! - Transfer processing to `TransferEngine` (business logic)
//! - CSV output to `csv_format::write_accounts_csv` (format handling)
//!
//! Requests are streamed one at a time and executed in file order, so the
//! outcome of every request is deterministic.

use crate::core::coordinator::{CoordinatorKind, OptimisticCoordinator, StagedCoordinator};
use crate::core::engine::TransferEngine;
use crate::core::traits::TransactionCoordinator;
use crate::core::InMemoryAccountStore;
use crate::io::csv_format::{write_accounts_csv, write_response_line};
use crate::io::sync_reader::SyncReader;
use crate::strategy::{LedgerBackend, ProcessingStrategy, ReplaySummary, RunOptions};
use crate::types::TransferResponse;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

type Engine<C> = TransferEngine<InMemoryAccountStore, C, LedgerBackend>;

/// Synchronous processing strategy
///
/// # Examples
///
/// ```no_run
/// use transfer_engine::strategy::{ProcessingStrategy, RunOptions, SyncProcessingStrategy};
/// use std::path::Path;
/// use std::io;
///
/// let strategy = SyncProcessingStrategy::new(RunOptions::new("accounts.csv"));
/// let mut output = io::stdout();
///
/// strategy.process(Path::new("requests.csv"), &mut output)
///     .expect("Processing failed");
/// ```
#[derive(Debug, Clone)]
pub struct SyncProcessingStrategy {
    options: RunOptions,
}

impl SyncProcessingStrategy {
    pub fn new(options: RunOptions) -> Self {
        Self { options }
    }

    /// Stream every request through the engine in file order
    fn replay<C: TransactionCoordinator + 'static>(
        &self,
        engine: &Engine<C>,
        reader: SyncReader,
        responses: &mut Option<impl Write>,
    ) -> Result<ReplaySummary, String> {
        let mut summary = ReplaySummary::default();

        for result in reader {
            let request = match result {
                Ok(request) => request,
                Err(e) => {
                    warn!(error = %e, "Skipping invalid request");
                    summary.unreadable += 1;
                    continue;
                }
            };

            let outcome = engine.execute(&request);
            match &outcome {
                Ok(_) => summary.committed += 1,
                Err(_) => summary.rejected += 1,
            }

            if let Some(out) = responses.as_mut() {
                write_response_line(&TransferResponse::from(&outcome), out)?;
            }
        }

        Ok(summary)
    }
}

impl ProcessingStrategy for SyncProcessingStrategy {
    /// Replay requests and write final account states
    ///
    /// 1. Seeds the account store and opens the ledger
    /// 2. Builds a TransferEngine over the configured coordinator
    /// 3. Executes each request in file order
    /// 4. Writes account states to output using csv_format::write_accounts_csv
    ///
    /// Individual request failures are logged and processing continues.
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), String> {
        let store = self.options.seed_store()?;
        let ledger = Arc::new(self.options.open_ledger()?);
        let mut responses = self.options.open_responses()?;
        let reader = SyncReader::new(input_path)?;

        let config = self.options.engine.clone();
        let summary = match config.coordinator {
            CoordinatorKind::Staged => {
                let coordinator = StagedCoordinator::new(Arc::clone(&store));
                let engine = TransferEngine::new(Arc::clone(&store), coordinator, ledger, config);
                self.replay(&engine, reader, &mut responses)?
            }
            CoordinatorKind::Optimistic => {
                let coordinator = OptimisticCoordinator::new(Arc::clone(&store), config.max_retries);
                let engine = TransferEngine::new(Arc::clone(&store), coordinator, ledger, config);
                self.replay(&engine, reader, &mut responses)?
            }
        };

        if let Some(out) = responses.as_mut() {
            out.flush()
                .map_err(|e| format!("Failed to flush responses: {}", e))?;
        }
        summary.log();

        write_accounts_csv(&store.all_accounts(), output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ACCOUNTS: &str = "id,account_number,balance\n1,1001,100\n2,1002,50\n";
    const HEADER: &str = "sender,receiver,account_number,amount,remarks,timestamp\n";

    struct Fixture {
        dir: TempDir,
    }

    impl Fixture {
        fn new(requests: &str) -> Self {
            let dir = TempDir::new().unwrap();
            std::fs::write(dir.path().join("accounts.csv"), ACCOUNTS).unwrap();
            std::fs::write(
                dir.path().join("requests.csv"),
                format!("{}{}", HEADER, requests),
            )
            .unwrap();
            Fixture { dir }
        }

        fn options(&self) -> RunOptions {
            RunOptions::new(self.dir.path().join("accounts.csv"))
        }

        fn run(&self, options: RunOptions) -> Result<String, String> {
            let mut output = Vec::new();
            SyncProcessingStrategy::new(options)
                .process(&self.dir.path().join("requests.csv"), &mut output)?;
            Ok(String::from_utf8(output).unwrap())
        }
    }

    #[test]
    fn test_sync_strategy_applies_transfers_in_order() {
        let fixture = Fixture::new("1,2,1002,70,a,1\n1,2,1002,40,b,2\n2,1,1001,20,c,3\n");

        let output = fixture.run(fixture.options()).unwrap();

        // Second transfer fails: only 30 left after the first
        assert_eq!(output, "id,account_number,balance\n1,1001,50\n2,1002,100\n");
    }

    #[test]
    fn test_sync_strategy_writes_responses_and_ledger() {
        let fixture = Fixture::new("1,2,1002,70,a,1\n1,2,9999,10,b,2\n1,2,1002,bad,c,3\n");
        let mut options = fixture.options();
        options.ledger_path = Some(fixture.dir.path().join("ledger.csv"));
        options.responses_path = Some(fixture.dir.path().join("responses.jsonl"));

        fixture.run(options).unwrap();

        let responses =
            std::fs::read_to_string(fixture.dir.path().join("responses.jsonl")).unwrap();
        let lines: Vec<&str> = responses.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains(r#""status":"success""#));
        assert!(lines[1].contains("does not match"));

        let ledger = std::fs::read_to_string(fixture.dir.path().join("ledger.csv")).unwrap();
        assert_eq!(ledger.lines().count(), 3);
        assert!(ledger.contains(",success"));
        assert!(ledger.contains(",failed"));
    }

    #[test]
    fn test_sync_strategy_optimistic_coordinator() {
        let fixture = Fixture::new("2,1,1001,50,all,1\n");
        let mut options = fixture.options();
        options.engine.coordinator = CoordinatorKind::Optimistic;

        let output = fixture.run(options).unwrap();

        assert_eq!(output, "id,account_number,balance\n1,1001,150\n2,1002,0\n");
    }

    #[test]
    fn test_sync_strategy_handles_missing_file() {
        let fixture = Fixture::new("");
        let mut output = Vec::new();

        let result = SyncProcessingStrategy::new(fixture.options())
            .process(Path::new("nonexistent.csv"), &mut output);

        assert!(result.unwrap_err().contains("Failed to open file"));
    }
}
