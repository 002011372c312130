//! Asynchronous batch processing strategy
//!
//! This module provides a multi-threaded implementation of the
//! ProcessingStrategy trait. Requests are read in batches and each batch is
//! run concurrently through a `BatchProcessor`.
//!
//! # Architecture
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── BatchConfig (batch_size, max_concurrent_batches)
//!     ├── AsyncReader (batch CSV reading)
//!     └── BatchProcessor (account partitioning, bounded concurrency)
//!         └── TransferService (spawn_blocking + deadline per request)
//!             └── TransferEngine
//! ```
//!
//! # Ordering
//!
//! - Batches run one after another
//! - Within a batch, requests sharing an account run in file order
//! - Groups of requests with no account in common run concurrently
//!
//! Balances and responses therefore match the synchronous strategy for any
//! batch size.

use crate::core::coordinator::{CoordinatorKind, OptimisticCoordinator, StagedCoordinator};
use crate::core::engine::{AuditDispatch, TransferEngine};
use crate::core::r#async::{BatchProcessor, TransferService};
use crate::core::traits::TransactionCoordinator;
use crate::core::InMemoryAccountStore;
use crate::io::async_reader::AsyncReader;
use crate::io::csv_format::{write_accounts_csv, write_response_line};
use crate::strategy::{LedgerBackend, ProcessingStrategy, ReplaySummary, RunOptions};
use crate::types::TransferResponse;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Configuration for batch processing
///
/// Controls how requests are batched and how many request groups run
/// at once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchConfig {
    /// Number of requests per batch
    pub batch_size: usize,
    /// Maximum number of request groups processing concurrently
    pub max_concurrent_batches: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent_batches: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a new BatchConfig, replacing zero values with defaults
    pub fn new(batch_size: usize, max_concurrent_batches: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            warn!(
                default = default.batch_size,
                "Invalid batch_size (0), using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent_batches = if max_concurrent_batches == 0 {
            warn!(
                default = default.max_concurrent_batches,
                "Invalid max_concurrent_batches (0), using default"
            );
            default.max_concurrent_batches
        } else {
            max_concurrent_batches
        };

        Self {
            batch_size,
            max_concurrent_batches,
        }
    }
}

/// Asynchronous batch processing strategy
#[derive(Debug, Clone)]
pub struct AsyncProcessingStrategy {
    options: RunOptions,
    config: BatchConfig,
}

impl AsyncProcessingStrategy {
    pub fn new(options: RunOptions, config: BatchConfig) -> Self {
        Self { options, config }
    }

    async fn replay<C: TransactionCoordinator + 'static>(
        &self,
        engine: TransferEngine<InMemoryAccountStore, C, LedgerBackend>,
        input_path: &Path,
        responses: &mut Option<impl Write>,
    ) -> Result<ReplaySummary, String> {
        let processor = BatchProcessor::new(
            TransferService::new(Arc::new(engine)),
            self.config.max_concurrent_batches,
        );

        let file = tokio::fs::File::open(input_path)
            .await
            .map_err(|e| format!("Failed to open file '{}': {}", input_path.display(), e))?;

        // Wrap tokio file in a compatibility layer for csv-async
        let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
        let mut reader = AsyncReader::new(compat_file);

        let mut summary = ReplaySummary::default();

        loop {
            let batch = reader.read_batch(self.config.batch_size).await;
            if batch.is_empty() {
                break;
            }

            debug!(size = batch.len(), first = batch[0].seq, "Processing batch");
            let results = processor.process_batch(batch).await;

            for result in &results {
                match &result.outcome {
                    Ok(_) => summary.committed += 1,
                    Err(_) => summary.rejected += 1,
                }
                if let Some(out) = responses.as_mut() {
                    write_response_line(&TransferResponse::from(&result.outcome), out)?;
                }
            }
        }

        summary.unreadable = reader.rows_read() - summary.committed - summary.rejected;
        Ok(summary)
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    /// Replay requests batch by batch and write final account states
    ///
    /// Fatal errors (file not found, I/O errors, runtime errors) are returned
    /// immediately. Individual request failures are captured per request.
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), String> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.max_concurrent_batches)
            .enable_time()
            .build()
            .map_err(|e| format!("Failed to create tokio runtime: {}", e))?;

        let store = self.options.seed_store()?;
        let ledger = Arc::new(self.options.open_ledger()?);
        let mut responses = self.options.open_responses()?;
        let audit = AuditDispatch::Detached(runtime.handle().clone());

        let config = self.options.engine.clone();
        let summary = runtime.block_on(async {
            match config.coordinator {
                CoordinatorKind::Staged => {
                    let coordinator = StagedCoordinator::new(Arc::clone(&store));
                    let engine = TransferEngine::new(Arc::clone(&store), coordinator, ledger, config)
                        .with_audit(audit);
                    self.replay(engine, input_path, &mut responses).await
                }
                CoordinatorKind::Optimistic => {
                    let coordinator =
                        OptimisticCoordinator::new(Arc::clone(&store), config.max_retries);
                    let engine = TransferEngine::new(Arc::clone(&store), coordinator, ledger, config)
                        .with_audit(audit);
                    self.replay(engine, input_path, &mut responses).await
                }
            }
        })?;

        // Wait for detached audit appends before reporting
        runtime.shutdown_timeout(self.options.engine.request_timeout);

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

    const ACCOUNTS: &str = "id,account_number,balance\n1,1001,100\n2,1002,50\n3,1003,0\n";
    const HEADER: &str = "sender,receiver,account_number,amount,remarks,timestamp\n";

    fn fixture(requests: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("accounts.csv"), ACCOUNTS).unwrap();
        std::fs::write(
            dir.path().join("requests.csv"),
            format!("{}{}", HEADER, requests),
        )
        .unwrap();
        dir
    }

    fn run(dir: &TempDir, options: RunOptions, config: BatchConfig) -> Result<String, String> {
        let mut output = Vec::new();
        AsyncProcessingStrategy::new(options, config)
            .process(&dir.path().join("requests.csv"), &mut output)?;
        Ok(String::from_utf8(output).unwrap())
    }

    #[rstest::rstest]
    #[case::zero_batch_size(0, 4, 1000, 4)]
    #[case::zero_concurrency(10, 0, 10, num_cpus::get())]
    #[case::custom(10, 4, 10, 4)]
    fn test_batch_config_new(
        #[case] batch_size: usize,
        #[case] max_concurrent: usize,
        #[case] expected_batch_size: usize,
        #[case] expected_concurrent: usize,
    ) {
        let config = BatchConfig::new(batch_size, max_concurrent);
        assert_eq!(config.batch_size, expected_batch_size);
        assert_eq!(config.max_concurrent_batches, expected_concurrent);
    }

    #[test]
    fn test_async_strategy_maintains_order_across_batches() {
        let dir = fixture("1,3,1003,60,a,1\n2,3,1003,50,b,2\n1,3,1003,30,c,3\n1,3,1003,20,d,4\n");
        let options = RunOptions::new(dir.path().join("accounts.csv"));

        let output = run(&dir, options, BatchConfig::new(2, 4)).unwrap();

        // Sender 1: 60 and 30 succeed, 20 exceeds the remaining 10
        assert_eq!(
            output,
            "id,account_number,balance\n1,1001,10\n2,1002,0\n3,1003,140\n"
        );
    }

    #[test]
    fn test_async_strategy_writes_responses_in_input_order() {
        let dir = fixture("1,3,1003,10,a,1\n2,3,1003,500,b,2\n1,3,1003,oops,c,3\n1,1,0,-5,d,4\n");
        let mut options = RunOptions::new(dir.path().join("accounts.csv"));
        options.responses_path = Some(dir.path().join("responses.jsonl"));
        options.ledger_path = Some(dir.path().join("ledger.csv"));

        run(&dir, options, BatchConfig::new(10, 4)).unwrap();

        let responses = std::fs::read_to_string(dir.path().join("responses.jsonl")).unwrap();
        let lines: Vec<&str> = responses.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains(r#""updated_balance":90"#));
        assert!(lines[1].contains("Insufficient balance."));
        assert!(lines[2].contains(r#""updated_balance":85"#));

        let ledger = std::fs::read_to_string(dir.path().join("ledger.csv")).unwrap();
        assert_eq!(ledger.lines().count(), 4);
    }

    #[test]
    fn test_async_strategy_optimistic_coordinator() {
        let dir = fixture("2,1,1001,50,a,1\n1,3,1003,150,b,2\n");
        let mut options = RunOptions::new(dir.path().join("accounts.csv"));
        options.engine.coordinator = CoordinatorKind::Optimistic;

        let output = run(&dir, options, BatchConfig::new(10, 2)).unwrap();

        assert_eq!(
            output,
            "id,account_number,balance\n1,1001,0\n2,1002,0\n3,1003,150\n"
        );
    }

    #[rstest::rstest]
    fn test_async_matches_sync_when_a_transfer_funds_the_next(
        #[values(CoordinatorKind::Staged, CoordinatorKind::Optimistic)] coordinator: CoordinatorKind,
    ) {
        // Account 3 is empty until the first request lands, and the paying
        // account has the higher id
        let dir = fixture("1,3,1003,100,fund,1\n3,2,1002,100,spend,2\n");
        let mut options = RunOptions::new(dir.path().join("accounts.csv"));
        options.engine.coordinator = coordinator;

        let mut sync_output = Vec::new();
        crate::strategy::SyncProcessingStrategy::new(options.clone())
            .process(&dir.path().join("requests.csv"), &mut sync_output)
            .unwrap();
        let async_output = run(&dir, options, BatchConfig::default()).unwrap();

        assert_eq!(async_output, String::from_utf8(sync_output).unwrap());
        assert_eq!(
            async_output,
            "id,account_number,balance\n1,1001,0\n2,1002,150\n3,1003,0\n"
        );
    }

    #[test]
    fn test_async_strategy_handles_missing_file() {
        let dir = fixture("");
        let mut output = Vec::new();

        let err = AsyncProcessingStrategy::new(
            RunOptions::new(dir.path().join("accounts.csv")),
            BatchConfig::default(),
        )
        .process(Path::new("nonexistent.csv"), &mut output)
        .unwrap_err();
        assert!(err.contains("Failed to open file"));
    }
}
