use crate::core::config::EngineConfig;
use crate::core::coordinator::CoordinatorKind;
use crate::strategy::{BatchConfig, RunOptions};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Replay funds-transfer requests against a seeded account store
#[derive(Parser, Debug)]
#[command(name = "transfer-engine")]
#[command(about = "Replay funds-transfer requests against seeded accounts", long_about = None)]
pub struct CliArgs {
    /// Input CSV file path containing transfer requests
    #[arg(value_name = "INPUT", help = "Path to the requests CSV file")]
    pub input_file: PathBuf,

    /// Account seed file
    #[arg(
        long = "accounts",
        value_name = "FILE",
        help = "CSV with columns id,account_number,balance"
    )]
    pub accounts_file: PathBuf,

    /// Durable ledger file
    #[arg(
        long = "ledger",
        value_name = "FILE",
        help = "Append ledger entries to this CSV file (default: in memory)"
    )]
    pub ledger_file: Option<PathBuf>,

    /// Response output file
    #[arg(
        long = "responses",
        value_name = "FILE",
        help = "Write one JSON response per request to this file"
    )]
    pub responses_file: Option<PathBuf>,

    /// Processing strategy
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "sync",
        help = "Processing strategy: 'sync' for in-order or 'async' for concurrent batches"
    )]
    pub strategy: StrategyType,

    /// Coordinator backing each atomic transfer
    #[arg(
        long = "coordinator",
        value_name = "KIND",
        default_value = "staged",
        help = "Coordinator: 'staged' or 'optimistic'"
    )]
    pub coordinator: CoordinatorKind,

    /// Number of requests per batch (async mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of requests per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Maximum number of concurrent request groups (async mode only)
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Maximum number of request groups processing concurrently (default: CPU cores)"
    )]
    pub max_concurrent_batches: Option<usize>,

    /// Retry budget for the optimistic coordinator
    #[arg(
        long = "max-retries",
        value_name = "COUNT",
        help = "Commit retries after a version conflict (default: 5)"
    )]
    pub max_retries: Option<u32>,

    /// Per-request deadline
    #[arg(
        long = "timeout-ms",
        value_name = "MILLIS",
        help = "Deadline for each request in milliseconds (default: 5000)"
    )]
    pub timeout_ms: Option<u64>,
}

/// Available processing strategies
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

impl CliArgs {
    /// Create a BatchConfig from CLI arguments, falling back to defaults
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.max_concurrent_batches.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.max_concurrent_batches
                    .unwrap_or(default.max_concurrent_batches),
            )
        } else {
            BatchConfig::default()
        }
    }

    /// Create an EngineConfig from CLI arguments, falling back to defaults
    pub fn to_engine_config(&self) -> EngineConfig {
        let default = EngineConfig::default();
        EngineConfig::new(
            self.coordinator,
            self.max_retries.unwrap_or(default.max_retries),
            self.timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(default.request_timeout),
            default.recent_limit,
        )
    }

    /// Collect file locations and engine settings for a strategy
    pub fn to_run_options(&self) -> RunOptions {
        RunOptions {
            accounts_path: self.accounts_file.clone(),
            ledger_path: self.ledger_file.clone(),
            responses_path: self.responses_file.clone(),
            engine: self.to_engine_config(),
        }
    }
}
