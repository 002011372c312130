//! Transfer engine CLI
//!
//! Replays funds-transfer requests from a CSV file against a seeded account
//! store and prints the final account states to stdout.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- --accounts accounts.csv requests.csv > balances.csv
//! cargo run -- --accounts accounts.csv --ledger ledger.csv --responses out.jsonl requests.csv
//! cargo run -- --accounts accounts.csv --strategy async --batch-size 500 --max-concurrent 8 requests.csv
//! cargo run -- --accounts accounts.csv --coordinator optimistic --max-retries 3 requests.csv
//! ```
//!
//! Logs go to stderr; set `RUST_LOG` (default `info`) to adjust verbosity.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (missing arguments, file not found, file not readable, etc.)

use std::process;
use tracing_subscriber::EnvFilter;
use transfer_engine::cli;
use transfer_engine::strategy;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = cli::parse_args();

    let strategy = {
        let batch = if matches!(args.strategy, cli::StrategyType::Async) {
            Some(args.to_batch_config())
        } else {
            None
        };
        strategy::create_strategy(args.strategy, args.to_run_options(), batch)
    };

    // Output goes to stdout
    let mut output = std::io::stdout();
    if let Err(e) = strategy.process(&args.input_file, &mut output) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
