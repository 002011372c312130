//! Benchmark suite for comparing replay strategies and coordinators
//!
//! Runs the full replay pipeline (seed, replay, balance dump) with the sync
//! and async strategies against both the staged and the optimistic
//! coordinator, using the divan benchmarking framework.
//!
//! # Running Benchmarks
//!
//! ```bash
//! cargo bench
//! ```
//!
//! # Benchmark Fixtures
//!
//! - `accounts_small.csv` / `requests_small.csv` - 50 accounts, 1,000 requests
//! - `accounts_large.csv` / `requests_large.csv` - 500 accounts, 20,000 requests
//!
//! Requests mix cross transfers, self adjustments, overdrafts and account
//! number mismatches.

use std::path::Path;
use transfer_engine::cli::StrategyType;
use transfer_engine::core::CoordinatorKind;
use transfer_engine::strategy::{create_strategy, BatchConfig, RunOptions};

fn main() {
    divan::main();
}

const COORDINATORS: [CoordinatorKind; 2] = [CoordinatorKind::Staged, CoordinatorKind::Optimistic];

fn replay(size: &str, strategy_type: StrategyType, coordinator: CoordinatorKind) {
    let fixtures = Path::new("benches/fixtures");
    let mut options = RunOptions::new(fixtures.join(format!("accounts_{}.csv", size)));
    options.engine.coordinator = coordinator;

    let batch = match strategy_type {
        StrategyType::Sync => None,
        StrategyType::Async => Some(BatchConfig::default()),
    };
    let strategy = create_strategy(strategy_type, options, batch);

    let mut output = Vec::new();
    strategy
        .process(&fixtures.join(format!("requests_{}.csv", size)), &mut output)
        .expect("Processing failed");
}

/// Synchronous replay, 1,000 requests
#[divan::bench(args = COORDINATORS)]
fn sync_strategy_small(coordinator: CoordinatorKind) {
    replay("small", StrategyType::Sync, coordinator);
}

/// Asynchronous replay, 1,000 requests
#[divan::bench(args = COORDINATORS)]
fn async_strategy_small(coordinator: CoordinatorKind) {
    replay("small", StrategyType::Async, coordinator);
}

/// Synchronous replay, 20,000 requests
#[divan::bench(args = COORDINATORS, sample_count = 20)]
fn sync_strategy_large(coordinator: CoordinatorKind) {
    replay("large", StrategyType::Sync, coordinator);
}

/// Asynchronous replay, 20,000 requests
#[divan::bench(args = COORDINATORS, sample_count = 20)]
fn async_strategy_large(coordinator: CoordinatorKind) {
    replay("large", StrategyType::Async, coordinator);
}
