//! Engine configuration
//!
//! Built once at startup (from CLI arguments in the binary) and handed to
//! the engine and its coordinator.

use crate::core::coordinator::CoordinatorKind;
use std::time::Duration;
use tracing::warn;

/// Runtime settings for the transfer engine
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Which coordinator backs the atomic unit
    pub coordinator: CoordinatorKind,
    /// Extra commit attempts for the optimistic coordinator
    pub max_retries: u32,
    /// Deadline applied to each request that doesn't bring its own
    pub request_timeout: Duration,
    /// Number of entries returned by recent-activity queries
    pub recent_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            coordinator: CoordinatorKind::Staged,
            max_retries: 5,
            request_timeout: Duration::from_secs(5),
            recent_limit: 10,
        }
    }
}

impl EngineConfig {
    /// Create a config, replacing unusable values with defaults
    pub fn new(
        coordinator: CoordinatorKind,
        max_retries: u32,
        request_timeout: Duration,
        recent_limit: usize,
    ) -> Self {
        let default = Self::default();

        let request_timeout = if request_timeout.is_zero() {
            warn!(
                default_ms = default.request_timeout.as_millis() as u64,
                "Invalid request_timeout (0), using default"
            );
            default.request_timeout
        } else {
            request_timeout
        };

        let recent_limit = if recent_limit == 0 {
            warn!(
                default = default.recent_limit,
                "Invalid recent_limit (0), using default"
            );
            default.recent_limit
        } else {
            recent_limit
        };

        Self {
            coordinator,
            max_retries,
            request_timeout,
            recent_limit,
        }
    }
}
