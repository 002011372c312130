//! Caller-supplied deadlines for blocking store operations

use crate::types::CoordinationError;
use std::time::{Duration, Instant};

/// Point in time after which a request must stop touching the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    /// Deadline `timeout` from now
    pub fn after(timeout: Duration) -> Self {
        Deadline {
            at: Instant::now().checked_add(timeout),
        }
    }

    /// Deadline at a fixed instant
    pub fn at(instant: Instant) -> Self {
        Deadline { at: Some(instant) }
    }

    /// A deadline that never expires
    pub fn none() -> Self {
        Deadline { at: None }
    }

    pub fn is_expired(&self) -> bool {
        self.at.is_some_and(|at| Instant::now() >= at)
    }

    /// Time left, `None` when unbounded
    pub fn remaining(&self) -> Option<Duration> {
        self.at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    /// Fail with `DeadlineExceeded` once expired
    pub fn check(&self, operation: &'static str) -> Result<(), CoordinationError> {
        if self.is_expired() {
            return Err(CoordinationError::DeadlineExceeded { operation });
        }
        Ok(())
    }
}
