//! Transaction coordinators
//!
//! A coordinator opens one atomic unit per transfer. Increments are queued on
//! the unit and nothing reaches the store before `commit`, so abort only has
//! to discard the queue. The two implementations differ in what they need
//! from the store.
//!
//! - `StagedCoordinator`: commits the queue as one native multi-row
//!   transaction (`AccountStore::apply_atomic`). Guards are evaluated against
//!   the rows as they are at commit time, so there is nothing to retry.
//! - `OptimisticCoordinator`: for stores that only offer single-row
//!   compare-and-swap. Each leg is read, checked and written with
//!   `compare_and_set`, retrying on a version conflict. If a leg fails after
//!   earlier legs landed, those legs are reversed with compensating writes.
//!   Other readers may observe the intermediate state between legs.
//!
//! Dropping a unit that was never committed aborts it.

use crate::core::deadline::Deadline;
use crate::core::traits::{
    AccountStore, BalanceGuard, ConditionalWrite, CoordinatedUnit, TransactionCoordinator,
};
use crate::types::{AccountId, Balance, CoordinationError, StoreError};
use std::sync::Arc;
use tracing::{debug, error, trace};

/// Coordinator implementations selectable at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum CoordinatorKind {
    /// Native multi-row transaction
    #[default]
    Staged,
    /// Single-row compare-and-swap with retry and compensation
    Optimistic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Increment {
    id: AccountId,
    delta: Balance,
    guard: BalanceGuard,
}

/// Unit lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnitState {
    Open,
    Committed,
    Aborted,
}

/// Coordinator backed by the store's native multi-row transaction
#[derive(Debug)]
pub struct StagedCoordinator<S: AccountStore> {
    store: Arc<S>,
}

impl<S: AccountStore> StagedCoordinator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

impl<S: AccountStore> TransactionCoordinator for StagedCoordinator<S> {
    type Unit = StagedUnit<S>;

    fn begin(&self, deadline: Deadline) -> Result<Self::Unit, CoordinationError> {
        deadline.check("begin")?;
        Ok(StagedUnit {
            store: Arc::clone(&self.store),
            deadline,
            increments: Vec::new(),
            state: UnitState::Open,
        })
    }
}

/// Queued increments committed in one store transaction
#[derive(Debug)]
pub struct StagedUnit<S: AccountStore> {
    store: Arc<S>,
    deadline: Deadline,
    increments: Vec<Increment>,
    state: UnitState,
}

impl<S: AccountStore> CoordinatedUnit for StagedUnit<S> {
    fn increment(
        &mut self,
        id: AccountId,
        delta: Balance,
        guard: BalanceGuard,
    ) -> Result<(), CoordinationError> {
        self.deadline.check("increment")?;
        self.increments.push(Increment { id, delta, guard });
        Ok(())
    }

    fn commit(mut self) -> Result<(), CoordinationError> {
        self.deadline.check("commit")?;

        let writes: Vec<ConditionalWrite> = self
            .increments
            .iter()
            .map(|increment| ConditionalWrite {
                id: increment.id,
                delta: increment.delta,
                guard: increment.guard,
            })
            .collect();

        self.store.apply_atomic(&writes)?;
        self.state = UnitState::Committed;
        debug!(legs = writes.len(), "Staged unit committed");
        Ok(())
    }

    fn abort(mut self) {
        self.state = UnitState::Aborted;
        debug!(legs = self.increments.len(), "Staged unit aborted");
    }
}

impl<S: AccountStore> Drop for StagedUnit<S> {
    fn drop(&mut self) {
        if self.state == UnitState::Open {
            debug!(legs = self.increments.len(), "Staged unit dropped without commit");
        }
    }
}

/// Coordinator for stores offering only single-row compare-and-swap
#[derive(Debug)]
pub struct OptimisticCoordinator<S: AccountStore> {
    store: Arc<S>,
    max_retries: u32,
}

impl<S: AccountStore> OptimisticCoordinator<S> {
    /// `max_retries` counts attempts per leg after the first
    pub fn new(store: Arc<S>, max_retries: u32) -> Self {
        Self { store, max_retries }
    }
}

impl<S: AccountStore> TransactionCoordinator for OptimisticCoordinator<S> {
    type Unit = OptimisticUnit<S>;

    fn begin(&self, deadline: Deadline) -> Result<Self::Unit, CoordinationError> {
        deadline.check("begin")?;
        Ok(OptimisticUnit {
            store: Arc::clone(&self.store),
            deadline,
            max_retries: self.max_retries,
            increments: Vec::new(),
            state: UnitState::Open,
        })
    }
}

/// Increments written leg by leg with compare-and-swap at commit
#[derive(Debug)]
pub struct OptimisticUnit<S: AccountStore> {
    store: Arc<S>,
    deadline: Deadline,
    max_retries: u32,
    increments: Vec<Increment>,
    state: UnitState,
}

impl<S: AccountStore> OptimisticUnit<S> {
    /// Read, check and swap one row until no other writer interferes
    fn apply_leg(&self, leg: &Increment) -> Result<(), CoordinationError> {
        let attempts = self.max_retries.saturating_add(1);

        for attempt in 1..=attempts {
            let account = self.store.get(leg.id)?;
            let balance = leg.guard.apply(leg.id, account.balance, leg.delta)?;
            self.deadline.check("commit")?;

            match self.store.compare_and_set(leg.id, account.version, balance) {
                Ok(_) => return Ok(()),
                Err(StoreError::VersionConflict { .. }) => {
                    trace!(attempt, account = leg.id, "Version conflict, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(CoordinationError::RetriesExhausted { attempts })
    }

    /// Reverse legs that already landed, newest first
    fn compensate(&self, applied: &[Increment]) {
        for leg in applied.iter().rev() {
            if let Err(e) = self
                .store
                .increment(leg.id, -leg.delta, BalanceGuard::Unchecked)
            {
                error!(
                    account = leg.id,
                    delta = leg.delta,
                    error = %e,
                    "Compensating write failed"
                );
            }
        }
    }
}

impl<S: AccountStore> CoordinatedUnit for OptimisticUnit<S> {
    fn increment(
        &mut self,
        id: AccountId,
        delta: Balance,
        guard: BalanceGuard,
    ) -> Result<(), CoordinationError> {
        self.deadline.check("increment")?;
        self.increments.push(Increment { id, delta, guard });
        Ok(())
    }

    fn commit(mut self) -> Result<(), CoordinationError> {
        self.deadline.check("commit")?;

        for (index, leg) in self.increments.iter().enumerate() {
            if let Err(e) = self.apply_leg(leg) {
                self.compensate(&self.increments[..index]);
                debug!(failed_leg = index, error = %e, "Optimistic unit rolled back");
                self.state = UnitState::Aborted;
                return Err(e);
            }
        }

        self.state = UnitState::Committed;
        debug!(legs = self.increments.len(), "Optimistic unit committed");
        Ok(())
    }

    fn abort(mut self) {
        self.state = UnitState::Aborted;
        debug!(legs = self.increments.len(), "Optimistic unit aborted");
    }
}

impl<S: AccountStore> Drop for OptimisticUnit<S> {
    fn drop(&mut self) {
        if self.state == UnitState::Open {
            debug!(legs = self.increments.len(), "Optimistic unit dropped without commit");
        }
    }
}
