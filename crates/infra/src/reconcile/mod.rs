//! Order reconciliation: one polling cycle ([`ReconciliationEngine`]) and the
//! loop that repeats it with backoff ([`PollScheduler`]).

pub mod engine;
pub mod schedule;
pub mod worker;

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::order_source::OrderSourceError;

pub use engine::{DEFAULT_CALL_TIMEOUT, DEFAULT_LOOKBACK, ReconciliationEngine};
pub use schedule::{BackoffPolicy, PollMode, PollState};
pub use worker::{PollScheduler, PollerHandle};

/// Cycle-level failure. Only the fetch can fail a cycle; per-order problems
/// are counted in the [`CycleReport`] instead.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("order source unavailable: {0}")]
    SourceUnavailable(#[from] OrderSourceError),
}

/// Counters for one successful cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub fetched: usize,
    pub already_processed: usize,
    pub notified: usize,
    pub skipped_no_reference: usize,
    pub skipped_missing_design: usize,
    pub delivery_failures: usize,
    /// Ledger or design-lookup errors; those orders stay unmarked.
    pub storage_errors: usize,
}

impl CycleReport {
    /// Orders that got a processed marker this cycle.
    pub fn recorded(&self) -> usize {
        self.notified
            + self.skipped_no_reference
            + self.skipped_missing_design
    }
}

/// One unit of scheduled work.
#[async_trait::async_trait]
pub trait PollCycle: Send + Sync {
    async fn poll(&self) -> Result<CycleReport, ReconcileError>;
}

#[async_trait::async_trait]
impl<C> PollCycle for Arc<C>
where
    C: PollCycle + ?Sized,
{
    async fn poll(&self) -> Result<CycleReport, ReconcileError> {
        (**self).poll().await
    }
}
