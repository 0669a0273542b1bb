//! Infrastructure layer: configuration, adapters to the outside world, and
//! the order reconciliation loop that drives them.

pub mod config;
pub mod designs;
pub mod ledger;
pub mod notifier;
pub mod order_source;
pub mod reconcile;


pub use config::{ConfigError, MailConfig, OrderSourceConfig, PollerConfig};
pub use reconcile::{
    BackoffPolicy, CycleReport, PollCycle, PollMode, PollScheduler, PollState, PollerHandle,
    ReconcileError, ReconciliationEngine,
};
