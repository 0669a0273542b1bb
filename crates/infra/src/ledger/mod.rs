//! Processed-order ledger (dedup store).
//!
//! A marker for an order id means the reconciliation loop is done with that
//! order, whether it was notified or conclusively skipped. Markers are only
//! ever inserted; nothing in this crate updates or deletes them.
//!
//! The unique key is the concurrency safety net: if two cycles (or two
//! processes) race to record the same order, the loser gets
//! [`LedgerError::DuplicateKey`] and callers treat that as success.

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use designmail_core::OrderId;

pub use in_memory::InMemoryLedger;
pub use postgres::PostgresLedger;

/// A persisted marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedOrder {
    pub order_id: OrderId,
    pub processed_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    /// The order already has a marker.
    #[error("order already recorded: {0}")]
    DuplicateKey(OrderId),

    #[error("ledger storage error: {0}")]
    Storage(String),
}

/// Persistent, key-unique record of processed orders.
#[async_trait::async_trait]
pub trait ProcessedOrderLedger: Send + Sync {
    async fn exists(&self, order_id: &OrderId) -> Result<bool, LedgerError>;

    /// Insert a marker. Fails with `DuplicateKey` if one already exists.
    async fn record(&self, order_id: &OrderId) -> Result<(), LedgerError>;
}

#[async_trait::async_trait]
impl<L> ProcessedOrderLedger for Arc<L>
where
    L: ProcessedOrderLedger + ?Sized,
{
    async fn exists(&self, order_id: &OrderId) -> Result<bool, LedgerError> {
        (**self).exists(order_id).await
    }

    async fn record(&self, order_id: &OrderId) -> Result<(), LedgerError> {
        (**self).record(order_id).await
    }
}
