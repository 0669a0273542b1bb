//! In-memory ledger for tests/dev.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::Utc;

use designmail_core::OrderId;

use super::{LedgerError, ProcessedOrder, ProcessedOrderLedger};

/// Ledger kept in a map. Counts `record` calls (including rejected duplicates)
/// so tests can assert how often the loop tried to write.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    markers: RwLock<HashMap<OrderId, ProcessedOrder>>,
    record_calls: AtomicUsize,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Seed a marker without counting it as a `record` call.
    pub fn seed(&self, order_id: OrderId) {
        let marker = ProcessedOrder {
            order_id: order_id.clone(),
            processed_at: Utc::now(),
        };
        self.markers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(order_id, marker);
    }

    pub fn contains(&self, order_id: &OrderId) -> bool {
        self.markers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(order_id)
    }

    pub fn get(&self, order_id: &OrderId) -> Option<ProcessedOrder> {
        self.markers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(order_id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.markers.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn record_calls(&self) -> usize {
        self.record_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ProcessedOrderLedger for InMemoryLedger {
    async fn exists(&self, order_id: &OrderId) -> Result<bool, LedgerError> {
        Ok(self.contains(order_id))
    }

    async fn record(&self, order_id: &OrderId) -> Result<(), LedgerError> {
        self.record_calls.fetch_add(1, Ordering::SeqCst);

        let mut markers = self.markers.write().unwrap_or_else(PoisonError::into_inner);
        if markers.contains_key(order_id) {
            return Err(LedgerError::DuplicateKey(order_id.clone()));
        }
        markers.insert(
            order_id.clone(),
            ProcessedOrder {
                order_id: order_id.clone(),
                processed_at: Utc::now(),
            },
        );
        Ok(())
    }
}
