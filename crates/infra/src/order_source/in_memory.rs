//! In-memory order source for tests/dev.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use designmail_orders::Order;

use super::{OrderSource, OrderSourceError, TimeWindow};

/// Seeded list of orders, filtered by window on every fetch.
#[derive(Debug, Default)]
pub struct InMemoryOrderSource {
    orders: RwLock<Vec<Order>>,
    failure: RwLock<Option<String>>,
    fetches: AtomicUsize,
}

impl InMemoryOrderSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn with_orders(orders: impl IntoIterator<Item = Order>) -> Self {
        let source = Self::new();
        for order in orders {
            source.push(order);
        }
        source
    }

    /// Append an order; fetches return orders in insertion order.
    pub fn push(&self, order: Order) {
        self.orders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(order);
    }

    /// Make every subsequent fetch fail with `reason` until [`Self::recover`].
    pub fn fail_with(&self, reason: impl Into<String>) {
        *self.failure.write().unwrap_or_else(PoisonError::into_inner) = Some(reason.into());
    }

    pub fn recover(&self) {
        *self.failure.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Number of fetches served (failed ones included).
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl OrderSource for InMemoryOrderSource {
    async fn fetch_orders(&self, window: TimeWindow) -> Result<Vec<Order>, OrderSourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        if let Some(reason) = self
            .failure
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            return Err(OrderSourceError::Unavailable(reason));
        }

        let orders = self.orders.read().unwrap_or_else(PoisonError::into_inner);
        Ok(orders
            .iter()
            .filter(|o| window.includes(o))
            .cloned()
            .collect())
    }
}
