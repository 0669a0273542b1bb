//! Order source boundary.
//!
//! The order source is the external system of record for orders. This module
//! only reads from it: given a time window it returns the orders modified
//! inside that window, in the order the source lists them.

pub mod http;
pub mod in_memory;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

use designmail_orders::Order;

pub use http::HttpOrderSource;
pub use in_memory::InMemoryOrderSource;

/// Half-open time window `[start, end)` over order modification timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Window of length `lookback` ending at `now`.
    pub fn trailing(now: DateTime<Utc>, lookback: Duration) -> Self {
        let lookback = chrono::Duration::from_std(lookback).unwrap_or(chrono::Duration::MAX);
        let start = now.checked_sub_signed(lookback).unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self { start, end: now }
    }

    pub fn includes(&self, order: &Order) -> bool {
        order.modified_within(self.start, self.end)
    }
}

/// Order source failure.
///
/// Every variant means the source is unavailable for this cycle; the
/// reconciliation loop treats them alike and backs off.
#[derive(Debug, Error)]
pub enum OrderSourceError {
    #[error("order source request failed: {0}")]
    Transport(String),

    #[error("order source returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("order source response could not be decoded: {0}")]
    Decode(String),

    #[error("order source did not answer within {0:?}")]
    Timeout(Duration),

    #[error("order source unavailable: {0}")]
    Unavailable(String),
}

/// Read-only access to the external order source.
#[async_trait::async_trait]
pub trait OrderSource: Send + Sync {
    /// Orders whose modification timestamp falls in `window`, in source order.
    async fn fetch_orders(&self, window: TimeWindow) -> Result<Vec<Order>, OrderSourceError>;
}

#[async_trait::async_trait]
impl<S> OrderSource for Arc<S>
where
    S: OrderSource + ?Sized,
{
    async fn fetch_orders(&self, window: TimeWindow) -> Result<Vec<Order>, OrderSourceError> {
        (**self).fetch_orders(window).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use designmail_core::OrderId;

    #[test]
    fn trailing_window_ends_at_now() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let window = TimeWindow::trailing(now, Duration::from_secs(600));
        assert_eq!(window.end, now);
        assert_eq!(window.start, Utc.with_ymd_and_hms(2024, 3, 1, 11, 50, 0).unwrap());

        let at = |ts| Order::new(OrderId::new("o-1").unwrap(), "1", ts);
        assert!(window.includes(&at(window.start)));
        assert!(!window.includes(&at(window.end)));
    }
}
