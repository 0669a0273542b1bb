//! One polling cycle: fetch the trailing window, then walk the orders in
//! source order, notifying for each new order that references a design.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{Instrument, debug, error, info, info_span, warn};

use designmail_orders::Order;

use super::{CycleReport, PollCycle, ReconcileError};
use crate::designs::{DesignLookup, DesignLookupError};
use crate::ledger::{LedgerError, ProcessedOrderLedger};
use crate::notifier::{Notifier, NotifyError};
use crate::order_source::{OrderSource, OrderSourceError, TimeWindow};

pub const DEFAULT_LOOKBACK: Duration = Duration::from_secs(600);
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Drives a single cycle over the four boundaries.
///
/// Cycles must not overlap; the scheduler awaits each one before sleeping.
#[derive(Debug)]
pub struct ReconciliationEngine<S, L, D, N> {
    source: S,
    ledger: L,
    designs: D,
    notifier: N,
    lookback: Duration,
    call_timeout: Duration,
}

impl<S, L, D, N> ReconciliationEngine<S, L, D, N>
where
    S: OrderSource,
    L: ProcessedOrderLedger,
    D: DesignLookup,
    N: Notifier,
{
    pub fn new(source: S, ledger: L, designs: D, notifier: N) -> Self {
        Self {
            source,
            ledger,
            designs,
            notifier,
            lookback: DEFAULT_LOOKBACK,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_lookback(mut self, lookback: Duration) -> Self {
        self.lookback = lookback;
        self
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn lookback(&self) -> Duration {
        self.lookback
    }

    pub async fn run_cycle(&self) -> Result<CycleReport, ReconcileError> {
        self.run_cycle_at(Utc::now()).await
    }

    /// Run a cycle over the window ending at `now`.
    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> Result<CycleReport, ReconcileError> {
        let window = TimeWindow::trailing(now, self.lookback);
        let span = info_span!(
            "poll_cycle",
            window_start = %window.start,
            window_end = %window.end
        );
        self.cycle(window).instrument(span).await
    }

    async fn cycle(&self, window: TimeWindow) -> Result<CycleReport, ReconcileError> {
        let orders = with_deadline(
            self.call_timeout,
            self.source.fetch_orders(window),
            OrderSourceError::Timeout,
        )
        .await?;

        info!("Polled {} orders", orders.len());

        let mut report = CycleReport {
            fetched: orders.len(),
            ..CycleReport::default()
        };
        for order in &orders {
            let span = info_span!(
                "order",
                order_id = %order.id,
                order_number = %order.order_number
            );
            self.process_order(order, &mut report).instrument(span).await;
        }

        info!(
            fetched = report.fetched,
            already_processed = report.already_processed,
            notified = report.notified,
            skipped_no_reference = report.skipped_no_reference,
            skipped_missing_design = report.skipped_missing_design,
            delivery_failures = report.delivery_failures,
            storage_errors = report.storage_errors,
            "poll cycle completed"
        );
        Ok(report)
    }

    async fn process_order(&self, order: &Order, report: &mut CycleReport) {
        match with_deadline(self.call_timeout, self.ledger.exists(&order.id), ledger_timeout).await {
            Ok(true) => {
                debug!("order already processed");
                report.already_processed += 1;
                return;
            }
            Ok(false) => {}
            Err(e) => {
                error!(error = %e, "ledger check failed; order left for a later cycle");
                report.storage_errors += 1;
                return;
            }
        }

        let Some(design_id) = order.design_reference() else {
            warn!("order has no design reference; marking processed");
            if self.mark_processed(order).await {
                report.skipped_no_reference += 1;
            } else {
                report.storage_errors += 1;
            }
            return;
        };

        let design = match with_deadline(
            self.call_timeout,
            self.designs.find(&design_id),
            lookup_timeout,
        )
        .await
        {
            Ok(Some(design)) => design,
            Ok(None) => {
                error!(design_id = %design_id, "design not found; marking processed");
                if self.mark_processed(order).await {
                    report.skipped_missing_design += 1;
                } else {
                    report.storage_errors += 1;
                }
                return;
            }
            Err(e) => {
                error!(design_id = %design_id, error = %e, "design lookup failed; order left for a later cycle");
                report.storage_errors += 1;
                return;
            }
        };

        let image = design.decode_image();
        if image.bytes.is_empty() {
            warn!(design_id = %design_id, "design payload decoded to no image data; sending without it");
        }

        if let Err(e) = with_deadline(
            self.call_timeout,
            self.notifier.send(order, &image),
            send_timeout,
        )
        .await
        {
            error!(design_id = %design_id, error = %e, "notification failed; order left unmarked");
            report.delivery_failures += 1;
            return;
        }

        info!(design_id = %design_id, "notification sent");
        report.notified += 1;
        if !self.mark_processed(order).await {
            report.storage_errors += 1;
        }
    }

    /// Insert the processed marker. A marker written concurrently counts as
    /// recorded.
    async fn mark_processed(&self, order: &Order) -> bool {
        match with_deadline(self.call_timeout, self.ledger.record(&order.id), ledger_timeout).await {
            Ok(()) => true,
            Err(LedgerError::DuplicateKey(order_id)) => {
                debug!(order_id = %order_id, "order was recorded concurrently");
                true
            }
            Err(e) => {
                error!(error = %e, "failed to record processed order");
                false
            }
        }
    }
}

#[async_trait::async_trait]
impl<S, L, D, N> PollCycle for ReconciliationEngine<S, L, D, N>
where
    S: OrderSource,
    L: ProcessedOrderLedger,
    D: DesignLookup,
    N: Notifier,
{
    async fn poll(&self) -> Result<CycleReport, ReconcileError> {
        self.run_cycle().await
    }
}

async fn with_deadline<T, E, F>(
    limit: Duration,
    fut: F,
    on_timeout: impl FnOnce(Duration) -> E,
) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(on_timeout(limit)),
    }
}

fn ledger_timeout(limit: Duration) -> LedgerError {
    LedgerError::Storage(format!("no response within {limit:?}"))
}

fn lookup_timeout(limit: Duration) -> DesignLookupError {
    DesignLookupError::Storage(format!("no response within {limit:?}"))
}

fn send_timeout(limit: Duration) -> NotifyError {
    NotifyError::DeliveryFailed(format!("no response within {limit:?}"))
}
