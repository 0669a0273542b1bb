//! Background polling loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};

use super::schedule::{BackoffPolicy, PollState};
use super::PollCycle;

/// Runs cycles back to back, sleeping `poll_interval` after a success and
/// backing off exponentially after failures.
#[derive(Debug)]
pub struct PollScheduler<C> {
    cycle: C,
    policy: BackoffPolicy,
    state: PollState,
}

impl<C: PollCycle> PollScheduler<C> {
    pub fn new(cycle: C, policy: BackoffPolicy) -> Self {
        Self {
            cycle,
            state: PollState::new(&policy),
            policy,
        }
    }

    pub fn state(&self) -> &PollState {
        &self.state
    }

    /// Run one cycle, apply its outcome, and return the delay before the next.
    pub async fn run_once(&mut self) -> Duration {
        match self.cycle.poll().await {
            Ok(report) => {
                let delay = self.state.record_success(&self.policy);
                debug!(
                    notified = report.notified,
                    next_poll_secs = delay.as_secs(),
                    "poll cycle succeeded"
                );
                delay
            }
            Err(e) => {
                let delay = self.state.record_failure(&self.policy);
                warn!(
                    consecutive_failures = self.state.consecutive_failures(),
                    backoff_secs = delay.as_secs(),
                    error = %e,
                    "poll cycle failed; backing off"
                );
                delay
            }
        }
    }
}

impl<C: PollCycle + 'static> PollScheduler<C> {
    /// Start the loop on the runtime. The first cycle runs immediately.
    ///
    /// Shutdown is only observed while sleeping between cycles, so a cycle in
    /// progress always runs to completion.
    pub fn spawn(self) -> PollerHandle<C> {
        let shutdown = Arc::new(Notify::new());
        let signal = shutdown.clone();

        let join = tokio::spawn(async move {
            let mut scheduler = self;
            info!(
                poll_interval_secs = scheduler.policy.poll_interval.as_secs(),
                "poller started"
            );

            loop {
                let delay = scheduler.run_once().await;

                tokio::select! {
                    biased;
                    _ = signal.notified() => {
                        info!("poller received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }

            scheduler
        });

        PollerHandle { shutdown, join }
    }
}

/// Handle to a spawned [`PollScheduler`].
#[derive(Debug)]
pub struct PollerHandle<C> {
    shutdown: Arc<Notify>,
    join: JoinHandle<PollScheduler<C>>,
}

impl<C> PollerHandle<C> {
    /// Stop the loop after the current cycle (if any) and wait for it.
    /// Returns the scheduler's final state.
    pub async fn shutdown(self) -> Result<PollState, JoinError> {
        self.shutdown.notify_one();
        let scheduler = self.join.await?;
        info!("poller stopped");
        Ok(scheduler.state)
    }
}
