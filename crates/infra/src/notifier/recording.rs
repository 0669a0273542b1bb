//! In-memory mail transport for tests/dev: captures messages instead of sending them.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use super::{MailMessage, MailTransport, NotifyError};

type FailurePredicate = Box<dyn Fn(&MailMessage) -> bool + Send + Sync>;

#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<MailMessage>>,
    fail_when: Mutex<Option<(String, FailurePredicate)>>,
    attempts: AtomicUsize,
}

impl core::fmt::Debug for RecordingTransport {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RecordingTransport")
            .field("sent", &self.sent().len())
            .field("attempts", &self.attempts())
            .finish()
    }
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Reject every delivery with `reason`.
    pub fn fail_all(&self, reason: impl Into<String>) {
        self.fail_when(reason, |_| true);
    }

    /// Reject deliveries for which `predicate` holds.
    pub fn fail_when<F>(&self, reason: impl Into<String>, predicate: F)
    where
        F: Fn(&MailMessage) -> bool + Send + Sync + 'static,
    {
        *self.fail_when.lock().unwrap_or_else(PoisonError::into_inner) =
            Some((reason.into(), Box::new(predicate)));
    }

    pub fn recover(&self) {
        *self.fail_when.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Messages delivered successfully, in delivery order.
    pub fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Delivery attempts, failed ones included.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl MailTransport for RecordingTransport {
    async fn deliver(&self, message: &MailMessage) -> Result<(), NotifyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        {
            let fail_when = self.fail_when.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some((reason, predicate)) = fail_when.as_ref() {
                if predicate(message) {
                    return Err(NotifyError::DeliveryFailed(reason.clone()));
                }
            }
        }

        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.clone());
        Ok(())
    }
}
