//! Order notifications.
//!
//! [`Notifier`] is the seam the reconciliation loop calls. The production
//! notifier renders a [`MailMessage`] for the order and hands it to a
//! [`MailTransport`] (SMTP in production, an in-memory recorder in tests).

pub mod message;
pub mod recording;
pub mod smtp;

use std::sync::Arc;

use thiserror::Error;
use tracing::instrument;

use designmail_designs::DesignImage;
use designmail_orders::Order;

pub use message::{MailAttachment, MailMessage};
pub use recording::RecordingTransport;
pub use smtp::SmtpTransport;

#[derive(Debug, Error)]
pub enum NotifyError {
    /// The transport rejected or failed to deliver the message.
    #[error("delivery failed: {0}")]
    DeliveryFailed(String),

    /// The message could not be built (bad address, bad content type).
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

/// Sends the notification for one order.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, order: &Order, design: &DesignImage) -> Result<(), NotifyError>;
}

#[async_trait::async_trait]
impl<N> Notifier for Arc<N>
where
    N: Notifier + ?Sized,
{
    async fn send(&self, order: &Order, design: &DesignImage) -> Result<(), NotifyError> {
        (**self).send(order, design).await
    }
}

/// Outbound mail transport; reports success or failure synchronously.
#[async_trait::async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(&self, message: &MailMessage) -> Result<(), NotifyError>;
}

#[async_trait::async_trait]
impl<T> MailTransport for Arc<T>
where
    T: MailTransport + ?Sized,
{
    async fn deliver(&self, message: &MailMessage) -> Result<(), NotifyError> {
        (**self).deliver(message).await
    }
}

/// Notifier that emails a fixed recipient.
#[derive(Debug, Clone)]
pub struct MailNotifier<T> {
    transport: T,
    from: String,
    to: String,
}

impl<T: MailTransport> MailNotifier<T> {
    pub fn new(transport: T, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            transport,
            from: from.into(),
            to: to.into(),
        }
    }
}

#[async_trait::async_trait]
impl<T: MailTransport> Notifier for MailNotifier<T> {
    #[instrument(
        skip(self, order, design),
        fields(order_number = %order.order_number, design_id = %design.design_id)
    )]
    async fn send(&self, order: &Order, design: &DesignImage) -> Result<(), NotifyError> {
        let message = MailMessage::for_order(&self.from, &self.to, order, design);
        self.transport.deliver(&message).await
    }
}
