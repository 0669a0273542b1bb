//! SMTP transport (STARTTLS relay with username/password auth).

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use super::{MailMessage, MailTransport, NotifyError};
use crate::config::MailConfig;

pub struct SmtpTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl core::fmt::Debug for SmtpTransport {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SmtpTransport").finish_non_exhaustive()
    }
}

impl SmtpTransport {
    /// Build a pooled transport. No connection is made until the first send.
    pub fn new(config: &MailConfig) -> Result<Self, NotifyError> {
        let credentials = Credentials::new(config.username.clone(), config.password.clone());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| NotifyError::InvalidMessage(format!("smtp relay {}: {e}", config.host)))?
            .port(config.port)
            .credentials(credentials)
            .build();
        Ok(Self { mailer })
    }
}

#[async_trait::async_trait]
impl MailTransport for SmtpTransport {
    async fn deliver(&self, message: &MailMessage) -> Result<(), NotifyError> {
        let email = build_email(message)?;
        let response = self
            .mailer
            .send(email)
            .await
            .map_err(|e| NotifyError::DeliveryFailed(e.to_string()))?;
        debug!(code = %response.code(), "smtp relay accepted message");
        Ok(())
    }
}

/// Convert a [`MailMessage`] into a MIME `multipart/mixed` message.
pub(crate) fn build_email(message: &MailMessage) -> Result<Message, NotifyError> {
    let from: Mailbox = message
        .from
        .parse()
        .map_err(|e| NotifyError::InvalidMessage(format!("from address {:?}: {e}", message.from)))?;
    let to: Mailbox = message
        .to
        .parse()
        .map_err(|e| NotifyError::InvalidMessage(format!("to address {:?}: {e}", message.to)))?;
    let content_type = ContentType::parse(&message.attachment.content_type).map_err(|e| {
        NotifyError::InvalidMessage(format!(
            "attachment content type {:?}: {e}",
            message.attachment.content_type
        ))
    })?;

    let attachment = Attachment::new(message.attachment.filename.clone())
        .body(message.attachment.bytes.clone(), content_type);

    Message::builder()
        .from(from)
        .to(to)
        .subject(message.subject.clone())
        .multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::html(message.html.clone()))
                .singlepart(attachment),
        )
        .map_err(|e| NotifyError::InvalidMessage(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::MailAttachment;

    fn message() -> MailMessage {
        MailMessage {
            from: "Shop <shop@example.com>".to_string(),
            to: "studio@example.com".to_string(),
            subject: "New Order Image Received - Order ID: 1001".to_string(),
            html: "<p>Order 1001 completed.</p>".to_string(),
            attachment: MailAttachment {
                filename: "design-abc123.png".to_string(),
                content_type: "image/png".to_string(),
                bytes: vec![0x89, b'P', b'N', b'G'],
            },
        }
    }

    #[test]
    fn builds_multipart_message_with_attachment() {
        let email = build_email(&message()).unwrap();
        let raw = String::from_utf8_lossy(&email.formatted()).to_string();

        assert!(raw.contains("Subject: New Order Image Received - Order ID: 1001"));
        assert!(raw.contains("multipart/mixed"));
        assert!(raw.contains("text/html"));
        assert!(raw.contains("design-abc123.png"));
        assert!(raw.contains("image/png"));
    }

    #[test]
    fn rejects_bad_addresses() {
        let mut msg = message();
        msg.to = "not an address".to_string();
        assert!(matches!(build_email(&msg), Err(NotifyError::InvalidMessage(_))));
    }

    #[test]
    fn rejects_bad_content_type() {
        let mut msg = message();
        msg.attachment.content_type = "no slash".to_string();
        assert!(matches!(build_email(&msg), Err(NotifyError::InvalidMessage(_))));
    }
}
