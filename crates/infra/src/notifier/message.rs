//! Notification message rendering.

use designmail_designs::DesignImage;
use designmail_orders::Order;

/// Binary attachment carried by a [`MailMessage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailAttachment {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Transport-neutral mail message: one HTML body, one attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
    pub attachment: MailAttachment,
}

impl MailMessage {
    /// Notification for a completed order, with the design attached.
    pub fn for_order(from: &str, to: &str, order: &Order, design: &DesignImage) -> Self {
        let items = order
            .line_items
            .iter()
            .map(|item| {
                format!(
                    "{} (Qty: {})",
                    escape_html(item.sku.as_deref().unwrap_or("no SKU")),
                    item.quantity
                )
            })
            .collect::<Vec<_>>()
            .join(", ");

        let html = format!(
            "<p>Order {number} completed.</p>\n\
             <p>Customer Email: {email}</p>\n\
             <p>Items: {items}</p>\n\
             <p>Fulfillment Status: {status}</p>\n\
             <p>See attached design image.</p>\n",
            number = escape_html(&order.order_number),
            email = escape_html(order.customer_email.as_deref().unwrap_or("n/a")),
            items = items,
            status = order.fulfillment_status,
        );

        Self {
            from: from.to_string(),
            to: to.to_string(),
            subject: format!("New Order Image Received - Order ID: {}", order.order_number),
            html,
            attachment: MailAttachment {
                filename: design.filename(),
                content_type: design.content_type.clone(),
                bytes: design.bytes.clone(),
            },
        }
    }
}

/// Escape text for inclusion in an HTML body.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
