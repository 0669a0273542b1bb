use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use designmail_core::{DesignId, OrderId};

/// Customization label whose value carries the design identifier.
pub const DESIGN_REFERENCE_LABEL: &str = "Text";

/// Fulfillment status reported by the order source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FulfillmentStatus {
    Pending,
    Fulfilled,
    Canceled,
    /// Any status this system does not know about.
    #[serde(other)]
    Unknown,
}

impl core::fmt::Display for FulfillmentStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            FulfillmentStatus::Pending => "PENDING",
            FulfillmentStatus::Fulfilled => "FULFILLED",
            FulfillmentStatus::Canceled => "CANCELED",
            FulfillmentStatus::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// Buyer-supplied customization on a line item (label/value pair).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customization {
    pub label: String,
    pub value: String,
}

/// Order line as delivered by the order source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[serde(default)]
    pub sku: Option<String>,
    pub quantity: u32,
    /// The source sends `null` when a product has no customization form.
    #[serde(default)]
    pub customizations: Option<Vec<Customization>>,
}

impl LineItem {
    pub fn new(sku: impl Into<String>, quantity: u32) -> Self {
        Self {
            sku: Some(sku.into()),
            quantity,
            customizations: None,
        }
    }

    pub fn with_customization(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.customizations
            .get_or_insert_with(Vec::new)
            .push(Customization {
                label: label.into(),
                value: value.into(),
            });
        self
    }

    pub fn customizations(&self) -> &[Customization] {
        self.customizations.as_deref().unwrap_or_default()
    }

    /// Value of the first customization carrying `label`, if any.
    pub fn customization(&self, label: &str) -> Option<&str> {
        self.customizations()
            .iter()
            .find(|c| c.label == label)
            .map(|c| c.value.as_str())
    }
}

/// An order owned by the external order source.
///
/// Immutable from this system's point of view: it is only ever read, matched
/// against a stored design, and reported in a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    pub fulfillment_status: FulfillmentStatus,
    pub modified_on: DateTime<Utc>,
}

impl Order {
    pub fn new(id: OrderId, order_number: impl Into<String>, modified_on: DateTime<Utc>) -> Self {
        Self {
            id,
            order_number: order_number.into(),
            customer_email: None,
            line_items: Vec::new(),
            fulfillment_status: FulfillmentStatus::Pending,
            modified_on,
        }
    }

    pub fn with_customer_email(mut self, email: impl Into<String>) -> Self {
        self.customer_email = Some(email.into());
        self
    }

    pub fn with_line_item(mut self, item: LineItem) -> Self {
        self.line_items.push(item);
        self
    }

    pub fn with_status(mut self, status: FulfillmentStatus) -> Self {
        self.fulfillment_status = status;
        self
    }

    /// Design referenced by this order.
    ///
    /// Only the first line item is inspected; its first customization labelled
    /// [`DESIGN_REFERENCE_LABEL`] carries the design identifier. An empty value
    /// counts as no reference.
    pub fn design_reference(&self) -> Option<DesignId> {
        let value = self
            .line_items
            .first()?
            .customization(DESIGN_REFERENCE_LABEL)?;
        DesignId::new(value).ok()
    }

    /// Whether the modification timestamp falls in the half-open window `[start, end)`.
    pub fn modified_within(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.modified_on >= start && self.modified_on < end
    }
}
