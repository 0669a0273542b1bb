//! Design lookup boundary.
//!
//! Designs are written by the upstream submission flow; the reconciliation
//! loop only reads them by id.

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use thiserror::Error;

use designmail_core::DesignId;
use designmail_designs::Design;

pub use in_memory::InMemoryDesigns;
pub use postgres::PostgresDesigns;

#[derive(Debug, Error)]
pub enum DesignLookupError {
    #[error("design already exists: {0}")]
    AlreadyExists(DesignId),

    #[error("design storage error: {0}")]
    Storage(String),
}

/// Read access to stored designs. `Ok(None)` means not found.
#[async_trait::async_trait]
pub trait DesignLookup: Send + Sync {
    async fn find(&self, design_id: &DesignId) -> Result<Option<Design>, DesignLookupError>;
}

#[async_trait::async_trait]
impl<D> DesignLookup for Arc<D>
where
    D: DesignLookup + ?Sized,
{
    async fn find(&self, design_id: &DesignId) -> Result<Option<Design>, DesignLookupError> {
        (**self).find(design_id).await
    }
}
