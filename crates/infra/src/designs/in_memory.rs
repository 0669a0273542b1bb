//! In-memory design store for tests/dev.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use designmail_core::DesignId;
use designmail_designs::Design;

use super::{DesignLookup, DesignLookupError};

#[derive(Debug, Default)]
pub struct InMemoryDesigns {
    designs: RwLock<HashMap<DesignId, Design>>,
    lookups: AtomicUsize,
}

impl InMemoryDesigns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Store a design; ids are unique.
    pub fn insert(&self, design: Design) -> Result<(), DesignLookupError> {
        let mut designs = self.designs.write().unwrap_or_else(PoisonError::into_inner);
        if designs.contains_key(&design.design_id) {
            return Err(DesignLookupError::AlreadyExists(design.design_id));
        }
        designs.insert(design.design_id.clone(), design);
        Ok(())
    }

    /// Number of `find` calls served.
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl DesignLookup for InMemoryDesigns {
    async fn find(&self, design_id: &DesignId) -> Result<Option<Design>, DesignLookupError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .designs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(design_id)
            .cloned())
    }
}
