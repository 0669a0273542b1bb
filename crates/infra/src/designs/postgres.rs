//! Postgres-backed design lookup (`designs` table).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::instrument;

use designmail_core::DesignId;
use designmail_designs::Design;

use super::{DesignLookup, DesignLookupError};

#[derive(Debug, Clone)]
pub struct PostgresDesigns {
    pool: Arc<PgPool>,
}

#[derive(Debug)]
struct DesignRow {
    design_id: String,
    design: String,
    template: String,
    created_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for DesignRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(DesignRow {
            design_id: row.try_get("design_id")?,
            design: row.try_get("design")?,
            template: row.try_get("template")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl DesignRow {
    fn into_design(self) -> Result<Design, DesignLookupError> {
        let design_id =
            DesignId::new(self.design_id).map_err(|e| DesignLookupError::Storage(e.to_string()))?;
        Ok(Design {
            design_id,
            design: self.design,
            template: self.template,
            created_at: self.created_at,
        })
    }
}

impl PostgresDesigns {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Create the table if it does not exist yet.
    ///
    /// The submission flow owns writes; this only guarantees lookups do not
    /// fail on a fresh database.
    pub async fn ensure_schema(&self) -> Result<(), DesignLookupError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS designs (
                design_id  TEXT PRIMARY KEY,
                design     TEXT NOT NULL,
                template   TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&*self.pool)
        .await
        .map_err(|e| DesignLookupError::Storage(format!("ensure_schema: {e}")))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl DesignLookup for PostgresDesigns {
    #[instrument(skip(self), fields(design_id = %design_id))]
    async fn find(&self, design_id: &DesignId) -> Result<Option<Design>, DesignLookupError> {
        let row = sqlx::query(
            r#"
            SELECT design_id, design, template, created_at
            FROM designs
            WHERE design_id = $1
            "#,
        )
        .bind(design_id.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| DesignLookupError::Storage(format!("find: {e}")))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let row = <DesignRow as sqlx::FromRow<_>>::from_row(&row)
            .map_err(|e| DesignLookupError::Storage(format!("failed to deserialize design row: {e}")))?;
        row.into_design().map(Some)
    }
}
