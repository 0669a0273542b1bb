//! Postgres-backed processed-order ledger.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | LedgerError |
//! |------------|----------------------|-------------|
//! | Database (unique violation) | `23505` | `DuplicateKey` |
//! | Database (other) | any other | `Storage` |
//! | PoolClosed / network / other | N/A | `Storage` |

use std::sync::Arc;

use chrono::Utc;
use sqlx::{PgPool, Row};
use tracing::instrument;

use designmail_core::OrderId;

use super::{LedgerError, ProcessedOrderLedger};

/// Ledger stored in the `processed_orders` table; `order_id` is the primary key.
#[derive(Debug, Clone)]
pub struct PostgresLedger {
    pool: Arc<PgPool>,
}

impl PostgresLedger {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Create the table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), LedgerError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS processed_orders (
                order_id     TEXT PRIMARY KEY,
                processed_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ProcessedOrderLedger for PostgresLedger {
    #[instrument(skip(self), fields(order_id = %order_id))]
    async fn exists(&self, order_id: &OrderId) -> Result<bool, LedgerError> {
        let row = sqlx::query(
            "SELECT EXISTS (SELECT 1 FROM processed_orders WHERE order_id = $1) AS present",
        )
        .bind(order_id.as_str())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("exists", e))?;

        row.try_get::<bool, _>("present")
            .map_err(|e| map_sqlx_error("exists", e))
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    async fn record(&self, order_id: &OrderId) -> Result<(), LedgerError> {
        sqlx::query(
            r#"
            INSERT INTO processed_orders (order_id, processed_at)
            VALUES ($1, $2)
            "#,
        )
        .bind(order_id.as_str())
        .bind(Utc::now())
        .execute(&*self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                LedgerError::DuplicateKey(order_id.clone())
            } else {
                map_sqlx_error("record", e)
            }
        })?;
        Ok(())
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> LedgerError {
    match err {
        sqlx::Error::Database(db_err) => LedgerError::Storage(format!(
            "database error in {}: {}",
            operation,
            db_err.message()
        )),
        sqlx::Error::PoolClosed => {
            LedgerError::Storage(format!("connection pool closed in {}", operation))
        }
        _ => LedgerError::Storage(format!("sqlx error in {}: {}", operation, err)),
    }
}

/// Check if an error is a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23505";
        }
    }
    false
}
