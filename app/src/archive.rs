//! Order archive: the never-deleted audit trail.
//!
//! The authoritative workflow state lives in the checkout store; every
//! applied transition is archived write-through here as a JSONB document
//! with indexed lookup columns (checkout-session id, payment-intent id,
//! customer email) for exact-match queries.
//!
//! An archive failure is logged and never propagated into a gateway
//! response, mirroring the best-effort session attach: the reconciler
//! can always find orders via gateway metadata.

use crate::types::{Order, OrderId};
use async_trait::async_trait;
use sqlx::Row;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// Archive failures.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// The database rejected the operation
    #[error("archive query failed: {0}")]
    Database(#[from] sqlx::Error),

    /// An archived document could not be (de)serialized
    #[error("archived order document is invalid: {0}")]
    Document(#[from] serde_json::Error),
}

/// Write-through archive of order records.
#[async_trait]
pub trait OrderArchive: Send + Sync {
    /// Upserts the order's current snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] when the write fails; callers log and
    /// continue.
    async fn record(&self, order: &Order) -> Result<(), ArchiveError>;

    /// Fetches an archived order by id.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] when the query fails.
    async fn find(&self, id: OrderId) -> Result<Option<Order>, ArchiveError>;

    /// Exact-match lookup by checkout session id.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] when the query fails.
    async fn find_by_session(&self, session_id: &str) -> Result<Option<Order>, ArchiveError>;

    /// Exact-match lookup by payment-intent id.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] when the query fails.
    async fn find_by_intent(&self, payment_intent_id: &str) -> Result<Option<Order>, ArchiveError>;

    /// All archived orders for a customer email, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] when the query fails.
    async fn find_by_email(&self, email: &str) -> Result<Vec<Order>, ArchiveError>;

    /// Liveness check for the readiness probe.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] when the archive is unreachable.
    async fn ping(&self) -> Result<(), ArchiveError>;
}

// ============================================================================
// Null archive
// ============================================================================

/// No-op archive for tests and storeless development.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullOrderArchive;

#[async_trait]
impl OrderArchive for NullOrderArchive {
    async fn record(&self, _order: &Order) -> Result<(), ArchiveError> {
        Ok(())
    }

    async fn find(&self, _id: OrderId) -> Result<Option<Order>, ArchiveError> {
        Ok(None)
    }

    async fn find_by_session(&self, _session_id: &str) -> Result<Option<Order>, ArchiveError> {
        Ok(None)
    }

    async fn find_by_intent(
        &self,
        _payment_intent_id: &str,
    ) -> Result<Option<Order>, ArchiveError> {
        Ok(None)
    }

    async fn find_by_email(&self, _email: &str) -> Result<Vec<Order>, ArchiveError> {
        Ok(Vec::new())
    }

    async fn ping(&self) -> Result<(), ArchiveError> {
        Ok(())
    }
}

// ============================================================================
// Postgres archive
// ============================================================================

/// Postgres-backed order archive.
///
/// Orders are stored as one JSONB document per record plus the indexed
/// columns used for exact-match lookups. Records are only ever upserted,
/// never deleted.
#[derive(Clone, Debug)]
pub struct PostgresOrderArchive {
    pool: PgPool,
}

impl PostgresOrderArchive {
    /// Connects to `database_url` and ensures the schema exists.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] when the connection or schema setup
    /// fails.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        connect_timeout: Duration,
    ) -> Result<Self, ArchiveError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(connect_timeout)
            .connect(database_url)
            .await?;

        let archive = Self { pool };
        archive.ensure_schema().await?;
        Ok(archive)
    }

    /// Wraps an existing pool (integration tests).
    #[must_use]
    pub const fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn ensure_schema(&self) -> Result<(), ArchiveError> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS orders (
                id UUID PRIMARY KEY,
                doc JSONB NOT NULL,
                checkout_session_id TEXT,
                payment_intent_id TEXT,
                customer_email TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        for statement in [
            "CREATE INDEX IF NOT EXISTS orders_session_idx ON orders (checkout_session_id)",
            "CREATE INDEX IF NOT EXISTS orders_intent_idx ON orders (payment_intent_id)",
            "CREATE INDEX IF NOT EXISTS orders_email_idx ON orders (customer_email)",
        ] {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        Ok(())
    }

    fn row_to_order(row: &sqlx::postgres::PgRow) -> Result<Order, ArchiveError> {
        let doc: serde_json::Value = row.try_get("doc")?;
        Ok(serde_json::from_value(doc)?)
    }
}

#[async_trait]
impl OrderArchive for PostgresOrderArchive {
    async fn record(&self, order: &Order) -> Result<(), ArchiveError> {
        let doc = serde_json::to_value(order)?;

        sqlx::query(
            r"
            INSERT INTO orders
                (id, doc, checkout_session_id, payment_intent_id, customer_email,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                doc = EXCLUDED.doc,
                checkout_session_id = EXCLUDED.checkout_session_id,
                payment_intent_id = EXCLUDED.payment_intent_id,
                updated_at = EXCLUDED.updated_at
            ",
        )
        .bind(order.id.as_uuid())
        .bind(doc)
        .bind(order.checkout_session_id.as_deref())
        .bind(order.payment_intent_id.as_deref())
        .bind(&order.customer.email)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(&self, id: OrderId) -> Result<Option<Order>, ArchiveError> {
        let row = sqlx::query("SELECT doc FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_order).transpose()
    }

    async fn find_by_session(&self, session_id: &str) -> Result<Option<Order>, ArchiveError> {
        let row = sqlx::query("SELECT doc FROM orders WHERE checkout_session_id = $1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_order).transpose()
    }

    async fn find_by_intent(&self, payment_intent_id: &str) -> Result<Option<Order>, ArchiveError> {
        let row = sqlx::query("SELECT doc FROM orders WHERE payment_intent_id = $1")
            .bind(payment_intent_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_order).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Vec<Order>, ArchiveError> {
        let rows =
            sqlx::query("SELECT doc FROM orders WHERE customer_email = $1 ORDER BY created_at DESC")
                .bind(email)
                .fetch_all(&self.pool)
                .await?;

        rows.iter().map(Self::row_to_order).collect()
    }

    async fn ping(&self) -> Result<(), ArchiveError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
