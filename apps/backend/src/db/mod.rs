//! PostgreSQL database operations

use sqlx::{postgres::PgPoolOptions, types::Json, PgPool};

use crate::error::{ApiError, Result};
use crate::models::*;

/// Database wrapper with connection pool
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to PostgreSQL and create connection pool
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| ApiError::Migration(e.to_string()))?;
        Ok(())
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // === Document Repository ===

    /// Load every stored document for an account as one snapshot
    pub async fn get_snapshot(&self, account_id: &str) -> Result<Snapshot> {
        let documents = sqlx::query_as::<_, DbDocument>(
            r#"
            SELECT account_id, kind, body, updated_at
            FROM documents
            WHERE account_id = $1
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        snapshot_from_documents(documents)
    }

    /// Replace one collection document
    pub async fn put_document(&self, account_id: &str, collection: &Collection) -> Result<()> {
        upsert_document(&self.pool, account_id, collection).await
    }

    /// Replace all three collection documents atomically
    pub async fn put_snapshot(&self, account_id: &str, snapshot: &Snapshot) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for kind in CollectionKind::ALL {
            upsert_document(&mut *tx, account_id, &snapshot.collection(kind)).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Remove all documents for an account, returning how many were deleted
    pub async fn delete_account(&self, account_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM documents WHERE account_id = $1")
            .bind(account_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

async fn upsert_document<'e, E>(executor: E, account_id: &str, collection: &Collection) -> Result<()>
where
    E: sqlx::PgExecutor<'e>,
{
    let body = serde_json::to_value(collection).map_err(|e| ApiError::Internal(e.to_string()))?;

    sqlx::query(
        r#"
        INSERT INTO documents (account_id, kind, body, updated_at)
        VALUES ($1, $2, $3, NOW())
        ON CONFLICT (account_id, kind)
        DO UPDATE SET body = EXCLUDED.body, updated_at = NOW()
        "#,
    )
    .bind(account_id)
    .bind(collection.kind().as_str())
    .bind(Json(body))
    .execute(executor)
    .await?;

    Ok(())
}
