//! Common test utilities and fixtures for integration tests.
//!
//! Database-backed tests require a PostgreSQL database (set DATABASE_URL).
//! Routes that reject a request before touching storage can run against
//! a lazy pool that never connects.

pub mod fixtures;

use std::sync::Arc;

use axum::Router;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use flashcards_backend::db::Database;
use flashcards_backend::{build_router, AppState};

/// Test context containing a database handle and the application router.
pub struct TestContext {
    pub db: Arc<Database>,
    app: Router,
}

impl TestContext {
    /// Create a new test context against DATABASE_URL.
    ///
    /// # Panics
    /// Panics if DATABASE_URL is not set or database connection fails.
    pub async fn new() -> Self {
        dotenvy::dotenv().ok();

        let database_url =
            std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests");

        let db = Database::connect(&database_url)
            .await
            .expect("Failed to connect to test database");

        db.run_migrations()
            .await
            .expect("Failed to run migrations");

        Self::with_database(db)
    }

    /// Create a context whose pool never connects.
    ///
    /// Any route that reaches the database will fail with a 500.
    pub fn offline() -> Self {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://flashcards@127.0.0.1:1/flashcards")
            .expect("lazy pool from a valid url");

        Self::with_database(Database::from_pool(pool))
    }

    fn with_database(db: Database) -> Self {
        let db = Arc::new(db);
        let app = build_router(AppState { db: db.clone() });
        Self { db, app }
    }

    /// Get the router for use with axum-test.
    pub fn router(&self) -> Router {
        self.app.clone()
    }

    /// A fresh account id that no other test uses.
    pub fn unique_account() -> String {
        format!("test-{}", Uuid::new_v4())
    }

    /// Remove all documents written for an account.
    pub async fn cleanup_account(&self, account_id: &str) {
        let _ = self.db.delete_account(account_id).await;
    }
}
