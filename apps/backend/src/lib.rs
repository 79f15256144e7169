pub mod db;
pub mod error;
pub mod models;
pub mod routes;

use std::sync::Arc;

use anyhow::Context;
use axum::{
    routing::{delete, get, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::db::Database;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
}

/// Build the full router around the given state.
pub fn build_router(state: AppState) -> Router {
    let account_routes = Router::new()
        .route(
            "/api/accounts/:account/snapshot",
            get(routes::accounts::get_snapshot).put(routes::accounts::put_snapshot),
        )
        .route(
            "/api/accounts/:account/:kind",
            put(routes::accounts::put_collection),
        )
        .route(
            "/api/accounts/:account",
            delete(routes::accounts::delete_account),
        );

    Router::new()
        .route("/health", get(health_check))
        .merge(account_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    tracing::info!("Connecting to database...");
    let db = Database::connect(&database_url).await?;

    tracing::info!("Running migrations...");
    db.run_migrations().await?;

    let app = build_router(AppState { db: Arc::new(db) });

    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("{}:{}", host, port);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}
