//! Application setup and router configuration.

use std::sync::Arc;

use axum::{extract::Extension, routing::get, Router};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::kernel::{ApplicationHistory, PostgresApplicationHistory};
use crate::server::routes::{get_application, health_handler, list_applications};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub history: Arc<dyn ApplicationHistory>,
}

/// Build the Axum router serving the application-history API.
pub fn build_app(pool: PgPool) -> Router {
    let state = AppState {
        history: Arc::new(PostgresApplicationHistory::new(pool.clone())),
        db_pool: pool,
    };

    Router::new()
        .route("/health", get(health_handler))
        .route("/applications", get(list_applications))
        .route("/applications/:job_id", get(get_application))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
