//! Top-level router assembly

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use crate::{config::CorsConfig, features, middleware};

/// Application router with every route and middleware layer
///
/// Feature routes are mounted under `/api/v1`; `/health` sits at the root.
pub fn create_router(state: features::FeatureState, cors: &CorsConfig) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", features::router(state))
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(cors))
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}
