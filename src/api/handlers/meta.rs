use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde_json::json;

use crate::api::response::{ApiError, JSend};
use crate::AppState;

/// Service banner at `/`.
pub async fn index(State(state): State<Arc<AppState>>) -> Json<JSend<serde_json::Value>> {
    JSend::success(json!({
        "message": "Media hosting API",
        "version": env!("CARGO_PKG_VERSION"),
        "links": format!("{}/i/<id>", state.config.base_url),
    }))
}

/// Liveness plus a store round trip. `store` reports whether a real backend
/// is configured; `ping_ms` is measured against it either way.
pub async fn health(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JSend<serde_json::Value>>, ApiError> {
    let stats = state.ledger.stats().await?;
    let store = if state.config.redis_url.is_some() {
        "redis"
    } else {
        "degraded"
    };
    Ok(JSend::success(json!({
        "store": store,
        "ping_ms": stats.ping_ms,
        "total_uploads": stats.total_uploads,
        "total_users": stats.total_users,
    })))
}

/// Public aggregate counters.
pub async fn stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JSend<crate::store::models::ServiceStats>>, ApiError> {
    Ok(JSend::success(state.ledger.stats().await?))
}
