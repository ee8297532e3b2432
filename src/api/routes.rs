use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::bot::webhook;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.max_upload_size as usize;

    Router::new()
        // Meta
        .route("/", get(handlers::index))
        .route("/api/v1/stats", get(handlers::stats))
        // Accounts and sessions
        .route("/api/auth/register", post(handlers::register))
        .route("/api/auth/login", post(handlers::login))
        .route("/api/auth/logout", post(handlers::logout))
        // Telegram account linking
        .route(
            "/api/auth/link",
            get(handlers::link_status)
                .post(handlers::link_telegram)
                .delete(handlers::unlink_telegram),
        )
        // Account resources
        .route(
            "/api/user/apikey",
            get(handlers::get_api_key).post(handlers::rotate_api_key),
        )
        .route("/api/user/uploads", get(handlers::user_uploads))
        // Uploads
        .route(
            "/api/v1/upload",
            post(handlers::upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/v1/info/:id", get(handlers::info))
        .route("/api/v1/delete/:id", delete(handlers::delete_image))
        // Public media links
        .route("/i/:id", get(handlers::serve_media))
        // Bot webhook
        .route("/api/webhook/telegram", post(webhook::telegram_webhook))
        // Internal
        .route("/_internal/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
