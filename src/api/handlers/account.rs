use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::api::auth::AuthedUser;
use crate::api::response::{ApiError, AppJson, JSend};
use crate::AppState;

/// Current Telegram link state for the signed-in user.
pub async fn link_status(
    State(state): State<Arc<AppState>>,
    AuthedUser(user_id): AuthedUser,
) -> Result<Json<JSend<serde_json::Value>>, ApiError> {
    let telegram_id = state.linking.linked_telegram(&user_id).await?;
    Ok(JSend::success(json!({
        "linked": telegram_id.is_some(),
        "telegram_id": telegram_id,
    })))
}

#[derive(Debug, Deserialize)]
pub struct LinkRequest {
    pub token: String,
}

/// Redeem a bot-issued link token and connect the two identities. The token
/// is consumed even when it turns out to be expired; the user just asks the
/// bot for a fresh one.
pub async fn link_telegram(
    State(state): State<Arc<AppState>>,
    AuthedUser(user_id): AuthedUser,
    AppJson(body): AppJson<LinkRequest>,
) -> Result<Json<JSend<serde_json::Value>>, ApiError> {
    let telegram_id = state
        .linking
        .redeem_link_token(body.token.trim())
        .await?
        .ok_or_else(|| ApiError::bad_request("Invalid or expired link token"))?;

    state.linking.link_accounts(telegram_id, &user_id).await?;
    tracing::info!(user_id = %user_id, telegram_id, "accounts linked");
    Ok(JSend::success(json!({ "telegram_id": telegram_id })))
}

/// Drop the link from the web side.
pub async fn unlink_telegram(
    State(state): State<Arc<AppState>>,
    AuthedUser(user_id): AuthedUser,
) -> Result<Json<JSend<serde_json::Value>>, ApiError> {
    let removed = match state.linking.linked_telegram(&user_id).await? {
        Some(telegram_id) => state.linking.unlink(telegram_id).await?,
        None => false,
    };
    Ok(JSend::success(json!({ "unlinked": removed })))
}

pub async fn get_api_key(
    State(state): State<Arc<AppState>>,
    AuthedUser(user_id): AuthedUser,
) -> Result<Json<JSend<serde_json::Value>>, ApiError> {
    let key = state.api_keys.user_key(&user_id).await?;
    Ok(JSend::success(json!({ "key": key })))
}

/// Issue a key, replacing the reverse mapping. See `ApiKeyService::create`
/// for what rotation does and does not revoke.
pub async fn rotate_api_key(
    State(state): State<Arc<AppState>>,
    AuthedUser(user_id): AuthedUser,
) -> Result<Json<JSend<serde_json::Value>>, ApiError> {
    let key = state.api_keys.create(&user_id).await?;
    tracing::info!(user_id = %user_id, "api key issued");
    Ok(JSend::success(json!({ "key": key })))
}

/// The signed-in user's recent uploads, most recent first.
pub async fn user_uploads(
    State(state): State<Arc<AppState>>,
    AuthedUser(user_id): AuthedUser,
) -> Result<Json<JSend<serde_json::Value>>, ApiError> {
    let records = state.ledger.user_uploads(&user_id).await?;
    let uploads: Vec<_> = records
        .iter()
        .map(|r| {
            json!({
                "id": r.id,
                "url": state.config.public_link(&r.id),
                "views": r.views,
                "created_at": r.created_at,
                "metadata": r.metadata,
            })
        })
        .collect();
    Ok(JSend::success(json!({ "uploads": uploads })))
}
