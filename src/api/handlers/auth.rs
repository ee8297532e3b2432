use std::sync::Arc;

use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::api::response::{ApiError, AppJson, JSend};
use crate::store::UserError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

const MIN_PASSWORD_LEN: usize = 8;

pub async fn register(
    State(state): State<Arc<AppState>>,
    AppJson(body): AppJson<RegisterRequest>,
) -> Result<Json<JSend<serde_json::Value>>, ApiError> {
    if body.email.trim().is_empty() || !body.email.contains('@') {
        return Err(ApiError::bad_request("A valid email is required"));
    }
    if body.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let record = state
        .users
        .register(&body.email, &body.password, body.name.as_deref())
        .await
        .map_err(map_user_error)?;

    tracing::info!(user_id = %record.id, "user registered");
    Ok(JSend::success(json!({
        "id": record.id,
        "email": record.email,
        "name": record.name,
    })))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    AppJson(body): AppJson<LoginRequest>,
) -> Result<Json<JSend<serde_json::Value>>, ApiError> {
    let record = state
        .users
        .verify_credentials(&body.email, &body.password)
        .await
        .map_err(map_user_error)?
        .ok_or_else(|| ApiError::unauthorized("Invalid email or password"))?;

    let token = state.users.create_session(&record.id).await?;
    Ok(JSend::success(json!({
        "token": token,
        "user": {
            "id": record.id,
            "email": record.email,
            "name": record.name,
        },
    })))
}

/// Destroys the presented session token. API keys are not sessions and cannot
/// be logged out; rotating the key is the only way to revoke one.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<JSend<serde_json::Value>>, ApiError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if token.starts_with("pe_") {
        return Err(ApiError::bad_request("API keys cannot be logged out"));
    }

    let removed = state.users.destroy_session(token).await?;
    Ok(JSend::success(json!({ "logged_out": removed })))
}

fn map_user_error(e: UserError) -> ApiError {
    match e {
        UserError::AlreadyExists => ApiError::conflict("An account with that email already exists"),
        UserError::Hash(detail) => {
            tracing::error!(error = %detail, "password hashing failed");
            ApiError::internal("could not process credentials")
        }
        UserError::Store(e) => e.into(),
    }
}
