use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::AppState;

use super::response::ApiError;

/// The authenticated web user id, resolved from `Authorization: Bearer`.
///
/// Two credential kinds share the header: opaque session tokens issued at
/// login, and `pe_`-prefixed API keys. Either resolves to the same user id,
/// so uploads and limits attribute identically regardless of front end.
pub struct AuthedUser(pub String);

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for AuthedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, ApiError> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

        let user_id = if token.starts_with("pe_") {
            state.api_keys.verify(token).await?
        } else {
            state.users.session_user(token).await?
        };

        user_id
            .map(AuthedUser)
            .ok_or_else(|| ApiError::unauthorized("Invalid or expired credentials"))
    }
}

/// Best-effort client address for per-IP rate limiting, preferring the
/// proxy-provided header the way the deployment terminates TLS.
pub fn client_ip(parts: &axum::http::HeaderMap) -> String {
    parts
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "anonymous".to_string())
}
