use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::api::auth::{client_ip, AuthedUser};
use crate::api::response::{ApiError, JSend, JSendStatus};
use crate::bot::BotClient;
use crate::store::generate_id;
use crate::store::models::{MediaMetadata, NewImage, RateLimitDecision, UploadSource};
use crate::AppState;

/// Anonymous metadata lookups per client IP per minute.
const INFO_RATE_LIMIT: u64 = 60;
/// Authenticated web uploads per user per minute.
const UPLOAD_RATE_LIMIT: u64 = 20;
const RATE_WINDOW_SECS: u64 = 60;

fn rate_limited(decision: &RateLimitDecision) -> Response {
    let body = Json(json!({
        "status": JSendStatus::Fail,
        "data": { "message": "Rate limit exceeded, slow down" },
    }));
    (
        StatusCode::TOO_MANY_REQUESTS,
        [
            ("x-ratelimit-limit", decision.limit.to_string()),
            ("x-ratelimit-remaining", decision.remaining.to_string()),
        ],
        body,
    )
        .into_response()
}

fn record_body(state: &AppState, record: &crate::store::models::ImageRecord) -> serde_json::Value {
    json!({
        "id": record.id,
        "url": state.config.public_link(&record.id),
        "direct_url": state
            .config
            .direct_link(&record.id, extension_for(&record.metadata.mime_type)),
        "views": record.views,
        "created_at": record.created_at,
        "metadata": record.metadata,
    })
}

/// Public metadata lookup. Counts as a view, same as fetching the media.
pub async fn info(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let ip = client_ip(&headers);
    let decision = state
        .rate_limiter
        .check(&format!("info:{ip}"), INFO_RATE_LIMIT, RATE_WINDOW_SECS)
        .await?;
    if !decision.allowed {
        return Ok(rate_limited(&decision));
    }

    let record = state
        .ledger
        .fetch_and_count(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("No upload with that id"))?;
    Ok(JSend::success(record_body(&state, &record)).into_response())
}

/// Delete an upload the requester owns. Ownership is judged against the
/// requester's recent-upload list, so very old uploads that have rotated out
/// of it can no longer be deleted through the API.
pub async fn delete_image(
    State(state): State<Arc<AppState>>,
    AuthedUser(user_id): AuthedUser,
    Path(id): Path<String>,
) -> Result<Json<JSend<serde_json::Value>>, ApiError> {
    if !state.ledger.id_exists(&id).await? {
        return Err(ApiError::not_found("No upload with that id"));
    }
    if !state.ledger.user_owns(&user_id, &id).await? {
        return Err(ApiError::forbidden("You do not own that upload"));
    }

    state.ledger.delete_image(&id).await?;
    tracing::info!(id, user_id = %user_id, "upload deleted");
    Ok(JSend::success(json!({ "deleted": true })))
}

/// Multipart web upload: the file lands in the Telegram storage channel and
/// the returned link serves it back out.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    AuthedUser(user_id): AuthedUser,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let Some(bot) = &state.bot else {
        return Err(ApiError::unavailable(
            "Uploads are disabled: no storage backend configured",
        ));
    };

    let decision = state
        .rate_limiter
        .check(
            &format!("upload:{user_id}"),
            UPLOAD_RATE_LIMIT,
            RATE_WINDOW_SECS,
        )
        .await?;
    if !decision.allowed {
        return Ok(rate_limited(&decision));
    }

    let mut file: Option<(Vec<u8>, String, String)> = None;
    let mut requested_id: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field
                    .file_name()
                    .unwrap_or("upload.bin")
                    .to_string();
                let mime_type = field
                    .content_type()
                    .map(str::to_string)
                    .unwrap_or_else(|| {
                        mime_guess::from_path(&filename)
                            .first_or_octet_stream()
                            .to_string()
                    });
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read file: {e}")))?;
                file = Some((data.to_vec(), filename, mime_type));
            }
            Some("id") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Invalid id field: {e}")))?;
                let value = value.trim().to_string();
                if !value.is_empty() {
                    requested_id = Some(value);
                }
            }
            _ => {}
        }
    }

    let (data, filename, mime_type) =
        file.ok_or_else(|| ApiError::bad_request("Missing `file` field"))?;

    if data.is_empty() {
        return Err(ApiError::bad_request("Uploaded file is empty"));
    }
    if data.len() as u64 > state.config.max_upload_size {
        return Err(ApiError::payload_too_large(format!(
            "File exceeds the {}MB limit",
            state.config.max_upload_size / (1024 * 1024)
        )));
    }
    if !(mime_type.starts_with("image/") || mime_type.starts_with("video/")) {
        return Err(ApiError::bad_request(
            "Only image and video uploads are accepted",
        ));
    }

    let id = match requested_id {
        Some(candidate) => {
            if !candidate
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
            {
                return Err(ApiError::bad_request(
                    "Custom ids may only contain a-z, 0-9 and -",
                ));
            }
            if state.ledger.id_exists(&candidate).await? {
                let suggestions = state.ledger.suggest_ids(&candidate).await?;
                let body = Json(json!({
                    "status": JSendStatus::Fail,
                    "data": {
                        "message": format!("The id `{candidate}` is already taken"),
                        "suggestions": suggestions,
                    },
                }));
                return Ok((StatusCode::CONFLICT, body).into_response());
            }
            candidate
        }
        None => generate_id(),
    };

    let size = data.len() as u64;
    let telegram_file_id = store_bytes(bot, data, &filename, &mime_type).await?;

    let record = NewImage {
        id: id.clone(),
        telegram_file_id,
        created_at: chrono::Utc::now().timestamp_millis(),
        metadata: MediaMetadata {
            size,
            mime_type: mime_type.clone(),
        },
    };
    state
        .ledger
        .save_image(&record, UploadSource::Web, Some(&user_id))
        .await?;

    tracing::info!(id, user_id = %user_id, size, "web upload stored");
    bot.send_log(&format!(
        "web upload {} by {user_id}",
        state.config.public_link(&id)
    ))
    .await;

    Ok(JSend::success(json!({
        "id": id,
        "url": state.config.public_link(&id),
        "direct_url": state.config.direct_link(&id, extension_for(&mime_type)),
        "size": size,
        "type": mime_type,
    }))
    .into_response())
}

async fn store_bytes(
    bot: &BotClient,
    data: Vec<u8>,
    filename: &str,
    mime_type: &str,
) -> Result<String, ApiError> {
    bot.upload_document(data, filename, mime_type)
        .await
        .map_err(upload_error)
}

/// A missing storage channel is a configuration state, answered like the
/// no-bot case; anything else is a genuine storage failure.
fn upload_error(e: crate::bot::BotError) -> ApiError {
    match e {
        crate::bot::BotError::NoStorageChannel => {
            ApiError::unavailable("Uploads are disabled: no storage channel configured")
        }
        e => {
            tracing::error!(error = %e, "storage channel upload failed");
            ApiError::internal("failed to store the upload")
        }
    }
}

/// Serve the media bytes at `/i/:id`. An extension suffix is accepted and
/// ignored; the stored MIME type wins.
pub async fn serve_media(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Result<Response, ApiError> {
    let id = raw_id.split('.').next().unwrap_or(&raw_id);

    let record = state
        .ledger
        .fetch_and_count(id)
        .await?
        .ok_or_else(|| ApiError::not_found("No upload with that id"))?;

    let Some(bot) = &state.bot else {
        return Err(ApiError::unavailable(
            "Media serving is disabled: no storage backend configured",
        ));
    };

    let bytes = bot.download_file(&record.telegram_file_id).await.map_err(|e| {
        tracing::error!(error = %e, id, "media download failed");
        ApiError::internal("failed to fetch the media")
    })?;

    let content_type = if record.metadata.mime_type.is_empty() {
        "application/octet-stream".to_string()
    } else {
        record.metadata.mime_type.clone()
    };

    Ok((
        [
            (CONTENT_TYPE, content_type),
            // Records are immutable apart from view counts, so clients may
            // cache the bytes indefinitely.
            (CACHE_CONTROL, "public, max-age=31536000, immutable".to_string()),
        ],
        bytes,
    )
        .into_response())
}

fn extension_for(mime_type: &str) -> &str {
    match mime_type {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        other => mime_guess::get_mime_extensions_str(other)
            .and_then(|exts| exts.first())
            .copied()
            .unwrap_or("bin"),
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::api::response::ApiError;
    use crate::bot::BotError;

    use super::upload_error;

    #[test]
    fn missing_storage_channel_answers_unavailable() {
        match upload_error(BotError::NoStorageChannel) {
            ApiError::Fail(code, _) => assert_eq!(code, StatusCode::SERVICE_UNAVAILABLE),
            other => panic!("expected a fail response, got {other:?}"),
        }
    }

    #[test]
    fn transport_failures_answer_internal_error() {
        match upload_error(BotError::Api("sendDocument failed".to_string())) {
            ApiError::Error(code, _) => assert_eq!(code, StatusCode::INTERNAL_SERVER_ERROR),
            other => panic!("expected a server error, got {other:?}"),
        }
    }
}
