use std::sync::Arc;

use axum::extract::{Json, State};
use thiserror::Error;
use tracing::{info, warn};

use crate::store::linking::LINK_TOKEN_TTL_SECS;
use crate::store::models::{MediaMetadata, NewImage, UploadSource};
use crate::store::generate_id;
use crate::{kv::KvError, AppState};

use super::client::{BotClient, BotError, MediaKind};
use super::update::{CallbackQuery, Message, Update, User};

#[derive(Debug, Error)]
enum WebhookError {
    #[error(transparent)]
    Store(#[from] KvError),
    #[error(transparent)]
    Bot(#[from] BotError),
}

/// Webhook entry point. Always answers 200: Telegram retries non-2xx
/// deliveries, and a poisoned update would otherwise be redelivered forever.
/// Failures are logged and the update dropped.
pub async fn telegram_webhook(
    State(state): State<Arc<AppState>>,
    update: Option<Json<Update>>,
) -> &'static str {
    let Some(Json(update)) = update else {
        warn!("discarding malformed webhook payload");
        return "OK";
    };

    if let Err(e) = handle_update(&state, update).await {
        warn!(error = %e, "failed to process telegram update");
        if let Some(bot) = &state.bot {
            bot.send_log(&format!("update processing failed: {e}")).await;
        }
    }
    "OK"
}

async fn handle_update(state: &Arc<AppState>, update: Update) -> Result<(), WebhookError> {
    // Without a bot token the webhook route still exists but does nothing.
    let Some(bot) = &state.bot else {
        return Ok(());
    };

    if let Some(callback) = update.callback_query {
        return handle_callback(state, bot, callback).await;
    }

    if let Some(message) = update.message {
        let Some(from) = &message.from else {
            // Channel posts and service messages carry no sender.
            return Ok(());
        };

        if let Some(text) = message.text.clone() {
            if text.starts_with('/') {
                return handle_command(state, bot, &message, from, &text).await;
            }
            if message.chat.is_private() {
                bot.send_message(
                    message.chat.id,
                    "Send me a photo, GIF or video and I'll host it for you.\n\
                     Use /help to see every command.",
                    None,
                )
                .await?;
            }
            return Ok(());
        }

        // Bare media in a private chat uploads directly.
        if message.chat.is_private() {
            if let Some(media) = extract_media(&message) {
                return process_file(state, bot, message.chat.id, from, media).await;
            }
        }
    }

    Ok(())
}

async fn handle_command(
    state: &Arc<AppState>,
    bot: &BotClient,
    message: &Message,
    from: &User,
    text: &str,
) -> Result<(), WebhookError> {
    let command = text
        .split_whitespace()
        .next()
        .unwrap_or("")
        .split('@')
        .next()
        .unwrap_or("");
    let chat_id = message.chat.id;

    match command {
        "/start" => {
            state.ledger.register_user(&from.id.to_string()).await?;
            info!(telegram_id = from.id, "bot user started");
            bot.send_message(
                chat_id,
                &format!(
                    "Hi {}! Send me a photo, GIF or video and I'll reply with a \
                     shareable link.\n\nUse /login to connect your web account so \
                     uploads show up in your dashboard.",
                    from.first_name
                ),
                Some(serde_json::json!([[{
                    "text": "Open the website",
                    "url": state.config.base_url,
                }]])),
            )
            .await?;
        }
        "/help" => {
            bot.send_message(
                chat_id,
                "<b>Commands</b>\n\
                 /upload — reply to a photo, GIF or video to host it\n\
                 /login — connect your web account\n\
                 /status — show whether this chat is connected\n\
                 /disconnect — remove the web account link\n\
                 /stats — service statistics\n\n\
                 In a private chat you can also just send the media directly.",
                None,
            )
            .await?;
        }
        "/stats" => {
            let stats = state.ledger.stats().await?;
            bot.send_message(
                chat_id,
                &format!(
                    "<b>Service stats</b>\n\
                     Uploads: {} ({} web, {} bot)\n\
                     Images: {}  Videos: {}\n\
                     Users: {}\n\
                     Store ping: {}ms",
                    stats.total_uploads,
                    stats.web_uploads,
                    stats.bot_uploads,
                    stats.total_images,
                    stats.total_videos,
                    stats.total_users,
                    stats.ping_ms,
                ),
                None,
            )
            .await?;
        }
        "/login" => {
            if state.linking.is_linked(from.id).await? {
                bot.send_message(
                    chat_id,
                    "This chat is already connected to a web account. \
                     Use /disconnect first to link a different one.",
                    None,
                )
                .await?;
            } else {
                let token = state.linking.create_link_token(from.id).await?;
                let url = format!("{}/login?link={token}", state.config.base_url);
                bot.send_message(
                    chat_id,
                    &format!(
                        "Open this link while signed in to connect your account. \
                         It expires in {} minutes.",
                        LINK_TOKEN_TTL_SECS / 60,
                    ),
                    Some(serde_json::json!([[{ "text": "Connect account", "url": url }]])),
                )
                .await?;
            }
        }
        "/status" => {
            if state.linking.is_linked(from.id).await? {
                bot.send_message(
                    chat_id,
                    "Connected: uploads from this chat appear in your web dashboard.",
                    Some(serde_json::json!([[{
                        "text": "Disconnect",
                        "callback_data": "disconnect",
                    }]])),
                )
                .await?;
            } else {
                bot.send_message(
                    chat_id,
                    "Not connected to a web account. Use /login to connect one.",
                    None,
                )
                .await?;
            }
        }
        "/disconnect" => {
            let removed = state.linking.unlink(from.id).await?;
            let reply = if removed {
                "Disconnected. Future uploads stay anonymous."
            } else {
                "Nothing to disconnect: this chat is not linked to a web account."
            };
            bot.send_message(chat_id, reply, None).await?;
        }
        "/upload" | "/tgm" => {
            let media = message
                .reply_to_message
                .as_deref()
                .and_then(extract_media);
            match media {
                Some(media) => process_file(state, bot, chat_id, from, media).await?,
                None => {
                    bot.send_message(
                        chat_id,
                        "Reply to a photo, GIF or video with /upload to host it.",
                        None,
                    )
                    .await?;
                }
            }
        }
        _ => {
            if message.chat.is_private() {
                bot.send_message(chat_id, "Unknown command. Try /help.", None)
                    .await?;
            }
        }
    }

    Ok(())
}

async fn handle_callback(
    state: &Arc<AppState>,
    bot: &BotClient,
    callback: CallbackQuery,
) -> Result<(), WebhookError> {
    if callback.data.as_deref() == Some("disconnect") {
        let removed = state.linking.unlink(callback.from.id).await?;
        let text = if removed {
            "Disconnected."
        } else {
            "Already disconnected."
        };
        bot.answer_callback(&callback.id, text).await?;
        if let Some(message) = callback.message {
            bot.send_message(message.chat.id, text, None).await?;
        }
    } else {
        bot.answer_callback(&callback.id, "").await?;
    }
    Ok(())
}

/// A media attachment pulled out of a message, normalized across the three
/// attachment shapes Telegram uses.
struct IncomingMedia {
    file_id: String,
    /// Telegram may omit the size; an unknown size fails the cap check.
    file_size: Option<u64>,
    mime_type: String,
    kind: MediaKind,
}

fn size_within_limit(file_size: Option<u64>, max: u64) -> bool {
    matches!(file_size, Some(size) if size <= max)
}

fn extract_media(message: &Message) -> Option<IncomingMedia> {
    if let Some(sizes) = &message.photo {
        // Telegram lists photo renditions smallest first.
        let best = sizes.last()?;
        return Some(IncomingMedia {
            file_id: best.file_id.clone(),
            file_size: best.file_size,
            mime_type: "image/jpeg".to_string(),
            kind: MediaKind::Photo,
        });
    }
    if let Some(animation) = &message.animation {
        return Some(IncomingMedia {
            file_id: animation.file_id.clone(),
            file_size: animation.file_size,
            mime_type: animation
                .mime_type
                .clone()
                .unwrap_or_else(|| "image/gif".to_string()),
            kind: MediaKind::Animation,
        });
    }
    if let Some(document) = &message.document {
        let mime_type = document
            .mime_type
            .clone()
            .unwrap_or_else(|| "application/octet-stream".to_string());
        if !(mime_type.starts_with("image/") || mime_type.starts_with("video/")) {
            return None;
        }
        let kind = if mime_type.starts_with("video/") {
            MediaKind::Video
        } else {
            MediaKind::Document
        };
        return Some(IncomingMedia {
            file_id: document.file_id.clone(),
            file_size: document.file_size,
            mime_type,
            kind,
        });
    }
    None
}

async fn process_file(
    state: &Arc<AppState>,
    bot: &BotClient,
    chat_id: i64,
    from: &User,
    media: IncomingMedia,
) -> Result<(), WebhookError> {
    if !size_within_limit(media.file_size, state.config.max_upload_size) {
        bot.send_message(
            chat_id,
            &format!(
                "I can't host that file: it is larger than {}MB or its size \
                 could not be determined.",
                state.config.max_upload_size / (1024 * 1024)
            ),
            None,
        )
        .await?;
        return Ok(());
    }

    let id = generate_id();
    let linked_account = state.linking.linked_web_account(from.id).await?;
    // Uploads attribute to the linked web account when one exists, otherwise
    // to the Telegram id itself.
    let tracking_id = linked_account
        .clone()
        .unwrap_or_else(|| from.id.to_string());

    // The copy keeps a durable reference in the storage channel; losing it is
    // survivable since the original file id still resolves.
    if let Err(e) = bot
        .copy_to_storage(&media.file_id, &format!("<code>{id}</code>"), media.kind)
        .await
    {
        warn!(error = %e, id, "storage channel copy failed");
        bot.send_log(&format!("storage copy failed for {id}: {e}"))
            .await;
    }

    let record = NewImage {
        id: id.clone(),
        telegram_file_id: media.file_id,
        created_at: chrono::Utc::now().timestamp_millis(),
        metadata: MediaMetadata {
            // The cap check guarantees a known size by this point.
            size: media.file_size.unwrap_or(0),
            mime_type: media.mime_type,
        },
    };
    state
        .ledger
        .save_image(&record, UploadSource::Bot, Some(&tracking_id))
        .await?;

    let url = state.config.public_link(&id);
    let mut reply = format!("Hosted! Your link:\n{url}");
    if linked_account.is_some() {
        reply.push_str("\n\nSaved to your web dashboard.");
    }
    bot.send_message(chat_id, &reply, None).await?;

    info!(id, telegram_id = from.id, "bot upload stored");
    bot.send_log(&format!("bot upload {url} by {}", from.id))
        .await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::bot::update::{Chat, Document, Message};

    use super::{extract_media, size_within_limit};

    const LIMIT: u64 = 20 * 1024 * 1024;

    fn document_message(file_size: Option<u64>, mime_type: &str) -> Message {
        Message {
            message_id: 1,
            chat: Chat {
                id: 100,
                kind: "private".to_string(),
            },
            from: None,
            text: None,
            photo: None,
            animation: None,
            document: Some(Document {
                file_id: "doc-1".to_string(),
                file_size,
                mime_type: Some(mime_type.to_string()),
            }),
            reply_to_message: None,
        }
    }

    #[test]
    fn cap_rejects_unknown_and_oversized_files() {
        assert!(!size_within_limit(None, LIMIT));
        assert!(!size_within_limit(Some(LIMIT + 1), LIMIT));
        assert!(size_within_limit(Some(LIMIT), LIMIT));
        assert!(size_within_limit(Some(1024), LIMIT));
    }

    #[test]
    fn document_without_a_size_keeps_it_unknown() {
        let message = document_message(None, "image/png");
        let media = extract_media(&message).expect("image document should extract");
        assert_eq!(media.file_size, None);
        // The unknown size must then fail the cap check.
        assert!(!size_within_limit(media.file_size, LIMIT));
    }

    #[test]
    fn non_media_documents_are_ignored() {
        let message = document_message(Some(10), "application/pdf");
        assert!(extract_media(&message).is_none());
    }
}
