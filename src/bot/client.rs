use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::config::TelegramConfig;

#[derive(Debug, Error)]
pub enum BotError {
    #[error("telegram transport error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("telegram api error: {0}")]
    Api(String),
    #[error("no storage channel configured")]
    NoStorageChannel,
}

/// What kind of media a stored file id refers to; picks the Bot API method
/// used to re-send it.
#[derive(Debug, Clone, Copy)]
pub enum MediaKind {
    Photo,
    Animation,
    Video,
    Document,
}

impl MediaKind {
    fn send_method(self) -> (&'static str, &'static str) {
        match self {
            MediaKind::Photo => ("sendPhoto", "photo"),
            MediaKind::Animation => ("sendAnimation", "animation"),
            MediaKind::Video => ("sendVideo", "video"),
            MediaKind::Document => ("sendDocument", "document"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileRef {
    file_id: String,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    #[serde(default)]
    document: Option<FileRef>,
    #[serde(default)]
    video: Option<FileRef>,
    #[serde(default)]
    animation: Option<FileRef>,
    #[serde(default)]
    photo: Option<Vec<FileRef>>,
}

#[derive(Debug, Deserialize)]
struct FileInfo {
    file_path: Option<String>,
}

/// Outbound Telegram Bot API client. One reqwest client for the process;
/// every method is a single HTTP call, no retries (callers decide whether a
/// failure is fatal).
#[derive(Clone)]
pub struct BotClient {
    http: reqwest::Client,
    api_base: String,
    token: String,
    storage_chat_id: Option<i64>,
    log_chat_id: Option<i64>,
}

impl BotClient {
    pub fn new(config: &TelegramConfig, token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: config.api_base.clone(),
            token,
            storage_chat_id: config.storage_chat_id,
            log_chat_id: config.log_chat_id,
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.token)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{file_path}", self.api_base, self.token)
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<T, BotError> {
        let response: ApiResponse<T> = self
            .http
            .post(self.method_url(method))
            .json(&body)
            .send()
            .await?
            .json()
            .await?;
        if !response.ok {
            return Err(BotError::Api(
                response
                    .description
                    .unwrap_or_else(|| format!("{method} failed")),
            ));
        }
        response
            .result
            .ok_or_else(|| BotError::Api(format!("{method} returned no result")))
    }

    /// Send an HTML-formatted message, optionally with an inline keyboard.
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<serde_json::Value>,
    ) -> Result<(), BotError> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
        });
        if let Some(markup) = keyboard {
            body["reply_markup"] = json!({ "inline_keyboard": markup });
        }
        let _: SentMessage = self.call("sendMessage", body).await?;
        Ok(())
    }

    /// Clear the loading state of an inline-button press.
    pub async fn answer_callback(&self, callback_id: &str, text: &str) -> Result<(), BotError> {
        let body = json!({ "callback_query_id": callback_id, "text": text });
        // answerCallbackQuery returns a bare boolean result.
        let _: bool = self.call("answerCallbackQuery", body).await?;
        Ok(())
    }

    /// Re-send an already-uploaded file into the storage channel by file id.
    pub async fn copy_to_storage(
        &self,
        file_id: &str,
        caption: &str,
        kind: MediaKind,
    ) -> Result<(), BotError> {
        let chat_id = self.storage_chat_id.ok_or(BotError::NoStorageChannel)?;
        let (method, field) = kind.send_method();
        let body = json!({
            "chat_id": chat_id,
            field: file_id,
            "caption": caption,
            "parse_mode": "HTML",
        });
        let _: SentMessage = self.call(method, body).await?;
        Ok(())
    }

    /// Push raw bytes into the storage channel as a document and return the
    /// resulting file id. This is how web uploads obtain their storage
    /// reference.
    pub async fn upload_document(
        &self,
        data: Vec<u8>,
        filename: &str,
        mime_type: &str,
    ) -> Result<String, BotError> {
        let chat_id = self.storage_chat_id.ok_or(BotError::NoStorageChannel)?;
        let part = reqwest::multipart::Part::bytes(data)
            .file_name(filename.to_string())
            .mime_str(mime_type)?;
        let form = reqwest::multipart::Form::new()
            .text("chat_id", chat_id.to_string())
            .part("document", part);

        let response: ApiResponse<SentMessage> = self
            .http
            .post(self.method_url("sendDocument"))
            .multipart(form)
            .send()
            .await?
            .json()
            .await?;
        if !response.ok {
            return Err(BotError::Api(
                response
                    .description
                    .unwrap_or_else(|| "sendDocument failed".to_string()),
            ));
        }
        let message = response
            .result
            .ok_or_else(|| BotError::Api("sendDocument returned no result".to_string()))?;

        message
            .document
            .or(message.video)
            .or(message.animation)
            .or_else(|| message.photo.and_then(|sizes| sizes.into_iter().last()))
            .map(|f| f.file_id)
            .ok_or_else(|| BotError::Api("uploaded message carries no file".to_string()))
    }

    /// Resolve a file id and download its bytes.
    pub async fn download_file(&self, file_id: &str) -> Result<Bytes, BotError> {
        let info: FileInfo = self.call("getFile", json!({ "file_id": file_id })).await?;
        let file_path = info
            .file_path
            .ok_or_else(|| BotError::Api("file has no path".to_string()))?;
        let bytes = self
            .http
            .get(self.file_url(&file_path))
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(bytes)
    }

    /// Best-effort operational log line to the configured log chat. Failures
    /// are swallowed; logging must never break the request that produced it.
    pub async fn send_log(&self, text: &str) {
        let Some(chat_id) = self.log_chat_id else {
            return;
        };
        if let Err(e) = self.send_message(chat_id, text, None).await {
            tracing::warn!(error = %e, "failed to deliver telegram log message");
        }
    }
}
