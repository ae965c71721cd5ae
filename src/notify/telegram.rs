use std::sync::Arc;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AlertSink, NotifyError};

// ---------------------------------------------------------------------------
// Bot API envelope
//
// Every Bot API method answers with the same outer object:
//
// Success:
//   { "ok": true, "result": <T> }
//
// Failure (usually with a 4xx status):
//   { "ok": false, "error_code": 400, "description": "Bad Request: chat not found" }
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct TelegramResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<i64>,
}

impl<T> TelegramResponse<T> {
    pub fn into_result(self) -> Result<T, NotifyError> {
        match (self.ok, self.result) {
            (true, Some(result)) => Ok(result),
            (true, None) => Err(NotifyError::Api {
                code: 0,
                description: "ok=true but result field is missing".to_owned(),
            }),
            (false, _) => Err(NotifyError::Api {
                code: self.error_code.unwrap_or(-1),
                description: self
                    .description
                    .unwrap_or_else(|| "(no description)".to_owned()),
            }),
        }
    }
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
pub struct SentMessage {
    pub message_id: i64,
}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

/// Posts alerts to one Telegram chat through the Bot API `sendMessage` method.
#[derive(Debug, Clone)]
pub struct TelegramSink {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    http: Client,
    base_url: String,
    bot_token: String,
    chat_id: i64,
}

impl TelegramSink {
    pub fn new(base_url: &str, bot_token: &str, chat_id: i64) -> Self {
        Self {
            inner: Arc::new(Inner {
                http: Client::new(),
                base_url: base_url.trim_end_matches('/').to_owned(),
                bot_token: bot_token.to_owned(),
                chat_id,
            }),
        }
    }

    /// The token is part of the path, so this URL must never be logged.
    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.inner.base_url, self.inner.bot_token, method)
    }

    async fn send_message(&self, text: &str) -> Result<SentMessage, NotifyError> {
        let body = SendMessageRequest {
            chat_id: self.inner.chat_id,
            text,
            parse_mode: "Markdown",
            disable_web_page_preview: true,
        };

        let response = self
            .inner
            .http
            .post(self.method_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(redact)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(redact)?;

        // Error statuses still carry the envelope, which has the useful description.
        match serde_json::from_slice::<TelegramResponse<SentMessage>>(&bytes) {
            Ok(envelope) => envelope.into_result(),
            Err(e) if status.is_success() => Err(e.into()),
            Err(_) => Err(NotifyError::Status(status)),
        }
    }
}

/// reqwest errors carry the request URL, which embeds the bot token.
fn redact(e: reqwest::Error) -> NotifyError {
    NotifyError::Http(e.without_url())
}

impl AlertSink for TelegramSink {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        let sent = self.send_message(text).await?;
        debug!(chat_id = self.inner.chat_id, message_id = sent.message_id, "Telegram message sent");
        Ok(())
    }
}
