use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use super::Messenger;
use crate::client::ApiClient;
use crate::config::TelegramSecrets;
use crate::error::{ApiError, ApiResult};

/// Telegram's per-message text limit.
pub const MAX_MESSAGE_LEN: usize = 4096;

/// Telegram Bot API bound to one bot token.
pub struct TelegramClient {
    api: ApiClient,
}

impl TelegramClient {
    /// Fails with [`ApiError::NotConfigured`] before any HTTP client exists
    /// when the token is missing or still the placeholder.
    pub fn from_secrets(secrets: &TelegramSecrets) -> ApiResult<Self> {
        let token = secrets.bot_token()?;
        Self::new(&secrets.api_base, token)
    }

    pub fn new(api_base: &str, bot_token: &str) -> ApiResult<Self> {
        let base = format!("{}/bot{}", api_base.trim_end_matches('/'), bot_token);
        let api = ApiClient::builder(base).build()?;
        Ok(Self { api })
    }

    /// Invoke a Bot API method and unwrap its `result` field.
    pub async fn call(&self, method: &str, payload: Option<&Value>) -> ApiResult {
        let response = self.api.call(method, payload).await?;
        into_result(response)
    }

    /// Recent inbound updates, in the order Telegram returns them.
    pub async fn fetch_recent_updates(&self) -> ApiResult<Vec<Value>> {
        match self.call("getUpdates", None).await? {
            Value::Array(updates) => Ok(updates),
            Value::Null => Ok(Vec::new()),
            other => Err(ApiError::Application(format!(
                "getUpdates returned a non-list result: {other}"
            ))),
        }
    }

    /// Send `text` in as many messages as the length limit requires.
    /// Stops at the first failure; returns the results sent so far otherwise.
    pub async fn send_long_text(&self, chat_id: &str, text: &str) -> ApiResult<Vec<Value>> {
        let mut sent = Vec::new();
        for chunk in split_message(text, MAX_MESSAGE_LEN) {
            sent.push(self.send_text(chat_id, &chunk).await?);
        }
        Ok(sent)
    }
}

#[async_trait]
impl Messenger for TelegramClient {
    fn platform(&self) -> &'static str {
        "telegram"
    }

    async fn send_text(&self, recipient: &str, text: &str) -> ApiResult {
        info!("Sending {} message to chat {}", self.platform(), recipient);
        let payload = json!({
            "chat_id": recipient,
            "text": text,
            "parse_mode": "HTML",
        });
        self.call("sendMessage", Some(&payload)).await
    }
}

/// Check the Bot API envelope: `ok: true` yields `result`, anything else is
/// an application-level failure carrying `description`.
pub fn into_result(response: Value) -> ApiResult {
    if response["ok"].as_bool() == Some(true) {
        return Ok(response.get("result").cloned().unwrap_or(Value::Null));
    }
    let description = response["description"]
        .as_str()
        .unwrap_or("Unknown error")
        .to_string();
    Err(ApiError::Application(description))
}

/// Split long messages at newline or space boundaries below `max_len` bytes.
pub fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + max_len).min(text.len());
        // Walk back to a valid UTF-8 char boundary so slicing doesn't panic
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }
        let actual_end = if end < text.len() {
            text[start..end]
                .rfind('\n')
                .or_else(|| text[start..end].rfind(' '))
                .map(|pos| start + pos + 1)
                .unwrap_or(end)
        } else {
            end
        };

        chunks.push(text[start..actual_end].to_string());
        start = actual_end;
    }

    chunks
}
