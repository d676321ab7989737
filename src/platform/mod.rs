pub mod telegram;
pub mod whatsapp;

use async_trait::async_trait;

use crate::error::ApiResult;

/// A provider that can deliver a plain text notification.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Platform identifier (e.g., "telegram", "whatsapp")
    fn platform(&self) -> &'static str;

    /// Send `text` to `recipient` (a chat id or phone number).
    async fn send_text(&self, recipient: &str, text: &str) -> ApiResult;
}
