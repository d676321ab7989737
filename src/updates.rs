//! Read-only views over raw Telegram update objects.

use chrono::{DateTime, Local};
use serde_json::Value;

/// A message received by the bot, flattened out of an update.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MessageView {
    pub sender_id: String,
    pub sender_name: String,
    pub username: String,
    pub chat_id: String,
    pub text: String,
    /// Unix seconds; `None` when absent or zero.
    pub timestamp: Option<i64>,
}

impl MessageView {
    /// Project a message object (`update.message` / `update.edited_message`).
    pub fn from_message(msg: &Value) -> Self {
        let from = &msg["from"];
        Self {
            sender_id: id_string(&from["id"]),
            sender_name: full_name(from),
            username: str_field(from, "username"),
            chat_id: id_string(&msg["chat"]["id"]),
            text: str_field(msg, "text"),
            timestamp: msg["date"].as_i64().filter(|ts| *ts != 0),
        }
    }

    /// Local-time `YYYY-MM-DD HH:MM:SS`, or "Unknown".
    pub fn formatted_date(&self) -> String {
        self.timestamp
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .map(|dt| {
                dt.with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string()
            })
            .unwrap_or_else(|| "Unknown".to_string())
    }
}

/// A chat the bot has seen in recent updates.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSummary {
    pub id: String,
    pub kind: String,
    pub name: String,
    pub username: String,
}

/// The message object carried by an update, if any.
pub fn message_of(update: &Value) -> Option<&Value> {
    ["message", "edited_message"]
        .iter()
        .filter_map(|key| update.get(*key))
        .find(|msg| msg.as_object().is_some_and(|obj| !obj.is_empty()))
}

/// Most recent message, optionally restricted to one chat.
///
/// Walks `updates` from last to first and returns the first message whose
/// chat id matches `chat_filter` (any message when no filter is given).
/// Provider order is trusted as-is; timestamps are not compared.
pub fn latest(updates: &[Value], chat_filter: Option<&str>) -> Option<MessageView> {
    updates
        .iter()
        .rev()
        .filter_map(message_of)
        .map(MessageView::from_message)
        .find(|view| chat_filter.map_or(true, |chat| view.chat_id == chat))
}

/// Distinct chats in first-seen order.
pub fn unique_chats(updates: &[Value]) -> Vec<ChatSummary> {
    let mut chats: Vec<ChatSummary> = Vec::new();

    for msg in updates.iter().filter_map(message_of) {
        let chat = &msg["chat"];
        let id = id_string(&chat["id"]);
        if id.is_empty() || chats.iter().any(|c| c.id == id) {
            continue;
        }
        let kind = match chat["type"].as_str() {
            Some(kind) => kind.to_string(),
            None => "unknown".to_string(),
        };
        chats.push(ChatSummary {
            id,
            kind,
            name: full_name(chat),
            username: str_field(chat, "username"),
        });
    }

    chats
}

fn str_field(obj: &Value, key: &str) -> String {
    obj[key].as_str().unwrap_or_default().to_string()
}

fn full_name(obj: &Value) -> String {
    format!(
        "{} {}",
        str_field(obj, "first_name"),
        str_field(obj, "last_name")
    )
    .trim()
    .to_string()
}

/// Ids arrive as JSON numbers but are compared and printed as strings.
fn id_string(value: &Value) -> String {
    match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        _ => String::new(),
    }
}
