//! Notification utilities for the Telegram Bot API and the WhatsApp Business
//! Cloud API.
//!
//! [`client::ApiClient`] performs a single authenticated JSON call and
//! normalizes its outcome into [`error::ApiResult`]. The provider adapters in
//! [`platform`] add method names, payload shapes and `ok` / `success`
//! interpretation; [`updates`] projects raw Telegram updates into message
//! views.

pub mod client;
pub mod config;
pub mod console;
pub mod error;
pub mod platform;
pub mod updates;
