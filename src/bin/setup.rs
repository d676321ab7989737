//! Secrets setup wizard.
//!
//! Prompts for the Telegram and WhatsApp credentials in the terminal and
//! writes `secrets.toml`. Blank answers keep the placeholder values, which
//! the utilities treat as "not configured".
//!
//! The file lands in `DOOR_NOTIFY_SECRETS` if set, else `./secrets.toml`.

use anyhow::{Context, Result};
use std::path::Path;

use door_notify::config::Secrets;
use door_notify::console::read_line;

struct SecretsParams<'a> {
    tg_token: &'a str,
    tg_chat_id: &'a str,
    wa_token: &'a str,
    wa_phone_number: &'a str,
    wa_app_url: &'a str,
}

/// Quote a value as a TOML basic string.
fn toml_string(value: &str) -> String {
    toml::Value::String(value.to_owned()).to_string()
}

/// Produces a valid secrets.toml string. Extracted so it can be unit-tested.
fn format_secrets(p: &SecretsParams<'_>) -> String {
    let or_placeholder = |s: &str, placeholder: &str| {
        if s.is_empty() {
            toml_string(placeholder)
        } else {
            toml_string(s)
        }
    };

    let tg_token = or_placeholder(p.tg_token, "some_telegram_bot_token");
    let tg_chat_id = or_placeholder(p.tg_chat_id, "some_telegram_main_chat_id");
    let wa_token = or_placeholder(p.wa_token, "some_wa_token");
    let wa_phone_number = or_placeholder(p.wa_phone_number, "some_wa_phone_number");
    let wa_app_url = or_placeholder(p.wa_app_url, "some_wa_app_url");

    format!(
        r#"[telegram]
bot_token = {tg_token}
chat_id = {tg_chat_id}
# api_base = "https://api.telegram.org"

[whatsapp]
token = {wa_token}
phone_number = {wa_phone_number}
app_url = {wa_app_url}
# api_base = "https://graph.facebook.com/v24.0"
"#
    )
}

fn run_cli(secrets_path: &Path) -> Result<()> {
    println!("=== door-notify Secrets Setup ===\n");
    println!("Press Enter to leave a value unset.\n");

    let tg_token = read_line("Telegram bot token: ")?;
    let tg_chat_id = read_line("Telegram main chat ID (run `door-notify --get-id` to find it): ")?;
    let wa_token = read_line("WhatsApp access token: ")?;
    let wa_phone_number = read_line("WhatsApp recipient phone number: ")?;
    let wa_app_url =
        read_line("WhatsApp messages URL (https://graph.facebook.com/v24.0/<id>/messages): ")?;

    let secrets = format_secrets(&SecretsParams {
        tg_token: &tg_token,
        tg_chat_id: &tg_chat_id,
        wa_token: &wa_token,
        wa_phone_number: &wa_phone_number,
        wa_app_url: &wa_app_url,
    });

    if secrets_path.exists() {
        let answer = read_line(&format!(
            "{} exists. Overwrite? (yes/no): ",
            secrets_path.display()
        ))?;
        if !answer.eq_ignore_ascii_case("yes") {
            println!("Nothing written.");
            return Ok(());
        }
    }

    std::fs::write(secrets_path, &secrets)
        .with_context(|| format!("Could not write {}", secrets_path.display()))?;

    println!("\n✓  secrets saved to {}", secrets_path.display());
    println!("   Try it with:  cargo run -- --get-id");
    Ok(())
}

fn main() -> Result<()> {
    let secrets_path = Secrets::resolve_path(None);
    run_cli(&secrets_path)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
