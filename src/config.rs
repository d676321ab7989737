use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};

use crate::error::{ApiError, ApiResult};

/// Environment variable that overrides the default secrets file location.
pub const SECRETS_ENV: &str = "DOOR_NOTIFY_SECRETS";

/// Values shipped in the example secrets file. Treated the same as absent.
const PLACEHOLDERS: &[&str] = &[
    "some_telegram_bot_token",
    "some_telegram_main_chat_id",
    "some_telegram_chat_id",
    "some_wa_token",
    "some_wa_phone_number",
    "some_wa_app_url",
];

/// Credentials for both providers, read once from `secrets.toml`.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Secrets {
    #[serde(default)]
    pub telegram: TelegramSecrets,
    #[serde(default)]
    pub whatsapp: WhatsAppSecrets,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramSecrets {
    #[serde(default)]
    pub bot_token: String,
    /// Main chat that `--send` and `--latest-main` target.
    #[serde(default, deserialize_with = "string_or_int")]
    pub chat_id: String,
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WhatsAppSecrets {
    #[serde(default)]
    pub token: String,
    /// Recipient phone number in international format, digits only.
    #[serde(default, deserialize_with = "string_or_int")]
    pub phone_number: String,
    /// Full messages endpoint, e.g. `https://graph.facebook.com/v24.0/<id>/messages`.
    #[serde(default)]
    pub app_url: String,
    #[serde(default = "default_graph_api_base")]
    pub api_base: String,
}

fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_graph_api_base() -> String {
    "https://graph.facebook.com/v24.0".to_string()
}

impl Default for TelegramSecrets {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: String::new(),
            api_base: default_telegram_api_base(),
        }
    }
}

impl Default for WhatsAppSecrets {
    fn default() -> Self {
        Self {
            token: String::new(),
            phone_number: String::new(),
            app_url: String::new(),
            api_base: default_graph_api_base(),
        }
    }
}

/// Chat ids and phone numbers are often written as bare TOML integers.
fn string_or_int<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

/// True when `value` is neither blank nor a known placeholder.
pub fn is_configured(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && !PLACEHOLDERS.contains(&value)
}

fn require<'a>(value: &'a str, key: &str) -> ApiResult<&'a str> {
    if is_configured(value) {
        Ok(value.trim())
    } else {
        Err(ApiError::NotConfigured(key.to_string()))
    }
}

impl TelegramSecrets {
    pub fn bot_token(&self) -> ApiResult<&str> {
        require(&self.bot_token, "telegram.bot_token")
    }

    pub fn chat_id(&self) -> ApiResult<&str> {
        require(&self.chat_id, "telegram.chat_id")
    }

    /// The main chat id, or `None` when it has not been filled in.
    pub fn main_chat(&self) -> Option<&str> {
        self.chat_id().ok()
    }
}

impl WhatsAppSecrets {
    pub fn token(&self) -> ApiResult<&str> {
        require(&self.token, "whatsapp.token")
    }

    pub fn phone_number(&self) -> ApiResult<&str> {
        require(&self.phone_number, "whatsapp.phone_number")
    }

    pub fn app_url(&self) -> ApiResult<&str> {
        require(&self.app_url, "whatsapp.app_url")
    }

    /// Phone number id taken from the messages endpoint
    /// (`.../<phone_number_id>/messages`).
    pub fn phone_number_id(&self) -> ApiResult<String> {
        let url = self.app_url()?;
        phone_number_id_from_url(url).ok_or_else(|| {
            ApiError::NotConfigured(format!(
                "whatsapp.app_url (no phone number id in '{url}')"
            ))
        })
    }
}

/// Path segment before the last one, e.g. `<id>` in `.../<id>/messages`.
/// The host of an absolute URL never counts as a path segment.
pub fn phone_number_id_from_url(url: &str) -> Option<String> {
    let path = match url.split_once("://") {
        Some((_, rest)) => rest.split_once('/')?.1,
        None => url,
    };
    let segments: Vec<&str> = path.trim_end_matches('/').split('/').collect();
    if segments.len() < 2 {
        return None;
    }
    let id = segments[segments.len() - 2];
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

impl Secrets {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!(
                "Secrets file not found at {} (copy secrets.example.toml or run `setup`)",
                path.display()
            );
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read secrets file: {}", path.display()))?;

        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse secrets file: {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Resolve the secrets path: explicit flag, then `DOOR_NOTIFY_SECRETS`,
    /// then `secrets.toml` in the working directory.
    pub fn resolve_path(flag: Option<String>) -> PathBuf {
        flag.or_else(|| std::env::var(SECRETS_ENV).ok())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("secrets.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_full_secrets() {
        let secrets = Secrets::from_toml(
            r#"
[telegram]
bot_token = "123:abc"
chat_id = 987654

[whatsapp]
token = "EAAG"
phone_number = "15551234567"
app_url = "https://graph.facebook.com/v24.0/896037763597183/messages"
"#,
        )
        .unwrap();

        assert_eq!(secrets.telegram.bot_token().unwrap(), "123:abc");
        assert_eq!(secrets.telegram.chat_id().unwrap(), "987654");
        assert_eq!(secrets.telegram.api_base, "https://api.telegram.org");
        assert_eq!(secrets.whatsapp.phone_number().unwrap(), "15551234567");
        assert_eq!(
            secrets.whatsapp.phone_number_id().unwrap(),
            "896037763597183"
        );
        assert_eq!(secrets.whatsapp.api_base, "https://graph.facebook.com/v24.0");
    }

    #[test]
    fn test_placeholders_are_not_configured() {
        let secrets = Secrets::from_toml(
            r#"
[telegram]
bot_token = "some_telegram_bot_token"
chat_id = "some_telegram_main_chat_id"
"#,
        )
        .unwrap();

        assert!(matches!(
            secrets.telegram.bot_token(),
            Err(ApiError::NotConfigured(key)) if key == "telegram.bot_token"
        ));
        assert!(secrets.telegram.main_chat().is_none());
    }

    #[test]
    fn test_missing_sections_default_to_unconfigured() {
        let secrets = Secrets::from_toml("").unwrap();
        assert!(secrets.telegram.bot_token().is_err());
        assert!(secrets.whatsapp.token().is_err());
        assert!(secrets.whatsapp.phone_number_id().is_err());
    }

    #[test]
    fn test_is_configured() {
        assert!(is_configured("abc"));
        assert!(!is_configured(""));
        assert!(!is_configured("   "));
        assert!(!is_configured("some_wa_token"));
    }

    #[test]
    fn test_phone_number_id_from_url() {
        assert_eq!(
            phone_number_id_from_url("https://graph.facebook.com/v24.0/42/messages").as_deref(),
            Some("42")
        );
        assert_eq!(phone_number_id_from_url("messages"), None);
        assert_eq!(phone_number_id_from_url("https://messages"), None);
        assert_eq!(
            phone_number_id_from_url("http://127.0.0.1:8080/7/messages").as_deref(),
            Some("7")
        );
    }

    #[test]
    fn test_phone_number_id_never_taken_from_host() {
        assert_eq!(phone_number_id_from_url("https://graph.facebook.com/messages"), None);
        assert_eq!(phone_number_id_from_url("https://graph.facebook.com/messages/"), None);

        let secrets = Secrets::from_toml(
            "[whatsapp]\napp_url = \"https://graph.facebook.com/messages\"",
        )
        .unwrap();
        assert!(matches!(
            secrets.whatsapp.phone_number_id(),
            Err(ApiError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[telegram]\nbot_token = \"tok\"").unwrap();

        let secrets = Secrets::load(file.path()).unwrap();
        assert_eq!(secrets.telegram.bot_token().unwrap(), "tok");
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Secrets::load(&dir.path().join("secrets.toml")).unwrap_err();
        assert!(err.to_string().contains("Secrets file not found"));
    }

    #[test]
    fn test_resolve_path_prefers_flag() {
        let path = Secrets::resolve_path(Some("/etc/door/secrets.toml".to_string()));
        assert_eq!(path, PathBuf::from("/etc/door/secrets.toml"));
    }
}
