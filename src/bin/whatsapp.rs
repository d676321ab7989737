//! WhatsApp Business Cloud API utility.
//!
//! Without flags: a looping menu. With flags:
//!
//! ```text
//! whatsapp --send-template <name> [param=value ...] [--lang <code>]
//! whatsapp --send <text ...>
//! whatsapp --info
//! whatsapp --register <pin>
//! whatsapp --deregister
//! ```
//!
//! `--secrets <path>` may precede any of these.

use std::process::ExitCode;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::info;

use door_notify::config::Secrets;
use door_notify::console::{self, divider, mask, print_failure};
use door_notify::error::{ApiError, ApiResult};
use door_notify::platform::whatsapp::{self, Template, WhatsAppClient};
use door_notify::platform::Messenger;

const DEFAULT_TEMPLATE: &str = "door_status_open";
const DEFAULT_LANGUAGE: &str = "en";

#[derive(Debug, PartialEq)]
enum Command {
    SendTemplate {
        name: String,
        language: String,
        params: Vec<String>,
    },
    SendText(String),
    Info,
    Register(String),
    Deregister,
    Usage,
}

impl Command {
    fn failure_heading(&self) -> &'static str {
        match self {
            Command::SendTemplate { .. } | Command::SendText(_) => "Failed to send message",
            Command::Info => "Failed to fetch phone number info",
            Command::Register(_) => "Failed to register phone number",
            Command::Deregister => "Failed to deregister phone number",
            Command::Usage => "Invalid arguments",
        }
    }
}

/// `None` command means the interactive menu.
fn parse_args(args: Vec<String>) -> (Option<String>, Option<Command>) {
    let mut secrets = None;
    let mut language = DEFAULT_LANGUAGE.to_string();
    let mut rest = Vec::new();
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--secrets" => secrets = iter.next(),
            "--lang" => {
                if let Some(code) = iter.next() {
                    language = code;
                }
            }
            _ => rest.push(arg),
        }
    }

    let command = match rest.first().map(String::as_str) {
        None => return (secrets, None),
        Some("--send-template") => match rest.get(1) {
            Some(name) => Command::SendTemplate {
                name: name.clone(),
                language,
                params: rest[2..].to_vec(),
            },
            None => Command::Usage,
        },
        Some("--send") if rest.len() > 1 => Command::SendText(rest[1..].join(" ")),
        Some("--info") => Command::Info,
        Some("--register") => match rest.get(1) {
            Some(pin) => Command::Register(pin.clone()),
            None => Command::Usage,
        },
        Some("--deregister") => Command::Deregister,
        Some(_) => Command::Usage,
    };
    (secrets, Some(command))
}

fn print_usage() {
    println!("Usage:");
    println!("  whatsapp                                           # Interactive menu");
    println!("  whatsapp --send-template <name> [k=v ...] [--lang <code>]");
    println!("  whatsapp --send <text>                             # Plain text message");
    println!("  whatsapp --info                                    # Phone number info");
    println!("  whatsapp --register <pin>                          # Register with 6-digit PIN");
    println!("  whatsapp --deregister                              # Deregister phone number");
    println!();
    println!("Options:");
    println!("  --secrets <path>                                   # Secrets file (default: secrets.toml)");
}

struct App {
    client: WhatsAppClient,
    recipient: Option<String>,
}

impl App {
    fn recipient(&self) -> ApiResult<&str> {
        self.recipient
            .as_deref()
            .ok_or_else(|| ApiError::NotConfigured("whatsapp.phone_number".to_string()))
    }

    async fn send_template(&self, name: &str, language: &str, params: &[String]) -> ApiResult<()> {
        let recipient = self.recipient()?;
        let template = Template::new(name, language).with_body_params(whatsapp::parse_params(params)?);

        println!("Sending template '{name}' ({language})...");
        let response = self.client.send_template(recipient, &template).await?;
        report_sent(&response);
        Ok(())
    }

    async fn send_text(&self, text: &str) -> ApiResult<()> {
        let recipient = self.recipient()?;
        println!("Sending text message...");
        let response = self.client.send_text(recipient, text).await?;
        report_sent(&response);
        Ok(())
    }

    async fn info(&self) -> ApiResult<()> {
        println!("Fetching phone number info...\n");
        let info = self.client.phone_info().await?;
        println!("Phone Number Info:");
        if let Some(fields) = info.as_object() {
            for (key, value) in fields {
                println!("  {key}: {}", display_value(value));
            }
        }
        Ok(())
    }

    async fn register(&self, pin: &str) -> ApiResult<()> {
        println!("Registering phone number {}...", self.client.phone_number_id());
        self.client.register(pin).await?;
        println!("✓ Phone number registered successfully!");
        Ok(())
    }

    async fn deregister(&self) -> ApiResult<()> {
        println!("Deregistering phone number {}...", self.client.phone_number_id());
        self.client.deregister().await?;
        println!("✓ Phone number deregistered successfully!");
        Ok(())
    }

    async fn run(&self, command: &Command) -> ApiResult<()> {
        match command {
            Command::SendTemplate {
                name,
                language,
                params,
            } => self.send_template(name, language, params).await,
            Command::SendText(text) => self.send_text(text).await,
            Command::Info => self.info().await,
            Command::Register(pin) => self.register(pin).await,
            Command::Deregister => self.deregister().await,
            Command::Usage => {
                print_usage();
                Ok(())
            }
        }
    }

    /// Looping menu; each failure is reported and the loop continues.
    async fn menu(&self) -> Result<()> {
        println!("Select an action:");
        println!("  1. Send template message");
        println!("  2. Send text message");
        println!("  3. Register phone number (enter PIN)");
        println!("  4. Get phone number info");
        println!("  5. Deregister phone number");
        println!("  0. Exit");
        println!();

        loop {
            let choice = console::read_line("Enter your choice (0-5): ")?;

            let command = match choice.as_str() {
                "0" => {
                    println!("Exiting...");
                    break;
                }
                "1" => {
                    let name = console::read_line(&format!("Template name [{DEFAULT_TEMPLATE}]: "))?;
                    let params = console::read_line("Parameters (name=value, space-separated): ")?;
                    Some(Command::SendTemplate {
                        name: if name.is_empty() {
                            DEFAULT_TEMPLATE.to_string()
                        } else {
                            name
                        },
                        language: DEFAULT_LANGUAGE.to_string(),
                        params: params.split_whitespace().map(str::to_string).collect(),
                    })
                }
                "2" => Some(Command::SendText(console::read_line("Message: ")?)),
                "3" => Some(Command::Register(console::read_line(
                    "Enter the 6-digit verification PIN: ",
                )?)),
                "4" => Some(Command::Info),
                "5" => {
                    let confirm =
                        console::read_line("Are you sure you want to deregister? (yes/no): ")?;
                    if confirm.eq_ignore_ascii_case("yes") {
                        Some(Command::Deregister)
                    } else {
                        println!("Deregistration cancelled.");
                        None
                    }
                }
                _ => {
                    println!("Invalid choice. Please try again.");
                    None
                }
            };

            if let Some(command) = command {
                println!();
                if let Err(err) = self.run(&command).await {
                    print_failure(command.failure_heading(), &err);
                }
            }

            println!();
            divider();
            println!();
        }
        Ok(())
    }
}

fn report_sent(response: &Value) {
    println!("✓ Message accepted!");
    if let Some(id) = whatsapp::message_id(response) {
        println!("  Message ID: {id}");
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    console::init_tracing();

    let (secrets_flag, command) = parse_args(std::env::args().skip(1).collect());
    let secrets_path = Secrets::resolve_path(secrets_flag);

    info!("Loading secrets from: {}", secrets_path.display());
    let secrets = Secrets::load(&secrets_path)?;

    let client = WhatsAppClient::from_secrets(&secrets.whatsapp)
        .with_context(|| format!("Check {}", secrets_path.display()))?;

    println!("Phone Number ID: {}", client.phone_number_id());
    println!("Token: {}", mask(&secrets.whatsapp.token));
    println!();

    let app = App {
        client,
        recipient: secrets.whatsapp.phone_number().ok().map(str::to_string),
    };

    let Some(command) = command else {
        app.menu().await?;
        return Ok(ExitCode::SUCCESS);
    };

    match app.run(&command).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            print_failure(command.failure_heading(), &err);
            Ok(ExitCode::FAILURE)
        }
    }
}
