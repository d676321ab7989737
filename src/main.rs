//! Telegram bot utility: list chat ids, send a notification, read replies.
//!
//! ```text
//! door-notify                  # interactive menu
//! door-notify --get-id         # chat ids from recent messages
//! door-notify --send [msg]     # send to the configured chat
//! door-notify --latest         # latest message from any chat
//! door-notify --latest-main    # latest message from the configured chat
//! ```
//!
//! `--secrets <path>` may precede any of these.

use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::{info, warn};

use door_notify::config::Secrets;
use door_notify::console::{self, divider, print_failure};
use door_notify::error::{ApiError, ApiResult};
use door_notify::platform::telegram::TelegramClient;
use door_notify::updates;

const DEFAULT_MESSAGE: &str = "Hello from Smart Door! 🚪";

#[derive(Debug, PartialEq)]
enum Command {
    GetIds,
    Send(Option<String>),
    Latest,
    LatestMain,
    Usage,
}

impl Command {
    fn failure_heading(&self) -> &'static str {
        match self {
            Command::Send(_) => "Failed to send message",
            _ => "Failed to get updates",
        }
    }
}

/// Split off `--secrets <path>` and map the first remaining flag to a command.
/// No flag at all means the interactive menu (`None`).
fn parse_args(args: Vec<String>) -> (Option<String>, Option<Command>) {
    let mut secrets = None;
    let mut rest = Vec::new();
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        if arg == "--secrets" {
            secrets = iter.next();
        } else {
            rest.push(arg);
        }
    }

    let command = match rest.first().map(String::as_str) {
        None => return (secrets, None),
        Some("--get-id") => Command::GetIds,
        Some("--send") => {
            let message = rest[1..].join(" ");
            Command::Send(if message.is_empty() { None } else { Some(message) })
        }
        Some("--latest") => Command::Latest,
        Some("--latest-main") => Command::LatestMain,
        Some(_) => Command::Usage,
    };
    (secrets, Some(command))
}

fn print_usage() {
    println!("Usage:");
    println!("  door-notify                 # Interactive menu");
    println!("  door-notify --get-id        # Get chat IDs");
    println!("  door-notify --send [msg]    # Send message");
    println!("  door-notify --latest        # Read latest message (any)");
    println!("  door-notify --latest-main   # Read latest from main chat");
    println!();
    println!("Options:");
    println!("  --secrets <path>            # Secrets file (default: secrets.toml)");
}

struct App {
    client: TelegramClient,
    main_chat: Option<String>,
}

impl App {
    async fn print_chat_ids(&self) -> ApiResult<()> {
        println!("Fetching recent updates...");
        println!("(Make sure you've sent a message to your bot first)\n");

        let updates = self.client.fetch_recent_updates().await?;
        if updates.is_empty() {
            println!("No recent messages found.");
            println!("Send a message to your bot on Telegram, then run this again.");
            return Ok(());
        }

        let chats = updates::unique_chats(&updates);
        println!("Found {} unique chat(s):\n", chats.len());
        divider();
        for chat in &chats {
            println!("  Chat ID: {}", chat.id);
            println!("  Type:    {}", chat.kind);
            if !chat.name.is_empty() {
                println!("  Name:    {}", chat.name);
            }
            if !chat.username.is_empty() {
                println!("  Username: @{}", chat.username);
            }
            divider();
        }
        Ok(())
    }

    async fn send(&self, message: &str) -> ApiResult<()> {
        let chat = self
            .main_chat
            .as_deref()
            .ok_or_else(|| ApiError::NotConfigured("telegram.chat_id".to_string()))?;

        println!("Sending message to chat {chat}...");
        let sent = self.client.send_long_text(chat, message).await?;

        println!("✓ Message sent successfully!");
        for result in &sent {
            if let Some(id) = result["message_id"].as_i64() {
                println!("  Message ID: {id}");
            }
        }
        Ok(())
    }

    async fn read_latest(&self, chat_filter: Option<&str>) -> ApiResult<()> {
        match chat_filter {
            Some(chat) => println!("Fetching latest message from chat {chat}...\n"),
            None => println!("Fetching latest message...\n"),
        }

        let updates = self.client.fetch_recent_updates().await?;
        if updates.is_empty() {
            println!("No messages found.");
            println!("Send a message to your bot on Telegram first.");
            return Ok(());
        }

        let Some(view) = updates::latest(&updates, chat_filter) else {
            match chat_filter {
                Some(chat) => println!("No messages found from chat {chat}."),
                None => println!("No message content in updates."),
            }
            return Ok(());
        };

        let text = if view.text.is_empty() {
            "(no text)"
        } else {
            view.text.as_str()
        };

        divider();
        if chat_filter.is_none() {
            println!("  From:      {}", view.sender_name);
            if !view.username.is_empty() {
                println!("  Username:  @{}", view.username);
            }
            println!("  Chat ID:   {}", view.chat_id);
            println!("  Date:      {}", view.formatted_date());
        }
        println!("  Message:   {text}");
        divider();
        Ok(())
    }

    /// Latest from the main chat, or from any chat when none is configured.
    async fn read_latest_main(&self) -> ApiResult<()> {
        match self.main_chat.as_deref() {
            Some(chat) => self.read_latest(Some(chat)).await,
            None => {
                warn!("telegram.chat_id not configured, reading any latest message");
                println!("telegram.chat_id not configured, reading any latest message...");
                self.read_latest(None).await
            }
        }
    }

    async fn run(&self, command: &Command) -> ApiResult<()> {
        match command {
            Command::GetIds => self.print_chat_ids().await,
            Command::Send(message) => {
                self.send(message.as_deref().unwrap_or(DEFAULT_MESSAGE))
                    .await
            }
            Command::Latest => self.read_latest(None).await,
            Command::LatestMain => self.read_latest_main().await,
            Command::Usage => {
                print_usage();
                Ok(())
            }
        }
    }
}

/// One-shot menu. `None` when the user exits, picks an invalid option, or
/// asks to send with no main chat configured.
fn menu(main_chat_configured: bool) -> Result<Option<Command>> {
    menu_with(main_chat_configured, console::read_line)
}

fn menu_with(
    main_chat_configured: bool,
    mut read: impl FnMut(&str) -> std::io::Result<String>,
) -> Result<Option<Command>> {
    println!("\n=== Telegram Bot Utility ===\n");
    println!("1. Get Chat IDs (from recent messages)");
    println!("2. Send Message");
    println!("3. Read Latest Message (any)");
    println!("4. Read Latest Message (from main chat)");
    println!("0. Exit");
    println!();

    let choice = read("Select option (0-4): ")?;
    println!();

    let command = match choice.as_str() {
        "0" => {
            println!("Bye!");
            return Ok(None);
        }
        "1" => Command::GetIds,
        "2" => {
            if !main_chat_configured {
                println!("Error: telegram.chat_id not configured in secrets.toml");
                println!("Use option 1 to get your chat ID first.");
                return Ok(None);
            }
            let message = read("Enter message (or press Enter for default): ")?;
            Command::Send(if message.is_empty() { None } else { Some(message) })
        }
        "3" => Command::Latest,
        "4" => Command::LatestMain,
        _ => {
            println!("Invalid option.");
            return Ok(None);
        }
    };
    Ok(Some(command))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    console::init_tracing();

    let (secrets_flag, command) = parse_args(std::env::args().skip(1).collect());
    let secrets_path = Secrets::resolve_path(secrets_flag);

    info!("Loading secrets from: {}", secrets_path.display());
    let secrets = Secrets::load(&secrets_path)?;

    let client = TelegramClient::from_secrets(&secrets.telegram)
        .with_context(|| format!("Check {}", secrets_path.display()))?;

    let app = App {
        client,
        main_chat: secrets.telegram.main_chat().map(str::to_string),
    };

    let command = match command {
        Some(command) => command,
        None => match menu(app.main_chat.is_some())? {
            Some(command) => command,
            None => return Ok(ExitCode::SUCCESS),
        },
    };

    match app.run(&command).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            print_failure(command.failure_heading(), &err);
            Ok(ExitCode::FAILURE)
        }
    }
}
