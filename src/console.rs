//! Terminal helpers shared by the binaries.

use std::io::{self, Write};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::ApiError;

/// Logs go to stderr so that stdout only carries the utility's own output.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,door_notify=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

pub fn divider() {
    println!("{}", "-".repeat(50));
}

/// Print `prompt`, then read one trimmed line from stdin. EOF is an error.
pub fn read_line(prompt: &str) -> io::Result<String> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut buf = String::new();
    if io::stdin().read_line(&mut buf)? == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stdin closed"));
    }
    Ok(buf.trim().to_owned())
}

pub fn print_failure(heading: &str, err: &ApiError) {
    println!("✗ {heading}");
    println!("  Error: {}", err.kind());
    println!("  Details: {}", err.details());
}

/// First few characters of a secret, for confirming which one is loaded.
pub fn mask(secret: &str) -> String {
    let visible: String = secret.chars().take(6).collect();
    if visible.len() == secret.len() {
        "*".repeat(secret.chars().count())
    } else {
        format!("{visible}...")
    }
}
