mod api;
mod compose;
mod config;
mod controller;
mod email;
mod keymap;
mod tui;

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::email::Mailbox;

/// Log to the file named by `$MAILPANE_LOG`, if set. Nothing is written to
/// the terminal while the UI owns it.
fn init_logging() -> Result<()> {
    let Some(path) = std::env::var_os("MAILPANE_LOG") else {
        return Ok(());
    };
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.to_string_lossy()))?;
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mailpane=debug"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let config = config::Config::load()?;

    let args: Vec<String> = std::env::args().collect();
    let initial = match args.get(1) {
        Some(name) => name
            .parse::<Mailbox>()
            .map_err(|e| anyhow::anyhow!(e))
            .context("usage: mailpane [inbox|sent|archive]")?,
        None => config.display.default_mailbox()?,
    };

    let api = api::HttpBackend::new(&config.server)?;
    tracing::info!("starting against {} in {}", config.server.base_url, initial);
    tui::run(Arc::new(api), config, initial).await
}
