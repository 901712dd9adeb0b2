use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::email::{is_valid_display_format, Mailbox, DEFAULT_DISPLAY_FORMAT};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub display: DisplayConfig,
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    /// Root the `/emails` paths are resolved against.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Extra headers sent with every request (e.g. a session cookie).
    pub headers: HashMap<String, String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            timeout_secs: 10,
            headers: HashMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DisplayConfig {
    /// One of "inbox", "sent", "archive".
    pub default_mailbox: String,
    /// chrono format string for rendered timestamps.
    pub timestamp_format: String,
    /// How long a status-bar message stays visible.
    pub status_timeout_secs: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            default_mailbox: "inbox".to_string(),
            timestamp_format: DEFAULT_DISPLAY_FORMAT.to_string(),
            status_timeout_secs: 3,
        }
    }
}

impl DisplayConfig {
    pub fn default_mailbox(&self) -> Result<Mailbox> {
        self.default_mailbox
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))
            .context("display.default_mailbox")
    }

    /// Reject values that would only fail later, mid-render.
    pub fn validate(&self) -> Result<()> {
        self.default_mailbox()?;
        if !is_valid_display_format(&self.timestamp_format) {
            anyhow::bail!(
                "display.timestamp_format: invalid format string {:?}",
                self.timestamp_format
            );
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Load config from the first existing candidate path:
    ///
    /// 1. `$MAILPANE_CONFIG`
    /// 2. `$XDG_CONFIG_HOME/mailpane/config.toml`
    /// 3. `~/.config/mailpane/config.toml`
    ///
    /// If none of these paths exist, return a default `Config`.
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::locate() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            let config: Config = toml::from_str(&contents)
                .with_context(|| format!("failed to parse config file {}", path.display()))?;
            config
                .display
                .validate()
                .with_context(|| format!("invalid config file {}", path.display()))?;
            tracing::debug!("loaded config from {}", path.display());
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Return the first config path that actually exists on disk, or `None`.
    fn locate() -> Option<PathBuf> {
        Self::candidate_paths().into_iter().find(|p| p.is_file())
    }

    /// Ordered list of paths we check for a config file.
    fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Ok(p) = std::env::var("MAILPANE_CONFIG") {
            paths.push(PathBuf::from(p));
        }

        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(xdg).join("mailpane").join("config.toml"));
        }

        if let Ok(home) = std::env::var("HOME") {
            paths.push(
                PathBuf::from(home)
                    .join(".config")
                    .join("mailpane")
                    .join("config.toml"),
            );
        }

        paths
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
