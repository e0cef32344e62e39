//! Configuration for the `WireChat` client.
//!
//! Supports layered configuration with the following priority (highest
//! first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attributes)
//! 3. TOML config file (`~/.config/wirechat/config.toml`)
//! 4. Compiled defaults
//!
//! A missing config file is not an error (defaults are used); an explicit
//! `--config` path that doesn't exist is. Credentials (the authentication
//! scheme and token attached to every outbound frame) live in their own
//! file and are required: the client has no anonymous mode.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::client::ClientOptions;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read a configuration or credentials file.
    #[error("failed to read {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// Could not determine the user's config directory.
    #[error("could not determine config directory (no HOME or XDG_CONFIG_HOME)")]
    NoConfigDir,

    /// The configured server address is not a usable WebSocket URL.
    #[error("`{url}` is not a WebSocket URL: {reason}")]
    BadServerUrl {
        /// The offending value.
        url: String,
        /// Why it was rejected.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    server: ServerFileConfig,
    input: InputFileConfig,
}

/// `[server]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServerFileConfig {
    url: Option<String>,
    reconnect_secs: Option<u64>,
    watchdog_secs: Option<u64>,
}

/// `[input]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct InputFileConfig {
    command_prefix: Option<String>,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket URL of the chat server.
    pub server_url: Option<String>,
    /// Prefix that marks an input line as a command.
    pub command_prefix: String,
    /// Fixed delay between reconnection attempts.
    pub reconnect: Duration,
    /// Inbound-silence bound before forcing a reconnect.
    pub watchdog: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            command_prefix: "!!".to_string(),
            reconnect: Duration::from_secs(5),
            watchdog: Duration::from_secs(90),
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an explicit config file cannot be read or
    /// parsed, or if the resolved server address is not a `ws://`/`wss://`
    /// URL.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        let config = Self::resolve(cli, &file);
        if let Some(url) = &config.server_url {
            validate_server_url(url)?;
        }
        Ok(config)
    }

    /// Resolve a `ClientConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default. Separated from `load()` to enable
    /// unit testing without CLI parsing.
    #[must_use]
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            server_url: cli.server.clone().or_else(|| file.server.url.clone()),
            command_prefix: cli
                .prefix
                .clone()
                .or_else(|| file.input.command_prefix.clone())
                .unwrap_or(defaults.command_prefix),
            reconnect: cli
                .reconnect_secs
                .or(file.server.reconnect_secs)
                .map_or(defaults.reconnect, Duration::from_secs),
            watchdog: cli
                .watchdog_secs
                .or(file.server.watchdog_secs)
                .map_or(defaults.watchdog, Duration::from_secs),
        }
    }

    /// Build [`ClientOptions`] from this configuration and credentials.
    ///
    /// Returns `None` when no server URL is configured.
    #[must_use]
    pub fn to_client_options(&self, credentials: &Credentials) -> Option<ClientOptions> {
        let server_url = self.server_url.clone()?;
        Some(ClientOptions {
            server_url,
            command_prefix: self.command_prefix.clone(),
            reconnect: self.reconnect,
            watchdog: self.watchdog,
            auth_scheme: credentials.scheme.clone(),
            auth_token: credentials.token.clone(),
        })
    }
}

/// Static credentials: authentication scheme and opaque token.
///
/// Obtained out of band; this client only forwards them.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct Credentials {
    /// Authentication scheme name (e.g. `google`).
    pub scheme: String,
    /// Opaque token.
    pub token: String,
}

impl Credentials {
    /// Load credentials from `path`, or `~/.config/wirechat/auth.toml`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed. A
    /// missing credentials file is an error, unlike the config file.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit_path {
            Some(p) => p.to_path_buf(),
            None => dirs::config_dir()
                .ok_or(ConfigError::NoConfigDir)?
                .join("wirechat")
                .join("auth.toml"),
        };
        let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::ReadFile {
            path: path.clone(),
            source,
        })?;
        Ok(toml::from_str(&contents)?)
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Command-line client for the WireChat protocol")]
pub struct CliArgs {
    /// WebSocket URL of the chat server.
    #[arg(long, env = "WIRECHAT_SERVER")]
    pub server: Option<String>,

    /// Command prefix for typed input.
    #[arg(long)]
    pub prefix: Option<String>,

    /// Seconds between reconnection attempts.
    #[arg(long)]
    pub reconnect_secs: Option<u64>,

    /// Seconds of inbound silence before forcing a reconnect.
    #[arg(long)]
    pub watchdog_secs: Option<u64>,

    /// Path to config file (default: `~/.config/wirechat/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to credentials file (default: `~/.config/wirechat/auth.toml`).
    #[arg(long, env = "WIRECHAT_AUTH")]
    pub auth: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "WIRECHAT_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/wirechat.log`).
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and a missing
/// file is treated as empty config.
fn load_config_file(explicit_path: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            // No config dir available; use defaults.
            return Ok(ConfigFile::default());
        };
        config_dir.join("wirechat").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}

fn validate_server_url(url: &str) -> Result<(), ConfigError> {
    let parsed = url::Url::parse(url).map_err(|e| ConfigError::BadServerUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "ws" | "wss" => Ok(()),
        other => Err(ConfigError::BadServerUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme `{other}`"),
        }),
    }
}
