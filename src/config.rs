//! Configuration module for echo-wire.
//!
//! Supports both command-line arguments and a TOML configuration file.
//! CLI arguments take precedence over config file values.

use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::PathBuf;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "echo-wire")]
#[command(version = "0.1.0")]
#[command(about = "A minimal TCP echo server and one-shot client", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host address (e.g., 127.0.0.1)
    #[arg(long)]
    pub host: Option<String>,

    /// TCP port
    #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..))]
    pub port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: CliCommand,
}

/// Which side of the echo exchange to run
#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Run the echo server
    Serve {
        /// Listen backlog for pending inbound connections
        #[arg(short, long)]
        backlog: Option<u32>,
    },
    /// Connect, send one message, print the echoed reply
    Send {
        /// Message to send
        #[arg(short, long)]
        message: Option<String>,
    },
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// TCP port to bind to
    #[serde(default = "default_port")]
    pub port: u16,
    /// Listen backlog
    #[serde(default = "default_backlog")]
    pub backlog: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            backlog: default_backlog(),
        }
    }
}

/// Client-related configuration
#[derive(Debug, Deserialize)]
pub struct ClientConfig {
    /// Message sent when none is given on the command line
    #[serde(default = "default_message")]
    pub message: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            message: default_message(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    12345
}

fn default_backlog() -> u32 {
    5
}

fn default_message() -> String {
    "Hello, server!".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Process role after CLI resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Serve,
    Send,
}

/// Final resolved configuration, immutable for the process lifetime
#[derive(Debug, Clone)]
pub struct Config {
    pub mode: Mode,
    pub host: String,
    pub port: u16,
    pub backlog: u32,
    pub message: String,
    pub log_level: String,
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        let cli = CliArgs::parse();

        // Load TOML config if specified
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        Ok(Self::resolve(cli, toml_config))
    }

    /// Merge CLI args with TOML config (CLI takes precedence).
    fn resolve(cli: CliArgs, toml_config: TomlConfig) -> Self {
        let (mode, backlog, message) = match cli.command {
            CliCommand::Serve { backlog } => (
                Mode::Serve,
                backlog.unwrap_or(toml_config.server.backlog),
                toml_config.client.message,
            ),
            CliCommand::Send { message } => (
                Mode::Send,
                toml_config.server.backlog,
                message.unwrap_or(toml_config.client.message),
            ),
        };

        Config {
            mode,
            host: cli.host.unwrap_or(toml_config.server.host),
            port: cli.port.unwrap_or(toml_config.server.port),
            backlog,
            message,
            log_level: if cli.log_level != "info" {
                cli.log_level
            } else {
                toml_config.logging.level
            },
        }
    }

    /// The `host:port` address this config points at.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    FileRead(PathBuf, std::io::Error),
    TomlParse(PathBuf, toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileRead(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::TomlParse(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TomlConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 12345);
        assert_eq!(config.server.backlog, 5);
        assert_eq!(config.client.message, "Hello, server!");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
            [server]
            host = "0.0.0.0"
            port = 9000
            backlog = 16

            [client]
            message = "ping"

            [logging]
            level = "debug"
        "#;

        let config: TomlConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.backlog, 16);
        assert_eq!(config.client.message, "ping");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_cli_overrides_toml() {
        let cli = CliArgs::try_parse_from([
            "echo-wire",
            "--host",
            "10.0.0.1",
            "--port",
            "7777",
            "serve",
            "--backlog",
            "32",
        ])
        .unwrap();

        let toml_config: TomlConfig = toml::from_str(
            r#"
            [server]
            host = "0.0.0.0"
            port = 9000
            backlog = 16
        "#,
        )
        .unwrap();

        let config = Config::resolve(cli, toml_config);
        assert_eq!(config.mode, Mode::Serve);
        assert_eq!(config.host, "10.0.0.1");
        assert_eq!(config.port, 7777);
        assert_eq!(config.backlog, 32);
    }

    #[test]
    fn test_toml_fills_cli_gaps() {
        let cli = CliArgs::try_parse_from(["echo-wire", "send"]).unwrap();

        let toml_config: TomlConfig = toml::from_str(
            r#"
            [server]
            port = 9000

            [client]
            message = "from the file"
        "#,
        )
        .unwrap();

        let config = Config::resolve(cli, toml_config);
        assert_eq!(config.mode, Mode::Send);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9000);
        assert_eq!(config.message, "from the file");
    }

    #[test]
    fn test_port_zero_rejected() {
        let result = CliArgs::try_parse_from(["echo-wire", "--port", "0", "serve"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_address() {
        let cli = CliArgs::try_parse_from(["echo-wire", "serve"]).unwrap();
        let config = Config::resolve(cli, TomlConfig::default());
        assert_eq!(config.address(), "127.0.0.1:12345");
    }
}
