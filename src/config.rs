//! Configuration loading, validation, and management.
//!
//! Priority (highest to lowest): command-line arguments, configuration
//! file, environment variables, built-in defaults.

use std::fmt;
use std::path::Path;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::Result;

/// Ports below this are reserved or privileged and are rejected at startup.
pub const PORT_MIN: u16 = 1024;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listening port; supplied on the command line and validated against
    /// [`PORT_MIN`]..=65535 before any bind is attempted.
    pub port: u16,
    pub bind_host: String,
    /// Local identity prefixed to every outgoing line. Fixed for the
    /// process lifetime.
    pub handle: String,
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 0,
            bind_host: "0.0.0.0".to_string(),
            handle: "SERVER".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Error produced when the port argument is not an integer in
/// [`PORT_MIN`]..=65535.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortRangeError;

impl fmt::Display for PortRangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Port must be a number between {} and 65535.", PORT_MIN)
    }
}

impl std::error::Error for PortRangeError {}

/// Parses and range-checks the port argument. This is a startup
/// precondition: a port that fails here must never reach a bind call.
pub fn parse_port(raw: &str) -> std::result::Result<u16, PortRangeError> {
    match raw.parse::<u32>() {
        Ok(port) if (u32::from(PORT_MIN)..=u32::from(u16::MAX)).contains(&port) => Ok(port as u16),
        _ => Err(PortRangeError),
    }
}

/// Manages configuration loading and validation
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration from file
    pub fn load_from_file(path: &Path) -> Result<Config> {
        if path.exists() {
            tracing::debug!("loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file: {}", path.display()))?;

            let config: Config = toml::from_str(&content)
                .with_context(|| format!("failed to parse config file: {}", path.display()))?;

            Ok(config)
        } else {
            tracing::debug!(
                "configuration file not found at {}, using defaults",
                path.display()
            );
            Ok(Config::default())
        }
    }

    /// Load configuration from environment variables
    pub fn load_from_env() -> Result<Config> {
        let mut config = Config::default();

        if let Ok(bind_host) = std::env::var("CHATSERVE_BIND_HOST") {
            config.server.bind_host = bind_host;
        }

        if let Ok(handle) = std::env::var("CHATSERVE_HANDLE") {
            config.server.handle = handle;
        }

        if let Ok(log_level) = std::env::var("CHATSERVE_LOG_LEVEL") {
            config.server.log_level = log_level;
        }

        Ok(config)
    }
}

impl Config {
    /// Validate the configuration after all overrides have been applied.
    pub fn validate(&self) -> Result<()> {
        if self.server.port < PORT_MIN {
            bail!("{}", PortRangeError);
        }

        if self.server.bind_host.is_empty() {
            bail!("bind_host must not be empty");
        }

        if self.server.handle.is_empty() {
            bail!("handle must not be empty");
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.server.log_level.as_str()) {
            bail!(
                "log_level must be one of: {}",
                valid_log_levels.join(", ")
            );
        }

        Ok(())
    }

    /// Merge with CLI arguments
    pub fn merge_with_cli_args(&mut self, port: u16, log_level: Option<&str>) {
        self.server.port = port;
        tracing::debug!("CLI override: port set to {}", port);

        if let Some(level) = log_level {
            self.server.log_level = level.to_string();
            tracing::debug!("CLI override: log level set to {}", level);
        }
    }

    /// Address string handed to the TCP bind call.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.bind_host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_port_accepts_registered_range() {
        assert_eq!(parse_port("1024"), Ok(1024));
        assert_eq!(parse_port("5000"), Ok(5000));
        assert_eq!(parse_port("65535"), Ok(65535));
    }

    #[test]
    fn parse_port_rejects_out_of_range() {
        assert_eq!(parse_port("0"), Err(PortRangeError));
        assert_eq!(parse_port("80"), Err(PortRangeError));
        assert_eq!(parse_port("1023"), Err(PortRangeError));
        assert_eq!(parse_port("65536"), Err(PortRangeError));
        assert_eq!(parse_port("70000"), Err(PortRangeError));
    }

    #[test]
    fn parse_port_rejects_non_numeric() {
        assert_eq!(parse_port("notanumber"), Err(PortRangeError));
        assert_eq!(parse_port(""), Err(PortRangeError));
        assert_eq!(parse_port("-1"), Err(PortRangeError));
        assert_eq!(parse_port("50 00"), Err(PortRangeError));
    }

    #[test]
    fn range_error_message_names_the_bounds() {
        assert_eq!(
            PortRangeError.to_string(),
            "Port must be a number between 1024 and 65535."
        );
    }

    #[test]
    fn validate_rejects_unmerged_port() {
        let config = Config::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_accepts_merged_config() {
        let mut config = Config::default();
        config.merge_with_cli_args(5000, None);
        assert!(config.validate().is_ok());
        assert_eq!(config.bind_addr(), "0.0.0.0:5000");
    }

    #[test]
    fn validate_rejects_empty_handle() {
        let mut config = Config::default();
        config.merge_with_cli_args(5000, None);
        config.server.handle.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_unknown_log_level() {
        let mut config = Config::default();
        config.merge_with_cli_args(5000, Some("loud"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_from_file_reads_toml() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            "[server]\nbind_host = \"127.0.0.1\"\nhandle = \"OPS\"\n"
        )
        .expect("write config");

        let config = ConfigManager::load_from_file(file.path()).expect("load config");
        assert_eq!(config.server.bind_host, "127.0.0.1");
        assert_eq!(config.server.handle, "OPS");
        // Unset fields keep their defaults.
        assert_eq!(config.server.log_level, "warn");
    }

    #[test]
    fn load_from_file_rejects_malformed_toml() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[server\nport = oops").expect("write config");

        assert!(ConfigManager::load_from_file(file.path()).is_err());
    }

    #[test]
    fn load_from_missing_file_falls_back_to_defaults() {
        let config = ConfigManager::load_from_file(Path::new("/nonexistent/chatserve.toml"))
            .expect("defaults");
        assert_eq!(config.server.handle, "SERVER");
    }
}
