use serde::{Deserialize, Serialize};

use super::errors::ConfigError;
use super::ingest::IngestConfig;
use super::logging::LoggingConfig;
use super::output::OutputConfig;
use super::server::ServerConfig;
use crate::dnstap::MESSAGE_TYPES;
use crate::frame::MAX_CONTROL_FRAME_LENGTH;

const LOCAL_CONFIG_PATH: &str = "ferrous-tap.toml";
const SYSTEM_CONFIG_PATH: &str = "/etc/ferrous-tap/config.toml";

/// Main configuration structure for Ferrous Tap
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Listening socket and framing limits
    #[serde(default)]
    pub server: ServerConfig,

    /// Handshake and dispatch behaviour
    #[serde(default)]
    pub ingest: IngestConfig,

    /// JSON record output
    #[serde(default)]
    pub output: OutputConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file or use defaults
    ///
    /// Priority order:
    /// 1. Explicitly provided path
    /// 2. ferrous-tap.toml in current directory
    /// 3. /etc/ferrous-tap/config.toml
    /// 4. Default configuration
    pub fn load(path: Option<&str>, cli_overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = path {
            Self::from_file(path)?
        } else if let Some(path) = Self::get_config_path() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };

        config.apply_cli_overrides(cli_overrides);
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;
        Self::from_toml_str(&contents)
    }

    /// Apply command-line overrides to configuration
    fn apply_cli_overrides(&mut self, overrides: CliOverrides) {
        if let Some(socket) = overrides.socket_path {
            self.server.socket_path = socket;
        }
        if let Some(content_type) = overrides.content_type {
            self.ingest.content_type = Some(content_type);
        }
        if let Some(mode) = overrides.dispatch_mode {
            self.ingest.dispatch_mode = mode;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        if !overrides.message_types.is_empty() {
            self.output.message_types = overrides.message_types;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.socket_path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Socket path cannot be empty".to_string(),
            ));
        }

        if self.server.recv_size == 0 {
            return Err(ConfigError::Validation(
                "recv_size must be greater than 0".to_string(),
            ));
        }

        if self.server.max_frame_size < MAX_CONTROL_FRAME_LENGTH {
            return Err(ConfigError::Validation(format!(
                "max_frame_size must be at least {} bytes",
                MAX_CONTROL_FRAME_LENGTH
            )));
        }

        if self.ingest.max_in_flight == 0 {
            return Err(ConfigError::Validation(
                "max_in_flight must be greater than 0".to_string(),
            ));
        }

        for name in &self.output.message_types {
            if !MESSAGE_TYPES.contains(&name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "Unknown message type '{}'",
                    name
                )));
            }
        }

        Ok(())
    }

    /// Get the path to the configuration file being used
    pub fn get_config_path() -> Option<String> {
        if std::path::Path::new(LOCAL_CONFIG_PATH).exists() {
            Some(LOCAL_CONFIG_PATH.to_string())
        } else if std::path::Path::new(SYSTEM_CONFIG_PATH).exists() {
            Some(SYSTEM_CONFIG_PATH.to_string())
        } else {
            None
        }
    }
}

/// Command-line overrides for configuration
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub socket_path: Option<String>,
    pub content_type: Option<String>,
    pub dispatch_mode: Option<super::ingest::DispatchMode>,
    pub log_level: Option<String>,
    pub message_types: Vec<String>,
}
