//! SilentMatch configuration file handling
//!
//! Provides default configuration generation and loading for the consortium
//! node. Configuration files are TOML. A missing file is created with
//! defaults the first time any command runs.
//!
//! Only deployment settings live here. Key material, client credentials and
//! ledgers are node state and are kept in the data directory.

use serde::{Deserialize, Serialize};
use silentmatch::persistence::DataDir;
use silentmatch::protocol::ProtocolCoordinator;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Default log level
const DEFAULT_LOG_LEVEL: &str = "info";

/// SilentMatch node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SilentMatchConfig {
    /// Where node state is stored
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding server_keys.json, authorized_clients.json and ledgers/
    pub data_dir: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl SilentMatchConfig {
    /// Create a new configuration with the given data directory
    #[cfg(test)]
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            storage: StorageConfig { data_dir },
            logging: LoggingConfig::default(),
        }
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;

        let config: SilentMatchConfig = toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse config file '{}': {}", path.display(), e))?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    #[cfg(test)]
    pub fn save(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        fs::write(path, contents)
            .map_err(|e| format!("Failed to write config file '{}': {}", path.display(), e))?;

        Ok(())
    }

    /// Generate default configuration content as a string with comments
    pub fn generate_default_toml(data_dir: &Path) -> String {
        format!(
            r#"# SilentMatch Node Configuration
#
# Deployment settings only. Server keys, client credentials and ledgers are
# node state and live in the data directory below.

[storage]
# Holds server_keys.json, authorized_clients.json and ledgers/v<N>.json
data_dir = "{data_dir}"

[logging]
# Log level: trace, debug, info, warn, error
# RUST_LOG overrides this when set
level = "info"
"#,
            data_dir = data_dir.display()
        )
    }

    /// Create and save a default configuration file
    pub fn create_default(
        config_path: &Path,
        data_dir: &Path,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let contents = Self::generate_default_toml(data_dir);

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        fs::write(config_path, contents).map_err(|e| {
            format!(
                "Failed to write config file '{}': {}",
                config_path.display(),
                e
            )
        })?;

        Ok(())
    }

    /// Load the config at `path` (or the default location), creating it first
    /// if it does not exist.
    pub fn load_or_create(path: Option<&str>) -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = path.map(PathBuf::from).unwrap_or_else(default_config_path);
        if !config_path.exists() {
            Self::create_default(&config_path, &default_data_dir())?;
        }
        Self::load(&config_path)
    }
}

/// Get the default data directory
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("silentmatch")
}

/// Get the default config file path
///
/// - Config: ~/.config/silentmatch/config.toml
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("silentmatch")
        .join("config.toml")
}

/// Install the global tracing subscriber.
///
/// Logs go to stderr so command output on stdout stays clean.
pub fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.as_str()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Load configuration, start logging and open the node's state.
pub fn open_node(config: Option<String>) -> Result<ProtocolCoordinator, Box<dyn std::error::Error>> {
    let config = SilentMatchConfig::load_or_create(config.as_deref())?;
    init_logging(&config.logging);

    let dir = DataDir::open(&config.storage.data_dir)?;
    Ok(ProtocolCoordinator::open(dir)?)
}

/// Write a config under `root` whose data directory is `root/state`.
#[cfg(test)]
pub fn write_test_config(root: &Path) -> String {
    let config_path = root.join("config.toml");
    SilentMatchConfig::new(root.join("state"))
        .save(&config_path)
        .unwrap();
    config_path.display().to_string()
}
