//! Configuration for sentinel-daemon

use std::path::Path;

use sentinel_core::SystemConfig;
use serde::{Deserialize, Serialize};

use crate::error::{DaemonError, DaemonResult};

/// Environment variable prefix, e.g. `SENTINEL_SYSTEM__MODE=test`.
pub const ENV_PREFIX: &str = "SENTINEL";

/// Keys a configuration file must set itself rather than inherit from defaults.
pub const REQUIRED_FILE_KEYS: [&str; 2] = ["system.mode", "system.defense_level"];

/// Main daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Orchestrator configuration
    #[serde(default)]
    pub system: SystemConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl DaemonConfig {
    /// Load configuration: defaults, then `path` if given, then
    /// `SENTINEL_`-prefixed environment variables.
    ///
    /// Nested keys are separated by a double underscore in the environment.
    pub fn load(path: Option<&Path>) -> DaemonResult<Self> {
        let mut builder = config::Config::builder();

        // Add default configuration
        builder = builder.add_source(config::Config::try_from(&DaemonConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: DaemonConfig = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Check that the file at `path` sets every key in [`REQUIRED_FILE_KEYS`].
    pub fn require_explicit_keys(path: &Path) -> DaemonResult<()> {
        let raw = config::Config::builder()
            .add_source(config::File::from(path).required(true))
            .build()?;

        let missing: Vec<&str> = REQUIRED_FILE_KEYS
            .iter()
            .copied()
            .filter(|key| raw.get_string(key).is_err())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(DaemonError::Config(format!(
                "{}: missing required field(s) {}",
                path.display(),
                missing.join(", ")
            )))
        }
    }

    /// Load and reject configurations the orchestrator cannot run with.
    pub fn load_validated(path: Option<&Path>) -> DaemonResult<Self> {
        let config = Self::load(path)?;
        config
            .system
            .validate()
            .map_err(|e| DaemonError::Config(e.to_string()))?;
        Ok(config)
    }
}
