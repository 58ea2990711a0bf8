//! Configuration loading and types for markpane.
//!
//! This module handles all aspects of configuration:
//! - Type definitions for config structures (`types`)
//! - Layered loading from defaults, files and the environment (`load`)

mod load;
mod types;

pub use load::{DEFAULT_CONFIG_FILE, Loader, default_yaml, resolve_config_path};
pub use types::{LibraryConfig, MarkpaneConfig, PlantumlConfig, ShellConfig, Theme, WatchConfig};

// =============================================================================
// Errors
// =============================================================================

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(#[from] config::ConfigError),

    #[error("failed to get current working directory: {0}")]
    CwdFailure(std::io::Error),

    #[error("config file not found: {0}")]
    NotFound(std::path::PathBuf),

    #[error("{0}")]
    Validation(String),
}

impl MarkpaneConfig {
    /// Check values that deserialize fine but cannot be used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.watch.poll && self.watch.poll_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "invalid config: 'watch.poll_interval_ms' must be greater than zero when polling"
                    .to_string(),
            ));
        }
        if self.shell.plantuml.enabled && self.shell.plantuml.server.is_none() {
            return Err(ConfigError::Validation(
                "invalid config: 'shell.plantuml.server' is required when PlantUML is enabled\n\nExample:\n  shell:\n    plantuml:\n      server: https://www.plantuml.com/plantuml/svg/".to_string(),
            ));
        }
        Ok(())
    }
}
