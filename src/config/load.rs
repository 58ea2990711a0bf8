//! Configuration loading.
//!
//! The embedded defaults are always the bottom layer. A config file and
//! `MARKPANE_*` environment variables are layered on top before the result
//! is deserialized and validated.

use std::path::{Path, PathBuf};

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};

use super::{ConfigError, MarkpaneConfig};

const DEFAULT_YAML: &str = include_str!("../../defaults/markpane.default.yaml");

/// The config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "markpane.yaml";

/// The embedded default configuration, as written by `markpane init`.
pub fn default_yaml() -> &'static str {
    DEFAULT_YAML
}

/// Layers configuration sources over the embedded defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
    environment: Environment,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_YAML, FileFormat::Yaml));
        Self {
            builder,
            environment: Environment::with_prefix("MARKPANE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Yaml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Read environment overrides from `vars` instead of the process
    /// environment.
    #[cfg(test)]
    fn with_env_vars(mut self, vars: &[(&str, &str)]) -> Self {
        let map = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.environment = self.environment.source(Some(map));
        self
    }

    /// Finalize the layers, deserialize and validate.
    pub fn build(self) -> Result<MarkpaneConfig, ConfigError> {
        let config: MarkpaneConfig = self
            .builder
            .add_source(self.environment)
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkpaneConfig {
    /// Load the config from the command line argument.
    ///
    /// An explicit file must exist. Without one, `markpane.yaml` in the
    /// working directory is used when present.
    pub fn load_from_arg(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        match resolve_config_path(config_file)? {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading config");
                Loader::new().with_file(&path).build()
            }
            None => Loader::new().build(),
        }
    }
}

/// The absolute path of the config file in use, if any.
///
/// Follows the same lookup as [`MarkpaneConfig::load_from_arg`].
pub fn resolve_config_path(config_file: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
    match config_file {
        Some(path) => {
            let path = absolute(path)?;
            if !path.is_file() {
                return Err(ConfigError::NotFound(path));
            }
            Ok(Some(path))
        }
        None => {
            let path = absolute(Path::new(DEFAULT_CONFIG_FILE))?;
            Ok(path.is_file().then_some(path))
        }
    }
}

fn absolute(path: &Path) -> Result<PathBuf, ConfigError> {
    if path.is_relative() {
        Ok(std::env::current_dir()
            .map_err(ConfigError::CwdFailure)?
            .join(path))
    } else {
        Ok(path.to_path_buf())
    }
}
