//! Loading [`SimConfig`] from YAML.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sim_core::{validate_config, ConfigError, SimConfig};
use thiserror::Error;

pub const BUILTIN_CONFIG: &str = include_str!("data/end_of_month.yaml");

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("failed to read config from {path:?}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(#[from] ConfigError),
}

/// The configuration shipped with the engine.
pub fn builtin_config() -> SimConfig {
    serde_yaml::from_str(BUILTIN_CONFIG).expect("builtin end-of-month config should parse")
}

pub fn config_from_yaml_str(yaml: &str) -> Result<SimConfig, ConfigLoadError> {
    let cfg: SimConfig = serde_yaml::from_str(yaml)?;
    validate_config(&cfg)?;
    Ok(cfg)
}

pub fn config_from_file(path: &Path) -> Result<SimConfig, ConfigLoadError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigLoadError::ReadFailed {
        path: path.to_path_buf(),
        source,
    })?;
    config_from_yaml_str(&contents)
}
