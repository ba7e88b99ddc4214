use std::fs;
use std::path::{Path, PathBuf};

use crate::model::config::Config;

pub const CONFIG_FILE: &str = "boardsync.toml";

/// Error type for config loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Read `boardsync.toml` from the board directory. A missing file yields
/// the defaults.
pub fn read_config(board_dir: &Path) -> Result<Config, ConfigError> {
    let path = board_dir.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(Config::default());
    }
    let text = fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
        path: path.clone(),
        source: e,
    })?;
    toml::from_str(&text).map_err(|e| ConfigError::ParseError { path, source: e })
}
