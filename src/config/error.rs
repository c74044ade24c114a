//! Configuration error types.

use crate::core::AssetGroup;
use std::path::PathBuf;
use thiserror::Error;

/// Configuration-related errors. All of them abort before any task runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error when reading `{}`", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("config file parsing error")]
    Toml(#[from] toml::de::Error),

    #[error("invalid glob `{pattern}` in [paths.{group}]: {message}")]
    Glob {
        group: AssetGroup,
        pattern: String,
        message: String,
    },

    #[error(
        "[paths.{group}] dest `{}` is outside the output root `{}`",
        dest.display(),
        output.display()
    )]
    DestOutsideOutput {
        group: AssetGroup,
        dest: PathBuf,
        output: PathBuf,
    },

    #[error("config validation error: {0}")]
    Validation(String),
}
