use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that stop watch mode from starting.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to bind {server} server starting at port {port}: {source}")]
    Bind {
        server: &'static str,
        port: u16,
        #[source]
        source: BoxError,
    },

    #[error("failed to create file watcher: {0}")]
    Notify(#[source] notify::Error),

    #[error("failed to watch {}: {source}", path.display())]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl WatchError {
    pub fn bind(server: &'static str, port: u16, source: impl Into<BoxError>) -> Self {
        Self::Bind {
            server,
            port,
            source: source.into(),
        }
    }
}
