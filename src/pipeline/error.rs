//! Pipeline error types.

use crate::config::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a pipeline run.
///
/// Compile errors in individual sources are not listed here, they are
/// collected in [`RunReport::failures`](super::RunReport) instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("IO error at `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("`{}` is already produced by the html group", path.display())]
    OutputCollision { path: PathBuf },
}

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_io_error_keeps_source() {
        let err = PipelineError::io("dist/css", Error::new(ErrorKind::PermissionDenied, "denied"));
        assert!(err.to_string().contains("dist/css"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_collision_display() {
        let err = PipelineError::OutputCollision {
            path: PathBuf::from("dist/main.min.html"),
        };
        assert!(err.to_string().contains("html group"));
    }
}
