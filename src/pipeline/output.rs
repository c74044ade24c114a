//! Artifact writing.

use super::PipelineError;
use std::fs;
use std::path::{Path, PathBuf};

/// A file produced by a pipeline, relative to the group destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub rel: PathBuf,
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn new(rel: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            rel: rel.into(),
            bytes: bytes.into(),
        }
    }
}

/// Write artifacts under `dest`, creating parent directories as needed.
///
/// Returns the absolute paths written, in input order.
pub fn write_artifacts(dest: &Path, artifacts: &[Artifact]) -> Result<Vec<PathBuf>, PipelineError> {
    let mut written = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        let path = dest.join(&artifact.rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
        }
        fs::write(&path, &artifact.bytes).map_err(|e| PipelineError::io(&path, e))?;
        written.push(path);
    }
    Ok(written)
}
