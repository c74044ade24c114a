//! Output root cleanup.

use super::PipelineError;
use crate::config::AssetflowConfig;
use crate::utils::plural::plural_count;
use crate::{debug, log};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Delete everything under the output root except preserved directories.
pub fn run(config: &AssetflowConfig) -> Result<usize, PipelineError> {
    let output = config.output_dir();
    let removed = clean_output(&output, &config.clean.preserve)?;
    log!(
        "clean";
        "removed {} from {}",
        plural_count(removed, "item"),
        config.root_relative(&output).display()
    );
    Ok(removed)
}

/// Remove the children of `output` whose name is not a preserved directory.
///
/// A missing output root is not an error. Returns the number of removed
/// top-level entries.
pub fn clean_output(output: &Path, preserve: &[String]) -> Result<usize, PipelineError> {
    let entries = match fs::read_dir(output) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("clean"; "{} does not exist", output.display());
            return Ok(0);
        }
        Err(e) => return Err(PipelineError::io(output, e)),
    };

    let mut removed = 0;
    for entry in entries {
        let entry = entry.map_err(|e| PipelineError::io(output, e))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| PipelineError::io(&path, e))?;

        if file_type.is_dir() && preserve.iter().any(|name| entry.file_name() == name.as_str()) {
            debug!("clean"; "keeping {}", path.display());
            continue;
        }

        let result = if file_type.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        result.map_err(|e| PipelineError::io(&path, e))?;
        removed += 1;
    }
    Ok(removed)
}
