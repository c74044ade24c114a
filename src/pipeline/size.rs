//! Byte-size metrics.

use crate::log;
use crate::utils::path::display_slash;
use crate::utils::plural::human_bytes;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeEntry {
    /// Root-relative output path.
    pub path: PathBuf,
    /// Bytes before the pipeline ran (sum of sources for bundles).
    pub original: u64,
    /// Bytes written.
    pub output: u64,
}

/// Sizes of every artifact written by one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SizeReport {
    pub entries: Vec<SizeEntry>,
}

impl SizeReport {
    pub fn record(&mut self, path: impl Into<PathBuf>, original: u64, output: u64) {
        self.entries.push(SizeEntry {
            path: path.into(),
            original,
            output,
        });
    }

    pub fn total_original(&self) -> u64 {
        self.entries.iter().map(|e| e.original).sum()
    }

    pub fn total_output(&self) -> u64 {
        self.entries.iter().map(|e| e.output).sum()
    }

    /// Bytes saved across all entries, never negative.
    pub fn saved(&self) -> u64 {
        self.total_original().saturating_sub(self.total_output())
    }

    pub fn log(&self, module: &str) {
        match self.entries.as_slice() {
            [] => {}
            [entry] => log!(
                module;
                "{} {} (from {})",
                display_slash(&entry.path),
                human_bytes(entry.output),
                human_bytes(entry.original)
            ),
            entries => log!(
                module;
                "{} files, {} (saved {})",
                entries.len(),
                human_bytes(self.total_output()),
                human_bytes(self.saved())
            ),
        }
    }
}
