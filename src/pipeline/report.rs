//! Outcome of one pipeline run.

use super::SizeReport;
use crate::core::AssetGroup;
use crate::log;
use crate::utils::path::display_slash;
use crate::utils::plural::plural_count;
use std::path::{Path, PathBuf};

/// A source file that failed to compile or transform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    /// Root-relative path of the offending source.
    pub path: PathBuf,
    pub message: String,
}

/// Stylesheet pushed to browsers instead of a full reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectedCss {
    /// URL path of the stylesheet as served, e.g. `/css/main.min.css`.
    pub path: String,
    pub content: String,
}

#[derive(Debug)]
pub struct RunReport {
    pub group: AssetGroup,
    /// Number of sources the run considered.
    pub sources: usize,
    /// Files written, absolute.
    pub written: Vec<PathBuf>,
    /// Sources left untouched because their output is up to date.
    pub skipped: usize,
    pub failures: Vec<FileFailure>,
    pub sizes: SizeReport,
    pub injected: Option<InjectedCss>,
}

impl RunReport {
    pub fn new(group: AssetGroup) -> Self {
        Self {
            group,
            sources: 0,
            written: Vec::new(),
            skipped: 0,
            failures: Vec::new(),
            sizes: SizeReport::default(),
            injected: None,
        }
    }

    /// Record and log a per-file failure.
    pub fn fail(&mut self, path: &Path, message: impl Into<String>) {
        let message = message.into();
        log!("error"; "{}: {}", display_slash(path), message);
        self.failures.push(FileFailure {
            path: path.to_path_buf(),
            message,
        });
    }

    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }

    /// All failures joined into one message, for the browser overlay.
    pub fn error_message(&self) -> Option<String> {
        if self.failures.is_empty() {
            return None;
        }
        let lines: Vec<String> = self
            .failures
            .iter()
            .map(|f| format!("{}: {}", display_slash(&f.path), f.message))
            .collect();
        Some(lines.join("\n\n"))
    }

    pub fn log_summary(&self) {
        let group = self.group.name();
        if !self.is_ok() {
            log!(group; "{} failed, nothing written", plural_count(self.failures.len(), "file"));
            return;
        }
        if self.sources == 0 {
            log!(group; "no sources");
            return;
        }
        if self.written.is_empty() {
            log!(group; "up to date ({})", plural_count(self.skipped, "file"));
            return;
        }
        self.sizes.log(group);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fail_collects_message() {
        let mut report = RunReport::new(AssetGroup::Styles);
        assert!(report.is_ok());
        assert_eq!(report.error_message(), None);

        report.fail(Path::new("src/styles/a.scss"), "Undefined variable");
        report.fail(Path::new("src/styles/b.scss"), "expected \";\"");

        assert!(!report.is_ok());
        let message = report.error_message().unwrap();
        assert!(message.starts_with("src/styles/a.scss: Undefined variable"));
        assert!(message.contains("src/styles/b.scss"));
    }
}
