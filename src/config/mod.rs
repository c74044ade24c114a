//! Project configuration from `assetflow.toml`.
//!
//! ```text
//! config/
//! ├── section/       # One module per TOML section
//! ├── error.rs       # ConfigError
//! └── mod.rs         # AssetflowConfig (this file)
//! ```
//!
//! A missing config file is not an error: every section has defaults that
//! reproduce the conventional `src/` → `dist/` layout.

mod error;
pub mod section;

pub use error::ConfigError;
pub use section::{
    CleanConfig, ImagesConfig, MarkupConfig, PathConfig, ScriptsConfig, ServeConfig, StylesConfig,
};

use crate::core::AssetGroup;
use crate::source::SourceSet;
use crate::utils::path::{is_within, lexical_normalize, normalize_path};
use crate::{debug, log};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Default config file name, looked up in the project root.
pub const CONFIG_FILE: &str = "assetflow.toml";

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing assetflow.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetflowConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory; all relative paths resolve against it
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub paths: PathConfig,

    #[serde(default)]
    pub clean: CleanConfig,

    #[serde(default)]
    pub styles: StylesConfig,

    #[serde(default)]
    pub scripts: ScriptsConfig,

    #[serde(default)]
    pub images: ImagesConfig,

    #[serde(default)]
    pub markup: MarkupConfig,

    #[serde(default)]
    pub serve: ServeConfig,
}

impl AssetflowConfig {
    /// Load and validate configuration for the project at `root`.
    ///
    /// `config_file` is resolved against `root` when relative.
    pub fn load(root: &Path, config_file: &Path) -> Result<Self, ConfigError> {
        let root = normalize_path(root);
        let config_path = if config_file.is_absolute() {
            config_file.to_path_buf()
        } else {
            root.join(config_file)
        };

        let mut config = if config_path.is_file() {
            Self::from_path(&config_path)?
        } else {
            debug!("config"; "{} not found, using defaults", config_path.display());
            Self::default()
        };

        config.config_path = config_path;
        config.root = root;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warn"; "unknown fields in {}, ignoring: {}", display_path, fields.join(", "));
    }

    // ========================================================================
    // path helpers
    // ========================================================================

    /// Join a path with the root directory.
    pub fn root_join(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(path)
    }

    /// Get path relative to the project root
    pub fn root_relative(&self, path: impl AsRef<Path>) -> PathBuf {
        path.as_ref()
            .strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.as_ref().to_path_buf())
    }

    /// Absolute output root.
    pub fn output_dir(&self) -> PathBuf {
        self.root_join(&self.paths.output)
    }

    /// Absolute destination directory of a group.
    pub fn dest_dir(&self, group: AssetGroup) -> PathBuf {
        self.root_join(&self.paths.entry(group).dest)
    }

    /// URL path of a group artifact relative to the output root.
    ///
    /// `dist/css` + `main.min.css` -> `/css/main.min.css`
    pub fn public_url(&self, group: AssetGroup, file_name: &str) -> String {
        let dest = lexical_normalize(&self.paths.entry(group).dest);
        let output = lexical_normalize(&self.paths.output);
        let rel = dest.strip_prefix(&output).unwrap_or(&dest);
        let dir = crate::utils::path::display_slash(rel);
        if dir.is_empty() {
            format!("/{file_name}")
        } else {
            format!("/{dir}/{file_name}")
        }
    }

    /// Absolute directory served by the dev server.
    pub fn serve_root(&self) -> PathBuf {
        self.root_join(&self.serve.root)
    }

    /// Compiled source globs of a group.
    pub fn source_set(&self, group: AssetGroup) -> Result<SourceSet, ConfigError> {
        SourceSet::new(group, &self.root, &self.paths.entry(group).sources)
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate the loaded configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let output = lexical_normalize(&self.paths.output);
        if output.as_os_str().is_empty() || output.is_absolute() || output.starts_with("..") {
            return Err(ConfigError::Validation(format!(
                "[paths] output `{}` must be a sub-directory of the project root",
                self.paths.output.display()
            )));
        }

        for group in AssetGroup::ALL {
            let entry = self.paths.entry(group);
            let dest = lexical_normalize(&entry.dest);
            if dest != output && !is_within(&dest, &output) {
                return Err(ConfigError::DestOutsideOutput {
                    group,
                    dest: entry.dest.clone(),
                    output: self.paths.output.clone(),
                });
            }
            self.source_set(group)?;
        }

        if let Some(name) = self.clean.preserve.iter().find(|n| n.contains(['/', '\\'])) {
            return Err(ConfigError::Validation(format!(
                "[clean] preserve entry `{name}` must be a plain directory name"
            )));
        }

        if self.styles.basename.is_empty() || self.markup.basename.is_empty() {
            return Err(ConfigError::Validation("output basename must not be empty".into()));
        }
        if let Some(cmd) = self.styles.commands.for_dialect(self.styles.dialect)
            && cmd.is_empty()
        {
            return Err(ConfigError::Validation(format!(
                "[styles.commands] {} command is empty",
                self.styles.dialect.name()
            )));
        }
        crate::pipeline::style::browser_targets(&self.styles.browsers)
            .map_err(|e| ConfigError::Validation(format!("[styles] browsers: {e}")))?;

        crate::pipeline::script::target_options(&self.scripts.target)
            .map_err(|e| ConfigError::Validation(format!("[scripts] target: {e}")))?;

        if !(1..=100).contains(&self.images.jpeg_quality) {
            return Err(ConfigError::Validation(
                "[images] jpeg_quality must be between 1 and 100".into(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config and panic on unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> AssetflowConfig {
    let (parsed, ignored) = AssetflowConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

/// Default config rooted at `root`, for pipeline tests.
#[cfg(test)]
pub fn test_config_at(root: &Path) -> AssetflowConfig {
    AssetflowConfig {
        root: root.to_path_buf(),
        ..AssetflowConfig::default()
    }
}

// ============================================================================
// tests
// ============================================================================
