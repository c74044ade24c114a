//! `[paths]` section configuration.
//!
//! Maps every asset group to its ordered source globs and destination.
//!
//! ```toml
//! [paths]
//! output = "dist"
//!
//! [paths.styles]
//! sources = ["src/styles/**/*.scss"]
//! dest = "dist/css"
//! ```
//!
//! A group table replaces the default entry as a whole, so both `sources`
//! and `dest` are required when one is given.

use crate::core::AssetGroup;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Source globs plus destination directory for one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathEntry {
    /// Glob patterns relative to the project root, expanded in order.
    pub sources: Vec<String>,
    /// Destination directory relative to the project root.
    pub dest: PathBuf,
}

impl PathEntry {
    fn new(sources: &[&str], dest: &str) -> Self {
        Self {
            sources: sources.iter().map(|s| (*s).to_string()).collect(),
            dest: PathBuf::from(dest),
        }
    }
}

/// One entry per asset group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    /// Output root every destination must live under.
    pub output: PathBuf,
    pub template: PathEntry,
    pub html: PathEntry,
    pub styles: PathEntry,
    pub scripts: PathEntry,
    pub images: PathEntry,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("dist"),
            template: PathEntry::new(&["src/*.pug"], "dist"),
            html: PathEntry::new(&["src/*.html"], "dist"),
            styles: PathEntry::new(
                &[
                    "src/styles/**/*.sass",
                    "src/styles/**/*.scss",
                    "src/styles/**/*.less",
                    "src/styles/**/*.styl",
                ],
                "dist/css",
            ),
            scripts: PathEntry::new(&["src/scripts/**/*.js"], "dist/js"),
            images: PathEntry::new(&["src/img/**"], "dist/img"),
        }
    }
}

impl PathConfig {
    pub fn entry(&self, group: AssetGroup) -> &PathEntry {
        match group {
            AssetGroup::Template => &self.template,
            AssetGroup::Html => &self.html,
            AssetGroup::Styles => &self.styles,
            AssetGroup::Scripts => &self.scripts,
            AssetGroup::Images => &self.images,
        }
    }
}
