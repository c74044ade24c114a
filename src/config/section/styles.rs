//! `[styles]` section configuration.
//!
//! ```toml
//! [styles]
//! dialect = "sass"                 # sass | less | stylus | css
//! browsers = ["defaults"]          # browserslist queries for prefixing
//! basename = "main"                # -> main.min.css
//! source_map = true
//!
//! [styles.commands]
//! sass = ["sass", "--embed-source-map", "--embed-sources", "$INPUT"]
//! ```
//!
//! `$INPUT` in a command is replaced by the source file path. The compiler
//! must print CSS to stdout.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Active stylesheet dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleDialect {
    /// `.sass` and `.scss`
    Sass,
    /// `.less`
    Less,
    /// `.styl`
    Stylus,
    /// `.css`, parsed directly without an external compiler
    Css,
}

impl StyleDialect {
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Sass => &["sass", "scss"],
            Self::Less => &["less"],
            Self::Stylus => &["styl"],
            Self::Css => &["css"],
        }
    }

    /// Whether `path` is a source this dialect compiles on its own.
    ///
    /// Sass partials (`_name.scss`) are only reachable through imports.
    pub fn accepts(self, path: &Path) -> bool {
        let ext_ok = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions().iter().any(|e| e.eq_ignore_ascii_case(ext)));
        let partial = self == Self::Sass
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('_'));
        ext_ok && !partial
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Sass => "sass",
            Self::Less => "less",
            Self::Stylus => "stylus",
            Self::Css => "css",
        }
    }
}

/// External compiler invocation per dialect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleCommands {
    pub sass: Vec<String>,
    pub less: Vec<String>,
    pub stylus: Vec<String>,
}

impl Default for StyleCommands {
    fn default() -> Self {
        let cmd = |parts: &[&str]| -> Vec<String> { parts.iter().map(|s| (*s).to_string()).collect() };
        Self {
            sass: cmd(&["sass", "--embed-source-map", "--embed-sources", "$INPUT"]),
            less: cmd(&["lessc", "$INPUT"]),
            stylus: cmd(&["stylus", "--print", "$INPUT"]),
        }
    }
}

impl StyleCommands {
    /// Command for a dialect, `None` for the built-in CSS dialect.
    pub fn for_dialect(&self, dialect: StyleDialect) -> Option<&[String]> {
        match dialect {
            StyleDialect::Sass => Some(self.sass.as_slice()),
            StyleDialect::Less => Some(self.less.as_slice()),
            StyleDialect::Stylus => Some(self.stylus.as_slice()),
            StyleDialect::Css => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StylesConfig {
    pub dialect: StyleDialect,
    /// Browserslist queries used for vendor prefixing.
    pub browsers: Vec<String>,
    /// Output basename, `.min.css` is appended.
    pub basename: String,
    pub source_map: bool,
    pub commands: StyleCommands,
}

impl Default for StylesConfig {
    fn default() -> Self {
        Self {
            dialect: StyleDialect::Sass,
            browsers: vec!["defaults".to_string()],
            basename: "main".to_string(),
            source_map: true,
            commands: StyleCommands::default(),
        }
    }
}

impl StylesConfig {
    pub fn artifact_name(&self) -> String {
        format!("{}.min.css", self.basename)
    }
}
