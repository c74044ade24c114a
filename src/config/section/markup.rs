//! `[markup]` section configuration.
//!
//! ```toml
//! [markup]
//! basename = "main"                          # -> main.min.html
//! template_command = ["pug", "--path", "$INPUT"]
//! ```
//!
//! The template source is piped to the renderer's stdin; rendered HTML is
//! read from stdout. `$INPUT` is replaced by the source path so includes
//! resolve relative to it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkupConfig {
    pub basename: String,
    pub template_command: Vec<String>,
}

impl Default for MarkupConfig {
    fn default() -> Self {
        Self {
            basename: "main".to_string(),
            template_command: vec!["pug".into(), "--path".into(), "$INPUT".into()],
        }
    }
}

impl MarkupConfig {
    pub fn artifact_name(&self) -> String {
        format!("{}.min.html", self.basename)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::test_parse_config;

    #[test]
    fn test_markup_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.markup.artifact_name(), "main.min.html");
        assert_eq!(config.markup.template_command[0], "pug");
    }
}
