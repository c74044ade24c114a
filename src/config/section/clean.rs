//! `[clean]` section configuration.
//!
//! ```toml
//! [clean]
//! preserve = ["img"]    # Directories under the output root kept by `clean`
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanConfig {
    /// Entry names directly under the output root that survive `clean`.
    pub preserve: Vec<String>,
}

impl Default for CleanConfig {
    fn default() -> Self {
        Self {
            preserve: vec!["img".to_string()],
        }
    }
}
