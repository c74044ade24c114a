//! `[scripts]` section configuration.
//!
//! ```toml
//! [scripts]
//! target = "es2015"        # lowest syntax level emitted
//! bundle = "main.min.js"
//! source_map = true
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptsConfig {
    /// Transpile target (`es2015` .. `es2024`, `esnext`).
    pub target: String,
    /// File name of the concatenated bundle.
    pub bundle: String,
    pub source_map: bool,
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            target: "es2015".to_string(),
            bundle: "main.min.js".to_string(),
            source_map: true,
        }
    }
}
