//! `[images]` section configuration.
//!
//! ```toml
//! [images]
//! jpeg_quality = 85    # 1-100
//! optimize = true      # false: copy files as-is
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    pub jpeg_quality: u8,
    pub optimize: bool,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: 85,
            optimize: true,
        }
    }
}
