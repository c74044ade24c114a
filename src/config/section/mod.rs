//! Configuration section definitions.
//!
//! Each module corresponds to a section in `assetflow.toml`:
//!
//! | Module    | TOML Section | Purpose                                   |
//! |-----------|--------------|-------------------------------------------|
//! | `paths`   | `[paths]`    | Source globs and destination per group    |
//! | `clean`   | `[clean]`    | Directories kept by `clean`               |
//! | `styles`  | `[styles]`   | Dialect, compilers, browser targets       |
//! | `scripts` | `[scripts]`  | Transpile target, bundle name             |
//! | `images`  | `[images]`   | Re-encoding quality                       |
//! | `markup`  | `[markup]`   | Output basename, template renderer        |
//! | `serve`   | `[serve]`    | Dev server and live-reload ports          |

mod clean;
mod images;
mod markup;
mod paths;
mod scripts;
mod serve;
mod styles;

pub use clean::CleanConfig;
pub use images::ImagesConfig;
pub use markup::MarkupConfig;
pub use paths::PathConfig;
pub use scripts::ScriptsConfig;
pub use serve::ServeConfig;
pub use styles::StylesConfig;

#[cfg(test)]
pub use styles::StyleDialect;
