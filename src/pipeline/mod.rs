//! Asset transform pipelines.
//!
//! ```text
//! pipeline/
//! ├── clean.rs     # Output root cleanup
//! ├── markup.rs    # Template and plain-HTML pipelines
//! ├── style.rs     # Stylesheet dialect -> <basename>.min.css
//! ├── script.rs    # Transpile + minify + concatenate -> main.min.js
//! ├── image.rs     # Freshness-checked image optimization
//! ├── output.rs    # Artifact writing
//! ├── report.rs    # RunReport, per-file failures
//! └── size.rs      # Byte-size metrics
//! ```
//!
//! Every pipeline reads the sources of its group, runs a fixed sequence of
//! stages and writes artifacts under the group destination. A compile error
//! in a source file is recorded in the [`RunReport`] and suppresses the
//! group artifact; only filesystem and configuration errors abort the run.

pub mod clean;
pub mod image;
pub mod markup;
pub mod script;
pub mod style;

mod error;
mod output;
mod report;
mod size;

pub use error::PipelineError;
pub use output::{Artifact, write_artifacts};
pub use report::{InjectedCss, RunReport};
pub use size::SizeReport;

use crate::config::AssetflowConfig;
use crate::core::AssetGroup;

/// Run the transform pipeline bound to `group`.
pub fn run_group(group: AssetGroup, config: &AssetflowConfig) -> Result<RunReport, PipelineError> {
    let report = match group {
        AssetGroup::Template => markup::run_template(config)?,
        AssetGroup::Html => markup::run_html(config)?,
        AssetGroup::Styles => style::run(config)?,
        AssetGroup::Scripts => script::run(config)?,
        AssetGroup::Images => image::run(config)?,
    };
    report.log_summary();
    Ok(report)
}
