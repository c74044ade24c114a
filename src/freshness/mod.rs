//! Freshness detection for incremental rebuilds.
//!
//! Outputs are compared against their sources by modification time. Only the
//! image pipeline uses it: bundles are always rebuilt because they depend on
//! the whole source set.

mod mtime;

pub use mtime::{get_mtime, is_output_fresh};
