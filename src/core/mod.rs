//! Core types shared across the codebase.

mod group;
mod state;

pub use group::{AssetGroup, ReloadPolicy};
pub use state::{ShutdownToken, set_watching, setup_shutdown_handler};
