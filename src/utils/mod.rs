//! Small helpers shared by pipelines and the dev server.

pub mod exec;
pub mod mime;
pub mod path;
pub mod plural;
