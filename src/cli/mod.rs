//! Command-line interface module.

mod args;

pub use args::{Cli, Commands};

use std::sync::Arc;

use anyhow::Result;

use crate::config::AssetflowConfig;
use crate::core::ShutdownToken;
use crate::log;
use crate::task::{PipelineRunner, TaskRunner, run_graph};
use crate::utils::plural::plural_count;

/// Run the graph of `command` to completion.
///
/// Fails when a task failed. One-shot commands also fail when a source file
/// did not compile; watch sessions report it and carry on.
pub async fn run(command: Commands, config: AssetflowConfig, shutdown: ShutdownToken) -> Result<()> {
    let runner = PipelineRunner::new(Arc::new(config), shutdown);
    let summary = run_graph(&command.graph(), Arc::new(runner.clone()) as Arc<dyn TaskRunner>).await?;

    if let Some((task, message)) = summary.first_failure() {
        anyhow::bail!("task `{task}` failed: {message}");
    }
    let failures = runner.compile_failures();
    if failures > 0 {
        let message = format!("{} did not compile", plural_count(failures, "file"));
        if !matches!(command, Commands::Watch | Commands::Build) {
            anyhow::bail!(message);
        }
        log!("warn"; "{message}");
    }
    log!("done"; "{}", command_label(command));
    Ok(())
}

fn command_label(command: Commands) -> &'static str {
    match command {
        Commands::Clean => "clean",
        Commands::Styles => "styles",
        Commands::Images => "images",
        Commands::Htmlm => "htmlm",
        Commands::Pug => "pug",
        Commands::Scripts => "scripts",
        Commands::Watch => "watch",
        Commands::Build => "build",
    }
}
