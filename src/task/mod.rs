//! Task orchestration.
//!
//! ```text
//! task/
//! ├── graph.rs      # TaskGraph, validation (unknown deps, cycles)
//! ├── scheduler.rs  # Runs ready tasks concurrently on a JoinSet
//! └── mod.rs        # TaskName, TaskRunner, PipelineRunner (this file)
//! ```
//!
//! The default `build` graph:
//!
//! ```text
//!                    ┌── styles ──┐
//! clean ── html ─────┼── scripts ─┼── watch
//!                    └── images ──┘
//! ```

mod graph;
mod scheduler;

#[cfg(test)]
mod tests;

pub use graph::{GraphError, TaskGraph};
pub use scheduler::run_graph;

#[cfg(test)]
use scheduler::{RunSummary, TaskOutcome};

use crate::config::AssetflowConfig;
use crate::core::{AssetGroup, ShutdownToken};
use crate::pipeline;
use anyhow::Context;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Named node of the task graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskName {
    Clean,
    Html,
    Template,
    Styles,
    Scripts,
    Images,
    Watch,
}

impl TaskName {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::Html => "html",
            Self::Template => "template",
            Self::Styles => "styles",
            Self::Scripts => "scripts",
            Self::Images => "images",
            Self::Watch => "watch",
        }
    }

    /// Asset group transformed by this task, if any.
    pub const fn group(self) -> Option<AssetGroup> {
        match self {
            Self::Html => Some(AssetGroup::Html),
            Self::Template => Some(AssetGroup::Template),
            Self::Styles => Some(AssetGroup::Styles),
            Self::Scripts => Some(AssetGroup::Scripts),
            Self::Images => Some(AssetGroup::Images),
            Self::Clean | Self::Watch => None,
        }
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub type TaskFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// Executes the body of a task.
pub trait TaskRunner: Send + Sync + 'static {
    fn run(&self, task: TaskName) -> TaskFuture;
}

/// Runs the real pipelines: blocking stages on the blocking pool, `watch`
/// on the runtime until shutdown.
#[derive(Clone)]
pub struct PipelineRunner {
    config: Arc<AssetflowConfig>,
    shutdown: ShutdownToken,
    /// Sources that failed to compile across all tasks.
    compile_failures: Arc<AtomicUsize>,
}

impl PipelineRunner {
    pub fn new(config: Arc<AssetflowConfig>, shutdown: ShutdownToken) -> Self {
        Self {
            config,
            shutdown,
            compile_failures: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn compile_failures(&self) -> usize {
        self.compile_failures.load(Ordering::Relaxed)
    }
}

impl TaskRunner for PipelineRunner {
    fn run(&self, task: TaskName) -> TaskFuture {
        let config = Arc::clone(&self.config);
        match task {
            TaskName::Watch => {
                let shutdown = self.shutdown.clone();
                Box::pin(async move { crate::watch::run(config, shutdown).await })
            }
            TaskName::Clean => Box::pin(async move {
                tokio::task::spawn_blocking(move || pipeline::clean::run(&config))
                    .await
                    .context("clean task panicked")??;
                Ok(())
            }),
            _ => {
                let Some(group) = task.group() else {
                    return Box::pin(async move { anyhow::bail!("task `{task}` has no pipeline") });
                };
                let failures = Arc::clone(&self.compile_failures);
                Box::pin(async move {
                    let report =
                        tokio::task::spawn_blocking(move || pipeline::run_group(group, &config))
                            .await
                            .with_context(|| format!("{task} task panicked"))??;
                    failures.fetch_add(report.failures.len(), Ordering::Relaxed);
                    Ok(())
                })
            }
        }
    }
}
