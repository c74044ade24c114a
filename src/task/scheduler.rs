//! Concurrent execution of a validated task graph.

use super::{GraphError, TaskGraph, TaskName, TaskRunner};
use crate::utils::plural::plural_count;
use crate::{debug, log};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;

type Settled = (TaskName, anyhow::Result<()>, Duration);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Succeeded,
    Failed(String),
    /// Not started because a dependency failed.
    Skipped,
}

/// Outcome of every task, in the order they were settled.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub outcomes: Vec<(TaskName, TaskOutcome)>,
}

impl RunSummary {
    #[cfg(test)]
    pub fn outcome(&self, name: TaskName) -> Option<&TaskOutcome> {
        self.outcomes
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, outcome)| outcome)
    }

    #[cfg(test)]
    pub fn is_success(&self) -> bool {
        self.outcomes
            .iter()
            .all(|(_, outcome)| *outcome == TaskOutcome::Succeeded)
    }

    /// First failed task and its error message.
    pub fn first_failure(&self) -> Option<(TaskName, &str)> {
        self.outcomes.iter().find_map(|(name, outcome)| match outcome {
            TaskOutcome::Failed(message) => Some((*name, message.as_str())),
            _ => None,
        })
    }
}

/// Run every task of `graph` once its dependencies succeeded.
///
/// Independent tasks run concurrently. A failed task prevents its transitive
/// dependents from starting; tasks already running are left to finish.
pub async fn run_graph(
    graph: &TaskGraph,
    runner: Arc<dyn TaskRunner>,
) -> Result<RunSummary, GraphError> {
    graph.validate()?;

    let mut waiting: FxHashMap<TaskName, usize> = graph
        .nodes()
        .iter()
        .map(|n| (n.name, n.deps.len()))
        .collect();
    let mut settled: FxHashSet<TaskName> = FxHashSet::default();
    let mut summary = RunSummary::default();
    let mut running: JoinSet<Settled> = JoinSet::new();

    let spawn = |running: &mut JoinSet<Settled>, name: TaskName| {
        debug!("task"; "starting `{}`", name);
        let future = runner.run(name);
        running.spawn(async move {
            let started = Instant::now();
            // Inner spawn turns a panic into an error instead of losing the name
            let result = match tokio::spawn(future).await {
                Ok(result) => result,
                Err(err) => Err(anyhow::anyhow!("task panicked: {err}")),
            };
            (name, result, started.elapsed())
        });
    };

    for node in graph.nodes().iter().filter(|n| n.deps.is_empty()) {
        spawn(&mut running, node.name);
    }

    while let Some(joined) = running.join_next().await {
        let Ok((name, result, elapsed)) = joined else {
            continue;
        };
        settled.insert(name);

        match result {
            Ok(()) => {
                debug!("task"; "finished `{}` in {}ms", name, elapsed.as_millis());
                summary.outcomes.push((name, TaskOutcome::Succeeded));
                for dependent in graph.dependents(name) {
                    if settled.contains(&dependent) {
                        continue;
                    }
                    if let Some(count) = waiting.get_mut(&dependent) {
                        *count -= 1;
                        if *count == 0 {
                            spawn(&mut running, dependent);
                        }
                    }
                }
            }
            Err(err) => {
                log!("error"; "task `{}` failed: {:#}", name, err);
                summary.outcomes.push((name, TaskOutcome::Failed(format!("{err:#}"))));
                skip_dependents(graph, name, &mut settled, &mut summary);
            }
        }
    }

    let skipped = summary
        .outcomes
        .iter()
        .filter(|(_, o)| *o == TaskOutcome::Skipped)
        .count();
    if skipped > 0 {
        log!("task"; "{} skipped after failure", plural_count(skipped, "task"));
    }
    Ok(summary)
}

/// Mark every transitive dependent of `failed` as skipped.
fn skip_dependents(
    graph: &TaskGraph,
    failed: TaskName,
    settled: &mut FxHashSet<TaskName>,
    summary: &mut RunSummary,
) {
    let mut stack = vec![failed];
    while let Some(name) = stack.pop() {
        for dependent in graph.dependents(name) {
            if settled.insert(dependent) {
                debug!("task"; "skipping `{}`", dependent);
                summary.outcomes.push((dependent, TaskOutcome::Skipped));
                stack.push(dependent);
            }
        }
    }
}
