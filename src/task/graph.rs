//! Task dependency graph.

use super::TaskName;
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("task `{0}` is declared twice")]
    Duplicate(TaskName),

    #[error("task `{task}` depends on unknown task `{dependency}`")]
    UnknownDependency {
        task: TaskName,
        dependency: TaskName,
    },

    #[error("dependency cycle between {}", join_names(.0))]
    Cycle(Vec<TaskName>),
}

fn join_names(names: &[TaskName]) -> String {
    names
        .iter()
        .map(|n| format!("`{n}`"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskNode {
    pub name: TaskName,
    pub deps: Vec<TaskName>,
}

/// Named tasks with declared dependencies, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    nodes: Vec<TaskNode>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task depending on `deps`. Repeated dependencies count once.
    pub fn task(mut self, name: TaskName, deps: &[TaskName]) -> Self {
        let mut unique = Vec::with_capacity(deps.len());
        for &dep in deps {
            if !unique.contains(&dep) {
                unique.push(dep);
            }
        }
        self.nodes.push(TaskNode { name, deps: unique });
        self
    }

    /// Graph made of one task without dependencies.
    pub fn single(name: TaskName) -> Self {
        Self::new().task(name, &[])
    }

    /// `clean -> html -> {styles, scripts, images} -> watch`
    pub fn build() -> Self {
        use TaskName::*;
        Self::new()
            .task(Clean, &[])
            .task(Html, &[Clean])
            .task(Styles, &[Html])
            .task(Scripts, &[Html])
            .task(Images, &[Html])
            .task(Watch, &[Styles, Scripts, Images])
    }

    pub fn nodes(&self) -> &[TaskNode] {
        &self.nodes
    }

    /// Tasks that list `name` as a dependency.
    pub fn dependents(&self, name: TaskName) -> impl Iterator<Item = TaskName> + '_ {
        self.nodes
            .iter()
            .filter(move |n| n.deps.contains(&name))
            .map(|n| n.name)
    }

    /// Reject duplicate tasks, unknown dependencies and cycles.
    pub fn validate(&self) -> Result<(), GraphError> {
        let mut names = FxHashSet::default();
        for node in &self.nodes {
            if !names.insert(node.name) {
                return Err(GraphError::Duplicate(node.name));
            }
        }
        for node in &self.nodes {
            if let Some(&dependency) = node.deps.iter().find(|d| !names.contains(d)) {
                return Err(GraphError::UnknownDependency {
                    task: node.name,
                    dependency,
                });
            }
        }

        // Kahn: whatever cannot be ordered sits on or behind a cycle
        let mut pending: FxHashMap<TaskName, usize> = self
            .nodes
            .iter()
            .map(|n| (n.name, n.deps.len()))
            .collect();
        let mut ready: Vec<TaskName> = self
            .nodes
            .iter()
            .filter(|n| n.deps.is_empty())
            .map(|n| n.name)
            .collect();

        while let Some(name) = ready.pop() {
            pending.remove(&name);
            for dependent in self.dependents(name) {
                if let Some(count) = pending.get_mut(&dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push(dependent);
                    }
                }
            }
        }

        if pending.is_empty() {
            Ok(())
        } else {
            let stuck = self
                .nodes
                .iter()
                .map(|n| n.name)
                .filter(|n| pending.contains_key(n))
                .collect();
            Err(GraphError::Cycle(stuck))
        }
    }
}
