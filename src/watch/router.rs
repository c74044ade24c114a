use std::path::PathBuf;

use super::types::Changes;
use crate::config::{AssetflowConfig, ConfigError};
use crate::core::AssetGroup;
use crate::source::SourceSet;
use crate::utils::path::display_slash;

/// Maps changed paths to the groups whose sources they are.
pub struct GroupRouter {
    sets: Vec<SourceSet>,
    output: PathBuf,
}

impl GroupRouter {
    pub fn new(config: &AssetflowConfig) -> Result<Self, ConfigError> {
        let sets = AssetGroup::WATCHED
            .into_iter()
            .map(|group| config.source_set(group))
            .collect::<Result<_, _>>()?;
        Ok(Self {
            sets,
            output: config.output_dir(),
        })
    }

    /// Groups touched by `changes`, in watch order.
    pub fn route(&self, changes: &Changes) -> Vec<AssetGroup> {
        self.sets
            .iter()
            .filter(|set| {
                changes.keys().any(|path| {
                    let hit = !path.starts_with(&self.output) && set.matches(path);
                    if hit {
                        crate::debug!(set.group().name(); "changed: {}", display_slash(path));
                    }
                    hit
                })
            })
            .map(SourceSet::group)
            .collect()
    }

    /// Directories to watch recursively, without nested duplicates.
    pub fn watch_roots(&self) -> Vec<PathBuf> {
        let mut roots: Vec<PathBuf> = self.sets.iter().flat_map(SourceSet::watch_roots).collect();
        roots.sort();
        roots.dedup();

        let mut out: Vec<PathBuf> = Vec::with_capacity(roots.len());
        for root in roots {
            if !out.iter().any(|r| root.starts_with(r)) {
                out.push(root);
            }
        }
        out
    }
}
