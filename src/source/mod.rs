//! Source globs of an asset group.
//!
//! Patterns use gitignore glob semantics relative to the project root:
//! `*` stays within one path segment, `**` crosses directories, and a
//! leading `!` excludes matches of every other pattern in the set.
//!
//! Expansion is deterministic: patterns are expanded in declared order, the
//! matches of one pattern are sorted lexically, and a file matched by an
//! earlier pattern is not repeated by a later one. Pipelines that
//! concatenate sources rely on this order.

use crate::config::ConfigError;
use crate::core::AssetGroup;
use globset::GlobBuilder;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use jwalk::WalkDir;
use rustc_hash::FxHashSet;
use std::path::{Component, Path, PathBuf};

/// Files never picked up as sources.
const IGNORED_FILES: &[&str] = &[".DS_Store", "Thumbs.db"];

/// One compiled include pattern.
#[derive(Debug)]
struct Pattern {
    raw: String,
    /// Literal directory prefix, the only part of the tree worth walking.
    base: PathBuf,
    matcher: Gitignore,
}

/// A matched source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Absolute path.
    pub path: PathBuf,
    /// Path below the literal base of the pattern that matched it.
    ///
    /// `src/img/icons/a.svg` matched by `src/img/**` -> `icons/a.svg`
    pub rel: PathBuf,
}

/// Compiled, ordered source globs for one group.
#[derive(Debug)]
pub struct SourceSet {
    group: AssetGroup,
    root: PathBuf,
    includes: Vec<Pattern>,
    excludes: Option<Gitignore>,
}

impl SourceSet {
    /// Compile `patterns` relative to `root`.
    pub fn new<S: AsRef<str>>(
        group: AssetGroup,
        root: &Path,
        patterns: &[S],
    ) -> Result<Self, ConfigError> {
        let mut includes = Vec::with_capacity(patterns.len());
        let mut exclude_builder = GitignoreBuilder::new(root);
        let mut has_excludes = false;

        for raw in patterns.iter().map(AsRef::as_ref) {
            let glob_err = |message: String| ConfigError::Glob {
                group,
                pattern: raw.to_string(),
                message,
            };

            let (negated, pattern) = match raw.strip_prefix('!') {
                Some(rest) => (true, rest),
                None => (false, raw),
            };
            let pattern = pattern.trim_start_matches("./");
            if pattern.is_empty() {
                return Err(glob_err("empty pattern".into()));
            }
            if Path::new(pattern).is_absolute()
                || Path::new(pattern)
                    .components()
                    .any(|c| c == Component::ParentDir)
            {
                return Err(glob_err("pattern must stay inside the project root".into()));
            }
            // The gitignore parser is lenient about malformed classes
            GlobBuilder::new(pattern)
                .literal_separator(true)
                .build()
                .map_err(|e| glob_err(e.kind().to_string()))?;

            // Anchor at the root so `*.html` means top-level only, like a shell glob
            let anchored = format!("/{pattern}");

            if negated {
                exclude_builder
                    .add_line(None, &anchored)
                    .map_err(|e| glob_err(e.to_string()))?;
                has_excludes = true;
                continue;
            }

            let mut builder = GitignoreBuilder::new(root);
            builder
                .add_line(None, &anchored)
                .map_err(|e| glob_err(e.to_string()))?;
            let matcher = builder.build().map_err(|e| glob_err(e.to_string()))?;

            includes.push(Pattern {
                raw: raw.to_string(),
                base: literal_base(pattern),
                matcher,
            });
        }

        let excludes = if has_excludes {
            Some(exclude_builder.build().map_err(|e| ConfigError::Glob {
                group,
                pattern: "!".into(),
                message: e.to_string(),
            })?)
        } else {
            None
        };

        Ok(Self {
            group,
            root: root.to_path_buf(),
            includes,
            excludes,
        })
    }

    pub fn group(&self) -> AssetGroup {
        self.group
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether a file path (absolute or root-relative) belongs to this set.
    pub fn matches(&self, path: &Path) -> bool {
        let Some(rel) = self.relative(path) else {
            return false;
        };
        self.includes.iter().any(|p| p.matcher.matched(&rel, false).is_ignore())
            && !self.is_excluded(&rel)
    }

    /// Directories that must be watched to observe every matching file.
    ///
    /// The literal prefix of each pattern, deduplicated and without
    /// directories nested in another root.
    pub fn watch_roots(&self) -> Vec<PathBuf> {
        let mut roots: Vec<PathBuf> = self
            .includes
            .iter()
            .map(|p| self.root.join(&p.base))
            .collect();
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

    /// Expand the patterns to absolute file paths in deterministic order.
    ///
    /// A pattern whose base directory does not exist expands to nothing.
    pub fn expand(&self) -> Vec<PathBuf> {
        self.expand_files().into_iter().map(|f| f.path).collect()
    }

    /// Like [`expand`](Self::expand), keeping each path relative to the
    /// base of the pattern that matched it.
    pub fn expand_files(&self) -> Vec<SourceFile> {
        let mut seen = FxHashSet::default();
        let mut files = Vec::new();

        for pattern in &self.includes {
            let base = self.root.join(&pattern.base);
            if !base.is_dir() {
                continue;
            }

            let mut matched: Vec<PathBuf> = WalkDir::new(&base)
                .into_iter()
                .filter_map(Result::ok)
                .filter(|e| e.file_type().is_file())
                .filter(|e| {
                    let name = e.file_name().to_str().unwrap_or_default();
                    !IGNORED_FILES.contains(&name)
                })
                .map(|e| e.path())
                .filter(|path| {
                    self.relative(path).is_some_and(|rel| {
                        pattern.matcher.matched(&rel, false).is_ignore() && !self.is_excluded(&rel)
                    })
                })
                .collect();
            matched.sort();

            crate::debug!(
                self.group.name();
                "`{}` matched {}",
                pattern.raw,
                crate::utils::plural::plural_count(matched.len(), "file")
            );

            for path in matched {
                if seen.insert(path.clone()) {
                    let rel = path.strip_prefix(&base).unwrap_or(&path).to_path_buf();
                    files.push(SourceFile { path, rel });
                }
            }
        }
        files
    }

    fn is_excluded(&self, rel: &Path) -> bool {
        self.excludes
            .as_ref()
            .is_some_and(|ex| ex.matched(rel, false).is_ignore())
    }

    fn relative(&self, path: &Path) -> Option<PathBuf> {
        if path.is_absolute() {
            path.strip_prefix(&self.root).ok().map(Path::to_path_buf)
        } else {
            Some(path.to_path_buf())
        }
    }
}

/// Leading path components that contain no glob metacharacters.
fn literal_base(pattern: &str) -> PathBuf {
    let segments: Vec<&str> = pattern.split('/').collect();
    let mut base = PathBuf::new();
    // The last segment names files, never a directory to walk from
    for segment in &segments[..segments.len().saturating_sub(1)] {
        if segment.contains(['*', '?', '[', '{']) {
            break;
        }
        base.push(segment);
    }
    base
}
