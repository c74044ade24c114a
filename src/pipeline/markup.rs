//! Markup pipelines: templates rendered by an external tool, and plain HTML
//! with insignificant whitespace collapsed.
//!
//! Both name their output `<basename>.min.html`. When a group has several
//! sources the last one in glob order wins. The two groups normally share a
//! destination; the html group owns the file and the template group refuses
//! to overwrite it.

use super::{Artifact, PipelineError, RunReport, write_artifacts};
use crate::config::AssetflowConfig;
use crate::core::AssetGroup;
use crate::debug;
use crate::utils::exec::Cmd;
use crate::utils::path::display_slash;
use anyhow::Context;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

// ============================================================================
// Template renderers
// ============================================================================

/// Renders one template source to HTML.
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, path: &Path, source: &str) -> anyhow::Result<String>;
}

impl<F> TemplateRenderer for F
where
    F: Fn(&Path, &str) -> anyhow::Result<String> + Send + Sync,
{
    fn render(&self, path: &Path, source: &str) -> anyhow::Result<String> {
        self(path, source)
    }
}

/// External renderer reading the template on stdin and printing HTML.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    command: Vec<String>,
    cwd: PathBuf,
}

impl CommandRenderer {
    pub fn new(command: Vec<String>, cwd: PathBuf) -> Self {
        Self { command, cwd }
    }
}

impl TemplateRenderer for CommandRenderer {
    fn render(&self, path: &Path, source: &str) -> anyhow::Result<String> {
        let cmd = Cmd::from_template(&self.command, path)
            .cwd(&self.cwd)
            .stdin(source);
        cmd.check_installed()?;
        let output = cmd.run()?;
        String::from_utf8(output.stdout).context("renderer output is not valid UTF-8")
    }
}

// ============================================================================
// Pipelines
// ============================================================================

/// Render templates with the configured command.
pub fn run_template(config: &AssetflowConfig) -> Result<RunReport, PipelineError> {
    let renderer = CommandRenderer::new(config.markup.template_command.clone(), config.root.clone());
    run_template_with(config, &renderer)
}

/// Render templates with an explicit renderer.
pub fn run_template_with(
    config: &AssetflowConfig,
    renderer: &dyn TemplateRenderer,
) -> Result<RunReport, PipelineError> {
    let mut report = RunReport::new(AssetGroup::Template);
    let sources = config.source_set(AssetGroup::Template)?.expand();
    report.sources = sources.len();
    if sources.is_empty() {
        return Ok(report);
    }

    let artifact_name = config.markup.artifact_name();
    let dest = config.dest_dir(AssetGroup::Template);
    if dest == config.dest_dir(AssetGroup::Html)
        && !config.source_set(AssetGroup::Html)?.expand().is_empty()
    {
        return Err(PipelineError::OutputCollision {
            path: config.root_relative(dest.join(&artifact_name)),
        });
    }

    let mut rendered = Vec::with_capacity(sources.len());
    for path in &sources {
        let rel = config.root_relative(path);
        let source = fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        match renderer.render(path, &source) {
            Ok(html) => rendered.push((rel, source.len(), html)),
            Err(err) => report.fail(&rel, format!("{err:#}")),
        }
    }
    if !report.is_ok() {
        return Ok(report);
    }

    write_last(config, &mut report, AssetGroup::Template, rendered)?;
    Ok(report)
}

/// Collapse whitespace in plain HTML sources.
pub fn run_html(config: &AssetflowConfig) -> Result<RunReport, PipelineError> {
    let mut report = RunReport::new(AssetGroup::Html);
    let sources = config.source_set(AssetGroup::Html)?.expand();
    report.sources = sources.len();

    let mut minified = Vec::with_capacity(sources.len());
    for path in &sources {
        let source = fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        minified.push((config.root_relative(path), source.len(), collapse_whitespace(&source)));
    }

    write_last(config, &mut report, AssetGroup::Html, minified)?;
    Ok(report)
}

/// Write the last of `outputs` as `<basename>.min.html`.
fn write_last(
    config: &AssetflowConfig,
    report: &mut RunReport,
    group: AssetGroup,
    outputs: Vec<(PathBuf, usize, String)>,
) -> Result<(), PipelineError> {
    let artifact_name = config.markup.artifact_name();
    let count = outputs.len();
    let Some((rel, original, html)) = outputs.into_iter().last() else {
        return Ok(());
    };
    if count > 1 {
        debug!(group.name(); "{} sources share {artifact_name}, keeping {}", count, display_slash(&rel));
    }

    let dest = config.dest_dir(group);
    report.sizes.record(
        config.root_relative(dest.join(&artifact_name)),
        original as u64,
        html.len() as u64,
    );
    report.written = write_artifacts(&dest, &[Artifact::new(&artifact_name, html)])?;
    Ok(())
}

// ============================================================================
// Whitespace collapsing
// ============================================================================

/// Tags and comments.
static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->|<[^>]*>").expect("valid markup token regex"));

/// Elements whose content is kept verbatim.
const RAW_ELEMENTS: &[&str] = &["pre", "textarea", "script", "style"];

/// Phrasing elements; whitespace between two of them renders as a space.
const INLINE_ELEMENTS: &[&str] = &[
    "a", "abbr", "acronym", "b", "bdi", "bdo", "big", "button", "cite", "code", "data", "del",
    "dfn", "em", "font", "i", "img", "input", "ins", "kbd", "label", "mark", "math", "meter",
    "nobr", "object", "output", "picture", "progress", "q", "rp", "rt", "ruby", "s", "samp",
    "select", "small", "span", "strike", "strong", "sub", "sup", "svg", "textarea", "time", "tt",
    "u", "var", "wbr",
];

/// Collapse whitespace between and inside text nodes.
///
/// Runs of whitespace become a single space. A whitespace-only run is
/// dropped unless it sits between two inline tags, where it separates
/// rendered words. Comments and the content of raw elements are copied
/// unchanged.
pub fn collapse_whitespace(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut pos = 0;
    let mut prev_inline = false;

    while let Some(token) = TOKEN_RE.find_at(html, pos) {
        let inline = is_inline_tag(token.as_str());
        push_text(&mut out, &html[pos..token.start()], prev_inline && inline);
        out.push_str(token.as_str());
        pos = token.end();
        prev_inline = inline;

        if let Some(name) = raw_element_name(token.as_str()) {
            let close = format!("</{name}");
            let lower = html[pos..].to_ascii_lowercase();
            let end = match lower.find(&close) {
                Some(offset) => pos + offset,
                None => html.len(),
            };
            out.push_str(&html[pos..end]);
            pos = end;
        }
    }
    push_text(&mut out, &html[pos..], false);
    out
}

/// Append `text` with whitespace collapsed.
///
/// `between_inline` keeps a whitespace-only run as one space.
fn push_text(out: &mut String, text: &str, between_inline: bool) {
    if text.trim().is_empty() {
        if between_inline && !text.is_empty() {
            out.push(' ');
        }
        return;
    }
    let mut last_space = false;
    for c in text.chars() {
        if c.is_ascii_whitespace() {
            if !last_space {
                out.push(' ');
            }
            last_space = true;
        } else {
            out.push(c);
            last_space = false;
        }
    }
}

/// Lowercase element name of an opening or closing tag.
///
/// `None` for comments, doctypes and processing instructions.
fn tag_name(tag: &str) -> Option<String> {
    let rest = tag.strip_prefix('<')?;
    let rest = rest.strip_prefix('/').unwrap_or(rest);
    let name: String = rest
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-')
        .map(|c| c.to_ascii_lowercase())
        .collect();
    (!name.is_empty()).then_some(name)
}

fn is_inline_tag(tag: &str) -> bool {
    tag_name(tag).is_some_and(|name| INLINE_ELEMENTS.contains(&name.as_str()))
}

/// Lowercase name of a raw element if `tag` opens one.
fn raw_element_name(tag: &str) -> Option<&'static str> {
    let rest = tag.strip_prefix('<')?;
    if tag.ends_with("/>") {
        return None;
    }
    RAW_ELEMENTS.iter().copied().find(|name| {
        rest.get(..name.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(name))
            && rest[name.len()..]
                .chars()
                .next()
                .is_some_and(|c| c == '>' || c.is_ascii_whitespace())
    })
}
