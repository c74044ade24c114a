//! Style pipeline: stylesheet dialect -> one minified, prefixed CSS file.
//!
//! Stages:
//!
//! 1. select sources of the active dialect (Sass partials excluded)
//! 2. compile every source to CSS in parallel ([`StyleCompiler`])
//! 3. merge the compiled sheets in glob order
//! 4. vendor-prefix for the browserslist targets and minify (lightningcss)
//! 5. print with a source map remapped through the compilers' inline maps
//! 6. write `<basename>.min.css` and `<basename>.min.css.map`
//!
//! A source that fails to compile or parse is reported on its own and no
//! stylesheet is written for the run.

use super::{Artifact, InjectedCss, PipelineError, RunReport, write_artifacts};
use crate::config::{AssetflowConfig, ConfigError, StylesConfig};
use crate::core::AssetGroup;
use crate::debug;
use crate::utils::exec::Cmd;
use crate::utils::path::display_slash;
use anyhow::Context;
use lightningcss::rules::CssRuleList;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use parcel_sourcemap::SourceMap;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

// ============================================================================
// Compilers
// ============================================================================

/// Turns one stylesheet source into plain CSS.
///
/// Compilers should embed an inline source map in their output so the final
/// map points at the original sources.
pub trait StyleCompiler: Send + Sync {
    fn compile(&self, path: &Path) -> anyhow::Result<String>;
}

impl<F> StyleCompiler for F
where
    F: Fn(&Path) -> anyhow::Result<String> + Send + Sync,
{
    fn compile(&self, path: &Path) -> anyhow::Result<String> {
        self(path)
    }
}

/// External compiler printing CSS to stdout (`sass`, `lessc`, `stylus`).
#[derive(Debug, Clone)]
pub struct CommandCompiler {
    command: Vec<String>,
    cwd: PathBuf,
}

impl CommandCompiler {
    pub fn new(command: Vec<String>, cwd: PathBuf) -> Self {
        Self { command, cwd }
    }
}

impl StyleCompiler for CommandCompiler {
    fn compile(&self, path: &Path) -> anyhow::Result<String> {
        let cmd = Cmd::from_template(&self.command, path).cwd(&self.cwd);
        cmd.check_installed()?;
        let output = cmd.run()?;
        String::from_utf8(output.stdout).context("compiler output is not valid UTF-8")
    }
}

/// Built-in dialect for plain `.css` sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainCss;

impl StyleCompiler for PlainCss {
    fn compile(&self, path: &Path) -> anyhow::Result<String> {
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
    }
}

/// Compiler for the configured dialect.
pub fn compiler_for(config: &AssetflowConfig) -> Box<dyn StyleCompiler> {
    match config.styles.commands.for_dialect(config.styles.dialect) {
        Some(command) => Box::new(CommandCompiler::new(command.to_vec(), config.root.clone())),
        None => Box::new(PlainCss),
    }
}

/// Resolve browserslist queries into lightningcss targets.
///
/// Queries that select no browser yield empty targets (no prefixing).
pub fn browser_targets(queries: &[String]) -> Result<Targets, String> {
    let browsers = Browsers::from_browserslist(queries.iter().map(String::as_str))
        .map_err(|e| e.to_string())?;
    Ok(browsers.map(Targets::from).unwrap_or_default())
}

// ============================================================================
// Pipeline
// ============================================================================

/// Run the style pipeline with the configured compiler.
pub fn run(config: &AssetflowConfig) -> Result<RunReport, PipelineError> {
    let compiler = compiler_for(config);
    run_with(config, compiler.as_ref())
}

/// Run the style pipeline with an explicit compiler.
pub fn run_with(
    config: &AssetflowConfig,
    compiler: &dyn StyleCompiler,
) -> Result<RunReport, PipelineError> {
    let styles = &config.styles;
    let mut report = RunReport::new(AssetGroup::Styles);

    let sources: Vec<PathBuf> = config
        .source_set(AssetGroup::Styles)?
        .expand()
        .into_iter()
        .filter(|path| {
            let accepted = styles.dialect.accepts(path);
            if !accepted {
                debug!("styles"; "skipping {} (not {})", display_slash(&config.root_relative(path)), styles.dialect.name());
            }
            accepted
        })
        .collect();

    report.sources = sources.len();
    if sources.is_empty() {
        return Ok(report);
    }

    let targets = browser_targets(&styles.browsers)
        .map_err(|e| ConfigError::Validation(format!("[styles] browsers: {e}")))?;

    let compiled: Vec<(PathBuf, anyhow::Result<String>)> = sources
        .par_iter()
        .map(|path| (config.root_relative(path), compiler.compile(path)))
        .collect();

    let mut units = Vec::with_capacity(compiled.len());
    for (rel, result) in compiled {
        match result {
            Ok(css) => units.push(CompiledSheet { rel, css }),
            Err(err) => report.fail(&rel, format!("{err:#}")),
        }
    }
    if !report.is_ok() {
        return Ok(report);
    }

    let artifact_name = styles.artifact_name();
    let bundle = match bundle(&units, targets, styles, &artifact_name) {
        Ok(bundle) => bundle,
        Err(failure) => {
            report.fail(&failure.0, failure.1);
            return Ok(report);
        }
    };

    let dest = config.dest_dir(AssetGroup::Styles);
    let mut artifacts = vec![Artifact::new(&artifact_name, bundle.css.clone())];
    if let Some(map) = bundle.map {
        artifacts.push(Artifact::new(format!("{artifact_name}.map"), map));
    }

    let original: u64 = units.iter().map(|u| u.css.len() as u64).sum();
    report.sizes.record(
        config.root_relative(dest.join(&artifact_name)),
        original,
        bundle.css.len() as u64,
    );
    report.written = write_artifacts(&dest, &artifacts)?;
    report.injected = Some(InjectedCss {
        path: config.public_url(AssetGroup::Styles, &artifact_name),
        content: bundle.css,
    });
    Ok(report)
}

/// Plain CSS of one source, before merging.
struct CompiledSheet {
    rel: PathBuf,
    css: String,
}

struct StyleBundle {
    css: String,
    map: Option<String>,
}

/// Merge, prefix, minify and print the compiled sheets.
///
/// The error names the source responsible, or the artifact when the failure
/// concerns the merged sheet.
fn bundle(
    units: &[CompiledSheet],
    targets: Targets,
    styles: &StylesConfig,
    artifact_name: &str,
) -> Result<StyleBundle, (PathBuf, String)> {
    let mut rules = Vec::new();
    let mut sources = Vec::with_capacity(units.len());
    let mut map_urls = Vec::with_capacity(units.len());

    for (index, unit) in units.iter().enumerate() {
        let name = display_slash(&unit.rel);
        let options = ParserOptions {
            filename: name.clone(),
            source_index: index as u32,
            ..ParserOptions::default()
        };
        let sheet = StyleSheet::parse(&unit.css, options)
            .map_err(|e| (unit.rel.clone(), e.to_string()))?;

        rules.extend(sheet.rules.0);
        map_urls.push(sheet.source_map_urls.into_iter().next().flatten());
        sources.push(name);
    }

    let mut merged = StyleSheet::new(sources.clone(), CssRuleList(rules), ParserOptions::default());
    merged.source_map_urls = map_urls;

    let artifact_err = |message: String| (PathBuf::from(artifact_name), message);

    merged
        .minify(MinifyOptions {
            targets,
            ..MinifyOptions::default()
        })
        .map_err(|e| artifact_err(e.to_string()))?;

    let mut source_map = SourceMap::new("/");
    source_map.add_sources(sources.iter().map(String::as_str).collect());
    for (index, unit) in units.iter().enumerate() {
        source_map
            .set_source_content(index, &unit.css)
            .map_err(|e| artifact_err(e.to_string()))?;
    }

    let printed = merged
        .to_css(PrinterOptions {
            minify: true,
            source_map: if styles.source_map {
                Some(&mut source_map)
            } else {
                None
            },
            targets,
            ..PrinterOptions::default()
        })
        .map_err(|e| artifact_err(e.to_string()))?;

    let mut css = printed.code;
    let map = if styles.source_map {
        css.push_str(&format!("\n/*# sourceMappingURL={artifact_name}.map */\n"));
        Some(
            source_map
                .to_json(None)
                .map_err(|e| artifact_err(e.to_string()))?,
        )
    } else {
        None
    };

    Ok(StyleBundle { css, map })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::section::StyleDialect;
    use crate::config::test_config_at;
    use tempfile::TempDir;

    fn css_project(files: &[(&str, &str)]) -> (TempDir, AssetflowConfig) {
        let dir = TempDir::new().unwrap();
        for (rel, content) in files {
            let path = dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        let mut config = test_config_at(dir.path());
        config.styles.dialect = StyleDialect::Css;
        config.paths.styles.sources = vec!["src/styles/**/*.css".to_string()];
        (dir, config)
    }

    fn read_output(dir: &TempDir, name: &str) -> String {
        fs::read_to_string(dir.path().join("dist/css").join(name)).unwrap()
    }

    #[test]
    fn test_browser_targets() {
        let targets = browser_targets(&["safari 10".to_string()]).unwrap();
        assert!(targets.browsers.is_some());
        assert!(browser_targets(&["nosuchbrowser 99".to_string()]).is_err());
    }

    #[test]
    fn test_merges_in_glob_order_and_minifies() {
        let (dir, config) = css_project(&[
            ("src/styles/b.css", ".b {\n  margin: 0px;\n}\n"),
            ("src/styles/a.css", ".a {\n  color: red;\n}\n"),
        ]);

        let report = run(&config).unwrap();
        assert!(report.is_ok());
        assert_eq!(report.sources, 2);

        let css = read_output(&dir, "main.min.css");
        let a = css.find(".a{").unwrap();
        let b = css.find(".b{").unwrap();
        assert!(a < b);
        assert!(!css.contains("\n  "));
        assert!(css.ends_with("/*# sourceMappingURL=main.min.css.map */\n"));
    }

    #[test]
    fn test_vendor_prefixes_for_targets() {
        let (dir, mut config) = css_project(&[("src/styles/a.css", ".a { user-select: none; }")]);
        config.styles.browsers = vec!["safari 10".to_string()];

        run(&config).unwrap();
        let css = read_output(&dir, "main.min.css");
        assert!(css.contains("-webkit-user-select:none"));
        assert!(css.contains("user-select:none"));
    }

    #[test]
    fn test_writes_source_map() {
        let (dir, config) = css_project(&[("src/styles/a.css", ".a { color: red; }")]);

        run(&config).unwrap();
        let map: serde_json::Value =
            serde_json::from_str(&read_output(&dir, "main.min.css.map")).unwrap();
        let sources = map["sources"].as_array().unwrap();
        assert!(sources.iter().any(|s| s.as_str().unwrap().ends_with("a.css")));
    }

    #[test]
    fn test_source_map_disabled() {
        let (dir, mut config) = css_project(&[("src/styles/a.css", ".a { color: red; }")]);
        config.styles.source_map = false;

        run(&config).unwrap();
        assert!(!read_output(&dir, "main.min.css").contains("sourceMappingURL"));
        assert!(!dir.path().join("dist/css/main.min.css.map").exists());
    }

    #[test]
    fn test_unchanged_input_is_byte_identical() {
        let (dir, config) = css_project(&[
            ("src/styles/a.css", ".a { display: flex; }"),
            ("src/styles/b.css", ".b { transition: all 1s; }"),
        ]);

        run(&config).unwrap();
        let first = read_output(&dir, "main.min.css");
        let first_map = read_output(&dir, "main.min.css.map");
        run(&config).unwrap();
        assert_eq!(first, read_output(&dir, "main.min.css"));
        assert_eq!(first_map, read_output(&dir, "main.min.css.map"));
    }

    #[test]
    fn test_compile_error_writes_nothing() {
        let (dir, mut config) = css_project(&[
            ("src/styles/main.scss", "@import 'missing';"),
            ("src/styles/ok.scss", ".ok { color: red; }"),
        ]);
        config.styles.dialect = StyleDialect::Sass;
        config.paths.styles.sources = vec!["src/styles/**/*.scss".to_string()];

        let compiler = |path: &Path| -> anyhow::Result<String> {
            if path.ends_with("main.scss") {
                anyhow::bail!("Can't find stylesheet to import.");
            }
            Ok(fs::read_to_string(path)?)
        };

        let report = run_with(&config, &compiler).unwrap();
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, Path::new("src/styles/main.scss"));
        assert!(report.failures[0].message.contains("Can't find stylesheet"));
        assert!(!dir.path().join("dist/css/main.min.css").exists());
    }

    #[test]
    fn test_parse_error_is_file_failure() {
        let (dir, config) = css_project(&[("src/styles/a.css", "..a { color: red; }")]);

        let report = run(&config).unwrap();
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, Path::new("src/styles/a.css"));
        assert!(!dir.path().join("dist/css/main.min.css").exists());
    }

    #[test]
    fn test_skips_other_dialects_and_partials() {
        let (dir, mut config) = css_project(&[
            ("src/styles/main.scss", ".main { color: red; }"),
            ("src/styles/_vars.scss", ".vars { color: blue; }"),
            ("src/styles/legacy.less", ".legacy { color: green; }"),
        ]);
        config.styles.dialect = StyleDialect::Sass;
        config.paths.styles.sources = vec!["src/styles/**/*".to_string()];

        let seen = parking_lot::Mutex::new(Vec::new());
        let compiler = |path: &Path| -> anyhow::Result<String> {
            seen.lock().push(path.file_name().unwrap().to_owned());
            Ok(fs::read_to_string(path)?)
        };

        let report = run_with(&config, &compiler).unwrap();
        assert_eq!(report.sources, 1);
        assert_eq!(*seen.lock(), ["main.scss"]);
        assert!(read_output(&dir, "main.min.css").contains(".main"));
    }

    #[test]
    fn test_injected_css_url() {
        let (_dir, config) = css_project(&[("src/styles/a.css", ".a { color: red; }")]);
        let report = run(&config).unwrap();
        let injected = report.injected.unwrap();
        assert_eq!(injected.path, "/css/main.min.css");
        assert!(injected.content.contains(".a{"));
    }

    #[test]
    fn test_no_sources_writes_nothing() {
        let (dir, config) = css_project(&[]);
        let report = run(&config).unwrap();
        assert_eq!(report.sources, 0);
        assert!(!dir.path().join("dist/css").exists());
    }
}
