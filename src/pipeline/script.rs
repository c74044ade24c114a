//! Script pipeline: transpile, minify and concatenate into one bundle.
//!
//! Each source is parsed, lowered to the configured ECMAScript target,
//! minified (dead-code elimination, mangling) and printed with its own
//! source map. The printed files are joined in glob order; their maps are
//! concatenated with the matching line offsets.

use super::{Artifact, PipelineError, RunReport, write_artifacts};
use crate::config::{AssetflowConfig, ConfigError};
use crate::core::AssetGroup;
use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::diagnostics::OxcDiagnostic;
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::semantic::SemanticBuilder;
use oxc::span::SourceType;
use oxc::transformer::{TransformOptions, Transformer};
use oxc_sourcemap::{ConcatSourceMapBuilder, SourceMap};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

/// Transform options for an ECMAScript target such as `es2015`.
pub fn target_options(target: &str) -> Result<TransformOptions, String> {
    TransformOptions::from_target(target)
}

/// One source after transpiling and minifying.
struct MinifiedScript {
    code: String,
    map: Option<SourceMap>,
}

/// Run the script pipeline.
pub fn run(config: &AssetflowConfig) -> Result<RunReport, PipelineError> {
    let scripts = &config.scripts;
    let mut report = RunReport::new(AssetGroup::Scripts);

    let sources = config.source_set(AssetGroup::Scripts)?.expand();
    report.sources = sources.len();
    if sources.is_empty() {
        return Ok(report);
    }

    let options = target_options(&scripts.target)
        .map_err(|e| ConfigError::Validation(format!("[scripts] target: {e}")))?;

    // Read failures are filesystem errors, fatal to the stage
    let mut inputs = Vec::with_capacity(sources.len());
    for path in &sources {
        let text = fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        inputs.push((path.as_path(), config.root_relative(path), text));
    }

    let results: Vec<(PathBuf, Result<MinifiedScript, String>)> = inputs
        .par_iter()
        .map(|(path, rel, text)| {
            (
                rel.clone(),
                transform_script(path, rel, text, &options, scripts.source_map),
            )
        })
        .collect();

    let mut minified = Vec::with_capacity(results.len());
    for (rel, result) in results {
        match result {
            Ok(script) => minified.push(script),
            Err(message) => report.fail(&rel, message),
        }
    }
    if !report.is_ok() {
        return Ok(report);
    }

    let bundle_name = &scripts.bundle;
    let (mut code, map) = concat(&minified);
    if map.is_some() {
        code.push_str(&format!("\n//# sourceMappingURL={bundle_name}.map\n"));
    }

    let dest = config.dest_dir(AssetGroup::Scripts);
    let original: u64 = inputs.iter().map(|(_, _, text)| text.len() as u64).sum();
    report.sizes.record(
        config.root_relative(dest.join(bundle_name)),
        original,
        code.len() as u64,
    );

    let mut artifacts = vec![Artifact::new(bundle_name, code)];
    if let Some(map) = map {
        artifacts.push(Artifact::new(format!("{bundle_name}.map"), map.to_json_string()));
    }
    report.written = write_artifacts(&dest, &artifacts)?;
    Ok(report)
}

/// Parse, transpile and minify one script.
///
/// `rel` is the name recorded in the source map.
fn transform_script(
    path: &Path,
    rel: &Path,
    text: &str,
    options: &TransformOptions,
    source_map: bool,
) -> Result<MinifiedScript, String> {
    // Classic scripts: the bundled files share one global scope
    let allocator = Allocator::default();
    let parsed = Parser::new(&allocator, text, SourceType::script()).parse();
    if parsed.panicked || !parsed.errors.is_empty() {
        return Err(diagnostics_message(&parsed.errors));
    }
    let mut program = parsed.program;

    let semantic = SemanticBuilder::new().build(&program);
    if !semantic.errors.is_empty() {
        return Err(diagnostics_message(&semantic.errors));
    }
    let scoping = semantic.semantic.into_scoping();

    let transformed =
        Transformer::new(&allocator, path, options).build_with_scoping(scoping, &mut program);
    if !transformed.errors.is_empty() {
        return Err(diagnostics_message(&transformed.errors));
    }

    // Top-level bindings may be used by sibling files, keep their names
    let minified = Minifier::new(MinifierOptions {
        mangle: Some(MangleOptions {
            top_level: Some(false),
            ..MangleOptions::default()
        }),
        compress: Some(CompressOptions::smallest()),
    })
    .minify(&allocator, &mut program);

    let printed = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            source_map_path: source_map.then(|| rel.to_path_buf()),
            ..CodegenOptions::default()
        })
        .with_scoping(minified.scoping)
        .build(&program);

    Ok(MinifiedScript {
        code: printed.code,
        map: printed.map,
    })
}

fn diagnostics_message(errors: &[OxcDiagnostic]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Join scripts with newlines, shifting each map by the lines before it.
fn concat(scripts: &[MinifiedScript]) -> (String, Option<SourceMap>) {
    let mut code = String::new();
    let mut offsets = Vec::with_capacity(scripts.len());
    let mut line = 0u32;

    for script in scripts {
        if !code.is_empty() {
            code.push('\n');
            line += 1;
        }
        if let Some(map) = &script.map {
            offsets.push((map, line));
        }
        let body = script.code.trim_end_matches('\n');
        code.push_str(body);
        line += body.matches('\n').count() as u32;
    }

    let map = (!offsets.is_empty())
        .then(|| ConcatSourceMapBuilder::from_sourcemaps(&offsets).into_sourcemap());
    (code, map)
}
