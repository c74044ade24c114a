//! Image pipeline: freshness-checked, per-format optimization.
//!
//! Only sources whose destination counterpart is missing or older are
//! processed. PNG is re-encoded losslessly at the best compression level,
//! JPEG at the configured quality, SVG re-serialized through usvg; other
//! formats are copied. The smaller of original and optimized bytes is kept.

use super::{Artifact, PipelineError, RunReport, write_artifacts};
use crate::config::{AssetflowConfig, ImagesConfig};
use crate::core::AssetGroup;
use crate::debug;
use crate::freshness::{get_mtime, is_output_fresh};
use crate::source::SourceFile;
use crate::utils::path::display_slash;
use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ImageFormat};
use rayon::prelude::*;
use std::fs;
use std::path::PathBuf;

/// Formats the pipeline knows how to optimize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
    Svg,
    /// Copied unchanged (gif, webp, ico, ...).
    Other,
}

impl ImageKind {
    pub fn from_path(path: &std::path::Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("png") => Self::Png,
            Some("jpg" | "jpeg") => Self::Jpeg,
            Some("svg") => Self::Svg,
            _ => Self::Other,
        }
    }
}

/// Optimize `bytes`, returning the original when optimizing does not help.
pub fn optimize(bytes: &[u8], kind: ImageKind, options: &ImagesConfig) -> Result<Vec<u8>> {
    if !options.optimize {
        return Ok(bytes.to_vec());
    }
    let optimized = match kind {
        ImageKind::Png => encode_png(&decode(bytes, ImageFormat::Png)?)?,
        ImageKind::Jpeg => encode_jpeg(&decode(bytes, ImageFormat::Jpeg)?, options.jpeg_quality)?,
        ImageKind::Svg => optimize_svg(bytes)?,
        ImageKind::Other => return Ok(bytes.to_vec()),
    };
    Ok(if optimized.len() < bytes.len() {
        optimized
    } else {
        bytes.to_vec()
    })
}

fn decode(bytes: &[u8], format: ImageFormat) -> Result<DynamicImage> {
    image::load_from_memory_with_format(bytes, format).context("failed to decode image")
}

fn encode_png(img: &DynamicImage) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive);
    img.write_with_encoder(encoder).context("failed to encode PNG")?;
    Ok(out)
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, quality);
    img.write_with_encoder(encoder).context("failed to encode JPEG")?;
    Ok(out)
}

fn optimize_svg(content: &[u8]) -> Result<Vec<u8>> {
    let tree = usvg::Tree::from_data(content, &usvg::Options::default()).context("failed to parse SVG")?;
    let write_options = usvg::WriteOptions {
        indent: usvg::Indent::None,
        ..Default::default()
    };
    Ok(tree.to_string(&write_options).into_bytes())
}

/// Run the image pipeline.
pub fn run(config: &AssetflowConfig) -> Result<RunReport, PipelineError> {
    let mut report = RunReport::new(AssetGroup::Images);
    let dest = config.dest_dir(AssetGroup::Images);

    let files = config.source_set(AssetGroup::Images)?.expand_files();
    report.sources = files.len();

    let stale: Vec<SourceFile> = files
        .into_iter()
        .filter(|file| {
            let fresh = is_output_fresh(&dest.join(&file.rel), get_mtime(&file.path));
            if fresh {
                debug!("images"; "{} is up to date", display_slash(&file.rel));
            }
            !fresh
        })
        .collect();
    report.skipped = report.sources - stale.len();

    let processed = stale
        .par_iter()
        .map(|file| process_file(config, file))
        .collect::<Result<Vec<_>, PipelineError>>()?;

    let mut artifacts = Vec::with_capacity(processed.len());
    for (rel, result) in processed {
        match result {
            Ok((original, artifact)) => {
                report.sizes.record(
                    config.root_relative(dest.join(&artifact.rel)),
                    original,
                    artifact.bytes.len() as u64,
                );
                artifacts.push(artifact);
            }
            Err(message) => report.fail(&rel, message),
        }
    }

    report.written = write_artifacts(&dest, &artifacts)?;
    Ok(report)
}

/// Read and optimize one stale image.
///
/// A read failure aborts the stage; a decode or encode failure is reported
/// against the source and leaves its siblings alone.
fn process_file(
    config: &AssetflowConfig,
    file: &SourceFile,
) -> Result<(PathBuf, Result<(u64, Artifact), String>), PipelineError> {
    let bytes = fs::read(&file.path).map_err(|e| PipelineError::io(&file.path, e))?;
    let result = optimize(&bytes, ImageKind::from_path(&file.path), &config.images)
        .map(|optimized| (bytes.len() as u64, Artifact::new(&file.rel, optimized)))
        .map_err(|e| format!("{e:#}"));
    Ok((config.root_relative(&file.path), result))
}
