//! assetflow - front-end asset pipeline with a live-reload dev server.

mod cli;
mod config;
mod core;
mod embed;
mod freshness;
mod logger;
mod pipeline;
mod reload;
mod serve;
mod source;
mod task;
mod utils;
mod watch;

use anyhow::{Context, Result};
use clap::{ColorChoice, Parser};
use cli::Cli;
use config::AssetflowConfig;
use core::ShutdownToken;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let shutdown = ShutdownToken::new();
    core::setup_shutdown_handler(shutdown.clone())?;

    let config = AssetflowConfig::load(&cli.root, &cli.config)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(cli::run(cli.task(), config, shutdown))
}
