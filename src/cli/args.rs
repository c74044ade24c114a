//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::CONFIG_FILE;
use crate::task::{TaskGraph, TaskName};

/// Front-end asset pipeline with a live-reload dev server
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, disable_version_flag = true)]
pub struct Cli {
    /// Print version
    #[arg(long, action = clap::ArgAction::Version)]
    version: Option<bool>,

    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Project root directory
    #[arg(long, global = true, default_value = ".", value_hint = clap::ValueHint::DirPath)]
    pub root: PathBuf,

    /// Config file path, relative to the project root
    #[arg(short = 'C', long, global = true, default_value = CONFIG_FILE, value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Print debug messages
    #[arg(short = 'V', long, global = true)]
    pub verbose: bool,

    /// Task to run (default: build)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available tasks
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Empty the output directory, keeping preserved folders
    Clean,

    /// Compile stylesheets into one minified, prefixed CSS file
    Styles,

    /// Optimize changed images
    #[command(visible_alias = "img")]
    Images,

    /// Collapse whitespace in HTML sources
    Htmlm,

    /// Render templates with the configured renderer
    #[command(visible_alias = "template")]
    Pug,

    /// Transpile, minify and bundle scripts
    Scripts,

    /// Serve the project and rebuild on change
    Watch,

    /// Clean, build every group, then watch
    Build,
}

impl Commands {
    /// Task graph run for this command.
    pub fn graph(self) -> TaskGraph {
        match self {
            Self::Clean => TaskGraph::single(TaskName::Clean),
            Self::Styles => TaskGraph::single(TaskName::Styles),
            Self::Images => TaskGraph::single(TaskName::Images),
            Self::Htmlm => TaskGraph::single(TaskName::Html),
            Self::Pug => TaskGraph::single(TaskName::Template),
            Self::Scripts => TaskGraph::single(TaskName::Scripts),
            Self::Watch => TaskGraph::single(TaskName::Watch),
            Self::Build => TaskGraph::build(),
        }
    }
}

impl Cli {
    /// Selected command, `build` when none is given.
    pub fn task(&self) -> Commands {
        self.command.unwrap_or(Commands::Build)
    }
}
