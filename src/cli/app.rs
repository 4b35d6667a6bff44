//! Main CLI application structure

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use super::output::{Output, OutputFormat};
use super::{check, list, render};
use crate::storage::{Config, Project};

#[derive(Parser)]
#[command(name = "dacdoc")]
#[command(author, version, about = "Verify the claims embedded in your documentation")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the global config, then text)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default .dacdoc.toml
    Init {
        /// Documentation root (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// List markers and the checks they resolve to
    List {
        /// Documentation root
        #[arg(default_value = ".")]
        root: PathBuf,
    },

    /// Evaluate every check; fails if any check fails
    Check {
        /// Documentation root
        #[arg(default_value = ".")]
        root: PathBuf,

        /// Do not probe remote links
        #[arg(long, env = "DACDOC_OFFLINE")]
        offline: bool,

        /// Treat indeterminate checks as failures
        #[arg(long)]
        strict: bool,
    },

    /// Write documentation with outcomes substituted for markers
    Render {
        /// Documentation root
        #[arg(default_value = ".")]
        root: PathBuf,

        /// Directory to write rendered files into
        #[arg(long, short, required_unless_present = "in_place", conflicts_with = "in_place")]
        out: Option<PathBuf>,

        /// Overwrite the source files
        #[arg(long)]
        in_place: bool,

        /// Do not probe remote links
        #[arg(long, env = "DACDOC_OFFLINE")]
        offline: bool,
    },
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let format = match cli.format {
        Some(format) => format,
        None => Config::load_global()?.default_format.into(),
    };
    let output = Output::new(format);

    log::debug!("dacdoc {} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Init { path } => {
            if Config::write_default(&path)? {
                output.success(&format!("Wrote {}", path.join(crate::storage::CONFIG_FILE).display()));
            } else {
                output.success(&format!("Configuration already present in {}", path.display()));
            }
        }

        Commands::List { root } => {
            let project = Project::open(root)?;
            list::run(&output, &project)?
        }

        Commands::Check { root, offline, strict } => {
            let project = open_project(root, offline)?;
            check::run(&output, &project, strict)?
        }

        Commands::Render { root, out, in_place, offline } => {
            let project = open_project(root, offline)?;
            render::run(&output, &project, out, in_place)?
        }
    }

    log::debug!("Command completed successfully");
    Ok(())
}

/// Opens a project, letting `--offline` override the config
fn open_project(root: PathBuf, offline: bool) -> Result<Project> {
    let mut project = Project::open(root)?;
    if offline {
        project.config_mut().project.probe.offline = true;
    }
    log::debug!(
        "Opened {} (offline: {})",
        project.root().display(),
        project.config().project.probe.offline
    );
    Ok(project)
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "dacdoc=debug" } else { "warn" };
    // a second init (e.g. in tests) is harmless
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .try_init();
}
