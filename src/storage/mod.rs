//! # Storage Layer
//!
//! Filesystem and network collaborators around the pure domain layer.
//!
//! ## Files
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Documentation | Markdown with `!DACDOC...!` placeholders | anywhere under the root |
//! | Project config | TOML | `{root}/.dacdoc.toml` |
//! | Global config | TOML | `~/.config/dacdoc/config.toml` |
//!
//! ## Failure Handling
//!
//! - A file that cannot be read or contains a malformed placeholder is
//!   reported as a [`SourceError`]; the remaining files are still resolved
//! - Rendered files are written atomically (temp file + rename)
//!
//! ## Key Types
//!
//! - [`Project`] - Entry point for a documentation root
//! - [`Scan`] - Sources, markers and resolved checks of one run
//! - [`LiveProbe`] - Filesystem/HTTP implementation of the link probe
//! - [`Config`] - Project and global configuration

mod config;
mod discover;
mod probe;
mod project;

pub use config::{Config, ConfigError, GlobalConfig, OutputFormat, ProbeConfig, ProjectConfig, CONFIG_FILE};
pub use discover::find_markdown_files;
pub use probe::LiveProbe;
pub use project::{read_sources, Project, ProjectError, RenderTarget, Scan, SourceError};
