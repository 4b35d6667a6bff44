//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Commands
//!
//! | Command | Purpose |
//! |---------|---------|
//! | `init` | Write a default `.dacdoc.toml` |
//! | `list` | Show every marker and the check it resolved to |
//! | `check` | Evaluate all checks, exit non-zero on failures |
//! | `render` | Substitute outcomes into the documentation |
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Logging
//!
//! Use `--verbose` (or `-v`) for debug logging, or set `RUST_LOG`:
//! ```bash
//! dacdoc --verbose check docs
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod output;
mod check;
mod list;
mod render;

pub use app::{Cli, Commands, run};
pub use output::{Output, OutputFormat};
