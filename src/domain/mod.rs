//! Domain models for dacdoc
//!
//! Marker parsing, check resolution, evaluation and rendering, without any
//! I/O. Probing link targets is delegated through [`LinkProbe`].

mod marker;
mod check;
mod resolve;
mod evaluate;
mod render;

pub use marker::{parse, parse_markers, Marker, MarkerError, MarkerKind, DEFAULT_TEST_ID};
pub use check::{extract_markdown_uri, Check, CheckId, CompositeCheck, LinkTarget, UnknownReason, UrlCheck};
pub use resolve::{resolve, Occurrence, Resolution};
pub use evaluate::{evaluate, Evaluation, LinkProbe, Outcome, Summary};
pub use render::{outcomes_for_file, render, Badges};
