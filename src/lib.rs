//! dacdoc - verifiable claims in documentation
//!
//! Authors embed `!DACDOC...!` placeholders in markdown. Each one either
//! asserts a checkable fact (a link resolves) or combines other placeholders
//! by id. dacdoc parses the placeholders, resolves them into a check graph
//! across all files, evaluates the checks and writes the outcomes back.

pub mod domain;
pub mod storage;
pub mod cli;

pub use domain::{Check, Marker, MarkerKind, Occurrence, Outcome, Resolution};
