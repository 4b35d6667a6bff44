//! Result substitution
//!
//! Replaces each placeholder in a document with its argument followed by a
//! badge for the outcome of its check. Placeholders without a known outcome
//! (malformed, or from a file that was not resolved) are left as they are.

use regex::Captures;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use super::evaluate::{Evaluation, Outcome};
use super::marker::{placeholder_pattern, Marker};
use super::resolve::Resolution;

/// Text inserted after a rendered marker, per outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Badges {
    pub passed: String,
    pub failed: String,
    pub indeterminate: String,
}

impl Default for Badges {
    fn default() -> Self {
        Self {
            passed: "✅".to_string(),
            failed: "❌".to_string(),
            indeterminate: "❔".to_string(),
        }
    }
}

impl Badges {
    pub fn for_outcome(&self, outcome: &Outcome) -> &str {
        match outcome {
            Outcome::Passed => &self.passed,
            Outcome::Failed(_) => &self.failed,
            Outcome::Indeterminate(_) => &self.indeterminate,
        }
    }
}

/// Outcomes of the markers found in `file`, keyed by raw placeholder text
pub fn outcomes_for_file(
    resolution: &Resolution,
    evaluation: &Evaluation,
    file: &Path,
) -> HashMap<String, Outcome> {
    resolution
        .iter()
        .filter(|(occurrence, _, _)| occurrence.file() == file)
        .map(|(occurrence, id, _)| {
            (
                occurrence.marker().raw().to_string(),
                evaluation.outcome(id).clone(),
            )
        })
        .collect()
}

/// Rewrites `text`, substituting every placeholder that has an outcome
pub fn render(text: &str, outcomes: &HashMap<String, Outcome>, badges: &Badges) -> String {
    placeholder_pattern()
        .replace_all(text, |caps: &Captures| {
            let raw = &caps[0];

            let Some(outcome) = outcomes.get(raw) else {
                return raw.to_string();
            };
            let badge = badges.for_outcome(outcome);

            match Marker::from_raw(raw).ok().as_ref().and_then(Marker::argument) {
                Some(argument) => format!("{} {}", argument, badge),
                None => badge.to_string(),
            }
        })
        .into_owned()
}
