//! Check evaluation
//!
//! Primitive checks are answered by a [`LinkProbe`] supplied by the caller;
//! the domain layer never touches the network or the filesystem itself.
//! Each check in the arena is evaluated at most once, however many
//! composites share it.

use serde::Serialize;
use std::fmt;
use std::path::Path;

use super::check::{Check, CheckId, LinkTarget};
use super::resolve::{Occurrence, Resolution};

/// Result of evaluating one check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed(String),
    /// Could not be decided (unknown check, offline, unsupported scheme, ...)
    Indeterminate(String),
}

impl Outcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, Outcome::Passed)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Passed => "passed",
            Outcome::Failed(_) => "failed",
            Outcome::Indeterminate(_) => "indeterminate",
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            Outcome::Passed => None,
            Outcome::Failed(detail) | Outcome::Indeterminate(detail) => Some(detail),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.detail() {
            Some(detail) => write!(f, "{}: {}", self.label(), detail),
            None => write!(f, "{}", self.label()),
        }
    }
}

/// Answers whether a link target exists
pub trait LinkProbe {
    fn probe(&self, target: &LinkTarget) -> Outcome;
}

/// Outcomes for every check of a resolution
#[derive(Debug, Clone)]
pub struct Evaluation {
    outcomes: Vec<Outcome>,
}

impl Evaluation {
    pub fn outcome(&self, id: CheckId) -> &Outcome {
        &self.outcomes[id.index()]
    }

    pub fn outcome_for(&self, resolution: &Resolution, occurrence: &Occurrence) -> Option<&Outcome> {
        resolution
            .check_id_for(occurrence)
            .map(|id| self.outcome(id))
    }

    /// Counts outcomes per occurrence
    pub fn summary(&self, resolution: &Resolution) -> Summary {
        let mut summary = Summary::default();
        for (_, id, _) in resolution.iter() {
            match self.outcome(id) {
                Outcome::Passed => summary.passed += 1,
                Outcome::Failed(_) => summary.failed += 1,
                Outcome::Indeterminate(_) => summary.indeterminate += 1,
            }
        }
        summary
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub passed: usize,
    pub failed: usize,
    pub indeterminate: usize,
}

impl Summary {
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.indeterminate
    }
}

/// Evaluates every check in the resolution
///
/// `root` is the documentation root; root-relative links resolve against it.
pub fn evaluate(resolution: &Resolution, root: &Path, probe: &dyn LinkProbe) -> Evaluation {
    let mut evaluator = Evaluator {
        checks: resolution.checks(),
        root,
        probe,
        outcomes: vec![None; resolution.checks().len()],
        in_progress: vec![false; resolution.checks().len()],
    };

    for i in 0..resolution.checks().len() {
        evaluator.evaluate(i);
    }

    let outcomes = evaluator
        .outcomes
        .into_iter()
        .map(|outcome| outcome.unwrap_or_else(|| Outcome::Indeterminate("not evaluated".to_string())))
        .collect();

    Evaluation { outcomes }
}

struct Evaluator<'a> {
    checks: &'a [Check],
    root: &'a Path,
    probe: &'a dyn LinkProbe,
    outcomes: Vec<Option<Outcome>>,
    in_progress: Vec<bool>,
}

impl Evaluator<'_> {
    fn evaluate(&mut self, index: usize) -> Outcome {
        if let Some(outcome) = &self.outcomes[index] {
            return outcome.clone();
        }
        // Resolution removes cycles; this only guards against a hand-built arena
        if self.in_progress[index] {
            return Outcome::Indeterminate("cyclic composite reference".to_string());
        }
        self.in_progress[index] = true;

        let checks = self.checks;
        let outcome = match &checks[index] {
            Check::Url(url) => {
                let target = url.target(self.root);
                log::debug!("Probing {:?} from {}", target, url.file().display());
                self.probe.probe(&target)
            }
            Check::Composite(composite) => {
                let subs: Vec<Outcome> = composite
                    .checks()
                    .iter()
                    .map(|id| self.evaluate(id.index()))
                    .collect();
                combine(&subs)
            }
            Check::Unknown { reason } => Outcome::Indeterminate(reason.to_string()),
        };

        self.in_progress[index] = false;
        self.outcomes[index] = Some(outcome.clone());
        outcome
    }
}

/// A composite passes iff all sub-checks pass; any failure fails it
fn combine(subs: &[Outcome]) -> Outcome {
    let failed = subs.iter().filter(|o| o.is_failed()).count();
    let undecided = subs
        .iter()
        .filter(|o| matches!(o, Outcome::Indeterminate(_)))
        .count();

    if failed > 0 {
        Outcome::Failed(format!("{} of {} sub-checks failed", failed, subs.len()))
    } else if undecided > 0 {
        Outcome::Indeterminate(format!(
            "{} of {} sub-checks indeterminate",
            undecided,
            subs.len()
        ))
    } else {
        Outcome::Passed
    }
}
