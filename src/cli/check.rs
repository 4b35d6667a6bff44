//! `dacdoc check`: evaluate every marker and report

use anyhow::Result;
use serde::Serialize;

use super::output::{one_line, relative, Output};
use crate::domain::{self, Evaluation, Outcome, Summary};
use crate::storage::{LiveProbe, Project, Scan};

#[derive(Serialize)]
struct ResultRow {
    file: String,
    marker: String,
    kind: String,
    id: Option<String>,
    check: String,
    outcome: Outcome,
}

#[derive(Serialize)]
struct FailureRow {
    file: String,
    kind: &'static str,
    error: String,
}

#[derive(Serialize)]
struct Report {
    root: String,
    summary: Summary,
    results: Vec<ResultRow>,
    failures: Vec<FailureRow>,
}

/// Runs all checks of a project
pub fn run(output: &Output, project: &Project, strict: bool) -> Result<()> {
    let scan = project.scan()?;
    let probe = LiveProbe::new(&project.config().project.probe)?;
    let evaluation = domain::evaluate(&scan.resolution, project.root(), &probe);

    let report = build_report(project, &scan, &evaluation);
    let summary = report.summary;
    let broken_files = report.failures.len();

    if output.is_json() {
        output.data(&report);
    } else {
        print_text(output, &report);
    }

    let failed = summary.failed + if strict { summary.indeterminate } else { 0 };
    if failed > 0 || broken_files > 0 {
        anyhow::bail!(
            "{} check(s) failed, {} file(s) could not be processed",
            failed,
            broken_files
        );
    }

    Ok(())
}

fn build_report(project: &Project, scan: &Scan, evaluation: &Evaluation) -> Report {
    let root = project.root();

    let results = scan
        .resolution
        .iter()
        .map(|(occurrence, id, check)| {
            let marker = occurrence.marker();
            ResultRow {
                file: relative(root, occurrence.file()),
                marker: marker.raw().to_string(),
                kind: marker.kind().to_string(),
                id: marker.id().map(String::from),
                check: check.describe(),
                outcome: evaluation.outcome(id).clone(),
            }
        })
        .collect();

    let failures = scan
        .failures
        .iter()
        .map(|failure| FailureRow {
            file: relative(root, failure.path()),
            kind: failure.kind(),
            error: failure.to_string(),
        })
        .collect();

    Report {
        root: root.display().to_string(),
        summary: evaluation.summary(&scan.resolution),
        results,
        failures,
    }
}

fn print_text(output: &Output, report: &Report) {
    let mut current_file: Option<&str> = None;

    for row in &report.results {
        if current_file != Some(row.file.as_str()) {
            println!("{}", row.file);
            current_file = Some(row.file.as_str());
        }

        let status = match row.outcome {
            Outcome::Passed => "PASS",
            Outcome::Failed(_) => "FAIL",
            Outcome::Indeterminate(_) => "????",
        };
        println!("  [{}] {}", status, one_line(&row.marker, 60));
        if let Some(detail) = row.outcome.detail() {
            println!("         {}", detail);
        }
    }

    for failure in &report.failures {
        output.error(&format!("{} ({})", failure.error, failure.kind));
    }

    let summary = &report.summary;
    println!();
    println!(
        "Checked {} marker(s): {} passed, {} failed, {} indeterminate",
        summary.total(),
        summary.passed,
        summary.failed,
        summary.indeterminate
    );
}
