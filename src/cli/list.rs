//! `dacdoc list`: show markers and how they were resolved

use anyhow::Result;

use super::output::{one_line, relative, Output};
use crate::storage::Project;

pub fn run(output: &Output, project: &Project) -> Result<()> {
    let scan = project.scan()?;
    let root = project.root();
    log::debug!("Listing {} occurrences", scan.resolution.len());

    if output.is_json() {
        let items: Vec<_> = scan
            .resolution
            .iter()
            .map(|(occurrence, id, check)| {
                serde_json::json!({
                    "file": relative(root, occurrence.file()),
                    "marker": occurrence.marker(),
                    "check_id": id,
                    "check": check,
                })
            })
            .collect();
        let failures: Vec<_> = scan
            .failures
            .iter()
            .map(|f| {
                serde_json::json!({
                    "file": relative(root, f.path()),
                    "kind": f.kind(),
                    "error": f.to_string(),
                })
            })
            .collect();
        output.data(&serde_json::json!({
            "occurrences": items,
            "cycles": scan.resolution.cycles(),
            "failures": failures,
        }));
        return Ok(());
    }

    if scan.resolution.is_empty() {
        println!("No markers found.");
    } else {
        println!("{:<6} {:<24} {:<10} {:<10} MARKER", "CHECK", "FILE", "KIND", "ID");
        println!("{}", "-".repeat(90));
        for (occurrence, id, check) in scan.resolution.iter() {
            let marker = occurrence.marker();
            println!(
                "{:<6} {:<24} {:<10} {:<10} {}",
                id.to_string(),
                relative(root, occurrence.file()),
                marker.kind().to_string(),
                marker.id().unwrap_or("-"),
                one_line(marker.raw(), 40)
            );
            println!("{:<6} -> {}", "", check.describe());
        }
    }

    for failure in &scan.failures {
        output.error(&failure.to_string());
    }

    Ok(())
}
