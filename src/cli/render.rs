//! `dacdoc render`: write documentation with outcomes substituted

use std::path::PathBuf;

use anyhow::Result;

use super::output::{relative, Output};
use crate::domain;
use crate::storage::{LiveProbe, Project, RenderTarget};

pub fn run(output: &Output, project: &Project, out: Option<PathBuf>, in_place: bool) -> Result<()> {
    let target = match out {
        Some(dir) if !in_place => RenderTarget::Directory(dir),
        _ => RenderTarget::InPlace,
    };

    let scan = project.scan()?;
    let probe = LiveProbe::new(&project.config().project.probe)?;
    let evaluation = domain::evaluate(&scan.resolution, project.root(), &probe);

    let written = project.write_rendered(&scan, &evaluation, &target)?;

    for failure in &scan.failures {
        output.error(&format!("{} (left unrendered)", failure));
    }

    if output.is_json() {
        let files: Vec<String> = written.iter().map(|p| p.display().to_string()).collect();
        output.data(&serde_json::json!({
            "written": files,
            "summary": evaluation.summary(&scan.resolution),
            "skipped": scan.failures.len(),
        }));
    } else {
        for path in &written {
            println!("Wrote {}", relative(project.root(), path));
        }
        output.success(&format!("Rendered {} file(s)", written.len()));
    }

    Ok(())
}
