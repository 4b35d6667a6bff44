//! Documentation project
//!
//! Ties discovery, reading, parsing and resolution together for one
//! documentation root, and writes rendered files back out.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;
use thiserror::Error;

use super::config::Config;
use super::discover::find_markdown_files;
use crate::domain::{self, Badges, Evaluation, Marker, MarkerError, Resolution};

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Documentation root is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Cannot render {} outside the documentation root", .0.display())]
    OutsideRoot(PathBuf),
}

/// A per-file failure; the rest of the project is still resolved
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to read {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed placeholder in {}: {source}", .path.display())]
    Malformed { path: PathBuf, source: MarkerError },
}

impl SourceError {
    pub fn path(&self) -> &Path {
        match self {
            SourceError::Unreadable { path, .. } | SourceError::Malformed { path, .. } => path,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SourceError::Unreadable { .. } => "unreadable",
            SourceError::Malformed { .. } => "malformed",
        }
    }
}

/// Where rendered files go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderTarget {
    /// Overwrite the sources
    InPlace,

    /// Mirror the sources' relative paths under a directory
    Directory(PathBuf),
}

/// Everything learned from one pass over the documentation root
#[derive(Debug)]
pub struct Scan {
    /// Contents of every readable file
    pub sources: BTreeMap<PathBuf, String>,

    /// Markers of every file that parsed cleanly
    pub markers: BTreeMap<PathBuf, Vec<Marker>>,

    pub resolution: Resolution,

    /// Files that could not be read or parsed
    pub failures: Vec<SourceError>,
}

impl Scan {
    /// Builds a scan from already-read sources
    pub fn from_sources(sources: BTreeMap<PathBuf, String>, mut failures: Vec<SourceError>) -> Self {
        let mut markers = BTreeMap::new();

        for (path, text) in &sources {
            match domain::parse(text) {
                Ok(parsed) => {
                    log::debug!("{}: {} markers", path.display(), parsed.len());
                    markers.insert(path.clone(), parsed);
                }
                Err(source) => {
                    log::warn!("{}: {}", path.display(), source);
                    failures.push(SourceError::Malformed {
                        path: path.clone(),
                        source,
                    });
                }
            }
        }

        let resolution = domain::resolve(&markers);

        Self {
            sources,
            markers,
            resolution,
            failures,
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// A documentation root and its configuration
pub struct Project {
    root: PathBuf,
    config: Config,
}

impl Project {
    /// Opens the documentation root at `root`
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();

        if !root.is_dir() {
            return Err(ProjectError::NotADirectory(root).into());
        }

        let config = Config::for_root(&root)?;

        Ok(Self { root, config })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Lists the documentation files of the project
    pub fn discover(&self) -> Result<Vec<PathBuf>> {
        find_markdown_files(&self.root, &self.config.project)
    }

    /// Discovers, reads, parses and resolves the whole project
    pub fn scan(&self) -> Result<Scan> {
        let files = self.discover()?;
        let (sources, failures) = read_sources(&files);
        Ok(Scan::from_sources(sources, failures))
    }

    /// Writes every cleanly parsed file that contains markers, with outcomes
    /// substituted. Returns the written paths.
    pub fn write_rendered(
        &self,
        scan: &Scan,
        evaluation: &Evaluation,
        target: &RenderTarget,
    ) -> Result<Vec<PathBuf>> {
        let badges: &Badges = &self.config.project.render;
        let mut written = Vec::new();

        for (path, markers) in &scan.markers {
            if markers.is_empty() {
                continue;
            }
            let Some(text) = scan.sources.get(path) else {
                continue;
            };

            let outcomes = domain::outcomes_for_file(&scan.resolution, evaluation, path);
            let rendered = domain::render(text, &outcomes, badges);

            let destination = match target {
                RenderTarget::InPlace => path.clone(),
                RenderTarget::Directory(out) => {
                    let relative = path
                        .strip_prefix(&self.root)
                        .map_err(|_| ProjectError::OutsideRoot(path.clone()))?;
                    out.join(relative)
                }
            };

            write_atomic(&destination, &rendered)?;
            log::info!("Rendered {}", destination.display());
            written.push(destination);
        }

        Ok(written)
    }
}

/// Reads every file; unreadable files become failures
pub fn read_sources(files: &[PathBuf]) -> (BTreeMap<PathBuf, String>, Vec<SourceError>) {
    let mut sources = BTreeMap::new();
    let mut failures = Vec::new();

    for path in files {
        match fs::read_to_string(path) {
            Ok(text) => {
                sources.insert(path.clone(), text);
            }
            Err(source) => {
                log::warn!("Failed to read {}: {}", path.display(), source);
                failures.push(SourceError::Unreadable {
                    path: path.clone(),
                    source,
                });
            }
        }
    }

    (sources, failures)
}

/// Writes a file atomically (temp file + rename)
///
/// The temp file gets a unique name in the target's directory and is removed
/// if anything fails before the rename.
fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create directory: {}", parent.display()))?;

    let mut temp = NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;
    temp.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write temp file: {}", temp.path().display()))?;

    temp.persist(path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Check, LinkProbe, LinkTarget, Occurrence, Outcome, UnknownReason};
    use tempfile::TempDir;

    struct LocalOnly;

    impl LinkProbe for LocalOnly {
        fn probe(&self, target: &LinkTarget) -> Outcome {
            match target {
                LinkTarget::Local(path) if path.exists() => Outcome::Passed,
                LinkTarget::Local(path) => Outcome::Failed(format!("{} not found", path.display())),
                _ => Outcome::Indeterminate("offline".to_string()),
            }
        }
    }

    fn setup() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("docs")).unwrap();
        fs::write(
            root.join("README.md"),
            "# Project\n\nGuide: !DACDOC[guide](docs/guide.md);id=guide!\nAll: !DACDOC ids=guide,intro,gone!\n",
        )
        .unwrap();
        fs::write(
            root.join("docs/guide.md"),
            "Back to !DACDOC[readme](../README.md);id=intro!\n",
        )
        .unwrap();
        fs::write(root.join("docs/broken.md"), "Oops !DACDOC test=x;id=gone!\n").unwrap();
        dir
    }

    #[test]
    fn open_requires_directory() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("file.md");
        fs::write(&file, "x").unwrap();

        let err = Project::open(&file).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<ProjectError>(),
            Some(ProjectError::NotADirectory(_))
        ));
    }

    #[test]
    fn scan_keeps_going_after_malformed_file() {
        let dir = setup();
        let project = Project::open(dir.path()).unwrap();
        let scan = project.scan().unwrap();

        assert_eq!(scan.failures.len(), 1);
        assert_eq!(scan.failures[0].path(), dir.path().join("docs/broken.md"));
        assert_eq!(scan.failures[0].kind(), "malformed");
        assert_eq!(scan.sources.len(), 3);
        assert_eq!(scan.markers.len(), 2);
        assert_eq!(scan.resolution.len(), 3);

        // "gone" lived in the malformed file
        let composite = Occurrence::new(
            dir.path().join("README.md"),
            "!DACDOC ids=guide,intro,gone!".parse().unwrap(),
        );
        let check = scan.resolution.check_for(&composite).unwrap();
        let subs = check.as_composite().unwrap().checks();
        assert_eq!(
            scan.resolution.check(subs[2]),
            &Check::unknown(UnknownReason::MissingReference("gone".to_string()))
        );
    }

    #[test]
    fn unreadable_file_is_a_distinct_failure() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.md");

        let (sources, failures) = read_sources(&[missing]);
        assert!(sources.is_empty());
        assert_eq!(failures.len(), 1);
        assert!(matches!(failures[0], SourceError::Unreadable { .. }));
    }

    #[test]
    fn renders_into_output_directory() {
        let dir = setup();
        let out = TempDir::new().unwrap();
        let project = Project::open(dir.path()).unwrap();
        let scan = project.scan().unwrap();
        let evaluation = domain::evaluate(&scan.resolution, project.root(), &LocalOnly);

        let written = project
            .write_rendered(&scan, &evaluation, &RenderTarget::Directory(out.path().to_path_buf()))
            .unwrap();

        assert_eq!(written.len(), 2);
        let readme = fs::read_to_string(out.path().join("README.md")).unwrap();
        assert_eq!(readme, "# Project\n\nGuide: [guide](docs/guide.md) ✅\nAll: ❔\n");
        let guide = fs::read_to_string(out.path().join("docs/guide.md")).unwrap();
        assert_eq!(guide, "Back to [readme](../README.md) ✅\n");

        // sources untouched
        let source = fs::read_to_string(dir.path().join("README.md")).unwrap();
        assert!(source.contains("!DACDOC"));
    }

    #[test]
    fn renders_in_place() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.md"), "!DACDOC[x](nope.md)!\n").unwrap();
        let project = Project::open(dir.path()).unwrap();
        let scan = project.scan().unwrap();
        let evaluation = domain::evaluate(&scan.resolution, project.root(), &LocalOnly);

        project
            .write_rendered(&scan, &evaluation, &RenderTarget::InPlace)
            .unwrap();

        let text = fs::read_to_string(dir.path().join("a.md")).unwrap();
        assert_eq!(text, "[x](nope.md) ❌\n");
        assert!(!dir.path().join("a.md.tmp").exists());
    }

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn atomic_write_leaves_neighbouring_files_alone() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.md.tmp"), "keep me").unwrap();

        write_atomic(&dir.path().join("a.md"), "new").unwrap();

        assert_eq!(fs::read_to_string(dir.path().join("a.md")).unwrap(), "new");
        assert_eq!(fs::read_to_string(dir.path().join("a.md.tmp")).unwrap(), "keep me");
        assert_eq!(entries(dir.path()), ["a.md", "a.md.tmp"]);
    }

    #[test]
    fn failed_atomic_write_removes_temp_file() {
        let dir = TempDir::new().unwrap();
        // a non-empty directory where the file should go makes the rename fail
        fs::create_dir_all(dir.path().join("a.md/inner")).unwrap();

        assert!(write_atomic(&dir.path().join("a.md"), "new").is_err());
        assert_eq!(entries(dir.path()), ["a.md"]);
    }
}
