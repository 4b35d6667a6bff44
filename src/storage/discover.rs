//! Documentation file discovery

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::config::ProjectConfig;

/// Finds documentation files under `root`, sorted by path
///
/// Hidden directories and directories named in `config.exclude` are skipped.
/// The root itself must be readable; unreadable subdirectories are logged
/// and skipped.
pub fn find_markdown_files(root: &Path, config: &ProjectConfig) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    let mut is_root = true;

    while let Some(dir) = pending.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if is_root => {
                return Err(e).with_context(|| {
                    format!("Failed to read documentation root: {}", dir.display())
                })
            }
            Err(e) => {
                log::warn!("Skipping unreadable directory {}: {}", dir.display(), e);
                continue;
            }
        };
        is_root = false;

        for entry in entries.flatten() {
            let path = entry.path();
            let Ok(file_type) = entry.file_type() else {
                continue;
            };

            if file_type.is_dir() {
                if is_skipped_dir(&path, config) {
                    log::debug!("Skipping directory {}", path.display());
                } else {
                    pending.push(path);
                }
            } else if file_type.is_file() && config.is_doc_file(&path) {
                files.push(path);
            }
        }
    }

    files.sort();
    log::debug!("Found {} documentation files under {}", files.len(), root.display());
    Ok(files)
}

fn is_skipped_dir(path: &Path, config: &ProjectConfig) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return true;
    };
    name.starts_with('.') || config.exclude.iter().any(|x| x == name)
}
