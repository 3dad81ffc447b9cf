//! Spec file discovery with include/exclude filtering.

use anyhow::{Context, Result};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const SPEC_EXTENSIONS: &[&str] = &["yaml", "yml"];

/// Collects spec files under `input`.
///
/// A file argument is returned as-is and the filters do not apply. A
/// directory is walked recursively for YAML files, each path matched
/// against the filters with exclude taking precedence over include.
/// Symlinks are not followed, so a link cycle cannot re-discover the
/// same spec under a longer path. Results are sorted so processing
/// order is stable across runs.
pub fn discover_spec_files(
    input: &Path,
    include: Option<&Regex>,
    exclude: Option<&Regex>,
) -> Result<Vec<PathBuf>> {
    let metadata =
        fs::metadata(input).with_context(|| format!("reading {}", input.display()))?;
    if metadata.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(input) {
        let entry = entry.with_context(|| format!("reading {}", input.display()))?;
        if entry.file_type().is_file() && has_spec_extension(entry.path()) {
            files.push(entry.into_path());
        }
    }
    files.retain(|path| selected(path, include, exclude));
    files.sort();
    Ok(files)
}

fn has_spec_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SPEC_EXTENSIONS.contains(&ext))
}

fn selected(path: &Path, include: Option<&Regex>, exclude: Option<&Regex>) -> bool {
    let text = path.to_string_lossy();
    if let Some(exclude) = exclude {
        if exclude.is_match(&text) {
            return false;
        }
    }
    match include {
        Some(include) => include.is_match(&text),
        None => true,
    }
}
