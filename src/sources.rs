//! Source-set selection.
//!
//! A source set is an ordered collection of file paths under a root directory,
//! filtered by extension and a skip list, re-evaluated on every pipeline run.
//! Results are sorted by path so artifact content is deterministic. Explicitly
//! ordered lists (script bundles) come straight from config instead — their
//! declared order is part of the artifact contract and is never re-sorted.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Collect all files under `root` whose extension (lowercased) is in `extensions`,
/// skipping any file whose basename appears in `skip`. Pass an empty extension
/// slice to match every file.
///
/// Returns paths sorted lexically. A missing root yields an empty set — whether
/// that is an error is the calling step's decision.
pub fn collect(root: &Path, extensions: &[&str], skip: &[String]) -> Vec<PathBuf> {
    if !root.is_dir() {
        return Vec::new();
    }
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| !is_skipped(p, skip))
        .filter(|p| extensions.is_empty() || has_extension(p, extensions))
        .collect();
    files.sort();
    files
}

/// Path of `file` relative to `root`, falling back to the file name when the
/// file is not under `root` (symlinked sources).
pub fn relative_to<'a>(file: &'a Path, root: &Path) -> PathBuf {
    file.strip_prefix(root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| PathBuf::from(file.file_name().unwrap_or_default()))
}

fn is_skipped(path: &Path, skip: &[String]) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| skip.iter().any(|s| s == n))
        .unwrap_or(false)
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            extensions.iter().any(|x| *x == e)
        })
        .unwrap_or(false)
}
