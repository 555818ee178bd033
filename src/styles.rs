//! Style compilation.
//!
//! Transforms one entry stylesheet into a single artifact: `@import`
//! directives are inlined recursively, the result is optionally compressed,
//! and a companion source map lists every file that went into the artifact.
//! The artifact is overwritten wholesale on every run — no caching, no
//! partial recompilation.
//!
//! ## Import Resolution
//!
//! ```text
//! @import "reset.css";      -> inlined relative to the importing file
//! @import 'type';           -> extension of the importing file assumed
//! @import url(...)          -> left alone (remote/runtime import)
//! ```
//!
//! A missing or cyclic import is a fatal step failure.

use crate::config::StylesConfig;
use crate::minify;
use crate::sourcemap::{self, SourceMap};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StyleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Entry stylesheet not found: {0}")]
    EntryNotFound(PathBuf),
    #[error("Import not found: {path} (imported from {from})")]
    ImportNotFound { path: PathBuf, from: PathBuf },
    #[error("Import cycle involving {0}")]
    ImportCycle(PathBuf),
}

/// Result of a style compilation: the artifact path plus the inlined sources.
#[derive(Debug)]
pub struct StyleArtifact {
    pub output: PathBuf,
    /// Every source file that was inlined, entry first, in inclusion order.
    pub sources: Vec<PathBuf>,
}

/// Compile the entry stylesheet into `output_root`/`config.output`.
pub fn compile(
    source_root: &Path,
    output_root: &Path,
    config: &StylesConfig,
) -> Result<StyleArtifact, StyleError> {
    let entry = source_root.join(&config.entry);
    if !entry.is_file() {
        return Err(StyleError::EntryNotFound(entry));
    }

    let mut inlined = Vec::new();
    let mut state = InlineState::default();
    let css = inline_imports(&entry, &mut state, &mut inlined)?;

    let body = if config.compress {
        minify::compress_css(&css)
    } else {
        css
    };

    let output = output_root.join(&config.output);
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }

    if config.source_map {
        let map_path = sourcemap::map_path(&output);
        let map_name = map_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let artifact_name = output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let entries = inlined
            .iter()
            .map(|p| {
                let rel = crate::sources::relative_to(p, source_root);
                let content = fs::read_to_string(p).unwrap_or_default();
                (rel.to_string_lossy().into_owned(), content)
            })
            .collect();
        let map = SourceMap::new(&artifact_name, entries);
        fs::write(&map_path, map.to_json())?;
        fs::write(&output, format!("{body}\n/*# sourceMappingURL={map_name} */\n"))?;
    } else {
        fs::write(&output, format!("{body}\n"))?;
    }

    Ok(StyleArtifact {
        output,
        sources: inlined,
    })
}

/// Import traversal state: `active` detects cycles, `done` gives each file
/// import-once semantics (a file imported from two places is inlined once).
#[derive(Default)]
struct InlineState {
    active: HashSet<PathBuf>,
    done: HashSet<PathBuf>,
}

/// Recursively read `file`, replacing local `@import` directives with the
/// imported file's (recursively inlined) content.
fn inline_imports(
    file: &Path,
    state: &mut InlineState,
    inlined: &mut Vec<PathBuf>,
) -> Result<String, StyleError> {
    let canonical = file.canonicalize().unwrap_or_else(|_| file.to_path_buf());
    if state.active.contains(&canonical) {
        return Err(StyleError::ImportCycle(file.to_path_buf()));
    }
    if state.done.contains(&canonical) {
        return Ok(String::new());
    }
    state.active.insert(canonical.clone());
    inlined.push(file.to_path_buf());

    let content = fs::read_to_string(file)?;
    let dir = file.parent().unwrap_or(Path::new("."));
    let mut out = String::with_capacity(content.len());

    for line in content.lines() {
        match parse_import(line) {
            Some(spec) => {
                let target = resolve_import(dir, &spec, file)?;
                let inner = inline_imports(&target, state, inlined)?;
                out.push_str(&inner);
                if !inner.is_empty() && !inner.ends_with('\n') {
                    out.push('\n');
                }
            }
            None => {
                out.push_str(line);
                out.push('\n');
            }
        }
    }
    state.active.remove(&canonical);
    state.done.insert(canonical);
    Ok(out)
}

/// Extract the quoted path from an `@import` line, if it is a local import.
///
/// `@import url(...)` and media-qualified imports are left for the browser.
fn parse_import(line: &str) -> Option<String> {
    let trimmed = line.trim();
    let rest = trimmed.strip_prefix("@import")?.trim();
    if rest.starts_with("url(") {
        return None;
    }
    let quote = rest.chars().next()?;
    if quote != '"' && quote != '\'' {
        return None;
    }
    let inner = &rest[1..];
    let end = inner.find(quote)?;
    let after = inner[end + 1..].trim().trim_end_matches(';').trim();
    if !after.is_empty() {
        // media query after the path: keep the directive as written
        return None;
    }
    Some(inner[..end].to_string())
}

/// Resolve an import spec against the importing file's directory. A spec
/// without an extension inherits the importing file's extension.
fn resolve_import(dir: &Path, spec: &str, from: &Path) -> Result<PathBuf, StyleError> {
    let mut target = dir.join(spec);
    if target.extension().is_none() {
        if let Some(ext) = from.extension() {
            target.set_extension(ext);
        }
    }
    if target.is_file() {
        Ok(target)
    } else {
        Err(StyleError::ImportNotFound {
            path: target,
            from: from.to_path_buf(),
        })
    }
}
