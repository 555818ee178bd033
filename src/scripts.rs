//! Script bundling and compression.
//!
//! Each bundle concatenates its config-declared sources in order and
//! compresses the result (comments stripped, whitespace collapsed, newlines
//! preserved). The vendor and app bundles are independent artifacts, each
//! with its own source map. A listed source that does not exist is a fatal
//! step failure — the bundle order is a contract, not a glob.

use crate::config::BundleConfig;
use crate::minify;
use crate::sourcemap::{self, SourceMap};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BundleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Bundle source not found: {0}")]
    SourceNotFound(PathBuf),
}

/// Result of bundling: the artifact path plus the concatenated sources.
#[derive(Debug)]
pub struct BundleArtifact {
    pub output: PathBuf,
    pub sources: Vec<PathBuf>,
}

/// Build one bundle into `output_root`/`config.output`.
pub fn bundle(
    source_root: &Path,
    output_root: &Path,
    config: &BundleConfig,
) -> Result<BundleArtifact, BundleError> {
    let mut sources = Vec::with_capacity(config.sources.len());
    let mut contents = Vec::with_capacity(config.sources.len());
    for rel in &config.sources {
        let path = source_root.join(rel);
        if !path.is_file() {
            return Err(BundleError::SourceNotFound(path));
        }
        contents.push((rel.clone(), fs::read_to_string(&path)?));
        sources.push(path);
    }

    // Concatenate in declared order, one newline between files.
    let mut joined = String::new();
    for (_, content) in &contents {
        joined.push_str(content);
        if !joined.ends_with('\n') {
            joined.push('\n');
        }
    }
    let body = minify::compress_js(&joined);

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
        let map = SourceMap::new(&artifact_name, contents);
        fs::write(&map_path, map.to_json())?;
        fs::write(&output, format!("{body}//# sourceMappingURL={map_name}\n"))?;
    } else {
        fs::write(&output, body)?;
    }

    Ok(BundleArtifact { output, sources })
}
