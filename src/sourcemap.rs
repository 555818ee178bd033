//! Companion source-map artifacts.
//!
//! Every compressed artifact can carry a source map v3 document next to it.
//! The maps are coarse: sources and their content are listed so devtools can
//! show the original files, but per-segment mappings are not synthesized.

use serde::Serialize;
use std::path::Path;

/// A source map v3 document.
#[derive(Debug, Serialize)]
pub struct SourceMap {
    pub version: u32,
    pub file: String,
    pub sources: Vec<String>,
    #[serde(rename = "sourcesContent")]
    pub sources_content: Vec<String>,
    pub names: Vec<String>,
    pub mappings: String,
}

impl SourceMap {
    /// Build a map for `artifact` from `(source path, source content)` pairs.
    pub fn new(artifact: &str, sources: Vec<(String, String)>) -> Self {
        let (paths, contents) = sources.into_iter().unzip();
        Self {
            version: 3,
            file: artifact.to_string(),
            sources: paths,
            sources_content: contents,
            names: Vec::new(),
            mappings: String::new(),
        }
    }

    /// Serialize to JSON. Key order is fixed by the struct, so output is
    /// byte-stable across runs.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("source map must serialize")
    }
}

/// The conventional map path for an artifact: `<artifact>.map`.
pub fn map_path(artifact: &Path) -> std::path::PathBuf {
    let mut name = artifact
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(".map");
    artifact.with_file_name(name)
}
