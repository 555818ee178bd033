//! Font copying.
//!
//! Flattens font files from the configured source directories into the
//! output fonts directory: a file at `a/b/font.woff` and one at
//! `c/font2.woff` both land directly under the output root, no
//! subdirectories. A basename collision between two different sources is an
//! error — silently keeping one of the two would be a content bug.

use crate::config::FontsConfig;
use crate::sources;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const FONT_EXTENSIONS: &[&str] = &["woff", "woff2", "ttf", "otf", "eot", "svg"];

#[derive(Error, Debug)]
pub enum FontError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Font basename collision: {first} and {second} both flatten to {name}")]
    NameCollision {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },
}

/// Copy all fonts into `output_root`/`config.output`, flattened.
/// Returns the copied files' destination paths in deterministic order.
pub fn copy_fonts(
    source_root: &Path,
    output_root: &Path,
    config: &FontsConfig,
) -> Result<Vec<PathBuf>, FontError> {
    let output_dir = output_root.join(&config.output);
    let mut by_name: HashMap<String, PathBuf> = HashMap::new();
    let mut copied = Vec::new();

    for dir in &config.sources {
        for file in sources::collect(&source_root.join(dir), FONT_EXTENSIONS, &[]) {
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if let Some(first) = by_name.get(&name) {
                return Err(FontError::NameCollision {
                    name,
                    first: first.clone(),
                    second: file,
                });
            }
            by_name.insert(name.clone(), file.clone());

            fs::create_dir_all(&output_dir)?;
            let target = output_dir.join(&name);
            fs::copy(&file, &target)?;
            copied.push(target);
        }
    }
    Ok(copied)
}
