//! Site configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! overridden by whatever keys the user's file provides; every step of the
//! pipeline receives its slice of the resulting immutable [`SiteConfig`] at
//! invocation time.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [styles]
//! entry = "less/app.css"        # Entry stylesheet (imports inlined)
//! output = "css/main.min.css"   # Artifact path, relative to output root
//! compress = true
//! source_map = true
//!
//! [templates]
//! dir = "templates"             # Template source directory
//! output = "js/templates.js"    # Registry artifact
//! variable = "data"             # Interpolation variable name
//!
//! [scripts.vendor]
//! sources = ["vendor/jquery.js", "vendor/underscore.js"]
//! output = "js/vendor.min.js"
//!
//! [scripts.app]
//! sources = ["js/app.js"]
//! output = "js/scripts.min.js"
//!
//! [images]
//! dir = "img"
//! output = "img"
//! quality = 85                  # JPEG quality (0-100)
//! optimization_level = 7        # PNG effort (0-9)
//!
//! [fonts]
//! sources = ["fonts"]
//! output = "fonts"
//!
//! [feed]
//! user = "amsross"
//! endpoint = "https://api.github.com"
//! template = "repo"
//!
//! [generator]
//! command = "jekyll"
//! args = ["build"]
//!
//! [watch]
//! debounce_ms = 150
//! ```
//!
//! Config files are sparse — override just the values you want. Unknown keys
//! are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Build configuration loaded from `config.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Style compilation settings.
    pub styles: StylesConfig,
    /// Template compilation settings.
    pub templates: TemplatesConfig,
    /// Script bundle settings (vendor and app bundles).
    pub scripts: ScriptsConfig,
    /// Image recompression settings.
    pub images: ImagesConfig,
    /// Font copy settings.
    pub fonts: FontsConfig,
    /// Repository feed settings.
    pub feed: FeedConfig,
    /// External site generator invocation.
    pub generator: GeneratorConfig,
    /// Watcher settings.
    pub watch: WatchConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            styles: StylesConfig::default(),
            templates: TemplatesConfig::default(),
            scripts: ScriptsConfig::default(),
            images: ImagesConfig::default(),
            fonts: FontsConfig::default(),
            feed: FeedConfig::default(),
            generator: GeneratorConfig::default(),
            watch: WatchConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.images.quality > 100 {
            return Err(ConfigError::Validation(
                "images.quality must be 0-100".into(),
            ));
        }
        if self.images.optimization_level > 9 {
            return Err(ConfigError::Validation(
                "images.optimization_level must be 0-9".into(),
            ));
        }
        if self.scripts.vendor.sources.is_empty() {
            return Err(ConfigError::Validation(
                "scripts.vendor.sources must not be empty".into(),
            ));
        }
        if self.scripts.app.sources.is_empty() {
            return Err(ConfigError::Validation(
                "scripts.app.sources must not be empty".into(),
            ));
        }
        if self.watch.debounce_ms == 0 {
            return Err(ConfigError::Validation(
                "watch.debounce_ms must be non-zero".into(),
            ));
        }
        if self.feed.user.is_empty() {
            return Err(ConfigError::Validation("feed.user must not be empty".into()));
        }
        Ok(())
    }
}

/// Style compilation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StylesConfig {
    /// Entry stylesheet, relative to the source root. Imports are inlined.
    pub entry: String,
    /// Artifact path, relative to the output root.
    pub output: String,
    /// Whether to compress the inlined stylesheet.
    pub compress: bool,
    /// Whether to emit a companion source map.
    pub source_map: bool,
}

impl Default for StylesConfig {
    fn default() -> Self {
        Self {
            entry: "less/app.css".to_string(),
            output: "css/main.min.css".to_string(),
            compress: true,
            source_map: true,
        }
    }
}

/// Template compilation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemplatesConfig {
    /// Template source directory, relative to the source root.
    pub dir: String,
    /// Registry artifact path, relative to the output root.
    pub output: String,
    /// Name of the record variable inside template expressions.
    pub variable: String,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            dir: "templates".to_string(),
            output: "js/templates.js".to_string(),
            variable: "data".to_string(),
        }
    }
}

/// One script bundle: an ordered source list and its artifact path.
///
/// Source order is part of the artifact contract — files are concatenated
/// in the declared order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BundleConfig {
    /// Ordered source files, relative to the source root.
    pub sources: Vec<String>,
    /// Artifact path, relative to the output root.
    pub output: String,
    /// Whether to emit a companion source map.
    pub source_map: bool,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            output: String::new(),
            source_map: true,
        }
    }
}

/// Script bundle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScriptsConfig {
    /// Fixed third-party bundle.
    pub vendor: BundleConfig,
    /// The application's own bundle.
    pub app: BundleConfig,
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            vendor: BundleConfig {
                sources: vec![
                    "vendor/jquery.js".to_string(),
                    "vendor/underscore.js".to_string(),
                ],
                output: "js/vendor.min.js".to_string(),
                source_map: true,
            },
            app: BundleConfig {
                sources: vec!["js/app.js".to_string()],
                output: "js/scripts.min.js".to_string(),
                source_map: true,
            },
        }
    }
}

/// Image recompression settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Image source directory, relative to the source root.
    pub dir: String,
    /// Output directory, relative to the output root.
    pub output: String,
    /// JPEG re-encoding quality (0 = worst, 100 = best).
    pub quality: u8,
    /// PNG compression effort (0 = fastest, 9 = smallest).
    pub optimization_level: u8,
    /// Basenames to skip entirely.
    pub skip: Vec<String>,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            dir: "img".to_string(),
            output: "img".to_string(),
            quality: 85,
            optimization_level: 7,
            skip: vec!["Thumbs.db".to_string(), ".DS_Store".to_string()],
        }
    }
}

/// Font copy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FontsConfig {
    /// Source directories (searched recursively), relative to the source root.
    pub sources: Vec<String>,
    /// Output directory, relative to the output root. Copies are flattened.
    pub output: String,
}

impl Default for FontsConfig {
    fn default() -> Self {
        Self {
            sources: vec!["fonts".to_string()],
            output: "fonts".to_string(),
        }
    }
}

/// Repository feed settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeedConfig {
    /// GitHub username whose public repositories are listed.
    pub user: String,
    /// API base URL. The request path is `/users/<user>/repos`.
    pub endpoint: String,
    /// Template id used to render each repository record.
    pub template: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            user: "amsross".to_string(),
            endpoint: "https://api.github.com".to_string(),
            template: "repo".to_string(),
        }
    }
}

/// External site generator invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Generator binary to run after the default task.
    pub command: String,
    /// Arguments passed to the generator.
    pub args: Vec<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            command: "jekyll".to_string(),
            args: vec!["build".to_string()],
        }
    }
}

/// Watcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchConfig {
    /// Debounce window in milliseconds. Changes closer together than this
    /// are coalesced into one re-run.
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: 150 }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// The stock defaults as an untyped TOML table, the base every user file
/// is layered onto.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Layer `overlay` onto `base`, table by table.
///
/// Matching tables merge recursively; any other overlay value wins outright.
/// Base keys the overlay does not mention survive unchanged.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut merged), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                let value = match merged.remove(&key) {
                    Some(existing) => merge_toml(existing, value),
                    None => value,
                };
                merged.insert(key, value);
            }
            toml::Value::Table(merged)
        }
        (_, value) => value,
    }
}

/// Read a directory's `config.toml`, if present, as an untyped value.
///
/// `Ok(None)` means there is nothing to overlay; a file that fails to parse
/// is an error.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let file = path.join("config.toml");
    let content = match fs::read_to_string(&file) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    Ok(Some(toml::from_str(&content)?))
}

/// Deserialize the (optionally overlaid) value into a validated
/// [`SiteConfig`]. Unknown keys fail deserialization.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(user) => merge_toml(base, user),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the effective config for a project directory: stock defaults with
/// the directory's `config.toml`, when present, layered on top.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let overlay = load_raw_config(root)?;
    resolve_config(stock_defaults_value(), overlay)
}

/// Load config from an explicit file path. Unlike [`load_config`], a missing
/// file is an error here; the user asked for that exact file.
pub fn load_config_file(path: &Path) -> Result<SiteConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let overlay: toml::Value = toml::from_str(&content)?;
    resolve_config(stock_defaults_value(), Some(overlay))
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# sitekit configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Each key only needs to appear when
# you want to override it. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Style compilation
# ---------------------------------------------------------------------------
[styles]
# Entry stylesheet, relative to the source root. @import directives are
# inlined recursively before compression.
entry = "less/app.css"

# Artifact path, relative to the output root.
output = "css/main.min.css"

# Compress the inlined stylesheet (strip comments, collapse whitespace).
compress = true

# Emit a companion .map file next to the artifact.
source_map = true

# ---------------------------------------------------------------------------
# Template compilation
# ---------------------------------------------------------------------------
[templates]
# Template source directory, relative to the source root.
dir = "templates"

# Registry artifact path, relative to the output root.
output = "js/templates.js"

# Name of the record variable inside template expressions,
# e.g. <%= data.name %> with variable = "data".
variable = "data"

# ---------------------------------------------------------------------------
# Script bundles
# ---------------------------------------------------------------------------
# Sources are concatenated in the declared order, then compressed.
[scripts.vendor]
sources = ["vendor/jquery.js", "vendor/underscore.js"]
output = "js/vendor.min.js"
source_map = true

[scripts.app]
sources = ["js/app.js"]
output = "js/scripts.min.js"
source_map = true

# ---------------------------------------------------------------------------
# Image recompression
# ---------------------------------------------------------------------------
[images]
# Source and output directories (relative to source/output roots).
dir = "img"
output = "img"

# JPEG re-encoding quality (0 = worst, 100 = best).
quality = 85

# PNG compression effort (0 = fastest, 9 = smallest).
optimization_level = 7

# Basenames to skip entirely.
skip = ["Thumbs.db", ".DS_Store"]

# ---------------------------------------------------------------------------
# Fonts
# ---------------------------------------------------------------------------
[fonts]
# Source directories, searched recursively. Copies are flattened: every
# file lands directly under the output directory.
sources = ["fonts"]
output = "fonts"

# ---------------------------------------------------------------------------
# Repository feed
# ---------------------------------------------------------------------------
[feed]
# GitHub username whose public repositories are listed.
user = "amsross"

# API base URL. The request path is /users/<user>/repos.
endpoint = "https://api.github.com"

# Template id used to render each repository record.
template = "repo"

# ---------------------------------------------------------------------------
# Site generator
# ---------------------------------------------------------------------------
[generator]
# External generator run last by the `build` command.
command = "jekyll"
args = ["build"]

# ---------------------------------------------------------------------------
# Watcher
# ---------------------------------------------------------------------------
[watch]
# Debounce window in milliseconds. Changes closer together than this are
# coalesced into one re-run.
debounce_ms = 150
"##
}
