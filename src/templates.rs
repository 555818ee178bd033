//! Template compilation and the template registry.
//!
//! A directory of `.tpl` sources compiles into two things:
//!
//! - an in-process [`TemplateRegistry`] mapping typed [`TemplateId`]s to
//!   compiled render functions, consumed by the feed renderer;
//! - a client-side registry artifact (`templates.js`) exposing each template
//!   as a callable function keyed by its original source path.
//!
//! ## Template Syntax
//!
//! ```text
//! <li><a href="<%- data.html_url %>"><%= data.name %></a></li>
//! ```
//!
//! `<%= expr %>` interpolates HTML-escaped, `<%- expr %>` interpolates raw.
//! Expressions are dotted field lookups rooted at the configured variable
//! name (`data` by default). Missing or null fields render as empty.
//!
//! ## Fallback Artifact
//!
//! [`write_fallback`] emits the empty-registry prelude so the artifact exists
//! and client-side lookups fail gracefully even when the template source set
//! is empty. The full compile overwrites it with the populated registry.
//!
//! ## Typed Ids
//!
//! Registry lookups go through [`TemplateId`] (the source path stem), shared
//! between the compiler and consumers, and return `Result` — a bad id is a
//! reported error, not a silent miss.

use crate::config::TemplatesConfig;
use crate::sources;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const TEMPLATE_EXTENSIONS: &[&str] = &["tpl"];

/// Registry prelude. Written alone by the fallback step; idempotent when the
/// artifact is loaded more than once.
const REGISTRY_PRELUDE: &str = "this.JST = this.JST || {};\n";

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unknown template id: {0}")]
    UnknownTemplate(TemplateId),
    #[error("Duplicate template id {id} ({first} and {second})")]
    DuplicateId {
        id: TemplateId,
        first: PathBuf,
        second: PathBuf,
    },
    #[error("Bad expression in {path}: {detail}")]
    BadExpression { path: PathBuf, detail: String },
    #[error("Unclosed tag in {0}")]
    UnclosedTag(PathBuf),
}

/// Typed template identifier: the source path relative to the template
/// directory, without extension. `templates/repo.tpl` → `repo`,
/// `templates/cards/repo.tpl` → `cards/repo`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TemplateId(String);

impl TemplateId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derive the id for a template source path relative to the template dir.
    fn from_relative_path(rel: &Path) -> Self {
        let stem = rel.with_extension("");
        Self(stem.to_string_lossy().replace('\\', "/"))
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One parsed segment of a template body.
#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    /// HTML-escaped interpolation of a dotted field path.
    Escaped(Vec<String>),
    /// Raw interpolation of a dotted field path.
    Raw(Vec<String>),
}

/// A compiled template: parsed segments plus provenance.
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    pub id: TemplateId,
    /// Source path relative to the source root — the client-side registry key.
    pub source_path: String,
    segments: Vec<Segment>,
}

impl CompiledTemplate {
    /// Render against a JSON record. Missing and null fields render empty;
    /// scalars render via their JSON display form without quotes.
    pub fn render(&self, record: &Value) -> String {
        let mut out = String::new();
        for seg in &self.segments {
            match seg {
                Segment::Literal(s) => out.push_str(s),
                Segment::Escaped(path) => out.push_str(&html_escape(&lookup(record, path))),
                Segment::Raw(path) => out.push_str(&lookup(record, path)),
            }
        }
        out
    }
}

/// The compiled template registry, keyed by [`TemplateId`].
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    templates: BTreeMap<TemplateId, CompiledTemplate>,
}

impl TemplateRegistry {
    /// Look up a template by id. An unknown id is an error, never a panic.
    pub fn get(&self, id: &TemplateId) -> Result<&CompiledTemplate, TemplateError> {
        self.templates
            .get(id)
            .ok_or_else(|| TemplateError::UnknownTemplate(id.clone()))
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &TemplateId> {
        self.templates.keys()
    }
}

/// Compile every template under `source_root`/`config.dir` into a registry.
///
/// An empty or missing template directory yields an empty registry — the
/// build itself does not fail.
pub fn compile_dir(
    source_root: &Path,
    config: &TemplatesConfig,
) -> Result<TemplateRegistry, TemplateError> {
    let dir = source_root.join(&config.dir);
    let mut registry = TemplateRegistry::default();

    for file in sources::collect(&dir, TEMPLATE_EXTENSIONS, &[]) {
        let rel = sources::relative_to(&file, &dir);
        let id = TemplateId::from_relative_path(&rel);
        let source_path = sources::relative_to(&file, source_root)
            .to_string_lossy()
            .replace('\\', "/");
        let body = fs::read_to_string(&file)?;
        let segments = parse(&body, &config.variable, &file)?;
        let compiled = CompiledTemplate {
            id: id.clone(),
            source_path,
            segments,
        };
        if let Some(existing) = registry.templates.insert(id.clone(), compiled) {
            return Err(TemplateError::DuplicateId {
                id,
                first: PathBuf::from(existing.source_path),
                second: file,
            });
        }
    }
    Ok(registry)
}

/// Write the empty-registry artifact. Runs before the full compile so the
/// artifact exists even when the template source set is empty.
pub fn write_fallback(output_root: &Path, config: &TemplatesConfig) -> Result<PathBuf, TemplateError> {
    let output = output_root.join(&config.output);
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&output, REGISTRY_PRELUDE)?;
    Ok(output)
}

/// Write the populated client-side registry artifact. Each template becomes a
/// function keyed by its original source path.
pub fn write_artifact(
    registry: &TemplateRegistry,
    output_root: &Path,
    config: &TemplatesConfig,
) -> Result<PathBuf, TemplateError> {
    let output = output_root.join(&config.output);
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut js = String::from(REGISTRY_PRELUDE);
    if !registry.is_empty() {
        js.push_str(ESCAPE_HELPER);
    }
    for template in registry.templates.values() {
        js.push_str(&emit_function(template, &config.variable));
    }
    fs::write(&output, js)?;
    Ok(output)
}

/// Client-side escape helper, shared by all emitted template functions.
const ESCAPE_HELPER: &str = "this.JST.__esc = function (v) {\n  if (v === null || v === undefined) { return ''; }\n  return String(v).replace(/&/g, '&amp;').replace(/</g, '&lt;').replace(/>/g, '&gt;').replace(/\"/g, '&quot;').replace(/'/g, '&#39;');\n};\n";

/// Emit one registry entry as a concatenation of string literals and lookups.
fn emit_function(template: &CompiledTemplate, variable: &str) -> String {
    let mut body = String::from("''");
    for seg in &template.segments {
        match seg {
            Segment::Literal(s) => {
                body.push_str(" + ");
                body.push_str(&js_string(s));
            }
            Segment::Escaped(path) => {
                body.push_str(&format!(" + this.JST.__esc({})", js_lookup(variable, path)));
            }
            Segment::Raw(path) => {
                body.push_str(&format!(
                    " + ({expr} === null || {expr} === undefined ? '' : {expr})",
                    expr = js_lookup(variable, path)
                ));
            }
        }
    }
    format!(
        "this.JST[{key}] = function ({variable}) {{\n  return {body};\n}};\n",
        key = js_string(&template.source_path),
    )
}

fn js_lookup(variable: &str, path: &[String]) -> String {
    let mut expr = String::from(variable);
    for field in path {
        expr.push('.');
        expr.push_str(field);
    }
    expr
}

/// Quote a string as a single-quoted JS literal.
fn js_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for ch in s.chars() {
        match ch {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(ch),
        }
    }
    out.push('\'');
    out
}

/// Parse a template body into segments.
fn parse(body: &str, variable: &str, path: &Path) -> Result<Vec<Segment>, TemplateError> {
    let mut segments = Vec::new();
    let mut rest = body;

    while let Some(open) = rest.find("<%") {
        if !rest[..open].is_empty() {
            segments.push(Segment::Literal(rest[..open].to_string()));
        }
        let after = &rest[open + 2..];
        let (raw, after) = match after.strip_prefix('-') {
            Some(r) => (true, r),
            None => match after.strip_prefix('=') {
                Some(r) => (false, r),
                None => {
                    return Err(TemplateError::BadExpression {
                        path: path.to_path_buf(),
                        detail: "expected <%= or <%-".to_string(),
                    });
                }
            },
        };
        let close = after
            .find("%>")
            .ok_or_else(|| TemplateError::UnclosedTag(path.to_path_buf()))?;
        let expr = after[..close].trim();
        let fields = parse_expression(expr, variable, path)?;
        segments.push(if raw {
            Segment::Raw(fields)
        } else {
            Segment::Escaped(fields)
        });
        rest = &after[close + 2..];
    }
    if !rest.is_empty() {
        segments.push(Segment::Literal(rest.to_string()));
    }
    Ok(segments)
}

/// An expression is a dotted field path rooted at the configured variable:
/// `data.name`, `data.owner.login`. Anything else is rejected at compile time.
fn parse_expression(
    expr: &str,
    variable: &str,
    path: &Path,
) -> Result<Vec<String>, TemplateError> {
    let mut parts = expr.split('.');
    let root = parts.next().unwrap_or_default();
    if root != variable {
        return Err(TemplateError::BadExpression {
            path: path.to_path_buf(),
            detail: format!("expression must start with `{variable}.`, got `{expr}`"),
        });
    }
    let fields: Vec<String> = parts.map(str::to_string).collect();
    if fields.is_empty() || fields.iter().any(|f| !is_identifier(f)) {
        return Err(TemplateError::BadExpression {
            path: path.to_path_buf(),
            detail: format!("`{expr}` is not a dotted field path"),
        });
    }
    Ok(fields)
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && s.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Resolve a dotted field path against a JSON record. Missing and null
/// values become the empty string; strings render unquoted.
fn lookup(record: &Value, path: &[String]) -> String {
    let mut current = record;
    for field in path {
        match current.get(field) {
            Some(v) => current = v,
            None => return String::new(),
        }
    }
    match current {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn html_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn templates_config() -> TemplatesConfig {
        TemplatesConfig::default()
    }

    fn write_template(source: &Path, name: &str, body: &str) {
        let path = source.join("templates").join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    #[test]
    fn compiles_and_renders_escaped() {
        let tmp = TempDir::new().unwrap();
        write_template(tmp.path(), "repo.tpl", "<li><%= data.name %></li>");

        let registry = compile_dir(tmp.path(), &templates_config()).unwrap();
        let template = registry.get(&TemplateId::new("repo")).unwrap();
        let html = template.render(&json!({"name": "a<b>"}));
        assert_eq!(html, "<li>a&lt;b&gt;</li>");
    }

    #[test]
    fn raw_interpolation_is_unescaped() {
        let tmp = TempDir::new().unwrap();
        write_template(tmp.path(), "repo.tpl", "<a href=\"<%- data.html_url %>\">x</a>");

        let registry = compile_dir(tmp.path(), &templates_config()).unwrap();
        let template = registry.get(&TemplateId::new("repo")).unwrap();
        let html = template.render(&json!({"html_url": "https://x?a=1&b=2"}));
        assert_eq!(html, "<a href=\"https://x?a=1&b=2\">x</a>");
    }

    #[test]
    fn nested_and_missing_fields() {
        let tmp = TempDir::new().unwrap();
        write_template(tmp.path(), "repo.tpl", "<%= data.owner.login %>:<%= data.gone %>");

        let registry = compile_dir(tmp.path(), &templates_config()).unwrap();
        let template = registry.get(&TemplateId::new("repo")).unwrap();
        let html = template.render(&json!({"owner": {"login": "amsross"}, "gone": null}));
        assert_eq!(html, "amsross:");
    }

    #[test]
    fn numbers_render_unquoted() {
        let tmp = TempDir::new().unwrap();
        write_template(tmp.path(), "repo.tpl", "<%= data.stargazers_count %> stars");

        let registry = compile_dir(tmp.path(), &templates_config()).unwrap();
        let template = registry.get(&TemplateId::new("repo")).unwrap();
        assert_eq!(template.render(&json!({"stargazers_count": 7})), "7 stars");
    }

    #[test]
    fn unknown_id_is_error() {
        let registry = TemplateRegistry::default();
        let err = registry.get(&TemplateId::new("nope")).unwrap_err();
        assert!(matches!(err, TemplateError::UnknownTemplate(_)));
    }

    #[test]
    fn nested_directories_become_slashed_ids() {
        let tmp = TempDir::new().unwrap();
        write_template(tmp.path(), "cards/repo.tpl", "x");

        let registry = compile_dir(tmp.path(), &templates_config()).unwrap();
        assert!(registry.get(&TemplateId::new("cards/repo")).is_ok());
    }

    #[test]
    fn empty_dir_is_empty_registry() {
        let tmp = TempDir::new().unwrap();
        let registry = compile_dir(tmp.path(), &templates_config()).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn bad_expression_is_compile_error() {
        let tmp = TempDir::new().unwrap();
        write_template(tmp.path(), "repo.tpl", "<%= alert(1) %>");
        let err = compile_dir(tmp.path(), &templates_config()).unwrap_err();
        assert!(matches!(err, TemplateError::BadExpression { .. }));
    }

    #[test]
    fn wrong_variable_is_compile_error() {
        let tmp = TempDir::new().unwrap();
        write_template(tmp.path(), "repo.tpl", "<%= item.name %>");
        let err = compile_dir(tmp.path(), &templates_config()).unwrap_err();
        assert!(matches!(err, TemplateError::BadExpression { .. }));
    }

    #[test]
    fn unclosed_tag_is_compile_error() {
        let tmp = TempDir::new().unwrap();
        write_template(tmp.path(), "repo.tpl", "<%= data.name");
        let err = compile_dir(tmp.path(), &templates_config()).unwrap_err();
        assert!(matches!(err, TemplateError::UnclosedTag(_)));
    }

    // =========================================================================
    // Artifact tests
    // =========================================================================

    #[test]
    fn fallback_writes_empty_registry() {
        let tmp = TempDir::new().unwrap();
        let out = write_fallback(tmp.path(), &templates_config()).unwrap();
        let js = fs::read_to_string(out).unwrap();
        assert_eq!(js, "this.JST = this.JST || {};\n");
    }

    #[test]
    fn artifact_keys_by_source_path() {
        let tmp = TempDir::new().unwrap();
        write_template(tmp.path(), "repo.tpl", "<li><%= data.name %></li>");

        let registry = compile_dir(tmp.path(), &templates_config()).unwrap();
        let out = write_artifact(&registry, tmp.path(), &templates_config()).unwrap();
        let js = fs::read_to_string(out).unwrap();
        assert!(js.starts_with("this.JST = this.JST || {};\n"));
        assert!(js.contains("this.JST['templates/repo.tpl'] = function (data)"));
        assert!(js.contains("this.JST.__esc(data.name)"));
    }

    #[test]
    fn artifact_with_empty_registry_is_just_prelude() {
        let tmp = TempDir::new().unwrap();
        let registry = TemplateRegistry::default();
        let out = write_artifact(&registry, tmp.path(), &templates_config()).unwrap();
        let js = fs::read_to_string(out).unwrap();
        assert_eq!(js, "this.JST = this.JST || {};\n");
    }

    #[test]
    fn artifact_escapes_literal_quotes() {
        let tmp = TempDir::new().unwrap();
        write_template(tmp.path(), "repo.tpl", "<p class='x'>\n</p>");

        let registry = compile_dir(tmp.path(), &templates_config()).unwrap();
        let out = write_artifact(&registry, tmp.path(), &templates_config()).unwrap();
        let js = fs::read_to_string(out).unwrap();
        assert!(js.contains("\\'x\\'"));
        assert!(js.contains("\\n"));
    }
}
