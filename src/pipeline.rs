//! Pipeline orchestration.
//!
//! The build is an explicit directed task graph: every [`Step`] declares its
//! dependencies instead of relying on list position. The runner expands a
//! requested step set through those dependencies, orders it (declaration
//! order among independents — which is also the classic task order), and
//! executes strictly sequentially.
//!
//! Failure semantics: the first failing step halts the run and surfaces the
//! error. Artifacts already written by completed steps stay on disk — they
//! are valid products of their own inputs — and nothing is rolled back.
//! Steps own disjoint output paths, so there is no write contention to
//! coordinate.

use crate::config::SiteConfig;
use crate::fonts::{self, FontError};
use crate::images::{self, ImageError};
use crate::scripts::{self, BundleError};
use crate::sitegen::{self, GeneratorError};
use crate::styles::{self, StyleError};
use crate::templates::{self, TemplateError};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("styles: {0}")]
    Style(#[from] StyleError),
    #[error("templates: {0}")]
    Template(#[from] TemplateError),
    #[error("scripts: {0}")]
    Bundle(#[from] BundleError),
    #[error("images: {0}")]
    Image(#[from] ImageError),
    #[error("fonts: {0}")]
    Font(#[from] FontError),
    #[error("generator: {0}")]
    Generator(#[from] GeneratorError),
}

/// One named unit of the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Styles,
    TemplateFallback,
    Templates,
    BundleVendor,
    BundleApp,
    Images,
    Fonts,
    SiteGen,
}

impl Step {
    /// Every step, in declaration order. This order is itself a valid
    /// topological order of the graph, so the planner sorts against it.
    pub const ALL: [Step; 8] = [
        Step::Styles,
        Step::TemplateFallback,
        Step::Templates,
        Step::BundleVendor,
        Step::BundleApp,
        Step::Images,
        Step::Fonts,
        Step::SiteGen,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Step::Styles => "styles",
            Step::TemplateFallback => "template-fallback",
            Step::Templates => "templates",
            Step::BundleVendor => "bundle-vendor",
            Step::BundleApp => "bundle-app",
            Step::Images => "images",
            Step::Fonts => "fonts",
            Step::SiteGen => "site-gen",
        }
    }

    /// Declared dependencies: steps that must have run earlier in the same
    /// plan.
    pub fn deps(self) -> &'static [Step] {
        match self {
            // The fallback artifact must exist before the real compile
            // overwrites it, so an empty template set still yields a registry.
            Step::Templates => &[Step::TemplateFallback],
            // The generator consumes everything the other steps produce.
            Step::SiteGen => &[
                Step::Styles,
                Step::Templates,
                Step::BundleVendor,
                Step::BundleApp,
                Step::Images,
                Step::Fonts,
            ],
            _ => &[],
        }
    }
}

/// The steps of the `default` task.
pub fn default_steps() -> Vec<Step> {
    Step::ALL
        .into_iter()
        .filter(|s| *s != Step::SiteGen)
        .collect()
}

/// The steps of the `build` task: `default` plus the site generator.
pub fn build_steps() -> Vec<Step> {
    Step::ALL.to_vec()
}

/// Expand a requested step set through declared dependencies and return the
/// execution order.
pub fn plan(requested: &[Step]) -> Vec<Step> {
    let mut wanted = std::collections::HashSet::new();
    let mut stack: Vec<Step> = requested.to_vec();
    while let Some(step) = stack.pop() {
        if wanted.insert(step) {
            stack.extend_from_slice(step.deps());
        }
    }
    Step::ALL
        .into_iter()
        .filter(|s| wanted.contains(s))
        .collect()
}

/// Immutable context shared by every step invocation.
pub struct BuildContext<'a> {
    /// Root of the asset sources (`_assets`).
    pub source_root: &'a Path,
    /// Root of the artifact outputs (`assets`).
    pub output_root: &'a Path,
    /// Project directory the site generator runs in.
    pub project_dir: &'a Path,
    pub config: &'a SiteConfig,
}

/// What one completed step reported.
#[derive(Debug)]
pub struct StepReport {
    pub step: Step,
    pub detail: String,
}

/// Execute a planned step list sequentially, halting on the first failure.
pub fn run_steps(ctx: &BuildContext, steps: &[Step]) -> Result<Vec<StepReport>, PipelineError> {
    let mut reports = Vec::with_capacity(steps.len());
    for &step in steps {
        let detail = run_step(ctx, step)?;
        reports.push(StepReport { step, detail });
    }
    Ok(reports)
}

/// Plan and execute a requested step set.
pub fn run(ctx: &BuildContext, requested: &[Step]) -> Result<Vec<StepReport>, PipelineError> {
    run_steps(ctx, &plan(requested))
}

fn run_step(ctx: &BuildContext, step: Step) -> Result<String, PipelineError> {
    match step {
        Step::Styles => {
            let artifact = styles::compile(ctx.source_root, ctx.output_root, &ctx.config.styles)?;
            Ok(format!(
                "{} ({} sources)",
                display_relative(&artifact.output, ctx.output_root),
                artifact.sources.len()
            ))
        }
        Step::TemplateFallback => {
            let output = templates::write_fallback(ctx.output_root, &ctx.config.templates)?;
            Ok(display_relative(&output, ctx.output_root))
        }
        Step::Templates => {
            let registry = templates::compile_dir(ctx.source_root, &ctx.config.templates)?;
            let output =
                templates::write_artifact(&registry, ctx.output_root, &ctx.config.templates)?;
            Ok(format!(
                "{} ({} templates)",
                display_relative(&output, ctx.output_root),
                registry.len()
            ))
        }
        Step::BundleVendor => {
            let artifact =
                scripts::bundle(ctx.source_root, ctx.output_root, &ctx.config.scripts.vendor)?;
            Ok(format!(
                "{} ({} sources)",
                display_relative(&artifact.output, ctx.output_root),
                artifact.sources.len()
            ))
        }
        Step::BundleApp => {
            let artifact =
                scripts::bundle(ctx.source_root, ctx.output_root, &ctx.config.scripts.app)?;
            Ok(format!(
                "{} ({} sources)",
                display_relative(&artifact.output, ctx.output_root),
                artifact.sources.len()
            ))
        }
        Step::Images => {
            let processed = images::optimize(ctx.source_root, ctx.output_root, &ctx.config.images)?;
            Ok(format!("{} images", processed.len()))
        }
        Step::Fonts => {
            let copied = fonts::copy_fonts(ctx.source_root, ctx.output_root, &ctx.config.fonts)?;
            Ok(format!("{} fonts", copied.len()))
        }
        Step::SiteGen => {
            sitegen::run(ctx.project_dir, &ctx.config.generator)?;
            Ok(ctx.config.generator.command.clone())
        }
    }
}

fn display_relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .into_owned()
}
