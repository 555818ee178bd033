//! File watching for the `dev` task.
//!
//! Maintains a live mapping from watched source sets to the pipeline steps
//! to re-run when a matching file changes. Changes are debounced: rapid
//! successive events coalesce into one re-run of the union of their mapped
//! steps. Exact coalescing beyond the debounce window is the watch library's
//! concern, not specified here.
//!
//! Reload signaling goes through the [`ReloadNotifier`] seam — the wire
//! transport to connected browsers is an external collaborator. Style,
//! script, and image changes signal reload; template changes do not.
//!
//! A failing re-run is reported and watching continues — a typo in a
//! stylesheet should not take the dev loop down.

use crate::config::SiteConfig;
use crate::pipeline::{self, BuildContext, Step};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::channel;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Watcher error: {0}")]
    Notify(#[from] notify::Error),
}

/// One watch mapping: files under `dir` with a matching extension re-run
/// `steps`, optionally signaling reload afterwards.
#[derive(Debug, Clone)]
pub struct WatchRule {
    pub name: &'static str,
    /// Watched directory, relative to the source root.
    pub dir: PathBuf,
    /// Matching extensions (lowercased, no dot).
    pub extensions: Vec<String>,
    /// Steps to re-run. Dependencies are pulled in by the planner.
    pub steps: Vec<Step>,
    /// Whether a change here signals connected reload listeners.
    pub livereload: bool,
}

impl WatchRule {
    fn matches(&self, source_root: &Path, path: &Path) -> bool {
        if !path.starts_with(source_root.join(&self.dir)) {
            return false;
        }
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| {
                let e = e.to_ascii_lowercase();
                self.extensions.iter().any(|x| *x == e)
            })
            .unwrap_or(false)
    }
}

/// The stock rule set, derived from config paths.
pub fn default_rules(config: &SiteConfig) -> Vec<WatchRule> {
    let styles_dir = Path::new(&config.styles.entry)
        .parent()
        .unwrap_or(Path::new(""))
        .to_path_buf();
    let mut script_dirs: Vec<PathBuf> = config
        .scripts
        .app
        .sources
        .iter()
        .filter_map(|s| Path::new(s).parent().map(Path::to_path_buf))
        .collect();
    script_dirs.sort();
    script_dirs.dedup();

    let mut rules = vec![WatchRule {
        name: "styles",
        dir: styles_dir,
        extensions: vec!["css".to_string(), "less".to_string()],
        steps: vec![Step::Styles],
        livereload: true,
    }];
    for dir in script_dirs {
        rules.push(WatchRule {
            name: "scripts",
            dir,
            extensions: vec!["js".to_string()],
            steps: vec![Step::BundleApp],
            livereload: true,
        });
    }
    rules.push(WatchRule {
        name: "templates",
        dir: PathBuf::from(&config.templates.dir),
        extensions: vec!["tpl".to_string()],
        steps: vec![Step::Templates],
        livereload: false,
    });
    rules.push(WatchRule {
        name: "images",
        dir: PathBuf::from(&config.images.dir),
        extensions: vec![
            "jpg".to_string(),
            "jpeg".to_string(),
            "png".to_string(),
            "gif".to_string(),
            "webp".to_string(),
        ],
        steps: vec![Step::Images],
        livereload: true,
    });
    rules
}

/// Resolve a batch of changed paths to the steps to re-run and whether to
/// signal reload. Unmatched paths contribute nothing.
pub fn resolve_changes(
    rules: &[WatchRule],
    source_root: &Path,
    changed: &[PathBuf],
) -> (Vec<Step>, bool) {
    let mut steps = Vec::new();
    let mut livereload = false;
    for rule in rules {
        if changed.iter().any(|p| rule.matches(source_root, p)) {
            for step in &rule.steps {
                if !steps.contains(step) {
                    steps.push(*step);
                }
            }
            livereload |= rule.livereload;
        }
    }
    (steps, livereload)
}

/// One-way reload signal to connected browser clients. The transport is an
/// external collaborator; the default implementation just reports.
pub trait ReloadNotifier {
    fn notify(&self, changed: &[PathBuf]);
}

/// Prints the reload signal. Stands in until a transport is wired up.
pub struct LogReloadNotifier;

impl ReloadNotifier for LogReloadNotifier {
    fn notify(&self, changed: &[PathBuf]) {
        println!("reload signal ({} files)", changed.len());
    }
}

/// Watch loop milestones for CLI reporting.
#[derive(Debug)]
pub enum WatchEvent {
    Started { dirs: Vec<PathBuf> },
    Changed { path: PathBuf },
    RunComplete { steps: Vec<Step> },
    RunFailed { message: String },
    Shutdown,
}

/// Debounce state: pending changes plus the instant of the latest one.
struct DebounceState {
    pending: HashSet<PathBuf>,
    last_change: Option<Instant>,
}

impl DebounceState {
    fn new() -> Self {
        Self {
            pending: HashSet::new(),
            last_change: None,
        }
    }

    fn add(&mut self, path: PathBuf) {
        self.pending.insert(path);
        self.last_change = Some(Instant::now());
    }

    fn ready(&self, window: Duration) -> bool {
        match self.last_change {
            Some(last) => !self.pending.is_empty() && last.elapsed() >= window,
            None => false,
        }
    }

    fn take(&mut self) -> Vec<PathBuf> {
        self.last_change = None;
        self.pending.drain().collect()
    }
}

/// Watch the rule set until `running` goes false.
///
/// Each flush re-runs only the steps mapped by the changed paths, then
/// notifies reload listeners when a matched rule wants it.
pub fn watch(
    ctx: &BuildContext,
    rules: &[WatchRule],
    running: Arc<AtomicBool>,
    notifier: &dyn ReloadNotifier,
    event_callback: impl Fn(WatchEvent),
) -> Result<(), WatchError> {
    let (tx, rx) = channel();
    let mut watcher = RecommendedWatcher::new(
        move |res: Result<Event, notify::Error>| {
            if let Ok(event) = res {
                for path in event.paths {
                    let _ = tx.send(path);
                }
            }
        },
        Config::default(),
    )?;

    let mut dirs = Vec::new();
    for rule in rules {
        let dir = ctx.source_root.join(&rule.dir);
        if dir.is_dir() {
            watcher.watch(&dir, RecursiveMode::Recursive)?;
            dirs.push(dir);
        }
    }
    event_callback(WatchEvent::Started { dirs });

    let window = Duration::from_millis(ctx.config.watch.debounce_ms);
    let mut state = DebounceState::new();

    while running.load(Ordering::SeqCst) {
        if let Ok(path) = rx.recv_timeout(Duration::from_millis(50)) {
            event_callback(WatchEvent::Changed { path: path.clone() });
            state.add(path);
        }

        if state.ready(window) {
            let changed = state.take();
            let (steps, livereload) = resolve_changes(rules, ctx.source_root, &changed);
            if steps.is_empty() {
                continue;
            }
            match pipeline::run(ctx, &steps) {
                Ok(_) => {
                    event_callback(WatchEvent::RunComplete { steps });
                    if livereload {
                        notifier.notify(&changed);
                    }
                }
                Err(err) => {
                    // Keep watching; the next save gets another chance.
                    event_callback(WatchEvent::RunFailed {
                        message: err.to_string(),
                    });
                }
            }
        }
    }

    event_callback(WatchEvent::Shutdown);
    Ok(())
}
