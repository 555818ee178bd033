//! # sitekit
//!
//! Asset build pipeline and dev watcher for a personal static site. One
//! binary compiles the stylesheet, the client-side templates, and the two
//! script bundles, recompresses images, flattens fonts, and optionally
//! invokes the external site generator — then watches the sources and
//! re-runs only the affected steps on change.
//!
//! # Architecture: An Explicit Task Graph
//!
//! The build is a fixed set of named steps with declared dependencies:
//!
//! ```text
//! styles ─────────────────────────┐
//! template-fallback → templates ──┤
//! bundle-vendor ──────────────────┼──→ site-gen
//! bundle-app ─────────────────────┤
//! images ─────────────────────────┤
//! fonts ──────────────────────────┘
//! ```
//!
//! Steps run strictly sequentially; the first failure halts the run and
//! surfaces a non-zero exit. Completed artifacts stay on disk — each is a
//! pure function of its own inputs, so nothing needs rolling back. Every
//! artifact is overwritten wholesale on every run: no cache, no partial
//! recompilation, and two runs over unchanged sources are byte-identical.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`pipeline`] | Step graph, planner, and sequential runner |
//! | [`styles`] | Entry stylesheet → inlined, compressed artifact + map |
//! | [`templates`] | Template dir → typed registry + client registry script |
//! | [`scripts`] | Ordered source lists → compressed bundles + maps |
//! | [`images`] | Image tree → recompressed tree, relative paths preserved |
//! | [`fonts`] | Font dirs → flattened copies |
//! | [`sitegen`] | External site generator invocation |
//! | [`watch`] | Debounced file watching, change → step routing, reload seam |
//! | [`feed`] | GitHub repository listing → rendered container fragment |
//! | [`config`] | `config.toml` loading, merging, validation |
//! | [`sources`] | Deterministic source-set collection |
//! | [`sourcemap`] | Companion source map v3 documents |
//! | [`minify`] | String-aware comment stripping and whitespace collapsing |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Declared Dependencies Over List Position
//!
//! The classic way to order build steps is a task list whose position is the
//! contract. Here every [`pipeline::Step`] declares `deps()` instead, and the
//! planner expands and orders requested steps. The graph is currently almost
//! linear — the point is that the ordering is stated, not assumed, so the
//! watcher can re-run a single step and still get its prerequisites.
//!
//! ## Typed Template Ids
//!
//! The client-side registry is keyed by source path strings (that is its
//! wire format), but in-process lookups go through
//! [`templates::TemplateId`] and return `Result`. A typo'd key is a
//! reported error at the lookup site, not a silent `undefined` at render
//! time.
//!
//! ## Explicit Feed Outcomes
//!
//! The repository feed never panics and never silently no-ops: a failed
//! fetch or a bad template id produces [`feed::FeedState::Failed`] with an
//! empty container fragment, and the caller decides what the user sees.

pub mod config;
pub mod feed;
pub mod fonts;
pub mod images;
pub mod minify;
pub mod output;
pub mod pipeline;
pub mod scripts;
pub mod sitegen;
pub mod sourcemap;
pub mod sources;
pub mod styles;
pub mod templates;
pub mod watch;
