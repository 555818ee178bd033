use clap::{Parser, Subcommand};
use sitekit::{config, feed, fonts, images, output, pipeline, sources, templates, watch};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Release builds report the package version; anything else reports the
/// commit it was built from.
fn version_string() -> &'static str {
    if env!("ON_RELEASE_TAG") == "true" {
        return env!("CARGO_PKG_VERSION");
    }
    match env!("GIT_HASH") {
        "" => "dev@unknown",
        // leaked exactly once, at startup
        hash => Box::leak(format!("dev@{hash}").into_boxed_str()),
    }
}

#[derive(Parser)]
#[command(name = "sitekit")]
#[command(about = "Asset build pipeline and dev watcher for a static site")]
#[command(long_about = "\
Asset build pipeline and dev watcher for a static site

Sources live under the source directory, artifacts land in the output
directory. Each run rebuilds every requested artifact from scratch, so the
output is always a pure function of the sources.

Source structure:

  _assets/
  ├── less/
  │   ├── app.css                  # Entry stylesheet (imports inlined)
  │   └── mixins.css
  ├── templates/
  │   └── repo.tpl                 # Client-side templates → js/templates.js
  ├── js/
  │   └── app.js                   # Application bundle sources
  ├── vendor/
  │   ├── jquery.js                # Vendor bundle sources
  │   └── underscore.js
  ├── img/                         # Recompressed, tree structure preserved
  └── fonts/                       # Flattened into the output fonts dir

Tasks:
  run    compile everything except the site generator (the default loop)
  dev    run, then watch sources and re-run affected steps on change
  build  run plus the external site generator
  feed   fetch the repository listing and render the container fragment

Run 'sitekit gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Asset source directory
    #[arg(long, default_value = "_assets", global = true)]
    source: PathBuf,

    /// Artifact output directory
    #[arg(long, default_value = "assets", global = true)]
    output: PathBuf,

    /// Config file (defaults to config.toml in the working directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile styles, templates, bundles, images and fonts
    Run,
    /// Full compile, then watch sources and re-run affected steps
    Dev,
    /// Full compile plus the external site generator
    Build,
    /// Fetch the repository listing and render it through its template
    Feed {
        /// Write the rendered fragment here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Validate config and source layout without building
    Check,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let project_dir = std::env::current_dir()?;
    let config = match &cli.config {
        Some(path) => config::load_config_file(path)?,
        None => config::load_config(&project_dir)?,
    };

    let ctx = pipeline::BuildContext {
        source_root: &cli.source,
        output_root: &cli.output,
        project_dir: &project_dir,
        config: &config,
    };

    match cli.command {
        Command::Run => {
            let reports = pipeline::run(&ctx, &pipeline::default_steps())?;
            output::print_run_report("run", &reports);
        }
        Command::Dev => {
            let reports = pipeline::run(&ctx, &pipeline::default_steps())?;
            output::print_run_report("dev", &reports);

            let running = Arc::new(AtomicBool::new(true));
            let handler_flag = running.clone();
            ctrlc::set_handler(move || {
                handler_flag.store(false, Ordering::SeqCst);
            })?;

            let rules = watch::default_rules(&config);
            watch::watch(&ctx, &rules, running, &watch::LogReloadNotifier, |event| {
                output::print_watch_event(&event);
            })?;
        }
        Command::Build => {
            let reports = pipeline::run(&ctx, &pipeline::build_steps())?;
            output::print_run_report("build", &reports);
        }
        Command::Feed { out } => {
            let registry = templates::compile_dir(&cli.source, &config.templates)?;
            let mut feed = feed::Feed::new(config.feed.clone());
            let outcome = feed.run(&registry);
            output::print_feed_outcome(&outcome);
            match out {
                Some(path) => std::fs::write(&path, &outcome.fragment)?,
                None => print!("{}", outcome.fragment),
            }
            if let feed::FeedState::Failed { .. } = outcome.state {
                std::process::exit(1);
            }
        }
        Command::Check => {
            println!("==> Checking {}", cli.source.display());
            let (lines, missing) = source_summary(&cli.source, &config);
            for line in lines {
                println!("{line}");
            }
            if missing > 0 {
                println!("==> {missing} declared source(s) missing");
                std::process::exit(1);
            }
            println!("==> Config and sources are valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Report what each step would pick up, counting declared sources that are
/// absent. Individually declared files (the style entry, bundle sources) can
/// be missing; the glob-collected sets are merely empty.
fn source_summary(
    source_root: &std::path::Path,
    config: &config::SiteConfig,
) -> (Vec<String>, usize) {
    let mut lines = Vec::new();
    let mut missing = 0;

    let entry = source_root.join(&config.styles.entry);
    if !entry.is_file() {
        missing += 1;
    }
    lines.push(format!(
        "style entry      {} ({})",
        config.styles.entry,
        if entry.is_file() { "found" } else { "missing" }
    ));

    let templates_dir = source_root.join(&config.templates.dir);
    let template_count =
        sources::collect(&templates_dir, templates::TEMPLATE_EXTENSIONS, &[]).len();
    lines.push(format!("templates        {template_count} file(s)"));

    let bundles = [("vendor", &config.scripts.vendor), ("app", &config.scripts.app)];
    for (name, bundle) in bundles {
        let absent = bundle
            .sources
            .iter()
            .filter(|s| !source_root.join(s).is_file())
            .count();
        missing += absent;
        if absent == 0 {
            lines.push(format!("{name:<16} {} source(s)", bundle.sources.len()));
        } else {
            lines.push(format!(
                "{name:<16} {} source(s), {absent} missing",
                bundle.sources.len()
            ));
        }
    }

    let images_dir = source_root.join(&config.images.dir);
    let image_count =
        sources::collect(&images_dir, images::IMAGE_EXTENSIONS, &config.images.skip).len();
    lines.push(format!("images           {image_count} file(s)"));

    let font_count: usize = config
        .fonts
        .sources
        .iter()
        .map(|dir| sources::collect(&source_root.join(dir), fonts::FONT_EXTENSIONS, &[]).len())
        .sum();
    lines.push(format!("fonts            {font_count} file(s)"));

    (lines, missing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitekit::config::SiteConfig;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &std::path::Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x").unwrap();
    }

    #[test]
    fn summary_counts_no_missing_when_all_declared_exist() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("_assets");
        write(&source, "less/app.css");
        write(&source, "vendor/jquery.js");
        write(&source, "vendor/underscore.js");
        write(&source, "js/app.js");

        let (_, missing) = source_summary(&source, &SiteConfig::default());
        assert_eq!(missing, 0);
    }

    #[test]
    fn summary_counts_each_absent_declared_source() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("_assets");
        write(&source, "vendor/jquery.js");
        write(&source, "vendor/underscore.js");
        // style entry and js/app.js absent

        let (lines, missing) = source_summary(&source, &SiteConfig::default());
        assert_eq!(missing, 2);
        assert!(lines.iter().any(|l| l.contains("(missing)")));
        assert!(lines.iter().any(|l| l.contains("1 missing")));
    }
}
