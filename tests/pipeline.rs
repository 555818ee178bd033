//! End-to-end pipeline runs over a realistic source tree in a temp dir.

use sitekit::config::SiteConfig;
use sitekit::pipeline::{self, BuildContext, Step};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Fixture {
    _tmp: TempDir,
    source_root: PathBuf,
    output_root: PathBuf,
    project_dir: PathBuf,
}

impl Fixture {
    fn ctx<'a>(&'a self, config: &'a SiteConfig) -> BuildContext<'a> {
        BuildContext {
            source_root: &self.source_root,
            output_root: &self.output_root,
            project_dir: &self.project_dir,
            config,
        }
    }

    fn artifact(&self, rel: &str) -> PathBuf {
        self.output_root.join(rel)
    }
}

fn setup() -> Fixture {
    let tmp = TempDir::new().unwrap();
    let source_root = tmp.path().join("_assets");
    let output_root = tmp.path().join("assets");

    write(&source_root.join("less/app.css"), "@import \"mixins.css\";\nbody { color: teal; }\n");
    write(&source_root.join("less/mixins.css"), "/* shared */\n.wide { width: 100%; }\n");

    write(
        &source_root.join("templates/repo.tpl"),
        "<li><a href=\"<%- data.html_url %>\"><%= data.name %></a></li>",
    );

    write(&source_root.join("vendor/jquery.js"), "window.jQuery = function () {};\n");
    write(&source_root.join("vendor/underscore.js"), "window._ = { each: function () {} };\n");
    write(&source_root.join("js/app.js"), "// app entry\njQuery(function () {});\n");

    let logo = source_root.join("img/nested/logo.png");
    fs::create_dir_all(logo.parent().unwrap()).unwrap();
    image::RgbaImage::from_pixel(4, 4, image::Rgba([20, 40, 60, 255]))
        .save(&logo)
        .unwrap();

    write_bytes(&source_root.join("fonts/sub/heading.woff"), b"wOFFfake");

    Fixture {
        project_dir: tmp.path().to_path_buf(),
        _tmp: tmp,
        source_root,
        output_root,
    }
}

fn write(path: &Path, content: &str) {
    write_bytes(path, content.as_bytes());
}

fn write_bytes(path: &Path, content: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[test]
fn default_run_produces_every_artifact() {
    let fx = setup();
    let config = SiteConfig::default();

    let reports = pipeline::run(&fx.ctx(&config), &pipeline::default_steps()).unwrap();
    assert_eq!(reports.len(), pipeline::default_steps().len());

    for rel in [
        "css/main.min.css",
        "css/main.min.css.map",
        "js/templates.js",
        "js/vendor.min.js",
        "js/vendor.min.js.map",
        "js/scripts.min.js",
        "img/nested/logo.png",
        "fonts/heading.woff",
    ] {
        assert!(fx.artifact(rel).is_file(), "missing artifact: {rel}");
    }
}

#[test]
fn rerun_is_byte_identical() {
    let fx = setup();
    let config = SiteConfig::default();

    pipeline::run(&fx.ctx(&config), &pipeline::default_steps()).unwrap();
    let first: Vec<Vec<u8>> = artifact_set(&fx);

    pipeline::run(&fx.ctx(&config), &pipeline::default_steps()).unwrap();
    let second: Vec<Vec<u8>> = artifact_set(&fx);

    assert_eq!(first, second);
}

fn artifact_set(fx: &Fixture) -> Vec<Vec<u8>> {
    [
        "css/main.min.css",
        "css/main.min.css.map",
        "js/templates.js",
        "js/vendor.min.js",
        "js/scripts.min.js",
        "img/nested/logo.png",
    ]
    .iter()
    .map(|rel| fs::read(fx.artifact(rel)).unwrap())
    .collect()
}

#[test]
fn stylesheet_inlines_imports_and_links_its_map() {
    let fx = setup();
    let config = SiteConfig::default();

    pipeline::run(&fx.ctx(&config), &[Step::Styles]).unwrap();

    let css = fs::read_to_string(fx.artifact("css/main.min.css")).unwrap();
    assert!(css.contains(".wide{width:100%}"));
    assert!(css.contains("body{color:teal}"));
    assert!(!css.contains("@import"));
    assert!(css.contains("sourceMappingURL=main.min.css.map"));

    let map: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(fx.artifact("css/main.min.css.map")).unwrap())
            .unwrap();
    assert_eq!(map["version"], 3);
    assert_eq!(map["file"], "main.min.css");
}

#[test]
fn template_registry_is_keyed_by_source_path() {
    let fx = setup();
    let config = SiteConfig::default();

    pipeline::run(&fx.ctx(&config), &[Step::Templates]).unwrap();

    let js = fs::read_to_string(fx.artifact("js/templates.js")).unwrap();
    assert!(js.starts_with("this.JST = this.JST || {};\n"));
    assert!(js.contains("this.JST['templates/repo.tpl'] = function (data)"));
}

#[test]
fn missing_template_dir_still_writes_the_fallback_registry() {
    let fx = setup();
    let config = SiteConfig::default();
    fs::remove_dir_all(fx.source_root.join("templates")).unwrap();

    pipeline::run(&fx.ctx(&config), &[Step::Templates]).unwrap();

    let js = fs::read_to_string(fx.artifact("js/templates.js")).unwrap();
    assert_eq!(js, "this.JST = this.JST || {};\n");
}

#[test]
fn vendor_bundle_preserves_declared_order() {
    let fx = setup();
    let config = SiteConfig::default();

    pipeline::run(&fx.ctx(&config), &[Step::BundleVendor]).unwrap();

    let js = fs::read_to_string(fx.artifact("js/vendor.min.js")).unwrap();
    let jquery = js.find("window.jQuery").unwrap();
    let underscore = js.find("window._").unwrap();
    assert!(jquery < underscore);
}

#[test]
fn fonts_are_flattened_into_the_output_dir() {
    let fx = setup();
    let config = SiteConfig::default();

    pipeline::run(&fx.ctx(&config), &[Step::Fonts]).unwrap();

    assert!(fx.artifact("fonts/heading.woff").is_file());
    assert!(!fx.artifact("fonts/sub").exists());
}

#[test]
fn halted_run_keeps_earlier_artifacts() {
    let fx = setup();
    let config = SiteConfig::default();
    fs::remove_file(fx.source_root.join("js/app.js")).unwrap();

    let err = pipeline::run(&fx.ctx(&config), &pipeline::default_steps());
    assert!(err.is_err());

    // Styles and vendor ran before the failing app bundle.
    assert!(fx.artifact("css/main.min.css").is_file());
    assert!(fx.artifact("js/vendor.min.js").is_file());
    assert!(!fx.artifact("js/scripts.min.js").exists());
}
