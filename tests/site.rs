//! Rendering a small template directory through the filesystem loader

use std::fs;
use std::path::PathBuf;

use brindle::template::FileSystemLoader;
use brindle::{Engine, EngineConfig, Value};
use pretty_assertions::assert_eq;

fn site_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/site")
}

fn site_data() -> Value {
    let text = fs::read_to_string(site_root().join("data.json")).expect("Should read data.json");
    let json: serde_json::Value = serde_json::from_str(&text).expect("Should parse data.json");
    Value::from(json)
}

#[test]
fn test_render_home_page() {
    let mut engine = Engine::new().with_loader(FileSystemLoader::new(site_root()));
    // Slots render in the component's scope, so the user must be shared data
    engine.set_data(site_data());

    let html = engine.render("pages.home", Value::Null).expect("Should render home page");

    assert!(html.starts_with("<html><head><title>Home</title></head><body>"));
    assert!(html.contains("<nav><a href=\"/\">Home</a><a href=\"/about\">About</a></nav>"));
    assert!(html.contains("<div class=\"alert alert-warning\">Hello Ada</div>"));
    assert!(html.trim_end().ends_with("</body></html>"));
}

#[test]
fn test_component_slot_does_not_see_caller_data() {
    let engine = Engine::new().with_loader(FileSystemLoader::new(site_root()));

    let html = engine.render("pages.home", site_data()).expect("Should render home page");
    assert!(html.contains("<div class=\"alert alert-warning\">Hello </div>"));
}

#[test]
fn test_preloaded_templates_match_loader() {
    let loader = FileSystemLoader::new(site_root());
    let mut engine = Engine::new();
    for (name, source) in loader.load_all().expect("Should load templates") {
        engine.register_template(name, source);
    }
    engine.set_data(site_data());

    let mut lazy = Engine::new().with_loader(FileSystemLoader::new(site_root()));
    lazy.set_data(site_data());

    assert_eq!(
        engine.render("pages.home", Value::Null).expect("Should render"),
        lazy.render("pages.home", Value::Null).expect("Should render")
    );
}

#[test]
fn test_site_dependencies() {
    let engine = Engine::new().with_loader(FileSystemLoader::new(site_root()));
    let graph = engine.dependency_graph("pages.home");

    let templates: Vec<_> = graph.templates.iter().map(String::as_str).collect();
    assert_eq!(
        templates,
        vec!["components.alert", "layouts.main", "pages.home", "partials.nav"]
    );
    let components: Vec<_> = graph.components.iter().map(String::as_str).collect();
    assert_eq!(components, vec!["alert", "components.alert"]);
    assert!(graph.missing.is_empty());
}

#[test]
fn test_config_file_drives_engine() {
    let config = EngineConfig::from_str(
        r#"
[engine]
max_depth = 8
default_namespace = "widgets"

[aliases]
site = "pages"
"#,
    )
    .expect("Should parse config");
    let mut engine = Engine::with_config(config).with_loader(FileSystemLoader::new(site_root()));
    engine.set_data(site_data());

    // `alert` is not under `widgets`, so the component is reported missing
    let html = engine.render("site::home", Value::Null).expect("Should render via alias");
    assert!(html.contains("<!-- component not found: alert -->"));
    assert_eq!(engine.config().max_depth, 8);
}
