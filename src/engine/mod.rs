//! Rendering engine
//!
//! An [`Engine`] owns the template, component and directive registries
//! together with the shared data every render sees. Registration takes
//! `&mut self`; rendering takes `&self`, so a configured engine can be shared
//! between threads.

mod component;
mod directive;
mod error;
mod render;

pub use component::{ComponentDef, ComponentInstance, ForwardFn, RenderFn, DEFAULT_SLOT};
pub use directive::{Directive, DirectiveArgs, DEFAULT_DATE_FORMAT};
pub use error::{ComponentError, DirectiveError, RenderError};
pub use render::RenderScope;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::analyzer::{Analyzer, DependencyGraph};
use crate::config::EngineConfig;
use crate::context::Context;
use crate::expr::Evaluator;
use crate::template::{is_template_name, Template, TemplateLoader, TemplateRegistry};
use crate::value::{Map, Value};

pub struct Engine {
    templates: TemplateRegistry,
    components: HashMap<String, ComponentDef>,
    directives: HashMap<String, Arc<dyn Directive>>,
    globals: Context<'static>,
    config: EngineConfig,
    loader: Option<Box<dyn TemplateLoader>>,
    evaluator: Evaluator,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut directives: Vec<_> = self.directives.keys().collect();
        directives.sort();
        f.debug_struct("Engine")
            .field("templates", &self.templates.names())
            .field("components", &self.components.keys().collect::<BTreeSet<_>>())
            .field("directives", &directives)
            .field("config", &self.config)
            .field("loader", &self.loader.is_some())
            .finish()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Create an engine with default configuration and the built-in
    /// `@json`, `@class` and `@date` directives
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let mut engine = Self {
            templates: TemplateRegistry::new(),
            components: HashMap::new(),
            directives: HashMap::new(),
            globals: Context::default(),
            config,
            loader: None,
            evaluator: Evaluator::new(),
        };
        engine.register_directive("json", directive::json);
        engine.register_directive("class", directive::class);
        engine.register_directive("date", directive::date);
        engine
    }

    /// Consult `loader` for names that are not registered
    pub fn with_loader(mut self, loader: impl TemplateLoader + 'static) -> Self {
        self.set_loader(loader);
        self
    }

    pub fn set_loader(&mut self, loader: impl TemplateLoader + 'static) {
        self.loader = Some(Box::new(loader));
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    /// Data visible to every render, including inside components
    pub fn globals(&self) -> &Context<'static> {
        &self.globals
    }

    /// Register a template, replacing any template with the same name
    pub fn register_template(
        &mut self,
        name: impl Into<String>,
        source: impl Into<String>,
    ) -> Arc<Template> {
        self.templates.register(name, source)
    }

    pub fn remove_template(&mut self, name: &str) -> Option<Arc<Template>> {
        self.templates.remove(name)
    }

    /// Register a component, replacing any component with the same name
    pub fn register_component(&mut self, name: impl Into<String>, def: ComponentDef) {
        self.components.insert(name.into(), def);
    }

    pub fn component(&self, name: &str) -> Option<&ComponentDef> {
        self.components.get(name)
    }

    /// Register a handler for `@name(args)`
    pub fn register_directive(&mut self, name: impl Into<String>, handler: impl Directive + 'static) {
        self.directives.insert(name.into(), Arc::new(handler));
    }

    pub fn directive(&self, name: &str) -> Option<&Arc<dyn Directive>> {
        self.directives.get(name)
    }

    /// Replace the shared data; anything but an object clears it
    pub fn set_data(&mut self, data: impl Into<Value>) {
        self.globals = Context::from_value(data.into());
    }

    /// Fetch and parse a template through the loader
    pub fn load_template(&self, name: &str) -> Option<Arc<Template>> {
        let source = self.loader.as_ref()?.load(name)?;
        Some(Arc::new(Template::parse(name, source)))
    }

    /// Look up a template in the registry, then through the loader
    pub fn template(&self, name: &str) -> Option<Arc<Template>> {
        self.templates.get(name).or_else(|| self.load_template(name))
    }

    /// Start a render call
    pub fn scope(&self) -> RenderScope<'_> {
        RenderScope::new(self)
    }

    /// Render a registered template, or `reference` itself as inline source
    ///
    /// `ns::name` references are expanded through the configured aliases.
    /// A reference that looks like a template name (dot-separated words) but
    /// is not registered or loadable is an error. A single bare word counts
    /// as a name, so `render("Hello", ..)` fails with
    /// [`RenderError::TemplateNotFound`]; use [`Engine::render_inline`] to
    /// render such text as source.
    pub fn render(&self, reference: &str, data: impl Into<Value>) -> Result<String, RenderError> {
        let globals = &self.globals;
        let ctx = globals.child_with(object(data.into()));
        let mut scope = self.scope();

        if reference.contains("::") && self.config.expand_alias(reference) != Ok(None) {
            return scope.render_named(reference, &ctx);
        }
        if is_template_name(reference) || scope.template(reference).is_some() {
            return scope.render_named(reference, &ctx);
        }
        scope.render_source(reference, &ctx)
    }

    /// Render template source directly
    pub fn render_inline(&self, source: &str, data: impl Into<Value>) -> Result<String, RenderError> {
        let ctx = self.globals.child_with(object(data.into()));
        self.scope().render_source(source, &ctx)
    }

    /// Render a component outside of any template
    pub fn render_component(
        &self,
        name: &str,
        props: impl Into<Value>,
        slots: BTreeMap<String, String>,
    ) -> Result<String, RenderError> {
        self.scope().render_component(name, object(props.into()), slots)
    }

    /// Components reachable from `root` through extends, include and
    /// component references
    pub fn analyze(&self, root: &str) -> BTreeSet<String> {
        Analyzer::new(self).analyze(root)
    }

    /// Full reference graph reachable from `root`
    pub fn dependency_graph(&self, root: &str) -> DependencyGraph {
        Analyzer::new(self).graph(root)
    }
}

fn object(value: Value) -> Map {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Engine>();
    }

    #[test]
    fn test_render_registered_and_inline() {
        let mut engine = Engine::new();
        engine.register_template("greeting", "Hi {{ name }}");

        assert_eq!(
            engine.render("greeting", json!({"name": "Bo"})).expect("Should render"),
            "Hi Bo"
        );
        assert_eq!(
            engine.render("<p>{{ 1 + 1 }}</p>", json!({})).expect("Should render inline"),
            "<p>2</p>"
        );
    }

    #[test]
    fn test_unknown_name_is_fatal() {
        let engine = Engine::new();
        let err = engine.render("pages.missing", json!({})).expect_err("Should fail");
        assert_eq!(
            err,
            RenderError::TemplateNotFound {
                name: "pages.missing".to_string()
            }
        );
    }

    #[test]
    fn test_bare_word_is_a_template_name() {
        let mut engine = Engine::new();
        assert_eq!(
            engine.render("Hello", json!({})),
            Err(RenderError::TemplateNotFound {
                name: "Hello".to_string()
            })
        );
        assert_eq!(
            engine.render_inline("Hello", json!({})).expect("Should render inline"),
            "Hello"
        );
        assert_eq!(engine.render("Hello world", json!({})).expect("Should render"), "Hello world");

        engine.register_template("Hello", "registered");
        assert_eq!(engine.render("Hello", json!({})).expect("Should render"), "registered");
    }

    #[test]
    fn test_alias_resolution() {
        let mut engine = Engine::with_config(EngineConfig::new().with_alias("ui", "vendor.ui"));
        engine.register_template("vendor.ui.badge", "[{{ text }}]");

        assert_eq!(
            engine.render("ui::badge", json!({"text": "new"})).expect("Should render"),
            "[new]"
        );
        assert_eq!(
            engine.render("shop::cart", json!({})),
            Err(RenderError::AliasNotRegistered {
                alias: "shop".to_string()
            })
        );
    }

    #[test]
    fn test_shared_data_and_call_data() {
        let mut engine = Engine::new();
        engine.set_data(json!({"site": "Docs", "title": "Default"}));
        engine.register_template("t", "{{ site }}: {{ title }}");

        assert_eq!(
            engine.render("t", json!({"title": "Intro"})).expect("Should render"),
            "Docs: Intro"
        );
        assert_eq!(engine.render("t", json!(null)).expect("Should render"), "Docs: Default");
    }

    #[test]
    fn test_loader_supplies_missing_templates() {
        let engine = Engine::new().with_loader(|name: &str| {
            (name == "mail.footer").then(|| "-- {{ sender }}".to_string())
        });
        assert_eq!(
            engine
                .render("mail.footer", json!({"sender": "Ops"}))
                .expect("Should render loaded template"),
            "-- Ops"
        );
    }

    #[test]
    fn test_custom_directive_registration() {
        let mut engine = Engine::new();
        engine.register_directive("upper", |args: &DirectiveArgs<'_>| {
            Ok::<_, DirectiveError>(args.string(0).unwrap_or_default().to_uppercase())
        });
        assert_eq!(
            engine.render_inline("@upper(name)!", json!({"name": "ada"})).expect("Should render"),
            "ADA!"
        );
    }

    #[test]
    fn test_render_component_api() {
        let mut engine = Engine::new();
        engine.register_component("tag", ComponentDef::fragment("<span>{{ slot }}</span>"));
        let mut slots = BTreeMap::new();
        slots.insert(DEFAULT_SLOT.to_string(), "x".to_string());

        assert_eq!(
            engine.render_component("tag", json!({}), slots).expect("Should render"),
            "<span>x</span>"
        );
    }
}
