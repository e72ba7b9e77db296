//! Component runtime
//!
//! A component is a reusable fragment rendered in its own scope: it sees its
//! props, the engine's shared data and its slots, but nothing from the
//! template that invoked it.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::engine::error::ComponentError;
use crate::engine::render::RenderScope;
use crate::template::Template;
use crate::value::{Map, Value};

/// Slot that receives the `@component` body outside any `@slot`
pub const DEFAULT_SLOT: &str = "default";

/// Render logic of a [`ComponentDef::Function`]
pub type RenderFn =
    Arc<dyn Fn(&ComponentInstance, &mut RenderScope<'_>) -> Result<String, ComponentError> + Send + Sync>;

/// Maps an adapter's instance onto the props of its target
pub type ForwardFn = Arc<dyn Fn(&ComponentInstance) -> Map + Send + Sync>;

/// How a component renders
#[derive(Clone)]
pub enum ComponentDef {
    /// A template rendered with props and slots as variables
    Fragment { template: Arc<Template> },
    /// Host code
    Function(RenderFn),
    /// Another component under a different name, with props rewritten by
    /// `forward`; slots pass through unchanged
    Adapter { target: String, forward: ForwardFn },
}

impl fmt::Debug for ComponentDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentDef::Fragment { template } => f
                .debug_struct("Fragment")
                .field("template", &template.name)
                .finish(),
            ComponentDef::Function(_) => f.write_str("Function(..)"),
            ComponentDef::Adapter { target, .. } => {
                f.debug_struct("Adapter").field("target", target).finish()
            }
        }
    }
}

impl ComponentDef {
    /// Fragment component from template source
    pub fn fragment(source: impl Into<String>) -> Self {
        ComponentDef::Fragment {
            template: Arc::new(Template::parse("", source)),
        }
    }

    /// Component backed by a host function
    pub fn function<F>(render: F) -> Self
    where
        F: Fn(&ComponentInstance, &mut RenderScope<'_>) -> Result<String, ComponentError>
            + Send
            + Sync
            + 'static,
    {
        ComponentDef::Function(Arc::new(render))
    }

    /// Component that renders `target` with props produced by `forward`
    pub fn adapter<F>(target: impl Into<String>, forward: F) -> Self
    where
        F: Fn(&ComponentInstance) -> Map + Send + Sync + 'static,
    {
        ComponentDef::Adapter {
            target: target.into(),
            forward: Arc::new(forward),
        }
    }

    /// Create an instance with the given props and no slots
    pub fn construct(&self, name: impl Into<String>, props: Map) -> ComponentInstance {
        ComponentInstance {
            name: name.into(),
            props,
            slots: BTreeMap::new(),
            def: self.clone(),
        }
    }
}

/// One invocation of a component
///
/// Instances own their props and slots; nothing is shared between two
/// invocations of the same component.
#[derive(Debug, Clone)]
pub struct ComponentInstance {
    name: String,
    props: Map,
    slots: BTreeMap<String, String>,
    def: ComponentDef,
}

impl ComponentInstance {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn props(&self) -> &Map {
        &self.props
    }

    pub fn prop(&self, key: &str) -> Option<&Value> {
        self.props.get(key)
    }

    /// Set a slot's unrendered template text
    pub fn set_slot(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.slots.insert(name.into(), text.into());
    }

    pub fn slot(&self, name: &str) -> Option<&str> {
        self.slots.get(name).map(String::as_str)
    }

    pub fn slots(&self) -> &BTreeMap<String, String> {
        &self.slots
    }

    /// Render the component
    pub fn render(&self, scope: &mut RenderScope<'_>) -> Result<String, ComponentError> {
        match &self.def {
            ComponentDef::Fragment { template } => self.render_fragment(template, scope),
            ComponentDef::Function(render) => render(self, scope),
            ComponentDef::Adapter { target, forward } => {
                let (resolved, def) = scope
                    .resolve_component(target)
                    .ok_or_else(|| ComponentError::failed(format!("adapter target not found: {}", target)))?;
                let mut inner = def.construct(resolved, forward(self));
                inner.slots = self.slots.clone();
                inner.render(scope)
            }
        }
    }

    fn render_fragment(
        &self,
        template: &Arc<Template>,
        scope: &mut RenderScope<'_>,
    ) -> Result<String, ComponentError> {
        let globals = scope.engine().globals();
        let mut ctx = globals.child_with(self.props.clone());

        // Slot bodies see the component's variables, not the caller's
        let mut rendered = Map::new();
        for (name, raw) in &self.slots {
            let html = scope.render_source(raw, &ctx)?;
            rendered.insert(name.clone(), Value::Safe(html));
        }

        for (name, html) in &rendered {
            if name == DEFAULT_SLOT {
                ctx.insert("slot", html.clone());
                ctx.insert("content", html.clone());
            } else {
                ctx.insert(name.clone(), html.clone());
            }
        }
        ctx.insert("slots", Value::Object(rendered));

        Ok(scope.render_fragment(Arc::clone(template), &ctx)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;

    #[test]
    fn test_construct_owns_props_and_slots() {
        let def = ComponentDef::fragment("<b>{{ label }}</b>");
        let mut props = Map::new();
        props.insert("label".to_string(), Value::from("Save"));

        let mut first = def.construct("button", props.clone());
        let second = def.construct("button", props);
        first.set_slot(DEFAULT_SLOT, "one");

        assert_eq!(first.slot(DEFAULT_SLOT), Some("one"));
        assert_eq!(second.slot(DEFAULT_SLOT), None);
        assert_eq!(first.prop("label"), Some(&Value::from("Save")));
        assert_eq!(first.name(), "button");
    }

    #[test]
    fn test_fragment_render() {
        let engine = Engine::new();
        let def = ComponentDef::fragment("<b>{{ label }}</b>{{ slot }}");
        let mut props = Map::new();
        props.insert("label".to_string(), Value::from("Save"));
        let mut instance = def.construct("button", props);
        instance.set_slot(DEFAULT_SLOT, "<i>{{ label }}</i>");

        let html = instance
            .render(&mut engine.scope())
            .expect("Should render fragment");
        assert_eq!(html, "<b>Save</b><i>Save</i>");
    }

    #[test]
    fn test_function_component() {
        let engine = Engine::new();
        let def = ComponentDef::function(|instance, _scope| {
            Ok(format!("<hr data-n=\"{}\">", instance.prop("n").cloned().unwrap_or_default()))
        });
        let mut props = Map::new();
        props.insert("n".to_string(), Value::from(3i64));

        let html = def
            .construct("rule", props)
            .render(&mut engine.scope())
            .expect("Should render function component");
        assert_eq!(html, "<hr data-n=\"3\">");
    }

    #[test]
    fn test_function_component_failure() {
        let engine = Engine::new();
        let def = ComponentDef::function(|_, _| Err(ComponentError::failed("boom")));
        let err = def
            .construct("broken", Map::new())
            .render(&mut engine.scope())
            .expect_err("Should fail");
        assert_eq!(err.to_string(), "boom");
    }
}
