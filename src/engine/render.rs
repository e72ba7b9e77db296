//! Directive processing
//!
//! A [`RenderScope`] walks a parsed template and produces its output. One
//! scope exists per top-level render call; it tracks the chain of templates
//! being rendered (to bound recursion) and caches templates fetched through
//! the loader.
//!
//! Inheritance is resolved before anything is printed: every `@section` of
//! the page (and, with `nested_extends`, of each intermediate layout) is
//! captured first, and only then is the outermost layout walked, so each
//! `@yield` sees the complete set of sections.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::context::Context;
use crate::engine::component::{ComponentDef, DEFAULT_SLOT};
use crate::engine::directive::DirectiveArgs;
use crate::engine::error::{ComponentError, RenderError};
use crate::engine::Engine;
use crate::expr::literal::{split_top_level, string_literal};
use crate::parser::{ComponentCall, Node, SectionBody, Spanned};
use crate::template::Template;
use crate::value::{escape_html, Map, Value};

/// Sections captured from a page and its layouts, by name
type Sections = HashMap<String, String>;

/// State of one render call
pub struct RenderScope<'e> {
    engine: &'e Engine,
    stack: Vec<String>,
    loaded: HashMap<String, Arc<Template>>,
}

impl<'e> RenderScope<'e> {
    pub(crate) fn new(engine: &'e Engine) -> Self {
        Self {
            engine,
            stack: Vec::new(),
            loaded: HashMap::new(),
        }
    }

    pub fn engine(&self) -> &'e Engine {
        self.engine
    }

    /// Number of templates and components currently being rendered
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Look up a template in the registry, then through the loader
    pub fn template(&mut self, name: &str) -> Option<Arc<Template>> {
        if let Some(template) = self.engine.templates().get(name) {
            return Some(template);
        }
        if let Some(template) = self.loaded.get(name) {
            return Some(Arc::clone(template));
        }
        let template = self.engine.load_template(name)?;
        self.loaded.insert(name.to_string(), Arc::clone(&template));
        Some(template)
    }

    /// Render a template by name; an unknown name is an error
    pub fn render_named(&mut self, name: &str, ctx: &Context<'_>) -> Result<String, RenderError> {
        let name = self.resolve_name(name)?;
        let template = self
            .template(&name)
            .ok_or_else(|| RenderError::TemplateNotFound { name: name.clone() })?;
        self.render_template(template, ctx)
    }

    /// Render template source that is not registered under any name
    pub fn render_source(&mut self, source: &str, ctx: &Context<'_>) -> Result<String, RenderError> {
        self.render_fragment(Arc::new(Template::parse("", source)), ctx)
    }

    /// Render a parsed template, counting it towards the depth limit
    pub fn render_template(
        &mut self,
        template: Arc<Template>,
        ctx: &Context<'_>,
    ) -> Result<String, RenderError> {
        tracing::trace!(template = %template.name, depth = self.depth(), "render");
        self.enter(&template.name)?;
        let result = self.render_fragment(template, ctx);
        self.leave();
        result
    }

    /// Render a parsed template without adding a level of nesting
    pub(crate) fn render_fragment(
        &mut self,
        template: Arc<Template>,
        ctx: &Context<'_>,
    ) -> Result<String, RenderError> {
        let base = self.stack.len();
        let result = self.resolve_layout(template, ctx).and_then(|(layout, sections)| {
            let mut out = String::new();
            self.render_nodes(&layout.nodes, ctx, &sections, &mut out)?;
            Ok(out)
        });
        self.stack.truncate(base);
        result
    }

    /// Render a component by name
    ///
    /// Unknown components and failing components render as HTML comments;
    /// only depth-limit errors are returned.
    pub fn render_component(
        &mut self,
        name: &str,
        props: Map,
        slots: BTreeMap<String, String>,
    ) -> Result<String, RenderError> {
        let Some((resolved, def)) = self.resolve_component(name) else {
            tracing::warn!(component = name, "component not found");
            return Ok(format!("<!-- component not found: {} -->", name));
        };

        self.enter(&resolved)?;
        let mut instance = def.construct(resolved, props);
        for (slot, text) in slots {
            instance.set_slot(slot, text);
        }
        let result = instance.render(self);
        self.leave();

        match result {
            Ok(html) => Ok(html),
            Err(ComponentError::Render(err @ RenderError::RecursionLimit { .. })) => Err(err),
            Err(err) => {
                tracing::warn!(component = name, error = %err, "component failed to render");
                Ok(format!("<!-- component error: {} -->", name))
            }
        }
    }

    /// Find the definition for a component name
    ///
    /// Tries the component registry, the template registry and the loader,
    /// first for the name as given and then inside the default namespace.
    pub fn resolve_component(&mut self, name: &str) -> Option<(String, ComponentDef)> {
        let name = match self.resolve_name(name) {
            Ok(name) => name,
            Err(_) => return None,
        };
        let engine = self.engine;
        let namespace = &engine.config().default_namespace;
        let mut candidates = vec![name.clone()];
        if !namespace.is_empty() && !name.starts_with(&format!("{}.", namespace)) {
            candidates.push(format!("{}.{}", namespace, name));
        }

        for candidate in candidates {
            if let Some(def) = engine.component(&candidate) {
                return Some((candidate, def.clone()));
            }
            if let Some(template) = self.template(&candidate) {
                return Some((candidate, ComponentDef::Fragment { template }));
            }
        }
        None
    }

    /// Expand `alias::name` references
    fn resolve_name(&self, reference: &str) -> Result<String, RenderError> {
        match self.engine.config().expand_alias(reference) {
            Ok(Some(name)) => Ok(name),
            Ok(None) => Ok(reference.to_string()),
            Err(alias) => Err(RenderError::AliasNotRegistered {
                alias: alias.to_string(),
            }),
        }
    }

    fn enter(&mut self, name: &str) -> Result<(), RenderError> {
        let limit = self.engine.config().max_depth;
        if self.stack.len() >= limit {
            let mut chain = self.stack.clone();
            chain.push(name.to_string());
            return Err(RenderError::RecursionLimit {
                limit,
                chain: chain.join(" -> "),
            });
        }
        self.stack.push(if name.is_empty() {
            "<inline>".to_string()
        } else {
            name.to_string()
        });
        Ok(())
    }

    fn leave(&mut self) {
        self.stack.pop();
    }

    /// Follow `@extends` from `template` to the outermost layout, capturing
    /// sections on the way
    fn resolve_layout(
        &mut self,
        template: Arc<Template>,
        ctx: &Context<'_>,
    ) -> Result<(Arc<Template>, Sections), RenderError> {
        let mut sections = Sections::new();
        let mut current = template;
        let mut levels = 0;

        while let Some(args) = extends_of(&current.nodes) {
            if levels > 0 && !self.engine.config().nested_extends {
                break;
            }
            self.capture_sections(&current.nodes, ctx, &mut sections)?;

            let first = split_top_level(&args, ',').first().copied().unwrap_or_default();
            let parent = self.resolve_name(&self.name_arg(first, ctx))?;
            self.enter(&parent)?;
            current = self.template(&parent).ok_or_else(|| RenderError::ParentNotFound {
                parent: parent.clone(),
                child: if current.name.is_empty() {
                    "<inline>".to_string()
                } else {
                    current.name.clone()
                },
            })?;
            levels += 1;
        }

        Ok((current, sections))
    }

    /// Render every top-level `@section` not already captured
    fn capture_sections(
        &mut self,
        nodes: &[Spanned<Node>],
        ctx: &Context<'_>,
        sections: &mut Sections,
    ) -> Result<(), RenderError> {
        for node in nodes {
            let Node::Section { args, body } = &node.node else {
                continue;
            };
            let name = self.name_arg(args, ctx);
            if sections.contains_key(&name) {
                continue;
            }
            let content = self.section_content(body, ctx, sections)?;
            sections.insert(name, content);
        }
        Ok(())
    }

    fn section_content(
        &mut self,
        body: &SectionBody,
        ctx: &Context<'_>,
        sections: &Sections,
    ) -> Result<String, RenderError> {
        match body {
            SectionBody::Block(nodes) => {
                let mut out = String::new();
                self.render_nodes(nodes, ctx, sections, &mut out)?;
                Ok(out)
            }
            SectionBody::Inline(expr) => {
                Ok(display_escaped(&self.engine.evaluator().evaluate_value(expr, ctx)))
            }
        }
    }

    fn render_nodes(
        &mut self,
        nodes: &[Spanned<Node>],
        ctx: &Context<'_>,
        sections: &Sections,
        out: &mut String,
    ) -> Result<(), RenderError> {
        for node in nodes {
            self.render_node(&node.node, ctx, sections, out)?;
        }
        Ok(())
    }

    fn render_node(
        &mut self,
        node: &Node,
        ctx: &Context<'_>,
        sections: &Sections,
        out: &mut String,
    ) -> Result<(), RenderError> {
        let engine = self.engine;
        let evaluator = engine.evaluator();
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Echo { expr, escape } => {
                let value = evaluator.evaluate(expr, ctx);
                if *escape {
                    out.push_str(&display_escaped(&value));
                } else {
                    out.push_str(&value.to_string());
                }
            }
            // Resolved before the walk starts
            Node::Extends { .. } => {}
            Node::Section { args, body } => {
                let name = self.name_arg(args, ctx);
                match sections.get(&name) {
                    Some(content) => out.push_str(content),
                    None => out.push_str(&self.section_content(body, ctx, sections)?),
                }
            }
            Node::Yield { args } => {
                let parts = split_top_level(args, ',');
                let name = self.name_arg(parts.first().copied().unwrap_or_default(), ctx);
                if let Some(content) = sections.get(&name) {
                    out.push_str(content);
                } else if parts.len() > 1 {
                    let default = parts[1..].join(", ");
                    out.push_str(&display_escaped(&evaluator.evaluate_value(&default, ctx)));
                }
            }
            Node::If { branches, otherwise } => {
                let chosen = branches
                    .iter()
                    .find(|branch| evaluator.evaluate_condition(&branch.condition, ctx))
                    .map(|branch| &branch.body)
                    .or(otherwise.as_ref());
                if let Some(body) = chosen {
                    self.render_nodes(body, ctx, sections, out)?;
                }
            }
            Node::Foreach { args, body } => self.render_foreach(args, body, ctx, sections, out)?,
            Node::For { args, body } => self.render_for(args, body, ctx, sections, out)?,
            Node::Include { args } => {
                let parts = split_top_level(args, ',');
                let name = self.resolve_name(&self.name_arg(parts.first().copied().unwrap_or_default(), ctx))?;
                let data = match parts.get(1).map(|data| evaluator.evaluate_value(data, ctx)) {
                    Some(Value::Object(map)) => map,
                    _ => Map::new(),
                };
                match self.template(&name) {
                    Some(template) => {
                        let child = ctx.child_with(data);
                        out.push_str(&self.render_template(template, &child)?);
                    }
                    None => {
                        tracing::warn!(template = %name, "include not found");
                        out.push_str(&format!("<!-- include not found: {} -->", name));
                    }
                }
            }
            Node::Component(call) => out.push_str(&self.render_call(call, ctx)?),
            Node::Slot(_) => {
                tracing::debug!("@slot outside of a component body ignored");
            }
            Node::Directive { name, args, raw } => match engine.directive(name) {
                Some(handler) => {
                    let args = DirectiveArgs::new(name, args.as_deref().unwrap_or(""), ctx, evaluator);
                    match handler.call(&args) {
                        Ok(html) => out.push_str(&html),
                        Err(err) => {
                            tracing::warn!(directive = %name, error = %err, "directive failed");
                            out.push_str(&format!("<!-- directive error: {} -->", name));
                        }
                    }
                }
                None => out.push_str(raw),
            },
        }
        Ok(())
    }

    fn render_call(&mut self, call: &ComponentCall, ctx: &Context<'_>) -> Result<String, RenderError> {
        let engine = self.engine;
        let evaluator = engine.evaluator();
        let parts = split_top_level(&call.args, ',');
        let name = self.name_arg(parts.first().copied().unwrap_or_default(), ctx);
        let props = match parts.get(1).map(|props| evaluator.evaluate_value(props, ctx)) {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };

        let mut slots = BTreeMap::new();
        if !call.default_slot.trim().is_empty() {
            slots.insert(DEFAULT_SLOT.to_string(), call.default_slot.clone());
        }
        for slot in &call.slots {
            slots.insert(self.name_arg(&slot.args, ctx), slot.raw.clone());
        }

        // Unknown aliases are fatal here, not a missing component
        self.resolve_name(&name)?;
        self.render_component(&name, props, slots)
    }

    fn render_foreach(
        &mut self,
        args: &str,
        body: &[Spanned<Node>],
        ctx: &Context<'_>,
        sections: &Sections,
        out: &mut String,
    ) -> Result<(), RenderError> {
        let Some((collection, item)) = args.rsplit_once(" as ") else {
            tracing::debug!(args, "@foreach without `as`");
            return Ok(());
        };
        let item = item.trim();
        if !is_identifier(item) {
            tracing::debug!(args, "@foreach loop variable is not an identifier");
            return Ok(());
        }

        let items = self.engine.evaluator().evaluate(collection, ctx);
        let Some(items) = items.as_array() else {
            return Ok(());
        };

        let count = items.len();
        for (index, value) in items.iter().enumerate() {
            let mut scope = ctx.child();
            scope.insert(item, value.clone());
            scope.insert("loop", loop_info(index, count));
            self.render_nodes(body, &scope, sections, out)?;
        }
        Ok(())
    }

    fn render_for(
        &mut self,
        args: &str,
        body: &[Spanned<Node>],
        ctx: &Context<'_>,
        sections: &Sections,
        out: &mut String,
    ) -> Result<(), RenderError> {
        let engine = self.engine;
        let config = engine.config();
        let Some(counter) = CountingLoop::parse(args) else {
            tracing::debug!(args, "unsupported @for header");
            return Ok(());
        };
        if counter.step <= 0 {
            tracing::debug!(args, "@for step must be positive");
            return Ok(());
        }

        let limit = match engine.evaluator().evaluate(&counter.limit, ctx).as_f64() {
            Some(limit) => limit,
            None => match config.loop_fallback_limit {
                Some(fallback) => {
                    tracing::debug!(limit = %counter.limit, fallback, "@for limit unresolved, using fallback");
                    fallback as f64
                }
                None => return Ok(()),
            },
        };

        let mut buffer = String::new();
        let mut i = counter.start;
        let mut iterations = 0;
        while counter.holds(i, limit) {
            if iterations >= config.max_loop_iterations {
                tracing::warn!(args, cap = config.max_loop_iterations, "@for exceeded iteration cap");
                return Ok(());
            }
            let mut scope = ctx.child();
            scope.insert(counter.var.as_str(), Value::from(i));
            self.render_nodes(body, &scope, sections, &mut buffer)?;
            i += counter.step;
            iterations += 1;
        }
        out.push_str(&buffer);
        Ok(())
    }

    /// Resolve a name argument: a quoted literal as written, otherwise the
    /// value of the expression if it is text, otherwise the text itself
    fn name_arg(&self, arg: &str, ctx: &Context<'_>) -> String {
        if let Some(literal) = string_literal(arg) {
            return literal;
        }
        match self.engine.evaluator().evaluate(arg, ctx) {
            Value::String(name) | Value::Safe(name) if !name.is_empty() => name,
            _ => arg.trim().to_string(),
        }
    }
}

/// Arguments of the first top-level `@extends`
fn extends_of(nodes: &[Spanned<Node>]) -> Option<String> {
    nodes.iter().find_map(|node| match &node.node {
        Node::Extends { args } => Some(args.clone()),
        _ => None,
    })
}

/// Display form of a value, escaped unless it is already markup
fn display_escaped(value: &Value) -> String {
    if value.is_safe() {
        value.to_string()
    } else {
        escape_html(&value.to_string())
    }
}

fn loop_info(index: usize, count: usize) -> Value {
    let mut info = Map::new();
    info.insert("index".to_string(), Value::from(index));
    info.insert("iteration".to_string(), Value::from(index + 1));
    info.insert("first".to_string(), Value::Bool(index == 0));
    info.insert("last".to_string(), Value::Bool(index + 1 == count));
    info.insert("count".to_string(), Value::from(count));
    info.insert("remaining".to_string(), Value::from(count - index - 1));
    Value::Object(info)
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Header of a counting `@for` loop
#[derive(Debug, Clone, PartialEq)]
struct CountingLoop {
    var: String,
    start: i64,
    limit: String,
    inclusive: bool,
    step: i64,
}

impl CountingLoop {
    /// Parse `[let|var] i = 0; i < limit; i++`
    ///
    /// The condition may use `<` or `<=`; the increment may be `i++`, `++i`,
    /// `i += n` or `i = i + n`.
    fn parse(args: &str) -> Option<Self> {
        let parts = split_top_level(args, ';');
        let &[init, cond, incr] = parts.as_slice() else {
            return None;
        };

        let init = ["let ", "var ", "const "]
            .iter()
            .find_map(|kw| init.strip_prefix(kw))
            .unwrap_or(init);
        let (var, start) = init.split_once('=')?;
        let var = var.trim();
        if !is_identifier(var) {
            return None;
        }
        let start = start.trim().parse::<i64>().ok()?;

        let (inclusive, lhs, limit) = if let Some((lhs, limit)) = cond.split_once("<=") {
            (true, lhs, limit)
        } else {
            let (lhs, limit) = cond.split_once('<')?;
            (false, lhs, limit)
        };
        if lhs.trim() != var || limit.trim().is_empty() {
            return None;
        }

        let step = parse_increment(var, incr)?;

        Some(Self {
            var: var.to_string(),
            start,
            limit: limit.trim().to_string(),
            inclusive,
            step,
        })
    }

    fn holds(&self, i: i64, limit: f64) -> bool {
        if self.inclusive {
            (i as f64) <= limit
        } else {
            (i as f64) < limit
        }
    }
}

fn parse_increment(var: &str, incr: &str) -> Option<i64> {
    let incr: String = incr.chars().filter(|c| !c.is_whitespace()).collect();
    if incr == format!("{}++", var) || incr == format!("++{}", var) {
        return Some(1);
    }
    if let Some(step) = incr.strip_prefix(&format!("{}+=", var)) {
        return step.parse().ok();
    }
    incr.strip_prefix(&format!("{}={}+", var, var))?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting_loop_forms() {
        let l = CountingLoop::parse("let i = 0; i < items.length; i++").expect("Should parse");
        assert_eq!(l.var, "i");
        assert_eq!(l.start, 0);
        assert_eq!(l.limit, "items.length");
        assert!(!l.inclusive);
        assert_eq!(l.step, 1);

        let l = CountingLoop::parse("n = 1; n <= 10; n = n + 3").expect("Should parse");
        assert!(l.inclusive);
        assert_eq!(l.step, 3);

        let l = CountingLoop::parse("var k = -2; k < max; k += 2").expect("Should parse");
        assert_eq!(l.start, -2);
        assert_eq!(l.step, 2);
    }

    #[test]
    fn test_counting_loop_rejects_other_shapes() {
        assert!(CountingLoop::parse("i = 0; i > 3; i++").is_none());
        assert!(CountingLoop::parse("i = 0; j < 3; i++").is_none());
        assert!(CountingLoop::parse("i = 0; i < 3; i *= 2").is_none());
        assert!(CountingLoop::parse("i = 'a'; i < 3; i++").is_none());
        assert!(CountingLoop::parse("i = 0; i < 3").is_none());
    }

    #[test]
    fn test_loop_info() {
        let info = loop_info(0, 2);
        assert_eq!(info.get("first"), Some(&Value::Bool(true)));
        assert_eq!(info.get("last"), Some(&Value::Bool(false)));
        assert_eq!(info.get("iteration"), Some(&Value::Number(1.0)));
        assert_eq!(info.get("remaining"), Some(&Value::Number(1.0)));
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("item"));
        assert!(is_identifier("_x1"));
        assert!(!is_identifier("1x"));
        assert!(!is_identifier("a.b"));
        assert!(!is_identifier(""));
    }
}
