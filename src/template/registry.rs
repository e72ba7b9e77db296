//! Template registry for storing parsed templates

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ParseError;
use crate::parser::{self, Nodes};

/// A registered template
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    /// Dot-namespaced template name; empty for inline templates
    pub name: String,
    /// Original source text
    pub source: String,
    /// Parsed directive tree
    pub nodes: Nodes,
    /// Structural problems found while parsing; never fatal
    pub diagnostics: Vec<ParseError>,
}

impl Template {
    /// Parse a template, logging any structural diagnostics
    pub fn parse(name: impl Into<String>, source: impl Into<String>) -> Self {
        let name = name.into();
        let source = source.into();
        let parsed = parser::parse(&source);
        for diagnostic in &parsed.diagnostics {
            tracing::warn!(
                template = %name,
                span = ?diagnostic.span(),
                "{}",
                diagnostic.message()
            );
        }
        Self {
            name,
            source,
            nodes: parsed.nodes,
            diagnostics: parsed.diagnostics,
        }
    }

    /// Render all diagnostics with source context
    pub fn report(&self) -> String {
        let filename = if self.name.is_empty() {
            "<inline>"
        } else {
            &self.name
        };
        self.diagnostics
            .iter()
            .map(|d| d.format(&self.source, filename))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Whether `reference` has the shape of a template name rather than
/// inline template source
///
/// Names are dot-separated segments of letters, digits, `_` and `-`.
pub fn is_template_name(reference: &str) -> bool {
    !reference.is_empty()
        && reference.split('.').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        })
}

/// Registry for storing parsed templates by name
#[derive(Debug, Default, Clone)]
pub struct TemplateRegistry {
    templates: HashMap<String, Arc<Template>>,
}

impl TemplateRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and store a template, replacing any template of the same name
    pub fn register(&mut self, name: impl Into<String>, source: impl Into<String>) -> Arc<Template> {
        let template = Arc::new(Template::parse(name, source));
        if self
            .templates
            .insert(template.name.clone(), Arc::clone(&template))
            .is_some()
        {
            tracing::debug!(template = %template.name, "replaced template");
        }
        template
    }

    /// Get a template by name
    pub fn get(&self, name: &str) -> Option<Arc<Template>> {
        self.templates.get(name).cloned()
    }

    /// Remove a template, returning it if it was registered
    pub fn remove(&mut self, name: &str) -> Option<Arc<Template>> {
        self.templates.remove(name)
    }

    /// Check if a template exists
    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Get all template names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.templates.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Get the number of registered templates
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_get() {
        let mut registry = TemplateRegistry::new();
        registry.register("pages.home", "Hello");

        let template = registry.get("pages.home").expect("Should find template");
        assert_eq!(template.source, "Hello");
        assert!(template.diagnostics.is_empty());
        assert!(registry.get("pages.missing").is_none());
    }

    #[test]
    fn test_reregistration_replaces() {
        let mut registry = TemplateRegistry::new();
        registry.register("t", "one");
        registry.register("t", "two");

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("t").map(|t| t.source.clone()), Some("two".to_string()));
    }

    #[test]
    fn test_remove() {
        let mut registry = TemplateRegistry::new();
        registry.register("t", "x");
        assert!(registry.remove("t").is_some());
        assert!(!registry.contains("t"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_names_sorted() {
        let mut registry = TemplateRegistry::new();
        registry.register("b", "");
        registry.register("a.z", "");
        assert_eq!(registry.names(), vec!["a.z", "b"]);
    }

    #[test]
    fn test_diagnostics_kept() {
        let mut registry = TemplateRegistry::new();
        let template = registry.register("broken", "@if(x) never closed");
        assert_eq!(template.diagnostics.len(), 1);
        assert!(template.report().contains("unclosed @if"));
    }

    #[test]
    fn test_is_template_name() {
        assert!(is_template_name("layout"));
        assert!(is_template_name("components.user-card"));
        assert!(is_template_name("v2_page"));
        assert!(!is_template_name("Hello, {{ name }}!"));
        assert!(!is_template_name("a..b"));
        assert!(!is_template_name(""));
        assert!(!is_template_name("two words"));
    }
}
