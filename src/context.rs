//! Variable scopes for rendering
//!
//! A [`Context`] holds its own bindings and borrows its enclosing scope, so
//! loop bodies and includes can add variables without copying or mutating
//! the outer data.

use crate::value::{Map, Value};

/// Layered variable bindings
#[derive(Debug, Clone, Default)]
pub struct Context<'a> {
    vars: Map,
    parent: Option<&'a Context<'a>>,
}

impl<'a> Context<'a> {
    /// Create a root scope with the given bindings
    pub fn new(vars: Map) -> Self {
        Self { vars, parent: None }
    }

    /// Create a root scope from any value; non-objects give an empty scope
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::new(map),
            _ => Self::default(),
        }
    }

    /// Create an empty scope nested inside this one
    pub fn child(&'a self) -> Context<'a> {
        Context {
            vars: Map::new(),
            parent: Some(self),
        }
    }

    /// Create a nested scope pre-populated with `vars`
    pub fn child_with(&'a self, vars: Map) -> Context<'a> {
        Context {
            vars,
            parent: Some(self),
        }
    }

    /// Bind a variable in this scope, shadowing any outer binding
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.vars.insert(key.into(), value.into());
    }

    /// Resolve a variable, searching outward through enclosing scopes
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.vars
            .get(key)
            .or_else(|| self.parent.and_then(|p| p.get(key)))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Collapse all visible bindings into one map, inner scopes winning
    pub fn flatten(&self) -> Map {
        let mut map = self.parent.map(|p| p.flatten()).unwrap_or_default();
        for (k, v) in &self.vars {
            map.insert(k.clone(), v.clone());
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_shadows_parent() {
        let mut root = Context::default();
        root.insert("x", "outer");
        root.insert("y", "kept");

        let mut inner = root.child();
        inner.insert("x", "inner");

        assert_eq!(inner.get("x"), Some(&Value::from("inner")));
        assert_eq!(inner.get("y"), Some(&Value::from("kept")));
        assert_eq!(root.get("x"), Some(&Value::from("outer")));
    }

    #[test]
    fn test_flatten_prefers_inner() {
        let mut root = Context::default();
        root.insert("a", 1i64);
        let mut vars = Map::new();
        vars.insert("a".into(), Value::from(2i64));
        let inner = root.child_with(vars);

        let flat = inner.flatten();
        assert_eq!(flat.get("a"), Some(&Value::Number(2.0)));
    }

    #[test]
    fn test_from_non_object_is_empty() {
        let ctx = Context::from_value(Value::from("nope"));
        assert!(!ctx.contains("nope"));
    }
}
