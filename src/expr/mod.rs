//! Restricted expression language
//!
//! Expressions are pure data queries: literals, property paths, indexing,
//! arithmetic, comparisons, `&&`, `!`, and `||` (which doubles as the
//! fallback operator). There are no calls, assignments or loops, so
//! evaluating an expression authored by an untrusted template cannot reach
//! host code.
//!
//! # Example
//!
//! ```rust
//! use brindle::{Context, Evaluator, Value};
//!
//! let mut ctx = Context::default();
//! ctx.insert("user", Value::from(serde_json::json!({"name": "Ada"})));
//!
//! let evaluator = Evaluator::new();
//! assert_eq!(evaluator.evaluate("user.name", &ctx), Value::from("Ada"));
//! assert_eq!(evaluator.evaluate("user.age || 'unknown'", &ctx), Value::from("unknown"));
//! ```

pub mod ast;
mod eval;
mod grammar;
pub mod lexer;
pub mod literal;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

pub use ast::{BinaryOp, Expr, UnaryOp};
pub use eval::eval;
pub use grammar::parse as parse_expression;

use crate::context::Context;
use crate::value::{Map, Value};

/// Compiles and evaluates expressions, caching compiled trees by source text
#[derive(Debug, Default)]
pub struct Evaluator {
    cache: RwLock<HashMap<String, Option<Arc<Expr>>>>,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile an expression, reusing an earlier compilation of the same text
    ///
    /// Failed compilations are cached too, so a broken expression inside a
    /// loop is parsed and logged once.
    pub fn compile(&self, text: &str) -> Option<Arc<Expr>> {
        let text = text.trim();
        if let Ok(cache) = self.cache.read() {
            if let Some(hit) = cache.get(text) {
                return hit.clone();
            }
        }

        let compiled = match parse_expression(text) {
            Ok(expr) => Some(Arc::new(expr)),
            Err(errors) => {
                tracing::debug!(
                    expression = text,
                    error = %errors.first().map(|e| e.message().to_string()).unwrap_or_default(),
                    "expression failed to parse"
                );
                None
            }
        };

        if let Ok(mut cache) = self.cache.write() {
            cache.insert(text.to_string(), compiled.clone());
        }
        compiled
    }

    /// Evaluate an expression; any failure yields [`Value::Null`]
    pub fn evaluate(&self, text: &str, ctx: &Context<'_>) -> Value {
        match self.compile(text) {
            Some(expr) => eval(&expr, ctx),
            None => Value::Null,
        }
    }

    /// Evaluate an expression and coerce the result to a boolean
    pub fn evaluate_condition(&self, text: &str, ctx: &Context<'_>) -> bool {
        self.evaluate(text, ctx).is_truthy()
    }

    /// Evaluate an object literal such as `{ title: page.title, size: 'lg' }`
    ///
    /// Values may themselves be object literals. Text that is not an object
    /// literal yields an empty map.
    pub fn evaluate_object(&self, text: &str, ctx: &Context<'_>) -> Map {
        let Some(entries) = literal::object_entries(text) else {
            if !text.trim().is_empty() {
                tracing::debug!(literal = text, "object literal failed to parse");
            }
            return Map::new();
        };

        entries
            .into_iter()
            .map(|(key, value)| (key, self.evaluate_value(value, ctx)))
            .collect()
    }

    /// Evaluate an argument that may be an object literal or an expression
    pub fn evaluate_value(&self, text: &str, ctx: &Context<'_>) -> Value {
        if text.trim_start().starts_with('{') {
            Value::Object(self.evaluate_object(text, ctx))
        } else {
            self.evaluate(text, ctx)
        }
    }

    /// Number of distinct expression texts seen so far
    pub fn cached(&self) -> usize {
        self.cache.read().map(|cache| cache.len()).unwrap_or(0)
    }
}
