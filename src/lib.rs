//! brindle - directive-annotated text templates
//!
//! Templates interleave literal text with `{{ expression }}` interpolation,
//! control flow (`@if`, `@foreach`, `@for`), layout inheritance (`@extends`,
//! `@section`, `@yield`), includes and reusable components. Expressions are
//! a restricted query language with no calls or assignment, so templates
//! can come from less trusted authors than the host application.
//!
//! # Example
//!
//! ```rust
//! use brindle::Engine;
//! use serde_json::json;
//!
//! let mut engine = Engine::new();
//! engine.register_template("layout", "<b>@yield('c', 'Def')</b>");
//! engine.register_template("page", "@extends('layout')@section('c')Hi {{ name }}@endsection");
//!
//! let html = engine.render("page", json!({"name": "<Ada>"})).unwrap();
//! assert_eq!(html, "<b>Hi &lt;Ada&gt;</b>");
//! ```

pub mod analyzer;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod expr;
pub mod parser;
pub mod template;
pub mod value;

pub use analyzer::{Analyzer, DependencyGraph};
pub use config::{ConfigError, EngineConfig};
pub use context::Context;
pub use engine::{
    ComponentDef, ComponentError, ComponentInstance, Directive, DirectiveArgs, DirectiveError,
    Engine, RenderError, RenderScope,
};
pub use error::ParseError;
pub use expr::Evaluator;
pub use template::{Template, TemplateLoader, TemplateRegistry};
pub use value::{escape_html, Map, Value};

/// Render template source with a default engine
///
/// # Example
///
/// ```rust
/// use brindle::render;
/// use serde_json::json;
///
/// let out = render(
///     "<ul>@foreach(items as i)<li>{{ i }}</li>@endforeach</ul>",
///     json!({"items": ["A", "B"]}),
/// ).unwrap();
/// assert_eq!(out, "<ul><li>A</li><li>B</li></ul>");
/// ```
pub fn render(source: &str, data: impl Into<Value>) -> Result<String, RenderError> {
    Engine::new().render_inline(source, data)
}
