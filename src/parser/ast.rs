//! Directive tree for templates

pub use crate::error::Span;

/// AST node with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// A parsed template body
pub type Nodes = Vec<Spanned<Node>>;

/// One element of a template
///
/// Directive arguments are kept as raw text and evaluated at render time,
/// against whichever scope the node ends up rendering in.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal output
    Text(String),
    /// `{{ expr }}` or, with `escape: false`, `{!! expr !!}`
    Echo { expr: String, escape: bool },
    /// `@extends('layout')`
    Extends { args: String },
    /// `@section('name') ... @endsection` or `@section('name', expr)`
    Section { args: String, body: SectionBody },
    /// `@yield('name'[, default])`
    Yield { args: String },
    /// `@if ... @elseif ... @else ... @endif`
    If {
        branches: Vec<Branch>,
        otherwise: Option<Nodes>,
    },
    /// `@foreach(collection as item) ... @endforeach`
    Foreach { args: String, body: Nodes },
    /// `@for(init; cond; incr) ... @endfor`
    For { args: String, body: Nodes },
    /// `@include('name'[, {data}])`
    Include { args: String },
    /// `@component('name'[, {props}]) ... @endcomponent`
    Component(ComponentCall),
    /// `@slot('name') ... @endslot`, meaningful inside a component body
    Slot(SlotDef),
    /// Any other `@name(args)`, resolved against the directive registry
    Directive {
        name: String,
        args: Option<String>,
        /// Original source text, printed when no handler is registered
        raw: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SectionBody {
    Block(Nodes),
    /// Second argument of the two-argument form, as expression text
    Inline(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub condition: String,
    pub body: Nodes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComponentCall {
    pub args: String,
    /// Body text outside any `@slot`, unrendered
    pub default_slot: String,
    pub slots: Vec<SlotDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlotDef {
    pub args: String,
    /// Slot body text, unrendered
    pub raw: String,
}

impl Node {
    /// Whether this node only contributes whitespace to the output
    pub fn is_blank(&self) -> bool {
        matches!(self, Node::Text(text) if text.trim().is_empty())
    }
}
