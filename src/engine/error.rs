//! Errors raised while rendering

use thiserror::Error;

/// Failures that abort a render call
///
/// Everything else (unknown components or includes, failing directives,
/// broken expressions) degrades to a placeholder or empty output.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    #[error("template not found: {name}")]
    TemplateNotFound { name: String },

    #[error("alias not registered: {alias}")]
    AliasNotRegistered { alias: String },

    #[error("parent template not found: {parent} (extended by {child})")]
    ParentNotFound { parent: String, child: String },

    #[error("render depth limit of {limit} exceeded: {chain}")]
    RecursionLimit { limit: usize, chain: String },
}

/// Failure inside a component's render logic
#[derive(Debug, Error)]
pub enum ComponentError {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("{0}")]
    Failed(String),
}

impl ComponentError {
    pub fn failed(message: impl Into<String>) -> Self {
        ComponentError::Failed(message.into())
    }
}

/// Failure inside a custom directive handler
#[derive(Debug, Error)]
pub enum DirectiveError {
    #[error("missing argument {index} for @{directive}")]
    MissingArgument { directive: String, index: usize },

    #[error("invalid argument for @{directive}: {message}")]
    InvalidArgument { directive: String, message: String },

    #[error("{0}")]
    Failed(String),
}
