//! Parser for directive-annotated templates
//!
//! Parsing happens in two steps: [`lexer::tokenize`] produces a flat token
//! stream, and [`parse`] pairs openers with closers into a [`Node`] tree.

pub mod ast;
mod grammar;
pub mod lexer;

pub use ast::*;
pub use grammar::{parse, Parsed};
