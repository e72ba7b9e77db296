//! Recursive-descent tree builder over the template token stream
//!
//! Malformed structure never aborts parsing. An opener without its closer
//! and a closer without its opener are both kept as literal text, and a
//! diagnostic is recorded.

use std::collections::HashSet;

use crate::error::{ParseError, Span};
use crate::expr::literal::split_top_level;
use crate::parser::ast::*;
use crate::parser::lexer::{tokenize, Token};

/// Directive closers and separators; meaningless outside their block
const CLOSERS: &[&str] = &[
    "elseif",
    "else",
    "endif",
    "endforeach",
    "endfor",
    "endsection",
    "endcomponent",
    "endslot",
];

/// Result of parsing a template
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Parsed {
    pub nodes: Nodes,
    pub diagnostics: Vec<ParseError>,
}

/// Parse template source into a directive tree
pub fn parse(source: &str) -> Parsed {
    let mut parser = TreeParser {
        source,
        tokens: tokenize(source),
        pos: 0,
        diagnostics: Vec::new(),
        unmatched: HashSet::new(),
    };
    let (nodes, _) = parser.parse_until(&[]);
    Parsed {
        nodes,
        diagnostics: parser.diagnostics,
    }
}

/// The closer that ended a `parse_until` call
struct Stop {
    name: String,
    args: Option<String>,
    span: Span,
}

struct TreeParser<'s> {
    source: &'s str,
    tokens: Vec<(Token, Span)>,
    pos: usize,
    diagnostics: Vec<ParseError>,
    /// Body start positions of openers already known to have no closer.
    /// Whether an opener closes depends only on the tokens after it, so each
    /// one is scanned for its closer at most once.
    unmatched: HashSet<usize>,
}

impl<'s> TreeParser<'s> {
    /// Parse nodes until one of `stops` is reached (consumed and returned)
    /// or the input ends
    fn parse_until(&mut self, stops: &[&str]) -> (Nodes, Option<Stop>) {
        let mut nodes: Nodes = Vec::new();

        while let Some((token, span)) = self.tokens.get(self.pos).cloned() {
            self.pos += 1;
            let node = match token {
                Token::Text(text) => Node::Text(text),
                Token::Echo { expr, raw } => Node::Echo {
                    expr,
                    escape: !raw,
                },
                Token::Directive { name, args } => {
                    if stops.contains(&name.as_str()) {
                        return (nodes, Some(Stop { name, args, span }));
                    }
                    match self.directive(&name, args, span.clone()) {
                        Some((node, node_span)) => {
                            nodes.push(Spanned::new(node, node_span));
                            continue;
                        }
                        None => Node::Text(self.source[span.clone()].to_string()),
                    }
                }
            };
            push_merged(&mut nodes, Spanned::new(node, span));
        }

        (nodes, None)
    }

    /// Build the node for a directive token, consuming its body if it has one
    ///
    /// Returns `None` when the directive must be kept as literal text.
    fn directive(&mut self, name: &str, args: Option<String>, span: Span) -> Option<(Node, Span)> {
        let args_text = args.clone().unwrap_or_default();
        let node = match name {
            "extends" => Node::Extends { args: args_text },
            "yield" => Node::Yield { args: args_text },
            "include" => Node::Include { args: args_text },
            "section" if split_top_level(&args_text, ',').len() >= 2 => {
                let mut parts = split_top_level(&args_text, ',');
                let content = parts.split_off(1).join(", ");
                Node::Section {
                    args: parts.join(""),
                    body: SectionBody::Inline(content),
                }
            }
            "section" => {
                let (body, end) = self.block(name, &span, "endsection")?;
                return Some((
                    Node::Section {
                        args: args_text,
                        body: SectionBody::Block(body),
                    },
                    span.start..end,
                ));
            }
            "foreach" => {
                let (body, end) = self.block(name, &span, "endforeach")?;
                return Some((Node::Foreach { args: args_text, body }, span.start..end));
            }
            "for" => {
                let (body, end) = self.block(name, &span, "endfor")?;
                return Some((Node::For { args: args_text, body }, span.start..end));
            }
            "slot" => {
                let body_start = span.end;
                let resume = self.checkpoint();
                if self.known_unclosed(name, &span) {
                    return None;
                }
                let (_, stop) = self.parse_until(&["endslot"]);
                let Some(stop) = stop else {
                    self.unclosed(resume, name, &span);
                    return None;
                };
                let raw = self.source[body_start..stop.span.start].to_string();
                return Some((
                    Node::Slot(SlotDef {
                        args: args_text,
                        raw,
                    }),
                    span.start..stop.span.end,
                ));
            }
            "component" => {
                let (body, end) = self.block(name, &span, "endcomponent")?;
                return Some((Node::Component(self.component(args_text, body)), span.start..end));
            }
            "if" => return self.conditional(args_text, span),
            closer if CLOSERS.contains(&closer) => {
                self.diagnostics.push(ParseError::syntax(
                    span,
                    format!("unexpected @{} without a matching opener", closer),
                ));
                return None;
            }
            other => Node::Directive {
                name: other.to_string(),
                args,
                raw: self.source[span.clone()].to_string(),
            },
        };
        Some((node, span))
    }

    /// Parse a body up to `end`; on a missing closer, rewind and give up
    fn block(&mut self, name: &str, open: &Span, end: &str) -> Option<(Nodes, usize)> {
        let resume = self.checkpoint();
        if self.known_unclosed(name, open) {
            return None;
        }
        let (body, stop) = self.parse_until(&[end]);
        match stop {
            Some(stop) => Some((body, stop.span.end)),
            None => {
                self.unclosed(resume, name, open);
                None
            }
        }
    }

    fn conditional(&mut self, condition: String, open: Span) -> Option<(Node, Span)> {
        let resume = self.checkpoint();
        if self.known_unclosed("if", &open) {
            return None;
        }
        let mut branches = Vec::new();
        let mut condition = condition;

        loop {
            let (body, stop) = self.parse_until(&["elseif", "else", "endif"]);
            let Some(stop) = stop else {
                self.unclosed(resume, "if", &open);
                return None;
            };
            branches.push(Branch { condition, body });

            match stop.name.as_str() {
                "elseif" => condition = stop.args.unwrap_or_default(),
                "else" => {
                    let (otherwise, stop) = self.parse_until(&["endif"]);
                    let Some(stop) = stop else {
                        self.unclosed(resume, "if", &open);
                        return None;
                    };
                    return Some((
                        Node::If {
                            branches,
                            otherwise: Some(otherwise),
                        },
                        open.start..stop.span.end,
                    ));
                }
                _ => {
                    return Some((
                        Node::If {
                            branches,
                            otherwise: None,
                        },
                        open.start..stop.span.end,
                    ))
                }
            }
        }
    }

    /// Split a component body into named slots and the default slot text
    fn component(&self, args: String, body: Nodes) -> ComponentCall {
        let mut default_slot = String::new();
        let mut slots = Vec::new();
        for child in body {
            match child.node {
                Node::Slot(slot) => slots.push(slot),
                _ => default_slot.push_str(&self.source[child.span]),
            }
        }
        ComponentCall {
            args,
            default_slot,
            slots,
        }
    }

    fn checkpoint(&self) -> (usize, usize) {
        (self.pos, self.diagnostics.len())
    }

    /// Rewind to just after an opener that was never closed
    fn unclosed(&mut self, (pos, diagnostics): (usize, usize), name: &str, open: &Span) {
        self.pos = pos;
        self.unmatched.insert(pos);
        self.diagnostics.truncate(diagnostics);
        self.report_unclosed(name, open);
    }

    /// Report an opener whose closer an earlier scan already failed to find
    fn known_unclosed(&mut self, name: &str, open: &Span) -> bool {
        if !self.unmatched.contains(&self.pos) {
            return false;
        }
        self.report_unclosed(name, open);
        true
    }

    fn report_unclosed(&mut self, name: &str, open: &Span) {
        self.diagnostics.push(ParseError::syntax(
            open.clone(),
            format!("unclosed @{}", name),
        ));
    }
}

/// Append a node, joining adjacent literal text
fn push_merged(nodes: &mut Nodes, next: Spanned<Node>) {
    if let (Some(last), Node::Text(text)) = (nodes.last_mut(), &next.node) {
        if let Node::Text(prev) = &mut last.node {
            if last.span.end == next.span.start {
                prev.push_str(text);
                last.span.end = next.span.end;
                return;
            }
        }
    }
    nodes.push(next);
}
