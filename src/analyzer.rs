//! Static dependency analysis
//!
//! Walks the templates reachable from a root through `@extends`, `@include`
//! and `@component` references without rendering anything. Only references
//! whose name is a quoted literal can be followed; computed names are
//! skipped.
//!
//! Component names are reported in both spellings, bare and inside the
//! default namespace (`alert` and `components.alert`), so a loader can use
//! whichever convention it registers components under.

use std::collections::{BTreeSet, HashSet, VecDeque};
use std::sync::Arc;

use crate::engine::{ComponentDef, Engine};
use crate::expr::literal::{split_top_level, string_literal};
use crate::parser::lexer::{tokenize, Token};
use crate::template::Template;

/// Kind of reference between two templates
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReferenceKind {
    Extends,
    Include,
    Component,
}

impl ReferenceKind {
    fn from_directive(name: &str) -> Option<Self> {
        match name {
            "extends" => Some(ReferenceKind::Extends),
            "include" => Some(ReferenceKind::Include),
            "component" => Some(ReferenceKind::Component),
            _ => None,
        }
    }
}

/// A reference found in a template's source
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub kind: ReferenceKind,
}

/// Everything reachable from a root template
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependencyGraph {
    /// Templates that were found and scanned
    pub templates: BTreeSet<String>,
    /// References in discovery order
    pub edges: Vec<Edge>,
    /// Component names, in both bare and namespaced spelling
    pub components: BTreeSet<String>,
    /// Referenced names that could not be found
    pub missing: BTreeSet<String>,
}

/// What a reference resolved to
enum Lookup {
    Source(String, Arc<Template>),
    /// Host-implemented component; nothing to scan
    Opaque,
    /// Adapter pointing at another component
    Forward(String),
    Missing,
}

pub struct Analyzer<'e> {
    engine: &'e Engine,
}

impl<'e> Analyzer<'e> {
    pub fn new(engine: &'e Engine) -> Self {
        Self { engine }
    }

    /// Component names transitively reachable from `root`
    pub fn analyze(&self, root: &str) -> BTreeSet<String> {
        self.graph(root).components
    }

    /// Breadth-first walk of the reference graph from `root`
    ///
    /// The visited set only grows, so cycles and diamonds terminate.
    pub fn graph(&self, root: &str) -> DependencyGraph {
        let mut graph = DependencyGraph::default();
        let mut visited: HashSet<(String, ReferenceKind)> = HashSet::new();
        let mut queue: VecDeque<(String, ReferenceKind)> = VecDeque::new();
        queue.push_back((root.to_string(), ReferenceKind::Include));

        while let Some((name, kind)) = queue.pop_front() {
            if !visited.insert((name.clone(), kind)) {
                continue;
            }

            let (resolved, template) = match self.lookup(&name, kind) {
                Lookup::Source(resolved, template) => (resolved, template),
                Lookup::Opaque => continue,
                Lookup::Forward(target) => {
                    self.record_component(&mut graph, &target);
                    queue.push_back((target, ReferenceKind::Component));
                    continue;
                }
                Lookup::Missing => {
                    tracing::debug!(reference = %name, "dependency not found");
                    graph.missing.insert(name);
                    continue;
                }
            };

            if !graph.templates.insert(resolved.clone()) {
                continue;
            }

            for (kind, target) in references(&template.source) {
                let target = self.expand(&target);
                if kind == ReferenceKind::Component {
                    self.record_component(&mut graph, &target);
                }
                graph.edges.push(Edge {
                    from: resolved.clone(),
                    to: target.clone(),
                    kind,
                });
                queue.push_back((target, kind));
            }
        }

        graph
    }

    fn record_component(&self, graph: &mut DependencyGraph, name: &str) {
        let namespace = &self.engine.config().default_namespace;
        graph.components.insert(name.to_string());
        if namespace.is_empty() {
            return;
        }
        match name.strip_prefix(&format!("{}.", namespace)) {
            Some(bare) => graph.components.insert(bare.to_string()),
            None => graph.components.insert(format!("{}.{}", namespace, name)),
        };
    }

    /// Expand aliases; unknown aliases are left for the lookup to miss
    fn expand(&self, reference: &str) -> String {
        match self.engine.config().expand_alias(reference) {
            Ok(Some(name)) => name,
            _ => reference.to_string(),
        }
    }

    fn lookup(&self, name: &str, kind: ReferenceKind) -> Lookup {
        if kind != ReferenceKind::Component {
            return match self.engine.template(name) {
                Some(template) => Lookup::Source(name.to_string(), template),
                None => Lookup::Missing,
            };
        }

        let namespace = &self.engine.config().default_namespace;
        let mut candidates = vec![name.to_string()];
        if !namespace.is_empty() && !name.starts_with(&format!("{}.", namespace)) {
            candidates.push(format!("{}.{}", namespace, name));
        }

        for candidate in candidates {
            match self.engine.component(&candidate) {
                Some(ComponentDef::Fragment { template }) => {
                    return Lookup::Source(candidate, Arc::clone(template))
                }
                Some(ComponentDef::Function(_)) => return Lookup::Opaque,
                Some(ComponentDef::Adapter { target, .. }) => return Lookup::Forward(target.clone()),
                None => {}
            }
            if let Some(template) = self.engine.template(&candidate) {
                return Lookup::Source(candidate, template);
            }
        }
        Lookup::Missing
    }
}

/// Literal extends, include and component references in template source
pub fn references(source: &str) -> Vec<(ReferenceKind, String)> {
    tokenize(source)
        .into_iter()
        .filter_map(|(token, _)| match token {
            Token::Directive {
                name,
                args: Some(args),
            } => {
                let kind = ReferenceKind::from_directive(&name)?;
                let first = split_top_level(&args, ',').first().copied()?;
                Some((kind, string_literal(first)?))
            }
            _ => None,
        })
        .collect()
}
