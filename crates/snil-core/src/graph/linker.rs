// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Fragment linking.
//!
//! Places fragment nodes at absolute offsets, threads top-level flow from
//! one item to the next, resolves jumps by label name and calls through the
//! binder's references, assigns node identifiers and computes reachability.
//!
//! A jump to a label that does not exist keeps its edges: they lead to an
//! `Error` node placed on the label name at the jump site.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use ecow::EcoString;

use super::fragment::{Fragment, Target};
use super::{Graph, GraphEdge, GraphEdgeKind, GraphNode, GraphNodeKind, NodeId};
use crate::semantic_analysis::{SemanticModel, SymbolKind};
use crate::source_analysis::Span;

/// Identifier of the `occurrence`-th node with this kind, label and
/// enclosing function.
fn node_id(kind: GraphNodeKind, label: &str, function: Option<&str>, occurrence: u32) -> NodeId {
    let mut hasher = DefaultHasher::new();
    kind.as_str().hash(&mut hasher);
    label.hash(&mut hasher);
    function.hash(&mut hasher);
    occurrence.hash(&mut hasher);
    NodeId(hasher.finish())
}

/// A node during linking: identifiers are assigned last.
struct Placed {
    kind: GraphNodeKind,
    label: EcoString,
    span: Span,
    function: Option<EcoString>,
    name: Option<EcoString>,
    name_span: Option<Span>,
}

/// Jump target resolution.
struct Targets<'a> {
    labels: HashMap<&'a EcoString, usize>,
    /// Placeholder nodes for missing labels, by jump site.
    missing: HashMap<Span, usize>,
}

impl Targets<'_> {
    /// The node `target` leads to. `base` and `offset` place the fragment
    /// it came from.
    fn resolve(&mut self, target: &Target, base: usize, offset: u32, nodes: &mut Vec<Placed>) -> usize {
        let (label, span) = match target {
            Target::Node(index) => return base + index,
            Target::Jump { label, span } => (label, span.offset_by(offset)),
        };
        if let Some(&node) = self.labels.get(label) {
            return node;
        }
        *self.missing.entry(span).or_insert_with(|| {
            nodes.push(Placed {
                kind: GraphNodeKind::Error,
                label: label.clone(),
                span,
                function: None,
                name: Some(label.clone()),
                name_span: Some(span),
            });
            nodes.len() - 1
        })
    }
}

/// Links the fragments of one snapshot into its graph.
///
/// `offsets[i]` is the start of the item `fragments[i]` was extracted
/// from; `len` is the text length.
pub(crate) fn link(
    fragments: &[Arc<Fragment>],
    offsets: &[u32],
    len: u32,
    model: &SemanticModel,
) -> Graph {
    let mut nodes: Vec<Placed> = Vec::new();
    let mut bases = Vec::with_capacity(fragments.len());
    for (fragment, &offset) in fragments.iter().zip(offsets) {
        bases.push(nodes.len());
        nodes.extend(fragment.nodes.iter().map(|node| Placed {
            kind: node.kind,
            label: node.label.clone(),
            span: node.span.offset_by(offset),
            function: node.function.clone(),
            name: node.name.clone(),
            name_span: node.name_span.map(|span| span.offset_by(offset)),
        }));
    }

    let mut targets = Targets {
        labels: HashMap::new(),
        missing: HashMap::new(),
    };
    // Function entries and ends by the span of the defining name.
    let mut functions: HashMap<Span, (usize, Option<usize>)> = HashMap::new();
    for (fragment, &base) in fragments.iter().zip(&bases) {
        for (name, index) in &fragment.labels {
            targets.labels.insert(name, base + index);
        }
        for function in &fragment.functions {
            let entry = base + function.entry;
            if let Some(span) = nodes[entry].name_span {
                functions.insert(span, (entry, function.end.map(|end| base + end)));
            }
        }
    }
    // A call links to the definition its callee name resolved to, so a
    // function out of scope at the call site gets no edges.
    let callee = |call: usize, nodes: &[Placed]| {
        let reference = model.reference_with_span(nodes[call].name_span?)?;
        let symbol = model.scopes().symbol(reference.symbol);
        if symbol.kind != SymbolKind::Function {
            return None;
        }
        functions.get(&symbol.span).copied()
    };

    let mut edges: Vec<(usize, usize, GraphEdgeKind)> = Vec::new();
    for ((fragment, &base), &offset) in fragments.iter().zip(&bases).zip(offsets) {
        for edge in &fragment.edges {
            let target = targets.resolve(&edge.to, base, offset, &mut nodes);
            edges.push((base + edge.from, target, edge.kind));
        }
        for &call in &fragment.calls {
            let call = base + call;
            if let Some((entry, end)) = callee(call, &nodes) {
                edges.push((call, entry, GraphEdgeKind::Call));
                if let Some(end) = end {
                    edges.push((end, call, GraphEdgeKind::Return));
                }
            }
        }
    }

    // Top-level flow; `None` is the start of the file.
    let mut pending: Vec<(Option<usize>, GraphEdgeKind)> = vec![(None, GraphEdgeKind::Sequential)];
    let mut first = None;
    for ((fragment, &base), &offset) in fragments.iter().zip(&bases).zip(offsets) {
        let Some(entry) = &fragment.entry else {
            continue;
        };
        let target = targets.resolve(entry, base, offset, &mut nodes);
        let jump = matches!(entry, Target::Jump { .. });
        for (source, kind) in pending.drain(..) {
            let kind = if jump { kind.through_jump() } else { kind };
            match source {
                None => first = Some(target),
                Some(source) => edges.push((source, target, kind)),
            }
        }
        pending.extend(fragment.exits.iter().map(|&(exit, kind)| (Some(base + exit), kind)));
    }
    if !pending.is_empty() {
        let end = nodes.len();
        nodes.push(Placed {
            kind: GraphNodeKind::End,
            label: "end".into(),
            span: Span::empty(len),
            function: None,
            name: None,
            name_span: None,
        });
        for (source, kind) in pending {
            match source {
                None => first = Some(end),
                Some(source) => edges.push((source, end, kind)),
            }
        }
    }

    let mut occurrences: HashMap<(GraphNodeKind, &EcoString, Option<&EcoString>), u32> = HashMap::new();
    let ids: Vec<NodeId> = nodes
        .iter()
        .map(|node| {
            let occurrence = occurrences
                .entry((node.kind, &node.label, node.function.as_ref()))
                .or_default();
            let id = node_id(node.kind, &node.label, node.function.as_deref(), *occurrence);
            *occurrence += 1;
            id
        })
        .collect();

    let entries: BTreeSet<usize> = nodes
        .iter()
        .enumerate()
        .filter(|(_, node)| matches!(node.kind, GraphNodeKind::Label | GraphNodeKind::FunctionEntry))
        .map(|(index, _)| index)
        .chain(first)
        .collect();
    let reachable = reachable_from(&entries, &edges, nodes.len());

    let nodes = nodes
        .into_iter()
        .enumerate()
        .map(|(index, node)| {
            let symbol = node
                .name_span
                .and_then(|span| model.reference_with_span(span))
                .map(|reference| reference.symbol);
            GraphNode {
                id: ids[index],
                kind: node.kind,
                span: node.span,
                label: node.label,
                function: node.function,
                name: node.name,
                symbol,
                entry: entries.contains(&index),
                reachable: reachable[index],
            }
        })
        .collect();
    let edges = edges
        .into_iter()
        .map(|(source, target, kind)| GraphEdge {
            source: ids[source],
            target: ids[target],
            kind,
        })
        .collect();
    Graph { nodes, edges }
}

fn reachable_from(
    entries: &BTreeSet<usize>,
    edges: &[(usize, usize, GraphEdgeKind)],
    count: usize,
) -> Vec<bool> {
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); count];
    for &(source, target, _) in edges {
        successors[source].push(target);
    }
    let mut reached = vec![false; count];
    let mut queue: VecDeque<usize> = entries.iter().copied().collect();
    for &entry in entries {
        reached[entry] = true;
    }
    while let Some(index) = queue.pop_front() {
        for &next in &successors[index] {
            if !reached[next] {
                reached[next] = true;
                queue.push_back(next);
            }
        }
    }
    reached
}
