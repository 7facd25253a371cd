// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! The dialogue/script graph.
//!
//! **DDD Context:** Graph Extraction
//!
//! Nodes are dialogue lines, choices, condition tests, call sites, labels,
//! function entries and implicit end points. Edges are control transfers.
//! The graph may contain cycles.
//!
//! Extraction happens in two steps:
//!
//! 1. [`fragment`]: each top-level item is turned into a [`Fragment`] with
//!    item-relative spans and symbolic references (label names and callee
//!    spans). Fragments are cached next to their CST item and reused by
//!    incremental passes.
//! 2. [`linker`]: the fragments of a snapshot are stitched together (jumps
//!    by label name, calls through the binder's references), given stable
//!    identifiers, and marked reachable or not.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::fmt;

use ecow::EcoString;
use serde::Serialize;

use crate::semantic_analysis::SymbolId;
use crate::source_analysis::Span;

pub(crate) mod fragment;
pub(crate) mod linker;

pub(crate) use fragment::{Fragment, extract};
pub(crate) use linker::link;

/// Stable node identifier: a hash of the node's kind, label and enclosing
/// function plus an occurrence index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u64);

impl NodeId {
    /// Parses the 16-digit hex form produced by `Display`.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        u64::from_str_radix(text, 16).ok().map(Self)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Serialized as the hex string, since JSON numbers lose 64-bit precision
/// in most clients.
impl Serialize for NodeId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// What a graph node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum GraphNodeKind {
    /// A dialogue or narration line.
    Dialogue,
    /// An `@choice` option.
    Choice,
    /// The test of an `if` or `elif`.
    ConditionalBranch,
    /// The start of a `func` body.
    FunctionEntry,
    /// A function call, as a statement or inside an expression.
    Call,
    /// An `@label` section start.
    Label,
    /// Where flow leaves the file or a function body.
    End,
    /// A statement the parser could not make sense of, or the missing
    /// label of a jump.
    Error,
}

impl GraphNodeKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dialogue => "dialogue",
            Self::Choice => "choice",
            Self::ConditionalBranch => "conditionalBranch",
            Self::FunctionEntry => "functionEntry",
            Self::Call => "call",
            Self::Label => "label",
            Self::End => "end",
            Self::Error => "error",
        }
    }
}

/// How control moves along an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum GraphEdgeKind {
    Sequential,
    ConditionalTrue,
    ConditionalFalse,
    Call,
    Return,
    /// `@jump` or `@choice` to a label.
    Jump,
}

impl GraphEdgeKind {
    /// The kind of a pending edge after it is redirected by `@jump`.
    /// Branch edges keep their kind.
    #[must_use]
    pub(crate) const fn through_jump(self) -> Self {
        match self {
            Self::Sequential => Self::Jump,
            other => other,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::ConditionalTrue => "conditionalTrue",
            Self::ConditionalFalse => "conditionalFalse",
            Self::Call => "call",
            Self::Return => "return",
            Self::Jump => "jump",
        }
    }
}

/// A graph node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: NodeId,
    pub kind: GraphNodeKind,
    pub span: Span,
    /// Display text.
    pub label: EcoString,
    /// The function whose body holds the node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<EcoString>,
    /// Speaker (dialogue), callee (call), label or function name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<EcoString>,
    /// The symbol `name` resolved to.
    #[serde(skip)]
    pub symbol: Option<SymbolId>,
    /// The first top-level node, labels and function entries.
    pub entry: bool,
    pub reachable: bool,
}

/// A directed control-transfer edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct GraphEdge {
    pub source: NodeId,
    pub target: NodeId,
    pub kind: GraphEdgeKind,
}

/// Nodes in document order plus edges.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl Graph {
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// Entry points: the first top-level node, labels and function entries.
    pub fn entries(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.iter().filter(|node| node.entry)
    }

    /// Nodes of `kind`, in document order.
    pub fn nodes_of_kind(&self, kind: GraphNodeKind) -> impl Iterator<Item = &GraphNode> {
        self.nodes.iter().filter(move |node| node.kind == kind)
    }

    /// Edges leaving `id`.
    pub fn outgoing(&self, id: NodeId) -> impl Iterator<Item = &GraphEdge> {
        self.edges.iter().filter(move |edge| edge.source == id)
    }

    /// Edges entering `id`.
    pub fn incoming(&self, id: NodeId) -> impl Iterator<Item = &GraphEdge> {
        self.edges.iter().filter(move |edge| edge.target == id)
    }

    /// The innermost node whose span contains `offset`.
    #[must_use]
    pub fn node_at(&self, offset: u32) -> Option<&GraphNode> {
        self.nodes
            .iter()
            .filter(|node| node.span.contains_offset(offset))
            .min_by_key(|node| node.span.len())
    }

    /// The nodes within `radius` undirected hops of `center`, with every
    /// edge between them. `None` if `center` is not in the graph.
    #[must_use]
    pub fn neighborhood(&self, center: NodeId, radius: usize) -> Option<Graph> {
        self.node(center)?;

        let mut adjacency: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for edge in &self.edges {
            adjacency.entry(edge.source).or_default().push(edge.target);
            adjacency.entry(edge.target).or_default().push(edge.source);
        }

        let mut distance: BTreeMap<NodeId, usize> = BTreeMap::new();
        let mut queue = VecDeque::new();
        distance.insert(center, 0);
        queue.push_back(center);
        while let Some(id) = queue.pop_front() {
            let next = distance.get(&id).copied().unwrap_or_default() + 1;
            if next > radius {
                continue;
            }
            for &neighbor in adjacency.get(&id).into_iter().flatten() {
                if let std::collections::btree_map::Entry::Vacant(slot) = distance.entry(neighbor) {
                    slot.insert(next);
                    queue.push_back(neighbor);
                }
            }
        }

        Some(Graph {
            nodes: self
                .nodes
                .iter()
                .filter(|node| distance.contains_key(&node.id))
                .cloned()
                .collect(),
            edges: self
                .edges
                .iter()
                .filter(|edge| distance.contains_key(&edge.source) && distance.contains_key(&edge.target))
                .copied()
                .collect(),
        })
    }

    /// The first edge whose endpoint is not a node of the graph.
    #[must_use]
    pub fn dangling_edge(&self) -> Option<&GraphEdge> {
        let ids: BTreeSet<NodeId> = self.nodes.iter().map(|node| node.id).collect();
        self.edges
            .iter()
            .find(|edge| !ids.contains(&edge.source) || !ids.contains(&edge.target))
    }

    /// The first identifier carried by two nodes.
    #[must_use]
    pub fn duplicate_id(&self) -> Option<NodeId> {
        let mut seen = BTreeSet::new();
        self.nodes
            .iter()
            .map(|node| node.id)
            .find(|&id| !seen.insert(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: u64) -> GraphNode {
        GraphNode {
            id: NodeId(id),
            kind: GraphNodeKind::Dialogue,
            span: Span::new(0, 1),
            label: EcoString::new(),
            function: None,
            name: None,
            symbol: None,
            entry: false,
            reachable: true,
        }
    }

    fn edge(source: u64, target: u64) -> GraphEdge {
        GraphEdge {
            source: NodeId(source),
            target: NodeId(target),
            kind: GraphEdgeKind::Sequential,
        }
    }

    fn chain() -> Graph {
        Graph {
            nodes: (1..=5).map(node).collect(),
            edges: vec![edge(1, 2), edge(2, 3), edge(3, 4), edge(4, 5), edge(5, 1)],
        }
    }

    #[test]
    fn neighborhood_is_undirected_and_induced() {
        let graph = chain();
        let around = graph.neighborhood(NodeId(1), 1).unwrap();
        let ids: Vec<u64> = around.nodes.iter().map(|n| n.id.0).collect();
        assert_eq!(ids, vec![1, 2, 5]);
        assert_eq!(around.edges, vec![edge(1, 2), edge(5, 1)]);

        let whole = graph.neighborhood(NodeId(3), 10).unwrap();
        assert_eq!(whole, graph);
        assert!(graph.neighborhood(NodeId(9), 1).is_none());
    }

    #[test]
    fn radius_zero_is_the_node_alone() {
        let around = chain().neighborhood(NodeId(2), 0).unwrap();
        assert_eq!(around.nodes.len(), 1);
        assert!(around.edges.is_empty());
    }

    #[test]
    fn integrity_checks() {
        let mut graph = chain();
        assert!(graph.dangling_edge().is_none());
        assert!(graph.duplicate_id().is_none());
        graph.edges.push(edge(2, 42));
        assert_eq!(graph.dangling_edge(), Some(&edge(2, 42)));
        graph.nodes.push(node(3));
        assert_eq!(graph.duplicate_id(), Some(NodeId(3)));
    }

    #[test]
    fn node_ids_print_as_hex() {
        let id = NodeId(0xbeef);
        assert_eq!(id.to_string(), "000000000000beef");
        assert_eq!(NodeId::parse(&id.to_string()), Some(id));
        assert_eq!(NodeId::parse("not hex"), None);
    }
}
