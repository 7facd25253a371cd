// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Graph queries for the visualization panels.
//!
//! **DDD Context:** Language Service

use crate::graph::{Graph, GraphNode, NodeId};
use crate::language_service::AnalysisSnapshot;
use crate::source_analysis::Position;

/// The whole dialogue graph.
#[must_use]
pub fn graph(snapshot: &AnalysisSnapshot) -> &Graph {
    snapshot.graph()
}

/// The subgraph within `radius` hops of `node`, ignoring edge direction.
/// `None` if the node does not exist.
#[must_use]
pub fn neighborhood(snapshot: &AnalysisSnapshot, node: NodeId, radius: usize) -> Option<Graph> {
    snapshot.graph().neighborhood(node, radius)
}

/// The innermost graph node at `position`, for focusing the graph view on
/// the cursor.
#[must_use]
pub fn node_at(snapshot: &AnalysisSnapshot, position: Position) -> Option<&GraphNode> {
    let offset = snapshot.line_index().offset(position)?;
    snapshot.graph().node_at(offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphEdgeKind, GraphNodeKind};
    use crate::language_service::analyze;

    const SCRIPT: &str = "\
@character A
A: one
A: two
A: three
A: four
";

    #[test]
    fn neighborhood_around_cursor() {
        let snapshot = analyze(SCRIPT);
        let center = node_at(&snapshot, Position::new(2, 4)).unwrap();
        assert_eq!(center.kind, GraphNodeKind::Dialogue);
        assert_eq!(center.label, "A: two");

        let near = neighborhood(&snapshot, center.id, 1).unwrap();
        let labels: Vec<_> = near.nodes.iter().map(|n| n.label.as_str()).collect();
        assert_eq!(labels, vec!["A: one", "A: two", "A: three"]);
        assert_eq!(near.edges.len(), 2);
        assert!(near.edges.iter().all(|e| e.kind == GraphEdgeKind::Sequential));
    }

    #[test]
    fn unknown_node_has_no_neighborhood() {
        let snapshot = analyze(SCRIPT);
        assert!(neighborhood(&snapshot, NodeId(7), 2).is_none());
        assert_eq!(graph(&snapshot).nodes.len(), 5);
    }
}
