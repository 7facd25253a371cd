// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! `snil graph`: dump the dialogue graph of one script.
//!
//! Text output lists nodes (with their position and flags) then edges.
//! JSON output is the serialized graph. With `--node`, only the
//! neighborhood of that node is printed.

use std::fmt::Write as _;

use camino::Utf8Path;
use miette::Result;
use snil_core::config::AnalysisConfig;
use snil_core::graph::{Graph, NodeId};
use snil_core::language_service::{AnalysisSnapshot, analyze_with_config};
use snil_core::queries::graph_provider;
use tracing::instrument;

use super::{OutputFormat, read_script};

/// Restricts the dump to the nodes near one node.
#[derive(Debug, Clone)]
pub struct Focus {
    /// Hex node identifier, as printed by `snil graph`.
    pub node: String,
    pub radius: usize,
}

/// Print the graph of the script at `path`.
#[instrument(skip(config))]
pub fn run_graph(
    path: &Utf8Path,
    config: AnalysisConfig,
    format: OutputFormat,
    focus: Option<Focus>,
) -> Result<()> {
    let source = read_script(path)?;
    let snapshot = analyze_with_config(&source, config);
    let graph = match focus {
        Some(focus) => {
            let Some(id) = NodeId::parse(&focus.node) else {
                miette::bail!("'{}' is not a node identifier", focus.node);
            };
            let Some(graph) = graph_provider::neighborhood(&snapshot, id, focus.radius) else {
                miette::bail!("no node {id} in '{path}'");
            };
            graph
        }
        None => graph_provider::graph(&snapshot).clone(),
    };

    match format {
        OutputFormat::Text => print!("{}", render_text(&snapshot, &graph)),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&graph)
                .map_err(|e| miette::miette!("Failed to serialize graph: {e}"))?;
            println!("{json}");
        }
    }
    Ok(())
}

fn render_text(snapshot: &AnalysisSnapshot, graph: &Graph) -> String {
    let mut out = String::new();
    for node in &graph.nodes {
        let position = snapshot
            .line_index()
            .position(node.span.start())
            .unwrap_or_default();
        let mut flags = String::new();
        if node.entry {
            flags.push_str(" [entry]");
        }
        if !node.reachable {
            flags.push_str(" [unreachable]");
        }
        let _ = writeln!(
            out,
            "{} {:<17} {}:{} {:?}{flags}",
            node.id,
            node.kind.as_str(),
            position.line + 1,
            position.column + 1,
            node.label.as_str(),
        );
    }
    for edge in &graph.edges {
        let _ = writeln!(out, "{} -> {} {}", edge.source, edge.target, edge.kind.as_str());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::write_temp_script;
    use snil_core::language_service::analyze;

    #[test]
    fn text_lists_nodes_then_edges() {
        let snapshot = analyze("@character A\nA: hi\n");
        let text = render_text(&snapshot, snapshot.graph());
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("dialogue          2:1 \"A: hi\" [entry]"));
        assert!(lines[1].contains(" end "));
        assert!(lines[2].ends_with(" sequential"));
    }

    #[test]
    fn unreachable_nodes_are_flagged() {
        let snapshot = analyze("A: one\n@jump Next\nA: lost\n@label Next\n");
        let text = render_text(&snapshot, snapshot.graph());
        let lost = text.lines().find(|line| line.contains("A: lost")).unwrap();
        assert!(lost.ends_with("[unreachable]"));
    }

    #[test]
    fn focus_on_a_node() {
        let source = "A: one\nA: two\nA: three\nA: four\n";
        let (_dir, path) = write_temp_script(source);
        let snapshot = analyze(source);
        let two = snapshot.graph().nodes[1].id;
        let focus = Focus {
            node: two.to_string(),
            radius: 1,
        };
        assert!(run_graph(&path, AnalysisConfig::default(), OutputFormat::Json, Some(focus)).is_ok());

        let missing = Focus {
            node: "00000000000000aa".into(),
            radius: 1,
        };
        let error =
            run_graph(&path, AnalysisConfig::default(), OutputFormat::Text, Some(missing)).unwrap_err();
        assert!(error.to_string().starts_with("no node 00000000000000aa"));

        let malformed = Focus {
            node: "zz".into(),
            radius: 1,
        };
        assert!(run_graph(&path, AnalysisConfig::default(), OutputFormat::Text, Some(malformed)).is_err());
    }

    #[test]
    fn whole_graph_as_json() {
        let (_dir, path) = write_temp_script("@label Start\nA: hi\n@jump Start\n");
        assert!(run_graph(&path, AnalysisConfig::default(), OutputFormat::Json, None).is_ok());
    }
}
