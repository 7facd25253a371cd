// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Example demonstrating the language service API.
//!
//! Opens a document, applies an edit, then asks the snapshot for
//! diagnostics, completions, hover info and the dialogue graph.

use snil_core::config::AnalysisConfig;
use snil_core::language_service::{Document, TextEdit};
use snil_core::queries::{
    completion_provider, definition_provider, diagnostic_provider, graph_provider, hover_provider,
};
use snil_core::source_analysis::Position;

const SCRIPT: &str = "\
@character Alice \"Alice Liddell\"
@label Start
Alice: Where am I?
if curious
  Alice: Let's look around.
endif
";

fn main() -> std::io::Result<()> {
    println!("SNIL Language Service Example\n");
    println!("=============================\n");

    let mut document = Document::open(SCRIPT, AnalysisConfig::default())?;

    // 1. The first snapshot is published by `open`.
    let snapshot = document.snapshot();
    println!("1. Diagnostics for the opening script");
    for diagnostic in diagnostic_provider::diagnostics(&snapshot) {
        let position = snapshot
            .line_index()
            .position(diagnostic.span.start())
            .unwrap_or_default();
        println!("   {position} {}: {}", diagnostic.code, diagnostic.message);
    }
    println!();

    // 2. Declaring the variable fixes the error.
    println!("2. Incremental edit");
    let handle = match document.apply_edit(&TextEdit::insert(0, "@var curious true\n")) {
        Ok(handle) => handle,
        Err(error) => {
            println!("   edit rejected: {error}");
            return Ok(());
        }
    };
    let Some(snapshot) = handle.wait().snapshot().cloned() else {
        println!("   no snapshot committed");
        return Ok(());
    };
    println!(
        "   version {}: {} diagnostic(s)",
        snapshot.version(),
        snapshot.diagnostics().len()
    );
    println!();

    // 3. Completions at the start of a new line.
    println!("3. Completions at line start");
    for completion in completion_provider::compute_completions(&snapshot, Position::new(7, 0))
        .iter()
        .take(5)
    {
        println!("   - {} ({:?})", completion.name, completion.kind);
    }
    println!();

    // 4. Hover and definition on the speaker.
    println!("4. Hover and definition of `Alice` on line 4");
    let speaker = Position::new(3, 2);
    if let Some(hover) = hover_provider::hover_at(&snapshot, speaker) {
        println!("   hover: {}", hover.contents);
    }
    if let Some(span) = definition_provider::definition_at(&snapshot, speaker) {
        println!("   declared at bytes {}..{}", span.start(), span.end());
    }
    println!();

    // 5. The dialogue graph.
    println!("5. Dialogue graph");
    let graph = graph_provider::graph(&snapshot);
    for node in &graph.nodes {
        println!("   [{}] {} {:?}", node.id, node.kind.as_str(), node.label);
    }
    for edge in &graph.edges {
        println!("   {} -> {} ({})", edge.source, edge.target, edge.kind.as_str());
    }

    Ok(())
}
