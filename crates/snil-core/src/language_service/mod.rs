// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Language service API for editors and tools.
//!
//! **DDD Context:** Language Service
//!
//! The analyzer IS the language service: every phase keeps the data the
//! editor queries need, and the queries in [`crate::queries`] read it from
//! an immutable [`AnalysisSnapshot`].
//!
//! # Architecture
//!
//! - [`analyze`] runs a full, synchronous pass over a text. The CLI uses it.
//! - [`Document`] owns an editable buffer and a background worker that
//!   re-analyzes incrementally after each edit. The language server keeps
//!   one per open file.
//!
//! # Performance Requirements
//!
//! | Operation | Target | Notes |
//! |-----------|--------|-------|
//! | Keystroke to diagnostics | <50ms | single-line edits re-parse one item |
//! | Completions, hover | <50ms | read the published snapshot only |
//! | Graph query | <100ms | links cached per-item fragments |
//!
//! # Usage
//!
//! ```
//! use snil_core::language_service::analyze;
//!
//! let snapshot = analyze("@character Alice\nAlice: Hello!\n");
//! assert!(snapshot.diagnostics().is_empty());
//! assert_eq!(snapshot.graph().nodes.len(), 2);
//! ```

mod document;
mod error;
mod incremental;
mod snapshot;
mod value_objects;


pub use document::{Document, SnapshotHandle, SnapshotOutcome};
pub use error::{EditError, InternalError};
pub use snapshot::AnalysisSnapshot;
pub use value_objects::{
    Completion, CompletionKind, DocumentSymbol, DocumentSymbolKind, FoldingKind, FoldingRange,
    Highlight, HighlightKind, HoverInfo, TextEdit, TokenInfo,
};

use std::sync::Arc;

use crate::cancellation::{CancellationToken, Cancelled};
use crate::config::AnalysisConfig;

/// Analyzes `text` with the default configuration.
#[must_use]
pub fn analyze(text: &str) -> AnalysisSnapshot {
    analyze_with_config(text, AnalysisConfig::default())
}

/// Analyzes `text` from scratch. The snapshot has version 0.
#[must_use]
pub fn analyze_with_config(text: &str, config: AnalysisConfig) -> AnalysisSnapshot {
    let cancel = CancellationToken::new();
    match AnalysisSnapshot::analyze_full(0, text.into(), Arc::new(config), &cancel) {
        Ok(snapshot) => snapshot,
        Err(Cancelled) => unreachable!("the token is never cancelled"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphNodeKind;

    #[test]
    fn analyze_builds_every_artifact() {
        let snapshot = analyze("@character Alice\n@label start\nAlice: Hello!\n@jump start\n");
        assert_eq!(snapshot.version(), 0);
        assert!(snapshot.diagnostics().is_empty());
        assert_eq!(snapshot.cst().text(), snapshot.text());
        assert_eq!(snapshot.graph().nodes_of_kind(GraphNodeKind::Label).count(), 1);
        assert!(snapshot.validate().is_ok());
    }

    #[test]
    fn config_reaches_the_binder() {
        let quiet = AnalysisConfig {
            report_info: false,
            ..AnalysisConfig::default()
        };
        assert_eq!(analyze("@shake\n").diagnostics().len(), 1);
        assert!(analyze_with_config("@shake\n", quiet).diagnostics().is_empty());
    }
}
