// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! References provider for the language service.
//!
//! **DDD Context:** Language Service
//!
//! Finds every use of the symbol under the cursor within the document.
//! There is no cross-document resolution.

use crate::language_service::AnalysisSnapshot;
use crate::semantic_analysis::ReferenceKind;
use crate::source_analysis::{Position, Span};

use super::definition_provider::reference_at;

/// Spans of all references to the symbol under `position`, in source order.
///
/// Declaration sites are included only when `include_declaration` is set.
#[must_use]
pub fn references_at(
    snapshot: &AnalysisSnapshot,
    position: Position,
    include_declaration: bool,
) -> Vec<Span> {
    let Some(reference) = reference_at(snapshot, position) else {
        return Vec::new();
    };
    snapshot
        .model()
        .references_to(reference.symbol)
        .filter(|r| include_declaration || r.kind != ReferenceKind::Declaration)
        .map(|r| r.span)
        .collect()
}
