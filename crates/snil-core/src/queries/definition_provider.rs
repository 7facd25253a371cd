// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Definition provider for the language service.
//!
//! **DDD Context:** Language Service
//!
//! Resolves the name under the cursor through the references the binder
//! recorded. Every declaration records a reference too, so asking at a
//! declaration site yields the symbol itself.

use crate::language_service::AnalysisSnapshot;
use crate::semantic_analysis::{Reference, Symbol, SymbolId};
use crate::source_analysis::{Position, Span};

/// The reference under `position`, if the cursor is on or just after a
/// resolved name.
#[must_use]
pub fn reference_at(snapshot: &AnalysisSnapshot, position: Position) -> Option<&Reference> {
    let offset = snapshot.line_index().offset(position)?;
    snapshot.model().reference_at(offset)
}

/// The symbol a resolved name under `position` refers to.
///
/// # Examples
///
/// ```
/// use snil_core::language_service::analyze;
/// use snil_core::queries::definition_provider::symbol_at;
/// use snil_core::semantic_analysis::SymbolKind;
/// use snil_core::source_analysis::Position;
///
/// let snapshot = analyze("@character Alice\nAlice: Hi\n");
/// let (_, symbol) = symbol_at(&snapshot, Position::new(1, 2)).unwrap();
/// assert_eq!(symbol.kind, SymbolKind::Character);
/// ```
#[must_use]
pub fn symbol_at(snapshot: &AnalysisSnapshot, position: Position) -> Option<(SymbolId, &Symbol)> {
    let reference = reference_at(snapshot, position)?;
    Some((reference.symbol, snapshot.model().scopes().symbol(reference.symbol)))
}

/// The declaration span of the symbol under `position`.
///
/// Redefined functions and labels resolve to their last definition.
#[must_use]
pub fn definition_at(snapshot: &AnalysisSnapshot, position: Position) -> Option<Span> {
    symbol_at(snapshot, position).map(|(_, symbol)| symbol.span)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language_service::analyze;
    use crate::semantic_analysis::SymbolKind;

    #[test]
    fn jump_target_resolves_to_label() {
        let snapshot = analyze("@jump Ending\nA: skipped\n@label Ending\n");
        let span = definition_at(&snapshot, Position::new(0, 8)).unwrap();
        assert_eq!(span, Span::new(31, 37));
    }

    #[test]
    fn declaration_site_resolves_to_itself() {
        let snapshot = analyze("func greet(name)\nend\ngreet(1)\n");
        let (_, symbol) = symbol_at(&snapshot, Position::new(0, 6)).unwrap();
        assert_eq!(symbol.kind, SymbolKind::Function);
        assert_eq!(symbol.span, Span::new(5, 10));
        assert_eq!(definition_at(&snapshot, Position::new(2, 0)), Some(Span::new(5, 10)));
    }

    #[test]
    fn parameter_resolves_in_function_scope() {
        let snapshot = analyze("func greet(name)\n  x = name\nend\n");
        let span = definition_at(&snapshot, Position::new(1, 7)).unwrap();
        assert_eq!(span, Span::new(11, 15));
    }

    #[test]
    fn unresolved_names_have_no_definition() {
        let snapshot = analyze("x = y\n");
        assert!(definition_at(&snapshot, Position::new(0, 4)).is_none());
        assert!(definition_at(&snapshot, Position::new(5, 0)).is_none());
    }
}
