// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Document symbols provider for the language service.
//!
//! **DDD Context:** Language Service
//!
//! Builds the outline: labels, functions, characters and top-level
//! variables in declaration order. Function parameters and locals are
//! left out.

use crate::cst::{SyntaxKind, SyntaxNode, SyntaxNodeExt, SyntaxTokenExt};
use crate::language_service::{AnalysisSnapshot, DocumentSymbol, DocumentSymbolKind};
use crate::semantic_analysis::{Symbol, SymbolKind};
use crate::source_analysis::Span;

/// The outline of the document.
#[must_use]
pub fn document_symbols(snapshot: &AnalysisSnapshot) -> Vec<DocumentSymbol> {
    let scopes = snapshot.model().scopes();
    let root = scopes.root();
    let mut symbols: Vec<DocumentSymbol> = scopes
        .symbols()
        .filter(|(_, symbol)| symbol.kind != SymbolKind::Variable || symbol.scope == root)
        .map(|(_, symbol)| outline_entry(snapshot, symbol))
        .collect();
    symbols.sort_by_key(|symbol| (symbol.selection_span.start(), symbol.selection_span.end()));
    symbols
}

fn outline_entry(snapshot: &AnalysisSnapshot, symbol: &Symbol) -> DocumentSymbol {
    let kind = match symbol.kind {
        SymbolKind::Label => DocumentSymbolKind::Label,
        SymbolKind::Function => DocumentSymbolKind::Function,
        SymbolKind::Character => DocumentSymbolKind::Character,
        SymbolKind::Variable => DocumentSymbolKind::Variable,
    };
    let detail = match symbol.kind {
        SymbolKind::Character => symbol.display_name.clone(),
        SymbolKind::Function | SymbolKind::Variable => Some(symbol.signature().into()),
        SymbolKind::Label => None,
    };
    DocumentSymbol {
        name: symbol.name.clone(),
        kind,
        span: declaration_span(snapshot, symbol.span).unwrap_or(symbol.span),
        selection_span: symbol.span,
        detail,
    }
}

/// The statement declaring the name at `name`, without its leading blanks
/// and line break.
fn declaration_span(snapshot: &AnalysisSnapshot, name: Span) -> Option<Span> {
    let statement = snapshot
        .cst()
        .root()
        .ancestors_at_offset(name.start())
        .into_iter()
        .find(|node| {
            matches!(
                node.kind(),
                SyntaxKind::Directive | SyntaxKind::Assignment | SyntaxKind::FunctionDef
            )
        })?;
    trimmed_span(&statement)
}

fn trimmed_span(node: &SyntaxNode) -> Option<Span> {
    let mut tokens = node
        .descendant_tokens()
        .filter(|token| !token.kind().is_layout());
    let first = tokens.next()?.span();
    Some(tokens.last().map_or(first, |last| first.merge(last.span())))
}
