// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Semantic analysis for SNIL.
//!
//! This module binds a parsed script:
//! - Scope construction (global, function bodies, branch bodies)
//! - Symbol tables for characters, variables, functions and labels
//! - Name resolution, recording one [`Reference`] per name use
//! - Definite-assignment tracking for use-before-init warnings
//! - Best-effort value type inference
//!
//! The result is a [`SemanticModel`]. Binding never fails on malformed
//! input; it only stops early when its [`CancellationToken`] is cancelled.

use crate::cancellation::{CancellationToken, Cancelled};
use crate::config::AnalysisConfig;
use crate::cst::{Cst, SyntaxNodeExt};
use crate::source_analysis::{Diagnostic, Span};

mod binder;
pub mod scope;
pub mod symbol;

pub(crate) use binder::{directive_syntax, function_header};
pub use scope::{Scope, ScopeId, ScopeKind, ScopeTree};
pub use symbol::{Reference, ReferenceKind, Symbol, SymbolId, SymbolKind, ValueType};

/// Result of binding one script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemanticModel {
    scopes: ScopeTree,
    /// Sorted by span.
    references: Vec<Reference>,
    diagnostics: Vec<Diagnostic>,
}

impl SemanticModel {
    /// The scope tree and its symbols.
    #[must_use]
    pub fn scopes(&self) -> &ScopeTree {
        &self.scopes
    }

    /// All references, in source order.
    #[must_use]
    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    /// Binder diagnostics, in the order they were found.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// The reference whose span contains `offset`, or ends exactly at it
    /// (a cursor just after a name).
    #[must_use]
    pub fn reference_at(&self, offset: u32) -> Option<&Reference> {
        let index = self
            .references
            .partition_point(|reference| reference.span.end() < offset);
        self.references[index..]
            .iter()
            .take_while(|reference| reference.span.start() <= offset)
            .find(|reference| reference.span.contains_offset(offset) || reference.span.end() == offset)
    }

    /// The reference covering exactly `span`.
    #[must_use]
    pub fn reference_with_span(&self, span: Span) -> Option<&Reference> {
        let index = self
            .references
            .partition_point(|reference| reference.span.start() < span.start());
        self.references[index..]
            .iter()
            .take_while(|reference| reference.span.start() == span.start())
            .find(|reference| reference.span == span)
    }

    /// Every reference to `symbol`, in source order.
    pub fn references_to(&self, symbol: SymbolId) -> impl Iterator<Item = &Reference> {
        self.references
            .iter()
            .filter(move |reference| reference.symbol == symbol)
    }
}

/// Binds `cst`, producing its scopes, references and semantic diagnostics.
///
/// # Errors
///
/// Returns [`Cancelled`] if `cancel` is cancelled while binding.
pub fn bind(
    cst: &Cst,
    config: &AnalysisConfig,
    cancel: &CancellationToken,
) -> Result<SemanticModel, Cancelled> {
    cancel.check()?;
    let root = cst.root();
    binder::Binder::new(config, cancel, root.span()).bind(&root)
}
