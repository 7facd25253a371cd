// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Immutable analysis snapshots.
//!
//! **DDD Context:** Language Service
//!
//! An [`AnalysisSnapshot`] bundles everything one analysis pass produced
//! for one version of the text. It is never mutated; the next pass builds
//! a new one, sharing unchanged CST items, their parse diagnostics and
//! their graph fragments through `Arc`s.

use std::sync::Arc;

use crate::cancellation::{CancellationToken, Cancelled};
use crate::config::AnalysisConfig;
use crate::cst::{Cst, GreenElement};
use crate::graph::{self, Fragment, Graph};
use crate::semantic_analysis::{SemanticModel, bind};
use crate::source_analysis::{Diagnostic, ItemParser, LineIndex, ParsedItem};

use super::InternalError;

/// One top-level item with the artifacts derived from it alone.
#[derive(Debug, Clone)]
pub(crate) struct CachedItem {
    pub(crate) element: GreenElement,
    /// Relative to the item start.
    pub(crate) diagnostics: Arc<[Diagnostic]>,
    pub(crate) fragment: Arc<Fragment>,
}

impl CachedItem {
    pub(crate) fn from_parsed(parsed: ParsedItem) -> Self {
        let fragment = Arc::new(graph::extract(&parsed.element));
        Self {
            element: parsed.element,
            diagnostics: parsed.diagnostics,
            fragment,
        }
    }
}

/// The result of one analysis pass.
#[derive(Debug)]
pub struct AnalysisSnapshot {
    version: u64,
    text: Arc<str>,
    config: Arc<AnalysisConfig>,
    line_index: LineIndex,
    cst: Cst,
    item_diagnostics: Vec<Arc<[Diagnostic]>>,
    fragments: Vec<Arc<Fragment>>,
    model: SemanticModel,
    /// Parse and semantic diagnostics in positional order.
    diagnostics: Vec<Diagnostic>,
    graph: Graph,
}

impl AnalysisSnapshot {
    /// Binds and links `items`, which must cover `text` exactly.
    pub(crate) fn assemble(
        version: u64,
        text: Arc<str>,
        config: Arc<AnalysisConfig>,
        items: Vec<CachedItem>,
        cancel: &CancellationToken,
    ) -> Result<Self, Cancelled> {
        let mut elements = Vec::with_capacity(items.len());
        let mut item_diagnostics = Vec::with_capacity(items.len());
        let mut fragments = Vec::with_capacity(items.len());
        for item in items {
            elements.push(item.element);
            item_diagnostics.push(item.diagnostics);
            fragments.push(item.fragment);
        }
        let cst = Cst::from_items(elements);

        let model = bind(&cst, &config, cancel)?;
        let graph = graph::link(&fragments, cst.item_offsets(), cst.len(), &model);

        let mut diagnostics: Vec<Diagnostic> = item_diagnostics
            .iter()
            .zip(cst.item_offsets())
            .flat_map(|(item, &offset)| item.iter().map(move |d| d.offset_by(offset)))
            .chain(model.diagnostics().iter().cloned())
            .collect();
        diagnostics.sort_by(Diagnostic::cmp_position);

        Ok(Self {
            version,
            line_index: LineIndex::new(&text),
            text,
            config,
            cst,
            item_diagnostics,
            fragments,
            model,
            diagnostics,
            graph,
        })
    }

    /// Parses and analyzes all of `text`.
    pub(crate) fn analyze_full(
        version: u64,
        text: Arc<str>,
        config: Arc<AnalysisConfig>,
        cancel: &CancellationToken,
    ) -> Result<Self, Cancelled> {
        let mut parser = ItemParser::new(&text, 0, 0, config.max_nesting_depth);
        let mut items = Vec::new();
        while let Some(parsed) = parser.next_items() {
            cancel.check()?;
            items.extend(parsed.into_iter().map(CachedItem::from_parsed));
        }
        drop(parser);
        Self::assemble(version, text, config, items, cancel)
    }

    /// The cached item at `index`.
    pub(crate) fn cached_item(&self, index: usize) -> Option<CachedItem> {
        Some(CachedItem {
            element: self.cst.items().get(index)?.clone(),
            diagnostics: Arc::clone(self.item_diagnostics.get(index)?),
            fragment: Arc::clone(self.fragments.get(index)?),
        })
    }

    /// Checks the invariants every published snapshot must hold.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), InternalError> {
        let text = self.line_index.len();
        if self.cst.len() != text {
            return Err(InternalError::TreeLengthMismatch {
                tree: self.cst.len(),
                text,
            });
        }
        if let Some(edge) = self.graph.dangling_edge() {
            return Err(InternalError::DanglingEdge {
                source_node: edge.source,
                target: edge.target,
            });
        }
        if let Some(id) = self.graph.duplicate_id() {
            return Err(InternalError::DuplicateNodeId(id));
        }
        Ok(())
    }

    /// Number of edits applied to the opening text.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// The analyzed text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub(crate) fn shared_config(&self) -> Arc<AnalysisConfig> {
        Arc::clone(&self.config)
    }

    #[must_use]
    pub fn line_index(&self) -> &LineIndex {
        &self.line_index
    }

    #[must_use]
    pub fn cst(&self) -> &Cst {
        &self.cst
    }

    /// Scopes, symbols and references.
    #[must_use]
    pub fn model(&self) -> &SemanticModel {
        &self.model
    }

    /// All diagnostics, ordered by (start, end, code, message).
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    #[must_use]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Returns true if both snapshots hold the same analysis: tree,
    /// symbols, diagnostics and graph. Versions are not compared.
    #[must_use]
    pub fn same_analysis(&self, other: &Self) -> bool {
        self.text == other.text
            && self.cst == other.cst
            && self.model == other.model
            && self.diagnostics == other.diagnostics
            && self.graph == other.graph
    }
}
