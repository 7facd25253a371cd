// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! SNIL analysis engine.
//!
//! This crate contains the language analysis for SNIL dialogue scripts:
//! - Lexical analysis and parsing into a lossless concrete syntax tree
//! - Semantic analysis (scopes, symbols, name resolution, definite assignment)
//! - Dialogue graph extraction
//! - An incremental document controller and editor queries
//!
//! The engine is designed as a language service, prioritizing editor
//! responsiveness: every edit produces a new immutable snapshot, and
//! unchanged top-level items are reused from the previous one.

#![doc = include_str!("../../../README.md")]

pub mod cancellation;
pub mod config;
pub mod cst;
pub mod graph;
pub mod language_service;
pub mod queries;
pub mod semantic_analysis;
pub mod source_analysis;

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::config::AnalysisConfig;
    pub use crate::cst::{Cst, SyntaxKind, SyntaxNode, SyntaxNodeExt, SyntaxTokenExt};
    pub use crate::graph::{Graph, GraphEdgeKind, GraphNodeKind, NodeId};
    pub use crate::language_service::{AnalysisSnapshot, Document, TextEdit, analyze};
    pub use crate::source_analysis::{Diagnostic, DiagnosticCode, Position, Severity, Span};
}
