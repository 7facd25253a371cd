// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Query modules for language service operations.
//!
//! This module provides domain services (Providers) from the Language Service
//! context. Each provider answers one kind of editor request against an
//! immutable [`AnalysisSnapshot`](crate::language_service::AnalysisSnapshot):
//!
//! - [`token_provider`] - Token lookup and semantic highlighting
//! - [`definition_provider`] - Symbol at cursor and go-to-definition
//! - [`references_provider`] - Every use of a symbol
//! - [`hover_provider`] - Signatures and directive usage on hover
//! - [`completion_provider`] - Suggest completions at cursor position
//! - [`diagnostic_provider`] - Positional and ranked diagnostic lists
//! - [`graph_provider`] - The dialogue graph and focused subgraphs
//! - [`folding_provider`] - Foldable blocks and label sections
//! - [`document_symbols_provider`] - Return document outline symbols
//!
//! **DDD Context:** Language Service
//!
//! Providers never trigger analysis and never block on one in flight; they
//! read whatever snapshot the caller holds.

pub mod completion_provider;
pub mod definition_provider;
pub mod diagnostic_provider;
pub mod document_symbols_provider;
pub mod folding_provider;
pub mod graph_provider;
pub mod hover_provider;
pub mod references_provider;
pub mod token_provider;
