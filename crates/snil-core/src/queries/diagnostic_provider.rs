// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Diagnostic provider for the language service.
//!
//! **DDD Context:** Language Service
//!
//! Diagnostics come from two phases, both merged into the snapshot:
//! - Parse errors, cached per top-level item
//! - Binder errors, warnings and infos
//!
//! The positional order is stable: re-analyzing unchanged text yields the
//! same list.

use crate::language_service::AnalysisSnapshot;
use crate::source_analysis::{Diagnostic, Severity};

/// All diagnostics ordered by (span start, span end, code, message).
///
/// # Examples
///
/// ```
/// use snil_core::language_service::analyze;
/// use snil_core::queries::diagnostic_provider::diagnostics;
///
/// let snapshot = analyze("Bob: Hi!\n");
/// let diagnostics = diagnostics(&snapshot);
/// assert_eq!(diagnostics.len(), 1);
/// assert_eq!(diagnostics[0].code.as_str(), "E-UNDEF-CHAR");
/// ```
#[must_use]
pub fn diagnostics(snapshot: &AnalysisSnapshot) -> &[Diagnostic] {
    snapshot.diagnostics()
}

/// Diagnostics ordered for list views: errors, then warnings, then infos,
/// each in positional order.
#[must_use]
pub fn ranked_diagnostics(snapshot: &AnalysisSnapshot) -> Vec<Diagnostic> {
    let mut ranked = snapshot.diagnostics().to_vec();
    ranked.sort_by(Diagnostic::cmp_rank);
    ranked
}

/// Number of diagnostics of each severity: (errors, warnings, infos).
#[must_use]
pub fn severity_counts(snapshot: &AnalysisSnapshot) -> (usize, usize, usize) {
    snapshot
        .diagnostics()
        .iter()
        .fold((0, 0, 0), |(errors, warnings, infos), d| match d.severity {
            Severity::Error => (errors + 1, warnings, infos),
            Severity::Warning => (errors, warnings + 1, infos),
            Severity::Info => (errors, warnings, infos + 1),
        })
}
