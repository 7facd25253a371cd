// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Analysis configuration.
//!
//! The CLI builds an [`AnalysisConfig`] from its flags; the language server
//! deserializes it from the client's `initializationOptions`. Every field
//! is optional in serialized form.

use ecow::EcoString;
use serde::Deserialize;

use crate::source_analysis::MAX_NESTING_DEPTH;

/// Directives the binder interprets or accepts without an Info diagnostic.
pub const KNOWN_DIRECTIVES: &[&str] = &[
    "character",
    "var",
    "label",
    "jump",
    "choice",
    "scene",
    "background",
    "show",
    "hide",
    "music",
    "sound",
    "wait",
];

/// Options for one document's analysis.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalysisConfig {
    /// Maximum nesting of blocks and expressions before the parser skips
    /// the construct.
    pub max_nesting_depth: usize,
    /// Report `I-UNKNOWN-DIRECTIVE` and other Info diagnostics.
    pub report_info: bool,
    /// Additional directive names (without `@`) treated as known
    /// presentation directives.
    pub extra_directives: Vec<EcoString>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_nesting_depth: MAX_NESTING_DEPTH,
            report_info: true,
            extra_directives: Vec::new(),
        }
    }
}

impl AnalysisConfig {
    /// Returns true if `name` (without `@`) is a known directive.
    #[must_use]
    pub fn is_known_directive(&self, name: &str) -> bool {
        KNOWN_DIRECTIVES.contains(&name) || self.extra_directives.iter().any(|d| d == name)
    }

    /// All known directive names, built-in first.
    pub fn directive_names(&self) -> impl Iterator<Item = &str> {
        KNOWN_DIRECTIVES
            .iter()
            .copied()
            .chain(self.extra_directives.iter().map(EcoString::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.max_nesting_depth, 64);
        assert!(config.report_info);
        assert!(config.is_known_directive("character"));
        assert!(!config.is_known_directive("portrait"));
    }

    #[test]
    fn extra_directives_are_known() {
        let config = AnalysisConfig {
            extra_directives: vec!["portrait".into()],
            ..AnalysisConfig::default()
        };
        assert!(config.is_known_directive("portrait"));
        assert_eq!(config.directive_names().last(), Some("portrait"));
    }

    #[test]
    fn deserializes_partial_options() {
        let config: AnalysisConfig =
            serde_json::from_str(r#"{ "reportInfo": false, "extraDirectives": ["shake"] }"#)
                .unwrap();
        assert!(!config.report_info);
        assert_eq!(config.max_nesting_depth, 64);
        assert!(config.is_known_directive("shake"));
    }
}
