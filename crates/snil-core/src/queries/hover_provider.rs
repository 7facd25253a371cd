// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Hover provider for the language service.
//!
//! **DDD Context:** Language Service
//!
//! Shows the signature of the symbol under the cursor, or a short usage
//! line for a built-in directive.

use ecow::EcoString;

use crate::cst::{SyntaxNodeExt, SyntaxTokenExt};
use crate::language_service::{AnalysisSnapshot, HoverInfo};
use crate::source_analysis::{Position, TokenKind};

use super::definition_provider::reference_at;

/// Usage lines for the built-in directives.
const DIRECTIVE_USAGE: &[(&str, &str)] = &[
    ("character", "@character Name [\"Display name\"] [global]: declares a character"),
    ("var", "@var name [value]: declares a variable"),
    ("label", "@label Name: starts a section that jumps and choices can target"),
    ("jump", "@jump Label: continues at a label"),
    ("choice", "@choice \"Text\" Label: offers a choice leading to a label"),
    ("scene", "@scene ...: presentation directive"),
    ("background", "@background ...: presentation directive"),
    ("show", "@show ...: presentation directive"),
    ("hide", "@hide ...: presentation directive"),
    ("music", "@music ...: presentation directive"),
    ("sound", "@sound ...: presentation directive"),
    ("wait", "@wait ...: presentation directive"),
];

/// Hover information at `position`.
///
/// # Examples
///
/// ```
/// use snil_core::language_service::analyze;
/// use snil_core::queries::hover_provider::hover_at;
/// use snil_core::source_analysis::Position;
///
/// let snapshot = analyze("func greet(name)\nend\ngreet(1)\n");
/// let hover = hover_at(&snapshot, Position::new(2, 1)).unwrap();
/// assert_eq!(hover.contents, "func greet(name)");
/// ```
#[must_use]
pub fn hover_at(snapshot: &AnalysisSnapshot, position: Position) -> Option<HoverInfo> {
    if let Some(reference) = reference_at(snapshot, position) {
        let symbol = snapshot.model().scopes().symbol(reference.symbol);
        return Some(HoverInfo {
            contents: symbol.signature().into(),
            declaration: symbol.span,
            span: reference.span,
        });
    }

    let offset = snapshot.line_index().offset(position)?;
    let token = snapshot.cst().root().token_at(offset)?;
    let TokenKind::Directive(name) = token.token_kind() else {
        return None;
    };
    let name = name.trim_start_matches('@');
    let usage = DIRECTIVE_USAGE
        .iter()
        .find(|(directive, _)| *directive == name)
        .map(|(_, usage)| EcoString::from(*usage))?;
    Some(HoverInfo {
        contents: usage,
        declaration: token.span(),
        span: token.span(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language_service::analyze;
    use crate::source_analysis::Span;

    #[test]
    fn hover_shows_variable_type() {
        let snapshot = analyze("x = 3\ny = x + 1\n");
        let hover = hover_at(&snapshot, Position::new(1, 4)).unwrap();
        assert_eq!(hover.contents, "variable x: number");
        assert_eq!(hover.declaration, Span::new(0, 1));
        assert_eq!(hover.span, Span::new(10, 11));
    }

    #[test]
    fn hover_shows_character_display_name() {
        let snapshot = analyze("@character Al \"Alice\"\nAl: hi\n");
        let hover = hover_at(&snapshot, Position::new(1, 0)).unwrap();
        assert_eq!(hover.contents, "character Al \"Alice\"");
    }

    #[test]
    fn hover_on_directive_shows_usage() {
        let snapshot = analyze("@jump End\n@label End\n");
        let hover = hover_at(&snapshot, Position::new(0, 2)).unwrap();
        assert!(hover.contents.starts_with("@jump Label"));
        assert_eq!(hover.span, Span::new(0, 5));
    }

    #[test]
    fn no_hover_on_dialogue_text() {
        let snapshot = analyze("@character Al\nAl: some words\n");
        assert!(hover_at(&snapshot, Position::new(1, 8)).is_none());
        assert!(hover_at(&snapshot, Position::new(7, 0)).is_none());
    }
}
