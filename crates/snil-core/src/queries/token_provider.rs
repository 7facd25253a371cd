// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Token lookup and semantic highlighting.
//!
//! **DDD Context:** Language Service
//!
//! Tokens come straight from the CST, so every byte of the snapshot text
//! belongs to exactly one of them. Highlighting classifies identifiers by
//! the symbol they resolve to, falling back to their syntactic position
//! for unresolved names.

use rowan::NodeOrToken;

use crate::cst::{
    SyntaxElementExt, SyntaxKind, SyntaxNode, SyntaxNodeExt, SyntaxToken, SyntaxTokenExt,
};
use crate::language_service::{AnalysisSnapshot, Highlight, HighlightKind, TokenInfo};
use crate::semantic_analysis::SymbolKind;
use crate::source_analysis::{Position, Span, TokenKind};

/// The token containing `offset`. The end of the text yields the last
/// token.
#[must_use]
pub fn token_at(snapshot: &AnalysisSnapshot, offset: u32) -> Option<TokenInfo> {
    let token = snapshot.cst().root().token_at(offset)?;
    Some(token_info(snapshot, &token))
}

/// The token at a line/column position.
#[must_use]
pub fn token_at_position(snapshot: &AnalysisSnapshot, position: Position) -> Option<TokenInfo> {
    let offset = snapshot.line_index().offset(position)?;
    token_at(snapshot, offset)
}

/// Tokens overlapping `range`, in source order. An empty range yields the
/// token containing it.
#[must_use]
pub fn tokens_in_range(snapshot: &AnalysisSnapshot, range: Span) -> Vec<TokenInfo> {
    let mut tokens = Vec::new();
    walk(&snapshot.cst().root(), range, &mut |token, _| {
        tokens.push(token_info(snapshot, &token));
    });
    tokens
}

/// Semantic highlights for the tokens overlapping `range`. Layout and
/// punctuation tokens are skipped.
#[must_use]
pub fn highlights(snapshot: &AnalysisSnapshot, range: Span) -> Vec<Highlight> {
    let mut highlights = Vec::new();
    walk(&snapshot.cst().root(), range, &mut |token, parent| {
        if let Some(kind) = classify(snapshot, &token, parent) {
            highlights.push(Highlight {
                span: token.span(),
                kind,
            });
        }
    });
    highlights
}

fn token_info(snapshot: &AnalysisSnapshot, token: &SyntaxToken) -> TokenInfo {
    let span = token.span();
    TokenInfo {
        kind: token.token_kind(),
        text: token.text().into(),
        span,
        position: snapshot.line_index().position(span.start()).unwrap_or_default(),
    }
}

fn overlaps(span: Span, range: Span) -> bool {
    if range.is_empty() {
        span.contains_offset(range.start())
    } else {
        span.start() < range.end() && range.start() < span.end()
    }
}

/// Visits the tokens overlapping `range` with the kind of their parent.
fn walk(node: &SyntaxNode, range: Span, visit: &mut impl FnMut(SyntaxToken, SyntaxKind)) {
    for child in node.children_with_tokens() {
        let span = child.span();
        if span.end() <= range.start() && !span.is_empty() {
            continue;
        }
        if span.start() >= range.end() && !range.is_empty() {
            break;
        }
        if !overlaps(span, range) {
            continue;
        }
        match child {
            NodeOrToken::Token(token) => visit(token, node.kind()),
            NodeOrToken::Node(inner) => walk(&inner, range, visit),
        }
    }
}

fn classify(
    snapshot: &AnalysisSnapshot,
    token: &SyntaxToken,
    parent: SyntaxKind,
) -> Option<HighlightKind> {
    if parent == SyntaxKind::ErrorNode && !token.kind().is_layout() {
        return Some(HighlightKind::Error);
    }
    let kind = match token.token_kind() {
        TokenKind::Directive(_) => HighlightKind::Directive,
        TokenKind::DialogueText(_) => HighlightKind::DialogueText,
        TokenKind::Comment(_) => HighlightKind::Comment,
        TokenKind::Keyword(_) => HighlightKind::Keyword,
        TokenKind::Number(_) => HighlightKind::Number,
        TokenKind::String(_) => HighlightKind::String,
        TokenKind::Operator(_) => HighlightKind::Operator,
        TokenKind::Unknown(_) | TokenKind::UnterminatedString(_) => HighlightKind::Error,
        TokenKind::Identifier(name) => classify_identifier(snapshot, token.span(), &name, parent),
        TokenKind::Colon
        | TokenKind::LeftParen
        | TokenKind::RightParen
        | TokenKind::Comma
        | TokenKind::Whitespace
        | TokenKind::Newline
        | TokenKind::Eof => return None,
    };
    Some(kind)
}

fn classify_identifier(
    snapshot: &AnalysisSnapshot,
    span: Span,
    name: &str,
    parent: SyntaxKind,
) -> HighlightKind {
    let model = snapshot.model();
    if let Some(reference) = model.reference_with_span(span) {
        return match model.scopes().symbol(reference.symbol).kind {
            SymbolKind::Character if parent == SyntaxKind::DialogueLine => HighlightKind::Speaker,
            SymbolKind::Character => HighlightKind::Character,
            SymbolKind::Variable => HighlightKind::Variable,
            SymbolKind::Function => HighlightKind::Function,
            SymbolKind::Label => HighlightKind::Label,
        };
    }
    match parent {
        SyntaxKind::DialogueLine => HighlightKind::Speaker,
        SyntaxKind::FunctionCall | SyntaxKind::FunctionDef => HighlightKind::Function,
        SyntaxKind::Directive if name == "global" => HighlightKind::Keyword,
        _ => HighlightKind::Variable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language_service::analyze;

    #[test]
    fn token_at_finds_the_covering_token() {
        let snapshot = analyze("@character Alice\nAlice: Hello!\n");
        let token = token_at(&snapshot, 19).unwrap();
        assert_eq!(token.text, "Alice");
        assert_eq!(token.span, Span::new(17, 22));
        assert_eq!(token.position, Position::new(1, 0));

        let by_position = token_at_position(&snapshot, Position::new(1, 2)).unwrap();
        assert_eq!(by_position, token);
        assert!(token_at_position(&snapshot, Position::new(9, 0)).is_none());
    }

    #[test]
    fn tokens_in_range_partition_the_range() {
        let text = "x = 1\nif x > 0\n  x = 2\nendif\n";
        let snapshot = analyze(text);
        let all = tokens_in_range(&snapshot, Span::new(0, u32::try_from(text.len()).unwrap()));
        let rebuilt: String = all.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(rebuilt, text);
        assert!(all.windows(2).all(|w| w[0].span.end() == w[1].span.start()));

        let second_line = tokens_in_range(&snapshot, Span::new(6, 14));
        assert_eq!(second_line.first().map(|t| t.text.as_str()), Some("if"));
        assert_eq!(second_line.last().map(|t| t.text.as_str()), Some("0"));
    }

    #[test]
    fn highlights_follow_symbols() {
        let text = "@character Al\n@label start\nAl: Hi\ngreet()\n@jump start\n";
        let snapshot = analyze(text);
        let kinds: Vec<_> = highlights(&snapshot, Span::new(0, u32::try_from(text.len()).unwrap()))
            .into_iter()
            .map(|h| h.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                HighlightKind::Directive,
                HighlightKind::Character,
                HighlightKind::Directive,
                HighlightKind::Label,
                HighlightKind::Speaker,
                HighlightKind::DialogueText,
                HighlightKind::Function,
                HighlightKind::Directive,
                HighlightKind::Label,
            ]
        );
    }

    #[test]
    fn skipped_input_is_an_error_highlight() {
        let snapshot = analyze("endif\n");
        let first = highlights(&snapshot, Span::new(0, 5));
        assert_eq!(first[0].kind, HighlightKind::Error);
    }
}
