// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Conversions between LSP protocol types and `snil-core` types.
//!
//! LSP positions count UTF-16 code units within a line; the engine uses
//! byte offsets. Every conversion takes the text the offsets refer to.

use snil_core::language_service::{
    Completion, CompletionKind, DocumentSymbol, DocumentSymbolKind, FoldingKind, FoldingRange,
    Highlight, HighlightKind,
};
use snil_core::source_analysis::{Diagnostic, Severity, Span};
use tower_lsp::lsp_types::{
    self, CompletionItem, CompletionItemKind, DiagnosticSeverity, FoldingRangeKind,
    NumberOrString, Position, Range, SemanticToken, SemanticTokenType, SymbolKind,
};

/// Semantic token legend, indexed by [`token_type`].
pub const TOKEN_TYPES: [SemanticTokenType; 13] = [
    SemanticTokenType::MACRO,
    SemanticTokenType::KEYWORD,
    SemanticTokenType::new("speaker"),
    SemanticTokenType::new("character"),
    SemanticTokenType::VARIABLE,
    SemanticTokenType::FUNCTION,
    SemanticTokenType::new("label"),
    SemanticTokenType::STRING,
    SemanticTokenType::NUMBER,
    SemanticTokenType::OPERATOR,
    SemanticTokenType::new("dialogue"),
    SemanticTokenType::COMMENT,
    SemanticTokenType::new("error"),
];

fn token_type(kind: HighlightKind) -> u32 {
    match kind {
        HighlightKind::Directive => 0,
        HighlightKind::Keyword => 1,
        HighlightKind::Speaker => 2,
        HighlightKind::Character => 3,
        HighlightKind::Variable => 4,
        HighlightKind::Function => 5,
        HighlightKind::Label => 6,
        HighlightKind::String => 7,
        HighlightKind::Number => 8,
        HighlightKind::Operator => 9,
        HighlightKind::DialogueText => 10,
        HighlightKind::Comment => 11,
        HighlightKind::Error => 12,
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "char::len_utf16() is always 1 or 2"
)]
fn utf16_len(ch: char) -> u32 {
    ch.len_utf16() as u32
}

fn to_u32(offset: usize) -> u32 {
    u32::try_from(offset).unwrap_or(u32::MAX)
}

/// Converts an LSP position to a byte offset into `text`.
///
/// Columns past the end of the line clamp to the line end; lines past the
/// end of the text clamp to the text end.
pub fn offset_of(text: &str, position: Position) -> u32 {
    let mut line_start = 0;
    for _ in 0..position.line {
        match text[line_start..].find('\n') {
            Some(newline) => line_start += newline + 1,
            None => return to_u32(text.len()),
        }
    }

    let mut utf16_col = 0;
    let mut offset = line_start;
    for ch in text[line_start..].chars() {
        if ch == '\n' || utf16_col >= position.character {
            break;
        }
        utf16_col += utf16_len(ch);
        offset += ch.len_utf8();
    }
    to_u32(offset)
}

/// Walks `text` forward, tracking the LSP position of a byte offset.
struct Cursor<'a> {
    text: &'a str,
    offset: usize,
    position: Position,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            offset: 0,
            position: Position::new(0, 0),
        }
    }

    /// The position of `offset`; offsets must not decrease between calls.
    fn advance_to(&mut self, offset: u32) -> Position {
        let target = (offset as usize).min(self.text.len());
        if let Some(skipped) = self.text.get(self.offset..target) {
            for ch in skipped.chars() {
                if ch == '\n' {
                    self.position.line += 1;
                    self.position.character = 0;
                } else {
                    self.position.character += utf16_len(ch);
                }
            }
            self.offset = target;
        }
        self.position
    }
}

/// Converts a byte offset into `text` to an LSP position.
pub fn lsp_position(text: &str, offset: u32) -> Position {
    Cursor::new(text).advance_to(offset)
}

pub fn span_to_range(span: Span, text: &str) -> Range {
    let mut cursor = Cursor::new(text);
    let start = cursor.advance_to(span.start());
    let end = cursor.advance_to(span.end());
    Range { start, end }
}

/// The byte span an LSP range covers. Inverted ranges stay inverted so the
/// document rejects them.
pub fn range_to_span(range: Range, text: &str) -> Span {
    Span::new(offset_of(text, range.start), offset_of(text, range.end))
}

pub fn to_lsp_diagnostic(diagnostic: &Diagnostic, text: &str) -> lsp_types::Diagnostic {
    lsp_types::Diagnostic {
        range: span_to_range(diagnostic.span, text),
        severity: Some(match diagnostic.severity {
            Severity::Error => DiagnosticSeverity::ERROR,
            Severity::Warning => DiagnosticSeverity::WARNING,
            Severity::Info => DiagnosticSeverity::INFORMATION,
        }),
        code: Some(NumberOrString::String(diagnostic.code.as_str().into())),
        source: Some("snil".into()),
        message: if let Some(hint) = &diagnostic.hint {
            format!("{}\nHint: {hint}", diagnostic.message)
        } else {
            diagnostic.message.to_string()
        },
        ..Default::default()
    }
}

/// Converts completions, keeping the engine's order through `sort_text`.
pub fn completion_items(completions: Vec<Completion>) -> Vec<CompletionItem> {
    completions
        .into_iter()
        .enumerate()
        .map(|(index, completion)| CompletionItem {
            label: completion.name.to_string(),
            kind: Some(match completion.kind {
                CompletionKind::Directive | CompletionKind::Keyword => CompletionItemKind::KEYWORD,
                CompletionKind::Character => CompletionItemKind::CONSTANT,
                CompletionKind::Variable => CompletionItemKind::VARIABLE,
                CompletionKind::Function => CompletionItemKind::FUNCTION,
                CompletionKind::Label => CompletionItemKind::REFERENCE,
            }),
            detail: completion.detail.map(|detail| detail.to_string()),
            insert_text: Some(completion.insert_text.to_string()),
            sort_text: Some(format!("{index:04}")),
            ..Default::default()
        })
        .collect()
}

#[expect(deprecated, reason = "LSP DocumentSymbol requires deprecated field")]
pub fn to_lsp_symbol(symbol: DocumentSymbol, text: &str) -> lsp_types::DocumentSymbol {
    lsp_types::DocumentSymbol {
        name: symbol.name.to_string(),
        detail: symbol.detail.map(|detail| detail.to_string()),
        kind: match symbol.kind {
            DocumentSymbolKind::Label => SymbolKind::NAMESPACE,
            DocumentSymbolKind::Function => SymbolKind::FUNCTION,
            DocumentSymbolKind::Character => SymbolKind::CONSTANT,
            DocumentSymbolKind::Variable => SymbolKind::VARIABLE,
        },
        tags: None,
        deprecated: None,
        range: span_to_range(symbol.span, text),
        selection_range: span_to_range(symbol.selection_span, text),
        children: None,
    }
}

pub fn to_lsp_folding_range(range: FoldingRange) -> lsp_types::FoldingRange {
    lsp_types::FoldingRange {
        start_line: range.start_line,
        end_line: range.end_line,
        kind: Some(match range.kind {
            FoldingKind::Function | FoldingKind::Conditional | FoldingKind::Section => {
                FoldingRangeKind::Region
            }
        }),
        ..Default::default()
    }
}

/// Delta-encodes highlights (in document order, each within one line) as
/// LSP semantic tokens.
pub fn semantic_tokens(highlights: &[Highlight], text: &str) -> Vec<SemanticToken> {
    let mut cursor = Cursor::new(text);
    let mut previous = Position::new(0, 0);
    highlights
        .iter()
        .map(|highlight| {
            let start = cursor.advance_to(highlight.span.start());
            let end = cursor.advance_to(highlight.span.end());
            let delta_line = start.line - previous.line;
            let delta_start = if delta_line == 0 {
                start.character - previous.character
            } else {
                start.character
            };
            previous = start;
            SemanticToken {
                delta_line,
                delta_start,
                length: end.character.saturating_sub(start.character),
                token_type: token_type(highlight.kind),
                token_modifiers_bitset: 0,
            }
        })
        .collect()
}
