// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Value objects for the language service.
//!
//! **DDD Context:** Language Service
//!
//! Value objects are immutable types defined by their attributes:
//!
//! - **`TextEdit`** - A replacement of a byte range of the buffer
//! - **`TokenInfo`** - A token with its absolute span and position
//! - **`Highlight`** - A token classified for syntax highlighting
//! - **`Completion`** - A code completion suggestion
//! - **`HoverInfo`** - Information to display on hover
//! - **`FoldingRange`** / **`DocumentSymbol`** - Outline information

use ecow::EcoString;
use serde::Serialize;

use crate::source_analysis::{Position, Span, TokenKind};

/// Replaces `span` of the buffer with `text`. Offsets are bytes of the
/// text the edit is applied to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub span: Span,
    pub text: String,
}

impl TextEdit {
    #[must_use]
    pub fn new(span: Span, text: impl Into<String>) -> Self {
        Self {
            span,
            text: text.into(),
        }
    }

    /// Inserts `text` at `offset`.
    #[must_use]
    pub fn insert(offset: u32, text: impl Into<String>) -> Self {
        Self::new(Span::empty(offset), text)
    }

    /// Deletes `span`.
    #[must_use]
    pub fn delete(span: Span) -> Self {
        Self::new(span, String::new())
    }
}

/// A token with absolute span and line/column of its start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    pub kind: TokenKind,
    pub text: EcoString,
    pub span: Span,
    pub position: Position,
}

/// Semantic token classes. The editor picks the colours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum HighlightKind {
    Directive,
    Keyword,
    /// A dialogue speaker.
    Speaker,
    /// A character name outside the speaker position (`@character Al`).
    Character,
    Variable,
    Function,
    Label,
    String,
    Number,
    Operator,
    DialogueText,
    Comment,
    /// Lexical errors and skipped input.
    Error,
}

/// A highlighted token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Highlight {
    pub span: Span,
    pub kind: HighlightKind,
}

/// What a completion inserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CompletionKind {
    Directive,
    Keyword,
    Character,
    Variable,
    Function,
    Label,
}

/// A completion candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Completion {
    /// The name shown and matched against the typed prefix.
    pub name: EcoString,
    pub kind: CompletionKind,
    /// What replaces the prefix when accepted.
    pub insert_text: EcoString,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<EcoString>,
}

impl Completion {
    /// A completion inserting its own name.
    #[must_use]
    pub fn new(name: impl Into<EcoString>, kind: CompletionKind) -> Self {
        let name = name.into();
        Self {
            insert_text: name.clone(),
            name,
            kind,
            detail: None,
        }
    }

    #[must_use]
    pub fn with_insert_text(mut self, insert_text: impl Into<EcoString>) -> Self {
        self.insert_text = insert_text.into();
        self
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<EcoString>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Hover text for a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoverInfo {
    /// One-line signature, for example `func greet(name)`.
    pub contents: EcoString,
    /// Where the symbol is declared.
    pub declaration: Span,
    /// The hovered name.
    pub span: Span,
}

/// Foldable region kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FoldingKind {
    Function,
    Conditional,
    /// A label section, up to the next label.
    Section,
}

/// A foldable line range (0-indexed, inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FoldingRange {
    pub start_line: u32,
    pub end_line: u32,
    pub kind: FoldingKind,
}

/// Outline entry kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DocumentSymbolKind {
    Label,
    Function,
    Character,
    Variable,
}

/// An outline entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentSymbol {
    pub name: EcoString,
    pub kind: DocumentSymbolKind,
    /// The whole declaration.
    pub span: Span,
    /// The declared name.
    pub selection_span: Span,
    /// Extra text for the outline: a signature or display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<EcoString>,
}
