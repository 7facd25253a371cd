// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Concrete syntax tree.
//!
//! **DDD Context:** Source Analysis
//!
//! The tree is a [`rowan`] tree over [`SnilLanguage`]:
//!
//! - **Green** ([`GreenNode`], [`GreenToken`]): immutable, position-free
//!   and reference counted. Because nothing absolute is stored, an
//!   unchanged item can be shared between snapshots even when text before
//!   it moved.
//! - **Red** ([`SyntaxNode`], [`SyntaxToken`]): views with parent pointers
//!   and absolute offsets, built on demand from a green root. They are not
//!   `Send`, so snapshots store only green trees.
//!
//! Tokens store their [`SyntaxKind`] and exact text; the classified
//! [`TokenKind`] (with payload) is rebuilt from the two by
//! [`SyntaxTokenExt::token_kind`].
//!
//! Every byte of the source belongs to exactly one token, so
//! `cst.text() == source` holds for any input, malformed or not.
//!
//! ```
//! use snil_core::cst::SyntaxKind;
//! use snil_core::source_analysis::parse;
//!
//! let parsed = parse("Alice: Hi!\n");
//! let cst = parsed.cst();
//! assert_eq!(cst.text(), "Alice: Hi!\n");
//! let line = cst.root().children().next().unwrap();
//! assert_eq!(line.kind(), SyntaxKind::DialogueLine);
//! ```

use ecow::EcoString;
use rowan::{GreenNodeBuilder, GreenNodeData, Language, NodeOrToken, TextSize};

pub use rowan::{GreenNode, GreenToken};

use crate::source_analysis::{Keyword, Span, Token, TokenKind, string_content};

/// Token and node kinds of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[repr(u16)]
pub enum SyntaxKind {
    // === Tokens ===
    /// `@name`
    DirectiveName,
    DialogueText,
    Comment,
    Keyword,
    Identifier,
    Number,
    String,
    Operator,
    Colon,
    LeftParen,
    RightParen,
    Comma,
    Whitespace,
    Newline,
    Unknown,
    UnterminatedString,
    Eof,

    // === Nodes ===
    /// The whole script; its children are the top-level items.
    Root,
    /// `@name args...`
    Directive,
    /// `Speaker: text` or a narration line.
    DialogueLine,
    /// `if ... [elif ...]* [else] endif`
    ConditionalBlock,
    /// One `if` / `elif` / `else` clause: header line plus body.
    Branch,
    /// A statement list (scope bearing).
    Block,
    /// `func name(params) ... end`
    FunctionDef,
    /// `name(args)`, as a statement or inside an expression.
    FunctionCall,
    /// `(a, b)` in a function header.
    ParamList,
    /// `(x, "y")` at a call site.
    ArgList,
    /// `name = expr`
    Assignment,
    /// `a == b`, `a < b`, ...
    Comparison,
    /// `a + b`, `a and b`, ...
    BinaryExpr,
    /// `not a`, `-a`
    UnaryExpr,
    /// `(a)`
    ParenExpr,
    /// A line holding only a comment.
    CommentNode,
    /// Malformed input the parser skipped.
    ErrorNode,
}

impl SyntaxKind {
    /// Every kind, indexed by its raw value.
    const ALL: [Self; 34] = [
        Self::DirectiveName,
        Self::DialogueText,
        Self::Comment,
        Self::Keyword,
        Self::Identifier,
        Self::Number,
        Self::String,
        Self::Operator,
        Self::Colon,
        Self::LeftParen,
        Self::RightParen,
        Self::Comma,
        Self::Whitespace,
        Self::Newline,
        Self::Unknown,
        Self::UnterminatedString,
        Self::Eof,
        Self::Root,
        Self::Directive,
        Self::DialogueLine,
        Self::ConditionalBlock,
        Self::Branch,
        Self::Block,
        Self::FunctionDef,
        Self::FunctionCall,
        Self::ParamList,
        Self::ArgList,
        Self::Assignment,
        Self::Comparison,
        Self::BinaryExpr,
        Self::UnaryExpr,
        Self::ParenExpr,
        Self::CommentNode,
        Self::ErrorNode,
    ];

    /// Returns true for token kinds.
    #[must_use]
    pub const fn is_token(self) -> bool {
        (self as u16) < (Self::Root as u16)
    }

    /// Blanks and newlines.
    #[must_use]
    pub const fn is_layout(self) -> bool {
        matches!(self, Self::Whitespace | Self::Newline)
    }

    /// Kinds that occupy whole lines.
    #[must_use]
    pub const fn is_statement(self) -> bool {
        matches!(
            self,
            Self::Directive
                | Self::DialogueLine
                | Self::ConditionalBlock
                | Self::FunctionDef
                | Self::FunctionCall
                | Self::Assignment
                | Self::CommentNode
                | Self::ErrorNode
        )
    }

    /// Kinds that form an expression.
    #[must_use]
    pub const fn is_expression(self) -> bool {
        matches!(
            self,
            Self::FunctionCall
                | Self::Comparison
                | Self::BinaryExpr
                | Self::UnaryExpr
                | Self::ParenExpr
        )
    }
}

impl From<&TokenKind> for SyntaxKind {
    fn from(kind: &TokenKind) -> Self {
        match kind {
            TokenKind::Directive(_) => Self::DirectiveName,
            TokenKind::DialogueText(_) => Self::DialogueText,
            TokenKind::Comment(_) => Self::Comment,
            TokenKind::Keyword(_) => Self::Keyword,
            TokenKind::Identifier(_) => Self::Identifier,
            TokenKind::Number(_) => Self::Number,
            TokenKind::String(_) => Self::String,
            TokenKind::Operator(_) => Self::Operator,
            TokenKind::Colon => Self::Colon,
            TokenKind::LeftParen => Self::LeftParen,
            TokenKind::RightParen => Self::RightParen,
            TokenKind::Comma => Self::Comma,
            TokenKind::Whitespace => Self::Whitespace,
            TokenKind::Newline => Self::Newline,
            TokenKind::Unknown(_) => Self::Unknown,
            TokenKind::UnterminatedString(_) => Self::UnterminatedString,
            TokenKind::Eof => Self::Eof,
        }
    }
}

impl From<SyntaxKind> for rowan::SyntaxKind {
    fn from(kind: SyntaxKind) -> Self {
        Self(kind as u16)
    }
}

/// The SNIL language tag for [`rowan`] trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SnilLanguage {}

impl Language for SnilLanguage {
    type Kind = SyntaxKind;

    fn kind_from_raw(raw: rowan::SyntaxKind) -> SyntaxKind {
        SyntaxKind::ALL
            .get(usize::from(raw.0))
            .copied()
            .unwrap_or(SyntaxKind::ErrorNode)
    }

    fn kind_to_raw(kind: SyntaxKind) -> rowan::SyntaxKind {
        kind.into()
    }
}

pub type SyntaxNode = rowan::SyntaxNode<SnilLanguage>;
pub type SyntaxToken = rowan::SyntaxToken<SnilLanguage>;
pub type SyntaxElement = rowan::SyntaxElement<SnilLanguage>;
pub type SyntaxNodeChildren = rowan::SyntaxNodeChildren<SnilLanguage>;

/// A child of a green node.
pub type GreenElement = NodeOrToken<GreenNode, GreenToken>;

/// Rebuilds the classified token from its stored kind and text.
#[must_use]
pub fn token_kind(kind: SyntaxKind, text: &str) -> TokenKind {
    match kind {
        SyntaxKind::DirectiveName => TokenKind::Directive(text.into()),
        SyntaxKind::DialogueText => TokenKind::DialogueText(text.trim_end().into()),
        SyntaxKind::Comment => TokenKind::Comment(text.into()),
        SyntaxKind::Keyword => Keyword::from_word(text)
            .map_or_else(|| TokenKind::Unknown(text.into()), TokenKind::Keyword),
        SyntaxKind::Identifier => TokenKind::Identifier(text.into()),
        SyntaxKind::Number => TokenKind::Number(text.into()),
        SyntaxKind::String => TokenKind::String(string_content(text)),
        SyntaxKind::Operator => TokenKind::Operator(text.into()),
        SyntaxKind::Colon => TokenKind::Colon,
        SyntaxKind::LeftParen => TokenKind::LeftParen,
        SyntaxKind::RightParen => TokenKind::RightParen,
        SyntaxKind::Comma => TokenKind::Comma,
        SyntaxKind::Whitespace => TokenKind::Whitespace,
        SyntaxKind::Newline => TokenKind::Newline,
        SyntaxKind::UnterminatedString => TokenKind::UnterminatedString(string_content(text)),
        SyntaxKind::Eof => TokenKind::Eof,
        _ => TokenKind::Unknown(text.into()),
    }
}

// ============================================================================
// Green helpers
// ============================================================================

/// Text length of a green element in bytes.
#[must_use]
pub fn element_len(element: &GreenElement) -> u32 {
    match element {
        NodeOrToken::Node(node) => node.text_len().into(),
        NodeOrToken::Token(token) => token.text_len().into(),
    }
}

/// Kind of a green element.
#[must_use]
pub fn element_kind(element: &GreenElement) -> SyntaxKind {
    let raw = match element {
        NodeOrToken::Node(node) => node.kind(),
        NodeOrToken::Token(token) => token.kind(),
    };
    SnilLanguage::kind_from_raw(raw)
}

/// Returns true if both elements are the same node allocation, or equal
/// tokens.
#[must_use]
pub fn shares_storage(a: &GreenElement, b: &GreenElement) -> bool {
    match (a, b) {
        (NodeOrToken::Node(a), NodeOrToken::Node(b)) => {
            std::ptr::eq::<GreenNodeData>(&**a, &**b)
        }
        (NodeOrToken::Token(a), NodeOrToken::Token(b)) => a == b,
        _ => false,
    }
}

// ============================================================================
// Red helpers
// ============================================================================

/// Span and navigation helpers on syntax nodes.
pub trait SyntaxNodeExt {
    /// Absolute span.
    fn span(&self) -> Span;

    /// First direct child node of `kind`.
    fn child_of_kind(&self, kind: SyntaxKind) -> Option<SyntaxNode>;

    /// Direct child tokens.
    fn child_tokens(&self) -> impl Iterator<Item = SyntaxToken>;

    /// Direct child tokens that are neither layout nor comments.
    fn significant_tokens(&self) -> impl Iterator<Item = SyntaxToken>;

    /// All tokens below this node, in source order.
    fn descendant_tokens(&self) -> impl Iterator<Item = SyntaxToken>;

    /// The token containing `offset`. An offset at the very end of the node
    /// yields the last token.
    fn token_at(&self, offset: u32) -> Option<SyntaxToken>;

    /// The innermost node whose span contains `offset`.
    fn node_at_offset(&self, offset: u32) -> SyntaxNode;

    /// The chain of nodes containing `offset`, innermost first and ending
    /// with `self`.
    fn ancestors_at_offset(&self, offset: u32) -> Vec<SyntaxNode>;
}

impl SyntaxNodeExt for SyntaxNode {
    fn span(&self) -> Span {
        self.text_range().into()
    }

    fn child_of_kind(&self, kind: SyntaxKind) -> Option<SyntaxNode> {
        self.children().find(|n| n.kind() == kind)
    }

    fn child_tokens(&self) -> impl Iterator<Item = SyntaxToken> {
        self.children_with_tokens().filter_map(SyntaxElement::into_token)
    }

    fn significant_tokens(&self) -> impl Iterator<Item = SyntaxToken> {
        self.child_tokens()
            .filter(|t| !t.kind().is_layout() && t.kind() != SyntaxKind::Comment)
    }

    fn descendant_tokens(&self) -> impl Iterator<Item = SyntaxToken> {
        self.descendants_with_tokens()
            .filter_map(SyntaxElement::into_token)
    }

    fn token_at(&self, offset: u32) -> Option<SyntaxToken> {
        let span = self.span();
        if offset < span.start() || offset > span.end() {
            return None;
        }
        if offset == span.end() {
            return self.last_token();
        }
        self.token_at_offset(TextSize::from(offset)).right_biased()
    }

    fn node_at_offset(&self, offset: u32) -> SyntaxNode {
        let mut node = self.clone();
        while let Some(inner) = node
            .children()
            .find(|child| child.span().contains_offset(offset))
        {
            node = inner;
        }
        node
    }

    fn ancestors_at_offset(&self, offset: u32) -> Vec<SyntaxNode> {
        let mut node = self.node_at_offset(offset);
        let mut path = Vec::new();
        while node != *self {
            let Some(parent) = node.parent() else {
                break;
            };
            path.push(std::mem::replace(&mut node, parent));
        }
        path.push(self.clone());
        path
    }
}

/// Span and classification helpers on syntax tokens.
pub trait SyntaxTokenExt {
    /// Absolute span.
    fn span(&self) -> Span;

    /// The classified token, payload included.
    fn token_kind(&self) -> TokenKind;

    /// The name, if this is an identifier.
    fn identifier(&self) -> Option<EcoString>;

    /// Returns true if the token is the given keyword.
    fn is_keyword(&self, keyword: Keyword) -> bool;
}

impl SyntaxTokenExt for SyntaxToken {
    fn span(&self) -> Span {
        self.text_range().into()
    }

    fn token_kind(&self) -> TokenKind {
        token_kind(self.kind(), self.text())
    }

    fn identifier(&self) -> Option<EcoString> {
        (self.kind() == SyntaxKind::Identifier).then(|| self.text().into())
    }

    fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind() == SyntaxKind::Keyword && self.text() == keyword.as_str()
    }
}

/// Span of a node or token.
pub trait SyntaxElementExt {
    fn span(&self) -> Span;
}

impl SyntaxElementExt for SyntaxElement {
    fn span(&self) -> Span {
        self.text_range().into()
    }
}

// ============================================================================
// Whole-script tree
// ============================================================================

/// The CST of one script version: a `Root` node over the top-level items.
///
/// Items are kept alongside the root so the incremental path can reuse
/// them by index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cst {
    green: GreenNode,
    items: Vec<GreenElement>,
    item_offsets: Vec<u32>,
}

impl Cst {
    /// Builds the root over `items` (top-level elements in order).
    #[must_use]
    pub fn from_items(items: Vec<GreenElement>) -> Self {
        let mut item_offsets = Vec::with_capacity(items.len());
        let mut offset = 0;
        for item in &items {
            item_offsets.push(offset);
            offset += element_len(item);
        }
        Self {
            green: GreenNode::new(SyntaxKind::Root.into(), items.iter().cloned()),
            items,
            item_offsets,
        }
    }

    /// A fresh red root over the tree.
    #[must_use]
    pub fn root(&self) -> SyntaxNode {
        SyntaxNode::new_root(self.green.clone())
    }

    /// The green root.
    #[must_use]
    pub fn green(&self) -> &GreenNode {
        &self.green
    }

    /// The top-level items, in order.
    #[must_use]
    pub fn items(&self) -> &[GreenElement] {
        &self.items
    }

    /// Start offset of each top-level item.
    #[must_use]
    pub fn item_offsets(&self) -> &[u32] {
        &self.item_offsets
    }

    /// Total text length.
    #[must_use]
    pub fn len(&self) -> u32 {
        self.green.text_len().into()
    }

    /// Returns true for an empty script.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reconstructs the source text.
    #[must_use]
    pub fn text(&self) -> String {
        self.root().text().to_string()
    }

    /// Index of the first item whose end is at or after `offset`.
    #[must_use]
    pub fn first_item_touching(&self, offset: u32) -> usize {
        let count = self.item_offsets.len();
        let before = self
            .item_offsets
            .get(1..)
            .map_or(0, |starts| starts.partition_point(|&start| start < offset));
        if before + 1 == count && self.len() < offset {
            count
        } else {
            before
        }
    }
}

// ============================================================================
// Builder
// ============================================================================

/// A position for wrapping already-built children in a node after the fact.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Checkpoint {
    inner: rowan::Checkpoint,
    tokens: usize,
}

/// Builds top-level items one at a time on a [`GreenNodeBuilder`].
///
/// The rowan builder needs a single root, so each batch of items is built
/// under a scratch `Root` node that [`Self::finish_items`] unwraps.
pub(crate) struct TreeBuilder {
    inner: GreenNodeBuilder<'static>,
    tokens: usize,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        let mut inner = GreenNodeBuilder::new();
        inner.start_node(SyntaxKind::Root.into());
        Self { inner, tokens: 0 }
    }
}

impl TreeBuilder {
    pub(crate) fn start_node(&mut self, kind: SyntaxKind) {
        self.inner.start_node(kind.into());
    }

    pub(crate) fn token(&mut self, token: &Token) {
        self.inner
            .token(SyntaxKind::from(token.kind()).into(), token.text());
        self.tokens += 1;
    }

    pub(crate) fn finish_node(&mut self) {
        self.inner.finish_node();
    }

    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            inner: self.inner.checkpoint(),
            tokens: self.tokens,
        }
    }

    /// Opens a node whose first child is the element built at `checkpoint`.
    pub(crate) fn start_node_at(&mut self, checkpoint: Checkpoint, kind: SyntaxKind) {
        self.inner.start_node_at(checkpoint.inner, kind.into());
    }

    /// Number of tokens added since `checkpoint`.
    pub(crate) fn tokens_since(&self, checkpoint: Checkpoint) -> usize {
        self.tokens - checkpoint.tokens
    }

    /// Removes all completed top-level elements.
    pub(crate) fn finish_items(&mut self) -> Vec<GreenElement> {
        self.inner.finish_node();
        let scratch = std::mem::take(self).inner.finish();
        scratch
            .children()
            .map(|child| match child {
                NodeOrToken::Node(node) => NodeOrToken::Node(node.to_owned()),
                NodeOrToken::Token(token) => NodeOrToken::Token(token.to_owned()),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source_analysis::Position;

    fn tok(kind: TokenKind, text: &str) -> Token {
        Token::new(kind, Span::default(), text, Position::default())
    }

    fn sample() -> Cst {
        let mut builder = TreeBuilder::default();
        builder.start_node(SyntaxKind::DialogueLine);
        builder.token(&tok(TokenKind::Identifier("Al".into()), "Al"));
        builder.token(&tok(TokenKind::Colon, ":"));
        builder.token(&tok(TokenKind::DialogueText("hi".into()), "hi"));
        builder.token(&tok(TokenKind::Newline, "\n"));
        builder.finish_node();
        builder.token(&tok(TokenKind::Newline, "\n"));
        builder.start_node(SyntaxKind::CommentNode);
        builder.token(&tok(TokenKind::Comment("//x".into()), "//x"));
        builder.finish_node();
        Cst::from_items(builder.finish_items())
    }

    #[test]
    fn lengths_and_offsets() {
        let cst = sample();
        assert_eq!(cst.len(), 10);
        assert_eq!(cst.item_offsets(), &[0, 6, 7]);
        assert_eq!(cst.text(), "Al:hi\n\n//x");
        assert_eq!(element_kind(&cst.items()[1]), SyntaxKind::Newline);
    }

    #[test]
    fn red_views_have_absolute_spans() {
        let cst = sample();
        let root = cst.root();
        let comment = root.children().nth(1).unwrap();
        assert_eq!(comment.kind(), SyntaxKind::CommentNode);
        assert_eq!(comment.span(), Span::new(7, 10));
        let token = root.token_at(3).unwrap();
        assert_eq!(token.text(), "hi");
        assert_eq!(token.span(), Span::new(3, 5));
        assert_eq!(root.token_at(10).unwrap().text(), "//x");
        assert_eq!(root.token_at(11), None);
        assert_eq!(root.ancestors_at_offset(8), vec![comment, root.clone()]);
    }

    #[test]
    fn descendant_tokens_in_order() {
        let cst = sample();
        let root = cst.root();
        let texts: Vec<_> = root.descendant_tokens().map(|t| t.text().to_string()).collect();
        assert_eq!(texts, vec!["Al", ":", "hi", "\n", "\n", "//x"]);
    }

    #[test]
    fn payloads_are_rebuilt_from_text() {
        assert_eq!(
            token_kind(SyntaxKind::String, r#""a\"b\n""#),
            TokenKind::String("a\"b\n".into())
        );
        assert_eq!(
            token_kind(SyntaxKind::UnterminatedString, "\"open"),
            TokenKind::UnterminatedString("open".into())
        );
        assert_eq!(
            token_kind(SyntaxKind::DialogueText, "Hi there  "),
            TokenKind::DialogueText("Hi there".into())
        );
        assert_eq!(
            token_kind(SyntaxKind::Keyword, "endif"),
            TokenKind::Keyword(Keyword::Endif)
        );
    }

    #[test]
    fn raw_kinds_round_trip() {
        for kind in SyntaxKind::ALL {
            assert_eq!(SnilLanguage::kind_from_raw(kind.into()), kind);
        }
        assert!(SyntaxKind::Eof.is_token());
        assert!(!SyntaxKind::Root.is_token());
    }

    #[test]
    fn checkpoint_wraps_built_children() {
        let mut builder = TreeBuilder::default();
        let checkpoint = builder.checkpoint();
        builder.token(&tok(TokenKind::Number("1".into()), "1"));
        builder.start_node_at(checkpoint, SyntaxKind::BinaryExpr);
        builder.token(&tok(TokenKind::Operator("+".into()), "+"));
        builder.token(&tok(TokenKind::Number("2".into()), "2"));
        builder.finish_node();
        assert_eq!(builder.tokens_since(checkpoint), 3);
        let items = builder.finish_items();
        assert_eq!(items.len(), 1);
        assert_eq!(element_kind(&items[0]), SyntaxKind::BinaryExpr);
        assert_eq!(element_len(&items[0]), 3);
    }

    #[test]
    fn rebuilt_roots_share_item_storage() {
        let cst = sample();
        let rebuilt = Cst::from_items(cst.items().to_vec());
        assert!(shares_storage(&cst.items()[0], &rebuilt.items()[0]));
        assert_eq!(rebuilt, cst);
        let other = sample();
        assert!(!shares_storage(&cst.items()[0], &other.items()[0]));
    }

    #[test]
    fn first_item_touching_offsets() {
        let cst = sample();
        assert_eq!(cst.first_item_touching(0), 0);
        assert_eq!(cst.first_item_touching(6), 0);
        assert_eq!(cst.first_item_touching(7), 1);
        assert_eq!(cst.first_item_touching(10), 2);
    }
}
