// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Symbols and references.
//!
//! **DDD Context:** Semantic Analysis
//!
//! A [`Symbol`] is a named declaration: a character, a variable, a
//! function or a label. A [`Reference`] records one use of a name in the
//! source (declaration, read or write) and the symbol it resolved to.

use ecow::EcoString;

use super::scope::ScopeId;
use crate::source_analysis::Span;

/// What a symbol names. Each kind is a separate namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Character,
    Variable,
    Function,
    Label,
}

impl SymbolKind {
    /// Lowercase name for messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Character => "character",
            Self::Variable => "variable",
            Self::Function => "function",
            Self::Label => "label",
        }
    }
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Best-effort value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Number,
    Bool,
    /// Not inferable; never triggers a diagnostic.
    #[default]
    Unknown,
}

impl ValueType {
    /// Returns true for anything but [`ValueType::Unknown`].
    #[must_use]
    pub const fn is_known(self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Bool => "bool",
            Self::Unknown => "unknown",
        })
    }
}

/// Index of a symbol in its [`ScopeTree`](super::ScopeTree).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymbolId(pub(crate) u32);

impl SymbolId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A declared name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: EcoString,
    pub kind: SymbolKind,
    /// Span of the name at the declaration that wins (the last one when
    /// the name is redefined).
    pub span: Span,
    /// The declaring scope.
    pub scope: ScopeId,
    pub value_type: ValueType,
    /// Lookups before this offset do not see the symbol (non-global
    /// characters). Zero for hoisted symbols.
    pub visible_from: u32,
    /// Character display name from `@character Name "Display"`.
    pub display_name: Option<EcoString>,
    /// Function parameter names.
    pub params: Vec<EcoString>,
}

impl Symbol {
    pub(crate) fn new(name: EcoString, kind: SymbolKind, span: Span, scope: ScopeId) -> Self {
        Self {
            name,
            kind,
            span,
            scope,
            value_type: ValueType::Unknown,
            visible_from: 0,
            display_name: None,
            params: Vec::new(),
        }
    }

    /// Function arity (zero for other kinds).
    #[must_use]
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// One-line description for hover and completion detail.
    #[must_use]
    pub fn signature(&self) -> String {
        match self.kind {
            SymbolKind::Character => match &self.display_name {
                Some(display) => format!("character {} \"{display}\"", self.name),
                None => format!("character {}", self.name),
            },
            SymbolKind::Variable => format!("variable {}: {}", self.name, self.value_type),
            SymbolKind::Function => format!("func {}({})", self.name, self.params.join(", ")),
            SymbolKind::Label => format!("label {}", self.name),
        }
    }
}

/// How a name is used at a reference site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    Declaration,
    Read,
    Write,
}

/// One resolved use of a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    pub span: Span,
    pub symbol: SymbolId,
    pub kind: ReferenceKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signatures() {
        let mut function = Symbol::new("greet".into(), SymbolKind::Function, Span::new(5, 10), ScopeId(0));
        function.params = vec!["name".into(), "times".into()];
        assert_eq!(function.signature(), "func greet(name, times)");
        assert_eq!(function.arity(), 2);

        let mut character = Symbol::new("Al".into(), SymbolKind::Character, Span::new(0, 2), ScopeId(0));
        character.display_name = Some("Alice".into());
        assert_eq!(character.signature(), "character Al \"Alice\"");

        let variable = Symbol::new("x".into(), SymbolKind::Variable, Span::new(0, 1), ScopeId(0));
        assert_eq!(variable.signature(), "variable x: unknown");
    }
}
