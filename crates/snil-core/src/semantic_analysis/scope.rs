// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! The scope tree.
//!
//! Scopes are organized hierarchically:
//! - Global (the whole script; characters and labels always live here)
//! - Function (one per `func` body; parameters and local variables)
//! - Block (one per conditional branch body)
//!
//! **DDD Context:** Semantic Analysis
//!
//! Scopes and symbols live in two arenas owned by [`ScopeTree`]; both are
//! addressed by index. Lookup walks outward from the innermost scope.

use std::collections::BTreeMap;

use ecow::EcoString;

use super::symbol::{Symbol, SymbolId, SymbolKind};
use crate::source_analysis::Span;

/// Index of a scope in its [`ScopeTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ScopeId(pub(crate) u32);

impl ScopeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// The kind of a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Global,
    Function,
    Block,
}

/// One scope: its symbols by (kind, name) plus its place in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    kind: ScopeKind,
    parent: Option<ScopeId>,
    span: Span,
    children: Vec<ScopeId>,
    bindings: BTreeMap<(SymbolKind, EcoString), SymbolId>,
}

impl Scope {
    #[must_use]
    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    #[must_use]
    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    /// The source range the scope covers.
    #[must_use]
    pub fn span(&self) -> Span {
        self.span
    }

    /// Nested scopes in source order.
    #[must_use]
    pub fn children(&self) -> &[ScopeId] {
        &self.children
    }

    /// The symbols declared directly in this scope.
    pub fn symbols(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.bindings.values().copied()
    }

    fn get(&self, kind: SymbolKind, name: &str) -> Option<SymbolId> {
        self.bindings.get(&(kind, EcoString::from(name))).copied()
    }
}

/// All scopes and symbols of one script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    symbols: Vec<Symbol>,
}

impl ScopeTree {
    /// A tree holding only the global scope, covering `span`.
    #[must_use]
    pub fn new(span: Span) -> Self {
        Self {
            scopes: vec![Scope {
                kind: ScopeKind::Global,
                parent: None,
                span,
                children: Vec::new(),
                bindings: BTreeMap::new(),
            }],
            symbols: Vec::new(),
        }
    }

    /// The global scope.
    #[must_use]
    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    /// Returns the scope with the given id.
    ///
    /// # Panics
    ///
    /// Panics if `id` comes from a different tree.
    #[must_use]
    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    /// Returns the symbol with the given id.
    ///
    /// # Panics
    ///
    /// Panics if `id` comes from a different tree.
    #[must_use]
    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    pub(crate) fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.index()]
    }

    /// All symbols, in creation order, with their ids.
    pub fn symbols(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.symbols
            .iter()
            .enumerate()
            .map(|(index, symbol)| (SymbolId(u32::try_from(index).unwrap_or(u32::MAX)), symbol))
    }

    /// Number of scopes.
    #[must_use]
    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    /// Adds a child scope of `parent`.
    pub(crate) fn push_scope(&mut self, kind: ScopeKind, parent: ScopeId, span: Span) -> ScopeId {
        let id = ScopeId(u32::try_from(self.scopes.len()).unwrap_or(u32::MAX));
        self.scopes.push(Scope {
            kind,
            parent: Some(parent),
            span,
            children: Vec::new(),
            bindings: BTreeMap::new(),
        });
        self.scopes[parent.index()].children.push(id);
        id
    }

    /// Declares `symbol` in its scope. A symbol already bound under the
    /// same (kind, name) is replaced in place so that its id stays valid;
    /// returns the id either way.
    pub(crate) fn declare(&mut self, symbol: Symbol) -> SymbolId {
        let scope = symbol.scope;
        let key = (symbol.kind, symbol.name.clone());
        if let Some(&existing) = self.scopes[scope.index()].bindings.get(&key) {
            self.symbols[existing.index()] = symbol;
            return existing;
        }
        let id = SymbolId(u32::try_from(self.symbols.len()).unwrap_or(u32::MAX));
        self.symbols.push(symbol);
        self.scopes[scope.index()].bindings.insert(key, id);
        id
    }

    /// The symbol bound directly in `scope`.
    #[must_use]
    pub fn lookup_local(&self, scope: ScopeId, kind: SymbolKind, name: &str) -> Option<SymbolId> {
        self.scope(scope).get(kind, name)
    }

    /// Resolves `name` from `scope` outward.
    #[must_use]
    pub fn lookup(&self, scope: ScopeId, kind: SymbolKind, name: &str) -> Option<SymbolId> {
        self.ancestors(scope)
            .find_map(|id| self.scope(id).get(kind, name))
    }

    /// Resolves `name` as seen from `offset` (honours `visible_from`).
    #[must_use]
    pub fn lookup_at(
        &self,
        scope: ScopeId,
        kind: SymbolKind,
        name: &str,
        offset: u32,
    ) -> Option<SymbolId> {
        self.lookup(scope, kind, name)
            .filter(|&id| self.symbol(id).visible_from <= offset)
    }

    /// `scope` and its enclosing scopes, innermost first.
    pub fn ancestors(&self, scope: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(scope), |&id| self.scope(id).parent)
    }

    /// The innermost scope whose span contains `offset`.
    #[must_use]
    pub fn scope_at(&self, offset: u32) -> ScopeId {
        let mut current = self.root();
        while let Some(&child) = self
            .scope(current)
            .children
            .iter()
            .find(|&&child| self.scope(child).span.contains_offset(offset))
        {
            current = child;
        }
        current
    }

    /// Symbols visible from `offset` inside `scope`, innermost declarations
    /// shadowing outer ones of the same kind and name.
    #[must_use]
    pub fn visible_symbols(&self, scope: ScopeId, offset: u32) -> Vec<SymbolId> {
        let mut seen = std::collections::BTreeSet::new();
        let mut visible = Vec::new();
        for id in self.ancestors(scope) {
            for (key, &symbol) in &self.scope(id).bindings {
                if self.symbol(symbol).visible_from <= offset && seen.insert(key.clone()) {
                    visible.push(symbol);
                }
            }
        }
        visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbol(name: &str, kind: SymbolKind, scope: ScopeId, start: u32) -> Symbol {
        Symbol::new(name.into(), kind, Span::new(start, start + 1), scope)
    }

    #[test]
    fn lookup_walks_outward() {
        let mut tree = ScopeTree::new(Span::new(0, 100));
        let global = tree.root();
        let function = tree.push_scope(ScopeKind::Function, global, Span::new(10, 50));
        let block = tree.push_scope(ScopeKind::Block, function, Span::new(20, 30));

        let outer = tree.declare(symbol("x", SymbolKind::Variable, global, 0));
        let inner = tree.declare(symbol("y", SymbolKind::Variable, function, 11));

        assert_eq!(tree.lookup(block, SymbolKind::Variable, "x"), Some(outer));
        assert_eq!(tree.lookup(block, SymbolKind::Variable, "y"), Some(inner));
        assert_eq!(tree.lookup(global, SymbolKind::Variable, "y"), None);
        assert_eq!(tree.lookup(block, SymbolKind::Function, "x"), None);
    }

    #[test]
    fn redeclaration_keeps_id_and_takes_last_site() {
        let mut tree = ScopeTree::new(Span::new(0, 100));
        let first = tree.declare(symbol("f", SymbolKind::Function, tree.root(), 0));
        let second = tree.declare(symbol("f", SymbolKind::Function, tree.root(), 40));
        assert_eq!(first, second);
        assert_eq!(tree.symbol(first).span.start(), 40);
    }

    #[test]
    fn scope_at_finds_innermost() {
        let mut tree = ScopeTree::new(Span::new(0, 100));
        let function = tree.push_scope(ScopeKind::Function, tree.root(), Span::new(10, 50));
        let block = tree.push_scope(ScopeKind::Block, function, Span::new(20, 30));
        assert_eq!(tree.scope_at(5), tree.root());
        assert_eq!(tree.scope_at(15), function);
        assert_eq!(tree.scope_at(25), block);
        assert_eq!(tree.scope_at(30), function);
    }

    #[test]
    fn visibility_respects_offset_and_shadowing() {
        let mut tree = ScopeTree::new(Span::new(0, 100));
        let global = tree.root();
        let function = tree.push_scope(ScopeKind::Function, global, Span::new(10, 50));
        let mut late = symbol("Bob", SymbolKind::Character, global, 60);
        late.visible_from = 60;
        tree.declare(late);
        let outer = tree.declare(symbol("x", SymbolKind::Variable, global, 0));
        let inner = tree.declare(symbol("x", SymbolKind::Variable, function, 12));

        let visible = tree.visible_symbols(function, 20);
        assert!(visible.contains(&inner));
        assert!(!visible.contains(&outer));
        assert_eq!(visible.len(), 1);
        assert_eq!(tree.lookup_at(global, SymbolKind::Character, "Bob", 20), None);
        assert!(tree.lookup_at(global, SymbolKind::Character, "Bob", 70).is_some());
    }
}
