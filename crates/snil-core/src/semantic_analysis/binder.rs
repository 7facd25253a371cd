// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! The binder.
//!
//! **DDD Context:** Semantic Analysis
//!
//! Binding runs in two steps per scope:
//!
//! 1. **Hoisting**: declarations that are visible throughout their scope
//!    (functions, variables, labels, global characters) are entered before
//!    any statement of the scope is resolved, so declaration order does not
//!    matter for them. Characters and labels are collected once for the
//!    whole file; functions and variables when their scope is entered.
//! 2. **Walking**: statements are visited in source order, resolving every
//!    name use to a [`Reference`], tracking which variables are definitely
//!    assigned and inferring value types.
//!
//! The cancellation token is checked at every block boundary.

use std::collections::{BTreeMap, HashSet};

use ecow::EcoString;

use super::scope::{ScopeId, ScopeKind, ScopeTree};
use super::symbol::{Reference, ReferenceKind, Symbol, SymbolId, SymbolKind, ValueType};
use super::SemanticModel;
use crate::cancellation::{CancellationToken, Cancelled};
use crate::config::AnalysisConfig;
use crate::cst::{SyntaxElement, SyntaxKind, SyntaxNode, SyntaxNodeExt, SyntaxToken, SyntaxTokenExt};
use crate::source_analysis::{Diagnostic, DiagnosticCode, Keyword, Severity, Span, TokenKind};

// ============================================================================
// Syntax helpers
// ============================================================================

/// Direct children that carry meaning: no layout, comments or error nodes.
fn significant_children(node: &SyntaxNode) -> impl Iterator<Item = SyntaxElement> {
    node.children_with_tokens().filter(|child| match child {
        SyntaxElement::Token(token) => {
            !token.kind().is_layout() && token.kind() != SyntaxKind::Comment
        }
        SyntaxElement::Node(node) => node.kind() != SyntaxKind::ErrorNode,
    })
}

/// Statement nodes of a container, looking through error nodes that wrap
/// whole constructs.
pub(crate) fn statements(container: &SyntaxNode) -> Vec<SyntaxNode> {
    let mut out = Vec::new();
    for child in container.children() {
        if child.kind() == SyntaxKind::ErrorNode {
            out.extend(
                child
                    .children()
                    .filter(|node| node.kind().is_statement() && node.kind() != SyntaxKind::ErrorNode),
            );
        } else {
            out.push(child);
        }
    }
    out
}

fn is_punctuation(element: &SyntaxElement) -> bool {
    matches!(
        element.kind(),
        SyntaxKind::LeftParen | SyntaxKind::RightParen | SyntaxKind::Comma
    )
}

/// A directive statement taken apart.
pub(crate) struct DirectiveSyntax {
    /// Name without the `@`.
    pub(crate) name: EcoString,
    pub(crate) name_span: Span,
    pub(crate) args: Vec<SyntaxToken>,
    /// The line carried a lexical error; arguments are incomplete.
    pub(crate) malformed: bool,
}

impl DirectiveSyntax {
    /// The span of all arguments, or of the name when there are none.
    fn args_span(&self) -> Span {
        match (self.args.first(), self.args.last()) {
            (Some(first), Some(last)) => first.span().merge(last.span()),
            _ => self.name_span,
        }
    }

    /// The single identifier argument, if that is all there is.
    pub(crate) fn single_identifier(&self) -> Option<(EcoString, Span)> {
        match self.args.as_slice() {
            [only] => only.identifier().map(|name| (name, only.span())),
            _ => None,
        }
    }
}

pub(crate) fn directive_syntax(node: &SyntaxNode) -> Option<DirectiveSyntax> {
    let mut tokens = node.significant_tokens();
    let head = tokens.next()?;
    if head.kind() != SyntaxKind::DirectiveName {
        return None;
    }
    let text = head.text();
    Some(DirectiveSyntax {
        name: text.strip_prefix('@').unwrap_or(text).into(),
        name_span: head.span(),
        args: tokens.collect(),
        malformed: node.child_of_kind(SyntaxKind::ErrorNode).is_some(),
    })
}

/// `@character Name ["Display"] [global]`
pub(crate) struct CharacterDecl {
    pub(crate) name: EcoString,
    pub(crate) span: Span,
    pub(crate) display: Option<EcoString>,
    pub(crate) global: bool,
}

pub(crate) fn character_declaration(directive: &DirectiveSyntax) -> Option<CharacterDecl> {
    let (first, rest) = directive.args.split_first()?;
    let name = first.identifier()?;
    let is_global = |token: &SyntaxToken| token.identifier().is_some_and(|w| w == "global");
    let (display, global) = match rest {
        [] => (None, false),
        [only] => match only.token_kind() {
            TokenKind::String(text) => (Some(text), false),
            _ if is_global(only) => (None, true),
            _ => return None,
        },
        [display, flag] => match display.token_kind() {
            TokenKind::String(text) if is_global(flag) => (Some(text), true),
            _ => return None,
        },
        _ => return None,
    };
    Some(CharacterDecl {
        name,
        span: first.span(),
        display,
        global,
    })
}

/// `func name(params)` header.
pub(crate) struct FunctionHeader {
    pub(crate) name: EcoString,
    pub(crate) name_span: Span,
    pub(crate) params: Vec<(EcoString, Span)>,
}

pub(crate) fn function_header(node: &SyntaxNode) -> Option<FunctionHeader> {
    let (name, name_span) = node
        .significant_tokens()
        .find_map(|token| token.identifier().map(|name| (name, token.span())))?;
    let params = node
        .child_of_kind(SyntaxKind::ParamList)
        .map(|list| {
            list.significant_tokens()
                .filter_map(|token| token.identifier().map(|name| (name, token.span())))
                .collect()
        })
        .unwrap_or_default();
    Some(FunctionHeader {
        name,
        name_span,
        params,
    })
}

/// The target of `name = expr`.
fn assignment_target(node: &SyntaxNode) -> Option<(EcoString, Span)> {
    let token = node.significant_tokens().next()?;
    token.identifier().map(|name| (name, token.span()))
}

/// The type of a literal argument list (`1`, `-2`, `"s"`, `true`).
fn literal_type(tokens: &[SyntaxToken]) -> Option<ValueType> {
    match tokens {
        [token] => match token.token_kind() {
            TokenKind::Number(_) => Some(ValueType::Number),
            TokenKind::String(_) => Some(ValueType::String),
            TokenKind::Keyword(Keyword::True | Keyword::False) => Some(ValueType::Bool),
            _ => None,
        },
        [minus, number]
            if minus.token_kind().is_operator("-") && number.kind() == SyntaxKind::Number =>
        {
            Some(ValueType::Number)
        }
        _ => None,
    }
}

// ============================================================================
// Binder
// ============================================================================

pub(super) struct Binder<'a> {
    config: &'a AnalysisConfig,
    cancel: &'a CancellationToken,
    tree: ScopeTree,
    references: Vec<Reference>,
    diagnostics: Vec<Diagnostic>,
    /// The innermost scope of the statement being bound.
    scope: ScopeId,
    /// The innermost Function (or the Global) scope. Variables of scopes
    /// outside it count as assigned.
    function_scope: ScopeId,
    /// Variables definitely assigned at the current point.
    assigned: HashSet<SymbolId>,
}

impl<'a> Binder<'a> {
    pub(super) fn new(config: &'a AnalysisConfig, cancel: &'a CancellationToken, span: Span) -> Self {
        let tree = ScopeTree::new(span);
        let root = tree.root();
        Self {
            config,
            cancel,
            tree,
            references: Vec::new(),
            diagnostics: Vec::new(),
            scope: root,
            function_scope: root,
            assigned: HashSet::new(),
        }
    }

    pub(super) fn bind(mut self, root: &SyntaxNode) -> Result<SemanticModel, Cancelled> {
        self.declare_file_symbols(root);
        let global = self.tree.root();
        self.hoist(root, global);
        self.bind_statements(root)?;

        if !self.config.report_info {
            self.diagnostics.retain(|d| d.severity != Severity::Info);
        }
        self.references
            .sort_by_key(|reference| (reference.span.start(), reference.span.end()));
        Ok(SemanticModel {
            scopes: self.tree,
            references: self.references,
            diagnostics: self.diagnostics,
        })
    }

    // ========================================================================
    // Hoisting
    // ========================================================================

    /// Characters and labels: always global, collected from the whole file.
    fn declare_file_symbols(&mut self, root: &SyntaxNode) {
        let global = self.tree.root();
        let mut characters: BTreeMap<EcoString, Vec<CharacterDecl>> = BTreeMap::new();
        let mut labels: BTreeMap<EcoString, Vec<Span>> = BTreeMap::new();

        for node in root.descendants().filter(|n| n.kind() == SyntaxKind::Directive) {
            let Some(directive) = directive_syntax(&node) else {
                continue;
            };
            match directive.name.as_str() {
                "character" => {
                    if let Some(decl) = character_declaration(&directive) {
                        characters.entry(decl.name.clone()).or_default().push(decl);
                    }
                }
                "label" => {
                    if let Some((name, span)) = directive.single_identifier() {
                        labels.entry(name).or_default().push(span);
                    }
                }
                _ => {}
            }
        }

        for (name, decls) in characters {
            let sites: Vec<Span> = decls.iter().map(|d| d.span).collect();
            self.report_redefinitions(SymbolKind::Character, &name, &sites);
            let global_decl = decls.iter().any(|d| d.global);
            let first_end = decls.first().map_or(0, |d| d.span.end());
            if let Some(last) = decls.into_iter().next_back() {
                let mut symbol = Symbol::new(name, SymbolKind::Character, last.span, global);
                symbol.display_name = last.display;
                symbol.visible_from = if global_decl { 0 } else { first_end };
                self.tree.declare(symbol);
            }
        }

        for (name, sites) in labels {
            self.report_redefinitions(SymbolKind::Label, &name, &sites);
            if let Some(&last) = sites.last() {
                self.tree
                    .declare(Symbol::new(name, SymbolKind::Label, last, global));
            }
        }
    }

    /// Functions of `container`, plus its variables if `scope` is a
    /// Function or the Global scope.
    fn hoist(&mut self, container: &SyntaxNode, scope: ScopeId) {
        let mut functions: BTreeMap<EcoString, Vec<FunctionHeader>> = BTreeMap::new();
        for statement in statements(container) {
            if statement.kind() == SyntaxKind::FunctionDef {
                if let Some(header) = function_header(&statement) {
                    functions.entry(header.name.clone()).or_default().push(header);
                }
            }
        }
        for (name, headers) in functions {
            let sites: Vec<Span> = headers.iter().map(|h| h.name_span).collect();
            self.report_redefinitions(SymbolKind::Function, &name, &sites);
            if let Some(last) = headers.into_iter().next_back() {
                let mut symbol = Symbol::new(name, SymbolKind::Function, last.name_span, scope);
                symbol.params = last.params.into_iter().map(|(param, _)| param).collect();
                self.tree.declare(symbol);
            }
        }

        if self.tree.scope(scope).kind() != ScopeKind::Block {
            let mut declared = BTreeMap::new();
            self.hoist_variables(container, scope, &mut declared);
            for (name, sites) in declared {
                self.report_redefinitions(SymbolKind::Variable, &name, &sites);
            }
        }
    }

    /// Declares assigned and `@var` variables of `container` and its
    /// conditional bodies (not nested functions) in `scope`.
    fn hoist_variables(
        &mut self,
        container: &SyntaxNode,
        scope: ScopeId,
        var_sites: &mut BTreeMap<EcoString, Vec<Span>>,
    ) {
        for statement in statements(container) {
            match statement.kind() {
                SyntaxKind::Assignment => {
                    if let Some((name, span)) = assignment_target(&statement) {
                        self.declare_variable(scope, name, span);
                    }
                }
                SyntaxKind::Directive => {
                    let Some(directive) = directive_syntax(&statement) else {
                        continue;
                    };
                    if directive.name != "var" {
                        continue;
                    }
                    if let Some((name, span)) = directive
                        .args
                        .first()
                        .and_then(|t| t.identifier().map(|n| (n, t.span())))
                    {
                        var_sites.entry(name.clone()).or_default().push(span);
                        self.declare_variable(scope, name, span);
                    }
                }
                SyntaxKind::ConditionalBlock => {
                    for branch in statement.children() {
                        if let Some(block) = branch.child_of_kind(SyntaxKind::Block) {
                            self.hoist_variables(&block, scope, var_sites);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    /// Declares a variable unless the name already resolves to one.
    fn declare_variable(&mut self, scope: ScopeId, name: EcoString, span: Span) {
        if self.tree.lookup(scope, SymbolKind::Variable, &name).is_none() {
            self.tree
                .declare(Symbol::new(name, SymbolKind::Variable, span, scope));
        }
    }

    fn report_redefinitions(&mut self, kind: SymbolKind, name: &str, sites: &[Span]) {
        if sites.len() < 2 {
            return;
        }
        for &span in sites {
            self.diagnostics.push(
                Diagnostic::new(
                    DiagnosticCode::Redefinition,
                    format!("{kind} `{name}` is defined {} times", sites.len()),
                    span,
                )
                .with_hint("only the last definition is used"),
            );
        }
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn bind_statements(&mut self, container: &SyntaxNode) -> Result<(), Cancelled> {
        for statement in statements(container) {
            self.bind_statement(&statement)?;
        }
        Ok(())
    }

    fn bind_statement(&mut self, node: &SyntaxNode) -> Result<(), Cancelled> {
        match node.kind() {
            SyntaxKind::Directive => self.bind_directive(node),
            SyntaxKind::DialogueLine => self.bind_dialogue(node),
            SyntaxKind::Assignment => self.bind_assignment(node),
            SyntaxKind::FunctionCall => self.bind_call(node),
            SyntaxKind::ConditionalBlock => return self.bind_conditional(node),
            SyntaxKind::FunctionDef => return self.bind_function(node),
            _ => {}
        }
        Ok(())
    }

    fn bind_directive(&mut self, node: &SyntaxNode) {
        let Some(directive) = directive_syntax(node) else {
            return;
        };
        if !self.config.is_known_directive(&directive.name) {
            self.diagnostics.push(
                Diagnostic::new(
                    DiagnosticCode::UnknownDirective,
                    format!("unknown directive `@{}`", directive.name),
                    directive.name_span,
                )
                .with_hint("unknown directives are kept but not interpreted"),
            );
            return;
        }
        if directive.malformed {
            return;
        }

        match directive.name.as_str() {
            "character" => match character_declaration(&directive) {
                Some(decl) => self.record_global(SymbolKind::Character, &decl.name, decl.span),
                None => self.directive_args_error(&directive, "`@character Name [\"Display\"] [global]`"),
            },
            "var" => self.bind_var(&directive),
            "label" => match directive.single_identifier() {
                Some((name, span)) => self.record_global(SymbolKind::Label, &name, span),
                None => self.directive_args_error(&directive, "`@label Name`"),
            },
            "jump" => match directive.single_identifier() {
                Some((name, span)) => self.resolve_label(&name, span),
                None => self.directive_args_error(&directive, "`@jump Label`"),
            },
            "choice" => match directive.args.as_slice() {
                [text, target] if text.kind() == SyntaxKind::String => {
                    match target.identifier() {
                        Some(name) => self.resolve_label(&name, target.span()),
                        None => self.directive_args_error(&directive, "`@choice \"Text\" Label`"),
                    }
                }
                _ => self.directive_args_error(&directive, "`@choice \"Text\" Label`"),
            },
            // Presentation directives take free-form arguments.
            _ => {}
        }
    }

    fn directive_args_error(&mut self, directive: &DirectiveSyntax, usage: &str) {
        self.diagnostics.push(Diagnostic::new(
            DiagnosticCode::DirectiveArgs,
            format!("invalid arguments for `@{}`; expected {usage}", directive.name),
            directive.args_span(),
        ));
    }

    /// `@var name [literal]`
    fn bind_var(&mut self, directive: &DirectiveSyntax) {
        let Some((first, rest)) = directive.args.split_first() else {
            self.directive_args_error(directive, "`@var name [value]`");
            return;
        };
        let Some(name) = first.identifier() else {
            self.directive_args_error(directive, "`@var name [value]`");
            return;
        };
        let initial = if rest.is_empty() {
            None
        } else if let Some(value_type) = literal_type(rest) {
            Some(value_type)
        } else {
            self.directive_args_error(directive, "`@var name [value]`");
            return;
        };
        if let Some(id) = self.tree.lookup(self.scope, SymbolKind::Variable, &name) {
            self.record(id, first.span(), ReferenceKind::Declaration);
            if let Some(value_type) = initial {
                self.assign(id, value_type);
            }
        }
    }

    fn bind_dialogue(&mut self, node: &SyntaxNode) {
        let mut tokens = node.significant_tokens();
        let Some(speaker) = tokens.next() else {
            return;
        };
        let Some(name) = speaker.identifier() else {
            // Narration.
            return;
        };
        if !tokens.next().is_some_and(|t| t.kind() == SyntaxKind::Colon) {
            return;
        }
        let global = self.tree.root();
        match self
            .tree
            .lookup_at(global, SymbolKind::Character, &name, speaker.span().start())
        {
            Some(id) => self.record(id, speaker.span(), ReferenceKind::Read),
            None => self.diagnostics.push(
                Diagnostic::new(
                    DiagnosticCode::UndefinedCharacter,
                    format!("undefined character `{name}`"),
                    speaker.span(),
                )
                .with_hint(format!("declare it first with `@character {name}`")),
            ),
        }
    }

    fn bind_assignment(&mut self, node: &SyntaxNode) {
        let mut parts = significant_children(node);
        let Some(SyntaxElement::Token(target)) = parts.next() else {
            return;
        };
        let Some(name) = target.identifier() else {
            return;
        };
        let _equals = parts.next();
        let value_type = parts
            .next()
            .map_or(ValueType::Unknown, |value| self.bind_expression(value));
        if let Some(id) = self.tree.lookup(self.scope, SymbolKind::Variable, &name) {
            self.record(id, target.span(), ReferenceKind::Write);
            self.assign(id, value_type);
        }
    }

    fn bind_call(&mut self, node: &SyntaxNode) {
        let Some(SyntaxElement::Token(callee)) = significant_children(node).next() else {
            return;
        };
        let Some(name) = callee.identifier() else {
            return;
        };

        let mut argument_count = 0usize;
        let mut closed = false;
        if let Some(list) = node.child_of_kind(SyntaxKind::ArgList) {
            for part in significant_children(&list) {
                match part {
                    SyntaxElement::Token(token) if token.kind() == SyntaxKind::RightParen => {
                        closed = true;
                    }
                    part if is_punctuation(&part) => {}
                    argument => {
                        argument_count += 1;
                        self.bind_expression(argument);
                    }
                }
            }
        }

        let Some(id) = self.tree.lookup(self.scope, SymbolKind::Function, &name) else {
            self.diagnostics.push(Diagnostic::new(
                DiagnosticCode::UndefinedFunction,
                format!("undefined function `{name}`"),
                callee.span(),
            ));
            return;
        };
        self.record(id, callee.span(), ReferenceKind::Read);
        let arity = self.tree.symbol(id).arity();
        // A call with a broken argument list already has a parse error.
        if closed && arity != argument_count {
            let plural = if arity == 1 { "" } else { "s" };
            self.diagnostics.push(Diagnostic::new(
                DiagnosticCode::ArityMismatch,
                format!("`{name}` takes {arity} argument{plural} but {argument_count} were given"),
                callee.span(),
            ));
        }
    }

    // ========================================================================
    // Blocks
    // ========================================================================

    fn bind_conditional(&mut self, node: &SyntaxNode) -> Result<(), Cancelled> {
        let before = self.assigned.clone();
        let mut outcomes = Vec::new();
        let mut has_else = false;

        for branch in node.children().filter(|n| n.kind() == SyntaxKind::Branch) {
            self.cancel.check()?;
            self.assigned.clone_from(&before);

            let mut parts = significant_children(&branch);
            let is_else = parts
                .next()
                .and_then(SyntaxElement::into_token)
                .is_some_and(|t| t.is_keyword(Keyword::Else));
            if is_else {
                has_else = true;
            } else if let Some(condition) = parts
                .next()
                .filter(|part| part.as_node().is_none_or(|n| n.kind() != SyntaxKind::Block))
            {
                self.bind_expression(condition);
            }

            if let Some(body) = branch.child_of_kind(SyntaxKind::Block) {
                self.bind_block(&body)?;
            }
            outcomes.push(std::mem::take(&mut self.assigned));
        }
        if !has_else {
            outcomes.push(before.clone());
        }

        self.assigned = outcomes
            .into_iter()
            .reduce(|common, next| common.intersection(&next).copied().collect())
            .unwrap_or(before);
        Ok(())
    }

    /// A conditional branch body: its own Block scope.
    fn bind_block(&mut self, body: &SyntaxNode) -> Result<(), Cancelled> {
        let scope = self
            .tree
            .push_scope(ScopeKind::Block, self.scope, body.span());
        let outer = std::mem::replace(&mut self.scope, scope);
        self.hoist(body, scope);
        let result = self.bind_statements(body);
        self.scope = outer;
        result
    }

    fn bind_function(&mut self, node: &SyntaxNode) -> Result<(), Cancelled> {
        self.cancel.check()?;
        let header = function_header(node);
        if let Some(header) = &header {
            if let Some(id) = self
                .tree
                .lookup_local(self.scope, SymbolKind::Function, &header.name)
            {
                self.record(id, header.name_span, ReferenceKind::Declaration);
            }
        }

        let scope = self
            .tree
            .push_scope(ScopeKind::Function, self.scope, node.span());
        let mut assigned = HashSet::new();
        if let Some(header) = header {
            let mut params: BTreeMap<EcoString, Vec<Span>> = BTreeMap::new();
            for (name, span) in header.params {
                params.entry(name).or_default().push(span);
            }
            for (name, sites) in params {
                self.report_redefinitions(SymbolKind::Variable, &name, &sites);
                let Some(&last) = sites.last() else {
                    continue;
                };
                let id = self
                    .tree
                    .declare(Symbol::new(name, SymbolKind::Variable, last, scope));
                for span in sites {
                    self.record(id, span, ReferenceKind::Declaration);
                }
                assigned.insert(id);
            }
        }

        let outer_scope = std::mem::replace(&mut self.scope, scope);
        let outer_function = std::mem::replace(&mut self.function_scope, scope);
        let outer_assigned = std::mem::replace(&mut self.assigned, assigned);
        let result = match node.child_of_kind(SyntaxKind::Block) {
            Some(body) => {
                self.hoist(&body, scope);
                self.bind_statements(&body)
            }
            None => Ok(()),
        };
        self.scope = outer_scope;
        self.function_scope = outer_function;
        self.assigned = outer_assigned;
        result
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn bind_expression(&mut self, element: SyntaxElement) -> ValueType {
        let node = match element {
            SyntaxElement::Token(token) => return self.bind_atom(token),
            SyntaxElement::Node(node) => node,
        };
        match node.kind() {
            SyntaxKind::FunctionCall => {
                self.bind_call(&node);
                ValueType::Unknown
            }
            SyntaxKind::ParenExpr => significant_children(&node)
                .find(|part| !is_punctuation(part))
                .map_or(ValueType::Unknown, |inner| self.bind_expression(inner)),
            SyntaxKind::UnaryExpr => {
                let mut parts = significant_children(&node);
                let is_not = parts
                    .next()
                    .and_then(SyntaxElement::into_token)
                    .is_some_and(|t| t.is_keyword(Keyword::Not));
                if let Some(operand) = parts.next() {
                    self.bind_expression(operand);
                }
                if is_not {
                    ValueType::Bool
                } else {
                    ValueType::Number
                }
            }
            SyntaxKind::Comparison | SyntaxKind::BinaryExpr => self.bind_binary(&node),
            _ => ValueType::Unknown,
        }
    }

    fn bind_atom(&mut self, token: SyntaxToken) -> ValueType {
        match token.token_kind() {
            TokenKind::Number(_) => ValueType::Number,
            TokenKind::String(_) => ValueType::String,
            TokenKind::Keyword(Keyword::True | Keyword::False) => ValueType::Bool,
            TokenKind::Identifier(name) => self.read_variable(&name, token.span()),
            _ => ValueType::Unknown,
        }
    }

    fn bind_binary(&mut self, node: &SyntaxNode) -> ValueType {
        let mut parts = significant_children(node);
        let lhs = parts.next();
        let operator = parts.next().and_then(SyntaxElement::into_token);
        let rhs = parts.next();

        let left = lhs.map_or(ValueType::Unknown, |e| self.bind_expression(e));
        let right = rhs.map_or(ValueType::Unknown, |e| self.bind_expression(e));
        let Some(operator) = operator else {
            return ValueType::Unknown;
        };

        if left.is_known() && right.is_known() && left != right {
            self.diagnostics.push(Diagnostic::new(
                DiagnosticCode::TypeMismatch,
                format!(
                    "operands of `{}` have different types ({left} and {right})",
                    operator.text()
                ),
                node.span(),
            ));
        }

        if node.kind() == SyntaxKind::Comparison {
            return ValueType::Bool;
        }
        match operator.token_kind() {
            TokenKind::Keyword(Keyword::And | Keyword::Or) => ValueType::Bool,
            TokenKind::Operator(op) if op == "+" => match (left, right) {
                (ValueType::String, ValueType::String) => ValueType::String,
                (ValueType::String, _) | (_, ValueType::String) => ValueType::Unknown,
                _ => ValueType::Number,
            },
            _ => ValueType::Number,
        }
    }

    fn read_variable(&mut self, name: &EcoString, span: Span) -> ValueType {
        let Some(id) = self.tree.lookup(self.scope, SymbolKind::Variable, name) else {
            self.diagnostics.push(Diagnostic::new(
                DiagnosticCode::UndefinedVariable,
                format!("undefined variable `{name}`"),
                span,
            ));
            return ValueType::Unknown;
        };
        self.record(id, span, ReferenceKind::Read);
        let symbol = self.tree.symbol(id);
        let value_type = symbol.value_type;
        if symbol.scope == self.function_scope && !self.assigned.contains(&id) {
            self.diagnostics.push(
                Diagnostic::new(
                    DiagnosticCode::MaybeUninitialized,
                    format!("`{name}` may be used before it is assigned"),
                    span,
                )
                .with_hint("assign it on every path before this line"),
            );
        }
        value_type
    }

    // ========================================================================
    // Bookkeeping
    // ========================================================================

    fn record(&mut self, symbol: SymbolId, span: Span, kind: ReferenceKind) {
        self.references.push(Reference { span, symbol, kind });
    }

    /// Records a declaration site of a global character or label.
    fn record_global(&mut self, kind: SymbolKind, name: &str, span: Span) {
        let global = self.tree.root();
        if let Some(id) = self.tree.lookup_local(global, kind, name) {
            self.record(id, span, ReferenceKind::Declaration);
        }
    }

    fn resolve_label(&mut self, name: &str, span: Span) {
        let global = self.tree.root();
        match self.tree.lookup_local(global, SymbolKind::Label, name) {
            Some(id) => self.record(id, span, ReferenceKind::Read),
            None => self.diagnostics.push(
                Diagnostic::new(
                    DiagnosticCode::UndefinedLabel,
                    format!("undefined label `{name}`"),
                    span,
                )
                .with_hint(format!("declare it with `@label {name}`")),
            ),
        }
    }

    /// Marks a variable assigned; the first typed value fixes its type.
    fn assign(&mut self, id: SymbolId, value_type: ValueType) {
        self.assigned.insert(id);
        let symbol = self.tree.symbol_mut(id);
        if !symbol.value_type.is_known() {
            symbol.value_type = value_type;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic_analysis::bind;
    use crate::source_analysis::parse;

    fn analyze_with(source: &str, config: &AnalysisConfig) -> SemanticModel {
        let parsed = parse(source);
        bind(parsed.cst(), config, &CancellationToken::new()).unwrap()
    }

    fn analyze(source: &str) -> SemanticModel {
        analyze_with(source, &AnalysisConfig::default())
    }

    fn codes(source: &str) -> Vec<DiagnosticCode> {
        let mut codes: Vec<_> = analyze(source).diagnostics().iter().map(|d| d.code).collect();
        codes.sort();
        codes
    }

    #[test]
    fn declared_speaker_resolves() {
        let model = analyze("@character Alice\nAlice: Hello!");
        assert!(model.diagnostics().is_empty());
        let reference = model.reference_at(18).unwrap();
        let symbol = model.scopes().symbol(reference.symbol);
        assert_eq!(symbol.kind, SymbolKind::Character);
        assert_eq!(symbol.name, "Alice");
    }

    #[test]
    fn undeclared_speaker() {
        let model = analyze("Bob: Hi!");
        assert_eq!(model.diagnostics().len(), 1);
        assert_eq!(model.diagnostics()[0].code, DiagnosticCode::UndefinedCharacter);
        assert_eq!(model.diagnostics()[0].span, Span::new(0, 3));
    }

    #[test]
    fn characters_are_ordered_unless_global() {
        assert_eq!(
            codes("Alice: early\n@character Alice\n"),
            vec![DiagnosticCode::UndefinedCharacter]
        );
        assert!(codes("Alice: early\n@character Alice \"Alice A.\" global\n").is_empty());
    }

    #[test]
    fn characters_declared_in_functions_are_global() {
        let source = "func intro()\n  @character Eve global\nend\nEve: hi\n";
        assert!(codes(source).is_empty());
    }

    #[test]
    fn redefinition_reports_every_site_and_last_wins() {
        let source = "func f()\nend\nfunc f(a)\nend\nf(1)\n";
        let model = analyze(source);
        let redefinitions: Vec<_> = model
            .diagnostics()
            .iter()
            .filter(|d| d.code == DiagnosticCode::Redefinition)
            .collect();
        assert_eq!(redefinitions.len(), 2);
        assert_eq!(model.diagnostics().len(), 2);
        assert_eq!(redefinitions[0].span, Span::new(5, 6));
    }

    #[test]
    fn duplicate_labels_and_characters() {
        assert_eq!(
            codes("@label A\n@label A\n"),
            vec![DiagnosticCode::Redefinition, DiagnosticCode::Redefinition]
        );
        assert_eq!(
            codes("@character Al\n@character Al\n"),
            vec![DiagnosticCode::Redefinition, DiagnosticCode::Redefinition]
        );
    }

    #[test]
    fn undefined_names() {
        assert_eq!(codes("x = y\n"), vec![DiagnosticCode::UndefinedVariable]);
        assert_eq!(codes("greet()\n"), vec![DiagnosticCode::UndefinedFunction]);
        assert_eq!(codes("@jump Nowhere\n"), vec![DiagnosticCode::UndefinedLabel]);
        assert!(codes("@jump End\n@label End\n").is_empty());
        assert!(codes("@choice \"Leave\" End\n@label End\n").is_empty());
    }

    #[test]
    fn arity_is_checked() {
        assert_eq!(
            codes("func greet(name)\nend\ngreet()\n"),
            vec![DiagnosticCode::ArityMismatch]
        );
        assert!(codes("func greet(name)\nend\ngreet(\"Bob\")\n").is_empty());
    }

    #[test]
    fn maybe_uninitialized_without_else() {
        let source = "@var c true\nif c\n  x = 1\nendif\ny = x\n";
        assert_eq!(codes(source), vec![DiagnosticCode::MaybeUninitialized]);
    }

    #[test]
    fn assigned_on_every_branch() {
        let source = "@var c true\nif c\n  x = 1\nelif not c\n  x = 2\nelse\n  x = 3\nendif\ny = x\n";
        assert!(codes(source).is_empty());
    }

    #[test]
    fn read_before_write_warns() {
        assert_eq!(codes("y = x\nx = 1\n"), vec![DiagnosticCode::MaybeUninitialized]);
        assert_eq!(codes("@var x\ny = x\n"), vec![DiagnosticCode::MaybeUninitialized]);
        assert!(codes("@var x 3\ny = x\n").is_empty());
    }

    #[test]
    fn functions_see_outer_variables_as_assigned() {
        let source = "func f(a)\n  b = a + g\n  c = b\nend\ng = 1\nf(2)\n";
        assert!(codes(source).is_empty());
        let inner = "func f()\n  if g > 1\n    b = 1\n  endif\n  c = b\nend\ng = 1\n";
        assert_eq!(codes(inner), vec![DiagnosticCode::MaybeUninitialized]);
    }

    #[test]
    fn function_locals_are_not_global() {
        assert_eq!(
            codes("func f()\n  local = 1\nend\nx = local\n"),
            vec![DiagnosticCode::UndefinedVariable]
        );
    }

    #[test]
    fn type_mismatch() {
        assert_eq!(
            codes("x = 1\nif x == \"a\"\nendif\n"),
            vec![DiagnosticCode::TypeMismatch]
        );
        assert!(codes("x = \"a\" + \"b\"\nif x == \"ab\"\nendif\n").is_empty());
        assert!(codes("func f(p)\n  if p == 1\n  endif\nend\n").is_empty());
    }

    #[test]
    fn variable_type_from_first_typed_assignment() {
        let model = analyze("flag = not true\ncount = 2 * 3\nname = \"Al\"\n");
        let types: Vec<_> = model
            .scopes()
            .symbols()
            .map(|(_, s)| (s.name.to_string(), s.value_type))
            .collect();
        assert!(types.contains(&("flag".to_string(), ValueType::Bool)));
        assert!(types.contains(&("count".to_string(), ValueType::Number)));
        assert!(types.contains(&("name".to_string(), ValueType::String)));
    }

    #[test]
    fn directive_arguments() {
        assert_eq!(codes("@jump\n"), vec![DiagnosticCode::DirectiveArgs]);
        assert_eq!(codes("@character \"Alice\"\n"), vec![DiagnosticCode::DirectiveArgs]);
        assert_eq!(codes("@var x y z\n"), vec![DiagnosticCode::DirectiveArgs]);
        assert_eq!(codes("@choice Go End\n@label End\n"), vec![DiagnosticCode::DirectiveArgs]);
        assert!(codes("@var x -2\n@scene forest at night\n").is_empty());
    }

    #[test]
    fn unknown_directives_are_info() {
        let model = analyze("@portrait Alice happy\n");
        assert_eq!(model.diagnostics().len(), 1);
        assert_eq!(model.diagnostics()[0].code, DiagnosticCode::UnknownDirective);
        assert_eq!(model.diagnostics()[0].severity, Severity::Info);

        let quiet = AnalysisConfig {
            report_info: false,
            ..AnalysisConfig::default()
        };
        assert!(analyze_with("@portrait Alice happy\n", &quiet).diagnostics().is_empty());

        let extended = AnalysisConfig {
            extra_directives: vec!["portrait".into()],
            ..AnalysisConfig::default()
        };
        assert!(analyze_with("@portrait Alice happy\n", &extended).diagnostics().is_empty());
    }

    #[test]
    fn broken_blocks_still_bind() {
        let source = "@character A\n@var x 2\nif x > 1\nA: yes";
        let model = analyze(source);
        assert!(model.diagnostics().is_empty());
        let speaker = u32::try_from(source.rfind("A:").unwrap()).unwrap();
        assert!(model.reference_at(speaker).is_some());
    }

    #[test]
    fn scopes_follow_blocks() {
        let model = analyze("@var c true\nif c\n  x = 1\nendif\nfunc f(a)\nend\n");
        let scopes = model.scopes();
        assert_eq!(scopes.scope_count(), 3);
        let inside = scopes.scope_at(18);
        assert_eq!(scopes.scope(inside).kind(), ScopeKind::Block);
        let x = scopes.lookup(inside, SymbolKind::Variable, "x").unwrap();
        assert_eq!(scopes.symbol(x).scope, scopes.root());
    }

    #[test]
    fn references_cover_declarations_and_uses() {
        let source = "func greet(name)\n  x = name\nend\ngreet(1)\ngreet(2)\n";
        let model = analyze(source);
        let function = model.reference_at(5).unwrap().symbol;
        assert_eq!(model.references_to(function).count(), 3);
    }

    #[test]
    fn cancelled_binding_stops() {
        let parsed = parse("if a\nendif\n");
        let token = CancellationToken::new();
        token.cancel();
        assert_eq!(
            bind(parsed.cst(), &AnalysisConfig::default(), &token),
            Err(Cancelled)
        );
    }
}
