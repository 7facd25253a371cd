// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Per-item graph extraction.
//!
//! A [`Fragment`] describes the nodes of one top-level item and the flow
//! between them. Flow that leaves the item, or depends on names defined
//! elsewhere, stays symbolic:
//!
//! - `entry`: where flow arriving from the previous item goes;
//! - `exits`: flow leaving the item towards the next one;
//! - jump targets by label name, call sites by callee span, and function
//!   definitions.
//!
//! Spans are relative to the item start, so a fragment depends only on the
//! item's text and can be reused wherever the item moves.

use ecow::EcoString;
use rowan::{NodeOrToken, WalkEvent};

use super::{GraphEdgeKind, GraphNodeKind};
use crate::cst::{
    GreenElement, SyntaxElementExt, SyntaxKind, SyntaxNode, SyntaxNodeExt, SyntaxTokenExt,
};
use crate::semantic_analysis::{directive_syntax, function_header};
use crate::source_analysis::{Keyword, Span, TokenKind};

/// A node of a fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FragmentNode {
    pub(crate) kind: GraphNodeKind,
    pub(crate) label: EcoString,
    pub(crate) span: Span,
    pub(crate) function: Option<EcoString>,
    pub(crate) name: Option<EcoString>,
    pub(crate) name_span: Option<Span>,
}

/// Where an edge leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Target {
    /// A node of the same fragment.
    Node(usize),
    /// The label with this name, wherever it is. `span` is the label name
    /// at the jump site.
    Jump { label: EcoString, span: Span },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FragmentEdge {
    pub(crate) from: usize,
    pub(crate) to: Target,
    pub(crate) kind: GraphEdgeKind,
}

/// A function defined in the fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FunctionFlow {
    pub(crate) name: EcoString,
    pub(crate) entry: usize,
    /// The node flow reaches when the body finishes, if any flow does.
    pub(crate) end: Option<usize>,
}

/// The graph contribution of one top-level item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Fragment {
    pub(crate) nodes: Vec<FragmentNode>,
    pub(crate) edges: Vec<FragmentEdge>,
    /// Where incoming flow goes; `None` lets it pass through.
    pub(crate) entry: Option<Target>,
    pub(crate) exits: Vec<(usize, GraphEdgeKind)>,
    /// Call nodes; the callee is resolved from the node's `name_span`.
    pub(crate) calls: Vec<usize>,
    pub(crate) functions: Vec<FunctionFlow>,
    pub(crate) labels: Vec<(EcoString, usize)>,
}

/// Where a pending edge starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    /// Flow arriving from before the item.
    Incoming,
    Node(usize),
}

/// Flow waiting for its next node.
type Pending = Vec<(Source, GraphEdgeKind)>;

/// Extracts the fragment of one top-level item.
pub(crate) fn extract(item: &GreenElement) -> Fragment {
    let NodeOrToken::Node(green) = item else {
        return Fragment::default();
    };
    let mut extractor = Extractor::default();
    let exits = extractor.statement(
        &SyntaxNode::new_root(green.clone()),
        vec![(Source::Incoming, GraphEdgeKind::Sequential)],
    );
    extractor.fragment.exits = exits
        .into_iter()
        .filter_map(|(source, kind)| match source {
            Source::Node(node) => Some((node, kind)),
            Source::Incoming => None,
        })
        .collect();
    extractor.fragment
}

/// The first line of `node` without layout or comments, and its text.
fn first_line(node: &SyntaxNode) -> (Span, EcoString) {
    let mut span: Option<Span> = None;
    for child in node.children_with_tokens() {
        match child.kind() {
            SyntaxKind::Newline | SyntaxKind::Block => break,
            SyntaxKind::Whitespace | SyntaxKind::Comment => continue,
            _ => {}
        }
        span = Some(span.map_or(child.span(), |s| s.merge(child.span())));
    }
    let base = node.span().start();
    let span = span.unwrap_or_else(|| Span::empty(base));
    let text = node.text().to_string();
    let label = text
        .get((span.start() - base) as usize..(span.end() - base) as usize)
        .unwrap_or_default()
        .trim_end();
    (span, label.into())
}

/// `FunctionCall` nodes in and below `node`, arguments before their call.
/// Calls inside error nodes are skipped.
fn calls_in(node: &SyntaxNode) -> Vec<SyntaxNode> {
    let mut calls = Vec::new();
    let mut walk = node.preorder();
    while let Some(event) = walk.next() {
        match event {
            WalkEvent::Enter(inner) if inner.kind() == SyntaxKind::ErrorNode => walk.skip_subtree(),
            WalkEvent::Leave(inner) if inner.kind() == SyntaxKind::FunctionCall => calls.push(inner),
            _ => {}
        }
    }
    calls
}

#[derive(Default)]
struct Extractor {
    fragment: Fragment,
    /// Name of the function being extracted.
    function: Option<EcoString>,
}

impl Extractor {
    fn add(&mut self, kind: GraphNodeKind, label: EcoString, span: Span) -> usize {
        self.fragment.nodes.push(FragmentNode {
            kind,
            label,
            span,
            function: self.function.clone(),
            name: None,
            name_span: None,
        });
        self.fragment.nodes.len() - 1
    }

    fn add_named(
        &mut self,
        kind: GraphNodeKind,
        label: EcoString,
        span: Span,
        name: EcoString,
        name_span: Span,
    ) -> usize {
        let index = self.add(kind, label, span);
        let node = &mut self.fragment.nodes[index];
        node.name = Some(name);
        node.name_span = Some(name_span);
        index
    }

    /// Sends all pending flow to `target`.
    fn connect(&mut self, pending: Pending, target: &Target) {
        for (source, kind) in pending {
            let kind = match target {
                Target::Jump { .. } => kind.through_jump(),
                Target::Node(_) => kind,
            };
            match source {
                Source::Incoming => self.fragment.entry = Some(target.clone()),
                Source::Node(from) => self.fragment.edges.push(FragmentEdge {
                    from,
                    to: target.clone(),
                    kind,
                }),
            }
        }
    }

    /// A node that continues the flow sequentially.
    fn step(&mut self, index: usize, pending: Pending) -> Pending {
        self.connect(pending, &Target::Node(index));
        vec![(Source::Node(index), GraphEdgeKind::Sequential)]
    }

    fn statements(&mut self, container: &SyntaxNode, mut pending: Pending) -> Pending {
        for child in container.children() {
            pending = self.statement(&child, pending);
        }
        pending
    }

    fn statement(&mut self, node: &SyntaxNode, pending: Pending) -> Pending {
        match node.kind() {
            SyntaxKind::DialogueLine => {
                let (span, label) = first_line(node);
                let mut tokens = node.significant_tokens();
                let speaker = match (tokens.next(), tokens.next()) {
                    (Some(name), Some(colon)) if colon.kind() == SyntaxKind::Colon => {
                        name.identifier().map(|speaker| (speaker, name.span()))
                    }
                    _ => None,
                };
                let index = match speaker {
                    Some((speaker, speaker_span)) => self.add_named(
                        GraphNodeKind::Dialogue,
                        label,
                        span,
                        speaker,
                        speaker_span,
                    ),
                    None => self.add(GraphNodeKind::Dialogue, label, span),
                };
                self.step(index, pending)
            }
            SyntaxKind::Directive => self.directive(node, pending),
            SyntaxKind::FunctionCall | SyntaxKind::Assignment => self.calls(node, pending),
            SyntaxKind::ConditionalBlock => self.conditional(node, pending),
            SyntaxKind::FunctionDef => {
                self.function(node);
                pending
            }
            SyntaxKind::ErrorNode => {
                let inner: Vec<_> = node
                    .children()
                    .filter(|child| child.kind().is_statement() && child.kind() != SyntaxKind::ErrorNode)
                    .collect();
                if inner.is_empty() {
                    // Degenerate member: no edges, flow passes around it.
                    let (span, label) = first_line(node);
                    self.add(GraphNodeKind::Error, label, span);
                    return pending;
                }
                inner
                    .iter()
                    .fold(pending, |pending, statement| self.statement(statement, pending))
            }
            _ => pending,
        }
    }

    /// One `Call` node per call in `node`, in evaluation order.
    fn calls(&mut self, node: &SyntaxNode, mut pending: Pending) -> Pending {
        for call in calls_in(node) {
            let Some(callee) = call.significant_tokens().next() else {
                continue;
            };
            let Some(name) = callee.identifier() else {
                continue;
            };
            let (span, label) = first_line(&call);
            let index = self.add_named(GraphNodeKind::Call, label, span, name, callee.span());
            self.fragment.calls.push(index);
            pending = self.step(index, pending);
        }
        pending
    }

    fn directive(&mut self, node: &SyntaxNode, pending: Pending) -> Pending {
        let Some(directive) = directive_syntax(node) else {
            return pending;
        };
        match (directive.name.as_str(), directive.args.as_slice()) {
            ("label", [name]) => {
                let Some(label) = name.identifier() else {
                    return pending;
                };
                let index = self.add_named(
                    GraphNodeKind::Label,
                    label.clone(),
                    directive.name_span.merge(name.span()),
                    label.clone(),
                    name.span(),
                );
                self.fragment.labels.push((label, index));
                self.step(index, pending)
            }
            ("jump", [name]) => match name.identifier() {
                Some(label) => {
                    let target = Target::Jump {
                        label,
                        span: name.span(),
                    };
                    self.connect(pending, &target);
                    Vec::new()
                }
                None => pending,
            },
            ("choice", [text, name]) => {
                let (TokenKind::String(text), Some(label)) = (text.token_kind(), name.identifier()) else {
                    return pending;
                };
                let index = self.add_named(
                    GraphNodeKind::Choice,
                    text,
                    directive.name_span.merge(name.span()),
                    label.clone(),
                    name.span(),
                );
                self.fragment.edges.push(FragmentEdge {
                    from: index,
                    to: Target::Jump {
                        label,
                        span: name.span(),
                    },
                    kind: GraphEdgeKind::Jump,
                });
                self.step(index, pending)
            }
            _ => pending,
        }
    }

    /// Each `if`/`elif` test gets one true and one false edge. False edges
    /// chain to the next test, the `else` body or past the block; all
    /// branch ends converge after it. Calls in a condition run before its
    /// test.
    fn conditional(&mut self, node: &SyntaxNode, pending: Pending) -> Pending {
        let mut falling = pending;
        let mut converging = Vec::new();
        for branch in node.children().filter(|n| n.kind() == SyntaxKind::Branch) {
            let body = branch.child_of_kind(SyntaxKind::Block);
            let is_else = branch
                .significant_tokens()
                .next()
                .is_some_and(|token| token.is_keyword(Keyword::Else));
            if is_else {
                let flow = std::mem::take(&mut falling);
                converging.extend(self.body(body.as_ref(), flow));
                continue;
            }
            let mut flow = std::mem::take(&mut falling);
            for condition in branch.children().filter(|n| n.kind() != SyntaxKind::Block) {
                flow = self.calls(&condition, flow);
            }
            let (span, label) = first_line(&branch);
            let test = self.add(GraphNodeKind::ConditionalBranch, label, span);
            self.connect(flow, &Target::Node(test));
            converging.extend(self.body(
                body.as_ref(),
                vec![(Source::Node(test), GraphEdgeKind::ConditionalTrue)],
            ));
            falling = vec![(Source::Node(test), GraphEdgeKind::ConditionalFalse)];
        }
        converging.extend(falling);
        converging
    }

    fn body(&mut self, body: Option<&SyntaxNode>, pending: Pending) -> Pending {
        match body {
            Some(body) => self.statements(body, pending),
            None => pending,
        }
    }

    fn function(&mut self, node: &SyntaxNode) {
        let Some(header) = function_header(node) else {
            return;
        };
        let (span, label) = first_line(node);
        let entry = self.add_named(
            GraphNodeKind::FunctionEntry,
            label,
            span,
            header.name.clone(),
            header.name_span,
        );

        let outer = self.function.replace(header.name.clone());
        let exits = self.body(
            node.child_of_kind(SyntaxKind::Block).as_ref(),
            vec![(Source::Node(entry), GraphEdgeKind::Sequential)],
        );
        let end = if exits.is_empty() {
            None
        } else {
            let end_span = node
                .significant_tokens()
                .last()
                .filter(|token| token.is_keyword(Keyword::End))
                .map_or_else(|| Span::empty(node.span().end()), |token| token.span());
            let end = self.add(GraphNodeKind::End, format!("end {}", header.name).into(), end_span);
            self.connect(exits, &Target::Node(end));
            Some(end)
        };
        self.function = outer;

        self.fragment.functions.push(FunctionFlow {
            name: header.name,
            entry,
            end,
        });
    }
}
