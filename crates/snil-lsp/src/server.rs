// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! LSP server implementation.
//!
//! **DDD Context:** Language Service
//!
//! Each open file is a [`Document`] with its own analysis worker. Edits are
//! forwarded as they arrive; diagnostics are published whenever the
//! document commits a snapshot. Requests read the latest snapshot, waiting
//! briefly for the pass covering the newest edit.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Deserialize;
use snil_core::config::AnalysisConfig;
use snil_core::graph::{Graph, NodeId};
use snil_core::language_service::{AnalysisSnapshot, Document, TextEdit};
use snil_core::queries::{
    completion_provider, definition_provider, document_symbols_provider, folding_provider,
    graph_provider, hover_provider, references_provider, token_provider,
};
use snil_core::source_analysis::{Position as EnginePosition, Span};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower_lsp::jsonrpc::{Error, Result};
use tower_lsp::lsp_types::{
    CompletionOptions, CompletionParams, CompletionResponse, DidChangeTextDocumentParams,
    DidCloseTextDocumentParams, DidOpenTextDocumentParams, DocumentSymbolParams,
    DocumentSymbolResponse, FoldingRange, FoldingRangeParams, FoldingRangeProviderCapability,
    GotoDefinitionParams, GotoDefinitionResponse, Hover, HoverContents, HoverParams,
    HoverProviderCapability, InitializeParams, InitializeResult, InitializedParams, Location,
    MarkupContent, MarkupKind, MessageType, OneOf, Position, ReferenceParams, SemanticTokens,
    SemanticTokensFullOptions, SemanticTokensLegend, SemanticTokensOptions, SemanticTokensParams,
    SemanticTokensResult, SemanticTokensServerCapabilities, ServerCapabilities, ServerInfo,
    TextDocumentIdentifier, TextDocumentSyncCapability, TextDocumentSyncKind, Url,
};
use tower_lsp::{Client, LanguageServer};
use tracing::{debug, error, warn};

use crate::convert;

/// Custom request returning the dialogue graph or a neighborhood of it.
pub const GRAPH_METHOD: &str = "snil/graph";

/// How long a request waits for the pass covering the newest edit before
/// answering from the last committed snapshot.
const SNAPSHOT_WAIT: Duration = Duration::from_millis(250);

const DEFAULT_GRAPH_RADIUS: usize = 2;

/// Parameters of [`GRAPH_METHOD`].
///
/// With `node` (hex identifier) or `position`, returns the neighborhood
/// within `radius` hops; otherwise the whole graph.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphParams {
    pub text_document: TextDocumentIdentifier,
    #[serde(default)]
    pub node: Option<String>,
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub radius: Option<usize>,
}

struct OpenDocument {
    document: Document,
    /// Publishes diagnostics for every committed snapshot.
    publisher: JoinHandle<()>,
}

/// LSP backend owning one [`Document`] per open file.
pub struct Backend {
    /// LSP client handle for sending notifications and responses.
    client: Client,
    /// Analysis options from `initializationOptions`, applied to documents
    /// opened afterwards.
    config: Mutex<AnalysisConfig>,
    documents: Mutex<HashMap<Url, OpenDocument>>,
}

impl Backend {
    /// Creates a new `Backend` with the given LSP client handle.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            config: Mutex::new(AnalysisConfig::default()),
            documents: Mutex::new(HashMap::new()),
        }
    }

    /// The snapshot to answer a request from: the one covering the newest
    /// edit if it commits within [`SNAPSHOT_WAIT`], else the latest one.
    async fn snapshot(&self, uri: &Url) -> Option<Arc<AnalysisSnapshot>> {
        let (mut receiver, version) = {
            let documents = self.documents.lock().expect("documents lock poisoned");
            let open = documents.get(uri)?;
            (open.document.subscribe(), open.document.version())
        };
        let waited = tokio::time::timeout(SNAPSHOT_WAIT, async {
            receiver
                .wait_for(|snapshot| snapshot.version() >= version)
                .await
                .map(|snapshot| Arc::clone(&*snapshot))
        })
        .await;
        match waited {
            Ok(Ok(snapshot)) => Some(snapshot),
            _ => {
                debug!(uri = %uri, version, "answering from a stale snapshot");
                Some(Arc::clone(&*receiver.borrow()))
            }
        }
    }

    /// Handler for [`GRAPH_METHOD`].
    pub async fn graph(&self, params: GraphParams) -> Result<Option<Graph>> {
        let Some(snapshot) = self.snapshot(&params.text_document.uri).await else {
            return Ok(None);
        };
        let radius = params.radius.unwrap_or(DEFAULT_GRAPH_RADIUS);
        let center = match (&params.node, params.position) {
            (Some(node), _) => Some(
                NodeId::parse(node)
                    .ok_or_else(|| Error::invalid_params(format!("malformed node id `{node}`")))?,
            ),
            (None, Some(position)) => engine_position(&snapshot, position)
                .and_then(|at| graph_provider::node_at(&snapshot, at))
                .map(|node| node.id),
            (None, None) => return Ok(Some(graph_provider::graph(&snapshot).clone())),
        };
        Ok(center.and_then(|id| graph_provider::neighborhood(&snapshot, id, radius)))
    }
}

fn engine_position(snapshot: &AnalysisSnapshot, position: Position) -> Option<EnginePosition> {
    let offset = convert::offset_of(snapshot.text(), position);
    snapshot.line_index().position(offset)
}

/// Reads [`AnalysisConfig`] from `initializationOptions`; malformed options
/// fall back to the defaults.
fn config_from_options(options: Option<serde_json::Value>) -> AnalysisConfig {
    match options {
        Some(options) => serde_json::from_value(options).unwrap_or_else(|error| {
            warn!(%error, "ignoring malformed initializationOptions");
            AnalysisConfig::default()
        }),
        None => AnalysisConfig::default(),
    }
}

fn capabilities() -> ServerCapabilities {
    ServerCapabilities {
        text_document_sync: Some(TextDocumentSyncCapability::Kind(
            TextDocumentSyncKind::INCREMENTAL,
        )),
        completion_provider: Some(CompletionOptions {
            trigger_characters: Some(vec!["@".into()]),
            ..Default::default()
        }),
        hover_provider: Some(HoverProviderCapability::Simple(true)),
        definition_provider: Some(OneOf::Left(true)),
        references_provider: Some(OneOf::Left(true)),
        document_symbol_provider: Some(OneOf::Left(true)),
        folding_range_provider: Some(FoldingRangeProviderCapability::Simple(true)),
        semantic_tokens_provider: Some(SemanticTokensServerCapabilities::SemanticTokensOptions(
            SemanticTokensOptions {
                legend: SemanticTokensLegend {
                    token_types: convert::TOKEN_TYPES.to_vec(),
                    token_modifiers: Vec::new(),
                },
                full: Some(SemanticTokensFullOptions::Bool(true)),
                ..Default::default()
            },
        )),
        ..Default::default()
    }
}

fn spawn_publisher(
    client: Client,
    uri: Url,
    mut snapshots: watch::Receiver<Arc<AnalysisSnapshot>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let snapshot = Arc::clone(&*snapshots.borrow_and_update());
            let diagnostics = snapshot
                .diagnostics()
                .iter()
                .map(|diagnostic| convert::to_lsp_diagnostic(diagnostic, snapshot.text()))
                .collect();
            debug!(uri = %uri, version = snapshot.version(), "publishing diagnostics");
            client.publish_diagnostics(uri.clone(), diagnostics, None).await;
            // The worker dropped its sender: the document was closed.
            if snapshots.changed().await.is_err() {
                break;
            }
        }
    })
}

/// Stops publishing and shuts the document's worker down off the async
/// runtime, since joining the worker thread blocks.
fn close(open: OpenDocument) {
    open.publisher.abort();
    let document = open.document;
    tokio::task::spawn_blocking(move || drop(document));
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    /// Reports server capabilities to the client during handshake.
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let config = config_from_options(params.initialization_options);
        debug!(?config, "analysis configuration");
        *self.config.lock().expect("config lock poisoned") = config;
        Ok(InitializeResult {
            capabilities: capabilities(),
            server_info: Some(ServerInfo {
                name: "snil-lsp".into(),
                version: Some(env!("CARGO_PKG_VERSION").into()),
            }),
        })
    }

    /// Called after the client acknowledges initialization.
    async fn initialized(&self, _: InitializedParams) {
        debug!("snil-lsp initialized");
        self.client
            .log_message(MessageType::INFO, "SNIL language server ready")
            .await;
    }

    /// Handles a graceful shutdown request from the client.
    async fn shutdown(&self) -> Result<()> {
        let documents: Vec<_> = self
            .documents
            .lock()
            .expect("documents lock poisoned")
            .drain()
            .collect();
        for (_, open) in documents {
            close(open);
        }
        Ok(())
    }

    /// Starts analysis of a newly opened document.
    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        let config = self.config.lock().expect("config lock poisoned").clone();
        let document = match Document::open(params.text_document.text, config) {
            Ok(document) => document,
            Err(error) => {
                error!(uri = %uri, %error, "failed to start analysis worker");
                return;
            }
        };
        let publisher = spawn_publisher(self.client.clone(), uri.clone(), document.subscribe());
        let previous = self
            .documents
            .lock()
            .expect("documents lock poisoned")
            .insert(uri, OpenDocument { document, publisher });
        if let Some(previous) = previous {
            close(previous);
        }
    }

    /// Forwards each content change to the document as an edit.
    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let mut documents = self.documents.lock().expect("documents lock poisoned");
        let Some(open) = documents.get_mut(&uri) else {
            warn!(uri = %uri, "change for a document that is not open");
            return;
        };
        for change in params.content_changes {
            let result = match change.range {
                Some(range) => {
                    let span = convert::range_to_span(range, open.document.text());
                    open.document.apply_edit(&TextEdit::new(span, change.text))
                }
                None => open.document.replace_text(change.text),
            };
            if let Err(error) = result {
                error!(uri = %uri, %error, "rejected edit, document is out of sync");
                break;
            }
        }
    }

    /// Drops a closed document and clears its diagnostics.
    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        let removed = self
            .documents
            .lock()
            .expect("documents lock poisoned")
            .remove(&uri);
        if let Some(open) = removed {
            close(open);
        }
        self.client.publish_diagnostics(uri, Vec::new(), None).await;
    }

    /// Returns completion items for the cursor position.
    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let position = params.text_document_position;
        let Some(snapshot) = self.snapshot(&position.text_document.uri).await else {
            return Ok(None);
        };
        let Some(at) = engine_position(&snapshot, position.position) else {
            return Ok(None);
        };
        let items =
            convert::completion_items(completion_provider::compute_completions(&snapshot, at));
        if items.is_empty() {
            Ok(None)
        } else {
            Ok(Some(CompletionResponse::Array(items)))
        }
    }

    /// Returns the signature of the symbol at the cursor.
    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let position = params.text_document_position_params;
        let Some(snapshot) = self.snapshot(&position.text_document.uri).await else {
            return Ok(None);
        };
        let hover = engine_position(&snapshot, position.position)
            .and_then(|at| hover_provider::hover_at(&snapshot, at));
        Ok(hover.map(|hover| Hover {
            contents: HoverContents::Markup(MarkupContent {
                kind: MarkupKind::Markdown,
                value: format!("```snil\n{}\n```", hover.contents),
            }),
            range: Some(convert::span_to_range(hover.span, snapshot.text())),
        }))
    }

    /// Navigates to the declaration of the symbol at the cursor.
    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let position = params.text_document_position_params;
        let uri = position.text_document.uri;
        let Some(snapshot) = self.snapshot(&uri).await else {
            return Ok(None);
        };
        let definition = engine_position(&snapshot, position.position)
            .and_then(|at| definition_provider::definition_at(&snapshot, at));
        Ok(definition.map(|span| {
            GotoDefinitionResponse::Scalar(Location {
                uri,
                range: convert::span_to_range(span, snapshot.text()),
            })
        }))
    }

    /// Finds all uses of the symbol at the cursor.
    async fn references(&self, params: ReferenceParams) -> Result<Option<Vec<Location>>> {
        let position = params.text_document_position;
        let uri = position.text_document.uri;
        let Some(snapshot) = self.snapshot(&uri).await else {
            return Ok(None);
        };
        let Some(at) = engine_position(&snapshot, position.position) else {
            return Ok(None);
        };
        let locations: Vec<Location> = references_provider::references_at(
            &snapshot,
            at,
            params.context.include_declaration,
        )
        .into_iter()
        .map(|span| Location {
            uri: uri.clone(),
            range: convert::span_to_range(span, snapshot.text()),
        })
        .collect();
        if locations.is_empty() {
            Ok(None)
        } else {
            Ok(Some(locations))
        }
    }

    /// Returns the outline: labels, functions, characters and variables.
    async fn document_symbol(
        &self,
        params: DocumentSymbolParams,
    ) -> Result<Option<DocumentSymbolResponse>> {
        let Some(snapshot) = self.snapshot(&params.text_document.uri).await else {
            return Ok(None);
        };
        let symbols: Vec<_> = document_symbols_provider::document_symbols(&snapshot)
            .into_iter()
            .map(|symbol| convert::to_lsp_symbol(symbol, snapshot.text()))
            .collect();
        if symbols.is_empty() {
            Ok(None)
        } else {
            Ok(Some(DocumentSymbolResponse::Nested(symbols)))
        }
    }

    async fn folding_range(&self, params: FoldingRangeParams) -> Result<Option<Vec<FoldingRange>>> {
        let Some(snapshot) = self.snapshot(&params.text_document.uri).await else {
            return Ok(None);
        };
        Ok(Some(
            folding_provider::folding_ranges(&snapshot)
                .into_iter()
                .map(convert::to_lsp_folding_range)
                .collect(),
        ))
    }

    async fn semantic_tokens_full(
        &self,
        params: SemanticTokensParams,
    ) -> Result<Option<SemanticTokensResult>> {
        let Some(snapshot) = self.snapshot(&params.text_document.uri).await else {
            return Ok(None);
        };
        let whole = Span::new(0, snapshot.cst().len());
        let highlights = token_provider::highlights(&snapshot, whole);
        Ok(Some(SemanticTokensResult::Tokens(SemanticTokens {
            result_id: None,
            data: convert::semantic_tokens(&highlights, snapshot.text()),
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snil_core::language_service::analyze;

    #[test]
    fn config_comes_from_initialization_options() {
        let config = config_from_options(Some(serde_json::json!({
            "maxNestingDepth": 8,
            "extraDirectives": ["shake"],
        })));
        assert_eq!(config.max_nesting_depth, 8);
        assert!(config.report_info);
        assert!(config.is_known_directive("shake"));

        assert_eq!(config_from_options(None), AnalysisConfig::default());
        assert_eq!(
            config_from_options(Some(serde_json::json!({ "maxNestingDepth": "deep" }))),
            AnalysisConfig::default()
        );
    }

    #[test]
    fn capabilities_advertise_incremental_sync() {
        let capabilities = capabilities();
        assert_eq!(
            capabilities.text_document_sync,
            Some(TextDocumentSyncCapability::Kind(
                TextDocumentSyncKind::INCREMENTAL
            ))
        );
        assert!(capabilities.folding_range_provider.is_some());
        assert!(capabilities.semantic_tokens_provider.is_some());
    }

    #[test]
    fn lsp_positions_map_to_engine_positions() {
        let snapshot = analyze("@character Zoë\nZoë: hi\n");
        // `ë` is one UTF-16 unit but two bytes.
        assert_eq!(
            engine_position(&snapshot, Position::new(1, 3)),
            Some(EnginePosition::new(1, 4))
        );
    }

    #[test]
    fn graph_params_accept_a_node_or_a_position() {
        let params: GraphParams = serde_json::from_value(serde_json::json!({
            "textDocument": { "uri": "file:///tmp/a.snil" },
            "node": "00000000000000ff",
            "radius": 1,
        }))
        .unwrap();
        assert_eq!(params.node.as_deref().and_then(NodeId::parse), Some(NodeId(255)));
        assert_eq!(params.radius, Some(1));
        assert!(params.position.is_none());
    }
}
