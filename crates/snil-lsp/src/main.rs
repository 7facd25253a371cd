// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! SNIL Language Server Protocol server.
//!
//! **DDD Context:** Language Service
//!
//! This binary exposes the `snil-core` document controller and queries over
//! the Language Server Protocol using `tower-lsp`.

/// LSP <-> engine type conversions.
mod convert;
/// LSP server backend implementation.
mod server;

use clap::{ArgAction, Parser};
use tower_lsp::{LspService, Server};
use tracing_subscriber::{self, EnvFilter};

/// Entry point for the SNIL language server.
///
/// Initialises tracing, creates the LSP service, and serves over stdin/stdout.
#[derive(Debug, Parser)]
#[command(name = "snil-lsp", about = "SNIL Language Server")]
struct Cli {
    /// Increase logging verbosity (-v: debug, -vv+: trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let default_directive = directive_for_verbosity(cli.verbose);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive)),
        )
        // stdout carries the protocol; logs go to stderr as plain text.
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::build(server::Backend::new)
        .custom_method(server::GRAPH_METHOD, server::Backend::graph)
        .finish();
    Server::new(stdin, stdout, socket).serve(service).await;
}

fn directive_for_verbosity(v: u8) -> &'static str {
    // Targets are module paths, so `snil_core` and `snil_lsp` are listed
    // separately.
    match v {
        0 => "snil_lsp=info,snil_core=info,tower_lsp=warn",
        1 => "snil_lsp=debug,snil_core=debug,tower_lsp=info",
        _ => "snil_lsp=trace,snil_core=trace,tower_lsp=debug",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_defaults() {
        assert_eq!(
            directive_for_verbosity(0),
            "snil_lsp=info,snil_core=info,tower_lsp=warn"
        );
        assert_eq!(
            directive_for_verbosity(1),
            "snil_lsp=debug,snil_core=debug,tower_lsp=info"
        );
        assert_eq!(
            directive_for_verbosity(7),
            "snil_lsp=trace,snil_core=trace,tower_lsp=debug"
        );
    }

    #[test]
    fn verbosity_flag_counts() {
        let cli = Cli::parse_from(["snil-lsp", "-vv"]);
        assert_eq!(cli.verbose, 2);
    }
}
