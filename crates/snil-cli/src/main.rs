// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! SNIL command-line interface.
//!
//! This is the main entry point for the `snil` command.

use camino::Utf8PathBuf;
use clap::{ArgAction, Parser, Subcommand};
use miette::Result;
use tracing_subscriber::EnvFilter;

mod commands;
mod diagnostic;

use commands::{AnalysisArgs, OutputFormat};

/// SNIL: check and inspect dialogue scripts
#[derive(Debug, Parser)]
#[command(name = "snil")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v: debug, -vv+: trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Report diagnostics for a script; fails if it has errors
    Check {
        /// Script to check
        path: Utf8PathBuf,

        /// Output format: text or json
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        #[command(flatten)]
        analysis: AnalysisArgs,
    },

    /// Print the dialogue graph of a script
    Graph {
        /// Script to read
        path: Utf8PathBuf,

        /// Output format: text or json
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Only print the nodes near this node (hex identifier)
        #[arg(long)]
        node: Option<String>,

        /// Hops around `--node` to include
        #[arg(long, default_value_t = 2, requires = "node")]
        radius: usize,

        #[command(flatten)]
        analysis: AnalysisArgs,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Command::Check {
            path,
            format,
            analysis,
        } => commands::check::run_check(&path, analysis.config(), format),
        Command::Graph {
            path,
            format,
            node,
            radius,
            analysis,
        } => {
            let focus = node.map(|node| commands::graph::Focus { node, radius });
            commands::graph::run_graph(&path, analysis.config(), format, focus)
        }
    };

    // Exit with appropriate code
    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("{e:?}");
            std::process::exit(1);
        }
    }
}

/// Logs go to stderr so JSON on stdout stays parseable.
fn init_logging(verbose: u8) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(directive_for_verbosity(verbose))),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn directive_for_verbosity(v: u8) -> &'static str {
    match v {
        0 => "snil=warn,snil_core=warn",
        1 => "snil=debug,snil_core=debug",
        _ => "snil=trace,snil_core=trace",
    }
}
