// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Subcommand implementations and the options they share.

pub mod check;
pub mod graph;

use camino::Utf8Path;
use clap::Args;
use miette::{IntoDiagnostic, Result, WrapErr};
use snil_core::config::AnalysisConfig;

/// Output format for `check` and `graph`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text output (default).
    #[default]
    Text,
    /// Machine-readable JSON.
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "unknown format '{other}': expected 'text' or 'json'"
            )),
        }
    }
}

/// Analysis options shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct AnalysisArgs {
    /// Maximum block and expression nesting before the parser gives up on a
    /// construct
    #[arg(long, value_name = "DEPTH")]
    pub max_nesting_depth: Option<usize>,

    /// Do not report info diagnostics such as unknown directives
    #[arg(long)]
    pub no_info: bool,

    /// Treat `@NAME` as a known directive (repeatable)
    #[arg(long = "directive", value_name = "NAME")]
    pub directives: Vec<String>,
}

impl AnalysisArgs {
    pub fn config(&self) -> AnalysisConfig {
        let defaults = AnalysisConfig::default();
        AnalysisConfig {
            max_nesting_depth: self.max_nesting_depth.unwrap_or(defaults.max_nesting_depth),
            report_info: !self.no_info,
            extra_directives: self
                .directives
                .iter()
                .map(|name| name.trim_start_matches('@').into())
                .collect(),
        }
    }
}

/// Reads one script. Directories are rejected; there is no traversal.
pub fn read_script(path: &Utf8Path) -> Result<String> {
    if path.is_dir() {
        miette::bail!("'{path}' is a directory; pass a single .snil file");
    }
    std::fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to read '{path}'"))
}


#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    #[test]
    fn output_format_parses() {
        assert_eq!("json".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn analysis_args_map_to_config() {
        let args = AnalysisArgs {
            max_nesting_depth: Some(4),
            no_info: true,
            directives: vec!["@shake".into(), "flash".into()],
        };
        let config = args.config();
        assert_eq!(config.max_nesting_depth, 4);
        assert!(!config.report_info);
        assert!(config.is_known_directive("shake"));
        assert!(config.is_known_directive("flash"));
    }

    #[test]
    fn directories_and_missing_files_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let dir_path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        assert!(read_script(&dir_path).is_err());
        assert!(read_script(&dir_path.join("missing.snil")).is_err());

        let (_dir, path) = test_support::write_temp_script("A: hi\n");
        assert_eq!(read_script(&path).unwrap(), "A: hi\n");
    }
}
