// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! `snil check`: report diagnostics for one script.
//!
//! Text output renders every diagnostic with miette on stderr, followed by a
//! summary line. JSON output prints one object per diagnostic on stdout.
//! The command fails when the script has at least one error.

use camino::Utf8Path;
use miette::Result;
use snil_core::config::AnalysisConfig;
use snil_core::language_service::{AnalysisSnapshot, analyze_with_config};
use snil_core::queries::diagnostic_provider;
use snil_core::source_analysis::Diagnostic;
use tracing::{debug, instrument};

use super::{OutputFormat, read_script};
use crate::diagnostic::CheckDiagnostic;

/// Check the script at `path`.
#[instrument(skip(config))]
pub fn run_check(path: &Utf8Path, config: AnalysisConfig, format: OutputFormat) -> Result<()> {
    let source = read_script(path)?;
    let snapshot = analyze_with_config(&source, config);
    let (errors, warnings, infos) = diagnostic_provider::severity_counts(&snapshot);
    debug!(errors, warnings, infos, "analysis finished");

    match format {
        OutputFormat::Text => {
            for diagnostic in diagnostic_provider::diagnostics(&snapshot) {
                let report = CheckDiagnostic::from_core_diagnostic(diagnostic, path.as_str(), &source);
                eprintln!("{:?}", miette::Report::new(report));
            }
            eprintln!("{}", summary(path, errors, warnings, infos));
        }
        OutputFormat::Json => {
            for line in json_lines(path, &snapshot) {
                println!("{line}");
            }
        }
    }

    if errors > 0 {
        let plural = if errors == 1 { "" } else { "s" };
        miette::bail!("{errors} error{plural} found in '{path}'");
    }
    Ok(())
}

fn summary(path: &Utf8Path, errors: usize, warnings: usize, infos: usize) -> String {
    let count = |n: usize, noun: &str| {
        if n == 1 {
            format!("1 {noun}")
        } else {
            format!("{n} {noun}s")
        }
    };
    format!(
        "{path}: {}, {}, {}",
        count(errors, "error"),
        count(warnings, "warning"),
        count(infos, "info")
    )
}

/// One JSON object per diagnostic, in positional order. Lines and columns
/// are 1-based; `start`/`end` are byte offsets.
fn json_lines(path: &Utf8Path, snapshot: &AnalysisSnapshot) -> Vec<serde_json::Value> {
    diagnostic_provider::diagnostics(snapshot)
        .iter()
        .map(|diagnostic| json_line(path, snapshot, diagnostic))
        .collect()
}

fn json_line(path: &Utf8Path, snapshot: &AnalysisSnapshot, diagnostic: &Diagnostic) -> serde_json::Value {
    let position = snapshot
        .line_index()
        .position(diagnostic.span.start())
        .unwrap_or_default();
    serde_json::json!({
        "file": path.as_str(),
        "code": diagnostic.code.as_str(),
        "severity": diagnostic.severity.to_string(),
        "message": diagnostic.message.as_str(),
        "line": position.line + 1,
        "column": position.column + 1,
        "start": diagnostic.span.start(),
        "end": diagnostic.span.end(),
        "hint": diagnostic.hint.as_deref(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::write_temp_script;
    use snil_core::language_service::analyze;

    #[test]
    fn clean_script_passes() {
        let (_dir, path) = write_temp_script("@character Alice\nAlice: Hello!\n");
        assert!(run_check(&path, AnalysisConfig::default(), OutputFormat::Text).is_ok());
        assert!(run_check(&path, AnalysisConfig::default(), OutputFormat::Json).is_ok());
    }

    #[test]
    fn errors_fail_the_check() {
        let (_dir, path) = write_temp_script("Bob: Hi!\nAl: Yo\n");
        let error = run_check(&path, AnalysisConfig::default(), OutputFormat::Text).unwrap_err();
        assert!(error.to_string().starts_with("2 errors found in"));
    }

    #[test]
    fn warnings_alone_pass() {
        let (_dir, path) = write_temp_script("@var flag true\nif flag\n  x = 1\nendif\ny = x\n@shake\n");
        let snapshot = analyze(&std::fs::read_to_string(&path).unwrap());
        let (errors, warnings, _) = diagnostic_provider::severity_counts(&snapshot);
        assert_eq!(errors, 0);
        assert_eq!(warnings, 1);
        assert!(run_check(&path, AnalysisConfig::default(), OutputFormat::Text).is_ok());
    }

    #[test]
    fn json_lines_are_positional_and_one_based() {
        let path = Utf8Path::new("scene.snil");
        let snapshot = analyze("@character A\nA: hi\nBob: yo\n");
        let lines = json_lines(path, &snapshot);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["code"], "E-UNDEF-CHAR");
        assert_eq!(lines[0]["severity"], "error");
        assert_eq!(lines[0]["line"], 3);
        assert_eq!(lines[0]["column"], 1);
        assert_eq!(lines[0]["start"], 19);
        assert_eq!(lines[0]["end"], 22);
    }

    #[test]
    fn summary_pluralizes() {
        let path = Utf8Path::new("a.snil");
        assert_eq!(summary(path, 1, 0, 2), "a.snil: 1 error, 0 warnings, 2 infos");
    }
}
