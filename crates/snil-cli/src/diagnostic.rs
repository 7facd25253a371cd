// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Diagnostics rendered with miette.
//!
//! Wraps `snil-core` diagnostics so miette can show them with source
//! context, an arrow at the span, the stable diagnostic code and the fix
//! hint when there is one.

use std::fmt;

use miette::{LabeledSpan, NamedSource, SourceCode, SourceSpan};
use snil_core::source_analysis::{Diagnostic as CoreDiagnostic, DiagnosticCode, Severity};

/// One `snil check` finding with its source file.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct CheckDiagnostic {
    pub severity: Severity,
    pub code: DiagnosticCode,
    pub message: String,
    pub hint: Option<String>,
    /// Source code for context.
    pub src: NamedSource<String>,
    /// Location of the finding.
    pub span: SourceSpan,
}

impl CheckDiagnostic {
    /// Create a new diagnostic from a `snil-core` diagnostic.
    pub fn from_core_diagnostic(diagnostic: &CoreDiagnostic, source_path: &str, source: &str) -> Self {
        Self {
            severity: diagnostic.severity,
            code: diagnostic.code,
            message: diagnostic.message.to_string(),
            hint: diagnostic.hint.as_ref().map(ToString::to_string),
            src: NamedSource::new(source_path, source.to_string()),
            span: diagnostic.span.into(),
        }
    }

    fn label(&self) -> &'static str {
        match self.severity {
            Severity::Error => "error here",
            Severity::Warning => "warning here",
            Severity::Info => "note",
        }
    }
}

impl miette::Diagnostic for CheckDiagnostic {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(self.code))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(match self.severity {
            Severity::Error => miette::Severity::Error,
            Severity::Warning => miette::Severity::Warning,
            Severity::Info => miette::Severity::Advice,
        })
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.hint
            .as_ref()
            .map(|hint| Box::new(hint) as Box<dyn fmt::Display + 'a>)
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        Some(&self.src)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        Some(Box::new(std::iter::once(LabeledSpan::new_with_span(
            Some(self.label().to_string()),
            self.span,
        ))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use miette::Diagnostic as _;
    use snil_core::source_analysis::Span;

    #[test]
    fn from_core_diagnostic_error() {
        let core = CoreDiagnostic::new(
            DiagnosticCode::UndefinedCharacter,
            "character `Bob` is not declared",
            Span::new(0, 3),
        )
        .with_hint("declare it with `@character Bob`");
        let diagnostic = CheckDiagnostic::from_core_diagnostic(&core, "intro.snil", "Bob: Hi!\n");

        assert_eq!(diagnostic.severity, Severity::Error);
        assert_eq!(diagnostic.span.offset(), 0);
        assert_eq!(diagnostic.span.len(), 3);
        assert_eq!(diagnostic.code().unwrap().to_string(), "E-UNDEF-CHAR");
        assert_eq!(
            diagnostic.help().unwrap().to_string(),
            "declare it with `@character Bob`"
        );
        assert_eq!(diagnostic.severity(), Some(miette::Severity::Error));
    }

    #[test]
    fn warnings_and_infos_keep_their_severity() {
        let warning = CoreDiagnostic::new(
            DiagnosticCode::MaybeUninitialized,
            "`x` may be used before it is assigned",
            Span::new(4, 5),
        );
        let diagnostic = CheckDiagnostic::from_core_diagnostic(&warning, "a.snil", "y = x\n");
        assert_eq!(diagnostic.severity(), Some(miette::Severity::Warning));
        assert_eq!(diagnostic.label(), "warning here");
        assert!(diagnostic.help().is_none());

        let info = CoreDiagnostic::new(DiagnosticCode::UnknownDirective, "unknown", Span::new(0, 0));
        let diagnostic = CheckDiagnostic::from_core_diagnostic(&info, "a.snil", "");
        assert_eq!(diagnostic.severity(), Some(miette::Severity::Advice));
        assert_eq!(diagnostic.span.len(), 0);
    }
}
