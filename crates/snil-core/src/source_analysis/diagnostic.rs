// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! User-facing diagnostics.
//!
//! **DDD Context:** Source Analysis (shared with Semantic Analysis)
//!
//! Every diagnostic carries a stable [`DiagnosticCode`]; the severity is a
//! property of the code. Parse diagnostics are stored per top-level item
//! with item-relative spans (see [`Diagnostic::relative_to`]) so that items
//! reused by an incremental pass keep their diagnostics.

use std::cmp::Ordering;

use ecow::EcoString;

use super::Span;

/// Diagnostic severity level, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The script is wrong.
    Error,
    /// The script is suspicious.
    Warning,
    /// Informational note (unknown directive, ...).
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        })
    }
}

/// Stable diagnostic codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticCode {
    // === Parser ===
    UnknownChar,
    UnterminatedString,
    UnexpectedToken,
    ExpectedToken,
    ExpectedExpression,
    MissingCondition,
    UnbalancedBlock,
    UnmatchedEndif,
    UnmatchedElse,
    UnmatchedEnd,
    NestingTooDeep,
    // === Binder ===
    UndefinedCharacter,
    UndefinedVariable,
    UndefinedFunction,
    UndefinedLabel,
    Redefinition,
    ArityMismatch,
    DirectiveArgs,
    MaybeUninitialized,
    TypeMismatch,
    UnknownDirective,
}

impl DiagnosticCode {
    /// The code as it appears in output: `E-UNDEF-CHAR`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnknownChar => "E-UNKNOWN-CHAR",
            Self::UnterminatedString => "E-UNTERMINATED-STRING",
            Self::UnexpectedToken => "E-UNEXPECTED-TOKEN",
            Self::ExpectedToken => "E-EXPECTED-TOKEN",
            Self::ExpectedExpression => "E-EXPECTED-EXPRESSION",
            Self::MissingCondition => "E-MISSING-CONDITION",
            Self::UnbalancedBlock => "E-UNBALANCED-BLOCK",
            Self::UnmatchedEndif => "E-UNMATCHED-ENDIF",
            Self::UnmatchedElse => "E-UNMATCHED-ELSE",
            Self::UnmatchedEnd => "E-UNMATCHED-END",
            Self::NestingTooDeep => "E-NESTING-TOO-DEEP",
            Self::UndefinedCharacter => "E-UNDEF-CHAR",
            Self::UndefinedVariable => "E-UNDEF-VAR",
            Self::UndefinedFunction => "E-UNDEF-FUNC",
            Self::UndefinedLabel => "E-UNDEF-LABEL",
            Self::Redefinition => "E-REDEFINITION",
            Self::ArityMismatch => "E-ARITY-MISMATCH",
            Self::DirectiveArgs => "E-DIRECTIVE-ARGS",
            Self::MaybeUninitialized => "W-MAYBE-UNINIT",
            Self::TypeMismatch => "W-TYPE-MISMATCH",
            Self::UnknownDirective => "I-UNKNOWN-DIRECTIVE",
        }
    }

    /// The severity every diagnostic with this code carries.
    #[must_use]
    pub const fn severity(self) -> Severity {
        match self {
            Self::MaybeUninitialized | Self::TypeMismatch => Severity::Warning,
            Self::UnknownDirective => Severity::Info,
            _ => Severity::Error,
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl serde::Serialize for DiagnosticCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A diagnostic message (error, warning or info).
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
pub struct Diagnostic {
    /// The severity of the diagnostic.
    pub severity: Severity,
    /// Stable code.
    pub code: DiagnosticCode,
    /// The message.
    pub message: EcoString,
    /// The source location.
    pub span: Span,
    /// Optional hint for how to fix the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<EcoString>,
}

impl Diagnostic {
    /// Creates a diagnostic; the severity follows from `code`.
    #[must_use]
    pub fn new(code: DiagnosticCode, message: impl Into<EcoString>, span: Span) -> Self {
        Self {
            severity: code.severity(),
            code,
            message: message.into(),
            span,
            hint: None,
        }
    }

    /// Adds a hint.
    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<EcoString>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Returns true for error-severity diagnostics.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// The same diagnostic with its span made relative to `base`.
    #[must_use]
    pub fn relative_to(&self, base: u32) -> Self {
        Self {
            span: self.span.relative_to(base),
            ..self.clone()
        }
    }

    /// The same diagnostic with an item-relative span made absolute.
    #[must_use]
    pub fn offset_by(&self, base: u32) -> Self {
        Self {
            span: self.span.offset_by(base),
            ..self.clone()
        }
    }

    /// Positional order: (start, end, code, message).
    #[must_use]
    pub fn cmp_position(&self, other: &Self) -> Ordering {
        (self.span.start(), self.span.end(), self.code, &self.message).cmp(&(
            other.span.start(),
            other.span.end(),
            other.code,
            &other.message,
        ))
    }

    /// Severity first, then position.
    #[must_use]
    pub fn cmp_rank(&self, other: &Self) -> Ordering {
        self.severity
            .cmp(&other.severity)
            .then_with(|| self.cmp_position(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_follows_code() {
        let diag = Diagnostic::new(DiagnosticCode::TypeMismatch, "mismatch", Span::new(0, 1));
        assert_eq!(diag.severity, Severity::Warning);
        assert_eq!(
            DiagnosticCode::UnknownDirective.severity(),
            Severity::Info
        );
        assert!(Diagnostic::new(DiagnosticCode::UndefinedCharacter, "x", Span::default()).is_error());
    }

    #[test]
    fn codes_render() {
        assert_eq!(DiagnosticCode::UndefinedCharacter.to_string(), "E-UNDEF-CHAR");
        assert_eq!(DiagnosticCode::MaybeUninitialized.as_str(), "W-MAYBE-UNINIT");
    }

    #[test]
    fn ordering() {
        let a = Diagnostic::new(DiagnosticCode::UnknownDirective, "a", Span::new(0, 2));
        let b = Diagnostic::new(DiagnosticCode::UndefinedVariable, "b", Span::new(5, 6));
        assert_eq!(a.cmp_position(&b), Ordering::Less);
        assert_eq!(a.cmp_rank(&b), Ordering::Greater);
    }

    #[test]
    fn relative_spans_round_trip() {
        let diag = Diagnostic::new(DiagnosticCode::UnknownChar, "?", Span::new(12, 13));
        assert_eq!(diag.relative_to(10).span, Span::new(2, 3));
        assert_eq!(diag.relative_to(10).offset_by(10), diag);
    }

    #[test]
    fn serializes_code_as_string() {
        let diag = Diagnostic::new(DiagnosticCode::UndefinedLabel, "missing", Span::new(1, 4));
        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json["code"], "E-UNDEF-LABEL");
        assert_eq!(json["severity"], "error");
    }
}
