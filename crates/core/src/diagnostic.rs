//! Structured, non-fatal findings.
//!
//! Nothing in the engine returns an error for a problem in the corpus.
//! Problems become [`Diagnostic`]s attached to the nearest tree node or to
//! the graph, so a caller can always render what was built.

use serde::Serialize;
use std::fmt;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable machine-readable diagnostic codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticCode {
    MapFileNotFound,
    AmbiguousMatch,
    NoCandidates,
    LowConfidenceMatch,
    CycleDetected,
    DepthLimitReached,
    InvalidFile,
    DuplicateElement,
    EmptyCorpus,
    NoRoot,
    RootNotFound,
}

impl DiagnosticCode {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticCode::MapFileNotFound => "map-file-not-found",
            DiagnosticCode::AmbiguousMatch => "ambiguous-match",
            DiagnosticCode::NoCandidates => "no-candidates",
            DiagnosticCode::LowConfidenceMatch => "low-confidence-match",
            DiagnosticCode::CycleDetected => "cycle-detected",
            DiagnosticCode::DepthLimitReached => "depth-limit-reached",
            DiagnosticCode::InvalidFile => "invalid-file",
            DiagnosticCode::DuplicateElement => "duplicate-element",
            DiagnosticCode::EmptyCorpus => "empty-corpus",
            DiagnosticCode::NoRoot => "no-root",
            DiagnosticCode::RootNotFound => "root-not-found",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A notable finding from a build.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: DiagnosticCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

impl Diagnostic {
    pub fn new(severity: Severity, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Diagnostic {
            severity,
            code,
            message: message.into(),
            context: None,
        }
    }

    pub fn info(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Diagnostic::new(Severity::Info, code, message)
    }

    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Diagnostic::new(Severity::Warning, code, message)
    }

    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Diagnostic::new(Severity::Error, code, message)
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = Some(context);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.severity, self.code, self.message)
    }
}
