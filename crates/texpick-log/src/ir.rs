use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// The fixed set of error categories surfaced from a log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    LatexError,
    PackageError,
    MissingElement,
    MissingFile,
    UndefinedCommand,
    EmergencyStop,
}

impl ErrorCategory {
    pub fn label(self) -> &'static str {
        match self {
            ErrorCategory::LatexError => "LaTeX Error",
            ErrorCategory::PackageError => "Package Error",
            ErrorCategory::MissingElement => "Missing Element",
            ErrorCategory::MissingFile => "Missing File",
            ErrorCategory::UndefinedCommand => "Undefined Command",
            ErrorCategory::EmergencyStop => "Emergency Stop",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One categorized error found in a log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedError {
    pub category: ErrorCategory,
    /// The part of the log line that identifies the problem.
    pub detail: String,
    /// 1-based line number in the log.
    pub line: usize,
    pub span: Span,
}

impl fmt::Display for ClassifiedError {
    /// Renders as `<category>: <detail>`, e.g. `LaTeX Error: File not found`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.category, self.detail)
    }
}
