//! Ouro Error Handling - Unified Encapsulated API
//!
//! All parse and shell failures are represented by a single `OuroError`
//! carrying its kind, source context, and diagnostic enhancements.

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceSpan};
use std::fmt;
use std::sync::Arc;

// ============================================================================
// SOURCE CONTEXT - Error reporting infrastructure
// ============================================================================

/// Represents source context for error reporting: the input's name together
/// with its full content, so diagnostics can render the offending excerpt.
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub name: String,
    pub content: String,
}

impl SourceContext {
    /// Create a source context from real file content.
    /// This is the preferred method for error reporting.
    pub fn from_file(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Create a context for anonymous in-memory input.
    pub fn from_input(content: impl Into<String>) -> Self {
        Self::from_file("input", content)
    }

    /// Create a fallback when real source is unavailable.
    /// Use only when real source cannot be obtained.
    pub fn fallback(context: &str) -> Self {
        Self {
            name: "fallback".to_string(),
            content: format!("// {}", context),
        }
    }

    /// Convert to NamedSource for use with miette error reporting.
    pub fn to_named_source(&self) -> Arc<NamedSource<String>> {
        Arc::new(NamedSource::new(self.name.clone(), self.content.clone()))
    }
}

impl Default for SourceContext {
    fn default() -> Self {
        Self::fallback("default context")
    }
}

/// The single error type - no wrapper, no variants, just essential data.
#[derive(Debug)]
pub struct OuroError {
    /// What went wrong (type-specific data)
    pub kind: ErrorKind,
    /// Where it happened (context-specific source information)
    pub source_info: SourceInfo,
    /// How to help (auto-populated based on context)
    pub diagnostic_info: DiagnosticInfo,
}

/// All error types as a clean enum - no duplicate fields.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    // Parse errors - a primitive could not match at the cursor
    UnexpectedText {
        expected: String,
        found: String,
    },
    UnexpectedEof {
        expected: String,
    },
    // Exhaustion - every alternative or the minimum repetition failed
    NoAlternative {
        found: String,
    },
    EmptyRepetition {
        expected: String,
    },
    // The parse completed without consuming the whole input
    TrailingInput {
        consumed: usize,
        total: usize,
    },

    // Shell errors
    Io {
        path: String,
        message: String,
    },
    Internal {
        message: String,
    },
}

/// Context-specific source information.
#[derive(Debug, Clone)]
pub struct SourceInfo {
    pub source: Arc<NamedSource<String>>,
    pub primary_span: SourceSpan,
    pub phase: String,
}

/// Diagnostic enhancement data.
#[derive(Debug, Clone)]
pub struct DiagnosticInfo {
    pub help: Option<String>,
    pub error_code: String,
}

impl ErrorKind {
    /// Get the error category for test assertions.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnexpectedText { .. }
            | Self::UnexpectedEof { .. }
            | Self::NoAlternative { .. }
            | Self::EmptyRepetition { .. }
            | Self::TrailingInput { .. } => ErrorCategory::Parse,

            Self::Io { .. } | Self::Internal { .. } => ErrorCategory::Shell,
        }
    }

    /// Get error code suffix for diagnostic codes.
    pub const fn code_suffix(&self) -> &'static str {
        match self {
            Self::UnexpectedText { .. } => "unexpected_text",
            Self::UnexpectedEof { .. } => "unexpected_eof",
            Self::NoAlternative { .. } => "no_alternative",
            Self::EmptyRepetition { .. } => "empty_repetition",
            Self::TrailingInput { .. } => "trailing_input",
            Self::Io { .. } => "io",
            Self::Internal { .. } => "internal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Parse,
    Shell,
}

impl std::error::Error for OuroError {}

impl fmt::Display for OuroError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::UnexpectedText { expected, found } => {
                write!(f, "Parse error: expected {}, found '{}'", expected, found)
            }
            ErrorKind::UnexpectedEof { expected } => {
                write!(f, "Parse error: expected {}, found end of input", expected)
            }
            ErrorKind::NoAlternative { found } => {
                write!(f, "Parse error: no alternative matched at '{}'", found)
            }
            ErrorKind::EmptyRepetition { expected } => {
                write!(f, "Parse error: expected at least one {}", expected)
            }
            ErrorKind::TrailingInput { consumed, total } => {
                write!(
                    f,
                    "Parse error: input not fully consumed ({} of {} bytes)",
                    consumed, total
                )
            }
            ErrorKind::Io { path, message } => {
                write!(f, "I/O error: {}: {}", path, message)
            }
            ErrorKind::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl Diagnostic for OuroError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(&self.diagnostic_info.error_code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diagnostic_info
            .help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn fmt::Display>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let labels = vec![LabeledSpan::new_with_span(
            Some(self.primary_label()),
            self.source_info.primary_span,
        )];
        Some(Box::new(labels.into_iter()))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&*self.source_info.source)
    }
}

impl OuroError {
    fn primary_label(&self) -> String {
        match &self.kind {
            ErrorKind::UnexpectedText { expected, .. } => format!("expected {} here", expected),
            ErrorKind::UnexpectedEof { .. } => "input ended here".into(),
            ErrorKind::NoAlternative { .. } => "no alternative matched here".into(),
            ErrorKind::EmptyRepetition { .. } => "nothing matched here".into(),
            ErrorKind::TrailingInput { .. } => "unconsumed input starts here".into(),
            ErrorKind::Io { .. } => "while reading".into(),
            ErrorKind::Internal { .. } => "internal failure".into(),
        }
    }
}

// ============================================================================
// ERROR CONSTRUCTORS - The only places OuroError is assembled
// ============================================================================

/// Builds a parse-phase error anchored at `span` within `source`.
pub(crate) fn parse_error(kind: ErrorKind, source: &SourceContext, span: SourceSpan) -> OuroError {
    let error_code = format!("ouro::parse::{}", kind.code_suffix());
    OuroError {
        kind,
        source_info: SourceInfo {
            source: source.to_named_source(),
            primary_span: span,
            phase: "parse".into(),
        },
        diagnostic_info: DiagnosticInfo {
            help: None,
            error_code,
        },
    }
}

/// Builds an I/O error for the CLI shell.
pub fn io_error(path: impl fmt::Display, cause: &std::io::Error) -> OuroError {
    let path = path.to_string();
    let kind = ErrorKind::Io {
        path: path.clone(),
        message: cause.to_string(),
    };
    let error_code = format!("ouro::shell::{}", kind.code_suffix());
    OuroError {
        kind,
        source_info: SourceInfo {
            source: SourceContext::fallback(&path).to_named_source(),
            primary_span: unspanned(),
            phase: "shell".into(),
        },
        diagnostic_info: DiagnosticInfo {
            help: None,
            error_code,
        },
    }
}

/// Creates an internal error - these indicate engine bugs, not user errors.
pub fn internal_error(message: impl Into<String>) -> OuroError {
    let kind = ErrorKind::Internal {
        message: message.into(),
    };
    let error_code = format!("ouro::shell::{}", kind.code_suffix());
    OuroError {
        kind,
        source_info: SourceInfo {
            source: SourceContext::fallback("internal").to_named_source(),
            primary_span: unspanned(),
            phase: "shell".into(),
        },
        diagnostic_info: DiagnosticInfo {
            help: Some("This is an internal engine error. Please report this as a bug.".into()),
            error_code,
        },
    }
}

/// Creates a placeholder span for errors not tied to a specific source code
/// location, such as I/O errors or internal application state failures.
pub fn unspanned() -> SourceSpan {
    SourceSpan::from(0..0)
}

/// Prints an OuroError with full miette diagnostics.
///
/// This provides rich error formatting with source spans and context.
/// Use this for user-facing error display in CLI contexts.
pub fn print_error(error: OuroError) {
    let report = miette::Report::new(error);
    eprintln!("{report:?}");
}
