//! Diagnostics for the vesh shell.
//!
//! Parse errors, compile errors and uncaught exceptions are all reported the
//! same way: a title, a message, and the offending region of source code.

pub mod emitter;
pub mod span_utils;

use vesh_ir::{SourceRef, Span};

pub use emitter::{ColorMode, TerminalEmitter};

/// What kind of failure a diagnostic reports. Decides the title word.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Severity {
    ParseError,
    CompileError,
    Exception,
    Warning,
}

impl Severity {
    pub fn title(self) -> &'static str {
        match self {
            Severity::ParseError => "parse error",
            Severity::CompileError => "compile error",
            Severity::Exception => "exception",
            Severity::Warning => "warning",
        }
    }
}

/// A renderable report.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// The code the span points into. Absent for failures that have no
    /// position, such as a missing script file.
    pub source: Option<SourceRef>,
    pub span: Span,
    /// Extra lines printed under the snippet, e.g. the frame label.
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Diagnostic {
            severity,
            message: message.into(),
            source: None,
            span: Span::DUMMY,
            notes: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: SourceRef, span: Span) -> Self {
        self.source = Some(source);
        self.span = span;
        self
    }

    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}
