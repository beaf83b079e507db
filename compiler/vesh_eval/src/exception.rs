//! Exceptions and control-flow signals.
//!
//! Everything that can go wrong at run time travels up the Rust call stack
//! as the `Err` side of [`EvalResult`]. The error type, [`Unwind`], has two
//! arms that are matched by tag:
//!
//! - [`Unwind::Flow`]: `return`, `break` and `continue`. These are not
//!   failures. Each is absorbed by exactly one boundary (a function call for
//!   `Return`, a loop for `Break`/`Continue`).
//! - [`Unwind::Exception`]: a genuine failure, catchable by `try`.
//!
//! # Error taxonomy
//!
//! [`ErrorKind`] groups failures by [`ErrorCategory`]: type errors
//! (validators, arity), resolution errors (unknown names, bad `use` paths),
//! and runtime faults (everything else). Compile errors are a separate type,
//! [`crate::CompileError`], because they never reach a running frame.

use std::fmt;
use std::sync::Arc;

use vesh_ir::{SourceRef, Span};

/// Result of running an operation.
pub type EvalResult<T = ()> = Result<T, Unwind>;

/// The three control-flow signals.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Flow {
    Return,
    Break,
    Continue,
}

impl Flow {
    /// The error a signal turns into when nothing absorbed it.
    pub fn escaped(self) -> ErrorKind {
        match self {
            Flow::Return => ErrorKind::ReturnOutsideFn,
            Flow::Break => ErrorKind::BreakOutsideLoop,
            Flow::Continue => ErrorKind::ContinueOutsideLoop,
        }
    }
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Flow::Return => "return",
            Flow::Break => "break",
            Flow::Continue => "continue",
        })
    }
}

/// Broad class of an [`ErrorKind`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Validator or read-only rejection, or wrong number of values.
    Type,
    /// Unknown variable, namespace, command or module.
    Resolution,
    /// A signal escaped every boundary that could have absorbed it.
    EscapedSignal,
    /// Everything else.
    RuntimeFault,
}

/// What went wrong.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ErrorKind {
    // Type errors
    #[error("should be fn")]
    ShouldBeFn,
    #[error("should be ns")]
    ShouldBeNs,
    #[error("arity mismatch")]
    ArityMismatch,
    #[error("{what} must be a single value, got {got}")]
    MustBeOne { what: &'static str, got: usize },
    #[error("wrong type of argument: want {want}, got {got}")]
    WrongArgType { want: &'static str, got: String },
    #[error("variable is read-only")]
    ReadOnlyVariable,

    // Resolution errors
    #[error("variable ${0} not found")]
    VariableNotFound(String),
    #[error("new variables can only be created in local scope")]
    NewVariableNotLocal,
    #[error("variable ${0} does not exist, compiler bug")]
    CompilerBug(String),
    #[error("relative use not from a module")]
    RelativeUseNotFromModule,
    #[error("module outside library directory")]
    ModuleOutsideLib,
    #[error("cannot load {name}: {path} does not exist")]
    ModuleNotFound { name: String, path: String },
    #[error("evaler does not have a lib directory")]
    NoLibDir,
    #[error("command not found: {0}")]
    CommandNotFound(String),

    // Runtime faults
    #[error("multi indexing not implemented")]
    MultiIndexing,
    #[error("index out of range")]
    IndexOutOfRange,
    #[error("index must be an integer, got {0}")]
    BadIndex(String),
    #[error("no such key: {0}")]
    NoSuchKey(String),
    #[error("cannot index a {0}")]
    NotIndexable(&'static str),
    #[error("cannot assign to an element of a {0}")]
    NotAssocable(&'static str),
    #[error("value does not support element removal")]
    NotDissocable,
    #[error("cannot iterate a {0}")]
    NotIterable(&'static str),
    #[error("not callable: {0}")]
    NotCallable(String),
    #[error("only one variable allowed")]
    OnlyOneVariable,
    #[error("should be one variable")]
    ShouldBeOneVariable,
    #[error("index must evaluate to a single value in argument to del")]
    DelIndexNotSingle,
    #[error("bad environment variable name {0:?}")]
    BadEnvName(String),
    #[error("{cmd} exited with {status}")]
    ExternalFailed { cmd: String, status: String },
    #[error("cannot run {cmd}: {reason}")]
    SpawnFailed { cmd: String, reason: String },
    #[error("cannot read {path}: {reason}")]
    Io { path: String, reason: String },
    #[error("bad JSON: {0}")]
    BadJson(String),
    /// A module failed to parse or compile. The message already says which.
    #[error("{0}")]
    LoadFailed(String),
    /// Raised by the `fail` builtin.
    #[error("{0}")]
    Fail(String),

    // Escaped signals
    #[error("return outside a function")]
    ReturnOutsideFn,
    #[error("break outside a loop")]
    BreakOutsideLoop,
    #[error("continue outside a loop")]
    ContinueOutsideLoop,
}

impl ErrorKind {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ErrorKind::ShouldBeFn
            | ErrorKind::ShouldBeNs
            | ErrorKind::ArityMismatch
            | ErrorKind::MustBeOne { .. }
            | ErrorKind::WrongArgType { .. }
            | ErrorKind::ReadOnlyVariable => ErrorCategory::Type,
            ErrorKind::VariableNotFound(_)
            | ErrorKind::NewVariableNotLocal
            | ErrorKind::CompilerBug(_)
            | ErrorKind::RelativeUseNotFromModule
            | ErrorKind::ModuleOutsideLib
            | ErrorKind::ModuleNotFound { .. }
            | ErrorKind::NoLibDir
            | ErrorKind::CommandNotFound(_) => ErrorCategory::Resolution,
            ErrorKind::ReturnOutsideFn
            | ErrorKind::BreakOutsideLoop
            | ErrorKind::ContinueOutsideLoop => ErrorCategory::EscapedSignal,
            _ => ErrorCategory::RuntimeFault,
        }
    }
}

/// Where an exception was raised.
#[derive(Clone, Debug)]
pub struct ErrorContext {
    pub source: SourceRef,
    pub span: Span,
    /// Label of the frame that raised it, e.g. `for` or `try body`.
    pub label: Arc<str>,
}

/// A failure value.
///
/// Exceptions are first-class: `try ... except e { }` binds one to a
/// variable, and `kind-of $e` says `exception`.
#[derive(Clone, Debug)]
pub struct Exception {
    pub kind: ErrorKind,
    /// Set by the innermost operation that saw the failure; never replaced
    /// once set.
    pub context: Option<ErrorContext>,
}

impl Exception {
    pub fn new(kind: ErrorKind) -> Self {
        Exception {
            kind,
            context: None,
        }
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)
    }
}

/// Why an operation stopped early.
#[derive(Clone, Debug)]
pub enum Unwind {
    Flow(Flow),
    Exception(Box<Exception>),
}

impl Unwind {
    /// The exception, if this is not a control-flow signal.
    pub fn exception(&self) -> Option<&Exception> {
        match self {
            Unwind::Exception(exc) => Some(exc),
            Unwind::Flow(_) => None,
        }
    }

    /// Attach a source position unless a more precise one is already there.
    #[must_use]
    pub fn with_context(self, context: impl FnOnce() -> ErrorContext) -> Self {
        match self {
            Unwind::Exception(mut exc) if exc.context.is_none() => {
                exc.context = Some(context());
                Unwind::Exception(exc)
            }
            other => other,
        }
    }

    /// Turn an escaped signal into the error it stands for.
    #[must_use]
    pub fn into_exception(self) -> Exception {
        match self {
            Unwind::Exception(exc) => *exc,
            Unwind::Flow(flow) => Exception::new(flow.escaped()),
        }
    }
}

impl From<ErrorKind> for Unwind {
    fn from(kind: ErrorKind) -> Self {
        Unwind::Exception(Box::new(Exception::new(kind)))
    }
}

impl From<Exception> for Unwind {
    fn from(exc: Exception) -> Self {
        Unwind::Exception(Box::new(exc))
    }
}

impl fmt::Display for Unwind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unwind::Flow(flow) => write!(f, "{flow}"),
            Unwind::Exception(exc) => exc.fmt(f),
        }
    }
}

// Constructors for the common cases.

pub fn arity_mismatch() -> Unwind {
    ErrorKind::ArityMismatch.into()
}

pub fn must_be_one(what: &'static str, got: usize) -> Unwind {
    ErrorKind::MustBeOne { what, got }.into()
}

pub fn fail(message: impl Into<String>) -> Unwind {
    ErrorKind::Fail(message.into()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use vesh_ir::Source;

    fn context(span: Span) -> ErrorContext {
        ErrorContext {
            source: Arc::new(Source::interactive("put x")),
            span,
            label: Arc::from("top"),
        }
    }

    #[test]
    fn test_innermost_context_wins() {
        let err = Unwind::from(ErrorKind::IndexOutOfRange)
            .with_context(|| context(Span::new(4, 5)))
            .with_context(|| context(Span::new(0, 5)));
        let exc = err.exception().unwrap();
        assert_eq!(exc.context.as_ref().unwrap().span, Span::new(4, 5));
    }

    #[test]
    fn test_flow_ignores_context() {
        let err = Unwind::Flow(Flow::Break).with_context(|| context(Span::new(0, 1)));
        assert!(matches!(err, Unwind::Flow(Flow::Break)));
        assert_eq!(err.into_exception().kind, ErrorKind::BreakOutsideLoop);
    }

    #[test]
    fn test_categories() {
        assert_eq!(ErrorKind::ShouldBeFn.category(), ErrorCategory::Type);
        assert_eq!(
            ErrorKind::ModuleOutsideLib.category(),
            ErrorCategory::Resolution
        );
        assert_eq!(
            ErrorKind::ContinueOutsideLoop.category(),
            ErrorCategory::EscapedSignal
        );
        assert_eq!(ErrorKind::NotDissocable.category(), ErrorCategory::RuntimeFault);
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            ErrorKind::VariableNotFound("x".into()).to_string(),
            "variable $x not found"
        );
        assert_eq!(
            ErrorKind::ModuleNotFound {
                name: "a/b".into(),
                path: "/lib/a/b.vesh".into()
            }
            .to_string(),
            "cannot load a/b: /lib/a/b.vesh does not exist"
        );
        assert_eq!(fail("boom").to_string(), "boom");
    }
}
