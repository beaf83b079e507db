//! The evaluator: process-wide state and the top-level entry points.
//!
//! # State
//!
//! [`EvalerState`] is shared by every frame through an `Arc`:
//!
//! - the builtin namespace,
//! - the library directory and the table of bundled modules,
//! - the module cache,
//! - the shutdown hook run by `exit`.
//!
//! Its lifetime is the [`Evaler`]'s: created by [`Evaler::new`], torn down
//! when the last frame referencing it is dropped. Nothing is global.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashMap;
use tracing::debug;
use vesh_diagnostic::{Diagnostic, Severity};
use vesh_ir::{Source, SourceRef, Span};
use vesh_parse::ParseError;

use crate::builtin;
use crate::compiler::{self, CompileError};
use crate::exception::{Exception, Unwind};
use crate::frame::Frame;
use crate::module::{ModuleCache, ModuleEntry};
use crate::ns::Ns;
use crate::ports::Ports;

/// Run by `exit` before the process terminates.
pub type ShutdownHook = Arc<dyn Fn() -> Result<(), String> + Send + Sync>;

#[derive(Clone, Default)]
pub struct EvalerConfig {
    /// Root that non-relative `use` paths resolve against.
    pub lib_dir: Option<PathBuf>,
    /// Modules compiled into the binary, by module path.
    pub bundled: FxHashMap<String, String>,
    pub shutdown: Option<ShutdownHook>,
}

impl EvalerConfig {
    #[must_use]
    pub fn with_lib_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.lib_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_bundled(mut self, path: impl Into<String>, code: impl Into<String>) -> Self {
        self.bundled.insert(path.into(), code.into());
        self
    }

    #[must_use]
    pub fn with_shutdown(mut self, hook: ShutdownHook) -> Self {
        self.shutdown = Some(hook);
        self
    }
}

impl fmt::Debug for EvalerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvalerConfig")
            .field("lib_dir", &self.lib_dir)
            .field("bundled", &self.bundled.keys().collect::<Vec<_>>())
            .field("shutdown", &self.shutdown.is_some())
            .finish()
    }
}

pub(crate) struct EvalerState {
    pub(crate) builtin: Ns,
    pub(crate) lib_dir: Option<PathBuf>,
    pub(crate) bundled: FxHashMap<String, String>,
    /// Modules by resolved path. See [`crate::module`].
    pub(crate) modules: Mutex<ModuleCache>,
    /// Signalled whenever a module finishes loading, successfully or not.
    pub(crate) module_ready: Condvar,
    pub(crate) shutdown: Option<ShutdownHook>,
}

/// Why a top-level evaluation failed.
#[derive(Clone, Debug)]
pub enum EvalError {
    Parse { source: SourceRef, error: ParseError },
    Compile(CompileError),
    Exception(Exception),
}

impl EvalError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            EvalError::Parse { source, error } => {
                Diagnostic::new(Severity::ParseError, error.message.clone())
                    .with_source(source.clone(), error.span)
            }
            EvalError::Compile(error) => {
                Diagnostic::new(Severity::CompileError, error.message.clone())
                    .with_source(error.src.clone(), error.span)
            }
            EvalError::Exception(exc) => {
                let diagnostic = Diagnostic::new(Severity::Exception, exc.to_string());
                match &exc.context {
                    Some(context) => diagnostic
                        .with_source(context.source.clone(), context.span)
                        .with_note(format!("in {}", context.label)),
                    None => diagnostic,
                }
            }
        }
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::Parse { error, .. } => write!(f, "parse error: {}", error.message),
            EvalError::Compile(error) => write!(f, "compile error: {}", error.message),
            EvalError::Exception(exc) => write!(f, "exception: {exc}"),
        }
    }
}

impl std::error::Error for EvalError {}

/// An evaluator with its own global scope and module cache.
pub struct Evaler {
    state: Arc<EvalerState>,
    /// Local scope of top-level code. Persists across [`Evaler::eval`]
    /// calls, so an interactive session keeps its variables.
    global: Ns,
}

impl Evaler {
    pub fn new(config: EvalerConfig) -> Self {
        let state = EvalerState {
            builtin: builtin::namespace(),
            lib_dir: config.lib_dir,
            bundled: config.bundled,
            modules: Mutex::new(ModuleCache::default()),
            module_ready: Condvar::new(),
            shutdown: config.shutdown,
        };
        debug!(lib_dir = ?state.lib_dir, bundled = state.bundled.len(), "evaler created");
        Evaler {
            state: Arc::new(state),
            global: Ns::new(),
        }
    }

    pub fn global(&self) -> &Ns {
        &self.global
    }

    /// Parse, compile and run `source` with output on stdout.
    pub fn eval(&self, source: Source) -> Result<(), EvalError> {
        self.eval_with_ports(Arc::new(source), Ports::stdio())
    }

    /// Parse, compile and run `source` against the global scope.
    ///
    /// Signals that escape the whole unit (a `break` outside any loop)
    /// become exceptions.
    #[tracing::instrument(level = "debug", skip_all, fields(source = %source.name))]
    pub fn eval_with_ports(&self, source: SourceRef, ports: Ports) -> Result<(), EvalError> {
        let chunk = vesh_parse::parse(&source.name, &source.code).map_err(|error| {
            EvalError::Parse {
                source: source.clone(),
                error,
            }
        })?;
        let op = compiler::compile(&chunk, &source, &self.state.builtin, &self.global.names())
            .map_err(EvalError::Compile)?;

        let frame = Frame::new(
            Arc::clone(&self.state),
            source,
            self.global.clone(),
            Ns::new(),
            ports,
            "top",
        );
        op.exec(&frame)
            .map_err(|unwind| EvalError::Exception(escaped(unwind, &frame, op.span)))
    }

    /// Resolved paths of the modules loaded so far, sorted.
    pub fn loaded_modules(&self) -> Vec<String> {
        let mut paths: Vec<_> = self
            .state
            .modules
            .lock()
            .iter()
            .filter(|(_, entry)| matches!(entry, ModuleEntry::Loaded(_)))
            .map(|(path, _)| path.clone())
            .collect();
        paths.sort_unstable();
        paths
    }
}

/// The exception an escaping unwind stands for, positioned at `span` if it
/// has no position yet.
pub(crate) fn escaped(unwind: Unwind, frame: &Frame, span: Span) -> Exception {
    let mut exc = unwind.into_exception();
    if exc.context.is_none() {
        exc.context = Some(frame.context(span));
    }
    exc
}
