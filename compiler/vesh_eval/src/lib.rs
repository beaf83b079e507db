//! Vesh Eval - the compiler and evaluator core of the vesh shell.
//!
//! Source goes through three stages:
//!
//! 1. `vesh_parse` turns text into a syntax tree.
//! 2. [`compiler`] turns the tree into an operation tree ([`op`]), checking
//!    variable references against a static scope table on the way.
//! 3. [`exec`](crate::op::Op::exec) runs the operation tree against a
//!    [`Frame`].
//!
//! # Architecture
//!
//! - [`Value`]: the closed set of runtime values
//! - [`Variable`], [`Ns`]: shared cells and the scopes that hold them
//! - [`Frame`]: what an operation runs against
//! - [`Unwind`]: failures and the `return`/`break`/`continue` signals,
//!   which travel the same path and are told apart by tag
//! - [`Callable`]: closures, builtins and external commands
//! - [`Evaler`]: process-wide state (builtins, module cache) and the entry
//!   points
//!
//! The special forms (`if`, `for`, `try`, `fn`, `use`, `del`, ...) are
//! compiled in `compiler::special` and run in `exec::control`.

mod builtin;
mod callable;
pub mod compiler;
mod evaler;
mod exception;
mod exec;
mod frame;
mod module;
mod ns;
pub mod op;
mod ports;
mod value;
mod variable;

pub use builtin::cmd::search_path;
pub use builtin::BUILTINS;
pub use callable::{BuiltinFn, BuiltinImpl, CallMode, Callable, Closure};
pub use compiler::{compile, is_special_form, CompileError, SPECIAL_FORMS};
pub use evaler::{EvalError, Evaler, EvalerConfig, ShutdownHook};
pub use exception::{
    arity_mismatch, fail, must_be_one, ErrorCategory, ErrorContext, ErrorKind, EvalResult,
    Exception, Flow, Unwind,
};
pub use frame::{qualified, split_qualified, Frame};
pub use module::{clean_path, BUNDLED_PATH, EXTENSION};
pub use ns::Ns;
pub use ports::{ByteSink, Capture, Ports, ValueSink};
pub use value::{format_number, Value};
pub use variable::{
    del_element, make_element, set_env, unset_env, ElementError, ElementVar, VarHandle, Validator,
    Variable,
};

#[cfg(test)]
mod tests;
