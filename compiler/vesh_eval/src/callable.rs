//! Callable values and the call protocol.
//!
//! Three kinds of callable: closures created by lambdas, builtin functions
//! implemented in Rust, and external commands found on `PATH`.
//!
//! # Return absorption
//!
//! `return` raises [`Flow::Return`]. The signal stops at the nearest
//! *function boundary*, which is a closure called as a command (or by a
//! builtin such as `each`), or any call of a closure defined with `fn`.
//! Bodies run by special forms (`if`, `for`, `try`, ...) are called as
//! blocks and let it through, so `return` inside `if` leaves the enclosing
//! function.

use std::fmt;
use std::sync::Arc;

use vesh_ir::{SourceRef, Span};
use vesh_stack::ensure_sufficient_stack;

use crate::builtin;
use crate::exception::{ErrorKind, EvalResult, Flow, Unwind};
use crate::frame::Frame;
use crate::ns::Ns;
use crate::op::Op;
use crate::value::Value;
use crate::variable::Variable;

/// Signature of a builtin function.
pub type BuiltinImpl = fn(&Frame, Vec<Value>) -> EvalResult;

#[derive(Clone)]
pub struct BuiltinFn {
    pub name: &'static str,
    imp: BuiltinImpl,
}

impl BuiltinFn {
    pub fn new(name: &'static str, imp: BuiltinImpl) -> Self {
        BuiltinFn { name, imp }
    }
}

/// A lambda closed over the variables visible where it was created.
pub struct Closure {
    pub params: Vec<String>,
    pub rest: Option<String>,
    pub has_signature: bool,
    pub body: Arc<Op>,
    /// Snapshot of the creating frame's scopes. Shares their cells.
    pub capture: Ns,
    pub src: SourceRef,
    pub span: Span,
    /// Set for closures bound by `fn`: every call is a function boundary.
    pub is_fn: bool,
}

#[derive(Clone)]
pub enum Callable {
    Closure(Arc<Closure>),
    Builtin(BuiltinFn),
    External(Arc<str>),
}

/// How a callable is being invoked.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CallMode {
    /// As a command, or by a builtin. Absorbs `return`.
    Command,
    /// As the body of a special form. Lets every signal through.
    Block,
}

impl Callable {
    pub fn call(&self, frame: &Frame, args: Vec<Value>, mode: CallMode) -> EvalResult {
        match self {
            Callable::Closure(closure) => ensure_sufficient_stack(|| closure.call(frame, args, mode)),
            Callable::Builtin(builtin) => (builtin.imp)(frame, args),
            Callable::External(name) => builtin::cmd::run_external(frame, name, &args),
        }
    }
}

impl Closure {
    fn call(&self, caller: &Frame, args: Vec<Value>, mode: CallMode) -> EvalResult {
        let local = Ns::new();
        if self.has_signature {
            self.bind_params(&local, &args)?;
        }
        local.insert("args", Variable::new(Value::list(args)));

        // A block keeps the label of the form running it, so failures inside
        // read as `for`, `try body` and so on.
        let label = match mode {
            CallMode::Command => "closure",
            CallMode::Block => caller.label(),
        };
        let frame = caller.enter(self.src.clone(), local, self.capture.clone(), self.span, label);
        match self.body.exec(&frame) {
            Err(Unwind::Flow(Flow::Return)) if self.is_fn || mode == CallMode::Command => Ok(()),
            other => other,
        }
    }

    fn bind_params(&self, local: &Ns, args: &[Value]) -> Result<(), ErrorKind> {
        let fixed = self.params.len();
        let arity_ok = match self.rest {
            Some(_) => args.len() >= fixed,
            None => args.len() == fixed,
        };
        if !arity_ok {
            return Err(ErrorKind::ArityMismatch);
        }
        for (name, value) in self.params.iter().zip(args) {
            let variable = Variable::declare(name);
            variable.set(value.clone())?;
            local.insert(name.clone(), variable);
        }
        if let Some(rest) = &self.rest {
            local.insert(rest.clone(), Variable::new(Value::list(args[fixed..].to_vec())));
        }
        Ok(())
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Callable::Closure(a), Callable::Closure(b)) => Arc::ptr_eq(a, b),
            (Callable::Builtin(a), Callable::Builtin(b)) => a.name == b.name,
            (Callable::External(a), Callable::External(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Closure(closure) => write!(f, "<closure {}:{}>", closure.src.name, closure.span),
            Callable::Builtin(builtin) => write!(f, "<builtin {}>", builtin.name),
            Callable::External(name) => write!(f, "<external {name}>"),
        }
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
