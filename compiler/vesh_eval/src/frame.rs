//! Execution context.
//!
//! A [`Frame`] is what every operation runs against: the local scope, the
//! captured up scope, the ports, and the process-wide evaluator state. It
//! is immutable and cheap to clone. Special forms [`Frame::fork`] it for
//! each body they run. The fork shares both scopes and only changes the
//! label that error reports carry.

use std::sync::Arc;

use vesh_ir::{SourceRef, Span};

use crate::callable::Callable;
use crate::evaler::EvalerState;
use crate::exception::{ErrorContext, ErrorKind};
use crate::ns::Ns;
use crate::ports::Ports;
use crate::value::Value;
use crate::variable::{VarHandle, Variable};

#[derive(Clone)]
pub struct Frame {
    pub(crate) evaler: Arc<EvalerState>,
    pub src: SourceRef,
    pub local: Ns,
    pub up: Ns,
    pub ports: Ports,
    label: Arc<str>,
    /// The region of `src` this frame is running.
    window: Span,
    /// Modules whose top level this frame runs inside of, outermost first.
    pub(crate) loading: Arc<Vec<String>>,
}

impl Frame {
    pub(crate) fn new(
        evaler: Arc<EvalerState>,
        src: SourceRef,
        local: Ns,
        up: Ns,
        ports: Ports,
        label: &str,
    ) -> Self {
        let window = Span::new(0, src.end());
        Frame {
            evaler,
            src,
            local,
            up,
            ports,
            label: Arc::from(label),
            window,
            loading: Arc::default(),
        }
    }

    /// A frame for the top level of module `path`, loaded on behalf of
    /// `self`.
    pub(crate) fn module(&self, src: SourceRef, ns: Ns, path: &str) -> Frame {
        let mut loading = Vec::clone(&self.loading);
        loading.push(path.to_owned());
        Frame {
            window: Span::new(0, src.end()),
            evaler: Arc::clone(&self.evaler),
            src,
            local: ns,
            up: Ns::new(),
            ports: self.ports.clone(),
            label: Arc::from("module"),
            loading: Arc::new(loading),
        }
    }

    /// Same scopes, new label.
    #[must_use]
    pub fn fork(&self, label: &str) -> Frame {
        Frame {
            label: Arc::from(label),
            ..self.clone()
        }
    }

    /// Same scopes, different ports. Used for pipeline stages and output
    /// capture.
    #[must_use]
    pub fn with_ports(&self, ports: Ports) -> Frame {
        Frame {
            ports,
            ..self.clone()
        }
    }

    /// A frame for running a closure body.
    pub(crate) fn enter(
        &self,
        src: SourceRef,
        local: Ns,
        up: Ns,
        window: Span,
        label: &str,
    ) -> Frame {
        Frame {
            evaler: Arc::clone(&self.evaler),
            src,
            local,
            up,
            ports: self.ports.clone(),
            label: Arc::from(label),
            window,
            loading: Arc::clone(&self.loading),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn window(&self) -> Span {
        self.window
    }

    pub fn builtin(&self) -> &Ns {
        &self.evaler.builtin
    }

    pub fn context(&self, span: Span) -> ErrorContext {
        ErrorContext {
            source: self.src.clone(),
            span,
            label: Arc::clone(&self.label),
        }
    }

    /// Find the variable `$ns:name`.
    ///
    /// - `""`: local, then up, then builtin.
    /// - `local`, `up`, `builtin`: that scope only.
    /// - `E`: the process environment.
    /// - `e`: `$e:cmd~` is the external command `cmd`.
    /// - anything else: a namespace variable `$ns:`, then `name` inside it.
    pub fn resolve_var(&self, ns: &str, name: &str) -> Option<VarHandle> {
        match ns {
            "" => self
                .local
                .get(name)
                .or_else(|| self.up.get(name))
                .or_else(|| self.builtin().get(name))
                .map(VarHandle::Cell),
            "local" => self.local.get(name).map(VarHandle::Cell),
            "up" => self.up.get(name).map(VarHandle::Cell),
            "builtin" => self.builtin().get(name).map(VarHandle::Cell),
            "E" => Some(VarHandle::Env(name.to_owned())),
            "e" => name.strip_suffix('~').map(|cmd| {
                VarHandle::Cell(Variable::new(Value::Fn(Callable::External(Arc::from(cmd)))))
            }),
            _ => self.resolve_ns(ns)?.get(name).map(VarHandle::Cell),
        }
    }

    /// The namespace `$ns:` refers to. A nested prefix `a:b` is looked up
    /// whole first (`use a:b` binds `$a:b:`), then one level at a time.
    fn resolve_ns(&self, ns: &str) -> Option<Ns> {
        let whole = self.resolve_var("", &format!("{ns}:")).and_then(|var| match var {
            VarHandle::Cell(variable) => match variable.get() {
                Value::Ns(found) => Some(found),
                _ => None,
            },
            _ => None,
        });
        if whole.is_some() {
            return whole;
        }
        let (outer, inner) = ns.split_once(':')?;
        let mut current = self.resolve_ns(outer)?;
        for part in inner.split(':') {
            current = match current.get(&format!("{part}:"))?.get() {
                Value::Ns(next) => next,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Like [`Frame::resolve_var`] but failing with `variable $x not found`.
    pub fn must_resolve_var(&self, ns: &str, name: &str) -> Result<VarHandle, ErrorKind> {
        self.resolve_var(ns, name)
            .ok_or_else(|| ErrorKind::VariableNotFound(qualified(ns, name)))
    }

    /// Resolve a command name to a callable: `$name~` if it exists
    /// (qualified names look in their namespace), else an external command.
    pub fn resolve_command(&self, name: &str) -> Result<Callable, ErrorKind> {
        let (ns, base) = split_qualified(name);
        match self.resolve_var(ns, &format!("{base}~")) {
            Some(handle) => match handle.get()? {
                Value::Fn(callable) => Ok(callable),
                _ => Err(ErrorKind::ShouldBeFn),
            },
            None => Ok(Callable::External(Arc::from(name))),
        }
    }
}

/// `ns:name`, or just `name` for the empty namespace.
pub fn qualified(ns: &str, name: &str) -> String {
    if ns.is_empty() {
        name.to_owned()
    } else {
        format!("{ns}:{name}")
    }
}

/// Split a command name such as `m:f` into `("m", "f")`. A name with no
/// colon, or ending in one, is unqualified.
pub fn split_qualified(name: &str) -> (&str, &str) {
    match name.rfind(':') {
        Some(i) if i + 1 < name.len() => (&name[..i], &name[i + 1..]),
        _ => ("", name),
    }
}
