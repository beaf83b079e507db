//! Assignment targets at run time.
//!
//! An assignment resolves its targets first, then computes its values, then
//! checks arity. A name that does not resolve is declared in the local
//! scope.

use vesh_ir::Span;

use super::values;
use crate::exception::{arity_mismatch, ErrorKind, EvalResult, Unwind};
use crate::frame::{qualified, Frame};
use crate::op::{ElemOp, LValue, LValueBody, LValuesOp, ValuesOp};
use crate::value::Value;
use crate::variable::{make_element, ElementError, VarHandle, Variable};

/// A resolved target, with the node it came from for error positions.
pub(super) struct Target<'a> {
    pub(super) handle: VarHandle,
    lvalue: &'a LValue,
}

impl Target<'_> {
    pub(super) fn set(&self, value: Value, frame: &Frame) -> EvalResult {
        self.handle
            .set(value)
            .map_err(|err| self.lvalue.element_error(err, frame))
    }
}

pub(super) struct Targets<'a> {
    fixed: Vec<Target<'a>>,
    rest: Option<Target<'a>>,
}

impl<'a> Targets<'a> {
    fn len(&self) -> usize {
        self.fixed.len() + usize::from(self.rest.is_some())
    }

    /// The only target, or `err` if there are several or a rest target.
    pub(super) fn single(mut self, err: ErrorKind) -> EvalResult<Target<'a>> {
        if self.len() != 1 || self.rest.is_some() {
            return Err(err.into());
        }
        self.fixed.pop().ok_or_else(|| err.into())
    }
}

pub(super) fn exec_assign(lvalues: &LValuesOp, values: &[ValuesOp], frame: &Frame) -> EvalResult {
    let targets = eval_lvalues(lvalues, frame)?;
    let values = values::eval_all(values, frame)?;
    assign(targets, values, frame)
}

fn assign(targets: Targets<'_>, mut values: Vec<Value>, frame: &Frame) -> EvalResult {
    let fixed = targets.fixed.len();
    let arity_ok = match targets.rest {
        Some(_) => values.len() >= fixed,
        None => values.len() == fixed,
    };
    if !arity_ok {
        return Err(arity_mismatch());
    }
    let rest = values.split_off(fixed);
    for (target, value) in targets.fixed.iter().zip(values) {
        target.set(value, frame)?;
    }
    if let Some(target) = &targets.rest {
        target.set(Value::list(rest), frame)?;
    }
    Ok(())
}

pub(super) fn eval_lvalues<'a>(op: &'a LValuesOp, frame: &Frame) -> EvalResult<Targets<'a>> {
    let fixed = op
        .fixed
        .iter()
        .map(|lvalue| lvalue.resolve(frame))
        .collect::<EvalResult<Vec<_>>>()?;
    let rest = op.rest.as_ref().map(|lvalue| lvalue.resolve(frame)).transpose()?;
    Ok(Targets { fixed, rest })
}

impl LValue {
    fn resolve(&self, frame: &Frame) -> EvalResult<Target<'_>> {
        let handle = match &self.body {
            LValueBody::Var { ns, name } => resolve_or_declare(ns, name, frame),
            LValueBody::Element(elem) => resolve_element(elem, self, frame),
        }
        .map_err(|err| err.with_context(|| frame.context(self.span)))?;
        Ok(Target {
            handle,
            lvalue: self,
        })
    }

    fn element_error(&self, err: ElementError, frame: &Frame) -> Unwind {
        let span = match &self.body {
            LValueBody::Element(elem) => element_span(elem, err.level, self.span),
            LValueBody::Var { .. } => self.span,
        };
        Unwind::from(err.kind).with_context(|| frame.context(span))
    }
}

/// An existing variable, or a new one in the local scope.
fn resolve_or_declare(ns: &str, name: &str, frame: &Frame) -> EvalResult<VarHandle> {
    if let Some(handle) = frame.resolve_var(ns, name) {
        return Ok(handle);
    }
    match ns {
        "" | "local" => {
            let variable = Variable::declare(name);
            frame.local.insert(name, variable.clone());
            Ok(VarHandle::Cell(variable))
        }
        _ => Err(ErrorKind::NewVariableNotLocal.into()),
    }
}

fn resolve_element(elem: &ElemOp, lvalue: &LValue, frame: &Frame) -> EvalResult<VarHandle> {
    let base = match frame.resolve_var(&elem.ns, &elem.name) {
        Some(VarHandle::Cell(variable)) => variable,
        Some(_) => {
            return Err(Unwind::from(ErrorKind::NotAssocable("string"))
                .with_context(|| frame.context(elem.span_to(1))));
        }
        // The compiler checked the base is visible.
        None => return Err(ErrorKind::CompilerBug(qualified(&elem.ns, &elem.name)).into()),
    };
    let indices = single_indices(elem, frame, || ErrorKind::MultiIndexing)?;
    make_element(base, indices)
        .map(VarHandle::Element)
        .map_err(|err| lvalue.element_error(err, frame))
}

/// The value of each bracket of `elem`, each of which must produce exactly
/// one.
pub(super) fn single_indices(
    elem: &ElemOp,
    frame: &Frame,
    err: impl Fn() -> ErrorKind,
) -> EvalResult<Vec<Value>> {
    let mut indices = Vec::with_capacity(elem.indices.len());
    for (i, index) in elem.indices.iter().enumerate() {
        let mut items = values::eval_all(&index.items, frame)?;
        match (items.pop(), items.is_empty()) {
            (Some(value), true) => indices.push(value),
            _ => {
                return Err(Unwind::from(err()).with_context(|| frame.context(elem.span_to(i + 1))));
            }
        }
    }
    Ok(indices)
}

/// The span blamed for an element failure at `level`.
pub(super) fn element_span(elem: &ElemOp, level: Option<usize>, whole: Span) -> Span {
    level.map_or(whole, |level| elem.span_to(level))
}
