//! Special forms at run time.
//!
//! Bodies are lambdas. Each is evaluated to a closure and called as a
//! [`CallMode::Block`] in a fork of the current frame, labelled after the
//! part of the form it is (`if body`, `for`, `try finally`, ...).

use std::sync::Arc;

use super::lvalue::{self, element_span};
use super::one_callable;
use super::values::{self, make_closure};
use crate::callable::CallMode;
use crate::exception::{ErrorKind, EvalResult, Exception, Flow, Unwind};
use crate::frame::{qualified, Frame};
use crate::module;
use crate::op::{DelOp, ElemOp, LValuesOp, TryOp, ValuesBody, ValuesOp};
use crate::value::Value;
use crate::variable::{del_element, unset_env, VarHandle, Variable};

fn run_block(body: &ValuesOp, frame: &Frame, label: &str) -> EvalResult {
    let frame = frame.fork(label);
    let callable = one_callable(body, &frame)?;
    callable.call(&frame, Vec::new(), CallMode::Block)
}

/// Whether every value of `cond` is true. No values counts as true.
fn holds(cond: &ValuesOp, frame: &Frame) -> EvalResult<bool> {
    Ok(cond.eval(frame)?.iter().all(Value::truthy))
}

pub(super) fn exec_if(
    branches: &[(ValuesOp, ValuesOp)],
    else_body: Option<&ValuesOp>,
    frame: &Frame,
) -> EvalResult {
    let cond_frame = frame.fork("if cond");
    for (cond, body) in branches {
        if holds(cond, &cond_frame)? {
            return run_block(body, frame, "if body");
        }
    }
    match else_body {
        Some(body) => run_block(body, frame, "if else"),
        None => Ok(()),
    }
}

pub(super) fn exec_while(cond: &ValuesOp, body: &ValuesOp, frame: &Frame) -> EvalResult {
    let cond_frame = frame.fork("while cond");
    let body_frame = frame.fork("while");
    let body = one_callable(body, &body_frame)?;
    while holds(cond, &cond_frame)? {
        match body.call(&body_frame, Vec::new(), CallMode::Block) {
            Ok(()) | Err(Unwind::Flow(Flow::Continue)) => {}
            Err(Unwind::Flow(Flow::Break)) => break,
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

pub(super) fn exec_for(
    var: &LValuesOp,
    iterable: &ValuesOp,
    body: &ValuesOp,
    else_body: Option<&ValuesOp>,
    frame: &Frame,
) -> EvalResult {
    let target = lvalue::eval_lvalues(var, frame)?.single(ErrorKind::OnlyOneVariable)?;
    let iterable_value = values::eval_one(iterable, frame, "iterable")?;
    let body_frame = frame.fork("for");
    let body = one_callable(body, &body_frame)?;

    let mut iterated = false;
    let mut stashed = None;
    iterable_value
        .iterate(|item| {
            iterated = true;
            if let Err(err) = target.set(item, &body_frame) {
                stashed = Some(err);
                return false;
            }
            match body.call(&body_frame, Vec::new(), CallMode::Block) {
                Ok(()) | Err(Unwind::Flow(Flow::Continue)) => true,
                Err(Unwind::Flow(Flow::Break)) => false,
                Err(err) => {
                    stashed = Some(err);
                    false
                }
            }
        })
        .map_err(|kind| Unwind::from(kind).with_context(|| frame.context(iterable.span)))?;

    if let Some(err) = stashed {
        return Err(err);
    }
    match else_body {
        Some(else_body) if !iterated => run_block(else_body, frame, "for else"),
        _ => Ok(()),
    }
}

pub(super) fn exec_try(op: &TryOp, frame: &Frame) -> EvalResult {
    let result = match run_block(&op.body, frame, "try body") {
        Ok(()) => match &op.else_body {
            Some(else_body) => run_block(else_body, frame, "try else"),
            None => Ok(()),
        },
        Err(Unwind::Exception(exc)) => match &op.except_body {
            Some(except_body) => run_except(op.except_var.as_ref(), *exc, except_body, frame),
            None => Err(Unwind::Exception(exc)),
        },
        Err(flow) => Err(flow),
    };

    let Some(finally_body) = &op.finally_body else {
        return result;
    };
    run_block(finally_body, frame, "try finally")?;
    // A successful finally masks an earlier exception but not a signal.
    match result {
        Err(flow @ Unwind::Flow(_)) => Err(flow),
        _ => Ok(()),
    }
}

fn run_except(
    var: Option<&LValuesOp>,
    exc: Exception,
    body: &ValuesOp,
    frame: &Frame,
) -> EvalResult {
    if let Some(var) = var {
        let except_frame = frame.fork("try except");
        let target = lvalue::eval_lvalues(var, &except_frame)?
            .single(ErrorKind::ShouldBeOneVariable)?;
        target.set(Value::Exception(Arc::new(exc)), &except_frame)?;
    }
    run_block(body, frame, "try except")
}

/// `and` and `or`: output the first value whose truth is `stop_at`, or the
/// last value seen.
pub(super) fn exec_and_or(args: &[ValuesOp], stop_at: bool, frame: &Frame) -> EvalResult {
    let mut last = Value::Bool(!stop_at);
    for arg in args {
        for value in arg.eval(frame)? {
            if value.truthy() == stop_at {
                frame.ports.put(value);
                return Ok(());
            }
            last = value;
        }
    }
    frame.ports.put(last);
    Ok(())
}

pub(super) fn exec_fn(name: &str, body: &ValuesOp, frame: &Frame) -> EvalResult {
    let var_name = format!("{name}~");
    // Bound (to `nop`) before the closure is made, so the closure captures
    // its own name.
    let variable = Variable::declare(&var_name);
    frame.local.insert(var_name, variable.clone());
    let closure = match &body.body {
        ValuesBody::Lambda(lambda) => make_closure(lambda, frame, true),
        _ => one_callable(body, frame)?,
    };
    variable.set(Value::Fn(closure))?;
    Ok(())
}

pub(super) fn exec_use(name: &str, path: &str, frame: &Frame) -> EvalResult {
    let ns = module::use_module(frame, path)?;
    let var_name = format!("{name}:");
    let variable = Variable::for_name(&var_name, Value::Ns(ns));
    frame.local.insert(var_name, variable);
    Ok(())
}

pub(super) fn exec_del(targets: &[DelOp], frame: &Frame) -> EvalResult {
    for target in targets {
        match target {
            DelOp::Local(name) => {
                frame.local.remove(name);
            }
            DelOp::Env(name) => unset_env(name)?,
            DelOp::Element(elem) => del_one_element(elem, frame)?,
        }
    }
    Ok(())
}

fn del_one_element(elem: &ElemOp, frame: &Frame) -> EvalResult {
    let base = match frame.resolve_var(&elem.ns, &elem.name) {
        Some(VarHandle::Cell(variable)) => variable,
        Some(_) => {
            return Err(Unwind::from(ErrorKind::NotDissocable)
                .with_context(|| frame.context(elem.span_to(1))));
        }
        None => return Err(ErrorKind::CompilerBug(qualified(&elem.ns, &elem.name)).into()),
    };
    let indices = lvalue::single_indices(elem, frame, || ErrorKind::DelIndexNotSingle)?;
    del_element(&base, &indices).map_err(|err| {
        let span = element_span(elem, err.level, elem.span_to(elem.indices.len()));
        Unwind::from(err.kind).with_context(|| frame.context(span))
    })
}
