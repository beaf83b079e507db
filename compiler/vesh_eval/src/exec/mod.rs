//! Execution of the operation tree.
//!
//! Every node runs against a [`Frame`] and returns an [`EvalResult`]. A
//! failure leaving a node is stamped with that node's span unless an inner
//! node already stamped it, so reports point at the innermost culprit.
//!
//! - [`values`]: nodes that produce values
//! - [`lvalue`]: assignment targets and assignment
//! - [`control`]: special forms

mod control;
mod lvalue;
mod values;

use tracing::trace;

use crate::callable::{CallMode, Callable};
use crate::exception::{must_be_one, ErrorKind, EvalResult};
use crate::frame::Frame;
use crate::op::{CallHead, Op, OpBody, ValuesOp};
use crate::ports::{Ports, ValueSink};
use crate::value::Value;

impl Op {
    pub fn exec(&self, frame: &Frame) -> EvalResult {
        self.exec_inner(frame)
            .map_err(|err| err.with_context(|| frame.context(self.span)))
    }

    fn exec_inner(&self, frame: &Frame) -> EvalResult {
        match &self.body {
            OpBody::Chunk(ops) => ops.iter().try_for_each(|op| op.exec(frame)),
            OpBody::Pipeline(stages) => exec_pipeline(stages, frame),
            OpBody::Call { head, args } => exec_call(head, args, frame),
            OpBody::Assign { lvalues, values } => lvalue::exec_assign(lvalues, values, frame),
            OpBody::If {
                branches,
                else_body,
            } => control::exec_if(branches, else_body.as_ref(), frame),
            OpBody::While { cond, body } => control::exec_while(cond, body, frame),
            OpBody::For {
                var,
                iterable,
                body,
                else_body,
            } => control::exec_for(var, iterable, body, else_body.as_ref(), frame),
            OpBody::Try(op) => control::exec_try(op, frame),
            OpBody::AndOr { args, stop_at } => control::exec_and_or(args, *stop_at, frame),
            OpBody::Fn { name, body } => control::exec_fn(name, body, frame),
            OpBody::Use { name, path } => control::exec_use(name, path, frame),
            OpBody::Del(targets) => control::exec_del(targets, frame),
        }
    }
}

/// Run each stage on its own thread, stage `i`'s value output feeding
/// stage `i + 1`'s input.
///
/// All stages run to completion. The result is the first failure in stage
/// order; a failing stage does not stop its neighbours, it only closes its
/// end of the channels.
fn exec_pipeline(stages: &[Op], frame: &Frame) -> EvalResult {
    trace!(stages = stages.len(), "pipeline");
    let last = stages.len().saturating_sub(1);
    let mut input = frame.ports.input.clone();
    let mut frames = Vec::with_capacity(stages.len());
    for i in 0..stages.len() {
        let (values, next_input) = if i == last {
            (frame.ports.values.clone(), None)
        } else {
            let (tx, rx) = crossbeam::channel::unbounded();
            (ValueSink::Channel(tx), Some(rx))
        };
        frames.push(frame.with_ports(Ports {
            input: std::mem::replace(&mut input, next_input),
            values,
            bytes: frame.ports.bytes.clone(),
        }));
    }

    let results: Vec<EvalResult> = std::thread::scope(|scope| {
        let handles: Vec<_> = stages
            .iter()
            .zip(frames)
            // Each stage owns its frame, so the stage's output channel
            // closes as soon as the stage returns.
            .map(|(stage, stage_frame)| scope.spawn(move || stage.exec(&stage_frame)))
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|_| Err(ErrorKind::Fail("pipeline stage panicked".into()).into()))
            })
            .collect()
    });
    results.into_iter().collect()
}

fn exec_call(head: &CallHead, args: &[ValuesOp], frame: &Frame) -> EvalResult {
    let callable = match head {
        CallHead::Literal(name) => frame.resolve_command(name)?,
        CallHead::Expr(op) => one_callable(op, frame)?,
    };
    let args = values::eval_all(args, frame)?;
    trace!(%callable, args = args.len(), "call");
    callable.call(frame, args, CallMode::Command)
}

/// Evaluate `op`, which must produce exactly one callable.
pub(crate) fn one_callable(op: &ValuesOp, frame: &Frame) -> EvalResult<Callable> {
    let mut values = op.eval(frame)?;
    if values.len() != 1 {
        return Err(must_be_one("callable", values.len()));
    }
    match values.pop() {
        Some(Value::Fn(callable)) => Ok(callable),
        Some(other) => Err(ErrorKind::NotCallable(other.repr()).into()),
        None => Err(must_be_one("callable", 0)),
    }
}

