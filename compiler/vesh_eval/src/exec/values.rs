//! Value-producing nodes.

use std::sync::Arc;

use crate::callable::{Callable, Closure};
use crate::exception::{must_be_one, ErrorKind, EvalResult, Unwind};
use crate::frame::Frame;
use crate::ns::Ns;
use crate::op::{IndexOp, LambdaOp, ValuesBody, ValuesOp};
use crate::value::{format_number, map_key, Value};

impl ValuesOp {
    pub fn eval(&self, frame: &Frame) -> EvalResult<Vec<Value>> {
        self.eval_inner(frame)
            .map_err(|err| err.with_context(|| frame.context(self.span)))
    }

    fn eval_inner(&self, frame: &Frame) -> EvalResult<Vec<Value>> {
        match &self.body {
            ValuesBody::Literal(text) => Ok(vec![Value::String(text.clone())]),
            ValuesBody::Variable { explode, ns, name } => {
                let value = frame.must_resolve_var(ns, name)?.get()?;
                if !*explode {
                    return Ok(vec![value]);
                }
                let mut out = Vec::new();
                value.iterate(|item| {
                    out.push(item);
                    true
                })?;
                Ok(out)
            }
            ValuesBody::Index { head, indices } => {
                let mut current = head.eval(frame)?;
                for index in indices {
                    current = index_all(&current, index, frame)?;
                }
                Ok(current)
            }
            ValuesBody::List(items) => Ok(vec![Value::list(eval_all(items, frame)?)]),
            ValuesBody::Map(pairs) => {
                let mut entries = std::collections::BTreeMap::new();
                for (key, value) in pairs {
                    let key = eval_one(key, frame, "map key")?;
                    let value = eval_one(value, frame, "map value")?;
                    entries.insert(map_key(&key)?, value);
                }
                Ok(vec![Value::map(entries)])
            }
            ValuesBody::Lambda(op) => Ok(vec![Value::Fn(make_closure(op, frame, false))]),
            ValuesBody::Capture(op) => {
                let (ports, capture) = frame.ports.capture();
                op.exec(&frame.with_ports(ports))?;
                Ok(capture.finish())
            }
            ValuesBody::Compound(parts) => {
                let mut acc = vec![String::new()];
                for part in parts {
                    let values = part.eval(frame)?;
                    let mut next = Vec::with_capacity(acc.len() * values.len());
                    for prefix in &acc {
                        for value in &values {
                            next.push(format!("{prefix}{}", concat_text(value)?));
                        }
                    }
                    acc = next;
                }
                Ok(acc.into_iter().map(Value::String).collect())
            }
            ValuesBody::Seq(parts) => eval_all(parts, frame),
        }
    }
}

/// All values of `ops`, in order.
pub(crate) fn eval_all(ops: &[ValuesOp], frame: &Frame) -> EvalResult<Vec<Value>> {
    let mut out = Vec::new();
    for op in ops {
        out.extend(op.eval(frame)?);
    }
    Ok(out)
}

/// The single value of `op`.
pub(crate) fn eval_one(op: &ValuesOp, frame: &Frame, what: &'static str) -> EvalResult<Value> {
    let mut values = op.eval(frame)?;
    match values.len() {
        1 => values
            .pop()
            .ok_or_else(|| must_be_one(what, 0)),
        n => Err(must_be_one(what, n).with_context(|| frame.context(op.span))),
    }
}

/// Index every value in `heads` by every value of `index`.
fn index_all(heads: &[Value], index: &IndexOp, frame: &Frame) -> EvalResult<Vec<Value>> {
    let keys = eval_all(&index.items, frame)?;
    let mut out = Vec::with_capacity(heads.len() * keys.len());
    for head in heads {
        for key in &keys {
            let value = head
                .index(key)
                .map_err(|kind| Unwind::from(kind).with_context(|| frame.context(index.span)))?;
            out.push(value);
        }
    }
    Ok(out)
}

/// A closure for `op`, capturing the frame's visible variables.
pub(crate) fn make_closure(op: &LambdaOp, frame: &Frame, is_fn: bool) -> Callable {
    Callable::Closure(Arc::new(Closure {
        params: op.params.clone(),
        rest: op.rest.clone(),
        has_signature: op.has_signature,
        body: Arc::clone(&op.body),
        capture: Ns::overlay(&frame.up, &frame.local),
        src: frame.src.clone(),
        span: op.span,
        is_fn,
    }))
}

fn concat_text(value: &Value) -> Result<String, ErrorKind> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(format_number(*n)),
        other => Err(ErrorKind::WrongArgType {
            want: "string",
            got: other.kind().to_owned(),
        }),
    }
}
