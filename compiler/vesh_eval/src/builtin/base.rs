//! Core builtin functions: output, control flow, predicates, arithmetic
//! and iteration.
#![allow(
    clippy::needless_pass_by_value,
    reason = "every builtin has the BuiltinImpl signature"
)]

use tracing::{debug, warn};

use crate::callable::{CallMode, Callable};
use crate::compiler::is_special_form;
use crate::exception::{self, arity_mismatch, ErrorKind, EvalResult, Flow, Unwind};
use crate::frame::{split_qualified, Frame};
use crate::value::{format_number, Value};

// Argument helpers

/// Exactly `N` arguments.
pub(super) fn require_args<const N: usize>(args: Vec<Value>) -> Result<[Value; N], ErrorKind> {
    <[Value; N]>::try_from(args).map_err(|_| ErrorKind::ArityMismatch)
}

/// A string argument. Numbers are accepted in their printed form.
pub(super) fn require_string(value: &Value) -> Result<String, ErrorKind> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(format_number(*n)),
        other => Err(ErrorKind::WrongArgType {
            want: "string",
            got: other.kind().to_owned(),
        }),
    }
}

fn require_numbers(args: &[Value]) -> Result<Vec<f64>, ErrorKind> {
    args.iter().map(Value::to_number).collect()
}

#[allow(
    clippy::cast_precision_loss,
    reason = "counts beyond 2^53 are not a concern"
)]
fn count_value(n: usize) -> Value {
    Value::Number(n as f64)
}

// Output

pub(super) fn put(frame: &Frame, args: Vec<Value>) -> EvalResult {
    for value in args {
        frame.ports.put(value);
    }
    Ok(())
}

fn joined(args: &[Value]) -> String {
    args.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

pub(super) fn echo(frame: &Frame, args: Vec<Value>) -> EvalResult {
    let mut line = joined(&args);
    line.push('\n');
    frame.ports.write_str(&line);
    Ok(())
}

pub(super) fn print(frame: &Frame, args: Vec<Value>) -> EvalResult {
    frame.ports.write_str(&joined(&args));
    Ok(())
}

pub(super) fn kind_of(frame: &Frame, args: Vec<Value>) -> EvalResult {
    for value in args {
        frame.ports.put(Value::String(value.kind().to_owned()));
    }
    Ok(())
}

// Control flow

pub(super) fn nop(_: &Frame, _: Vec<Value>) -> EvalResult {
    Ok(())
}

pub(super) fn fail(_: &Frame, args: Vec<Value>) -> EvalResult {
    let [message] = require_args::<1>(args)?;
    Err(exception::fail(message.to_string()))
}

pub(super) fn return_(_: &Frame, args: Vec<Value>) -> EvalResult {
    require_args::<0>(args)?;
    Err(Unwind::Flow(Flow::Return))
}

pub(super) fn break_(_: &Frame, args: Vec<Value>) -> EvalResult {
    require_args::<0>(args)?;
    Err(Unwind::Flow(Flow::Break))
}

pub(super) fn continue_(_: &Frame, args: Vec<Value>) -> EvalResult {
    require_args::<0>(args)?;
    Err(Unwind::Flow(Flow::Continue))
}

/// `exit [code]`: run the shutdown hook, then end the process.
pub(super) fn exit(frame: &Frame, args: Vec<Value>) -> EvalResult {
    let code = match args.as_slice() {
        [] => 0,
        [code] => exit_code(code)?,
        _ => return Err(arity_mismatch()),
    };
    if let Some(hook) = &frame.evaler.shutdown {
        if let Err(error) = hook() {
            warn!(%error, "shutdown hook failed");
        }
    }
    debug!(code, "exiting");
    std::process::exit(code)
}

fn exit_code(value: &Value) -> Result<i32, ErrorKind> {
    let n = value.to_number()?;
    let bad = || ErrorKind::WrongArgType {
        want: "integer exit code",
        got: value.repr(),
    };
    if n.fract() != 0.0 || n < f64::from(i32::MIN) || n > f64::from(i32::MAX) {
        return Err(bad());
    }
    #[allow(clippy::cast_possible_truncation, reason = "integral and range-checked")]
    let code = n as i32;
    Ok(code)
}

// Predicates and arithmetic

pub(super) fn not(frame: &Frame, args: Vec<Value>) -> EvalResult {
    let [value] = require_args::<1>(args)?;
    frame.ports.put(Value::Bool(!value.truthy()));
    Ok(())
}

pub(super) fn to_bool(frame: &Frame, args: Vec<Value>) -> EvalResult {
    let [value] = require_args::<1>(args)?;
    frame.ports.put(Value::Bool(value.truthy()));
    Ok(())
}

/// `eq a b ...`: whether all arguments are equal.
pub(super) fn eq(frame: &Frame, args: Vec<Value>) -> EvalResult {
    let all_equal = args.windows(2).all(|pair| pair[0] == pair[1]);
    frame.ports.put(Value::Bool(all_equal));
    Ok(())
}

pub(super) fn num_eq(frame: &Frame, args: Vec<Value>) -> EvalResult {
    let numbers = require_numbers(&args)?;
    #[allow(clippy::float_cmp, reason = "numeric equality is what == means")]
    let all_equal = numbers.windows(2).all(|pair| pair[0] == pair[1]);
    frame.ports.put(Value::Bool(all_equal));
    Ok(())
}

/// `< a b ...`: whether the arguments are strictly increasing.
pub(super) fn less(frame: &Frame, args: Vec<Value>) -> EvalResult {
    let numbers = require_numbers(&args)?;
    let increasing = numbers.windows(2).all(|pair| pair[0] < pair[1]);
    frame.ports.put(Value::Bool(increasing));
    Ok(())
}

pub(super) fn add(frame: &Frame, args: Vec<Value>) -> EvalResult {
    let sum = require_numbers(&args)?.iter().fold(0.0, |sum, n| sum + n);
    frame.ports.put(Value::Number(sum));
    Ok(())
}

/// `- a`: negation. `- a b ...`: `a` minus the rest.
pub(super) fn sub(frame: &Frame, args: Vec<Value>) -> EvalResult {
    let numbers = require_numbers(&args)?;
    let result = match numbers.split_first() {
        None => return Err(arity_mismatch()),
        Some((first, [])) => -first,
        Some((first, rest)) => rest.iter().fold(*first, |diff, n| diff - n),
    };
    frame.ports.put(Value::Number(result));
    Ok(())
}

// Iteration

/// `count`: number of input values. `count $v`: number of elements of `$v`.
pub(super) fn count(frame: &Frame, args: Vec<Value>) -> EvalResult {
    let mut n = 0usize;
    match args.as_slice() {
        [] => frame.ports.for_each_input(|_| -> Result<bool, ErrorKind> {
            n += 1;
            Ok(true)
        })?,
        [value] => value.iterate(|_| {
            n += 1;
            true
        })?,
        _ => return Err(arity_mismatch()),
    }
    frame.ports.put(count_value(n));
    Ok(())
}

/// `all`: pass input values through. `all $v`: output the elements of `$v`.
pub(super) fn all(frame: &Frame, args: Vec<Value>) -> EvalResult {
    match args.as_slice() {
        [] => frame.ports.for_each_input(|value| -> Result<bool, ErrorKind> {
            frame.ports.put(value);
            Ok(true)
        })?,
        [value] => value.iterate(|item| {
            frame.ports.put(item);
            true
        })?,
        _ => return Err(arity_mismatch()),
    }
    Ok(())
}

/// `each $f [$v]`: call `$f` on every input value, or every element of
/// `$v`. `break` and `continue` inside `$f` act on this loop.
pub(super) fn each(frame: &Frame, args: Vec<Value>) -> EvalResult {
    let mut args = args.into_iter();
    let f = match args.next() {
        Some(Value::Fn(f)) => f,
        Some(other) => {
            return Err(ErrorKind::WrongArgType {
                want: "fn",
                got: other.kind().to_owned(),
            }
            .into());
        }
        None => return Err(arity_mismatch()),
    };
    let call = |value: Value| -> EvalResult<bool> {
        match call_once(&f, frame, value) {
            Ok(()) | Err(Unwind::Flow(Flow::Continue)) => Ok(true),
            Err(Unwind::Flow(Flow::Break)) => Ok(false),
            Err(err) => Err(err),
        }
    };
    match (args.next(), args.next()) {
        (None, _) => frame.ports.for_each_input(call),
        (Some(inputs), None) => {
            let mut result = Ok(());
            inputs.iterate(|item| match call(item) {
                Ok(more) => more,
                Err(err) => {
                    result = Err(err);
                    false
                }
            })?;
            result
        }
        _ => Err(arity_mismatch()),
    }
}

fn call_once(f: &Callable, frame: &Frame, value: Value) -> EvalResult {
    f.call(frame, vec![value], CallMode::Command)
}

// Conversion

/// `from-json [text]`: decode a stream of JSON documents from `text`, or
/// from the input values joined by newlines.
pub(super) fn from_json(frame: &Frame, args: Vec<Value>) -> EvalResult {
    let text = match args.as_slice() {
        [text] => require_string(text)?,
        [] => {
            let mut text = String::new();
            frame.ports.for_each_input(|value| -> Result<bool, ErrorKind> {
                text.push_str(&require_string(&value)?);
                text.push('\n');
                Ok(true)
            })?;
            text
        }
        _ => return Err(arity_mismatch()),
    };
    for document in serde_json::Deserializer::from_str(&text).into_iter::<serde_json::Value>() {
        let document = document.map_err(|err| ErrorKind::BadJson(err.to_string()))?;
        frame.ports.put(Value::from_json(document));
    }
    Ok(())
}

// Introspection

/// `resolve name`: what a command named `name` would run.
pub(super) fn resolve(frame: &Frame, args: Vec<Value>) -> EvalResult {
    let [name] = require_args::<1>(args)?;
    let name = require_string(&name)?;
    let resolved = if is_special_form(&name) {
        "special".to_owned()
    } else {
        let (ns, base) = split_qualified(&name);
        match frame.resolve_var(ns, &format!("{base}~")) {
            Some(_) => format!("${name}~"),
            None => format!("(external {name})"),
        }
    };
    frame.ports.put(Value::String(resolved));
    Ok(())
}
