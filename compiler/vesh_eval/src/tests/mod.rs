//! End-to-end tests: source text in, captured output or exception out.
//!
//! Each helper runs code through a fresh [`Evaler`] (or a caller-supplied
//! one) with both output streams captured.

mod eval_tests;

use std::sync::Arc;

use vesh_ir::Source;

use crate::{ErrorKind, EvalError, Evaler, EvalerConfig, Exception, Ports, Value};

pub(crate) struct Run {
    pub values: Vec<Value>,
    pub text: String,
    pub result: Result<(), EvalError>,
}

impl Run {
    /// Value output in printed form. Fails the test on any error.
    pub(crate) fn ok(self) -> Vec<String> {
        if let Err(err) = self.result {
            panic!("unexpected failure: {err}");
        }
        self.values.iter().map(ToString::to_string).collect()
    }

    pub(crate) fn exception(self) -> Exception {
        match self.result {
            Err(EvalError::Exception(exc)) => exc,
            Err(other) => panic!("expected an exception, got {other}"),
            Ok(()) => panic!("expected an exception, got success"),
        }
    }
}

pub(crate) fn run_in(evaler: &Evaler, code: &str) -> Run {
    let (ports, capture) = Ports::stdio().capture();
    let result = evaler.eval_with_ports(Arc::new(Source::interactive(code)), ports);
    let (values, text) = capture.finish_split();
    Run {
        values,
        text,
        result,
    }
}

pub(crate) fn run(code: &str) -> Run {
    run_in(&Evaler::new(EvalerConfig::default()), code)
}

/// Value output of `code`, which must succeed.
pub(crate) fn outputs(code: &str) -> Vec<String> {
    run(code).ok()
}

pub(crate) fn error_kind(code: &str) -> ErrorKind {
    run(code).exception().kind
}

/// The error `code` fails with, and the source text it is blamed on.
pub(crate) fn blamed(code: &str) -> (ErrorKind, String) {
    let exc = run(code).exception();
    let Some(context) = exc.context else {
        panic!("{code:?}: exception has no position");
    };
    let text = context
        .source
        .code
        .get(context.span.to_range())
        .unwrap_or_default()
        .to_owned();
    (exc.kind, text)
}

pub(crate) fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}
