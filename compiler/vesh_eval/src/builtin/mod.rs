//! The builtin namespace.
//!
//! Builtin functions are plain Rust functions with the [`BuiltinImpl`]
//! signature, registered in [`BUILTINS`] and bound as `$name~` in the
//! namespace every frame falls back to.

mod base;
pub(crate) mod cmd;

use crate::callable::{BuiltinFn, BuiltinImpl, Callable};
use crate::ns::Ns;
use crate::value::Value;
use crate::variable::Variable;

/// Every builtin function, sorted by name.
pub const BUILTINS: &[(&str, BuiltinImpl)] = &[
    ("+", base::add),
    ("-", base::sub),
    ("<", base::less),
    ("==", base::num_eq),
    ("all", base::all),
    ("bool", base::to_bool),
    ("break", base::break_),
    ("continue", base::continue_),
    ("count", base::count),
    ("each", base::each),
    ("echo", base::echo),
    ("eq", base::eq),
    ("exit", base::exit),
    ("external", cmd::external),
    ("fail", base::fail),
    ("from-json", base::from_json),
    ("has-external", cmd::has_external),
    ("kind-of", base::kind_of),
    ("nop", base::nop),
    ("not", base::not),
    ("print", base::print),
    ("put", base::put),
    ("resolve", base::resolve),
    ("return", base::return_),
    ("search-external", cmd::search_external),
];

/// A fresh builtin namespace.
pub(crate) fn namespace() -> Ns {
    let ns = Ns::new();
    for &(name, imp) in BUILTINS {
        let var_name = format!("{name}~");
        let value = Value::Fn(Callable::Builtin(BuiltinFn::new(name, imp)));
        ns.insert(var_name, Variable::read_only(value));
    }
    ns.insert("true", Variable::read_only(Value::Bool(true)));
    ns.insert("false", Variable::read_only(Value::Bool(false)));
    ns.insert(
        "pid",
        Variable::read_only(Value::String(std::process::id().to_string())),
    );
    ns
}

/// `nop`, as the value a fresh `~` variable starts out with.
pub(crate) fn nop_callable() -> Callable {
    Callable::Builtin(BuiltinFn::new("nop", base::nop))
}
