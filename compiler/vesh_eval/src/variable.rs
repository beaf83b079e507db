//! Variables, validators and assignable handles.
//!
//! A [`Variable`] is a shared cell. Scopes hold variables, and a closure
//! holds the variables it captured, so a cell lives as long as its
//! longest-lived holder.
//!
//! Assignment does not always target a cell. [`VarHandle`] covers the three
//! things an lvalue can denote:
//!
//! - a cell,
//! - a process environment variable (`$E:NAME`),
//! - an element inside a container held by a cell (`$d[a][b]`).
//!
//! # Element errors
//!
//! Element operations report failures with a *level*: level `k` means the
//! `k`-th bracket of the target is at fault. The caller turns the level into
//! a span that runs from the start of the target to the end of that
//! bracket.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::builtin;
use crate::exception::ErrorKind;
use crate::ns::Ns;
use crate::value::Value;

/// Constraint on what a variable may hold, chosen by its name suffix.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Validator {
    /// Names ending in `~` hold functions.
    Callable,
    /// Names ending in `:` hold namespaces.
    Namespace,
}

impl Validator {
    pub fn for_name(name: &str) -> Option<Validator> {
        if name.ends_with('~') {
            Some(Validator::Callable)
        } else if name.ends_with(':') {
            Some(Validator::Namespace)
        } else {
            None
        }
    }

    fn check(self, value: &Value) -> Result<(), ErrorKind> {
        match (self, value) {
            (Validator::Callable, Value::Fn(_)) | (Validator::Namespace, Value::Ns(_)) => Ok(()),
            (Validator::Callable, _) => Err(ErrorKind::ShouldBeFn),
            (Validator::Namespace, _) => Err(ErrorKind::ShouldBeNs),
        }
    }
}

struct Cell {
    value: RwLock<Value>,
    validator: Option<Validator>,
    read_only: bool,
}

/// A shared, mutable cell holding one value.
#[derive(Clone)]
pub struct Variable(Arc<Cell>);

impl Variable {
    /// An unconstrained variable.
    pub fn new(value: Value) -> Self {
        Variable(Arc::new(Cell {
            value: RwLock::new(value),
            validator: None,
            read_only: false,
        }))
    }

    /// A variable that refuses every assignment. The builtin namespace is
    /// made of these, so no evaluation can rebind `$true` or `$put~` for
    /// the ones after it.
    pub fn read_only(value: Value) -> Self {
        Variable(Arc::new(Cell {
            value: RwLock::new(value),
            validator: None,
            read_only: true,
        }))
    }

    /// A variable for `name`, with the validator its suffix calls for.
    /// `initial` must already satisfy it.
    pub fn for_name(name: &str, initial: Value) -> Self {
        Variable(Arc::new(Cell {
            value: RwLock::new(initial),
            validator: Validator::for_name(name),
            read_only: false,
        }))
    }

    /// A fresh variable for `name`, holding the empty value of the kind its
    /// suffix asks for: the `nop` builtin for `~`, an empty namespace for
    /// `:`, and `""` otherwise.
    pub fn declare(name: &str) -> Self {
        let initial = match Validator::for_name(name) {
            Some(Validator::Callable) => Value::Fn(builtin::nop_callable()),
            Some(Validator::Namespace) => Value::Ns(Ns::new()),
            None => Value::String(String::new()),
        };
        Variable::for_name(name, initial)
    }

    pub fn get(&self) -> Value {
        self.0.value.read().clone()
    }

    pub fn set(&self, value: Value) -> Result<(), ErrorKind> {
        if self.0.read_only {
            return Err(ErrorKind::ReadOnlyVariable);
        }
        if let Some(validator) = self.0.validator {
            validator.check(&value)?;
        }
        *self.0.value.write() = value;
        Ok(())
    }

    pub fn ptr_eq(&self, other: &Variable) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Variable").field(&self.get().repr()).finish()
    }
}

/// Something a value can be assigned to.
#[derive(Clone, Debug)]
pub enum VarHandle {
    Cell(Variable),
    /// A process environment variable, read and written directly.
    Env(String),
    Element(ElementVar),
}

impl VarHandle {
    /// Current value. An unset environment variable reads as `""`.
    pub fn get(&self) -> Result<Value, ErrorKind> {
        match self {
            VarHandle::Cell(variable) => Ok(variable.get()),
            VarHandle::Env(name) => Ok(Value::String(std::env::var(name).unwrap_or_default())),
            VarHandle::Element(element) => element.get().map_err(|err| err.kind),
        }
    }

    pub fn set(&self, value: Value) -> Result<(), ElementError> {
        match self {
            VarHandle::Cell(variable) => variable.set(value).map_err(ElementError::unplaced),
            VarHandle::Env(name) => set_env(name, &value).map_err(ElementError::unplaced),
            VarHandle::Element(element) => element.set(value),
        }
    }
}

fn check_env_name(name: &str) -> Result<(), ErrorKind> {
    if name.is_empty() || name.contains(|c: char| c == '=' || c == '\0') {
        return Err(ErrorKind::BadEnvName(name.to_owned()));
    }
    Ok(())
}

/// Set a process environment variable. Non-string values are stored in
/// their printed form.
pub fn set_env(name: &str, value: &Value) -> Result<(), ErrorKind> {
    check_env_name(name)?;
    let text = value.to_string();
    if text.contains('\0') {
        return Err(ErrorKind::WrongArgType {
            want: "string without NUL",
            got: value.repr(),
        });
    }
    std::env::set_var(name, text);
    Ok(())
}

pub fn unset_env(name: &str) -> Result<(), ErrorKind> {
    check_env_name(name)?;
    std::env::remove_var(name);
    Ok(())
}

/// A failed element operation, with the bracket it is attributed to.
#[derive(Clone, Debug, PartialEq)]
pub struct ElementError {
    /// 1-based bracket number, or `None` when the failure concerns the
    /// target as a whole (e.g. the base variable rejected the new value).
    pub level: Option<usize>,
    pub kind: ErrorKind,
}

impl ElementError {
    fn at(level: usize, kind: ErrorKind) -> Self {
        ElementError {
            level: Some(level),
            kind,
        }
    }

    fn unplaced(kind: ErrorKind) -> Self {
        ElementError { level: None, kind }
    }
}

/// A virtual variable denoting `base[i1][i2]...`.
///
/// Holds no value of its own. Reading walks the indices from the base's
/// current value; writing rebuilds every container on the path and sets the
/// base.
#[derive(Clone, Debug)]
pub struct ElementVar {
    base: Variable,
    indices: Vec<Value>,
}

/// Build an element handle, checking that the path can be assigned through.
///
/// Every container on the path must support assignment, and every index
/// except the last must already exist. The last may name a new map key.
pub fn make_element(base: Variable, indices: Vec<Value>) -> Result<ElementVar, ElementError> {
    let mut container = base.get();
    for (i, index) in indices.iter().enumerate() {
        let level = i + 1;
        if !container.supports_assoc() {
            return Err(ElementError::at(
                level,
                ErrorKind::NotAssocable(container.kind()),
            ));
        }
        if level < indices.len() {
            container = container
                .index(index)
                .map_err(|kind| ElementError::at(level, kind))?;
        }
    }
    Ok(ElementVar { base, indices })
}

impl ElementVar {
    pub fn get(&self) -> Result<Value, ElementError> {
        let mut value = self.base.get();
        for (i, index) in self.indices.iter().enumerate() {
            value = value
                .index(index)
                .map_err(|kind| ElementError::at(i + 1, kind))?;
        }
        Ok(value)
    }

    /// Replace the element and write the rebuilt container back to the base.
    pub fn set(&self, value: Value) -> Result<(), ElementError> {
        let rebuilt = assoc_path(&self.base.get(), &self.indices, 1, value)?;
        self.base.set(rebuilt).map_err(ElementError::unplaced)
    }
}

fn assoc_path(
    container: &Value,
    indices: &[Value],
    level: usize,
    value: Value,
) -> Result<Value, ElementError> {
    let at = |kind| ElementError::at(level, kind);
    match indices {
        [] => Ok(value),
        [last] => container.assoc(last, value).map_err(at),
        [first, rest @ ..] => {
            let child = container.index(first).map_err(at)?;
            let child = assoc_path(&child, rest, level + 1, value)?;
            container.assoc(first, child).map_err(at)
        }
    }
}

/// Remove `base[i1]...[in]`, writing the rebuilt container back.
pub fn del_element(base: &Variable, indices: &[Value]) -> Result<(), ElementError> {
    let Some((last, path)) = indices.split_last() else {
        return Ok(());
    };
    let mut containers = Vec::with_capacity(path.len());
    let mut container = base.get();
    for (i, index) in path.iter().enumerate() {
        let next = container
            .index(index)
            .map_err(|kind| ElementError::at(i + 1, kind))?;
        containers.push(container);
        container = next;
    }
    let mut value = container
        .dissoc(last)
        .map_err(|kind| ElementError::at(indices.len(), kind))?;
    for (i, (parent, index)) in containers.iter().zip(path).enumerate().rev() {
        value = parent
            .assoc(index, value)
            .map_err(|kind| ElementError::at(i + 1, kind))?;
    }
    base.set(value).map_err(ElementError::unplaced)
}

#[cfg(test)]
mod tests;
