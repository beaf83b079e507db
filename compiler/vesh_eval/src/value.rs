//! Runtime values.
//!
//! A closed set of kinds. Lists and maps are reference counted and
//! copy-on-write: [`Value::assoc`] and [`Value::dissoc`] return a new value
//! and leave the receiver alone, so a value captured somewhere else never
//! changes under its holder. Writing a modified container back is the job of
//! whoever owns the variable.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::callable::Callable;
use crate::exception::{ErrorKind, Exception};
use crate::ns::Ns;

#[derive(Clone, Debug)]
pub enum Value {
    String(String),
    Number(f64),
    Bool(bool),
    List(Arc<Vec<Value>>),
    Map(Arc<BTreeMap<String, Value>>),
    Fn(Callable),
    Ns(Ns),
    Exception(Arc<Exception>),
}

impl Value {
    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Arc::new(items))
    }

    pub fn map(entries: BTreeMap<String, Value>) -> Value {
        Value::Map(Arc::new(entries))
    }

    /// Name of the kind, as printed by `kind-of`.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Number(_) => "number",
            Value::Bool(_) => "bool",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Fn(_) => "fn",
            Value::Ns(_) => "ns",
            Value::Exception(_) => "exception",
        }
    }

    /// Truthiness: `$false`, the empty string and exceptions are false.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::String(s) => !s.is_empty(),
            Value::Exception(_) => false,
            _ => true,
        }
    }

    /// Element at `index`.
    ///
    /// Lists take integers (negative counts from the end), maps take string
    /// keys, and strings take character positions.
    pub fn index(&self, index: &Value) -> Result<Value, ErrorKind> {
        match self {
            Value::List(items) => {
                let i = list_position(index, items.len())?;
                Ok(items[i].clone())
            }
            Value::Map(entries) => {
                let key = map_key(index)?;
                entries
                    .get(&key)
                    .cloned()
                    .ok_or(ErrorKind::NoSuchKey(key))
            }
            Value::String(s) => {
                let count = s.chars().count();
                let i = list_position(index, count)?;
                let c = s.chars().nth(i).ok_or(ErrorKind::IndexOutOfRange)?;
                Ok(Value::String(c.to_string()))
            }
            other => Err(ErrorKind::NotIndexable(other.kind())),
        }
    }

    /// Whether [`Value::assoc`] can work on this kind at all.
    pub fn supports_assoc(&self) -> bool {
        matches!(self, Value::List(_) | Value::Map(_))
    }

    /// A copy of this container with `index` replaced by `value`.
    pub fn assoc(&self, index: &Value, value: Value) -> Result<Value, ErrorKind> {
        match self {
            Value::List(items) => {
                let i = list_position(index, items.len())?;
                let mut items = Arc::clone(items);
                Arc::make_mut(&mut items)[i] = value;
                Ok(Value::List(items))
            }
            Value::Map(entries) => {
                let key = map_key(index)?;
                let mut entries = Arc::clone(entries);
                Arc::make_mut(&mut entries).insert(key, value);
                Ok(Value::Map(entries))
            }
            other => Err(ErrorKind::NotAssocable(other.kind())),
        }
    }

    /// A copy of this map without `index`. Removing an absent key is a
    /// no-op.
    pub fn dissoc(&self, index: &Value) -> Result<Value, ErrorKind> {
        match self {
            Value::Map(entries) => {
                let key = map_key(index)?;
                if !entries.contains_key(&key) {
                    return Ok(self.clone());
                }
                let mut entries = Arc::clone(entries);
                Arc::make_mut(&mut entries).remove(&key);
                Ok(Value::Map(entries))
            }
            _ => Err(ErrorKind::NotDissocable),
        }
    }

    /// Call `f` with each element in order until it returns `false`.
    ///
    /// Lists yield their elements, maps their keys, strings their
    /// characters.
    pub fn iterate(&self, mut f: impl FnMut(Value) -> bool) -> Result<(), ErrorKind> {
        match self {
            Value::List(items) => {
                for item in items.iter() {
                    if !f(item.clone()) {
                        break;
                    }
                }
            }
            Value::Map(entries) => {
                for key in entries.keys() {
                    if !f(Value::String(key.clone())) {
                        break;
                    }
                }
            }
            Value::String(s) => {
                for c in s.chars() {
                    if !f(Value::String(c.to_string())) {
                        break;
                    }
                }
            }
            other => return Err(ErrorKind::NotIterable(other.kind())),
        }
        Ok(())
    }

    /// Interpret as a number, for arithmetic and comparison builtins.
    pub fn to_number(&self) -> Result<f64, ErrorKind> {
        match self {
            Value::Number(n) => Ok(*n),
            Value::String(s) => parse_number(s).ok_or_else(|| ErrorKind::WrongArgType {
                want: "number",
                got: self.repr(),
            }),
            other => Err(ErrorKind::WrongArgType {
                want: "number",
                got: other.kind().to_owned(),
            }),
        }
    }

    /// Source-like rendering, used inside containers and for value output.
    pub fn repr(&self) -> String {
        match self {
            Value::String(s) => quote(s),
            _ => self.to_string(),
        }
    }

    /// Convert parsed JSON. Numbers become strings and `null` becomes the
    /// empty string.
    pub fn from_json(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::String(String::new()),
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::String(n.to_string()),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::list(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(entries) => Value::map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Value::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for Value {
    /// Plain rendering: strings print as-is. This is what `echo` writes.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::Bool(true) => f.write_str("$true"),
            Value::Bool(false) => f.write_str("$false"),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    f.write_str(&item.repr())?;
                }
                f.write_str("]")
            }
            Value::Map(entries) => {
                if entries.is_empty() {
                    return f.write_str("[&]");
                }
                f.write_str("[")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "&{}={}", quote(k), v.repr())?;
                }
                f.write_str("]")
            }
            Value::Fn(callable) => write!(f, "{callable}"),
            Value::Ns(_) => f.write_str("<ns>"),
            Value::Exception(exc) => write!(f, "<exception: {exc}>"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Fn(a), Value::Fn(b)) => a == b,
            (Value::Ns(a), Value::Ns(b)) => a.ptr_eq(b),
            (Value::Exception(a), Value::Exception(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x") {
        #[allow(
            clippy::cast_precision_loss,
            reason = "shell numbers are doubles; large hex literals round"
        )]
        return i64::from_str_radix(hex, 16).ok().map(|n| n as f64);
    }
    s.parse().ok()
}

/// Integers print without a fractional part.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_owned()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { '+' } else { '-' };
        format!("{sign}Inf")
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        // `+ 0.0` turns -0 into 0.
        format!("{:.0}", n + 0.0)
    } else {
        n.to_string()
    }
}

/// Resolve a list index against `len`, counting negatives from the end.
fn list_position(index: &Value, len: usize) -> Result<usize, ErrorKind> {
    let n = match index {
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| ErrorKind::BadIndex(index.repr()))?,
        Value::Number(n) if n.fract() == 0.0 => {
            #[allow(
                clippy::cast_possible_truncation,
                reason = "integral and range-checked below"
            )]
            let n = *n as i64;
            n
        }
        other => return Err(ErrorKind::BadIndex(other.repr())),
    };
    let len = i64::try_from(len).map_err(|_| ErrorKind::IndexOutOfRange)?;
    let n = if n < 0 { n + len } else { n };
    if n < 0 || n >= len {
        return Err(ErrorKind::IndexOutOfRange);
    }
    usize::try_from(n).map_err(|_| ErrorKind::IndexOutOfRange)
}

pub(crate) fn map_key(index: &Value) -> Result<String, ErrorKind> {
    match index {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(format_number(*n)),
        other => Err(ErrorKind::WrongArgType {
            want: "string map key",
            got: other.kind().to_owned(),
        }),
    }
}

/// Quote a string unless it reads back as the same bareword.
fn quote(s: &str) -> String {
    let bare = !s.is_empty()
        && s.chars().all(|c| {
            c.is_alphanumeric() || matches!(c, '-' | '_' | ':' | '%' | '+' | ',' | '.' | '/' | '@' | '!')
        });
    if bare {
        s.to_owned()
    } else {
        format!("'{}'", s.replace('\'', "''"))
    }
}
