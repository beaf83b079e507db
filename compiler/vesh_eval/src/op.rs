//! The operation tree.
//!
//! The compilers in [`crate::compiler`] turn syntax into these nodes; the
//! executors in [`crate::exec`] run them. Three node families, by what
//! running them yields:
//!
//! | Node | Yields |
//! |------|--------|
//! | [`Op`] | nothing (output goes to the frame's ports) |
//! | [`ValuesOp`] | zero or more values |
//! | [`LValuesOp`] | assignable handles: fixed targets plus an optional rest target |
//!
//! Nodes are immutable once built and shared by `Arc` where a closure needs
//! to outlive the tree that created it.

use std::sync::Arc;

use vesh_ir::Span;

/// A node run for its effects.
#[derive(Debug)]
pub struct Op {
    pub body: OpBody,
    pub span: Span,
}

#[derive(Debug)]
pub enum OpBody {
    /// Pipelines run one after another; the first failure stops the chunk.
    Chunk(Vec<Op>),
    /// Forms run concurrently, connected by value channels.
    Pipeline(Vec<Op>),
    Call {
        head: CallHead,
        args: Vec<ValuesOp>,
    },
    Assign {
        lvalues: LValuesOp,
        values: Vec<ValuesOp>,
    },
    If {
        branches: Vec<(ValuesOp, ValuesOp)>,
        else_body: Option<ValuesOp>,
    },
    While {
        cond: ValuesOp,
        body: ValuesOp,
    },
    For {
        var: LValuesOp,
        iterable: ValuesOp,
        body: ValuesOp,
        else_body: Option<ValuesOp>,
    },
    Try(Box<TryOp>),
    /// `and` (`stop_at == false`) or `or` (`stop_at == true`).
    AndOr {
        args: Vec<ValuesOp>,
        stop_at: bool,
    },
    Fn {
        name: String,
        body: ValuesOp,
    },
    Use {
        name: String,
        path: String,
    },
    Del(Vec<DelOp>),
}

#[derive(Debug)]
pub struct TryOp {
    pub body: ValuesOp,
    pub except_var: Option<LValuesOp>,
    pub except_body: Option<ValuesOp>,
    pub else_body: Option<ValuesOp>,
    pub finally_body: Option<ValuesOp>,
}

#[derive(Debug)]
pub enum CallHead {
    /// A bareword or quoted head, resolved by name when the call runs.
    Literal(String),
    /// Anything else; must evaluate to exactly one callable.
    Expr(ValuesOp),
}

#[derive(Debug)]
pub enum DelOp {
    Local(String),
    Env(String),
    Element(ElemOp),
}

/// A node that evaluates to zero or more values.
#[derive(Debug)]
pub struct ValuesOp {
    pub body: ValuesBody,
    pub span: Span,
}

#[derive(Debug)]
pub enum ValuesBody {
    Literal(String),
    Variable {
        explode: bool,
        ns: String,
        name: String,
    },
    Index {
        head: Box<ValuesOp>,
        indices: Vec<IndexOp>,
    },
    List(Vec<ValuesOp>),
    Map(Vec<(ValuesOp, ValuesOp)>),
    Lambda(Arc<LambdaOp>),
    /// Output capture `( chunk )`.
    Capture(Box<Op>),
    /// Concatenation of adjacent parts, as a cartesian product.
    Compound(Vec<ValuesOp>),
    /// All values of each part, in order: braced lists `{a,b}`.
    Seq(Vec<ValuesOp>),
}

/// One bracketed index: the values of all its items.
#[derive(Debug)]
pub struct IndexOp {
    pub items: Vec<ValuesOp>,
    /// Span of the brackets.
    pub span: Span,
}

#[derive(Debug)]
pub struct LambdaOp {
    pub params: Vec<String>,
    pub rest: Option<String>,
    /// Whether parameters were declared. Without them, a closure takes any
    /// arguments and only sees them as `$args`.
    pub has_signature: bool,
    pub body: Arc<Op>,
    pub span: Span,
}

/// A compiled assignment target: `x`, `@rest`, `d[k]` or `{a,b,@c}`.
#[derive(Debug)]
pub struct LValuesOp {
    pub fixed: Vec<LValue>,
    pub rest: Option<LValue>,
    pub span: Span,
}

#[derive(Debug)]
pub struct LValue {
    pub body: LValueBody,
    pub span: Span,
}

#[derive(Debug)]
pub enum LValueBody {
    Var { ns: String, name: String },
    Element(ElemOp),
}

/// `ns:name[i1][i2]...` as an assignment or deletion target.
#[derive(Debug)]
pub struct ElemOp {
    pub ns: String,
    pub name: String,
    pub indices: Vec<IndexOp>,
    /// The whole target, brackets included.
    pub span: Span,
    /// `ends[0]` is the end of the name; `ends[k]` the end of bracket `k`.
    pub ends: Vec<u32>,
}

impl ElemOp {
    /// The span blamed for a failure at `level` (a 1-based bracket number).
    pub fn span_to(&self, level: usize) -> Span {
        let end = self
            .ends
            .get(level)
            .or(self.ends.last())
            .copied()
            .unwrap_or(self.span.end);
        self.span.with_end(end)
    }
}

impl ValuesOp {
    pub fn new(body: ValuesBody, span: Span) -> Self {
        ValuesOp { body, span }
    }

    pub fn literal(text: impl Into<String>, span: Span) -> Self {
        ValuesOp::new(ValuesBody::Literal(text.into()), span)
    }
}

impl Op {
    pub fn new(body: OpBody, span: Span) -> Self {
        Op { body, span }
    }
}
