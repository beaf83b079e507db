//! Syntax tree.
//!
//! # Shape
//!
//! ```text
//! Chunk     = { Pipeline (newline | ';') }
//! Pipeline  = Form { '|' Form }
//! Form      = Assignment { Assignment }          compact: a=b c[k]=d
//!           | Indexing '=' { Compound }           spaced:  a = b c
//!           | Compound { Compound }               command: head args...
//! Compound  = Indexing { Indexing }               concatenated, no spaces
//! Indexing  = Primary { '[' { Compound } ']' }
//! ```
//!
//! Every node records the byte span it was parsed from. Compilers report
//! errors against these spans, so they must be exact.

use crate::Span;

/// A sequence of pipelines, e.g. a whole file or a lambda body.
#[derive(Clone, Debug, PartialEq)]
pub struct Chunk {
    pub pipelines: Vec<Pipeline>,
    pub span: Span,
}

/// Forms connected by `|`.
#[derive(Clone, Debug, PartialEq)]
pub struct Pipeline {
    pub forms: Vec<Form>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Form {
    pub kind: FormKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum FormKind {
    /// One or more assignments with no command.
    Assign(Vec<Assignment>),
    /// A command: head followed by arguments.
    Command { head: Compound, args: Vec<Compound> },
}

/// `left=right` or `left = right...`.
#[derive(Clone, Debug, PartialEq)]
pub struct Assignment {
    /// The assignable target: a (possibly indexed) name or a braced list.
    pub left: Indexing,
    pub right: Vec<Compound>,
    pub span: Span,
}

/// Indexings written next to each other, evaluated by string concatenation.
#[derive(Clone, Debug, PartialEq)]
pub struct Compound {
    pub indexings: Vec<Indexing>,
    pub span: Span,
}

impl Compound {
    /// The text of this compound if it is a single unindexed string literal
    /// (bareword or quoted).
    pub fn as_literal(&self) -> Option<&str> {
        match self.indexings.as_slice() {
            [only] if only.indices.is_empty() => only.head.as_literal(),
            _ => None,
        }
    }

    /// Like [`Compound::as_literal`] but only for barewords.
    pub fn as_bareword(&self) -> Option<&str> {
        match self.indexings.as_slice() {
            [only] if only.indices.is_empty() => match &only.head.kind {
                PrimaryKind::Bareword(text) => Some(text),
                _ => None,
            },
            _ => None,
        }
    }

    /// The lambda if this compound is exactly one unindexed lambda.
    pub fn as_lambda(&self) -> Option<&Lambda> {
        match self.indexings.as_slice() {
            [only] if only.indices.is_empty() => match &only.head.kind {
                PrimaryKind::Lambda(lambda) => Some(lambda),
                _ => None,
            },
            _ => None,
        }
    }
}

/// A primary followed by zero or more index arrays.
#[derive(Clone, Debug, PartialEq)]
pub struct Indexing {
    pub head: Primary,
    pub indices: Vec<IndexArray>,
    pub span: Span,
}

/// One bracketed index, e.g. `[k]`. The span includes both brackets.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexArray {
    pub items: Vec<Compound>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Primary {
    pub kind: PrimaryKind,
    pub span: Span,
}

impl Primary {
    pub fn as_literal(&self) -> Option<&str> {
        match &self.kind {
            PrimaryKind::Bareword(text)
            | PrimaryKind::SingleQuoted(text)
            | PrimaryKind::DoubleQuoted(text) => Some(text),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PrimaryKind {
    Bareword(String),
    SingleQuoted(String),
    /// Escapes already processed.
    DoubleQuoted(String),
    /// The text after `$`, e.g. `@xs`, `E:HOME`, `f~`.
    Variable(String),
    /// `( chunk )`
    OutputCapture(Chunk),
    /// `[ a b c ]`
    List(Vec<Compound>),
    /// `[&k=v &k2=v2]`; `[&]` is the empty map.
    Map(Vec<MapPair>),
    /// `[params]{ body }` or `{ body }`
    Lambda(Lambda),
    /// `{a,b,c}`
    Braced(Vec<Compound>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct MapPair {
    pub key: Compound,
    pub value: Compound,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Lambda {
    /// Parameter names as written; the last one may start with `@`.
    pub params: Vec<Param>,
    pub body: Chunk,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: String,
    pub span: Span,
}
