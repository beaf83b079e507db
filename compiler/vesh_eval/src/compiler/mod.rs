//! Compilation of syntax trees into operation trees.
//!
//! One pass, top-down. Besides building nodes, the compiler keeps a static
//! scope table: a stack of name sets, one per lambda being compiled, plus
//! the builtin names. It is the only static analysis there is:
//!
//! - Reading `$x` requires `x` to be visible (`variable $x not found`).
//! - Assigning to an unqualified name declares it in the innermost scope,
//!   so later reads in the same unit see it.
//!
//! Compilation stops at the first error.
//!
//! The special-form compiler lives in [`special`] and the assignment-target
//! compiler in [`lvalue`].

mod lvalue;
mod special;

use std::sync::Arc;

use rustc_hash::FxHashSet;
use tracing::trace;
use vesh_ir::{
    Assignment, Chunk, Compound, Form, FormKind, Indexing, Lambda, Pipeline, Primary,
    PrimaryKind, SourceRef, Span,
};

use crate::ns::Ns;
use crate::op::{CallHead, IndexOp, LambdaOp, Op, OpBody, ValuesBody, ValuesOp};

pub use special::{is_special_form, SPECIAL_FORMS};

/// A compile error: a message and the narrowest span it applies to.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct CompileError {
    pub message: String,
    pub span: Span,
    pub src: SourceRef,
}

pub(crate) type CompileResult<T> = Result<T, CompileError>;

/// Compile a parsed unit.
///
/// `globals` are the names already bound in the scope the unit will run
/// in; `builtin` supplies the names visible everywhere.
pub fn compile(
    chunk: &Chunk,
    src: &SourceRef,
    builtin: &Ns,
    globals: &[String],
) -> CompileResult<Op> {
    trace!(source = %src.name, pipelines = chunk.pipelines.len(), "compiling");
    let mut compiler = Compiler {
        scopes: vec![globals.iter().cloned().collect()],
        builtin: builtin.names().into_iter().collect(),
        src: src.clone(),
    };
    compiler.chunk(chunk)
}

/// Split a variable reference (the text after `$`) into
/// `(explode, ns, name)`.
///
/// A trailing `:` belongs to the name (`$m:` is the namespace variable
/// `m:`); otherwise the last `:` separates namespace from name.
pub fn parse_variable(text: &str) -> (bool, &str, &str) {
    let (explode, text) = match text.strip_prefix('@') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let body = text.strip_suffix(':').unwrap_or(text);
    match body.rfind(':') {
        Some(i) => (explode, &text[..i], &text[i + 1..]),
        None => (explode, "", text),
    }
}

pub(crate) struct Compiler {
    scopes: Vec<FxHashSet<String>>,
    builtin: FxHashSet<String>,
    src: SourceRef,
}

impl Compiler {
    pub(crate) fn error<T>(&self, message: impl Into<String>, span: Span) -> CompileResult<T> {
        Err(CompileError {
            message: message.into(),
            span,
            src: self.src.clone(),
        })
    }

    fn outer_scopes(&self) -> impl Iterator<Item = &FxHashSet<String>> {
        self.scopes.iter().rev().skip(1)
    }

    fn visible(&self, name: &str) -> bool {
        self.scopes.iter().any(|scope| scope.contains(name)) || self.builtin.contains(name)
    }

    fn ns_visible(&self, ns: &str) -> bool {
        if self.visible(&format!("{ns}:")) {
            return true;
        }
        match ns.split_once(':') {
            Some((outer, _)) => self.ns_visible(outer),
            None => false,
        }
    }

    /// Whether reading `$ns:name` can succeed.
    pub(crate) fn register_variable_get(&self, ns: &str, name: &str) -> bool {
        match ns {
            "" => self.visible(name),
            "local" => self.scopes.last().is_some_and(|scope| scope.contains(name)),
            "up" => self.outer_scopes().any(|scope| scope.contains(name)),
            "builtin" => self.builtin.contains(name),
            "E" | "e" => true,
            _ => self.ns_visible(ns),
        }
    }

    /// Record an assignment to `$ns:name`; false if it cannot succeed.
    pub(crate) fn register_variable_set(&mut self, ns: &str, name: &str) -> bool {
        match ns {
            "" | "local" => {
                self.declare(name);
                true
            }
            "up" => self.outer_scopes().any(|scope| scope.contains(name)),
            "builtin" => self.builtin.contains(name),
            "E" | "e" => true,
            _ => self.ns_visible(ns),
        }
    }

    pub(crate) fn declare(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_owned());
        }
    }

    pub(crate) fn local_has(&self, name: &str) -> bool {
        self.scopes.last().is_some_and(|scope| scope.contains(name))
    }

    pub(crate) fn undeclare(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.remove(name);
        }
    }

    // Chunk = { Pipeline }

    pub(crate) fn chunk(&mut self, chunk: &Chunk) -> CompileResult<Op> {
        let ops = chunk
            .pipelines
            .iter()
            .map(|pipeline| self.pipeline(pipeline))
            .collect::<CompileResult<Vec<_>>>()?;
        Ok(Op::new(OpBody::Chunk(ops), chunk.span))
    }

    fn pipeline(&mut self, pipeline: &Pipeline) -> CompileResult<Op> {
        let mut ops = pipeline
            .forms
            .iter()
            .map(|form| self.form(form))
            .collect::<CompileResult<Vec<_>>>()?;
        if ops.len() == 1 {
            if let Some(op) = ops.pop() {
                return Ok(op);
            }
        }
        Ok(Op::new(OpBody::Pipeline(ops), pipeline.span))
    }

    fn form(&mut self, form: &Form) -> CompileResult<Op> {
        match &form.kind {
            FormKind::Assign(assignments) => {
                let mut ops = assignments
                    .iter()
                    .map(|assignment| self.assignment(assignment))
                    .collect::<CompileResult<Vec<_>>>()?;
                if ops.len() == 1 {
                    if let Some(op) = ops.pop() {
                        return Ok(op);
                    }
                }
                Ok(Op::new(OpBody::Chunk(ops), form.span))
            }
            FormKind::Command { head, args } => {
                if let Some(name) = head.as_literal() {
                    if is_special_form(name) {
                        trace!(form = name, "special form");
                        return self.special_form(name, form, head, args);
                    }
                    let args = self.compounds(args)?;
                    return Ok(Op::new(
                        OpBody::Call {
                            head: CallHead::Literal(name.to_owned()),
                            args,
                        },
                        form.span,
                    ));
                }
                let head = self.compound(head)?;
                let args = self.compounds(args)?;
                Ok(Op::new(
                    OpBody::Call {
                        head: CallHead::Expr(head),
                        args,
                    },
                    form.span,
                ))
            }
        }
    }

    fn assignment(&mut self, assignment: &Assignment) -> CompileResult<Op> {
        // Values are compiled first: `x = $x` reads the old `x`.
        let values = self.compounds(&assignment.right)?;
        let lvalues = self.lvalues(&assignment.left)?;
        Ok(Op::new(OpBody::Assign { lvalues, values }, assignment.span))
    }

    pub(crate) fn compounds(&mut self, compounds: &[Compound]) -> CompileResult<Vec<ValuesOp>> {
        compounds.iter().map(|c| self.compound(c)).collect()
    }

    // Compound = { Indexing }

    pub(crate) fn compound(&mut self, compound: &Compound) -> CompileResult<ValuesOp> {
        match compound.indexings.as_slice() {
            [] => Ok(ValuesOp::literal("", compound.span)),
            [only] => self.indexing(only),
            many => {
                let parts = many
                    .iter()
                    .map(|indexing| self.indexing(indexing))
                    .collect::<CompileResult<Vec<_>>>()?;
                Ok(ValuesOp::new(ValuesBody::Compound(parts), compound.span))
            }
        }
    }

    // Indexing = Primary { IndexArray }

    fn indexing(&mut self, indexing: &Indexing) -> CompileResult<ValuesOp> {
        let head = self.primary(&indexing.head)?;
        if indexing.indices.is_empty() {
            return Ok(head);
        }
        let indices = self.index_arrays(&indexing.indices)?;
        Ok(ValuesOp::new(
            ValuesBody::Index {
                head: Box::new(head),
                indices,
            },
            indexing.span,
        ))
    }

    pub(crate) fn index_arrays(
        &mut self,
        arrays: &[vesh_ir::IndexArray],
    ) -> CompileResult<Vec<IndexOp>> {
        arrays
            .iter()
            .map(|array| {
                Ok(IndexOp {
                    items: self.compounds(&array.items)?,
                    span: array.span,
                })
            })
            .collect()
    }

    fn primary(&mut self, primary: &Primary) -> CompileResult<ValuesOp> {
        let span = primary.span;
        let body = match &primary.kind {
            PrimaryKind::Bareword(text)
            | PrimaryKind::SingleQuoted(text)
            | PrimaryKind::DoubleQuoted(text) => ValuesBody::Literal(text.clone()),
            PrimaryKind::Variable(text) => {
                let (explode, ns, name) = parse_variable(text);
                if !self.register_variable_get(ns, name) {
                    let shown = text.strip_prefix('@').unwrap_or(text);
                    return self.error(format!("variable ${shown} not found"), span);
                }
                ValuesBody::Variable {
                    explode,
                    ns: ns.to_owned(),
                    name: name.to_owned(),
                }
            }
            PrimaryKind::OutputCapture(chunk) => ValuesBody::Capture(Box::new(self.chunk(chunk)?)),
            PrimaryKind::List(items) => ValuesBody::List(self.compounds(items)?),
            PrimaryKind::Map(pairs) => ValuesBody::Map(
                pairs
                    .iter()
                    .map(|pair| Ok((self.compound(&pair.key)?, self.compound(&pair.value)?)))
                    .collect::<CompileResult<Vec<_>>>()?,
            ),
            PrimaryKind::Lambda(lambda) => return self.lambda(lambda, span),
            PrimaryKind::Braced(items) => ValuesBody::Seq(self.compounds(items)?),
        };
        Ok(ValuesOp::new(body, span))
    }

    /// Compile a lambda in a scope of its own: parameters, the rest
    /// parameter, and `$args`.
    pub(crate) fn lambda(&mut self, lambda: &Lambda, span: Span) -> CompileResult<ValuesOp> {
        let mut params = Vec::new();
        let mut rest = None;
        for (i, param) in lambda.params.iter().enumerate() {
            match param.name.strip_prefix('@') {
                Some(name) => {
                    if i + 1 != lambda.params.len() {
                        return self.error("only the last parameter may have @", param.span);
                    }
                    rest = Some(name.to_owned());
                }
                None => params.push(param.name.clone()),
            }
        }

        let mut scope: FxHashSet<String> = params.iter().cloned().collect();
        scope.extend(rest.clone());
        scope.insert("args".to_owned());
        self.scopes.push(scope);
        let body = self.chunk(&lambda.body);
        self.scopes.pop();

        Ok(ValuesOp::new(
            ValuesBody::Lambda(Arc::new(LambdaOp {
                params,
                rest,
                has_signature: !lambda.params.is_empty(),
                body: Arc::new(body?),
                span,
            })),
            span,
        ))
    }
}

#[cfg(test)]
mod tests;
