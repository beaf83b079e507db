//! Compilation of assignment targets.
//!
//! A target is a single name (`x`, `@rest`, `ns:x`), an indexed name
//! (`d[a][b]`), or a braced list of those (`{a,b[0],@rest}`). The result is
//! an [`LValuesOp`]: the fixed targets in order, plus the rest target if
//! the last one carries `@`.

use vesh_ir::{Indexing, PrimaryKind, Span};

use super::{parse_variable, CompileResult, Compiler};
use crate::op::{ElemOp, LValue, LValueBody, LValuesOp};

impl Compiler {
    pub(crate) fn lvalues(&mut self, target: &Indexing) -> CompileResult<LValuesOp> {
        if let PrimaryKind::Braced(items) = &target.head.kind {
            if !target.indices.is_empty() {
                return self.error("may not have indices", target.span);
            }
            let mut indexings = Vec::with_capacity(items.len());
            for item in items {
                match item.indexings.as_slice() {
                    [only] => indexings.push(only),
                    _ => return self.error("must be an lvalue", item.span),
                }
            }
            return self.lvalues_multi(&indexings, target.span);
        }
        self.lvalues_multi(&[target], target.span)
    }

    fn lvalues_multi(&mut self, targets: &[&Indexing], span: Span) -> CompileResult<LValuesOp> {
        let mut fixed = Vec::with_capacity(targets.len());
        let mut rest = None;
        for (i, target) in targets.iter().enumerate() {
            let (explode, lvalue) = self.lvalue_one(target)?;
            if explode {
                if i + 1 != targets.len() {
                    return self.error("only the last lvalue may have @", target.span);
                }
                rest = Some(lvalue);
            } else {
                fixed.push(lvalue);
            }
        }
        Ok(LValuesOp { fixed, rest, span })
    }

    /// One target. Returns whether it carries `@`.
    fn lvalue_one(&mut self, target: &Indexing) -> CompileResult<(bool, LValue)> {
        let Some(text) = target.head.as_literal() else {
            return self.error("must be an lvalue", target.span);
        };
        let (explode, ns, name) = parse_variable(text);
        if name.is_empty() {
            return self.error("must be an lvalue", target.span);
        }

        if target.indices.is_empty() {
            if !self.register_variable_set(ns, name) {
                return self.error(
                    "new variables can only be created in local scope",
                    target.span,
                );
            }
            let body = LValueBody::Var {
                ns: ns.to_owned(),
                name: name.to_owned(),
            };
            return Ok((
                explode,
                LValue {
                    body,
                    span: target.span,
                },
            ));
        }

        if explode {
            return self.error("may not have indices", target.span);
        }
        if !self.register_variable_get(ns, name) {
            return self.error(format!("variable ${text} not found"), target.head.span);
        }
        let elem = self.elem_op(target, ns, name)?;
        Ok((
            false,
            LValue {
                body: LValueBody::Element(elem),
                span: target.span,
            },
        ))
    }

    /// `ns:name[..][..]` as an element target. The base must already be
    /// visible.
    pub(crate) fn elem_op(
        &mut self,
        target: &Indexing,
        ns: &str,
        name: &str,
    ) -> CompileResult<ElemOp> {
        let indices = self.index_arrays(&target.indices)?;
        let mut ends = Vec::with_capacity(indices.len() + 1);
        ends.push(target.head.span.end);
        ends.extend(indices.iter().map(|index| index.span.end));
        Ok(ElemOp {
            ns: ns.to_owned(),
            name: name.to_owned(),
            indices,
            span: target.span,
            ends,
        })
    }
}
