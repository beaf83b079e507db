//! Special forms.
//!
//! A command whose head is one of [`SPECIAL_FORMS`] is not a call. Its
//! arguments are syntax: bodies must be written as lambdas, keywords such
//! as `elif` and `in` are matched literally, and names are declared at
//! compile time.
//!
//! | Form | Shape |
//! |------|-------|
//! | `if` | `if c { } [elif c { }]... [else { }]` |
//! | `while` | `while c { }` |
//! | `for` | `for x in iterable { } [else { }]` |
//! | `try` | `try { } [except [e] { }] [else { }] [finally { }]` |
//! | `and`, `or` | `and a b...` |
//! | `fn` | `fn name { }` |
//! | `use` | `use a/b` |
//! | `del` | `del x E:Y d[k]...` |

use vesh_ir::{Compound, Form, PrimaryKind, Span};

use super::{parse_variable, CompileResult, Compiler};
use crate::op::{DelOp, Op, OpBody, TryOp, ValuesOp};

pub const SPECIAL_FORMS: &[&str] = &[
    "and", "del", "fn", "for", "if", "or", "try", "use", "while",
];

pub fn is_special_form(name: &str) -> bool {
    SPECIAL_FORMS.contains(&name)
}

/// Cursor over the arguments of a special form.
struct ArgsWalker<'a> {
    args: &'a [Compound],
    form_end: u32,
    pos: usize,
}

impl<'a> ArgsWalker<'a> {
    fn new(form: &Form, args: &'a [Compound]) -> Self {
        ArgsWalker {
            args,
            form_end: form.span.end,
            pos: 0,
        }
    }

    fn peek(&self) -> Option<&'a Compound> {
        self.args.get(self.pos)
    }

    /// Consume the next argument if it is the literal `word`.
    fn next_is(&mut self, word: &str) -> bool {
        if self.peek().and_then(Compound::as_literal) == Some(word) {
            self.pos += 1;
            true
        } else {
            false
        }
    }
}

impl Compiler {
    pub(crate) fn special_form(
        &mut self,
        name: &str,
        form: &Form,
        head: &Compound,
        args: &[Compound],
    ) -> CompileResult<Op> {
        let body = match name {
            "if" => self.compile_if(form, args)?,
            "while" => self.compile_while(form, args)?,
            "for" => self.compile_for(form, args)?,
            "try" => self.compile_try(form, args)?,
            "and" => OpBody::AndOr {
                args: self.compounds(args)?,
                stop_at: false,
            },
            "or" => OpBody::AndOr {
                args: self.compounds(args)?,
                stop_at: true,
            },
            "fn" => self.compile_fn(form, args)?,
            "use" => self.compile_use(head, args)?,
            "del" => self.compile_del(args)?,
            _ => return self.error(format!("unknown special form {name}"), head.span),
        };
        Ok(Op::new(body, form.span))
    }

    fn next_arg<'a>(&self, walker: &mut ArgsWalker<'a>) -> CompileResult<&'a Compound> {
        match walker.peek() {
            Some(arg) => {
                walker.pos += 1;
                Ok(arg)
            }
            None => self.error("need more arguments", Span::point(walker.form_end)),
        }
    }

    /// The next argument, which must be a lambda, compiled.
    fn next_lambda(&mut self, walker: &mut ArgsWalker<'_>) -> CompileResult<ValuesOp> {
        let arg = self.next_arg(walker)?;
        match arg.as_lambda() {
            Some(lambda) => self.lambda(lambda, arg.span),
            None => self.error("should be a lambda", arg.span),
        }
    }

    /// `word { }` if the next argument is `word`.
    fn lambda_after(
        &mut self,
        walker: &mut ArgsWalker<'_>,
        word: &str,
    ) -> CompileResult<Option<ValuesOp>> {
        if walker.next_is(word) {
            self.next_lambda(walker).map(Some)
        } else {
            Ok(None)
        }
    }

    fn must_end(&self, walker: &ArgsWalker<'_>) -> CompileResult<()> {
        match walker.args.get(walker.pos..) {
            Some([first, .., last]) => self.error("too many arguments", first.span.merge(last.span)),
            Some([only]) => self.error("too many arguments", only.span),
            _ => Ok(()),
        }
    }

    fn compile_if(&mut self, form: &Form, args: &[Compound]) -> CompileResult<OpBody> {
        let mut walker = ArgsWalker::new(form, args);
        let mut branches = Vec::new();
        loop {
            let cond = self.next_arg(&mut walker)?;
            let cond = self.compound(cond)?;
            let body = self.next_lambda(&mut walker)?;
            branches.push((cond, body));
            if !walker.next_is("elif") {
                break;
            }
        }
        let else_body = self.lambda_after(&mut walker, "else")?;
        self.must_end(&walker)?;
        Ok(OpBody::If {
            branches,
            else_body,
        })
    }

    fn compile_while(&mut self, form: &Form, args: &[Compound]) -> CompileResult<OpBody> {
        let mut walker = ArgsWalker::new(form, args);
        let cond = self.next_arg(&mut walker)?;
        let cond = self.compound(cond)?;
        let body = self.next_lambda(&mut walker)?;
        self.must_end(&walker)?;
        Ok(OpBody::While { cond, body })
    }

    fn compile_for(&mut self, form: &Form, args: &[Compound]) -> CompileResult<OpBody> {
        let mut walker = ArgsWalker::new(form, args);
        let var_node = self.next_arg(&mut walker)?;
        let [var_indexing] = var_node.indexings.as_slice() else {
            return self.error("must be an lvalue", var_node.span);
        };
        let var = self.lvalues(var_indexing)?;
        if let Some(rest) = &var.rest {
            return self.error("rest not allowed", rest.span);
        }

        if !walker.next_is("in") {
            let span = walker
                .peek()
                .map_or(Span::point(walker.form_end), |arg| arg.span);
            return self.error("should be \"in\"", span);
        }
        let iterable = self.next_arg(&mut walker)?;
        let iterable = self.compound(iterable)?;
        let body = self.next_lambda(&mut walker)?;
        let else_body = self.lambda_after(&mut walker, "else")?;
        self.must_end(&walker)?;
        Ok(OpBody::For {
            var,
            iterable,
            body,
            else_body,
        })
    }

    fn compile_try(&mut self, form: &Form, args: &[Compound]) -> CompileResult<OpBody> {
        let mut walker = ArgsWalker::new(form, args);
        let body = self.next_lambda(&mut walker)?;

        let mut except_var = None;
        let mut except_body = None;
        if walker.next_is("except") {
            // `except e { }` binds the exception; `except { }` does not.
            if let Some(arg) = walker.peek() {
                if let [only] = arg.indexings.as_slice() {
                    if matches!(only.head.kind, PrimaryKind::Bareword(_)) {
                        walker.pos += 1;
                        let lvalues = self.lvalues(only)?;
                        if let Some(rest) = &lvalues.rest {
                            return self.error("may not use @rest in except variable", rest.span);
                        }
                        except_var = Some(lvalues);
                    }
                }
            }
            except_body = Some(self.next_lambda(&mut walker)?);
        }
        let else_body = self.lambda_after(&mut walker, "else")?;
        let finally_body = self.lambda_after(&mut walker, "finally")?;
        self.must_end(&walker)?;

        Ok(OpBody::Try(Box::new(TryOp {
            body,
            except_var,
            except_body,
            else_body,
            finally_body,
        })))
    }

    fn compile_fn(&mut self, form: &Form, args: &[Compound]) -> CompileResult<OpBody> {
        let mut walker = ArgsWalker::new(form, args);
        let name_node = self.next_arg(&mut walker)?;
        let Some(name) = name_node.as_literal() else {
            return self.error("must be a literal string", name_node.span);
        };
        // Declared before the body is compiled, so the body can recurse.
        self.declare(&format!("{name}~"));

        let body_node = self.next_arg(&mut walker)?;
        let body = match body_node.as_lambda() {
            Some(lambda) => self.lambda(lambda, body_node.span)?,
            None => return self.error("should be a lambda", body_node.span),
        };
        self.must_end(&walker)?;
        Ok(OpBody::Fn {
            name: name.to_owned(),
            body,
        })
    }

    fn compile_use(&mut self, head: &Compound, args: &[Compound]) -> CompileResult<OpBody> {
        let target_node = match args {
            [] => return self.error("lack module name", Span::point(head.span.end)),
            [only] => only,
            [_, extra @ ..] => {
                let first = extra.first().map_or(head.span, |c| c.span);
                let last = extra.last().map_or(head.span, |c| c.span);
                return self.error("superfluous argument(s)", first.merge(last));
            }
        };
        let Some(target) = target_node.as_literal() else {
            return self.error("should be a literal string", target_node.span);
        };

        let name = target.rsplit('/').next().unwrap_or(target);
        let path = target.replace(':', "/");
        self.declare(&format!("{name}:"));
        Ok(OpBody::Use {
            name: name.to_owned(),
            path,
        })
    }

    fn compile_del(&mut self, args: &[Compound]) -> CompileResult<OpBody> {
        let mut ops = Vec::with_capacity(args.len());
        for arg in args {
            let [indexing] = arg.indexings.as_slice() else {
                return self.error("arguments to del must be variable or variable elements", arg.span);
            };
            let text = match &indexing.head.kind {
                PrimaryKind::Variable(_) => {
                    return self.error("arguments to del must drop $", arg.span);
                }
                PrimaryKind::Bareword(text) => text.as_str(),
                _ => {
                    return self.error(
                        "arguments to del must be variable or variable elements",
                        arg.span,
                    );
                }
            };
            if text.starts_with('@') {
                return self.error("arguments to del may not have a leading @", arg.span);
            }
            let (_, ns, name) = parse_variable(text);

            if indexing.indices.is_empty() {
                let op = match ns {
                    "" | "local" => {
                        if !self.local_has(name) {
                            return self.error(format!("no variable ${name} in local scope"), arg.span);
                        }
                        self.undeclare(name);
                        DelOp::Local(name.to_owned())
                    }
                    "E" => DelOp::Env(name.to_owned()),
                    _ => {
                        return self.error("only variables in local: or E: can be deleted", arg.span);
                    }
                };
                ops.push(op);
                continue;
            }

            if !self.register_variable_get(ns, name) {
                return self.error(format!("no variable ${text}"), arg.span);
            }
            ops.push(DelOp::Element(self.elem_op(indexing, ns, name)?));
        }
        Ok(OpBody::Del(ops))
    }
}
