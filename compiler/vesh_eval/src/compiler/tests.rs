use std::sync::Arc;

use pretty_assertions::assert_eq;
use vesh_ir::Source;

use super::*;
use crate::builtin;
use crate::op::{DelOp, LValueBody};

fn compile_code(code: &str) -> CompileResult<Op> {
    let source = Arc::new(Source::interactive(code));
    let chunk = match vesh_parse::parse(&source.name, &source.code) {
        Ok(chunk) => chunk,
        Err(err) => panic!("parse({code:?}) failed: {err}"),
    };
    compile(&chunk, &source, &builtin::namespace(), &[])
}

/// The first op of a one-pipeline unit.
fn only_op(code: &str) -> Op {
    let op = match compile_code(code) {
        Ok(op) => op,
        Err(err) => panic!("compile({code:?}) failed: {err}"),
    };
    match op.body {
        OpBody::Chunk(mut ops) if ops.len() == 1 => ops.remove(0),
        other => panic!("expected one pipeline, got {other:?}"),
    }
}

/// The message of the compile error and the text its span covers.
fn compile_error(code: &str) -> (String, String) {
    let Err(err) = compile_code(code) else {
        panic!("{code:?} compiled");
    };
    let text = code.get(err.span.to_range()).unwrap_or_default().to_owned();
    (err.message, text)
}

#[test]
fn test_parse_variable() {
    assert_eq!(parse_variable("x"), (false, "", "x"));
    assert_eq!(parse_variable("@xs"), (true, "", "xs"));
    assert_eq!(parse_variable("E:HOME"), (false, "E", "HOME"));
    assert_eq!(parse_variable("a:b:c"), (false, "a:b", "c"));
    assert_eq!(parse_variable("m:"), (false, "", "m:"));
    assert_eq!(parse_variable("a:m:"), (false, "a", "m:"));
    assert_eq!(parse_variable("f~"), (false, "", "f~"));
}

#[test]
fn test_unknown_variable() {
    assert_eq!(
        compile_error("put $nope"),
        ("variable $nope not found".to_owned(), "$nope".to_owned())
    );
    assert_eq!(
        compile_error("put $@nope"),
        ("variable $nope not found".to_owned(), "$@nope".to_owned())
    );
}

#[test]
fn test_assignment_declares() {
    assert!(compile_code("x = 1; put $x").is_ok());
    assert!(compile_code("{a,@b} = 1 2; put $a $@b").is_ok());
    // The value is compiled before the target is declared.
    assert_eq!(
        compile_error("x = $x").0,
        "variable $x not found".to_owned()
    );
}

#[test]
fn test_builtins_and_env_visible() {
    assert!(compile_code("put $true $pid $E:HOME $builtin:put~").is_ok());
}

#[test]
fn test_lambda_scope() {
    assert!(compile_code("f = [a @rest]{ put $a $rest $args }").is_ok());
    // Variables declared inside a lambda stay there.
    assert_eq!(
        compile_error("f = { y = 1 }; put $y").0,
        "variable $y not found".to_owned()
    );
    assert_eq!(
        compile_error("f = [@a b]{ }"),
        ("only the last parameter may have @".to_owned(), "@a".to_owned())
    );
}

#[test]
fn test_up_and_local_scopes() {
    assert!(compile_code("x = 1; f = { put $up:x }").is_ok());
    assert_eq!(
        compile_error("x = 1; f = { put $local:x }").0,
        "variable $local:x not found".to_owned()
    );
    assert_eq!(
        compile_error("up:z = 1"),
        (
            "new variables can only be created in local scope".to_owned(),
            "up:z".to_owned()
        )
    );
}

#[test]
fn test_lvalue_errors() {
    assert_eq!(
        compile_error("{a,b}[0] = x"),
        ("may not have indices".to_owned(), "{a,b}[0]".to_owned())
    );
    assert_eq!(
        compile_error("{@a,b} = x y"),
        ("only the last lvalue may have @".to_owned(), "@a".to_owned())
    );
    assert_eq!(
        compile_error("d[k] = x"),
        ("variable $d not found".to_owned(), "d".to_owned())
    );
}

#[test]
fn test_element_target_ends() {
    let op = match compile_code("d = [&]; d[a][bc] = x").map(|op| op.body) {
        Ok(OpBody::Chunk(mut ops)) => ops.remove(1),
        other => panic!("unexpected {other:?}"),
    };
    let OpBody::Assign { lvalues, .. } = op.body else {
        panic!("not an assignment");
    };
    let LValueBody::Element(elem) = &lvalues.fixed[0].body else {
        panic!("not an element target");
    };
    // "d = [&]; " is 9 bytes.
    assert_eq!(elem.span, Span::new(9, 17));
    assert_eq!(elem.ends, vec![10, 13, 17]);
    assert_eq!(elem.span_to(1), Span::new(9, 13));
    assert_eq!(elem.span_to(2), Span::new(9, 17));
}

#[test]
fn test_single_form_pipeline_unwrapped() {
    assert!(matches!(only_op("put a").body, OpBody::Call { .. }));
    assert!(matches!(
        only_op("put a | put b").body,
        OpBody::Pipeline(stages) if stages.len() == 2
    ));
}

#[test]
fn test_special_form_arity() {
    assert_eq!(
        compile_error("if"),
        ("need more arguments".to_owned(), String::new())
    );
    assert_eq!(
        compile_error("if $true put"),
        ("should be a lambda".to_owned(), "put".to_owned())
    );
    assert_eq!(
        compile_error("while $true { } extra stuff"),
        ("too many arguments".to_owned(), "extra stuff".to_owned())
    );
}

#[test]
fn test_for_errors() {
    assert_eq!(
        compile_error("for @x in [a] { }"),
        ("rest not allowed".to_owned(), "@x".to_owned())
    );
    assert_eq!(
        compile_error("for x of [a] { }"),
        ("should be \"in\"".to_owned(), "of".to_owned())
    );
    assert!(compile_code("for x in [a] { put $x } else { }").is_ok());
}

#[test]
fn test_try_shapes() {
    assert!(compile_code("try { } except e { put $e } else { } finally { }").is_ok());
    assert!(compile_code("try { } except { } finally { }").is_ok());
    assert!(compile_code("try { } finally { }").is_ok());
    assert_eq!(
        compile_error("try { } except @e { }"),
        (
            "may not use @rest in except variable".to_owned(),
            "@e".to_owned()
        )
    );
}

#[test]
fn test_fn_declares_name() {
    assert!(compile_code("fn f { f }; f; put $f~").is_ok());
    assert_eq!(
        compile_error("fn $true { }"),
        ("must be a literal string".to_owned(), "$true".to_owned())
    );
    assert_eq!(
        compile_error("fn 'f'x { }"),
        ("must be a literal string".to_owned(), "'f'x".to_owned())
    );
    assert_eq!(
        compile_error("fn f put"),
        ("should be a lambda".to_owned(), "put".to_owned())
    );
}

#[test]
fn test_use_forms() {
    let op = only_op("use a:b/c");
    let OpBody::Use { name, path } = op.body else {
        panic!("not a use");
    };
    assert_eq!((name.as_str(), path.as_str()), ("c", "a/b/c"));
    assert!(compile_code("use lib/m; put $m:x").is_ok());

    assert_eq!(compile_error("use"), ("lack module name".to_owned(), String::new()));
    assert_eq!(
        compile_error("use a b c"),
        ("superfluous argument(s)".to_owned(), "b c".to_owned())
    );
    assert_eq!(
        compile_error("use (put a)"),
        ("should be a literal string".to_owned(), "(put a)".to_owned())
    );
}

#[test]
fn test_del_forms() {
    let op = only_op("del E:X");
    assert!(matches!(&op.body, OpBody::Del(targets) if matches!(targets[..], [DelOp::Env(_)])));

    assert!(compile_code("x = 1; del x").is_ok());
    assert!(compile_code("x = 1; del local:x").is_ok());
    assert!(compile_code("d = [&a=1]; del d[a]").is_ok());
    // Deleting undeclares.
    assert_eq!(
        compile_error("x = 1; del x; put $x").0,
        "variable $x not found".to_owned()
    );

    let cases = [
        ("x = 1; del $x", "arguments to del must drop $", "$x"),
        ("del [a]", "arguments to del must be variable or variable elements", "[a]"),
        ("del a'b'", "arguments to del must be variable or variable elements", "a'b'"),
        ("x = 1; del @x", "arguments to del may not have a leading @", "@x"),
        ("del nope", "no variable $nope in local scope", "nope"),
        ("x = 1; del up:x", "only variables in local: or E: can be deleted", "up:x"),
        ("del d[a]", "no variable $d", "d[a]"),
    ];
    for (code, message, text) in cases {
        assert_eq!(
            compile_error(code),
            (message.to_owned(), text.to_owned()),
            "{code:?}"
        );
    }
}

#[test]
fn test_special_form_names() {
    for name in SPECIAL_FORMS {
        assert!(is_special_form(name));
    }
    assert!(!is_special_form("put"));
}
