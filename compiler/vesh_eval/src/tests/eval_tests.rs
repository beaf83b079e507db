//! Value expressions, pipelines and output capture.

use pretty_assertions::assert_eq;

use super::{blamed, error_kind, outputs, run, strings};
use crate::{EvalError, ErrorKind};

#[test]
fn compound_is_a_cartesian_product() {
    assert_eq!(
        outputs("put {a,b}{1,2}"),
        strings(&["a1", "a2", "b1", "b2"])
    );
    assert_eq!(outputs("x = mid; put pre$x'post'"), strings(&["premidpost"]));
    assert_eq!(outputs("put x(put)"), strings(&[]));
}

#[test]
fn compound_rejects_containers() {
    assert_eq!(
        error_kind("put [a]x"),
        ErrorKind::WrongArgType {
            want: "string",
            got: "list".into()
        }
    );
}

#[test]
fn explode_spreads_elements() {
    assert_eq!(outputs("l = [a b]; put $@l x"), strings(&["a", "b", "x"]));
    assert_eq!(outputs("m = [&k=v]; put $@m"), strings(&["k"]));
    assert_eq!(
        error_kind("x = $true; put $@x"),
        ErrorKind::NotIterable("bool")
    );
}

#[test]
fn indexing() {
    assert_eq!(outputs("s = hello; put $s[1] $s[-1]"), strings(&["e", "o"]));
    assert_eq!(outputs("m = [&k=v]; put $m[k]"), strings(&["v"]));
    assert_eq!(outputs("l = [[a b] [c d]]; put $l[1][0]"), strings(&["c"]));
    // Several keys in one bracket index once each.
    assert_eq!(outputs("l = [a b c]; put $l[0 2]"), strings(&["a", "c"]));
    assert_eq!(outputs("put [a b][1]"), strings(&["b"]));
}

#[test]
fn index_errors_point_at_the_bracket() {
    assert_eq!(
        blamed("l = [a]; put $l[5]"),
        (ErrorKind::IndexOutOfRange, "[5]".to_owned())
    );
    assert_eq!(
        blamed("m = [&]; put $m[k]"),
        (ErrorKind::NoSuchKey("k".into()), "[k]".to_owned())
    );
    assert_eq!(
        blamed("l = [a]; put $l[x]"),
        (ErrorKind::BadIndex("x".into()), "[x]".to_owned())
    );
    assert_eq!(
        blamed("x = $true; put $x[0]"),
        (ErrorKind::NotIndexable("bool"), "[0]".to_owned())
    );
}

#[test]
fn maps_and_lists() {
    assert_eq!(
        outputs("put [&b=2 &a=1] [&] [a 'b c' '']"),
        strings(&["[&a=1 &b=2]", "[&]", "[a 'b c' '']"])
    );
    assert_eq!(
        error_kind("put [&(put a b)=1]"),
        ErrorKind::MustBeOne {
            what: "map key",
            got: 2
        }
    );
}

#[test]
fn capture_collects_values_then_lines() {
    assert_eq!(outputs("put (echo a; put b)"), strings(&["b", "a"]));
    assert_eq!(
        outputs("x = [(put a b)]; put $x[1]"),
        strings(&["b"])
    );
    assert_eq!(outputs("put (print 'no newline')"), strings(&["no newline"]));
}

#[test]
fn byte_output_is_separate() {
    let run = run("echo a b; print c; put v");
    assert_eq!(run.text, "a b\nc");
    assert_eq!(run.ok(), strings(&["v"]));
}

#[test]
fn pipelines_pass_values() {
    assert_eq!(
        outputs("put a b c | each [x]{ put $x$x }"),
        strings(&["aa", "bb", "cc"])
    );
    assert_eq!(outputs("put a b | count"), strings(&["2"]));
    assert_eq!(outputs("put a b | all | all"), strings(&["a", "b"]));
    assert_eq!(outputs("nop | count"), strings(&["0"]));
}

#[test]
fn pipeline_reports_first_failing_stage() {
    assert_eq!(
        error_kind("fail one | fail two"),
        ErrorKind::Fail("one".into())
    );
    assert_eq!(error_kind("put a | fail boom"), ErrorKind::Fail("boom".into()));
}

#[test]
fn callable_heads() {
    assert_eq!(outputs("f = { put called }; $f"), strings(&["called"]));
    assert_eq!(outputs("$put~ direct"), strings(&["direct"]));
    assert_eq!(outputs("builtin:put via-ns"), strings(&["via-ns"]));
    assert_eq!(error_kind("x = a; $x"), ErrorKind::NotCallable("a".into()));
    assert_eq!(
        error_kind("(put a b) c"),
        ErrorKind::MustBeOne {
            what: "callable",
            got: 2
        }
    );
}

#[test]
fn unknown_command() {
    assert_eq!(
        blamed("vesh-test-missing-command a"),
        (
            ErrorKind::CommandNotFound("vesh-test-missing-command".into()),
            "vesh-test-missing-command a".to_owned()
        )
    );
}

#[test]
fn parse_and_compile_errors() {
    assert!(matches!(run("put [a").result, Err(EvalError::Parse { .. })));
    assert!(matches!(run("put $nope").result, Err(EvalError::Compile(_))));
    let Err(err) = run("put $nope").result else {
        panic!("compiled");
    };
    assert_eq!(err.to_string(), "compile error: variable $nope not found");
}

#[test]
fn exception_diagnostic_carries_label() {
    let Err(err) = run("if $true { fail boom }").result else {
        panic!("succeeded");
    };
    assert_eq!(err.to_string(), "exception: boom");
    let diagnostic = err.to_diagnostic();
    assert_eq!(diagnostic.notes, vec!["in if body".to_owned()]);
    assert_eq!(diagnostic.message, "boom");
}

#[cfg(unix)]
mod external {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn captured_output_is_split_into_lines() {
        assert_eq!(
            outputs("put (sh -c 'echo one; echo two')"),
            strings(&["one", "two"])
        );
        assert_eq!(
            outputs("x = (e:sh -c 'echo hi'); put $x"),
            strings(&["hi"])
        );
    }

    #[test]
    fn failure_status_is_an_exception() {
        assert!(matches!(
            error_kind("sh -c 'exit 3'"),
            ErrorKind::ExternalFailed { cmd, .. } if cmd == "sh"
        ));
    }

    #[test]
    fn external_values() {
        assert_eq!(outputs("has-external sh"), strings(&["$true"]));
        assert_eq!(
            outputs("has-external vesh-test-missing-command"),
            strings(&["$false"])
        );
        assert_eq!(outputs("f = (external sh); $f -c 'echo x'"), strings(&[]));
        assert_eq!(run("f = (external sh); $f -c 'echo x'").text, "x\n");
    }
}
