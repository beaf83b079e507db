use std::collections::BTreeMap;

use pretty_assertions::assert_eq;

use super::*;
use crate::callable::{BuiltinFn, Callable};
use crate::ns::Ns;

fn map(pairs: Vec<(&str, Value)>) -> Value {
    Value::map(
        pairs
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v))
            .collect::<BTreeMap<_, _>>(),
    )
}

fn nested() -> Variable {
    Variable::new(map(vec![
        ("a", map(vec![("b", "old".into()), ("c", "sibling".into())])),
        ("l", Value::list(vec!["0".into(), "1".into()])),
    ]))
}

#[test]
fn test_validators_follow_suffix() {
    assert_eq!(Validator::for_name("f~"), Some(Validator::Callable));
    assert_eq!(Validator::for_name("m:"), Some(Validator::Namespace));
    assert_eq!(Validator::for_name("x"), None);

    let f = Variable::for_name("f~", Value::from(""));
    assert_eq!(f.set("not a fn".into()), Err(ErrorKind::ShouldBeFn));
    let nop = Callable::Builtin(BuiltinFn::new("nop", |_, _| Ok(())));
    assert_eq!(f.set(Value::Fn(nop)), Ok(()));

    let m = Variable::for_name("m:", Value::Ns(Ns::new()));
    assert_eq!(m.set("x".into()), Err(ErrorKind::ShouldBeNs));
    assert_eq!(m.set(Value::Ns(Ns::new())), Ok(()));
}

#[test]
fn test_declare_starts_with_a_valid_value() {
    let f = Variable::declare("f~");
    assert_eq!(f.get(), Value::Fn(builtin::nop_callable()));
    assert!(matches!(Variable::declare("m:").get(), Value::Ns(_)));
    assert_eq!(Variable::declare("x").get(), Value::from(""));
}

#[test]
fn test_read_only_refuses_writes() {
    let v = Variable::read_only(Value::Bool(true));
    assert_eq!(v.set(Value::Bool(false)), Err(ErrorKind::ReadOnlyVariable));
    assert_eq!(v.get(), Value::Bool(true));

    // Element writes go through the base cell too.
    let d = Variable::read_only(map(vec![("k", "v".into())]));
    let element = make_element(d.clone(), vec!["k".into()]).unwrap();
    assert_eq!(
        element.set("changed".into()),
        Err(ElementError {
            level: None,
            kind: ErrorKind::ReadOnlyVariable
        })
    );
    assert_eq!(d.get(), map(vec![("k", "v".into())]));
}

#[test]
fn test_element_set_round_trips_and_keeps_siblings() {
    let d = nested();
    let element = make_element(d.clone(), vec!["a".into(), "b".into()]).unwrap();
    element.set("new".into()).unwrap();

    assert_eq!(element.get(), Ok("new".into()));
    let a = d.get().index(&"a".into()).unwrap();
    assert_eq!(a.index(&"c".into()), Ok("sibling".into()));
    assert_eq!(d.get().index(&"l".into()).unwrap().index(&"1".into()), Ok("1".into()));
}

#[test]
fn test_element_set_new_key() {
    let d = nested();
    let element = make_element(d.clone(), vec!["a".into(), "z".into()]).unwrap();
    element.set("added".into()).unwrap();
    let a = d.get().index(&"a".into()).unwrap();
    assert_eq!(a.index(&"z".into()), Ok("added".into()));
}

#[test]
fn test_element_value_shared_elsewhere_is_unchanged() {
    let d = nested();
    let before = d.get();
    make_element(d.clone(), vec!["l".into(), "0".into()])
        .unwrap()
        .set("zero".into())
        .unwrap();
    assert_eq!(
        before.index(&"l".into()).unwrap().index(&"0".into()),
        Ok("0".into())
    );
}

#[test]
fn test_make_element_error_levels() {
    // Missing intermediate key: the first bracket is at fault.
    let err = make_element(nested(), vec!["nope".into(), "b".into()]).unwrap_err();
    assert_eq!(err.level, Some(1));
    assert_eq!(err.kind, ErrorKind::NoSuchKey("nope".into()));

    // `$d[a][b][x]`: `$d[a][b]` is a string, so the third bracket fails.
    let err = make_element(nested(), vec!["a".into(), "b".into(), "x".into()]).unwrap_err();
    assert_eq!(err.level, Some(3));
    assert_eq!(err.kind, ErrorKind::NotAssocable("string"));

    // Base itself is not a container.
    let err = make_element(Variable::new("s".into()), vec!["0".into()]).unwrap_err();
    assert_eq!(err.level, Some(1));
}

#[test]
fn test_del_element() {
    let d = nested();
    del_element(&d, &["a".into(), "b".into()]).unwrap();
    let a = d.get().index(&"a".into()).unwrap();
    assert_eq!(a, map(vec![("c", "sibling".into())]));
}

#[test]
fn test_del_element_errors() {
    let d = nested();
    let err = del_element(&d, &["missing".into(), "b".into()]).unwrap_err();
    assert_eq!(err.level, Some(1));

    let err = del_element(&d, &["l".into(), "0".into()]).unwrap_err();
    assert_eq!(err.level, Some(2));
    assert_eq!(err.kind, ErrorKind::NotDissocable);
}

#[test]
fn test_element_write_goes_through_base_validator() {
    let ns_var = Variable::for_name("m:", Value::Ns(Ns::new()));
    let err = make_element(ns_var, vec!["x".into()]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotAssocable("ns"));
}

#[test]
fn test_env_handle() {
    let name = "VESH_TEST_ENV_HANDLE";
    let handle = VarHandle::Env(name.to_owned());
    handle.set("value".into()).unwrap();
    assert_eq!(std::env::var(name).as_deref(), Ok("value"));
    assert_eq!(handle.get(), Ok("value".into()));
    unset_env(name).unwrap();
    assert_eq!(handle.get(), Ok("".into()));
}

#[test]
fn test_bad_env_names() {
    assert_eq!(
        set_env("A=B", &"x".into()),
        Err(ErrorKind::BadEnvName("A=B".into()))
    );
    assert_eq!(unset_env(""), Err(ErrorKind::BadEnvName(String::new())));
}
