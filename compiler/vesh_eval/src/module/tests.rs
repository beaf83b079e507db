use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use super::*;
use crate::tests::{run_in, strings};
use crate::{Evaler, EvalerConfig};

/// A library directory holding `files`, given as `(module path, code)`.
fn lib(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (path, code) in files {
        write_module(dir.path(), path, code);
    }
    dir
}

fn write_module(root: &Path, path: &str, code: &str) {
    let file = root.join(format!("{path}.{EXTENSION}"));
    fs::create_dir_all(file.parent().unwrap()).unwrap();
    fs::write(file, code).unwrap();
}

fn evaler(dir: &TempDir) -> Evaler {
    Evaler::new(EvalerConfig::default().with_lib_dir(dir.path()))
}

fn use_error(evaler: &Evaler, code: &str) -> ErrorKind {
    run_in(evaler, code).exception().kind
}

mod loading {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn use_binds_the_namespace() {
        let dir = lib(&[("a", "x = 1; fn f { put from-a }")]);
        assert_eq!(
            run_in(&evaler(&dir), "use a; put $a:x; a:f").ok(),
            strings(&["1", "from-a"])
        );
    }

    #[test]
    fn nested_path_binds_last_segment() {
        let dir = lib(&[("pkg/util", "x = deep")]);
        assert_eq!(
            run_in(&evaler(&dir), "use pkg/util; put $util:x").ok(),
            strings(&["deep"])
        );
    }

    #[test]
    fn module_runs_once() {
        let dir = lib(&[("a", "echo loaded")]);
        let evaler = evaler(&dir);
        let first = run_in(&evaler, "use a; use a");
        assert_eq!(first.text, "loaded\n");
        assert!(first.result.is_ok());
        let second = run_in(&evaler, "use a");
        assert_eq!(second.text, "");
        assert_eq!(evaler.loaded_modules(), strings(&["a"]));
    }

    #[test]
    fn concurrent_stages_load_once_and_see_the_finished_module() {
        let dir = lib(&[("a", "echo loaded; x = done")]);
        let evaler = evaler(&dir);
        let run = run_in(&evaler, "f = { use a; echo $a:x }; $f | $f");
        assert!(run.result.is_ok());
        assert_eq!(run.text, "loaded\ndone\ndone\n");
        assert_eq!(evaler.loaded_modules(), strings(&["a"]));
    }

    #[test]
    fn module_cycle_through_pipeline_stages_terminates() {
        let dir = lib(&[("a", "x = a; f = { use a; echo $a:x }; $f | $f")]);
        let run = run_in(&evaler(&dir), "use a");
        assert!(run.result.is_ok());
        assert_eq!(run.text, "a\na\n");
    }

    #[test]
    fn every_user_shares_one_namespace() {
        let dir = lib(&[("a", "x = 1"), ("b", "use a")]);
        assert_eq!(
            run_in(&evaler(&dir), "use a; use b; a:x = 2; put $b:a:x").ok(),
            strings(&["2"])
        );
    }

    #[test]
    fn mutual_use_terminates() {
        let dir = lib(&[("a", "use b; x = a"), ("b", "use a; x = b")]);
        assert_eq!(
            run_in(&evaler(&dir), "use a; put $a:x $a:b:x").ok(),
            strings(&["a", "b"])
        );
    }

    #[test]
    fn relative_paths_follow_the_using_module() {
        let dir = lib(&[
            ("dir/a", "use ./b; x = $b:y"),
            ("dir/b", "y = sibling"),
            ("dir/c", "use ../top; x = $top:z"),
            ("top", "z = parent"),
        ]);
        let evaler = evaler(&dir);
        assert_eq!(
            run_in(&evaler, "use dir/a; use dir/c; put $a:x $c:x").ok(),
            strings(&["sibling", "parent"])
        );
        assert_eq!(
            evaler.loaded_modules(),
            strings(&["dir/a", "dir/b", "dir/c", "top"])
        );
    }

    #[test]
    fn bundled_modules() {
        let config = EvalerConfig::default().with_bundled("std/greet", "fn hi { put hello }");
        let evaler = Evaler::new(config);
        assert_eq!(
            run_in(&evaler, "use std/greet; greet:hi").ok(),
            strings(&["hello"])
        );

        // A library file shadows the bundled module of the same path.
        let dir = lib(&[("std/greet", "fn hi { put shadowed }")]);
        let config = EvalerConfig::default()
            .with_lib_dir(dir.path())
            .with_bundled("std/greet", "fn hi { put hello }")
            .with_bundled("std/other", "x = bundled");
        let evaler = Evaler::new(config);
        assert_eq!(
            run_in(&evaler, "use std/greet; use std/other; greet:hi; put $other:x").ok(),
            strings(&["shadowed", "bundled"])
        );
    }
}

mod failures {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn relative_use_outside_module() {
        let dir = lib(&[("a", "")]);
        assert_eq!(
            use_error(&evaler(&dir), "use ./a"),
            ErrorKind::RelativeUseNotFromModule
        );
    }

    #[test]
    fn escaping_the_library() {
        let dir = lib(&[("a", "use ../../x")]);
        assert_eq!(use_error(&evaler(&dir), "use a"), ErrorKind::ModuleOutsideLib);
    }

    #[test]
    fn missing_module() {
        let dir = lib(&[]);
        let expected_path = dir.path().join("nope.vesh").display().to_string();
        assert_eq!(
            use_error(&evaler(&dir), "use nope"),
            ErrorKind::ModuleNotFound {
                name: "nope".into(),
                path: expected_path
            }
        );
    }

    #[test]
    fn no_lib_dir() {
        let evaler = Evaler::new(EvalerConfig::default());
        assert_eq!(use_error(&evaler, "use nope"), ErrorKind::NoLibDir);
    }

    #[test]
    fn parse_and_compile_errors_name_the_file() {
        let dir = lib(&[("bad/parse", "put [a"), ("bad/compile", "put $nope")]);
        let evaler = evaler(&dir);
        let ErrorKind::LoadFailed(message) = use_error(&evaler, "use bad/parse") else {
            panic!("expected a load failure");
        };
        assert!(message.contains("parse.vesh: parse error"), "{message}");
        let ErrorKind::LoadFailed(message) = use_error(&evaler, "use bad/compile") else {
            panic!("expected a load failure");
        };
        assert!(
            message.ends_with("compile.vesh: compile error: variable $nope not found"),
            "{message}"
        );
    }

    #[test]
    fn failed_load_can_be_retried() {
        let dir = lib(&[("a", "fail broken")]);
        let evaler = evaler(&dir);
        assert_eq!(use_error(&evaler, "use a"), ErrorKind::Fail("broken".into()));
        assert_eq!(evaler.loaded_modules(), Vec::<String>::new());

        write_module(dir.path(), "a", "x = fixed");
        assert_eq!(run_in(&evaler, "use a; put $a:x").ok(), strings(&["fixed"]));
    }

    #[test]
    fn modules_cannot_rebind_builtins() {
        let dir = lib(&[("evil", "put~ = { echo hijacked }"), ("good", "x = $true")]);
        let evaler = evaler(&dir);
        assert_eq!(use_error(&evaler, "use evil"), ErrorKind::ReadOnlyVariable);
        let run = run_in(&evaler, "use good; put $good:x ok");
        assert_eq!(run.text, "");
        assert_eq!(run.ok(), strings(&["$true", "ok"]));
    }

    #[test]
    fn failure_inside_module_points_into_it() {
        let dir = lib(&[("a", "put ok\nfail inner")]);
        let exc = run_in(&evaler(&dir), "use a").exception();
        let context = exc.context.unwrap();
        assert_eq!(context.source.name, "a");
        assert_eq!(&context.source.code[context.span.to_range()], "fail inner");
    }
}

mod paths {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn resolve_plain_and_relative() {
        let top = Source::interactive("");
        let module = Source::module("d/m", "/lib/d/m.vesh", "");
        assert_eq!(resolve_path(&top, "a/b"), Ok("a/b".to_owned()));
        assert_eq!(resolve_path(&top, "a//./b"), Ok("a/b".to_owned()));
        assert_eq!(resolve_path(&module, "./x"), Ok("d/x".to_owned()));
        assert_eq!(resolve_path(&module, "../x"), Ok("x".to_owned()));
        assert_eq!(
            resolve_path(&Source::module("m", "/lib/m.vesh", ""), "./x"),
            Ok("x".to_owned())
        );
    }

    #[test]
    fn resolve_rejects_escapes() {
        let top = Source::interactive("");
        let module = Source::module("m", "/lib/m.vesh", "");
        assert_eq!(resolve_path(&top, "./x"), Err(ErrorKind::RelativeUseNotFromModule));
        assert_eq!(resolve_path(&module, "../x"), Err(ErrorKind::ModuleOutsideLib));
        assert_eq!(resolve_path(&top, "a/../.."), Err(ErrorKind::ModuleOutsideLib));
        assert_eq!(resolve_path(&top, "/etc/x"), Err(ErrorKind::ModuleOutsideLib));
    }

    #[test]
    fn clean_path_cases() {
        let cases = [
            ("a/b/../c", "a/c"),
            ("./a//b/", "a/b"),
            ("a/./b/.", "a/b"),
            ("", "."),
            ("a/..", "."),
            ("..", ".."),
            ("a/../..", ".."),
            ("../../a", "../../a"),
            ("/../a", "/a"),
            ("/", "/"),
        ];
        for (input, expected) in cases {
            assert_eq!(clean_path(input), expected, "{input:?}");
        }
    }
}

#[allow(
    clippy::disallowed_types,
    reason = "proptest macros internally use Arc"
)]
mod proptest_clean_path {
    use super::clean_path;
    use proptest::prelude::*;

    fn path() -> impl Strategy<Value = String> {
        proptest::collection::vec(
            prop_oneof![Just(""), Just("."), Just(".."), Just("a"), Just("bc")],
            0..10,
        )
        .prop_map(|parts| parts.join("/"))
    }

    proptest! {
        #[test]
        fn clean_is_idempotent(p in path()) {
            let once = clean_path(&p);
            prop_assert_eq!(clean_path(&once), once.clone());
        }

        #[test]
        fn clean_has_no_empty_or_dot_segments(p in path()) {
            let cleaned = clean_path(&p);
            if cleaned != "." && cleaned != "/" {
                let body = cleaned.strip_prefix('/').unwrap_or(&cleaned);
                prop_assert!(body.split('/').all(|seg| !seg.is_empty() && seg != "."), "{}", cleaned);
            }
        }

        #[test]
        fn dotdot_only_leads(p in path()) {
            let cleaned = clean_path(&p);
            let segments: Vec<_> = cleaned.split('/').collect();
            let leading = segments.iter().take_while(|seg| **seg == "..").count();
            prop_assert!(segments[leading..].iter().all(|seg| *seg != ".."), "{}", cleaned);
        }
    }
}
