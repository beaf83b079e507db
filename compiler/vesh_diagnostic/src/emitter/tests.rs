use std::sync::Arc;

use pretty_assertions::assert_eq;
use vesh_ir::{Source, Span};

use super::*;

fn render(diagnostic: &Diagnostic) -> String {
    let mut emitter = TerminalEmitter::with_color_mode(Vec::new(), ColorMode::Never, false);
    emitter.emit(diagnostic).unwrap();
    String::from_utf8(emitter.into_inner()).unwrap()
}

#[test]
fn test_emit_with_snippet() {
    let source = Arc::new(Source::interactive("put $x"));
    let diagnostic = Diagnostic::new(Severity::CompileError, "variable $x not found")
        .with_source(source, Span::new(4, 6));
    assert_eq!(
        render(&diagnostic),
        "compile error: variable $x not found\n \
         --> [interactive]:1:5\n  \
         |\n\
         1 | put $x\n  \
         |     ^^\n"
    );
}

#[test]
fn test_emit_point_span_gets_one_caret() {
    let source = Arc::new(Source::interactive("use"));
    let diagnostic = Diagnostic::new(Severity::CompileError, "lack module name")
        .with_source(source, Span::point(3));
    let rendered = render(&diagnostic);
    assert!(rendered.ends_with("1 | use\n  |    ^\n"), "{rendered}");
}

#[test]
fn test_emit_second_line() {
    let source = Arc::new(Source::file("a.vsh", "put a\nfail boom"));
    let diagnostic = Diagnostic::new(Severity::Exception, "boom")
        .with_source(source, Span::new(6, 15))
        .with_note("in call to fail");
    let rendered = render(&diagnostic);
    assert!(rendered.contains("--> a.vsh:2:1\n"), "{rendered}");
    assert!(rendered.contains("2 | fail boom\n  | ^^^^^^^^^\n"), "{rendered}");
    assert!(rendered.ends_with("  = note: in call to fail\n"), "{rendered}");
}

#[test]
fn test_emit_without_source() {
    let diagnostic = Diagnostic::new(Severity::Exception, "cannot read script");
    assert_eq!(render(&diagnostic), "exception: cannot read script\n");
}

#[test]
fn test_color_mode() {
    assert!(ColorMode::Auto.should_use_colors(true));
    assert!(!ColorMode::Auto.should_use_colors(false));
    assert!(ColorMode::Always.should_use_colors(false));
    assert!(!ColorMode::Never.should_use_colors(true));
}
