//! Conditionals, switches and exceptions in whole programs

mod common;
use common::{bare, bare_with, compile_error, locals};
use percolate::ast::build::*;
use pretty_assertions::assert_eq;

#[test]
fn test_if_else_statement() {
    let node = if_else(id("a"), vec![call(id("b"), vec![])], vec![call(id("c"), vec![])]);
    assert_eq!(bare(vec![node]), "if (a) {\n  b();\n} else {\n  c();\n}\n");
}

#[test]
fn test_if_as_value_becomes_ternary() {
    let node = assign(id("x"), if_else(id("a"), vec![id("b")], vec![id("c")]));
    assert_eq!(bare(vec![node]), "var x;\n\nx = a ? b : c;\n");
}

#[test]
fn test_unless_inverts_condition() {
    let node = unless(op("==", id("a"), id("b")), vec![call(id("f"), vec![])]);
    assert_eq!(bare(vec![node]), "if (a !== b) {\n  f();\n}\n");
}

#[test]
fn test_switch_in_return_position() {
    let node = switch(
        Some(id("x")),
        vec![(vec![num("1")], vec![id("a")])],
        Some(vec![id("b")]),
    );
    let out = bare_with(vec![assign(id("f"), func(vec![], vec![node]))], locals(&["x"]));
    assert_eq!(
        out,
        "var f;\n\nf = function() {\n  switch (x) {\n    case 1:\n      return a;\n    \
         default:\n      return b;\n  }\n};\n"
    );
}

#[test]
fn test_throw_is_a_statement() {
    let node = throw(new_call(id("Error"), vec![string("boom")]));
    assert_eq!(bare(vec![node]), "throw new Error(\"boom\");\n");
}

#[test]
fn test_break_outside_loop_in_expression() {
    let err = compile_error(vec![call(id("f"), vec![statement("break")])]);
    assert_eq!(err.to_string(), "cannot use a pure statement in an expression");
}
