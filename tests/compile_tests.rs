//! Whole-program lowering: declarations, wrappers, soaks and operators

mod common;
use common::{bare, bare_with, locals};
use percolate::ast::build::*;
use percolate::{compile, CompileOptions, VERSION};
use pretty_assertions::assert_eq;

mod program {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_declarations_follow_first_use() {
        let out = bare(vec![assign(id("b"), num("1")), assign(id("a"), id("b"))]);
        assert_eq!(out, "var b, a;\n\nb = 1;\n\na = b;\n");
    }

    #[test]
    fn test_top_level_wrapper() {
        let out = compile(vec![call(id("f"), vec![])], &CompileOptions::default()).unwrap();
        assert_eq!(out, "(function() {\n  f();\n\n}).call(this);\n");
    }

    #[test]
    fn test_header_comes_first() {
        let options = CompileOptions::default().with_header(true);
        let out = bare_with(vec![id("a")], options);
        assert_eq!(out, format!("// Generated by percolate {}\na;\n", VERSION));
    }

    #[test]
    fn test_known_locals_are_not_redeclared() {
        let out = bare_with(vec![assign(id("exports"), num("1"))], locals(&["exports"]));
        assert_eq!(out, "exports = 1;\n");
    }

    #[test]
    fn test_temporaries_avoid_referenced_names() {
        let options = CompileOptions::default().with_referenced_vars(vec!["ref".to_string()]);
        let out = bare_with(
            vec![assign(id("x"), soak_access(call(id("f"), vec![]), "a"))],
            options,
        );
        assert_eq!(out, "var x, ref1;\n\nx = (ref1 = f()) != null ? ref1.a : void 0;\n");
    }

    #[test]
    fn test_empty_program() {
        assert_eq!(bare(vec![]), "\n");
    }
}

mod soaks {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_soaked_access_on_undeclared_name() {
        let out = bare(vec![assign(id("x"), soak_access(id("a"), "b"))]);
        assert_eq!(
            out,
            "var x;\n\nx = typeof a !== \"undefined\" && a !== null ? a.b : void 0;\n"
        );
    }

    #[test]
    fn test_soak_chain_evaluates_each_link_once() {
        let chain = soak_access(soak_access(id("a"), "b"), "c");
        let out = bare_with(vec![assign(id("x"), chain)], locals(&["a"]));
        assert_eq!(
            out,
            "var x, ref;\n\nx = a != null ? (ref = a.b) != null ? ref.c : void 0 : void 0;\n"
        );
    }

    #[test]
    fn test_soaked_call() {
        let out = bare(vec![assign(id("x"), soak_call(id("f"), vec![]))]);
        assert_eq!(out, "var x;\n\nx = typeof f === \"function\" ? f() : void 0;\n");
    }
}

mod operators {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_in_with_dynamic_array_injects_helper() {
        let out = bare_with(vec![assign(id("x"), op("in", id("a"), id("list")))], locals(&["a", "list"]));
        assert!(out.starts_with("var x,\n  __indexOf = [].indexOf || function(item) {"));
        assert!(out.ends_with(";\n\nx = __indexOf.call(list, a) >= 0;\n"));
    }

    #[test]
    fn test_helpers_are_defined_once() {
        let program = vec![
            assign(id("x"), op("%%", id("a"), id("b"))),
            assign(id("y"), op("%%", id("c"), id("d"))),
        ];
        let out = bare_with(program, locals(&["a", "b", "c", "d"]));
        assert_eq!(out.matches("__modulo = function").count(), 1);
        assert!(out.ends_with("x = __modulo(a, b);\n\ny = __modulo(c, d);\n"));
    }

    #[test]
    fn test_try_in_expression_returns_from_both_branches() {
        let attempt = try_catch(
            vec![call(id("f"), vec![])],
            Some((Some(id("e")), vec![call(id("g"), vec![])])),
            None,
        );
        let out = bare(vec![assign(id("x"), attempt)]);
        assert_eq!(
            out,
            "var x, e;\n\nx = (function() {\n  try {\n    return f();\n  } catch (error) {\n    \
             e = error;\n    return g();\n  }\n})();\n"
        );
    }
}
