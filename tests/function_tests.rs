//! Functions, parameters and assignment patterns in whole programs

mod common;
use common::{bare, bare_with, compile_error, locals};
use percolate::ast::build::*;
use pretty_assertions::assert_eq;

mod functions {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_function_returns_last_expression() {
        let square = func(vec![param("x")], vec![op("*", id("x"), id("x"))]);
        assert_eq!(
            bare(vec![assign(id("square"), square)]),
            "var square;\n\nsquare = function(x) {\n  return x * x;\n};\n"
        );
    }

    #[test]
    fn test_rest_parameter_slices_arguments() {
        let f = func(vec![param("a"), splat_param("rest")], vec![id("rest")]);
        assert_eq!(
            bare(vec![assign(id("f"), f)]),
            "var f,\n  __slice = [].slice;\n\nf = function() {\n  var a, rest;\n  \
             a = arguments[0], rest = 2 <= arguments.length ? __slice.call(arguments, 1) : [];\n  \
             return rest;\n};\n"
        );
    }

    #[test]
    fn test_bound_function_captures_this() {
        let f = bound_func(vec![], vec![this()]);
        assert_eq!(
            bare(vec![assign(id("f"), f)]),
            "var f;\n\nf = (function(_this) {\n  return function() {\n    return _this;\n  };\n})(this);\n"
        );
    }

    #[test]
    fn test_inner_scope_declares_its_own_locals() {
        let f = func(vec![], vec![assign(id("y"), num("2")), id("y")]);
        assert_eq!(
            bare(vec![assign(id("f"), f)]),
            "var f;\n\nf = function() {\n  var y;\n  y = 2;\n  return y;\n};\n"
        );
    }

    #[test]
    fn test_outer_names_are_reused() {
        let f = func(vec![], vec![assign(id("y"), num("2"))]);
        let out = bare(vec![assign(id("y"), num("1")), assign(id("f"), f)]);
        assert_eq!(
            out,
            "var y, f;\n\ny = 1;\n\nf = function() {\n  return y = 2;\n};\n"
        );
    }

    #[test]
    fn test_parameter_errors() {
        let twice = func(vec![param("a"), param("a")], vec![]);
        assert_eq!(
            compile_error(vec![twice]).to_string(),
            "multiple parameters named a"
        );
        let reserved = func(vec![param("arguments")], vec![]);
        assert_eq!(
            compile_error(vec![reserved]).to_string(),
            "'arguments' can't be assigned"
        );
    }
}

mod assignment {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_array_pattern_caches_source() {
        let out = bare(vec![assign(arr(vec![id("a"), id("b")]), call(id("f"), vec![]))]);
        assert_eq!(out, "var ref, a, b;\n\nref = f(), a = ref[0], b = ref[1];\n");
    }

    #[test]
    fn test_conditional_assignment_of_known_name() {
        let out = bare_with(vec![compound(id("a"), "||=", num("1"))], locals(&["a"]));
        assert_eq!(out, "a || (a = 1);\n");
    }

    #[test]
    fn test_conditional_assignment_of_unknown_name() {
        let err = compile_error(vec![compound(id("a"), "&&=", num("1"))]);
        assert_eq!(
            err.to_string(),
            "the variable \"a\" can't be assigned with &&= because it has not been declared before"
        );
    }

    #[test]
    fn test_assigning_to_a_literal() {
        let err = compile_error(vec![assign(string("a"), num("1"))]);
        assert_eq!(err.to_string(), "'\"a\"' can't be assigned");
    }
}
