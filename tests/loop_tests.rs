//! Loops, ranges and comprehensions in whole programs

mod common;
use common::{bare, bare_with, locals};
use percolate::ast::build::*;
use percolate::ast::Node;
use pretty_assertions::assert_eq;

mod loops {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_array_loop_declares_counters() {
        let lp = for_in(Some(ident("x")), None, id("list"), vec![call(id("f"), vec![id("x")])]);
        let out = bare_with(vec![Node::from(lp)], locals(&["list"]));
        assert_eq!(
            out,
            "var x, i, len;\n\nfor (i = 0, len = list.length; i < len; i++) {\n  x = list[i];\n  f(x);\n}\n"
        );
    }

    #[test]
    fn test_literal_source_is_cached() {
        let source = arr(vec![num("1"), num("2")]);
        let lp = for_in(Some(ident("x")), None, source, vec![call(id("f"), vec![id("x")])]);
        let out = bare(vec![Node::from(lp)]);
        assert_eq!(
            out,
            "var x, i, ref, len;\n\nref = [1, 2];\nfor (i = 0, len = ref.length; i < len; i++) {\n  \
             x = ref[i];\n  f(x);\n}\n"
        );
    }

    #[test]
    fn test_range_loop_with_literal_bounds() {
        let lp = for_in(Some(ident("n")), None, range(num("1"), num("10"), false), vec![]);
        assert_eq!(
            bare(vec![Node::from(lp)]),
            "var n, i;\n\nfor (n = i = 1; i <= 10; n = ++i) {}\n"
        );
    }

    #[test]
    fn test_function_returning_a_comprehension() {
        let lp = for_in(Some(ident("x")), None, id("list"), vec![op("*", id("x"), num("2"))]);
        let f = func(vec![], vec![Node::from(lp)]);
        let out = bare_with(vec![assign(id("double"), f)], locals(&["list"]));
        assert_eq!(
            out,
            "var double;\n\ndouble = function() {\n  var x, results, i, len;\n  results = [];\n  \
             for (i = 0, len = list.length; i < len; i++) {\n    x = list[i];\n    \
             results.push(x * 2);\n  }\n  return results;\n};\n"
        );
    }

    #[test]
    fn test_loop_ending_in_return_collects_nothing() {
        let lp = for_in(Some(ident("x")), None, id("list"), vec![ret(Some(id("x")))]);
        let f = func(vec![], vec![Node::from(lp)]);
        let out = bare_with(vec![assign(id("first"), f)], locals(&["list"]));
        assert_eq!(
            out,
            "var first;\n\nfirst = function() {\n  var x, i, len;\n  \
             for (i = 0, len = list.length; i < len; i++) {\n    x = list[i];\n    return x;\n  }\n};\n"
        );
    }

    #[test]
    fn test_while_with_guard() {
        let lp = while_guarded(id("a"), id("b"), vec![call(id("f"), vec![])]);
        assert_eq!(bare(vec![lp]), "while (a) {\n  if (b) {\n    f();\n  }\n}\n");
    }

    #[test]
    fn test_until_inverts_condition() {
        let lp = until_loop(id("done"), vec![call(id("step"), vec![])]);
        assert_eq!(bare(vec![lp]), "while (!done) {\n  step();\n}\n");
    }
}
