//! Operators, `in` tests and existence checks

use super::{cache, cache_compiled, compile_text, compile_to_fragments, ident, Context, Level};
use crate::ast::{
    Access, Assign, Call, Existence, If, In, LiteralKind, Node, NodeKind, Op, Parens, Property,
    Value,
};
use crate::error::{Error, LocationData, Result};
use crate::fragment::{fragments_to_text, Fragments, Origin};
use crate::helpers::{utility, Helper};
use crate::keywords::unassignable_reason;

pub(crate) fn compile_op(
    op: Op,
    loc: Option<LocationData>,
    front: bool,
    o: &Context,
) -> Result<Fragments> {
    let origin = Origin::new(loc, "Op");
    let is_chain = op.is_chainable()
        && matches!(&op.first.kind, NodeKind::Op(first) if first.is_chainable());
    let mut op = op;
    if !is_chain {
        op.first.front = front;
    }
    let operand = op
        .first
        .unwrap_all_ref()
        .as_literal()
        .map(|l| l.value.clone());
    if op.operator == "delete" {
        if let Some(name) = &operand {
            if o.scope.check(name) {
                return Err(Error::compile_error(
                    "delete operand may not be argument or var",
                    loc,
                ));
            }
        }
    }
    if op.operator == "++" || op.operator == "--" {
        if let Some(reason) = operand.as_deref().and_then(unassignable_reason) {
            return Err(op.first.error(reason));
        }
    }
    if op.is_unary() {
        return compile_unary(op, loc, o);
    }
    if is_chain {
        return compile_chain(op, origin, o);
    }
    let Some(second) = op.second else {
        return compile_unary(op, loc, o);
    };
    match op.operator.as_str() {
        "?" => compile_existential(op.first, second, loc, o),
        "**" => compile_math_call("pow", vec![op.first, second], loc, o),
        "//" => {
            let division = Node::from(Op::binary("/", op.first, second)).with_loc(loc);
            compile_math_call("floor", vec![division], loc, o)
        }
        "%%" => {
            let modulo = super::raw(&utility(Helper::Modulo, &o.scope));
            let call = Call::new(Node::from(Value::new(modulo)), vec![op.first, second]);
            compile_to_fragments(Node::from(call).with_loc(loc), o, o.level)
        }
        operator => {
            let mut fragments = compile_to_fragments(op.first, o, Level::Op)?;
            fragments.push(origin.code(format!(" {} ", operator)));
            fragments.extend(compile_to_fragments(second, o, Level::Op)?);
            Ok(if o.level <= Level::Op {
                fragments
            } else {
                origin.wrap_in_braces(fragments)
            })
        }
    }
}

/// `Math.name(args)`
fn compile_math_call(
    name: &str,
    args: Vec<Node>,
    loc: Option<LocationData>,
    o: &Context,
) -> Result<Fragments> {
    let callee = Value::with_properties(ident("Math"), vec![Property::Access(Access::new(name))]);
    let call = Call::new(Node::from(callee), args);
    compile_to_fragments(Node::from(call).with_loc(loc), o, o.level)
}

/// `a < b < c` becomes `a < b && b < c`, evaluating `b` once
fn compile_chain(op: Op, origin: Origin, o: &Context) -> Result<Fragments> {
    let Op {
        operator,
        first,
        second,
        inverted,
        ..
    } = op;
    let NodeKind::Op(mut first) = first.kind else {
        return Err(Error::internal("comparison chain without a leading comparison"));
    };
    let shared = match first.second.take() {
        Some(middle) => {
            let (sub, reference) = cache(middle, o, super::is_complex);
            first.second = Some(sub);
            reference
        }
        None => return Err(Error::internal("comparison chain with a unary link")),
    };
    let mut fragments = compile_to_fragments(Node::from(*first), o, Level::Op)?;
    fragments.push(origin.code(if inverted { " || " } else { " && " }));
    fragments.extend(compile_to_fragments(shared, o, o.level)?);
    fragments.push(origin.code(format!(" {} ", operator)));
    if let Some(second) = second {
        fragments.extend(compile_to_fragments(second, o, Level::Op)?);
    }
    Ok(origin.wrap_in_braces(fragments))
}

/// `a ? b` picks `b` when `a` is null or undefined
fn compile_existential(
    first: Node,
    second: Node,
    loc: Option<LocationData>,
    o: &Context,
) -> Result<Fragments> {
    let (checked, reference) = if first.is_complex() {
        let reference = ident(&o.scope.free_variable("ref", false, true));
        let assign = Node::from(Assign::new(reference.clone(), first));
        (Node::from(Parens { body: assign }), reference)
    } else {
        (first.clone(), first)
    };
    let condition = Node::from(Existence {
        expression: checked,
        negated: false,
    });
    let mut node = If::new(condition, reference);
    node.add_else(second);
    compile_to_fragments(Node::from(node).with_loc(loc), o, o.level)
}

fn compile_unary(mut op: Op, loc: Option<LocationData>, o: &Context) -> Result<Fragments> {
    let origin = Origin::new(loc, "Op");
    if op.operator == "!" {
        if let NodeKind::Existence(mut existence) = op.first.kind {
            existence.negated = !existence.negated;
            return compile_to_fragments(Node::from(*existence).with_loc(op.first.loc), o, o.level);
        }
    }
    if o.level >= Level::Access {
        let parens = Parens {
            body: Node::from(op).with_loc(loc),
        };
        return compile_to_fragments(Node::from(parens).with_loc(loc), o, o.level);
    }
    let operator = op.operator.clone();
    let plus_minus = operator == "+" || operator == "-";
    let first_is_op = matches!(op.first.kind, NodeKind::Op(_));
    let same_operator =
        matches!(&op.first.kind, NodeKind::Op(first) if first.operator == operator);
    let mut parts = vec![vec![origin.code(operator.clone())]];
    if matches!(operator.as_str(), "new" | "typeof" | "delete") || (plus_minus && same_operator) {
        parts.push(vec![origin.code(" ")]);
    }
    if (plus_minus && first_is_op) || (operator == "new" && op.first.is_statement(Some(o.level))) {
        let first = op.first.take();
        let first_loc = first.loc;
        op.first = Node::from(Parens { body: first }).with_loc(first_loc);
    }
    parts.push(compile_to_fragments(op.first, o, Level::Op)?);
    if op.flip {
        parts.reverse();
    }
    Ok(origin.join(parts, ""))
}

pub(crate) fn compile_in(node: In, loc: Option<LocationData>, o: &Context) -> Result<Fragments> {
    let is_literal_list = match &node.array.kind {
        NodeKind::Value(value) if value.is_array() => match &value.base.kind {
            NodeKind::Arr(arr) => {
                !arr.objects.is_empty()
                    && !arr.objects.iter().any(|n| matches!(n.kind, NodeKind::Splat(_)))
            }
            _ => false,
        },
        _ => false,
    };
    if is_literal_list {
        compile_or_test(node, loc, o)
    } else {
        compile_loop_test(node, loc, o)
    }
}

/// `a in [b, c]` becomes `a === b || a === c`
fn compile_or_test(node: In, loc: Option<LocationData>, o: &Context) -> Result<Fragments> {
    let origin = Origin::new(loc, "In");
    let (sub, reference) = cache_compiled(node.object, o, Level::Op, super::is_complex)?;
    let (comparison, conjunction) = if node.negated {
        (" !== ", " && ")
    } else {
        (" === ", " || ")
    };
    let items = match node.array.unwrap().kind {
        NodeKind::Arr(arr) => arr.objects,
        _ => Vec::new(),
    };
    let mut tests = Vec::new();
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            tests.push(origin.code(conjunction));
            tests.extend(reference.iter().cloned());
        } else {
            tests.extend(sub.iter().cloned());
        }
        tests.push(origin.code(comparison));
        tests.extend(compile_to_fragments(item, o, Level::Access)?);
    }
    Ok(if o.level < Level::Op {
        tests
    } else {
        origin.wrap_in_braces(tests)
    })
}

/// `a in list` through the `indexOf` helper
fn compile_loop_test(node: In, loc: Option<LocationData>, o: &Context) -> Result<Fragments> {
    let origin = Origin::new(loc, "In");
    let (sub, reference) = cache_compiled(node.object, o, Level::List, super::is_complex)?;
    let index_of = utility(Helper::IndexOf, &o.scope);
    let mut fragments = vec![origin.code(format!("{}.call(", index_of))];
    fragments.extend(compile_to_fragments(node.array, o, Level::List)?);
    fragments.push(origin.code(", "));
    let simple = fragments_to_text(&sub) == fragments_to_text(&reference);
    fragments.extend(reference);
    fragments.push(origin.code(if node.negated { ") < 0" } else { ") >= 0" }));
    if simple {
        return Ok(fragments);
    }
    let mut answer = sub;
    answer.push(origin.code(", "));
    answer.extend(fragments);
    Ok(if o.level < Level::List {
        answer
    } else {
        origin.wrap_in_braces(answer)
    })
}

pub(crate) fn compile_existence(
    existence: Existence,
    loc: Option<LocationData>,
    front: bool,
    o: &Context,
) -> Result<Fragments> {
    let origin = Origin::new(loc, "Existence");
    let mut expression = existence.expression;
    expression.front = front;
    let is_identifier = matches!(
        &expression.unwrap_ref().kind,
        NodeKind::Literal(l) if l.kind == LiteralKind::Identifier
    );
    let code = compile_text(expression, o, Level::Op)?;
    let code = if is_identifier && !o.scope.check(&code) {
        let (comparison, conjunction) = if existence.negated {
            ("===", "||")
        } else {
            ("!==", "&&")
        };
        format!(
            "typeof {code} {cmp} \"undefined\" {cnj} {code} {cmp} null",
            code = code,
            cmp = comparison,
            cnj = conjunction
        )
    } else {
        format!("{} {} null", code, if existence.negated { "==" } else { "!=" })
    };
    Ok(vec![origin.code(if o.level <= Level::Cond {
        code
    } else {
        format!("({})", code)
    })])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::*;
    use crate::options::CompileOptions;
    use crate::scope::Scope;
    use pretty_assertions::assert_eq;

    fn context() -> Context {
        Context::new(
            Scope::root(Vec::<String>::new()),
            &CompileOptions::default().with_bare(true),
        )
    }

    fn text(node: Node, o: &Context, level: Level) -> String {
        compile_text(node, o, level).unwrap()
    }

    #[test]
    fn test_comparison_chain_caches_middle() {
        let o = context();
        let chain = op("<", op("<", id("a"), call(id("b"), vec![])), id("c"));
        assert_eq!(text(chain, &o, Level::Top), "(a < (ref = b()) && ref < c)");
    }

    #[test]
    fn test_inverted_chain_uses_or() {
        let o = context();
        let chain = op("==", op("==", id("a"), id("b")), id("c")).invert();
        assert_eq!(text(chain, &o, Level::Top), "(a !== b || b !== c)");
    }

    #[test]
    fn test_math_operators() {
        let o = context();
        assert_eq!(text(op("**", id("a"), id("b")), &o, Level::Top), "Math.pow(a, b)");
        assert_eq!(text(op("//", id("a"), id("b")), &o, Level::Top), "Math.floor(a / b)");
        assert_eq!(text(op("%%", id("a"), id("b")), &o, Level::Top), "__modulo(a, b)");
        assert_eq!(
            o.scope.assigned_variables(),
            vec!["__modulo = function(a, b) { return (+a % (b = +b) + b) % b; }"]
        );
    }

    #[test]
    fn test_unary_spacing() {
        let o = context();
        assert_eq!(text(unary("-", unary("-", id("x"))), &o, Level::Top), "- (-x)");
        assert_eq!(text(unary("typeof", id("x")), &o, Level::Top), "typeof x");
        assert_eq!(text(postfix("++", id("i")), &o, Level::Top), "i++");
        assert_eq!(text(unary("-", num("1")), &o, Level::Access), "(-1)");
    }

    #[test]
    fn test_binary_wraps_above_op_level() {
        let o = context();
        let sum = op("+", id("a"), id("b"));
        assert_eq!(text(sum.clone(), &o, Level::Op), "a + b");
        assert_eq!(text(sum, &o, Level::Access), "(a + b)");
    }

    #[test]
    fn test_existential_operator() {
        let o = context();
        o.scope.find("a");
        assert_eq!(text(op("?", id("a"), id("b")), &o, Level::List), "a != null ? a : b");
    }

    #[test]
    fn test_existence_of_undeclared_identifier() {
        let o = context();
        assert_eq!(
            text(exists(id("x")), &o, Level::Top),
            "typeof x !== \"undefined\" && x !== null"
        );
        o.scope.find("y");
        assert_eq!(text(exists(id("y")), &o, Level::Top), "y != null");
        assert_eq!(text(not(exists(id("y"))), &o, Level::Top), "y == null");
    }

    #[test]
    fn test_in_literal_array_and_helper() {
        let o = context();
        let literal = op("in", id("a"), arr(vec![num("1"), num("2")]));
        assert_eq!(text(literal, &o, Level::Top), "a === 1 || a === 2");
        let negated = op("!in", id("a"), arr(vec![num("1"), num("2")]));
        assert_eq!(text(negated, &o, Level::Top), "a !== 1 && a !== 2");
        let dynamic = op("in", id("a"), id("list"));
        assert_eq!(text(dynamic, &o, Level::Top), "__indexOf.call(list, a) >= 0");
    }

    #[test]
    fn test_delete_of_variable() {
        let o = context();
        o.scope.find("x");
        let err = compile_to_fragments(unary("delete", id("x")), &o, Level::Top).unwrap_err();
        assert_eq!(err.to_string(), "delete operand may not be argument or var");
    }
}
