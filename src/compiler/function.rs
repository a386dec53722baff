//! Function literals and their parameter lists

use super::{block, compile_to_fragments, ident, raw, Context, Level, TAB};
use crate::ast::{Arr, Assign, Block, Call, Code, If, Literal, Node, Op, Param, Splat, Value};
use crate::error::{LocationData, Result};
use crate::fragment::{fragments_to_text, Fragments, Origin};
use crate::keywords::{is_js_forbidden, unassignable_reason};
use crate::scope::{MethodInfo, Scope, VariableKind};

fn method_info(code: &Code) -> MethodInfo {
    MethodInfo {
        bound: code.bound,
        context: code.meta.context.clone(),
        name: code.meta.ctor.clone().or_else(|| code.meta.name.clone()),
        klass: code.meta.klass.clone(),
        is_static: code.meta.is_static,
        is_ctor: code.meta.ctor.is_some(),
    }
}

/// `(function(_this) { return <code>; })(this)`, capturing the defining
/// `this` for a `=>` function
fn compile_bound_wrapper(
    mut code: Code,
    loc: Option<LocationData>,
    o: &Context,
) -> Result<Fragments> {
    const CONTEXT: &str = "_this";
    code.meta.context = Some(CONTEXT.to_string());
    let inner = Node::from(code).with_loc(loc);
    let wrapper = Code::new(vec![Param::new(ident(CONTEXT))], Block::new(vec![inner]));
    let call = Call::new(
        Node::from(wrapper).with_loc(loc),
        vec![Node::from(Literal::this())],
    );
    super::value::compile_call(call, loc, false, o)
}

/// The name a parameter is known by in the emitted parameter list
fn param_reference(param: &Param, o: &Context) -> Node {
    if param.is_expansion() {
        return param.name.clone();
    }
    if let Some(reference) = &param.reference {
        return reference.clone();
    }
    let name = match param.name.as_value() {
        Some(value) if value.this => {
            let name = value
                .properties
                .first()
                .and_then(|p| p.access_name())
                .unwrap_or("arg");
            let name = if is_js_forbidden(name) {
                format!("_{}", name)
            } else {
                name.to_string()
            };
            ident(&o.scope.free_variable(&name, false, true))
        }
        _ if param.name.is_complex() => ident(&o.scope.free_variable("arg", false, true)),
        _ => param.name.clone(),
    };
    let reference = Node::from(Value::from_node(name)).with_loc(param.name.loc);
    if param.splat {
        Node::from(Splat { name: reference })
    } else {
        reference
    }
}

fn check_param_names(params: &[Param]) -> Result<()> {
    for param in params.iter().filter(|p| !p.is_expansion()) {
        if let Some(reason) = param
            .name
            .unwrap_all_ref()
            .as_literal()
            .and_then(|l| unassignable_reason(&l.value))
        {
            return Err(param.name.error(reason));
        }
    }
    let mut seen: Vec<String> = Vec::new();
    for param in params {
        param.each_name(&mut |name, node| {
            if seen.iter().any(|s| s == name) {
                return Err(node.error(format!("multiple parameters named {}", name)));
            }
            seen.push(name.to_string());
            Ok(())
        })?;
    }
    Ok(())
}

pub(crate) fn compile_code(
    mut code: Code,
    loc: Option<LocationData>,
    front: bool,
    o: &Context,
) -> Result<Fragments> {
    let origin = Origin::new(loc, "Code");
    if code.bound {
        if let Some(method) = o.scope.method().filter(|m| m.bound) {
            code.meta.context = method.context.clone();
        }
        if code.meta.context.is_none() {
            return compile_bound_wrapper(code, loc, o);
        }
    }
    check_param_names(&code.params)?;

    let tab = o.indent.clone();
    let mut inner = o.clone();
    let scope = inner
        .class_scope
        .take()
        .unwrap_or_else(|| Scope::child(&o.scope, method_info(&code)));
    scope.set_shared(o.shared_scope);
    inner.scope = scope;
    inner.shared_scope = false;
    inner.indent.push_str(TAB);
    inner.bare = false;
    inner.is_existential_equals = false;
    inner.chain_child = false;
    let o = inner;

    let references: Vec<Node> = code.params.iter().map(|p| param_reference(p, &o)).collect();
    let has_splat = code.params.iter().any(|p| p.splat || p.is_expansion());

    let mut exprs = Vec::new();
    if has_splat {
        for param in code.params.iter().filter(|p| !p.is_expansion()) {
            if let Some(literal) = param.name.as_literal() {
                o.scope.add(&literal.value, VariableKind::Var, true);
            }
        }
        let pattern = Node::from(Value::new(Node::from(Arr {
            objects: references.clone(),
        })));
        exprs.push(Node::from(Assign::new(pattern, ident("arguments"))).with_loc(loc));
    }

    let mut params = Vec::new();
    for (param, reference) in code.params.into_iter().zip(references) {
        if param.is_complex() {
            let target = Node::from(Value::from_node(param.name));
            let value = match param.value {
                Some(default) => Node::from(Op::binary("?", reference.clone(), default)),
                None => reference.clone(),
            };
            let mut assign = Assign::with_context(target, value, "=");
            assign.param = true;
            exprs.push(Node::from(assign));
        } else if let Some(default) = param.value {
            let name = param
                .name
                .unwrap_all_ref()
                .as_literal()
                .map(|l| l.value.clone())
                .unwrap_or_default();
            let target = Node::from(Value::from_node(param.name));
            let assign = Node::from(Assign::with_context(target, default, "="));
            exprs.push(Node::from(If::new(raw(&format!("{} == null", name)), assign)));
        }
        if !has_splat {
            params.push(reference);
        }
    }

    let was_empty = code.body.is_empty();
    if !exprs.is_empty() {
        let rest = std::mem::take(&mut code.body.expressions);
        exprs.extend(rest);
        code.body.expressions = exprs;
    }

    let mut compiled_params = Vec::with_capacity(params.len());
    for param in params {
        let fragments = compile_to_fragments(param, &o, Level::List)?;
        o.scope.parameter(&fragments_to_text(&fragments));
        compiled_params.push(fragments);
    }

    let mut body = code.body;
    if !was_empty && !code.meta.no_return {
        body = block::make_return(body, None);
    }

    let mut head = String::from("function");
    if let Some(name) = &code.meta.ctor {
        head.push(' ');
        head.push_str(name);
    }
    head.push('(');
    let mut answer = vec![origin.code(head)];
    answer.extend(origin.join(compiled_params, ", "));
    answer.push(origin.code(") {"));
    if !body.is_empty() {
        answer.push(origin.code("\n"));
        answer.extend(block::compile_with_declarations(body, loc, &o)?);
        answer.push(origin.code(format!("\n{}", tab)));
    }
    answer.push(origin.code("}"));

    if code.meta.ctor.is_some() {
        answer.insert(0, origin.code(tab));
        return Ok(answer);
    }
    Ok(if front || o.level >= Level::Access {
        origin.wrap_in_braces(answer)
    } else {
        answer
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::*;
    use crate::compiler::compile_text;
    use crate::options::CompileOptions;
    use pretty_assertions::assert_eq;

    fn context() -> Context {
        Context::new(
            Scope::root(Vec::<String>::new()),
            &CompileOptions::default().with_bare(true),
        )
    }

    fn text(node: Node) -> String {
        compile_text(node, &context(), Level::List).unwrap()
    }

    #[test]
    fn test_empty_function() {
        assert_eq!(text(func(vec![], vec![])), "function() {}");
    }

    #[test]
    fn test_implicit_return() {
        assert_eq!(
            text(func(vec![param("a")], vec![id("a")])),
            "function(a) {\n  return a;\n}"
        );
    }

    #[test]
    fn test_default_parameter() {
        assert_eq!(
            text(func(vec![param_default("a", num("1"))], vec![])),
            "function(a) {\n  if (a == null) {\n    a = 1;\n  }\n}"
        );
    }

    #[test]
    fn test_this_parameter() {
        assert_eq!(
            text(func(vec![this_param("name")], vec![])),
            "function(name) {\n  this.name = name;\n}"
        );
    }

    #[test]
    fn test_splat_parameters() {
        let out = text(func(vec![param("a"), splat_param("rest")], vec![]));
        assert_eq!(
            out,
            "function() {\n  var a, rest;\n  a = arguments[0], rest = 2 <= arguments.length \
             ? __slice.call(arguments, 1) : [];\n}"
        );
    }

    #[test]
    fn test_locals_are_declared() {
        assert_eq!(
            text(func(vec![], vec![assign(id("x"), num("1"))])),
            "function() {\n  var x;\n  return x = 1;\n}"
        );
    }

    #[test]
    fn test_bound_function_wrapper() {
        assert_eq!(
            text(bound_func(vec![], vec![this()])),
            "(function(_this) {\n  return function() {\n    return _this;\n  };\n})(this)"
        );
    }

    #[test]
    fn test_duplicate_parameters() {
        let node = func(vec![param("a"), param("a")], vec![]);
        let err = compile_text(node, &context(), Level::List).unwrap_err();
        assert_eq!(err.to_string(), "multiple parameters named a");
    }

    #[test]
    fn test_reserved_parameter() {
        let node = func(vec![param("eval")], vec![]);
        let err = compile_text(node, &context(), Level::List).unwrap_err();
        assert_eq!(err.to_string(), "'eval' can't be assigned");
    }

    #[test]
    fn test_function_in_front_position_is_wrapped() {
        let mut node = func(vec![], vec![]);
        node.front = true;
        assert_eq!(compile_text(node, &context(), Level::Top).unwrap(), "(function() {})");
    }
}
