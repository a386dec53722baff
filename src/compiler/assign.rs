//! Assignment: plain, compound, conditional, destructuring and splicing

use super::{
    cache_reference, cache_text, compile_text, compile_to_fragments, control, ident, is_complex,
    raw, value::compile_property, Context, Level,
};
use crate::ast::{
    Access, Arr, Assign, Code, If, Index, Literal, LiteralKind, Node, NodeKind, Obj, Op, Parens,
    Property, Value,
};
use crate::error::{Error, LocationData, Result};
use crate::fragment::{fragments_to_text, Fragments, Origin};
use crate::helpers::{utility, Helper};
use crate::keywords::{is_js_forbidden, unassignable_reason};
use crate::scope::VariableKind;

pub(crate) fn compile_assign(
    assign: Assign,
    loc: Option<LocationData>,
    o: &Context,
) -> Result<Fragments> {
    let origin = Origin::new(loc, "Assign");
    let mut assign = assign;
    if let Some(value) = assign.variable.as_value() {
        if value.is_array() || value.is_object(false) {
            return compile_pattern_match(assign, origin, o);
        }
        if value.is_splice() {
            return compile_splice(assign, origin, o);
        }
        match assign.context.as_deref() {
            Some("||=" | "&&=" | "?=") => return compile_conditional(assign, loc, o),
            Some("**=" | "//=" | "%%=") => return compile_special_math(assign, loc, o),
            _ => {}
        }
    }

    if matches!(assign.value.kind, NodeKind::Code(_)) {
        annotate_method(&mut assign, o)?;
    }

    if assign.context.is_none() {
        check_target(&assign.variable, o)?;
        let target = assign.variable.unwrap_all_ref();
        if let Some(literal) = target.as_literal() {
            if assign.param {
                o.scope.add(&literal.value, VariableKind::Var, false);
            } else {
                o.scope.find(&literal.value);
            }
        }
    }

    let value = compile_to_fragments(assign.value, o, Level::List)?;
    let is_obj_target = assign
        .variable
        .as_value()
        .is_some_and(|v| matches!(v.base.kind, NodeKind::Obj(_)));
    if is_obj_target {
        assign.variable.front = true;
    }
    let mut name = compile_to_fragments(assign.variable, o, Level::List)?;

    if assign.context.as_deref() == Some("object") {
        if is_js_forbidden(&fragments_to_text(&name)) {
            name.insert(0, origin.code("\""));
            name.push(origin.code("\""));
        }
        name.push(origin.code(": "));
        name.extend(value);
        return Ok(name);
    }

    let operator = assign.context.as_deref().unwrap_or("=");
    name.push(origin.code(format!(" {} ", operator)));
    name.extend(value);
    Ok(if o.level <= Level::List {
        name
    } else {
        origin.wrap_in_braces(name)
    })
}

/// Refuse targets that cannot hold a value
fn check_target(variable: &Node, o: &Context) -> Result<()> {
    let target = variable.unwrap_all_ref();
    if !target.is_assignable() {
        let text = compile_text(variable.clone(), o, Level::List)?;
        return Err(variable.error(format!("'{}' can't be assigned", text)));
    }
    if let Some(reason) = target
        .as_literal()
        .and_then(|l| unassignable_reason(&l.value))
    {
        return Err(variable.error(reason));
    }
    Ok(())
}

fn body_calls_super(code: &Code) -> bool {
    let mut found = false;
    for node in &code.body.expressions {
        if matches!(node.kind, NodeKind::SuperCall(_)) {
            return true;
        }
        node.traverse_children(true, &mut |child| {
            found |= matches!(child.kind, NodeKind::SuperCall(_));
            !found
        });
        if found {
            return true;
        }
    }
    false
}

/// Record on a function assigned as a method which class and name it
/// belongs to, so that `super` inside it can find the overridden method
fn annotate_method(assign: &mut Assign, o: &Context) -> Result<()> {
    let NodeKind::Code(code) = &assign.value.kind else {
        return Ok(());
    };
    let is_static = code.meta.is_static;
    let calls_super = body_calls_super(code);
    let NodeKind::Value(variable) = &mut assign.variable.kind else {
        return Ok(());
    };

    let (klass, name) = if is_static {
        let Some(name) = variable.properties.first().cloned() else {
            return Ok(());
        };
        (Node::from(Value::new(variable.base.clone())), name)
    } else {
        let count = variable.properties.len();
        if count < 2 || variable.properties[count - 2].access_name() != Some("prototype") {
            return Ok(());
        }
        let klass = Value::with_properties(
            variable.base.clone(),
            variable.properties[..count - 2].to_vec(),
        );
        (Node::from(klass), variable.properties[count - 1].clone())
    };
    if !calls_super {
        return Ok(());
    }

    let klass_text = if !is_static && klass.is_complex() {
        let reference = o.scope.free_variable("base", false, true);
        let count = variable.properties.len();
        let cached = Node::from(Assign::new(ident(&reference), klass));
        variable.base = Node::from(Value::new(Node::from(Parens { body: cached })));
        variable.properties.drain(..count - 2);
        reference
    } else {
        compile_text(klass, o, Level::Access)?
    };

    let name_needs_cache = match &name {
        Property::Index(index) => index.index.is_complex() || index.index.is_assignable(),
        other => other.is_complex(),
    };
    let name_text = match name {
        Property::Index(index) if name_needs_cache => {
            let reference = o.scope.free_variable("name", false, true);
            let cached = Node::from(Assign::new(ident(&reference), index.index));
            variable.properties.pop();
            variable.properties.push(Property::Index(Index {
                index: cached,
                soak: false,
            }));
            format!("[{}]", reference)
        }
        name => fragments_to_text(&compile_property(name, None, o)?),
    };

    if let NodeKind::Code(code) = &mut assign.value.kind {
        code.meta.klass = Some(klass_text);
        code.meta.name = Some(name_text);
    }
    Ok(())
}

/// `a ||= b`, `a &&= b` and `a ?= b`
fn compile_conditional(
    assign: Assign,
    loc: Option<LocationData>,
    o: &Context,
) -> Result<Fragments> {
    let origin = Origin::new(loc, "Assign");
    let context = assign.context.unwrap_or_default();
    let variable_loc = assign.variable.loc;
    let (left, right) = cache_reference(Value::from_node(assign.variable), variable_loc, o);
    if let Some(value) = left.as_value() {
        if let Some(literal) = value.base.as_literal() {
            if !value.has_properties()
                && literal.kind != LiteralKind::This
                && !o.scope.check(&literal.value)
            {
                return Err(Error::compile_error(
                    format!(
                        "the variable \"{}\" can't be assigned with {} because it has not been declared before",
                        literal.value, context
                    ),
                    variable_loc,
                ));
            }
        }
    }
    let store = Node::from(Assign::with_context(right.clone(), assign.value, "=")).with_loc(loc);
    if context.contains('?') {
        let mut o = o.clone();
        o.is_existential_equals = true;
        let mut node = If::new(control::exists(left), right);
        node.add_else(store);
        return compile_to_fragments(Node::from(node).with_loc(loc), &o, o.level);
    }
    let operator = &context[..context.len() - 1];
    let op = Node::from(Op::binary(operator, left, store)).with_loc(loc);
    let fragments = compile_to_fragments(op, o, o.level)?;
    Ok(if o.level <= Level::List {
        fragments
    } else {
        origin.wrap_in_braces(fragments)
    })
}

/// `a **= b` and friends, which have no native compound form
fn compile_special_math(
    assign: Assign,
    loc: Option<LocationData>,
    o: &Context,
) -> Result<Fragments> {
    let context = assign.context.unwrap_or_default();
    let variable_loc = assign.variable.loc;
    let (left, right) = cache_reference(Value::from_node(assign.variable), variable_loc, o);
    let operator = &context[..context.len() - 1];
    let value = Node::from(Op::binary(operator, right, assign.value));
    let node = Node::from(Assign::new(left, value)).with_loc(loc);
    compile_to_fragments(node, o, o.level)
}

/// The key, target and default value of one destructuring element
struct Element {
    key: Node,
    target: Node,
    default: Option<Node>,
}

fn pattern_key(target: &Node, is_object: bool, position: Node) -> Node {
    if !is_object {
        return position;
    }
    match target.as_value() {
        Some(value) if value.this => match value.properties.first() {
            Some(Property::Access(access)) => Node::from(access.name.clone()),
            _ => position,
        },
        _ => {
            let name = target
                .unwrap_ref()
                .as_literal()
                .map(|l| l.value.clone())
                .unwrap_or_default();
            Node::from(Literal::property(name))
        }
    }
}

fn split_element(node: Node, is_object: bool, position: Node) -> Element {
    match node.kind {
        NodeKind::Assign(assign) if assign.is_object_context() => {
            let key = assign.variable.unwrap();
            match assign.value.kind {
                NodeKind::Assign(inner) => Element {
                    key,
                    target: inner.variable,
                    default: Some(inner.value),
                },
                kind => Element {
                    key,
                    target: Node {
                        kind,
                        loc: assign.value.loc,
                        front: false,
                    },
                    default: None,
                },
            }
        }
        NodeKind::Assign(assign) => Element {
            key: pattern_key(&assign.variable, is_object, position),
            target: assign.variable,
            default: Some(assign.value),
        },
        kind => {
            let target = Node {
                kind,
                loc: node.loc,
                front: false,
            };
            Element {
                key: pattern_key(&target, is_object, position),
                target,
                default: None,
            }
        }
    }
}

/// `source.key` or `source[key]`
fn element_access(source: Node, key: Node) -> Value {
    let property = match key.as_literal() {
        Some(l) if l.kind == LiteralKind::PropertyName => Property::Access(Access {
            name: l.clone(),
            soak: false,
        }),
        _ => Property::Index(Index {
            index: key,
            soak: false,
        }),
    };
    Value::with_properties(source, vec![property])
}

fn target_name(target: &Node) -> Option<String> {
    target.unwrap_ref().as_literal().map(|l| l.value.clone())
}

fn check_name(target: &Node) -> Result<()> {
    match target_name(target).as_deref().and_then(unassignable_reason) {
        Some(reason) => Err(target.error(reason)),
        None => Ok(()),
    }
}

fn compile_pattern_match(assign: Assign, origin: Origin, o: &Context) -> Result<Fragments> {
    let top = o.level == Level::Top;
    let Assign {
        variable,
        value,
        param,
        subpattern,
        ..
    } = assign;
    let pattern = Value::from_node(variable);
    let is_object = pattern.is_object(false);
    let pattern_node = pattern.base;
    let objects = match pattern_node.kind {
        NodeKind::Arr(arr) => arr.objects,
        NodeKind::Obj(obj) => obj.properties,
        _ => Vec::new(),
    };
    let count = objects.len();
    if count == 0 {
        let code = compile_to_fragments(value, o, o.level)?;
        return Ok(if o.level >= Level::Op {
            origin.wrap_in_braces(code)
        } else {
            code
        });
    }
    if count == 1 && matches!(objects[0].kind, NodeKind::Expansion) {
        return Err(objects[0].error("Destructuring assignment has no target"));
    }

    if top && count == 1 && !matches!(objects[0].kind, NodeKind::Splat(_)) {
        let mut objects = objects;
        let zero = Node::from(Literal::new(LiteralKind::Number, "0"));
        let element = split_element(objects.remove(0), is_object, zero);
        check_name(&element.target)?;
        let mut source = Node::from(element_access(value, element.key));
        if let Some(default) = element.default {
            source = Node::from(Op::binary("?", source, default));
        }
        let mut single = Assign::new(element.target, source);
        single.param = param;
        return compile_to_fragments(Node::from(single).with_loc(origin.loc), o, Level::Top);
    }

    let value_is_identifier = matches!(
        &value.unwrap_ref().kind,
        NodeKind::Literal(l) if l.kind == LiteralKind::Identifier
    );
    let pattern_for_check = if is_object {
        Node::from(Obj {
            properties: objects.clone(),
            generated: false,
        })
    } else {
        Node::from(Arr {
            objects: objects.clone(),
        })
    };
    let mut vvar = compile_to_fragments(value, o, Level::List)?;
    let mut vvar_text = fragments_to_text(&vvar);
    let mut assigns: Vec<Fragments> = Vec::new();
    if !value_is_identifier || pattern_for_check.assigns(&vvar_text) {
        let reference = o.scope.free_variable("ref", false, true);
        let mut cached = vec![origin.code(format!("{} = ", reference))];
        cached.extend(vvar);
        assigns.push(cached);
        vvar = vec![origin.code(reference.clone())];
        vvar_text = reference;
    }

    let mut expanded_index: Option<String> = None;
    for (i, object) in objects.into_iter().enumerate() {
        let rest = count - i - 1;
        let (target, source) = match &object.kind {
            NodeKind::Splat(_) if expanded_index.is_none() => {
                let target = object.unwrap();
                let slice = utility(Helper::Slice, &o.scope);
                let mut code = format!(
                    "{} <= {}.length ? {}.call({}, {}",
                    count, vvar_text, slice, vvar_text, i
                );
                if rest > 0 {
                    let ivar = o.scope.free_variable("i", true, true);
                    code.push_str(&format!(
                        ", {ivar} = {v}.length - {rest}) : ({ivar} = {i}, [])",
                        ivar = ivar,
                        v = vvar_text,
                        rest = rest,
                        i = i
                    ));
                    expanded_index = Some(format!("{}++", ivar));
                } else {
                    code.push_str(") : []");
                    expanded_index = Some(String::new());
                }
                check_name(&target)?;
                (target, raw(&code))
            }
            NodeKind::Expansion if expanded_index.is_none() => {
                if rest == 1 {
                    expanded_index = Some(format!("{}.length - 1", vvar_text));
                } else if rest > 1 {
                    let ivar = o.scope.free_variable("i", true, true);
                    let code = format!("{} = {}.length - {}", ivar, vvar_text, rest);
                    assigns.push(compile_to_fragments(raw(&code), o, Level::List)?);
                    expanded_index = Some(format!("{}++", ivar));
                }
                continue;
            }
            NodeKind::Splat(_) | NodeKind::Expansion => {
                return Err(object.error("multiple splats/expansions are disallowed in an assignment"));
            }
            _ => {
                let position = raw(&expanded_index.clone().unwrap_or_else(|| i.to_string()));
                let element = split_element(object, is_object, position);
                check_name(&element.target)?;
                let mut source = Node::from(element_access(raw(&vvar_text), element.key));
                if let Some(default) = element.default {
                    source = Node::from(Op::binary("?", source, default));
                }
                (element.target, source)
            }
        };
        let mut nested = Assign::new(target, source);
        nested.param = param;
        nested.subpattern = true;
        assigns.push(compile_to_fragments(
            Node::from(nested).with_loc(origin.loc),
            o,
            Level::List,
        )?);
    }
    if !top && !subpattern {
        assigns.push(vvar);
    }
    let fragments = origin.join(assigns, ", ");
    Ok(if o.level < Level::List {
        fragments
    } else {
        origin.wrap_in_braces(fragments)
    })
}

/// `list[a..b] = value` through `Array.prototype.splice`
fn compile_splice(assign: Assign, origin: Origin, o: &Context) -> Result<Fragments> {
    let mut variable = Value::from_node(assign.variable);
    let Some(Property::Slice(slice)) = variable.properties.pop() else {
        return Err(Error::internal("splice target without a slice"));
    };
    let range = slice.range;
    let name = compile_text(Node::from(variable), o, o.level)?;
    let from_is_number = range.from.as_ref().is_some_and(Node::is_number);
    let (from_decl, from_ref) = match range.from {
        Some(from) => cache_text(from, o, Level::Op, is_complex)?,
        None => ("0".to_string(), "0".to_string()),
    };
    let to = match range.to {
        Some(to) if from_is_number && to.is_number() => {
            let to_text = compile_text(to, o, o.level)?;
            let span = match (super::parse_number(&to_text), super::parse_number(&from_ref)) {
                (Some(to), Some(from)) => to - from + if range.exclusive { 0.0 } else { 1.0 },
                _ => f64::NAN,
            };
            super::format_number(span)
        }
        Some(to) => {
            let to_text = compile_text(to, o, Level::Access)?;
            let mut text = format!("{} - {}", to_text, from_ref);
            if !range.exclusive {
                text.push_str(" + 1");
            }
            text
        }
        None => "9e9".to_string(),
    };
    let (value_def, value_ref) = super::cache_compiled(assign.value, o, Level::List, is_complex)?;
    let mut answer = vec![origin.code(format!(
        "[].splice.apply({}, [{}, {}].concat(",
        name, from_decl, to
    ))];
    answer.extend(value_def);
    answer.push(origin.code(")), "));
    answer.extend(value_ref);
    Ok(if o.level > Level::Top {
        origin.wrap_in_braces(answer)
    } else {
        answer
    })
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
    fn test_plain_assignment_declares() {
        let o = context();
        assert_eq!(text(assign(id("a"), num("1")), &o, Level::Top), "a = 1");
        assert_eq!(o.scope.declared_variables(), vec!["a"]);
        assert_eq!(text(assign(id("b"), id("a")), &o, Level::Op), "(b = a)");
    }

    #[test]
    fn test_unassignable_targets() {
        let o = context();
        let err = compile_to_fragments(assign(num("1"), num("2")), &o, Level::Top).unwrap_err();
        assert_eq!(err.to_string(), "'1' can't be assigned");
        let err = compile_to_fragments(assign(id("eval"), num("2")), &o, Level::Top).unwrap_err();
        assert_eq!(err.to_string(), "'eval' can't be assigned");
    }

    #[test]
    fn test_conditional_assignment_requires_declaration() {
        let o = context();
        let err = compile_to_fragments(compound(id("a"), "||=", num("1")), &o, Level::Top)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "the variable \"a\" can't be assigned with ||= because it has not been declared before"
        );
    }

    #[test]
    fn test_conditional_assignment_forms() {
        let o = context();
        o.scope.find("a");
        assert_eq!(
            text(compound(id("a"), "||=", num("1")), &o, Level::Top),
            "a || (a = 1)"
        );
        assert_eq!(
            text(compound(id("a"), "?=", num("1")), &o, Level::Top),
            "if (a == null) {\n  a = 1;\n}"
        );
        assert_eq!(
            text(compound(id("a"), "?=", num("1")), &o, Level::List),
            "a != null ? a : a = 1"
        );
    }

    #[test]
    fn test_compound_math() {
        let o = context();
        o.scope.find("a");
        assert_eq!(text(compound(id("a"), "+=", num("1")), &o, Level::Top), "a += 1");
        assert_eq!(
            text(compound(id("a"), "**=", num("2")), &o, Level::Top),
            "a = Math.pow(a, 2)"
        );
    }

    #[test]
    fn test_array_destructuring() {
        let o = context();
        let node = assign(arr(vec![id("a"), id("b")]), call(id("f"), vec![]));
        assert_eq!(
            text(node, &o, Level::Top),
            "ref = f(), a = ref[0], b = ref[1]"
        );
        assert_eq!(o.scope.declared_variables(), vec!["ref", "a", "b"]);
    }

    #[test]
    fn test_splat_in_middle_of_pattern() {
        let o = context();
        o.scope.find("list");
        let node = assign(arr(vec![id("a"), splat(id("b")), id("c")]), id("list"));
        assert_eq!(
            text(node, &o, Level::Top),
            "a = list[0], b = 3 <= list.length ? __slice.call(list, 1, i = list.length - 1) \
             : (i = 1, []), c = list[i++]"
        );
    }

    #[test]
    fn test_single_object_element_with_default() {
        let o = context();
        o.scope.find("obj");
        let node = assign(obj(vec![assign(id("a"), num("1"))]), id("obj"));
        assert_eq!(
            text(node, &o, Level::Top),
            "a = (ref = obj.a) != null ? ref : 1"
        );
    }

    #[test]
    fn test_expansion_takes_last() {
        let o = context();
        o.scope.find("xs");
        let node = assign(arr(vec![expansion(), id("last")]), id("xs"));
        assert_eq!(text(node, &o, Level::Top), "last = xs[xs.length - 1]");
    }

    #[test]
    fn test_expansion_between_first_and_last() {
        let o = context();
        o.scope.find("xs");
        let node = assign(arr(vec![id("first"), expansion(), id("last")]), id("xs"));
        assert_eq!(
            text(node, &o, Level::Top),
            "first = xs[0], last = xs[xs.length - 1]"
        );
        assert_eq!(o.scope.declared_variables(), vec!["xs", "first", "last"]);
    }

    #[test]
    fn test_multiple_splats_rejected() {
        let o = context();
        let node = assign(arr(vec![splat(id("a")), splat(id("b"))]), id("xs"));
        let err = compile_to_fragments(node, &o, Level::Top).unwrap_err();
        assert_eq!(
            err.to_string(),
            "multiple splats/expansions are disallowed in an assignment"
        );
    }

    #[test]
    fn test_splice() {
        let o = context();
        o.scope.find("list");
        let node = assign(
            slice(id("list"), Some(num("1")), Some(num("2")), false),
            id("x"),
        );
        assert_eq!(
            text(node, &o, Level::Top),
            "[].splice.apply(list, [1, 2].concat(x)), x"
        );
    }

    #[test]
    fn test_object_context_quotes_reserved_keys() {
        let o = context();
        let node = obj(vec![obj_prop("class", num("1")), obj_prop("b", num("2"))]);
        assert_eq!(text(node, &o, Level::List), "{\n  \"class\": 1,\n  b: 2\n}");
    }
}
