//! Values, property chains, literals with children and calls

use super::{
    compile_text, compile_to_fragments, ident, is_complex, is_simple_number, raw, Context, Level,
    Soak, TAB,
};
use crate::ast::{
    Access, Arr, Assign, Call, If, Index, Literal, LiteralKind, Node, NodeKind, Obj, Parens,
    Property, Value,
};
use crate::error::{Error, LocationData, Result};
use crate::fragment::{fragments_to_text, Fragments, Origin};
use crate::helpers::{utility, Helper};
use crate::keywords::{is_identifier, is_js_forbidden};

pub(crate) fn compile_value(
    value: Value,
    loc: Option<LocationData>,
    front: bool,
    o: &Context,
) -> Result<Fragments> {
    let origin = Origin::new(loc, "Value");
    let Value {
        mut base,
        properties,
        ..
    } = value;
    base.front = front;
    let level = if properties.is_empty() { o.level } else { Level::Access };
    let mut fragments = compile_to_fragments(base, o, level)?;
    if !properties.is_empty() && is_simple_number(&fragments_to_text(&fragments)) {
        fragments.push(origin.code("."));
    }
    for property in properties {
        fragments.extend(compile_property(property, loc, o)?);
    }
    Ok(fragments)
}

/// `.name`, `[index]` or `.slice(...)`
pub(crate) fn compile_property(
    property: Property,
    loc: Option<LocationData>,
    o: &Context,
) -> Result<Fragments> {
    match property {
        Property::Access(access) => Ok(compile_access(access, loc)),
        Property::Index(index) => {
            let origin = Origin::new(loc, "Index");
            let mut fragments = vec![origin.code("[")];
            fragments.extend(compile_to_fragments(index.index, o, Level::Paren)?);
            fragments.push(origin.code("]"));
            Ok(fragments)
        }
        Property::Slice(slice) => compile_slice(slice.range, loc, o),
    }
}

fn compile_access(access: Access, loc: Option<LocationData>) -> Fragments {
    let origin = Origin::new(loc, "Access");
    let name = access.name;
    let is_name = matches!(name.kind, LiteralKind::PropertyName | LiteralKind::Identifier);
    if !is_name {
        return vec![origin.code("["), origin.code(name.value), origin.code("]")];
    }
    if is_js_forbidden(&name.value) || !is_identifier(&name.value) {
        vec![origin.code("[\""), origin.code(name.value), origin.code("\"]")]
    } else {
        vec![origin.code("."), origin.code(name.value)]
    }
}

fn compile_slice(
    range: crate::ast::Range,
    loc: Option<LocationData>,
    o: &Context,
) -> Result<Fragments> {
    let origin = Origin::new(loc, "Slice");
    let from = match range.from {
        Some(from) => compile_text(from, o, Level::Paren)?,
        None => "0".to_string(),
    };
    let mut to_part = String::new();
    if let Some(to) = range.to {
        let is_number = to.is_number();
        let compiled = compile_text(to.clone(), o, Level::Paren)?;
        let value = super::parse_number(&compiled);
        if range.exclusive || value != Some(-1.0) {
            to_part = if range.exclusive {
                format!(", {}", compiled)
            } else if let (true, Some(value)) = (is_number, value) {
                format!(", {}", super::format_number(value + 1.0))
            } else {
                let compiled = compile_text(to, o, Level::Access)?;
                format!(", +{} + 1 || 9e9", compiled)
            };
        }
    }
    Ok(vec![origin.code(format!(".slice({}{})", from, to_part))])
}

/// Split a chain into a base that is safe to evaluate once and a reference
/// that reads the same property again: `a().b` becomes `(base = a()).b` and
/// `base.b`
pub(crate) fn cache_reference(value: Value, loc: Option<LocationData>, o: &Context) -> (Node, Node) {
    let name_is_complex = value.properties.last().is_some_and(Property::is_complex);
    if value.properties.len() < 2 && !value.base.is_complex() && !name_is_complex {
        let node = Node::from(value).with_loc(loc);
        return (node.clone(), node);
    }
    let mut value = value;
    let name = value.properties.pop();
    let mut base = Node::from(value).with_loc(loc);
    let mut base_ref = None;
    if base.is_complex() {
        let reference = ident(&o.scope.free_variable("base", false, true));
        let assign = Node::from(Assign::new(reference.clone(), base)).with_loc(loc);
        base = Node::from(Value::new(Node::from(Parens { body: assign }))).with_loc(loc);
        base_ref = Some(reference);
    }
    let Some(name) = name else {
        let reference = base_ref.unwrap_or_else(|| base.clone());
        return (base, reference);
    };
    let (name, name_ref) = match name {
        Property::Index(index) if index.index.is_complex() => {
            let reference = ident(&o.scope.free_variable("name", false, true));
            let cached = Node::from(Assign::new(reference.clone(), index.index));
            (
                Property::Index(Index {
                    index: cached,
                    soak: index.soak,
                }),
                Some(Property::Index(Index {
                    index: reference,
                    soak: false,
                })),
            )
        }
        name => (name, None),
    };
    let right_base = base_ref.unwrap_or_else(|| base.clone().unwrap());
    let right = Value::with_properties(right_base, vec![name_ref.unwrap_or_else(|| name.clone())]);
    let mut left = Value::from_node(base);
    left.properties.push(name);
    (
        Node::from(left).with_loc(loc),
        Node::from(right).with_loc(loc),
    )
}

/// `a?.b` becomes `if a? then a.b`; the prefix before the soak is cached
pub(crate) fn unfold_value(
    mut value: Value,
    loc: Option<LocationData>,
    front: bool,
    o: &Context,
) -> Result<Soak> {
    match super::unfold_soak(value.base.take(), o)? {
        Soak::Unfolded(mut ifn, if_loc) => {
            let mut body = Value::from_node(ifn.body.take());
            body.properties.append(&mut value.properties);
            ifn.body = Node::from(body);
            return Ok(Soak::Unfolded(ifn, if_loc));
        }
        Soak::Intact(base) => value.base = base,
    }
    let Some(index) = value.properties.iter().position(Property::soak) else {
        return Ok(Soak::Intact(Node {
            kind: NodeKind::Value(Box::new(value)),
            loc,
            front,
        }));
    };
    value.properties[index].clear_soak();
    let rest = value.properties.split_off(index);
    let first = Node::from(value).with_loc(loc);
    let (first, second_base) = if first.is_complex() {
        let reference = ident(&o.scope.free_variable("ref", false, true));
        let assign = Node::from(Assign::new(reference.clone(), first)).with_loc(loc);
        (Node::from(Parens { body: assign }).with_loc(loc), reference)
    } else {
        let base = first.clone().unwrap();
        (first, base)
    };
    let second = Node::from(Value::with_properties(second_base, rest)).with_loc(loc);
    let mut ifn = If::new(
        Node::from(crate::ast::Existence {
            expression: first,
            negated: false,
        })
        .with_loc(loc),
        second,
    );
    ifn.soak = true;
    Ok(Soak::Unfolded(ifn, loc))
}

/// `f?(x)` becomes `typeof f === "function" ? f(x) : void 0`
pub(crate) fn unfold_soaked_call(
    mut call: Call,
    loc: Option<LocationData>,
    front: bool,
    o: &Context,
) -> Result<Soak> {
    match super::unfold_soak(call.variable.take(), o)? {
        Soak::Unfolded(mut ifn, if_loc) => {
            call.variable = ifn.body.take();
            ifn.body = Node::from(Value::new(
                Node {
                    kind: NodeKind::Call(Box::new(call)),
                    loc,
                    front,
                },
            ));
            return Ok(Soak::Unfolded(ifn, if_loc));
        }
        Soak::Intact(variable) => call.variable = variable,
    }
    let variable_loc = call.variable.loc;
    let (left, right) = cache_reference(Value::from_node(call.variable), variable_loc, o);
    let mut callee = Call::new(right, call.args);
    callee.is_new = call.is_new;
    let test = format!("typeof {} === \"function\"", compile_text(left, o, o.level)?);
    let body = Node::from(Value::new(Node::from(callee).with_loc(loc)));
    let mut ifn = If::new(raw(&test).with_loc(loc), body);
    ifn.soak = true;
    Ok(Soak::Unfolded(ifn, loc))
}

fn is_dynamic_key(prop: &Node) -> bool {
    let key = match &prop.kind {
        NodeKind::Assign(assign) => &assign.variable,
        _ => prop,
    };
    matches!(&key.kind, NodeKind::Value(v) if matches!(v.base.kind, NodeKind::Parens(_)))
}

pub(crate) fn compile_obj(
    obj: Obj,
    loc: Option<LocationData>,
    front: bool,
    o: &Context,
) -> Result<Fragments> {
    let origin = Origin::new(loc, "Obj");
    let props = obj.properties;
    if obj.generated {
        if let Some(node) = props.iter().find(|p| matches!(p.kind, NodeKind::Value(_))) {
            return Err(node.error("cannot have an implicit value in an implicit object"));
        }
    }
    let tab = o.indent.clone();
    let o = o.indented();
    let idt = o.indent.clone();
    let count = props.len();
    let dynamic_index = props.iter().position(is_dynamic_key).unwrap_or(count);
    let has_dynamic = dynamic_index < count;
    let last_non_comment = props
        .iter()
        .rposition(|p| !matches!(p.kind, NodeKind::Comment(_)));

    let mut answer = Vec::new();
    let obj_ref = if has_dynamic {
        let name = o.scope.free_variable("obj", false, true);
        answer.push(origin.code(format!("(\n{}{} = ", idt, name)));
        name
    } else {
        String::new()
    };
    answer.push(origin.code(if count == 0 || dynamic_index == 0 { "{}" } else { "{\n" }));
    for (i, prop) in props.into_iter().enumerate() {
        if i == dynamic_index {
            if i != 0 {
                answer.push(origin.code(format!("\n{}}}", idt)));
            }
            answer.push(origin.code(",\n"));
        }
        let is_comment = matches!(prop.kind, NodeKind::Comment(_));
        let join = if i + 1 == count || i + 1 == dynamic_index {
            ""
        } else if Some(i) == last_non_comment || is_comment {
            "\n"
        } else {
            ",\n"
        };
        let mut indent = if is_comment { String::new() } else { idt.clone() };
        if has_dynamic && i < dynamic_index {
            indent.push_str(TAB);
        }
        if let NodeKind::Assign(assign) = &prop.kind {
            if !assign.is_object_context() {
                let operator = assign.context.as_deref().unwrap_or("=");
                return Err(prop.error(format!("unexpected {}", operator)));
            }
            if assign.variable.as_value().is_some_and(Value::has_properties) {
                return Err(assign.variable.error("invalid object key"));
            }
        }
        let prop = object_member(prop);
        let prop = if is_comment {
            prop
        } else if i < dynamic_index {
            match prop.kind {
                NodeKind::Assign(_) => prop,
                _ => Node::from(Assign::with_context(prop.clone(), prop, "object")),
            }
        } else {
            dynamic_member(prop, &obj_ref, &o)
        };
        if !indent.is_empty() {
            answer.push(origin.code(indent));
        }
        answer.extend(compile_to_fragments(prop, &o, Level::Top)?);
        if !join.is_empty() {
            answer.push(origin.code(join));
        }
    }
    if has_dynamic {
        answer.push(origin.code(format!(",\n{}{}\n{})", idt, obj_ref, tab)));
    } else if count != 0 {
        answer.push(origin.code(format!("\n{}}}", tab)));
    }
    Ok(if front && !has_dynamic {
        origin.wrap_in_braces(answer)
    } else {
        answer
    })
}

/// `@name` inside an object literal is shorthand for `name: @name`
fn object_member(prop: Node) -> Node {
    let key = match prop.as_value() {
        Some(value) if value.this => value.properties.first().and_then(Property::access_name),
        _ => None,
    };
    match key {
        Some(key) => {
            let key = Node::from(Literal::property(key));
            let loc = prop.loc;
            Node::from(Assign::with_context(key, prop, "object")).with_loc(loc)
        }
        None => prop,
    }
}

/// A member after the first computed key is assigned onto the object
/// being built
fn dynamic_member(prop: Node, obj_ref: &str, o: &Context) -> Node {
    let loc = prop.loc;
    let (key, value) = match prop.kind {
        NodeKind::Assign(assign) => (assign.variable, assign.value),
        kind => {
            let base = Node { kind, loc, front: false }.unwrap();
            super::cache(base, o, is_complex)
        }
    };
    let property = match key.unwrap_ref().as_literal() {
        Some(l) if matches!(l.kind, LiteralKind::PropertyName | LiteralKind::Identifier) => {
            Property::Access(Access::new(l.value.clone()))
        }
        _ => Property::Index(Index {
            index: key,
            soak: false,
        }),
    };
    let target = Value::with_properties(ident(obj_ref), vec![property]);
    Node::from(Assign::new(Node::from(target), value)).with_loc(loc)
}

pub(crate) fn has_splat(list: &[Node]) -> bool {
    list.iter().any(|n| matches!(n.kind, NodeKind::Splat(_)))
}

/// Lower a list containing splats into array operations; with `apply` a
/// lone splat is passed through as is
pub(crate) fn compile_splatted_array(
    mut list: Vec<Node>,
    o: &Context,
    apply: bool,
) -> Result<Fragments> {
    let index = list
        .iter()
        .position(|n| matches!(n.kind, NodeKind::Splat(_)))
        .ok_or_else(|| Error::internal("splatted array without a splat"))?;
    let sliced = |origin: Origin, fragments: Fragments| -> Fragments {
        let mut out = vec![origin.code(format!("{}.call(", utility(Helper::Slice, &o.scope)))];
        out.extend(fragments);
        out.push(origin.code(")"));
        out
    };
    if list.len() == 1 {
        let node = list.remove(0);
        let origin = node.origin();
        let fragments = compile_to_fragments(node, o, Level::List)?;
        return Ok(if apply { fragments } else { sliced(origin, fragments) });
    }
    let first = list[0].origin();
    let splat = list[index].origin();
    let last = list[list.len() - 1].origin();
    let rest = list.split_off(index);
    let mut args = Vec::with_capacity(rest.len());
    for node in rest {
        let origin = node.origin();
        let is_splat = matches!(node.kind, NodeKind::Splat(_));
        let fragments = compile_to_fragments(node, o, Level::List)?;
        args.push(if is_splat {
            sliced(origin, fragments)
        } else {
            let mut wrapped = vec![origin.code("[")];
            wrapped.extend(fragments);
            wrapped.push(origin.code("]"));
            wrapped
        });
    }
    if index == 0 {
        let mut args = args.into_iter();
        let mut fragments = args.next().unwrap_or_default();
        fragments.push(first.code(".concat("));
        fragments.extend(first.join(args.collect(), ", "));
        fragments.push(first.code(")"));
        return Ok(fragments);
    }
    let mut base = Vec::with_capacity(list.len());
    for node in list {
        base.push(compile_to_fragments(node, o, Level::List)?);
    }
    let mut fragments = vec![first.code("[")];
    fragments.extend(first.join(base, ", "));
    fragments.push(splat.code("].concat("));
    fragments.extend(splat.join(args, ", "));
    fragments.push(last.code(")"));
    Ok(fragments)
}

pub(crate) fn compile_arr(arr: Arr, loc: Option<LocationData>, o: &Context) -> Result<Fragments> {
    let origin = Origin::new(loc, "Arr");
    if arr.objects.is_empty() {
        return Ok(vec![origin.code("[]")]);
    }
    let tab = o.indent.clone();
    let o = o.indented();
    if has_splat(&arr.objects) {
        return compile_splatted_array(arr.objects, &o, false);
    }
    let mut compiled = Vec::with_capacity(arr.objects.len());
    for object in arr.objects {
        compiled.push(compile_to_fragments(object, &o, Level::List)?);
    }
    let mut answer = origin.join(compiled, ", ");
    if fragments_to_text(&answer).contains('\n') {
        answer.insert(0, origin.code(format!("[\n{}", o.indent)));
        answer.push(origin.code(format!("\n{}]", tab)));
    } else {
        answer.insert(0, origin.code("["));
        answer.push(origin.code("]"));
    }
    Ok(answer)
}

/// Arguments separated by commas
pub(crate) fn compile_args(args: Vec<Node>, o: &Context, origin: Origin) -> Result<Fragments> {
    let mut compiled = Vec::with_capacity(args.len());
    for arg in args {
        compiled.push(compile_to_fragments(arg, o, Level::List)?);
    }
    Ok(origin.join(compiled, ", "))
}

pub(crate) fn compile_call(
    call: Call,
    loc: Option<LocationData>,
    front: bool,
    o: &Context,
) -> Result<Fragments> {
    let origin = Origin::new(loc, "Call");
    if call.variable.as_value().is_some_and(Value::is_not_callable) {
        return Err(call.variable.error("literal is not a function"));
    }
    let mut variable = call.variable;
    variable.front = front;
    if has_splat(&call.args) {
        let args = compile_splatted_array(call.args, o, true)?;
        return compile_splat_call(variable, call.is_new, args, origin, o);
    }
    let args = compile_args(call.args, o, origin)?;
    let mut fragments = Vec::new();
    if call.is_new {
        fragments.push(origin.code("new "));
    }
    fragments.extend(compile_to_fragments(variable, o, Level::Access)?);
    fragments.push(origin.code("("));
    fragments.extend(args);
    fragments.push(origin.code(")"));
    Ok(fragments)
}

/// `f(args...)` through `Function.prototype.apply`
fn compile_splat_call(
    variable: Node,
    is_new: bool,
    args: Fragments,
    origin: Origin,
    o: &Context,
) -> Result<Fragments> {
    if is_new {
        let tab = &o.indent;
        let idt = format!("{}{}", tab, TAB);
        let mut fragments = vec![origin.code(format!(
            "(function(func, args, ctor) {{\n{idt}ctor.prototype = func.prototype;\n\
             {idt}var child = new ctor, result = func.apply(child, args);\n\
             {idt}return Object(result) === result ? result : child;\n{tab}}})(",
            idt = idt,
            tab = tab
        ))];
        fragments.extend(compile_to_fragments(variable, o, Level::List)?);
        fragments.push(origin.code(", "));
        fragments.extend(args);
        fragments.push(origin.code(", function(){})"));
        return Ok(fragments);
    }
    let loc = variable.loc;
    let mut base = Value::from_node(variable);
    let name = base.properties.pop();
    let base = Node::from(base).with_loc(loc);
    let mut fragments = Vec::new();
    let context = match name {
        Some(name) if base.is_complex() => {
            let reference = o.scope.free_variable("ref", false, true);
            fragments.push(origin.code(format!("({} = ", reference)));
            fragments.extend(compile_to_fragments(base, o, Level::List)?);
            fragments.push(origin.code(")"));
            fragments.extend(compile_property(name, loc, o)?);
            reference
        }
        name => {
            let mut fun = compile_to_fragments(base, o, Level::Access)?;
            if is_simple_number(&fragments_to_text(&fun)) {
                fun = origin.wrap_in_braces(fun);
            }
            let context = match name {
                Some(name) => {
                    let context = fragments_to_text(&fun);
                    fun.extend(compile_property(name, loc, o)?);
                    context
                }
                None => "null".to_string(),
            };
            fragments.extend(fun);
            context
        }
    };
    fragments.push(origin.code(format!(".apply({}, ", context)));
    fragments.extend(args);
    fragments.push(origin.code(")"));
    Ok(fragments)
}

pub(crate) fn compile_parens(
    parens: Parens,
    loc: Option<LocationData>,
    front: bool,
    o: &Context,
) -> Result<Fragments> {
    let origin = Origin::new(loc, "Parens");
    let mut expr = match parens.body.kind {
        NodeKind::Block(_) => parens.body.unwrap(),
        _ => parens.body,
    };
    if expr.as_value().is_some_and(Value::is_atomic) {
        expr.front = front;
        return compile_to_fragments(expr, o, o.level);
    }
    let may_be_bare = match &expr.kind {
        NodeKind::Op(_) | NodeKind::Call(_) => true,
        NodeKind::For(node) => node.body.loop_jumps().is_none(),
        _ => false,
    };
    let fragments = compile_to_fragments(expr, o, Level::Paren)?;
    let bare = o.level < Level::Op
        && may_be_bare
        && (o.level < Level::Cond || fragments.len() <= 3);
    Ok(if bare {
        fragments
    } else {
        origin.wrap_in_braces(fragments)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::*;
    use crate::options::CompileOptions;
    use crate::scope::Scope;

    fn context() -> Context {
        Context::new(Scope::root(Vec::<String>::new()), &CompileOptions::default())
    }

    fn text(node: Node, o: &Context) -> String {
        fragments_to_text(&compile_to_fragments(node, o, Level::Top).unwrap())
    }

    #[test]
    fn test_access_quotes_forbidden_names() {
        let o = context();
        assert_eq!(text(access(id("a"), "class"), &o), "a[\"class\"]");
        assert_eq!(text(access(id("a"), "b"), &o), "a.b");
        assert_eq!(text(access(num("1"), "toString"), &o), "1..toString");
    }

    #[test]
    fn test_slice_endpoints() {
        let o = context();
        assert_eq!(
            text(slice(id("a"), Some(num("1")), Some(num("3")), false), &o),
            "a.slice(1, 4)"
        );
        assert_eq!(
            text(slice(id("a"), None, Some(unary("-", num("1"))), false), &o),
            "a.slice(0)"
        );
        assert_eq!(
            text(slice(id("a"), Some(num("1")), Some(id("n")), false), &o),
            "a.slice(1, +n + 1 || 9e9)"
        );
    }

    #[test]
    fn test_cache_reference_splits_chain() {
        let o = context();
        let chain = call(id("a"), vec![]);
        let value = Value::with_properties(chain, vec![Property::Access(Access::new("b"))]);
        let (left, right) = cache_reference(value, None, &o);
        assert_eq!(text(left, &o), "(base = a()).b");
        assert_eq!(text(right, &o), "base.b");
    }

    #[test]
    fn test_splatted_call_uses_apply() {
        let o = context();
        let node = call(access(id("obj"), "f"), vec![splat(id("args"))]);
        assert_eq!(text(node, &o), "obj.f.apply(obj, args)");
    }

    #[test]
    fn test_splatted_array_concat() {
        let o = context();
        let node = arr(vec![id("a"), splat(id("b")), id("c")]);
        assert_eq!(text(node, &o), "[a].concat(__slice.call(b), [c])");
    }
}
