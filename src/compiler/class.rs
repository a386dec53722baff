//! Classes, `extends` and `super`

use std::rc::Rc;

use super::{
    block, compile_to_fragments, ident, raw,
    value::{compile_args, compile_property, compile_splatted_array, has_splat},
    Context,
};
use crate::ast::{
    is_literal_arguments, Access, Assign, Block, Call, ChildMut, Class, Code, Extends, Index, Jump,
    LiteralKind, Node, NodeKind, Param, Parens, Property, Splat, SuperCall, Value,
};
use crate::error::{Error, LocationData, Result};
use crate::fragment::{fragments_to_text, Fragments, Origin};
use crate::helpers::{utility, Helper};
use crate::keywords::{is_js_forbidden, unassignable_reason};
use crate::scope::{MethodInfo, Scope};

/// The expression `super` resolves to in the current method
fn super_reference(o: &Context, loc: Option<LocationData>) -> Result<String> {
    let method = o.scope.named_method();
    match method {
        Some(MethodInfo {
            klass: Some(klass),
            name,
            is_static,
            ..
        }) => {
            let constructor = if is_static { ".constructor" } else { "" };
            Ok(format!(
                "{}.__super__{}{}",
                klass,
                constructor,
                name.unwrap_or_default()
            ))
        }
        Some(MethodInfo {
            is_ctor: true,
            name: Some(name),
            ..
        }) => Ok(format!("{}.__super__.constructor", name)),
        _ => Err(Error::compile_error(
            "cannot call super outside of an instance method.",
            loc,
        )),
    }
}

/// What `this` the overridden method is invoked with
fn super_this(o: &Context) -> String {
    match o.scope.method() {
        Some(method) if method.klass.is_none() => method
            .context
            .clone()
            .unwrap_or_else(|| "this".to_string()),
        _ => "this".to_string(),
    }
}

pub(crate) fn compile_super_call(
    call: SuperCall,
    loc: Option<LocationData>,
    o: &Context,
) -> Result<Fragments> {
    let origin = Origin::new(loc, "SuperCall");
    let reference = super_reference(o, loc)?;
    let this = super_this(o);
    let args = call.args.unwrap_or_else(|| {
        vec![Node::from(Splat {
            name: ident("arguments"),
        })]
    });
    if has_splat(&args) {
        let mut fragments = vec![origin.code(format!("{}.apply({}, ", reference, this))];
        fragments.extend(compile_splatted_array(args, o, true)?);
        fragments.push(origin.code(")"));
        return Ok(fragments);
    }
    let mut preface = format!("{}.call({}", reference, this);
    if !args.is_empty() {
        preface.push_str(", ");
    }
    let mut fragments = vec![origin.code(preface)];
    fragments.extend(compile_args(args, o, origin)?);
    fragments.push(origin.code(")"));
    Ok(fragments)
}

/// `__extends(child, parent)`
pub(crate) fn compile_extends(
    extends: Extends,
    loc: Option<LocationData>,
    o: &Context,
) -> Result<Fragments> {
    let helper = utility(Helper::Extends, &o.scope);
    let call = Call::new(
        Node::from(Value::new(raw(&helper))),
        vec![extends.child, extends.parent],
    );
    compile_to_fragments(Node::from(call).with_loc(loc), o, o.level)
}

/// The name the class function is declared with
fn class_name(variable: Option<&Node>) -> Result<String> {
    const DEFAULT: &str = "_Class";
    let Some(variable) = variable else {
        return Ok(DEFAULT.to_string());
    };
    let value = variable.as_value();
    let tail = value.and_then(|v| v.properties.last());
    let literal = match (tail, value) {
        (Some(Property::Access(access)), _) => Some(&access.name),
        (Some(_), _) => None,
        (None, Some(value)) => value.base.as_literal(),
        (None, None) => variable.as_literal(),
    };
    let Some(literal) = literal.filter(|l| {
        matches!(l.kind, LiteralKind::Identifier | LiteralKind::PropertyName)
    }) else {
        return Ok(DEFAULT.to_string());
    };
    if tail.is_none() {
        if let Some(reason) = unassignable_reason(&literal.value) {
            return Err(variable.error(reason));
        }
    }
    Ok(if is_js_forbidden(&literal.value) {
        format!("_{}", literal.value)
    } else {
        literal.value.clone()
    })
}

/// Point `this` and bound functions in the class body at the class itself
fn set_context(node: &mut Node, name: &str) {
    match &mut node.kind {
        NodeKind::Literal(literal) if literal.kind == LiteralKind::This => {
            literal.value = name.to_string();
            return;
        }
        NodeKind::Code(code) => {
            if code.bound {
                code.meta.context = Some(name.to_string());
            }
            return;
        }
        NodeKind::Class(_) => return,
        _ => {}
    }
    for child in node.children_mut() {
        match child {
            ChildMut::Node(child) => set_context(child, name),
            ChildMut::Block(block) => {
                for child in block.expressions.iter_mut() {
                    set_context(child, name);
                }
            }
        }
    }
}

/// What walking a class body collects
struct ClassBody<'a> {
    name: &'a str,
    scope: &'a Rc<Scope>,
    has_ctor: bool,
    external_ctor: Option<String>,
    bound_funcs: Vec<Property>,
}

impl ClassBody<'_> {
    /// Turn the members of an implicit object into prototype assignments,
    /// static assignments and the constructor
    fn add_properties(&mut self, properties: Vec<Node>) -> Result<Vec<Node>> {
        let mut exprs = Vec::with_capacity(properties.len());
        for node in properties {
            let loc = node.loc;
            let NodeKind::Assign(mut assign) = node.kind else {
                exprs.push(node);
                continue;
            };
            assign.context = None;
            let base_value = assign.variable.as_value().map(|v| (v.this, v.base.clone()));
            let (is_this, base) = match base_value {
                Some(parts) => parts,
                None => (false, assign.variable.clone()),
            };
            let is_constructor = !is_this
                && base
                    .as_literal()
                    .is_some_and(|l| l.kind == LiteralKind::PropertyName && l.value == "constructor");
            if is_constructor {
                if self.has_ctor {
                    return Err(Error::compile_error(
                        "cannot define more than one constructor in a class",
                        loc,
                    ));
                }
                let mut value = assign.value;
                if let NodeKind::Code(code) = &mut value.kind {
                    if code.bound {
                        return Err(Error::compile_error(
                            "cannot define a constructor as a bound function",
                            loc,
                        ));
                    }
                    code.meta.ctor = Some(self.name.to_string());
                    code.meta.klass = None;
                    code.meta.no_return = true;
                    self.has_ctor = true;
                    exprs.push(value);
                } else {
                    let external = self.scope.free_variable("ctor", false, true);
                    exprs.push(Node::from(Assign::new(ident(&external), value)).with_loc(loc));
                    self.external_ctor = Some(external);
                }
                continue;
            }
            if is_this {
                if let NodeKind::Code(code) = &mut assign.value.kind {
                    code.meta.is_static = true;
                }
            } else {
                let property = match base.kind {
                    NodeKind::Literal(name) if name.kind == LiteralKind::PropertyName => {
                        Property::Access(Access { name, soak: false })
                    }
                    kind => Property::Index(Index {
                        index: Node { kind, ..base },
                        soak: false,
                    }),
                };
                if let NodeKind::Code(code) = &mut assign.value.kind {
                    if code.bound {
                        code.bound = false;
                        self.bound_funcs.push(property.clone());
                    }
                }
                assign.variable = Node::from(Value::with_properties(
                    ident(self.name),
                    vec![Property::Access(Access::new("prototype")), property],
                ));
            }
            exprs.push(Node::from(*assign).with_loc(loc));
        }
        Ok(exprs)
    }

    /// Rewrite the body's implicit objects, descending into nested blocks of
    /// the same function when none are found
    fn walk(&mut self, block: &mut Block) -> Result<()> {
        let mut found_object = false;
        let mut exprs = Vec::with_capacity(block.expressions.len());
        for mut node in std::mem::take(&mut block.expressions) {
            if let NodeKind::Assign(assign) = &mut node.kind {
                let looks_static = assign
                    .variable
                    .as_value()
                    .is_some_and(|v| v.looks_static(self.name));
                if looks_static {
                    if let NodeKind::Code(code) = &mut assign.value.kind {
                        code.meta.is_static = true;
                    }
                }
                exprs.push(node);
                continue;
            }
            let is_implicit_object = node.as_value().is_some_and(|v| v.is_object(true));
            if !is_implicit_object {
                exprs.push(node);
                continue;
            }
            found_object = true;
            let NodeKind::Value(value) = node.kind else {
                continue;
            };
            let NodeKind::Obj(obj) = value.base.kind else {
                continue;
            };
            exprs.extend(self.add_properties(obj.properties)?);
        }
        block.expressions = exprs;
        if found_object {
            return Ok(());
        }
        for node in block.expressions.iter_mut() {
            self.walk_node(node)?;
        }
        Ok(())
    }

    fn walk_node(&mut self, node: &mut Node) -> Result<()> {
        if matches!(node.kind, NodeKind::Class(_) | NodeKind::Code(_)) {
            return Ok(());
        }
        if let NodeKind::Block(block) = &mut node.kind {
            return self.walk(block);
        }
        for child in node.children_mut() {
            match child {
                ChildMut::Block(block) => self.walk(block)?,
                ChildMut::Node(child) => self.walk_node(child)?,
            }
        }
        Ok(())
    }
}

/// Apply `f` to the constructor somewhere in the class body
fn with_ctor(block: &mut Block, f: &mut dyn FnMut(&mut Code)) {
    for node in block.expressions.iter_mut() {
        if let NodeKind::Code(code) = &mut node.kind {
            if code.meta.ctor.is_some() {
                f(&mut **code);
                return;
            }
        }
    }
    for node in block.expressions.iter_mut() {
        let mut done = false;
        node.traverse_children_mut(false, &mut |child| {
            if done {
                return false;
            }
            if let NodeKind::Code(code) = &mut child.kind {
                if code.meta.ctor.is_some() {
                    f(&mut **code);
                    done = true;
                }
                return false;
            }
            !matches!(child.kind, NodeKind::Class(_))
        });
        if done {
            return;
        }
    }
}

pub(crate) fn compile_class(
    class: Class,
    loc: Option<LocationData>,
    o: &Context,
) -> Result<Fragments> {
    let Class {
        variable,
        parent,
        mut body,
    } = class;
    if let Some(jump) = body.jumps(Jump::empty()) {
        return Err(jump.error("Class bodies cannot contain pure statements"));
    }
    if let Some(node) = body.find_child(&is_literal_arguments) {
        return Err(node.error("Class bodies shouldn't reference arguments"));
    }

    let name = class_name(variable.as_ref())?;
    tracing::trace!(class = %name, "lowering class");
    let class_scope = Scope::child(&o.scope, MethodInfo::default());

    let prologue = body
        .expressions
        .iter()
        .position(|node| match &node.unwrap_ref().kind {
            NodeKind::Comment(_) => false,
            NodeKind::Literal(l) => l.kind != LiteralKind::String,
            _ => true,
        })
        .unwrap_or(body.expressions.len());
    let rest = body.expressions.split_off(prologue);
    let directives = std::mem::replace(&mut body.expressions, rest);

    for node in body.expressions.iter_mut() {
        set_context(node, &name);
    }
    let mut walker = ClassBody {
        name: &name,
        scope: &class_scope,
        has_ctor: false,
        external_ctor: None,
        bound_funcs: Vec::new(),
    };
    walker.walk(&mut body)?;
    let ClassBody {
        has_ctor,
        external_ctor,
        bound_funcs,
        ..
    } = walker;

    if !has_ctor {
        tracing::debug!(class = %name, external = ?external_ctor, "synthesizing constructor");
        let mut ctor_body = Block::default();
        if let Some(external) = &external_ctor {
            ctor_body.push(raw(&format!("{}.apply(this, arguments)", external)));
        } else if parent.is_some() {
            ctor_body.push(raw(&format!(
                "{}.__super__.constructor.apply(this, arguments)",
                name
            )));
        }
        let mut ctor = Code::new(Vec::new(), block::make_return(ctor_body, None));
        ctor.meta.ctor = Some(name.clone());
        ctor.meta.no_return = true;
        body.unshift(Node::from(ctor));
    }

    if !bound_funcs.is_empty() {
        let bind = utility(Helper::Bind, &o.scope);
        let mut bindings = Vec::with_capacity(bound_funcs.len());
        for property in bound_funcs {
            let accessor = fragments_to_text(&compile_property(property, loc, o)?);
            bindings.push(raw(&format!(
                "this{accessor} = {bind}(this{accessor}, this)",
                accessor = accessor,
                bind = bind
            )));
        }
        with_ctor(&mut body, &mut |code| {
            for binding in bindings.drain(..) {
                code.body.unshift(binding);
            }
        });
    }

    body.spaced = true;
    body.push(ident(&name));

    let mut params = Vec::new();
    let mut args = Vec::new();
    if let Some(parent) = parent {
        let super_class = class_scope.free_variable("superClass", false, false);
        body.unshift(Node::from(Extends {
            child: ident(&name),
            parent: ident(&super_class),
        }));
        params.push(Param::new(ident(&super_class)));
        args.push(parent);
    }
    for directive in directives.into_iter().rev() {
        body.unshift(directive);
    }

    let func = Node::from(Code::new(params, body)).with_loc(loc);
    let call = Node::from(Call::new(func, args)).with_loc(loc);
    let mut klass = Node::from(Parens { body: call }).with_loc(loc);
    if let Some(variable) = variable {
        klass = Node::from(Assign::new(variable, klass)).with_loc(loc);
    }
    let mut o = o.clone();
    o.class_scope = Some(class_scope);
    compile_to_fragments(klass, &o, o.level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::*;
    use crate::compiler::{compile_text, Level};
    use crate::options::CompileOptions;
    use pretty_assertions::assert_eq;

    fn context() -> Context {
        Context::new(
            Scope::root(Vec::<String>::new()),
            &CompileOptions::default().with_bare(true),
        )
    }

    fn top(node: Node) -> String {
        compile_text(node, &context(), Level::Top).unwrap()
    }

    fn error(node: Node) -> String {
        compile_to_fragments(node, &context(), Level::Top)
            .unwrap_err()
            .to_string()
    }

    #[test]
    fn test_empty_class() {
        assert_eq!(
            top(class(Some(id("A")), None, vec![])),
            "A = (function() {\n  function A() {}\n\n  return A;\n\n})()"
        );
    }

    #[test]
    fn test_methods_go_on_the_prototype() {
        let body = vec![implicit_obj(vec![obj_prop("greet", func(vec![], vec![string("hi")]))])];
        assert_eq!(
            top(class(Some(id("A")), None, body)),
            "A = (function() {\n  function A() {}\n\n  A.prototype.greet = function() {\n    \
             return \"hi\";\n  };\n\n  return A;\n\n})()"
        );
    }

    #[test]
    fn test_subclass_forwards_to_parent() {
        let out = top(class(Some(id("B")), Some(id("A")), vec![]));
        assert_eq!(
            out,
            "B = (function(superClass) {\n  __extends(B, superClass);\n\n  function B() {\n    \
             return B.__super__.constructor.apply(this, arguments);\n  }\n\n  return B;\n\n})(A)"
        );
    }

    #[test]
    fn test_super_in_method() {
        let method = func(vec![param("x")], vec![super_call(Some(vec![id("x")]))]);
        let body = vec![implicit_obj(vec![obj_prop("run", method)])];
        let out = top(class(Some(id("B")), Some(id("A")), body));
        assert!(out.contains(
            "B.prototype.run = function(x) {\n    return B.__super__.run.call(this, x);\n  };"
        ));
    }

    #[test]
    fn test_bare_super_forwards_arguments() {
        let body = vec![implicit_obj(vec![obj_prop(
            "constructor",
            func(vec![], vec![super_call(None)]),
        )])];
        let out = top(class(Some(id("B")), Some(id("A")), body));
        assert!(out.contains(
            "function B() {\n    B.__super__.constructor.apply(this, arguments);\n  }"
        ));
    }

    #[test]
    fn test_static_members_use_the_class_name() {
        let body = vec![implicit_obj(vec![static_prop("make", func(vec![], vec![]))])];
        let out = top(class(Some(id("A")), None, body));
        assert!(out.contains("A.make = function() {};"));
    }

    #[test]
    fn test_bound_methods_are_bound_in_constructor() {
        let body = vec![implicit_obj(vec![obj_prop("f", bound_func(vec![], vec![]))])];
        let out = top(class(Some(id("A")), None, body));
        assert!(out.contains("function A() {\n    this.f = __bind(this.f, this);\n  }"));
        assert!(out.contains("A.prototype.f = function() {};"));
    }

    #[test]
    fn test_anonymous_class() {
        assert_eq!(
            top(class(None, None, vec![])),
            "(function() {\n  function _Class() {}\n\n  return _Class;\n\n})()"
        );
    }

    #[test]
    fn test_class_errors() {
        let twice = vec![implicit_obj(vec![
            obj_prop("constructor", func(vec![], vec![])),
            obj_prop("constructor", func(vec![], vec![])),
        ])];
        assert_eq!(
            error(class(Some(id("A")), None, twice)),
            "cannot define more than one constructor in a class"
        );
        let bound = vec![implicit_obj(vec![obj_prop("constructor", bound_func(vec![], vec![]))])];
        assert_eq!(
            error(class(Some(id("A")), None, bound)),
            "cannot define a constructor as a bound function"
        );
        assert_eq!(
            error(class(Some(id("A")), None, vec![statement("break")])),
            "Class bodies cannot contain pure statements"
        );
        assert_eq!(
            error(class(Some(id("A")), None, vec![id("arguments")])),
            "Class bodies shouldn't reference arguments"
        );
    }

    #[test]
    fn test_super_outside_method() {
        assert_eq!(
            error(super_call(None)),
            "cannot call super outside of an instance method."
        );
    }
}
