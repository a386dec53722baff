//! Constructors mirroring the grammar's productions
//!
//! A parser builds trees through these helpers so that source-level sugar
//! (operator aliases, `unless`, `until`, `not in`) is normalized the same way
//! regardless of where the tree comes from.

use super::*;

/// Operator aliases resolved when an operator node is built
fn convert_operator(operator: &str) -> &str {
    match operator {
        "==" | "is" => "===",
        "!=" | "isnt" => "!==",
        "of" => "in",
        "and" => "&&",
        "or" => "||",
        "not" => "!",
        other => other,
    }
}

fn literal(kind: LiteralKind, value: impl Into<String>) -> Node {
    Node::from(Literal::new(kind, value))
}

fn wrap(node: Node) -> Node {
    Node::from(Value::new(node))
}

fn push_property(base: Node, property: Property) -> Node {
    let mut value = Value::from_node(base);
    value.properties.push(property);
    Node::from(value)
}

fn body(nodes: Vec<Node>) -> Block {
    Block::wrap(nodes)
}

/// A variable reference, `name`
pub fn id(name: &str) -> Node {
    wrap(ident(name))
}

/// A bare identifier, as used for loop variables and class names
pub fn ident(name: &str) -> Node {
    Node::from(Literal::identifier(name))
}

pub fn num(text: &str) -> Node {
    wrap(literal(LiteralKind::Number, text))
}

/// A double-quoted string literal
pub fn string(text: &str) -> Node {
    wrap(literal(LiteralKind::String, format!("\"{}\"", text)))
}

pub fn regex(text: &str) -> Node {
    wrap(literal(LiteralKind::Regex, text))
}

/// Embedded JavaScript
pub fn js(code: &str) -> Node {
    wrap(literal(LiteralKind::Passthrough, code))
}

/// Code the compiler prints verbatim
pub fn raw(code: &str) -> Node {
    literal(LiteralKind::Raw, code)
}

pub fn boolean(value: bool) -> Node {
    wrap(literal(LiteralKind::Boolean, if value { "true" } else { "false" }))
}

pub fn null() -> Node {
    wrap(literal(LiteralKind::Null, "null"))
}

pub fn undefined() -> Node {
    wrap(literal(LiteralKind::Undefined, "undefined"))
}

pub fn infinity() -> Node {
    wrap(literal(LiteralKind::Infinity, "Infinity"))
}

pub fn nan() -> Node {
    wrap(literal(LiteralKind::NaN, "NaN"))
}

pub fn this() -> Node {
    wrap(Node::from(Literal::this()))
}

/// `break`, `continue` or `debugger`
pub fn statement(word: &str) -> Node {
    literal(LiteralKind::Statement, word)
}

pub fn access(base: Node, name: &str) -> Node {
    push_property(base, Property::Access(Access::new(name)))
}

/// `base?.name`
pub fn soak_access(base: Node, name: &str) -> Node {
    let mut access = Access::new(name);
    access.soak = true;
    push_property(base, Property::Access(access))
}

/// `base::name`
pub fn proto_access(base: Node, name: &str) -> Node {
    access(access(base, "prototype"), name)
}

pub fn index(base: Node, index: Node) -> Node {
    push_property(base, Property::Index(Index { index, soak: false }))
}

/// `base?[index]`
pub fn soak_index(base: Node, index: Node) -> Node {
    push_property(base, Property::Index(Index { index, soak: true }))
}

pub fn slice(base: Node, from: Option<Node>, to: Option<Node>, exclusive: bool) -> Node {
    push_property(
        base,
        Property::Slice(Slice {
            range: Range { from, to, exclusive },
        }),
    )
}

/// `@name`
pub fn this_prop(name: &str) -> Node {
    let mut value = Value::with_properties(
        Node::from(Literal::this()),
        vec![Property::Access(Access::new(name))],
    );
    value.this = true;
    Node::from(value)
}

pub fn call(callee: Node, args: Vec<Node>) -> Node {
    Node::from(Call::new(callee, args))
}

/// `callee?(args)`
pub fn soak_call(callee: Node, args: Vec<Node>) -> Node {
    let mut call = Call::new(callee, args);
    call.soak = true;
    Node::from(call)
}

pub fn new_call(callee: Node, args: Vec<Node>) -> Node {
    let mut call = Call::new(callee, args);
    call.is_new = true;
    Node::from(call)
}

/// `super(args)`, or a bare `super` forwarding every argument
pub fn super_call(args: Option<Vec<Node>>) -> Node {
    Node::from(SuperCall { args })
}

pub fn obj(properties: Vec<Node>) -> Node {
    wrap(Node::from(Obj {
        properties,
        generated: false,
    }))
}

/// An object written without braces, as class bodies use
pub fn implicit_obj(properties: Vec<Node>) -> Node {
    wrap(Node::from(Obj {
        properties,
        generated: true,
    }))
}

/// `key: value` inside an object literal
pub fn obj_prop(key: &str, value: Node) -> Node {
    let key = wrap(Node::from(Literal::property(key)));
    Node::from(Assign::with_context(key, value, "object"))
}

/// `"key": value` inside an object literal
pub fn quoted_prop(key: &str, value: Node) -> Node {
    Node::from(Assign::with_context(string(key), value, "object"))
}

/// `(key): value` inside an object literal
pub fn computed_prop(key: Node, value: Node) -> Node {
    Node::from(Assign::with_context(wrap(parens(key)), value, "object"))
}

/// `@key: value` inside a class body
pub fn static_prop(key: &str, value: Node) -> Node {
    Node::from(Assign::with_context(this_prop(key), value, "object"))
}

pub fn arr(objects: Vec<Node>) -> Node {
    wrap(Node::from(Arr { objects }))
}

pub fn range(from: Node, to: Node, exclusive: bool) -> Node {
    wrap(Node::from(Range {
        from: Some(from),
        to: Some(to),
        exclusive,
    }))
}

pub fn splat(name: Node) -> Node {
    Node::from(Splat { name })
}

pub fn expansion() -> Node {
    Node::new(NodeKind::Expansion)
}

pub fn assign(target: Node, value: Node) -> Node {
    Node::from(Assign::new(target, value))
}

/// `target op= value`, including `||=`, `&&=` and `?=`
pub fn compound(target: Node, operator: &str, value: Node) -> Node {
    Node::from(Assign::with_context(target, value, operator))
}

pub fn param(name: &str) -> Param {
    Param::new(ident(name))
}

pub fn param_default(name: &str, value: Node) -> Param {
    let mut param = param(name);
    param.value = Some(value);
    param
}

/// `name...`
pub fn splat_param(name: &str) -> Param {
    let mut param = param(name);
    param.splat = true;
    param
}

/// `@name`
pub fn this_param(name: &str) -> Param {
    Param::new(this_prop(name))
}

/// A destructuring parameter such as `{a, b}` or `[x, y]`
pub fn pattern_param(pattern: Node) -> Param {
    Param::new(pattern.unwrap())
}

/// A bare `...` in a parameter list
pub fn expansion_param() -> Param {
    Param::new(expansion())
}

pub fn func(params: Vec<Param>, nodes: Vec<Node>) -> Node {
    Node::from(Code::new(params, body(nodes)))
}

/// `=>` function
pub fn bound_func(params: Vec<Param>, nodes: Vec<Node>) -> Node {
    let mut code = Code::new(params, body(nodes));
    code.bound = true;
    Node::from(code)
}

/// Binary operator with source aliases converted
pub fn op(operator: &str, first: Node, second: Node) -> Node {
    if let Some(negated) = operator.strip_prefix('!') {
        if matches!(negated, "in" | "of" | "instanceof") {
            return op(negated, first, second).invert();
        }
    }
    if operator == "in" {
        return Node::from(In {
            object: first,
            array: second,
            negated: false,
        });
    }
    Node::from(Op::binary(convert_operator(operator), first, second))
}

/// Prefix operator; `new` applied to a call turns it into a constructor call
pub fn unary(operator: &str, first: Node) -> Node {
    if operator == "new" {
        if let NodeKind::Call(mut call) = first.kind {
            if !call.is_new {
                call.is_new = true;
                return Node::from(*call).with_loc(first.loc);
            }
            return Node::from(Op::unary("new", Node::from(*call).with_loc(first.loc)));
        }
        let first = match &first.kind {
            NodeKind::Code(code) if code.bound => parens(first),
            _ => first,
        };
        return Node::from(Op::unary("new", first));
    }
    Node::from(Op::unary(convert_operator(operator), first))
}

/// Postfix `++` or `--`
pub fn postfix(operator: &str, first: Node) -> Node {
    let mut op = Op::unary(operator, first);
    op.flip = true;
    Node::from(op)
}

pub fn not(first: Node) -> Node {
    unary("!", first)
}

/// `expr?`
pub fn exists(expression: Node) -> Node {
    Node::from(Existence {
        expression,
        negated: false,
    })
}

/// `child extends parent`
pub fn extends(child: Node, parent: Node) -> Node {
    Node::from(Extends { child, parent })
}

pub fn parens(body: Node) -> Node {
    Node::from(Parens { body })
}

pub fn block(nodes: Vec<Node>) -> Node {
    Node::from(Block::new(nodes))
}

pub fn ret(expression: Option<Node>) -> Node {
    Node::from(Return { expression })
}

pub fn throw(expression: Node) -> Node {
    Node::from(Throw { expression })
}

pub fn comment(text: &str) -> Node {
    Node::from(Comment {
        comment: text.to_string(),
    })
}

pub fn if_then(condition: Node, nodes: Vec<Node>) -> Node {
    Node::from(If::new(condition, Node::from(body(nodes))))
}

pub fn if_else(condition: Node, nodes: Vec<Node>, else_nodes: Vec<Node>) -> Node {
    let mut node = If::new(condition, Node::from(body(nodes)));
    node.add_else(Node::from(body(else_nodes)));
    Node::from(node)
}

/// `if ... else if ...`; `else_if` must be an `if` node
pub fn if_else_if(condition: Node, nodes: Vec<Node>, else_if: Node) -> Node {
    let mut node = If::new(condition, Node::from(body(nodes)));
    node.add_else(else_if);
    Node::from(node)
}

pub fn unless(condition: Node, nodes: Vec<Node>) -> Node {
    if_then(condition.invert(), nodes)
}

pub fn while_loop(condition: Node, nodes: Vec<Node>) -> Node {
    Node::from(While {
        condition,
        guard: None,
        body: body(nodes),
        returns: false,
    })
}

pub fn until_loop(condition: Node, nodes: Vec<Node>) -> Node {
    while_loop(condition.invert(), nodes)
}

/// `loop`
pub fn forever(nodes: Vec<Node>) -> Node {
    while_loop(boolean(true), nodes)
}

/// `while condition when guard`
pub fn while_guarded(condition: Node, guard: Node, nodes: Vec<Node>) -> Node {
    Node::from(While {
        condition,
        guard: Some(guard),
        body: body(nodes),
        returns: false,
    })
}

/// `for name, index in source`
pub fn for_in(name: Option<Node>, index: Option<Node>, source: Node, nodes: Vec<Node>) -> For {
    let mut node = For::new(body(nodes), source);
    node.name = name;
    node.index = index;
    node
}

/// `for key, value of source`
pub fn for_of(key: Node, value: Option<Node>, source: Node, nodes: Vec<Node>) -> For {
    let mut node = For::new(body(nodes), source);
    node.object = true;
    node.index = Some(key);
    node.name = value;
    node
}

/// `for name from iterable`
pub fn for_from(name: Node, source: Node, nodes: Vec<Node>) -> For {
    let mut node = For::new(body(nodes), source);
    node.from = true;
    node.name = Some(name);
    node
}

impl For {
    pub fn with_guard(mut self, guard: Node) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn with_step(mut self, step: Node) -> Self {
        self.step = Some(step);
        self
    }

    /// `for own`
    pub fn owned(mut self) -> Self {
        self.own = true;
        self
    }
}

/// `switch subject` with `(conditions, body)` cases
pub fn switch(
    subject: Option<Node>,
    cases: Vec<(Vec<Node>, Vec<Node>)>,
    otherwise: Option<Vec<Node>>,
) -> Node {
    Node::from(Switch {
        subject,
        cases: cases
            .into_iter()
            .map(|(conditions, nodes)| SwitchCase {
                conditions,
                block: Block::new(nodes),
            })
            .collect(),
        otherwise: otherwise.map(Block::new),
    })
}

/// `try ... catch error ... finally ...`
pub fn try_catch(
    attempt: Vec<Node>,
    recovery: Option<(Option<Node>, Vec<Node>)>,
    ensure: Option<Vec<Node>>,
) -> Node {
    let (error_variable, recovery) = match recovery {
        Some((variable, nodes)) => (variable, Some(Block::new(nodes))),
        None => (None, None),
    };
    Node::from(Try {
        attempt: Block::new(attempt),
        error_variable,
        recovery,
        ensure: ensure.map(Block::new),
    })
}

/// `class variable extends parent`
pub fn class(variable: Option<Node>, parent: Option<Node>, nodes: Vec<Node>) -> Node {
    Node::from(Class {
        variable,
        parent,
        body: Block::new(nodes),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_conversions() {
        let NodeKind::Op(eq) = op("==", id("a"), id("b")).kind else {
            panic!("expected op");
        };
        assert_eq!(eq.operator, "===");
        let NodeKind::Op(of) = op("of", id("a"), id("b")).kind else {
            panic!("expected op");
        };
        assert_eq!(of.operator, "in");
    }

    #[test]
    fn test_in_and_not_in() {
        assert!(matches!(op("in", id("a"), id("b")).kind, NodeKind::In(ref i) if !i.negated));
        assert!(matches!(op("!in", id("a"), id("b")).kind, NodeKind::In(ref i) if i.negated));
    }

    #[test]
    fn test_new_on_call() {
        let node = unary("new", call(id("Foo"), vec![num("1")]));
        assert!(matches!(node.kind, NodeKind::Call(ref c) if c.is_new));
    }

    #[test]
    fn test_accesses_extend_one_value() {
        let node = access(access(id("a"), "b"), "c");
        assert_eq!(node.as_value().map(|v| v.properties.len()), Some(2));
    }

    #[test]
    fn test_else_if_chain() {
        let node = if_else_if(
            id("a"),
            vec![num("1")],
            if_else(id("b"), vec![num("2")], vec![num("3")]),
        );
        let NodeKind::If(node) = node.kind else {
            panic!("expected if");
        };
        assert!(node.is_chain);
    }
}
