//! Lowering of syntax trees into JavaScript fragments
//!
//! Every node kind has a `compile_*` function that takes the node by value,
//! together with the [`Context`] it is lowered in, and returns a flat list of
//! fragments. [`compile_to_fragments`] is the entry point parents use for
//! their children: it unfolds soaks and wraps statements that appear in
//! expression position in a closure.

mod assign;
mod block;
mod class;
mod control;
mod function;
mod literal;
mod loops;
mod op;
mod value;

use std::rc::Rc;

use crate::ast::{
    is_literal_arguments, is_literal_this, Access, Assign, Block, Call, Code, If, Jump, Literal,
    LiteralKind, Node, NodeKind, Op, Property, Value,
};
use crate::error::{LocationData, Result};
use crate::fragment::{fragments_to_text, Fragments};
use crate::options::CompileOptions;
use crate::scope::Scope;

pub use block::compile_root;
pub(crate) use value::cache_reference;

/// One level of indentation in the output
pub const TAB: &str = "  ";

/// How tightly the surrounding code binds the expression being lowered
///
/// Levels are ordered: a node compiled at a higher level must parenthesize
/// more eagerly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// A statement of its own
    Top = 1,
    /// `(...)`
    Paren,
    /// `[...]`, call arguments
    List,
    /// `... ? ... : ...`
    Cond,
    /// `... + ...`
    Op,
    /// `...[...]`
    Access,
}

/// Options threaded through a single descent
///
/// The context is copied at each descent and selectively overridden, so a
/// change made for one child never leaks into its siblings.
#[derive(Debug, Clone)]
pub(crate) struct Context {
    pub scope: Rc<Scope>,
    pub indent: String,
    pub level: Level,
    pub bare: bool,
    /// The next function lowered only exists to turn a statement into an
    /// expression and shares its parent's variables
    pub shared_scope: bool,
    /// Scope prepared for the function wrapping a class body
    pub class_scope: Option<Rc<Scope>>,
    /// Lowering the statement form of `a ?= b`
    pub is_existential_equals: bool,
    /// Lowering the `if` of an `else if`
    pub chain_child: bool,
}

impl Context {
    pub(crate) fn new(scope: Rc<Scope>, options: &CompileOptions) -> Self {
        Self {
            scope,
            indent: if options.bare { String::new() } else { TAB.to_string() },
            level: Level::Top,
            bare: options.bare,
            shared_scope: false,
            class_scope: None,
            is_existential_equals: false,
            chain_child: false,
        }
    }

    /// Copy with a different level
    pub(crate) fn at(&self, level: Level) -> Context {
        let mut o = self.clone();
        o.level = level;
        o
    }

    /// Copy indented one more step
    pub(crate) fn indented(&self) -> Context {
        let mut o = self.clone();
        o.indent.push_str(TAB);
        o
    }
}

/// A soak operator rewritten into a conditional, or the node unchanged
pub(crate) enum Soak {
    /// The `if` guarding the soak; its body is always a value
    Unfolded(If, Option<LocationData>),
    Intact(Node),
}

impl Soak {
    pub(crate) fn into_node(self) -> Node {
        match self {
            Soak::Unfolded(ifn, loc) => Node::from(ifn).with_loc(loc),
            Soak::Intact(node) => node,
        }
    }
}

/// Lower `node` at `level`
pub(crate) fn compile_to_fragments(node: Node, o: &Context, level: Level) -> Result<Fragments> {
    let Node { kind, loc, front } = node;
    let kind = match kind {
        NodeKind::Splat(splat) => return compile_to_fragments(splat.name, o, o.level),
        kind => kind,
    };
    let o = o.at(level);
    let node = match kind {
        NodeKind::Return(ret) => return control::compile_return(*ret, loc, &o),
        kind => Node { kind, loc, front },
    };
    let node = unfold_soak(node, &o)?.into_node();
    if o.level == Level::Top || !node.is_statement(Some(o.level)) {
        compile_node(node, &o)
    } else {
        compile_closure(node, &o)
    }
}

/// Lower `node` and concatenate the output
pub(crate) fn compile_text(node: Node, o: &Context, level: Level) -> Result<String> {
    Ok(fragments_to_text(&compile_to_fragments(node, o, level)?))
}

/// Lower `node` in its own syntax, whatever its level
pub(crate) fn compile_node(node: Node, o: &Context) -> Result<Fragments> {
    let Node { kind, loc, front } = node;
    match kind {
        NodeKind::Literal(literal) => literal::compile_literal(literal, loc, o),
        NodeKind::Value(value) => value::compile_value(*value, loc, front, o),
        NodeKind::Call(call) => value::compile_call(*call, loc, front, o),
        NodeKind::SuperCall(call) => class::compile_super_call(*call, loc, o),
        NodeKind::Obj(obj) => value::compile_obj(obj, loc, front, o),
        NodeKind::Arr(arr) => value::compile_arr(arr, loc, o),
        NodeKind::Range(range) => loops::compile_range(*range, loc, o),
        NodeKind::Splat(splat) => compile_to_fragments(splat.name, o, o.level),
        NodeKind::Expansion => Err(crate::error::Error::compile_error(
            "Expansion must be used inside a destructuring assignment or parameter list",
            loc,
        )),
        NodeKind::Assign(assign) => assign::compile_assign(*assign, loc, o),
        NodeKind::Code(code) => function::compile_code(*code, loc, front, o),
        NodeKind::Class(class) => class::compile_class(*class, loc, o),
        NodeKind::Extends(extends) => class::compile_extends(*extends, loc, o),
        NodeKind::Op(op) => op::compile_op(*op, loc, front, o),
        NodeKind::In(node) => op::compile_in(*node, loc, o),
        NodeKind::Existence(node) => op::compile_existence(*node, loc, front, o),
        NodeKind::Parens(parens) => value::compile_parens(*parens, loc, front, o),
        NodeKind::Block(block) => block::compile_block(block, loc, o),
        NodeKind::Return(ret) => control::compile_return_statement(*ret, loc, o),
        NodeKind::Throw(throw) => control::compile_throw(*throw, loc, o),
        NodeKind::Comment(comment) => control::compile_comment(comment, loc, o),
        NodeKind::If(node) => control::compile_if(*node, loc, o),
        NodeKind::Switch(switch) => control::compile_switch(*switch, loc, o),
        NodeKind::Try(node) => control::compile_try(*node, loc, o),
        NodeKind::While(node) => loops::compile_while(*node, loc, o),
        NodeKind::For(node) => loops::compile_for(*node, loc, o),
    }
}

/// Wrap a statement in an immediately invoked function so it can be used
/// as an expression
pub(crate) fn compile_closure(node: Node, o: &Context) -> Result<Fragments> {
    if let Some(jump) = node.jumps(Jump::empty()) {
        return Err(jump.error("cannot use a pure statement in an expression"));
    }
    tracing::trace!(node = node.type_name(), "wrapping statement in a closure");
    let mut o = o.clone();
    o.shared_scope = true;
    let loc = node.loc;
    let uses_arguments = node.contains(&is_literal_arguments);
    let uses_this = uses_arguments || node.contains(&is_literal_this);
    let func = Node::from(Code::new(Vec::new(), Block::wrap(vec![node]))).with_loc(loc);
    let call = if uses_this {
        let this = Node::from(Literal::this());
        let (method, args) = if uses_arguments {
            ("apply", vec![this, ident("arguments")])
        } else {
            ("call", vec![this])
        };
        let callee = Value::with_properties(func, vec![Property::Access(Access::new(method))]);
        Call::new(Node::from(callee), args)
    } else {
        Call::new(func, Vec::new())
    };
    value::compile_call(call, loc, false, &o)
}

/// Duplicate a node for use twice without evaluating it twice: complex
/// nodes become `ref = node` and `ref`
pub(crate) fn cache(node: Node, o: &Context, is_complex: fn(&Node) -> bool) -> (Node, Node) {
    if is_complex(&node) {
        let loc = node.loc;
        let reference = ident(&o.scope.free_variable("ref", false, true)).with_loc(loc);
        let sub = Node::from(Assign::new(reference.clone(), node)).with_loc(loc);
        (sub, reference)
    } else {
        (node.clone(), node)
    }
}

/// [`cache`], lowering both halves at `level`
pub(crate) fn cache_compiled(
    node: Node,
    o: &Context,
    level: Level,
    is_complex: fn(&Node) -> bool,
) -> Result<(Fragments, Fragments)> {
    if is_complex(&node) {
        let origin = node.origin();
        let name = o.scope.free_variable("ref", false, true);
        let sub = Node::from(Assign::new(ident(&name), node)).with_loc(origin.loc);
        Ok((compile_to_fragments(sub, o, level)?, vec![origin.code(name)]))
    } else {
        let fragments = compile_to_fragments(node, o, level)?;
        Ok((fragments.clone(), fragments))
    }
}

/// [`cache_compiled`] as text
pub(crate) fn cache_text(
    node: Node,
    o: &Context,
    level: Level,
    is_complex: fn(&Node) -> bool,
) -> Result<(String, String)> {
    let (sub, reference) = cache_compiled(node, o, level, is_complex)?;
    Ok((fragments_to_text(&sub), fragments_to_text(&reference)))
}

pub(crate) fn is_complex(node: &Node) -> bool {
    node.is_complex()
}

pub(crate) fn is_complex_or_assignable(node: &Node) -> bool {
    node.is_complex() || node.is_assignable()
}

/// Rewrite `node` so that it returns its value, or pushes it onto the
/// array named `res`
pub(crate) fn make_return(node: Node, res: Option<&str>) -> Node {
    let Node { kind, loc, front } = node;
    let kind = match kind {
        NodeKind::Block(block) => NodeKind::Block(block::make_return(block, res)),
        NodeKind::If(ifn) => NodeKind::If(Box::new(control::if_make_return(*ifn, res))),
        NodeKind::Switch(switch) => {
            NodeKind::Switch(Box::new(control::switch_make_return(*switch, res)))
        }
        NodeKind::Try(node) => NodeKind::Try(Box::new(control::try_make_return(*node, res))),
        NodeKind::While(mut node) if res.is_none() => {
            node.returns = node.body.loop_jumps().is_none();
            NodeKind::While(node)
        }
        NodeKind::For(mut node) if res.is_none() => {
            node.returns = node.body.loop_jumps().is_none();
            NodeKind::For(node)
        }
        kind @ (NodeKind::Return(_) | NodeKind::Throw(_) | NodeKind::Comment(_)) => kind,
        NodeKind::Literal(literal) if literal.kind == LiteralKind::Statement => {
            NodeKind::Literal(literal)
        }
        kind => {
            let me = Node { kind, loc, front: false }.unwrap_all();
            let wrapped = match res {
                Some(res) => Node::from(Call::new(raw(&format!("{}.push", res)), vec![me])),
                None => Node::from(crate::ast::Return {
                    expression: Some(me),
                }),
            };
            return wrapped.with_loc(loc);
        }
    };
    Node { kind, loc, front }
}

/// Rewrite soak operators in `node` into conditionals
pub(crate) fn unfold_soak(node: Node, o: &Context) -> Result<Soak> {
    let Node { kind, loc, front } = node;
    match kind {
        NodeKind::Value(value) => value::unfold_value(*value, loc, front, o),
        NodeKind::Call(call) if call.soak => value::unfold_soaked_call(*call, loc, front, o),
        NodeKind::If(ifn) if ifn.soak => Ok(Soak::Unfolded(*ifn, loc)),
        kind @ NodeKind::Call(_) => unfold_slot(Node { kind, loc, front }, o, call_variable),
        kind @ NodeKind::Assign(_) => unfold_slot(Node { kind, loc, front }, o, assign_variable),
        NodeKind::Op(op) if matches!(op.operator.as_str(), "++" | "--" | "delete") => {
            unfold_slot(Node::from(*op).with_loc(loc), o, op_first)
        }
        kind => Ok(Soak::Intact(Node { kind, loc, front })),
    }
}

fn call_variable(node: &mut Node) -> Option<&mut Node> {
    match &mut node.kind {
        NodeKind::Call(call) => Some(&mut call.variable),
        _ => None,
    }
}

fn assign_variable(node: &mut Node) -> Option<&mut Node> {
    match &mut node.kind {
        NodeKind::Assign(assign) => Some(&mut assign.variable),
        _ => None,
    }
}

fn op_first(node: &mut Node) -> Option<&mut Node> {
    match &mut node.kind {
        NodeKind::Op(op) => Some(&mut op.first),
        _ => None,
    }
}

/// Unfold the child in `slot`; an unfolded child is replaced by the body of
/// its conditional, and the conditional's body becomes the whole parent
pub(crate) fn unfold_slot(
    mut parent: Node,
    o: &Context,
    slot: fn(&mut Node) -> Option<&mut Node>,
) -> Result<Soak> {
    let Some(child) = slot(&mut parent).map(Node::take) else {
        return Ok(Soak::Intact(parent));
    };
    match unfold_soak(child, o)? {
        Soak::Intact(child) => {
            if let Some(place) = slot(&mut parent) {
                *place = child;
            }
            Ok(Soak::Intact(parent))
        }
        Soak::Unfolded(mut ifn, loc) => {
            if let Some(place) = slot(&mut parent) {
                *place = ifn.body.take();
            }
            ifn.body = Node::from(Value::from_node(parent));
            Ok(Soak::Unfolded(ifn, loc))
        }
    }
}

/// A bare identifier
pub(crate) fn ident(name: &str) -> Node {
    Node::from(Literal::identifier(name))
}

/// Code printed as is
pub(crate) fn raw(code: &str) -> Node {
    Node::from(Literal::raw(code))
}

/// An integer with an optional sign; a `.` after one would be a decimal point
pub(crate) fn is_simple_number(text: &str) -> bool {
    let digits = text.strip_prefix(&['+', '-'][..]).unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// The value of a numeric literal as JavaScript reads it
pub(crate) fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let radix = match digits.get(..2).map(str::to_ascii_lowercase).as_deref() {
        Some("0x") => Some(16),
        Some("0o") => Some(8),
        Some("0b") => Some(2),
        _ => None,
    };
    let value = match radix {
        Some(radix) => i64::from_str_radix(&digits[2..], radix).ok()? as f64,
        None => lexical_core::parse::<f64>(digits.as_bytes()).ok()?,
    };
    Some(if negative { -value } else { value })
}

/// Print a number the way JavaScript's `String(n)` does for ordinary values
pub(crate) fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e21 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// `Op` helper shared by the lowering of compound operators
pub(crate) fn binary(operator: &str, first: Node, second: Node) -> Node {
    Node::from(Op::binary(operator, first, second))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_are_ordered() {
        assert!(Level::Top < Level::Paren);
        assert!(Level::List < Level::Cond);
        assert!(Level::Op < Level::Access);
    }

    #[test]
    fn test_simple_numbers() {
        assert!(is_simple_number("42"));
        assert!(is_simple_number("-1"));
        assert!(!is_simple_number("1.5"));
        assert!(!is_simple_number("0x10"));
        assert!(!is_simple_number("-"));
    }

    #[test]
    fn test_number_round_trip() {
        assert_eq!(parse_number("0x10"), Some(16.0));
        assert_eq!(parse_number("-3"), Some(-3.0));
        assert_eq!(parse_number("2.5"), Some(2.5));
        assert_eq!(parse_number("a"), None);
        assert_eq!(format_number(4.0), "4");
        assert_eq!(format_number(-0.5), "-0.5");
    }

    #[test]
    fn test_cache_simple_node_reuses_it() {
        let scope = Scope::root(Vec::<String>::new());
        let o = Context::new(scope.clone(), &CompileOptions::default());
        let (first, second) = cache(ident("a"), &o, is_complex);
        assert_eq!(first, second);
        assert!(scope.declared_variables().is_empty());
    }

    #[test]
    fn test_cache_complex_node_introduces_one_ref() {
        let scope = Scope::root(Vec::<String>::new());
        let o = Context::new(scope.clone(), &CompileOptions::default());
        let call = Node::from(Call::new(ident("f"), vec![]));
        let (sub, reference) = cache(call, &o, is_complex);
        assert!(matches!(sub.kind, NodeKind::Assign(_)));
        assert_eq!(reference.identifier_name(), Some("ref"));
        assert_eq!(scope.declared_variables(), vec!["ref"]);
    }
}
