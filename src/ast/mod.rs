//! Abstract Syntax Tree (AST) types
//!
//! The tree is a closed set of node kinds. Every node exclusively owns its
//! children and is consumed by value when it is lowered, since a tree is
//! compiled exactly once. Nodes serialize to JSON as
//! `{"type": "<Kind>", ...fields, "loc": {...}}` so a parser written in any
//! language can hand its output to the compiler.

pub mod build;
mod expr;
mod pattern;
mod stmt;
mod visit;

pub use expr::*;
pub use stmt::*;
pub use visit::{is_literal_arguments, is_literal_this, Child};
pub(crate) use visit::ChildMut;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::compiler::Level;
use crate::error::{Error, LocationData};
use crate::fragment::Origin;

bitflags! {
    /// Constructs that may legally swallow a jump statement
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Jump: u8 {
        /// Inside a loop body: `break` and `continue` are captured
        const LOOP = 0b01;
        /// Inside a switch: `break` is captured
        const BLOCK = 0b10;
    }
}

/// A syntax tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(flatten)]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loc: Option<LocationData>,
    /// Leftmost token of a statement; some expressions must parenthesize
    #[serde(skip)]
    pub front: bool,
}

/// Every kind of node the compiler lowers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NodeKind {
    Literal(Literal),
    Value(Box<Value>),
    Call(Box<Call>),
    SuperCall(Box<SuperCall>),
    Obj(Obj),
    Arr(Arr),
    Range(Box<Range>),
    Splat(Box<Splat>),
    Expansion,
    Assign(Box<Assign>),
    Code(Box<Code>),
    Class(Box<Class>),
    Extends(Box<Extends>),
    Op(Box<Op>),
    In(Box<In>),
    Existence(Box<Existence>),
    Parens(Box<Parens>),
    Block(Block),
    Return(Box<Return>),
    Throw(Box<Throw>),
    Comment(Comment),
    If(Box<If>),
    Switch(Box<Switch>),
    Try(Box<Try>),
    While(Box<While>),
    For(Box<For>),
}

macro_rules! node_from {
    ($($variant:ident($ty:ty) => boxed),* ; $($plain:ident($pty:ty)),*) => {
        $(
            impl From<$ty> for Node {
                fn from(value: $ty) -> Node {
                    Node::new(NodeKind::$variant(Box::new(value)))
                }
            }
        )*
        $(
            impl From<$pty> for Node {
                fn from(value: $pty) -> Node {
                    Node::new(NodeKind::$plain(value))
                }
            }
        )*
    };
}

node_from! {
    Value(Value) => boxed, Call(Call) => boxed, SuperCall(SuperCall) => boxed,
    Range(Range) => boxed, Splat(Splat) => boxed, Assign(Assign) => boxed,
    Code(Code) => boxed, Class(Class) => boxed, Extends(Extends) => boxed,
    Op(Op) => boxed, In(In) => boxed, Existence(Existence) => boxed,
    Parens(Parens) => boxed, Return(Return) => boxed, Throw(Throw) => boxed,
    If(If) => boxed, Switch(Switch) => boxed, Try(Try) => boxed,
    While(While) => boxed, For(For) => boxed;
    Literal(Literal), Obj(Obj), Arr(Arr), Block(Block), Comment(Comment)
}

impl From<NodeKind> for Node {
    fn from(kind: NodeKind) -> Node {
        Node::new(kind)
    }
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            loc: None,
            front: false,
        }
    }

    /// A throwaway node left behind when a child is moved out
    pub fn placeholder() -> Self {
        Node::from(Literal::undefined())
    }

    /// Move the node out, leaving a placeholder
    pub fn take(&mut self) -> Node {
        std::mem::replace(self, Node::placeholder())
    }

    /// Attach a location unless one is already present
    pub fn with_loc(mut self, loc: Option<LocationData>) -> Self {
        if self.loc.is_none() {
            self.loc = loc;
        }
        self
    }

    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            NodeKind::Literal(_) => "Literal",
            NodeKind::Value(_) => "Value",
            NodeKind::Call(_) => "Call",
            NodeKind::SuperCall(_) => "SuperCall",
            NodeKind::Obj(_) => "Obj",
            NodeKind::Arr(_) => "Arr",
            NodeKind::Range(_) => "Range",
            NodeKind::Splat(_) => "Splat",
            NodeKind::Expansion => "Expansion",
            NodeKind::Assign(_) => "Assign",
            NodeKind::Code(_) => "Code",
            NodeKind::Class(_) => "Class",
            NodeKind::Extends(_) => "Extends",
            NodeKind::Op(_) => "Op",
            NodeKind::In(_) => "In",
            NodeKind::Existence(_) => "Existence",
            NodeKind::Parens(_) => "Parens",
            NodeKind::Block(_) => "Block",
            NodeKind::Return(_) => "Return",
            NodeKind::Throw(_) => "Throw",
            NodeKind::Comment(_) => "Comment",
            NodeKind::If(_) => "If",
            NodeKind::Switch(_) => "Switch",
            NodeKind::Try(_) => "Try",
            NodeKind::While(_) => "While",
            NodeKind::For(_) => "For",
        }
    }

    pub(crate) fn origin(&self) -> Origin {
        Origin::new(self.loc, self.type_name())
    }

    /// A lowering error located at this node
    pub fn error(&self, message: impl Into<String>) -> Error {
        Error::compile_error(message, self.loc)
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match &self.kind {
            NodeKind::Literal(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match &self.kind {
            NodeKind::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_literal_kind(&self, kind: LiteralKind) -> bool {
        self.as_literal().is_some_and(|l| l.kind == kind)
    }

    /// An identifier literal, bare or wrapped in a property-less value
    pub fn identifier_name(&self) -> Option<&str> {
        match self.unwrap_ref().as_literal() {
            Some(l) if l.kind == LiteralKind::Identifier => Some(&l.value),
            _ => None,
        }
    }

    /// Statement-only in this position?
    pub fn is_statement(&self, level: Option<Level>) -> bool {
        match &self.kind {
            NodeKind::Literal(l) => l.kind == LiteralKind::Statement,
            NodeKind::Block(b) => b.is_statement(level),
            NodeKind::Value(v) => !v.has_properties() && v.base.is_statement(level),
            NodeKind::Return(_)
            | NodeKind::Throw(_)
            | NodeKind::Comment(_)
            | NodeKind::While(_)
            | NodeKind::For(_)
            | NodeKind::Switch(_)
            | NodeKind::Try(_) => true,
            NodeKind::If(i) => {
                level == Some(Level::Top)
                    || i.body.unwrap_ref().is_statement(level)
                    || i.else_body
                        .as_ref()
                        .is_some_and(|e| e.unwrap_ref().is_statement(level))
            }
            NodeKind::Assign(a) => {
                level == Some(Level::Top) && a.context.as_deref().is_some_and(|c| c.contains('?'))
            }
            NodeKind::Code(c) => c.meta.ctor.is_some(),
            _ => false,
        }
    }

    /// Would referencing this twice in the output repeat side effects or work?
    pub fn is_complex(&self) -> bool {
        match &self.kind {
            NodeKind::Literal(_) | NodeKind::Expansion => false,
            NodeKind::Value(v) => v.has_properties() || v.base.is_complex(),
            NodeKind::Parens(p) => p.body.is_complex(),
            NodeKind::Op(op) => !op.is_number(),
            _ => true,
        }
    }

    /// Can this appear on the left of `=`?
    pub fn is_assignable(&self) -> bool {
        match &self.kind {
            NodeKind::Literal(l) => l.is_assignable(),
            NodeKind::Value(v) => v.is_assignable(),
            NodeKind::Splat(_) => true,
            _ => false,
        }
    }

    pub fn is_number(&self) -> bool {
        match &self.kind {
            NodeKind::Value(v) => v.is_number(),
            NodeKind::Op(op) => op.is_number(),
            _ => false,
        }
    }

    /// The first `break`, `continue` or `return` that would escape a closure
    /// wrapped around this node
    pub fn jumps(&self, ctx: Jump) -> Option<&Node> {
        match &self.kind {
            NodeKind::Literal(l) if l.kind == LiteralKind::Statement => match l.value.as_str() {
                "break" if !ctx.intersects(Jump::LOOP | Jump::BLOCK) => Some(self),
                "continue" if !ctx.contains(Jump::LOOP) => Some(self),
                _ => None,
            },
            NodeKind::Return(_) => Some(self),
            NodeKind::Block(b) => b.jumps(ctx),
            NodeKind::Value(v) if !v.has_properties() => v.base.jumps(ctx),
            NodeKind::While(w) => w.body.loop_jumps(),
            NodeKind::For(f) => f.body.loop_jumps(),
            NodeKind::If(i) => i
                .body
                .jumps(ctx)
                .or_else(|| i.else_body.as_ref().and_then(|e| e.jumps(ctx))),
            NodeKind::Switch(s) => {
                let ctx = ctx | Jump::BLOCK;
                s.cases
                    .iter()
                    .find_map(|c| c.block.jumps(ctx))
                    .or_else(|| s.otherwise.as_ref().and_then(|b| b.jumps(ctx)))
            }
            NodeKind::Try(t) => t
                .attempt
                .jumps(ctx)
                .or_else(|| t.recovery.as_ref().and_then(|r| r.jumps(ctx))),
            _ => None,
        }
    }

    /// Does this node (as an assignment target) bind `name`?
    pub fn assigns(&self, name: &str) -> bool {
        match &self.kind {
            NodeKind::Literal(l) => l.value == name,
            NodeKind::Value(v) => !v.has_properties() && v.base.assigns(name),
            NodeKind::Assign(a) => {
                if a.is_object_context() {
                    a.value.assigns(name)
                } else {
                    a.variable.assigns(name)
                }
            }
            NodeKind::Obj(o) => o.properties.iter().any(|p| p.assigns(name)),
            NodeKind::Arr(a) => a.objects.iter().any(|p| p.assigns(name)),
            NodeKind::Splat(s) => s.name.assigns(name),
            _ => false,
        }
    }

    fn can_unwrap(&self) -> bool {
        match &self.kind {
            NodeKind::Block(b) => b.expressions.len() == 1,
            NodeKind::Value(v) => !v.has_properties(),
            NodeKind::Parens(_) | NodeKind::Splat(_) => true,
            _ => false,
        }
    }

    /// Peel one layer of trivial wrapping
    pub fn unwrap(self) -> Node {
        if !self.can_unwrap() {
            return self;
        }
        let Node { kind, loc, front } = self;
        match kind {
            NodeKind::Block(mut b) => b.expressions.pop().unwrap_or_else(Node::placeholder),
            NodeKind::Value(v) => v.base,
            NodeKind::Parens(p) => p.body,
            NodeKind::Splat(s) => s.name,
            kind => Node { kind, loc, front },
        }
    }

    pub fn unwrap_ref(&self) -> &Node {
        if !self.can_unwrap() {
            return self;
        }
        match &self.kind {
            NodeKind::Block(b) => &b.expressions[0],
            NodeKind::Value(v) => &v.base,
            NodeKind::Parens(p) => &p.body,
            NodeKind::Splat(s) => &s.name,
            _ => self,
        }
    }

    /// Peel every layer of trivial wrapping
    pub fn unwrap_all(self) -> Node {
        let mut node = self;
        while node.can_unwrap() {
            node = node.unwrap();
        }
        node
    }

    pub fn unwrap_all_ref(&self) -> &Node {
        let mut node = self;
        while node.can_unwrap() {
            node = node.unwrap_ref();
        }
        node
    }

    /// Logical negation of this node
    pub fn invert(self) -> Node {
        let loc = self.loc;
        match self.kind {
            NodeKind::Op(op) => op_invert(*op, loc),
            NodeKind::In(mut node) => {
                node.negated = !node.negated;
                Node::from(*node).with_loc(loc)
            }
            NodeKind::Existence(mut node) => {
                node.negated = !node.negated;
                Node::from(*node).with_loc(loc)
            }
            kind => Node::from(Op::unary("!", Node { kind, loc, front: false })).with_loc(loc),
        }
    }
}

pub(crate) fn inversion(operator: &str) -> Option<&'static str> {
    match operator {
        "!==" => Some("==="),
        "===" => Some("!=="),
        _ => None,
    }
}

fn op_invert(mut op: Op, loc: Option<LocationData>) -> Node {
    let chained = op.is_chainable() && matches!(&op.first.kind, NodeKind::Op(f) if f.is_chainable());
    if chained {
        let mut all_invertible = true;
        let mut current = Some(&op);
        while let Some(link) = current {
            all_invertible &= inversion(&link.operator).is_some();
            current = match &link.first.kind {
                NodeKind::Op(first) => Some(&**first),
                _ => None,
            };
        }
        if !all_invertible {
            return Node::from(Parens { body: Node::from(op).with_loc(loc) })
                .with_loc(loc)
                .invert();
        }
        let mut current = Some(&mut op);
        while let Some(link) = current {
            link.inverted = !link.inverted;
            if let Some(inverse) = inversion(&link.operator) {
                link.operator = inverse.to_string();
            }
            current = match &mut link.first.kind {
                NodeKind::Op(first) => Some(&mut **first),
                _ => None,
            };
        }
        return Node::from(op).with_loc(loc);
    }
    if let Some(inverse) = inversion(&op.operator) {
        op.operator = inverse.to_string();
        return Node::from(op).with_loc(loc);
    }
    if op.second.is_some() {
        return Node::from(Parens { body: Node::from(op).with_loc(loc) })
            .with_loc(loc)
            .invert();
    }
    if op.operator == "!" {
        let negates_op = matches!(
            &op.first.unwrap_ref().kind,
            NodeKind::Op(inner) if !matches!(inner.operator.as_str(), "!" | "in" | "instanceof")
        );
        if negates_op {
            return op.first.unwrap();
        }
    }
    Node::from(Op::unary("!", Node::from(op).with_loc(loc))).with_loc(loc)
}
