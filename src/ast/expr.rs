//! Expression node types

use serde::{Deserialize, Serialize};

use super::{Block, Node, NodeKind};

/// Kinds of literal leaves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiteralKind {
    /// Code produced by the compiler itself, printed verbatim
    Raw,
    Number,
    Infinity,
    NaN,
    /// A string literal; the value keeps its quotes
    String,
    Regex,
    /// Embedded JavaScript, printed verbatim
    Passthrough,
    Identifier,
    /// A property name after `.` or before `:`
    PropertyName,
    /// `break`, `continue` or `debugger`
    Statement,
    This,
    Undefined,
    Null,
    Boolean,
}

/// A leaf node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Literal {
    pub kind: LiteralKind,
    #[serde(default)]
    pub value: String,
}

impl Literal {
    pub fn new(kind: LiteralKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    pub fn raw(code: impl Into<String>) -> Self {
        Self::new(LiteralKind::Raw, code)
    }

    pub fn identifier(name: impl Into<String>) -> Self {
        Self::new(LiteralKind::Identifier, name)
    }

    pub fn property(name: impl Into<String>) -> Self {
        Self::new(LiteralKind::PropertyName, name)
    }

    pub fn this() -> Self {
        Self::new(LiteralKind::This, "this")
    }

    pub fn undefined() -> Self {
        Self::new(LiteralKind::Undefined, "undefined")
    }

    pub fn is_assignable(&self) -> bool {
        matches!(self.kind, LiteralKind::Identifier | LiteralKind::PropertyName)
    }
}

/// A property access step in a [`Value`] chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Property {
    Access(Access),
    Index(Index),
    Slice(Slice),
}

impl Property {
    pub fn soak(&self) -> bool {
        match self {
            Property::Access(a) => a.soak,
            Property::Index(i) => i.soak,
            Property::Slice(_) => false,
        }
    }

    pub fn clear_soak(&mut self) {
        match self {
            Property::Access(a) => a.soak = false,
            Property::Index(i) => i.soak = false,
            Property::Slice(_) => {}
        }
    }

    pub fn is_complex(&self) -> bool {
        match self {
            Property::Access(_) => false,
            Property::Index(i) => i.index.is_complex(),
            Property::Slice(_) => true,
        }
    }

    /// `.name` access with this name, if the step is one
    pub fn access_name(&self) -> Option<&str> {
        match self {
            Property::Access(a) => Some(&a.name.value),
            _ => None,
        }
    }
}

/// `.name`, or `["name"]` for names that are not identifiers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Access {
    pub name: Literal,
    #[serde(default)]
    pub soak: bool,
}

impl Access {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Literal::property(name),
            soak: false,
        }
    }
}

/// `[expr]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    pub index: Node,
    #[serde(default)]
    pub soak: bool,
}

/// `[from..to]` used as a property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slice {
    pub range: Range,
}

/// A base expression followed by accesses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Value {
    pub base: Node,
    #[serde(default)]
    pub properties: Vec<Property>,
    /// Written as `@name`
    #[serde(default)]
    pub this: bool,
}

impl Value {
    pub fn new(base: Node) -> Self {
        Self {
            base,
            properties: Vec::new(),
            this: false,
        }
    }

    pub fn with_properties(base: Node, properties: Vec<Property>) -> Self {
        Self {
            base,
            properties,
            this: false,
        }
    }

    /// View `node` as a value, reusing it if it already is one
    pub fn from_node(node: Node) -> Value {
        match node.kind {
            NodeKind::Value(value) => *value,
            kind => Value::new(Node {
                kind,
                loc: node.loc,
                front: node.front,
            }),
        }
    }

    pub fn has_properties(&self) -> bool {
        !self.properties.is_empty()
    }

    fn bare_base(&self) -> Option<&NodeKind> {
        if self.properties.is_empty() {
            Some(&self.base.kind)
        } else {
            None
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self.bare_base(), Some(NodeKind::Arr(_)))
    }

    pub fn is_range(&self) -> bool {
        matches!(self.bare_base(), Some(NodeKind::Range(_)))
    }

    /// An object literal; with `only_generated`, only implicit ones
    pub fn is_object(&self, only_generated: bool) -> bool {
        match self.bare_base() {
            Some(NodeKind::Obj(obj)) => !only_generated || obj.generated,
            _ => false,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self.bare_base(), Some(NodeKind::Literal(l)) if l.kind == LiteralKind::Number)
    }

    pub fn is_string(&self) -> bool {
        matches!(self.bare_base(), Some(NodeKind::Literal(l)) if l.kind == LiteralKind::String)
    }

    /// Ends in a slice, so assigning to it means splicing
    pub fn is_splice(&self) -> bool {
        matches!(self.properties.last(), Some(Property::Slice(_)))
    }

    pub fn is_assignable(&self) -> bool {
        self.has_properties() || self.base.is_assignable()
    }

    /// No soaks and no calls anywhere in the chain
    pub fn is_atomic(&self) -> bool {
        !self.properties.iter().any(Property::soak) && !matches!(self.base.kind, NodeKind::Call(_))
    }

    /// A literal that calling would fail on
    pub fn is_not_callable(&self) -> bool {
        if self.has_properties() {
            return false;
        }
        match &self.base.kind {
            NodeKind::Literal(l) => matches!(
                l.kind,
                LiteralKind::Number
                    | LiteralKind::String
                    | LiteralKind::Regex
                    | LiteralKind::Null
                    | LiteralKind::Undefined
                    | LiteralKind::Boolean
            ),
            NodeKind::Arr(_) | NodeKind::Obj(_) | NodeKind::Range(_) => true,
            _ => false,
        }
    }

    /// `@name = ...` or `ClassName.name = ...` inside a class body
    pub fn looks_static(&self, class_name: &str) -> bool {
        let base_matches = self.this
            || match &self.base.kind {
                NodeKind::Literal(l) => l.kind == LiteralKind::This || l.value == class_name,
                _ => false,
            };
        base_matches
            && self.properties.len() == 1
            && self.properties[0].access_name() != Some("prototype")
    }
}

/// Function call, `new` call included
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Call {
    pub variable: Node,
    #[serde(default)]
    pub args: Vec<Node>,
    #[serde(default)]
    pub soak: bool,
    #[serde(default)]
    pub is_new: bool,
}

impl Call {
    pub fn new(variable: Node, args: Vec<Node>) -> Self {
        Self {
            variable,
            args,
            soak: false,
            is_new: false,
        }
    }
}

/// `super(...)`; without arguments all of the method's arguments are forwarded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuperCall {
    #[serde(default)]
    pub args: Option<Vec<Node>>,
}

/// Object literal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obj {
    #[serde(default)]
    pub properties: Vec<Node>,
    /// Written without braces
    #[serde(default)]
    pub generated: bool,
}

/// Array literal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arr {
    #[serde(default)]
    pub objects: Vec<Node>,
}

/// `[from..to]` or `[from...to]`; endpoints are optional only in slices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Range {
    #[serde(default)]
    pub from: Option<Node>,
    #[serde(default)]
    pub to: Option<Node>,
    #[serde(default)]
    pub exclusive: bool,
}

/// `name...` in calls, arrays, parameters and patterns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Splat {
    pub name: Node,
}

/// Assignment of any flavour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assign {
    pub variable: Node,
    pub value: Node,
    /// `object` inside object literals, or a compound operator like `+=`
    #[serde(default)]
    pub context: Option<String>,
    /// Generated for a function parameter
    #[serde(default)]
    pub param: bool,
    /// A nested destructuring pattern
    #[serde(default)]
    pub subpattern: bool,
}

impl Assign {
    pub fn new(variable: Node, value: Node) -> Self {
        Self {
            variable,
            value,
            context: None,
            param: false,
            subpattern: false,
        }
    }

    pub fn with_context(variable: Node, value: Node, context: impl Into<String>) -> Self {
        Self {
            context: Some(context.into()),
            ..Self::new(variable, value)
        }
    }

    pub fn is_object_context(&self) -> bool {
        self.context.as_deref() == Some("object")
    }
}

/// Details the compiler attaches to a function while lowering around it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodeMeta {
    /// Name standing in for `this` in a bound function
    pub context: Option<String>,
    /// Class name when the function is a constructor
    pub ctor: Option<String>,
    /// Compiled class reference for methods
    pub klass: Option<String>,
    /// Compiled accessor of the method (`.foo`)
    pub name: Option<String>,
    pub is_static: bool,
    /// Skip the implicit return
    pub no_return: bool,
}

/// Function literal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Code {
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default)]
    pub body: Block,
    /// Written with `=>`
    #[serde(default)]
    pub bound: bool,
    #[serde(skip)]
    pub meta: CodeMeta,
}

impl Code {
    pub fn new(params: Vec<Param>, body: Block) -> Self {
        Self {
            params,
            body,
            bound: false,
            meta: CodeMeta::default(),
        }
    }
}

/// A function parameter; a name of kind `Expansion` marks a bare `...`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: Node,
    #[serde(default)]
    pub value: Option<Node>,
    #[serde(default)]
    pub splat: bool,
    #[serde(skip)]
    pub reference: Option<Node>,
}

impl Param {
    pub fn new(name: Node) -> Self {
        Self {
            name,
            value: None,
            splat: false,
            reference: None,
        }
    }

    pub fn is_expansion(&self) -> bool {
        matches!(self.name.kind, NodeKind::Expansion)
    }

    pub fn is_complex(&self) -> bool {
        !self.is_expansion() && self.name.is_complex()
    }
}

/// Class definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Class {
    #[serde(default)]
    pub variable: Option<Node>,
    #[serde(default)]
    pub parent: Option<Node>,
    #[serde(default)]
    pub body: Block,
}

/// `child extends parent` as an expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extends {
    pub child: Node,
    pub parent: Node,
}

/// Unary and binary operators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Op {
    /// Operator text as emitted, after source aliases are converted
    pub operator: String,
    pub first: Node,
    #[serde(default)]
    pub second: Option<Node>,
    /// Postfix unary operator
    #[serde(default)]
    pub flip: bool,
    /// Inverted comparison chain, joined with `||`
    #[serde(skip)]
    pub inverted: bool,
}

pub(crate) const CHAINABLE: &[&str] = &["<", ">", ">=", "<=", "===", "!=="];

impl Op {
    pub fn unary(operator: impl Into<String>, first: Node) -> Self {
        Self {
            operator: operator.into(),
            first,
            second: None,
            flip: false,
            inverted: false,
        }
    }

    pub fn binary(operator: impl Into<String>, first: Node, second: Node) -> Self {
        Self {
            second: Some(second),
            ..Self::unary(operator, first)
        }
    }

    pub fn is_unary(&self) -> bool {
        self.second.is_none()
    }

    pub fn is_chainable(&self) -> bool {
        CHAINABLE.contains(&self.operator.as_str())
    }

    /// `-1` or `+2`
    pub fn is_number(&self) -> bool {
        self.is_unary()
            && (self.operator == "+" || self.operator == "-")
            && matches!(&self.first.kind, NodeKind::Value(v) if v.is_number())
    }
}

/// `object in array`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct In {
    pub object: Node,
    pub array: Node,
    #[serde(default)]
    pub negated: bool,
}

/// `expr?`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Existence {
    pub expression: Node,
    #[serde(default)]
    pub negated: bool,
}

/// Explicit parentheses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parens {
    pub body: Node,
}
