//! Statement node types

use serde::{Deserialize, Serialize};

use super::{Jump, Node, NodeKind};

/// An ordered list of expressions forming a body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(default)]
    pub expressions: Vec<Node>,
    /// Separate top-level statements with blank lines
    #[serde(skip)]
    pub spaced: bool,
}

impl Block {
    pub fn new(expressions: Vec<Node>) -> Self {
        Self {
            expressions,
            spaced: false,
        }
    }

    /// Wrap nodes in a block, reusing a lone block as is
    pub fn wrap(mut nodes: Vec<Node>) -> Block {
        if nodes.len() == 1 && matches!(nodes[0].kind, NodeKind::Block(_)) {
            if let Some(Node {
                kind: NodeKind::Block(block),
                ..
            }) = nodes.pop()
            {
                return block;
            }
        }
        Block::new(nodes)
    }

    pub fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }

    pub fn push(&mut self, node: Node) {
        self.expressions.push(node);
    }

    pub fn unshift(&mut self, node: Node) {
        self.expressions.insert(0, node);
    }

    pub fn jumps(&self, ctx: Jump) -> Option<&Node> {
        self.expressions.iter().find_map(|e| e.jumps(ctx))
    }

    /// Jumps that escape a loop body
    pub(crate) fn loop_jumps(&self) -> Option<&Node> {
        self.expressions.iter().find_map(|e| e.jumps(Jump::LOOP))
    }

    pub fn is_statement(&self, level: Option<crate::compiler::Level>) -> bool {
        self.expressions.iter().any(|e| e.is_statement(level))
    }

    /// The last expression that is not a comment
    pub(crate) fn last_non_comment(&self) -> Option<&Node> {
        self.expressions
            .iter()
            .rev()
            .find(|e| !matches!(e.kind, NodeKind::Comment(_)))
    }
}

/// `return expr`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Return {
    #[serde(default)]
    pub expression: Option<Node>,
}

/// `throw expr`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Throw {
    pub expression: Node,
}

/// Block comment carried through to the output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub comment: String,
}

/// `if`/`unless`, statement or ternary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct If {
    pub condition: Node,
    pub body: Node,
    #[serde(default)]
    pub else_body: Option<Node>,
    /// The else branch is itself an `if`
    #[serde(default)]
    pub is_chain: bool,
    /// Produced by unfolding a soak
    #[serde(default)]
    pub soak: bool,
}

impl If {
    pub fn new(condition: Node, body: Node) -> Self {
        Self {
            condition,
            body,
            else_body: None,
            is_chain: false,
            soak: false,
        }
    }

    /// Attach an else branch, extending an existing `else if` chain
    pub fn add_else(&mut self, else_body: Node) {
        match &mut self.else_body {
            Some(Node {
                kind: NodeKind::If(chained),
                ..
            }) if self.is_chain => chained.add_else(else_body),
            _ => {
                self.is_chain = matches!(else_body.kind, NodeKind::If(_));
                self.else_body = Some(match else_body.kind {
                    NodeKind::If(_) => else_body,
                    _ => Node::from(Block::wrap(vec![else_body])),
                });
            }
        }
    }
}

/// One `when` clause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchCase {
    pub conditions: Vec<Node>,
    pub block: Block,
}

/// `switch`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Switch {
    #[serde(default)]
    pub subject: Option<Node>,
    #[serde(default)]
    pub cases: Vec<SwitchCase>,
    #[serde(default)]
    pub otherwise: Option<Block>,
}

/// `try`/`catch`/`finally`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Try {
    pub attempt: Block,
    #[serde(default)]
    pub error_variable: Option<Node>,
    #[serde(default)]
    pub recovery: Option<Block>,
    #[serde(default)]
    pub ensure: Option<Block>,
}

/// `while`/`until`/`loop`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct While {
    pub condition: Node,
    #[serde(default)]
    pub guard: Option<Node>,
    #[serde(default)]
    pub body: Block,
    /// Collect the last value of each iteration
    #[serde(skip)]
    pub returns: bool,
}

/// Comprehension over a range, array, object or iterable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct For {
    #[serde(default)]
    pub body: Block,
    pub source: Node,
    /// Binding for each value
    #[serde(default)]
    pub name: Option<Node>,
    /// Binding for each index or key
    #[serde(default)]
    pub index: Option<Node>,
    #[serde(default)]
    pub guard: Option<Node>,
    #[serde(default)]
    pub step: Option<Node>,
    /// `for own k of obj`
    #[serde(default)]
    pub own: bool,
    /// `for k of obj`
    #[serde(default)]
    pub object: bool,
    /// `for x from iterable`
    #[serde(default)]
    pub from: bool,
    #[serde(skip)]
    pub returns: bool,
}

impl For {
    pub fn new(body: Block, source: Node) -> Self {
        Self {
            body,
            source,
            name: None,
            index: None,
            guard: None,
            step: None,
            own: false,
            object: false,
            from: false,
            returns: false,
        }
    }

    /// Iterates a bare range literal
    pub fn is_range(&self) -> bool {
        !self.from && matches!(&self.source.kind, NodeKind::Value(v) if v.is_range())
    }

    /// The value binding is a destructuring pattern
    pub fn is_pattern(&self) -> bool {
        matches!(&self.name, Some(Node { kind: NodeKind::Value(_), .. }))
    }
}
