//! Statements that steer control flow: `return`, `throw`, `if`, `switch`
//! and `try`, plus block comments

use std::sync::OnceLock;

use regex::Regex;

use super::{compile_closure, compile_to_fragments, make_return, Context, Level, TAB};
use crate::ast::{
    Block, Comment, Existence, If, Jump, Literal, LiteralKind, Node, NodeKind, Return, Switch,
    Throw, Try,
};
use crate::error::{Error, LocationData, Result};
use crate::fragment::{Fragments, Origin};
use crate::keywords::unassignable_reason;

/// A `return` wherever it appears: the returned expression is pushed
/// through [`make_return`] first, which may turn it into something else
pub(crate) fn compile_return(
    ret: Return,
    loc: Option<LocationData>,
    o: &Context,
) -> Result<Fragments> {
    let Return { expression } = ret;
    let expression = expression.map(|e| make_return(e, None));
    let ret = match expression {
        Some(Node {
            kind: NodeKind::Return(inner),
            ..
        }) => *inner,
        Some(other) => return compile_to_fragments(other, o, o.level),
        None => Return { expression: None },
    };
    let node = Node::from(ret).with_loc(loc);
    if o.level == Level::Top {
        super::compile_node(node, o)
    } else {
        compile_closure(node, o)
    }
}

pub(crate) fn compile_return_statement(
    ret: Return,
    loc: Option<LocationData>,
    o: &Context,
) -> Result<Fragments> {
    let origin = Origin::new(loc, "Return");
    let mut fragments = Vec::new();
    match ret.expression {
        Some(expression) => {
            fragments.push(origin.code(format!("{}return ", o.indent)));
            fragments.extend(compile_to_fragments(expression, o, Level::Paren)?);
        }
        None => fragments.push(origin.code(format!("{}return", o.indent))),
    }
    fragments.push(origin.code(";"));
    Ok(fragments)
}

pub(crate) fn compile_throw(
    throw: Throw,
    loc: Option<LocationData>,
    o: &Context,
) -> Result<Fragments> {
    let origin = Origin::new(loc, "Throw");
    let mut fragments = vec![origin.code(format!("{}throw ", o.indent))];
    fragments.extend(compile_to_fragments(throw.expression, o, Level::Paren)?);
    fragments.push(origin.code(";"));
    Ok(fragments)
}

fn comment_marker() -> Result<&'static Regex> {
    static MARKER: OnceLock<Option<Regex>> = OnceLock::new();
    MARKER
        .get_or_init(|| Regex::new(r"(?m)^(\s*)#(\s)").ok())
        .as_ref()
        .ok_or_else(|| Error::internal("comment marker pattern failed to build"))
}

/// Indent every continuation line by `tab` and drop trailing whitespace
fn multident(code: &str, tab: &str) -> String {
    code.replace('\n', &format!("\n{}", tab))
        .trim_end()
        .to_string()
}

pub(crate) fn compile_comment(
    comment: Comment,
    loc: Option<LocationData>,
    o: &Context,
) -> Result<Fragments> {
    let origin = Origin::new(loc, "Comment");
    let text = comment_marker()?.replace_all(&comment.comment, "${1} *${2}");
    let closing = if text.contains('\n') {
        format!("\n{}", o.indent)
    } else {
        String::new()
    };
    let mut code = format!("/*{}{}*/", multident(&text, &o.indent), closing);
    if o.level == Level::Top {
        code.insert_str(0, &o.indent);
    }
    Ok(vec![origin.code("\n"), origin.code(code)])
}

fn ensure_block(node: Node) -> Node {
    match node.kind {
        NodeKind::Block(_) => node,
        _ => Node::from(Block::new(vec![node])),
    }
}

fn body_node(node: &Node) -> &Node {
    node.unwrap_ref()
}

pub(crate) fn compile_if(node: If, loc: Option<LocationData>, o: &Context) -> Result<Fragments> {
    let is_statement = o.level == Level::Top
        || body_node(&node.body).is_statement(Some(o.level))
        || node
            .else_body
            .as_ref()
            .is_some_and(|e| body_node(e).is_statement(Some(o.level)));
    if is_statement {
        compile_if_statement(node, loc, o)
    } else {
        compile_if_expression(node, loc, o)
    }
}

fn compile_if_statement(node: If, loc: Option<LocationData>, o: &Context) -> Result<Fragments> {
    let origin = Origin::new(loc, "If");
    let child = o.chain_child;
    let exeq = o.is_existential_equals;
    let mut o = o.clone();
    o.chain_child = false;
    o.is_existential_equals = false;
    if exeq {
        let body = node
            .else_body
            .map(Node::unwrap)
            .unwrap_or_else(|| Node::from(Block::default()));
        let inverted = If::new(node.condition.invert(), body);
        return compile_to_fragments(Node::from(inverted).with_loc(loc), &o, Level::Top);
    }
    let tab = o.indent.clone();
    let inner = o.indented();
    let condition = compile_to_fragments(node.condition, &o, Level::Paren)?;
    let body = compile_to_fragments(ensure_block(node.body), &inner, Level::Top)?;
    let mut fragments = Vec::new();
    if !child {
        fragments.push(origin.code(tab.clone()));
    }
    fragments.push(origin.code("if ("));
    fragments.extend(condition);
    fragments.push(origin.code(") {\n"));
    fragments.extend(body);
    fragments.push(origin.code(format!("\n{}}}", tab)));
    let Some(else_body) = node.else_body else {
        return Ok(fragments);
    };
    fragments.push(origin.code(" else "));
    if node.is_chain {
        let mut chained = o.clone();
        chained.chain_child = true;
        fragments.extend(compile_to_fragments(else_body.unwrap(), &chained, Level::Top)?);
    } else {
        fragments.push(origin.code("{\n"));
        fragments.extend(compile_to_fragments(else_body, &inner, Level::Top)?);
        fragments.push(origin.code(format!("\n{}}}", tab)));
    }
    Ok(fragments)
}

fn compile_if_expression(node: If, loc: Option<LocationData>, o: &Context) -> Result<Fragments> {
    let origin = Origin::new(loc, "If");
    let mut o = o.clone();
    o.chain_child = false;
    o.is_existential_equals = false;
    let mut fragments = compile_to_fragments(node.condition, &o, Level::Cond)?;
    fragments.push(origin.code(" ? "));
    fragments.extend(compile_to_fragments(node.body.unwrap(), &o, Level::List)?);
    fragments.push(origin.code(" : "));
    match node.else_body {
        Some(else_body) => {
            fragments.extend(compile_to_fragments(else_body.unwrap(), &o, Level::List)?)
        }
        None => fragments.push(origin.code("void 0")),
    }
    Ok(if o.level >= Level::Cond {
        origin.wrap_in_braces(fragments)
    } else {
        fragments
    })
}

fn void_block() -> Block {
    Block::new(vec![Node::from(Literal::new(LiteralKind::Raw, "void 0"))])
}

pub(crate) fn if_make_return(mut node: If, res: Option<&str>) -> If {
    if res.is_some() && node.else_body.is_none() {
        node.else_body = Some(Node::from(void_block()));
    }
    let body = node.body.take();
    node.body = Node::from(Block::wrap(vec![make_return(body, res)]));
    if let Some(else_body) = node.else_body.take() {
        let returned = make_return(else_body, res);
        node.else_body = Some(match returned.kind {
            NodeKind::If(_) if node.is_chain => returned,
            _ => Node::from(Block::wrap(vec![returned])),
        });
    }
    node
}

/// The last non-comment statement of a case ends the case on its own
fn ends_case(block: &Block) -> bool {
    match block.last_non_comment().map(|e| &e.kind) {
        Some(NodeKind::Return(_)) | Some(NodeKind::Throw(_)) => true,
        Some(NodeKind::Literal(l)) => {
            l.kind == LiteralKind::Statement
                && l.value != "debugger"
                && block
                    .last_non_comment()
                    .is_some_and(|e| e.jumps(Jump::empty()).is_some())
        }
        _ => false,
    }
}

pub(crate) fn compile_switch(
    switch: Switch,
    loc: Option<LocationData>,
    o: &Context,
) -> Result<Fragments> {
    let origin = Origin::new(loc, "Switch");
    let tab = o.indent.clone();
    let idt1 = format!("{}{}", tab, TAB);
    let mut o = o.clone();
    o.indent = format!("{}{}", idt1, TAB);
    let idt2 = o.indent.clone();

    let mut fragments = vec![origin.code(format!("{}switch (", tab))];
    let subjectless = switch.subject.is_none();
    match switch.subject {
        Some(subject) => fragments.extend(compile_to_fragments(subject, &o, Level::Paren)?),
        None => fragments.push(origin.code("false")),
    }
    fragments.push(origin.code(") {\n"));

    let case_count = switch.cases.len();
    let has_otherwise = switch.otherwise.is_some();
    for (i, case) in switch.cases.into_iter().enumerate() {
        for condition in case.conditions {
            let condition = if subjectless { condition.invert() } else { condition };
            fragments.push(origin.code(format!("{}case ", idt1)));
            fragments.extend(compile_to_fragments(condition, &o, Level::Paren)?);
            fragments.push(origin.code(":\n"));
        }
        let ends = ends_case(&case.block);
        let body = compile_to_fragments(Node::from(case.block), &o, Level::Top)?;
        if !body.is_empty() {
            fragments.extend(body);
            fragments.push(origin.code("\n"));
        }
        if i + 1 == case_count && !has_otherwise {
            break;
        }
        if !ends {
            fragments.push(origin.code(format!("{}break;\n", idt2)));
        }
    }
    if let Some(otherwise) = switch.otherwise.filter(|b| !b.is_empty()) {
        fragments.push(origin.code(format!("{}default:\n", idt1)));
        fragments.extend(compile_to_fragments(Node::from(otherwise), &o, Level::Top)?);
        fragments.push(origin.code("\n"));
    }
    fragments.push(origin.code(format!("{}}}", tab)));
    Ok(fragments)
}

pub(crate) fn switch_make_return(mut switch: Switch, res: Option<&str>) -> Switch {
    for case in switch.cases.iter_mut() {
        let block = std::mem::take(&mut case.block);
        case.block = super::block::make_return(block, res);
    }
    if res.is_some() && switch.otherwise.is_none() {
        switch.otherwise = Some(void_block());
    }
    switch.otherwise = switch
        .otherwise
        .map(|block| super::block::make_return(block, res));
    switch
}

pub(crate) fn compile_try(node: Try, loc: Option<LocationData>, o: &Context) -> Result<Fragments> {
    let origin = Origin::new(loc, "Try");
    let tab = o.indent.clone();
    let o = o.indented();
    let attempt = compile_to_fragments(Node::from(node.attempt), &o, Level::Top)?;

    let mut catch_part = Vec::new();
    if let Some(mut recovery) = node.recovery {
        let placeholder = o.scope.free_variable("error", false, false);
        if let Some(variable) = node.error_variable {
            let target = variable.unwrap_all_ref();
            if let Some(reason) = target.as_literal().and_then(|l| unassignable_reason(&l.value)) {
                return Err(variable.error(reason));
            }
            let loc = variable.loc;
            recovery.unshift(
                Node::from(crate::ast::Assign::new(variable, super::ident(&placeholder)))
                    .with_loc(loc),
            );
        }
        catch_part.push(origin.code(format!(" catch ({}) {{\n", placeholder)));
        catch_part.extend(compile_to_fragments(Node::from(recovery), &o, Level::Top)?);
        catch_part.push(origin.code(format!("\n{}}}", tab)));
    } else if node.ensure.is_none() {
        let placeholder = o.scope.free_variable("error", false, false);
        catch_part.push(origin.code(format!(" catch ({}) {{}}", placeholder)));
    }

    let mut fragments = vec![origin.code(format!("{}try {{\n", tab))];
    fragments.extend(attempt);
    fragments.push(origin.code(format!("\n{}}}", tab)));
    fragments.extend(catch_part);
    if let Some(ensure) = node.ensure {
        fragments.push(origin.code(" finally {\n"));
        fragments.extend(compile_to_fragments(Node::from(ensure), &o, Level::Top)?);
        fragments.push(origin.code(format!("\n{}}}", tab)));
    }
    Ok(fragments)
}

pub(crate) fn try_make_return(mut node: Try, res: Option<&str>) -> Try {
    node.attempt = super::block::make_return(std::mem::take(&mut node.attempt), res);
    node.recovery = node
        .recovery
        .map(|block| super::block::make_return(block, res));
    node
}

/// `left?` as a node, used when lowering conditional assignment
pub(crate) fn exists(node: Node) -> Node {
    let loc = node.loc;
    Node::from(Existence {
        expression: node,
        negated: false,
    })
    .with_loc(loc)
}
