//! Blocks, function bodies and the program root

use super::{compile_node, compile_to_fragments, unfold_soak, Context, Level, TAB};
use crate::ast::{Block, LiteralKind, Node, NodeKind};
use crate::error::{LocationData, Result};
use crate::fragment::{Fragments, Origin};
use crate::options::CompileOptions;
use crate::scope::{Scope, VariableKind};

pub(crate) fn compile_block(
    block: Block,
    loc: Option<LocationData>,
    o: &Context,
) -> Result<Fragments> {
    let origin = Origin::new(loc, "Block");
    let top = o.level == Level::Top;
    let count = block.expressions.len();
    let mut compiled = Vec::with_capacity(count);
    for node in block.expressions {
        let node = unfold_soak(node.unwrap_all(), o)?.into_node();
        if let NodeKind::Block(inner) = node.kind {
            compiled.push(compile_block(inner, node.loc, o)?);
        } else if top {
            let mut node = node;
            node.front = true;
            let is_statement = node.is_statement(Some(o.level));
            let mut fragments = compile_to_fragments(node, o, o.level)?;
            if !is_statement {
                fragments.insert(0, origin.code(o.indent.clone()));
                fragments.push(origin.code(";"));
            }
            compiled.push(fragments);
        } else {
            compiled.push(compile_to_fragments(node, o, Level::List)?);
        }
    }
    if top {
        if block.spaced {
            let mut fragments = origin.join(compiled, "\n\n");
            fragments.push(origin.code("\n"));
            return Ok(fragments);
        }
        return Ok(origin.join(compiled, "\n"));
    }
    let answer = if compiled.is_empty() {
        vec![origin.code("void 0")]
    } else {
        origin.join(compiled, ", ")
    };
    Ok(if count > 1 && o.level >= Level::List {
        origin.wrap_in_braces(answer)
    } else {
        answer
    })
}

/// Comments and string directives such as `"use strict"`
///
/// Other literal statements (numbers, regexes, raw JS) are not part of the
/// prologue and stay below the `var` line.
fn is_prologue(node: &Node) -> bool {
    match &node.unwrap_ref().kind {
        NodeKind::Comment(_) => true,
        NodeKind::Literal(l) => l.kind == LiteralKind::String,
        _ => false,
    }
}

/// Lower a function body (or the program) with the `var` line its scope
/// needs, placed after any leading comments and directives
pub(crate) fn compile_with_declarations(
    mut block: Block,
    loc: Option<LocationData>,
    o: &Context,
) -> Result<Fragments> {
    let origin = Origin::new(loc, "Block");
    let o = o.at(Level::Top);
    let split = block
        .expressions
        .iter()
        .position(|e| !is_prologue(e))
        .unwrap_or(block.expressions.len());
    let mut fragments = Vec::new();
    if split > 0 {
        let rest = block.expressions.split_off(split);
        let leading = Block::new(std::mem::replace(&mut block.expressions, rest));
        fragments = compile_block(leading, loc, &o)?;
    }
    let spaced = block.spaced;
    let post = compile_block(block, loc, &o)?;
    let scope = &o.scope;
    let declared = scope.has_declarations();
    let assigned = scope.has_assignments();
    if declared || assigned {
        let tab = &o.indent;
        if split > 0 {
            fragments.push(origin.code("\n"));
        }
        fragments.push(origin.code(format!("{}var ", tab)));
        let separator = format!(",\n{}{}", tab, TAB);
        if declared {
            fragments.push(origin.code(scope.declared_variables().join(", ")));
        }
        if assigned {
            if declared {
                fragments.push(origin.code(separator.clone()));
            }
            fragments.push(origin.code(scope.assigned_variables().join(&separator)));
        }
        fragments.push(origin.code(format!(";\n{}", if spaced { "\n" } else { "" })));
    } else if !fragments.is_empty() && !post.is_empty() {
        fragments.push(origin.code("\n"));
    }
    fragments.extend(post);
    Ok(fragments)
}

/// Lower a whole program
///
/// Unless `bare` is set, the program is wrapped in a function invoked with
/// the caller's `this`; leading comments stay outside the wrapper.
pub fn compile_root(mut block: Block, options: &CompileOptions) -> Result<Fragments> {
    let span = tracing::debug_span!("compile_root", bare = options.bare);
    let _guard = span.enter();

    let scope = Scope::root(options.referenced_vars.iter().cloned());
    for name in &options.locals {
        scope.add(name, VariableKind::Param, false);
    }
    let mut o = Context::new(scope, options);
    block.spaced = true;
    let origin = Origin::new(None, "Block");

    let mut prelude = Vec::new();
    if !options.bare {
        let count = block
            .expressions
            .iter()
            .take_while(|e| matches!(e.unwrap_ref().kind, NodeKind::Comment(_)))
            .count();
        if count > 0 {
            let rest = block.expressions.split_off(count);
            let mut comments = Block::new(std::mem::replace(&mut block.expressions, rest));
            comments.spaced = true;
            let mut po = o.clone();
            po.indent = String::new();
            prelude = compile_node(Node::from(comments), &po)?;
            prelude.push(origin.code("\n"));
        }
    }
    o.level = Level::Top;
    let fragments = compile_with_declarations(block, None, &o)?;
    tracing::debug!(
        fragments = fragments.len(),
        declared = o.scope.declared_variables().len(),
        "lowered program"
    );
    if options.bare {
        return Ok(fragments);
    }
    let mut answer = prelude;
    answer.push(origin.code("(function() {\n"));
    answer.extend(fragments);
    answer.push(origin.code("\n}).call(this);\n"));
    Ok(answer)
}

/// Make the last non-comment expression produce the block's value
pub(crate) fn make_return(mut block: Block, res: Option<&str>) -> Block {
    let Some(index) = block
        .expressions
        .iter()
        .rposition(|e| !matches!(e.kind, NodeKind::Comment(_)))
    else {
        return block;
    };
    let expr = block.expressions[index].take();
    let bare_return = matches!(&expr.kind, NodeKind::Return(r) if r.expression.is_none());
    if bare_return {
        block.expressions.remove(index);
    } else {
        block.expressions[index] = super::make_return(expr, res);
    }
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::*;
    use crate::fragment::fragments_to_text;
    use pretty_assertions::assert_eq;

    fn bare() -> CompileOptions {
        CompileOptions::default().with_bare(true)
    }

    fn root(nodes: Vec<Node>, options: &CompileOptions) -> String {
        fragments_to_text(&compile_root(Block::new(nodes), options).unwrap())
    }

    #[test]
    fn test_statements_are_spaced_at_top() {
        let out = root(vec![call(id("a"), vec![]), call(id("b"), vec![])], &bare());
        assert_eq!(out, "a();\n\nb();\n");
    }

    #[test]
    fn test_wrapper_and_var_line() {
        let out = root(vec![assign(id("x"), num("1"))], &CompileOptions::default());
        assert_eq!(out, "(function() {\n  var x;\n\n  x = 1;\n\n}).call(this);\n");
    }

    #[test]
    fn test_leading_comment_stays_outside_wrapper() {
        let out = root(vec![comment(" note "), id("a")], &CompileOptions::default());
        assert_eq!(out, "\n/* note */\n\n(function() {\n  a;\n\n}).call(this);\n");
    }

    #[test]
    fn test_leading_number_stays_below_var_line() {
        let out = root(vec![num("1"), assign(id("x"), num("2"))], &bare());
        assert_eq!(out, "var x;\n\n1;\n\nx = 2;\n");
    }

    #[test]
    fn test_locals_are_not_declared() {
        let options = bare().with_locals(vec!["x".to_string()]);
        let out = root(vec![assign(id("x"), num("1"))], &options);
        assert_eq!(out, "x = 1;\n");
    }

    #[test]
    fn test_expression_block_joins_with_commas() {
        let scope = Scope::root(Vec::<String>::new());
        let o = Context::new(scope, &bare()).at(Level::List);
        let out = compile_block(Block::new(vec![id("a"), id("b")]), None, &o).unwrap();
        assert_eq!(fragments_to_text(&out), "(a, b)");
        let empty = compile_block(Block::default(), None, &o).unwrap();
        assert_eq!(fragments_to_text(&empty), "void 0");
    }

    #[test]
    fn test_make_return_drops_bare_return() {
        let block = Block::new(vec![id("a"), ret(None)]);
        let block = make_return(block, None);
        assert_eq!(block.expressions.len(), 1);
        assert!(!matches!(block.expressions[0].kind, NodeKind::Return(_)));
    }
}
