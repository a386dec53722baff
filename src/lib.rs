//! Percolate: lowers a CoffeeScript-style syntax tree into JavaScript
//!
//! The input is an already-parsed tree, built with [`ast::build`] or read
//! from JSON. The output follows CoffeeScript 1.12: implicit returns,
//! hoisted `var` declarations, soaked accesses, destructuring, splats,
//! comprehensions, classes and the small runtime helpers they need.
//!
//! # Quick Start
//!
//! ```
//! use percolate::ast::build::*;
//! use percolate::{compile, CompileOptions};
//!
//! let program = vec![assign(id("square"), func(vec![param("x")], vec![op("*", id("x"), id("x"))]))];
//! let js = compile(program, &CompileOptions::default().with_bare(true)).unwrap();
//! assert_eq!(js, "var square;\n\nsquare = function(x) {\n  return x * x;\n};\n");
//! ```
//!
//! # Module Overview
//!
//! | Module | Role |
//! |--------|------|
//! | [`ast`] | Node kinds, builders and tree queries |
//! | [`compiler`] | Per-kind lowering into [`fragment`]s |
//! | [`scope`] | Variable bookkeeping and temporaries |
//! | [`helpers`] | Runtime helpers injected on first use |
//! | [`options`] | Compile options and config files |
#![allow(clippy::too_many_arguments)]
#![allow(clippy::collapsible_if)]

pub mod ast;
pub mod compiler;
pub mod fragment;
pub mod helpers;
pub mod keywords;
pub mod options;
pub mod scope;

mod error;

use ast::{Block, Node, NodeKind};
use fragment::{fragments_to_text, Fragments, Origin};

pub use error::{format_error_context, Error, LocationData, Result};
pub use options::CompileOptions;

/// Percolate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Lower a program into fragments, in emission order
pub fn compile_fragments(program: Vec<Node>, options: &CompileOptions) -> Result<Fragments> {
    let block = match <[Node; 1]>::try_from(program) {
        Ok([node]) => match node.kind {
            NodeKind::Block(block) => block,
            kind => Block::new(vec![Node { kind, ..node }]),
        },
        Err(program) => Block::new(program),
    };
    let mut fragments = compiler::compile_root(block, options)?;
    if options.header {
        let origin = Origin::new(None, "Block");
        fragments.insert(0, origin.code(format!("// Generated by percolate {}\n", VERSION)));
    }
    Ok(fragments)
}

/// Lower a program into JavaScript text
pub fn compile(program: Vec<Node>, options: &CompileOptions) -> Result<String> {
    Ok(fragments_to_text(&compile_fragments(program, options)?))
}

/// Read a program from its JSON form
///
/// The document is either a single node (usually a `Block`) or an array of
/// top-level nodes.
pub fn parse_json(json: &str) -> Result<Vec<Node>> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let program = if value.is_array() {
        serde_json::from_value(value)?
    } else {
        vec![serde_json::from_value(value)?]
    };
    Ok(program)
}

/// Lower a program given in its JSON form
pub fn compile_json(json: &str, options: &CompileOptions) -> Result<String> {
    compile(parse_json(json)?, options)
}
