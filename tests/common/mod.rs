//! Shared helpers for integration tests

use percolate::ast::Node;
use percolate::{compile, CompileOptions, Error};

/// Compile a program without the top-level wrapper
pub fn bare(program: Vec<Node>) -> String {
    compile(program, &CompileOptions::default().with_bare(true)).unwrap()
}

/// Compile a program with extra options on top of `bare`
#[allow(dead_code)]
pub fn bare_with(program: Vec<Node>, options: CompileOptions) -> String {
    compile(program, &options.with_bare(true)).unwrap()
}

/// Compile a program that must fail
#[allow(dead_code)]
pub fn compile_error(program: Vec<Node>) -> Error {
    compile(program, &CompileOptions::default().with_bare(true)).unwrap_err()
}

/// Names the surrounding program already declares
#[allow(dead_code)]
pub fn locals(names: &[&str]) -> CompileOptions {
    CompileOptions::default().with_locals(names.iter().map(|n| n.to_string()).collect())
}
