//! Error types for the percolate lowering engine

use std::fmt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Source location attached to an AST node
///
/// Lines and columns are 0-based, the way the parser records them. They are
/// shown 1-based when an error is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationData {
    /// First line of the node
    pub first_line: u32,
    /// First column of the node
    pub first_column: u32,
    /// Last line of the node
    #[serde(default)]
    pub last_line: u32,
    /// Last column of the node (inclusive)
    #[serde(default)]
    pub last_column: u32,
}

impl LocationData {
    /// Create a location spanning a single line
    pub fn new(line: u32, first_column: u32, last_column: u32) -> Self {
        Self {
            first_line: line,
            first_column,
            last_line: line,
            last_column,
        }
    }
}

impl fmt::Display for LocationData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.first_line + 1, self.first_column + 1)
    }
}

/// Format a source context with a caret run under the offending node
pub fn format_error_context(source: &str, location: &LocationData) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let line_idx = location.first_line as usize;

    let Some(line) = lines.get(line_idx) else {
        return String::new();
    };

    let start = location.first_column as usize;
    let end = if location.last_line == location.first_line {
        (location.last_column as usize + 1).max(start + 1)
    } else {
        line.chars().count().max(start + 1)
    };

    let mut result = String::new();
    result.push_str(line);
    result.push('\n');
    result.push_str(&" ".repeat(start));
    result.push_str(&"^".repeat(end - start));
    result
}

/// Main error type for percolate
#[derive(Error, Debug)]
pub enum Error {
    /// A construct that cannot be lowered, located at the offending node
    #[error("{message}")]
    CompileError {
        message: String,
        location: Option<LocationData>,
    },

    /// The JSON AST did not match the node schema
    #[error("AstError: {source}")]
    AstError {
        #[from]
        source: serde_json::Error,
    },

    /// A configuration file could not be understood
    #[error("ConfigError: {0}")]
    ConfigError(String),

    /// Internal compiler error
    #[error("InternalError: {0}")]
    InternalError(String),

    /// IO error
    #[error("IOError: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },
}

impl Error {
    /// Create a new lowering error
    pub fn compile_error(message: impl Into<String>, location: Option<LocationData>) -> Self {
        Error::CompileError {
            message: message.into(),
            location,
        }
    }

    /// Create an internal error for states the tree shape should rule out
    pub fn internal(message: impl Into<String>) -> Self {
        Error::InternalError(message.into())
    }

    /// Location of the offending node, if the error carries one
    pub fn location(&self) -> Option<LocationData> {
        match self {
            Error::CompileError { location, .. } => *location,
            _ => None,
        }
    }

    /// Render the error as `file:line:col: error: message`
    pub fn report(&self, file_name: &str) -> String {
        match self {
            Error::CompileError {
                message,
                location: Some(location),
            } => format!("{}:{}: error: {}", file_name, location, message),
            other => format!("{}: error: {}", file_name, other),
        }
    }

    /// Render the report followed by the offending source line
    pub fn report_with_source(&self, file_name: &str, source: &str) -> String {
        let report = self.report(file_name);
        match self.location() {
            Some(location) => {
                let context = format_error_context(source, &location);
                if context.is_empty() {
                    report
                } else {
                    format!("{}\n{}", report, context)
                }
            }
            None => report,
        }
    }
}

/// Result type alias for percolate
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_uses_one_based_positions() {
        let err = Error::compile_error("unexpected thing", Some(LocationData::new(2, 4, 6)));
        assert_eq!(err.report("a.coffee"), "a.coffee:3:5: error: unexpected thing");
    }

    #[test]
    fn test_report_without_location() {
        let err = Error::internal("oops");
        assert_eq!(err.report("a.coffee"), "a.coffee: error: InternalError: oops");
    }

    #[test]
    fn test_error_context_carets() {
        let source = "a = 1\nfoo = bar baz\n";
        let context = format_error_context(source, &LocationData::new(1, 6, 8));
        assert_eq!(context, "foo = bar baz\n      ^^^");
    }

    #[test]
    fn test_report_with_source_line() {
        let err = Error::compile_error("bad", Some(LocationData::new(0, 2, 2)));
        assert_eq!(
            err.report_with_source("x.coffee", "a = b\n"),
            "x.coffee:1:3: error: bad\na = b\n  ^"
        );
    }

    #[test]
    fn test_error_context_out_of_range() {
        assert_eq!(format_error_context("x", &LocationData::new(5, 0, 0)), "");
    }
}
