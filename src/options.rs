//! Compile options
//!
//! Options can be built in code or loaded from a `percolate.json` file:
//!
//! ```json
//! { "bare": true, "header": false, "locals": ["exports"], "referencedVars": ["ref"] }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Options for one compile
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompileOptions {
    /// Skip the top-level `(function() { ... }).call(this)` wrapper
    pub bare: bool,
    /// Prefix the output with a `// Generated by` line
    pub header: bool,
    /// Names already declared by the surrounding program; never re-declared
    pub locals: Vec<String>,
    /// Identifiers the source uses, which temporaries must avoid
    pub referenced_vars: Vec<String>,
}

impl CompileOptions {
    pub fn with_bare(mut self, bare: bool) -> Self {
        self.bare = bare;
        self
    }

    pub fn with_header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }

    pub fn with_locals(mut self, locals: Vec<String>) -> Self {
        self.locals = locals;
        self
    }

    pub fn with_referenced_vars(mut self, referenced_vars: Vec<String>) -> Self {
        self.referenced_vars = referenced_vars;
        self
    }

    /// Parse options from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::ConfigError(format!("invalid compile options: {}", e)))
    }

    /// Load options from a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        let options = Self::from_json(&json)?;
        tracing::debug!(path = %path.display(), ?options, "loaded compile options");
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_from_json() {
        let options = CompileOptions::from_json(
            r#"{"bare": true, "locals": ["exports"], "referencedVars": ["ref", "i"]}"#,
        )
        .unwrap();
        assert!(options.bare);
        assert!(!options.header);
        assert_eq!(options.locals, vec!["exports"]);
        assert_eq!(options.referenced_vars, vec!["ref", "i"]);
    }

    #[test]
    fn test_missing_keys_use_defaults() {
        assert_eq!(CompileOptions::from_json("{}").unwrap(), CompileOptions::default());
    }

    #[test]
    fn test_invalid_json() {
        let err = CompileOptions::from_json("{\"bare\": 1}").unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn test_builders() {
        let options = CompileOptions::default()
            .with_bare(true)
            .with_header(true)
            .with_locals(vec!["a".to_string()]);
        assert!(options.bare && options.header);
        assert_eq!(options.locals, vec!["a"]);
    }
}
