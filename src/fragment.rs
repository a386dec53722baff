//! Code fragments, the atomic unit of generated output
//!
//! Every node lowers to a flat list of fragments. Each fragment keeps the
//! location of the node that produced it so a source-map writer can consume
//! the same list the text is built from.

use serde::Serialize;

use crate::error::LocationData;

/// A piece of generated JavaScript tagged with its origin
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeFragment {
    /// Emitted text
    pub code: String,
    /// Location of the node that produced the text
    pub location: Option<LocationData>,
    /// Kind of the node that produced the text
    pub node_type: &'static str,
}

/// An ordered list of fragments; order is emission order
pub type Fragments = Vec<CodeFragment>;

/// Concatenate fragments into output text
pub fn fragments_to_text(fragments: &[CodeFragment]) -> String {
    let mut text = String::with_capacity(fragments.iter().map(|f| f.code.len()).sum());
    for fragment in fragments {
        text.push_str(&fragment.code);
    }
    text
}

/// The node a fragment is attributed to
#[derive(Debug, Clone, Copy)]
pub(crate) struct Origin {
    pub loc: Option<LocationData>,
    pub node_type: &'static str,
}

impl Origin {
    pub fn new(loc: Option<LocationData>, node_type: &'static str) -> Self {
        Self { loc, node_type }
    }

    /// Make a fragment attributed to this node
    pub fn code(&self, code: impl Into<String>) -> CodeFragment {
        CodeFragment {
            code: code.into(),
            location: self.loc,
            node_type: self.node_type,
        }
    }

    /// Wrap fragments in parentheses
    pub fn wrap_in_braces(&self, fragments: Fragments) -> Fragments {
        let mut out = Vec::with_capacity(fragments.len() + 2);
        out.push(self.code("("));
        out.extend(fragments);
        out.push(self.code(")"));
        out
    }

    /// Join fragment lists with a separator
    pub fn join(&self, lists: Vec<Fragments>, separator: &str) -> Fragments {
        let mut out = Vec::new();
        for (i, list) in lists.into_iter().enumerate() {
            if i > 0 {
                out.push(self.code(separator));
            }
            out.extend(list);
        }
        out
    }
}
