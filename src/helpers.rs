//! Runtime helpers injected into the output on first use
//!
//! A helper is defined once per compile, as an assignment in the root scope,
//! and every later reference reuses the name it was given.

use std::rc::Rc;

use crate::scope::Scope;

/// A function or value the lowered code may depend on at runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Helper {
    Extends,
    Bind,
    IndexOf,
    Modulo,
    HasProp,
    Slice,
}

impl Helper {
    pub fn name(self) -> &'static str {
        match self {
            Helper::Extends => "extends",
            Helper::Bind => "bind",
            Helper::IndexOf => "indexOf",
            Helper::Modulo => "modulo",
            Helper::HasProp => "hasProp",
            Helper::Slice => "slice",
        }
    }

    fn definition(self, scope: &Rc<Scope>) -> String {
        match self {
            Helper::Extends => format!(
                "function(child, parent) {{ for (var key in parent) {{ if ({}.call(parent, key)) \
                 child[key] = parent[key]; }} function ctor() {{ this.constructor = child; }} \
                 ctor.prototype = parent.prototype; child.prototype = new ctor(); \
                 child.__super__ = parent.prototype; return child; }}",
                utility(Helper::HasProp, scope)
            ),
            Helper::Bind => {
                "function(fn, me){ return function(){ return fn.apply(me, arguments); }; }".to_string()
            }
            Helper::IndexOf => "[].indexOf || function(item) { for (var i = 0, l = this.length; \
                                i < l; i++) { if (i in this && this[i] === item) return i; } \
                                return -1; }"
                .to_string(),
            Helper::Modulo => "function(a, b) { return (+a % (b = +b) + b) % b; }".to_string(),
            Helper::HasProp => "{}.hasOwnProperty".to_string(),
            Helper::Slice => "[].slice".to_string(),
        }
    }
}

/// The name `helper` goes by in this compile, defining it on first use
pub fn utility(helper: Helper, scope: &Rc<Scope>) -> String {
    let root = scope.root_scope();
    if let Some(reference) = root.helper_reference(helper.name()) {
        return reference;
    }
    let reference = root.free_variable(&format!("__{}", helper.name()), false, true);
    tracing::debug!(helper = helper.name(), %reference, "injecting runtime helper");
    let definition = helper.definition(&root);
    root.assign(&reference, definition);
    root.record_helper(helper.name(), reference.clone());
    reference
}
