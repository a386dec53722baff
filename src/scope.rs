//! Lexical scope bookkeeping
//!
//! One [`Scope`] exists per function boundary, including the implicit
//! function around the whole program. Scopes record which names are declared
//! so the compiler can hoist a single `var` line to the top of each function,
//! and hand out fresh temporaries that never collide with user names.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};

/// How a name came to live in a scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableKind {
    /// The `arguments` pseudo-variable every function starts with
    Arguments,
    /// A local that needs a `var` declaration
    Var,
    /// A function parameter
    Param,
    /// A local declared together with its initial value
    Assigned(String),
}

/// A name recorded in a scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub kind: VariableKind,
}

/// What the compiler knows about the function that owns a scope
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodInfo {
    /// The function captures its defining `this`
    pub bound: bool,
    /// Name that stands in for `this` inside a bound function
    pub context: Option<String>,
    /// Accessor text of the method (`.foo`), or the class name for constructors
    pub name: Option<String>,
    /// Compiled reference to the owning class
    pub klass: Option<String>,
    /// The method lives on the class rather than its prototype
    pub is_static: bool,
    /// The function is a class constructor
    pub is_ctor: bool,
}

/// A lexical scope
#[derive(Debug)]
pub struct Scope {
    parent: Option<Rc<Scope>>,
    method: Option<MethodInfo>,
    shared: Cell<bool>,
    variables: RefCell<Vec<Variable>>,
    positions: RefCell<FxHashMap<String, usize>>,
    has_assignments: Cell<bool>,
    referenced_vars: FxHashSet<String>,
    helpers: RefCell<FxHashMap<&'static str, String>>,
}

impl Scope {
    fn with_parent(
        parent: Option<Rc<Scope>>,
        method: Option<MethodInfo>,
        referenced_vars: FxHashSet<String>,
    ) -> Self {
        let mut positions = FxHashMap::default();
        positions.insert("arguments".to_string(), 0);
        Self {
            parent,
            method,
            shared: Cell::new(false),
            variables: RefCell::new(vec![Variable {
                name: "arguments".to_string(),
                kind: VariableKind::Arguments,
            }]),
            positions: RefCell::new(positions),
            has_assignments: Cell::new(false),
            referenced_vars,
            helpers: RefCell::new(FxHashMap::default()),
        }
    }

    /// Create the program's root scope
    ///
    /// `referenced_vars` lists every identifier the source mentions, so that
    /// temporaries never shadow a user name that has not been declared yet.
    pub fn root<I, S>(referenced_vars: I) -> Rc<Scope>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let referenced = referenced_vars.into_iter().map(Into::into).collect();
        Rc::new(Self::with_parent(None, None, referenced))
    }

    /// Create a scope for a function nested in `parent`
    pub fn child(parent: &Rc<Scope>, method: MethodInfo) -> Rc<Scope> {
        Rc::new(Self::with_parent(
            Some(Rc::clone(parent)),
            Some(method),
            FxHashSet::default(),
        ))
    }

    pub fn parent(&self) -> Option<&Rc<Scope>> {
        self.parent.as_ref()
    }

    /// The function that owns this scope; `None` at the root
    pub fn method(&self) -> Option<&MethodInfo> {
        self.method.as_ref()
    }

    /// The root scope of the compile
    pub fn root_scope(self: &Rc<Self>) -> Rc<Scope> {
        let mut scope = Rc::clone(self);
        while let Some(parent) = scope.parent.clone() {
            scope = parent;
        }
        scope
    }

    /// Mark the scope as belonging to a closure that only exists to turn a
    /// statement into an expression; its names live in the parent
    pub fn set_shared(&self, shared: bool) {
        self.shared.set(shared);
    }

    pub fn is_shared(&self) -> bool {
        self.shared.get()
    }

    /// Record `name`; replaces the kind of an existing entry
    pub fn add(&self, name: &str, kind: VariableKind, immediate: bool) {
        if self.shared.get() && !immediate {
            if let Some(parent) = &self.parent {
                parent.add(name, kind, false);
                return;
            }
        }
        let existing = self.positions.borrow().get(name).copied();
        match existing {
            Some(index) => self.variables.borrow_mut()[index].kind = kind,
            None => {
                let mut variables = self.variables.borrow_mut();
                self.positions
                    .borrow_mut()
                    .insert(name.to_string(), variables.len());
                variables.push(Variable {
                    name: name.to_string(),
                    kind,
                });
            }
        }
    }

    /// The closest enclosing method that has a name
    pub fn named_method(&self) -> Option<MethodInfo> {
        match (&self.method, &self.parent) {
            (Some(method), _) if method.name.is_some() => Some(method.clone()),
            (_, None) => self.method.clone(),
            (_, Some(parent)) => parent.named_method(),
        }
    }

    /// Look `name` up through the parent chain, declaring it here if unseen
    pub fn find(&self, name: &str) -> bool {
        if self.check(name) {
            return true;
        }
        self.add(name, VariableKind::Var, false);
        false
    }

    /// Declare a function parameter
    pub fn parameter(&self, name: &str) {
        if self.shared.get() {
            if let Some(parent) = &self.parent {
                if parent.check(name) {
                    return;
                }
            }
        }
        self.add(name, VariableKind::Param, false);
    }

    /// Is `name` visible from this scope?
    pub fn check(&self, name: &str) -> bool {
        self.kind_of(name).is_some() || self.parent.as_ref().is_some_and(|p| p.check(name))
    }

    /// The kind `name` was recorded with in this scope only
    pub fn kind_of(&self, name: &str) -> Option<VariableKind> {
        let index = *self.positions.borrow().get(name)?;
        Some(self.variables.borrow()[index].kind.clone())
    }

    fn is_referenced(&self, name: &str) -> bool {
        match &self.parent {
            Some(parent) => parent.is_referenced(name),
            None => self.referenced_vars.contains(name),
        }
    }

    /// Produce the `index`th candidate temporary for `name`
    pub fn temporary(name: &str, index: usize, single: bool) -> String {
        if single {
            let start = u32::from_str_radix(name, 36).unwrap_or(18) as usize;
            to_base36(start + index)
                .chars()
                .map(|c| if c.is_ascii_digit() { 'a' } else { c })
                .collect()
        } else if index == 0 {
            name.to_string()
        } else {
            format!("{}{}", name, index)
        }
    }

    /// Hand out a temporary name that is not visible from this scope
    pub fn free_variable(&self, name: &str, single: bool, reserve: bool) -> String {
        let mut index = 0;
        let temp = loop {
            let temp = Self::temporary(name, index, single);
            if !self.check(&temp) && !self.is_referenced(&temp) {
                break temp;
            }
            index += 1;
        };
        if reserve {
            self.add(&temp, VariableKind::Var, true);
        }
        temp
    }

    /// Declare `name` together with its initial value
    pub fn assign(&self, name: &str, value: impl Into<String>) {
        self.add(name, VariableKind::Assigned(value.into()), true);
        self.has_assignments.set(true);
    }

    pub fn has_declarations(&self) -> bool {
        self.variables
            .borrow()
            .iter()
            .any(|v| v.kind == VariableKind::Var)
    }

    pub fn has_assignments(&self) -> bool {
        self.has_assignments.get()
    }

    /// Names needing a bare `var` declaration, in first-declared order
    pub fn declared_variables(&self) -> Vec<String> {
        self.variables
            .borrow()
            .iter()
            .filter(|v| v.kind == VariableKind::Var)
            .map(|v| v.name.clone())
            .collect()
    }

    /// `name = value` declarations, in first-declared order
    pub fn assigned_variables(&self) -> Vec<String> {
        self.variables
            .borrow()
            .iter()
            .filter_map(|v| match &v.kind {
                VariableKind::Assigned(value) => Some(format!("{} = {}", v.name, value)),
                _ => None,
            })
            .collect()
    }

    /// Name already given to a runtime helper in this compile
    pub fn helper_reference(&self, helper: &str) -> Option<String> {
        self.helpers.borrow().get(helper).cloned()
    }

    /// Remember the name a runtime helper was given
    pub fn record_helper(&self, helper: &'static str, reference: String) {
        self.helpers.borrow_mut().insert(helper, reference);
    }
}

fn to_base36(mut value: usize) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(DIGITS[value % 36] as char);
        value /= 36;
    }
    digits.iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_refs() -> Rc<Scope> {
        Scope::root(Vec::<String>::new())
    }

    #[test]
    fn test_find_declares_once() {
        let scope = no_refs();
        assert!(!scope.find("a"));
        assert!(scope.find("a"));
        assert_eq!(scope.declared_variables(), vec!["a"]);
    }

    #[test]
    fn test_arguments_is_never_declared() {
        let scope = no_refs();
        assert!(scope.find("arguments"));
        assert!(!scope.has_declarations());
    }

    #[test]
    fn test_child_sees_parent_names() {
        let root = no_refs();
        root.find("outer");
        let child = Scope::child(&root, MethodInfo::default());
        assert!(child.find("outer"));
        assert!(!child.find("inner"));
        assert_eq!(child.declared_variables(), vec!["inner"]);
        assert!(!root.check("inner"));
    }

    #[test]
    fn test_free_variable_sequences() {
        let scope = no_refs();
        assert_eq!(scope.free_variable("ref", false, true), "ref");
        assert_eq!(scope.free_variable("ref", false, true), "ref1");
        assert_eq!(scope.free_variable("ref", false, true), "ref2");
        assert_eq!(scope.free_variable("i", true, true), "i");
        assert_eq!(scope.free_variable("i", true, true), "j");
        assert_eq!(scope.free_variable("i", true, false), "k");
        assert_eq!(scope.free_variable("i", true, false), "k");
    }

    #[test]
    fn test_free_variable_skips_referenced_names() {
        let scope = Scope::root(["ref", "i"]);
        assert_eq!(scope.free_variable("ref", false, true), "ref1");
        assert_eq!(scope.free_variable("i", true, true), "j");
    }

    #[test]
    fn test_single_temporaries_roll_over() {
        assert_eq!(Scope::temporary("i", 17, true), "z");
        assert_eq!(Scope::temporary("i", 18, true), "aa");
    }

    #[test]
    fn test_shared_scope_declares_in_parent() {
        let root = no_refs();
        let closure = Scope::child(&root, MethodInfo::default());
        closure.set_shared(true);
        closure.find("x");
        let temp = closure.free_variable("results", false, true);
        assert_eq!(root.declared_variables(), vec!["x"]);
        assert_eq!(closure.declared_variables(), vec![temp]);
    }

    #[test]
    fn test_assignments_follow_declaration_order() {
        let scope = no_refs();
        scope.find("b");
        scope.assign("__slice", "[].slice");
        scope.find("a");
        assert_eq!(scope.declared_variables(), vec!["b", "a"]);
        assert_eq!(scope.assigned_variables(), vec!["__slice = [].slice"]);
        assert!(scope.has_assignments());
    }

    #[test]
    fn test_named_method_walks_outward() {
        let root = no_refs();
        let method = Scope::child(
            &root,
            MethodInfo {
                name: Some(".greet".into()),
                klass: Some("Person".into()),
                ..MethodInfo::default()
            },
        );
        let inner = Scope::child(&method, MethodInfo::default());
        let found = inner.named_method();
        assert_eq!(found.and_then(|m| m.klass).as_deref(), Some("Person"));
        assert!(root.named_method().is_none());
    }
}
