//! Destructuring patterns and parameter names

use super::{LiteralKind, Node, NodeKind, Param};
use crate::error::Result;

impl Param {
    /// Visit every name this parameter binds, `@name` for this-parameters
    pub fn each_name(&self, f: &mut dyn FnMut(&str, &Node) -> Result<()>) -> Result<()> {
        each_name(&self.name, f)
    }
}

fn at_param(node: &Node, f: &mut dyn FnMut(&str, &Node) -> Result<()>) -> Result<()> {
    let name = node
        .as_value()
        .and_then(|v| v.properties.first())
        .and_then(|p| p.access_name())
        .unwrap_or_default();
    f(&format!("@{}", name), node)
}

fn pattern_elements(node: &Node) -> Option<&[Node]> {
    match &node.kind {
        NodeKind::Arr(arr) => Some(&arr.objects),
        NodeKind::Obj(obj) => Some(&obj.properties),
        NodeKind::Value(v) if v.is_array() || v.is_object(false) => pattern_elements(&v.base),
        _ => None,
    }
}

fn each_name(name: &Node, f: &mut dyn FnMut(&str, &Node) -> Result<()>) -> Result<()> {
    if let NodeKind::Literal(l) = &name.kind {
        return f(&l.value, name);
    }
    if let NodeKind::Value(v) = &name.kind {
        if !v.is_array() && !v.is_object(false) {
            return at_param(name, f);
        }
    }
    let Some(elements) = pattern_elements(name) else {
        return Ok(());
    };
    for element in elements {
        let mut obj = element;
        if let NodeKind::Assign(assign) = &obj.kind {
            if assign.context.is_none() {
                obj = &assign.variable;
            }
        }
        match &obj.kind {
            NodeKind::Assign(assign) => {
                let target = match &assign.value.kind {
                    NodeKind::Assign(inner) => &inner.variable,
                    _ => &assign.value,
                };
                each_name(target.unwrap_ref(), f)?;
            }
            NodeKind::Splat(splat) => {
                let node = splat.name.unwrap_ref();
                let value = node.as_literal().map(|l| l.value.as_str()).unwrap_or_default();
                f(value, node)?;
            }
            NodeKind::Value(v) => {
                if v.is_array() || v.is_object(false) {
                    each_name(&v.base, f)?;
                } else if v.this {
                    at_param(obj, f)?;
                } else if let Some(l) = v.base.as_literal() {
                    f(&l.value, &v.base)?;
                }
            }
            NodeKind::Expansion => {}
            NodeKind::Literal(l) if l.kind == LiteralKind::Identifier => f(&l.value, obj)?,
            _ => return Err(obj.error("illegal parameter")),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::build::*;
    use super::*;

    fn names_of(param: &Param) -> Vec<String> {
        let mut names = Vec::new();
        param
            .each_name(&mut |name, _| {
                names.push(name.to_string());
                Ok(())
            })
            .unwrap();
        names
    }

    #[test]
    fn test_simple_and_this_params() {
        assert_eq!(names_of(&param("a")), vec!["a"]);
        assert_eq!(names_of(&this_param("name")), vec!["@name"]);
    }

    #[test]
    fn test_destructured_params() {
        let pattern = pattern_param(obj(vec![
            id("a"),
            obj_prop("b", id("c")),
            this_prop("d"),
        ]));
        assert_eq!(names_of(&pattern), vec!["a", "c", "@d"]);

        let nested = pattern_param(arr(vec![id("x"), splat(id("rest")), arr(vec![id("y")])]));
        assert_eq!(names_of(&nested), vec!["x", "rest", "y"]);
    }

    #[test]
    fn test_illegal_parameter() {
        let bad = pattern_param(arr(vec![call(id("f"), vec![])]));
        let err = bad.each_name(&mut |_, _| Ok(())).unwrap_err();
        assert_eq!(err.to_string(), "illegal parameter");
    }
}
