//! Child enumeration and tree traversal

use super::{Block, LiteralKind, Node, NodeKind, Property};

/// A direct child of a node
pub enum Child<'a> {
    Node(&'a Node),
    Block(&'a Block),
}

pub(crate) enum ChildMut<'a> {
    Node(&'a mut Node),
    Block(&'a mut Block),
}

fn property_children<'a>(properties: &'a [Property], out: &mut Vec<Child<'a>>) {
    for property in properties {
        match property {
            Property::Access(_) => {}
            Property::Index(index) => out.push(Child::Node(&index.index)),
            Property::Slice(slice) => {
                out.extend(slice.range.from.iter().map(Child::Node));
                out.extend(slice.range.to.iter().map(Child::Node));
            }
        }
    }
}

fn property_children_mut<'a>(properties: &'a mut [Property], out: &mut Vec<ChildMut<'a>>) {
    for property in properties {
        match property {
            Property::Access(_) => {}
            Property::Index(index) => out.push(ChildMut::Node(&mut index.index)),
            Property::Slice(slice) => {
                out.extend(slice.range.from.iter_mut().map(ChildMut::Node));
                out.extend(slice.range.to.iter_mut().map(ChildMut::Node));
            }
        }
    }
}

impl Node {
    /// Direct children in source order
    pub fn children(&self) -> Vec<Child<'_>> {
        let mut out = Vec::new();
        match &self.kind {
            NodeKind::Literal(_) | NodeKind::Expansion | NodeKind::Comment(_) => {}
            NodeKind::Value(v) => {
                out.push(Child::Node(&v.base));
                property_children(&v.properties, &mut out);
            }
            NodeKind::Call(c) => {
                out.push(Child::Node(&c.variable));
                out.extend(c.args.iter().map(Child::Node));
            }
            NodeKind::SuperCall(s) => out.extend(s.args.iter().flatten().map(Child::Node)),
            NodeKind::Obj(o) => out.extend(o.properties.iter().map(Child::Node)),
            NodeKind::Arr(a) => out.extend(a.objects.iter().map(Child::Node)),
            NodeKind::Range(r) => {
                out.extend(r.from.iter().map(Child::Node));
                out.extend(r.to.iter().map(Child::Node));
            }
            NodeKind::Splat(s) => out.push(Child::Node(&s.name)),
            NodeKind::Assign(a) => {
                out.push(Child::Node(&a.variable));
                out.push(Child::Node(&a.value));
            }
            NodeKind::Code(c) => {
                for param in &c.params {
                    out.push(Child::Node(&param.name));
                    out.extend(param.value.iter().map(Child::Node));
                }
                out.push(Child::Block(&c.body));
            }
            NodeKind::Class(c) => {
                out.extend(c.variable.iter().map(Child::Node));
                out.extend(c.parent.iter().map(Child::Node));
                out.push(Child::Block(&c.body));
            }
            NodeKind::Extends(e) => {
                out.push(Child::Node(&e.child));
                out.push(Child::Node(&e.parent));
            }
            NodeKind::Op(op) => {
                out.push(Child::Node(&op.first));
                out.extend(op.second.iter().map(Child::Node));
            }
            NodeKind::In(i) => {
                out.push(Child::Node(&i.object));
                out.push(Child::Node(&i.array));
            }
            NodeKind::Existence(e) => out.push(Child::Node(&e.expression)),
            NodeKind::Parens(p) => out.push(Child::Node(&p.body)),
            NodeKind::Block(b) => out.extend(b.expressions.iter().map(Child::Node)),
            NodeKind::Return(r) => out.extend(r.expression.iter().map(Child::Node)),
            NodeKind::Throw(t) => out.push(Child::Node(&t.expression)),
            NodeKind::If(i) => {
                out.push(Child::Node(&i.condition));
                out.push(Child::Node(&i.body));
                out.extend(i.else_body.iter().map(Child::Node));
            }
            NodeKind::Switch(s) => {
                out.extend(s.subject.iter().map(Child::Node));
                for case in &s.cases {
                    out.extend(case.conditions.iter().map(Child::Node));
                    out.push(Child::Block(&case.block));
                }
                out.extend(s.otherwise.iter().map(Child::Block));
            }
            NodeKind::Try(t) => {
                out.push(Child::Block(&t.attempt));
                out.extend(t.error_variable.iter().map(Child::Node));
                out.extend(t.recovery.iter().map(Child::Block));
                out.extend(t.ensure.iter().map(Child::Block));
            }
            NodeKind::While(w) => {
                out.push(Child::Node(&w.condition));
                out.extend(w.guard.iter().map(Child::Node));
                out.push(Child::Block(&w.body));
            }
            NodeKind::For(f) => {
                out.push(Child::Block(&f.body));
                out.push(Child::Node(&f.source));
                out.extend(f.guard.iter().map(Child::Node));
                out.extend(f.step.iter().map(Child::Node));
            }
        }
        out
    }

    pub(crate) fn children_mut(&mut self) -> Vec<ChildMut<'_>> {
        let mut out = Vec::new();
        match &mut self.kind {
            NodeKind::Literal(_) | NodeKind::Expansion | NodeKind::Comment(_) => {}
            NodeKind::Value(v) => {
                out.push(ChildMut::Node(&mut v.base));
                property_children_mut(&mut v.properties, &mut out);
            }
            NodeKind::Call(c) => {
                out.push(ChildMut::Node(&mut c.variable));
                out.extend(c.args.iter_mut().map(ChildMut::Node));
            }
            NodeKind::SuperCall(s) => out.extend(s.args.iter_mut().flatten().map(ChildMut::Node)),
            NodeKind::Obj(o) => out.extend(o.properties.iter_mut().map(ChildMut::Node)),
            NodeKind::Arr(a) => out.extend(a.objects.iter_mut().map(ChildMut::Node)),
            NodeKind::Range(r) => {
                out.extend(r.from.iter_mut().map(ChildMut::Node));
                out.extend(r.to.iter_mut().map(ChildMut::Node));
            }
            NodeKind::Splat(s) => out.push(ChildMut::Node(&mut s.name)),
            NodeKind::Assign(a) => {
                out.push(ChildMut::Node(&mut a.variable));
                out.push(ChildMut::Node(&mut a.value));
            }
            NodeKind::Code(c) => {
                for param in c.params.iter_mut() {
                    out.push(ChildMut::Node(&mut param.name));
                    out.extend(param.value.iter_mut().map(ChildMut::Node));
                }
                out.push(ChildMut::Block(&mut c.body));
            }
            NodeKind::Class(c) => {
                out.extend(c.variable.iter_mut().map(ChildMut::Node));
                out.extend(c.parent.iter_mut().map(ChildMut::Node));
                out.push(ChildMut::Block(&mut c.body));
            }
            NodeKind::Extends(e) => {
                out.push(ChildMut::Node(&mut e.child));
                out.push(ChildMut::Node(&mut e.parent));
            }
            NodeKind::Op(op) => {
                out.push(ChildMut::Node(&mut op.first));
                out.extend(op.second.iter_mut().map(ChildMut::Node));
            }
            NodeKind::In(i) => {
                out.push(ChildMut::Node(&mut i.object));
                out.push(ChildMut::Node(&mut i.array));
            }
            NodeKind::Existence(e) => out.push(ChildMut::Node(&mut e.expression)),
            NodeKind::Parens(p) => out.push(ChildMut::Node(&mut p.body)),
            NodeKind::Block(b) => out.extend(b.expressions.iter_mut().map(ChildMut::Node)),
            NodeKind::Return(r) => out.extend(r.expression.iter_mut().map(ChildMut::Node)),
            NodeKind::Throw(t) => out.push(ChildMut::Node(&mut t.expression)),
            NodeKind::If(i) => {
                out.push(ChildMut::Node(&mut i.condition));
                out.push(ChildMut::Node(&mut i.body));
                out.extend(i.else_body.iter_mut().map(ChildMut::Node));
            }
            NodeKind::Switch(s) => {
                out.extend(s.subject.iter_mut().map(ChildMut::Node));
                for case in s.cases.iter_mut() {
                    out.extend(case.conditions.iter_mut().map(ChildMut::Node));
                    out.push(ChildMut::Block(&mut case.block));
                }
                out.extend(s.otherwise.iter_mut().map(ChildMut::Block));
            }
            NodeKind::Try(t) => {
                out.push(ChildMut::Block(&mut t.attempt));
                out.extend(t.error_variable.iter_mut().map(ChildMut::Node));
                out.extend(t.recovery.iter_mut().map(ChildMut::Block));
                out.extend(t.ensure.iter_mut().map(ChildMut::Block));
            }
            NodeKind::While(w) => {
                out.push(ChildMut::Node(&mut w.condition));
                out.extend(w.guard.iter_mut().map(ChildMut::Node));
                out.push(ChildMut::Block(&mut w.body));
            }
            NodeKind::For(f) => {
                out.push(ChildMut::Block(&mut f.body));
                out.push(ChildMut::Node(&mut f.source));
                out.extend(f.guard.iter_mut().map(ChildMut::Node));
                out.extend(f.step.iter_mut().map(ChildMut::Node));
            }
        }
        out
    }

    /// Visit descendants depth-first; `f` returns false to skip a subtree.
    /// Function bodies are entered only with `cross_scope`.
    pub fn traverse_children(&self, cross_scope: bool, f: &mut dyn FnMut(&Node) -> bool) {
        if !cross_scope && matches!(self.kind, NodeKind::Code(_)) {
            return;
        }
        for child in self.children() {
            match child {
                Child::Node(node) => {
                    if f(node) {
                        node.traverse_children(cross_scope, f);
                    }
                }
                Child::Block(block) => {
                    for node in &block.expressions {
                        if f(node) {
                            node.traverse_children(cross_scope, f);
                        }
                    }
                }
            }
        }
    }

    /// Mutable variant of [`Node::traverse_children`]
    pub(crate) fn traverse_children_mut(
        &mut self,
        cross_scope: bool,
        f: &mut dyn FnMut(&mut Node) -> bool,
    ) {
        if !cross_scope && matches!(self.kind, NodeKind::Code(_)) {
            return;
        }
        for child in self.children_mut() {
            match child {
                ChildMut::Node(node) => {
                    if f(node) {
                        node.traverse_children_mut(cross_scope, f);
                    }
                }
                ChildMut::Block(block) => {
                    for node in block.expressions.iter_mut() {
                        if f(node) {
                            node.traverse_children_mut(cross_scope, f);
                        }
                    }
                }
            }
        }
    }

    /// First descendant in this function's scope matching `pred`
    pub fn find_child(&self, pred: &dyn Fn(&Node) -> bool) -> Option<&Node> {
        for child in self.children() {
            let nodes: Vec<&Node> = match child {
                Child::Node(node) => vec![node],
                Child::Block(block) => block.expressions.iter().collect(),
            };
            for node in nodes {
                if pred(node) {
                    return Some(node);
                }
                if matches!(node.kind, NodeKind::Code(_)) {
                    continue;
                }
                if let Some(found) = node.find_child(pred) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Does any descendant in this function's scope match `pred`?
    pub fn contains(&self, pred: &dyn Fn(&Node) -> bool) -> bool {
        self.find_child(pred).is_some()
    }
}

/// The `arguments` pseudo-variable
pub fn is_literal_arguments(node: &Node) -> bool {
    matches!(&node.kind, NodeKind::Literal(l) if l.kind == LiteralKind::Identifier && l.value == "arguments")
}

/// Anything that reads the enclosing `this`
pub fn is_literal_this(node: &Node) -> bool {
    match &node.kind {
        NodeKind::Literal(l) => l.kind == LiteralKind::This,
        NodeKind::Code(code) => code.bound,
        NodeKind::SuperCall(_) => true,
        _ => false,
    }
}

impl Block {
    /// First expression, or descendant in this scope, matching `pred`
    pub fn find_child(&self, pred: &dyn Fn(&Node) -> bool) -> Option<&Node> {
        for node in &self.expressions {
            if pred(node) {
                return Some(node);
            }
            if matches!(node.kind, NodeKind::Code(_)) {
                continue;
            }
            if let Some(found) = node.find_child(pred) {
                return Some(found);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::super::build::*;
    use super::*;

    #[test]
    fn test_contains_stops_at_functions() {
        let node = call(id("f"), vec![func(vec![], vec![id("arguments")])]);
        assert!(!node.contains(&is_literal_arguments));
        let direct = call(id("f"), vec![id("arguments")]);
        assert!(direct.contains(&is_literal_arguments));
    }

    #[test]
    fn test_bound_function_reads_this() {
        let node = parens(bound_func(vec![], vec![num("1")]));
        assert!(node.contains(&is_literal_this));
    }

    #[test]
    fn test_traverse_counts_nodes() {
        let node = op("+", id("a"), call(id("f"), vec![num("1")]));
        let mut count = 0;
        node.traverse_children(false, &mut |_| {
            count += 1;
            true
        });
        // a, Identifier(a), Call, f, Identifier(f), 1, Number(1)
        assert_eq!(count, 7);
    }
}
