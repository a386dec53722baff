//! Ranges, `while` loops and comprehensions

use super::{
    block, cache_text, compile_text, compile_to_fragments, format_number, ident, is_complex,
    is_complex_or_assignable, parse_number, raw, Context, Level, TAB,
};
use crate::ast::{
    is_literal_arguments, Assign, Block, For, If, Jump, Literal, LiteralKind, Node, NodeKind,
    Parens, Range, While,
};
use crate::error::{Error, LocationData, Result};
use crate::fragment::{Fragments, Origin};
use crate::helpers::{utility, Helper};

/// The endpoints of a range, each evaluated once
struct RangeBounds {
    from_c: String,
    from_var: String,
    to_c: String,
    to_var: String,
    step: Option<(String, String)>,
    from_num: Option<f64>,
    to_num: Option<f64>,
    step_num: Option<f64>,
    exclusive: bool,
}

impl RangeBounds {
    fn compile(
        range: Range,
        step: Option<Node>,
        o: &Context,
        is_complex: fn(&Node) -> bool,
        loc: Option<LocationData>,
    ) -> Result<Self> {
        let from = range
            .from
            .unwrap_or_else(|| Node::from(Literal::new(LiteralKind::Number, "0")));
        let Some(to) = range.to else {
            return Err(Error::compile_error("range is missing its end", loc));
        };
        let from_is_number = from.is_number();
        let to_is_number = to.is_number();
        let step_is_number = step.as_ref().is_some_and(Node::is_number);
        let (from_c, from_var) = cache_text(from, o, Level::List, is_complex)?;
        let (to_c, to_var) = cache_text(to, o, Level::List, is_complex)?;
        let step = match step {
            Some(step) => Some(cache_text(step, o, Level::List, is_complex)?),
            None => None,
        };
        Ok(Self {
            from_num: from_is_number.then(|| parse_number(&from_var)).flatten(),
            to_num: to_is_number.then(|| parse_number(&to_var)).flatten(),
            step_num: step
                .as_ref()
                .filter(|_| step_is_number)
                .and_then(|(_, var)| parse_number(var)),
            from_c,
            from_var,
            to_c,
            to_var,
            step,
            exclusive: range.exclusive,
        })
    }

    fn equals(&self) -> &'static str {
        if self.exclusive {
            ""
        } else {
            "="
        }
    }

    fn known(&self) -> Option<(f64, f64)> {
        self.from_num.zip(self.to_num)
    }

    /// `init; test; update` for a loop counting with `index`, assigning
    /// each value to `name` as well when it differs
    fn header(&self, index: &str, name: Option<&str>) -> String {
        let named = name.filter(|n| *n != index);
        let mut var_part = format!("{} = {}", index, self.from_c);
        if self.to_c != self.to_var {
            var_part.push_str(&format!(", {}", self.to_c));
        }
        let step_var = self.step.as_ref().map(|(step, var)| {
            if step != var {
                var_part.push_str(&format!(", {}", step));
            }
            var.clone()
        });
        let lt = format!("{} <{}", index, self.equals());
        let gt = format!("{} >{}", index, self.equals());

        let runtime_test = match &step_var {
            Some(var) => format!("{} > 0", var),
            None => format!("{} <= {}", self.from_var, self.to_var),
        };
        let cond_part = match (self.step_num, self.known()) {
            (Some(step), _) if step > 0.0 => format!("{} {}", lt, self.to_var),
            (Some(_), _) => format!("{} {}", gt, self.to_var),
            (None, Some((from, to))) if from <= to => format!("{} {}", lt, format_number(to)),
            (None, Some((_, to))) => format!("{} {}", gt, format_number(to)),
            (None, None) => format!(
                "{} ? {} {} : {} {}",
                runtime_test, lt, self.to_var, gt, self.to_var
            ),
        };
        let step_part = match (&step_var, self.known()) {
            (Some(var), _) => format!("{} += {}", index, var),
            (None, Some((from, to))) => match (named.is_some(), from <= to) {
                (true, true) => format!("++{}", index),
                (true, false) => format!("--{}", index),
                (false, true) => format!("{}++", index),
                (false, false) => format!("{}--", index),
            },
            (None, None) => {
                if named.is_some() {
                    format!("{} ? ++{} : --{}", runtime_test, index, index)
                } else {
                    format!("{} ? {}++ : {}--", runtime_test, index, index)
                }
            }
        };
        match named {
            Some(name) => format!(
                "{} = {}; {}; {} = {}",
                name, var_part, cond_part, name, step_part
            ),
            None => format!("{}; {}; {}", var_part, cond_part, step_part),
        }
    }
}

/// Largest integer an `f64` counts through without skipping
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// The numbers a range with literal endpoints contains
fn expand(from: f64, to: f64, exclusive: bool) -> Vec<f64> {
    let mut count = (to - from).abs() as usize + 1;
    if exclusive {
        count -= 1;
    }
    let step = if from <= to { 1.0 } else { -1.0 };
    (0..count).map(|k| from + step * k as f64).collect()
}

/// A range used as a value: a literal array for short numeric ranges,
/// otherwise a closure collecting every element
pub(crate) fn compile_range(
    range: Range,
    loc: Option<LocationData>,
    o: &Context,
) -> Result<Fragments> {
    let origin = Origin::new(loc, "Range");
    let uses_arguments = [&range.from, &range.to]
        .into_iter()
        .flatten()
        .any(|node| is_literal_arguments(node) || node.contains(&is_literal_arguments));
    let bounds = RangeBounds::compile(range, None, o, is_complex, loc)?;
    if let Some((from, to)) = bounds.known() {
        let exact = from.abs() < MAX_EXACT_INTEGER && to.abs() < MAX_EXACT_INTEGER;
        if exact && (from - to).abs() <= 20.0 {
            let values: Vec<String> = expand(from, to, bounds.exclusive)
                .into_iter()
                .map(format_number)
                .collect();
            return Ok(vec![origin.code(format!("[{}]", values.join(", ")))]);
        }
    }
    let idt = format!("{}{}", o.indent, TAB);
    let i = o.scope.free_variable("i", true, true);
    let result = o.scope.free_variable("results", false, true);
    let pre = format!("\n{}{} = [];", idt, result);
    let body = if bounds.known().is_some() {
        bounds.header(&i, None)
    } else {
        let mut vars = format!("{} = {}", i, bounds.from_c);
        if bounds.to_c != bounds.to_var {
            vars.push_str(&format!(", {}", bounds.to_c));
        }
        let cond = format!("{} <= {}", bounds.from_var, bounds.to_var);
        format!(
            "var {vars}; {cond} ? {i} <{eq} {to} : {i} >{eq} {to}; {cond} ? {i}++ : {i}--",
            vars = vars,
            cond = cond,
            i = i,
            eq = bounds.equals(),
            to = bounds.to_var
        )
    };
    let post = format!(
        "{{ {}.push({}); }}\n{}return {};\n{}",
        result, i, idt, result, o.indent
    );
    let args = if uses_arguments { ", arguments" } else { "" };
    Ok(vec![origin.code(format!(
        "(function() {{{}\n{}for ({}){}}}).apply(this{})",
        pre, idt, body, post, args
    ))])
}

/// Prepend a guard to a loop body; a long body skips the iteration instead
/// of nesting
fn guard_body(mut body: Block, guard: Node) -> Block {
    if body.expressions.len() > 1 {
        let test = Node::from(Parens { body: guard }).invert();
        let skip = Node::from(Literal::new(LiteralKind::Statement, "continue"));
        body.unshift(Node::from(If::new(test, skip)));
        body
    } else {
        Block::wrap(vec![Node::from(If::new(guard, Node::from(body)))])
    }
}

pub(crate) fn compile_while(
    node: While,
    loc: Option<LocationData>,
    o: &Context,
) -> Result<Fragments> {
    let origin = Origin::new(loc, "While");
    let tab = o.indent.clone();
    let o = o.indented();
    let mut set = String::new();
    let mut result = None;
    let mut body = node.body;
    let body_fragments = if body.is_empty() {
        Vec::new()
    } else {
        if node.returns {
            let name = o.scope.free_variable("results", false, true);
            body = block::make_return(body, Some(&name));
            set = format!("{}{} = [];\n", tab, name);
            result = Some(name);
        }
        if let Some(guard) = node.guard {
            body = guard_body(body, guard);
        }
        let mut fragments = vec![origin.code("\n")];
        fragments.extend(compile_to_fragments(Node::from(body), &o, Level::Top)?);
        fragments.push(origin.code(format!("\n{}", tab)));
        fragments
    };
    let mut answer = vec![origin.code(format!("{}{}while (", set, tab))];
    answer.extend(compile_to_fragments(node.condition, &o, Level::Paren)?);
    answer.push(origin.code(") {"));
    answer.extend(body_fragments);
    answer.push(origin.code("}"));
    if let Some(name) = result {
        answer.push(origin.code(format!("\n{}return {};", tab, name)));
    }
    Ok(answer)
}

fn check_for_shape(node: &For) -> Result<()> {
    if node.from {
        if let Some(index) = &node.index {
            return Err(index.error("cannot use index with for-from"));
        }
    }
    if node.own && !node.object {
        let kind = if node.from { "from" } else { "in" };
        return Err(node.source.error(format!("cannot use own with for-{}", kind)));
    }
    if let Some(index) = &node.index {
        if let Some(value) = index.as_value() {
            if value.is_array() || value.is_object(false) || !value.is_assignable() {
                return Err(index.error("index cannot be a pattern matching expression"));
            }
        }
    }
    if node.is_range() {
        if let Some(index) = &node.index {
            return Err(index.error("indexes do not apply to range loops"));
        }
        if let (true, Some(name)) = (node.is_pattern(), &node.name) {
            return Err(name.error("cannot pattern match over range loops"));
        }
    }
    Ok(())
}

pub(crate) fn compile_for(node: For, loc: Option<LocationData>, o: &Context) -> Result<Fragments> {
    check_for_shape(&node)?;
    let origin = Origin::new(loc, "For");
    let is_range = node.is_range();
    let is_pattern = node.is_pattern();
    let tab = o.indent.clone();
    let idt1 = format!("{}{}", tab, TAB);
    let scope = &o.scope;

    let mut body = Block::wrap(vec![Node::from(node.body)]);
    let mut returns = node.returns;
    if let Some(last) = body.expressions.last() {
        if matches!(last.jumps(Jump::empty()), Some(Node { kind: NodeKind::Return(_), .. })) {
            returns = false;
        }
    }

    let mut name = match &node.name {
        Some(name) if !is_pattern => Some(compile_text(name.clone(), o, Level::List)?),
        _ => None,
    };
    let index = match &node.index {
        Some(index) => Some(compile_text(index.clone(), o, Level::List)?),
        None => None,
    };
    if let Some(name) = &name {
        scope.find(name);
    }
    if let (Some(text), Some(index)) = (&index, &node.index) {
        if !matches!(index.kind, NodeKind::Value(_)) {
            scope.find(text);
        }
    }
    let rvar = returns.then(|| scope.free_variable("results", false, true));
    let ivar = if node.from {
        is_pattern.then(|| scope.free_variable("x", true, true))
    } else if node.object && index.is_some() {
        index.clone()
    } else {
        Some(scope.free_variable("i", true, true))
    };
    let named_counter = if is_range || node.from { name.clone() } else { None };
    let kvar = named_counter
        .or_else(|| index.clone())
        .or_else(|| ivar.clone())
        .unwrap_or_default();
    let ivar = ivar.unwrap_or_default();
    let kvar_assign = if kvar != ivar {
        format!("{} = ", kvar)
    } else {
        String::new()
    };

    let mut step_parts = None;
    let mut step_num = None;
    if let (Some(step), false) = (&node.step, is_range) {
        let is_number = step.is_number();
        let (step, step_var) = cache_text(step.clone(), o, Level::List, is_complex_or_assignable)?;
        if is_number {
            step_num = parse_number(&step_var);
        }
        step_parts = Some((step, step_var));
    }
    if is_pattern {
        name = Some(ivar.clone());
    }

    let mut def_part = String::new();
    let mut name_part = None;
    let mut guard_part = String::new();
    let mut svar = String::new();
    let mut for_part = String::new();

    if is_range {
        let NodeKind::Value(value) = node.source.kind else {
            return Err(Error::internal("range loop without a range"));
        };
        let NodeKind::Range(range) = value.base.kind else {
            return Err(Error::internal("range loop without a range"));
        };
        let bounds = RangeBounds::compile(*range, node.step, o, is_complex_or_assignable, loc)?;
        for_part = bounds.header(&ivar, name.as_deref());
    } else {
        let source_is_identifier = matches!(
            &node.source.unwrap_ref().kind,
            NodeKind::Literal(l) if l.kind == LiteralKind::Identifier
        );
        svar = compile_text(node.source, o, Level::List)?;
        if (name.is_some() || node.own) && !source_is_identifier {
            let reference = scope.free_variable("ref", false, true);
            def_part.push_str(&format!("{}{} = {};\n", tab, reference, svar));
            svar = reference;
        }
        if let (Some(name), false, false) = (&name, is_pattern, node.from) {
            name_part = Some(format!("{} = {}[{}]", name, svar, kvar));
        }
        if !node.object && !node.from {
            if let Some((step, step_var)) = &step_parts {
                if step != step_var {
                    def_part.push_str(&format!("{}{};\n", tab, step));
                }
            }
            let down = step_num.is_some_and(|n| n < 0.0);
            let lvar = if node.step.is_some() && step_num.is_some() && down {
                String::new()
            } else {
                scope.free_variable("len", false, true)
            };
            let mut declare = format!("{}{} = 0, {} = {}.length", kvar_assign, ivar, lvar, svar);
            let declare_down = format!("{}{} = {}.length - 1", kvar_assign, ivar, svar);
            let mut compare = format!("{} < {}", ivar, lvar);
            let compare_down = format!("{} >= 0", ivar);
            let increment = match &step_parts {
                Some((_, step_var)) => {
                    match step_num {
                        Some(_) if down => {
                            compare = compare_down;
                            declare = declare_down;
                        }
                        Some(_) => {}
                        None => {
                            compare = format!("{} > 0 ? {} : {}", step_var, compare, compare_down);
                            declare =
                                format!("({} > 0 ? ({}) : {})", step_var, declare, declare_down);
                        }
                    }
                    format!("{} += {}", ivar, step_var)
                }
                None if kvar != ivar => format!("++{}", ivar),
                None => format!("{}++", ivar),
            };
            for_part = format!("{}; {}; {}{}", declare, compare, kvar_assign, increment);
        }
    }

    let mut result_part = String::new();
    let mut return_result = String::new();
    if let Some(rvar) = &rvar {
        result_part = format!("{}{} = [];\n", tab, rvar);
        return_result = format!("\n{}return {};", tab, rvar);
        body = block::make_return(body, Some(rvar));
    }
    if let Some(guard) = node.guard {
        body = guard_body(body, guard);
    }
    if let (true, Some(pattern)) = (is_pattern, node.name) {
        let value = if node.from {
            ident(&kvar)
        } else {
            raw(&format!("{}[{}]", svar, kvar))
        };
        body.unshift(Node::from(Assign::new(pattern, value)));
    }
    let var_part = name_part
        .map(|part| format!("\n{}{};", idt1, part))
        .unwrap_or_default();
    if node.object {
        for_part = format!("{} in {}", kvar, svar);
        if node.own {
            guard_part = format!(
                "\n{}if (!{}.call({}, {})) continue;",
                idt1,
                utility(Helper::HasProp, scope),
                svar,
                kvar
            );
        }
    } else if node.from {
        for_part = format!("{} of {}", kvar, svar);
    }

    let mut body_o = o.at(Level::Top);
    body_o.indent = idt1;
    let mut body_fragments = compile_to_fragments(Node::from(body), &body_o, Level::Top)?;
    if !body_fragments.is_empty() {
        body_fragments.insert(0, origin.code("\n"));
        body_fragments.push(origin.code("\n"));
    }

    let mut answer = vec![origin.code(format!("{}{}{}for (", def_part, result_part, tab))];
    answer.push(origin.code(for_part));
    answer.push(origin.code(format!(") {{{}{}", guard_part, var_part)));
    answer.extend(body_fragments);
    answer.push(origin.code(format!("{}}}{}", tab, return_result)));
    Ok(answer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::*;
    use crate::ast::build::ident;
    use crate::options::CompileOptions;
    use crate::scope::Scope;
    use pretty_assertions::assert_eq;

    fn context() -> Context {
        Context::new(
            Scope::root(Vec::<String>::new()),
            &CompileOptions::default().with_bare(true),
        )
    }

    fn top(node: Node, o: &Context) -> String {
        compile_text(node, o, Level::Top).unwrap()
    }

    #[test]
    fn test_short_range_is_a_literal_array() {
        let o = context();
        assert_eq!(compile_text(range(num("1"), num("3"), false), &o, Level::List).unwrap(), "[1, 2, 3]");
        assert_eq!(compile_text(range(num("3"), num("1"), true), &o, Level::List).unwrap(), "[3, 2]");
    }

    #[test]
    fn test_expand_counts_elements() {
        assert_eq!(expand(1.0, 3.0, false), vec![1.0, 2.0, 3.0]);
        assert_eq!(expand(3.0, 1.0, true), vec![3.0, 2.0]);
        assert_eq!(expand(1.5, 3.5, false), vec![1.5, 2.5, 3.5]);
        assert_eq!(expand(2.0, 2.0, true), Vec::<f64>::new());
        assert_eq!(expand(1e17, 1e17 + 16.0, false).len(), 17);
    }

    #[test]
    fn test_range_beyond_exact_integers_collects() {
        let o = context();
        let node = range(num("100000000000000000"), num("100000000000000010"), false);
        let out = compile_text(node, &o, Level::List).unwrap();
        assert!(out.starts_with("(function() {\n  results = [];\n  for (i = "));
        assert!(out.ends_with("}).apply(this)"));
    }

    #[test]
    fn test_long_range_collects() {
        let o = context();
        assert_eq!(
            compile_text(range(num("1"), num("30"), false), &o, Level::List).unwrap(),
            "(function() {\n  results = [];\n  for (i = 1; i <= 30; i++){ results.push(i); }\n  return results;\n}).apply(this)"
        );
    }

    #[test]
    fn test_while_loop() {
        let o = context();
        assert_eq!(
            top(while_loop(id("a"), vec![call(id("f"), vec![])]), &o),
            "while (a) {\n  f();\n}"
        );
        assert_eq!(top(forever(vec![]), &o), "while (true) {}");
    }

    #[test]
    fn test_array_loop() {
        let o = context();
        o.scope.find("list");
        let node = for_in(Some(ident("x")), None, id("list"), vec![call(id("f"), vec![id("x")])]);
        assert_eq!(
            top(Node::from(node), &o),
            "for (i = 0, len = list.length; i < len; i++) {\n  x = list[i];\n  f(x);\n}"
        );
    }

    #[test]
    fn test_range_loop_with_name() {
        let o = context();
        let node = for_in(Some(ident("x")), None, range(num("1"), num("5"), false), vec![]);
        assert_eq!(top(Node::from(node), &o), "for (x = i = 1; i <= 5; x = ++i) {}");
    }

    #[test]
    fn test_range_loop_runtime_bounds() {
        let o = context();
        o.scope.find("n");
        let node = for_in(Some(ident("i")), None, range(num("0"), id("n"), true), vec![]);
        assert_eq!(
            top(Node::from(node), &o),
            "for (i = j = 0, ref = n; 0 <= ref ? j < ref : j > ref; i = 0 <= ref ? ++j : --j) {}"
        );
    }

    #[test]
    fn test_descending_array_loop() {
        let o = context();
        o.scope.find("list");
        let node = for_in(Some(ident("x")), None, id("list"), vec![call(id("f"), vec![id("x")])])
            .with_step(unary("-", num("1")));
        assert_eq!(
            top(Node::from(node), &o),
            "for (i = list.length - 1; i >= 0; i += -1) {\n  x = list[i];\n  f(x);\n}"
        );
    }

    #[test]
    fn test_own_object_loop() {
        let o = context();
        o.scope.find("obj");
        let node = for_of(ident("k"), Some(ident("v")), id("obj"), vec![call(id("f"), vec![id("v")])])
            .owned();
        assert_eq!(
            top(Node::from(node), &o),
            "for (k in obj) {\n  if (!__hasProp.call(obj, k)) continue;\n  v = obj[k];\n  f(v);\n}"
        );
    }

    #[test]
    fn test_for_from() {
        let o = context();
        o.scope.find("it");
        let node = for_from(ident("x"), id("it"), vec![call(id("f"), vec![id("x")])]);
        assert_eq!(top(Node::from(node), &o), "for (x of it) {\n  f(x);\n}");
    }

    #[test]
    fn test_guard_on_long_body_skips() {
        let o = context();
        o.scope.find("list");
        let node = for_in(
            Some(ident("x")),
            None,
            id("list"),
            vec![call(id("f"), vec![]), call(id("g"), vec![])],
        )
        .with_guard(id("x"));
        assert_eq!(
            top(Node::from(node), &o),
            "for (i = 0, len = list.length; i < len; i++) {\n  x = list[i];\n  \
             if (!x) {\n    continue;\n  }\n  f();\n  g();\n}"
        );
    }

    #[test]
    fn test_loop_shape_errors() {
        let o = context();
        let node = for_in(Some(ident("x")), Some(ident("i")), range(num("1"), num("2"), false), vec![]);
        let err = compile_to_fragments(Node::from(node), &o, Level::Top).unwrap_err();
        assert_eq!(err.to_string(), "indexes do not apply to range loops");

        let node = for_in(Some(ident("x")), None, id("list"), vec![]).owned();
        let err = compile_to_fragments(Node::from(node), &o, Level::Top).unwrap_err();
        assert_eq!(err.to_string(), "cannot use own with for-in");

        let node = for_from(ident("x"), id("it"), vec![]);
        let mut node = node;
        node.index = Some(ident("i"));
        let err = compile_to_fragments(Node::from(node), &o, Level::Top).unwrap_err();
        assert_eq!(err.to_string(), "cannot use index with for-from");
    }

    #[test]
    fn test_comprehension_collects_results() {
        let o = context();
        o.scope.find("list");
        let node = for_in(Some(ident("x")), None, id("list"), vec![id("x")]);
        let value = compile_text(Node::from(node), &o, Level::List).unwrap();
        assert_eq!(
            value,
            "(function() {\n  var results, i, len;\n  results = [];\n  \
             for (i = 0, len = list.length; i < len; i++) {\n    x = list[i];\n    \
             results.push(x);\n  }\n  return results;\n})()"
        );
    }
}
