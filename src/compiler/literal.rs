//! Leaf nodes

use super::{Context, Level};
use crate::ast::{Literal, LiteralKind};
use crate::error::{LocationData, Result};
use crate::fragment::{Fragments, Origin};

pub(crate) fn compile_literal(
    literal: Literal,
    loc: Option<LocationData>,
    o: &Context,
) -> Result<Fragments> {
    let origin = Origin::new(loc, "Literal");
    let code = match literal.kind {
        LiteralKind::Infinity => "2e308".to_string(),
        LiteralKind::NaN => {
            let code = vec![origin.code("0/0")];
            return Ok(if o.level >= Level::Op {
                origin.wrap_in_braces(code)
            } else {
                code
            });
        }
        LiteralKind::Undefined => {
            if o.level >= Level::Access { "(void 0)" } else { "void 0" }.to_string()
        }
        LiteralKind::This => match o.scope.method() {
            Some(method) if method.bound => method
                .context
                .clone()
                .unwrap_or_else(|| literal.value.clone()),
            _ => literal.value,
        },
        LiteralKind::Statement => format!("{}{};", o.indent, literal.value),
        _ => literal.value,
    };
    Ok(vec![origin.code(code)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::CompileOptions;
    use crate::scope::{MethodInfo, Scope};
    use crate::fragment::fragments_to_text;

    fn context() -> Context {
        Context::new(Scope::root(Vec::<String>::new()), &CompileOptions::default())
    }

    fn text(literal: Literal, o: &Context) -> String {
        fragments_to_text(&compile_literal(literal, None, o).unwrap())
    }

    #[test]
    fn test_special_numbers() {
        let o = context();
        assert_eq!(text(Literal::new(LiteralKind::Infinity, "Infinity"), &o), "2e308");
        assert_eq!(text(Literal::new(LiteralKind::NaN, "NaN"), &o.at(Level::Op)), "(0/0)");
        assert_eq!(text(Literal::undefined(), &o), "void 0");
        assert_eq!(text(Literal::undefined(), &o.at(Level::Access)), "(void 0)");
    }

    #[test]
    fn test_this_in_bound_function() {
        let mut o = context();
        let method = MethodInfo {
            bound: true,
            context: Some("_this".to_string()),
            ..MethodInfo::default()
        };
        o.scope = Scope::child(&o.scope, method);
        assert_eq!(text(Literal::this(), &o), "_this");
    }
}
