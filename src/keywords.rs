//! Reserved words and identifier checks

use unicode_xid::UnicodeXID;

/// JavaScript keywords that can never be bound
pub const JS_KEYWORDS: &[&str] = &[
    "true", "false", "null", "this", "new", "delete", "typeof", "in", "instanceof", "return",
    "throw", "break", "continue", "debugger", "yield", "if", "else", "switch", "for", "while",
    "do", "try", "catch", "finally", "class", "extends", "super", "import", "export", "default",
];

/// Words the source language keeps for itself
pub const COFFEE_KEYWORDS: &[&str] = &[
    "undefined", "Infinity", "NaN", "then", "unless", "until", "loop", "of", "by", "when",
];

/// Words JavaScript reserves for future use
pub const RESERVED: &[&str] = &[
    "case", "function", "var", "void", "with", "const", "let", "enum", "native", "implements",
    "interface", "package", "private", "protected", "public", "static",
];

/// Names strict mode refuses as binding targets
pub const STRICT_PROSCRIBED: &[&str] = &["arguments", "eval"];

/// True for words that cannot appear as a bare property name or binding
pub fn is_js_forbidden(name: &str) -> bool {
    JS_KEYWORDS.contains(&name) || RESERVED.contains(&name) || STRICT_PROSCRIBED.contains(&name)
}

/// Why `name` cannot be assigned, or `None` if it can
pub fn unassignable_reason(name: &str) -> Option<String> {
    if JS_KEYWORDS.contains(&name) || COFFEE_KEYWORDS.contains(&name) {
        Some(format!("keyword '{}' can't be assigned", name))
    } else if STRICT_PROSCRIBED.contains(&name) {
        Some(format!("'{}' can't be assigned", name))
    } else if RESERVED.contains(&name) {
        Some(format!("reserved word '{}' can't be assigned", name))
    } else {
        None
    }
}

/// Check whether `name` is a valid JavaScript identifier
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '$' || c == '_' || UnicodeXID::is_xid_start(c) => {}
        _ => return false,
    }
    chars.all(|c| c == '$' || UnicodeXID::is_xid_continue(c))
}
