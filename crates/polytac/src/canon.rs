//! Canonical strings shared by every language adapter.
//!
//! The IR normalizes null-like and boolean literals to a single spelling so
//! downstream passes never match on per-language tokens. Label prefixes and
//! the function/class reference templates are a stable external surface:
//! the CFG builder and VM match on them to tie call sites to bodies.

/// Canonical null for `None`, `null`, `nil`, `undefined`, `nullptr`.
pub const NONE_LITERAL: &str = "None";
/// Canonical true for `true` / `True`.
pub const TRUE_LITERAL: &str = "True";
/// Canonical false for `false` / `False`.
pub const FALSE_LITERAL: &str = "False";

/// Implicit return value for unit-typed languages (Rust, Scala).
pub const UNIT_RETURN: &str = "()";
/// Implicit return value for C and C++.
pub const ZERO_RETURN: &str = "0";

/// Label of the first instruction of every lowering.
pub const ENTRY_LABEL: &str = "entry";

/// Prefix for user-written goto labels, isolating them from engine labels.
pub const USER_LABEL_PREFIX: &str = "user_";

/// Reference constant tying a function name to its entry label.
#[must_use]
pub fn function_ref(name: &str, entry_label: &str) -> String {
    format!("<function:{name}@{entry_label}>")
}

/// Reference constant tying a class name to its entry label.
#[must_use]
pub fn class_ref(name: &str, entry_label: &str) -> String {
    format!("<class:{name}@{entry_label}>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_templates() {
        assert_eq!(function_ref("add", "func_add_2"), "<function:add@func_add_2>");
        assert_eq!(class_ref("Foo", "class_Foo_0"), "<class:Foo@class_Foo_0>");
    }
}
