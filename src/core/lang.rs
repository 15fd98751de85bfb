//! Language hook for the TypeScript grammar.

use tree_sitter::Language;

/// Return the TypeScript language for tree-sitter.
#[inline]
pub fn language() -> Language {
    let lang: Language = tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into();
    lang
}
