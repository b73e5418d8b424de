//! JavaScript-family language support via ast-grep-language.
//!
//! We use the built-in `SupportLang` grammars instead of maintaining our own
//! Language implementation; the dialect of a file picks one of them.

use crate::js::Dialect;
pub use ast_grep_language::SupportLang;

/// Get the ast-grep language for a dialect.
pub fn language(dialect: Dialect) -> SupportLang {
    dialect.support_lang()
}
