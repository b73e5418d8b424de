//! Tree-sitter integration for JavaScript and TypeScript modules.
//!
//! Parses source text with the grammars shipped by `ast-grep-language` and
//! lowers the concrete syntax tree into the owned, mutable [`crate::ast`]
//! model. Syntax validation of generated output lives here too.

pub mod errors;
pub mod lower;
pub mod parser;
pub mod validator;

pub use errors::ParseError;
pub use lower::{parse_expression, parse_program, parse_statements};
pub use parser::{Dialect, ErrorNode, JsParser, ParsedSource};
pub use validator::validate_syntax;
