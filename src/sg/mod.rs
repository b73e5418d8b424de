//! ast-grep integration for pattern-based JavaScript/TypeScript matching.
//!
//! Recipes use ast-grep's metavariable syntax ($NAME, $$$ARGS, etc.) to
//! guard operations against files that already contain what they would add,
//! and the handler composer scans identifier references before renaming.

pub mod errors;
pub mod lang;
pub mod matcher;

pub use errors::AstGrepError;
pub use lang::{language, SupportLang};
pub use matcher::{PatternMatch, PatternMatcher};
