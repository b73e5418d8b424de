use crate::cache;
use crate::js::Dialect;
use crate::sg::errors::AstGrepError;
use crate::sg::lang::language;
use ast_grep_core::tree_sitter::StrDoc;
use ast_grep_core::{AstGrep, NodeMatch};
use ast_grep_language::SupportLang;
use std::collections::HashMap;

/// Node kinds that read or bind a plain identifier.
const IDENTIFIER_KINDS: &[&str] = &[
    "identifier",
    "shorthand_property_identifier",
    "shorthand_property_identifier_pattern",
];

/// A match from an ast-grep pattern with captured metavariables.
#[derive(Debug, Clone)]
pub struct PatternMatch {
    /// Byte range of the entire match
    pub byte_start: usize,
    pub byte_end: usize,
    /// The matched text
    pub text: String,
    /// Captured metavariables: name -> text
    pub captures: HashMap<String, String>,
}

/// Pattern matcher using ast-grep's metavariable syntax.
///
/// # Metavariable Syntax
///
/// - `$NAME` - Matches a single node and captures it
/// - `$$$NAME` - Matches zero or more nodes (variadic)
/// - `$_` - Matches any single node (anonymous)
///
/// # Example Patterns
///
/// ```text
/// defineConfig($CONFIG)            // Match a wrapped config object
/// sequence($$$HANDLERS)            // Match a handler composition
/// import $NAME from '$SOURCE'      // Match a default import
/// ```
pub struct PatternMatcher {
    source: String,
    lang: SupportLang,
    sg: AstGrep<StrDoc<SupportLang>>,
}

impl PatternMatcher {
    /// Create a new pattern matcher for the given source code.
    pub fn new(source: &str, dialect: Dialect) -> Self {
        let lang = language(dialect);
        let sg = AstGrep::new(source, lang);
        Self {
            source: source.to_string(),
            lang,
            sg,
        }
    }

    /// Find all matches for a pattern.
    pub fn find_all(&self, pattern: &str) -> Result<Vec<PatternMatch>, AstGrepError> {
        if pattern.trim().is_empty() {
            return Err(AstGrepError::InvalidPattern {
                message: "empty pattern".to_string(),
            });
        }
        let pat = cache::get_or_compile_pattern(pattern, self.lang);
        let root = self.sg.root();
        let results = root
            .find_all(&pat)
            .map(|m| self.node_match_to_pattern_match(m))
            .collect();

        Ok(results)
    }

    /// Byte spans of every identifier node spelled `name`.
    ///
    /// Property names (`event.handle`, `{ handle: x }`) are not identifiers
    /// and are not counted; shorthand properties are.
    pub fn identifier_spans(&self, name: &str) -> Vec<(usize, usize)> {
        self.sg
            .root()
            .dfs()
            .filter(|node| IDENTIFIER_KINDS.iter().any(|kind| node.kind() == *kind))
            .filter(|node| node.text() == name)
            .map(|node| {
                let range = node.range();
                (range.start, range.end)
            })
            .collect()
    }

    fn node_match_to_pattern_match(&self, m: NodeMatch<StrDoc<SupportLang>>) -> PatternMatch {
        let range = m.get_node().range();
        let text = self.source[range.start..range.end].to_string();

        let env = m.get_env().clone();
        let captures: HashMap<String, String> = env.into();

        PatternMatch {
            byte_start: range.start,
            byte_end: range.end,
            text,
            captures,
        }
    }
}
