use crate::js::errors::ParseError;
use ast_grep_language::{LanguageExt, SupportLang};
use std::path::Path;
use tree_sitter::{Parser, Tree};

/// Grammar flavour a module is parsed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    JavaScript,
    #[default]
    TypeScript,
    Tsx,
}

impl Dialect {
    /// Pick the dialect from a file extension (`.js`, `.mts`, `.tsx`, ...).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        Self::from_extension(ext)
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "js" | "mjs" | "cjs" | "jsx" => Some(Dialect::JavaScript),
            "ts" | "mts" | "cts" => Some(Dialect::TypeScript),
            "tsx" => Some(Dialect::Tsx),
            _ => None,
        }
    }

    /// The ast-grep language backing this dialect.
    pub fn support_lang(self) -> SupportLang {
        match self {
            Dialect::JavaScript => SupportLang::JavaScript,
            Dialect::TypeScript => SupportLang::TypeScript,
            Dialect::Tsx => SupportLang::Tsx,
        }
    }

    pub fn is_typescript(self) -> bool {
        matches!(self, Dialect::TypeScript | Dialect::Tsx)
    }
}

/// Tree-sitter parser wrapper for JavaScript-family source code.
pub struct JsParser {
    parser: Parser,
    dialect: Dialect,
}

impl JsParser {
    pub fn new(dialect: Dialect) -> Result<Self, ParseError> {
        let mut parser = Parser::new();
        let ts_lang = dialect.support_lang().get_ts_language();
        parser
            .set_language(&ts_lang)
            .map_err(|_| ParseError::LanguageSet)?;

        Ok(Self { parser, dialect })
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Parse source code into a tree-sitter Tree.
    pub fn parse(&mut self, source: &str) -> Result<Tree, ParseError> {
        self.parser
            .parse(source, None)
            .ok_or(ParseError::ParseFailed)
    }

    /// Parse source code and return the tree along with the source.
    pub fn parse_with_source<'a>(
        &mut self,
        source: &'a str,
    ) -> Result<ParsedSource<'a>, ParseError> {
        let tree = self.parse(source)?;
        Ok(ParsedSource { source, tree })
    }
}

/// A parsed source file with its tree-sitter tree.
pub struct ParsedSource<'a> {
    pub source: &'a str,
    pub tree: Tree,
}

impl<'a> ParsedSource<'a> {
    pub fn root_node(&self) -> tree_sitter::Node<'_> {
        self.tree.root_node()
    }

    pub fn has_errors(&self) -> bool {
        has_error_nodes(self.tree.root_node())
    }

    pub fn error_nodes(&self) -> Vec<ErrorNode> {
        let mut errors = Vec::new();
        collect_error_nodes(self.tree.root_node(), &mut errors);
        errors
    }

    pub fn node_text(&self, node: tree_sitter::Node<'_>) -> &'a str {
        &self.source[node.byte_range()]
    }
}

/// Information about an ERROR or MISSING node in the parse tree.
#[derive(Debug, Clone)]
pub struct ErrorNode {
    pub byte_start: usize,
    pub byte_end: usize,
    pub start_point: tree_sitter::Point,
    pub end_point: tree_sitter::Point,
}

pub(crate) fn has_error_nodes(node: tree_sitter::Node<'_>) -> bool {
    if node.is_error() || node.is_missing() {
        return true;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if has_error_nodes(child) {
            return true;
        }
    }

    false
}

pub(crate) fn collect_error_nodes(node: tree_sitter::Node<'_>, errors: &mut Vec<ErrorNode>) {
    if node.is_error() || node.is_missing() {
        errors.push(ErrorNode {
            byte_start: node.start_byte(),
            byte_end: node.end_byte(),
            start_point: node.start_position(),
            end_point: node.end_position(),
        });
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_error_nodes(child, errors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_module() {
        let mut parser = JsParser::new(Dialect::TypeScript).unwrap();
        let source = "import { sequence } from '@sveltejs/kit/hooks';\nexport const handle = sequence();\n";
        let parsed = parser.parse_with_source(source).unwrap();

        assert!(!parsed.has_errors());
        assert_eq!(parsed.root_node().kind(), "program");
    }

    #[test]
    fn parse_invalid_module() {
        let mut parser = JsParser::new(Dialect::JavaScript).unwrap();
        let source = "export const = {";
        let parsed = parser.parse_with_source(source).unwrap();

        assert!(parsed.has_errors());
        assert!(!parsed.error_nodes().is_empty());
    }

    #[test]
    fn dialect_from_extension() {
        assert_eq!(Dialect::from_extension("mjs"), Some(Dialect::JavaScript));
        assert_eq!(Dialect::from_extension("ts"), Some(Dialect::TypeScript));
        assert_eq!(Dialect::from_extension("tsx"), Some(Dialect::Tsx));
        assert_eq!(Dialect::from_extension("svelte"), None);
        assert_eq!(
            Dialect::from_path(Path::new("vite.config.ts")),
            Some(Dialect::TypeScript)
        );
    }
}
