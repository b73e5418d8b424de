use crate::js::errors::ParseError;
use crate::js::parser::{collect_error_nodes, Dialect};
use crate::pool::with_parser;
use tree_sitter::Tree;

/// Parse `source`, failing on any ERROR or MISSING node.
pub(crate) fn parse_checked(source: &str, dialect: Dialect) -> Result<Tree, ParseError> {
    let tree = with_parser(dialect, |parser| parser.parse(source))??;
    let mut errors = Vec::new();
    collect_error_nodes(tree.root_node(), &mut errors);

    match errors.as_slice() {
        [] => Ok(tree),
        [only] => Err(ParseError::SyntaxError {
            byte_start: only.byte_start,
            byte_end: only.byte_end,
        }),
        many => Err(ParseError::MultipleSyntaxErrors { count: many.len() }),
    }
}

/// Validate that a module has no syntax errors.
///
/// Returns Ok(()) if the code parses without ERROR nodes.
pub fn validate_syntax(source: &str, dialect: Dialect) -> Result<(), ParseError> {
    parse_checked(source, dialect).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_valid_syntax() {
        let source = "export default defineConfig({ plugins: [sveltekit()] });\n";
        assert!(validate_syntax(source, Dialect::TypeScript).is_ok());
    }

    #[test]
    fn validate_invalid_syntax() {
        let result = validate_syntax("export default {", Dialect::JavaScript);
        assert!(result.is_err());
    }

    #[test]
    fn errors_are_counted() {
        assert!(matches!(
            validate_syntax("const = ;\nlet = ;\n", Dialect::JavaScript),
            Err(ParseError::MultipleSyntaxErrors { .. }) | Err(ParseError::SyntaxError { .. })
        ));
        assert!(parse_checked("#!/usr/bin/env node\nexport {};\n", Dialect::JavaScript).is_ok());
    }
}
