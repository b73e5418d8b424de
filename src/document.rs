//! Parsed script documents.

use crate::ast::{print, Program};
use crate::js::lower::parse_with_style;
use crate::js::{validate_syntax, Dialect, ParseError};
use crate::style::Style;

/// A JavaScript/TypeScript module held as an owned [`Program`] together with
/// the text it was parsed from and the layout inferred from that text.
#[derive(Debug, Clone)]
pub struct JsDocument {
    source: String,
    dialect: Dialect,
    style: Style,
    program: Program,
}

impl JsDocument {
    /// Parse `source`. Modules with syntax errors are rejected.
    pub fn parse(source: impl Into<String>, dialect: Dialect) -> Result<Self, ParseError> {
        let source = source.into();
        let (program, style) = parse_with_style(&source, dialect)?;
        Ok(Self {
            source,
            dialect,
            style,
            program,
        })
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn style(&self) -> &Style {
        &self.style
    }

    /// The text the document was parsed from.
    pub fn original(&self) -> &str {
        &self.source
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn program_mut(&mut self) -> &mut Program {
        &mut self.program
    }

    /// Print the current program; untouched regions come back verbatim.
    pub fn serialize(&self) -> String {
        print::program(&self.program, &self.style)
    }

    /// Print and re-parse the program, rejecting output that no longer parses.
    pub fn serialize_checked(&self) -> Result<String, ParseError> {
        let output = self.serialize();
        validate_syntax(&output, self.dialect)?;
        Ok(output)
    }

    /// Whether the serialized program differs from the original text.
    pub fn changed(&self) -> bool {
        self.serialize() != self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::js::parse_expression;
    use crate::ops::handlers::{register_handler, Composition, HandlerOutcome};
    use crate::ops::{array, config, imports, object};

    #[test]
    fn untouched_document_round_trips() {
        let source = "// vite config\nimport { sveltekit } from '@sveltejs/kit/vite';\nimport { defineConfig } from 'vite';\n\nexport default defineConfig({\n    plugins: [sveltekit()], // keep\n});\n";
        let doc = JsDocument::parse(source, Dialect::TypeScript).unwrap();
        assert_eq!(doc.serialize(), source);
        assert!(!doc.changed());
    }

    #[test]
    fn generated_code_follows_file_style() {
        let source = "import { a } from \"a\";\n\nexport default defineConfig({\n  server: {\n    port: 3000,\n  },\n});\n";
        let mut doc = JsDocument::parse(source, Dialect::TypeScript).unwrap();
        assert_eq!(doc.style().indent, "  ");

        let cfg = config::config_object_mut(doc.program_mut(), "defineConfig").unwrap();
        let test = object::object_property(cfg, "test").unwrap();
        let include = object::array_property(test, "include").unwrap();
        array::append(include, parse_expression("'src/**/*.test.ts'", Dialect::TypeScript).unwrap());

        let out = doc.serialize_checked().unwrap();
        assert!(out.contains("  test: {\n    include: [\"src/**/*.test.ts\"]\n  }"), "{out}");
        assert!(doc.changed());
    }

    #[test]
    fn hash_bang_stays_on_the_first_line() {
        let source = "#!/usr/bin/env node\nexport const handle = a;\n";
        let doc = JsDocument::parse(source, Dialect::JavaScript).unwrap();
        assert_eq!(doc.serialize(), source);

        let mut doc = JsDocument::parse(source, Dialect::JavaScript).unwrap();
        imports::add_named(doc.program_mut(), "./auth", &[("auth", "auth")], false).unwrap();
        let out = doc.serialize_checked().unwrap();
        assert!(
            out.starts_with("#!/usr/bin/env node\nimport { auth } from './auth';\n"),
            "{out}"
        );

        let mut doc = JsDocument::parse(source, Dialect::JavaScript).unwrap();
        let composition = Composition::new("sequence", "@sveltejs/kit/hooks");
        let outcome = register_handler(
            doc.program_mut(),
            Dialect::JavaScript,
            &composition,
            "handle",
            "auth",
            parse_expression("b", Dialect::JavaScript).unwrap(),
        )
        .unwrap();
        assert_eq!(outcome, HandlerOutcome::Promoted);
        let out = doc.serialize_checked().unwrap();
        assert!(out.starts_with("#!/usr/bin/env node\nimport "), "{out}");
        assert_eq!(out.matches("#!").count(), 1, "{out}");
    }

    #[test]
    fn syntax_errors_are_rejected() {
        assert!(JsDocument::parse("export default {", Dialect::JavaScript).is_err());
    }
}
