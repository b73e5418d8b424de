//! Property tests for idempotence and style inference

use js_patcher::ast::ArrayExpr;
use js_patcher::js::parse_expression;
use js_patcher::ops::{array, imports};
use js_patcher::style::guess_indent_string;
use js_patcher::{Dialect, JsDocument, TextDocument};
use proptest::prelude::*;
use std::collections::BTreeSet;

proptest! {
    #[test]
    fn space_indent_unit_is_the_shortest_run(width in 2usize..8, depths in prop::collection::vec(1usize..4, 1..12)) {
        let mut source = String::from("export default {\n");
        source.push_str(&" ".repeat(width));
        source.push_str("a: 1,\n");
        for depth in depths {
            source.push_str(&" ".repeat(width * depth));
            source.push_str("b: 2,\n");
        }
        source.push_str("};\n");
        prop_assert_eq!(guess_indent_string(&source), " ".repeat(width));
    }

    #[test]
    fn tab_indented_sources_stay_tabs(depths in prop::collection::vec(1usize..4, 0..12)) {
        let mut source = String::from("export default {\n");
        for depth in depths {
            source.push_str(&"\t".repeat(depth));
            source.push_str("a: 1,\n");
        }
        source.push_str("};\n");
        prop_assert_eq!(guess_indent_string(&source), "\t");
    }

    #[test]
    fn array_append_is_idempotent(values in prop::collection::vec("[a-z0-9]{0,6}", 0..16)) {
        let mut arr = ArrayExpr::default();
        for value in &values {
            let element = parse_expression(&format!("'{value}'"), Dialect::TypeScript).unwrap();
            array::append(&mut arr, element);
        }
        let unique: BTreeSet<&String> = values.iter().collect();
        prop_assert_eq!(arr.elements.len(), unique.len());

        for value in &values {
            let element = parse_expression(&format!("\"{value}\""), Dialect::TypeScript).unwrap();
            prop_assert!(!array::append(&mut arr, element));
        }
    }

    #[test]
    fn named_imports_are_deduplicated(names in prop::collection::btree_set("[a-z]{1,6}", 1..6)) {
        let locals: Vec<String> = names.iter().map(|n| format!("use_{n}")).collect();
        let pairs: Vec<(&str, &str)> = locals.iter().map(|n| (n.as_str(), n.as_str())).collect();

        let mut doc = JsDocument::parse("export const x = 1;\n", Dialect::TypeScript).unwrap();
        imports::add_named(doc.program_mut(), "lib", &pairs, false).unwrap();
        let once = doc.serialize_checked().unwrap();

        imports::add_named(doc.program_mut(), "lib", &pairs, false).unwrap();
        prop_assert_eq!(doc.serialize_checked().unwrap(), once.clone());

        let mut reparsed = JsDocument::parse(once.clone(), Dialect::TypeScript).unwrap();
        imports::add_named(reparsed.program_mut(), "lib", &pairs, false).unwrap();
        prop_assert_eq!(reparsed.serialize(), once);
    }

    #[test]
    fn ensure_line_is_idempotent(lines in prop::collection::vec("[A-Z_]{1,8}=[a-z]{0,4}", 0..10)) {
        let mut doc = TextDocument::new("");
        for line in &lines {
            doc.ensure_line(line);
        }
        let once = doc.content().to_string();
        for line in &lines {
            prop_assert!(!doc.ensure_line(line));
        }
        prop_assert_eq!(doc.content(), once.as_str());
    }
}
