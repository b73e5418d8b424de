//! Mutation engine scenarios, driven through `JsDocument` the way separate
//! recipe runs would: every step re-parses the previous output.

use js_patcher::js::parse_expression;
use js_patcher::ops::{array, config, imports, object};
use js_patcher::{register_handler, Composition, Dialect, HandlerOutcome, JsDocument, MutationError};

const TS: Dialect = Dialect::TypeScript;

fn register(source: &str, handler: &str, expr: &str) -> (HandlerOutcome, String) {
    let mut doc = JsDocument::parse(source, TS).unwrap();
    let expr = parse_expression(expr, TS).unwrap();
    let outcome = register_handler(
        doc.program_mut(),
        TS,
        &Composition::new("sequence", "@sveltejs/kit/hooks"),
        "handle",
        handler,
        expr,
    )
    .unwrap();
    (outcome, doc.serialize_checked().unwrap())
}

#[test]
fn handler_chain_across_runs() {
    let (outcome, first) = register("", "auth", "authHandle");
    assert_eq!(outcome, HandlerOutcome::Created);
    assert_eq!(first, "export const handle = authHandle;\n");

    let (outcome, second) = register(&first, "i18n", "i18nHandle");
    assert_eq!(outcome, HandlerOutcome::Promoted);
    assert_eq!(
        second,
        "import { sequence } from '@sveltejs/kit/hooks';\n\nconst originalHandle = authHandle;\n\nconst i18n = i18nHandle;\n\nexport const handle = sequence(originalHandle, i18n);\n"
    );

    let (outcome, again) = register(&second, "auth", "authHandle");
    assert_eq!(outcome, HandlerOutcome::Unchanged);
    assert_eq!(again, second);
    let (outcome, again) = register(&second, "i18n", "i18nHandle");
    assert_eq!(outcome, HandlerOutcome::Unchanged);
    assert_eq!(again, second);

    let (outcome, third) = register(&second, "csp", "cspHandle");
    assert_eq!(outcome, HandlerOutcome::Appended);
    assert!(third.contains("export const handle = sequence(originalHandle, i18n, csp);"));
    assert!(third.find("const csp = cspHandle;") < third.find("export const handle"));
}

#[test]
fn typed_composition_annotates_new_handlers() {
    let mut doc = JsDocument::parse("", TS).unwrap();
    let expr = parse_expression("authHandle", TS).unwrap();
    register_handler(
        doc.program_mut(),
        TS,
        &Composition::sveltekit_hooks(),
        "handle",
        "auth",
        expr,
    )
    .unwrap();
    let out = doc.serialize_checked().unwrap();
    assert!(out.contains("import type { Handle } from '@sveltejs/kit';"), "{out}");
    assert!(out.contains("export const handle: Handle = authHandle;"), "{out}");
}

#[test]
fn config_wrapper_is_unwrapped() {
    let mut doc = JsDocument::parse("export default defineConfig({ plugins: [a()] });\n", TS).unwrap();
    let cfg = config::config_object_mut(doc.program_mut(), "defineConfig").unwrap();
    let plugins = object::array_property(cfg, "plugins").unwrap();
    assert!(array::append(plugins, parse_expression("b()", TS).unwrap()));
    assert!(!array::append(plugins, parse_expression("b()", TS).unwrap()));
    assert_eq!(doc.serialize(), "export default defineConfig({ plugins: [a(), b()] });\n");
}

#[test]
fn bare_config_object_gets_no_wrapper() {
    let mut doc = JsDocument::parse("export default { plugins: [] };\n", TS).unwrap();
    let cfg = config::config_object_mut(doc.program_mut(), "defineConfig").unwrap();
    object::array_property(cfg, "plugins").unwrap();
    assert!(!doc.serialize().contains("defineConfig"));
}

#[test]
fn foreign_default_export_is_ambiguous() {
    let mut doc = JsDocument::parse("export default makeConfig();\n", TS).unwrap();
    let err = config::config_object_mut(doc.program_mut(), "defineConfig").unwrap_err();
    assert!(matches!(err, MutationError::AmbiguousPreexistingConfig { .. }));
    assert!(err.is_skippable());
}

#[test]
fn two_space_single_quote_style_is_followed() {
    let source = "import { sveltekit } from '@sveltejs/kit/vite';\n\nexport default defineConfig({\n  server: {\n    port: 3000,\n  },\n});\n";
    let mut doc = JsDocument::parse(source, TS).unwrap();

    let cfg = config::config_object_mut(doc.program_mut(), "defineConfig").unwrap();
    let test = object::object_property(cfg, "test").unwrap();
    let include = object::array_property(test, "include").unwrap();
    array::append(include, parse_expression("\"src/**/*.test.ts\"", TS).unwrap());

    let out = doc.serialize_checked().unwrap();
    assert!(out.contains("  test: {\n    include: ['src/**/*.test.ts']\n  }"), "{out}");
    assert!(out.starts_with("import { sveltekit } from '@sveltejs/kit/vite';\n"));
    assert!(out.contains("  server: {\n    port: 3000,\n  },\n"), "{out}");
}

#[test]
fn named_imports_merge_into_one_declaration() {
    let mut doc = JsDocument::parse("import { a } from 'lib';\n", TS).unwrap();
    imports::add_named(doc.program_mut(), "lib", &[("b", "b")], false).unwrap();
    imports::add_named(doc.program_mut(), "lib", &[("b", "b")], false).unwrap();
    assert_eq!(doc.serialize(), "import { a, b } from 'lib';\n");

    let err = imports::add_named(doc.program_mut(), "other", &[("c", "a")], false).unwrap_err();
    assert!(matches!(err, MutationError::StructuralMismatch { .. }));
}

#[test]
fn untouched_files_round_trip() {
    let source = "// hooks\nimport { sequence } from \"@sveltejs/kit/hooks\";\n\n/** auth */\nexport const handle = sequence(a,   b);\n";
    let doc = JsDocument::parse(source, TS).unwrap();
    assert_eq!(doc.serialize(), source);
    assert!(!doc.changed());
}
