//! Import registry.
//!
//! Keeps at most one declaration per module and kind group (value imports,
//! type-only imports) and never binds the same local name twice.

use crate::ast::{ImportDecl, ImportSpecifier, Program, Statement, StatementKind};
use crate::errors::MutationError;
use tracing::debug;

/// Ensure `module` is default-imported and return the local binding.
///
/// An existing default import of `module` is reused under whatever name it
/// already has; otherwise the default binding is merged into an existing
/// value import of `module`, or a new declaration is prepended.
pub fn add_default(program: &mut Program, module: &str, local: &str) -> Result<String, MutationError> {
    if let Some(existing) = program
        .imports()
        .find(|decl| decl.source == module && !decl.type_only && decl.default.is_some())
        .and_then(|decl| decl.default.clone())
    {
        return Ok(existing);
    }
    ensure_unbound(program, local)?;

    if let Some(decl) = value_imports_mut(program, module).find(|decl| !decl.is_side_effect()) {
        debug!(module, local, "merging default import");
        decl.default = Some(local.to_string());
        return Ok(local.to_string());
    }

    debug!(module, local, "adding default import");
    let mut decl = ImportDecl::new(module);
    decl.default = Some(local.to_string());
    program.prepend(Statement::new(StatementKind::Import(decl)));
    Ok(local.to_string())
}

/// Ensure `import * as <local> from '<module>'` and return the binding.
pub fn add_namespace(program: &mut Program, module: &str, local: &str) -> Result<String, MutationError> {
    if let Some(existing) = program
        .imports()
        .find(|decl| decl.source == module && decl.namespace.is_some())
        .and_then(|decl| decl.namespace.clone())
    {
        return Ok(existing);
    }
    ensure_unbound(program, local)?;

    debug!(module, local, "adding namespace import");
    let mut decl = ImportDecl::new(module);
    decl.namespace = Some(local.to_string());
    program.prepend(Statement::new(StatementKind::Import(decl)));
    Ok(local.to_string())
}

/// Ensure `module` is imported for its side effects.
///
/// Any existing import of `module` already runs it, so nothing is added then.
pub fn add_empty(program: &mut Program, module: &str) {
    if program.imports().any(|decl| decl.source == module) {
        return;
    }
    debug!(module, "adding side-effect import");
    program.prepend(Statement::new(StatementKind::Import(ImportDecl::new(module))));
}

/// Ensure every `(imported, local)` pair is imported from `module`.
///
/// A specifier counts as present only when both names match. Missing ones
/// are merged into the first declaration of the same kind group; a new
/// declaration is prepended when there is none.
pub fn add_named(
    program: &mut Program,
    module: &str,
    specifiers: &[(&str, &str)],
    type_only: bool,
) -> Result<(), MutationError> {
    let mut missing = Vec::new();
    for &(imported, local) in specifiers {
        if is_imported(program, module, imported, local) {
            continue;
        }
        ensure_unbound(program, local)?;
        if !missing.iter().any(|s: &ImportSpecifier| s.local == local) {
            missing.push(ImportSpecifier::new(imported, local));
        }
    }
    if missing.is_empty() {
        return Ok(());
    }

    let group = program.body.iter_mut().find_map(|statement| match &mut statement.kind {
        StatementKind::Import(decl)
            if decl.source == module
                && decl.type_only == type_only
                && decl.namespace.is_none()
                && !decl.is_side_effect() =>
        {
            Some(decl)
        }
        _ => None,
    });

    match group {
        Some(decl) => {
            debug!(module, count = missing.len(), "merging named imports");
            decl.braces = true;
            decl.named.extend(missing);
        }
        None => {
            debug!(module, count = missing.len(), "adding named import");
            let mut decl = ImportDecl::new(module);
            decl.type_only = type_only;
            decl.braces = true;
            decl.named = missing;
            program.prepend(Statement::new(StatementKind::Import(decl)));
        }
    }
    Ok(())
}

/// Local alias under which `imported` is imported from `module`, if any.
pub fn named_binding<'p>(program: &'p Program, module: &str, imported: &str) -> Option<&'p str> {
    program
        .imports()
        .filter(|decl| decl.source == module)
        .flat_map(|decl| decl.named.iter())
        .find(|s| s.imported == imported)
        .map(|s| s.local.as_str())
}

fn is_imported(program: &Program, module: &str, imported: &str, local: &str) -> bool {
    program
        .imports()
        .filter(|decl| decl.source == module)
        .flat_map(|decl| decl.named.iter())
        .any(|s| s.imported == imported && s.local == local)
}

/// A local name may only be bound once per module scope.
fn ensure_unbound(program: &Program, local: &str) -> Result<(), MutationError> {
    if program.binds(local) {
        return Err(MutationError::mismatch(
            "unbound import name",
            format!("'{local}' is already bound"),
        ));
    }
    Ok(())
}

fn value_imports_mut<'p>(
    program: &'p mut Program,
    module: &'p str,
) -> impl Iterator<Item = &'p mut ImportDecl> + 'p {
    program.body.iter_mut().filter_map(move |statement| match &mut statement.kind {
        StatementKind::Import(decl) if decl.source == module && !decl.type_only => Some(decl),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::js::{parse_program, Dialect};

    fn parse(source: &str) -> Program {
        parse_program(source, Dialect::TypeScript).unwrap()
    }

    #[test]
    fn named_import_is_deduplicated() {
        let mut program = Program::new();
        add_named(&mut program, "m", &[("a", "a")], false).unwrap();
        add_named(&mut program, "m", &[("a", "a")], false).unwrap();

        let imports: Vec<_> = program.imports().collect();
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].named.len(), 1);
    }

    #[test]
    fn named_imports_merge_into_existing_declaration() {
        let mut program = parse("import { a } from 'm';\nimport type { T } from 'm';\n");
        add_named(&mut program, "m", &[("b", "b")], false).unwrap();
        add_named(&mut program, "m", &[("U", "U")], true).unwrap();

        let imports: Vec<_> = program.imports().collect();
        assert_eq!(imports.len(), 2);
        let locals: Vec<_> = imports[0].named.iter().map(|s| s.local.as_str()).collect();
        assert_eq!(locals, ["a", "b"]);
        assert_eq!(imports[1].named.len(), 2);
    }

    #[test]
    fn namespace_imports_take_no_named_specifiers() {
        let mut program = parse("import * as m from 'm';\n");
        add_named(&mut program, "m", &[("a", "a")], false).unwrap();
        assert_eq!(program.imports().count(), 2);
        assert_eq!(program.imports().next().map(|d| d.named.len()), Some(1));
    }

    #[test]
    fn conflicting_local_binding_is_rejected() {
        let mut program = parse("import { x as a } from 'm';\n");
        let err = add_named(&mut program, "m", &[("a", "a")], false).unwrap_err();
        assert!(matches!(err, MutationError::StructuralMismatch { .. }));
    }

    #[test]
    fn default_import_reuses_alias() {
        let mut program = parse("import kit from 'kit';\n");
        let binding = add_default(&mut program, "kit", "sveltekit").unwrap();
        assert_eq!(binding, "kit");
        assert_eq!(program.imports().count(), 1);

        let binding = add_default(&mut program, "other", "other").unwrap();
        assert_eq!(binding, "other");
        assert_eq!(program.imports().next().map(|d| d.source.as_str()), Some("other"));
    }

    #[test]
    fn namespace_and_side_effect_imports() {
        let mut program = Program::new();
        assert_eq!(add_namespace(&mut program, "auth", "auth").unwrap(), "auth");
        assert_eq!(add_namespace(&mut program, "auth", "other").unwrap(), "auth");
        add_empty(&mut program, "./app.css");
        add_empty(&mut program, "./app.css");
        add_empty(&mut program, "auth");
        assert_eq!(program.imports().count(), 2);
    }

    #[test]
    fn binding_lookup() {
        let program = parse("import { sequence as seq } from '@sveltejs/kit/hooks';\n");
        assert_eq!(
            named_binding(&program, "@sveltejs/kit/hooks", "sequence"),
            Some("seq")
        );
        assert_eq!(named_binding(&program, "@sveltejs/kit", "sequence"), None);
    }
}
