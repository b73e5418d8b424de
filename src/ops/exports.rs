//! Export resolver.
//!
//! Default and named exports are resolved through local bindings, so
//! `export default config` and `export { x as handle }` lead to the
//! expressions callers actually want to edit.

use crate::ast::{
    Declaration, ExportNamed, Expr, ExprKind, ExprLocation, Program, Statement, StatementKind,
    VarDecl, VarKind,
};
use crate::errors::MutationError;
use tracing::debug;

/// Bound on identifier-to-identifier hops when resolving a binding.
const MAX_INDIRECTION: usize = 16;

/// Result of a get-or-create lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub location: ExprLocation,
    /// Whether the fallback had to be inserted
    pub created: bool,
}

/// Where a named export's value is declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingTarget {
    Variable { statement: usize, declarator: usize },
    Function { statement: usize },
}

/// A named export traced to its local declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportBinding {
    /// Local name the export refers to
    pub local: String,
    /// The `export { .. }` statement, when exported through a clause
    pub clause: Option<usize>,
    pub target: BindingTarget,
}

impl ExportBinding {
    /// Whether the declaration itself carries the `export` keyword.
    pub fn is_inline(&self) -> bool {
        self.clause.is_none()
    }
}

/// Get or create the default export.
///
/// An identifier export is followed to the variable it names.
pub fn create_default(program: &mut Program, fallback: Expr) -> Result<Resolved, MutationError> {
    let existing = program
        .body
        .iter()
        .position(|s| matches!(s.kind, StatementKind::ExportDefault(_)));

    let Some(statement) = existing else {
        debug!("creating default export");
        let index = program.push(Statement::new(StatementKind::ExportDefault(fallback)));
        return Ok(Resolved {
            location: ExprLocation::DefaultExport { statement: index },
            created: true,
        });
    };

    let location = resolve_location(program, ExprLocation::DefaultExport { statement })?;
    Ok(Resolved {
        location,
        created: false,
    })
}

/// Get or create `export const <name> = <fallback>`.
pub fn create_named(
    program: &mut Program,
    name: &str,
    fallback: Expr,
) -> Result<Resolved, MutationError> {
    match find_named(program, name)? {
        Some(binding) => {
            let BindingTarget::Variable {
                statement,
                declarator,
            } = binding.target
            else {
                return Err(MutationError::mismatch(
                    "variable declaration",
                    format!("function declaration '{}'", binding.local),
                ));
            };
            let location = ExprLocation::Initializer {
                statement,
                declarator,
            };
            if program.expr_at(location).is_none() {
                return Err(MutationError::UnresolvedBinding {
                    name: binding.local,
                });
            }
            Ok(Resolved {
                location,
                created: false,
            })
        }
        None => {
            debug!(name, "creating named export");
            let statement = program.push(export_const(name, None, fallback));
            Ok(Resolved {
                location: ExprLocation::Initializer {
                    statement,
                    declarator: 0,
                },
                created: true,
            })
        }
    }
}

/// `export const <name>: <ty> = <init>;`
pub fn export_const(name: &str, type_annotation: Option<&str>, init: Expr) -> Statement {
    let mut decl = VarDecl::single(VarKind::Const, name, init);
    decl.declarators[0].type_annotation = type_annotation.map(str::to_string);
    Statement::new(StatementKind::ExportNamed(ExportNamed {
        declaration: Some(Declaration::Var(decl)),
        ..ExportNamed::default()
    }))
}

/// Trace the named export `name` to its declaration.
///
/// Returns `Ok(None)` when nothing is exported under `name`, and
/// `UnresolvedBinding` when the export exists but its declaration is not in
/// this module.
pub fn find_named(program: &Program, name: &str) -> Result<Option<ExportBinding>, MutationError> {
    for (index, statement) in program.body.iter().enumerate() {
        let StatementKind::ExportNamed(named) = &statement.kind else {
            continue;
        };
        match &named.declaration {
            Some(Declaration::Var(decl)) => {
                if let Some(declarator) = decl.declarators.iter().position(|d| d.name == name) {
                    return Ok(Some(ExportBinding {
                        local: name.to_string(),
                        clause: None,
                        target: BindingTarget::Variable {
                            statement: index,
                            declarator,
                        },
                    }));
                }
            }
            Some(Declaration::Function(f)) => {
                if f.name == name {
                    return Ok(Some(ExportBinding {
                        local: name.to_string(),
                        clause: None,
                        target: BindingTarget::Function { statement: index },
                    }));
                }
            }
            None => {
                let Some(specifier) = named.specifiers.iter().find(|s| s.exported == name) else {
                    continue;
                };
                if named.source.is_some() || named.type_only {
                    return Err(MutationError::UnresolvedBinding {
                        name: name.to_string(),
                    });
                }
                let local = specifier.local.clone();
                let target = local_target(program, &local)
                    .ok_or_else(|| MutationError::UnresolvedBinding { name: local.clone() })?;
                return Ok(Some(ExportBinding {
                    local,
                    clause: Some(index),
                    target,
                }));
            }
        }
    }
    Ok(None)
}

/// Declaration of a top-level binding, exported or not.
pub fn local_target(program: &Program, name: &str) -> Option<BindingTarget> {
    if let Some((statement, declarator)) = program.find_declarator(name) {
        return Some(BindingTarget::Variable {
            statement,
            declarator,
        });
    }
    program
        .find_function(name)
        .map(|statement| BindingTarget::Function { statement })
}

/// Follow identifiers at `location` to the initializer they name.
pub fn resolve_location(
    program: &Program,
    mut location: ExprLocation,
) -> Result<ExprLocation, MutationError> {
    for _ in 0..MAX_INDIRECTION {
        let expr = program
            .expr_at(location)
            .ok_or_else(|| MutationError::mismatch("expression", "empty declaration"))?;
        let ExprKind::Identifier(name) = &expr.kind else {
            return Ok(location);
        };
        let (statement, declarator) = program
            .find_declarator(name)
            .ok_or_else(|| MutationError::UnresolvedBinding { name: name.clone() })?;
        let next = ExprLocation::Initializer {
            statement,
            declarator,
        };
        if program.expr_at(next).is_none() {
            return Err(MutationError::UnresolvedBinding { name: name.clone() });
        }
        location = next;
    }
    Err(MutationError::UnresolvedBinding {
        name: "<cyclic binding>".to_string(),
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
    fn default_export_is_created_once() {
        let mut program = Program::new();
        let first = create_default(&mut program, Expr::object(vec![])).unwrap();
        assert!(first.created);
        let second = create_default(&mut program, Expr::null()).unwrap();
        assert!(!second.created);
        assert_eq!(first.location, second.location);
        assert_eq!(program.body.len(), 1);
    }

    #[test]
    fn default_export_follows_identifier() {
        let mut program = parse("const config = { kit: {} };\n\nexport default config;\n");
        let resolved = create_default(&mut program, Expr::null()).unwrap();
        assert_eq!(
            resolved.location,
            ExprLocation::Initializer {
                statement: 0,
                declarator: 0
            }
        );
        assert!(program.expr_at(resolved.location).unwrap().as_object().is_some());
    }

    #[test]
    fn default_export_of_unknown_identifier() {
        let mut program = parse("import config from './base';\nexport default config;\n");
        let err = create_default(&mut program, Expr::null()).unwrap_err();
        assert!(matches!(err, MutationError::UnresolvedBinding { name } if name == "config"));
    }

    #[test]
    fn named_export_through_clause() {
        let program = parse("const h = () => {};\nexport { h as handle };\n");
        let binding = find_named(&program, "handle").unwrap().unwrap();
        assert_eq!(binding.local, "h");
        assert_eq!(binding.clause, Some(1));
        assert_eq!(
            binding.target,
            BindingTarget::Variable {
                statement: 0,
                declarator: 0
            }
        );
        assert!(find_named(&program, "h").unwrap().is_none());
    }

    #[test]
    fn named_export_forms() {
        let program = parse("export function load() {}\nexport const prerender = true;\n");
        let load = find_named(&program, "load").unwrap().unwrap();
        assert_eq!(load.target, BindingTarget::Function { statement: 0 });
        assert!(load.is_inline());

        let mut program = program;
        let resolved = create_named(&mut program, "prerender", Expr::bool(false)).unwrap();
        assert!(!resolved.created);
        let created = create_named(&mut program, "ssr", Expr::bool(false)).unwrap();
        assert!(created.created);
        assert!(create_named(&mut program, "load", Expr::null()).is_err());
    }

    #[test]
    fn reexports_cannot_be_resolved() {
        let program = parse("export { handle } from './hooks';\n");
        assert!(matches!(
            find_named(&program, "handle"),
            Err(MutationError::UnresolvedBinding { .. })
        ));
    }
}
