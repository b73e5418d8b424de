//! Top-level variable declarations.

use crate::ast::{Declarator, Expr, ExprLocation, Program, Statement, StatementKind, VarDecl, VarKind};
use crate::errors::MutationError;
use tracing::debug;

/// Get or create `<kind> <name>: <ty> = <init>` at the end of the module.
///
/// An existing declarator without initializer (`let x;`) receives `init`.
/// A name bound by an import or function is a structural mismatch.
pub fn declaration(
    program: &mut Program,
    kind: VarKind,
    name: &str,
    type_annotation: Option<&str>,
    init: Expr,
) -> Result<ExprLocation, MutationError> {
    if let Some((statement, declarator)) = program.find_declarator(name) {
        let location = ExprLocation::Initializer {
            statement,
            declarator,
        };
        if program.expr_at(location).is_none() {
            if let Some(decl) = program.body[statement].var_decl_mut() {
                decl.declarators[declarator].init = Some(init);
            }
        }
        return Ok(location);
    }
    if program.binds(name) {
        return Err(MutationError::mismatch(
            "variable declaration",
            format!("'{name}' bound by an import or function"),
        ));
    }

    debug!(name, kind = kind.as_str(), "declaring variable");
    let statement = program.push(var_statement(kind, name, type_annotation, init));
    Ok(ExprLocation::Initializer {
        statement,
        declarator: 0,
    })
}

/// `<kind> <name>: <ty> = <init>;` as a fresh statement.
pub fn var_statement(kind: VarKind, name: &str, type_annotation: Option<&str>, init: Expr) -> Statement {
    Statement::new(StatementKind::Var(VarDecl {
        kind,
        declarators: vec![Declarator {
            name: name.to_string(),
            type_annotation: type_annotation.map(str::to_string),
            init: Some(init),
        }],
    }))
}

/// `base`, or `base2`, `base3`, ... whichever is not yet bound.
pub fn fresh_name(program: &Program, base: &str) -> String {
    if !program.binds(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{base}{n}"))
        .find(|candidate| !program.binds(candidate))
        .unwrap_or_else(|| base.to_string())
}
