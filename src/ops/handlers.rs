//! Handler-chain composition.
//!
//! Several independent passes may each want to install a handler under the
//! same named export (SvelteKit's `handle` hook, for instance). Registering
//! goes through three states:
//!
//! - no export yet: `export const handle = <expr>;`
//! - a bare handler: promoted once into `sequence(originalHandle, <new>)`
//! - already composed: the new handler is appended to the call
//!
//! Registration is idempotent: once the handler expression occurs anywhere in
//! the module, or its name is already composed, nothing changes.

use crate::ast::{print, Declaration, Expr, ExprLocation, Program, Statement, StatementKind, VarDecl, VarKind};
use crate::errors::MutationError;
use crate::js::Dialect;
use crate::ops::exports::{self, BindingTarget, ExportBinding};
use crate::ops::{common, imports, variables};
use crate::sg::PatternMatcher;
use crate::style::Style;
use tracing::debug;

/// The helper that composes handlers and, optionally, the type new handler
/// declarations are annotated with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composition {
    /// Composition helper, e.g. `sequence`
    pub helper: String,
    /// Module the helper is imported from
    pub module: String,
    pub handler_type: Option<HandlerType>,
}

/// A type imported type-only and used to annotate new handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerType {
    pub name: String,
    pub module: String,
}

impl Composition {
    pub fn new(helper: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            helper: helper.into(),
            module: module.into(),
            handler_type: None,
        }
    }

    pub fn with_type(mut self, name: impl Into<String>, module: impl Into<String>) -> Self {
        self.handler_type = Some(HandlerType {
            name: name.into(),
            module: module.into(),
        });
        self
    }

    /// SvelteKit server hooks: `sequence` from `@sveltejs/kit/hooks`, typed `Handle`.
    pub fn sveltekit_hooks() -> Self {
        Self::new("sequence", "@sveltejs/kit/hooks").with_type("Handle", "@sveltejs/kit")
    }
}

/// What a registration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// The handler was already registered
    Unchanged,
    /// The export did not exist and now holds the handler
    Created,
    /// The handler was appended to an existing composition
    Appended,
    /// A bare handler was promoted into a composition with the new one
    Promoted,
}

/// Register `expr` under the name `handler` in the composition exported as
/// `export`.
pub fn register_handler(
    program: &mut Program,
    dialect: Dialect,
    composition: &Composition,
    export: &str,
    handler: &str,
    expr: Expr,
) -> Result<HandlerOutcome, MutationError> {
    if common::contains(program, &expr) {
        debug!(export, handler, "handler expression already present");
        return Ok(HandlerOutcome::Unchanged);
    }

    let type_local = match (&composition.handler_type, dialect.is_typescript()) {
        (Some(ty), true) => Some(importable(program, &ty.module, &ty.name)?),
        _ => None,
    };

    let Some(binding) = exports::find_named(program, export)? else {
        debug!(export, handler, "creating handler export");
        program.push(exports::export_const(export, type_local.as_deref(), expr));
        import_type(program, composition, type_local.as_deref())?;
        return Ok(HandlerOutcome::Created);
    };

    let helper_local = imports::named_binding(program, &composition.module, &composition.helper)
        .unwrap_or(&composition.helper)
        .to_string();

    if let Some(location) = composition_location(program, &binding, &helper_local) {
        let composed = program
            .expr_at(location)
            .and_then(Expr::as_call)
            .is_some_and(|call| call.args.iter().any(|arg| arg.as_ident() == Some(handler)));
        if composed {
            debug!(export, handler, "handler already composed");
            return Ok(HandlerOutcome::Unchanged);
        }
        append_to_composition(program, &binding, location, handler, type_local.as_deref(), expr);
        import_type(program, composition, type_local.as_deref())?;
        return Ok(HandlerOutcome::Appended);
    }

    importable(program, &composition.module, &composition.helper)?;
    promote(program, dialect, &binding, export, handler, &helper_local, type_local.as_deref(), expr)?;
    if imports::named_binding(program, &composition.module, &composition.helper).is_none() {
        imports::add_named(
            program,
            &composition.module,
            &[(&composition.helper, &composition.helper)],
            false,
        )?;
    }
    import_type(program, composition, type_local.as_deref())?;
    Ok(HandlerOutcome::Promoted)
}

/// The initializer of the export when it is a call to the composition helper.
fn composition_location(
    program: &Program,
    binding: &ExportBinding,
    helper_local: &str,
) -> Option<ExprLocation> {
    let BindingTarget::Variable {
        statement,
        declarator,
    } = binding.target
    else {
        return None;
    };
    let location = ExprLocation::Initializer {
        statement,
        declarator,
    };
    program
        .expr_at(location)?
        .as_call()
        .filter(|call| call.is_call_to(helper_local))
        .map(|_| location)
}

fn append_to_composition(
    program: &mut Program,
    binding: &ExportBinding,
    location: ExprLocation,
    handler: &str,
    type_local: Option<&str>,
    expr: Expr,
) {
    let name = variables::fresh_name(program, handler);
    debug!(handler = %name, "appending handler to composition");

    if let Some(call) = program.expr_at_mut(location).and_then(Expr::as_call_mut) {
        call.args.push(Expr::ident(name.as_str()));
    }

    let ExprLocation::Initializer { statement, .. } = location else {
        return;
    };
    let mut touched = take_statements(program, [Some(statement), binding.clause]);
    // Declarations before the export clause that names them.
    touched.sort_by_key(is_export_clause);
    program.push(variables::var_statement(VarKind::Const, &name, type_local, expr));
    for statement in touched {
        program.push(statement);
    }
}

#[allow(clippy::too_many_arguments)]
fn promote(
    program: &mut Program,
    dialect: Dialect,
    binding: &ExportBinding,
    export: &str,
    handler: &str,
    helper_local: &str,
    type_local: Option<&str>,
    expr: Expr,
) -> Result<(), MutationError> {
    let renamed = (binding.local == export)
        .then(|| variables::fresh_name(program, &format!("original{}", capitalize(export))));
    if renamed.is_some() {
        ensure_rename_is_safe(program, dialect, binding)?;
    }
    let original = renamed.clone().unwrap_or_else(|| binding.local.clone());

    let mut name = variables::fresh_name(program, handler);
    if name == original {
        name = variables::fresh_name(program, &format!("{handler}2"));
    }
    debug!(export, original = %original, handler = %name, "promoting handler to composition");

    // The export keyword moves to the new composition statement.
    let mut clause = binding.clause;
    if let Some(index) = binding.clause {
        if let StatementKind::ExportNamed(named) = &mut program.body[index].kind {
            named.specifiers.retain(|s| s.exported != export);
            if !named.specifiers.is_empty() {
                clause = None;
            }
        }
    }

    let detached = match binding.target {
        BindingTarget::Variable {
            statement,
            declarator,
        } => detach_declarator(program, statement, declarator, renamed.as_deref(), binding)?,
        BindingTarget::Function { statement } => detach_function(statement, renamed.as_deref(), binding),
    };

    let (removed_original, mut original_statement) = match detached {
        Detached::Whole(index) => (Some(index), None),
        Detached::Split(statement) => (None, Some(statement)),
        Detached::InPlace => (None, None),
    };
    let mut taken = take_statements(program, [removed_original, clause]);
    if removed_original.is_some() && !taken.is_empty() {
        // `take_statements` preserves order; the original declaration comes
        // first unless the clause preceded it.
        let position = if clause.is_some_and(|c| Some(c) < removed_original) {
            1
        } else {
            0
        };
        let mut statement = taken.remove(position.min(taken.len() - 1));
        rewrite_original(&mut statement, renamed.as_deref());
        original_statement = Some(statement);
    }

    if let Some(statement) = original_statement {
        program.push(statement);
    }
    program.push(variables::var_statement(VarKind::Const, &name, type_local, expr));
    let sequence = Expr::call(
        helper_local,
        vec![Expr::ident(original.as_str()), Expr::ident(name.as_str())],
    );
    program.push(exports::export_const(export, None, sequence));
    Ok(())
}

/// How the original handler declaration was separated from its export.
enum Detached {
    /// The whole statement at this index moves
    Whole(usize),
    /// A declarator was split out of a multi-declarator statement
    Split(Statement),
    /// Nothing had to change
    InPlace,
}

fn detach_declarator(
    program: &mut Program,
    statement: usize,
    declarator: usize,
    renamed: Option<&str>,
    binding: &ExportBinding,
) -> Result<Detached, MutationError> {
    let single = program.body[statement]
        .var_decl()
        .is_some_and(|decl| decl.declarators.len() == 1);
    let has_init = program
        .expr_at(ExprLocation::Initializer {
            statement,
            declarator,
        })
        .is_some();
    if !has_init {
        return Err(MutationError::UnresolvedBinding {
            name: binding.local.clone(),
        });
    }

    if renamed.is_none() && !binding.is_inline() {
        return Ok(Detached::InPlace);
    }
    if single {
        return Ok(Detached::Whole(statement));
    }

    let Some(decl) = program.body[statement].var_decl_mut() else {
        return Err(MutationError::UnresolvedBinding {
            name: binding.local.clone(),
        });
    };
    let kind = decl.kind;
    let mut split = decl.declarators.remove(declarator);
    if let Some(name) = renamed {
        split.name = name.to_string();
    }
    Ok(Detached::Split(Statement::new(StatementKind::Var(VarDecl {
        kind,
        declarators: vec![split],
    }))))
}

fn detach_function(statement: usize, renamed: Option<&str>, binding: &ExportBinding) -> Detached {
    if renamed.is_none() && !binding.is_inline() {
        Detached::InPlace
    } else {
        Detached::Whole(statement)
    }
}

/// Drop the `export` keyword and apply the rename.
fn rewrite_original(statement: &mut Statement, renamed: Option<&str>) {
    if let StatementKind::ExportNamed(named) = &mut statement.kind {
        match named.declaration.take() {
            Some(Declaration::Var(decl)) => statement.kind = StatementKind::Var(decl),
            Some(Declaration::Function(f)) => statement.kind = StatementKind::Function(f),
            None => {}
        }
    }
    let Some(name) = renamed else {
        return;
    };
    match &mut statement.kind {
        StatementKind::Var(decl) => {
            if let Some(d) = decl.declarators.first_mut() {
                d.name = name.to_string();
            }
        }
        StatementKind::Function(f) => f.name = name.to_string(),
        _ => {}
    }
}

fn is_export_clause(statement: &Statement) -> bool {
    matches!(&statement.kind, StatementKind::ExportNamed(named) if named.declaration.is_none())
}

/// Remove the given statements, returning them in program order.
fn take_statements<const N: usize>(program: &mut Program, indices: [Option<usize>; N]) -> Vec<Statement> {
    let mut indices: Vec<usize> = indices.into_iter().flatten().collect();
    indices.sort_unstable();
    indices.dedup();
    let len = program.body.len();
    let mut taken: Vec<Statement> = indices
        .into_iter()
        .rev()
        .filter(|&i| i < len)
        .map(|i| program.body.remove(i))
        .collect();
    taken.reverse();
    taken
}

/// Refuse to rename a binding that is referenced anywhere besides its
/// declaration and export clause.
fn ensure_rename_is_safe(
    program: &Program,
    dialect: Dialect,
    binding: &ExportBinding,
) -> Result<(), MutationError> {
    let name = binding.local.as_str();
    let source = print::program(program, &Style::default());
    let matcher = PatternMatcher::new(&source, dialect);
    let found = matcher.identifier_spans(name).len();

    // The declaration plus every mention inside local export clauses,
    // counted on the clause text so a written `handle as handle` counts twice.
    let mut expected = 1;
    for statement in &program.body {
        if let StatementKind::ExportNamed(named) = &statement.kind {
            if named.declaration.is_none() && named.source.is_none() {
                let clause = print::statement(statement, &Style::default());
                expected += PatternMatcher::new(&clause, dialect).identifier_spans(name).len();
            }
        }
    }

    let references = found.saturating_sub(expected);
    if references > 0 {
        return Err(MutationError::UnsafeRename {
            name: name.to_string(),
            references,
        });
    }
    Ok(())
}

/// Local name under which `imported` from `module` is or can be bound.
fn importable(program: &Program, module: &str, imported: &str) -> Result<String, MutationError> {
    if let Some(local) = imports::named_binding(program, module, imported) {
        return Ok(local.to_string());
    }
    if program.binds(imported) {
        return Err(MutationError::mismatch(
            "unbound import name",
            format!("'{imported}' is already bound"),
        ));
    }
    Ok(imported.to_string())
}

fn import_type(
    program: &mut Program,
    composition: &Composition,
    type_local: Option<&str>,
) -> Result<(), MutationError> {
    let (Some(ty), Some(local)) = (&composition.handler_type, type_local) else {
        return Ok(());
    };
    if imports::named_binding(program, &ty.module, &ty.name).is_some() {
        return Ok(());
    }
    imports::add_named(program, &ty.module, &[(&ty.name, local)], true)
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
