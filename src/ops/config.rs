//! Config-wrapper resolution.
//!
//! Config files usually default-export an object, often wrapped in a helper
//! call (`defineConfig({...})`) and sometimes followed by a TypeScript
//! `satisfies`/`as` clause. These functions find that object, creating the
//! export when the file has none.

use crate::ast::{canonical, Expr, ExprKind, ExprLocation, ObjectExpr, Program};
use crate::errors::MutationError;
use crate::ops::{common, exports};
use tracing::debug;

const MAX_STEPS: usize = 32;

/// One hop from an expression towards the config object inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Into the expression of a `satisfies`/`as` cast
    Cast,
    /// Into the first argument of the wrapper call
    FirstArg,
}

/// Path to a config object literal: a top-level slot plus the hops into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigObject {
    pub location: ExprLocation,
    pub steps: Vec<Step>,
}

impl ConfigObject {
    pub fn get<'p>(&self, program: &'p Program) -> Option<&'p ObjectExpr> {
        descend(program, self)?.as_object()
    }

    pub fn get_mut<'p>(&self, program: &'p mut Program) -> Option<&'p mut ObjectExpr> {
        descend_mut(program, self)?.as_object_mut()
    }
}

/// Locate the config object of a module whose default export is wrapped in
/// a `wrapper(...)` call.
///
/// A missing default export becomes `export default wrapper({})`. A bare
/// object literal is used as is. Anything else was not produced by this tool
/// and yields [`MutationError::AmbiguousPreexistingConfig`].
pub fn resolve_config_object(program: &mut Program, wrapper: &str) -> Result<ConfigObject, MutationError> {
    let resolved = exports::create_default(program, common::call(wrapper, vec![]))?;
    resolve_from(program, resolved.location, Some(wrapper))
}

/// Locate the default-exported config object of a module without wrapper.
pub fn resolve_plain_object(program: &mut Program) -> Result<ConfigObject, MutationError> {
    let resolved = exports::create_default(program, Expr::object(vec![]))?;
    resolve_from(program, resolved.location, None)
}

/// Shorthand for [`resolve_config_object`] followed by [`ConfigObject::get_mut`].
pub fn config_object_mut<'p>(
    program: &'p mut Program,
    wrapper: &str,
) -> Result<&'p mut ObjectExpr, MutationError> {
    let target = resolve_config_object(program, wrapper)?;
    target
        .get_mut(program)
        .ok_or_else(|| MutationError::mismatch("object literal", "unresolvable config path"))
}

fn resolve_from(
    program: &mut Program,
    mut location: ExprLocation,
    wrapper: Option<&str>,
) -> Result<ConfigObject, MutationError> {
    let mut steps = Vec::new();

    for _ in 0..MAX_STEPS {
        let target = ConfigObject {
            location,
            steps: steps.clone(),
        };
        let expr = descend(program, &target)
            .ok_or_else(|| MutationError::mismatch("expression", "empty declaration"))?;

        match &expr.kind {
            ExprKind::Object(_) => return Ok(target),
            ExprKind::Cast(_) => steps.push(Step::Cast),
            ExprKind::Identifier(name) => {
                location = follow(program, name)?;
                steps.clear();
            }
            ExprKind::Call(call) if wrapper.is_some_and(|w| canonical::expr(&call.callee) == w) => {
                match call.args.first().map(|arg| &arg.kind) {
                    None => {
                        debug!("synthesizing empty config object");
                        if let Some(call) = descend_mut(program, &target).and_then(Expr::as_call_mut) {
                            call.args.push(Expr::object(vec![]));
                        }
                        steps.push(Step::FirstArg);
                    }
                    Some(ExprKind::Identifier(name)) => {
                        location = follow(program, name)?;
                        steps.clear();
                    }
                    Some(_) => steps.push(Step::FirstArg),
                }
            }
            _ => {
                return Err(MutationError::AmbiguousPreexistingConfig {
                    found: expr.kind_name().to_string(),
                })
            }
        }
    }

    Err(MutationError::mismatch("config object", "unbounded indirection"))
}

fn follow(program: &Program, name: &str) -> Result<ExprLocation, MutationError> {
    let (statement, declarator) = program
        .find_declarator(name)
        .ok_or_else(|| MutationError::UnresolvedBinding {
            name: name.to_string(),
        })?;
    Ok(ExprLocation::Initializer {
        statement,
        declarator,
    })
}

fn descend<'p>(program: &'p Program, target: &ConfigObject) -> Option<&'p Expr> {
    let mut expr = program.expr_at(target.location)?;
    for step in &target.steps {
        expr = match (step, &expr.kind) {
            (Step::Cast, ExprKind::Cast(cast)) => &*cast.expr,
            (Step::FirstArg, ExprKind::Call(call)) => call.args.first()?,
            _ => return None,
        };
    }
    Some(expr)
}

fn descend_mut<'p>(program: &'p mut Program, target: &ConfigObject) -> Option<&'p mut Expr> {
    let mut expr = program.expr_at_mut(target.location)?;
    for step in &target.steps {
        expr = match (step, &mut expr.kind) {
            (Step::Cast, ExprKind::Cast(cast)) => &mut *cast.expr,
            (Step::FirstArg, ExprKind::Call(call)) => call.args.first_mut()?,
            _ => return None,
        };
    }
    Some(expr)
}
