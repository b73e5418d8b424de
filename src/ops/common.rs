//! Snippet parsing and program-wide helpers shared by the other primitives.

use crate::ast::{
    canonical, CallExpr, Declaration, ExportNamed, Expr, ExprKind, ObjectMember, Program,
    Statement, StatementKind,
};
use crate::errors::MutationError;
use crate::js::{parse_expression, parse_statements, Dialect};
use tracing::debug;

/// Parse a single expression written as source text.
pub fn expression_from_str(snippet: &str, dialect: Dialect) -> Result<Expr, MutationError> {
    Ok(parse_expression(snippet, dialect)?)
}

/// Parse exactly one statement written as source text.
pub fn statement_from_str(snippet: &str, dialect: Dialect) -> Result<Statement, MutationError> {
    let mut statements = parse_statements(snippet, dialect)?;
    if statements.len() != 1 {
        return Err(MutationError::mismatch(
            "single statement",
            format!("{} statements", statements.len()),
        ));
    }
    Ok(statements.remove(0))
}

pub fn statements_from_str(snippet: &str, dialect: Dialect) -> Result<Vec<Statement>, MutationError> {
    Ok(parse_statements(snippet, dialect)?)
}

/// Append `statement` unless a structurally equal one exists. Returns whether
/// it was appended.
pub fn append_statement(program: &mut Program, statement: Statement) -> bool {
    if has_statement(program, &statement) {
        return false;
    }
    debug!("appending statement");
    program.push(statement);
    true
}

/// Insert `statement` after the leading imports unless an equal one exists.
pub fn insert_statement_after_imports(program: &mut Program, statement: Statement) -> bool {
    if has_statement(program, &statement) {
        return false;
    }
    debug!("inserting statement after imports");
    program.insert_after_imports(statement);
    true
}

pub fn has_statement(program: &Program, statement: &Statement) -> bool {
    let target = canonical::statement(statement);
    program
        .body
        .iter()
        .any(|s| canonical::statement(s) == target)
}

/// Whether an expression structurally equal to `target` occurs anywhere in
/// the program.
pub fn contains(program: &Program, target: &Expr) -> bool {
    let target = canonical::expr(target);
    program.body.iter().any(|statement| {
        statement_exprs(statement)
            .into_iter()
            .any(|e| expr_contains(e, &target))
    })
}

/// `callee(args...)`, where `callee` may be a dotted path like `vite.defineConfig`.
pub fn call(callee: &str, args: Vec<Expr>) -> Expr {
    let mut parts = callee.split('.');
    let first = parts.next().unwrap_or(callee);
    let callee = parts.fold(Expr::ident(first), |object, part| Expr::member(object, part));
    ExprKind::Call(CallExpr {
        callee: Box::new(callee),
        args,
    })
    .into()
}

/// Top-level expressions a statement holds.
fn statement_exprs(statement: &Statement) -> Vec<&Expr> {
    match &statement.kind {
        StatementKind::ExportDefault(e) | StatementKind::Expression(e) => vec![e],
        StatementKind::Var(decl)
        | StatementKind::ExportNamed(ExportNamed {
            declaration: Some(Declaration::Var(decl)),
            ..
        }) => decl.declarators.iter().filter_map(|d| d.init.as_ref()).collect(),
        _ => Vec::new(),
    }
}

fn expr_contains(expr: &Expr, target: &str) -> bool {
    if canonical::expr(expr) == target {
        return true;
    }
    match &expr.kind {
        ExprKind::Object(obj) => obj.members.iter().any(|m| match m {
            ObjectMember::Property(p) => expr_contains(&p.value, target),
            ObjectMember::Other(_) => false,
        }),
        ExprKind::Array(arr) => arr.elements.iter().any(|e| expr_contains(e, target)),
        ExprKind::Call(call) => {
            expr_contains(&call.callee, target) || call.args.iter().any(|a| expr_contains(a, target))
        }
        ExprKind::Member(member) => expr_contains(&member.object, target),
        ExprKind::Cast(cast) => expr_contains(&cast.expr, target),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::js::parse_program;

    const TS: Dialect = Dialect::TypeScript;

    #[test]
    fn contains_finds_nested_expressions() {
        let program = parse_program(
            "export default defineConfig({ plugins: [sveltekit(), devtools({ open: true })] });\n",
            TS,
        )
        .unwrap();
        assert!(contains(&program, &expression_from_str("sveltekit()", TS).unwrap()));
        assert!(contains(&program, &expression_from_str("{open:true}", TS).unwrap()));
        assert!(!contains(&program, &expression_from_str("tailwind()", TS).unwrap()));
    }

    #[test]
    fn statements_are_appended_once() {
        let mut program = Program::new();
        let statement = statement_from_str("console.log('ready');", TS).unwrap();
        assert!(append_statement(&mut program, statement.clone()));
        let respelled = statement_from_str("console.log(\"ready\")", TS).unwrap();
        assert!(!append_statement(&mut program, respelled));
        assert_eq!(program.body.len(), 1);
        assert!(statement_from_str("a(); b();", TS).is_err());
    }

    #[test]
    fn dotted_call_builder() {
        let expr = call("vite.defineConfig", vec![]);
        assert_eq!(canonical::expr(&expr), "vite.defineConfig()");
        assert!(canonical::equal(&expr, &expression_from_str("vite.defineConfig()", TS).unwrap()));
    }
}
