//! Structural equality oracle.
//!
//! Two nodes are equal when their canonical text is equal. The canonical
//! text drops positions, whitespace and comments, normalizes quote
//! characters and number spelling, and expands shorthand properties, so
//! `{ a }` and `{ "a": a }` compare equal while `a()` and `b()` do not.

use crate::ast::{
    Declaration, Expr, ExprKind, ExportNamed, ImportDecl, ObjectMember, Property, PropertyKey,
    Statement, StatementKind, VarDecl,
};

/// Structural equality of two expressions.
pub fn equal(a: &Expr, b: &Expr) -> bool {
    expr(a) == expr(b)
}

pub fn expr(e: &Expr) -> String {
    let mut out = String::new();
    write_expr(e, &mut out);
    out
}

pub fn property(p: &Property) -> String {
    let mut out = String::new();
    write_property(p, &mut out);
    out
}

pub fn statement(s: &Statement) -> String {
    let mut out = String::new();
    match &s.kind {
        StatementKind::Import(decl) => write_import(decl, &mut out),
        StatementKind::ExportDefault(e) => {
            out.push_str("export default ");
            write_expr(e, &mut out);
            out.push(';');
        }
        StatementKind::ExportNamed(named) => write_export_named(named, &mut out),
        StatementKind::Var(decl) => write_var(decl, &mut out),
        StatementKind::Function(f) => {
            out.push_str(&f.head_canonical);
            out.push(' ');
            out.push_str(&f.name);
            out.push(' ');
            out.push_str(&f.tail_canonical);
        }
        StatementKind::Expression(e) => {
            write_expr(e, &mut out);
            out.push(';');
        }
        StatementKind::Raw(raw) => out.push_str(&raw.canonical),
    }
    out
}

fn write_expr(e: &Expr, out: &mut String) {
    match &e.kind {
        ExprKind::Identifier(name) => out.push_str(name),
        ExprKind::Str(inner) => write_string(inner, out),
        ExprKind::Number(raw) => out.push_str(&normalize_number(raw)),
        ExprKind::Bool(true) => out.push_str("true"),
        ExprKind::Bool(false) => out.push_str("false"),
        ExprKind::Null => out.push_str("null"),
        ExprKind::Object(obj) => {
            out.push('{');
            for (i, member) in obj.members.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                match member {
                    ObjectMember::Property(p) => write_property(p, out),
                    ObjectMember::Other(other) => out.push_str(&other.origin.canonical),
                }
            }
            out.push('}');
        }
        ExprKind::Array(arr) => {
            out.push('[');
            write_list(&arr.elements, out);
            out.push(']');
        }
        ExprKind::Call(call) => {
            write_expr(&call.callee, out);
            out.push('(');
            write_list(&call.args, out);
            out.push(')');
        }
        ExprKind::Member(member) => {
            write_expr(&member.object, out);
            out.push('.');
            out.push_str(&member.property);
        }
        ExprKind::Cast(cast) => {
            write_expr(&cast.expr, out);
            out.push(' ');
            out.push_str(cast.op.as_str());
            out.push(' ');
            out.push_str(&collapse_whitespace(&cast.ty));
        }
        ExprKind::Raw(raw) => out.push_str(&raw.canonical),
    }
}

fn write_list(items: &[Expr], out: &mut String) {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_expr(item, out);
    }
}

fn write_property(p: &Property, out: &mut String) {
    match &p.key {
        PropertyKey::Number(raw) => out.push_str(&normalize_number(raw)),
        key => out.push_str(key.name()),
    }
    out.push(':');
    write_expr(&p.value, out);
}

fn write_import(decl: &ImportDecl, out: &mut String) {
    out.push_str("import ");
    if decl.type_only {
        out.push_str("type ");
    }
    if !decl.is_side_effect() {
        let mut parts = Vec::new();
        if let Some(default) = &decl.default {
            parts.push(default.clone());
        }
        if let Some(ns) = &decl.namespace {
            parts.push(format!("* as {ns}"));
        }
        if decl.braces || !decl.named.is_empty() {
            let specifiers: Vec<String> = decl
                .named
                .iter()
                .map(|s| {
                    let prefix = if s.type_only { "type " } else { "" };
                    format!("{prefix}{} as {}", s.imported, s.local)
                })
                .collect();
            parts.push(format!("{{{}}}", specifiers.join(",")));
        }
        out.push_str(&parts.join(","));
        out.push_str(" from ");
    }
    write_string(&decl.source, out);
    out.push(';');
}

fn write_export_named(named: &ExportNamed, out: &mut String) {
    out.push_str("export ");
    match &named.declaration {
        Some(Declaration::Var(decl)) => write_var(decl, out),
        Some(Declaration::Function(f)) => {
            out.push_str(&f.head_canonical);
            out.push(' ');
            out.push_str(&f.name);
            out.push(' ');
            out.push_str(&f.tail_canonical);
        }
        None => {
            if named.type_only {
                out.push_str("type ");
            }
            let specifiers: Vec<String> = named
                .specifiers
                .iter()
                .map(|s| format!("{} as {}", s.local, s.exported))
                .collect();
            out.push('{');
            out.push_str(&specifiers.join(","));
            out.push('}');
            if let Some(source) = &named.source {
                out.push_str(" from ");
                write_string(source, out);
            }
            out.push(';');
        }
    }
}

fn write_var(decl: &VarDecl, out: &mut String) {
    out.push_str(decl.kind.as_str());
    out.push(' ');
    for (i, d) in decl.declarators.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&d.name);
        if let Some(ty) = &d.type_annotation {
            out.push(':');
            out.push_str(&collapse_whitespace(ty));
        }
        if let Some(init) = &d.init {
            out.push('=');
            write_expr(init, out);
        }
    }
    out.push(';');
}

fn write_string(inner: &str, out: &mut String) {
    out.push('"');
    out.push_str(&normalize_string(inner));
    out.push('"');
}

/// String contents with quote escapes removed, so `'it\'s'` and `"it's"`
/// compare equal.
pub(crate) fn normalize_string(inner: &str) -> String {
    inner.replace("\\'", "'").replace("\\\"", "\"")
}

pub(crate) fn normalize_number(raw: &str) -> String {
    let digits = raw.replace('_', "");
    match digits.parse::<f64>() {
        Ok(value) => value.to_string(),
        Err(_) => digits.to_ascii_lowercase(),
    }
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expr;

    #[test]
    fn shorthand_equals_longhand() {
        let a = Expr::object(vec![Property::new("a", Expr::ident("a"))]);
        let b = Expr::object(vec![Property::new("a", Expr::ident("a"))]);
        assert!(equal(&a, &b));
        assert_eq!(expr(&a), "{a:a}");
    }

    #[test]
    fn quote_style_is_ignored() {
        let single = Expr::from(ExprKind::Str("it\\'s".to_string()));
        let double = Expr::from(ExprKind::Str("it's".to_string()));
        assert!(equal(&single, &double));
    }

    #[test]
    fn numbers_are_normalized() {
        assert_eq!(normalize_number("1_000"), "1000");
        assert_eq!(normalize_number("1.50"), "1.5");
        assert_eq!(normalize_number("0xFF"), "0xff");
    }

    #[test]
    fn different_calls_differ() {
        let a = Expr::call("a", vec![]);
        let b = Expr::call("b", vec![]);
        assert!(!equal(&a, &b));
        assert!(equal(&a, &Expr::call("a", vec![])));
    }
}
