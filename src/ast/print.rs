//! Formatting-preserving serialization.
//!
//! A node that still has the canonical form it was parsed with is emitted as
//! its original text. Everything else is regenerated with the document's
//! [`Style`], recursing into children that may themselves be verbatim.

use crate::ast::canonical;
use crate::ast::{
    ArrayExpr, Comments, Declaration, Declarator, Expr, ExprKind, ExportNamed, FunctionDecl,
    ImportDecl, ObjectExpr, ObjectMember, Origin, Program, Property, PropertyKey, Statement,
    StatementKind, VarDecl,
};
use crate::style::Style;

pub(crate) fn program(program: &Program, style: &Style) -> String {
    let mut printer = Printer::new(style);
    if let Some(hash_bang) = &program.hash_bang {
        printer.out.push_str(hash_bang);
        if !hash_bang.ends_with('\n') && !program.body.is_empty() {
            printer.out.push('\n');
        }
    }
    for (i, statement) in program.body.iter().enumerate() {
        match &statement.leading {
            Some(leading) if i == 0 || leading.starts_with(char::is_whitespace) => {
                printer.out.push_str(leading)
            }
            leading => {
                if i > 0 {
                    printer.out.push('\n');
                    if needs_blank_line(&program.body[i - 1], statement) {
                        printer.out.push('\n');
                    }
                }
                if let Some(leading) = leading {
                    printer.out.push_str(leading);
                }
            }
        }
        printer.statement(statement);
    }
    printer.out.push_str(&program.trailing);
    if program.final_newline && !printer.out.is_empty() && !printer.out.ends_with('\n') {
        printer.out.push('\n');
    }
    printer.out
}

pub(crate) fn statement(statement: &Statement, style: &Style) -> String {
    let mut printer = Printer::new(style);
    printer.statement(statement);
    printer.out
}

struct Printer<'a> {
    style: &'a Style,
    out: String,
}

impl<'a> Printer<'a> {
    fn new(style: &'a Style) -> Self {
        Self {
            style,
            out: String::new(),
        }
    }

    fn indent(&mut self, depth: usize) {
        for _ in 0..depth {
            self.out.push_str(&self.style.indent);
        }
    }

    /// Emit original text, shifting continuation lines to `depth`.
    fn verbatim(&mut self, origin: &Origin, depth: usize) {
        let target = self.style.indent.repeat(depth);
        if origin.indent == target || !origin.text.contains('\n') || origin.text.contains('`') {
            self.out.push_str(&origin.text);
            return;
        }
        for (i, line) in origin.text.split('\n').enumerate() {
            if i == 0 {
                self.out.push_str(line);
                continue;
            }
            self.out.push('\n');
            if line.trim().is_empty() {
                continue;
            }
            self.out.push_str(&target);
            self.out.push_str(line.strip_prefix(origin.indent.as_str()).unwrap_or(line));
        }
    }

    fn statement(&mut self, statement: &Statement) {
        if let Some(origin) = &statement.origin {
            if canonical::statement(statement) == origin.canonical {
                self.out.push_str(&origin.text);
                return;
            }
        }
        match &statement.kind {
            StatementKind::Import(decl) => self.import(decl),
            StatementKind::ExportDefault(expr) => {
                self.out.push_str("export default ");
                self.expr(expr, 0);
                self.out.push(';');
            }
            StatementKind::ExportNamed(named) => self.export_named(named),
            StatementKind::Var(decl) => self.var_decl(decl),
            StatementKind::Function(f) => self.function(f),
            StatementKind::Expression(expr) => {
                self.expr(expr, 0);
                self.out.push(';');
            }
            StatementKind::Raw(raw) => self.out.push_str(&raw.text),
        }
    }

    fn import(&mut self, decl: &ImportDecl) {
        self.out.push_str("import ");
        if decl.type_only {
            self.out.push_str("type ");
        }
        if !decl.is_side_effect() {
            let mut parts = Vec::new();
            if let Some(default) = &decl.default {
                parts.push(default.clone());
            }
            if let Some(ns) = &decl.namespace {
                parts.push(format!("* as {ns}"));
            }
            if !decl.named.is_empty() {
                let specifiers: Vec<String> = decl
                    .named
                    .iter()
                    .map(|s| {
                        let prefix = if s.type_only { "type " } else { "" };
                        if s.imported == s.local {
                            format!("{prefix}{}", s.local)
                        } else {
                            format!("{prefix}{} as {}", s.imported, s.local)
                        }
                    })
                    .collect();
                parts.push(format!("{{ {} }}", specifiers.join(", ")));
            } else if decl.braces {
                parts.push("{}".to_string());
            }
            self.out.push_str(&parts.join(", "));
            self.out.push_str(" from ");
        }
        let quoted = self.style.quote(&decl.source);
        self.out.push_str(&quoted);
        self.out.push(';');
    }

    fn export_named(&mut self, named: &ExportNamed) {
        self.out.push_str("export ");
        match &named.declaration {
            Some(Declaration::Var(decl)) => self.var_decl(decl),
            Some(Declaration::Function(f)) => self.function(f),
            None => {
                if named.type_only {
                    self.out.push_str("type ");
                }
                let specifiers: Vec<String> = named
                    .specifiers
                    .iter()
                    .map(|s| {
                        if s.local == s.exported {
                            s.local.clone()
                        } else {
                            format!("{} as {}", s.local, s.exported)
                        }
                    })
                    .collect();
                if specifiers.is_empty() {
                    self.out.push_str("{}");
                } else {
                    self.out.push_str("{ ");
                    self.out.push_str(&specifiers.join(", "));
                    self.out.push_str(" }");
                }
                if let Some(source) = &named.source {
                    self.out.push_str(" from ");
                    let quoted = self.style.quote(source);
                    self.out.push_str(&quoted);
                }
                self.out.push(';');
            }
        }
    }

    fn var_decl(&mut self, decl: &VarDecl) {
        self.out.push_str(decl.kind.as_str());
        self.out.push(' ');
        for (i, declarator) in decl.declarators.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.declarator(declarator);
        }
        self.out.push(';');
    }

    fn declarator(&mut self, declarator: &Declarator) {
        self.out.push_str(&declarator.name);
        if let Some(ty) = &declarator.type_annotation {
            self.out.push_str(": ");
            self.out.push_str(ty);
        }
        if let Some(init) = &declarator.init {
            self.out.push_str(" = ");
            self.expr(init, 0);
        }
    }

    fn function(&mut self, f: &FunctionDecl) {
        self.out.push_str(&f.head);
        self.out.push_str(&f.name);
        self.out.push_str(&f.tail);
    }

    fn expr(&mut self, expr: &Expr, depth: usize) {
        if let Some(origin) = &expr.origin {
            if canonical::expr(expr) == origin.canonical {
                self.verbatim(origin, depth);
                return;
            }
        }
        match &expr.kind {
            ExprKind::Identifier(name) => self.out.push_str(name),
            ExprKind::Str(inner) => {
                let quoted = self.style.quote(inner);
                self.out.push_str(&quoted);
            }
            ExprKind::Number(raw) => self.out.push_str(raw),
            ExprKind::Bool(value) => self.out.push_str(if *value { "true" } else { "false" }),
            ExprKind::Null => self.out.push_str("null"),
            ExprKind::Object(obj) => self.object(obj, expr.origin.as_ref(), depth),
            ExprKind::Array(arr) => self.array(arr, expr.origin.as_ref(), depth),
            ExprKind::Call(call) => {
                self.expr(&call.callee, depth);
                self.out.push('(');
                for (i, arg) in call.args.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.expr(arg, depth);
                }
                self.out.push(')');
            }
            ExprKind::Member(member) => {
                self.expr(&member.object, depth);
                self.out.push('.');
                self.out.push_str(&member.property);
            }
            ExprKind::Cast(cast) => {
                self.expr(&cast.expr, depth);
                self.out.push(' ');
                self.out.push_str(cast.op.as_str());
                self.out.push(' ');
                self.out.push_str(&cast.ty);
            }
            ExprKind::Raw(raw) => self.out.push_str(&raw.text),
        }
    }

    fn object(&mut self, obj: &ObjectExpr, origin: Option<&Origin>, depth: usize) {
        if obj.members.is_empty() && obj.dangling.is_empty() {
            self.out.push_str("{}");
            return;
        }
        let has_comments = !obj.dangling.is_empty()
            || obj.members.iter().any(|m| !member_comments(m).is_empty());
        let multiline = has_comments || origin.map_or(true, |o| o.text.contains('\n'));

        if !multiline {
            self.out.push_str("{ ");
            for (i, member) in obj.members.iter().enumerate() {
                if i > 0 {
                    self.out.push_str(", ");
                }
                self.member(member, depth);
            }
            self.out.push_str(" }");
            return;
        }

        self.out.push_str("{\n");
        let last = obj.members.len().saturating_sub(1);
        for (i, member) in obj.members.iter().enumerate() {
            let comments = member_comments(member);
            for comment in &comments.leading {
                self.indent(depth + 1);
                self.out.push_str(comment);
                self.out.push('\n');
            }
            self.indent(depth + 1);
            self.member(member, depth + 1);
            if i < last || obj.trailing_comma {
                self.out.push(',');
            }
            if let Some(trailing) = &comments.trailing {
                self.out.push(' ');
                self.out.push_str(trailing);
            }
            self.out.push('\n');
        }
        for comment in &obj.dangling {
            self.indent(depth + 1);
            self.out.push_str(comment);
            self.out.push('\n');
        }
        self.indent(depth);
        self.out.push('}');
    }

    fn member(&mut self, member: &ObjectMember, depth: usize) {
        match member {
            ObjectMember::Property(p) => self.property(p, depth),
            ObjectMember::Other(other) => self.verbatim(&other.origin, depth),
        }
    }

    fn property(&mut self, p: &Property, depth: usize) {
        if let Some(origin) = &p.origin {
            if canonical::property(p) == origin.canonical {
                self.verbatim(origin, depth);
                return;
            }
        }
        match &p.key {
            PropertyKey::Ident(name) | PropertyKey::Number(name) => self.out.push_str(name),
            PropertyKey::Str(name) => {
                let quoted = self.style.quote(name);
                self.out.push_str(&quoted);
            }
        }
        if p.is_shorthand() && p.value.comments.is_empty() {
            return;
        }
        self.out.push_str(": ");
        self.expr(&p.value, depth);
    }

    fn array(&mut self, arr: &ArrayExpr, origin: Option<&Origin>, depth: usize) {
        if arr.elements.is_empty() && arr.dangling.is_empty() {
            self.out.push_str("[]");
            return;
        }
        let has_comments =
            !arr.dangling.is_empty() || arr.elements.iter().any(|e| !e.comments.is_empty());
        let multiline = has_comments || origin.is_some_and(|o| o.text.contains('\n'));

        if !multiline {
            self.out.push('[');
            for (i, element) in arr.elements.iter().enumerate() {
                if i > 0 {
                    self.out.push_str(", ");
                }
                self.expr(element, depth);
            }
            self.out.push(']');
            return;
        }

        self.out.push_str("[\n");
        let last = arr.elements.len().saturating_sub(1);
        for (i, element) in arr.elements.iter().enumerate() {
            for comment in &element.comments.leading {
                self.indent(depth + 1);
                self.out.push_str(comment);
                self.out.push('\n');
            }
            self.indent(depth + 1);
            self.expr(element, depth + 1);
            if i < last || arr.trailing_comma {
                self.out.push(',');
            }
            if let Some(trailing) = &element.comments.trailing {
                self.out.push(' ');
                self.out.push_str(trailing);
            }
            self.out.push('\n');
        }
        for comment in &arr.dangling {
            self.indent(depth + 1);
            self.out.push_str(comment);
            self.out.push('\n');
        }
        self.indent(depth);
        self.out.push(']');
    }
}

/// Generated statements are separated by a blank line, except within a run
/// of imports.
fn needs_blank_line(previous: &Statement, next: &Statement) -> bool {
    !(matches!(previous.kind, StatementKind::Import(_))
        && matches!(next.kind, StatementKind::Import(_)))
}

fn member_comments(member: &ObjectMember) -> &Comments {
    match member {
        ObjectMember::Property(p) => &p.comments,
        ObjectMember::Other(other) => &other.comments,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Property, VarKind};
    use crate::style::QuoteStyle;

    fn expr(expr: &Expr, style: &Style) -> String {
        let mut printer = Printer::new(style);
        printer.expr(expr, 0);
        printer.out
    }

    fn two_space_single() -> Style {
        Style {
            indent: "  ".to_string(),
            quote: QuoteStyle::Single,
        }
    }

    #[test]
    fn new_objects_are_multiline() {
        let obj = Expr::object(vec![
            Property::new("kit", Expr::ident("kit")),
            Property::new("name", Expr::string("app")),
        ]);
        assert_eq!(expr(&obj, &two_space_single()), "{\n  kit,\n  name: 'app'\n}");
    }

    #[test]
    fn new_arrays_are_inline() {
        let arr = Expr::array(vec![Expr::call("a", vec![]), Expr::string("b")]);
        let style = Style {
            quote: QuoteStyle::Double,
            ..Style::default()
        };
        assert_eq!(expr(&arr, &style), "[a(), \"b\"]");
    }

    #[test]
    fn nested_objects_indent_per_depth() {
        let inner = Expr::object(vec![Property::new("a", Expr::number(1))]);
        let outer = Expr::call("defineConfig", vec![Expr::object(vec![Property::new("x", inner)])]);
        let statement = Statement::new(StatementKind::ExportDefault(outer));
        assert_eq!(
            super::statement(&statement, &two_space_single()),
            "export default defineConfig({\n  x: {\n    a: 1\n  }\n});"
        );
    }

    #[test]
    fn imports_and_declarations() {
        let mut decl = ImportDecl::new("@sveltejs/kit/hooks");
        decl.named.push(crate::ast::ImportSpecifier::new("sequence", "sequence"));
        let statement = Statement::new(StatementKind::Import(decl));
        assert_eq!(
            super::statement(&statement, &Style::default()),
            "import { sequence } from '@sveltejs/kit/hooks';"
        );

        let var = Statement::new(StatementKind::Var(VarDecl::single(
            VarKind::Let,
            "count",
            Expr::number(0),
        )));
        assert_eq!(super::statement(&var, &Style::default()), "let count = 0;");
    }
}
