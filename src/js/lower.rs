//! Lowering of tree-sitter syntax trees into the owned [`crate::ast`] model.
//!
//! Constructs the mutation primitives work on are lowered structurally; the
//! rest become [`Raw`] nodes holding their source text and a canonical token
//! string. Every lowered node records an [`Origin`] so it can be printed
//! verbatim while unchanged.

use crate::ast::canonical::{self, normalize_number, normalize_string};
use crate::ast::{
    ArrayExpr, CallExpr, CastExpr, CastOp, Comments, Declaration, Declarator, ExportNamed,
    ExportSpecifier, Expr, ExprKind, FunctionDecl, ImportDecl, ImportSpecifier, MemberExpr,
    ObjectExpr, ObjectMember, Origin, OtherMember, Program, Property, PropertyKey, Raw,
    Statement, StatementKind, VarDecl, VarKind,
};
use crate::js::errors::ParseError;
use crate::js::parser::Dialect;
use crate::js::validator::parse_checked;
use crate::style::Style;
use tree_sitter::Node;

const SNIPPET_BINDING: &str = "__snippet__";

/// Parse a whole module.
///
/// Fails when the source contains syntax errors; a module that does not
/// parse cleanly is never mutated.
pub fn parse_program(source: &str, dialect: Dialect) -> Result<Program, ParseError> {
    let tree = parse_checked(source, dialect)?;
    Ok(Lowerer { source }.program(tree.root_node()))
}

/// Parse a whole module and infer its formatting style from the same tree.
pub(crate) fn parse_with_style(source: &str, dialect: Dialect) -> Result<(Program, Style), ParseError> {
    let tree = parse_checked(source, dialect)?;
    let style = Style::infer(source, &tree);
    Ok((Lowerer { source }.program(tree.root_node()), style))
}

/// Parse a single expression snippet, e.g. `sveltekit()` or an arrow
/// function. The result carries no layout and is printed in the style of
/// the document it is inserted into.
pub fn parse_expression(snippet: &str, dialect: Dialect) -> Result<Expr, ParseError> {
    let wrapped = format!("const {SNIPPET_BINDING} = {snippet};");
    let invalid = || ParseError::InvalidSnippet {
        expected: "expression",
        snippet: snippet.to_string(),
    };
    let tree = parse_checked(&wrapped, dialect).map_err(|_| invalid())?;
    let program = Lowerer { source: &wrapped }.program(tree.root_node());

    let [statement] = program.body.as_slice() else {
        return Err(invalid());
    };
    let decl = statement.var_decl().ok_or_else(invalid)?;
    let [declarator] = decl.declarators.as_slice() else {
        return Err(invalid());
    };
    if declarator.name != SNIPPET_BINDING {
        return Err(invalid());
    }
    let mut expr = declarator.init.clone().ok_or_else(invalid)?;
    expr.forget_layout();
    Ok(expr)
}

/// Parse one or more top-level statements.
pub fn parse_statements(snippet: &str, dialect: Dialect) -> Result<Vec<Statement>, ParseError> {
    let tree = parse_checked(snippet, dialect).map_err(|_| ParseError::InvalidSnippet {
        expected: "statement list",
        snippet: snippet.to_string(),
    })?;
    let program = Lowerer { source: snippet }.program(tree.root_node());
    let mut statements = program.body;
    for statement in &mut statements {
        statement.forget_layout();
    }
    Ok(statements)
}

struct Lowerer<'s> {
    source: &'s str,
}

impl<'s> Lowerer<'s> {
    fn text(&self, node: Node<'_>) -> &'s str {
        &self.source[node.byte_range()]
    }

    /// Leading whitespace of the line `node` starts on.
    fn line_indent(&self, node: Node<'_>) -> String {
        let start = node.start_byte();
        let line_start = self.source[..start].rfind('\n').map_or(0, |i| i + 1);
        self.source[line_start..]
            .chars()
            .take_while(|c| *c == ' ' || *c == '\t')
            .collect()
    }

    fn origin(&self, node: Node<'_>, canonical: String) -> Origin {
        Origin {
            text: self.text(node).to_string(),
            canonical,
            indent: self.line_indent(node),
        }
    }

    fn raw(&self, node: Node<'_>) -> Raw {
        Raw {
            text: self.text(node).to_string(),
            canonical: self.tokens(node, node.start_byte(), node.end_byte()),
        }
    }

    /// Canonical token string of the leaves of `node` within `from..to`.
    fn tokens(&self, node: Node<'_>, from: usize, to: usize) -> String {
        let mut out = Vec::new();
        self.collect_tokens(node, from, to, &mut out);
        out.join(" ")
    }

    fn collect_tokens(&self, node: Node<'_>, from: usize, to: usize, out: &mut Vec<String>) {
        if node.end_byte() <= from || node.start_byte() >= to {
            return;
        }
        match node.kind() {
            "comment" | ";" => {}
            "string" => out.push(format!("\"{}\"", normalize_string(string_inner(self.text(node))))),
            "number" => out.push(normalize_number(self.text(node))),
            "template_string" => out.push(self.text(node).to_string()),
            _ if node.child_count() == 0 => {
                let text = self.text(node);
                if !text.is_empty() {
                    out.push(text.to_string());
                }
            }
            _ => {
                let mut cursor = node.walk();
                for child in node.children(&mut cursor) {
                    self.collect_tokens(child, from, to, out);
                }
            }
        }
    }

    fn program(&self, root: Node<'_>) -> Program {
        let mut body = Vec::new();
        let mut previous_end = 0;
        let mut hash_bang = None;
        let mut cursor = root.walk();

        for node in root.named_children(&mut cursor) {
            if node.kind() == "hash_bang_line" && node.start_byte() == 0 {
                let end = self.source[node.end_byte()..]
                    .find('\n')
                    .map_or(self.source.len(), |i| node.end_byte() + i + 1);
                hash_bang = Some(self.source[..end].to_string());
                previous_end = end;
                continue;
            }
            if matches!(node.kind(), "comment" | "hash_bang_line") {
                continue;
            }
            let mut statement = self.statement(node);
            statement.leading = Some(self.source[previous_end..node.start_byte()].to_string());
            previous_end = node.end_byte();
            body.push(statement);
        }

        Program {
            body,
            hash_bang,
            trailing: self.source[previous_end..].to_string(),
            final_newline: self.source.is_empty() || self.source.ends_with('\n'),
        }
    }

    fn statement(&self, node: Node<'_>) -> Statement {
        let kind = self
            .statement_kind(node)
            .unwrap_or_else(|| StatementKind::Raw(self.raw(node)));
        let mut statement = Statement::new(kind);
        let canonical = canonical::statement(&statement);
        statement.origin = Some(self.origin(node, canonical));
        statement
    }

    fn statement_kind(&self, node: Node<'_>) -> Option<StatementKind> {
        match node.kind() {
            "import_statement" => self.import(node).map(StatementKind::Import),
            "export_statement" => self.export(node),
            "lexical_declaration" | "variable_declaration" => {
                self.var_decl(node).map(StatementKind::Var)
            }
            "function_declaration" | "generator_function_declaration" => {
                self.function(node).map(StatementKind::Function)
            }
            "expression_statement" => {
                let mut cursor = node.walk();
                let expr = node
                    .named_children(&mut cursor)
                    .find(|n| n.kind() != "comment")?;
                Some(StatementKind::Expression(self.expr(expr)))
            }
            _ => None,
        }
    }

    fn import(&self, node: Node<'_>) -> Option<ImportDecl> {
        let source = node.child_by_field_name("source")?;
        let mut decl = ImportDecl::new(string_inner(self.text(source)));

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "import" | "from" | ";" | "string" | "comment" => {}
                "type" if !child.is_named() => decl.type_only = true,
                "import_clause" => self.import_clause(child, &mut decl)?,
                // `typeof`, attributes, `import x = require()`
                _ => return None,
            }
        }
        Some(decl)
    }

    fn import_clause(&self, clause: Node<'_>, decl: &mut ImportDecl) -> Option<()> {
        let mut cursor = clause.walk();
        for child in clause.named_children(&mut cursor) {
            match child.kind() {
                "identifier" => decl.default = Some(self.text(child).to_string()),
                "namespace_import" => {
                    let mut inner = child.walk();
                    let local = child
                        .named_children(&mut inner)
                        .find(|n| n.kind() == "identifier")?;
                    decl.namespace = Some(self.text(local).to_string());
                }
                "named_imports" => {
                    decl.braces = true;
                    let mut inner = child.walk();
                    for specifier in child.named_children(&mut inner) {
                        match specifier.kind() {
                            "import_specifier" => decl.named.push(self.import_specifier(specifier)?),
                            "comment" => {}
                            _ => return None,
                        }
                    }
                }
                "comment" => {}
                _ => return None,
            }
        }
        Some(())
    }

    fn import_specifier(&self, node: Node<'_>) -> Option<ImportSpecifier> {
        let name = node.child_by_field_name("name")?;
        let imported = self.binding_name(name);
        let local = match node.child_by_field_name("alias") {
            Some(alias) => self.text(alias).to_string(),
            None => imported.clone(),
        };
        let mut specifier = ImportSpecifier::new(imported, local);

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "type" if !child.is_named() => specifier.type_only = true,
                "typeof" => return None,
                _ => {}
            }
        }
        Some(specifier)
    }

    /// Identifier or string module-export name.
    fn binding_name(&self, node: Node<'_>) -> String {
        let text = self.text(node);
        if node.kind() == "string" {
            string_inner(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn export(&self, node: Node<'_>) -> Option<StatementKind> {
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
        let is_default = children.iter().any(|c| !c.is_named() && c.kind() == "default");
        let type_only = children.iter().any(|c| !c.is_named() && c.kind() == "type");
        if children.iter().any(|c| c.kind() == "decorator") {
            return None;
        }

        if is_default {
            if let Some(value) = node.child_by_field_name("value") {
                return Some(StatementKind::ExportDefault(self.expr(value)));
            }
            let declaration = node.child_by_field_name("declaration")?;
            return Some(StatementKind::ExportDefault(self.raw_expr(declaration)));
        }

        if let Some(declaration) = node.child_by_field_name("declaration") {
            let declaration = match declaration.kind() {
                "lexical_declaration" | "variable_declaration" => {
                    Declaration::Var(self.var_decl(declaration)?)
                }
                "function_declaration" | "generator_function_declaration" => {
                    Declaration::Function(self.function(declaration)?)
                }
                _ => return None,
            };
            return Some(StatementKind::ExportNamed(ExportNamed {
                declaration: Some(declaration),
                ..ExportNamed::default()
            }));
        }

        let clause = children.iter().find(|c| c.kind() == "export_clause")?;
        let mut specifiers = Vec::new();
        let mut inner = clause.walk();
        for specifier in clause.named_children(&mut inner) {
            match specifier.kind() {
                "export_specifier" => {
                    let mut tokens = specifier.walk();
                    if specifier
                        .children(&mut tokens)
                        .any(|c| !c.is_named() && c.kind() == "type")
                    {
                        return None;
                    }
                    let local = self.binding_name(specifier.child_by_field_name("name")?);
                    let exported = match specifier.child_by_field_name("alias") {
                        Some(alias) => self.binding_name(alias),
                        None => local.clone(),
                    };
                    specifiers.push(ExportSpecifier { local, exported });
                }
                "comment" => {}
                _ => return None,
            }
        }

        Some(StatementKind::ExportNamed(ExportNamed {
            declaration: None,
            specifiers,
            source: node
                .child_by_field_name("source")
                .map(|s| string_inner(self.text(s)).to_string()),
            type_only,
        }))
    }

    fn var_decl(&self, node: Node<'_>) -> Option<VarDecl> {
        let kind = match node.kind() {
            "variable_declaration" => VarKind::Var,
            _ => match self.text(node.child_by_field_name("kind")?) {
                "const" => VarKind::Const,
                "let" => VarKind::Let,
                _ => return None,
            },
        };

        let mut declarators = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "variable_declarator" => declarators.push(self.declarator(child)?),
                "comment" => {}
                _ => return None,
            }
        }
        Some(VarDecl { kind, declarators })
    }

    fn declarator(&self, node: Node<'_>) -> Option<Declarator> {
        let name = node.child_by_field_name("name")?;
        if name.kind() != "identifier" {
            return None;
        }
        let mut cursor = node.walk();
        if node.children(&mut cursor).any(|c| c.kind() == "!") {
            return None;
        }
        let type_annotation = node.child_by_field_name("type").map(|ty| {
            self.text(ty)
                .trim_start_matches(':')
                .trim()
                .to_string()
        });
        Some(Declarator {
            name: self.text(name).to_string(),
            type_annotation,
            init: node.child_by_field_name("value").map(|v| self.expr(v)),
        })
    }

    fn function(&self, node: Node<'_>) -> Option<FunctionDecl> {
        let name = node.child_by_field_name("name")?;
        let (start, end) = (node.start_byte(), node.end_byte());
        Some(FunctionDecl {
            name: self.text(name).to_string(),
            head: self.source[start..name.start_byte()].to_string(),
            tail: self.source[name.end_byte()..end].to_string(),
            head_canonical: self.tokens(node, start, name.start_byte()),
            tail_canonical: self.tokens(node, name.end_byte(), end),
        })
    }

    fn raw_expr(&self, node: Node<'_>) -> Expr {
        let raw = self.raw(node);
        let canonical = raw.canonical.clone();
        let mut expr = Expr::from(ExprKind::Raw(raw));
        expr.origin = Some(self.origin(node, canonical));
        expr
    }

    fn expr(&self, node: Node<'_>) -> Expr {
        let Some(kind) = self.expr_kind(node) else {
            return self.raw_expr(node);
        };
        let mut expr = Expr::from(kind);
        let canonical = canonical::expr(&expr);
        expr.origin = Some(self.origin(node, canonical));
        expr
    }

    fn expr_kind(&self, node: Node<'_>) -> Option<ExprKind> {
        let text = self.text(node);
        let kind = match node.kind() {
            "identifier" | "undefined" => ExprKind::Identifier(text.to_string()),
            "string" => ExprKind::Str(string_inner(text).to_string()),
            "number" => ExprKind::Number(text.to_string()),
            "true" => ExprKind::Bool(true),
            "false" => ExprKind::Bool(false),
            "null" => ExprKind::Null,
            "object" => ExprKind::Object(self.object(node)),
            "array" => ExprKind::Array(self.array(node)?),
            "call_expression" => ExprKind::Call(self.call(node)?),
            "member_expression" => {
                let property = node.child_by_field_name("property")?;
                let mut cursor = node.walk();
                let optional = node.children(&mut cursor).any(|c| c.kind() == "optional_chain");
                if optional || property.kind() != "property_identifier" {
                    return None;
                }
                ExprKind::Member(MemberExpr {
                    object: Box::new(self.expr(node.child_by_field_name("object")?)),
                    property: self.text(property).to_string(),
                })
            }
            "satisfies_expression" | "as_expression" => {
                let mut cursor = node.walk();
                let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
                let op_index = children
                    .iter()
                    .position(|c| !c.is_named() && matches!(c.kind(), "satisfies" | "as"))?;
                let op = match children[op_index].kind() {
                    "satisfies" => CastOp::Satisfies,
                    _ => CastOp::As,
                };
                let inner = children[..op_index].iter().find(|c| c.is_named())?;
                let ty = self.source[children[op_index].end_byte()..node.end_byte()].trim();
                ExprKind::Cast(CastExpr {
                    expr: Box::new(self.expr(*inner)),
                    op,
                    ty: ty.to_string(),
                })
            }
            _ => return None,
        };
        Some(kind)
    }

    fn call(&self, node: Node<'_>) -> Option<CallExpr> {
        let function = node.child_by_field_name("function")?;
        let arguments = node.child_by_field_name("arguments")?;
        if arguments.kind() != "arguments" || node.child_by_field_name("type_arguments").is_some() {
            return None;
        }
        let mut cursor = node.walk();
        if node.children(&mut cursor).any(|c| c.kind() == "optional_chain") {
            return None;
        }

        let mut args = Vec::new();
        let mut inner = arguments.walk();
        for arg in arguments.named_children(&mut inner) {
            if arg.kind() == "comment" {
                // comments between arguments cannot be re-attached
                return None;
            }
            args.push(self.expr(arg));
        }
        Some(CallExpr {
            callee: Box::new(self.expr(function)),
            args,
        })
    }

    fn object(&self, node: Node<'_>) -> ObjectExpr {
        let mut obj = ObjectExpr::default();
        let mut list = ListComments::default();
        let mut cursor = node.walk();

        for child in node.children(&mut cursor) {
            match child.kind() {
                "{" | "}" => {}
                "," => list.comma(),
                "comment" => {
                    let text = self.text(child).to_string();
                    let row = child.start_position().row;
                    match obj.members.last_mut() {
                        Some(ObjectMember::Property(p)) if list.trails(row) => {
                            p.comments.trailing = Some(text)
                        }
                        Some(ObjectMember::Other(o)) if list.trails(row) => {
                            o.comments.trailing = Some(text)
                        }
                        _ => list.pending.push(text),
                    }
                }
                _ => {
                    let comments = list.member(child.end_position().row);
                    obj.members.push(self.object_member(child, comments));
                }
            }
        }

        obj.trailing_comma = list.trailing_comma;
        obj.dangling = list.pending;
        obj
    }

    fn object_member(&self, node: Node<'_>, comments: Comments) -> ObjectMember {
        let property = match node.kind() {
            "pair" => self.pair(node),
            "shorthand_property_identifier" => {
                let name = self.text(node);
                Some(Property::new(name, Expr::ident(name)))
            }
            _ => None,
        };

        match property {
            Some(mut p) => {
                p.comments = comments;
                let canonical = canonical::property(&p);
                p.origin = Some(self.origin(node, canonical));
                ObjectMember::Property(p)
            }
            None => {
                let raw = self.raw(node);
                ObjectMember::Other(OtherMember {
                    origin: self.origin(node, raw.canonical),
                    comments,
                })
            }
        }
    }

    fn pair(&self, node: Node<'_>) -> Option<Property> {
        let key = node.child_by_field_name("key")?;
        let value = node.child_by_field_name("value")?;
        let text = self.text(key);
        let key = match key.kind() {
            "property_identifier" => PropertyKey::Ident(text.to_string()),
            "string" => PropertyKey::Str(string_inner(text).to_string()),
            "number" => PropertyKey::Number(text.to_string()),
            _ => return None,
        };
        Some(Property {
            key,
            value: self.expr(value),
            comments: Comments::default(),
            origin: None,
        })
    }

    /// `None` for arrays with holes, which are kept raw.
    fn array(&self, node: Node<'_>) -> Option<ArrayExpr> {
        let mut arr = ArrayExpr::default();
        let mut list = ListComments::default();
        let mut expect_element = true;
        let mut cursor = node.walk();

        for child in node.children(&mut cursor) {
            match child.kind() {
                "[" | "]" => {}
                "," => {
                    if expect_element {
                        return None;
                    }
                    expect_element = true;
                    list.comma();
                }
                "comment" => {
                    let text = self.text(child).to_string();
                    let row = child.start_position().row;
                    match arr.elements.last_mut() {
                        Some(last) if list.trails(row) => last.comments.trailing = Some(text),
                        _ => list.pending.push(text),
                    }
                }
                _ => {
                    expect_element = false;
                    let comments = list.member(child.end_position().row);
                    let mut element = self.expr(child);
                    element.comments = comments;
                    arr.elements.push(element);
                }
            }
        }

        arr.trailing_comma = list.trailing_comma;
        arr.dangling = list.pending;
        Some(arr)
    }
}

/// Comment bookkeeping while walking the items of an object or array.
#[derive(Default)]
struct ListComments {
    /// Comments waiting for the next item
    pending: Vec<String>,
    /// End row of the last item, while its trailing slot is still free
    open_row: Option<usize>,
    trailing_comma: bool,
}

impl ListComments {
    fn comma(&mut self) {
        self.trailing_comma = true;
    }

    /// Start a new item and hand it the pending comments.
    fn member(&mut self, end_row: usize) -> Comments {
        self.open_row = Some(end_row);
        self.trailing_comma = false;
        Comments {
            leading: std::mem::take(&mut self.pending),
            trailing: None,
        }
    }

    /// Whether a comment on `row` trails the previous item. Claims the slot.
    fn trails(&mut self, row: usize) -> bool {
        let trails = self.open_row == Some(row) && self.pending.is_empty();
        if trails {
            self.open_row = None;
        }
        trails
    }
}

/// Contents of a string literal without its quotes.
fn string_inner(text: &str) -> &str {
    if text.len() >= 2 {
        &text[1..text.len() - 1]
    } else {
        text
    }
}
