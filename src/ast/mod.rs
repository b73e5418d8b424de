//! Owned, mutable syntax tree for JavaScript and TypeScript modules.
//!
//! The tree only models the constructs the mutation primitives need
//! (imports, exports, variable declarations, object/array literals, calls).
//! Everything else is kept as a [`Raw`] node that carries its source text.
//!
//! Parsed nodes remember their original text in an [`Origin`]. The printer
//! emits that text verbatim as long as the node is still structurally equal
//! to what was parsed, so untouched regions keep their exact formatting and
//! comments.

pub mod canonical;
pub(crate) mod print;

/// Original source of a parsed node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Origin {
    /// Verbatim source text of the node
    pub(crate) text: String,
    /// Canonical form at parse time
    pub(crate) canonical: String,
    /// Leading whitespace of the line the node starts on
    pub(crate) indent: String,
}

/// Comments attached to a list item (object member, array element).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comments {
    pub leading: Vec<String>,
    pub trailing: Option<String>,
}

impl Comments {
    pub fn is_empty(&self) -> bool {
        self.leading.is_empty() && self.trailing.is_none()
    }
}

/// Index of an expression slot inside a [`Program`].
///
/// Lookups hand these out instead of references so callers can resolve a
/// node, mutate unrelated parts of the program, and come back to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprLocation {
    /// The value of `export default <expr>`
    DefaultExport { statement: usize },
    /// The initializer of a top-level (possibly exported) variable declarator
    Initializer { statement: usize, declarator: usize },
}

/// A parsed module: the unit of mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub body: Vec<Statement>,
    /// `#!` line with its newline; always printed first
    pub(crate) hash_bang: Option<String>,
    pub(crate) trailing: String,
    pub(crate) final_newline: bool,
}

impl Default for Program {
    fn default() -> Self {
        Self {
            body: Vec::new(),
            hash_bang: None,
            trailing: String::new(),
            final_newline: true,
        }
    }
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a statement at the end of the module.
    pub fn push(&mut self, statement: Statement) -> usize {
        self.body.push(statement);
        self.body.len() - 1
    }

    /// Insert a statement at the very top of the module.
    pub fn prepend(&mut self, statement: Statement) {
        self.body.insert(0, statement);
    }

    /// Insert a statement right after the leading block of imports.
    pub fn insert_after_imports(&mut self, statement: Statement) -> usize {
        let index = self
            .body
            .iter()
            .take_while(|s| matches!(s.kind, StatementKind::Import(_)))
            .count();
        self.body.insert(index, statement);
        index
    }

    pub fn imports(&self) -> impl Iterator<Item = &ImportDecl> {
        self.body.iter().filter_map(|s| match &s.kind {
            StatementKind::Import(decl) => Some(decl),
            _ => None,
        })
    }

    /// Locate a top-level variable declarator, exported or not.
    pub fn find_declarator(&self, name: &str) -> Option<(usize, usize)> {
        self.body.iter().enumerate().find_map(|(i, statement)| {
            let decl = statement.var_decl()?;
            let j = decl.declarators.iter().position(|d| d.name == name)?;
            Some((i, j))
        })
    }

    /// Locate a top-level function declaration, exported or not.
    pub fn find_function(&self, name: &str) -> Option<usize> {
        self.body
            .iter()
            .position(|statement| statement.function_decl().is_some_and(|f| f.name == name))
    }

    /// Whether any top-level declaration or import binds `name`.
    pub fn binds(&self, name: &str) -> bool {
        self.find_declarator(name).is_some()
            || self.find_function(name).is_some()
            || self.imports().any(|decl| decl.locals().any(|local| local == name))
    }

    pub fn expr_at(&self, location: ExprLocation) -> Option<&Expr> {
        match location {
            ExprLocation::DefaultExport { statement } => match &self.body.get(statement)?.kind {
                StatementKind::ExportDefault(expr) => Some(expr),
                _ => None,
            },
            ExprLocation::Initializer {
                statement,
                declarator,
            } => self
                .body
                .get(statement)?
                .var_decl()?
                .declarators
                .get(declarator)?
                .init
                .as_ref(),
        }
    }

    pub fn expr_at_mut(&mut self, location: ExprLocation) -> Option<&mut Expr> {
        match location {
            ExprLocation::DefaultExport { statement } => {
                match &mut self.body.get_mut(statement)?.kind {
                    StatementKind::ExportDefault(expr) => Some(expr),
                    _ => None,
                }
            }
            ExprLocation::Initializer {
                statement,
                declarator,
            } => self
                .body
                .get_mut(statement)?
                .var_decl_mut()?
                .declarators
                .get_mut(declarator)?
                .init
                .as_mut(),
        }
    }
}

/// A top-level statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    /// Source text between the previous statement and this one
    pub(crate) leading: Option<String>,
    pub(crate) origin: Option<Origin>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    Import(ImportDecl),
    ExportDefault(Expr),
    ExportNamed(ExportNamed),
    Var(VarDecl),
    Function(FunctionDecl),
    Expression(Expr),
    Raw(Raw),
}

impl Statement {
    pub fn new(kind: StatementKind) -> Self {
        Self {
            kind,
            leading: None,
            origin: None,
        }
    }

    /// The variable declaration of `const x = ...` or `export const x = ...`.
    pub fn var_decl(&self) -> Option<&VarDecl> {
        match &self.kind {
            StatementKind::Var(decl) => Some(decl),
            StatementKind::ExportNamed(ExportNamed {
                declaration: Some(Declaration::Var(decl)),
                ..
            }) => Some(decl),
            _ => None,
        }
    }

    pub fn var_decl_mut(&mut self) -> Option<&mut VarDecl> {
        match &mut self.kind {
            StatementKind::Var(decl) => Some(decl),
            StatementKind::ExportNamed(ExportNamed {
                declaration: Some(Declaration::Var(decl)),
                ..
            }) => Some(decl),
            _ => None,
        }
    }

    pub fn function_decl(&self) -> Option<&FunctionDecl> {
        match &self.kind {
            StatementKind::Function(f) => Some(f),
            StatementKind::ExportNamed(ExportNamed {
                declaration: Some(Declaration::Function(f)),
                ..
            }) => Some(f),
            _ => None,
        }
    }

    pub fn function_decl_mut(&mut self) -> Option<&mut FunctionDecl> {
        match &mut self.kind {
            StatementKind::Function(f) => Some(f),
            StatementKind::ExportNamed(ExportNamed {
                declaration: Some(Declaration::Function(f)),
                ..
            }) => Some(f),
            _ => None,
        }
    }

    /// Drop layout information so the statement is printed with the
    /// document's inferred style.
    pub(crate) fn forget_layout(&mut self) {
        self.leading = None;
        match &mut self.kind {
            StatementKind::Raw(_) | StatementKind::Function(_) => return,
            StatementKind::Import(_) => {}
            StatementKind::ExportDefault(expr) | StatementKind::Expression(expr) => {
                expr.forget_layout()
            }
            StatementKind::ExportNamed(named) => {
                if let Some(Declaration::Var(decl)) = &mut named.declaration {
                    decl.forget_layout();
                }
            }
            StatementKind::Var(decl) => decl.forget_layout(),
        }
        self.origin = None;
    }
}

/// `import ... from '<source>'`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportDecl {
    /// Module specifier, as written between the quotes
    pub source: String,
    pub type_only: bool,
    pub default: Option<String>,
    pub namespace: Option<String>,
    pub named: Vec<ImportSpecifier>,
    /// `import {} from 'x'` keeps its braces
    pub braces: bool,
}

impl ImportDecl {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    /// `import 'x'`
    pub fn is_side_effect(&self) -> bool {
        self.default.is_none() && self.namespace.is_none() && self.named.is_empty() && !self.braces
    }

    /// All local bindings introduced by this declaration.
    pub fn locals(&self) -> impl Iterator<Item = &str> {
        self.default
            .as_deref()
            .into_iter()
            .chain(self.namespace.as_deref())
            .chain(self.named.iter().map(|s| s.local.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpecifier {
    pub imported: String,
    pub local: String,
    /// `import { type X }`
    pub type_only: bool,
}

impl ImportSpecifier {
    pub fn new(imported: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            imported: imported.into(),
            local: local.into(),
            type_only: false,
        }
    }
}

/// `export const x = ...`, `export function x() {}` or `export { a as b }`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportNamed {
    pub declaration: Option<Declaration>,
    pub specifiers: Vec<ExportSpecifier>,
    /// Re-export source (`export { x } from './y'`)
    pub source: Option<String>,
    pub type_only: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    Var(VarDecl),
    Function(FunctionDecl),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSpecifier {
    pub local: String,
    pub exported: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Const,
    Let,
    Var,
}

impl VarKind {
    pub fn as_str(self) -> &'static str {
        match self {
            VarKind::Const => "const",
            VarKind::Let => "let",
            VarKind::Var => "var",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub kind: VarKind,
    pub declarators: Vec<Declarator>,
}

impl VarDecl {
    pub fn single(kind: VarKind, name: impl Into<String>, init: Expr) -> Self {
        Self {
            kind,
            declarators: vec![Declarator {
                name: name.into(),
                type_annotation: None,
                init: Some(init),
            }],
        }
    }

    fn forget_layout(&mut self) {
        for declarator in &mut self.declarators {
            if let Some(init) = &mut declarator.init {
                init.forget_layout();
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declarator {
    pub name: String,
    /// Type annotation without the leading colon
    pub type_annotation: Option<String>,
    pub init: Option<Expr>,
}

/// A function declaration. Only the name is modelled; the rest is kept as
/// source text on either side of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDecl {
    pub name: String,
    pub(crate) head: String,
    pub(crate) tail: String,
    pub(crate) head_canonical: String,
    pub(crate) tail_canonical: String,
}

/// Opaque construct kept as source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raw {
    pub text: String,
    pub(crate) canonical: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub(crate) comments: Comments,
    pub(crate) origin: Option<Origin>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Identifier(String),
    /// String literal contents, as written between the quotes
    Str(String),
    Number(String),
    Bool(bool),
    Null,
    Object(ObjectExpr),
    Array(ArrayExpr),
    Call(CallExpr),
    Member(MemberExpr),
    Cast(CastExpr),
    Raw(Raw),
}

impl From<ExprKind> for Expr {
    fn from(kind: ExprKind) -> Self {
        Self {
            kind,
            comments: Comments::default(),
            origin: None,
        }
    }
}

impl Expr {
    pub fn ident(name: impl Into<String>) -> Self {
        ExprKind::Identifier(name.into()).into()
    }

    /// A string literal holding `value`.
    pub fn string(value: &str) -> Self {
        let mut inner = String::with_capacity(value.len());
        for c in value.chars() {
            match c {
                '\\' => inner.push_str("\\\\"),
                '\n' => inner.push_str("\\n"),
                '\r' => inner.push_str("\\r"),
                '\t' => inner.push_str("\\t"),
                c => inner.push(c),
            }
        }
        ExprKind::Str(inner).into()
    }

    pub fn number(value: impl std::fmt::Display) -> Self {
        ExprKind::Number(value.to_string()).into()
    }

    pub fn bool(value: bool) -> Self {
        ExprKind::Bool(value).into()
    }

    pub fn null() -> Self {
        ExprKind::Null.into()
    }

    pub fn object(properties: Vec<Property>) -> Self {
        ExprKind::Object(ObjectExpr {
            members: properties.into_iter().map(ObjectMember::Property).collect(),
            ..ObjectExpr::default()
        })
        .into()
    }

    pub fn array(elements: Vec<Expr>) -> Self {
        ExprKind::Array(ArrayExpr {
            elements,
            ..ArrayExpr::default()
        })
        .into()
    }

    /// `callee(args...)` where `callee` is a plain identifier.
    pub fn call(callee: impl Into<String>, args: Vec<Expr>) -> Self {
        ExprKind::Call(CallExpr {
            callee: Box::new(Expr::ident(callee)),
            args,
        })
        .into()
    }

    pub fn member(object: Expr, property: impl Into<String>) -> Self {
        ExprKind::Member(MemberExpr {
            object: Box::new(object),
            property: property.into(),
        })
        .into()
    }

    pub fn as_ident(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Identifier(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectExpr> {
        match &self.kind {
            ExprKind::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut ObjectExpr> {
        match &mut self.kind {
            ExprKind::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayExpr> {
        match &self.kind {
            ExprKind::Array(arr) => Some(arr),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut ArrayExpr> {
        match &mut self.kind {
            ExprKind::Array(arr) => Some(arr),
            _ => None,
        }
    }

    pub fn as_call(&self) -> Option<&CallExpr> {
        match &self.kind {
            ExprKind::Call(call) => Some(call),
            _ => None,
        }
    }

    pub fn as_call_mut(&mut self) -> Option<&mut CallExpr> {
        match &mut self.kind {
            ExprKind::Call(call) => Some(call),
            _ => None,
        }
    }

    /// Short description used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            ExprKind::Identifier(_) => "identifier",
            ExprKind::Str(_) => "string literal",
            ExprKind::Number(_) => "number literal",
            ExprKind::Bool(_) => "boolean literal",
            ExprKind::Null => "null",
            ExprKind::Object(_) => "object literal",
            ExprKind::Array(_) => "array literal",
            ExprKind::Call(_) => "call expression",
            ExprKind::Member(_) => "member expression",
            ExprKind::Cast(_) => "type assertion",
            ExprKind::Raw(_) => "expression",
        }
    }

    /// Whether this is a literal that array dedup compares by value.
    pub fn is_literal(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Str(_) | ExprKind::Number(_) | ExprKind::Bool(_) | ExprKind::Null
        )
    }

    pub(crate) fn forget_layout(&mut self) {
        if matches!(self.kind, ExprKind::Raw(_)) {
            return;
        }
        self.origin = None;
        match &mut self.kind {
            ExprKind::Object(obj) => {
                for member in &mut obj.members {
                    if let ObjectMember::Property(p) = member {
                        p.origin = None;
                        p.value.forget_layout();
                    }
                }
            }
            ExprKind::Array(arr) => arr.elements.iter_mut().for_each(Expr::forget_layout),
            ExprKind::Call(call) => {
                call.callee.forget_layout();
                call.args.iter_mut().for_each(Expr::forget_layout);
            }
            ExprKind::Member(member) => member.object.forget_layout(),
            ExprKind::Cast(cast) => cast.expr.forget_layout(),
            _ => {}
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectExpr {
    pub members: Vec<ObjectMember>,
    pub(crate) trailing_comma: bool,
    /// Comments after the last member
    pub(crate) dangling: Vec<String>,
}

impl ObjectExpr {
    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.members.iter().filter_map(|m| match m {
            ObjectMember::Property(p) => Some(p),
            ObjectMember::Other(_) => None,
        })
    }

    pub fn get(&self, name: &str) -> Option<&Property> {
        self.properties().find(|p| p.key.name() == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Property> {
        self.members.iter_mut().find_map(|m| match m {
            ObjectMember::Property(p) if p.key.name() == name => Some(p),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectMember {
    Property(Property),
    /// Spread, method or computed member kept as source text
    Other(OtherMember),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OtherMember {
    pub(crate) origin: Origin,
    pub(crate) comments: Comments,
}

impl OtherMember {
    pub fn text(&self) -> &str {
        &self.origin.text
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub key: PropertyKey,
    pub value: Expr,
    pub(crate) comments: Comments,
    pub(crate) origin: Option<Origin>,
}

impl Property {
    /// `name: value`, quoting the key when it is not a valid identifier.
    pub fn new(name: &str, value: Expr) -> Self {
        let key = if is_identifier(name) {
            PropertyKey::Ident(name.to_string())
        } else {
            PropertyKey::Str(name.to_string())
        };
        Self {
            key,
            value,
            comments: Comments::default(),
            origin: None,
        }
    }

    /// Printed as `{ name }` when the value is the identifier `name`.
    pub fn is_shorthand(&self) -> bool {
        match (&self.key, &self.value.kind) {
            (PropertyKey::Ident(key), ExprKind::Identifier(value)) => key == value,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyKey {
    Ident(String),
    Str(String),
    Number(String),
}

impl PropertyKey {
    pub fn name(&self) -> &str {
        match self {
            PropertyKey::Ident(name) | PropertyKey::Str(name) | PropertyKey::Number(name) => name,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArrayExpr {
    pub elements: Vec<Expr>,
    pub(crate) trailing_comma: bool,
    pub(crate) dangling: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    pub callee: Box<Expr>,
    pub args: Vec<Expr>,
}

impl CallExpr {
    /// Whether the callee is the plain identifier `name`.
    pub fn is_call_to(&self, name: &str) -> bool {
        self.callee.as_ident() == Some(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberExpr {
    pub object: Box<Expr>,
    pub property: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastOp {
    Satisfies,
    As,
}

impl CastOp {
    pub fn as_str(self) -> &'static str {
        match self {
            CastOp::Satisfies => "satisfies",
            CastOp::As => "as",
        }
    }
}

/// `expr satisfies T` / `expr as T`
#[derive(Debug, Clone, PartialEq)]
pub struct CastExpr {
    pub expr: Box<Expr>,
    pub op: CastOp,
    pub ty: String,
}

/// Whether `name` can be written as a bare identifier.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_rules() {
        assert!(is_identifier("plugins"));
        assert!(is_identifier("$lib"));
        assert!(is_identifier("_x1"));
        assert!(!is_identifier("1x"));
        assert!(!is_identifier("a-b"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn string_builder_escapes() {
        let expr = Expr::string("a\\b\nc");
        assert_eq!(expr.kind, ExprKind::Str("a\\\\b\\nc".to_string()));
    }

    #[test]
    fn property_key_quoting() {
        assert!(matches!(Property::new("kit", Expr::null()).key, PropertyKey::Ident(_)));
        assert!(matches!(Property::new("a-b", Expr::null()).key, PropertyKey::Str(_)));
        assert!(Property::new("x", Expr::ident("x")).is_shorthand());
        assert!(!Property::new("x", Expr::ident("y")).is_shorthand());
    }

    #[test]
    fn locations_resolve_initializers() {
        let mut program = Program::new();
        program.push(Statement::new(StatementKind::Var(VarDecl::single(
            VarKind::Const,
            "config",
            Expr::object(vec![]),
        ))));
        program.push(Statement::new(StatementKind::ExportDefault(Expr::ident("config"))));

        assert_eq!(program.find_declarator("config"), Some((0, 0)));
        let loc = ExprLocation::Initializer {
            statement: 0,
            declarator: 0,
        };
        assert!(program.expr_at(loc).and_then(Expr::as_object).is_some());
        let default = ExprLocation::DefaultExport { statement: 1 };
        assert_eq!(program.expr_at(default).and_then(Expr::as_ident), Some("config"));
        assert!(program.expr_at(ExprLocation::DefaultExport { statement: 0 }).is_none());
    }
}
