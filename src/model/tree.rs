//! Syntax-tree model: statements, imports, classes, members, expressions.
//!
//! Design:
//! - Every top-level statement carries a stable synthetic [`StatementId`],
//!   assigned at parse/insert time. Removal filters by id, so editors never
//!   compare node identity or tag foreign nodes with bookkeeping fields.
//! - Statements and class members the editors do not understand are kept as
//!   `Raw` verbatim text (comments included) and re-emitted untouched.
//! - Expressions model exactly the literal shapes decorator arguments use;
//!   anything else is an [`Expr::Raw`] escape hatch.

use serde::{Deserialize, Serialize};

/// Stable synthetic identifier of a top-level statement within one tree.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct StatementId(pub(crate) u32);

/// One parsed source file as an ordered list of top-level statements.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceTree {
    statements: Vec<Statement>,
    next_id: u32,
}

/// A top-level statement plus its stable id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statement {
    id: StatementId,
    pub kind: StatementKind,
}

/// Coarse statement taxonomy. Extend conservatively; unknown syntax stays `Raw`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    Import(ImportDecl),
    Class(ClassDecl),
    /// `export default callee(args…);` factory form.
    ExportCall(ExportCall),
    /// Verbatim statement or comment the engine does not model.
    Raw(String),
}

/// One import statement: module specifier plus optional binding clause.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportDecl {
    pub module: String,
    /// `None` for bare side-effect imports (`import 'x';`).
    pub clause: Option<ImportClause>,
}

/// The three binding shapes an import clause can take.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportClause {
    /// `import { a, b as c } from 'm';`
    Named(Vec<ImportSpecifier>),
    /// `import * as x from 'm';`
    Namespace(String),
    /// `import x from 'm';`
    Default(String),
}

/// One specifier of a named import.
///
/// `imported` is the origin name when the binding is aliased
/// (`{ imported as local }`); `None` means the local name is the origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSpecifier {
    pub imported: Option<String>,
    pub local: String,
}

impl ImportSpecifier {
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            imported: None,
            local: name.into(),
        }
    }

    pub fn aliased(imported: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            imported: Some(imported.into()),
            local: local.into(),
        }
    }

    /// The origin name: the symbol as exported by the module.
    pub fn origin(&self) -> &str {
        self.imported.as_deref().unwrap_or(&self.local)
    }
}

/// `export default callee(args…);`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportCall {
    pub callee: String,
    pub args: Vec<Expr>,
}

/// A class declaration with its decorators and members.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDecl {
    pub decorators: Vec<Decorator>,
    /// Leading modifier keywords in source order (`export`, `abstract`, …).
    pub modifiers: Vec<String>,
    pub name: String,
    /// Raw text between the class name and the body brace
    /// (type parameters, `extends`/`implements` clauses).
    pub heritage: Option<String>,
    pub members: Vec<ClassMember>,
}

impl ClassDecl {
    /// First decorator whose callee matches `name`.
    pub fn decorator(&self, name: &str) -> Option<&Decorator> {
        self.decorators.iter().find(|d| d.name == name)
    }

    pub fn decorator_mut(&mut self, name: &str) -> Option<&mut Decorator> {
        self.decorators.iter_mut().find(|d| d.name == name)
    }
}

/// `@Name` or `@Name(args…)`. `args: None` means the bare, call-less form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decorator {
    pub name: String,
    pub args: Option<Vec<Expr>>,
}

impl Decorator {
    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Self {
            name: name.into(),
            args: Some(args),
        }
    }
}

/// A class member; unknown shapes are carried verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassMember {
    Property(PropertyMember),
    Method(MethodMember),
    Raw(String),
}

/// A class property with optional decorators, type annotation, and initializer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyMember {
    pub decorators: Vec<Decorator>,
    pub modifiers: Vec<String>,
    pub name: String,
    /// `?` or `!` after the name, when present.
    pub mark: Option<char>,
    /// Type annotation text without the leading `:`.
    pub type_ann: Option<String>,
    pub value: Option<Expr>,
}

/// A class method. Body statements are raw text, one entry per statement,
/// which is also the granularity of idempotent body injection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodMember {
    pub decorators: Vec<Decorator>,
    pub modifiers: Vec<String>,
    pub name: String,
    pub params: Vec<Param>,
    /// Return type text without the leading `:`.
    pub return_type: Option<String>,
    pub body: Vec<String>,
}

impl MethodMember {
    pub fn is_async(&self) -> bool {
        self.modifiers.iter().any(|m| m == "async")
    }
}

/// A method parameter; non-identifier patterns are carried verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Param {
    Named(NamedParam),
    Raw(String),
}

impl Param {
    /// The binding name, when the parameter is a plain identifier.
    pub fn name(&self) -> Option<&str> {
        match self {
            Param::Named(p) => Some(&p.name),
            Param::Raw(_) => None,
        }
    }
}

/// A plain identifier parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedParam {
    pub decorators: Vec<Decorator>,
    pub name: String,
    pub optional: bool,
    /// Type annotation text without the leading `:`.
    pub type_ann: Option<String>,
    /// Default value expression text.
    pub initializer: Option<String>,
}

impl NamedParam {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            decorators: Vec::new(),
            name: name.into(),
            optional: false,
            type_ann: None,
            initializer: None,
        }
    }
}

/// Literal-shaped expression nodes, with a raw-text escape hatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    /// String content between the quotes, escapes kept as written.
    String(String),
    /// Numeric literal kept as raw text so `0x10` or `1_000` round-trip.
    Number(String),
    Bool(bool),
    Null,
    Ident(String),
    Call { callee: String, args: Vec<Expr> },
    Array(Vec<Expr>),
    Object(Vec<ObjectProp>),
    /// Verbatim expression text the engine does not model.
    Raw(String),
}

/// One property of an object literal; unknown shapes (spread, methods,
/// shorthand) are carried verbatim so the rest of the object stays editable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectProp {
    Pair { key: String, value: Expr },
    Raw(String),
}

impl SourceTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn statements_mut(&mut self) -> &mut [Statement] {
        &mut self.statements
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    fn fresh_id(&mut self) -> StatementId {
        let id = StatementId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Append a statement, returning its stable id.
    pub fn push_statement(&mut self, kind: StatementKind) -> StatementId {
        let id = self.fresh_id();
        self.statements.push(Statement { id, kind });
        id
    }

    /// Prepend a statement (new imports go to the top of the file).
    pub fn insert_statement_front(&mut self, kind: StatementKind) -> StatementId {
        let id = self.fresh_id();
        self.statements.insert(0, Statement { id, kind });
        id
    }

    /// Drop a statement by id; unknown ids are ignored.
    pub fn remove_statement(&mut self, id: StatementId) {
        self.statements.retain(|s| s.id != id);
    }

    pub fn statement(&self, id: StatementId) -> Option<&Statement> {
        self.statements.iter().find(|s| s.id == id)
    }

    pub fn statement_mut(&mut self, id: StatementId) -> Option<&mut Statement> {
        self.statements.iter_mut().find(|s| s.id == id)
    }
}

impl Statement {
    pub fn id(&self) -> StatementId {
        self.id
    }

    pub fn as_import(&self) -> Option<&ImportDecl> {
        match &self.kind {
            StatementKind::Import(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_import_mut(&mut self) -> Option<&mut ImportDecl> {
        match &mut self.kind {
            StatementKind::Import(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&ClassDecl> {
        match &self.kind {
            StatementKind::Class(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_class_mut(&mut self) -> Option<&mut ClassDecl> {
        match &mut self.kind {
            StatementKind::Class(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_export_call(&self) -> Option<&ExportCall> {
        match &self.kind {
            StatementKind::ExportCall(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_export_call_mut(&mut self) -> Option<&mut ExportCall> {
        match &mut self.kind {
            StatementKind::ExportCall(e) => Some(e),
            _ => None,
        }
    }
}
