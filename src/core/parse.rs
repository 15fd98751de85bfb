//! Tree-sitter parsing and lowering into the owned tree model.
//!
//! Strategy:
//! - Tree-sitter is read-only here; the lowered model owns everything the
//!   editors touch.
//! - Lowering is tolerant of grammar drift: any statement, member, parameter,
//!   or expression whose shape is not recognized falls back to verbatim raw
//!   text instead of failing the parse. Raw nodes re-emit untouched, so an
//!   unrecognized construct is preserved, just not editable.
//! - Decorators are accepted both as fields of their owner and as preceding
//!   siblings, covering the shapes different grammar versions produce.

use crate::core::lang;
use crate::errors::{Error, Result};
use crate::model::tree::{
    ClassDecl, ClassMember, Decorator, Expr, ExportCall, ImportClause, ImportDecl,
    ImportSpecifier, MethodMember, NamedParam, ObjectProp, Param, PropertyMember, SourceTree,
    StatementKind,
};
use tree_sitter::{Node, Parser};

/// Build a parser configured for TypeScript.
pub fn new_parser() -> Result<Parser> {
    let mut parser = Parser::new();
    parser
        .set_language(&lang::language())
        .map_err(|_| Error::TreeSitterLanguage)?;
    Ok(parser)
}

/// Parse one source text into a tree model.
#[tracing::instrument(level = "debug", skip_all, fields(bytes = code.len()))]
pub fn parse_source(code: &str) -> Result<SourceTree> {
    let mut parser = new_parser()?;
    parse_with(&mut parser, code)
}

/// Parse with a caller-owned parser; batch parsing reuses one instance.
pub fn parse_with(parser: &mut Parser, code: &str) -> Result<SourceTree> {
    let ts_tree = parser.parse(code, None).ok_or(Error::TreeSitterParse)?;
    Ok(lower_program(ts_tree.root_node(), code))
}

fn node_text<'a>(code: &'a str, n: Node) -> &'a str {
    n.utf8_text(code.as_bytes()).unwrap_or_default()
}

/// Content of a string literal node, quotes stripped, escapes as written.
fn string_content(code: &str, n: Node) -> String {
    let raw = node_text(code, n);
    if raw.len() >= 2 {
        raw[1..raw.len() - 1].to_string()
    } else {
        raw.to_string()
    }
}

fn has_token(n: Node, token: &str) -> bool {
    let mut cursor = n.walk();
    n.children(&mut cursor).any(|c| c.kind() == token)
}

/// A decorator seen as a standalone sibling, kept with its source text so a
/// failed owner lowering can still reconstruct the original statement.
struct PendingDecorator {
    deco: Decorator,
    text: String,
}

fn drain_pending(pending: &mut Vec<PendingDecorator>) -> (Vec<Decorator>, Vec<String>) {
    let drained: Vec<PendingDecorator> = pending.drain(..).collect();
    let texts = drained.iter().map(|p| p.text.clone()).collect();
    let decos = drained.into_iter().map(|p| p.deco).collect();
    (decos, texts)
}

fn raw_with_prefix(texts: &[String], body: &str) -> String {
    if texts.is_empty() {
        body.to_string()
    } else {
        let mut out = texts.join("\n");
        out.push('\n');
        out.push_str(body);
        out
    }
}

// -------- statements --------

fn lower_program(root: Node, code: &str) -> SourceTree {
    let mut tree = SourceTree::new();
    let mut pending: Vec<PendingDecorator> = Vec::new();
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        if child.kind() == "decorator" {
            pending.push(PendingDecorator {
                deco: lower_decorator(child, code),
                text: node_text(code, child).to_string(),
            });
            continue;
        }
        let (decos, texts) = drain_pending(&mut pending);
        let kind = lower_statement(child, code, decos)
            .unwrap_or_else(|| StatementKind::Raw(raw_with_prefix(&texts, node_text(code, child))));
        tree.push_statement(kind);
    }
    if !pending.is_empty() {
        let (_, texts) = drain_pending(&mut pending);
        tree.push_statement(StatementKind::Raw(texts.join("\n")));
    }
    tree
}

fn lower_statement(node: Node, code: &str, decos: Vec<Decorator>) -> Option<StatementKind> {
    match node.kind() {
        "import_statement" => lower_import(node, code),
        "class_declaration" | "abstract_class_declaration" => {
            lower_class(node, code, Vec::new(), decos).map(StatementKind::Class)
        }
        "export_statement" => lower_export(node, code, decos),
        _ => None,
    }
}

fn lower_import(node: Node, code: &str) -> Option<StatementKind> {
    // Type-only imports stay raw; rewriting them is not supported.
    if has_token(node, "type") {
        return None;
    }
    let source = node.child_by_field_name("source")?;
    let module = string_content(code, source);

    let mut cursor = node.walk();
    let clause_node = node
        .named_children(&mut cursor)
        .find(|c| c.kind() == "import_clause");
    let Some(clause_node) = clause_node else {
        return Some(StatementKind::Import(ImportDecl {
            module,
            clause: None,
        }));
    };

    let mut default_name = None;
    let mut named = None;
    let mut namespace = None;
    let mut cursor = clause_node.walk();
    for c in clause_node.named_children(&mut cursor) {
        match c.kind() {
            "identifier" => default_name = Some(node_text(code, c).to_string()),
            "named_imports" => named = Some(lower_named_imports(c, code)?),
            "namespace_import" => {
                let mut nc = c.walk();
                let ident = c.named_children(&mut nc).find(|n| n.kind() == "identifier")?;
                namespace = Some(node_text(code, ident).to_string());
            }
            _ => {}
        }
    }

    let clause = match (default_name, named, namespace) {
        (Some(name), None, None) => ImportClause::Default(name),
        (None, Some(specs), None) => ImportClause::Named(specs),
        (None, None, Some(name)) => ImportClause::Namespace(name),
        // Mixed clauses (`import d, { a } from`) stay raw.
        _ => return None,
    };
    Some(StatementKind::Import(ImportDecl {
        module,
        clause: Some(clause),
    }))
}

fn lower_named_imports(node: Node, code: &str) -> Option<Vec<ImportSpecifier>> {
    let mut specs = Vec::new();
    let mut cursor = node.walk();
    for c in node.named_children(&mut cursor) {
        match c.kind() {
            "import_specifier" => {
                if has_token(c, "type") {
                    return None;
                }
                let name = node_text(code, c.child_by_field_name("name")?).to_string();
                match c.child_by_field_name("alias") {
                    Some(alias) => {
                        specs.push(ImportSpecifier::aliased(name, node_text(code, alias)))
                    }
                    None => specs.push(ImportSpecifier::plain(name)),
                }
            }
            "comment" => {}
            _ => return None,
        }
    }
    Some(specs)
}

fn lower_export(node: Node, code: &str, mut decos: Vec<Decorator>) -> Option<StatementKind> {
    let mut cursor = node.walk();
    for c in node.named_children(&mut cursor) {
        if c.kind() == "decorator" {
            decos.push(lower_decorator(c, code));
        }
    }

    if let Some(decl) = node.child_by_field_name("declaration") {
        if matches!(
            decl.kind(),
            "class_declaration" | "abstract_class_declaration"
        ) {
            let mut modifiers = vec!["export".to_string()];
            if has_token(node, "default") {
                modifiers.push("default".to_string());
            }
            return lower_class(decl, code, modifiers, decos).map(StatementKind::Class);
        }
        return None;
    }

    // `export default callee(args…);`
    let value = node.child_by_field_name("value")?;
    if value.kind() != "call_expression" {
        return None;
    }
    let callee = value.child_by_field_name("function")?;
    if callee.kind() != "identifier" {
        return None;
    }
    let args_node = value.child_by_field_name("arguments")?;
    if args_node.kind() != "arguments" {
        return None;
    }
    Some(StatementKind::ExportCall(ExportCall {
        callee: node_text(code, callee).to_string(),
        args: lower_args(args_node, code),
    }))
}

// -------- classes --------

fn lower_class(
    node: Node,
    code: &str,
    wrapper_modifiers: Vec<String>,
    mut decorators: Vec<Decorator>,
) -> Option<ClassDecl> {
    let name_node = node.child_by_field_name("name")?;
    let body = node.child_by_field_name("body")?;

    let mut cursor = node.walk();
    for c in node.named_children(&mut cursor) {
        if c.kind() == "decorator" {
            decorators.push(lower_decorator(c, code));
        }
    }

    let mut modifiers = wrapper_modifiers;
    if node.kind() == "abstract_class_declaration" {
        modifiers.push("abstract".to_string());
    }

    let heritage_slice = code[name_node.end_byte()..body.start_byte()].trim();
    let heritage = if heritage_slice.is_empty() {
        None
    } else {
        Some(heritage_slice.to_string())
    };

    Some(ClassDecl {
        decorators,
        modifiers,
        name: node_text(code, name_node).to_string(),
        heritage,
        members: lower_class_body(body, code),
    })
}

fn lower_class_body(body: Node, code: &str) -> Vec<ClassMember> {
    let mut members = Vec::new();
    let mut pending: Vec<PendingDecorator> = Vec::new();
    let mut cursor = body.walk();
    for child in body.named_children(&mut cursor) {
        match child.kind() {
            "decorator" => pending.push(PendingDecorator {
                deco: lower_decorator(child, code),
                text: node_text(code, child).to_string(),
            }),
            // A comment between a decorator and its member must not flush
            // the pending decorators.
            "comment" => members.push(ClassMember::Raw(node_text(code, child).to_string())),
            "method_definition" => {
                let (decos, texts) = drain_pending(&mut pending);
                match lower_method(child, code, decos) {
                    Some(m) => members.push(ClassMember::Method(m)),
                    None => members.push(ClassMember::Raw(raw_with_prefix(
                        &texts,
                        node_text(code, child),
                    ))),
                }
            }
            "public_field_definition" | "field_definition" => {
                let (decos, texts) = drain_pending(&mut pending);
                match lower_property(child, code, decos) {
                    Some(p) => members.push(ClassMember::Property(p)),
                    None => members.push(ClassMember::Raw(raw_with_prefix(
                        &texts,
                        node_text(code, child),
                    ))),
                }
            }
            _ => {
                let (_, texts) = drain_pending(&mut pending);
                members.push(ClassMember::Raw(raw_with_prefix(
                    &texts,
                    node_text(code, child),
                )));
            }
        }
    }
    if !pending.is_empty() {
        let (_, texts) = drain_pending(&mut pending);
        members.push(ClassMember::Raw(texts.join("\n")));
    }
    members
}

fn lower_method(node: Node, code: &str, mut decos: Vec<Decorator>) -> Option<MethodMember> {
    let name_node = node.child_by_field_name("name")?;
    if !matches!(name_node.kind(), "property_identifier" | "identifier") {
        return None;
    }

    let mut cursor = node.walk();
    for c in node.named_children(&mut cursor) {
        if c.kind() == "decorator" {
            decos.push(lower_decorator(c, code));
        }
    }

    let mut modifiers = Vec::new();
    let mut cursor = node.walk();
    for c in node.children(&mut cursor) {
        if c.end_byte() > name_node.start_byte() {
            break;
        }
        if !matches!(c.kind(), "decorator" | "comment") {
            modifiers.push(node_text(code, c).to_string());
        }
    }

    let params_node = node.child_by_field_name("parameters")?;
    let body_node = node.child_by_field_name("body")?;

    Some(MethodMember {
        decorators: decos,
        modifiers,
        name: node_text(code, name_node).to_string(),
        params: lower_params(params_node, code),
        return_type: node
            .child_by_field_name("return_type")
            .map(|n| strip_colon(node_text(code, n))),
        body: lower_block(body_node, code),
    })
}

fn lower_params(node: Node, code: &str) -> Vec<Param> {
    let mut params = Vec::new();
    let mut cursor = node.walk();
    for c in node.named_children(&mut cursor) {
        match c.kind() {
            "required_parameter" => params.push(lower_param(c, code, false)),
            "optional_parameter" => params.push(lower_param(c, code, true)),
            "comment" => {}
            _ => params.push(Param::Raw(node_text(code, c).to_string())),
        }
    }
    params
}

fn lower_param(node: Node, code: &str, optional: bool) -> Param {
    let raw = || Param::Raw(node_text(code, node).to_string());
    let Some(pattern) = node.child_by_field_name("pattern") else {
        return raw();
    };
    if !matches!(pattern.kind(), "identifier" | "this") {
        return raw();
    }

    let mut decorators = Vec::new();
    let mut last_deco_end = node.start_byte();
    let mut cursor = node.walk();
    for c in node.named_children(&mut cursor) {
        if c.kind() == "decorator" && c.end_byte() <= pattern.start_byte() {
            decorators.push(lower_decorator(c, code));
            last_deco_end = c.end_byte();
        }
    }
    // Accessibility/readonly modifiers between the decorators and the name
    // (constructor parameter properties) are not modeled.
    if !code[last_deco_end..pattern.start_byte()].trim().is_empty() {
        return raw();
    }

    Param::Named(NamedParam {
        decorators,
        name: node_text(code, pattern).to_string(),
        optional,
        type_ann: node
            .child_by_field_name("type")
            .map(|n| strip_colon(node_text(code, n))),
        initializer: node
            .child_by_field_name("value")
            .map(|n| node_text(code, n).to_string()),
    })
}

fn lower_property(node: Node, code: &str, mut decos: Vec<Decorator>) -> Option<PropertyMember> {
    let name_node = node
        .child_by_field_name("name")
        .or_else(|| node.child_by_field_name("property"))?;
    if !matches!(name_node.kind(), "property_identifier" | "identifier") {
        return None;
    }

    let mut cursor = node.walk();
    for c in node.named_children(&mut cursor) {
        if c.kind() == "decorator" {
            decos.push(lower_decorator(c, code));
        }
    }

    let mut modifiers = Vec::new();
    let mut mark = None;
    let mut cursor = node.walk();
    for c in node.children(&mut cursor) {
        if c.end_byte() <= name_node.start_byte() {
            if !matches!(c.kind(), "decorator" | "comment") {
                modifiers.push(node_text(code, c).to_string());
            }
        } else if matches!(c.kind(), "?" | "!") {
            mark = node_text(code, c).chars().next();
        }
    }

    Some(PropertyMember {
        decorators: decos,
        modifiers,
        name: node_text(code, name_node).to_string(),
        mark,
        type_ann: node
            .child_by_field_name("type")
            .map(|n| strip_colon(node_text(code, n))),
        value: node.child_by_field_name("value").map(|n| lower_expr(n, code)),
    })
}

fn lower_block(node: Node, code: &str) -> Vec<String> {
    let mut stmts = Vec::new();
    let mut cursor = node.walk();
    for c in node.named_children(&mut cursor) {
        stmts.push(node_text(code, c).to_string());
    }
    stmts
}

// -------- decorators and expressions --------

/// Lowering a decorator never fails: unrecognized callee shapes keep the
/// source text (minus the `@`) as the name, which renders back verbatim.
fn lower_decorator(node: Node, code: &str) -> Decorator {
    if let Some(inner) = node.named_child(0) {
        if inner.kind() == "call_expression" {
            if let (Some(f), Some(args)) = (
                inner.child_by_field_name("function"),
                inner.child_by_field_name("arguments"),
            ) {
                if matches!(f.kind(), "identifier" | "member_expression")
                    && args.kind() == "arguments"
                {
                    return Decorator {
                        name: node_text(code, f).to_string(),
                        args: Some(lower_args(args, code)),
                    };
                }
            }
        }
    }
    Decorator {
        name: node_text(code, node)
            .trim_start_matches('@')
            .to_string(),
        args: None,
    }
}

fn lower_args(node: Node, code: &str) -> Vec<Expr> {
    let mut args = Vec::new();
    let mut cursor = node.walk();
    for c in node.named_children(&mut cursor) {
        if c.kind() == "comment" {
            continue;
        }
        args.push(lower_expr(c, code));
    }
    args
}

fn lower_expr(node: Node, code: &str) -> Expr {
    match node.kind() {
        "string" => Expr::String(string_content(code, node)),
        "number" => Expr::Number(node_text(code, node).to_string()),
        "true" => Expr::Bool(true),
        "false" => Expr::Bool(false),
        "null" => Expr::Null,
        "identifier" | "undefined" => Expr::Ident(node_text(code, node).to_string()),
        "call_expression" => lower_call(node, code),
        "array" => {
            let mut items = Vec::new();
            let mut cursor = node.walk();
            for c in node.named_children(&mut cursor) {
                if c.kind() == "comment" {
                    continue;
                }
                items.push(lower_expr(c, code));
            }
            Expr::Array(items)
        }
        "object" => lower_object(node, code),
        _ => Expr::Raw(node_text(code, node).to_string()),
    }
}

fn lower_call(node: Node, code: &str) -> Expr {
    let raw = || Expr::Raw(node_text(code, node).to_string());
    let (Some(f), Some(args)) = (
        node.child_by_field_name("function"),
        node.child_by_field_name("arguments"),
    ) else {
        return raw();
    };
    if f.kind() != "identifier" || args.kind() != "arguments" {
        return raw();
    }
    Expr::Call {
        callee: node_text(code, f).to_string(),
        args: lower_args(args, code),
    }
}

fn lower_object(node: Node, code: &str) -> Expr {
    let mut props = Vec::new();
    let mut cursor = node.walk();
    for c in node.named_children(&mut cursor) {
        match c.kind() {
            "comment" => {}
            "pair" => {
                let key = c.child_by_field_name("key");
                let value = c.child_by_field_name("value");
                match (key, value) {
                    (Some(k), Some(v))
                        if matches!(k.kind(), "property_identifier" | "string") =>
                    {
                        props.push(ObjectProp::Pair {
                            key: node_text(code, k).to_string(),
                            value: lower_expr(v, code),
                        });
                    }
                    _ => props.push(ObjectProp::Raw(node_text(code, c).to_string())),
                }
            }
            _ => props.push(ObjectProp::Raw(node_text(code, c).to_string())),
        }
    }
    Expr::Object(props)
}

fn strip_colon(s: &str) -> String {
    s.trim()
        .strip_prefix(':')
        .unwrap_or(s)
        .trim()
        .to_string()
}
