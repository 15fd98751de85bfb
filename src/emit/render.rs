//! Deterministic renderer from the tree model back to TypeScript text.
//!
//! This is the normalizing formatter: the output shape depends only on the
//! model and [`RenderConfig`], never on the original file's whitespace.
//! Raw statements and members are re-indented to their target level but
//! otherwise emitted verbatim.

use crate::config::RenderConfig;
use crate::model::tree::{
    ClassDecl, ClassMember, Decorator, Expr, ImportClause, ImportDecl, MethodMember, ObjectProp,
    Param, PropertyMember, SourceTree, StatementKind,
};

/// Render a whole file. Statements are separated by single newlines, with a
/// blank line before every class declaration and between class members.
pub fn render_tree(tree: &SourceTree, cfg: &RenderConfig) -> String {
    let mut out = String::new();
    for (i, stmt) in tree.statements().iter().enumerate() {
        if i > 0 && matches!(stmt.kind, StatementKind::Class(_)) {
            out.push('\n');
        }
        out.push_str(&render_statement(&stmt.kind, cfg));
        out.push('\n');
    }
    if !cfg.trailing_newline {
        while out.ends_with('\n') {
            out.pop();
        }
    }
    out
}

pub fn render_statement(kind: &StatementKind, cfg: &RenderConfig) -> String {
    match kind {
        StatementKind::Import(import) => render_import(import, cfg),
        StatementKind::Class(class) => render_class(class, cfg),
        StatementKind::ExportCall(call) => format!(
            "export default {}({});",
            call.callee,
            render_args(&call.args, cfg, 0)
        ),
        StatementKind::Raw(text) => reindent(text, ""),
    }
}

pub fn render_import(import: &ImportDecl, cfg: &RenderConfig) -> String {
    let module = quoted(&import.module, cfg);
    match &import.clause {
        None => format!("import {module};"),
        Some(ImportClause::Namespace(local)) => {
            format!("import * as {local} from {module};")
        }
        Some(ImportClause::Default(local)) => format!("import {local} from {module};"),
        Some(ImportClause::Named(specs)) if specs.is_empty() => {
            format!("import {{}} from {module};")
        }
        Some(ImportClause::Named(specs)) => {
            let names = specs
                .iter()
                .map(|s| match &s.imported {
                    Some(imported) => format!("{} as {}", imported, s.local),
                    None => s.local.clone(),
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!("import {{ {names} }} from {module};")
        }
    }
}

fn render_class(class: &ClassDecl, cfg: &RenderConfig) -> String {
    let mut out = String::new();
    for deco in &class.decorators {
        out.push_str(&render_decorator(deco, cfg, 0));
        out.push('\n');
    }
    for m in &class.modifiers {
        out.push_str(m);
        out.push(' ');
    }
    out.push_str("class ");
    out.push_str(&class.name);
    if let Some(heritage) = &class.heritage {
        out.push(' ');
        out.push_str(heritage);
    }
    if class.members.is_empty() {
        out.push_str(" {}");
        return out;
    }
    out.push_str(" {\n");
    for (i, member) in class.members.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&render_member(member, cfg));
        out.push('\n');
    }
    out.push('}');
    out
}

fn render_member(member: &ClassMember, cfg: &RenderConfig) -> String {
    let indent = cfg.indent_unit();
    match member {
        ClassMember::Raw(text) => reindent(text, &indent),
        ClassMember::Property(prop) => render_property(prop, cfg),
        ClassMember::Method(method) => render_method(method, cfg),
    }
}

fn render_property(prop: &PropertyMember, cfg: &RenderConfig) -> String {
    let indent = cfg.indent_unit();
    let mut out = String::new();
    for deco in &prop.decorators {
        out.push_str(&indent);
        out.push_str(&render_decorator(deco, cfg, 1));
        out.push('\n');
    }
    out.push_str(&indent);
    for m in &prop.modifiers {
        out.push_str(m);
        out.push(' ');
    }
    out.push_str(&prop.name);
    if let Some(mark) = prop.mark {
        out.push(mark);
    }
    if let Some(t) = &prop.type_ann {
        out.push_str(": ");
        out.push_str(t);
    }
    if let Some(value) = &prop.value {
        out.push_str(" = ");
        out.push_str(&render_expr(value, cfg, 1));
    }
    out.push(';');
    out
}

fn render_method(method: &MethodMember, cfg: &RenderConfig) -> String {
    let indent = cfg.indent_unit();
    let mut out = String::new();
    for deco in &method.decorators {
        out.push_str(&indent);
        out.push_str(&render_decorator(deco, cfg, 1));
        out.push('\n');
    }
    out.push_str(&indent);
    for m in &method.modifiers {
        out.push_str(m);
        out.push(' ');
    }
    out.push_str(&method.name);
    out.push('(');
    out.push_str(
        &method
            .params
            .iter()
            .map(|p| render_param(p, cfg))
            .collect::<Vec<_>>()
            .join(", "),
    );
    out.push(')');
    if let Some(ret) = &method.return_type {
        out.push_str(": ");
        out.push_str(ret);
    }
    if method.body.is_empty() {
        out.push_str(" {}");
        return out;
    }
    out.push_str(" {\n");
    let body_indent = indent.repeat(2);
    for stmt in &method.body {
        out.push_str(&reindent(stmt, &body_indent));
        out.push('\n');
    }
    out.push_str(&indent);
    out.push('}');
    out
}

fn render_param(param: &Param, cfg: &RenderConfig) -> String {
    match param {
        Param::Raw(text) => text.clone(),
        Param::Named(p) => {
            let mut out = String::new();
            for deco in &p.decorators {
                out.push_str(&render_decorator(deco, cfg, 1));
                out.push(' ');
            }
            out.push_str(&p.name);
            if p.optional {
                out.push('?');
            }
            if let Some(t) = &p.type_ann {
                out.push_str(": ");
                out.push_str(t);
            }
            if let Some(init) = &p.initializer {
                out.push_str(" = ");
                out.push_str(init);
            }
            out
        }
    }
}

pub fn render_decorator(deco: &Decorator, cfg: &RenderConfig, level: usize) -> String {
    match &deco.args {
        None => format!("@{}", deco.name),
        Some(args) => format!("@{}({})", deco.name, render_args(args, cfg, level)),
    }
}

fn render_args(args: &[Expr], cfg: &RenderConfig, level: usize) -> String {
    args.iter()
        .map(|a| render_expr(a, cfg, level))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render one expression. `level` is the indentation level of the line the
/// expression starts on; non-empty object literals break across lines.
pub fn render_expr(expr: &Expr, cfg: &RenderConfig, level: usize) -> String {
    match expr {
        Expr::String(content) => quoted(content, cfg),
        Expr::Number(raw) => raw.clone(),
        Expr::Bool(b) => b.to_string(),
        Expr::Null => "null".to_string(),
        Expr::Ident(name) => name.clone(),
        Expr::Raw(text) => text.clone(),
        Expr::Call { callee, args } => {
            format!("{}({})", callee, render_args(args, cfg, level))
        }
        Expr::Array(items) => format!("[{}]", render_args(items, cfg, level)),
        Expr::Object(props) => {
            if props.is_empty() {
                return "{}".to_string();
            }
            let unit = cfg.indent_unit();
            let inner = unit.repeat(level + 1);
            let outer = unit.repeat(level);
            let mut out = String::from("{\n");
            for prop in props {
                out.push_str(&inner);
                match prop {
                    ObjectProp::Pair { key, value } => {
                        out.push_str(key);
                        out.push_str(": ");
                        out.push_str(&render_expr(value, cfg, level + 1));
                    }
                    ObjectProp::Raw(text) => out.push_str(text),
                }
                out.push_str(",\n");
            }
            out.push_str(&outer);
            out.push('}');
            out
        }
    }
}

/// Quote `content` with the configured style, escaping unescaped quote
/// characters inside it. Escape sequences already present are kept as-is.
fn quoted(content: &str, cfg: &RenderConfig) -> String {
    let q = cfg.quote.char();
    let mut out = String::with_capacity(content.len() + 2);
    out.push(q);
    let mut prev_backslash = false;
    for ch in content.chars() {
        if ch == q && !prev_backslash {
            out.push('\\');
        }
        prev_backslash = ch == '\\' && !prev_backslash;
        out.push(ch);
    }
    out.push(q);
    out
}

/// Strip the common leading whitespace of `text` and re-indent every line to
/// `indent`. Blank lines stay empty. Idempotent for already-normalized text.
pub fn reindent(text: &str, indent: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let common = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                format!("{indent}{}", strip_leading(line, common))
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn strip_leading(line: &str, n: usize) -> &str {
    let mut stripped = 0;
    let mut rest = line;
    while stripped < n {
        match rest.chars().next() {
            Some(c) if c.is_whitespace() => {
                rest = &rest[c.len_utf8()..];
                stripped += 1;
            }
            _ => break,
        }
    }
    rest
}

/// Whitespace-insensitive comparison key for statement texts; used by the
/// idempotent method-body injection. Sensitive to renames and other
/// semantically-neutral rewrites, which is an accepted limitation.
pub fn comparable_text(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
