//! Literal Value Model and the value↔syntax bridge.
//!
//! Decorator argument lists are merged content-addressed: elements are read
//! out of the tree into [`LiteralValue`]s, compared by `(kind, rendered
//! text)`, and written back. The bridge is what lets the merger treat syntax
//! nodes as hashable application values without tree-walking at every call
//! site.

use crate::config::RenderConfig;
use crate::emit::render::render_expr;
use crate::model::tree::{Expr, ObjectProp};
use serde::{Deserialize, Serialize};

/// A value that can appear inside a decorator or property argument.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum LiteralValue {
    /// JSON-like literal: string, number, boolean, null, array, object.
    Value(serde_json::Value),
    /// A bare name reference.
    Identifier(String),
    /// A call expression: callee plus ordered arguments.
    Func {
        name: String,
        args: Vec<LiteralValue>,
    },
    /// Opaque pre-built syntax node, the escape hatch for unmodeled shapes.
    Ast(Expr),
}

impl LiteralValue {
    pub fn string(s: impl Into<String>) -> Self {
        LiteralValue::Value(serde_json::Value::String(s.into()))
    }

    pub fn ident(name: impl Into<String>) -> Self {
        LiteralValue::Identifier(name.into())
    }

    pub fn func(name: impl Into<String>, args: Vec<LiteralValue>) -> Self {
        LiteralValue::Func {
            name: name.into(),
            args,
        }
    }

    /// Build the syntax node for this value.
    pub fn to_expr(&self) -> Expr {
        match self {
            LiteralValue::Value(v) => json_to_expr(v),
            LiteralValue::Identifier(name) => Expr::Ident(name.clone()),
            LiteralValue::Func { name, args } => Expr::Call {
                callee: name.clone(),
                args: args.iter().map(LiteralValue::to_expr).collect(),
            },
            LiteralValue::Ast(expr) => expr.clone(),
        }
    }

    /// Read a syntax node back into a value.
    ///
    /// Nodes whose canonical rendering would differ from their source text
    /// (e.g. `1.50`, `0x10`) come back as [`LiteralValue::Ast`] so that
    /// `to_expr(from_expr(n))` always renders identically to `n`.
    pub fn from_expr(expr: &Expr) -> LiteralValue {
        match expr {
            Expr::String(s) => LiteralValue::Value(serde_json::Value::String(s.clone())),
            Expr::Number(raw) => match canonical_number(raw) {
                Some(n) => LiteralValue::Value(n),
                None => LiteralValue::Ast(expr.clone()),
            },
            Expr::Bool(b) => LiteralValue::Value(serde_json::Value::Bool(*b)),
            Expr::Null => LiteralValue::Value(serde_json::Value::Null),
            Expr::Ident(name) => LiteralValue::Identifier(name.clone()),
            Expr::Call { callee, args } => LiteralValue::Func {
                name: callee.clone(),
                args: args.iter().map(LiteralValue::from_expr).collect(),
            },
            _ => LiteralValue::Ast(expr.clone()),
        }
    }

    /// Discriminant used by the dedup equality.
    pub fn kind(&self) -> &'static str {
        match self {
            LiteralValue::Value(_) => "value",
            LiteralValue::Identifier(_) => "identifier",
            LiteralValue::Func { .. } => "func",
            LiteralValue::Ast(_) => "ast",
        }
    }

    /// Canonical rendered text of this value.
    pub fn rendered(&self) -> String {
        render_expr(&self.to_expr(), &RenderConfig::default(), 0)
    }

    /// Dedup equality: same kind and identical rendered text.
    pub fn same_as(&self, other: &LiteralValue) -> bool {
        self.kind() == other.kind() && self.rendered() == other.rendered()
    }
}

/// `1` comes back as a JSON number, `1.50` does not (its canonical rendering
/// would drop the trailing zero).
fn canonical_number(raw: &str) -> Option<serde_json::Value> {
    if let Ok(i) = raw.parse::<i64>() {
        if i.to_string() == raw {
            return Some(serde_json::Value::from(i));
        }
        return None;
    }
    let f = raw.parse::<f64>().ok()?;
    let n = serde_json::Number::from_f64(f)?;
    if n.to_string() == raw {
        return Some(serde_json::Value::Number(n));
    }
    None
}

fn json_to_expr(v: &serde_json::Value) -> Expr {
    match v {
        serde_json::Value::Null => Expr::Null,
        serde_json::Value::Bool(b) => Expr::Bool(*b),
        serde_json::Value::Number(n) => Expr::Number(n.to_string()),
        serde_json::Value::String(s) => Expr::String(s.clone()),
        serde_json::Value::Array(items) => Expr::Array(items.iter().map(json_to_expr).collect()),
        serde_json::Value::Object(map) => Expr::Object(
            map.iter()
                .map(|(k, v)| ObjectProp::Pair {
                    key: k.clone(),
                    value: json_to_expr(v),
                })
                .collect(),
        ),
    }
}
