//! Normalized view of import statements and the request types editors accept.

use crate::model::tree::ImportSpecifier;
use serde::{Deserialize, Serialize};

/// The shape of the first import statement for a given module specifier.
///
/// Bare side-effect imports have no binding and are not described.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportBinding {
    Named(Vec<ImportSpecifier>),
    Namespace(String),
    Default(String),
}

impl ImportBinding {
    /// Local names introduced into the file by this binding.
    pub fn local_names(&self) -> Vec<String> {
        match self {
            ImportBinding::Named(specs) => specs.iter().map(|s| s.local.clone()).collect(),
            ImportBinding::Namespace(name) | ImportBinding::Default(name) => {
                vec![name.clone()]
            }
        }
    }
}

/// One requested named-import entry: `name` or `name as alias`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedImport {
    pub name: String,
    pub alias: Option<String>,
}

impl NamedImport {
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
        }
    }

    pub fn aliased(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: Some(alias.into()),
        }
    }

    /// The local name this entry would introduce.
    pub fn local(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    pub fn to_specifier(&self) -> ImportSpecifier {
        match &self.alias {
            Some(alias) => ImportSpecifier::aliased(&self.name, alias),
            None => ImportSpecifier::plain(&self.name),
        }
    }
}

/// What the caller wants imported from a module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportRequest {
    Named(Vec<NamedImport>),
    Namespace(String),
    Default(String),
    /// `import 'm';` for side effects only.
    Bare,
}

impl ImportRequest {
    /// Convenience for the common single plain name case.
    pub fn named(names: &[&str]) -> Self {
        ImportRequest::Named(names.iter().map(|n| NamedImport::plain(*n)).collect())
    }
}
