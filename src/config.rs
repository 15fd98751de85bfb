//! Configuration for the normalized output form.
//!
//! The renderer is the formatter: every emitted file goes through it, so the
//! options here define the canonical textual shape of patched sources.
//! All structs are `serde`-friendly so they can be loaded from JSON/YAML by a
//! host tool.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};

/// String quoting style for rendered literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStyle {
    Single,
    Double,
}

impl QuoteStyle {
    pub fn char(self) -> char {
        match self {
            QuoteStyle::Single => '\'',
            QuoteStyle::Double => '"',
        }
    }
}

/// Options controlling the normalized textual form of emitted sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Spaces per indentation level.
    pub indent_width: usize,
    /// Quote style for string literals.
    pub quote: QuoteStyle,
    /// Whether emitted files end with a newline.
    pub trailing_newline: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            indent_width: 2,
            quote: QuoteStyle::Single,
            trailing_newline: true,
        }
    }
}

impl RenderConfig {
    /// Validate config sanity (no degenerate or absurd values).
    pub fn validate(&self) -> Result<()> {
        if self.indent_width == 0 || self.indent_width > 8 {
            return Err(Error::Config(format!(
                "`indent_width` out of range: {}",
                self.indent_width
            )));
        }
        Ok(())
    }

    /// One indentation step as a string.
    pub fn indent_unit(&self) -> String {
        " ".repeat(self.indent_width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(RenderConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_indent_rejected() {
        let cfg = RenderConfig {
            indent_width: 0,
            ..RenderConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
