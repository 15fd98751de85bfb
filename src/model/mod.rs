//! Owned, mutable model of a TypeScript source file.
//!
//! Tree-sitter is only used read-only at the parse boundary; everything the
//! editors touch lives in these structures. Unmodeled syntax is carried as
//! verbatim raw text so files round-trip without the engine understanding
//! every construct.

pub mod binding;
pub mod tree;
pub mod value;
