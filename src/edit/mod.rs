//! Structural editors over cached source units.
//!
//! All editors are permissive: an edit requested against a shape they do not
//! handle is a silent no-op, reported through [`EditOutcome`] so callers and
//! tests can still tell the paths apart.

pub mod decorators;
pub mod imports;
pub mod members;

use serde::{Deserialize, Serialize};

/// What an edit actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditOutcome {
    /// The tree was mutated and the unit marked changed.
    Applied,
    /// Everything requested was already in place; nothing was touched.
    AlreadyPresent,
    /// The target has a shape this editor does not handle; nothing was
    /// touched.
    Unsupported,
}

impl EditOutcome {
    pub fn applied(self) -> bool {
        self == EditOutcome::Applied
    }
}
