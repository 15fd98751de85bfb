//! Final materialization of changed units to disk.
//!
//! Emission is deferred to this single pass so a failed run never leaves a
//! half-written project behind: editors only touch memory, and `flush` runs
//! once at the end.

use crate::core::store::SourceStore;
use crate::emit::render;
use crate::errors::Result;
use std::fs;
use std::path::PathBuf;
use tracing::info;

/// Paths actually written by a flush, for observability.
#[derive(Debug, Clone, Default)]
pub struct FlushSummary {
    pub written: Vec<PathBuf>,
}

/// Walk all cached units and write back the changed ones.
///
/// Tombstoned units are deleted by the listing step. Unchanged units are
/// skipped; the dirty bit is the sole source of truth for "needs write".
#[tracing::instrument(level = "info", skip_all)]
pub fn flush_units(store: &mut SourceStore) -> Result<FlushSummary> {
    let cfg = store.render_config().clone();
    let mut summary = FlushSummary::default();
    for (path, unit) in store.list_units()? {
        let unit = unit.borrow();
        if !unit.changed {
            continue;
        }
        let code = decode_unicode_escapes(&render::render_tree(&unit.tree, &cfg));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, code)?;
        info!(path = %path.display(), "wrote patched source");
        summary.written.push(path);
    }
    Ok(summary)
}

/// Decode `\uXXXX` sequences back to literal characters so emitted source
/// stays human-readable. Surrogate pairs are combined; anything that does
/// not decode to a valid character is left untouched.
pub fn decode_unicode_escapes(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut i = 0;
    while i < input.len() {
        if let Some((ch, consumed)) = decode_at(input, i) {
            out.push(ch);
            i += consumed;
            continue;
        }
        match input[i..].chars().next() {
            Some(ch) => {
                out.push(ch);
                i += ch.len_utf8();
            }
            None => break,
        }
    }
    out
}

fn hex4(input: &str, at: usize) -> Option<u16> {
    let digits = input.get(at..at + 4)?;
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    u16::from_str_radix(digits, 16).ok()
}

fn decode_at(input: &str, i: usize) -> Option<(char, usize)> {
    if !input[i..].starts_with("\\u") {
        return None;
    }
    let hi = hex4(input, i + 2)?;
    if (0xD800..0xDC00).contains(&hi) {
        // High surrogate: require a following low surrogate escape.
        if !input.get(i + 6..i + 8).is_some_and(|s| s == "\\u") {
            return None;
        }
        let lo = hex4(input, i + 8)?;
        if !(0xDC00..0xE000).contains(&lo) {
            return None;
        }
        let c = 0x10000 + ((hi as u32 - 0xD800) << 10) + (lo as u32 - 0xDC00);
        return char::from_u32(c).map(|ch| (ch, 12));
    }
    char::from_u32(hi as u32).map(|ch| (ch, 6))
}
