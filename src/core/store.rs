//! Per-run cache of parsed source units.
//!
//! The store is an explicitly owned session object: one instance per
//! migration run, passed to every editor call. Within a run a given file
//! path resolves to exactly one [`SourceUnit`] instance: batch lookups and
//! single lookups alias the same `Rc`, so every editor observes the same
//! tree and there are never divergent copies of a file.
//!
//! Units are `Rc<RefCell<_>>` on purpose: a run is a linear pipeline of
//! synchronous steps with exactly one writer at a time, so no locking is
//! needed (or provided).

use crate::config::RenderConfig;
use crate::core::parse;
use crate::emit::flush::{self, FlushSummary};
use crate::errors::Result;
use crate::model::tree::SourceTree;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::debug;

/// One file's tree plus cache metadata.
#[derive(Debug)]
pub struct SourceUnit {
    pub path: PathBuf,
    pub tree: SourceTree,
    /// Dirty bit: the emission pipeline's sole source of truth for
    /// "needs write".
    pub changed: bool,
    /// Tombstone: delete the backing file instead of emitting.
    pub removed: bool,
}

impl SourceUnit {
    pub fn new(path: impl Into<PathBuf>, tree: SourceTree, changed: bool) -> Self {
        Self {
            path: path.into(),
            tree,
            changed,
            removed: false,
        }
    }

    /// An empty unit for a file that does not exist on disk yet.
    pub fn synthetic(path: impl Into<PathBuf>) -> Self {
        Self::new(path, SourceTree::new(), false)
    }
}

pub type UnitRef = Rc<RefCell<SourceUnit>>;

#[derive(Debug)]
enum CacheEntry {
    Unit(UnitRef),
    Batch(Vec<UnitRef>),
}

/// Session-scoped unit cache; see the module docs.
#[derive(Debug, Default)]
pub struct SourceStore {
    entries: BTreeMap<String, CacheEntry>,
    render: RenderConfig,
}

impl SourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_render_config(render: RenderConfig) -> Result<Self> {
        render.validate()?;
        Ok(Self {
            entries: BTreeMap::new(),
            render,
        })
    }

    pub fn render_config(&self) -> &RenderConfig {
        &self.render
    }

    /// Cache key: canonicalized path with `/` separators. Canonicalization
    /// falls back to the path as given for files that do not exist yet, so
    /// callers should pass absolute paths.
    fn key_for(path: &Path) -> String {
        let p = dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        p.to_string_lossy().replace('\\', "/")
    }

    /// Look up one path. Parses on first sight; a missing file yields an
    /// empty synthetic unit with `changed = false`.
    pub fn get_unit(&mut self, path: &Path) -> Result<UnitRef> {
        let key = Self::key_for(path);
        if let Some(CacheEntry::Unit(unit)) = self.entries.get(&key) {
            return Ok(unit.clone());
        }
        let unit = if path.exists() {
            debug!(path = %path.display(), "parsing source unit");
            let code = fs::read_to_string(path)?;
            SourceUnit::new(path, parse::parse_source(&code)?, false)
        } else {
            debug!(path = %path.display(), "synthesizing empty unit");
            SourceUnit::synthetic(path)
        };
        let unit = Rc::new(RefCell::new(unit));
        self.entries.insert(key, CacheEntry::Unit(unit.clone()));
        Ok(unit)
    }

    /// Batch lookup sharing one parser. Only the subset of paths that exist
    /// on disk is returned; missing files are silently skipped. Seed them
    /// with [`SourceStore::set_unit`] if they are meant to be created.
    pub fn get_units(&mut self, paths: &[PathBuf]) -> Result<Vec<UnitRef>> {
        let batch_key = paths
            .iter()
            .map(|p| Self::key_for(p))
            .collect::<Vec<_>>()
            .join(";");
        if let Some(CacheEntry::Batch(list)) = self.entries.get(&batch_key) {
            return Ok(list.clone());
        }

        let mut parser = parse::new_parser()?;
        let mut list = Vec::new();
        for path in paths {
            let key = Self::key_for(path);
            if let Some(CacheEntry::Unit(unit)) = self.entries.get(&key) {
                list.push(unit.clone());
                continue;
            }
            if !path.exists() {
                continue;
            }
            let code = fs::read_to_string(path)?;
            let tree = parse::parse_with(&mut parser, &code)?;
            let unit = Rc::new(RefCell::new(SourceUnit::new(path, tree, false)));
            self.entries.insert(key, CacheEntry::Unit(unit.clone()));
            list.push(unit);
        }
        debug!(requested = paths.len(), parsed = list.len(), "batch lookup");
        if paths.len() > 1 {
            self.entries.insert(batch_key, CacheEntry::Batch(list.clone()));
        }
        Ok(list)
    }

    /// Seed a unit (typically synthetic, for a file the run will create).
    /// Replaces any cached unit for the path.
    pub fn set_unit(&mut self, path: &Path, unit: SourceUnit) -> UnitRef {
        let key = Self::key_for(path);
        let unit = Rc::new(RefCell::new(unit));
        self.entries.insert(key, CacheEntry::Unit(unit.clone()));
        unit
    }

    /// Flip the dirty bit of a cached unit; unknown paths are ignored.
    pub fn mark_changed(&mut self, path: &Path) {
        if let Some(CacheEntry::Unit(unit)) = self.entries.get(&Self::key_for(path)) {
            unit.borrow_mut().changed = true;
        }
    }

    /// Tombstone a cached unit for deletion; unknown paths are ignored.
    pub fn mark_removed(&mut self, path: &Path) {
        if let Some(CacheEntry::Unit(unit)) = self.entries.get(&Self::key_for(path)) {
            unit.borrow_mut().removed = true;
        }
    }

    /// Every cached per-path unit. Tombstoned units have their backing file
    /// deleted as a side effect of listing and are excluded from the result.
    pub fn list_units(&self) -> Result<Vec<(PathBuf, UnitRef)>> {
        let mut out = Vec::new();
        for entry in self.entries.values() {
            let CacheEntry::Unit(unit) = entry else {
                continue;
            };
            let (path, removed) = {
                let u = unit.borrow();
                (u.path.clone(), u.removed)
            };
            if removed {
                if path.exists() {
                    debug!(path = %path.display(), "deleting tombstoned file");
                    fs::remove_file(&path)?;
                }
                continue;
            }
            out.push((path, unit.clone()));
        }
        Ok(out)
    }

    /// Render and write every changed unit; see [`flush::flush_units`].
    pub fn flush(&mut self) -> Result<FlushSummary> {
        flush::flush_units(self)
    }
}
