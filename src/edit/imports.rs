//! Import binding editor: find, describe, add, remove, and replace import
//! bindings on a source unit.
//!
//! Only the first import statement per module specifier is consulted by
//! `describe_import`/`add_import`/`remove_import`; files importing the same
//! module twice keep their extra statements untouched.
//! [`replace_import_binding`] scans all of them.

use crate::core::store::UnitRef;
use crate::edit::EditOutcome;
use crate::model::binding::{ImportBinding, ImportRequest, NamedImport};
use crate::model::tree::{
    ImportClause, ImportDecl, SourceTree, StatementId, StatementKind,
};
use tracing::debug;

/// Ids of import statements, optionally filtered to one module specifier.
pub fn find_imports(tree: &SourceTree, module: Option<&str>) -> Vec<StatementId> {
    tree.statements()
        .iter()
        .filter_map(|stmt| {
            let import = stmt.as_import()?;
            match module {
                Some(m) if import.module != m => None,
                _ => Some(stmt.id()),
            }
        })
        .collect()
}

/// Classify the first import of `module`. Bare side-effect imports have no
/// binding and yield `None`.
pub fn describe_import(tree: &SourceTree, module: &str) -> Option<ImportBinding> {
    let id = find_imports(tree, Some(module)).into_iter().next()?;
    let import = tree.statement(id)?.as_import()?;
    match import.clause.as_ref()? {
        ImportClause::Named(specs) => Some(ImportBinding::Named(specs.clone())),
        ImportClause::Namespace(name) => Some(ImportBinding::Namespace(name.clone())),
        ImportClause::Default(name) => Some(ImportBinding::Default(name.clone())),
    }
}

/// Add (or merge into) an import of `module`. New statements are prepended
/// to the file; merged named specifiers are appended.
pub fn add_import(unit: &UnitRef, module: &str, request: &ImportRequest) -> EditOutcome {
    add_import_ex(unit, module, request, false)
}

/// Like [`add_import`], with control over where merged specifiers land.
pub fn add_import_ex(
    unit: &UnitRef,
    module: &str,
    request: &ImportRequest,
    insert_first: bool,
) -> EditOutcome {
    let mut guard = unit.borrow_mut();
    let unit_ref = &mut *guard;
    let tree = &mut unit_ref.tree;

    let Some(id) = find_imports(tree, Some(module)).into_iter().next() else {
        tree.insert_statement_front(StatementKind::Import(ImportDecl {
            module: module.to_string(),
            clause: request_clause(request),
        }));
        unit_ref.changed = true;
        return EditOutcome::Applied;
    };

    let wanted = match request {
        ImportRequest::Named(wanted) => wanted,
        // The module is already imported; a side-effect import adds nothing.
        ImportRequest::Bare => return EditOutcome::AlreadyPresent,
        // Merging into an existing statement is only supported for named
        // bindings.
        _ => return EditOutcome::Unsupported,
    };
    let Some(import) = tree.statement_mut(id).and_then(|s| s.as_import_mut()) else {
        return EditOutcome::Unsupported;
    };
    let Some(ImportClause::Named(specs)) = import.clause.as_mut() else {
        debug!(module, "existing import is not named; leaving untouched");
        return EditOutcome::Unsupported;
    };

    let mut added = 0;
    for entry in wanted {
        // Present already when an existing local name matches the requested
        // alias or bare name.
        if specs.iter().any(|s| s.local == entry.local()) {
            continue;
        }
        let spec = entry.to_specifier();
        if insert_first {
            specs.insert(0, spec);
        } else {
            specs.push(spec);
        }
        added += 1;
    }
    if added == 0 {
        return EditOutcome::AlreadyPresent;
    }
    unit_ref.changed = true;
    EditOutcome::Applied
}

/// Remove named specifiers of `module`, matching on their origin name (the
/// imported symbol, not the local alias). Dropping the last specifier drops
/// the whole statement.
pub fn remove_import(unit: &UnitRef, module: &str, names: &[&str]) -> EditOutcome {
    let mut guard = unit.borrow_mut();
    let unit_ref = &mut *guard;
    let tree = &mut unit_ref.tree;

    let Some(id) = find_imports(tree, Some(module)).into_iter().next() else {
        return EditOutcome::AlreadyPresent;
    };
    let Some(import) = tree.statement_mut(id).and_then(|s| s.as_import_mut()) else {
        return EditOutcome::AlreadyPresent;
    };
    let Some(ImportClause::Named(specs)) = import.clause.as_mut() else {
        return EditOutcome::Unsupported;
    };

    let before = specs.len();
    specs.retain(|s| !names.iter().any(|n| *n == s.origin()));
    if specs.len() == before {
        return EditOutcome::AlreadyPresent;
    }
    if specs.is_empty() {
        tree.remove_statement(id);
    }
    unit_ref.changed = true;
    EditOutcome::Applied
}

/// Move a named import from one module to another, possibly renaming.
///
/// For each specifier of `from_module` whose origin name equals `from_name`,
/// the specifier is removed and an equivalent one added from the target
/// module. The consumer's local alias is preserved when the imported name
/// changes, so call sites in the file need no edits; when the local name
/// already equals the target name the alias collapses. A specifier whose
/// *local* name equals `from_name` (with no explicit origin) is moved the
/// same way, aliased back to its original local name when `alias_to_origin`
/// is set. `target = None` removes without re-adding.
///
/// Returns whether any replacement occurred, which is what drives dependency
/// updates upstream.
pub fn replace_import_binding(
    unit: &UnitRef,
    from_module: &str,
    from_name: &str,
    target: Option<(&str, &str)>,
    alias_to_origin: bool,
) -> bool {
    let ids = find_imports(&unit.borrow().tree, Some(from_module));
    let mut changed = false;
    for id in ids {
        let specs = {
            let guard = unit.borrow();
            match guard.tree.statement(id).and_then(|s| s.as_import()) {
                Some(ImportDecl {
                    clause: Some(ImportClause::Named(specs)),
                    ..
                }) => specs.clone(),
                _ => continue,
            }
        };
        for spec in specs {
            if spec.imported.as_deref() == Some(from_name) {
                // `from_name as local`
                remove_import(unit, from_module, &[from_name]);
                if let Some((to_module, to_name)) = target {
                    let entry = if spec.local == to_name {
                        NamedImport::plain(to_name)
                    } else {
                        NamedImport::aliased(to_name, &spec.local)
                    };
                    add_import(unit, to_module, &ImportRequest::Named(vec![entry]));
                }
                changed = true;
            } else if spec.imported.is_none() && spec.local == from_name {
                remove_import(unit, from_module, &[from_name]);
                if let Some((to_module, to_name)) = target {
                    let entry = if alias_to_origin && to_name != from_name {
                        NamedImport::aliased(to_name, from_name)
                    } else {
                        NamedImport::plain(to_name)
                    };
                    add_import(unit, to_module, &ImportRequest::Named(vec![entry]));
                }
                changed = true;
            }
        }
    }
    changed
}

fn request_clause(request: &ImportRequest) -> Option<ImportClause> {
    match request {
        ImportRequest::Named(entries) => Some(ImportClause::Named(
            entries.iter().map(NamedImport::to_specifier).collect(),
        )),
        ImportRequest::Namespace(name) => Some(ImportClause::Namespace(name.clone())),
        ImportRequest::Default(name) => Some(ImportClause::Default(name.clone())),
        ImportRequest::Bare => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderConfig;
    use crate::core::parse::parse_source;
    use crate::core::store::SourceUnit;
    use crate::emit::render::render_tree;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn unit_from(src: &str) -> UnitRef {
        let tree = parse_source(src).unwrap();
        Rc::new(RefCell::new(SourceUnit::new("test.ts", tree, false)))
    }

    fn rendered(unit: &UnitRef) -> String {
        render_tree(&unit.borrow().tree, &RenderConfig::default())
    }

    #[test]
    fn add_import_is_idempotent() {
        let unit = unit_from("const x = 1;\n");
        let req = ImportRequest::named(&["join"]);
        assert_eq!(add_import(&unit, "path", &req), EditOutcome::Applied);
        assert!(unit.borrow().changed);

        unit.borrow_mut().changed = false;
        assert_eq!(add_import(&unit, "path", &req), EditOutcome::AlreadyPresent);
        assert!(!unit.borrow().changed);
        assert_eq!(rendered(&unit), "import { join } from 'path';\nconst x = 1;\n");
    }

    #[test]
    fn named_merge_skips_existing_names() {
        let unit = unit_from("import { a, b as c } from 'M';\n");
        let req = ImportRequest::named(&["a", "d"]);
        assert_eq!(add_import(&unit, "M", &req), EditOutcome::Applied);
        assert_eq!(rendered(&unit), "import { a, b as c, d } from 'M';\n");
    }

    #[test]
    fn merge_matches_on_local_alias() {
        let unit = unit_from("import { Context as ctx } from '@mw/core';\n");
        // `ctx` is already bound locally; requesting the same alias is a no-op.
        let req = ImportRequest::Named(vec![NamedImport::aliased("FaaSContext", "ctx")]);
        assert_eq!(add_import(&unit, "@mw/core", &req), EditOutcome::AlreadyPresent);
    }

    #[test]
    fn insert_first_prepends_specifier() {
        let unit = unit_from("import { b } from 'M';\n");
        let req = ImportRequest::named(&["a"]);
        assert_eq!(add_import_ex(&unit, "M", &req, true), EditOutcome::Applied);
        assert_eq!(rendered(&unit), "import { a, b } from 'M';\n");
    }

    #[test]
    fn merging_into_namespace_import_is_unsupported() {
        let unit = unit_from("import * as path from 'path';\n");
        let req = ImportRequest::named(&["join"]);
        assert_eq!(add_import(&unit, "path", &req), EditOutcome::Unsupported);
        assert!(!unit.borrow().changed);
        assert_eq!(rendered(&unit), "import * as path from 'path';\n");
    }

    #[test]
    fn remove_matches_origin_not_alias() {
        let unit = unit_from("import { FaaSContext as Context, use } from '@mw/faas';\n");
        assert_eq!(
            remove_import(&unit, "@mw/faas", &["FaaSContext"]),
            EditOutcome::Applied
        );
        assert_eq!(rendered(&unit), "import { use } from '@mw/faas';\n");
    }

    #[test]
    fn removing_last_specifier_drops_the_statement() {
        let unit = unit_from("import { join } from 'path';\nconst x = 1;\n");
        assert_eq!(remove_import(&unit, "path", &["join"]), EditOutcome::Applied);
        assert!(find_imports(&unit.borrow().tree, Some("path")).is_empty());
        assert_eq!(rendered(&unit), "const x = 1;\n");
    }

    #[test]
    fn describe_import_classifies_shapes() {
        let unit = unit_from(
            "import { a } from 'm1';\nimport * as ns from 'm2';\nimport def from 'm3';\nimport 'm4';\n",
        );
        let guard = unit.borrow();
        let tree = &guard.tree;
        assert!(matches!(
            describe_import(tree, "m1"),
            Some(ImportBinding::Named(_))
        ));
        assert!(matches!(
            describe_import(tree, "m2"),
            Some(ImportBinding::Namespace(n)) if n == "ns"
        ));
        assert!(matches!(
            describe_import(tree, "m3"),
            Some(ImportBinding::Default(n)) if n == "def"
        ));
        assert!(describe_import(tree, "m4").is_none());
        assert!(describe_import(tree, "m5").is_none());
    }

    #[test]
    fn replace_preserves_local_alias_across_rename() {
        let unit = unit_from(
            "import { Foo as x } from '@old';\nconst value = x();\n",
        );
        assert!(replace_import_binding(
            &unit,
            "@old",
            "Foo",
            Some(("@new", "Bar")),
            false
        ));
        assert_eq!(
            rendered(&unit),
            "import { Bar as x } from '@new';\nconst value = x();\n"
        );
    }

    #[test]
    fn replace_collapses_alias_when_local_equals_target() {
        let unit = unit_from("import { FaaSContext as Context } from '@mw/faas';\n");
        assert!(replace_import_binding(
            &unit,
            "@mw/faas",
            "FaaSContext",
            Some(("@mw/core", "Context")),
            false
        ));
        assert_eq!(rendered(&unit), "import { Context } from '@mw/core';\n");
    }

    #[test]
    fn replace_moves_plain_specifier_between_modules() {
        let unit = unit_from("import { Query, Rule } from '@mw/decorator';\n");
        assert!(replace_import_binding(
            &unit,
            "@mw/decorator",
            "Rule",
            Some(("@mw/rule", "Rule")),
            false
        ));
        assert_eq!(
            rendered(&unit),
            "import { Rule } from '@mw/rule';\nimport { Query } from '@mw/decorator';\n"
        );
    }

    #[test]
    fn replace_without_target_removes_the_binding() {
        let unit = unit_from("import { legacy, keep } from '@old';\n");
        assert!(replace_import_binding(&unit, "@old", "legacy", None, false));
        assert_eq!(rendered(&unit), "import { keep } from '@old';\n");
    }

    #[test]
    fn replace_reports_when_nothing_matched() {
        let unit = unit_from("import { other } from '@old';\n");
        assert!(!replace_import_binding(
            &unit,
            "@old",
            "Foo",
            Some(("@new", "Bar")),
            false
        ));
        assert!(!unit.borrow().changed);
    }
}
