//! Structural source-patching engine for TypeScript.
//!
//! The engine parses source files into an owned, mutable tree model, applies
//! merge-aware edits (import bindings, decorator argument lists, class
//! members, method-body statements), and re-emits only the files that were
//! actually mutated, in a normalized textual form.
//!
//! Every edit is idempotent: re-running a migration over already-patched
//! sources merges into what is there instead of duplicating it, and a second
//! run marks nothing changed, so nothing is rewritten.
//!
//! A run revolves around one [`SourceStore`]: look units up (parsed on
//! demand, at most one in-memory tree per file), mutate them through the
//! `edit` modules, then [`SourceStore::flush`] once at the end.

pub mod config;
pub mod core;
pub mod edit;
pub mod emit;
pub mod errors;
pub mod model;

pub use config::{QuoteStyle, RenderConfig};
pub use self::core::store::{SourceStore, SourceUnit, UnitRef};
pub use edit::EditOutcome;
pub use edit::decorators::{ConfigTarget, ListMode};
pub use edit::members::{MethodSpec, PropertySpec};
pub use emit::flush::FlushSummary;
pub use errors::{Error, Result};
pub use model::binding::{ImportBinding, ImportRequest, NamedImport};
pub use model::value::LiteralValue;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::{decorators, imports, members};
    use std::fs;

    /// The decorator-upgrade scenario end to end: move `Rule` to its own
    /// module, materialize `@Query()` parameter names, merge the framework
    /// into the configuration decorator, and flush.
    #[test]
    fn decorator_migration_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let controller = dir.path().join("home.ts");
        fs::write(
            &controller,
            "import { Query, Rule } from '@mw/decorator';\n\n@Controller('/')\nexport class Home {\n  @Get('/')\n  async handle(@Query() name = 'midwayjs') {\n    return `Hello ${name}`;\n  }\n}\n",
        )
        .unwrap();

        let mut store = SourceStore::new();
        let unit = store.get_unit(&controller).unwrap();

        let moved = imports::replace_import_binding(
            &unit,
            "@mw/decorator",
            "Rule",
            Some(("@mw/validate", "Rule")),
            false,
        );
        assert!(moved);

        assert_eq!(
            members::materialize_param_decorator_args(&unit, "@mw/decorator", &["Query"]),
            EditOutcome::Applied
        );

        let summary = store.flush().unwrap();
        assert_eq!(summary.written, vec![controller.clone()]);
        let out = fs::read_to_string(&controller).unwrap();
        assert_eq!(
            out,
            "import { Rule } from '@mw/validate';\nimport { Query } from '@mw/decorator';\n\n@Controller('/')\nexport class Home {\n  @Get('/')\n  async handle(@Query('name') name = 'midwayjs') {\n    return `Hello ${name}`;\n  }\n}\n"
        );
    }

    /// A full configuration upgrade against a synthesized file: new unit,
    /// framework import, decorator list merges, lifecycle body injection.
    #[test]
    fn configuration_upgrade_on_fresh_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("src").join("configuration.ts");

        let mut store = SourceStore::new();
        let mut seeded = SourceUnit::synthetic(&path);
        seeded.changed = true;
        let unit = store.set_unit(&path, seeded);

        let target = ConfigTarget::new("Configuration", "createConfiguration", "AutoConfiguration");
        decorators::ensure_config_target(&unit, &target, &["imports", "importConfigs"]);
        imports::add_import(&unit, "@mw/decorator", &ImportRequest::named(&["Configuration"]));
        imports::add_import(
            &unit,
            "@mw/web",
            &ImportRequest::Namespace("WebFramework".to_string()),
        );
        decorators::upsert_list_property(
            &unit,
            &target,
            "imports",
            &[LiteralValue::ident("WebFramework")],
            ListMode::Upsert,
            false,
        );
        members::upsert_method(
            &unit,
            &target,
            "onReady",
            &MethodSpec {
                is_async: true,
                params: Vec::new(),
                statements: vec!["await ready();".to_string()],
            },
        );

        store.flush().unwrap();
        let out = fs::read_to_string(&path).unwrap();
        assert_eq!(
            out,
            "import * as WebFramework from '@mw/web';\nimport { Configuration } from '@mw/decorator';\n\n@Configuration({\n  imports: [WebFramework],\n  importConfigs: [],\n})\nexport class AutoConfiguration {\n  async onReady() {\n    await ready();\n  }\n}\n"
        );

        // A second identical run parses the emitted file and changes nothing.
        let mut store2 = SourceStore::new();
        let unit2 = store2.get_unit(&path).unwrap();
        imports::add_import(&unit2, "@mw/decorator", &ImportRequest::named(&["Configuration"]));
        members::upsert_method(
            &unit2,
            &target,
            "onReady",
            &MethodSpec {
                is_async: true,
                params: Vec::new(),
                statements: vec!["await ready();".to_string()],
            },
        );
        assert!(!unit2.borrow().changed);
        assert!(store2.flush().unwrap().written.is_empty());
    }
}
