//! Decorator argument merger.
//!
//! Edits target the first argument object of a configuration carrier: a
//! class decorated with a given decorator, or an `export default factory()`
//! call. Array-valued properties inside that object are treated as
//! order-insensitive, deduplicated lists keyed by literal-value equality,
//! which is what makes re-running a migration a no-op.

use crate::core::store::UnitRef;
use crate::edit::EditOutcome;
use crate::model::tree::{
    ClassDecl, ClassMember, Decorator, Expr, ObjectProp, SourceTree, StatementId, StatementKind,
};
use crate::model::value::LiteralValue;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Names describing where a configuration object lives. All three are data
/// supplied by the migration rules, not engine constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigTarget {
    /// Class decorator carrying the configuration object.
    pub decorator: String,
    /// Callee of the `export default factory(…)` alternative form.
    pub factory: String,
    /// Class name used when a configuration class has to be synthesized.
    pub class_name: String,
}

impl ConfigTarget {
    pub fn new(
        decorator: impl Into<String>,
        factory: impl Into<String>,
        class_name: impl Into<String>,
    ) -> Self {
        Self {
            decorator: decorator.into(),
            factory: factory.into(),
            class_name: class_name.into(),
        }
    }
}

/// Whether a list upsert merges entries in or filters them out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListMode {
    Upsert,
    Remove,
}

/// A located configuration carrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Class(StatementId),
    Factory(StatementId),
}

/// Find the configuration carrier: the first matching decorated class wins,
/// then the factory-call form.
pub fn find_target(tree: &SourceTree, target: &ConfigTarget) -> Option<TargetKind> {
    for stmt in tree.statements() {
        if let Some(class) = stmt.as_class() {
            if class.decorator(&target.decorator).is_some() {
                return Some(TargetKind::Class(stmt.id()));
            }
        }
    }
    for stmt in tree.statements() {
        if let Some(call) = stmt.as_export_call() {
            if call.callee == target.factory {
                return Some(TargetKind::Factory(stmt.id()));
            }
        }
    }
    None
}

/// Locate the configuration carrier, synthesizing a minimal decorated class
/// when the unit has neither form. The synthesized class gets one empty
/// array per seed key; importing the decorator symbol is the caller's duty.
pub fn ensure_config_target(
    unit: &UnitRef,
    target: &ConfigTarget,
    seed_keys: &[&str],
) -> TargetKind {
    if let Some(found) = find_target(&unit.borrow().tree, target) {
        return found;
    }
    debug!(class = %target.class_name, "synthesizing configuration class");
    let mut guard = unit.borrow_mut();
    let unit_ref = &mut *guard;
    let props = seed_keys
        .iter()
        .map(|key| ObjectProp::Pair {
            key: (*key).to_string(),
            value: Expr::Array(Vec::new()),
        })
        .collect();
    let class = ClassDecl {
        decorators: vec![Decorator::call(
            target.decorator.clone(),
            vec![Expr::Object(props)],
        )],
        modifiers: vec!["export".to_string()],
        name: target.class_name.clone(),
        heritage: None,
        members: Vec::new(),
    };
    let id = unit_ref.tree.push_statement(StatementKind::Class(class));
    unit_ref.changed = true;
    TargetKind::Class(id)
}

/// Upsert (or remove from) the array-valued property `key` of the carrier's
/// first argument object.
///
/// With [`ListMode::Upsert`], values already present (same kind, identical
/// rendered text) are skipped and the rest appended, or prepended one by one
/// when `insert_first` is set. With [`ListMode::Remove`], entries matching
/// any given value are dropped; an empty `values` list clears the property
/// entirely.
///
/// On successful application the unit is marked changed unconditionally,
/// even if the list ends up identical; callers wanting precision diff
/// upstream before calling.
pub fn upsert_list_property(
    unit: &UnitRef,
    target: &ConfigTarget,
    key: &str,
    values: &[LiteralValue],
    mode: ListMode,
    insert_first: bool,
) -> EditOutcome {
    let kind = ensure_config_target(unit, target, &[]);
    let mut guard = unit.borrow_mut();
    let unit_ref = &mut *guard;
    let tree = &mut unit_ref.tree;

    let args: &mut Vec<Expr> = match kind {
        TargetKind::Class(id) => {
            let Some(class) = tree.statement_mut(id).and_then(|s| s.as_class_mut()) else {
                return EditOutcome::Unsupported;
            };
            let Some(deco) = class.decorator_mut(&target.decorator) else {
                return EditOutcome::Unsupported;
            };
            deco.args.get_or_insert_with(Vec::new)
        }
        TargetKind::Factory(id) => {
            let Some(call) = tree.statement_mut(id).and_then(|s| s.as_export_call_mut()) else {
                return EditOutcome::Unsupported;
            };
            &mut call.args
        }
    };
    if args.is_empty() {
        args.push(Expr::Object(Vec::new()));
    }
    let Expr::Object(props) = &mut args[0] else {
        return EditOutcome::Unsupported;
    };

    let found = props
        .iter()
        .position(|p| matches!(p, ObjectProp::Pair { key: k, .. } if k == key));
    let idx = match found {
        Some(i) => i,
        None => {
            props.push(ObjectProp::Pair {
                key: key.to_string(),
                value: Expr::Array(Vec::new()),
            });
            props.len() - 1
        }
    };
    let ObjectProp::Pair { value, .. } = &mut props[idx] else {
        return EditOutcome::Unsupported;
    };
    let Expr::Array(elements) = value else {
        return EditOutcome::Unsupported;
    };

    let current: Vec<LiteralValue> = elements.iter().map(LiteralValue::from_expr).collect();
    let next = match mode {
        ListMode::Remove => {
            if values.is_empty() {
                Vec::new()
            } else {
                current
                    .into_iter()
                    .filter(|entry| !values.iter().any(|v| v.same_as(entry)))
                    .collect()
            }
        }
        ListMode::Upsert => {
            let mut list = current;
            for value in values {
                if list.iter().any(|entry| entry.same_as(value)) {
                    continue;
                }
                if insert_first {
                    list.insert(0, value.clone());
                } else {
                    list.push(value.clone());
                }
            }
            list
        }
    };
    *elements = next.iter().map(LiteralValue::to_expr).collect();
    unit_ref.changed = true;
    EditOutcome::Applied
}

/// One decorator occurrence with its owner, for read-only inspection.
#[derive(Debug, Clone)]
pub struct DecoratorSite {
    pub class_name: String,
    /// `None` for class-level decorators.
    pub member_name: Option<String>,
    pub decorator: Decorator,
}

/// Every class- and member-level decorator in the file.
pub fn list_decorators(tree: &SourceTree) -> Vec<DecoratorSite> {
    let mut sites = Vec::new();
    for stmt in tree.statements() {
        let Some(class) = stmt.as_class() else {
            continue;
        };
        for deco in &class.decorators {
            sites.push(DecoratorSite {
                class_name: class.name.clone(),
                member_name: None,
                decorator: deco.clone(),
            });
        }
        for member in &class.members {
            let (name, decos) = match member {
                ClassMember::Property(p) => (p.name.clone(), &p.decorators),
                ClassMember::Method(m) => (m.name.clone(), &m.decorators),
                ClassMember::Raw(_) => continue,
            };
            for deco in decos {
                sites.push(DecoratorSite {
                    class_name: class.name.clone(),
                    member_name: Some(name.clone()),
                    decorator: deco.clone(),
                });
            }
        }
    }
    sites
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderConfig;
    use crate::core::parse::parse_source;
    use crate::core::store::SourceUnit;
    use crate::core::store::UnitRef;
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

    fn target() -> ConfigTarget {
        ConfigTarget::new("Configuration", "createConfiguration", "AutoConfiguration")
    }

    const DECORATED: &str = "import { Configuration } from '@mw/decorator';\n\n@Configuration({\n  imports: [],\n})\nexport class ContainerLifeCycle {}\n";

    #[test]
    fn upsert_is_idempotent() {
        let unit = unit_from(DECORATED);
        let values = [LiteralValue::ident("WebFramework")];
        assert_eq!(
            upsert_list_property(&unit, &target(), "imports", &values, ListMode::Upsert, false),
            EditOutcome::Applied
        );
        assert_eq!(
            upsert_list_property(&unit, &target(), "imports", &values, ListMode::Upsert, false),
            EditOutcome::Applied
        );
        let out = rendered(&unit);
        assert_eq!(out.matches("WebFramework").count(), 1);
    }

    #[test]
    fn upsert_creates_missing_property() {
        let unit = unit_from(DECORATED);
        let values = [LiteralValue::func(
            "join",
            vec![LiteralValue::ident("__dirname"), LiteralValue::string("./config")],
        )];
        upsert_list_property(&unit, &target(), "importConfigs", &values, ListMode::Upsert, false);
        assert!(rendered(&unit).contains("importConfigs: [join(__dirname, './config')]"));
    }

    #[test]
    fn insert_first_lands_at_the_front() {
        let unit = unit_from(
            "@Configuration({\n  imports: [Existing],\n})\nexport class C {}\n",
        );
        upsert_list_property(
            &unit,
            &target(),
            "imports",
            &[LiteralValue::ident("First")],
            ListMode::Upsert,
            true,
        );
        assert!(rendered(&unit).contains("imports: [First, Existing]"));
    }

    #[test]
    fn remove_with_empty_values_clears_the_list() {
        let unit = unit_from(
            "@Configuration({\n  importConfigs: [join(__dirname, './config')],\n})\nexport class C {}\n",
        );
        upsert_list_property(&unit, &target(), "importConfigs", &[], ListMode::Remove, false);
        assert!(rendered(&unit).contains("importConfigs: []"));
    }

    #[test]
    fn remove_filters_matching_entries_only() {
        let unit = unit_from(
            "@Configuration({\n  imports: [KeepMe, DropMe],\n})\nexport class C {}\n",
        );
        upsert_list_property(
            &unit,
            &target(),
            "imports",
            &[LiteralValue::ident("DropMe")],
            ListMode::Remove,
            false,
        );
        let out = rendered(&unit);
        assert!(out.contains("imports: [KeepMe]"));
    }

    #[test]
    fn factory_call_form_is_supported() {
        let unit = unit_from("export default createConfiguration({\n  imports: [],\n});\n");
        upsert_list_property(
            &unit,
            &target(),
            "imports",
            &[LiteralValue::ident("WebFramework")],
            ListMode::Upsert,
            false,
        );
        assert_eq!(
            rendered(&unit),
            "export default createConfiguration({\n  imports: [WebFramework],\n});\n"
        );
    }

    #[test]
    fn missing_target_synthesizes_decorated_class() {
        let unit = unit_from("");
        let kind = ensure_config_target(&unit, &target(), &["imports", "importConfigs"]);
        assert!(matches!(kind, TargetKind::Class(_)));
        assert!(unit.borrow().changed);
        assert_eq!(
            rendered(&unit),
            "@Configuration({\n  imports: [],\n  importConfigs: [],\n})\nexport class AutoConfiguration {}\n"
        );
    }

    #[test]
    fn upsert_on_empty_unit_self_heals() {
        let unit = unit_from("");
        upsert_list_property(
            &unit,
            &target(),
            "imports",
            &[LiteralValue::ident("WebFramework")],
            ListMode::Upsert,
            false,
        );
        assert!(rendered(&unit).contains("imports: [WebFramework]"));
    }

    #[test]
    fn unrelated_spread_entries_survive_merges() {
        let unit = unit_from(
            "@Configuration({\n  imports: [...(extra ? [A] : []), B],\n})\nexport class C {}\n",
        );
        upsert_list_property(
            &unit,
            &target(),
            "imports",
            &[LiteralValue::ident("B"), LiteralValue::ident("New")],
            ListMode::Upsert,
            false,
        );
        assert!(rendered(&unit).contains("imports: [...(extra ? [A] : []), B, New]"));
    }

    #[test]
    fn lists_class_and_member_decorators() {
        let tree = parse_source(
            "@Provide()\n@Controller('/')\nexport class Home {\n  @Get('/')\n  async index(@Query() q) {\n    return q;\n  }\n}\n",
        )
        .unwrap();
        let sites = list_decorators(&tree);
        let names: Vec<(&str, Option<&str>)> = sites
            .iter()
            .map(|s| (s.decorator.name.as_str(), s.member_name.as_deref()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("Provide", None),
                ("Controller", None),
                ("Get", Some("index")),
            ]
        );
    }
}
