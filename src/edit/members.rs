//! Class member upserts: properties, method bodies, and parameter-decorator
//! argument materialization.
//!
//! Properties are last-writer-wins: an upsert replaces the existing member
//! in place. Method bodies are merged instead: statements are compared by
//! whitespace-collapsed text and only missing ones appended, so re-running a
//! migration never duplicates injected code and never disturbs manual edits.

use crate::core::store::UnitRef;
use crate::edit::EditOutcome;
use crate::edit::decorators::ConfigTarget;
use crate::emit::render::comparable_text;
use crate::model::tree::{
    ClassMember, Decorator, MethodMember, NamedParam, Param, PropertyMember, SourceTree,
    StatementId,
};
use crate::model::value::LiteralValue;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;
use tracing::debug;

/// Definition of a property to upsert.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropertySpec {
    /// Optional decorator-call wrapper: name plus argument values.
    pub decorator: Option<(String, Vec<LiteralValue>)>,
    /// Type annotation text, without the leading `:`.
    pub type_ann: Option<String>,
    /// Initializer value.
    pub value: Option<LiteralValue>,
}

/// Definition of a method to upsert.
///
/// Each entry of `statements` is one statement template. Templates may
/// reference `${args[N]}`, which is substituted with the `N`-th parameter
/// name; unresolvable placeholders are left verbatim.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MethodSpec {
    pub is_async: bool,
    pub params: Vec<String>,
    pub statements: Vec<String>,
}

/// The class carrying the target decorator, if any. Member upserts operate
/// on decorated classes only; the factory-call form has no members.
fn locate_class(tree: &SourceTree, target: &ConfigTarget) -> Option<StatementId> {
    tree.statements()
        .iter()
        .find(|stmt| {
            stmt.as_class()
                .is_some_and(|c| c.decorator(&target.decorator).is_some())
        })
        .map(|stmt| stmt.id())
}

/// Replace the first property named `name` in place, or prepend a new one.
pub fn upsert_property(
    unit: &UnitRef,
    target: &ConfigTarget,
    name: &str,
    spec: &PropertySpec,
) -> EditOutcome {
    let mut guard = unit.borrow_mut();
    let unit_ref = &mut *guard;
    let Some(id) = locate_class(&unit_ref.tree, target) else {
        return EditOutcome::Unsupported;
    };
    let Some(class) = unit_ref
        .tree
        .statement_mut(id)
        .and_then(|s| s.as_class_mut())
    else {
        return EditOutcome::Unsupported;
    };

    let decorators = spec
        .decorator
        .as_ref()
        .map(|(deco_name, args)| {
            vec![Decorator::call(
                deco_name.clone(),
                args.iter().map(LiteralValue::to_expr).collect(),
            )]
        })
        .unwrap_or_default();
    let property = PropertyMember {
        decorators,
        modifiers: Vec::new(),
        name: name.to_string(),
        mark: None,
        type_ann: spec.type_ann.clone(),
        value: spec.value.as_ref().map(LiteralValue::to_expr),
    };

    let existing = class.members.iter().position(
        |m| matches!(m, ClassMember::Property(p) if p.name == name),
    );
    match existing {
        Some(i) => class.members[i] = ClassMember::Property(property),
        None => class.members.insert(0, ClassMember::Property(property)),
    }
    unit_ref.changed = true;
    EditOutcome::Applied
}

/// Create the method if missing; otherwise append only the body statements
/// that are not already present.
pub fn upsert_method(
    unit: &UnitRef,
    target: &ConfigTarget,
    name: &str,
    spec: &MethodSpec,
) -> EditOutcome {
    let mut guard = unit.borrow_mut();
    let unit_ref = &mut *guard;
    let Some(id) = locate_class(&unit_ref.tree, target) else {
        return EditOutcome::Unsupported;
    };
    let Some(class) = unit_ref
        .tree
        .statement_mut(id)
        .and_then(|s| s.as_class_mut())
    else {
        return EditOutcome::Unsupported;
    };

    let body: Vec<String> = spec
        .statements
        .iter()
        .map(|t| substitute_params(t, &spec.params))
        .collect();

    let existing = class.members.iter().position(
        |m| matches!(m, ClassMember::Method(method) if method.name == name),
    );
    let Some(at) = existing else {
        let modifiers = if spec.is_async {
            vec!["async".to_string()]
        } else {
            Vec::new()
        };
        class.members.push(ClassMember::Method(MethodMember {
            decorators: Vec::new(),
            modifiers,
            name: name.to_string(),
            params: spec
                .params
                .iter()
                .map(|p| Param::Named(NamedParam::new(p)))
                .collect(),
            return_type: None,
            body,
        }));
        unit_ref.changed = true;
        return EditOutcome::Applied;
    };
    let ClassMember::Method(method) = &mut class.members[at] else {
        return EditOutcome::Unsupported;
    };

    let present: HashSet<String> = method.body.iter().map(|s| comparable_text(s)).collect();
    let mut added = 0;
    for stmt in body {
        if present.contains(&comparable_text(&stmt)) {
            continue;
        }
        method.body.push(stmt);
        added += 1;
    }
    if added == 0 {
        return EditOutcome::AlreadyPresent;
    }
    debug!(method = name, added, "injected method body statements");
    unit_ref.changed = true;
    EditOutcome::Applied
}

/// Give empty parameter-decorator calls their parameter's name as argument:
/// `@Query() name` becomes `@Query('name')`.
///
/// Applies only when the unit imports one of `decorator_names` (matched by
/// origin) from `module`; local aliases are honored. Bare decorators and
/// calls that already carry arguments are left alone.
pub fn materialize_param_decorator_args(
    unit: &UnitRef,
    module: &str,
    decorator_names: &[&str],
) -> EditOutcome {
    let mut guard = unit.borrow_mut();
    let unit_ref = &mut *guard;
    let tree = &mut unit_ref.tree;

    let locals: Vec<String> = match crate::edit::imports::describe_import(tree, module) {
        Some(crate::model::binding::ImportBinding::Named(specs)) => specs
            .iter()
            .filter(|s| decorator_names.iter().any(|n| *n == s.origin()))
            .map(|s| s.local.clone())
            .collect(),
        _ => Vec::new(),
    };
    if locals.is_empty() {
        return EditOutcome::AlreadyPresent;
    }

    let mut rewrote = 0;
    for stmt in tree.statements_mut() {
        let Some(class) = stmt.as_class_mut() else {
            continue;
        };
        for member in &mut class.members {
            let ClassMember::Method(method) = member else {
                continue;
            };
            for param in &mut method.params {
                let Param::Named(named) = param else {
                    continue;
                };
                for deco in &mut named.decorators {
                    if !locals.iter().any(|l| l == &deco.name) {
                        continue;
                    }
                    if let Some(args) = &mut deco.args {
                        if args.is_empty() {
                            args.push(crate::model::tree::Expr::String(named.name.clone()));
                            rewrote += 1;
                        }
                    }
                }
            }
        }
    }
    if rewrote == 0 {
        return EditOutcome::AlreadyPresent;
    }
    debug!(rewrote, "materialized parameter decorator arguments");
    unit_ref.changed = true;
    EditOutcome::Applied
}

/// Substitute `${args[N]}` placeholders with parameter names.
fn substitute_params(template: &str, params: &[String]) -> String {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    let re = PLACEHOLDER
        .get_or_init(|| Regex::new(r"\$\{\s*args\[(\d+)\]\s*\}").expect("placeholder regex"));
    re.replace_all(template, |caps: &regex::Captures<'_>| {
        caps[1]
            .parse::<usize>()
            .ok()
            .and_then(|i| params.get(i).cloned())
            .unwrap_or_else(|| caps[0].to_string())
    })
    .into_owned()
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

    fn target() -> ConfigTarget {
        ConfigTarget::new("Configuration", "createConfiguration", "AutoConfiguration")
    }

    const LIFECYCLE: &str = "@Configuration({\n  imports: [],\n})\nexport class ContainerLifeCycle {\n  async onReady() {\n    await existing();\n  }\n}\n";

    #[test]
    fn property_upsert_is_last_writer_wins() {
        let unit = unit_from(
            "@Configuration({})\nexport class C {\n  testKey = 123;\n}\n",
        );
        let spec = PropertySpec {
            value: Some(LiteralValue::Value(serde_json::json!(456))),
            ..PropertySpec::default()
        };
        assert_eq!(
            upsert_property(&unit, &target(), "testKey", &spec),
            EditOutcome::Applied
        );
        let out = rendered(&unit);
        assert!(out.contains("testKey = 456;"));
        assert!(!out.contains("123"));
    }

    #[test]
    fn new_property_is_prepended_with_decorator() {
        let unit = unit_from(
            "@Configuration({})\nexport class C {\n  async onReady() {}\n}\n",
        );
        let spec = PropertySpec {
            decorator: Some(("App".to_string(), Vec::new())),
            type_ann: Some("Application".to_string()),
            ..PropertySpec::default()
        };
        upsert_property(&unit, &target(), "app", &spec);
        let out = rendered(&unit);
        let app = out.find("@App()\n  app: Application;").expect("property rendered");
        let ready = out.find("onReady").expect("method kept");
        assert!(app < ready);
    }

    #[test]
    fn missing_method_is_synthesized() {
        let unit = unit_from("@Configuration({})\nexport class C {}\n");
        let spec = MethodSpec {
            is_async: true,
            params: vec!["container".to_string()],
            statements: vec!["await ${args[0]}.ready();".to_string()],
        };
        assert_eq!(
            upsert_method(&unit, &target(), "onReady", &spec),
            EditOutcome::Applied
        );
        assert!(
            rendered(&unit).contains("async onReady(container) {\n    await container.ready();\n  }")
        );
    }

    #[test]
    fn method_body_injection_is_idempotent() {
        let unit = unit_from(LIFECYCLE);
        let spec = MethodSpec {
            is_async: true,
            params: Vec::new(),
            statements: vec!["await injected();".to_string()],
        };
        assert_eq!(
            upsert_method(&unit, &target(), "onReady", &spec),
            EditOutcome::Applied
        );
        unit.borrow_mut().changed = false;
        assert_eq!(
            upsert_method(&unit, &target(), "onReady", &spec),
            EditOutcome::AlreadyPresent
        );
        assert!(!unit.borrow().changed);

        let out = rendered(&unit);
        assert_eq!(out.matches("await injected();").count(), 1);
        // Prior manual edits are untouched.
        assert!(out.contains("await existing();"));
    }

    #[test]
    fn member_ops_without_decorated_class_are_unsupported() {
        let unit = unit_from("export class Plain {}\n");
        assert_eq!(
            upsert_property(&unit, &target(), "x", &PropertySpec::default()),
            EditOutcome::Unsupported
        );
        assert_eq!(
            upsert_method(&unit, &target(), "onReady", &MethodSpec::default()),
            EditOutcome::Unsupported
        );
        assert!(!unit.borrow().changed);
    }

    #[test]
    fn placeholder_substitution() {
        let params = vec!["app".to_string(), "container".to_string()];
        assert_eq!(
            substitute_params("await ${args[1]}.ready(${ args[0] });", &params),
            "await container.ready(app);"
        );
        // Out-of-range placeholders are left verbatim.
        assert_eq!(
            substitute_params("use(${args[7]});", &params),
            "use(${args[7]});"
        );
    }

    #[test]
    fn materializes_empty_param_decorator_calls() {
        let unit = unit_from(
            "import { Controller, Get, Query } from '@mw/decorator';\n\n@Controller('/')\nexport class Home {\n  @Get('/')\n  async handle(@Query() name = 'midwayjs') {\n    return name;\n  }\n}\n",
        );
        assert_eq!(
            materialize_param_decorator_args(&unit, "@mw/decorator", &["Query", "Body"]),
            EditOutcome::Applied
        );
        assert!(rendered(&unit).contains("@Query('name') name = 'midwayjs'"));

        // Second run: the call already has arguments.
        unit.borrow_mut().changed = false;
        assert_eq!(
            materialize_param_decorator_args(&unit, "@mw/decorator", &["Query", "Body"]),
            EditOutcome::AlreadyPresent
        );
        assert!(!unit.borrow().changed);
    }

    #[test]
    fn materialization_honors_local_aliases() {
        let unit = unit_from(
            "import { Query as Q } from '@mw/decorator';\n\n@Controller('/')\nexport class Home {\n  async handle(@Q() id) {\n    return id;\n  }\n}\n",
        );
        assert_eq!(
            materialize_param_decorator_args(&unit, "@mw/decorator", &["Query"]),
            EditOutcome::Applied
        );
        assert!(rendered(&unit).contains("@Q('id') id"));
    }

    #[test]
    fn files_without_the_import_are_left_alone() {
        let unit = unit_from(
            "export class Home {\n  async handle(@Query() name) {\n    return name;\n  }\n}\n",
        );
        assert_eq!(
            materialize_param_decorator_args(&unit, "@mw/decorator", &["Query"]),
            EditOutcome::AlreadyPresent
        );
        assert!(!unit.borrow().changed);
    }
}
