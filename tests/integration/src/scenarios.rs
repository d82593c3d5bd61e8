//! End-to-end load scenarios
//!
//! Each test builds an addons directory on disk, reads it back through
//! discovery and runs it through the resolver or a full load pass.

use std::collections::BTreeSet;

use addon_core::{Error, Exclusion, Loader, ModuleState, Request, StateLedger};
use addon_graph::{ExclusionReason, Selection, resolve};
use addon_manifest::discover;
use addon_registry::CallContext;
use addon_test_utils::{AddonTree, EventLog};
use pretty_assertions::assert_eq;
use serde_json::json;

/// Loader with recorded data files and the default module source, so model
/// contributions come from each addon's `models/*.toml`.
fn loader(tree: &AddonTree, log: &EventLog) -> Loader {
    Loader::builder(tree.config())
        .records(log.clone())
        .hooks(log.clone())
        .build()
}

fn only(keys: &[&str]) -> Selection {
    Selection::Only(keys.iter().map(|k| k.to_string()).collect::<BTreeSet<_>>())
}

// =============================================================================
// Resolution
// =============================================================================

#[test]
fn test_linear_chain_loads_in_dependency_order() {
    let tree = AddonTree::new();
    tree.addon("sale_crm").depends(&["sale"]).data(&["data/sale_crm.xml"]).write();
    tree.addon("sale").depends(&["base"]).data(&["data/sale.xml"]).write();
    tree.addon("base").data(&["data/base.xml"]).write();

    let discovery = discover(&[tree.addons_path()]).unwrap();
    let resolution = resolve(&discovery.manifests, &Selection::All);
    assert_eq!(resolution.order, vec!["base", "sale", "sale_crm"]);

    let log = EventLog::new();
    let report = loader(&tree, &log).run(&Request::install(["sale_crm"])).unwrap();
    assert_eq!(report.installed, vec!["base", "sale", "sale_crm"]);
    assert_eq!(log.modules(), vec!["base", "sale", "sale_crm"]);
}

#[test]
fn test_resolution_is_stable_across_runs() {
    let tree = AddonTree::new();
    tree.addon("base").write();
    for key in ["web", "mail", "crm", "account", "sale", "stock"] {
        tree.addon(key).depends(&["base"]).write();
    }
    tree.addon("sale_stock").depends(&["sale", "stock"]).write();

    let first = resolve(&discover(&[tree.addons_path()]).unwrap().manifests, &Selection::All);
    let second = resolve(&discover(&[tree.addons_path()]).unwrap().manifests, &Selection::All);

    assert_eq!(first.order, second.order);
    assert_eq!(first.order.first().map(String::as_str), Some("base"));
    assert_eq!(first.order.last().map(String::as_str), Some("sale_stock"));
}

#[test]
fn test_cycle_members_are_excluded() {
    let tree = AddonTree::new();
    tree.addon("a").depends(&["b"]).write();
    tree.addon("b").depends(&["a"]).write();

    let discovery = discover(&[tree.addons_path()]).unwrap();
    let resolution = resolve(&discovery.manifests, &only(&["a"]));
    assert!(resolution.order.is_empty());
    assert!(matches!(resolution.excluded.get("a"), Some(ExclusionReason::CycleMember(_))));
    assert!(matches!(resolution.excluded.get("b"), Some(ExclusionReason::CycleMember(_))));

    let log = EventLog::new();
    let report = loader(&tree, &log).run(&Request::install(["a"])).unwrap();
    assert!(report.installed.is_empty());
    assert_eq!(report.blocked, vec!["a"]);
    assert!(matches!(
        report.excluded.get("a"),
        Some(Exclusion::Unresolvable(ExclusionReason::CycleMember(_)))
    ));
    assert!(log.events().is_empty());
}

#[test]
fn test_missing_dependency_excludes_module() {
    let tree = AddonTree::new();
    tree.addon("x").depends(&["missing"]).write();
    tree.addon("y").depends(&["x"]).write();

    let log = EventLog::new();
    let report = loader(&tree, &log).run(&Request::install(["y"])).unwrap();

    assert_eq!(
        report.excluded.get("x"),
        Some(&Exclusion::Unresolvable(ExclusionReason::MissingDep("missing".to_string())))
    );
    assert_eq!(
        report.excluded.get("y"),
        Some(&Exclusion::Unresolvable(ExclusionReason::DependsOnExcluded("x".to_string())))
    );
    assert_eq!(report.blocked, vec!["y"]);
    assert!(report.installed.is_empty());
}

// =============================================================================
// Composition
// =============================================================================

const PARTNER: &str = r#"
[[declare]]
model = "partner"
methods = ["display"]

[[declare.fields]]
name = "name"
type = "string"
"#;

const PARTNER_PHONE: &str = r#"
[[extend]]
model = "partner"
methods = ["display"]

[[extend.fields]]
name = "phone"
type = "string"
"#;

#[test]
fn test_extension_adds_fields_and_overrides_method() {
    let tree = AddonTree::new();
    tree.addon("base").write();
    tree.models_file("base", "partner.toml", PARTNER);
    tree.addon("extra").depends(&["base"]).write();
    tree.models_file("extra", "partner.toml", PARTNER_PHONE);

    let log = EventLog::new();
    let loader = loader(&tree, &log);
    loader.run(&Request::install(["extra"])).unwrap();

    let registry = loader.registry();
    let partner = registry.get("partner").unwrap();
    let fields: Vec<&str> = partner.fields().iter().map(|f| f.decl.name.as_str()).collect();
    assert_eq!(fields, vec!["name", "phone"]);
    assert_eq!(partner.field("phone").unwrap().module, "extra");

    let display = partner.method("display").unwrap();
    assert_eq!(display.modules().collect::<Vec<_>>(), vec!["base", "extra"]);

    // extra runs first and delegates down to base, which answers
    let result = registry
        .call("partner", "display", &CallContext::new("admin"), &[])
        .unwrap();
    assert_eq!(result, json!({"model": "partner", "method": "display", "module": "base"}));
}

#[test]
fn test_duplicate_declaration_keeps_published_registry() {
    let tree = AddonTree::new();
    tree.addon("base").write();
    tree.models_file("base", "partner.toml", PARTNER);
    let log = EventLog::new();
    let loader = loader(&tree, &log);
    loader.run(&Request::install(["base"])).unwrap();
    let before = loader.registry();

    tree.addon("other").depends(&["base"]).write();
    tree.models_file("other", "partner.toml", PARTNER);
    let err = loader.run(&Request::install(["other"])).unwrap_err();

    assert!(matches!(
        err,
        Error::Compose(addon_registry::Error::DuplicateDeclaration { ref model, .. }) if model == "partner"
    ));
    let after = loader.registry();
    assert_eq!(after.modules(), before.modules());
    assert_eq!(after.get("partner").unwrap().declared_by, "base");

    let ledger = StateLedger::load(&tree.state_file()).unwrap();
    assert_eq!(ledger.state("other"), ModuleState::Uninstalled);
}

// =============================================================================
// Auto-install
// =============================================================================

#[test]
fn test_auto_install_follows_both_triggers() {
    let tree = AddonTree::new();
    tree.addon("base").write();
    tree.addon("sale").depends(&["base"]).write();
    tree.addon("crm").depends(&["base"]).write();
    tree.addon("auto")
        .depends(&["sale", "crm"])
        .auto_install_on(&["sale", "crm"])
        .write();

    let log = EventLog::new();
    let report = loader(&tree, &log).run(&Request::install(["sale", "crm"])).unwrap();

    assert_eq!(report.auto_installed, vec!["auto"]);
    let position = |key: &str| report.installed.iter().position(|k| k == key).unwrap();
    assert!(position("auto") > position("sale"));
    assert!(position("auto") > position("crm"));
}

#[test]
fn test_auto_install_waits_for_every_trigger() {
    let tree = AddonTree::new();
    tree.addon("base").write();
    tree.addon("sale").depends(&["base"]).write();
    tree.addon("crm").depends(&["base"]).write();
    tree.addon("auto")
        .depends(&["sale", "crm"])
        .auto_install_on(&["sale", "crm"])
        .write();

    let log = EventLog::new();
    let report = loader(&tree, &log).run(&Request::install(["sale"])).unwrap();

    assert_eq!(report.installed, vec!["base", "sale"]);
    assert!(report.auto_installed.is_empty());
    let ledger = StateLedger::load(&tree.state_file()).unwrap();
    assert_eq!(ledger.state("auto"), ModuleState::Uninstalled);
}
