//! Module lifecycle across several load passes
//!
//! These tests use the loader's default hook provider, so lifecycle hooks
//! are real shell scripts under `<addon>/hooks/`.

use std::fs;
use std::sync::Arc;
use std::thread;

use addon_core::{AbortCause, ConfigResolver, HookKind, Loader, ModuleState, Request, StateLedger};
use addon_test_utils::{AddonTree, Event, EventLog};
use pretty_assertions::assert_eq;

/// Appends the running hook's kind to `<addon>/hooks.log`.
const LOG_HOOK: &str = "echo \"$ADDON_HOOK\" >> \"$ADDON_PATH/hooks.log\"\n";

fn loader(tree: &AddonTree, log: &EventLog) -> Loader {
    Loader::builder(tree.config()).records(log.clone()).build()
}

#[test]
fn test_hook_scripts_run_at_each_transition() {
    let tree = AddonTree::new();
    let dir = tree
        .addon("stock")
        .data(&["data/stock.xml"])
        .pre_init_hook("setup")
        .post_init_hook("finish")
        .uninstall_hook("cleanup")
        .write();
    for name in ["setup", "finish", "cleanup"] {
        tree.hook_script("stock", name, LOG_HOOK);
    }
    let log = EventLog::new();
    let loader = loader(&tree, &log);

    loader.run(&Request::install(["stock"])).unwrap();
    assert_eq!(
        fs::read_to_string(dir.join("hooks.log")).unwrap(),
        "pre_init\npost_init\n"
    );

    let report = loader.run(&Request::remove(["stock"], false)).unwrap();
    assert_eq!(report.removed, vec!["stock"]);
    assert_eq!(
        fs::read_to_string(dir.join("hooks.log")).unwrap(),
        "pre_init\npost_init\nuninstall\n"
    );
    assert_eq!(
        log.events(),
        vec![Event::load("stock", "data/stock.xml"), Event::purge("stock")]
    );
}

#[test]
fn test_failing_hook_script_aborts_install() {
    let tree = AddonTree::new();
    tree.addon("base").write();
    tree.addon("stock")
        .depends(&["base"])
        .data(&["data/stock.xml"])
        .pre_init_hook("setup")
        .write();
    tree.hook_script("stock", "setup", "echo 'no warehouse' >&2\nexit 3\n");
    let log = EventLog::new();

    let report = loader(&tree, &log).run(&Request::install(["stock"])).unwrap();

    assert_eq!(report.installed, vec!["base"]);
    match report.abort_cause("stock") {
        Some(AbortCause::Hook { event, hook, message }) => {
            assert_eq!(*event, HookKind::PreInit);
            assert_eq!(hook, "setup");
            assert!(message.contains("exited with code 3: no warehouse"), "{message}");
        }
        other => panic!("unexpected cause: {other:?}"),
    }
    // the hook failed before any data file
    assert!(log.files_for("stock").is_empty());

    let ledger = StateLedger::load(&tree.state_file()).unwrap();
    assert_eq!(ledger.state("stock"), ModuleState::Uninstalled);
    assert_eq!(ledger.state("base"), ModuleState::Installed);
}

#[test]
fn test_missing_hook_script_aborts_install() {
    let tree = AddonTree::new();
    tree.addon("stock").post_init_hook("finish").write();
    let log = EventLog::new();

    let report = loader(&tree, &log).run(&Request::install(["stock"])).unwrap();

    assert!(report.installed.is_empty());
    assert!(matches!(
        report.abort_cause("stock"),
        Some(AbortCause::Hook { event: HookKind::PostInit, .. })
    ));
}

#[test]
fn test_upgrade_clears_descriptor_drift() {
    let tree = AddonTree::new();
    tree.addon("sale").version("1.0").data(&["data/sale.xml"]).write();
    let log = EventLog::new();
    let loader = loader(&tree, &log);
    loader.run(&Request::install(["sale"])).unwrap();

    tree.addon("sale").version("2.0").data(&["data/sale.xml"]).write();
    let row = |loader: &Loader| {
        loader
            .status()
            .unwrap()
            .into_iter()
            .find(|row| row.key == "sale")
            .unwrap()
    };
    let pending = row(&loader);
    assert!(pending.checksum_drift);
    assert_eq!(pending.installed_version.as_deref(), Some("1.0"));
    assert_eq!(pending.version.as_deref(), Some("2.0"));

    log.clear();
    let report = loader.run(&Request::upgrade(["sale"])).unwrap();
    assert_eq!(report.upgraded, vec!["sale"]);
    assert_eq!(log.files_for("sale"), vec!["data/sale.xml"]);

    let upgraded = row(&loader);
    assert!(!upgraded.checksum_drift);
    assert_eq!(upgraded.installed_version.as_deref(), Some("2.0"));
    assert_eq!(upgraded.state, ModuleState::Installed);
}

// =============================================================================
// Published registry
// =============================================================================

const PARTNER: &str = "[[declare]]\nmodel = \"res.partner\"\n\n[[declare.fields]]\nname = \"name\"\ntype = \"string\"\n";
const PARTNER_PHONE: &str = "[[extend]]\nmodel = \"res.partner\"\n\n[[extend.fields]]\nname = \"phone\"\ntype = \"string\"\n";

#[test]
fn test_earlier_snapshots_are_unaffected_by_later_passes() {
    let tree = AddonTree::new();
    tree.addon("base").write();
    tree.models_file("base", "partner.toml", PARTNER);
    tree.addon("phone").depends(&["base"]).write();
    tree.models_file("phone", "partner.toml", PARTNER_PHONE);
    let log = EventLog::new();
    let loader = loader(&tree, &log);

    loader.run(&Request::install(["base"])).unwrap();
    let before = loader.registry();
    loader.run(&Request::install(["phone"])).unwrap();
    let after = loader.registry();

    assert!(before.get("res.partner").unwrap().field("phone").is_none());
    assert!(after.get("res.partner").unwrap().field("phone").is_some());

    loader.run(&Request::remove(["phone"], false)).unwrap();
    assert!(loader.registry().get("res.partner").unwrap().field("phone").is_none());
    assert!(after.get("res.partner").unwrap().field("phone").is_some());
}

#[test]
fn test_registry_is_readable_from_many_threads() {
    let tree = AddonTree::new();
    tree.addon("base").write();
    tree.models_file("base", "partner.toml", PARTNER);
    let log = EventLog::new();
    let loader = Arc::new(loader(&tree, &log));
    loader.run(&Request::install(["base"])).unwrap();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let loader = Arc::clone(&loader);
            thread::spawn(move || {
                let registry = loader.registry();
                registry.get("res.partner").map(|model| model.declared_by.clone())
            })
        })
        .collect();

    for reader in readers {
        assert_eq!(reader.join().unwrap().as_deref(), Some("base"));
    }
}

#[test]
fn test_restarted_loader_rebuilds_registry_from_state() {
    let tree = AddonTree::new();
    tree.addon("base").write();
    tree.models_file("base", "partner.toml", PARTNER);
    let log = EventLog::new();
    loader(&tree, &log).run(&Request::install(["base"])).unwrap();

    let restarted = loader(&tree, &log);
    assert!(restarted.registry().is_empty());
    let report = restarted.run(&Request::Load).unwrap();

    assert!(report.installed.is_empty());
    assert_eq!(report.loaded, vec!["base"]);
    assert!(restarted.registry().get("res.partner").is_some());
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_config_file_drives_demo_data() {
    let tree = AddonTree::new();
    tree.addon("base")
        .data(&["data/base.xml"])
        .demo(&["demo/partners.xml"])
        .write();
    fs::write(
        tree.root().join("addons.toml"),
        "addons_paths = [\"addons\"]\nstate_file = \"var/state.toml\"\nload_demo = true\ncheck_external_dependencies = false\n",
    )
    .unwrap();

    let config = ConfigResolver::new(tree.root())
        .with_env(Default::default())
        .resolve()
        .unwrap();
    let log = EventLog::new();
    let report = Loader::builder(config)
        .records(log.clone())
        .build()
        .run(&Request::Load)
        .unwrap();

    // base is server-wide by default
    assert_eq!(report.installed, vec!["base"]);
    assert_eq!(
        log.events(),
        vec![
            Event::load("base", "data/base.xml"),
            Event::demo("base", "demo/partners.xml"),
        ]
    );
    assert!(tree.root().join("var/state.toml").is_file());
}
