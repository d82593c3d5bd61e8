//! Tests for composing module contributions

use addon_registry::{
    CallContext, Contribution, Error, FieldDecl, FieldKind, MethodError, ModuleContributions, compose,
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

fn string_field(name: &str) -> FieldDecl {
    FieldDecl::new(name, FieldKind::String)
}

/// A body that records its module, then delegates when there is a super.
fn tracing_body(
    module: &'static str,
    calls: Arc<Mutex<Vec<&'static str>>>,
) -> impl Fn(&CallContext, addon_registry::Super<'_>, &[Value]) -> Result<Value, MethodError> + Send + Sync + 'static
{
    move |ctx, sup, args| {
        calls.lock().unwrap().push(module);
        if sup.exists() { sup.call(ctx, args) } else { Ok(json!(module)) }
    }
}

fn partner_modules() -> Vec<ModuleContributions> {
    vec![
        ModuleContributions::new("base").with(
            Contribution::declare("partner")
                .field(string_field("name"))
                .method("display", |_, _, _| Ok(json!("base"))),
        ),
        ModuleContributions::new("extra").depends_on(["base"]).with(
            Contribution::extend("partner")
                .field(string_field("phone"))
                .method("display", |_, _, _| Ok(json!("extra"))),
        ),
    ]
}

#[test]
fn test_extension_adds_fields_and_overrides() {
    let composition = compose(&partner_modules()).unwrap();
    let partner = composition.registry.get("partner").unwrap();

    assert_eq!(partner.field_names().collect::<Vec<_>>(), vec!["name", "phone"]);
    assert_eq!(partner.declared_by, "base");
    assert_eq!(partner.extended_by, vec!["extra"]);
    assert_eq!(
        partner.call("display", &CallContext::default(), &[]).unwrap(),
        json!("extra")
    );
}

#[test]
fn test_method_chain_runs_most_recent_first() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let modules = vec![
        ModuleContributions::new("a")
            .with(Contribution::declare("thing").method("f", tracing_body("a", calls.clone()))),
        ModuleContributions::new("b")
            .depends_on(["a"])
            .with(Contribution::extend("thing").method("f", tracing_body("b", calls.clone()))),
        ModuleContributions::new("c")
            .depends_on(["a", "b"])
            .with(Contribution::extend("thing").method("f", tracing_body("c", calls.clone()))),
    ];

    let registry = compose(&modules).unwrap().registry;
    let result = registry
        .get("thing")
        .unwrap()
        .call("f", &CallContext::default(), &[])
        .unwrap();

    assert_eq!(result, json!("a"));
    assert_eq!(*calls.lock().unwrap(), vec!["c", "b", "a"]);
    assert_eq!(registry.get("thing").unwrap().method("f").unwrap().len(), 3);
}

#[test]
fn test_field_redeclaration_replaces_in_place() {
    let modules = vec![
        ModuleContributions::new("base").with(
            Contribution::declare("partner")
                .field(string_field("name").label("Name"))
                .field(string_field("ref")),
        ),
        ModuleContributions::new("crm")
            .depends_on(["base"])
            .with(Contribution::extend("partner").field(
                FieldDecl::new("name", FieldKind::Text)
                    .label("Full name")
                    .required(),
            )),
    ];

    let registry = compose(&modules).unwrap().registry;
    let partner = registry.get("partner").unwrap();

    assert_eq!(partner.field_names().collect::<Vec<_>>(), vec!["name", "ref"]);
    let name = partner.field("name").unwrap();
    assert_eq!(name.decl.kind, FieldKind::Text);
    assert_eq!(name.decl.label.as_deref(), Some("Full name"));
    assert!(name.decl.required);
    assert_eq!(name.module, "crm");
}

#[test]
fn test_composition_is_idempotent() {
    let modules = partner_modules();

    let first = compose(&modules).unwrap().registry;
    let second = compose(&modules).unwrap().registry;

    assert_eq!(first, second);
    assert_eq!(first.publish(), second.publish());
}

#[test]
fn test_duplicate_declaration_is_fatal() {
    let modules = vec![
        ModuleContributions::new("base").with(Contribution::declare("partner")),
        ModuleContributions::new("other").with(Contribution::declare("partner")),
    ];

    let err = compose(&modules).unwrap_err();

    assert_eq!(
        err,
        Error::DuplicateDeclaration {
            model: "partner".to_string(),
            module: "other".to_string(),
            declared_by: "base".to_string(),
        }
    );
    assert!(err.is_fatal());
}

#[test]
fn test_extends_unknown_rejects_module_and_dependents() {
    let modules = vec![
        ModuleContributions::new("base").with(Contribution::declare("partner")),
        ModuleContributions::new("broken")
            .depends_on(["base"])
            .with(Contribution::declare("broken.model"))
            .with(Contribution::extend("nowhere").field(string_field("x"))),
        ModuleContributions::new("uses_broken").depends_on(["base", "broken"]),
        ModuleContributions::new("fine")
            .depends_on(["base"])
            .with(Contribution::extend("partner").field(string_field("fine"))),
    ];

    let composition = compose(&modules).unwrap();

    assert!(matches!(
        composition.rejection("broken"),
        Some(Error::ExtendsUnknown { model, .. }) if model == "nowhere"
    ));
    assert!(matches!(
        composition.rejection("uses_broken"),
        Some(Error::DependencyRejected { dependency, .. }) if dependency == "broken"
    ));
    // Nothing of the rejected module is applied.
    assert!(!composition.registry.contains("broken.model"));
    assert!(composition.registry.get("partner").unwrap().field("fine").is_some());
    assert_eq!(composition.registry.modules(), ["base", "fine"]);
}

#[test]
fn test_extending_outside_dependencies_is_rejected() {
    let modules = vec![
        ModuleContributions::new("base").with(Contribution::declare("partner")),
        ModuleContributions::new("stranger").with(Contribution::extend("partner")),
    ];

    let composition = compose(&modules).unwrap();

    assert!(matches!(
        composition.rejection("stranger"),
        Some(Error::ExtendsOutsideDependencies { declared_by, .. }) if declared_by == "base"
    ));
}

#[test]
fn test_related_first_hop_must_exist() {
    let related = |path: &[&str]| FieldKind::Related {
        path: path.iter().map(|p| p.to_string()).collect(),
    };
    let modules = vec![
        ModuleContributions::new("base").with(
            Contribution::declare("partner")
                .field(FieldDecl::new(
                    "company_id",
                    FieldKind::Many2one {
                        comodel: "company".to_string(),
                    },
                ))
                .field(FieldDecl::new("company_name", related(&["company_id", "name"]))),
        ),
        ModuleContributions::new("bad")
            .depends_on(["base"])
            .with(Contribution::extend("partner").field(FieldDecl::new("x", related(&["nope", "name"])))),
    ];

    let composition = compose(&modules).unwrap();

    assert!(composition.registry.get("partner").unwrap().field("company_name").is_some());
    assert!(matches!(
        composition.rejection("bad"),
        Some(Error::RelatedFirstHopMissing { hop, .. }) if hop == "nope"
    ));
}

#[test]
fn test_publish_resolves_comodels() {
    let modules = vec![ModuleContributions::new("base")
        .with(Contribution::declare("company").field(string_field("name")))
        .with(
            Contribution::declare("partner")
                .field(FieldDecl::new(
                    "company_id",
                    FieldKind::Many2one {
                        comodel: "company".to_string(),
                    },
                ))
                .field(FieldDecl::new(
                    "country_id",
                    FieldKind::Many2one {
                        comodel: "country".to_string(),
                    },
                )),
        )];

    let published = compose(&modules).unwrap().registry.publish();

    let company = published.model_id("company").unwrap();
    let partner = published.get("partner").unwrap();
    assert_eq!(partner.field("company_id").unwrap().comodel, Some(company));
    assert_eq!(partner.field("country_id").unwrap().comodel, None);
    assert_eq!(published.dangling().len(), 1);
    assert_eq!(published.dangling()[0].comodel, "country");

    let field_id = partner.field_id("country_id").unwrap();
    assert_eq!(partner.field_by_id(field_id).unwrap().decl.name, "country_id");
    assert_eq!(published.model(company).unwrap().key, "company");
}

#[test]
fn test_published_dispatch_errors() {
    let published = compose(&partner_modules()).unwrap().registry.publish();
    let ctx = CallContext::default();

    assert_eq!(published.call("partner", "display", &ctx, &[]).unwrap(), json!("extra"));
    assert!(matches!(
        published.call("nope", "display", &ctx, &[]),
        Err(MethodError::UnknownModel(_))
    ));
    assert!(matches!(
        published.call("partner", "nope", &ctx, &[]),
        Err(MethodError::UnknownMethod { .. })
    ));
}
