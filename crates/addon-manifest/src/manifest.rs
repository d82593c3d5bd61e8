//! Typed addon manifest and the schema descriptors are validated against.
//!
//! A descriptor is a map. Recognized keys are converted into typed fields;
//! a recognized key holding the wrong type is a [`Error::TypeMismatch`].
//! Unrecognized keys never fail the read: they are kept verbatim in
//! [`Manifest::extras`] and reported as [`ManifestWarning::UnknownField`].
//!
//! # Example descriptor (`__manifest__.toml`)
//!
//! ```toml
//! name = "Sales"
//! version = "16.0.1.2"
//! category = "Sales/Sales"
//! depends = ["base", "product"]
//! data = ["security/ir.model.access.csv", "views/sale_views.xml"]
//! demo = ["data/sale_demo.xml"]
//! auto_install = false
//! post_init_hook = "post_init"
//!
//! [external_dependencies]
//! python = ["num2words"]
//! bin = ["wkhtmltopdf"]
//!
//! [assets]
//! "web.assets_backend" = ["sale/static/src/**/*.js"]
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::checksum::descriptor_checksum;
use crate::error::{Error, Result};
use crate::literal;

/// Descriptor filenames, in lookup order.
pub const DESCRIPTOR_FILENAMES: [&str; 3] = ["__manifest__.toml", "__manifest__.py", "__openerp__.py"];

const DEFAULT_VERSION: &str = "1.0";
const DEFAULT_CATEGORY: &str = "Uncategorized";
const DEFAULT_SEQUENCE: i64 = 100;

/// When a module installs itself without being asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "modules")]
pub enum AutoInstall {
    /// Installed only on request or as a dependency.
    #[default]
    Disabled,
    /// Installed once every declared dependency is installed.
    Dependencies,
    /// Installed once every listed module is installed.
    Modules(Vec<String>),
}

impl AutoInstall {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Disabled)
    }

    /// The trigger set, given the module's declared dependencies.
    pub fn triggers<'a>(&'a self, depends: &'a [String]) -> &'a [String] {
        match self {
            Self::Disabled => &[],
            Self::Dependencies => depends,
            Self::Modules(modules) => modules,
        }
    }
}

/// Names of the lifecycle hook producers a module declares.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LifecycleHooks {
    pub pre_init: Option<String>,
    pub post_init: Option<String>,
    pub uninstall: Option<String>,
}

/// Advisory requirements outside the addon ecosystem.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExternalDependencies {
    /// Interpreter packages.
    pub python: Vec<String>,
    /// Executables expected on `PATH`.
    pub bin: Vec<String>,
    /// Any other requirement kinds, kept as declared.
    pub other: BTreeMap<String, Vec<String>>,
}

impl ExternalDependencies {
    pub fn is_empty(&self) -> bool {
        self.python.is_empty() && self.bin.is_empty() && self.other.is_empty()
    }
}

/// One item of an asset bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AssetEntry {
    /// A path or glob.
    Path(String),
    /// A directive such as `("include", "web._assets_helpers")`.
    Directive(Vec<String>),
}

/// Non-fatal findings while reading a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ManifestWarning {
    /// Key outside the schema; kept in `extras`.
    UnknownField { key: String },
    /// Legacy key that was folded into its replacement.
    DeprecatedKey {
        key: String,
        replacement: &'static str,
    },
}

impl fmt::Display for ManifestWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownField { key } => write!(f, "unknown descriptor key '{key}'"),
            Self::DeprecatedKey { key, replacement } => {
                write!(f, "descriptor key '{key}' is deprecated in favor of '{replacement}'")
            }
        }
    }
}

/// A validated addon descriptor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Manifest {
    /// Technical key, equal to the addon directory name.
    pub key: String,
    /// Addon directory.
    pub root: PathBuf,
    /// Descriptor file the manifest was read from.
    pub descriptor: PathBuf,
    /// Checksum of the descriptor bytes.
    pub checksum: String,

    pub name: String,
    pub version: String,
    pub category: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub maintainer: Option<String>,
    pub website: Option<String>,
    pub license: Option<String>,
    pub sequence: i64,

    pub depends: Vec<String>,
    pub excludes: Vec<String>,
    /// Data files, applied in this order.
    pub data: Vec<String>,
    pub demo: Vec<String>,
    pub test: Vec<String>,
    pub images: Vec<String>,

    pub installable: bool,
    pub auto_install: AutoInstall,
    pub application: bool,
    pub hooks: LifecycleHooks,
    pub external_dependencies: ExternalDependencies,
    pub assets: BTreeMap<String, Vec<AssetEntry>>,

    /// Unrecognized keys, verbatim.
    pub extras: Map<String, Value>,
    pub warnings: Vec<ManifestWarning>,
}

impl Manifest {
    /// A manifest with every key at its default.
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            name: key.clone(),
            key,
            root: PathBuf::new(),
            descriptor: PathBuf::new(),
            checksum: String::new(),
            version: DEFAULT_VERSION.to_string(),
            category: DEFAULT_CATEGORY.to_string(),
            summary: None,
            description: None,
            author: None,
            maintainer: None,
            website: None,
            license: None,
            sequence: DEFAULT_SEQUENCE,
            depends: Vec::new(),
            excludes: Vec::new(),
            data: Vec::new(),
            demo: Vec::new(),
            test: Vec::new(),
            images: Vec::new(),
            installable: true,
            auto_install: AutoInstall::Disabled,
            application: false,
            hooks: LifecycleHooks::default(),
            external_dependencies: ExternalDependencies::default(),
            assets: BTreeMap::new(),
            extras: Map::new(),
            warnings: Vec::new(),
        }
    }

    /// Read the descriptor of the addon directory `dir`.
    ///
    /// The technical key is the directory name.
    pub fn read(dir: &Path) -> Result<Self> {
        let key = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        validate_key(&key)?;

        let descriptor = find_descriptor(dir).ok_or_else(|| Error::MissingManifest(dir.to_path_buf()))?;
        let bytes = std::fs::read(&descriptor).map_err(|e| Error::io(&descriptor, e))?;
        let text = std::str::from_utf8(&bytes).map_err(|e| Error::MalformedManifest {
            path: descriptor.clone(),
            reason: format!("descriptor is not valid UTF-8: {e}"),
        })?;

        let value = parse_descriptor(&descriptor, text)?;
        let mut manifest = Self::build(&key, &descriptor, value)?;
        manifest.root = dir.to_path_buf();
        manifest.checksum = descriptor_checksum(&bytes);
        manifest.descriptor = descriptor;

        for warning in &manifest.warnings {
            tracing::warn!(module = %manifest.key, "{}", warning);
        }
        Ok(manifest)
    }

    /// Parse a Python dict-literal descriptor for the module `key`.
    pub fn from_literal(key: &str, content: &str) -> Result<Self> {
        validate_key(key)?;
        let path = Path::new(key).join("__manifest__.py");
        let value = parse_descriptor(&path, content)?;
        let mut manifest = Self::build(key, &path, value)?;
        manifest.checksum = descriptor_checksum(content.as_bytes());
        Ok(manifest)
    }

    /// Parse a TOML descriptor for the module `key`.
    pub fn from_toml(key: &str, content: &str) -> Result<Self> {
        validate_key(key)?;
        let path = Path::new(key).join("__manifest__.toml");
        let value = parse_descriptor(&path, content)?;
        let mut manifest = Self::build(key, &path, value)?;
        manifest.checksum = descriptor_checksum(content.as_bytes());
        Ok(manifest)
    }

    /// Whether this module installs itself when its triggers are installed.
    pub fn is_auto_install(&self) -> bool {
        self.auto_install.is_enabled()
    }

    /// Modules whose presence triggers an auto-install.
    pub fn auto_install_triggers(&self) -> &[String] {
        self.auto_install.triggers(&self.depends)
    }

    /// Absolute location of a path listed in the descriptor.
    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    fn build(key: &str, descriptor: &Path, value: Value) -> Result<Self> {
        let map = match value {
            Value::Object(map) => map,
            other => {
                return Err(Error::MalformedManifest {
                    path: descriptor.to_path_buf(),
                    reason: format!("descriptor must be a map, found {}", type_name(&other)),
                });
            }
        };

        let mut manifest = Self::new(key);
        manifest.descriptor = descriptor.to_path_buf();

        let mut init_xml = Vec::new();
        let mut update_xml = Vec::new();
        let mut demo_xml = Vec::new();
        let mut legacy_active = None;
        let mut auto_install_set = false;

        for (name, value) in map {
            if value.is_null() {
                continue;
            }
            match name.as_str() {
                "name" => manifest.name = string(&name, &value)?,
                "version" => manifest.version = string(&name, &value)?,
                "category" => manifest.category = string(&name, &value)?,
                "summary" => manifest.summary = Some(string(&name, &value)?),
                "description" => manifest.description = Some(string(&name, &value)?),
                "author" => manifest.author = Some(string(&name, &value)?),
                "maintainer" => manifest.maintainer = Some(string(&name, &value)?),
                "website" => manifest.website = Some(string(&name, &value)?),
                "license" => manifest.license = Some(string(&name, &value)?),
                "sequence" => manifest.sequence = integer(&name, &value)?,
                "depends" => manifest.depends = dedup(string_list(&name, &value)?),
                "excludes" => manifest.excludes = dedup(string_list(&name, &value)?),
                "data" => manifest.data = path_list(&name, &value)?,
                "demo" => manifest.demo = path_list(&name, &value)?,
                "test" => manifest.test = path_list(&name, &value)?,
                "images" => manifest.images = path_list(&name, &value)?,
                "installable" => manifest.installable = boolean(&name, &value)?,
                "application" => manifest.application = boolean(&name, &value)?,
                "auto_install" => {
                    manifest.auto_install = auto_install(&name, &value)?;
                    auto_install_set = true;
                }
                "pre_init_hook" => manifest.hooks.pre_init = Some(string(&name, &value)?),
                "post_init_hook" => manifest.hooks.post_init = Some(string(&name, &value)?),
                "uninstall_hook" => manifest.hooks.uninstall = Some(string(&name, &value)?),
                "external_dependencies" => {
                    manifest.external_dependencies = external_dependencies(&name, &value)?
                }
                "assets" => manifest.assets = assets(&name, &value)?,
                "init_xml" | "update_xml" | "demo_xml" => {
                    let paths = path_list(&name, &value)?;
                    let replacement = if name == "demo_xml" { "demo" } else { "data" };
                    match name.as_str() {
                        "init_xml" => init_xml = paths,
                        "update_xml" => update_xml = paths,
                        _ => demo_xml = paths,
                    }
                    manifest.warnings.push(ManifestWarning::DeprecatedKey {
                        key: name,
                        replacement,
                    });
                }
                "active" => {
                    legacy_active = Some(boolean(&name, &value)?);
                    manifest.warnings.push(ManifestWarning::DeprecatedKey {
                        key: name,
                        replacement: "auto_install",
                    });
                }
                _ => {
                    manifest.warnings.push(ManifestWarning::UnknownField { key: name.clone() });
                    manifest.extras.insert(name, value);
                }
            }
        }

        if !auto_install_set && legacy_active == Some(true) {
            manifest.auto_install = AutoInstall::Dependencies;
        }

        if !init_xml.is_empty() || !update_xml.is_empty() {
            let data = std::mem::take(&mut manifest.data);
            manifest.data = init_xml.into_iter().chain(update_xml).chain(data).collect();
        }
        if !demo_xml.is_empty() {
            let demo = std::mem::take(&mut manifest.demo);
            manifest.demo = demo_xml.into_iter().chain(demo).collect();
        }

        Ok(manifest)
    }
}

/// Locate the descriptor file of an addon directory, if it has one.
pub fn find_descriptor(dir: &Path) -> Option<PathBuf> {
    DESCRIPTOR_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Check that `key` is usable as a technical key.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::InvalidKey {
            key: key.to_string(),
            reason: "technical key must not be empty".to_string(),
        });
    }
    if !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(Error::InvalidKey {
            key: key.to_string(),
            reason: "technical key must contain only ASCII letters, digits or underscores"
                .to_string(),
        });
    }
    Ok(())
}

fn parse_descriptor(path: &Path, content: &str) -> Result<Value> {
    let malformed = |reason: String| Error::MalformedManifest {
        path: path.to_path_buf(),
        reason,
    };
    if path.extension().is_some_and(|ext| ext == "toml") {
        let table: toml::Table = toml::from_str(content).map_err(|e| malformed(e.to_string()))?;
        serde_json::to_value(table).map_err(|e| malformed(e.to_string()))
    } else {
        literal::parse(content).map_err(|e| malformed(e.to_string()))
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "None",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}

fn mismatch(key: &str, expected: &'static str, value: &Value) -> Error {
    Error::TypeMismatch {
        key: key.to_string(),
        expected,
        found: type_name(value),
    }
}

fn string(key: &str, value: &Value) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| mismatch(key, "string", value))
}

fn boolean(key: &str, value: &Value) -> Result<bool> {
    value.as_bool().ok_or_else(|| mismatch(key, "boolean", value))
}

fn integer(key: &str, value: &Value) -> Result<i64> {
    value.as_i64().ok_or_else(|| mismatch(key, "integer", value))
}

fn string_list(key: &str, value: &Value) -> Result<Vec<String>> {
    let items = value
        .as_array()
        .ok_or_else(|| mismatch(key, "list of strings", value))?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| mismatch(key, "list of strings", item))
        })
        .collect()
}

fn path_list(key: &str, value: &Value) -> Result<Vec<String>> {
    let paths = string_list(key, value)?;
    for path in &paths {
        check_confined(key, path)?;
    }
    Ok(paths)
}

/// Reject absolute paths and `..` components.
fn check_confined(key: &str, path: &str) -> Result<()> {
    let escapes = Path::new(path).components().any(|c| {
        matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_))
    });
    if escapes || path.starts_with('/') || path.starts_with('\\') {
        return Err(Error::EscapingPath {
            key: key.to_string(),
            path: path.to_string(),
        });
    }
    Ok(())
}

fn dedup(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items.into_iter().filter(|item| seen.insert(item.clone())).collect()
}

fn auto_install(key: &str, value: &Value) -> Result<AutoInstall> {
    match value {
        Value::Bool(true) => Ok(AutoInstall::Dependencies),
        Value::Bool(false) => Ok(AutoInstall::Disabled),
        Value::Array(_) => Ok(AutoInstall::Modules(dedup(string_list(key, value)?))),
        other => Err(mismatch(key, "boolean or list of strings", other)),
    }
}

fn external_dependencies(key: &str, value: &Value) -> Result<ExternalDependencies> {
    let map = value
        .as_object()
        .ok_or_else(|| mismatch(key, "map of lists", value))?;
    let mut deps = ExternalDependencies::default();
    for (kind, list) in map {
        let items = string_list(&format!("{key}.{kind}"), list)?;
        match kind.as_str() {
            "python" => deps.python = items,
            "bin" => deps.bin = items,
            _ => {
                deps.other.insert(kind.clone(), items);
            }
        }
    }
    Ok(deps)
}

fn assets(key: &str, value: &Value) -> Result<BTreeMap<String, Vec<AssetEntry>>> {
    let map = value
        .as_object()
        .ok_or_else(|| mismatch(key, "map of bundles", value))?;
    let mut bundles = BTreeMap::new();
    for (bundle, items) in map {
        let bundle_key = format!("{key}.{bundle}");
        let items = items
            .as_array()
            .ok_or_else(|| mismatch(&bundle_key, "list", items))?;
        let mut entries = Vec::with_capacity(items.len());
        for item in items {
            let entry = match item {
                Value::String(path) => {
                    check_confined(&bundle_key, path)?;
                    AssetEntry::Path(path.clone())
                }
                Value::Array(_) => AssetEntry::Directive(string_list(&bundle_key, item)?),
                other => return Err(mismatch(&bundle_key, "path or directive", other)),
            };
            entries.push(entry);
        }
        bundles.insert(bundle.clone(), entries);
    }
    Ok(bundles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SALE_PY: &str = r#"
{
    'name': 'Sales',
    'version': '16.0.1.2',
    'category': 'Sales/Sales',
    'summary': 'From quotations to invoices',
    'depends': ['sales_team', 'account_payment', 'utm'],
    'data': [
        'security/ir.model.access.csv',
        'views/sale_order_views.xml',
    ],
    'demo': ['data/sale_demo.xml'],
    'installable': True,
    'application': True,
    'auto_install': False,
    'post_init_hook': '_synchronize_cron',
    'external_dependencies': {'python': ['num2words'], 'bin': ['wkhtmltopdf']},
    'assets': {
        'web.assets_backend': [
            'sale/static/src/**/*.js',
            ('include', 'web._assets_helpers'),
        ],
    },
    'license': 'LGPL-3',
    'cloc_exclude': ['static/**'],
}
"#;

    #[test]
    fn reads_python_descriptor() {
        let manifest = Manifest::from_literal("sale", SALE_PY).unwrap();
        assert_eq!(manifest.key, "sale");
        assert_eq!(manifest.name, "Sales");
        assert_eq!(manifest.version, "16.0.1.2");
        assert_eq!(manifest.depends, vec!["sales_team", "account_payment", "utm"]);
        assert_eq!(
            manifest.data,
            vec!["security/ir.model.access.csv", "views/sale_order_views.xml"]
        );
        assert_eq!(manifest.demo, vec!["data/sale_demo.xml"]);
        assert!(manifest.installable);
        assert!(manifest.application);
        assert_eq!(manifest.auto_install, AutoInstall::Disabled);
        assert_eq!(manifest.hooks.post_init.as_deref(), Some("_synchronize_cron"));
        assert_eq!(manifest.external_dependencies.python, vec!["num2words"]);
        assert_eq!(manifest.external_dependencies.bin, vec!["wkhtmltopdf"]);
        assert_eq!(
            manifest.assets["web.assets_backend"],
            vec![
                AssetEntry::Path("sale/static/src/**/*.js".to_string()),
                AssetEntry::Directive(vec![
                    "include".to_string(),
                    "web._assets_helpers".to_string()
                ]),
            ]
        );
        assert!(manifest.checksum.starts_with("sha256:"));
    }

    #[test]
    fn unknown_keys_are_kept_and_warned() {
        let manifest = Manifest::from_literal("sale", SALE_PY).unwrap();
        assert_eq!(
            manifest.extras.get("cloc_exclude"),
            Some(&serde_json::json!(["static/**"]))
        );
        assert_eq!(
            manifest.warnings,
            vec![ManifestWarning::UnknownField {
                key: "cloc_exclude".to_string()
            }]
        );
    }

    #[test]
    fn defaults_apply_when_keys_are_absent() {
        let manifest = Manifest::from_literal("base", "{}").unwrap();
        assert_eq!(manifest.name, "base");
        assert_eq!(manifest.version, "1.0");
        assert_eq!(manifest.category, "Uncategorized");
        assert_eq!(manifest.sequence, 100);
        assert!(manifest.installable);
        assert!(!manifest.application);
        assert!(!manifest.is_auto_install());
        assert!(manifest.depends.is_empty());
    }

    #[test]
    fn none_values_count_as_absent() {
        let manifest = Manifest::from_literal("m", "{'pre_init_hook': None, 'depends': None}").unwrap();
        assert!(manifest.hooks.pre_init.is_none());
        assert!(manifest.depends.is_empty());
    }

    #[test]
    fn auto_install_forms() {
        let m = Manifest::from_literal("m", "{'depends': ['a', 'b'], 'auto_install': True}").unwrap();
        assert_eq!(m.auto_install, AutoInstall::Dependencies);
        assert_eq!(m.auto_install_triggers(), ["a", "b"]);

        let m = Manifest::from_literal("m", "{'depends': ['a', 'b'], 'auto_install': ['a']}").unwrap();
        assert_eq!(m.auto_install, AutoInstall::Modules(vec!["a".to_string()]));
        assert_eq!(m.auto_install_triggers(), ["a"]);

        let err = Manifest::from_literal("m", "{'auto_install': 'yes'}").unwrap_err();
        assert!(matches!(
            err,
            Error::TypeMismatch {
                expected: "boolean or list of strings",
                found: "string",
                ..
            }
        ));
    }

    #[test]
    fn type_mismatch_names_key_and_types() {
        let err = Manifest::from_literal("m", "{'depends': 'base'}").unwrap_err();
        match err {
            Error::TypeMismatch { key, expected, found } => {
                assert_eq!(key, "depends");
                assert_eq!(expected, "list of strings");
                assert_eq!(found, "string");
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = Manifest::from_literal("m", "{'installable': 1}").unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { found: "integer", .. }));
    }

    #[test]
    fn legacy_data_keys_are_merged() {
        let source = "{'init_xml': ['a.xml'], 'update_xml': ['b.xml'], 'data': ['c.xml'], \
                      'demo_xml': ['d.xml'], 'demo': ['e.xml']}";
        let m = Manifest::from_literal("m", source).unwrap();
        assert_eq!(m.data, vec!["a.xml", "b.xml", "c.xml"]);
        assert_eq!(m.demo, vec!["d.xml", "e.xml"]);
        assert_eq!(m.warnings.len(), 3);
        assert!(m.warnings.iter().all(|w| matches!(w, ManifestWarning::DeprecatedKey { .. })));
    }

    #[test]
    fn legacy_active_enables_auto_install() {
        let m = Manifest::from_literal("m", "{'depends': ['a'], 'active': True}").unwrap();
        assert_eq!(m.auto_install, AutoInstall::Dependencies);

        let m = Manifest::from_literal("m", "{'active': True, 'auto_install': False}").unwrap();
        assert_eq!(m.auto_install, AutoInstall::Disabled);
    }

    #[test]
    fn escaping_paths_are_rejected() {
        for source in [
            "{'data': ['../other/views.xml']}",
            "{'data': ['/etc/passwd']}",
            "{'demo': ['data/../../x.xml']}",
            "{'assets': {'web.assets_backend': ['../../x.js']}}",
        ] {
            let err = Manifest::from_literal("m", source).unwrap_err();
            assert!(matches!(err, Error::EscapingPath { .. }), "{source}: {err}");
        }
    }

    #[test]
    fn duplicate_dependencies_are_collapsed() {
        let m = Manifest::from_literal("m", "{'depends': ['base', 'mail', 'base']}").unwrap();
        assert_eq!(m.depends, vec!["base", "mail"]);
    }

    #[test]
    fn toml_descriptor() {
        let source = r#"
name = "CRM"
depends = ["base", "mail"]
data = ["views/crm_views.xml"]
auto_install = ["mail"]
legacy_flag = 3

[external_dependencies]
bin = ["dot"]
"#;
        let m = Manifest::from_toml("crm", source).unwrap();
        assert_eq!(m.name, "CRM");
        assert_eq!(m.depends, vec!["base", "mail"]);
        assert_eq!(m.auto_install, AutoInstall::Modules(vec!["mail".to_string()]));
        assert_eq!(m.external_dependencies.bin, vec!["dot"]);
        assert_eq!(m.extras.get("legacy_flag"), Some(&serde_json::json!(3)));
    }

    #[test]
    fn non_map_descriptor_is_malformed() {
        let err = Manifest::from_literal("m", "['a']").unwrap_err();
        assert!(matches!(err, Error::MalformedManifest { .. }));
        let err = Manifest::from_toml("m", "name = ").unwrap_err();
        assert!(matches!(err, Error::MalformedManifest { .. }));
        let nested = format!("{{'data': {}", "[".repeat(10_000));
        let err = Manifest::from_literal("m", &nested).unwrap_err();
        assert!(matches!(err, Error::MalformedManifest { ref reason, .. } if reason.contains("nested deeper")));
    }

    #[test]
    fn key_validation() {
        assert!(validate_key("sale_crm").is_ok());
        assert!(validate_key("l10n_be").is_ok());
        assert!(matches!(validate_key(""), Err(Error::InvalidKey { .. })));
        assert!(matches!(validate_key("sale-crm"), Err(Error::InvalidKey { .. })));
        assert!(matches!(validate_key(".git"), Err(Error::InvalidKey { .. })));
    }
}
