//! Where module contributions come from
//!
//! The loader asks a [`ModuleSource`] for the contributions of every module
//! it composes. [`StaticSource`] holds them in process; [`DeclarativeSource`]
//! reads them from `models/*.toml` inside each addon:
//!
//! ```toml
//! [[declare]]
//! model = "library.book"
//! description = "Book"
//! methods = ["action_lend"]
//!
//! [[declare.fields]]
//! name = "title"
//! type = "string"
//! required = true
//!
//! [[extend]]
//! model = "res.partner"
//! methods = ["name_get"]
//!
//! [[extend.fields]]
//! name = "book_ids"
//! type = "one2many"
//! comodel = "library.book"
//! inverse = "borrower_id"
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use addon_manifest::Manifest;
use addon_registry::{Contribution, FieldDecl, MethodDef, ModelKind};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{path}: {message}")]
pub struct SourceError {
    pub path: PathBuf,
    pub message: String,
}

/// Provides the contributions of a module.
pub trait ModuleSource: Send + Sync {
    /// Contributions of `manifest`'s module, in application order.
    ///
    /// # Errors
    ///
    /// A `SourceError` excludes the module from the pass.
    fn contributions(&self, manifest: &Manifest) -> Result<Vec<Contribution>, SourceError>;
}

/// Contributions registered in process, keyed by module.
///
/// Modules without an entry contribute nothing.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    modules: HashMap<String, Vec<Contribution>>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, module: impl Into<String>, contribution: impl Into<Contribution>) -> Self {
        self.modules
            .entry(module.into())
            .or_default()
            .push(contribution.into());
        self
    }
}

impl ModuleSource for StaticSource {
    fn contributions(&self, manifest: &Manifest) -> Result<Vec<Contribution>, SourceError> {
        Ok(self.modules.get(&manifest.key).cloned().unwrap_or_default())
    }
}

/// Directory inside an addon holding model files.
pub const MODELS_DIR: &str = "models";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ModelsFile {
    #[serde(default)]
    declare: Vec<DeclareTable>,
    #[serde(default)]
    extend: Vec<ExtendTable>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DeclareTable {
    model: String,
    #[serde(default)]
    kind: ModelKind,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    fields: Vec<FieldDecl>,
    #[serde(default)]
    methods: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExtendTable {
    model: String,
    #[serde(default)]
    fields: Vec<FieldDecl>,
    #[serde(default)]
    methods: Vec<String>,
}

/// Reads `models/*.toml` of each addon, in file-name order.
///
/// Listed methods get a body that logs the call and delegates to the next
/// layer. The bottom layer answers with the model, method and module.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclarativeSource;

impl DeclarativeSource {
    fn model_files(root: &Path) -> Result<Vec<PathBuf>, SourceError> {
        let dir = root.join(MODELS_DIR);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&dir).map_err(|e| SourceError {
            path: dir.clone(),
            message: e.to_string(),
        })?;
        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "toml"))
            .collect();
        files.sort();
        Ok(files)
    }

    fn read_file(path: &Path, module: &str) -> Result<Vec<Contribution>, SourceError> {
        let content = fs::read_to_string(path).map_err(|e| SourceError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let file: ModelsFile = toml::from_str(&content).map_err(|e| SourceError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let mut contributions = Vec::with_capacity(file.declare.len() + file.extend.len());
        for table in file.declare {
            let mut decl = Contribution::declare(&table.model).kind(table.kind);
            if let Some(description) = table.description {
                decl = decl.description(description);
            }
            for field in table.fields {
                decl = decl.field(field);
            }
            for method in &table.methods {
                decl = decl.method_def(generated_method(module, &table.model, method));
            }
            contributions.push(decl.into());
        }
        for table in file.extend {
            let mut ext = Contribution::extend(&table.model);
            for field in table.fields {
                ext = ext.field(field);
            }
            for method in &table.methods {
                ext = ext.method_def(generated_method(module, &table.model, method));
            }
            contributions.push(ext.into());
        }
        Ok(contributions)
    }
}

impl ModuleSource for DeclarativeSource {
    fn contributions(&self, manifest: &Manifest) -> Result<Vec<Contribution>, SourceError> {
        let mut contributions = Vec::new();
        for path in Self::model_files(&manifest.root)? {
            contributions.extend(Self::read_file(&path, &manifest.key)?);
        }
        Ok(contributions)
    }
}

fn generated_method(module: &str, model: &str, method: &str) -> MethodDef {
    let module = module.to_string();
    let model = model.to_string();
    MethodDef::new(method, move |ctx, sup, args| {
        tracing::debug!(module = %module, model = %model, method = %sup.method(), user = %ctx.user, "Method layer");
        if sup.exists() {
            sup.call(ctx, args)
        } else {
            Ok(json!({
                "model": model,
                "method": sup.method(),
                "module": module,
            }))
        }
    })
}
