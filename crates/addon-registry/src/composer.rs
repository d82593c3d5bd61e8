//! Applying module contributions, in load order, to a model registry.
//!
//! Modules are atomic: every contribution of a module is applied to a staging
//! copy of the models it touches, and the copy replaces the registry entries
//! only when all of them succeeded.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use serde_json::Value;

use crate::contribution::{Contribution, ModelKind, ModuleContributions};
use crate::error::{Error, MethodError, Result};
use crate::field::{FieldDecl, FieldKind};
use crate::method::{CallContext, MethodChain, MethodDef};
use crate::published::PublishedRegistry;

/// A field with the module that last declared it.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedField {
    pub decl: FieldDecl,
    pub module: String,
}

/// A model after composition.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedModel {
    pub key: String,
    pub kind: ModelKind,
    pub description: Option<String>,
    pub declared_by: String,
    /// Extending modules, in load order.
    pub extended_by: Vec<String>,
    fields: Vec<ComposedField>,
    methods: BTreeMap<String, MethodChain>,
}

impl ComposedModel {
    fn declared(key: &str, kind: ModelKind, description: Option<String>, module: &str) -> Self {
        Self {
            key: key.to_string(),
            kind,
            description,
            declared_by: module.to_string(),
            extended_by: Vec::new(),
            fields: Vec::new(),
            methods: BTreeMap::new(),
        }
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[ComposedField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&ComposedField> {
        self.fields.iter().find(|f| f.decl.name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.decl.name.as_str())
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodChain> {
        self.methods.values()
    }

    pub fn method(&self, name: &str) -> Option<&MethodChain> {
        self.methods.get(name)
    }

    pub fn call(&self, method: &str, ctx: &CallContext, args: &[Value]) -> std::result::Result<Value, MethodError> {
        let chain = self.methods.get(method).ok_or_else(|| MethodError::UnknownMethod {
            model: self.key.clone(),
            method: method.to_string(),
        })?;
        chain.call(ctx, args)
    }

    pub(crate) fn into_parts(self) -> (Vec<ComposedField>, BTreeMap<String, MethodChain>) {
        (self.fields, self.methods)
    }

    /// Add a field, or replace the same-named one in place.
    fn put_field(&mut self, decl: FieldDecl, module: &str) {
        let field = ComposedField {
            decl,
            module: module.to_string(),
        };
        match self.fields.iter_mut().find(|f| f.decl.name == field.decl.name) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
    }

    fn push_method(&mut self, method: &MethodDef, module: &str) {
        self.methods
            .entry(method.name.clone())
            .or_insert_with(|| MethodChain::new(self.key.clone(), method.name.clone()))
            .push(module, method.body.clone());
    }
}

/// Composed models by key, plus the modules applied so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelRegistry {
    models: BTreeMap<String, ComposedModel>,
    modules: Vec<String>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, model: &str) -> Option<&ComposedModel> {
        self.models.get(model)
    }

    pub fn contains(&self, model: &str) -> bool {
        self.models.contains_key(model)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Models in key order.
    pub fn models(&self) -> impl Iterator<Item = &ComposedModel> {
        self.models.values()
    }

    /// Modules applied, in order.
    pub fn modules(&self) -> &[String] {
        &self.modules
    }

    /// Apply every contribution of one module, or none of them.
    pub fn apply(&mut self, module: &ModuleContributions) -> Result<()> {
        let key = module.module.as_str();
        let mut staged: BTreeMap<String, ComposedModel> = BTreeMap::new();

        for contribution in &module.contributions {
            match contribution {
                Contribution::Declare(decl) => {
                    if let Some(existing) = staged.get(&decl.model).or_else(|| self.models.get(&decl.model)) {
                        return Err(Error::DuplicateDeclaration {
                            model: decl.model.clone(),
                            module: key.to_string(),
                            declared_by: existing.declared_by.clone(),
                        });
                    }
                    let mut model =
                        ComposedModel::declared(&decl.model, decl.kind, decl.description.clone(), key);
                    for field in &decl.fields {
                        model.put_field(field.clone(), key);
                    }
                    for method in &decl.methods {
                        model.push_method(method, key);
                    }
                    staged.insert(decl.model.clone(), model);
                }
                Contribution::Extend(ext) => {
                    let model = match staged.entry(ext.model.clone()) {
                        Entry::Occupied(entry) => entry.into_mut(),
                        Entry::Vacant(entry) => {
                            let base = self.models.get(&ext.model).ok_or_else(|| Error::ExtendsUnknown {
                                model: ext.model.clone(),
                                module: key.to_string(),
                            })?;
                            entry.insert(base.clone())
                        }
                    };
                    if model.declared_by != key && !module.dependencies.contains(&model.declared_by) {
                        return Err(Error::ExtendsOutsideDependencies {
                            model: ext.model.clone(),
                            module: key.to_string(),
                            declared_by: model.declared_by.clone(),
                        });
                    }
                    for field in &ext.fields {
                        model.put_field(field.clone(), key);
                    }
                    for method in &ext.methods {
                        model.push_method(method, key);
                    }
                    if model.declared_by != key && !model.extended_by.iter().any(|m| m == key) {
                        model.extended_by.push(key.to_string());
                    }
                }
            }
        }

        check_related_paths(module, &staged)?;

        tracing::debug!(module = %key, models = staged.len(), "Applied module contributions");
        self.models.extend(staged);
        self.modules.push(key.to_string());
        Ok(())
    }

    /// Freeze the registry for readers.
    pub fn publish(&self) -> PublishedRegistry {
        PublishedRegistry::from_models(self.models.values().cloned(), self.modules.clone())
    }
}

/// The first hop of every related field the module contributes must exist
/// on its model once the module is applied.
fn check_related_paths(module: &ModuleContributions, staged: &BTreeMap<String, ComposedModel>) -> Result<()> {
    for contribution in &module.contributions {
        let Some(model) = staged.get(contribution.model()) else {
            continue;
        };
        for field in contribution.fields() {
            let FieldKind::Related { path } = &field.kind else {
                continue;
            };
            let hop = path.first().map(String::as_str).unwrap_or_default();
            if hop.is_empty() || model.field(hop).is_none() {
                return Err(Error::RelatedFirstHopMissing {
                    model: model.key.clone(),
                    field: field.name.clone(),
                    hop: hop.to_string(),
                    module: module.module.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Outcome of composing a load order.
#[derive(Debug, Clone, Default)]
pub struct Composition {
    pub registry: ModelRegistry,
    /// Rejected modules, in load order.
    pub rejected: Vec<Error>,
}

impl Composition {
    pub fn is_rejected(&self, module: &str) -> bool {
        self.rejected.iter().any(|e| e.module() == module)
    }

    pub fn rejection(&self, module: &str) -> Option<&Error> {
        self.rejected.iter().find(|e| e.module() == module)
    }
}

/// Compose modules from scratch, in the given order.
///
/// A rejected module takes every later module depending on it down with it.
///
/// # Errors
///
/// Returns `Error::DuplicateDeclaration`, the only fatal error, as soon as it
/// is met.
pub fn compose(modules: &[ModuleContributions]) -> Result<Composition> {
    let mut composition = Composition::default();
    for module in modules {
        let rejected_dep = module
            .dependencies
            .iter()
            .find(|dep| composition.is_rejected(dep))
            .cloned();
        if let Some(dependency) = rejected_dep {
            let error = Error::DependencyRejected {
                module: module.module.clone(),
                dependency,
            };
            tracing::warn!("{}", error);
            composition.rejected.push(error);
            continue;
        }

        match composition.registry.apply(module) {
            Ok(()) => {}
            Err(error) if error.is_fatal() => return Err(error),
            Err(error) => {
                tracing::warn!("{}", error);
                composition.rejected.push(error);
            }
        }
    }
    Ok(composition)
}
