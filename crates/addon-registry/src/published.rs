//! The immutable registry handed to readers after a load pass.
//!
//! Model and field keys are resolved to dense indices, and relational fields
//! carry the [`ModelId`] of their comodel when it exists.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use crate::composer::ComposedModel;
use crate::contribution::ModelKind;
use crate::error::MethodError;
use crate::field::FieldDecl;
use crate::method::{CallContext, MethodChain};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(usize);

impl ModelId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Index of a field within its model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(usize);

impl FieldId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PublishedField {
    pub id: FieldId,
    pub decl: FieldDecl,
    pub module: String,
    /// Resolved comodel of a relational field.
    pub comodel: Option<ModelId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PublishedModel {
    pub id: ModelId,
    pub key: String,
    pub kind: ModelKind,
    pub description: Option<String>,
    pub declared_by: String,
    pub extended_by: Vec<String>,
    fields: Vec<PublishedField>,
    field_index: HashMap<String, FieldId>,
    methods: BTreeMap<String, MethodChain>,
}

impl PublishedModel {
    pub fn fields(&self) -> &[PublishedField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&PublishedField> {
        self.field_id(name).and_then(|id| self.fields.get(id.0))
    }

    pub fn field_id(&self, name: &str) -> Option<FieldId> {
        self.field_index.get(name).copied()
    }

    pub fn field_by_id(&self, id: FieldId) -> Option<&PublishedField> {
        self.fields.get(id.0)
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodChain> {
        self.methods.values()
    }

    pub fn method(&self, name: &str) -> Option<&MethodChain> {
        self.methods.get(name)
    }

    pub fn call(&self, method: &str, ctx: &CallContext, args: &[Value]) -> Result<Value, MethodError> {
        let chain = self.methods.get(method).ok_or_else(|| MethodError::UnknownMethod {
            model: self.key.clone(),
            method: method.to_string(),
        })?;
        chain.call(ctx, args)
    }
}

/// A relational field whose comodel is not in the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingComodel {
    pub model: String,
    pub field: String,
    pub comodel: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublishedRegistry {
    models: Vec<PublishedModel>,
    index: HashMap<String, ModelId>,
    dangling: Vec<DanglingComodel>,
    modules: Vec<String>,
}

impl PublishedRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Models must come in key order.
    pub(crate) fn from_models(models: impl Iterator<Item = ComposedModel>, modules: Vec<String>) -> Self {
        let composed: Vec<ComposedModel> = models.collect();
        let index: HashMap<String, ModelId> = composed
            .iter()
            .enumerate()
            .map(|(i, model)| (model.key.clone(), ModelId(i)))
            .collect();

        let mut dangling = Vec::new();
        let mut published = Vec::with_capacity(composed.len());
        for (i, model) in composed.into_iter().enumerate() {
            let key = model.key.clone();
            let kind = model.kind;
            let description = model.description.clone();
            let declared_by = model.declared_by.clone();
            let extended_by = model.extended_by.clone();
            let (fields, methods) = model.into_parts();

            let mut field_index = HashMap::with_capacity(fields.len());
            let mut published_fields = Vec::with_capacity(fields.len());
            for (j, field) in fields.into_iter().enumerate() {
                let comodel = match field.decl.kind.comodel() {
                    Some(target) => {
                        let id = index.get(target).copied();
                        if id.is_none() {
                            dangling.push(DanglingComodel {
                                model: key.clone(),
                                field: field.decl.name.clone(),
                                comodel: target.to_string(),
                            });
                        }
                        id
                    }
                    None => None,
                };
                field_index.insert(field.decl.name.clone(), FieldId(j));
                published_fields.push(PublishedField {
                    id: FieldId(j),
                    decl: field.decl,
                    module: field.module,
                    comodel,
                });
            }

            published.push(PublishedModel {
                id: ModelId(i),
                key,
                kind,
                description,
                declared_by,
                extended_by,
                fields: published_fields,
                field_index,
                methods,
            });
        }

        Self {
            models: published,
            index,
            dangling,
            modules,
        }
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn model_id(&self, key: &str) -> Option<ModelId> {
        self.index.get(key).copied()
    }

    pub fn model(&self, id: ModelId) -> Option<&PublishedModel> {
        self.models.get(id.0)
    }

    pub fn get(&self, key: &str) -> Option<&PublishedModel> {
        self.model_id(key).and_then(|id| self.model(id))
    }

    /// Models in key order.
    pub fn models(&self) -> impl Iterator<Item = &PublishedModel> {
        self.models.iter()
    }

    pub fn dangling(&self) -> &[DanglingComodel] {
        &self.dangling
    }

    /// Modules whose contributions are in force, in load order.
    pub fn modules(&self) -> &[String] {
        &self.modules
    }

    pub fn call(&self, model: &str, method: &str, ctx: &CallContext, args: &[Value]) -> Result<Value, MethodError> {
        self.get(model)
            .ok_or_else(|| MethodError::UnknownModel(model.to_string()))?
            .call(method, ctx, args)
    }
}
