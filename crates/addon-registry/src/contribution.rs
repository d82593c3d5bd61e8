//! What a module contributes to the model registry.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::MethodError;
use crate::field::FieldDecl;
use crate::method::{CallContext, MethodDef, Super};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    #[default]
    Regular,
    /// One-shot wizard records.
    Transient,
    /// Mixin without storage of its own.
    Abstract,
}

/// A new model.
#[derive(Debug, Clone)]
pub struct ModelDecl {
    pub model: String,
    pub kind: ModelKind,
    pub description: Option<String>,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<MethodDef>,
}

/// Additions to an existing model.
#[derive(Debug, Clone)]
pub struct ModelExt {
    pub model: String,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<MethodDef>,
}

#[derive(Debug, Clone)]
pub enum Contribution {
    Declare(ModelDecl),
    Extend(ModelExt),
}

impl Contribution {
    pub fn declare(model: impl Into<String>) -> ModelDecl {
        ModelDecl {
            model: model.into(),
            kind: ModelKind::Regular,
            description: None,
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn extend(model: impl Into<String>) -> ModelExt {
        ModelExt {
            model: model.into(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Target model key.
    pub fn model(&self) -> &str {
        match self {
            Self::Declare(decl) => &decl.model,
            Self::Extend(ext) => &ext.model,
        }
    }

    pub fn fields(&self) -> &[FieldDecl] {
        match self {
            Self::Declare(decl) => &decl.fields,
            Self::Extend(ext) => &ext.fields,
        }
    }

    pub fn methods(&self) -> &[MethodDef] {
        match self {
            Self::Declare(decl) => &decl.methods,
            Self::Extend(ext) => &ext.methods,
        }
    }
}

impl ModelDecl {
    pub fn kind(mut self, kind: ModelKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn field(mut self, field: FieldDecl) -> Self {
        self.fields.push(field);
        self
    }

    pub fn method<F>(mut self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&CallContext, Super<'_>, &[Value]) -> Result<Value, MethodError> + Send + Sync + 'static,
    {
        self.methods.push(MethodDef::new(name, body));
        self
    }

    pub fn method_def(mut self, method: MethodDef) -> Self {
        self.methods.push(method);
        self
    }
}

impl ModelExt {
    pub fn field(mut self, field: FieldDecl) -> Self {
        self.fields.push(field);
        self
    }

    pub fn method<F>(mut self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&CallContext, Super<'_>, &[Value]) -> Result<Value, MethodError> + Send + Sync + 'static,
    {
        self.methods.push(MethodDef::new(name, body));
        self
    }

    pub fn method_def(mut self, method: MethodDef) -> Self {
        self.methods.push(method);
        self
    }
}

impl From<ModelDecl> for Contribution {
    fn from(decl: ModelDecl) -> Self {
        Self::Declare(decl)
    }
}

impl From<ModelExt> for Contribution {
    fn from(ext: ModelExt) -> Self {
        Self::Extend(ext)
    }
}

/// Everything one module contributes, with the modules it may build on.
#[derive(Debug, Clone, Default)]
pub struct ModuleContributions {
    pub module: String,
    /// Transitive dependency closure, excluding the module itself.
    pub dependencies: std::collections::BTreeSet<String>,
    pub contributions: Vec<Contribution>,
}

impl ModuleContributions {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            ..Self::default()
        }
    }

    pub fn depends_on<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies.extend(dependencies.into_iter().map(Into::into));
        self
    }

    pub fn with(mut self, contribution: impl Into<Contribution>) -> Self {
        self.contributions.push(contribution.into());
        self
    }
}
