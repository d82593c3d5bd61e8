/// Errors raised while composing module contributions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A second module declares a model key that already exists. Fatal for
    /// the whole composition.
    #[error("model '{model}' declared by '{module}' is already declared by '{declared_by}'")]
    DuplicateDeclaration {
        model: String,
        module: String,
        declared_by: String,
    },

    /// An extension targets a model nobody declared.
    #[error("module '{module}' extends unknown model '{model}'")]
    ExtendsUnknown { model: String, module: String },

    /// An extension targets a model declared outside the extender's
    /// dependency closure.
    #[error(
        "module '{module}' extends model '{model}' declared by '{declared_by}', which it does not depend on"
    )]
    ExtendsOutsideDependencies {
        model: String,
        module: String,
        declared_by: String,
    },

    /// The first field of a related path does not exist on the model.
    #[error("related field '{model}.{field}' in module '{module}' starts with unknown field '{hop}'")]
    RelatedFirstHopMissing {
        model: String,
        field: String,
        hop: String,
        module: String,
    },

    /// A dependency of the module was rejected earlier in the composition.
    #[error("module '{module}' depends on rejected module '{dependency}'")]
    DependencyRejected { module: String, dependency: String },
}

impl Error {
    /// Fatal errors abort the composition; the others reject one module.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::DuplicateDeclaration { .. })
    }

    /// The module the error is about.
    pub fn module(&self) -> &str {
        match self {
            Self::DuplicateDeclaration { module, .. }
            | Self::ExtendsUnknown { module, .. }
            | Self::ExtendsOutsideDependencies { module, .. }
            | Self::RelatedFirstHopMissing { module, .. }
            | Self::DependencyRejected { module, .. } => module,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by method dispatch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MethodError {
    #[error("unknown model '{0}'")]
    UnknownModel(String),

    #[error("model '{model}' has no method '{method}'")]
    UnknownMethod { model: String, method: String },

    /// `super` called from the bottom of the chain.
    #[error("'{model}.{method}' has no implementation below the declaring one")]
    NoSuper { model: String, method: String },

    /// A method body reported failure.
    #[error("'{model}.{method}' failed: {message}")]
    Failed {
        model: String,
        method: String,
        message: String,
    },
}

impl MethodError {
    pub fn failed(sup: &crate::method::Super<'_>, message: impl Into<String>) -> Self {
        Self::Failed {
            model: sup.model().to_string(),
            method: sup.method().to_string(),
            message: message.into(),
        }
    }
}
