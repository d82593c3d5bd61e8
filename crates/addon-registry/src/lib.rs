//! Model registry for the addon loader.
//!
//! Modules contribute [`Contribution`]s: declarations of new models and
//! extensions of existing ones. [`compose`] applies them in load order to a
//! [`ModelRegistry`], building per-method chains that dispatch most recent
//! first with an explicit [`Super`] handle. [`ModelRegistry::publish`]
//! freezes the result into a [`PublishedRegistry`] with index-based lookups.

pub mod composer;
pub mod contribution;
pub mod error;
pub mod field;
pub mod method;
pub mod published;

pub use composer::{ComposedField, ComposedModel, Composition, ModelRegistry, compose};
pub use contribution::{Contribution, ModelDecl, ModelExt, ModelKind, ModuleContributions};
pub use error::{Error, MethodError, Result};
pub use field::{FieldDecl, FieldDefault, FieldKind, Storage};
pub use method::{CallContext, MethodBody, MethodChain, MethodDef, MethodImpl, Super};
pub use published::{DanglingComodel, FieldId, ModelId, PublishedField, PublishedModel, PublishedRegistry};
