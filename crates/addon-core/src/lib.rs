//! Load passes for the addon loader.
//!
//! [`Loader::run`] turns a [`Request`] into module state changes: it reads
//! the addons paths, resolves a load order, composes the model registry,
//! applies data files through a [`RecordLoader`], runs lifecycle hooks
//! through a [`HookProvider`] and persists module state in a
//! [`StateLedger`]. Readers get the result from [`Loader::registry`].
//!
//! # Example
//!
//! ```no_run
//! use addon_core::{ConfigResolver, Loader, Request};
//!
//! let config = ConfigResolver::new(".").resolve()?;
//! let loader = Loader::new(config);
//! let report = loader.run(&Request::install(["sale"]))?;
//! println!("installed: {:?}", report.installed);
//! # Ok::<(), addon_core::Error>(())
//! ```

pub mod config;
pub mod error;
pub mod external;
pub mod hooks;
pub mod loader;
pub mod lock;
pub mod records;
pub mod report;
pub mod source;
pub mod state;

pub use config::{ConfigResolver, LoaderConfig};
pub use error::{Error, Result};
pub use external::MissingExternal;
pub use hooks::{HookContext, HookError, HookKind, HookProvider, HookTable, NoHooks, ScriptHooks};
pub use loader::{Loader, LoaderBuilder, ModuleStatus, Request};
pub use records::{DataFileError, FileCheckLoader, LoadContext, RecordLoader};
pub use report::{AbortCause, Aborted, Exclusion, LoadReport};
pub use source::{DeclarativeSource, ModuleSource, SourceError, StaticSource};
pub use state::{ModuleRecord, ModuleState, StateLedger};
