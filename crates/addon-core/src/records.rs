//! The record-loader seam
//!
//! The loader never interprets data files itself. It hands each file, in
//! declared order, to a [`RecordLoader`] together with a [`LoadContext`].

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use addon_registry::ModelRegistry;

/// Extensions accepted by [`FileCheckLoader`].
pub const DATA_EXTENSIONS: &[&str] = &["xml", "csv", "sql", "yml", "yaml", "json"];

/// What a record-loader knows about the module being applied.
#[derive(Debug, Clone, Copy)]
pub struct LoadContext<'a> {
    pub module: &'a str,
    pub root: &'a Path,
    /// Transitive dependency closure of `module`
    pub dependencies: &'a BTreeSet<String>,
    /// Registry composed for the pass, including `module`
    pub registry: &'a ModelRegistry,
    /// Whether demo files are being applied
    pub demo: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{path}: {message}")]
pub struct DataFileError {
    pub path: PathBuf,
    pub message: String,
}

impl DataFileError {
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Applies data files and purges a module's records.
pub trait RecordLoader: Send + Sync {
    /// Apply one data or demo file.
    ///
    /// # Errors
    ///
    /// A `DataFileError` aborts the module's transition.
    fn load(&self, file: &Path, ctx: &LoadContext<'_>) -> Result<(), DataFileError>;

    /// Drop every record owned by the module being removed.
    fn purge(&self, ctx: &LoadContext<'_>) -> Result<(), DataFileError>;
}

/// Checks that each file exists and has a known format, without loading records.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileCheckLoader;

impl RecordLoader for FileCheckLoader {
    fn load(&self, file: &Path, ctx: &LoadContext<'_>) -> Result<(), DataFileError> {
        if !file.is_file() {
            return Err(DataFileError::new(file, "file not found"));
        }
        let extension = file
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if !DATA_EXTENSIONS.contains(&extension.as_str()) {
            return Err(DataFileError::new(
                file,
                format!("unsupported data file type '{extension}'"),
            ));
        }
        tracing::debug!(module = %ctx.module, file = %file.display(), demo = ctx.demo, "Data file checked");
        Ok(())
    }

    fn purge(&self, ctx: &LoadContext<'_>) -> Result<(), DataFileError> {
        tracing::debug!(module = %ctx.module, "Nothing to purge");
        Ok(())
    }
}
