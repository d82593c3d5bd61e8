use std::path::PathBuf;

/// Errors raised while reading addon descriptors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No descriptor file in the addon directory.
    #[error("no addon descriptor found in {0}")]
    MissingManifest(PathBuf),

    /// Descriptor present but not parseable.
    #[error("malformed descriptor {path}: {reason}")]
    MalformedManifest { path: PathBuf, reason: String },

    /// A recognized key holds a value of the wrong type.
    #[error("descriptor key '{key}' expects {expected}, found {found}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    /// The addon directory name is not a valid technical key.
    #[error("invalid technical key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    /// A listed file path is absolute or climbs out of the addon directory.
    #[error("path '{path}' in '{key}' escapes the addon directory")]
    EscapingPath { key: String, path: String },

    /// A configured addons path does not exist or is not a directory.
    #[error("addons path not found: {0}")]
    AddonsPathNotFound(PathBuf),

    /// I/O error reading descriptor files.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
