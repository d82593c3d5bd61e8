//! Error types for addon-cli
//!
//! Exit codes are decided here and nowhere else:
//!
//! | code | meaning |
//! |------|---------|
//! | 0 | success |
//! | 1 | any other error |
//! | 2 | unresolvable or unknown module, incompatible modules |
//! | 3 | data file or hook failure |
//! | 4 | duplicate model declaration |
//! | 5 | another load pass is running |

use addon_core::Error as CoreError;

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that can occur in CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Error from addon-core
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON output error
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Requested modules that could not be loaded
    #[error("Could not load: {}", .0.join(", "))]
    Blocked(Vec<String>),

    /// Modules whose transition was rolled back
    #[error("Aborted: {}", .0.join(", "))]
    Aborted(Vec<String>),

    /// User-facing error with a message
    #[error("{message}")]
    User { message: String },
}

impl CliError {
    /// Create a new user error with the given message
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Core(CoreError::UnknownModule(_) | CoreError::Incompatible(..)) => 2,
            Self::Blocked(_) => 2,
            Self::Aborted(_) => 3,
            Self::Core(CoreError::Compose(e)) if e.is_fatal() => 4,
            Self::Core(CoreError::LoaderBusy) => 5,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        let duplicate = addon_registry::Error::DuplicateDeclaration {
            model: "res.partner".to_string(),
            module: "b".to_string(),
            declared_by: "a".to_string(),
        };
        assert_eq!(CliError::from(CoreError::UnknownModule(vec!["x".into()])).exit_code(), 2);
        assert_eq!(CliError::Blocked(vec!["x".into()]).exit_code(), 2);
        assert_eq!(CliError::Aborted(vec!["x".into()]).exit_code(), 3);
        assert_eq!(CliError::from(CoreError::Compose(duplicate)).exit_code(), 4);
        assert_eq!(CliError::from(CoreError::LoaderBusy).exit_code(), 5);
        assert_eq!(CliError::from(CoreError::NotInstalled("x".into())).exit_code(), 1);
        assert_eq!(CliError::user("nope").exit_code(), 1);
    }
}
