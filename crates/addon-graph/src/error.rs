/// Errors raised by graph operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The graph contains a cycle, so no topological order exists.
    #[error("dependency cycle detected among: {}", participants.join(", "))]
    DependencyCycle { participants: Vec<String> },
}

pub type Result<T> = std::result::Result<T, Error>;
