use thiserror::Error;

/// When things go awry while handling configuration.
#[derive(Debug, Error)]
pub enum RookdError {
    /// File-level I/O surfaced as a syntax-level failure, carrying the OS
    /// message alongside the offending path.
    #[error("couldn't open \"{path}\": {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// A lexer/parser error. The message already carries `file:line`.
    #[error("{0}")]
    Parse(String),
    /// An `include` pattern matched nothing, or its expansion failed.
    #[error("{0}")]
    Include(String),
    /// The validator found problems; nothing was committed.
    #[error("{0} errors encountered")]
    Validation(usize),
    /// Commit-phase inconsistency. Validation guarantees this never fires;
    /// reaching it means a program bug, and the daemon aborts on it.
    #[error("configuration internal error: {0}")]
    Internal(String),
    /// Something failed in the start up of the daemon.
    #[error("startup error: {0}")]
    Startup(String),
}

impl From<RookdError> for std::io::Error {
    fn from(error: RookdError) -> Self {
        match error {
            RookdError::Io { source, .. } => source,
            other => std::io::Error::other(other.to_string()),
        }
    }
}
