use thiserror::Error;

/// Crate-wide error type. Configuration and data-invariant failures are kept
/// distinct per the solver's error-handling contract: the former are a user
/// mistake, the latter indicate a bug or a corrupted dual vector and have no
/// recovery strategy beyond aborting the run.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("instance data error: {0}")]
    Data(String),

    #[error("master LP backend error: {0}")]
    Backend(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SolverError>;
