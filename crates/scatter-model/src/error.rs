//! Error types shared by every scatter crate.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScatterError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScatterError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("Unknown backend: {0}")]
    UnknownBackend(String),

    #[error("Dangling port: {0}")]
    DanglingPort(String),

    #[error("Port used more than once: {0}")]
    PortReuse(String),

    #[error("Shape mismatch: {0}")]
    Shape(String),

    #[error("Circuit was analyzed by backend '{analyzed}' but evaluated by '{evaluating}'")]
    BackendMismatch {
        analyzed: String,
        evaluating: String,
    },

    #[error("Computation error: {0}")]
    Computation(String),
}

impl ScatterError {
    pub fn config(msg: impl Into<String>) -> Self {
        ScatterError::Configuration(msg.into())
    }
}
