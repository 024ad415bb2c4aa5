use thiserror::Error;

/// Errors raised by stores, samplers, validation runs and comparisons.
///
/// Per-instance prediction failures are never reported through this type;
/// evaluators record them as sentinels and keep going.
#[derive(Debug, Error)]
pub enum EvalError {
    /// Schema/goal mismatch, incompatible model kinds, bad parameters.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// A report was requested on a problem it is not defined for.
    #[error("precondition violated: {0}")]
    Precondition(String),
    /// The source could not provide an isolated store for a run.
    #[error("could not duplicate instance store: {0}")]
    CloneFailure(String),
    /// A circular goal search went all the way round without a match.
    #[error("no instance found with {0}")]
    NotFound(String),
    #[error("unsupported operation: {0}")]
    Unsupported(String),
    #[error("index {index} out of range for store of {count} instances")]
    IndexOutOfRange { index: usize, count: usize },
    /// The external model failed while training.
    #[error("model '{model}' failed to train: {message}")]
    Model { model: String, message: String },
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EvalError>;

impl EvalError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        EvalError::Configuration(msg.into())
    }

    pub fn precondition(msg: impl Into<String>) -> Self {
        EvalError::Precondition(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        EvalError::Unsupported(msg.into())
    }

    pub(crate) fn model(name: &str, err: anyhow::Error) -> Self {
        EvalError::Model {
            model: name.to_string(),
            message: format!("{:#}", err),
        }
    }
}
