//! Errors raised while declaring stacks and synthesizing the assembly.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0} is required")]
    MissingField(String),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("invalid name '{name}': {message}")]
    InvalidName { name: String, message: String },

    #[error("invalid policy: {0}")]
    InvalidPolicy(String),

    #[error("{0} is declared more than once")]
    Duplicate(String),

    #[error("unknown stack: {0}")]
    UnknownStack(String),

    #[error("cycle detected in stack dependencies: {0}")]
    CycleDetected(String),

    #[error("render failed: {0}")]
    Render(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("cannot write assembly: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
