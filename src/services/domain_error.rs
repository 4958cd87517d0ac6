use thiserror::Error;

/// Business rule failures raised from services through `anyhow` and mapped to
/// a status code at the HTTP edge.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    InvalidState(String),
    #[error("{0}")]
    InvalidInput(String),
}

impl DomainError {
    pub fn conflict(message: impl Into<String>) -> anyhow::Error {
        DomainError::Conflict(message.into()).into()
    }

    pub fn invalid_state(message: impl Into<String>) -> anyhow::Error {
        DomainError::InvalidState(message.into()).into()
    }

    pub fn invalid_input(message: impl Into<String>) -> anyhow::Error {
        DomainError::InvalidInput(message.into()).into()
    }
}
