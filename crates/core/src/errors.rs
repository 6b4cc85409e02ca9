use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

impl DomainError {
    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::MalformedPayload(detail.into())
    }
}
