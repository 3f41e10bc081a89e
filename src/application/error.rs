use thiserror::Error;

use crate::application::repos::RepoError;
use crate::cache::CacheError;
use crate::infra::error::InfraError;
use crate::published::FactoryError;

#[derive(Debug, Error)]
pub enum CacheServiceError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Factory(#[from] FactoryError),
}

/// Top-level failure of a command run.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Service(#[from] CacheServiceError),
    #[error("{kind} not found: {reference}")]
    NotFound { kind: &'static str, reference: String },
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn not_found(kind: &'static str, reference: impl ToString) -> Self {
        Self::NotFound {
            kind,
            reference: reference.to_string(),
        }
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

impl From<FactoryError> for AppError {
    fn from(error: FactoryError) -> Self {
        Self::Service(CacheServiceError::Factory(error))
    }
}
