//! Service error types

use crate::conv::ConvError;
use crate::db::DbError;
use crate::provider::ProviderError;
use thiserror::Error;

/// Failure reported by a `UserRepo` implementation
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct RepoError(pub String);

impl RepoError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<DbError> for RepoError {
    fn from(e: DbError) -> Self {
        Self(e.to_string())
    }
}

/// Fatal outcome of a turn
///
/// Recoverable situations (bad choices, declined regeneration) are not errors;
/// they come back as an `Outcome`.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("token not found")]
    TokenNotFound,
    #[error("selected key not found: {selection}")]
    KeyNotFound { selection: String },
    #[error("protocol violation: {0}")]
    Protocol(String),
    #[error("conversation error: {0}")]
    Conversation(#[from] ConvError),
    #[error("failed to {step}: {source}")]
    Repository {
        step: &'static str,
        #[source]
        source: RepoError,
    },
    #[error("failed to {step}: {source}")]
    Provider {
        step: &'static str,
        #[source]
        source: ProviderError,
    },
    /// The provider revoked the key but the repository still lists it
    #[error("key {key_id} revoked upstream but not removed from repository: {source}")]
    PartialRevoke {
        key_id: String,
        #[source]
        source: RepoError,
    },
    #[error("unsupported conversation leg: {0}")]
    UnknownLeg(String),
}

impl ServiceError {
    pub(crate) fn repo(step: &'static str) -> impl FnOnce(RepoError) -> Self {
        move |source| ServiceError::Repository { step, source }
    }

    pub(crate) fn provider(step: &'static str) -> impl FnOnce(ProviderError) -> Self {
        move |source| ServiceError::Provider { step, source }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
