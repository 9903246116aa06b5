//! Token provider error types

use thiserror::Error;

/// Provider error with classification
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Network, message)
    }

    #[allow(dead_code)] // Used in tests
    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Server, message)
    }

    #[allow(dead_code)] // Used in tests
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::InvalidRequest, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Unknown, message)
    }

    /// Classify a non-success HTTP status
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let kind = match status {
            400..=499 => ProviderErrorKind::InvalidRequest,
            500..=599 => ProviderErrorKind::Server,
            _ => ProviderErrorKind::Unknown,
        };
        Self::new(kind, message)
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Connection failures and timeouts
    Network,
    /// 5xx from the provider
    Server,
    /// 4xx from the provider
    InvalidRequest,
    /// Undecodable responses and anything else
    Unknown,
}

impl ProviderErrorKind {
    /// Whether the same call could succeed if the user tried again later.
    /// The engine itself never retries.
    pub fn is_transient(self) -> bool {
        matches!(self, Self::Network | Self::Server)
    }
}
