//! Token provider clients
//!
//! The provider is the upstream service that actually issues tunnel tokens.

mod error;
mod http;

pub use error::ProviderError;
#[cfg(test)]
pub use error::ProviderErrorKind;
pub use http::HttpTokenProvider;

use crate::service::{ApiToken, TokenProvider, TokenType};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Logging wrapper for token providers
pub struct LoggingProvider {
    inner: Arc<dyn TokenProvider>,
}

impl LoggingProvider {
    pub fn new(inner: Arc<dyn TokenProvider>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl TokenProvider for LoggingProvider {
    async fn generate_token(
        &self,
        key_id: Option<&str>,
        token_type: TokenType,
        ttl: Duration,
    ) -> Result<ApiToken, ProviderError> {
        let start = std::time::Instant::now();
        let result = self.inner.generate_token(key_id, token_type, ttl).await;
        let duration = start.elapsed();

        match &result {
            Ok(token) => {
                tracing::info!(
                    key_id = %token.key_id,
                    %token_type,
                    ttl_secs = token.ttl.as_secs(),
                    duration_ms = %duration.as_millis(),
                    "Token generated"
                );
            }
            Err(e) => {
                tracing::error!(
                    key_id = key_id.unwrap_or_default(),
                    %token_type,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    transient = e.kind.is_transient(),
                    "Token generation failed"
                );
            }
        }

        result
    }

    async fn revoke_token(&self, key_id: &str) -> Result<(), ProviderError> {
        let start = std::time::Instant::now();
        let result = self.inner.revoke_token(key_id).await;
        let duration = start.elapsed();

        match &result {
            Ok(()) => {
                tracing::info!(key_id, duration_ms = %duration.as_millis(), "Token revoked upstream");
            }
            Err(e) => {
                tracing::error!(
                    key_id,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    transient = e.kind.is_transient(),
                    "Token revocation failed"
                );
            }
        }

        result
    }
}
