//! HTTP client for the token provider API

use super::ProviderError;
use crate::service::{ApiToken, TokenProvider, TokenType};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct GenerateTokenRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    key_id: Option<&'a str>,
    ttl: u64,
    #[serde(rename = "type")]
    token_type: TokenType,
}

#[derive(Debug, Deserialize)]
struct GenerateTokenResponse {
    token: String,
    key_id: String,
    #[serde(rename = "type", default)]
    token_type: Option<String>,
    ttl: u64,
}

/// Token provider reached over HTTP
pub struct HttpTokenProvider {
    client: Client,
    base_url: String,
}

impl HttpTokenProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn token_url(&self) -> String {
        format!("{}/token", self.base_url)
    }
}

#[async_trait]
impl TokenProvider for HttpTokenProvider {
    async fn generate_token(
        &self,
        key_id: Option<&str>,
        token_type: TokenType,
        ttl: Duration,
    ) -> Result<ApiToken, ProviderError> {
        let request = GenerateTokenRequest {
            key_id: key_id.filter(|id| !id.is_empty()),
            ttl: ttl.as_secs(),
            token_type,
        };

        let response = self
            .client
            .post(self.token_url())
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::network(format!("failed to send request: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::from_status(
                status.as_u16(),
                format!("failed to generate token, status code: {}", status.as_u16()),
            ));
        }

        let body: GenerateTokenResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::unknown(format!("failed to decode response: {e}")))?;

        Ok(ApiToken {
            key_id: body.key_id,
            secret: body.token,
            token_type: body
                .token_type
                .as_deref()
                .and_then(TokenType::parse)
                .unwrap_or(token_type),
            ttl: Duration::from_secs(body.ttl),
        })
    }

    async fn revoke_token(&self, key_id: &str) -> Result<(), ProviderError> {
        let url = format!("{}/{key_id}", self.token_url());
        let response = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(|e| ProviderError::network(format!("failed to send request: {e}")))?;

        let status = response.status();
        // Already gone upstream counts as revoked
        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok(());
        }

        Err(ProviderError::from_status(
            status.as_u16(),
            format!("failed to revoke token, status code: {}", status.as_u16()),
        ))
    }
}
