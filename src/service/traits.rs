//! Trait abstractions for the service's collaborators
//!
//! These traits let the orchestrator run against in-memory mocks in tests.

use super::error::RepoError;
use super::types::{ApiToken, KeyInfo, TokenType};
use super::TokenConversation;
use crate::db::Database;
use crate::provider::ProviderError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Per-user storage of conversations and issued keys
#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Load the user's conversation, or a fresh idle one if none is stored
    async fn get_conversation(&self, user_id: &str) -> Result<TokenConversation, RepoError>;

    async fn save_conversation(&self, conversation: &TokenConversation) -> Result<(), RepoError>;

    async fn delete_conversation(&self, user_id: &str) -> Result<(), RepoError>;

    /// Ids of the user's non-expired keys
    async fn get_api_keys(&self, user_id: &str) -> Result<Vec<String>, RepoError>;

    /// Non-expired keys with their type and expiry
    async fn get_api_keys_with_expiration(&self, user_id: &str)
        -> Result<Vec<KeyInfo>, RepoError>;

    async fn add_api_key(
        &self,
        user_id: &str,
        key_id: &str,
        token_type: TokenType,
        ttl: Duration,
    ) -> Result<(), RepoError>;

    async fn revoke_token(&self, user_id: &str, key_id: &str) -> Result<(), RepoError>;
}

/// Upstream service that issues and revokes tunnel tokens
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Issue a token. Passing an existing key id regenerates that key.
    async fn generate_token(
        &self,
        key_id: Option<&str>,
        token_type: TokenType,
        ttl: Duration,
    ) -> Result<ApiToken, ProviderError>;

    async fn revoke_token(&self, key_id: &str) -> Result<(), ProviderError>;
}

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: UserRepo + ?Sized> UserRepo for Arc<T> {
    async fn get_conversation(&self, user_id: &str) -> Result<TokenConversation, RepoError> {
        (**self).get_conversation(user_id).await
    }

    async fn save_conversation(&self, conversation: &TokenConversation) -> Result<(), RepoError> {
        (**self).save_conversation(conversation).await
    }

    async fn delete_conversation(&self, user_id: &str) -> Result<(), RepoError> {
        (**self).delete_conversation(user_id).await
    }

    async fn get_api_keys(&self, user_id: &str) -> Result<Vec<String>, RepoError> {
        (**self).get_api_keys(user_id).await
    }

    async fn get_api_keys_with_expiration(
        &self,
        user_id: &str,
    ) -> Result<Vec<KeyInfo>, RepoError> {
        (**self).get_api_keys_with_expiration(user_id).await
    }

    async fn add_api_key(
        &self,
        user_id: &str,
        key_id: &str,
        token_type: TokenType,
        ttl: Duration,
    ) -> Result<(), RepoError> {
        (**self).add_api_key(user_id, key_id, token_type, ttl).await
    }

    async fn revoke_token(&self, user_id: &str, key_id: &str) -> Result<(), RepoError> {
        (**self).revoke_token(user_id, key_id).await
    }
}

#[async_trait]
impl<T: TokenProvider + ?Sized> TokenProvider for Arc<T> {
    async fn generate_token(
        &self,
        key_id: Option<&str>,
        token_type: TokenType,
        ttl: Duration,
    ) -> Result<ApiToken, ProviderError> {
        (**self).generate_token(key_id, token_type, ttl).await
    }

    async fn revoke_token(&self, key_id: &str) -> Result<(), ProviderError> {
        (**self).revoke_token(key_id).await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Adapter to use `Database` as `UserRepo`
#[derive(Clone)]
pub struct DatabaseRepo {
    db: Database,
    clock: Arc<dyn Clock>,
    conversation_ttl: Duration,
}

impl DatabaseRepo {
    pub fn new(db: Database, conversation_ttl: Duration) -> Self {
        Self {
            db,
            clock: Arc::new(SystemClock),
            conversation_ttl,
        }
    }

    #[allow(dead_code)] // Used in tests
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

#[async_trait]
impl UserRepo for DatabaseRepo {
    async fn get_conversation(&self, user_id: &str) -> Result<TokenConversation, RepoError> {
        Ok(self.db.get_conversation(user_id, self.clock.now())?)
    }

    async fn save_conversation(&self, conversation: &TokenConversation) -> Result<(), RepoError> {
        let ttl = chrono::Duration::from_std(self.conversation_ttl)
            .map_err(|e| RepoError::new(format!("invalid conversation ttl: {e}")))?;
        self.db
            .save_conversation(conversation, self.clock.now() + ttl)
            .map_err(RepoError::from)
    }

    async fn delete_conversation(&self, user_id: &str) -> Result<(), RepoError> {
        self.db.delete_conversation(user_id).map_err(RepoError::from)
    }

    async fn get_api_keys(&self, user_id: &str) -> Result<Vec<String>, RepoError> {
        let keys = self.db.list_api_keys(user_id, self.clock.now())?;
        Ok(keys.into_iter().map(|k| k.key_id).collect())
    }

    async fn get_api_keys_with_expiration(
        &self,
        user_id: &str,
    ) -> Result<Vec<KeyInfo>, RepoError> {
        Ok(self.db.list_api_keys(user_id, self.clock.now())?)
    }

    async fn add_api_key(
        &self,
        user_id: &str,
        key_id: &str,
        token_type: TokenType,
        ttl: Duration,
    ) -> Result<(), RepoError> {
        self.db
            .add_api_key(user_id, key_id, token_type, ttl, self.clock.now())
            .map_err(RepoError::from)
    }

    async fn revoke_token(&self, user_id: &str, key_id: &str) -> Result<(), RepoError> {
        self.db.remove_api_key(user_id, key_id).map_err(RepoError::from)
    }
}
