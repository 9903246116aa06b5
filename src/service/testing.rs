//! Mock implementations for testing
//!
//! These mocks let the orchestrator run without a database or a provider.

use super::traits::{Clock, TokenProvider, UserRepo};
use super::{ApiToken, KeyInfo, RepoError, TokenConversation, TokenService, TokenType};
use crate::provider::ProviderError;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// User that `InMemoryRepo::add_key` stores keys for
pub const TEST_USER: &str = "user-1";

/// The instant `FixedClock::default()` reports
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 9, 30, 0).unwrap()
}

/// A key for `TEST_USER` that expires 30 days after `now()`
pub fn key(key_id: &str, token_type: TokenType) -> KeyInfo {
    KeyInfo {
        key_id: key_id.to_string(),
        token_type,
        expires_at: now() + chrono::Duration::days(30),
    }
}

/// Service wired to fresh mocks and a fixed clock
pub fn service() -> (
    TokenService<Arc<InMemoryRepo>, Arc<MockProvider>>,
    Arc<InMemoryRepo>,
    Arc<MockProvider>,
) {
    service_with(InMemoryRepo::new(), MockProvider::new())
}

pub fn service_with(
    repo: InMemoryRepo,
    prov: MockProvider,
) -> (
    TokenService<Arc<InMemoryRepo>, Arc<MockProvider>>,
    Arc<InMemoryRepo>,
    Arc<MockProvider>,
) {
    let repo = Arc::new(repo);
    let prov = Arc::new(prov);
    let svc = TokenService::new(repo.clone(), prov.clone())
        .with_clock(Arc::new(FixedClock::default()));
    (svc, repo, prov)
}

// ============================================================================
// Fixed Clock
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Default for FixedClock {
    fn default() -> Self {
        Self(now())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

// ============================================================================
// In-Memory Repository
// ============================================================================

/// Repository backed by maps, with injectable failures
pub struct InMemoryRepo {
    conversations: Mutex<HashMap<String, TokenConversation>>,
    keys: Mutex<HashMap<String, Vec<KeyInfo>>>,
    failing: Mutex<HashSet<String>>,
    saves: Mutex<usize>,
    /// Record of key additions and removals
    mutations: Mutex<Vec<String>>,
}

impl InMemoryRepo {
    pub fn new() -> Self {
        Self {
            conversations: Mutex::new(HashMap::new()),
            keys: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            saves: Mutex::new(0),
            mutations: Mutex::new(Vec::new()),
        }
    }

    /// Make every later call of the named trait method fail
    pub fn fail_on(&self, op: &str) {
        self.failing.lock().unwrap().insert(op.to_string());
    }

    /// Seed a key for `TEST_USER` without recording a mutation
    pub fn add_key(&self, key: KeyInfo) {
        self.keys
            .lock()
            .unwrap()
            .entry(TEST_USER.to_string())
            .or_default()
            .push(key);
    }

    /// Drop a key behind the service's back
    pub fn remove_key(&self, user_id: &str, key_id: &str) {
        if let Some(keys) = self.keys.lock().unwrap().get_mut(user_id) {
            keys.retain(|k| k.key_id != key_id);
        }
    }

    /// Live keys in listing order
    pub fn keys(&self, user_id: &str) -> Vec<KeyInfo> {
        let mut keys: Vec<KeyInfo> = self
            .keys
            .lock()
            .unwrap()
            .get(user_id)
            .into_iter()
            .flatten()
            .filter(|k| k.expires_at > now())
            .cloned()
            .collect();
        keys.sort_by(|a, b| {
            a.expires_at
                .cmp(&b.expires_at)
                .then_with(|| a.key_id.cmp(&b.key_id))
        });
        keys
    }

    pub fn put_conversation(&self, conversation: TokenConversation) {
        self.conversations
            .lock()
            .unwrap()
            .insert(conversation.id.clone(), conversation);
    }

    /// The stored conversation, if any
    pub fn conversation(&self, user_id: &str) -> Option<TokenConversation> {
        self.conversations.lock().unwrap().get(user_id).cloned()
    }

    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap()
    }

    pub fn mutations(&self) -> Vec<String> {
        self.mutations.lock().unwrap().clone()
    }

    pub fn mutation_count(&self) -> usize {
        self.mutations.lock().unwrap().len()
    }

    fn check(&self, op: &str) -> Result<(), RepoError> {
        if self.failing.lock().unwrap().contains(op) {
            return Err(RepoError::new(format!("{op} failed")));
        }
        Ok(())
    }
}

impl Default for InMemoryRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepo for InMemoryRepo {
    async fn get_conversation(&self, user_id: &str) -> Result<TokenConversation, RepoError> {
        self.check("get_conversation")?;
        Ok(self
            .conversation(user_id)
            .unwrap_or_else(|| TokenConversation::new(user_id)))
    }

    async fn save_conversation(&self, conversation: &TokenConversation) -> Result<(), RepoError> {
        self.check("save_conversation")?;
        *self.saves.lock().unwrap() += 1;
        self.put_conversation(conversation.clone());
        Ok(())
    }

    async fn delete_conversation(&self, user_id: &str) -> Result<(), RepoError> {
        self.check("delete_conversation")?;
        self.conversations.lock().unwrap().remove(user_id);
        Ok(())
    }

    async fn get_api_keys(&self, user_id: &str) -> Result<Vec<String>, RepoError> {
        self.check("get_api_keys")?;
        Ok(self.keys(user_id).into_iter().map(|k| k.key_id).collect())
    }

    async fn get_api_keys_with_expiration(
        &self,
        user_id: &str,
    ) -> Result<Vec<KeyInfo>, RepoError> {
        self.check("get_api_keys_with_expiration")?;
        Ok(self.keys(user_id))
    }

    async fn add_api_key(
        &self,
        user_id: &str,
        key_id: &str,
        token_type: TokenType,
        ttl: Duration,
    ) -> Result<(), RepoError> {
        self.check("add_api_key")?;
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| now().checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let mut keys = self.keys.lock().unwrap();
        let user_keys = keys.entry(user_id.to_string()).or_default();
        user_keys.retain(|k| k.key_id != key_id);
        user_keys.push(KeyInfo {
            key_id: key_id.to_string(),
            token_type,
            expires_at,
        });
        self.mutations.lock().unwrap().push(format!(
            "add:{user_id}:{key_id}:{token_type}:{}",
            ttl.as_secs()
        ));
        Ok(())
    }

    async fn revoke_token(&self, user_id: &str, key_id: &str) -> Result<(), RepoError> {
        self.check("revoke_token")?;
        self.remove_key(user_id, key_id);
        self.mutations
            .lock()
            .unwrap()
            .push(format!("revoke:{user_id}:{key_id}"));
        Ok(())
    }
}

// ============================================================================
// Mock Token Provider
// ============================================================================

/// Provider that issues queued or generated tokens and records every call
pub struct MockProvider {
    queued: Mutex<VecDeque<(String, String)>>,
    generate_error: Mutex<Option<ProviderError>>,
    revoke_error: Mutex<Option<ProviderError>>,
    issued: Mutex<usize>,
    calls: Mutex<Vec<String>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            queued: Mutex::new(VecDeque::new()),
            generate_error: Mutex::new(None),
            revoke_error: Mutex::new(None),
            issued: Mutex::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue the key id and secret of the next issued token
    pub fn queue_token(&self, key_id: &str, secret: &str) {
        self.queued
            .lock()
            .unwrap()
            .push_back((key_id.to_string(), secret.to_string()));
    }

    pub fn fail_generate(&self, error: ProviderError) {
        *self.generate_error.lock().unwrap() = Some(error);
    }

    pub fn fail_revoke(&self, error: ProviderError) {
        *self.revoke_error.lock().unwrap() = Some(error);
    }

    /// Calls so far, as `generate:<key|->:<type>:<secs>` and `revoke:<key>`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenProvider for MockProvider {
    async fn generate_token(
        &self,
        key_id: Option<&str>,
        token_type: TokenType,
        ttl: Duration,
    ) -> Result<ApiToken, ProviderError> {
        self.calls.lock().unwrap().push(format!(
            "generate:{}:{token_type}:{}",
            key_id.unwrap_or("-"),
            ttl.as_secs()
        ));
        if let Some(err) = self.generate_error.lock().unwrap().clone() {
            return Err(err);
        }

        let (key_id, secret) = self.queued.lock().unwrap().pop_front().unwrap_or_else(|| {
            let mut issued = self.issued.lock().unwrap();
            *issued += 1;
            let key_id = key_id.map_or_else(|| format!("k{issued}"), str::to_string);
            let secret = format!("secret-{key_id}");
            (key_id, secret)
        });

        Ok(ApiToken {
            key_id,
            secret,
            token_type,
            ttl,
        })
    }

    async fn revoke_token(&self, key_id: &str) -> Result<(), ProviderError> {
        self.calls.lock().unwrap().push(format!("revoke:{key_id}"));
        match self.revoke_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_repo_hides_expired_keys() {
        let repo = InMemoryRepo::new();
        repo.add_key(key("live", TokenType::Web));
        repo.add_key(KeyInfo {
            expires_at: now() - chrono::Duration::seconds(1),
            ..key("stale", TokenType::Web)
        });

        let ids = repo.get_api_keys(TEST_USER).await.unwrap();
        assert_eq!(ids, vec!["live"]);
    }

    #[tokio::test]
    async fn test_repo_add_replaces_existing_key() {
        let repo = InMemoryRepo::new();
        repo.add_key(key("k1", TokenType::Web));

        repo.add_api_key(TEST_USER, "k1", TokenType::Tcp, Duration::from_secs(60))
            .await
            .unwrap();

        let keys = repo.keys(TEST_USER);
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].token_type, TokenType::Tcp);
    }

    #[tokio::test]
    async fn test_repo_injected_failure() {
        let repo = InMemoryRepo::new();
        repo.fail_on("save_conversation");

        let conv = TokenConversation::new(TEST_USER);
        assert!(repo.save_conversation(&conv).await.is_err());
        assert_eq!(repo.save_count(), 0);
    }

    #[tokio::test]
    async fn test_provider_echoes_key_and_ttl() {
        let prov = MockProvider::new();
        let ttl = Duration::from_secs(3600);

        let fresh = prov.generate_token(None, TokenType::Web, ttl).await.unwrap();
        let again = prov
            .generate_token(Some("keep-me"), TokenType::Tcp, ttl)
            .await
            .unwrap();

        assert_eq!(fresh.key_id, "k1");
        assert_eq!(fresh.ttl, ttl);
        assert_eq!(again.key_id, "keep-me");
        assert_eq!(again.token_type, TokenType::Tcp);
        assert_eq!(
            prov.calls(),
            vec!["generate:-:web:3600", "generate:keep-me:tcp:3600"]
        );
    }
}
