//! Database schema

/// SQL schema for initialization
///
/// Timestamps are unix seconds. `api_keys.expires_at` is stored one
/// `KEY_EXPIRY_MARGIN` ahead of the real expiry so keys stop being listed
/// slightly before the provider rejects them.
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS conversations (
    user_id TEXT PRIMARY KEY,
    data TEXT NOT NULL,
    expires_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS api_keys (
    user_id TEXT NOT NULL,
    key_id TEXT NOT NULL,
    token_type TEXT NOT NULL DEFAULT 'web',
    expires_at INTEGER NOT NULL,

    PRIMARY KEY (user_id, key_id)
);

CREATE INDEX IF NOT EXISTS idx_api_keys_expiry ON api_keys(user_id, expires_at);
";

/// Seconds subtracted from a key's expiry when it is stored
pub const KEY_EXPIRY_MARGIN: i64 = 60;
