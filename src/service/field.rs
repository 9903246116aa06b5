//! Hidden context carried on questions between legs
//!
//! Stored as `"<type>|<keyID>"` so conversations written by older releases,
//! which kept a bare key id in the field, still decode (as web tokens).

use super::types::TokenType;
use serde::{Deserialize, Serialize};
use std::fmt;

const FIELD_SEP: char = '|';

/// Token type and (when regenerating) the key being replaced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct TokenContext {
    pub token_type: TokenType,
    /// Empty when issuing a brand-new token
    pub key_id: String,
}

impl TokenContext {
    pub fn new(token_type: TokenType) -> Self {
        Self {
            token_type,
            key_id: String::new(),
        }
    }

    pub fn with_key(token_type: TokenType, key_id: impl Into<String>) -> Self {
        Self {
            token_type,
            key_id: key_id.into(),
        }
    }

    pub fn encode(&self) -> String {
        format!("{}{FIELD_SEP}{}", self.token_type, self.key_id)
    }

    /// Split on the first separator. A string without one is a legacy bare
    /// key id. An unknown type name decodes as web.
    pub fn decode(field: &str) -> Self {
        match field.split_once(FIELD_SEP) {
            Some((token_type, key_id)) => Self {
                token_type: TokenType::parse(token_type).unwrap_or(TokenType::Web),
                key_id: key_id.to_string(),
            },
            None => Self::with_key(TokenType::Web, field),
        }
    }
}

impl fmt::Display for TokenContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl From<String> for TokenContext {
    fn from(field: String) -> Self {
        Self::decode(&field)
    }
}

impl From<TokenContext> for String {
    fn from(ctx: TokenContext) -> Self {
        ctx.encode()
    }
}
