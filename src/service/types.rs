//! Token domain types

use crate::conv::Question;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

const WEB_TOKEN_QUOTA: usize = 3;
const TCP_TOKEN_QUOTA: usize = 1;

/// Kind of tunnel a token grants access to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Web,
    Tcp,
}

impl TokenType {
    pub const ALL: [TokenType; 2] = [TokenType::Web, TokenType::Tcp];

    /// Wire and storage name
    pub fn as_str(self) -> &'static str {
        match self {
            TokenType::Web => "web",
            TokenType::Tcp => "tcp",
        }
    }

    /// Button label shown to the user
    pub fn label(self) -> &'static str {
        match self {
            TokenType::Web => "Web",
            TokenType::Tcp => "TCP",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.label() == label)
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }

    /// Maximum number of live tokens of this type per user
    pub fn quota(self) -> usize {
        match self {
            TokenType::Web => WEB_TOKEN_QUOTA,
            TokenType::Tcp => TCP_TOKEN_QUOTA,
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A freshly issued token. The secret is only ever available here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiToken {
    pub key_id: String,
    pub secret: String,
    pub token_type: TokenType,
    pub ttl: Duration,
}

/// Public metadata of a live key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyInfo {
    pub key_id: String,
    pub token_type: TokenType,
    pub expires_at: DateTime<Utc>,
}

/// Message returned to the transport
///
/// An empty `answers` list means no further choice is expected.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Response {
    pub message: String,
    pub answers: Vec<String>,
}

impl Response {
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            answers: Vec::new(),
        }
    }

    pub fn ask<C>(question: &Question<C>) -> Self {
        Self {
            message: question.text.clone(),
            answers: question.answers.clone(),
        }
    }
}

/// Result of one turn that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Message for the user, possibly with buttons for the next answer
    Reply(Response),
    /// The input could not be used; the user may try again
    Corrective(Response),
    /// The action is already done and there is nothing to ask
    Completed,
}

impl Outcome {
    #[allow(dead_code)] // Used in tests
    pub fn response(&self) -> Option<&Response> {
        match self {
            Outcome::Reply(r) | Outcome::Corrective(r) => Some(r),
            Outcome::Completed => None,
        }
    }
}
