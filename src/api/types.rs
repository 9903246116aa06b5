//! API request and response types

use crate::service::Response;
use serde::{Deserialize, Serialize};

/// A chat message from a user
#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    #[serde(default)]
    pub text: String,
}

/// Text to show the user, with the buttons they may answer with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
    pub answers: Vec<String>,
}

impl MessageResponse {
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            answers: Vec::new(),
        }
    }
}

impl From<Response> for MessageResponse {
    fn from(resp: Response) -> Self {
        Self {
            message: resp.message,
            answers: resp.answers,
        }
    }
}

/// Generic error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
