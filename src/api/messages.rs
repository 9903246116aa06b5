//! Chat command routing
//!
//! Turns one user message into one reply: commands map onto service entry
//! points, anything else continues the user's current dialog.

use super::types::MessageResponse;
use super::AppService;
use crate::conv::ConvError;
use crate::service::{Outcome, ServiceError, ServiceResult, TOKEN_REVOKED_MESSAGE};

pub const WELCOME_MESSAGE: &str = "👋 Welcome to Make It Public Bot!

I help you manage API tokens for https://make-it-public.dev - a service that allows you to securely publish services hidden behind NAT.

Use /help to see available commands.";

pub const HELP_MESSAGE: &str = "Available Commands:

/start - Show welcome message
/help - Display this help message
/new_token - Generate a new API token (up to 3)
/my_tokens - List your active API tokens
/revoke_token - Revoke an API token
/cancel - Cancel the current question

About Make It Public:
Make It Public allows you to securely expose services that are behind NAT or firewalls to the internet.";

pub const UNKNOWN_COMMAND_MESSAGE: &str =
    "❓ Unknown command.\n\nUse /help to see the list of available commands.";
pub const NOT_COMMAND_MESSAGE: &str =
    "I can only respond to commands. Try /help to see what I can do.";
pub const NO_TOKEN_TO_REVOKE_MESSAGE: &str =
    "❌ You don't have an active API token to revoke.\n\nUse /new_token to create one.";
pub const NO_TOKENS_MESSAGE: &str =
    "❌ You don't have any active API tokens.\n\nUse /new_token to create one.";
pub const KEY_GONE_MESSAGE: &str =
    "❌ That token is no longer active.\n\nUse /my_tokens to see your current tokens.";
pub const CANCELLED_MESSAGE: &str =
    "Conversation has been reset. You can start over with /new_token.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    Start,
    Help,
    NewToken,
    MyTokens,
    RevokeToken,
    Cancel,
    Unknown(&'a str),
}

impl<'a> Command<'a> {
    /// Parse `/name`, `/name@bot` or `/name args`. Returns `None` for text
    /// that is not a command.
    pub fn parse(text: &'a str) -> Option<Self> {
        let name = text.trim_start().strip_prefix('/')?;
        let name = name.split_whitespace().next().unwrap_or_default();
        let name = name.split_once('@').map_or(name, |(name, _bot)| name);

        Some(match name {
            "start" => Command::Start,
            "help" => Command::Help,
            "new_token" => Command::NewToken,
            "my_tokens" => Command::MyTokens,
            "revoke_token" => Command::RevokeToken,
            "cancel" => Command::Cancel,
            other => Command::Unknown(other),
        })
    }
}

/// Reply to one message. Errors are the fatal ones only.
pub async fn respond(
    service: &AppService,
    user_id: &str,
    text: &str,
) -> ServiceResult<MessageResponse> {
    if let Some(command) = Command::parse(text) {
        tracing::debug!(user_id, ?command, "Handling command");
        return run_command(service, user_id, command).await;
    }

    if text.trim().is_empty() {
        return Ok(MessageResponse::text(NOT_COMMAND_MESSAGE));
    }

    match service.handle_message(user_id, text).await {
        Ok(outcome) => Ok(reply(outcome)),
        Err(ServiceError::Conversation(ConvError::NotInFlight { .. })) => {
            Ok(MessageResponse::text(NOT_COMMAND_MESSAGE))
        }
        Err(ServiceError::KeyNotFound { selection }) => {
            tracing::info!(user_id, %selection, "Selected key no longer exists");
            Ok(MessageResponse::text(KEY_GONE_MESSAGE))
        }
        Err(e) => Err(e),
    }
}

async fn run_command(
    service: &AppService,
    user_id: &str,
    command: Command<'_>,
) -> ServiceResult<MessageResponse> {
    match command {
        Command::Start => {
            if let Err(e) = service.reset_conversation(user_id).await {
                tracing::error!(user_id, error = %e, "Failed to reset conversation on start");
            }
            Ok(MessageResponse::text(WELCOME_MESSAGE))
        }
        Command::Help => Ok(MessageResponse::text(HELP_MESSAGE)),
        Command::NewToken => service.create_token(user_id).await.map(reply),
        Command::MyTokens => match service.list_tokens(user_id).await {
            Err(ServiceError::TokenNotFound) => Ok(MessageResponse::text(NO_TOKENS_MESSAGE)),
            other => other.map(reply),
        },
        Command::RevokeToken => match service.revoke_token(user_id).await {
            Err(ServiceError::TokenNotFound) => {
                Ok(MessageResponse::text(NO_TOKEN_TO_REVOKE_MESSAGE))
            }
            other => other.map(reply),
        },
        Command::Cancel => {
            service.reset_conversation(user_id).await?;
            Ok(MessageResponse::text(CANCELLED_MESSAGE))
        }
        Command::Unknown(_) => Ok(MessageResponse::text(UNKNOWN_COMMAND_MESSAGE)),
    }
}

fn reply(outcome: Outcome) -> MessageResponse {
    match outcome {
        Outcome::Reply(resp) | Outcome::Corrective(resp) => resp.into(),
        // Only a direct revoke finishes without anything left to ask
        Outcome::Completed => MessageResponse::text(TOKEN_REVOKED_MESSAGE),
    }
}
