//! Token listing

use super::keys::{filter_by_type, truncate_chars};
use super::{
    KeyInfo, Outcome, Response, ServiceError, ServiceResult, TokenProvider, TokenService,
    TokenType, UserRepo,
};
use std::fmt::Write;

const LIST_HEADER: &str = "🔑 Your Active API Tokens";
const LIST_FOOTER: &str = "Use /new_token to create a new token or /revoke_token to revoke one.";
const LIST_KEY_LEN: usize = 12;
const LIST_EXPIRY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

impl<R, P> TokenService<R, P>
where
    R: UserRepo + 'static,
    P: TokenProvider + 'static,
{
    /// Describe the user's live keys. No dialog is started.
    pub async fn list_tokens(&self, user_id: &str) -> ServiceResult<Outcome> {
        let keys = self.keys_with_expiration(user_id).await?;
        if keys.is_empty() {
            return Err(ServiceError::TokenNotFound);
        }
        Ok(Outcome::Reply(Response::text(format_key_list(&keys))))
    }
}

fn format_key_list(keys: &[KeyInfo]) -> String {
    let mut out = format!("{LIST_HEADER}\n\n");

    for token_type in TokenType::ALL {
        let _ = writeln!(
            out,
            "{}: {}/{}",
            token_type.label(),
            filter_by_type(keys, token_type).len(),
            token_type.quota()
        );
    }
    out.push('\n');

    for (i, key) in keys.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}. [{}] {}...\n   ⏱ Expires: {}",
            i + 1,
            key.token_type.label(),
            truncate_chars(&key.key_id, LIST_KEY_LEN),
            key.expires_at.format(LIST_EXPIRY_FORMAT)
        );
    }

    out.push('\n');
    out.push_str(LIST_FOOTER);
    out
}
