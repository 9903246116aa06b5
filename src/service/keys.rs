//! Key selection buttons and expiration choices

use super::error::{ServiceError, ServiceResult};
use super::field::TokenContext;
use super::types::{KeyInfo, TokenType};
use crate::conv::Question;
use std::time::Duration;

/// Characters of a key id shown on selection buttons
pub(super) const KEY_ID_DISPLAY_LEN: usize = 8;

const SECONDS_IN_DAY: u64 = 24 * 60 * 60;
const BUTTON_DATE_FORMAT: &str = "%Y-%m-%d";
const BUTTON_EXPIRY_MARKER: &str = " (exp: ";

/// Offered expiration periods, in button order
pub(super) const EXPIRATION_CHOICES: [&str; 4] = ["1 day", "7 days", "30 days", "90 days"];

/// Map an expiration button to a token lifetime
pub(super) fn parse_expiration(answer: &str) -> Option<Duration> {
    let days = match answer {
        "1 day" => 1,
        "7 days" => 7,
        "30 days" => 30,
        "90 days" => 90,
        _ => return None,
    };
    Some(Duration::from_secs(days * SECONDS_IN_DAY))
}

/// First `len` characters of `s`
pub(super) fn truncate_chars(s: &str, len: usize) -> &str {
    match s.char_indices().nth(len) {
        Some((end, _)) => s.get(..end).unwrap_or(s),
        None => s,
    }
}

pub(super) fn filter_by_type(keys: &[KeyInfo], token_type: TokenType) -> Vec<KeyInfo> {
    keys.iter()
        .filter(|k| k.token_type == token_type)
        .cloned()
        .collect()
}

/// Button text for a key: `"<prefix> (exp: YYYY-MM-DD)"`
pub(super) fn key_button(key: &KeyInfo) -> String {
    format!(
        "{}{BUTTON_EXPIRY_MARKER}{})",
        truncate_chars(&key.key_id, KEY_ID_DISPLAY_LEN),
        key.expires_at.format(BUTTON_DATE_FORMAT)
    )
}

/// A question offering one button per key
pub(super) fn key_selection_question(keys: &[KeyInfo], text: &str) -> Question<TokenContext> {
    Question::new(text, keys.iter().map(key_button))
}

/// Map a selected button back to the full key id it was built from.
///
/// Keys sharing a displayed prefix are ambiguous; the first one in listing
/// order wins.
pub(super) fn resolve_key_id<'a>(
    key_ids: impl IntoIterator<Item = &'a str>,
    button: &str,
) -> ServiceResult<String> {
    let displayed = button
        .split_once(BUTTON_EXPIRY_MARKER)
        .map_or(button, |(prefix, _)| prefix);
    let displayed = truncate_chars(displayed, KEY_ID_DISPLAY_LEN);

    key_ids
        .into_iter()
        .find(|key_id| truncate_chars(key_id, KEY_ID_DISPLAY_LEN) == displayed)
        .map(str::to_string)
        .ok_or_else(|| ServiceError::KeyNotFound {
            selection: button.to_string(),
        })
}
