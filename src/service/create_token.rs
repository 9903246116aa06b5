//! Create and regenerate dialogs

use super::keys::{
    filter_by_type, key_selection_question, parse_expiration, resolve_key_id, EXPIRATION_CHOICES,
};
use super::{
    single_answer, LegStart, Outcome, Response, ServiceError, ServiceResult, TokenAnswer,
    TokenContext, TokenProvider, TokenService, TokenType, UserRepo, INVALID_CHOICE_HINT,
    LEG_NEW_TOKEN, LEG_SELECT_TOKEN_TO_REGENERATE, LEG_SELECT_TOKEN_TYPE, LEG_TOKEN_EXISTS,
    LEG_TOKEN_REGENERATE,
};
use crate::conv::Question;
use chrono::{DateTime, Utc};
use std::time::Duration;

const EXPIRY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub(super) const SELECT_TYPE_QUESTION: &str = "What type of token do you want to create?";
pub(super) const EXPIRATION_QUESTION: &str = "What is the expiration period for your new API token?";
pub(super) const SELECT_REGENERATE_QUESTION: &str = "Which token do you want to regenerate?";
pub(super) const NO_CHANGES_MESSAGE: &str =
    "No changes made. You can continue using your existing API tokens.";
pub(super) const INVALID_TYPE_MESSAGE: &str =
    "Invalid token type selected. Please choose Web or TCP.";
pub(super) const INVALID_EXPIRATION_MESSAGE: &str =
    "Invalid expiration period selected. Please select one of the available options.";

const ANSWER_YES: &str = "Yes";
const ANSWER_NO: &str = "No";

fn token_created_message(secret: &str, valid_until: &str) -> String {
    format!(
        "🔑 Your New API Token\n\n{secret}\n\n⏱ Valid until: {valid_until}\n\n\
         Keep this token secure and don't share it with others."
    )
}

fn quota_reached_message(token_type: TokenType) -> String {
    let limit = token_type.quota();
    match token_type {
        TokenType::Tcp => format!(
            "You've reached the maximum of {limit} TCP token. Do you want to regenerate it?"
        ),
        TokenType::Web => format!(
            "You've reached the maximum of {limit} web tokens. Do you want to regenerate an existing one?"
        ),
    }
}

/// Token context of a completed leg; legs started before context existed
/// fall back to a new web token
fn answer_context(answer: &TokenAnswer) -> TokenContext {
    answer
        .field()
        .cloned()
        .unwrap_or_else(|| TokenContext::new(TokenType::Web))
}

impl<R, P> TokenService<R, P>
where
    R: UserRepo + 'static,
    P: TokenProvider + 'static,
{
    /// Start the create-token dialog by asking for the token type
    pub async fn create_token(&self, user_id: &str) -> ServiceResult<Outcome> {
        let question = Question::new(
            SELECT_TYPE_QUESTION,
            TokenType::ALL.into_iter().map(TokenType::label),
        );
        self.start_leg(user_id, LEG_SELECT_TOKEN_TYPE, question, LegStart::Fresh)
            .await
    }

    /// Branch on quota: ask for an expiration, or offer to regenerate
    pub(super) async fn handle_select_token_type_result(
        &self,
        user_id: &str,
        answers: Vec<TokenAnswer>,
    ) -> ServiceResult<Outcome> {
        let answer = single_answer(&answers, LEG_SELECT_TOKEN_TYPE)?;

        let Some(token_type) = TokenType::from_label(&answer.answer) else {
            return Ok(Outcome::Corrective(Response::text(INVALID_TYPE_MESSAGE)));
        };

        let keys = self.keys_with_expiration(user_id).await?;
        let existing = filter_by_type(&keys, token_type).len();

        if existing >= token_type.quota() {
            tracing::info!(user_id, %token_type, existing, "Token quota reached");
            let question = Question::new(quota_reached_message(token_type), [ANSWER_YES, ANSWER_NO])
                .with_field(TokenContext::new(token_type));
            return self
                .start_leg(user_id, LEG_TOKEN_EXISTS, question, LegStart::Continue)
                .await;
        }

        self.ask_for_expiration(user_id, LEG_NEW_TOKEN, TokenContext::new(token_type))
            .await
    }

    /// "Do you want to regenerate?" answered
    pub(super) async fn handle_token_exists_result(
        &self,
        user_id: &str,
        answers: Vec<TokenAnswer>,
    ) -> ServiceResult<Outcome> {
        let answer = single_answer(&answers, LEG_TOKEN_EXISTS)?;

        match answer.answer.as_str() {
            ANSWER_NO => return Ok(Outcome::Reply(Response::text(NO_CHANGES_MESSAGE))),
            ANSWER_YES => {}
            _ => return Ok(Outcome::Corrective(Response::text(INVALID_CHOICE_HINT))),
        }

        let token_type = answer_context(answer).token_type;
        let keys = filter_by_type(&self.keys_with_expiration(user_id).await?, token_type);

        match keys.as_slice() {
            // Keys expired since the quota check: there is room for a new one
            [] => {
                self.ask_for_expiration(user_id, LEG_NEW_TOKEN, TokenContext::new(token_type))
                    .await
            }
            [only] => {
                self.ask_for_expiration(
                    user_id,
                    LEG_TOKEN_REGENERATE,
                    TokenContext::with_key(token_type, only.key_id.clone()),
                )
                .await
            }
            _ => {
                let question = key_selection_question(&keys, SELECT_REGENERATE_QUESTION)
                    .with_field(TokenContext::new(token_type));
                self.start_leg(
                    user_id,
                    LEG_SELECT_TOKEN_TO_REGENERATE,
                    question,
                    LegStart::Continue,
                )
                .await
            }
        }
    }

    /// A key picked for regeneration; resolve it within its type
    pub(super) async fn handle_select_token_to_regenerate_result(
        &self,
        user_id: &str,
        answers: Vec<TokenAnswer>,
    ) -> ServiceResult<Outcome> {
        let answer = single_answer(&answers, LEG_SELECT_TOKEN_TO_REGENERATE)?;
        let token_type = answer_context(answer).token_type;

        let keys = filter_by_type(&self.keys_with_expiration(user_id).await?, token_type);
        let key_id = resolve_key_id(keys.iter().map(|k| k.key_id.as_str()), &answer.answer)?;

        self.ask_for_expiration(
            user_id,
            LEG_TOKEN_REGENERATE,
            TokenContext::with_key(token_type, key_id),
        )
        .await
    }

    async fn ask_for_expiration(
        &self,
        user_id: &str,
        leg: &'static str,
        context: TokenContext,
    ) -> ServiceResult<Outcome> {
        let question = Question::new(EXPIRATION_QUESTION, EXPIRATION_CHOICES).with_field(context);
        self.start_leg(user_id, leg, question, LegStart::Continue)
            .await
    }

    /// Expiration chosen for a brand-new token
    pub(super) async fn handle_new_token_result(
        &self,
        user_id: &str,
        answers: Vec<TokenAnswer>,
    ) -> ServiceResult<Outcome> {
        let answer = single_answer(&answers, LEG_NEW_TOKEN)?;
        let Some(ttl) = parse_expiration(&answer.answer) else {
            return Ok(Outcome::Corrective(Response::text(INVALID_EXPIRATION_MESSAGE)));
        };

        let token_type = answer_context(answer).token_type;
        self.issue_token(user_id, None, token_type, ttl).await
    }

    /// Expiration chosen for a replacement: revoke the old key, then reissue
    pub(super) async fn handle_token_regenerate_result(
        &self,
        user_id: &str,
        answers: Vec<TokenAnswer>,
    ) -> ServiceResult<Outcome> {
        let answer = single_answer(&answers, LEG_TOKEN_REGENERATE)?;
        let Some(ttl) = parse_expiration(&answer.answer) else {
            return Ok(Outcome::Corrective(Response::text(INVALID_EXPIRATION_MESSAGE)));
        };

        let TokenContext {
            token_type,
            key_id,
        } = answer_context(answer);
        if key_id.is_empty() {
            return Err(ServiceError::Protocol(
                "missing key ID in regenerate answer field".to_string(),
            ));
        }

        self.revoke_key(user_id, &key_id).await?;
        self.issue_token(user_id, Some(key_id.as_str()), token_type, ttl)
            .await
    }

    async fn issue_token(
        &self,
        user_id: &str,
        key_id: Option<&str>,
        token_type: TokenType,
        ttl: Duration,
    ) -> ServiceResult<Outcome> {
        let token = self
            .prov
            .generate_token(key_id, token_type, ttl)
            .await
            .map_err(ServiceError::provider("generate token"))?;

        let valid_until = expiry_after(self.clock.now(), token.ttl)
            .format(EXPIRY_FORMAT)
            .to_string();

        self.repo
            .add_api_key(user_id, &token.key_id, token_type, token.ttl)
            .await
            .map_err(ServiceError::repo("add API key"))?;

        tracing::info!(
            user_id,
            key_id = %token.key_id,
            %token_type,
            regenerated = key_id.is_some(),
            "Token issued"
        );

        Ok(Outcome::Reply(Response::text(token_created_message(
            &token.secret,
            &valid_until,
        ))))
    }
}

/// `now + ttl`, clamped to the latest representable time
fn expiry_after(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
