//! Revoke dialog

use super::keys::{key_selection_question, resolve_key_id};
use super::{
    single_answer, LegStart, Outcome, Response, ServiceError, ServiceResult, TokenAnswer,
    TokenProvider, TokenService, UserRepo, LEG_SELECT_TOKEN_TO_REVOKE,
};

pub(super) const SELECT_REVOKE_QUESTION: &str = "Which token do you want to revoke?";

/// Shown once a key picked from the selection has been revoked
pub const TOKEN_REVOKED_MESSAGE: &str = "🔒 Your API token has been successfully revoked.\n\n\
     You can create a new one using /new_token command.";

impl<R, P> TokenService<R, P>
where
    R: UserRepo + 'static,
    P: TokenProvider + 'static,
{
    /// Revoke the user's only key straight away, or ask which one to revoke
    pub async fn revoke_token(&self, user_id: &str) -> ServiceResult<Outcome> {
        let key_ids = self
            .repo
            .get_api_keys(user_id)
            .await
            .map_err(ServiceError::repo("get API keys"))?;

        match key_ids.as_slice() {
            [] => Err(ServiceError::TokenNotFound),
            [only] => {
                self.revoke_key(user_id, only).await?;
                Ok(Outcome::Completed)
            }
            _ => {
                let keys = self.keys_with_expiration(user_id).await?;
                let question = key_selection_question(&keys, SELECT_REVOKE_QUESTION);
                self.start_leg(
                    user_id,
                    LEG_SELECT_TOKEN_TO_REVOKE,
                    question,
                    LegStart::Fresh,
                )
                .await
            }
        }
    }

    pub(super) async fn handle_select_token_to_revoke_result(
        &self,
        user_id: &str,
        answers: Vec<TokenAnswer>,
    ) -> ServiceResult<Outcome> {
        let answer = single_answer(&answers, LEG_SELECT_TOKEN_TO_REVOKE)?;

        let key_ids = self
            .repo
            .get_api_keys(user_id)
            .await
            .map_err(ServiceError::repo("get API keys"))?;
        let key_id = resolve_key_id(key_ids.iter().map(String::as_str), &answer.answer)?;

        self.revoke_key(user_id, &key_id).await?;
        Ok(Outcome::Reply(Response::text(TOKEN_REVOKED_MESSAGE)))
    }
}
