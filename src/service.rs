//! Token workflow orchestrator
//!
//! Maps a user's conversation state and submitted answers onto token
//! lifecycle actions. Every public entry point loads the user's conversation,
//! advances it, calls collaborators in a fixed order and persists the result;
//! nothing is cached between calls.

mod create_token;
mod error;
mod field;
mod keys;
mod list_tokens;
mod revoke_token;
pub mod traits;
mod types;

#[cfg(test)]
mod proptests;
#[cfg(test)]
pub mod testing;

#[cfg(test)]
pub use error::RepoError;
pub use error::{ServiceError, ServiceResult};
pub use field::TokenContext;
pub use revoke_token::TOKEN_REVOKED_MESSAGE;
pub use traits::{Clock, DatabaseRepo, SystemClock, TokenProvider, UserRepo};
pub use types::{ApiToken, KeyInfo, Outcome, Response, TokenType};

use crate::conv::{ConvError, Conversation, Leg, Question, QuestionAnswer, Questionnaire};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;

pub type TokenConversation = Conversation<TokenContext>;
pub type TokenAnswer = QuestionAnswer<TokenContext>;

pub(crate) const LEG_SELECT_TOKEN_TYPE: &str = "select_token_type";
pub(crate) const LEG_TOKEN_EXISTS: &str = "token_exists";
pub(crate) const LEG_NEW_TOKEN: &str = "new_token";
pub(crate) const LEG_TOKEN_REGENERATE: &str = "token_regenerate";
pub(crate) const LEG_SELECT_TOKEN_TO_REGENERATE: &str = "select_token_to_regenerate";
pub(crate) const LEG_SELECT_TOKEN_TO_REVOKE: &str = "select_token_to_revoke";

const INVALID_CHOICE_HINT: &str = "Please pick one of the offered options.";

/// Handles the answers of a completed leg
type LegHandler<R, P> = for<'a> fn(
    &'a TokenService<R, P>,
    &'a str,
    Vec<TokenAnswer>,
) -> BoxFuture<'a, ServiceResult<Outcome>>;

/// How a leg is started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LegStart {
    /// From a user command: any half-finished leg is abandoned
    Fresh,
    /// Follow-up to a leg whose results were just consumed
    Continue,
}

/// Orchestrates token dialogs against a repository and a token provider
pub struct TokenService<R, P> {
    repo: R,
    prov: P,
    clock: Arc<dyn Clock>,
    legs: HashMap<&'static str, LegHandler<R, P>>,
}

impl<R, P> TokenService<R, P>
where
    R: UserRepo + 'static,
    P: TokenProvider + 'static,
{
    pub fn new(repo: R, prov: P) -> Self {
        Self {
            repo,
            prov,
            clock: Arc::new(SystemClock),
            legs: Self::leg_handlers(),
        }
    }

    #[allow(dead_code)] // Used in tests
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn leg_handlers() -> HashMap<&'static str, LegHandler<R, P>> {
        let mut legs: HashMap<&'static str, LegHandler<R, P>> = HashMap::new();
        legs.insert(LEG_SELECT_TOKEN_TYPE, |svc, user_id, answers| {
            Box::pin(svc.handle_select_token_type_result(user_id, answers))
        });
        legs.insert(LEG_TOKEN_EXISTS, |svc, user_id, answers| {
            Box::pin(svc.handle_token_exists_result(user_id, answers))
        });
        legs.insert(LEG_SELECT_TOKEN_TO_REGENERATE, |svc, user_id, answers| {
            Box::pin(svc.handle_select_token_to_regenerate_result(user_id, answers))
        });
        legs.insert(LEG_NEW_TOKEN, |svc, user_id, answers| {
            Box::pin(svc.handle_new_token_result(user_id, answers))
        });
        legs.insert(LEG_TOKEN_REGENERATE, |svc, user_id, answers| {
            Box::pin(svc.handle_token_regenerate_result(user_id, answers))
        });
        legs.insert(LEG_SELECT_TOKEN_TO_REVOKE, |svc, user_id, answers| {
            Box::pin(svc.handle_select_token_to_revoke_result(user_id, answers))
        });
        legs
    }

    /// Feed a user's message into the leg they are in.
    ///
    /// Returns the next question while the leg is incomplete; once complete,
    /// routes the answers to the leg's handler.
    pub async fn handle_message(&self, user_id: &str, text: &str) -> ServiceResult<Outcome> {
        let mut conv = self.load_conversation(user_id).await?;

        let leg = match conv.submit(text) {
            Ok(leg) => leg,
            Err(ConvError::InvalidAnswer { .. }) => {
                let question = conv.current()?;
                tracing::debug!(user_id, "Answer outside the offered choices");
                return Ok(Outcome::Corrective(Response {
                    message: format!("{INVALID_CHOICE_HINT}\n\n{}", question.text),
                    answers: question.answers.clone(),
                }));
            }
            Err(e) => return Err(e.into()),
        };

        let answers = match conv.results() {
            Ok(answers) => answers,
            Err(ConvError::Incomplete) => {
                let reply = Response::ask(conv.current()?);
                self.save_conversation(&conv).await?;
                return Ok(Outcome::Reply(reply));
            }
            Err(e) => return Err(e.into()),
        };

        // Flush the reset to idle before the handler starts its own leg
        self.save_conversation(&conv).await?;

        let handler = self
            .legs
            .get(leg.as_str())
            .ok_or_else(|| ServiceError::UnknownLeg(leg.to_string()))?;

        tracing::info!(user_id, leg = %leg, "Conversation leg completed");
        handler(self, user_id, answers).await
    }

    /// Abandon whatever leg the user is in
    pub async fn reset_conversation(&self, user_id: &str) -> ServiceResult<()> {
        self.repo
            .delete_conversation(user_id)
            .await
            .map_err(ServiceError::repo("delete conversation"))
    }

    async fn load_conversation(&self, user_id: &str) -> ServiceResult<TokenConversation> {
        self.repo
            .get_conversation(user_id)
            .await
            .map_err(ServiceError::repo("get conversation"))
    }

    async fn save_conversation(&self, conv: &TokenConversation) -> ServiceResult<()> {
        self.repo
            .save_conversation(conv)
            .await
            .map_err(ServiceError::repo("save conversation"))
    }

    /// Start a single-question leg and return the question to the user
    async fn start_leg(
        &self,
        user_id: &str,
        leg: &'static str,
        question: Question<TokenContext>,
        start: LegStart,
    ) -> ServiceResult<Outcome> {
        let mut conv = self.load_conversation(user_id).await?;
        if start == LegStart::Fresh {
            conv.reset();
        }

        conv.start(Leg::new(leg), Questionnaire::new([question]))?;
        let reply = Response::ask(conv.current()?);
        self.save_conversation(&conv).await?;

        tracing::info!(user_id, leg, "Conversation leg started");
        Ok(Outcome::Reply(reply))
    }

    async fn keys_with_expiration(&self, user_id: &str) -> ServiceResult<Vec<KeyInfo>> {
        self.repo
            .get_api_keys_with_expiration(user_id)
            .await
            .map_err(ServiceError::repo("get API keys"))
    }

    /// Revoke upstream first, then forget the key locally.
    ///
    /// A repository failure after a successful upstream revoke is reported as
    /// `PartialRevoke`; nothing is rolled back.
    async fn revoke_key(&self, user_id: &str, key_id: &str) -> ServiceResult<()> {
        self.prov
            .revoke_token(key_id)
            .await
            .map_err(ServiceError::provider("revoke token"))?;

        self.repo
            .revoke_token(user_id, key_id)
            .await
            .map_err(|source| {
                tracing::error!(
                    user_id,
                    key_id,
                    error = %source,
                    "Key revoked upstream but still stored"
                );
                ServiceError::PartialRevoke {
                    key_id: key_id.to_string(),
                    source,
                }
            })?;

        tracing::info!(user_id, key_id, "Token revoked");
        Ok(())
    }
}

/// The only answer of a single-question leg
fn single_answer<'a>(answers: &'a [TokenAnswer], leg: &str) -> ServiceResult<&'a TokenAnswer> {
    match answers {
        [answer] => Ok(answer),
        _ => Err(ServiceError::Protocol(format!(
            "expected exactly one answer for {leg}, got {}",
            answers.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{service, service_with, InMemoryRepo, MockProvider};
    use super::*;

    #[tokio::test]
    async fn test_message_without_leg_is_protocol_error() {
        let (svc, _, _) = service();

        let err = svc.handle_message("user-1", "hello").await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Conversation(ConvError::NotInFlight { .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_answer_repeats_question_without_saving() {
        let (svc, repo, _) = service();
        svc.create_token("user-1").await.unwrap();
        let saves = repo.save_count();

        let outcome = svc.handle_message("user-1", "FTP").await.unwrap();

        let Outcome::Corrective(resp) = outcome else {
            panic!("expected corrective outcome, got {outcome:?}");
        };
        assert!(resp.message.contains("What type of token"));
        assert_eq!(resp.answers, vec!["Web", "TCP"]);
        assert_eq!(repo.save_count(), saves);

        // The leg is still answerable
        let next = svc.handle_message("user-1", "Web").await.unwrap();
        assert!(matches!(next, Outcome::Reply(_)));
    }

    #[tokio::test]
    async fn test_unknown_leg_is_fatal() {
        let (svc, repo, _) = service();
        let mut conv = TokenConversation::new("user-1");
        conv.start(
            Leg::new("retired_leg"),
            Questionnaire::new([Question::new("Still here?", ["Yes"])]),
        )
        .unwrap();
        repo.put_conversation(conv);

        let err = svc.handle_message("user-1", "Yes").await.unwrap_err();
        assert!(matches!(err, ServiceError::UnknownLeg(ref leg) if leg == "retired_leg"));
    }

    #[tokio::test]
    async fn test_reset_conversation_drops_leg() {
        let (svc, repo, _) = service();
        svc.create_token("user-1").await.unwrap();

        svc.reset_conversation("user-1").await.unwrap();

        assert!(repo.conversation("user-1").is_none());
        assert!(svc.handle_message("user-1", "Web").await.is_err());
    }

    #[tokio::test]
    async fn test_conversation_load_failure_is_wrapped() {
        let repo = InMemoryRepo::new();
        repo.fail_on("get_conversation");
        let (svc, _, _) = service_with(repo, MockProvider::new());

        let err = svc.handle_message("user-1", "Web").await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Repository {
                step: "get conversation",
                ..
            }
        ));
    }

    #[test]
    fn test_single_answer_cardinality() {
        let none: Vec<TokenAnswer> = vec![];
        assert!(matches!(
            single_answer(&none, "test"),
            Err(ServiceError::Protocol(_))
        ));
    }
}
