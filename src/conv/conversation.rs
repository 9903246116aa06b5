//! Per-user conversation and its state

use super::{ConvError, Question, QuestionAnswer, Questionnaire};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of an in-flight question leg (e.g. `select_token_type`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Leg(String);

impl Leg {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Conversation state
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConvState {
    /// No leg running; a new one may be started
    #[default]
    Idle,
    /// The last leg has every answer; results not yet consumed
    Complete,
    /// Waiting for answers to the named leg
    InFlight { leg: Leg },
}

impl fmt::Display for ConvState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvState::Idle => f.write_str("idle"),
            ConvState::Complete => f.write_str("complete"),
            ConvState::InFlight { leg } => write!(f, "in_flight({leg})"),
        }
    }
}

/// A user's position in a multi-turn question/answer exchange
///
/// The questionnaire is only meaningful while a leg is in flight or complete;
/// it is dropped when the results are consumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "C: Serialize",
    deserialize = "C: Deserialize<'de>"
))]
pub struct Conversation<C> {
    pub id: String,
    #[serde(default)]
    pub state: ConvState,
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    questionnaire: Option<Questionnaire<C>>,
}

impl<C> Conversation<C> {
    /// A fresh idle conversation
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: ConvState::Idle,
            questionnaire: None,
        }
    }

    /// Begin a new leg. Only legal from `Idle`.
    pub fn start(&mut self, leg: Leg, questionnaire: Questionnaire<C>) -> Result<(), ConvError> {
        if self.state != ConvState::Idle {
            return Err(ConvError::AlreadyStarted {
                state: self.state.to_string(),
            });
        }

        self.state = ConvState::InFlight { leg };
        self.questionnaire = Some(questionnaire);
        Ok(())
    }

    /// The question awaiting an answer in the running leg
    pub fn current(&self) -> Result<&Question<C>, ConvError> {
        match (&self.state, &self.questionnaire) {
            (ConvState::InFlight { .. }, Some(q)) => q.current(),
            _ => Err(self.not_in_flight()),
        }
    }

    /// Submit an answer to the running leg.
    ///
    /// Returns the leg the answer was submitted under, so the caller can route
    /// its results once the leg completes. Moves to `Complete` after the last
    /// answer.
    pub fn submit(&mut self, answer: &str) -> Result<Leg, ConvError> {
        let ConvState::InFlight { leg } = &self.state else {
            return Err(self.not_in_flight());
        };
        let leg = leg.clone();

        let questionnaire = self
            .questionnaire
            .as_mut()
            .ok_or_else(|| ConvError::NotInFlight {
                state: self.state.to_string(),
            })?;

        if questionnaire.process_answer(answer)? {
            self.state = ConvState::Complete;
        }

        Ok(leg)
    }

    /// Take the answers of a completed leg and return to `Idle`.
    ///
    /// Results can be consumed once; any call outside `Complete` fails
    /// `Incomplete`.
    pub fn results(&mut self) -> Result<Vec<QuestionAnswer<C>>, ConvError> {
        if self.state != ConvState::Complete {
            return Err(ConvError::Incomplete);
        }

        let questionnaire = self.questionnaire.take().ok_or(ConvError::Incomplete)?;
        let results = questionnaire.into_results()?;
        self.state = ConvState::Idle;
        Ok(results)
    }

    /// Drop any running leg
    pub fn reset(&mut self) {
        self.state = ConvState::Idle;
        self.questionnaire = None;
    }

    fn not_in_flight(&self) -> ConvError {
        ConvError::NotInFlight {
            state: self.state.to_string(),
        }
    }
}
