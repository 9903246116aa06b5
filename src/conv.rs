//! Button-driven conversation state machine
//!
//! A `Conversation` tracks where a user is in a short question/answer leg.
//! It is loaded, advanced by one answer and persisted again on every turn, so
//! everything here is plain data plus pure transitions.

mod conversation;
mod questions;

#[cfg(test)]
mod proptests;

#[cfg(test)]
pub use conversation::ConvState;
pub use conversation::{Conversation, Leg};
pub use questions::{Question, QuestionAnswer, Questionnaire};

use thiserror::Error;

/// Errors raised by questionnaire and conversation transitions
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConvError {
    #[error("no more questions")]
    NoMoreQuestions,
    #[error("invalid answer: {answer:?}")]
    InvalidAnswer { answer: String },
    #[error("questionnaire is incomplete")]
    Incomplete,
    #[error("no question leg in flight (state: {state})")]
    NotInFlight { state: String },
    #[error("cannot start a new leg from state {state}")]
    AlreadyStarted { state: String },
}
