//! Ordered question list with a cursor

use super::ConvError;
use serde::{Deserialize, Serialize};

/// A question with a fixed set of acceptable answers
///
/// `field` carries hidden context for whoever consumes the answer; it is
/// never shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question<C> {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub answers: Vec<String>,
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub field: Option<C>,
}

impl<C> Question<C> {
    pub fn new(text: impl Into<String>, answers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            text: text.into(),
            answers: answers.into_iter().map(Into::into).collect(),
            field: None,
        }
    }

    pub fn with_field(mut self, field: C) -> Self {
        self.field = Some(field);
        self
    }

    fn accepts(&self, answer: &str) -> bool {
        self.answers.iter().any(|a| a == answer)
    }
}

/// A question paired with the answer given to it (empty until answered)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionAnswer<C> {
    pub question: Question<C>,
    #[serde(default)]
    pub answer: String,
}

impl<C> QuestionAnswer<C> {
    /// Hidden context attached to the question
    pub fn field(&self) -> Option<&C> {
        self.question.field.as_ref()
    }
}

/// Ordered list of questions answered one at a time
///
/// Invariant: every pair before `position` holds an accepted answer, and the
/// questionnaire is complete exactly when `position == qa_pairs.len()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Questionnaire<C> {
    qa_pairs: Vec<QuestionAnswer<C>>,
    position: usize,
}

impl<C> Questionnaire<C> {
    pub fn new(questions: impl IntoIterator<Item = Question<C>>) -> Self {
        Self {
            qa_pairs: questions
                .into_iter()
                .map(|question| QuestionAnswer {
                    question,
                    answer: String::new(),
                })
                .collect(),
            position: 0,
        }
    }

    /// Number of questions answered so far
    #[allow(dead_code)] // Used in tests
    pub fn position(&self) -> usize {
        self.position
    }

    #[allow(dead_code)] // Used in tests
    pub fn len(&self) -> usize {
        self.qa_pairs.len()
    }

    pub fn is_complete(&self) -> bool {
        self.position >= self.qa_pairs.len()
    }

    /// The question awaiting an answer
    pub fn current(&self) -> Result<&Question<C>, ConvError> {
        self.qa_pairs
            .get(self.position)
            .map(|qa| &qa.question)
            .ok_or(ConvError::NoMoreQuestions)
    }

    /// Record `answer` for the current question and advance the cursor.
    ///
    /// Answers must match one of the question's choices exactly
    /// (case-sensitive). A rejected answer leaves the cursor where it was.
    /// Returns `true` once the last question has been answered.
    pub fn process_answer(&mut self, answer: &str) -> Result<bool, ConvError> {
        let qa = self
            .qa_pairs
            .get_mut(self.position)
            .ok_or(ConvError::NoMoreQuestions)?;

        if !qa.question.accepts(answer) {
            return Err(ConvError::InvalidAnswer {
                answer: answer.to_string(),
            });
        }

        qa.answer = answer.to_string();
        self.position += 1;

        Ok(self.is_complete())
    }

    /// All question/answer pairs, available only once complete
    #[allow(dead_code)] // Used in tests
    pub fn results(&self) -> Result<&[QuestionAnswer<C>], ConvError> {
        if !self.is_complete() {
            return Err(ConvError::Incomplete);
        }
        Ok(&self.qa_pairs)
    }

    /// Consume the questionnaire and hand back its answers
    pub fn into_results(self) -> Result<Vec<QuestionAnswer<C>>, ConvError> {
        if !self.is_complete() {
            return Err(ConvError::Incomplete);
        }
        Ok(self.qa_pairs)
    }
}
