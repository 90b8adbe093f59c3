use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::ids::QuestionId;

/// Number of options every multiple-choice question carries.
pub const OPTION_COUNT: usize = 4;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question {id} has empty text")]
    EmptyText { id: QuestionId },

    #[error("question {id} has {count} options, expected 4")]
    OptionCount { id: QuestionId, count: usize },

    #[error("question {id} has an empty option")]
    EmptyOption { id: QuestionId },

    #[error("question {id} repeats option {option:?}")]
    DuplicateOption { id: QuestionId, option: String },

    #[error("question {id} answer is not one of its options")]
    AnswerNotAnOption { id: QuestionId },

    #[error("question id {id} is used more than once")]
    DuplicateId { id: QuestionId },
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Loosely-typed question as found in bundled datasets and user-authored quizzes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDraft {
    pub id: QuestionId,
    #[serde(rename = "question")]
    pub text: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(rename = "answer")]
    pub correct_answer: String,
}

impl QuestionDraft {
    #[must_use]
    pub fn new(
        id: QuestionId,
        text: impl Into<String>,
        options: Vec<String>,
        correct_answer: impl Into<String>,
    ) -> Self {
        Self {
            id,
            text: text.into(),
            options,
            correct_answer: correct_answer.into(),
        }
    }

    /// Normalize and validate the draft into an immutable `Question`.
    ///
    /// Text, options and the answer are trimmed before checking.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` when the text or an option is empty, the option
    /// count is not four, options repeat, or the answer is not an option.
    pub fn validate(self) -> Result<Question, QuestionError> {
        let id = self.id;
        let text = self.text.trim().to_owned();
        if text.is_empty() {
            return Err(QuestionError::EmptyText { id });
        }

        let options: Vec<String> = self
            .options
            .iter()
            .map(|option| option.trim().to_owned())
            .collect();
        let options: [String; OPTION_COUNT] =
            options
                .try_into()
                .map_err(|rest: Vec<String>| QuestionError::OptionCount {
                    id,
                    count: rest.len(),
                })?;

        let mut seen = HashSet::with_capacity(OPTION_COUNT);
        for option in &options {
            if option.is_empty() {
                return Err(QuestionError::EmptyOption { id });
            }
            if !seen.insert(option.as_str()) {
                return Err(QuestionError::DuplicateOption {
                    id,
                    option: option.clone(),
                });
            }
        }

        let correct_answer = self.correct_answer.trim().to_owned();
        if !options.contains(&correct_answer) {
            return Err(QuestionError::AnswerNotAnOption { id });
        }

        Ok(Question {
            id,
            text,
            options,
            correct_answer,
        })
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A validated multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    text: String,
    options: [String; OPTION_COUNT],
    correct_answer: String,
}

impl Question {
    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn options(&self) -> &[String; OPTION_COUNT] {
        &self.options
    }

    #[must_use]
    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    /// Whether `option` is exactly the correct answer.
    #[must_use]
    pub fn is_correct(&self, option: &str) -> bool {
        self.correct_answer == option
    }

    /// Convert back into the persisted draft shape.
    #[must_use]
    pub fn to_draft(&self) -> QuestionDraft {
        QuestionDraft {
            id: self.id,
            text: self.text.clone(),
            options: self.options.to_vec(),
            correct_answer: self.correct_answer.clone(),
        }
    }
}

/// Validate a whole question set, failing on the first invalid entry.
///
/// # Errors
///
/// Returns the first `QuestionError` found, including `DuplicateId` when two
/// drafts share an id.
pub fn validate_question_set(drafts: Vec<QuestionDraft>) -> Result<Vec<Question>, QuestionError> {
    let mut ids = HashSet::with_capacity(drafts.len());
    let mut questions = Vec::with_capacity(drafts.len());
    for draft in drafts {
        if !ids.insert(draft.id) {
            return Err(QuestionError::DuplicateId { id: draft.id });
        }
        questions.push(draft.validate()?);
    }
    Ok(questions)
}

/// Validate a question set, dropping invalid entries instead of failing.
///
/// Returns the accepted questions in their original order together with the
/// rejection reasons.
#[must_use]
pub fn partition_question_set(
    drafts: Vec<QuestionDraft>,
) -> (Vec<Question>, Vec<QuestionError>) {
    let mut ids = HashSet::with_capacity(drafts.len());
    let mut accepted = Vec::with_capacity(drafts.len());
    let mut rejected = Vec::new();
    for draft in drafts {
        let id = draft.id;
        if ids.contains(&id) {
            rejected.push(QuestionError::DuplicateId { id });
            continue;
        }
        match draft.validate() {
            Ok(question) => {
                ids.insert(id);
                accepted.push(question);
            }
            Err(err) => rejected.push(err),
        }
    }
    (accepted, rejected)
}
