use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::settings::QuizSettings;
use crate::model::topic::Topic;
use crate::time::elapsed_secs;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizResultError {
    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("quiz has no questions")]
    NoQuestions,

    #[error("score ({score}) exceeds question count ({total})")]
    ScoreOutOfRange { score: u32, total: u32 },
}

/// Lifecycle state of a quiz attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    InProgress,
    Completed,
}

/// Rounded percentage of `score` over `total`, halves rounding up.
#[must_use]
pub fn rounded_percentage(score: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let score = u64::from(score);
    let total = u64::from(total);
    let pct = (score * 200 + total) / (total * 2);
    u32::try_from(pct).unwrap_or(u32::MAX)
}

/// Finalized outcome of a quiz attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizResult {
    topic: Topic,
    score: u32,
    total_questions: u32,
    percentage: u32,
    passed: bool,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    time_taken_secs: f64,
}

impl QuizResult {
    /// Build the result of an attempt.
    ///
    /// # Errors
    ///
    /// Returns `QuizResultError` if the time range is inverted, there are no
    /// questions, or the score exceeds the question count.
    pub fn new(
        topic: Topic,
        score: u32,
        total_questions: u32,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        settings: &QuizSettings,
    ) -> Result<Self, QuizResultError> {
        if completed_at < started_at {
            return Err(QuizResultError::InvalidTimeRange);
        }
        if total_questions == 0 {
            return Err(QuizResultError::NoQuestions);
        }
        if score > total_questions {
            return Err(QuizResultError::ScoreOutOfRange {
                score,
                total: total_questions,
            });
        }

        let percentage = rounded_percentage(score, total_questions);
        Ok(Self {
            topic,
            score,
            total_questions,
            percentage,
            passed: percentage >= settings.pass_percentage(),
            started_at,
            completed_at,
            time_taken_secs: elapsed_secs(started_at, completed_at),
        })
    }

    #[must_use]
    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn percentage(&self) -> u32 {
        self.percentage
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.passed
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn time_taken_secs(&self) -> f64 {
        self.time_taken_secs
    }
}
