use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::session::QuizResult;

/// Finalized summary of a completed attempt, appended to the history log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub username: String,
    pub topic: String,
    pub score: u32,
    pub total_questions: u32,
    pub percentage: u32,
    /// Wall-clock seconds from start to submission.
    pub time_taken: f64,
    pub date: DateTime<Utc>,
}

impl HistoryRecord {
    #[must_use]
    pub fn from_result(username: impl Into<String>, result: &QuizResult) -> Self {
        Self {
            username: username.into(),
            topic: result.topic().as_str().to_owned(),
            score: result.score(),
            total_questions: result.total_questions(),
            percentage: result.percentage(),
            time_taken: result.time_taken_secs(),
            date: result.completed_at(),
        }
    }
}
