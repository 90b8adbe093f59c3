use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::question::QuestionDraft;

/// A user-authored quiz as kept in the quiz collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomQuiz {
    pub questions: Vec<QuestionDraft>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_photo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl CustomQuiz {
    /// Category shown when the author left it blank.
    pub const DEFAULT_CATEGORY: &'static str = "Others";
    /// Difficulty shown when the author left it blank.
    pub const DEFAULT_DIFFICULTY: &'static str = "Medium";

    #[must_use]
    pub fn category_or_default(&self) -> &str {
        self.category.as_deref().unwrap_or(Self::DEFAULT_CATEGORY)
    }

    #[must_use]
    pub fn difficulty_or_default(&self) -> &str {
        self.difficulty
            .as_deref()
            .unwrap_or(Self::DEFAULT_DIFFICULTY)
    }
}
