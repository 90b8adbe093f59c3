use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::model::ids::QuestionId;

/// Serialized in-progress state of a quiz attempt, written after every
/// mutating step so an interrupted attempt can be resumed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub current_question_index: usize,
    pub selected_options: BTreeMap<QuestionId, String>,
    pub score: u32,
    pub answered_questions: BTreeSet<QuestionId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoint_uses_stable_json_shape() {
        let mut checkpoint = Checkpoint {
            current_question_index: 1,
            score: 1,
            ..Checkpoint::default()
        };
        checkpoint
            .selected_options
            .insert(QuestionId::new(1), "A".into());
        checkpoint.answered_questions.insert(QuestionId::new(1));
        checkpoint.answered_questions.insert(QuestionId::new(2));

        let json = serde_json::to_value(&checkpoint).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "currentQuestionIndex": 1,
                "selectedOptions": { "1": "A" },
                "score": 1,
                "answeredQuestions": [1, 2]
            })
        );

        let back: Checkpoint = serde_json::from_value(json).unwrap();
        assert_eq!(back, checkpoint);
    }
}
