use std::sync::Arc;

use quiz_core::model::{CustomQuiz, QuestionDraft, Topic, validate_question_set};
use storage::repository::QuizCollectionRepository;

use crate::Clock;
use crate::error::CatalogError;
use crate::question_source::BundledQuestions;

/// One entry of the topic picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicListing {
    pub name: String,
    pub question_count: usize,
    pub category: String,
    pub difficulty: Option<String>,
    pub custom: bool,
}

/// Input for storing a user-authored quiz.
#[derive(Debug, Clone, Default)]
pub struct CustomQuizDraft {
    pub questions: Vec<QuestionDraft>,
    pub category: Option<String>,
    pub difficulty: Option<String>,
    pub cover_photo: Option<String>,
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// Lists bundled and user-authored topics and stores authored quizzes.
#[derive(Clone)]
pub struct QuizCatalogService {
    clock: Clock,
    bundled: Arc<BundledQuestions>,
    quizzes: Arc<dyn QuizCollectionRepository>,
}

impl QuizCatalogService {
    #[must_use]
    pub fn new(
        clock: Clock,
        bundled: Arc<BundledQuestions>,
        quizzes: Arc<dyn QuizCollectionRepository>,
    ) -> Self {
        Self {
            clock,
            bundled,
            quizzes,
        }
    }

    /// Bundled topics followed by custom ones, each group ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if the quiz collection cannot be read.
    pub async fn list_topics(&self) -> Result<Vec<TopicListing>, CatalogError> {
        let mut topics: Vec<TopicListing> = self
            .bundled
            .topics()
            .map(|(name, question_count, category)| TopicListing {
                name: name.to_owned(),
                question_count,
                category: category.to_owned(),
                difficulty: None,
                custom: false,
            })
            .collect();

        let custom = self.quizzes.load_quizzes().await?;
        topics.extend(custom.iter().map(|(name, quiz)| TopicListing {
            name: name.clone(),
            question_count: quiz.questions.len(),
            category: quiz.category_or_default().to_owned(),
            difficulty: Some(quiz.difficulty_or_default().to_owned()),
            custom: true,
        }));
        Ok(topics)
    }

    /// Validate and store a user-authored quiz, replacing any previous one
    /// with the same name. Returns the number of questions stored.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::BuiltInTopic` for names of bundled topics,
    /// `CatalogError::NoQuestions` for an empty quiz, `CatalogError::Question`
    /// for the first invalid question, or storage errors.
    pub async fn save_custom_quiz(
        &self,
        topic: &Topic,
        draft: CustomQuizDraft,
    ) -> Result<usize, CatalogError> {
        if self.bundled.contains(topic) {
            return Err(CatalogError::BuiltInTopic(topic.clone()));
        }
        if draft.questions.is_empty() {
            return Err(CatalogError::NoQuestions);
        }

        let questions = validate_question_set(draft.questions)?;
        let count = questions.len();
        let quiz = CustomQuiz {
            questions: questions.iter().map(|q| q.to_draft()).collect(),
            cover_photo: normalize_optional(draft.cover_photo),
            category: normalize_optional(draft.category),
            difficulty: normalize_optional(draft.difficulty),
            last_updated: Some(self.clock.now()),
        };

        let mut all = self.quizzes.load_quizzes().await?;
        all.insert(topic.as_str().to_owned(), quiz);
        self.quizzes.save_quizzes(&all).await?;
        tracing::info!("saved custom quiz {topic} with {count} questions");
        Ok(count)
    }

    /// Remove a user-authored quiz.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if no custom quiz has that name, or
    /// storage errors.
    pub async fn delete_custom_quiz(&self, topic: &Topic) -> Result<(), CatalogError> {
        let mut all = self.quizzes.load_quizzes().await?;
        if all.remove(topic.as_str()).is_none() {
            return Err(CatalogError::NotFound(topic.clone()));
        }
        self.quizzes.save_quizzes(&all).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{QuestionError, QuestionId};
    use quiz_core::time::{fixed_clock, fixed_now};
    use storage::Storage;

    fn draft_question(id: u64, answer: &str) -> QuestionDraft {
        QuestionDraft::new(
            QuestionId::new(id),
            format!("Question {id}?"),
            vec!["a".into(), "b".into(), "c".into(), "d".into()],
            answer,
        )
    }

    fn catalog(storage: &Storage) -> QuizCatalogService {
        QuizCatalogService::new(
            fixed_clock(),
            Arc::new(BundledQuestions::load().unwrap()),
            Arc::clone(&storage.quizzes),
        )
    }

    #[tokio::test]
    async fn saved_quiz_is_listed_after_bundled_topics() {
        let storage = Storage::in_memory();
        let catalog = catalog(&storage);
        let topic = Topic::new("Rust").unwrap();
        let draft = CustomQuizDraft {
            questions: vec![draft_question(1, "a"), draft_question(2, "d")],
            category: Some("  Programming ".into()),
            difficulty: Some("   ".into()),
            cover_photo: None,
        };
        assert_eq!(catalog.save_custom_quiz(&topic, draft).await.unwrap(), 2);

        let topics = catalog.list_topics().await.unwrap();
        let last = topics.last().unwrap();
        assert_eq!(last.name, "Rust");
        assert!(last.custom);
        assert_eq!(last.question_count, 2);
        assert_eq!(last.category, "Programming");
        assert_eq!(last.difficulty.as_deref(), Some("Medium"));
        assert!(topics.iter().filter(|t| !t.custom).count() >= 5);

        let stored = storage.quizzes.load_quizzes().await.unwrap();
        assert_eq!(stored["Rust"].last_updated, Some(fixed_now()));
    }

    #[tokio::test]
    async fn invalid_quizzes_are_rejected() {
        let storage = Storage::in_memory();
        let catalog = catalog(&storage);

        let err = catalog
            .save_custom_quiz(&Topic::new("OS").unwrap(), CustomQuizDraft::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::BuiltInTopic(_)));

        let topic = Topic::new("Empty").unwrap();
        let err = catalog
            .save_custom_quiz(&topic, CustomQuizDraft::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::NoQuestions));

        let draft = CustomQuizDraft {
            questions: vec![draft_question(1, "z")],
            ..CustomQuizDraft::default()
        };
        let err = catalog.save_custom_quiz(&topic, draft).await.unwrap_err();
        assert!(matches!(
            err,
            CatalogError::Question(QuestionError::AnswerNotAnOption { .. })
        ));
        assert!(storage.quizzes.load_quizzes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_removes_only_existing_quiz() {
        let storage = Storage::in_memory();
        let catalog = catalog(&storage);
        let topic = Topic::new("Rust").unwrap();
        let draft = CustomQuizDraft {
            questions: vec![draft_question(1, "a")],
            ..CustomQuizDraft::default()
        };
        catalog.save_custom_quiz(&topic, draft).await.unwrap();

        catalog.delete_custom_quiz(&topic).await.unwrap();
        let err = catalog.delete_custom_quiz(&topic).await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
    }
}
