use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use quiz_core::model::{CustomQuiz, Question, QuestionDraft, Topic, partition_question_set};
use storage::repository::QuizCollectionRepository;

use crate::error::SourceError;

const BUNDLED_DATASET: &str = include_str!("../data/questions.json");

/// Category for bundled topics missing from the category table.
const DEFAULT_CATEGORY: &str = "Others";

/// Supplies the ordered question list for a topic.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Questions for `topic`, possibly empty.
    ///
    /// # Errors
    ///
    /// Returns `SourceError` if the backing data cannot be read.
    async fn questions(&self, topic: &Topic) -> Result<Vec<Question>, SourceError>;
}

/// Validate drafts, logging and dropping the ones that cannot be used.
fn accept_drafts(topic: &str, drafts: Vec<QuestionDraft>) -> Vec<Question> {
    let (accepted, rejected) = partition_question_set(drafts);
    for err in rejected {
        tracing::warn!("skipping question in topic {topic}: {err}");
    }
    accepted
}

//
// ─── BUNDLED ───────────────────────────────────────────────────────────────────
//

#[derive(Deserialize)]
struct Dataset {
    #[serde(default)]
    categories: BTreeMap<String, String>,
    quizzes: BTreeMap<String, Vec<QuestionDraft>>,
}

/// Static question sets compiled into the binary.
#[derive(Debug, Clone)]
pub struct BundledQuestions {
    quizzes: BTreeMap<String, Vec<Question>>,
    categories: BTreeMap<String, String>,
}

impl BundledQuestions {
    /// Load the dataset shipped with the crate.
    ///
    /// # Errors
    ///
    /// Returns `SourceError::Dataset` if the dataset is not valid JSON.
    pub fn load() -> Result<Self, SourceError> {
        Self::from_json(BUNDLED_DATASET)
    }

    /// Parse a dataset of the form `{"categories": {..}, "quizzes": {topic: [..]}}`.
    ///
    /// # Errors
    ///
    /// Returns `SourceError::Dataset` if the JSON does not have that shape.
    pub fn from_json(raw: &str) -> Result<Self, SourceError> {
        let dataset: Dataset =
            serde_json::from_str(raw).map_err(|e| SourceError::Dataset(e.to_string()))?;
        let quizzes = dataset
            .quizzes
            .into_iter()
            .map(|(topic, drafts)| {
                let questions = accept_drafts(&topic, drafts);
                (topic, questions)
            })
            .collect();
        Ok(Self {
            quizzes,
            categories: dataset.categories,
        })
    }

    #[must_use]
    pub fn contains(&self, topic: &Topic) -> bool {
        self.quizzes.contains_key(topic.as_str())
    }

    #[must_use]
    pub fn get(&self, topic: &Topic) -> Vec<Question> {
        self.quizzes
            .get(topic.as_str())
            .cloned()
            .unwrap_or_default()
    }

    /// Topic names with their question counts and categories.
    pub fn topics(&self) -> impl Iterator<Item = (&str, usize, &str)> {
        self.quizzes.iter().map(|(name, questions)| {
            let category = self
                .categories
                .get(name)
                .map_or(DEFAULT_CATEGORY, String::as_str);
            (name.as_str(), questions.len(), category)
        })
    }
}

#[async_trait]
impl QuestionSource for BundledQuestions {
    async fn questions(&self, topic: &Topic) -> Result<Vec<Question>, SourceError> {
        Ok(self.get(topic))
    }
}

//
// ─── CUSTOM ────────────────────────────────────────────────────────────────────
//

/// User-authored quizzes from the quiz collection.
#[derive(Clone)]
pub struct CustomQuizSource {
    quizzes: Arc<dyn QuizCollectionRepository>,
}

impl CustomQuizSource {
    #[must_use]
    pub fn new(quizzes: Arc<dyn QuizCollectionRepository>) -> Self {
        Self { quizzes }
    }

    /// The stored quiz for `topic`, if any.
    ///
    /// # Errors
    ///
    /// Returns `SourceError::Storage` if the collection cannot be read.
    pub async fn find(&self, topic: &Topic) -> Result<Option<CustomQuiz>, SourceError> {
        let mut all = self.quizzes.load_quizzes().await?;
        Ok(all.remove(topic.as_str()))
    }
}

#[async_trait]
impl QuestionSource for CustomQuizSource {
    async fn questions(&self, topic: &Topic) -> Result<Vec<Question>, SourceError> {
        Ok(self
            .find(topic)
            .await?
            .map(|quiz| accept_drafts(topic.as_str(), quiz.questions))
            .unwrap_or_default())
    }
}

//
// ─── CATALOG ───────────────────────────────────────────────────────────────────
//

/// Custom quiz of the requested name if one exists, otherwise the bundled set.
#[derive(Clone)]
pub struct CatalogSource {
    bundled: Arc<BundledQuestions>,
    custom: CustomQuizSource,
}

impl CatalogSource {
    #[must_use]
    pub fn new(bundled: Arc<BundledQuestions>, custom: CustomQuizSource) -> Self {
        Self { bundled, custom }
    }
}

#[async_trait]
impl QuestionSource for CatalogSource {
    async fn questions(&self, topic: &Topic) -> Result<Vec<Question>, SourceError> {
        if let Some(quiz) = self.custom.find(topic).await? {
            return Ok(accept_drafts(topic.as_str(), quiz.questions));
        }
        Ok(self.bundled.get(topic))
    }
}
