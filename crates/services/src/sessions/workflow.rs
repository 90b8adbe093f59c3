use std::sync::Arc;

use quiz_core::model::{HistoryRecord, QuestionId, QuizResult, QuizSettings, Topic};
use storage::StorageError;
use storage::repository::{CheckpointRepository, HistoryRepository, IdentityRepository};

use super::service::{AnswerOutcome, Direction, QuizSession, TickOutcome};
use crate::Clock;
use crate::error::SessionError;
use crate::question_source::QuestionSource;

/// Result of one timer tick once persistence has been applied.
#[derive(Debug, Clone, PartialEq)]
pub enum TickResult {
    Counting { remaining: u32 },
    Advanced { expired: QuestionId },
    Submitted(QuizResult),
}

/// Drives a `QuizSession` and keeps its checkpoint, history and identity
/// collaborators in step with every transition.
#[derive(Clone)]
pub struct QuizLoopService {
    clock: Clock,
    settings: QuizSettings,
    questions: Arc<dyn QuestionSource>,
    checkpoints: Arc<dyn CheckpointRepository>,
    history: Arc<dyn HistoryRepository>,
    identity: Arc<dyn IdentityRepository>,
}

impl QuizLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        questions: Arc<dyn QuestionSource>,
        checkpoints: Arc<dyn CheckpointRepository>,
        history: Arc<dyn HistoryRepository>,
        identity: Arc<dyn IdentityRepository>,
    ) -> Self {
        Self {
            clock,
            settings: QuizSettings::default(),
            questions,
            checkpoints,
            history,
            identity,
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: QuizSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn settings(&self) -> &QuizSettings {
        &self.settings
    }

    /// Start an attempt at `topic`, resuming its checkpoint when one fits.
    ///
    /// A checkpoint that cannot be decoded or does not match the question set
    /// is ignored and the attempt starts fresh.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptyQuestionSet` if the topic has no questions,
    /// or source/storage errors.
    pub async fn start(&self, topic: &Topic) -> Result<QuizSession, SessionError> {
        let questions = self.questions.questions(topic).await?;
        let mut session =
            QuizSession::new(topic.clone(), questions, self.clock.now(), &self.settings)?;

        let checkpoint = match self.checkpoints.read_checkpoint(topic).await {
            Ok(checkpoint) => checkpoint,
            Err(StorageError::Serialization(reason)) => {
                tracing::warn!("discarding unreadable checkpoint for {topic}: {reason}");
                None
            }
            Err(err) => return Err(err.into()),
        };

        match checkpoint {
            Some(checkpoint) => {
                if session.restore(checkpoint) {
                    tracing::info!(
                        "resumed {topic} at question {} with score {}",
                        session.current_index() + 1,
                        session.score()
                    );
                } else {
                    tracing::warn!(
                        "discarding checkpoint for {topic}: does not match question set"
                    );
                }
            }
            None => {
                tracing::info!(
                    "started {topic} with {} questions",
                    session.questions().len()
                );
            }
        }

        Ok(session)
    }

    /// Record an answer and checkpoint.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` for invalid answers or storage failures.
    pub async fn select_answer(
        &self,
        session: &mut QuizSession,
        question_id: QuestionId,
        option: impl Into<String>,
    ) -> Result<AnswerOutcome, SessionError> {
        let outcome = session.select_answer(question_id, option)?;
        self.save_checkpoint(session).await?;
        Ok(outcome)
    }

    /// Move to the next question. Returns `false` on the last question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` for completed sessions or storage failures.
    pub async fn next(&self, session: &mut QuizSession) -> Result<bool, SessionError> {
        self.advance(session, Direction::Next).await
    }

    /// Move to the previous question. Returns `false` on the first question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` for completed sessions or storage failures.
    pub async fn previous(&self, session: &mut QuizSession) -> Result<bool, SessionError> {
        self.advance(session, Direction::Previous).await
    }

    /// Step in `direction`, checkpointing only when the index changed.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` for completed sessions or storage failures.
    pub async fn advance(
        &self,
        session: &mut QuizSession,
        direction: Direction,
    ) -> Result<bool, SessionError> {
        let moved = session.advance(direction)?;
        if moved {
            self.save_checkpoint(session).await?;
        }
        Ok(moved)
    }

    /// Jump to any question by index and checkpoint.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` for out-of-range indices, completed sessions or
    /// storage failures.
    pub async fn jump_to(&self, session: &mut QuizSession, index: usize) -> Result<(), SessionError> {
        session.jump_to(index)?;
        self.save_checkpoint(session).await
    }

    /// Apply one elapsed second; expiry on the last question submits.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` for completed sessions or storage failures.
    pub async fn tick(&self, session: &mut QuizSession) -> Result<TickResult, SessionError> {
        match session.tick()? {
            TickOutcome::Counting { remaining } => Ok(TickResult::Counting { remaining }),
            TickOutcome::Advanced { expired, .. } => {
                tracing::debug!("question {expired} expired in {}", session.topic());
                self.save_checkpoint(session).await?;
                Ok(TickResult::Advanced { expired })
            }
            TickOutcome::SubmitDue { expired, marked } => {
                tracing::debug!("last question {expired} expired in {}", session.topic());
                if marked {
                    self.save_checkpoint(session).await?;
                }
                self.submit(session).await.map(TickResult::Submitted)
            }
        }
    }

    /// Finalize the attempt, append history for the signed-in user and clear
    /// the checkpoint.
    ///
    /// Without a signed-in identity the attempt is not recorded. The session
    /// is completed only after both store writes succeed; if one fails, calling
    /// `submit` again finishes the remaining steps with the original result.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` if already submitted, or storage errors.
    pub async fn submit(&self, session: &mut QuizSession) -> Result<QuizResult, SessionError> {
        let resuming = session.is_finalizing();
        let result = session.stage_result(self.clock.now())?;

        if !resuming || !self.already_recorded(&result).await? {
            match self.identity.current_identity().await? {
                Some(identity) => {
                    let record = HistoryRecord::from_result(identity.username, &result);
                    self.history.append_record(&record).await?;
                }
                None => {
                    tracing::info!(
                        "no signed-in user; attempt at {} not recorded",
                        result.topic()
                    );
                }
            }
        }

        self.checkpoints.clear_checkpoint(result.topic()).await?;
        tracing::info!(
            "submitted {}: {}/{} ({}%)",
            result.topic(),
            result.score(),
            result.total_questions(),
            result.percentage()
        );
        Ok(session.complete(result).clone())
    }

    /// Discard `session` and start over on the same questions.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the stale checkpoint cannot be cleared.
    pub async fn retry(&self, session: &QuizSession) -> Result<QuizSession, SessionError> {
        self.checkpoints.clear_checkpoint(session.topic()).await?;
        Ok(session.restarted(self.clock.now()))
    }

    /// Whether a history record for exactly this result is already stored.
    async fn already_recorded(&self, result: &QuizResult) -> Result<bool, SessionError> {
        let records = self.history.list_records().await?;
        Ok(records.iter().any(|r| {
            r.topic == result.topic().as_str()
                && r.date == result.completed_at()
                && r.score == result.score()
        }))
    }

    async fn save_checkpoint(&self, session: &QuizSession) -> Result<(), SessionError> {
        self.checkpoints
            .write_checkpoint(session.topic(), &session.checkpoint())
            .await?;
        Ok(())
    }
}
