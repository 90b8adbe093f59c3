use std::fmt;
use std::sync::Arc;

use quiz_core::model::{QuestionId, QuizResult, Topic};

use super::service::{AnswerOutcome, QuizSession};
use super::timer::QuestionTimer;
use super::workflow::{QuizLoopService, TickResult};
use crate::error::SessionError;

/// User intents forwarded by a presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizEvent {
    SelectAnswer {
        question_id: QuestionId,
        option: String,
    },
    Next,
    Previous,
    JumpTo(usize),
    Submit,
    Retry,
}

/// What changed after an event or tick.
#[derive(Debug, Clone, PartialEq)]
pub enum RunnerUpdate {
    Answered(AnswerOutcome),
    Moved { index: usize },
    Unchanged,
    Counting { remaining: u32 },
    Expired { expired: QuestionId, index: usize },
    Finished(QuizResult),
    Restarted,
}

/// Owns one session together with its question timer.
///
/// The timer runs only while the session is in progress and is restarted
/// every time the presented question changes.
pub struct QuizRunner {
    service: Arc<QuizLoopService>,
    session: QuizSession,
    timer: QuestionTimer,
}

impl QuizRunner {
    /// Start (or resume) `topic` and begin counting down.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the session cannot be started.
    pub async fn start(service: Arc<QuizLoopService>, topic: &Topic) -> Result<Self, SessionError> {
        let session = service.start(topic).await?;
        let mut timer = QuestionTimer::new();
        timer.restart();
        Ok(Self {
            service,
            session,
            timer,
        })
    }

    #[must_use]
    pub fn session(&self) -> &QuizSession {
        &self.session
    }

    #[must_use]
    pub fn timer_running(&self) -> bool {
        self.timer.is_running()
    }

    /// Whether a manual submit should be offered: every question answered or
    /// expired, or an earlier submit still has store writes to finish.
    #[must_use]
    pub fn can_submit(&self) -> bool {
        !self.session.is_complete()
            && (self.session.is_finalizing() || self.session.progress().all_answered())
    }

    /// Wait until the question timer fires. Pends forever once completed.
    pub async fn wait_tick(&mut self) {
        self.timer.tick().await;
    }

    /// Apply one elapsed second.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` for completed sessions or storage failures.
    pub async fn on_tick(&mut self) -> Result<RunnerUpdate, SessionError> {
        let ticked = self.service.tick(&mut self.session).await;
        self.stop_if_finalizing();
        match ticked? {
            TickResult::Counting { remaining } => Ok(RunnerUpdate::Counting { remaining }),
            TickResult::Advanced { expired } => {
                self.timer.restart();
                Ok(RunnerUpdate::Expired {
                    expired,
                    index: self.session.current_index(),
                })
            }
            TickResult::Submitted(result) => {
                self.timer.cancel();
                Ok(RunnerUpdate::Finished(result))
            }
        }
    }

    /// Apply a user intent.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` for invalid intents or storage failures.
    pub async fn dispatch(&mut self, event: QuizEvent) -> Result<RunnerUpdate, SessionError> {
        let update = self.apply(event).await;
        self.stop_if_finalizing();
        let update = update?;
        match &update {
            RunnerUpdate::Moved { .. } | RunnerUpdate::Restarted => self.timer.restart(),
            RunnerUpdate::Finished(_) => self.timer.cancel(),
            _ => {}
        }
        Ok(update)
    }

    async fn apply(&mut self, event: QuizEvent) -> Result<RunnerUpdate, SessionError> {
        let service = Arc::clone(&self.service);
        let session = &mut self.session;
        let update = match event {
            QuizEvent::SelectAnswer {
                question_id,
                option,
            } => RunnerUpdate::Answered(service.select_answer(session, question_id, option).await?),
            QuizEvent::Next => Self::moved(service.next(session).await?, session),
            QuizEvent::Previous => Self::moved(service.previous(session).await?, session),
            QuizEvent::JumpTo(index) => {
                service.jump_to(session, index).await?;
                RunnerUpdate::Moved { index }
            }
            QuizEvent::Submit => RunnerUpdate::Finished(service.submit(session).await?),
            QuizEvent::Retry => {
                self.session = service.retry(&self.session).await?;
                RunnerUpdate::Restarted
            }
        };
        Ok(update)
    }

    /// A submit that failed halfway leaves nothing to count down.
    fn stop_if_finalizing(&mut self) {
        if self.session.is_finalizing() {
            self.timer.cancel();
        }
    }

    /// Stop the timer and hand back the session; its checkpoint stays stored.
    #[must_use]
    pub fn close(mut self) -> QuizSession {
        self.timer.cancel();
        self.session
    }

    fn moved(moved: bool, session: &QuizSession) -> RunnerUpdate {
        if moved {
            RunnerUpdate::Moved {
                index: session.current_index(),
            }
        } else {
            RunnerUpdate::Unchanged
        }
    }
}

impl fmt::Debug for QuizRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizRunner")
            .field("session", &self.session)
            .field("timer", &self.timer)
            .finish_non_exhaustive()
    }
}
