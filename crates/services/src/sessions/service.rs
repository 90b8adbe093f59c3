use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use quiz_core::model::{
    Checkpoint, Question, QuestionId, QuizResult, QuizSettings, SessionStatus, Topic,
};

use super::progress::SessionProgress;
use crate::error::SessionError;

//
// ─── EVENTS AND OUTCOMES ───────────────────────────────────────────────────────
//

/// Direction of a step through the question list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// Outcome of recording an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub question_id: QuestionId,
    pub is_correct: bool,
    pub score: u32,
}

/// Outcome of one elapsed second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The current question still has time left.
    Counting { remaining: u32 },
    /// Time ran out and the session moved to the next question.
    Advanced { expired: QuestionId, marked: bool },
    /// Time ran out on the last question; the attempt must be submitted.
    SubmitDue { expired: QuestionId, marked: bool },
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One attempt at a topic's question set.
///
/// Pure state machine: every transition is driven by the caller, and nothing
/// here touches storage or real time.
pub struct QuizSession {
    topic: Topic,
    settings: QuizSettings,
    questions: Vec<Question>,
    current: usize,
    selected: BTreeMap<QuestionId, String>,
    answered: BTreeSet<QuestionId>,
    score: u32,
    time_remaining: u32,
    started_at: DateTime<Utc>,
    staged: Option<QuizResult>,
    result: Option<QuizResult>,
}

impl QuizSession {
    /// Start a fresh attempt at index 0 with no selections.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptyQuestionSet` if `questions` is empty.
    pub fn new(
        topic: Topic,
        questions: Vec<Question>,
        started_at: DateTime<Utc>,
        settings: &QuizSettings,
    ) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::EmptyQuestionSet { topic });
        }

        Ok(Self {
            topic,
            settings: *settings,
            questions,
            current: 0,
            selected: BTreeMap::new(),
            answered: BTreeSet::new(),
            score: 0,
            time_remaining: settings.question_seconds(),
            started_at,
            staged: None,
            result: None,
        })
    }

    /// A brand-new attempt over the same questions.
    #[must_use]
    pub fn restarted(&self, started_at: DateTime<Utc>) -> Self {
        Self {
            topic: self.topic.clone(),
            settings: self.settings,
            questions: self.questions.clone(),
            current: 0,
            selected: BTreeMap::new(),
            answered: BTreeSet::new(),
            score: 0,
            time_remaining: self.settings.question_seconds(),
            started_at,
            staged: None,
            result: None,
        }
    }

    /// Resume from a checkpoint.
    ///
    /// Returns `false` and leaves the session untouched if the checkpoint does
    /// not fit this question set: index out of bounds, unknown question ids,
    /// selections missing from the answered set, or a score that disagrees
    /// with the selections.
    pub fn restore(&mut self, checkpoint: Checkpoint) -> bool {
        if checkpoint.current_question_index >= self.questions.len() {
            return false;
        }
        let known = |id: &QuestionId| self.question(*id).is_some();
        if !checkpoint.answered_questions.iter().all(known)
            || !checkpoint.selected_options.keys().all(known)
        {
            return false;
        }
        if !checkpoint
            .selected_options
            .keys()
            .all(|id| checkpoint.answered_questions.contains(id))
        {
            return false;
        }
        if checkpoint.score != self.score_for(&checkpoint.selected_options) {
            return false;
        }

        self.current = checkpoint.current_question_index;
        self.selected = checkpoint.selected_options;
        self.answered = checkpoint.answered_questions;
        self.score = checkpoint.score;
        self.time_remaining = self.settings.question_seconds();
        true
    }

    #[must_use]
    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    #[must_use]
    pub fn settings(&self) -> &QuizSettings {
        &self.settings
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id() == id)
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> &Question {
        &self.questions[self.current]
    }

    #[must_use]
    pub fn is_last_question(&self) -> bool {
        self.current + 1 == self.questions.len()
    }

    #[must_use]
    pub fn selected_answer(&self, id: QuestionId) -> Option<&str> {
        self.selected.get(&id).map(String::as_str)
    }

    #[must_use]
    pub fn selected_answers(&self) -> &BTreeMap<QuestionId, String> {
        &self.selected
    }

    #[must_use]
    pub fn answered_ids(&self) -> &BTreeSet<QuestionId> {
        &self.answered
    }

    #[must_use]
    pub fn is_answered(&self, id: QuestionId) -> bool {
        self.answered.contains(&id)
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        if self.result.is_some() {
            SessionStatus::Completed
        } else {
            SessionStatus::InProgress
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.result.is_some()
    }

    /// The finalized result once the session has been submitted.
    #[must_use]
    pub fn result(&self) -> Option<&QuizResult> {
        self.result.as_ref()
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            total: self.questions.len(),
            answered: self.answered.len(),
            remaining: self.questions.len().saturating_sub(self.answered.len()),
            score: self.score,
            current_index: self.current,
            time_remaining: self.time_remaining,
            is_complete: self.is_complete(),
        }
    }

    /// Snapshot of the resumable state.
    #[must_use]
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            current_question_index: self.current,
            selected_options: self.selected.clone(),
            score: self.score,
            answered_questions: self.answered.clone(),
        }
    }

    /// Record `option` as the answer to `question_id`.
    ///
    /// Only the exact correct string scores. Replacing a correct answer with an
    /// incorrect one takes the point back; the reverse adds it. The current
    /// index never moves.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` after submission and
    /// `SessionError::UnknownQuestion` for ids outside this question set.
    pub fn select_answer(
        &mut self,
        question_id: QuestionId,
        option: impl Into<String>,
    ) -> Result<AnswerOutcome, SessionError> {
        self.ensure_in_progress()?;
        let question = self
            .question(question_id)
            .ok_or(SessionError::UnknownQuestion { id: question_id })?;

        let option = option.into();
        let was_correct = self
            .selected
            .get(&question_id)
            .is_some_and(|prev| question.is_correct(prev));
        let is_correct = question.is_correct(&option);

        match (was_correct, is_correct) {
            (false, true) => self.score += 1,
            (true, false) => self.score = self.score.saturating_sub(1),
            _ => {}
        }

        self.selected.insert(question_id, option);
        self.answered.insert(question_id);

        Ok(AnswerOutcome {
            question_id,
            is_correct,
            score: self.score,
        })
    }

    /// Step one question forward or back, resetting the countdown.
    ///
    /// Returns `false` without changing anything at either end of the list.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` after submission.
    pub fn advance(&mut self, direction: Direction) -> Result<bool, SessionError> {
        self.ensure_in_progress()?;
        let target = match direction {
            Direction::Next if !self.is_last_question() => self.current + 1,
            Direction::Previous if self.current > 0 => self.current - 1,
            _ => return Ok(false),
        };
        self.move_to(target);
        Ok(true)
    }

    /// Jump straight to `index`, answered or not, resetting the countdown.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` after submission and
    /// `SessionError::IndexOutOfRange` for an index past the last question.
    pub fn jump_to(&mut self, index: usize) -> Result<(), SessionError> {
        self.ensure_in_progress()?;
        if index >= self.questions.len() {
            return Err(SessionError::IndexOutOfRange {
                index,
                len: self.questions.len(),
            });
        }
        self.move_to(index);
        Ok(())
    }

    /// Account for one elapsed second on the current question.
    ///
    /// When the countdown reaches zero an unanswered question is marked as
    /// answered without a selection, then the session either moves on or
    /// reports that it must be submitted.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` after submission.
    pub fn tick(&mut self) -> Result<TickOutcome, SessionError> {
        self.ensure_in_progress()?;
        self.time_remaining = self.time_remaining.saturating_sub(1);
        if self.time_remaining > 0 {
            return Ok(TickOutcome::Counting {
                remaining: self.time_remaining,
            });
        }

        let expired = self.current_question().id();
        let marked = self.answered.insert(expired);
        if self.is_last_question() {
            Ok(TickOutcome::SubmitDue { expired, marked })
        } else {
            self.move_to(self.current + 1);
            Ok(TickOutcome::Advanced { expired, marked })
        }
    }

    /// Finalize the attempt.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` if the session was already submitted.
    pub fn submit(&mut self, completed_at: DateTime<Utc>) -> Result<&QuizResult, SessionError> {
        let result = self.stage_result(completed_at)?;
        Ok(self.complete(result))
    }

    /// Freeze the outcome without completing the session.
    ///
    /// Once staged, answers and navigation are refused and later calls return
    /// the same result, so a submission interrupted between its persistence
    /// steps can be finished with the original completion time.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` if the session was already submitted.
    pub fn stage_result(&mut self, completed_at: DateTime<Utc>) -> Result<QuizResult, SessionError> {
        if self.is_complete() {
            return Err(SessionError::Completed);
        }
        if let Some(staged) = &self.staged {
            return Ok(staged.clone());
        }
        let total = u32::try_from(self.questions.len()).unwrap_or(u32::MAX);
        let result = QuizResult::new(
            self.topic.clone(),
            self.score,
            total,
            self.started_at,
            completed_at,
            &self.settings,
        )?;
        Ok(self.staged.insert(result).clone())
    }

    /// Whether a result has been staged but not yet completed.
    #[must_use]
    pub fn is_finalizing(&self) -> bool {
        self.staged.is_some() && !self.is_complete()
    }

    /// Mark the session completed with `result`.
    pub fn complete(&mut self, result: QuizResult) -> &QuizResult {
        self.staged = None;
        self.result.insert(result)
    }

    fn move_to(&mut self, index: usize) {
        self.current = index;
        self.time_remaining = self.settings.question_seconds();
    }

    fn ensure_in_progress(&self) -> Result<(), SessionError> {
        if self.is_complete() || self.staged.is_some() {
            Err(SessionError::Completed)
        } else {
            Ok(())
        }
    }

    fn score_for(&self, selected: &BTreeMap<QuestionId, String>) -> u32 {
        let correct = selected
            .iter()
            .filter(|(id, option)| self.question(**id).is_some_and(|q| q.is_correct(option)))
            .count();
        u32::try_from(correct).unwrap_or(u32::MAX)
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("topic", &self.topic)
            .field("questions_len", &self.questions.len())
            .field("current", &self.current)
            .field("answered_len", &self.answered.len())
            .field("score", &self.score)
            .field("time_remaining", &self.time_remaining)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiz_core::model::QuestionDraft;
    use quiz_core::time::fixed_now;

    fn question(id: u64, answer: &str) -> Question {
        QuestionDraft::new(
            QuestionId::new(id),
            format!("Question {id}"),
            vec!["A".into(), "B".into(), "C".into(), "D".into()],
            answer,
        )
        .validate()
        .unwrap()
    }

    fn session() -> QuizSession {
        QuizSession::new(
            Topic::new("Letters").unwrap(),
            vec![question(1, "A"), question(2, "B"), question(3, "C")],
            fixed_now(),
            &QuizSettings::default(),
        )
        .unwrap()
    }

    fn recomputed(session: &QuizSession) -> u32 {
        session.score_for(session.selected_answers())
    }

    #[test]
    fn empty_question_set_is_rejected() {
        let err = QuizSession::new(
            Topic::new("Nothing").unwrap(),
            Vec::new(),
            fixed_now(),
            &QuizSettings::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SessionError::EmptyQuestionSet { .. }));
    }

    #[test]
    fn fresh_session_starts_at_zero() {
        let s = session();
        assert_eq!(s.current_index(), 0);
        assert_eq!(s.score(), 0);
        assert_eq!(s.time_remaining(), 30);
        assert!(s.selected_answers().is_empty());
        assert_eq!(s.status(), SessionStatus::InProgress);
    }

    #[test]
    fn score_follows_current_selections() {
        let mut s = session();
        let q1 = QuestionId::new(1);
        for (option, expected) in [("A", 1), ("B", 0), ("C", 0), ("A", 1), ("A", 1), ("D", 0)] {
            let outcome = s.select_answer(q1, option).unwrap();
            assert_eq!(outcome.score, expected, "after selecting {option}");
            assert_eq!(s.score(), recomputed(&s));
        }
        assert_eq!(s.current_index(), 0);
        assert!(s.is_answered(q1));
    }

    #[test]
    fn changing_correct_answer_to_incorrect_decrements() {
        let mut s = session();
        let q1 = QuestionId::new(1);
        assert!(s.select_answer(q1, "A").unwrap().is_correct);
        assert_eq!(s.score(), 1);
        assert!(!s.select_answer(q1, "C").unwrap().is_correct);
        assert_eq!(s.score(), 0);
    }

    #[test]
    fn unknown_question_is_rejected() {
        let mut s = session();
        let err = s.select_answer(QuestionId::new(99), "A").unwrap_err();
        assert!(matches!(err, SessionError::UnknownQuestion { .. }));
        assert!(s.answered_ids().is_empty());
    }

    #[test]
    fn navigation_is_bounded_and_resets_timer() {
        let mut s = session();
        assert!(!s.advance(Direction::Previous).unwrap());
        assert_eq!(s.current_index(), 0);

        s.tick().unwrap();
        assert_eq!(s.time_remaining(), 29);
        assert!(s.advance(Direction::Next).unwrap());
        assert_eq!(s.time_remaining(), 30);
        assert!(s.advance(Direction::Next).unwrap());
        assert!(!s.advance(Direction::Next).unwrap());
        assert_eq!(s.current_index(), 2);

        s.jump_to(0).unwrap();
        assert_eq!(s.current_index(), 0);
        let err = s.jump_to(3).unwrap_err();
        assert!(matches!(err, SessionError::IndexOutOfRange { index: 3, len: 3 }));
    }

    #[test]
    fn expiry_marks_answered_without_selection() {
        let mut s = session();
        for _ in 0..29 {
            assert!(matches!(s.tick().unwrap(), TickOutcome::Counting { .. }));
        }
        let outcome = s.tick().unwrap();
        assert_eq!(
            outcome,
            TickOutcome::Advanced {
                expired: QuestionId::new(1),
                marked: true
            }
        );
        assert!(s.is_answered(QuestionId::new(1)));
        assert_eq!(s.selected_answer(QuestionId::new(1)), None);
        assert_eq!(s.current_index(), 1);
        assert_eq!(s.time_remaining(), 30);
        assert_eq!(s.score(), 0);
    }

    #[test]
    fn expiry_on_last_question_requests_submission() {
        let mut s = session();
        s.jump_to(2).unwrap();
        s.select_answer(QuestionId::new(3), "C").unwrap();
        for _ in 0..29 {
            s.tick().unwrap();
        }
        let outcome = s.tick().unwrap();
        assert_eq!(
            outcome,
            TickOutcome::SubmitDue {
                expired: QuestionId::new(3),
                marked: false
            }
        );
        assert_eq!(s.current_index(), 2);
    }

    #[test]
    fn expired_question_can_still_be_answered_later() {
        let mut s = session();
        s.jump_to(1).unwrap();
        for _ in 0..30 {
            s.tick().unwrap();
        }
        assert!(s.is_answered(QuestionId::new(2)));
        s.jump_to(1).unwrap();
        s.select_answer(QuestionId::new(2), "B").unwrap();
        assert_eq!(s.score(), 1);
    }

    #[test]
    fn submit_is_final() {
        let mut s = session();
        s.select_answer(QuestionId::new(1), "A").unwrap();
        let done_at = fixed_now() + Duration::seconds(45);
        let result = s.submit(done_at).unwrap().clone();
        assert_eq!(result.score(), 1);
        assert_eq!(result.percentage(), 33);
        assert!(!result.passed());
        assert!((result.time_taken_secs() - 45.0).abs() < f64::EPSILON);
        assert_eq!(s.status(), SessionStatus::Completed);

        assert!(matches!(s.submit(done_at), Err(SessionError::Completed)));
        assert!(matches!(s.tick(), Err(SessionError::Completed)));
        assert!(matches!(
            s.select_answer(QuestionId::new(2), "B"),
            Err(SessionError::Completed)
        ));
        assert_eq!(s.result(), Some(&result));
    }

    #[test]
    fn staged_result_freezes_session_until_completed() {
        let mut s = session();
        s.select_answer(QuestionId::new(1), "A").unwrap();
        let first_at = fixed_now() + Duration::seconds(10);
        let staged = s.stage_result(first_at).unwrap();
        assert!(s.is_finalizing());
        assert!(!s.is_complete());
        assert!(matches!(
            s.select_answer(QuestionId::new(2), "B"),
            Err(SessionError::Completed)
        ));
        assert!(matches!(s.tick(), Err(SessionError::Completed)));

        let again = s.stage_result(first_at + Duration::seconds(30)).unwrap();
        assert_eq!(again, staged);

        s.complete(again);
        assert!(!s.is_finalizing());
        assert_eq!(s.result(), Some(&staged));
        assert!(matches!(
            s.stage_result(first_at),
            Err(SessionError::Completed)
        ));
    }

    #[test]
    fn checkpoint_round_trips() {
        let mut s = session();
        s.select_answer(QuestionId::new(1), "A").unwrap();
        s.advance(Direction::Next).unwrap();
        for _ in 0..30 {
            s.tick().unwrap();
        }
        s.select_answer(QuestionId::new(3), "D").unwrap();
        let checkpoint = s.checkpoint();

        let mut resumed = session();
        assert!(resumed.restore(checkpoint.clone()));
        assert_eq!(resumed.checkpoint(), checkpoint);
        assert_eq!(resumed.current_index(), 2);
        assert_eq!(resumed.score(), 1);
    }

    #[test]
    fn inconsistent_checkpoint_is_ignored() {
        let mut s = session();
        let mut bad_index = Checkpoint {
            current_question_index: 3,
            ..Checkpoint::default()
        };
        assert!(!s.restore(bad_index.clone()));

        bad_index.current_question_index = 0;
        bad_index.score = 2;
        assert!(!s.restore(bad_index));

        let mut unknown = Checkpoint::default();
        unknown.answered_questions.insert(QuestionId::new(42));
        assert!(!s.restore(unknown));

        let mut not_answered = Checkpoint::default();
        not_answered
            .selected_options
            .insert(QuestionId::new(1), "B".into());
        assert!(!s.restore(not_answered));

        assert_eq!(s.checkpoint(), Checkpoint::default());
    }

    #[test]
    fn restarted_session_keeps_questions_only() {
        let mut s = session();
        s.select_answer(QuestionId::new(1), "A").unwrap();
        s.advance(Direction::Next).unwrap();
        s.submit(fixed_now()).unwrap();

        let later = fixed_now() + Duration::minutes(5);
        let fresh = s.restarted(later);
        assert_eq!(fresh.questions(), s.questions());
        assert_eq!(fresh.current_index(), 0);
        assert_eq!(fresh.score(), 0);
        assert!(fresh.answered_ids().is_empty());
        assert_eq!(fresh.started_at(), later);
        assert!(!fresh.is_complete());
    }
}
