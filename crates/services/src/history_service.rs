use std::sync::Arc;

use quiz_core::model::HistoryRecord;
use storage::repository::{HistoryRepository, UserRepository};

use crate::error::HistoryError;

/// Dashboard figures for one user.
#[derive(Debug, Clone, PartialEq)]
pub struct UserStats {
    pub quizzes_taken: usize,
    /// Correct answers over questions seen across every attempt, rounded.
    pub accuracy: u32,
    /// Mean seconds per attempt, rounded.
    pub average_time_secs: u64,
    /// Highest raw score of a single attempt.
    pub best_score: u32,
    /// Fastest attempt in seconds.
    pub best_time_secs: f64,
}

/// Totals across every user.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminOverview {
    pub total_users: usize,
    pub total_attempts: usize,
    /// Mean of the per-attempt percentages; zero without attempts.
    pub average_percentage: f64,
}

/// Read-side queries over the history log.
#[derive(Clone)]
pub struct HistoryService {
    history: Arc<dyn HistoryRepository>,
    users: Arc<dyn UserRepository>,
}

impl HistoryService {
    #[must_use]
    pub fn new(history: Arc<dyn HistoryRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { history, users }
    }

    /// Every record, newest first.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Storage` if the log cannot be read.
    pub async fn recent(&self) -> Result<Vec<HistoryRecord>, HistoryError> {
        let mut records = self.history.list_records().await?;
        records.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(records)
    }

    /// Records of one user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Storage` if the log cannot be read.
    pub async fn for_user(&self, username: &str) -> Result<Vec<HistoryRecord>, HistoryError> {
        let mut records = self.recent().await?;
        records.retain(|r| r.username == username);
        Ok(records)
    }

    /// `None` until the user has finished an attempt.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Storage` if the log cannot be read.
    pub async fn user_stats(&self, username: &str) -> Result<Option<UserStats>, HistoryError> {
        Ok(stats_for(&self.for_user(username).await?))
    }

    /// # Errors
    ///
    /// Returns `HistoryError::Storage` if the log or the user store cannot be read.
    pub async fn admin_overview(&self) -> Result<AdminOverview, HistoryError> {
        let total_users = self.users.list_users().await?.len();
        let records = self.history.list_records().await?;
        Ok(AdminOverview {
            total_users,
            total_attempts: records.len(),
            average_percentage: mean_percentage(&records),
        })
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean_percentage(records: &[HistoryRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let total: u64 = records.iter().map(|r| u64::from(r.percentage)).sum();
    total as f64 / records.len() as f64
}

#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn stats_for(records: &[HistoryRecord]) -> Option<UserStats> {
    if records.is_empty() {
        return None;
    }
    let correct: u64 = records.iter().map(|r| u64::from(r.score)).sum();
    let seen: u64 = records.iter().map(|r| u64::from(r.total_questions)).sum();
    let total_time: f64 = records.iter().map(|r| r.time_taken).sum();

    let accuracy = if seen == 0 {
        0
    } else {
        u32::try_from((correct * 200 + seen) / (seen * 2)).unwrap_or(u32::MAX)
    };
    Some(UserStats {
        quizzes_taken: records.len(),
        accuracy,
        average_time_secs: (total_time / records.len() as f64).round().max(0.0) as u64,
        best_score: records.iter().map(|r| r.score).max().unwrap_or(0),
        best_time_secs: records
            .iter()
            .map(|r| r.time_taken)
            .fold(f64::INFINITY, f64::min),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiz_core::time::{fixed_clock, fixed_now};
    use storage::Storage;

    use crate::auth_service::AuthService;

    fn record(username: &str, score: u32, total: u32, secs: f64, minutes: i64) -> HistoryRecord {
        HistoryRecord {
            username: username.into(),
            topic: "OS".into(),
            score,
            total_questions: total,
            percentage: quiz_core::model::rounded_percentage(score, total),
            time_taken: secs,
            date: fixed_now() + Duration::minutes(minutes),
        }
    }

    fn service(storage: &Storage) -> HistoryService {
        HistoryService::new(Arc::clone(&storage.history), Arc::clone(&storage.users))
    }

    #[tokio::test]
    async fn user_history_is_newest_first_with_stats() {
        let storage = Storage::in_memory();
        for r in [
            record("user", 1, 2, 40.0, 0),
            record("admin", 3, 3, 10.0, 1),
            record("user", 3, 4, 25.5, 2),
            record("user", 2, 3, 61.0, 3),
        ] {
            storage.history.append_record(&r).await.unwrap();
        }
        let service = service(&storage);

        let mine = service.for_user("user").await.unwrap();
        let scores: Vec<u32> = mine.iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![2, 3, 1]);

        let stats = service.user_stats("user").await.unwrap().unwrap();
        assert_eq!(stats.quizzes_taken, 3);
        // 6 correct out of 9 questions.
        assert_eq!(stats.accuracy, 67);
        // (40 + 25.5 + 61) / 3 = 42.17
        assert_eq!(stats.average_time_secs, 42);
        assert_eq!(stats.best_score, 3);
        assert!((stats.best_time_secs - 25.5).abs() < f64::EPSILON);

        assert_eq!(service.recent().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn stats_for_unknown_user_are_absent() {
        let storage = Storage::in_memory();
        assert_eq!(service(&storage).user_stats("nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn admin_overview_counts_users_and_attempts() {
        let storage = Storage::in_memory();
        let history = service(&storage);
        assert_eq!(
            history.admin_overview().await.unwrap(),
            AdminOverview {
                total_users: 0,
                total_attempts: 0,
                average_percentage: 0.0
            }
        );

        AuthService::new(
            fixed_clock(),
            Arc::clone(&storage.users),
            Arc::clone(&storage.identity),
        )
        .seed_default_accounts()
        .await
        .unwrap();
        for r in [record("user", 1, 2, 30.0, 0), record("admin", 2, 3, 30.0, 1)] {
            storage.history.append_record(&r).await.unwrap();
        }

        let overview = history.admin_overview().await.unwrap();
        assert_eq!(overview.total_users, 2);
        assert_eq!(overview.total_attempts, 2);
        // (50 + 67) / 2
        assert!((overview.average_percentage - 58.5).abs() < f64::EPSILON);
    }
}
