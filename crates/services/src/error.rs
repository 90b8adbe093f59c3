//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{QuestionError, QuestionId, QuizResultError, Topic};
use storage::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by question sources.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SourceError {
    #[error("bundled question dataset is invalid: {0}")]
    Dataset(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by quiz sessions.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no questions available for topic {topic}")]
    EmptyQuestionSet { topic: Topic },
    #[error("session already completed")]
    Completed,
    #[error("question {id} is not part of this session")]
    UnknownQuestion { id: QuestionId },
    #[error("question index {index} is out of range for {len} questions")]
    IndexOutOfRange { index: usize, len: usize },
    #[error(transparent)]
    Result(#[from] QuizResultError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `AuthService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    #[error("email and password are required")]
    MissingCredentials,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("an account with that username or email already exists")]
    AccountExists,
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `QuizCatalogService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("a quiz needs at least one question")]
    NoQuestions,
    #[error("{0} is a built-in topic")]
    BuiltInTopic(Topic),
    #[error("no custom quiz named {0}")]
    NotFound(Topic),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `HistoryService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HistoryError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Source(#[from] SourceError),
}
