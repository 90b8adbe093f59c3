#![forbid(unsafe_code)]

pub mod app_services;
pub mod auth_service;
pub mod catalog_service;
pub mod error;
pub mod history_service;
pub mod question_source;
pub mod sessions;

pub use quiz_core::Clock;
pub use sessions as session;

pub use app_services::AppServices;
pub use auth_service::{AuthService, hash_password, verify_password};
pub use catalog_service::{CustomQuizDraft, QuizCatalogService, TopicListing};
pub use error::{
    AppServicesError, AuthError, CatalogError, HistoryError, SessionError, SourceError,
};
pub use history_service::{AdminOverview, HistoryService, UserStats};
pub use question_source::{BundledQuestions, CatalogSource, CustomQuizSource, QuestionSource};

pub use sessions::{
    AnswerOutcome, Direction, QuestionTimer, QuizEvent, QuizLoopService, QuizRunner, QuizSession,
    RunnerUpdate, SessionProgress, TickOutcome, TickResult,
};
