use std::sync::Arc;

use quiz_core::model::QuizSettings;
use storage::repository::Storage;

use crate::Clock;
use crate::auth_service::AuthService;
use crate::catalog_service::QuizCatalogService;
use crate::error::AppServicesError;
use crate::history_service::HistoryService;
use crate::question_source::{BundledQuestions, CatalogSource, CustomQuizSource};
use crate::sessions::QuizLoopService;

/// Assembles app-facing services over one `Storage`.
#[derive(Clone)]
pub struct AppServices {
    quiz_loop: Arc<QuizLoopService>,
    auth: Arc<AuthService>,
    catalog: Arc<QuizCatalogService>,
    history: Arc<HistoryService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization or dataset loading
    /// fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        settings: QuizSettings,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Self::from_storage(storage, clock, settings)
    }

    /// Build services over a fresh in-memory store.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the bundled dataset cannot be loaded.
    pub fn in_memory(clock: Clock, settings: QuizSettings) -> Result<Self, AppServicesError> {
        Self::from_storage(Storage::in_memory(), clock, settings)
    }

    /// Wire every service to `storage`.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the bundled dataset cannot be loaded.
    pub fn from_storage(
        storage: Storage,
        clock: Clock,
        settings: QuizSettings,
    ) -> Result<Self, AppServicesError> {
        let bundled = Arc::new(BundledQuestions::load()?);
        let source = Arc::new(CatalogSource::new(
            Arc::clone(&bundled),
            CustomQuizSource::new(Arc::clone(&storage.quizzes)),
        ));

        let quiz_loop = Arc::new(
            QuizLoopService::new(
                clock,
                source,
                Arc::clone(&storage.checkpoints),
                Arc::clone(&storage.history),
                Arc::clone(&storage.identity),
            )
            .with_settings(settings),
        );
        let auth = Arc::new(AuthService::new(
            clock,
            Arc::clone(&storage.users),
            Arc::clone(&storage.identity),
        ));
        let catalog = Arc::new(QuizCatalogService::new(
            clock,
            bundled,
            Arc::clone(&storage.quizzes),
        ));
        let history = Arc::new(HistoryService::new(
            Arc::clone(&storage.history),
            Arc::clone(&storage.users),
        ));

        Ok(Self {
            quiz_loop,
            auth,
            catalog,
            history,
        })
    }

    #[must_use]
    pub fn quiz_loop(&self) -> Arc<QuizLoopService> {
        Arc::clone(&self.quiz_loop)
    }

    #[must_use]
    pub fn auth(&self) -> Arc<AuthService> {
        Arc::clone(&self.auth)
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<QuizCatalogService> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn history(&self) -> Arc<HistoryService> {
        Arc::clone(&self.history)
    }
}
