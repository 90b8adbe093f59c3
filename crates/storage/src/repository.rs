use async_trait::async_trait;
use quiz_core::model::{Checkpoint, CustomQuiz, HistoryRecord, Identity, Topic, UserAccount};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::json::JsonRepository;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Opaque string key/value store holding JSON-serialized values.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the raw value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    async fn set(&self, key: &str, value: String) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-progress checkpoints, one per topic.
#[async_trait]
pub trait CheckpointRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the stored checkpoint cannot be
    /// decoded, or other storage errors.
    async fn read_checkpoint(&self, topic: &Topic) -> Result<Option<Checkpoint>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the checkpoint cannot be stored.
    async fn write_checkpoint(
        &self,
        topic: &Topic,
        checkpoint: &Checkpoint,
    ) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the checkpoint cannot be removed.
    async fn clear_checkpoint(&self, topic: &Topic) -> Result<(), StorageError>;
}

/// Append-only log of completed attempts.
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the log cannot be read or written.
    async fn append_record(&self, record: &HistoryRecord) -> Result<(), StorageError>;

    /// All records in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the log cannot be read or decoded.
    async fn list_records(&self) -> Result<Vec<HistoryRecord>, StorageError>;
}

/// The currently signed-in identity, if any.
#[async_trait]
pub trait IdentityRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the identity cannot be read or decoded.
    async fn current_identity(&self) -> Result<Option<Identity>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the identity cannot be stored.
    async fn set_current_identity(&self, identity: &Identity) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the identity cannot be removed.
    async fn clear_current_identity(&self) -> Result<(), StorageError>;
}

/// The local user store.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the users cannot be read or decoded.
    async fn list_users(&self) -> Result<Vec<UserAccount>, StorageError>;

    /// Replace the stored user list.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the users cannot be stored.
    async fn save_users(&self, users: &[UserAccount]) -> Result<(), StorageError>;
}

/// User-authored quizzes keyed by topic name.
#[async_trait]
pub trait QuizCollectionRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the collection cannot be read or decoded.
    async fn load_quizzes(&self) -> Result<BTreeMap<String, CustomQuiz>, StorageError>;

    /// Replace the stored collection.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the collection cannot be stored.
    async fn save_quizzes(&self, quizzes: &BTreeMap<String, CustomQuiz>)
    -> Result<(), StorageError>;
}

/// Simple in-memory store for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn len(&self) -> Result<usize, StorageError> {
        let guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.len())
    }

    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key.to_owned(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(key);
        Ok(())
    }
}

/// Aggregates the typed repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub checkpoints: Arc<dyn CheckpointRepository>,
    pub history: Arc<dyn HistoryRepository>,
    pub identity: Arc<dyn IdentityRepository>,
    pub users: Arc<dyn UserRepository>,
    pub quizzes: Arc<dyn QuizCollectionRepository>,
}

impl Storage {
    /// Layer every typed repository over one key/value store.
    #[must_use]
    pub fn from_store(store: Arc<dyn KeyValueStore>) -> Self {
        let repo = JsonRepository::new(store);
        Self {
            checkpoints: Arc::new(repo.clone()),
            history: Arc::new(repo.clone()),
            identity: Arc::new(repo.clone()),
            users: Arc::new(repo.clone()),
            quizzes: Arc::new(repo),
        }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(InMemoryStore::new()))
    }
}
