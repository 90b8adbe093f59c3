//! Typed repositories stored as JSON values in a `KeyValueStore`.

use async_trait::async_trait;
use quiz_core::model::{Checkpoint, CustomQuiz, HistoryRecord, Identity, Topic, UserAccount};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::repository::{
    CheckpointRepository, HistoryRepository, IdentityRepository, KeyValueStore,
    QuizCollectionRepository, StorageError, UserRepository,
};

/// Stable key names.
pub mod keys {
    use quiz_core::model::Topic;

    pub const HISTORY: &str = "quizHistory";
    pub const CURRENT_USER: &str = "currentUser";
    pub const USERS: &str = "users";
    pub const QUIZZES: &str = "quizzes";

    const PROGRESS_PREFIX: &str = "quizProgress_";

    #[must_use]
    pub fn progress(topic: &Topic) -> String {
        format!("{PROGRESS_PREFIX}{topic}")
    }
}

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Repository backend that encodes every value as JSON.
#[derive(Clone)]
pub struct JsonRepository {
    store: Arc<dyn KeyValueStore>,
}

impl JsonRepository {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        match self.store.get(key).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| StorageError::Serialization(format!("{key}: {e}"))),
            None => Ok(None),
        }
    }

    async fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let raw = serde_json::to_string(value).map_err(ser)?;
        self.store.set(key, raw).await
    }
}

#[async_trait]
impl CheckpointRepository for JsonRepository {
    async fn read_checkpoint(&self, topic: &Topic) -> Result<Option<Checkpoint>, StorageError> {
        self.read(&keys::progress(topic)).await
    }

    async fn write_checkpoint(
        &self,
        topic: &Topic,
        checkpoint: &Checkpoint,
    ) -> Result<(), StorageError> {
        self.write(&keys::progress(topic), checkpoint).await
    }

    async fn clear_checkpoint(&self, topic: &Topic) -> Result<(), StorageError> {
        self.store.remove(&keys::progress(topic)).await
    }
}

#[async_trait]
impl HistoryRepository for JsonRepository {
    async fn append_record(&self, record: &HistoryRecord) -> Result<(), StorageError> {
        let mut records: Vec<HistoryRecord> = self.read(keys::HISTORY).await?.unwrap_or_default();
        records.push(record.clone());
        self.write(keys::HISTORY, &records).await
    }

    async fn list_records(&self) -> Result<Vec<HistoryRecord>, StorageError> {
        Ok(self.read(keys::HISTORY).await?.unwrap_or_default())
    }
}

#[async_trait]
impl IdentityRepository for JsonRepository {
    async fn current_identity(&self) -> Result<Option<Identity>, StorageError> {
        self.read(keys::CURRENT_USER).await
    }

    async fn set_current_identity(&self, identity: &Identity) -> Result<(), StorageError> {
        self.write(keys::CURRENT_USER, identity).await
    }

    async fn clear_current_identity(&self) -> Result<(), StorageError> {
        self.store.remove(keys::CURRENT_USER).await
    }
}

#[async_trait]
impl UserRepository for JsonRepository {
    async fn list_users(&self) -> Result<Vec<UserAccount>, StorageError> {
        Ok(self.read(keys::USERS).await?.unwrap_or_default())
    }

    async fn save_users(&self, users: &[UserAccount]) -> Result<(), StorageError> {
        self.write(keys::USERS, users).await
    }
}

#[async_trait]
impl QuizCollectionRepository for JsonRepository {
    async fn load_quizzes(&self) -> Result<BTreeMap<String, CustomQuiz>, StorageError> {
        Ok(self.read(keys::QUIZZES).await?.unwrap_or_default())
    }

    async fn save_quizzes(
        &self,
        quizzes: &BTreeMap<String, CustomQuiz>,
    ) -> Result<(), StorageError> {
        self.write(keys::QUIZZES, quizzes).await
    }
}
