#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use quiz_core::model::{
    HistoryRecord, Identity, Question, QuestionDraft, QuestionId, QuizSettings, Role, Topic,
    UserId,
};
use quiz_core::time::fixed_clock;
use services::error::SourceError;
use services::{QuestionSource, QuizLoopService};
use storage::repository::{
    HistoryRepository, IdentityRepository, InMemoryStore, KeyValueStore, Storage, StorageError,
};

/// Three questions answered "A", "B" and "C".
pub struct FixedQuestions;

#[async_trait]
impl QuestionSource for FixedQuestions {
    async fn questions(&self, topic: &Topic) -> Result<Vec<Question>, SourceError> {
        if topic.as_str() == "Empty" {
            return Ok(Vec::new());
        }
        Ok(["A", "B", "C"]
            .iter()
            .zip(1..)
            .map(|(answer, id)| {
                QuestionDraft::new(
                    QuestionId::new(id),
                    format!("Question {id}?"),
                    vec!["A".into(), "B".into(), "C".into(), "D".into()],
                    *answer,
                )
                .validate()
                .unwrap()
            })
            .collect())
    }
}

/// In-memory store that counts checkpoint writes and can refuse checkpoint
/// removals.
#[derive(Clone, Default)]
pub struct CountingStore {
    inner: InMemoryStore,
    checkpoint_writes: Arc<AtomicUsize>,
    failing_removes: Arc<AtomicUsize>,
}

impl CountingStore {
    pub fn checkpoint_writes(&self) -> usize {
        self.checkpoint_writes.load(Ordering::SeqCst)
    }

    /// Make the next `count` checkpoint removals fail.
    pub fn fail_checkpoint_removes(&self, count: usize) {
        self.failing_removes.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl KeyValueStore for CountingStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        if key.starts_with("quizProgress_") {
            self.checkpoint_writes.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        if key.starts_with("quizProgress_")
            && self
                .failing_removes
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        {
            return Err(StorageError::Connection("store locked".into()));
        }
        self.inner.remove(key).await
    }
}

/// History log whose first `failures` appends fail.
pub struct FlakyHistory {
    inner: Arc<dyn HistoryRepository>,
    failures: AtomicUsize,
}

impl FlakyHistory {
    pub fn new(inner: Arc<dyn HistoryRepository>, failures: usize) -> Self {
        Self {
            inner,
            failures: AtomicUsize::new(failures),
        }
    }
}

#[async_trait]
impl HistoryRepository for FlakyHistory {
    async fn append_record(&self, record: &HistoryRecord) -> Result<(), StorageError> {
        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(StorageError::Connection("disk full".into()));
        }
        self.inner.append_record(record).await
    }

    async fn list_records(&self) -> Result<Vec<HistoryRecord>, StorageError> {
        self.inner.list_records().await
    }
}

pub struct Fixture {
    pub store: CountingStore,
    pub storage: Storage,
    pub service: Arc<QuizLoopService>,
}

pub fn fixture_with(settings: QuizSettings) -> Fixture {
    let store = CountingStore::default();
    let storage = Storage::from_store(Arc::new(store.clone()));
    assemble(store, storage, settings)
}

/// Fixture whose history log fails its first `failures` appends.
pub fn fixture_with_flaky_history(failures: usize) -> Fixture {
    let store = CountingStore::default();
    let mut storage = Storage::from_store(Arc::new(store.clone()));
    storage.history = Arc::new(FlakyHistory::new(Arc::clone(&storage.history), failures));
    assemble(store, storage, QuizSettings::default())
}

fn assemble(store: CountingStore, storage: Storage, settings: QuizSettings) -> Fixture {
    let service = Arc::new(
        QuizLoopService::new(
            fixed_clock(),
            Arc::new(FixedQuestions),
            Arc::clone(&storage.checkpoints),
            Arc::clone(&storage.history),
            Arc::clone(&storage.identity),
        )
        .with_settings(settings),
    );
    Fixture {
        store,
        storage,
        service,
    }
}

pub fn fixture() -> Fixture {
    fixture_with(QuizSettings::default())
}

pub fn topic() -> Topic {
    Topic::new("Rust").unwrap()
}

pub fn q(id: u64) -> QuestionId {
    QuestionId::new(id)
}

pub async fn sign_in(storage: &Storage) -> Identity {
    let identity = Identity {
        id: UserId::new(2),
        username: "user".into(),
        email: "user@example.com".into(),
        role: Role::User,
    };
    storage.identity.set_current_identity(&identity).await.unwrap();
    identity
}
