use quiz_core::model::{Checkpoint, HistoryRecord, QuestionId, Topic};
use quiz_core::time::fixed_now;
use storage::repository::{CheckpointRepository, HistoryRepository, KeyValueStore};
use storage::sqlite::SqliteRepository;
use storage::Storage;

#[tokio::test]
async fn sqlite_kv_upserts_and_removes() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_kv?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");
    // migrations are idempotent
    repo.migrate().await.expect("migrate twice");

    assert_eq!(repo.get("missing").await.unwrap(), None);
    repo.set("k", "\"a\"".into()).await.unwrap();
    repo.set("k", "\"b\"".into()).await.unwrap();
    assert_eq!(repo.get("k").await.unwrap().as_deref(), Some("\"b\""));

    repo.remove("k").await.unwrap();
    repo.remove("k").await.unwrap();
    assert_eq!(repo.get("k").await.unwrap(), None);
}

#[tokio::test]
async fn sqlite_storage_persists_checkpoint_and_history() {
    let storage = Storage::sqlite("sqlite:file:memdb_storage?mode=memory&cache=shared")
        .await
        .expect("storage");
    let topic = Topic::new("DBMS").unwrap();

    let mut checkpoint = Checkpoint {
        current_question_index: 2,
        score: 1,
        ..Checkpoint::default()
    };
    checkpoint
        .selected_options
        .insert(QuestionId::new(1), "Atomicity".into());
    checkpoint.answered_questions.insert(QuestionId::new(1));
    storage
        .checkpoints
        .write_checkpoint(&topic, &checkpoint)
        .await
        .unwrap();
    assert_eq!(
        storage.checkpoints.read_checkpoint(&topic).await.unwrap(),
        Some(checkpoint)
    );

    let record = HistoryRecord {
        username: "user".into(),
        topic: topic.to_string(),
        score: 1,
        total_questions: 3,
        percentage: 33,
        time_taken: 41.25,
        date: fixed_now(),
    };
    storage.history.append_record(&record).await.unwrap();
    assert_eq!(storage.history.list_records().await.unwrap(), vec![record]);
}
