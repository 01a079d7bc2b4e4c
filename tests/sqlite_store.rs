use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use flashcard_srs::{
    EngineError, Flashcard, FlashcardId, FolderId, LearningEngine, MasteryPolicy, ProgressStore,
    Scope, SetId, SqliteStore, UserId,
};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 2, 1, 7, 30, 0).unwrap()
}

fn user() -> UserId {
    UserId::from("u-1")
}

async fn seeded_store() -> SqliteStore {
    let store = SqliteStore::in_memory().await.unwrap();
    for (id, set, position) in [("a", "s1", 0), ("b", "s1", 1), ("c", "s2", 0), ("d", "s3", 0)] {
        store
            .insert_flashcard(&Flashcard {
                id: FlashcardId::from(id),
                set_id: SetId::from(set),
                front: format!("front {}", id),
                back: format!("back {}", id),
                position,
            })
            .await
            .unwrap();
    }
    store.link_set(&FolderId::from("f1"), &SetId::from("s1")).await.unwrap();
    store.link_set(&FolderId::from("f1"), &SetId::from("s2")).await.unwrap();
    // Linking twice is harmless.
    store.link_set(&FolderId::from("f1"), &SetId::from("s2")).await.unwrap();
    store
}

#[tokio::test]
async fn test_answers_round_trip_through_sqlite() {
    let engine = LearningEngine::new(seeded_store().await, MasteryPolicy::default());
    let id = FlashcardId::from("a");

    let mut last = None;
    for day in 0..7 {
        last = Some(
            engine
                .record_answer_at(&user(), &id, true, t0() + Duration::days(day))
                .await
                .unwrap(),
        );
    }
    let last = last.unwrap();
    assert_eq!(last.repetitions, 7);
    assert_eq!(last.interval_days, 180);
    assert_eq!(last.ease_factor, 3.0);
    assert!(last.is_mastered);

    let stored = engine.progress(&user(), &id).await.unwrap().unwrap();
    assert_eq!(stored, last);
    assert_eq!(stored.next_review_date, t0() + Duration::days(6 + 180));
}

#[tokio::test]
async fn test_incorrect_answer_in_sqlite_keeps_mastery() {
    let engine = LearningEngine::new(seeded_store().await, MasteryPolicy::default());
    let id = FlashcardId::from("b");

    for _ in 0..4 {
        engine.record_answer_at(&user(), &id, true, t0()).await.unwrap();
    }
    let p = engine.record_answer_at(&user(), &id, false, t0()).await.unwrap();

    assert_eq!((p.repetitions, p.consecutive_correct, p.interval_days), (0, 0, 0));
    assert!(p.is_mastered);
    assert_eq!(p.ease_factor, 2.7);

    let stored = engine.progress(&user(), &id).await.unwrap().unwrap();
    assert!(stored.is_mastered);
    assert_eq!(stored.next_review_date, t0());
}

#[tokio::test]
async fn test_unknown_card_rolls_back() {
    let engine = LearningEngine::new(seeded_store().await, MasteryPolicy::default());
    let missing = FlashcardId::from("zzz");

    let err = engine.record_answer_at(&user(), &missing, true, t0()).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
    assert!(engine.progress(&user(), &missing).await.unwrap().is_none());
}

#[tokio::test]
async fn test_scope_queries() {
    let engine = LearningEngine::new(seeded_store().await, MasteryPolicy::default());
    engine
        .record_answer_at(&user(), &FlashcardId::from("a"), true, t0())
        .await
        .unwrap();
    engine
        .record_answer_at(&user(), &FlashcardId::from("c"), false, t0() - Duration::hours(1))
        .await
        .unwrap();
    engine
        .record_answer_at(&user(), &FlashcardId::from("d"), false, t0())
        .await
        .unwrap();

    let folder = Scope::Folder(FolderId::from("f1"));
    let due = engine.due_flashcards_at(&user(), &folder, t0()).await.unwrap();
    let ids: Vec<&str> = due.iter().map(|c| c.flashcard.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "c"]);
    assert_eq!(due[0].flashcard.front, "front b");

    let stats = engine.progress_stats_at(&user(), &folder, t0()).await.unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.learned, 2);
    assert_eq!(stats.learning, 2);
    assert_eq!(stats.new, 1);
    assert_eq!(stats.due, 2);

    let set = Scope::Set(SetId::from("s1"));
    let cards = engine.store().flashcards_in_scope(&user(), &set).await.unwrap();
    let ids: Vec<&str> = cards.iter().map(|c| c.flashcard.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert!(cards[0].progress.is_some());
    assert!(cards[1].progress.is_none());

    let empty = Scope::Set(SetId::from("unknown"));
    let stats = engine.progress_stats_at(&user(), &empty, t0()).await.unwrap();
    assert_eq!(stats.total, 0);
}

#[tokio::test]
async fn test_resets() {
    let engine = LearningEngine::new(seeded_store().await, MasteryPolicy::default());
    for id in ["a", "b", "c", "d"] {
        engine
            .record_answer_at(&user(), &FlashcardId::from(id), true, t0())
            .await
            .unwrap();
    }
    let other = UserId::from("u-2");
    engine
        .record_answer_at(&other, &FlashcardId::from("a"), true, t0())
        .await
        .unwrap();

    engine.reset_progress(&user(), &FlashcardId::from("d")).await.unwrap();
    assert!(engine.progress(&user(), &FlashcardId::from("d")).await.unwrap().is_none());

    let deleted = engine
        .reset_scope(&user(), &Scope::Folder(FolderId::from("f1")))
        .await
        .unwrap();
    assert_eq!(deleted, 3);

    // Other users keep their records.
    assert!(engine.progress(&other, &FlashcardId::from("a")).await.unwrap().is_some());
}

#[tokio::test]
async fn test_add_flashcard_appends_to_set() {
    let store = seeded_store().await;
    let card = store
        .add_flashcard(&SetId::from("s1"), "new front".to_string(), "new back".to_string())
        .await
        .unwrap();
    assert_eq!(card.position, 2);

    let cards = store
        .flashcards_in_scope(&user(), &Scope::Set(SetId::from("s1")))
        .await
        .unwrap();
    assert_eq!(cards.len(), 3);
    assert_eq!(cards[2].flashcard, card);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_answers_on_file_database() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("progress.db").display());
    let store = SqliteStore::connect(&url).await.unwrap();
    store
        .insert_flashcard(&Flashcard {
            id: FlashcardId::from("hot"),
            set_id: SetId::from("s1"),
            front: "front".to_string(),
            back: "back".to_string(),
            position: 0,
        })
        .await
        .unwrap();

    let engine = Arc::new(LearningEngine::new(store, MasteryPolicy::default()));
    let answers = 20;
    let handles: Vec<_> = (0..answers)
        .map(|_| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                let id = FlashcardId::from("hot");
                engine.record_answer_at(&user(), &id, true, t0()).await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stored = engine
        .progress(&user(), &FlashcardId::from("hot"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.repetitions, answers);
    assert_eq!(stored.consecutive_correct, answers);
    assert!(stored.is_mastered);
    assert_eq!(stored.ease_factor, 3.0);
}
