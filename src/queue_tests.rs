use super::*;
use crate::models::{Flashcard, FlashcardId, LearningProgress, SetId, UserId};
use chrono::{Duration, TimeZone};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap()
}

fn card(id: &str, position: i64) -> Flashcard {
    Flashcard {
        id: FlashcardId::from(id),
        set_id: SetId::from("s1"),
        front: format!("front {}", id),
        back: format!("back {}", id),
        position,
    }
}

fn fresh(id: &str, position: i64) -> CardProgress {
    CardProgress {
        flashcard: card(id, position),
        progress: None,
    }
}

fn studied(id: &str, position: i64, due_in_hours: i64, mastered: bool) -> CardProgress {
    let mut p = LearningProgress::new(UserId::from("u1"), FlashcardId::from(id), now());
    p.next_review_date = now() + Duration::hours(due_in_hours);
    p.is_mastered = mastered;
    CardProgress {
        flashcard: card(id, position),
        progress: Some(p),
    }
}

fn ids(cards: &[CardProgress]) -> Vec<&str> {
    cards.iter().map(|c| c.flashcard.id.as_str()).collect()
}

#[test]
fn test_new_cards_are_always_due() {
    let due = due_cards(vec![fresh("a", 0), fresh("b", 1)], now());
    assert_eq!(ids(&due), vec!["a", "b"]);
}

#[test]
fn test_future_cards_are_excluded() {
    let cards = vec![
        studied("past", 0, -1, false),
        studied("future", 1, 1, false),
        studied("exact", 2, 0, false),
    ];
    let due = due_cards(cards, now());
    assert_eq!(ids(&due), vec!["past", "exact"]);
}

#[test]
fn test_due_ordering() {
    let cards = vec![
        studied("mastered_old", 0, -48, true),
        studied("recent", 1, -1, false),
        fresh("new", 2),
        studied("old", 3, -24, false),
        studied("mastered_recent", 4, -2, true),
    ];
    let due = due_cards(cards, now());
    assert_eq!(
        ids(&due),
        vec!["new", "old", "recent", "mastered_old", "mastered_recent"]
    );
}

#[test]
fn test_spaced_queue_respects_limit() {
    let cards = vec![fresh("a", 0), fresh("b", 1), fresh("c", 2)];
    let mut rng = StdRng::seed_from_u64(7);
    let queue = study_queue(cards, StudyMode::Spaced, Some(2), now(), &mut rng);
    assert_eq!(ids(&queue), vec!["a", "b"]);
}

#[test]
fn test_random_queue_includes_cards_not_due() {
    let cards = vec![
        studied("future", 0, 72, true),
        fresh("new", 1),
        studied("due", 2, -1, false),
    ];
    let mut rng = StdRng::seed_from_u64(42);
    let queue = study_queue(cards, StudyMode::Random, None, now(), &mut rng);

    let mut got = ids(&queue);
    got.sort();
    assert_eq!(got, vec!["due", "future", "new"]);
}
