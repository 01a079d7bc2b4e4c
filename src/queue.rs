use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::models::{CardProgress, StudyMode};

/// Keeps the due cards and orders them unmastered first, then by due date.
///
/// Never-studied cards have no due date and sort ahead of every dated card
/// in their group. The sort is stable, so ties keep catalog order.
pub fn due_cards(cards: Vec<CardProgress>, now: DateTime<Utc>) -> Vec<CardProgress> {
    let mut due: Vec<CardProgress> = cards.into_iter().filter(|c| c.is_due(now)).collect();
    due.sort_by(|a, b| {
        a.is_mastered()
            .cmp(&b.is_mastered())
            .then_with(|| a.next_review_date().cmp(&b.next_review_date()))
    });
    due
}

/// Builds a study batch from every card in scope.
///
/// `Spaced` returns the due cards in priority order; `Random` skips due
/// filtering and shuffles the whole scope.
pub fn study_queue<R: Rng + ?Sized>(
    cards: Vec<CardProgress>,
    mode: StudyMode,
    limit: Option<usize>,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Vec<CardProgress> {
    let mut queue = match mode {
        StudyMode::Spaced => due_cards(cards, now),
        StudyMode::Random => {
            let mut all = cards;
            all.shuffle(rng);
            all
        }
    };

    if let Some(limit) = limit {
        queue.truncate(limit);
    }
    queue
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
