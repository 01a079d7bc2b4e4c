use chrono::{DateTime, Utc};

use crate::models::{CardProgress, ProgressStats};

/// Aggregates counters for the cards of one scope.
pub fn progress_stats(cards: &[CardProgress], now: DateTime<Utc>) -> ProgressStats {
    let mut stats = ProgressStats {
        total: cards.len(),
        ..Default::default()
    };

    for card in cards {
        match &card.progress {
            None => stats.due += 1,
            Some(p) => {
                stats.learned += 1;
                if p.is_mastered {
                    stats.mastered += 1;
                } else {
                    stats.learning += 1;
                }
                if p.is_due(now) {
                    stats.due += 1;
                }
            }
        }
    }

    stats.new = stats.total - stats.learned;
    stats
}
