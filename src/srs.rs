use crate::models::{FlashcardId, LearningProgress, UserId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_EASE_FACTOR: f64 = 2.5;
pub const MIN_EASE_FACTOR: f64 = 1.3;
pub const MAX_EASE_FACTOR: f64 = 3.0;
pub const EASE_BONUS: f64 = 0.1;
pub const EASE_PENALTY: f64 = 0.2;
pub const DEFAULT_MASTERY_THRESHOLD: u32 = 4;

/// Intervals (days) for the first six consecutive correct answers.
const INTERVAL_TABLE: [u32; 6] = [1, 3, 7, 15, 30, 60];

/// How the mastery flag is set and cleared.
///
/// The default marks a card mastered after four consecutive correct answers
/// and keeps the flag through later lapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasteryPolicy {
    pub threshold: u32,
    pub reset_on_incorrect: bool,
}

impl Default for MasteryPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_MASTERY_THRESHOLD,
            reset_on_incorrect: false,
        }
    }
}

/// One graded answer, as handed to the store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Answer {
    pub is_correct: bool,
    pub answered_at: DateTime<Utc>,
    pub policy: MasteryPolicy,
}

/// Interval for the given (already incremented) repetition count.
pub fn interval_for(repetitions: u32, previous_interval: u32, ease_factor: f64) -> u32 {
    match repetitions {
        0 => 0,
        1..=6 => INTERVAL_TABLE[(repetitions - 1) as usize],
        // Float-to-int casts saturate, so runaway intervals cap at u32::MAX.
        _ => (previous_interval as f64 * ease_factor).round() as u32,
    }
}

// Two decimals keep repeated +0.1/-0.2 steps from drifting. Both bounds
// apply on every step, so out-of-range stored rows are pulled back in.
fn clamp_ease(ease: f64) -> f64 {
    ((ease * 100.0).round() / 100.0).clamp(MIN_EASE_FACTOR, MAX_EASE_FACTOR)
}

fn review_date(now: DateTime<Utc>, interval_days: u32) -> DateTime<Utc> {
    now.checked_add_signed(Duration::days(i64::from(interval_days)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Computes the progress record that results from `answer`.
///
/// `previous` is `None` for a card the user has never answered.
pub fn apply_answer(
    previous: Option<&LearningProgress>,
    user_id: &UserId,
    flashcard_id: &FlashcardId,
    answer: &Answer,
) -> LearningProgress {
    let now = answer.answered_at;

    let mut progress = match previous {
        Some(p) => p.clone(),
        // A miss on a never-studied card carries no ease penalty.
        None if !answer.is_correct => {
            return LearningProgress::new(user_id.clone(), flashcard_id.clone(), now)
        }
        None => LearningProgress::new(user_id.clone(), flashcard_id.clone(), now),
    };

    if answer.is_correct {
        progress.consecutive_correct += 1;
        progress.repetitions += 1;
        progress.interval_days =
            interval_for(progress.repetitions, progress.interval_days, progress.ease_factor);
        progress.ease_factor = clamp_ease(progress.ease_factor + EASE_BONUS);

        if progress.consecutive_correct >= answer.policy.threshold {
            progress.is_mastered = true;
        }
    } else {
        progress.consecutive_correct = 0;
        progress.repetitions = 0;
        progress.interval_days = 0;
        progress.ease_factor = clamp_ease(progress.ease_factor - EASE_PENALTY);

        if answer.policy.reset_on_incorrect {
            progress.is_mastered = false;
        }
    }

    progress.last_review_date = now;
    progress.next_review_date = review_date(now, progress.interval_days);

    progress
}

#[cfg(test)]
#[path = "srs_tests.rs"]
mod tests;
