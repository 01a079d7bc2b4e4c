use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

string_id!(
    /// Opaque user identifier, authorized by the caller.
    UserId
);
string_id!(FlashcardId);
string_id!(SetId);
string_id!(FolderId);

/// A flashcard as seen by the engine. Content is carried for study views only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Flashcard {
    pub id: FlashcardId,
    pub set_id: SetId,
    pub front: String,
    pub back: String,
    pub position: i64,
}

/// Spaced repetition state of one flashcard for one user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LearningProgress {
    pub user_id: UserId,
    pub flashcard_id: FlashcardId,
    pub ease_factor: f64,
    pub interval_days: u32,
    pub repetitions: u32,
    pub consecutive_correct: u32,
    pub next_review_date: DateTime<Utc>,
    pub last_review_date: DateTime<Utc>,
    pub is_mastered: bool,
}

impl LearningProgress {
    pub fn new(user_id: UserId, flashcard_id: FlashcardId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            flashcard_id,
            ease_factor: crate::srs::DEFAULT_EASE_FACTOR,
            interval_days: 0,
            repetitions: 0,
            consecutive_correct: 0,
            next_review_date: now,
            last_review_date: now,
            is_mastered: false,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_date <= now
    }
}

/// A flashcard joined with the user's progress on it, `None` when never studied.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CardProgress {
    pub flashcard: Flashcard,
    pub progress: Option<LearningProgress>,
}

impl CardProgress {
    pub fn is_new(&self) -> bool {
        self.progress.is_none()
    }

    pub fn is_mastered(&self) -> bool {
        self.progress.as_ref().map_or(false, |p| p.is_mastered)
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match &self.progress {
            None => true,
            Some(p) => p.is_due(now),
        }
    }

    /// Due date used for ordering; never-studied cards sort first.
    pub fn next_review_date(&self) -> Option<DateTime<Utc>> {
        self.progress.as_ref().map(|p| p.next_review_date)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", content = "id", rename_all = "lowercase")]
pub enum Scope {
    Set(SetId),
    /// Every set linked to the folder.
    Folder(FolderId),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Set(id) => write!(f, "set:{}", id),
            Scope::Folder(id) => write!(f, "folder:{}", id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudyMode {
    /// Only due cards, most urgent first.
    #[default]
    Spaced,
    /// Every card in scope, shuffled.
    Random,
}

/// Per-scope counters.
///
/// `learned` counts cards that have a progress record at all, not mastered
/// cards; `mastered` carries the latter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressStats {
    pub total: usize,
    pub learned: usize,
    pub learning: usize,
    pub new: usize,
    pub mastered: usize,
    pub due: usize,
}
