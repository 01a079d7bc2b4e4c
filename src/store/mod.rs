//! Persistence for learning progress.
//!
//! Stores also answer catalog joins (which flashcards a set or folder holds),
//! so due filtering and statistics stay independent of the backend.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{CardProgress, FlashcardId, LearningProgress, Scope, UserId};
use crate::srs::Answer;

#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Reads the current record, applies `answer` through
    /// [`crate::srs::apply_answer`] and persists the result as one atomic step.
    ///
    /// Fails with `NotFound` when the flashcard is not in the catalog.
    async fn record_answer(
        &self,
        user_id: &UserId,
        flashcard_id: &FlashcardId,
        answer: &Answer,
    ) -> Result<LearningProgress>;

    async fn progress(
        &self,
        user_id: &UserId,
        flashcard_id: &FlashcardId,
    ) -> Result<Option<LearningProgress>>;

    /// Every flashcard in scope, in catalog order, with the user's progress.
    async fn flashcards_in_scope(&self, user_id: &UserId, scope: &Scope)
        -> Result<Vec<CardProgress>>;

    /// Returns whether a record existed.
    async fn delete_progress(&self, user_id: &UserId, flashcard_id: &FlashcardId)
        -> Result<bool>;

    /// Returns the number of records deleted.
    async fn delete_progress_in_scope(&self, user_id: &UserId, scope: &Scope) -> Result<u64>;
}
