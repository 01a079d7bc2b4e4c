use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use tokio::sync::Mutex;

use super::ProgressStore;
use crate::error::{EngineError, Result};
use crate::models::{
    CardProgress, Flashcard, FlashcardId, FolderId, LearningProgress, Scope, SetId, UserId,
};
use crate::srs::{self, Answer};

#[derive(Default)]
struct Inner {
    flashcards: HashMap<FlashcardId, Flashcard>,
    folder_sets: BTreeSet<(FolderId, SetId)>,
    progress: HashMap<(UserId, FlashcardId), LearningProgress>,
}

impl Inner {
    fn in_scope(&self, scope: &Scope) -> Vec<&Flashcard> {
        let mut cards: Vec<&Flashcard> = match scope {
            Scope::Set(set_id) => self
                .flashcards
                .values()
                .filter(|c| &c.set_id == set_id)
                .collect(),
            Scope::Folder(folder_id) => self
                .flashcards
                .values()
                .filter(|c| {
                    self.folder_sets
                        .contains(&(folder_id.clone(), c.set_id.clone()))
                })
                .collect(),
        };
        cards.sort_by(|a, b| {
            (&a.set_id, a.position, &a.id).cmp(&(&b.set_id, b.position, &b.id))
        });
        cards
    }
}

/// In-process store. One lock guards the whole state, so every answer is a
/// single atomic read-modify-write.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_flashcard(&self, card: Flashcard) {
        let mut inner = self.inner.lock().await;
        inner.flashcards.insert(card.id.clone(), card);
    }

    pub async fn link_set(&self, folder_id: &FolderId, set_id: &SetId) {
        let mut inner = self.inner.lock().await;
        inner.folder_sets.insert((folder_id.clone(), set_id.clone()));
    }

    /// Overwrites a record directly, bypassing the transition rules.
    pub async fn put_progress(&self, progress: LearningProgress) {
        let mut inner = self.inner.lock().await;
        let key = (progress.user_id.clone(), progress.flashcard_id.clone());
        inner.progress.insert(key, progress);
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn record_answer(
        &self,
        user_id: &UserId,
        flashcard_id: &FlashcardId,
        answer: &Answer,
    ) -> Result<LearningProgress> {
        let mut inner = self.inner.lock().await;

        if !inner.flashcards.contains_key(flashcard_id) {
            return Err(EngineError::NotFound(flashcard_id.to_string()));
        }

        let key = (user_id.clone(), flashcard_id.clone());
        let progress = srs::apply_answer(inner.progress.get(&key), user_id, flashcard_id, answer);
        inner.progress.insert(key, progress.clone());

        Ok(progress)
    }

    async fn progress(
        &self,
        user_id: &UserId,
        flashcard_id: &FlashcardId,
    ) -> Result<Option<LearningProgress>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .progress
            .get(&(user_id.clone(), flashcard_id.clone()))
            .cloned())
    }

    async fn flashcards_in_scope(
        &self,
        user_id: &UserId,
        scope: &Scope,
    ) -> Result<Vec<CardProgress>> {
        let inner = self.inner.lock().await;
        let cards = inner
            .in_scope(scope)
            .into_iter()
            .map(|card| CardProgress {
                flashcard: card.clone(),
                progress: inner
                    .progress
                    .get(&(user_id.clone(), card.id.clone()))
                    .cloned(),
            })
            .collect();
        Ok(cards)
    }

    async fn delete_progress(
        &self,
        user_id: &UserId,
        flashcard_id: &FlashcardId,
    ) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        Ok(inner
            .progress
            .remove(&(user_id.clone(), flashcard_id.clone()))
            .is_some())
    }

    async fn delete_progress_in_scope(&self, user_id: &UserId, scope: &Scope) -> Result<u64> {
        let mut inner = self.inner.lock().await;
        let ids: Vec<FlashcardId> = inner
            .in_scope(scope)
            .into_iter()
            .map(|c| c.id.clone())
            .collect();

        let mut deleted = 0;
        for id in ids {
            if inner.progress.remove(&(user_id.clone(), id)).is_some() {
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}
