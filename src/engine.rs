use chrono::{DateTime, Utc};

use crate::error::{EngineError, Result};
use crate::models::{
    CardProgress, FlashcardId, LearningProgress, ProgressStats, Scope, StudyMode, UserId,
};
use crate::payload::{AnswerRequest, DueQuery, ResetRequest, StatsQuery};
use crate::queue;
use crate::srs::{Answer, MasteryPolicy};
use crate::stats;
use crate::store::ProgressStore;

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(EngineError::InvalidInput(format!("{} is required", field)));
    }
    Ok(())
}

fn require_scope(scope: &Scope) -> Result<()> {
    match scope {
        Scope::Set(id) => require("set id", id.as_str()),
        Scope::Folder(id) => require("folder id", id.as_str()),
    }
}

/// Records answers and answers due/statistics queries for one store.
///
/// Holds no state besides the store handle and the mastery policy; callers
/// are expected to have authorized the user and flashcard identifiers.
pub struct LearningEngine<S> {
    store: S,
    policy: MasteryPolicy,
}

impl<S: ProgressStore> LearningEngine<S> {
    pub fn new(store: S, policy: MasteryPolicy) -> Self {
        log::info!(
            "Learning engine ready: mastery after {} consecutive correct, reset on incorrect: {}",
            policy.threshold,
            policy.reset_on_incorrect
        );
        Self { store, policy }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn policy(&self) -> MasteryPolicy {
        self.policy
    }

    pub async fn record_answer(
        &self,
        user_id: &UserId,
        flashcard_id: &FlashcardId,
        is_correct: bool,
    ) -> Result<LearningProgress> {
        self.record_answer_at(user_id, flashcard_id, is_correct, Utc::now())
            .await
    }

    pub async fn record_answer_at(
        &self,
        user_id: &UserId,
        flashcard_id: &FlashcardId,
        is_correct: bool,
        now: DateTime<Utc>,
    ) -> Result<LearningProgress> {
        require("user id", user_id.as_str())?;
        require("flashcardId", flashcard_id.as_str())?;

        let answer = Answer {
            is_correct,
            answered_at: now,
            policy: self.policy,
        };
        let progress = self.store.record_answer(user_id, flashcard_id, &answer).await?;

        log::debug!(
            "user {} answered {} ({}): repetitions={} interval={}d ease={:.2} mastered={}",
            user_id,
            flashcard_id,
            if is_correct { "correct" } else { "incorrect" },
            progress.repetitions,
            progress.interval_days,
            progress.ease_factor,
            progress.is_mastered
        );

        Ok(progress)
    }

    /// Handles a validated `answer` payload.
    pub async fn submit(
        &self,
        user_id: &UserId,
        request: &AnswerRequest,
    ) -> Result<LearningProgress> {
        self.record_answer(user_id, &request.flashcard_id, request.is_correct)
            .await
    }

    pub async fn progress(
        &self,
        user_id: &UserId,
        flashcard_id: &FlashcardId,
    ) -> Result<Option<LearningProgress>> {
        require("user id", user_id.as_str())?;
        require("flashcardId", flashcard_id.as_str())?;
        self.store.progress(user_id, flashcard_id).await
    }

    pub async fn due_flashcards(
        &self,
        user_id: &UserId,
        scope: &Scope,
    ) -> Result<Vec<CardProgress>> {
        self.due_flashcards_at(user_id, scope, Utc::now()).await
    }

    pub async fn due_flashcards_at(
        &self,
        user_id: &UserId,
        scope: &Scope,
        now: DateTime<Utc>,
    ) -> Result<Vec<CardProgress>> {
        require("user id", user_id.as_str())?;
        require_scope(scope)?;
        let cards = self.store.flashcards_in_scope(user_id, scope).await?;
        Ok(queue::due_cards(cards, now))
    }

    /// Cards for a study session. See [`queue::study_queue`].
    pub async fn study_queue(
        &self,
        user_id: &UserId,
        scope: &Scope,
        mode: StudyMode,
        limit: Option<usize>,
    ) -> Result<Vec<CardProgress>> {
        require("user id", user_id.as_str())?;
        require_scope(scope)?;
        let cards = self.store.flashcards_in_scope(user_id, scope).await?;

        let mut rng = rand::thread_rng();
        let queue = queue::study_queue(cards, mode, limit, Utc::now(), &mut rng);
        log::debug!("{} {:?} queue for user {}: {} cards", scope, mode, user_id, queue.len());
        Ok(queue)
    }

    pub async fn due_query(&self, user_id: &UserId, query: &DueQuery) -> Result<Vec<CardProgress>> {
        let scope = query.scope()?;
        self.study_queue(user_id, &scope, query.mode, query.limit).await
    }

    pub async fn count_due(&self, user_id: &UserId, scope: &Scope) -> Result<usize> {
        Ok(self.due_flashcards(user_id, scope).await?.len())
    }

    pub async fn progress_stats(&self, user_id: &UserId, scope: &Scope) -> Result<ProgressStats> {
        self.progress_stats_at(user_id, scope, Utc::now()).await
    }

    pub async fn progress_stats_at(
        &self,
        user_id: &UserId,
        scope: &Scope,
        now: DateTime<Utc>,
    ) -> Result<ProgressStats> {
        require("user id", user_id.as_str())?;
        require_scope(scope)?;
        let cards = self.store.flashcards_in_scope(user_id, scope).await?;
        Ok(stats::progress_stats(&cards, now))
    }

    pub async fn stats_query(&self, user_id: &UserId, query: &StatsQuery) -> Result<ProgressStats> {
        let scope = query.scope()?;
        self.progress_stats(user_id, &scope).await
    }

    /// Forgets the user's progress on one card, making it new again.
    pub async fn reset_progress(&self, user_id: &UserId, flashcard_id: &FlashcardId) -> Result<()> {
        require("user id", user_id.as_str())?;
        require("flashcardId", flashcard_id.as_str())?;

        if self.store.delete_progress(user_id, flashcard_id).await? {
            log::info!("Reset progress of user {} on {}", user_id, flashcard_id);
        }
        Ok(())
    }

    pub async fn reset(&self, user_id: &UserId, request: &ResetRequest) -> Result<()> {
        self.reset_progress(user_id, &request.flashcard_id).await
    }

    /// Forgets the user's progress on every card of a set or folder.
    pub async fn reset_scope(&self, user_id: &UserId, scope: &Scope) -> Result<u64> {
        require("user id", user_id.as_str())?;
        require_scope(scope)?;

        let deleted = self.store.delete_progress_in_scope(user_id, scope).await?;
        log::info!("Reset {} progress records of user {} in {}", deleted, user_id, scope);
        Ok(deleted)
    }
}
