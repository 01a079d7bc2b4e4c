use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{
        SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
    },
    ConnectOptions, Pool, Row, Sqlite,
};
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

use super::ProgressStore;
use crate::error::{EngineError, Result};
use crate::models::{
    CardProgress, Flashcard, FlashcardId, FolderId, LearningProgress, Scope, SetId, UserId,
};
use crate::srs::{self, Answer};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS flashcards (
        id TEXT PRIMARY KEY,
        set_id TEXT NOT NULL,
        front TEXT NOT NULL,
        back TEXT NOT NULL,
        position INTEGER NOT NULL DEFAULT 0
    );
    "#,
    "CREATE INDEX IF NOT EXISTS idx_flashcards_set ON flashcards (set_id, position)",
    r#"
    CREATE TABLE IF NOT EXISTS folder_sets (
        folder_id TEXT NOT NULL,
        set_id TEXT NOT NULL,
        PRIMARY KEY (folder_id, set_id)
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS learning_progress (
        user_id TEXT NOT NULL,
        flashcard_id TEXT NOT NULL REFERENCES flashcards (id) ON DELETE CASCADE,
        ease_factor REAL NOT NULL DEFAULT 2.5,
        interval_days INTEGER NOT NULL DEFAULT 0,
        repetitions INTEGER NOT NULL DEFAULT 0,
        consecutive_correct INTEGER NOT NULL DEFAULT 0,
        next_review_date DATETIME,
        last_review_date DATETIME NOT NULL,
        is_mastered BOOLEAN NOT NULL DEFAULT 0,
        PRIMARY KEY (user_id, flashcard_id)
    );
    "#,
];

// Flashcard columns first, progress columns NULL when the user never answered.
const SCOPE_COLUMNS: &str = r#"
    f.id AS card_id, f.set_id, f.front, f.back, f.position,
    p.user_id, p.ease_factor, p.interval_days, p.repetitions, p.consecutive_correct,
    p.next_review_date, p.last_review_date, p.is_mastered
"#;

fn to_u32(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

fn decode_progress(
    row: &SqliteRow,
    flashcard_id: FlashcardId,
) -> std::result::Result<LearningProgress, sqlx::Error> {
    let user_id: String = row.try_get("user_id")?;
    let last_review_date: DateTime<Utc> = row.try_get("last_review_date")?;
    let next_review_date: Option<DateTime<Utc>> = row.try_get("next_review_date")?;

    Ok(LearningProgress {
        user_id: UserId(user_id),
        flashcard_id,
        ease_factor: row.try_get("ease_factor")?,
        interval_days: to_u32(row.try_get("interval_days")?),
        repetitions: to_u32(row.try_get("repetitions")?),
        consecutive_correct: to_u32(row.try_get("consecutive_correct")?),
        next_review_date: next_review_date.unwrap_or(last_review_date),
        last_review_date,
        is_mastered: row.try_get("is_mastered")?,
    })
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for LearningProgress {
    fn from_row(row: &'r SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        let flashcard_id: String = row.try_get("flashcard_id")?;
        decode_progress(row, FlashcardId(flashcard_id))
    }
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for CardProgress {
    fn from_row(row: &'r SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        let flashcard = Flashcard {
            id: FlashcardId(row.try_get("card_id")?),
            set_id: SetId(row.try_get("set_id")?),
            front: row.try_get("front")?,
            back: row.try_get("back")?,
            position: row.try_get("position")?,
        };

        let user_id: Option<String> = row.try_get("user_id")?;
        let progress = match user_id {
            Some(_) => Some(decode_progress(row, flashcard.id.clone())?),
            None => None,
        };

        Ok(CardProgress { flashcard, progress })
    }
}

/// SQLite-backed store. Cloning shares the pool.
#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5))
            .foreign_keys(true)
            .log_statements(log::LevelFilter::Trace);

        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        log::info!("Opened progress database at {}", database_url);

        let store = SqliteStore { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Private in-memory database; a single connection keeps it alive.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?
            .foreign_keys(true)
            .log_statements(log::LevelFilter::Trace);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = SqliteStore { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Inserts or replaces a catalog entry.
    pub async fn insert_flashcard(&self, card: &Flashcard) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO flashcards (id, set_id, front, back, position)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                set_id = excluded.set_id,
                front = excluded.front,
                back = excluded.back,
                position = excluded.position
            "#,
        )
        .bind(card.id.as_str())
        .bind(card.set_id.as_str())
        .bind(&card.front)
        .bind(&card.back)
        .bind(card.position)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Appends a new flashcard to the end of a set.
    pub async fn add_flashcard(
        &self,
        set_id: &SetId,
        front: String,
        back: String,
    ) -> Result<Flashcard> {
        let position: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM flashcards WHERE set_id = ?",
        )
        .bind(set_id.as_str())
        .fetch_one(&self.pool)
        .await?;

        let card = Flashcard {
            id: FlashcardId(Uuid::new_v4().to_string()),
            set_id: set_id.clone(),
            front,
            back,
            position,
        };
        self.insert_flashcard(&card).await?;
        Ok(card)
    }

    pub async fn link_set(&self, folder_id: &FolderId, set_id: &SetId) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO folder_sets (folder_id, set_id) VALUES (?, ?)")
            .bind(folder_id.as_str())
            .bind(set_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ProgressStore for SqliteStore {
    async fn record_answer(
        &self,
        user_id: &UserId,
        flashcard_id: &FlashcardId,
        answer: &Answer,
    ) -> Result<LearningProgress> {
        let mut tx = self.pool.begin().await?;

        // Take the write lock before reading so concurrent answers for the
        // same card serialize instead of losing an update.
        sqlx::query(
            "UPDATE learning_progress SET user_id = user_id WHERE user_id = ? AND flashcard_id = ?",
        )
        .bind(user_id.as_str())
        .bind(flashcard_id.as_str())
        .execute(&mut *tx)
        .await?;

        let known: Option<i64> = sqlx::query_scalar("SELECT 1 FROM flashcards WHERE id = ?")
            .bind(flashcard_id.as_str())
            .fetch_optional(&mut *tx)
            .await?;
        if known.is_none() {
            return Err(EngineError::NotFound(flashcard_id.to_string()));
        }

        let previous = sqlx::query_as::<_, LearningProgress>(
            "SELECT * FROM learning_progress WHERE user_id = ? AND flashcard_id = ?",
        )
        .bind(user_id.as_str())
        .bind(flashcard_id.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let progress = srs::apply_answer(previous.as_ref(), user_id, flashcard_id, answer);

        sqlx::query(
            r#"
            INSERT INTO learning_progress (
                user_id, flashcard_id, ease_factor, interval_days, repetitions,
                consecutive_correct, next_review_date, last_review_date, is_mastered
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (user_id, flashcard_id) DO UPDATE SET
                ease_factor = excluded.ease_factor,
                interval_days = excluded.interval_days,
                repetitions = excluded.repetitions,
                consecutive_correct = excluded.consecutive_correct,
                next_review_date = excluded.next_review_date,
                last_review_date = excluded.last_review_date,
                is_mastered = excluded.is_mastered
            "#,
        )
        .bind(progress.user_id.as_str())
        .bind(progress.flashcard_id.as_str())
        .bind(progress.ease_factor)
        .bind(i64::from(progress.interval_days))
        .bind(i64::from(progress.repetitions))
        .bind(i64::from(progress.consecutive_correct))
        .bind(progress.next_review_date)
        .bind(progress.last_review_date)
        .bind(progress.is_mastered)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(progress)
    }

    async fn progress(
        &self,
        user_id: &UserId,
        flashcard_id: &FlashcardId,
    ) -> Result<Option<LearningProgress>> {
        let progress = sqlx::query_as::<_, LearningProgress>(
            "SELECT * FROM learning_progress WHERE user_id = ? AND flashcard_id = ?",
        )
        .bind(user_id.as_str())
        .bind(flashcard_id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(progress)
    }

    async fn flashcards_in_scope(
        &self,
        user_id: &UserId,
        scope: &Scope,
    ) -> Result<Vec<CardProgress>> {
        let cards = match scope {
            Scope::Set(set_id) => {
                let sql = format!(
                    r#"
                    SELECT {}
                    FROM flashcards f
                    LEFT JOIN learning_progress p ON p.flashcard_id = f.id AND p.user_id = ?
                    WHERE f.set_id = ?
                    ORDER BY f.position, f.id
                    "#,
                    SCOPE_COLUMNS
                );
                sqlx::query_as::<_, CardProgress>(&sql)
                    .bind(user_id.as_str())
                    .bind(set_id.as_str())
                    .fetch_all(&self.pool)
                    .await?
            }
            Scope::Folder(folder_id) => {
                let sql = format!(
                    r#"
                    SELECT {}
                    FROM flashcards f
                    JOIN folder_sets fs ON fs.set_id = f.set_id
                    LEFT JOIN learning_progress p ON p.flashcard_id = f.id AND p.user_id = ?
                    WHERE fs.folder_id = ?
                    ORDER BY f.set_id, f.position, f.id
                    "#,
                    SCOPE_COLUMNS
                );
                sqlx::query_as::<_, CardProgress>(&sql)
                    .bind(user_id.as_str())
                    .bind(folder_id.as_str())
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(cards)
    }

    async fn delete_progress(
        &self,
        user_id: &UserId,
        flashcard_id: &FlashcardId,
    ) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM learning_progress WHERE user_id = ? AND flashcard_id = ?")
                .bind(user_id.as_str())
                .bind(flashcard_id.as_str())
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_progress_in_scope(&self, user_id: &UserId, scope: &Scope) -> Result<u64> {
        let result = match scope {
            Scope::Set(set_id) => {
                sqlx::query(
                    r#"
                    DELETE FROM learning_progress
                    WHERE user_id = ?
                      AND flashcard_id IN (SELECT id FROM flashcards WHERE set_id = ?)
                    "#,
                )
                .bind(user_id.as_str())
                .bind(set_id.as_str())
                .execute(&self.pool)
                .await?
            }
            Scope::Folder(folder_id) => {
                sqlx::query(
                    r#"
                    DELETE FROM learning_progress
                    WHERE user_id = ?
                      AND flashcard_id IN (
                        SELECT f.id FROM flashcards f
                        JOIN folder_sets fs ON fs.set_id = f.set_id
                        WHERE fs.folder_id = ?
                      )
                    "#,
                )
                .bind(user_id.as_str())
                .bind(folder_id.as_str())
                .execute(&self.pool)
                .await?
            }
        };
        Ok(result.rows_affected())
    }
}
