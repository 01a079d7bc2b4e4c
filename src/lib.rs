//! Spaced-repetition progress tracking for flashcard study.
//!
//! One [`LearningProgress`] record per (user, flashcard) pair is updated by
//! [`LearningEngine::record_answer`]; due queues and per-scope statistics are
//! computed from the flashcards a [`ProgressStore`] reports for a set or folder.

pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod payload;
pub mod queue;
pub mod srs;
pub mod stats;
pub mod store;

pub use config::Config;
pub use engine::LearningEngine;
pub use error::{EngineError, Result};
pub use models::*;
pub use srs::{Answer, MasteryPolicy};
pub use store::{MemoryStore, ProgressStore, SqliteStore};
