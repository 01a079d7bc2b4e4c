//! Request payloads accepted by the engine's callers.
//!
//! Bodies arrive as loosely typed JSON, so everything is checked here before
//! the engine touches storage.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EngineError, Result};
use crate::models::{FlashcardId, FolderId, Scope, SetId, StudyMode};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAnswer {
    flashcard_id: Option<Value>,
    is_correct: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReset {
    flashcard_id: Option<Value>,
}

fn invalid(msg: impl Into<String>) -> EngineError {
    EngineError::InvalidInput(msg.into())
}

fn parse_flashcard_id(value: Option<Value>) -> Result<FlashcardId> {
    match value {
        Some(Value::String(id)) if !id.trim().is_empty() => Ok(FlashcardId(id)),
        Some(Value::String(_)) => Err(invalid("flashcardId must not be empty")),
        Some(Value::Number(n)) => Ok(FlashcardId(n.to_string())),
        Some(Value::Null) | None => Err(invalid("flashcardId is required")),
        Some(other) => Err(invalid(format!(
            "flashcardId must be a string or number, got {}",
            other
        ))),
    }
}

/// `{flashcardId, isCorrect}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRequest {
    pub flashcard_id: FlashcardId,
    pub is_correct: bool,
}

impl AnswerRequest {
    pub fn from_json(body: &str) -> Result<Self> {
        let raw: RawAnswer = serde_json::from_str(body)
            .map_err(|e| invalid(format!("malformed answer payload: {}", e)))?;

        let flashcard_id = parse_flashcard_id(raw.flashcard_id)?;
        let is_correct = match raw.is_correct {
            Some(Value::Bool(b)) => b,
            Some(Value::Null) | None => return Err(invalid("isCorrect is required")),
            Some(other) => {
                return Err(invalid(format!("isCorrect must be a boolean, got {}", other)))
            }
        };

        Ok(Self {
            flashcard_id,
            is_correct,
        })
    }
}

/// `{flashcardId}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetRequest {
    pub flashcard_id: FlashcardId,
}

impl ResetRequest {
    pub fn from_json(body: &str) -> Result<Self> {
        let raw: RawReset = serde_json::from_str(body)
            .map_err(|e| invalid(format!("malformed reset payload: {}", e)))?;
        Ok(Self {
            flashcard_id: parse_flashcard_id(raw.flashcard_id)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    Set,
    Folder,
}

fn scope_of(kind: ScopeKind, id: &str) -> Result<Scope> {
    if id.trim().is_empty() {
        return Err(invalid("scope id is required"));
    }
    Ok(match kind {
        ScopeKind::Set => Scope::Set(SetId::from(id)),
        ScopeKind::Folder => Scope::Folder(FolderId::from(id)),
    })
}

/// `due?scope=set|folder&id=..&mode=spaced|random`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DueQuery {
    pub scope: ScopeKind,
    pub id: String,
    #[serde(default)]
    pub mode: StudyMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl DueQuery {
    pub fn scope(&self) -> Result<Scope> {
        scope_of(self.scope, &self.id)
    }
}

/// `stats?scope=set|folder&id=..`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsQuery {
    pub scope: ScopeKind,
    pub id: String,
}

impl StatsQuery {
    pub fn scope(&self) -> Result<Scope> {
        scope_of(self.scope, &self.id)
    }
}
