use std::env;

use crate::error::{EngineError, Result};
use crate::srs::MasteryPolicy;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://flashcards.db?mode=rwc";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_url: String,
    pub mastery: MasteryPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            mastery: MasteryPolicy::default(),
        }
    }
}

impl Config {
    /// Reads `.env` (if present) and the process environment.
    ///
    /// - `DATABASE_URL`
    /// - `SRS_MASTERY_THRESHOLD` (consecutive correct answers, at least 1)
    /// - `SRS_RESET_MASTERY_ON_INCORRECT` (`true`/`false`)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(url) = lookup("DATABASE_URL") {
            config.database_url = url;
        }

        if let Some(raw) = lookup("SRS_MASTERY_THRESHOLD") {
            let threshold: u32 = raw.trim().parse().map_err(|_| {
                EngineError::Config(format!(
                    "SRS_MASTERY_THRESHOLD must be a positive integer, got '{}'",
                    raw
                ))
            })?;
            if threshold == 0 {
                return Err(EngineError::Config(
                    "SRS_MASTERY_THRESHOLD must be at least 1".to_string(),
                ));
            }
            config.mastery.threshold = threshold;
        }

        if let Some(raw) = lookup("SRS_RESET_MASTERY_ON_INCORRECT") {
            config.mastery.reset_on_incorrect = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(EngineError::Config(format!(
                        "SRS_RESET_MASTERY_ON_INCORRECT must be true or false, got '{}'",
                        raw
                    )))
                }
            };
        }

        Ok(config)
    }
}
