use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use flashcard_srs::payload::{AnswerRequest, DueQuery, ResetRequest, ScopeKind, StatsQuery};
use flashcard_srs::{Config, FolderId, LearningEngine, Scope, SetId, SqliteStore, StudyMode, UserId};

#[derive(Parser)]
#[command(name = "srs", about = "Spaced repetition progress for flashcard sets")]
struct Cli {
    /// Overrides DATABASE_URL
    #[arg(long, global = true)]
    database: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Add a flashcard to a set
    AddCard {
        #[arg(long)]
        set: String,
        #[arg(long)]
        front: String,
        #[arg(long)]
        back: String,
    },
    /// Put a set into a folder
    Link {
        #[arg(long)]
        folder: String,
        #[arg(long)]
        set: String,
    },
    /// Record an answer: '{"flashcardId": "...", "isCorrect": true}'
    Answer {
        #[arg(long)]
        user: String,
        payload: String,
    },
    /// List cards to study
    Due {
        #[arg(long)]
        user: String,
        #[arg(long, value_enum)]
        scope: ScopeArg,
        #[arg(long)]
        id: String,
        #[arg(long, value_enum, default_value = "spaced")]
        mode: ModeArg,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show progress counters
    Stats {
        #[arg(long)]
        user: String,
        #[arg(long, value_enum)]
        scope: ScopeArg,
        #[arg(long)]
        id: String,
    },
    /// Forget progress on one card: '{"flashcardId": "..."}'
    Reset {
        #[arg(long)]
        user: String,
        payload: String,
    },
    /// Forget progress on every card of a set or folder
    ResetScope {
        #[arg(long)]
        user: String,
        #[arg(long, value_enum)]
        scope: ScopeArg,
        #[arg(long)]
        id: String,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum ScopeArg {
    Set,
    Folder,
}

impl From<ScopeArg> for ScopeKind {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::Set => ScopeKind::Set,
            ScopeArg::Folder => ScopeKind::Folder,
        }
    }
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum ModeArg {
    Spaced,
    Random,
}

impl From<ModeArg> for StudyMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Spaced => StudyMode::Spaced,
            ModeArg::Random => StudyMode::Random,
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(url) = cli.database {
        config.database_url = url;
    }

    let store = SqliteStore::connect(&config.database_url)
        .await
        .with_context(|| format!("Failed to open database {}", config.database_url))?;
    let engine = LearningEngine::new(store, config.mastery);

    match cli.command {
        Command::AddCard { set, front, back } => {
            let card = engine.store().add_flashcard(&SetId(set), front, back).await?;
            print_json(&card)?;
        }
        Command::Link { folder, set } => {
            engine.store().link_set(&FolderId(folder), &SetId(set)).await?;
        }
        Command::Answer { user, payload } => {
            let request = AnswerRequest::from_json(&payload)?;
            let progress = engine.submit(&UserId(user), &request).await?;
            print_json(&progress)?;
        }
        Command::Due { user, scope, id, mode, limit } => {
            let query = DueQuery {
                scope: scope.into(),
                id,
                mode: mode.into(),
                limit,
            };
            let cards = engine.due_query(&UserId(user), &query).await?;
            print_json(&cards)?;
        }
        Command::Stats { user, scope, id } => {
            let query = StatsQuery {
                scope: scope.into(),
                id,
            };
            let stats = engine.stats_query(&UserId(user), &query).await?;
            print_json(&stats)?;
        }
        Command::Reset { user, payload } => {
            let request = ResetRequest::from_json(&payload)?;
            engine.reset(&UserId(user), &request).await?;
        }
        Command::ResetScope { user, scope, id } => {
            let scope = match scope {
                ScopeArg::Set => Scope::Set(SetId(id)),
                ScopeArg::Folder => Scope::Folder(FolderId(id)),
            };
            let deleted = engine.reset_scope(&UserId(user), &scope).await?;
            println!("{}", deleted);
        }
    }

    Ok(())
}
