//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{CategoryId, QuestionError, QuizLevel, StageIdError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `QuizService` and `QuizSession`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizServiceError {
    #[error("level {level} is locked in {category}")]
    LevelLocked {
        category: CategoryId,
        level: QuizLevel,
    },
    #[error("stage {stage_id} is locked in {category}")]
    StageLocked {
        category: CategoryId,
        stage_id: String,
    },
    #[error("no questions available for {category} {level}")]
    Empty {
        category: CategoryId,
        level: QuizLevel,
    },
    #[error("option {index} is out of range for {count} options")]
    InvalidAnswer { index: usize, count: usize },
    #[error("quiz already completed")]
    Completed,
    #[error("quiz still has unanswered questions")]
    Incomplete,
    #[error(transparent)]
    Stage(#[from] StageIdError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Quiz(#[from] QuizServiceError),
}
