#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod quiz_service;
pub mod session;

pub use quiz_core::Clock;

pub use app_services::AppServices;
pub use error::{AppServicesError, QuizServiceError};
pub use quiz_service::{
    LEVEL_QUIZ_SIZE, LevelStatus, QUESTIONS_PER_STAGE, QuizOutcome, QuizService, StageStatus,
};
pub use session::{AnswerOutcome, QuizKind, QuizResult, QuizSession};
