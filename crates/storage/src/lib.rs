#![forbid(unsafe_code)]

pub mod bank;
pub mod repository;
pub mod sqlite;

pub use bank::{BUILTIN_CATEGORIES, CategoryInfo, QuestionBank};
pub use repository::{
    CustomQuestionStore, InMemoryRepository, KeyValueStore, ProgressStore, Storage, StorageError,
};
pub use sqlite::{SqliteInitError, SqliteRepository};
