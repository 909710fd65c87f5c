use async_trait::async_trait;
use log::warn;
use quiz_core::model::{
    CategoryId, Percentage, ProgressRecord, Question, QuestionDraft, QuizLevel, clamp_percentage,
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Key under which the whole progress record is stored.
pub const PROGRESS_KEY: &str = "quizProgress";

/// Key under which appended custom questions are stored.
pub const CUSTOM_QUESTIONS_KEY: &str = "customQuestions";

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── KEY/VALUE BACKENDS ────────────────────────────────────────────────────────
//

/// A string key/value store; every value is a JSON document written whole.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the raw value for `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn get_value(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the value for `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    async fn put_value(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`; deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    async fn remove_value(&self, key: &str) -> Result<(), StorageError>;
}

//
// ─── PROGRESS ──────────────────────────────────────────────────────────────────
//

/// Load/save boundary for the player's progress record.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Load the stored record; a missing or unreadable blob yields an empty one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` only when the backend itself fails.
    async fn load_progress(&self) -> Result<ProgressRecord, StorageError>;

    /// Replace the stored record with `progress`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be encoded or written.
    async fn save_progress(&self, progress: &ProgressRecord) -> Result<(), StorageError>;

    /// Remove the stored record entirely.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    async fn clear_progress(&self) -> Result<(), StorageError>;
}

/// Persistence for questions authored outside the built-in bank.
#[async_trait]
pub trait CustomQuestionStore: Send + Sync {
    /// Load every valid stored custom question, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` only when the backend itself fails.
    async fn load_custom_questions(&self) -> Result<Vec<Question>, StorageError>;

    /// Append one question to the stored list.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the list cannot be encoded or written.
    async fn append_custom_question(&self, question: &Question) -> Result<(), StorageError>;
}

/// Decode a stored progress blob entry by entry.
///
/// Unreadable JSON yields an empty record. Inside a readable record only the
/// malformed entries are dropped: percentages are rounded and clamped to
/// `0..=100`, unknown levels and non-numeric or non-boolean values are skipped.
#[must_use]
pub fn decode_progress(raw: Option<&str>) -> ProgressRecord {
    let Some(raw) = raw else {
        return ProgressRecord::default();
    };
    let root = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(root)) => root,
        Ok(other) => {
            warn!("discarding progress record that is not an object: {other}");
            return ProgressRecord::default();
        }
        Err(err) => {
            warn!("discarding unreadable progress record: {err}");
            return ProgressRecord::default();
        }
    };

    let mut progress = ProgressRecord::new();
    for (category, key, value) in entries(&root, "completedLevels") {
        let Ok(level) = key.parse::<QuizLevel>() else {
            warn!("skipping progress for unknown level {category}/{key}");
            continue;
        };
        match to_percentage(value) {
            Some(percentage) => progress.set_level_percentage(&category, level, percentage),
            None => warn!("skipping level percentage {category}/{key}: {value}"),
        }
    }
    for (category, key, value) in entries(&root, "completedStages") {
        match value.as_bool() {
            Some(passed) => {
                progress
                    .completed_stages
                    .entry(category)
                    .or_default()
                    .insert(key.to_owned(), passed);
            }
            None => warn!("skipping stage flag {category}/{key}: {value}"),
        }
    }
    for (category, key, value) in entries(&root, "stageCompletion") {
        match to_percentage(value) {
            Some(percentage) => {
                progress
                    .stage_completion
                    .entry(category)
                    .or_default()
                    .insert(key.to_owned(), percentage);
            }
            None => warn!("skipping stage percentage {category}/{key}: {value}"),
        }
    }
    progress
}

/// Flatten `root[field][category][key]` into triples, skipping non-object levels.
fn entries<'a>(
    root: &'a Map<String, Value>,
    field: &str,
) -> Vec<(CategoryId, &'a str, &'a Value)> {
    let Some(section) = root.get(field) else {
        return Vec::new();
    };
    let Some(categories) = section.as_object() else {
        warn!("skipping progress section {field}: not an object");
        return Vec::new();
    };
    let mut out = Vec::new();
    for (category, inner) in categories {
        let Some(inner) = inner.as_object() else {
            warn!("skipping progress section {field}/{category}: not an object");
            continue;
        };
        let category = CategoryId::new(category);
        out.extend(inner.iter().map(|(key, value)| (category.clone(), key.as_str(), value)));
    }
    out
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_percentage(value: &Value) -> Option<Percentage> {
    let number = value.as_f64().filter(|n| n.is_finite() && *n >= 0.0)?;
    Some(clamp_percentage(number.round().min(100.0) as u32))
}

/// Decode a stored custom question list, skipping invalid entries.
#[must_use]
pub fn decode_custom_questions(raw: Option<&str>) -> Vec<Question> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    let drafts: Vec<QuestionDraft> = match serde_json::from_str(raw) {
        Ok(drafts) => drafts,
        Err(err) => {
            warn!("discarding unreadable custom question list: {err}");
            return Vec::new();
        }
    };
    drafts
        .into_iter()
        .filter_map(|draft| {
            let id = draft.id;
            draft
                .validate()
                .map_err(|err| warn!("skipping custom question {id}: {err}"))
                .ok()
        })
        .collect()
}

#[async_trait]
impl<T: KeyValueStore + ?Sized> ProgressStore for T {
    async fn load_progress(&self) -> Result<ProgressRecord, StorageError> {
        let raw = self.get_value(PROGRESS_KEY).await?;
        Ok(decode_progress(raw.as_deref()))
    }

    async fn save_progress(&self, progress: &ProgressRecord) -> Result<(), StorageError> {
        let json = serde_json::to_string(progress)
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        self.put_value(PROGRESS_KEY, &json).await
    }

    async fn clear_progress(&self) -> Result<(), StorageError> {
        self.remove_value(PROGRESS_KEY).await
    }
}

#[async_trait]
impl<T: KeyValueStore + ?Sized> CustomQuestionStore for T {
    async fn load_custom_questions(&self) -> Result<Vec<Question>, StorageError> {
        let raw = self.get_value(CUSTOM_QUESTIONS_KEY).await?;
        Ok(decode_custom_questions(raw.as_deref()))
    }

    async fn append_custom_question(&self, question: &Question) -> Result<(), StorageError> {
        let mut questions = self.load_custom_questions().await?;
        questions.push(question.clone());
        let json = serde_json::to_string(&questions)
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        self.put_value(CUSTOM_QUESTIONS_KEY, &json).await
    }
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

/// Simple in-memory store for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            values: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl KeyValueStore for InMemoryRepository {
    async fn get_value(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self
            .values
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    async fn put_value(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self
            .values
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn remove_value(&self, key: &str) -> Result<(), StorageError> {
        let mut guard = self
            .values
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(key);
        Ok(())
    }
}

/// Aggregates the stores behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressStore>,
    pub custom_questions: Arc<dyn CustomQuestionStore>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let progress: Arc<dyn ProgressStore> = Arc::new(repo.clone());
        let custom_questions: Arc<dyn CustomQuestionStore> = Arc::new(repo);
        Self {
            progress,
            custom_questions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::QuestionId;

    fn question(id: u32) -> Question {
        QuestionDraft {
            id: QuestionId::new(id),
            text: "سؤال مخصص".into(),
            options: vec!["نعم".into(), "لا".into()],
            correct_answer_index: 1,
            category: CategoryId::new("science"),
            level: QuizLevel::Beginner,
            difficulty: None,
            stage_id: None,
            explanation: None,
        }
        .validate()
        .unwrap()
    }

    #[tokio::test]
    async fn absent_key_loads_as_empty_record() {
        let repo = InMemoryRepository::new();
        let progress = repo.load_progress().await.unwrap();
        assert!(progress.is_empty());
    }

    #[tokio::test]
    async fn saves_and_reloads_whole_record() {
        let repo = InMemoryRepository::new();
        let football = CategoryId::new("football");
        let mut progress = ProgressRecord::new();
        progress.set_stage_result(&football, "beginner-1", true, 80);
        progress.set_level_percentage(&football, QuizLevel::Beginner, 72);
        repo.save_progress(&progress).await.unwrap();

        let raw = repo.get_value(PROGRESS_KEY).await.unwrap().unwrap();
        assert!(raw.contains("completedStages"));

        let loaded = repo.load_progress().await.unwrap();
        assert_eq!(loaded, progress);

        repo.clear_progress().await.unwrap();
        assert!(repo.load_progress().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_blob_is_treated_as_empty() {
        let repo = InMemoryRepository::new();
        repo.put_value(PROGRESS_KEY, "{not json").await.unwrap();
        assert!(repo.load_progress().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_entries_are_dropped_one_by_one() {
        let repo = InMemoryRepository::new();
        let raw = r#"{
            "completedLevels": {
                "science": {"beginner": 72.5, "expert": 90, "intermediate": "high"},
                "history": {"beginner": 300}
            },
            "completedStages": {
                "football": {"beginner-1": true, "beginner-2": true, "beginner-3": "yes"},
                "islamic": 5
            },
            "stageCompletion": {
                "football": {"beginner-1": 80, "beginner-2": -4}
            }
        }"#;
        repo.put_value(PROGRESS_KEY, raw).await.unwrap();

        let progress = repo.load_progress().await.unwrap();
        let science = CategoryId::new("science");
        let football = CategoryId::new("football");
        assert_eq!(progress.level_percentage(&science, QuizLevel::Beginner), 73);
        assert_eq!(progress.level_percentage(&science, QuizLevel::Intermediate), 0);
        assert_eq!(
            progress.level_percentage(&CategoryId::new("history"), QuizLevel::Beginner),
            100
        );
        assert!(progress.stage_passed(&football, "beginner-1"));
        assert!(progress.stage_passed(&football, "beginner-2"));
        assert!(!progress.stage_passed(&football, "beginner-3"));
        assert_eq!(progress.passed_stage_count(&football), 2);
        assert_eq!(progress.stage_percentage(&football, "beginner-1"), 80);
        assert!(
            !progress
                .stage_completion
                .get(&football)
                .is_some_and(|stages| stages.contains_key("beginner-2"))
        );
    }

    #[tokio::test]
    async fn custom_questions_append_in_order() {
        let repo = InMemoryRepository::new();
        assert!(repo.load_custom_questions().await.unwrap().is_empty());
        repo.append_custom_question(&question(9001)).await.unwrap();
        repo.append_custom_question(&question(9002)).await.unwrap();
        let loaded = repo.load_custom_questions().await.unwrap();
        let ids: Vec<u32> = loaded.iter().map(|q| q.id().value()).collect();
        assert_eq!(ids, vec![9001, 9002]);
    }

    #[test]
    fn invalid_custom_entries_are_skipped() {
        let raw = r#"[
            {"id": 1, "text": "صالح", "options": ["أ", "ب"], "correctAnswerIndex": 0,
             "category": "science", "level": "beginner"},
            {"id": 2, "text": "غير صالح", "options": ["أ"], "correctAnswerIndex": 0,
             "category": "science", "level": "beginner"}
        ]"#;
        let questions = decode_custom_questions(Some(raw));
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].id(), QuestionId::new(1));
        assert!(decode_custom_questions(Some("oops")).is_empty());
    }

    #[tokio::test]
    async fn storage_handles_share_one_backend() {
        let storage = Storage::in_memory();
        let mut progress = ProgressRecord::new();
        progress.set_level_percentage(&CategoryId::new("history"), QuizLevel::Beginner, 90);
        storage.progress.save_progress(&progress).await.unwrap();
        assert_eq!(storage.progress.load_progress().await.unwrap(), progress);
        assert!(
            storage
                .custom_questions
                .load_custom_questions()
                .await
                .unwrap()
                .is_empty()
        );
    }
}
