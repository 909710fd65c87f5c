use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{CategoryId, QuestionId};
use crate::model::level::QuizLevel;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,

    #[error("question needs at least 2 options, got {count}")]
    TooFewOptions { count: usize },

    #[error("option {index} is empty")]
    EmptyOption { index: usize },

    #[error("correct answer index {index} is out of range for {count} options")]
    AnswerOutOfRange { index: usize, count: usize },

    #[error("difficulty must be a positive finite number, got {value}")]
    InvalidDifficulty { value: f64 },
}

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

/// Bucket a question falls into when its difficulty rank is exactly 1, 2 or 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DifficultyBucket {
    Easy,
    Medium,
    Hard,
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// Unvalidated question as it appears in data files and custom question lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDraft {
    pub id: QuestionId,
    pub text: String,
    pub options: Vec<String>,
    pub correct_answer_index: usize,
    pub category: CategoryId,
    pub level: QuizLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl QuestionDraft {
    /// Validate the draft into an immutable `Question`.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` when the text is blank, there are fewer than two
    /// options, an option is blank, the answer index is out of range or the
    /// difficulty is not a positive finite number.
    pub fn validate(self) -> Result<Question, QuestionError> {
        if self.text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }
        if self.options.len() < 2 {
            return Err(QuestionError::TooFewOptions {
                count: self.options.len(),
            });
        }
        if let Some(index) = self.options.iter().position(|o| o.trim().is_empty()) {
            return Err(QuestionError::EmptyOption { index });
        }
        if self.correct_answer_index >= self.options.len() {
            return Err(QuestionError::AnswerOutOfRange {
                index: self.correct_answer_index,
                count: self.options.len(),
            });
        }
        if let Some(value) = self.difficulty {
            if !value.is_finite() || value <= 0.0 {
                return Err(QuestionError::InvalidDifficulty { value });
            }
        }

        Ok(Question {
            id: self.id,
            text: self.text,
            options: self.options,
            correct_answer_index: self.correct_answer_index,
            category: self.category,
            level: self.level,
            difficulty: self.difficulty,
            stage_id: self.stage_id.filter(|s| !s.trim().is_empty()),
            explanation: self.explanation.filter(|s| !s.trim().is_empty()),
        })
    }
}

/// A validated multiple-choice question.
///
/// Guaranteed to have at least two options and an in-range answer index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "QuestionDraft", into = "QuestionDraft")]
pub struct Question {
    id: QuestionId,
    text: String,
    options: Vec<String>,
    correct_answer_index: usize,
    category: CategoryId,
    level: QuizLevel,
    difficulty: Option<f64>,
    stage_id: Option<String>,
    explanation: Option<String>,
}

impl Question {
    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_answer_index(&self) -> usize {
        self.correct_answer_index
    }

    #[must_use]
    pub fn correct_answer(&self) -> &str {
        &self.options[self.correct_answer_index]
    }

    #[must_use]
    pub fn category(&self) -> &CategoryId {
        &self.category
    }

    #[must_use]
    pub fn level(&self) -> QuizLevel {
        self.level
    }

    #[must_use]
    pub fn difficulty(&self) -> Option<f64> {
        self.difficulty
    }

    #[must_use]
    pub fn stage_id(&self) -> Option<&str> {
        self.stage_id.as_deref()
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    #[must_use]
    pub fn is_correct(&self, option_index: usize) -> bool {
        option_index == self.correct_answer_index
    }

    /// Returns the bucket for difficulty ranks of exactly 1, 2 or 3.
    ///
    /// Continuous scores and missing ranks yield `None`.
    #[must_use]
    pub fn difficulty_bucket(&self) -> Option<DifficultyBucket> {
        match self.difficulty {
            Some(d) if d == 1.0 => Some(DifficultyBucket::Easy),
            Some(d) if d == 2.0 => Some(DifficultyBucket::Medium),
            Some(d) if d == 3.0 => Some(DifficultyBucket::Hard),
            _ => None,
        }
    }

    #[must_use]
    pub fn belongs_to(&self, category: &CategoryId, level: QuizLevel) -> bool {
        &self.category == category && self.level == level
    }

    /// Return a copy carrying a different id (used when appending custom questions).
    #[must_use]
    pub fn with_id(mut self, id: QuestionId) -> Self {
        self.id = id;
        self
    }
}

impl TryFrom<QuestionDraft> for Question {
    type Error = QuestionError;

    fn try_from(draft: QuestionDraft) -> Result<Self, Self::Error> {
        draft.validate()
    }
}

impl From<Question> for QuestionDraft {
    fn from(q: Question) -> Self {
        Self {
            id: q.id,
            text: q.text,
            options: q.options,
            correct_answer_index: q.correct_answer_index,
            category: q.category,
            level: q.level,
            difficulty: q.difficulty,
            stage_id: q.stage_id,
            explanation: q.explanation,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
