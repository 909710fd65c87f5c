use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown level: {raw}")]
pub struct LevelParseError {
    pub raw: String,
}

/// Difficulty tier a question belongs to.
///
/// Serialized as `beginner`, `intermediate` or `advanced`, which is also the
/// prefix used in stage ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuizLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl QuizLevel {
    pub const ALL: [QuizLevel; 3] = [
        QuizLevel::Beginner,
        QuizLevel::Intermediate,
        QuizLevel::Advanced,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuizLevel::Beginner => "beginner",
            QuizLevel::Intermediate => "intermediate",
            QuizLevel::Advanced => "advanced",
        }
    }

    /// Arabic label shown to players.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            QuizLevel::Beginner => "مبتدئ",
            QuizLevel::Intermediate => "متوسط",
            QuizLevel::Advanced => "متقدم",
        }
    }

    /// The level whose completion opens this one, if any.
    #[must_use]
    pub fn previous(self) -> Option<QuizLevel> {
        match self {
            QuizLevel::Beginner => None,
            QuizLevel::Intermediate => Some(QuizLevel::Beginner),
            QuizLevel::Advanced => Some(QuizLevel::Intermediate),
        }
    }

    #[must_use]
    pub fn next(self) -> Option<QuizLevel> {
        match self {
            QuizLevel::Beginner => Some(QuizLevel::Intermediate),
            QuizLevel::Intermediate => Some(QuizLevel::Advanced),
            QuizLevel::Advanced => None,
        }
    }

    #[must_use]
    pub fn tier(self) -> StageTier {
        match self {
            QuizLevel::Beginner => StageTier::Easy,
            QuizLevel::Intermediate => StageTier::Medium,
            QuizLevel::Advanced => StageTier::Hard,
        }
    }
}

impl fmt::Display for QuizLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for QuizLevel {
    type Err = LevelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Ok(QuizLevel::Beginner),
            "intermediate" => Ok(QuizLevel::Intermediate),
            "advanced" => Ok(QuizLevel::Advanced),
            _ => Err(LevelParseError { raw: s.to_owned() }),
        }
    }
}

/// Stage naming of the same three tiers (`easy`/`medium`/`hard`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageTier {
    Easy,
    Medium,
    Hard,
}

impl StageTier {
    #[must_use]
    pub fn level(self) -> QuizLevel {
        match self {
            StageTier::Easy => QuizLevel::Beginner,
            StageTier::Medium => QuizLevel::Intermediate,
            StageTier::Hard => QuizLevel::Advanced,
        }
    }

    /// Coin multiplier applied to stage rewards.
    #[must_use]
    pub fn reward_multiplier(self) -> u32 {
        match self {
            StageTier::Easy => 1,
            StageTier::Medium => 2,
            StageTier::Hard => 3,
        }
    }
}
