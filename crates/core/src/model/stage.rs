use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::level::{QuizLevel, StageTier};

/// Number of stages generated for every level of every category.
pub const STAGES_PER_LEVEL: u32 = 10;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StageIdError {
    #[error("stage id must look like <level>-<order>, got {raw:?}")]
    Malformed { raw: String },

    #[error("unknown level in stage id {raw:?}")]
    UnknownLevel { raw: String },

    #[error("stage order must be a positive integer in {raw:?}")]
    InvalidOrder { raw: String },
}

//
// ─── STAGE ID ──────────────────────────────────────────────────────────────────
//

/// Identifier of a stage: `"<level>-<order>"`, e.g. `beginner-3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StageId {
    level: QuizLevel,
    order: u32,
}

impl StageId {
    /// # Panics
    ///
    /// Panics if `order` is zero.
    #[must_use]
    pub fn new(level: QuizLevel, order: u32) -> Self {
        assert!(order > 0, "stage order starts at 1");
        Self { level, order }
    }

    #[must_use]
    pub fn level(&self) -> QuizLevel {
        self.level
    }

    #[must_use]
    pub fn order(&self) -> u32 {
        self.order
    }

    /// The stage that must be completed before this one, if any.
    #[must_use]
    pub fn previous(&self) -> Option<StageId> {
        (self.order > 1).then(|| StageId {
            level: self.level,
            order: self.order - 1,
        })
    }

    #[must_use]
    pub fn next(&self) -> Option<StageId> {
        (self.order < STAGES_PER_LEVEL).then(|| StageId {
            level: self.level,
            order: self.order + 1,
        })
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.level, self.order)
    }
}

impl FromStr for StageId {
    type Err = StageIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (level, order) = s.trim().rsplit_once('-').ok_or_else(|| StageIdError::Malformed {
            raw: s.to_owned(),
        })?;
        let level = level
            .parse::<QuizLevel>()
            .map_err(|_| StageIdError::UnknownLevel { raw: s.to_owned() })?;
        let order = order
            .parse::<u32>()
            .ok()
            .filter(|o| *o > 0)
            .ok_or_else(|| StageIdError::InvalidOrder { raw: s.to_owned() })?;
        Ok(Self { level, order })
    }
}

impl Serialize for StageId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for StageId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

//
// ─── UNLOCK RULE / REWARD ──────────────────────────────────────────────────────
//

/// How a stage becomes playable: `none` or `complete-stage-<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockRule {
    None,
    CompleteStage(u32),
}

impl fmt::Display for UnlockRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnlockRule::None => f.write_str("none"),
            UnlockRule::CompleteStage(order) => write!(f, "complete-stage-{order}"),
        }
    }
}

impl Serialize for UnlockRule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for UnlockRule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw == "none" {
            return Ok(UnlockRule::None);
        }
        raw.strip_prefix("complete-stage-")
            .and_then(|n| n.parse::<u32>().ok())
            .map(UnlockRule::CompleteStage)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid unlock rule: {raw}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageReward {
    pub coins: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
}

//
// ─── STAGE ─────────────────────────────────────────────────────────────────────
//

/// A fixed bundle of questions within a level, unlocked in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    pub id: StageId,
    pub title: String,
    pub level: StageTier,
    pub order: u32,
    pub unlock_rule: UnlockRule,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward: Option<StageReward>,
}

fn stage_title(order: u32) -> String {
    match order {
        1 => "البداية".to_owned(),
        5 => "منتصف الطريق".to_owned(),
        STAGES_PER_LEVEL => "التحدي الأخير".to_owned(),
        n => format!("المرحلة {n}"),
    }
}

fn stage_reward(tier: StageTier, level: QuizLevel, order: u32) -> StageReward {
    StageReward {
        coins: order * 10 * tier.reward_multiplier(),
        badge: (order == STAGES_PER_LEVEL).then(|| format!("بطل المستوى {}", level.display_name())),
    }
}

/// Generate the stages of one level in play order.
#[must_use]
pub fn stages_for_level(level: QuizLevel) -> Vec<Stage> {
    let tier = level.tier();
    (1..=STAGES_PER_LEVEL)
        .map(|order| Stage {
            id: StageId::new(level, order),
            title: stage_title(order),
            level: tier,
            order,
            unlock_rule: if order == 1 {
                UnlockRule::None
            } else {
                UnlockRule::CompleteStage(order - 1)
            },
            reward: Some(stage_reward(tier, level, order)),
        })
        .collect()
}

/// The full stage list shared by every category: all levels, in order.
#[must_use]
pub fn stage_catalog() -> Vec<Stage> {
    QuizLevel::ALL.into_iter().flat_map(stages_for_level).collect()
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
