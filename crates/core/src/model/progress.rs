use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::ids::CategoryId;
use crate::model::level::QuizLevel;

/// Completion percentage, always within `0..=100`.
pub type Percentage = u8;

/// Clamp an arbitrary score to a valid percentage.
#[must_use]
pub fn clamp_percentage(value: u32) -> Percentage {
    Percentage::try_from(value.min(100)).unwrap_or(100)
}

/// Everything the player has achieved, persisted as one JSON object.
///
/// All three maps are always present; a category or entry that was never
/// written reads as `0` / `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    #[serde(default)]
    pub completed_levels: BTreeMap<CategoryId, BTreeMap<QuizLevel, Percentage>>,
    #[serde(default)]
    pub completed_stages: BTreeMap<CategoryId, BTreeMap<String, bool>>,
    #[serde(default)]
    pub stage_completion: BTreeMap<CategoryId, BTreeMap<String, Percentage>>,
}

impl ProgressRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.completed_levels.values().all(BTreeMap::is_empty)
            && self.completed_stages.values().all(BTreeMap::is_empty)
            && self.stage_completion.values().all(BTreeMap::is_empty)
    }

    /// Stored percentage for a level, `0` when missing.
    #[must_use]
    pub fn level_percentage(&self, category: &CategoryId, level: QuizLevel) -> Percentage {
        self.completed_levels
            .get(category)
            .and_then(|levels| levels.get(&level))
            .copied()
            .unwrap_or(0)
    }

    /// Stored pass flag for a stage, `false` when missing.
    #[must_use]
    pub fn stage_passed(&self, category: &CategoryId, stage_id: &str) -> bool {
        self.completed_stages
            .get(category)
            .and_then(|stages| stages.get(stage_id))
            .copied()
            .unwrap_or(false)
    }

    /// Stored percentage for a stage, `0` when missing.
    #[must_use]
    pub fn stage_percentage(&self, category: &CategoryId, stage_id: &str) -> Percentage {
        self.stage_completion
            .get(category)
            .and_then(|stages| stages.get(stage_id))
            .copied()
            .unwrap_or(0)
    }

    pub fn set_level_percentage(
        &mut self,
        category: &CategoryId,
        level: QuizLevel,
        percentage: Percentage,
    ) {
        self.completed_levels
            .entry(category.clone())
            .or_default()
            .insert(level, percentage.min(100));
    }

    pub fn set_stage_result(
        &mut self,
        category: &CategoryId,
        stage_id: &str,
        passed: bool,
        percentage: Percentage,
    ) {
        self.completed_stages
            .entry(category.clone())
            .or_default()
            .insert(stage_id.to_owned(), passed);
        self.stage_completion
            .entry(category.clone())
            .or_default()
            .insert(stage_id.to_owned(), percentage.min(100));
    }

    /// Number of stages flagged as passed in a category.
    #[must_use]
    pub fn passed_stage_count(&self, category: &CategoryId) -> usize {
        self.completed_stages
            .get(category)
            .map_or(0, |stages| stages.values().filter(|p| **p).count())
    }

    /// Forget everything recorded for one category.
    pub fn clear_category(&mut self, category: &CategoryId) {
        self.completed_levels.remove(category);
        self.completed_stages.remove(category);
        self.stage_completion.remove(category);
    }
}
