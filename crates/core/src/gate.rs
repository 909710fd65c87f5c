//! Level and stage unlock decisions over a [`ProgressRecord`].
//!
//! Level access is recomputed from the stored percentage on every call, so
//! overwriting a passing score with a failing one locks the next level again.
//! Stage access reads the stored pass flag of the previous stage.

use log::{debug, info};

use crate::model::{CategoryId, Percentage, ProgressRecord, QuizLevel, StageId};

/// Percentage a prerequisite level must reach to open the next one.
pub const UNLOCK_THRESHOLD: Percentage = 70;

/// Percentage a quiz must reach to count as passed.
pub const PASS_THRESHOLD: Percentage = 70;

/// Threshold required on the previous level to open `level`.
///
/// Beginner has no prerequisite and reports `0`.
#[must_use]
pub fn unlock_threshold(level: QuizLevel) -> Percentage {
    match level {
        QuizLevel::Beginner => 0,
        QuizLevel::Intermediate | QuizLevel::Advanced => UNLOCK_THRESHOLD,
    }
}

#[must_use]
pub fn is_passing(percentage: Percentage) -> bool {
    percentage >= PASS_THRESHOLD
}

/// Whether the player may enter `level` in `category`.
#[must_use]
pub fn is_level_unlocked(
    category: &CategoryId,
    level: QuizLevel,
    progress: &ProgressRecord,
) -> bool {
    let Some(previous) = level.previous() else {
        return true;
    };
    let stored = progress.level_percentage(category, previous);
    let unlocked = stored >= unlock_threshold(level);
    debug!("level {category}/{level}: {previous} at {stored}% -> unlocked={unlocked}");
    unlocked
}

/// Whether the player may enter the stage `stage_id` in `category`.
///
/// The first stage of a level is always open; any other stage needs the
/// previous stage's pass flag to be exactly `true`. Ids that do not parse as
/// `<level>-<order>` are treated as locked.
#[must_use]
pub fn is_stage_unlocked(category: &CategoryId, stage_id: &str, progress: &ProgressRecord) -> bool {
    let Ok(stage) = stage_id.parse::<StageId>() else {
        debug!("stage {category}/{stage_id}: unparsable id, treated as locked");
        return false;
    };
    match stage.previous() {
        None => true,
        Some(previous) => progress.stage_passed(category, &previous.to_string()),
    }
}

/// Store the latest percentage for a level, replacing any earlier value.
pub fn record_level_completion(
    progress: &mut ProgressRecord,
    category: &CategoryId,
    level: QuizLevel,
    percentage: Percentage,
) {
    info!("recording level {category}/{level} at {percentage}%");
    progress.set_level_percentage(category, level, percentage);
}

/// Store the pass flag and percentage for a stage.
///
/// `passed` is decided by the caller; the two values are stored as given.
pub fn record_stage_completion(
    progress: &mut ProgressRecord,
    category: &CategoryId,
    stage_id: &str,
    passed: bool,
    percentage: Percentage,
) {
    info!("recording stage {category}/{stage_id}: passed={passed} at {percentage}%");
    progress.set_stage_result(category, stage_id, passed, percentage);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cat(slug: &str) -> CategoryId {
        CategoryId::new(slug)
    }

    fn with_beginner(category: &CategoryId, percentage: Percentage) -> ProgressRecord {
        let mut progress = ProgressRecord::new();
        progress.set_level_percentage(category, QuizLevel::Beginner, percentage);
        progress
    }

    #[test]
    fn beginner_is_always_unlocked() {
        let football = cat("football");
        assert!(is_level_unlocked(&football, QuizLevel::Beginner, &ProgressRecord::new()));
        assert!(is_level_unlocked(&football, QuizLevel::Beginner, &with_beginner(&football, 0)));
    }

    #[test]
    fn intermediate_opens_at_seventy() {
        let science = cat("science");
        for p in 0..70 {
            assert!(!is_level_unlocked(
                &science,
                QuizLevel::Intermediate,
                &with_beginner(&science, p)
            ));
        }
        for p in 70..=100 {
            assert!(is_level_unlocked(
                &science,
                QuizLevel::Intermediate,
                &with_beginner(&science, p)
            ));
        }
    }

    #[test]
    fn advanced_depends_on_intermediate_only() {
        let history = cat("history");
        let mut progress = with_beginner(&history, 100);
        assert!(!is_level_unlocked(&history, QuizLevel::Advanced, &progress));
        progress.set_level_percentage(&history, QuizLevel::Intermediate, 70);
        assert!(is_level_unlocked(&history, QuizLevel::Advanced, &progress));
    }

    #[test]
    fn progress_in_other_category_does_not_leak() {
        let progress = with_beginner(&cat("football"), 95);
        assert!(!is_level_unlocked(&cat("science"), QuizLevel::Intermediate, &progress));
    }

    #[test]
    fn later_low_score_relocks_next_level() {
        let science = cat("science");
        let mut progress = ProgressRecord::new();
        record_level_completion(&mut progress, &science, QuizLevel::Beginner, 50);
        record_level_completion(&mut progress, &science, QuizLevel::Beginner, 90);
        assert!(is_level_unlocked(&science, QuizLevel::Intermediate, &progress));

        record_level_completion(&mut progress, &science, QuizLevel::Beginner, 40);
        assert!(!is_level_unlocked(&science, QuizLevel::Intermediate, &progress));
    }

    #[test]
    fn first_stage_is_always_unlocked() {
        let progress = ProgressRecord::new();
        assert!(is_stage_unlocked(&cat("geography"), "beginner-1", &progress));
        assert!(is_stage_unlocked(&cat("geography"), "advanced-1", &progress));
    }

    #[test]
    fn stage_needs_previous_flag_exactly_true() {
        let islamic = cat("islamic");
        let mut progress = ProgressRecord::new();
        assert!(!is_stage_unlocked(&islamic, "beginner-3", &progress));

        record_stage_completion(&mut progress, &islamic, "beginner-2", false, 65);
        assert!(!is_stage_unlocked(&islamic, "beginner-3", &progress));

        record_stage_completion(&mut progress, &islamic, "beginner-2", true, 85);
        assert!(is_stage_unlocked(&islamic, "beginner-3", &progress));
        assert!(!is_stage_unlocked(&islamic, "beginner-4", &progress));
        assert!(!is_stage_unlocked(&islamic, "intermediate-3", &progress));
    }

    #[test]
    fn stage_flag_and_percentage_are_independent() {
        let football = cat("football");
        let mut progress = ProgressRecord::new();
        record_stage_completion(&mut progress, &football, "beginner-1", false, 60);
        assert!(!progress.stage_passed(&football, "beginner-1"));
        assert_eq!(progress.stage_percentage(&football, "beginner-1"), 60);
    }

    #[test]
    fn recorded_stage_opens_the_next_one() {
        let football = cat("football");
        let mut progress = ProgressRecord::new();
        record_stage_completion(&mut progress, &football, "beginner-1", true, 80);
        assert!(is_stage_unlocked(&football, "beginner-2", &progress));
    }

    #[test]
    fn malformed_stage_ids_are_locked() {
        let progress = ProgressRecord::new();
        assert!(!is_stage_unlocked(&cat("football"), "bonus", &progress));
        assert!(!is_stage_unlocked(&cat("football"), "beginner-0", &progress));
    }

    #[test]
    fn thresholds_are_level_indexed() {
        assert_eq!(unlock_threshold(QuizLevel::Beginner), 0);
        assert_eq!(unlock_threshold(QuizLevel::Intermediate), 70);
        assert_eq!(unlock_threshold(QuizLevel::Advanced), 70);
        assert!(is_passing(70));
        assert!(!is_passing(69));
    }
}
