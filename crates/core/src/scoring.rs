use crate::model::{Percentage, QuizLevel};

/// Points awarded for a correct answer before the speed bonus.
#[must_use]
pub fn base_points(level: QuizLevel) -> u32 {
    match level {
        QuizLevel::Beginner => 10,
        QuizLevel::Intermediate => 20,
        QuizLevel::Advanced => 30,
    }
}

/// Seconds the player gets per question.
#[must_use]
pub fn time_limit_secs(level: QuizLevel) -> u32 {
    match level {
        QuizLevel::Beginner => 30,
        QuizLevel::Intermediate => 25,
        QuizLevel::Advanced => 20,
    }
}

/// Score for one answer: `base + floor(remaining / max * base * 0.5)` when
/// correct, `0` otherwise. `remaining` is capped at `max`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn question_score(correct: bool, remaining_secs: u32, max_secs: u32, base: u32) -> u32 {
    if !correct {
        return 0;
    }
    if max_secs == 0 {
        return base;
    }
    let remaining = remaining_secs.min(max_secs);
    let bonus = (f64::from(remaining) / f64::from(max_secs) * f64::from(base) * 0.5).floor();
    base + bonus as u32
}

/// Share of correct answers rounded to the nearest whole percent.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn percentage(correct: usize, total: usize) -> Percentage {
    if total == 0 {
        return 0;
    }
    let ratio = correct.min(total) as f64 / total as f64;
    (ratio * 100.0).round() as Percentage
}
