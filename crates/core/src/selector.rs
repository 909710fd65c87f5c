//! Deterministic question selection for stages.
//!
//! A stage always yields the same questions in the same order for the same
//! pool; no random seed is stored. The two permutations are not uniform and
//! their exact output must stay stable.

use log::debug;
use std::collections::HashSet;

use crate::model::{CategoryId, DifficultyBucket, Question, QuizLevel};

/// Seed used when a stage id carries no usable numeric suffix.
pub const DEFAULT_SEED: u64 = 1;

//
// ─── DIFFICULTY MIX ────────────────────────────────────────────────────────────
//

/// Share of easy and medium questions wanted for a level; hard takes the rest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DifficultyMix {
    pub easy: f64,
    pub medium: f64,
}

impl DifficultyMix {
    #[must_use]
    pub fn for_level(level: QuizLevel) -> Self {
        match level {
            QuizLevel::Beginner => Self {
                easy: 0.6,
                medium: 0.3,
            },
            QuizLevel::Intermediate => Self {
                easy: 0.3,
                medium: 0.5,
            },
            QuizLevel::Advanced => Self {
                easy: 0.1,
                medium: 0.4,
            },
        }
    }

    /// Target counts `(easy, medium, hard)` before clamping to bucket sizes.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn targets(&self, count: usize) -> (usize, usize, usize) {
        let easy = (self.easy * count as f64).ceil() as usize;
        let medium = (self.medium * count as f64).ceil() as usize;
        let hard = count.saturating_sub(easy + medium);
        (easy, medium, hard)
    }
}

//
// ─── SEED & PERMUTATIONS ───────────────────────────────────────────────────────
//

/// Derive the selection seed from a stage id such as `beginner-7`.
///
/// The seed is the positive integer after the last `-`; anything else
/// (missing separator, non-numeric suffix, zero) falls back to [`DEFAULT_SEED`].
#[must_use]
pub fn stage_seed(stage_id: &str) -> u64 {
    stage_id
        .trim()
        .rsplit_once('-')
        .map(|(_, suffix)| suffix)
        .filter(|suffix| !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|suffix| suffix.parse::<u64>().ok())
        .filter(|seed| *seed > 0)
        .unwrap_or(DEFAULT_SEED)
}

/// First pass: walk `i` from the end down to 1 and swap with
/// `floor(((i * seed) mod len) * 0.7)`.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn scramble<T>(items: &mut [T], seed: u64) {
    let len = items.len();
    if len < 2 {
        return;
    }
    for i in (1..len).rev() {
        let wrapped = (i as u128 * u128::from(seed)) % len as u128;
        let j = (wrapped as f64 * 0.7).floor() as usize;
        items.swap(i, j);
    }
}

/// Final pass: walk `i` from the end down to 1 and swap with `(i + seed) mod len`.
#[allow(clippy::cast_possible_truncation)]
pub fn permute<T>(items: &mut [T], seed: u64) {
    let len = items.len();
    if len < 2 {
        return;
    }
    for i in (1..len).rev() {
        let j = ((i as u128 + u128::from(seed)) % len as u128) as usize;
        items.swap(i, j);
    }
}

//
// ─── BUCKETS ───────────────────────────────────────────────────────────────────
//

struct Buckets<'a> {
    easy: Vec<&'a Question>,
    medium: Vec<&'a Question>,
    hard: Vec<&'a Question>,
}

/// Split scrambled questions by their difficulty rank when the pool carries
/// any exact 1/2/3 ranks, otherwise positionally 40% / 30% / 30%.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn partition<'a>(scrambled: &[&'a Question]) -> Buckets<'a> {
    let ranked = scrambled.iter().any(|q| q.difficulty_bucket().is_some());
    if ranked {
        let of = |bucket: DifficultyBucket| {
            scrambled
                .iter()
                .copied()
                .filter(|q| q.difficulty_bucket() == Some(bucket))
                .collect::<Vec<_>>()
        };
        return Buckets {
            easy: of(DifficultyBucket::Easy),
            medium: of(DifficultyBucket::Medium),
            hard: of(DifficultyBucket::Hard),
        };
    }

    let len = scrambled.len();
    let easy_end = (len as f64 * 0.4).floor() as usize;
    let medium_end = (len as f64 * 0.7).floor() as usize;
    Buckets {
        easy: scrambled[..easy_end].to_vec(),
        medium: scrambled[easy_end..medium_end].to_vec(),
        hard: scrambled[medium_end..].to_vec(),
    }
}

//
// ─── SELECTION ─────────────────────────────────────────────────────────────────
//

/// Pick the questions for one stage.
///
/// Returns at most `count` questions of the given category and level, never
/// repeating an id. A shorter (possibly empty) result means the pool does not
/// hold enough content; it is not an error.
#[must_use]
pub fn select_stage_questions(
    pool: &[Question],
    category: &CategoryId,
    level: QuizLevel,
    count: usize,
    stage_id: &str,
) -> Vec<Question> {
    let mut seen = HashSet::new();
    let mut filtered: Vec<&Question> = pool
        .iter()
        .filter(|q| q.belongs_to(category, level))
        .filter(|q| seen.insert(q.id()))
        .collect();
    if filtered.is_empty() || count == 0 {
        debug!("no questions for {category}/{level} (stage {stage_id})");
        return Vec::new();
    }

    let seed = stage_seed(stage_id);
    scramble(&mut filtered, seed);

    let buckets = partition(&filtered);
    let (easy, medium, hard) = DifficultyMix::for_level(level).targets(count);

    let mut selected: Vec<&Question> = Vec::with_capacity(count);
    selected.extend(buckets.easy.iter().take(easy));
    selected.extend(buckets.medium.iter().take(medium));
    selected.extend(buckets.hard.iter().take(hard));

    if selected.len() < count {
        let chosen: HashSet<_> = selected.iter().map(|q| q.id()).collect();
        let missing = count - selected.len();
        selected.extend(
            filtered
                .iter()
                .copied()
                .filter(|q| !chosen.contains(&q.id()))
                .take(missing),
        );
    }

    permute(&mut selected, seed);
    selected.truncate(count);

    debug!(
        "selected {} of {} questions for {category}/{stage_id} (seed {seed})",
        selected.len(),
        filtered.len()
    );
    selected.into_iter().cloned().collect()
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
