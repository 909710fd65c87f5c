use log::debug;
use serde::Serialize;

use quiz_core::gate::is_passing;
use quiz_core::model::{CategoryId, Percentage, Question, QuestionId, QuizLevel, StageId};
use quiz_core::scoring::{base_points, percentage, question_score, time_limit_secs};
use quiz_core::{Clock, QuestionTimer};

use crate::error::QuizServiceError;

/// What a quiz counts towards once finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "stageId")]
pub enum QuizKind {
    Stage(StageId),
    Level,
}

/// Outcome of one answered (or timed-out) question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub question_id: QuestionId,
    /// `None` when the timer ran out.
    pub selected: Option<usize>,
    pub correct: bool,
    pub points: u32,
    pub remaining_secs: u32,
    pub correct_answer_index: usize,
}

/// Summary of a finished quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub category: CategoryId,
    pub level: QuizLevel,
    pub kind: QuizKind,
    pub total: usize,
    pub correct: usize,
    pub score: u32,
    pub percentage: Percentage,
    pub passed: bool,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory run through a fixed list of questions.
///
/// Each question gets a fresh [`QuestionTimer`]; points depend on the time
/// left when the answer arrives.
#[derive(Debug, Clone)]
pub struct QuizSession {
    category: CategoryId,
    level: QuizLevel,
    kind: QuizKind,
    questions: Vec<Question>,
    current: usize,
    timer: QuestionTimer,
    answers: Vec<AnswerOutcome>,
    score: u32,
    correct: usize,
}

impl QuizSession {
    /// Start a session on the first question.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Empty` if `questions` is empty.
    pub fn new(
        category: CategoryId,
        level: QuizLevel,
        kind: QuizKind,
        questions: Vec<Question>,
        clock: &Clock,
    ) -> Result<Self, QuizServiceError> {
        if questions.is_empty() {
            return Err(QuizServiceError::Empty { category, level });
        }
        Ok(Self {
            category,
            level,
            kind,
            questions,
            current: 0,
            timer: QuestionTimer::start(clock, time_limit_secs(level)),
            answers: Vec::new(),
            score: 0,
            correct: 0,
        })
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
    pub fn kind(&self) -> QuizKind {
        self.kind
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn answers(&self) -> &[AnswerOutcome] {
        &self.answers
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.questions.len()
    }

    /// Zero-based position of the current question.
    #[must_use]
    pub fn position(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn correct_count(&self) -> usize {
        self.correct
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current)
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.current >= self.questions.len()
    }

    /// Seconds left on the current question.
    #[must_use]
    pub fn remaining_secs(&self, clock: &Clock) -> u32 {
        if self.is_complete() {
            return 0;
        }
        self.timer.remaining_secs(clock)
    }

    #[must_use]
    pub fn is_timed_out(&self, clock: &Clock) -> bool {
        !self.is_complete() && self.timer.is_expired(clock)
    }

    /// Answer the current question with the zero-based `option`.
    ///
    /// An answer arriving after the timer ran out is handled as a time-out.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Completed` when every question is answered,
    /// or `InvalidAnswer` when `option` is not one of the question's options.
    pub fn answer(
        &mut self,
        option: usize,
        clock: &Clock,
    ) -> Result<&AnswerOutcome, QuizServiceError> {
        let Some(question) = self.current_question() else {
            return Err(QuizServiceError::Completed);
        };
        let count = question.options().len();
        if option >= count {
            return Err(QuizServiceError::InvalidAnswer { index: option, count });
        }
        if self.timer.is_expired(clock) {
            return self.time_out(clock);
        }
        let remaining = self.timer.remaining_secs(clock);
        self.record(Some(option), remaining, clock)
    }

    /// Close the current question without an answer.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Completed` when every question is answered.
    pub fn time_out(&mut self, clock: &Clock) -> Result<&AnswerOutcome, QuizServiceError> {
        if self.is_complete() {
            return Err(QuizServiceError::Completed);
        }
        self.record(None, 0, clock)
    }

    fn record(
        &mut self,
        selected: Option<usize>,
        remaining_secs: u32,
        clock: &Clock,
    ) -> Result<&AnswerOutcome, QuizServiceError> {
        let Some(question) = self.questions.get(self.current) else {
            return Err(QuizServiceError::Completed);
        };
        self.timer.cancel();

        let correct = selected.is_some_and(|index| question.is_correct(index));
        let points = question_score(
            correct,
            remaining_secs,
            self.timer.limit_secs(),
            base_points(self.level),
        );
        let outcome = AnswerOutcome {
            question_id: question.id(),
            selected,
            correct,
            points,
            remaining_secs,
            correct_answer_index: question.correct_answer_index(),
        };
        debug!(
            "question {} answered: correct={correct} points={points} remaining={remaining_secs}s",
            outcome.question_id
        );

        self.score += points;
        if correct {
            self.correct += 1;
        }
        self.answers.push(outcome);
        self.current += 1;
        if !self.is_complete() {
            self.timer.restart(clock);
        }

        self.answers.last().ok_or(QuizServiceError::Completed)
    }

    /// Result so far; final once [`is_complete`](Self::is_complete).
    #[must_use]
    pub fn result(&self) -> QuizResult {
        let percentage = percentage(self.correct, self.questions.len());
        QuizResult {
            category: self.category.clone(),
            level: self.level,
            kind: self.kind,
            total: self.questions.len(),
            correct: self.correct,
            score: self.score,
            percentage,
            passed: is_passing(percentage),
        }
    }
}
