use std::sync::{Arc, PoisonError, RwLock};

use log::{info, warn};
use rand::rng;
use rand::seq::SliceRandom;
use serde::Serialize;

use quiz_core::gate::{
    is_level_unlocked, is_stage_unlocked, record_level_completion, record_stage_completion,
};
use quiz_core::model::{
    CategoryId, Percentage, ProgressRecord, Question, QuestionDraft, QuizLevel, Stage, StageId,
    StageReward, stages_for_level,
};
use quiz_core::selector::select_stage_questions;
use storage::bank::QuestionBank;
use storage::repository::{CustomQuestionStore, ProgressStore, StorageError};

use crate::Clock;
use crate::error::QuizServiceError;
use crate::session::{QuizKind, QuizResult, QuizSession};

/// Questions drawn for one stage.
pub const QUESTIONS_PER_STAGE: usize = 10;

/// Questions drawn at random for a whole-level quiz.
pub const LEVEL_QUIZ_SIZE: usize = 10;

/// Access and stored score for one level of a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelStatus {
    pub level: QuizLevel,
    pub unlocked: bool,
    pub percentage: Percentage,
    pub question_count: usize,
}

/// Access and stored result for one stage of a level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageStatus {
    pub stage: Stage,
    pub unlocked: bool,
    pub completed: bool,
    pub percentage: Percentage,
}

/// What finishing a quiz changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizOutcome {
    pub result: QuizResult,
    /// Level that became accessible because of this result.
    pub unlocked_level: Option<QuizLevel>,
    /// Stage that became accessible because of this result.
    pub unlocked_stage: Option<StageId>,
    /// Reward of a passed stage.
    pub reward: Option<StageReward>,
}

/// Orchestrates quizzes over the question bank and the progress store.
///
/// Progress is loaded fresh for every decision and written back whole after
/// each finished quiz.
pub struct QuizService {
    clock: Clock,
    bank: RwLock<QuestionBank>,
    progress: Arc<dyn ProgressStore>,
    custom_questions: Arc<dyn CustomQuestionStore>,
}

impl QuizService {
    #[must_use]
    pub fn new(
        clock: Clock,
        bank: QuestionBank,
        progress: Arc<dyn ProgressStore>,
        custom_questions: Arc<dyn CustomQuestionStore>,
    ) -> Self {
        Self {
            clock,
            bank: RwLock::new(bank),
            progress,
            custom_questions,
        }
    }

    /// Build a service over the built-in bank plus stored custom questions.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Storage` if custom questions cannot be read.
    pub async fn load(
        clock: Clock,
        progress: Arc<dyn ProgressStore>,
        custom_questions: Arc<dyn CustomQuestionStore>,
    ) -> Result<Self, QuizServiceError> {
        let custom = custom_questions.load_custom_questions().await?;
        let bank = QuestionBank::builtin().with_custom(custom);
        Ok(Self::new(clock, bank, progress, custom_questions))
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    fn with_bank<R>(&self, f: impl FnOnce(&QuestionBank) -> R) -> R {
        let bank = self.bank.read().unwrap_or_else(PoisonError::into_inner);
        f(&bank)
    }

    #[must_use]
    pub fn categories(&self) -> Vec<CategoryId> {
        self.with_bank(QuestionBank::categories)
    }

    #[must_use]
    pub fn question_count(&self, category: &CategoryId, level: QuizLevel) -> usize {
        self.with_bank(|bank| bank.count(category, level))
    }

    /// # Errors
    ///
    /// Returns `QuizServiceError::Storage` if progress cannot be loaded.
    pub async fn progress(&self) -> Result<ProgressRecord, QuizServiceError> {
        Ok(self.progress.load_progress().await?)
    }

    /// Per-level access for `category`, in play order.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Storage` if progress cannot be loaded.
    pub async fn level_overview(
        &self,
        category: &CategoryId,
    ) -> Result<Vec<LevelStatus>, QuizServiceError> {
        let progress = self.progress.load_progress().await?;
        Ok(QuizLevel::ALL
            .into_iter()
            .map(|level| LevelStatus {
                level,
                unlocked: is_level_unlocked(category, level, &progress),
                percentage: progress.level_percentage(category, level),
                question_count: self.question_count(category, level),
            })
            .collect())
    }

    /// Per-stage access for one level of `category`, in play order.
    ///
    /// Stages of a locked level are all reported locked.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Storage` if progress cannot be loaded.
    pub async fn stage_overview(
        &self,
        category: &CategoryId,
        level: QuizLevel,
    ) -> Result<Vec<StageStatus>, QuizServiceError> {
        let progress = self.progress.load_progress().await?;
        let level_open = is_level_unlocked(category, level, &progress);
        Ok(stages_for_level(level)
            .into_iter()
            .map(|stage| {
                let id = stage.id.to_string();
                StageStatus {
                    unlocked: level_open && is_stage_unlocked(category, &id, &progress),
                    completed: progress.stage_passed(category, &id),
                    percentage: progress.stage_percentage(category, &id),
                    stage,
                }
            })
            .collect())
    }

    /// Start the stage `stage_id` of `category`.
    ///
    /// # Errors
    ///
    /// Returns `Stage` for a malformed id, `LevelLocked` / `StageLocked` when
    /// access is not granted yet, `Empty` when there is no content, and
    /// `Storage` if progress cannot be loaded.
    pub async fn start_stage(
        &self,
        category: &CategoryId,
        stage_id: &str,
    ) -> Result<QuizSession, QuizServiceError> {
        let stage: StageId = stage_id.parse()?;
        let level = stage.level();
        let progress = self.progress.load_progress().await?;

        if !is_level_unlocked(category, level, &progress) {
            return Err(QuizServiceError::LevelLocked {
                category: category.clone(),
                level,
            });
        }
        if !is_stage_unlocked(category, &stage.to_string(), &progress) {
            return Err(QuizServiceError::StageLocked {
                category: category.clone(),
                stage_id: stage.to_string(),
            });
        }

        let questions = self.with_bank(|bank| {
            select_stage_questions(
                &bank.pool(category),
                category,
                level,
                QUESTIONS_PER_STAGE,
                &stage.to_string(),
            )
        });
        info!(
            "starting stage {category}/{stage} with {} questions",
            questions.len()
        );
        QuizSession::new(
            category.clone(),
            level,
            QuizKind::Stage(stage),
            questions,
            &self.clock,
        )
    }

    /// Start a whole-level quiz with a random pick of the level's questions.
    ///
    /// # Errors
    ///
    /// Returns `LevelLocked` when the level is not open, `Empty` when there is
    /// no content, and `Storage` if progress cannot be loaded.
    pub async fn start_level_quiz(
        &self,
        category: &CategoryId,
        level: QuizLevel,
    ) -> Result<QuizSession, QuizServiceError> {
        let progress = self.progress.load_progress().await?;
        if !is_level_unlocked(category, level, &progress) {
            return Err(QuizServiceError::LevelLocked {
                category: category.clone(),
                level,
            });
        }

        let mut questions = self.with_bank(|bank| bank.questions_for(category, level));
        let mut rng = rng();
        questions.as_mut_slice().shuffle(&mut rng);
        questions.truncate(LEVEL_QUIZ_SIZE);
        info!(
            "starting level quiz {category}/{level} with {} questions",
            questions.len()
        );
        QuizSession::new(category.clone(), level, QuizKind::Level, questions, &self.clock)
    }

    /// Answer the current question of `session` against the service clock.
    ///
    /// # Errors
    ///
    /// See [`QuizSession::answer`].
    pub fn answer(
        &self,
        session: &mut QuizSession,
        option: usize,
    ) -> Result<QuizResult, QuizServiceError> {
        session.answer(option, &self.clock)?;
        Ok(session.result())
    }

    /// Record a completed session and persist the whole progress record.
    ///
    /// # Errors
    ///
    /// Returns `Incomplete` if questions are still open and `Storage` if the
    /// record cannot be loaded or saved.
    pub async fn finish(&self, session: &QuizSession) -> Result<QuizOutcome, QuizServiceError> {
        if !session.is_complete() {
            return Err(QuizServiceError::Incomplete);
        }
        let result = session.result();
        let category = session.category();
        let mut progress = self.progress.load_progress().await?;

        let outcome = match session.kind() {
            QuizKind::Stage(stage) => {
                let id = stage.to_string();
                let next = stage.next();
                let next_was_open = next.is_some_and(|next| {
                    is_stage_unlocked(category, &next.to_string(), &progress)
                });
                // A stage once passed stays passed; only the percentage moves.
                let passed = result.passed || progress.stage_passed(category, &id);
                record_stage_completion(&mut progress, category, &id, passed, result.percentage);
                let unlocked_stage = next.filter(|next| {
                    !next_was_open && is_stage_unlocked(category, &next.to_string(), &progress)
                });
                let reward = if result.passed {
                    stages_for_level(stage.level())
                        .into_iter()
                        .find(|candidate| candidate.id == stage)
                        .and_then(|found| found.reward)
                } else {
                    None
                };
                QuizOutcome {
                    result,
                    unlocked_level: None,
                    unlocked_stage,
                    reward,
                }
            }
            QuizKind::Level => {
                let level = session.level();
                let next = level.next();
                let next_was_open =
                    next.is_some_and(|next| is_level_unlocked(category, next, &progress));
                record_level_completion(&mut progress, category, level, result.percentage);
                let unlocked_level = next.filter(|next| {
                    !next_was_open && is_level_unlocked(category, *next, &progress)
                });
                QuizOutcome {
                    result,
                    unlocked_level,
                    unlocked_stage: None,
                    reward: None,
                }
            }
        };

        self.progress.save_progress(&progress).await?;
        Ok(outcome)
    }

    /// Forget everything recorded for `category`.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Storage` if the record cannot be updated.
    pub async fn reset_category(&self, category: &CategoryId) -> Result<(), QuizServiceError> {
        let mut progress = self.progress.load_progress().await?;
        progress.clear_category(category);
        self.progress.save_progress(&progress).await?;
        warn!("progress reset for {category}");
        Ok(())
    }

    /// Forget all recorded progress.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Storage` if the record cannot be removed.
    pub async fn reset_all(&self) -> Result<(), QuizServiceError> {
        self.progress.clear_progress().await?;
        warn!("all progress reset");
        Ok(())
    }

    /// Validate, store and add a custom question to the bank.
    ///
    /// A colliding id is replaced with the next free one.
    ///
    /// # Errors
    ///
    /// Returns `Question` for invalid drafts and `Storage` if the question
    /// cannot be persisted.
    pub async fn add_custom_question(
        &self,
        draft: QuestionDraft,
    ) -> Result<Question, QuizServiceError> {
        let mut question = draft.validate()?;
        let taken =
            self.with_bank(|bank| bank.contains_id(question.id()).then(|| bank.next_free_id()));
        if let Some(free) = taken {
            info!("custom question id {} taken, using {free}", question.id());
            question = question.with_id(free);
        }

        self.custom_questions.append_custom_question(&question).await?;
        self.bank
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(question.clone());
        Ok(question)
    }

    /// Pretty-printed JSON of the stored progress record.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Storage` if progress cannot be loaded or
    /// encoded.
    pub async fn export_progress(&self) -> Result<String, QuizServiceError> {
        let progress = self.progress.load_progress().await?;
        serde_json::to_string_pretty(&progress).map_err(|err| {
            QuizServiceError::Storage(StorageError::Serialization(err.to_string()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::time::fixed_clock;
    use storage::InMemoryRepository;

    fn service() -> (QuizService, InMemoryRepository) {
        let repo = InMemoryRepository::new();
        let service = QuizService::new(
            fixed_clock(),
            QuestionBank::builtin(),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        );
        (service, repo)
    }

    fn play_through(service: &QuizService, session: &mut QuizSession, correct: usize) {
        let mut answered = 0;
        while let Some(question) = session.current_question() {
            let right = question.correct_answer_index();
            let option = if answered < correct {
                right
            } else {
                (right + 1) % question.options().len()
            };
            service.answer(session, option).unwrap();
            answered += 1;
        }
    }

    #[tokio::test]
    async fn stage_selection_matches_selector() {
        let (service, _) = service();
        let geography = CategoryId::new("geography");
        let session = service.start_stage(&geography, "beginner-1").await.unwrap();
        let ids: Vec<u32> = session.questions().iter().map(|q| q.id().value()).collect();
        assert_eq!(
            ids,
            vec![2007, 2009, 2001, 2002, 2010, 2003, 2004, 2008, 2005, 2006]
        );
    }

    #[tokio::test]
    async fn locked_stage_and_level_are_refused() {
        let (service, _) = service();
        let football = CategoryId::new("football");
        assert!(matches!(
            service.start_stage(&football, "beginner-2").await,
            Err(QuizServiceError::StageLocked { .. })
        ));
        assert!(matches!(
            service.start_stage(&football, "intermediate-1").await,
            Err(QuizServiceError::LevelLocked { .. })
        ));
        assert!(matches!(
            service.start_level_quiz(&football, QuizLevel::Advanced).await,
            Err(QuizServiceError::LevelLocked { .. })
        ));
        assert!(matches!(
            service.start_stage(&football, "stage-x").await,
            Err(QuizServiceError::Stage(_))
        ));
    }

    #[tokio::test]
    async fn finishing_early_is_refused() {
        let (service, _) = service();
        let session = service
            .start_stage(&CategoryId::new("history"), "beginner-1")
            .await
            .unwrap();
        assert!(matches!(
            service.finish(&session).await,
            Err(QuizServiceError::Incomplete)
        ));
    }

    #[tokio::test]
    async fn passing_a_stage_opens_the_next_and_pays_reward() {
        let (service, repo) = service();
        let football = CategoryId::new("football");
        let mut session = service.start_stage(&football, "beginner-1").await.unwrap();
        play_through(&service, &mut session, 8);

        let outcome = service.finish(&session).await.unwrap();
        assert_eq!(outcome.result.percentage, 80);
        assert!(outcome.result.passed);
        assert_eq!(
            outcome.unlocked_stage,
            Some(StageId::new(QuizLevel::Beginner, 2))
        );
        assert_eq!(outcome.reward.map(|r| r.coins), Some(10));

        let stored = repo.load_progress().await.unwrap();
        assert!(stored.stage_passed(&football, "beginner-1"));
        assert_eq!(stored.stage_percentage(&football, "beginner-1"), 80);
        assert!(service.start_stage(&football, "beginner-2").await.is_ok());

        let stages = service
            .stage_overview(&football, QuizLevel::Beginner)
            .await
            .unwrap();
        assert!(stages[0].completed);
        assert!(stages[1].unlocked);
        assert!(!stages[2].unlocked);
    }

    #[tokio::test]
    async fn failing_a_stage_keeps_the_next_locked() {
        let (service, _) = service();
        let science = CategoryId::new("science");
        let mut session = service.start_stage(&science, "beginner-1").await.unwrap();
        play_through(&service, &mut session, 6);

        let outcome = service.finish(&session).await.unwrap();
        assert!(!outcome.result.passed);
        assert_eq!(outcome.unlocked_stage, None);
        assert_eq!(outcome.reward, None);
        assert!(matches!(
            service.start_stage(&science, "beginner-2").await,
            Err(QuizServiceError::StageLocked { .. })
        ));
    }

    #[tokio::test]
    async fn failed_replay_keeps_stage_passed() {
        let (service, repo) = service();
        let football = CategoryId::new("football");
        let mut first = service.start_stage(&football, "beginner-1").await.unwrap();
        play_through(&service, &mut first, 10);
        service.finish(&first).await.unwrap();

        let mut replay = service.start_stage(&football, "beginner-1").await.unwrap();
        play_through(&service, &mut replay, 0);
        let outcome = service.finish(&replay).await.unwrap();
        assert!(!outcome.result.passed);
        assert_eq!(outcome.unlocked_stage, None);
        assert_eq!(outcome.reward, None);

        let stored = repo.load_progress().await.unwrap();
        assert!(stored.stage_passed(&football, "beginner-1"));
        assert_eq!(stored.stage_percentage(&football, "beginner-1"), 0);
        assert!(service.start_stage(&football, "beginner-2").await.is_ok());
    }

    #[tokio::test]
    async fn level_quiz_overwrites_and_gates_next_level() {
        let (service, _) = service();
        let science = CategoryId::new("science");

        let mut session = service
            .start_level_quiz(&science, QuizLevel::Beginner)
            .await
            .unwrap();
        assert_eq!(session.total(), LEVEL_QUIZ_SIZE);
        play_through(&service, &mut session, 9);
        let outcome = service.finish(&session).await.unwrap();
        assert_eq!(outcome.unlocked_level, Some(QuizLevel::Intermediate));

        let mut retry = service
            .start_level_quiz(&science, QuizLevel::Beginner)
            .await
            .unwrap();
        play_through(&service, &mut retry, 5);
        let outcome = service.finish(&retry).await.unwrap();
        assert_eq!(outcome.unlocked_level, None);

        let levels = service.level_overview(&science).await.unwrap();
        assert_eq!(levels[0].percentage, 50);
        assert!(!levels[1].unlocked);
    }

    #[tokio::test]
    async fn reset_category_leaves_others() {
        let (service, _) = service();
        let history = CategoryId::new("history");
        let islamic = CategoryId::new("islamic");
        for category in [&history, &islamic] {
            let mut session = service.start_stage(category, "beginner-1").await.unwrap();
            play_through(&service, &mut session, 10);
            service.finish(&session).await.unwrap();
        }

        service.reset_category(&history).await.unwrap();
        let progress = service.progress().await.unwrap();
        assert!(!progress.stage_passed(&history, "beginner-1"));
        assert!(progress.stage_passed(&islamic, "beginner-1"));

        service.reset_all().await.unwrap();
        assert!(service.progress().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn custom_question_with_taken_id_is_renumbered() {
        let (service, repo) = service();
        let draft = QuestionDraft {
            id: quiz_core::model::QuestionId::new(2001),
            text: "ما عاصمة الأردن؟".into(),
            options: vec!["عمّان".into(), "إربد".into()],
            correct_answer_index: 0,
            category: CategoryId::new("geography"),
            level: QuizLevel::Beginner,
            difficulty: None,
            stage_id: None,
            explanation: None,
        };
        let before = service.question_count(&CategoryId::new("geography"), QuizLevel::Beginner);
        let added = service.add_custom_question(draft).await.unwrap();
        assert_ne!(added.id().value(), 2001);
        assert_eq!(
            service.question_count(&CategoryId::new("geography"), QuizLevel::Beginner),
            before + 1
        );
        assert_eq!(repo.load_custom_questions().await.unwrap(), vec![added]);

        let invalid = QuestionDraft {
            id: quiz_core::model::QuestionId::new(1),
            text: "بلا خيارات".into(),
            options: vec!["وحيد".into()],
            correct_answer_index: 0,
            category: CategoryId::new("geography"),
            level: QuizLevel::Beginner,
            difficulty: None,
            stage_id: None,
            explanation: None,
        };
        assert!(matches!(
            service.add_custom_question(invalid).await,
            Err(QuizServiceError::Question(_))
        ));
    }
}
