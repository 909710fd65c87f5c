//! Built-in question content plus any custom questions loaded at runtime.
//!
//! Built-in data ships as one embedded JSON array per category. Entries that
//! fail validation are dropped at load time with a warning.

use std::collections::HashSet;

use log::{debug, warn};
use quiz_core::model::{CategoryId, Question, QuestionDraft, QuestionId, QuizLevel};

/// A category offered by the built-in bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryInfo {
    pub slug: &'static str,
    pub name: &'static str,
}

impl CategoryInfo {
    #[must_use]
    pub fn id(&self) -> CategoryId {
        CategoryId::new(self.slug)
    }
}

pub const BUILTIN_CATEGORIES: [CategoryInfo; 5] = [
    CategoryInfo {
        slug: "football",
        name: "كرة القدم",
    },
    CategoryInfo {
        slug: "islamic",
        name: "الثقافة الإسلامية",
    },
    CategoryInfo {
        slug: "science",
        name: "العلوم",
    },
    CategoryInfo {
        slug: "history",
        name: "التاريخ",
    },
    CategoryInfo {
        slug: "geography",
        name: "الجغرافيا",
    },
];

const BUILTIN_DATA: [(&str, &str); 5] = [
    ("football", include_str!("../data/football.json")),
    ("islamic", include_str!("../data/islamic.json")),
    ("science", include_str!("../data/science.json")),
    ("history", include_str!("../data/history.json")),
    ("geography", include_str!("../data/geography.json")),
];

/// Display name for a category slug, falling back to the slug itself.
#[must_use]
pub fn category_name(category: &CategoryId) -> &str {
    BUILTIN_CATEGORIES
        .iter()
        .find(|info| info.slug == category.as_str())
        .map_or(category.as_str(), |info| info.name)
}

fn parse_category(source: &str, raw: &str) -> Vec<Question> {
    let drafts: Vec<QuestionDraft> = match serde_json::from_str(raw) {
        Ok(drafts) => drafts,
        Err(err) => {
            warn!("skipping question data for {source}: {err}");
            return Vec::new();
        }
    };
    drafts
        .into_iter()
        .filter_map(|draft| {
            let id = draft.id;
            match draft.validate() {
                Ok(question) => Some(question),
                Err(err) => {
                    warn!("skipping question {id} in {source}: {err}");
                    None
                }
            }
        })
        .collect()
}

/// All questions available to the quiz, in a stable order.
#[derive(Debug, Clone, Default)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    /// Load the embedded content for every built-in category.
    #[must_use]
    pub fn builtin() -> Self {
        let questions: Vec<Question> = BUILTIN_DATA
            .iter()
            .flat_map(|(source, raw)| parse_category(source, raw))
            .collect();
        debug!("loaded {} built-in questions", questions.len());
        Self { questions }
    }

    #[must_use]
    pub fn from_questions(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    /// Append custom questions after the existing ones.
    ///
    /// A custom question whose id is already taken is skipped.
    #[must_use]
    pub fn with_custom(mut self, custom: impl IntoIterator<Item = Question>) -> Self {
        let mut ids: HashSet<QuestionId> = self.questions.iter().map(Question::id).collect();
        for question in custom {
            if ids.insert(question.id()) {
                self.questions.push(question);
            } else {
                warn!("ignoring custom question with duplicate id {}", question.id());
            }
        }
        self
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Every question of a category, all levels.
    #[must_use]
    pub fn pool(&self, category: &CategoryId) -> Vec<Question> {
        self.questions
            .iter()
            .filter(|q| q.category() == category)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn questions_for(&self, category: &CategoryId, level: QuizLevel) -> Vec<Question> {
        self.questions
            .iter()
            .filter(|q| q.belongs_to(category, level))
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn count(&self, category: &CategoryId, level: QuizLevel) -> usize {
        self.questions
            .iter()
            .filter(|q| q.belongs_to(category, level))
            .count()
    }

    /// Categories that hold at least one question, built-ins first.
    #[must_use]
    pub fn categories(&self) -> Vec<CategoryId> {
        let mut seen = HashSet::new();
        let mut out: Vec<CategoryId> = BUILTIN_CATEGORIES
            .iter()
            .map(CategoryInfo::id)
            .filter(|id| self.questions.iter().any(|q| q.category() == id))
            .collect();
        seen.extend(out.iter().cloned());
        for question in &self.questions {
            if seen.insert(question.category().clone()) {
                out.push(question.category().clone());
            }
        }
        out
    }

    #[must_use]
    pub fn contains_id(&self, id: QuestionId) -> bool {
        self.questions.iter().any(|q| q.id() == id)
    }

    /// One above the highest id in the bank.
    #[must_use]
    pub fn next_free_id(&self) -> QuestionId {
        let max = self.questions.iter().map(|q| q.id().value()).max().unwrap_or(0);
        QuestionId::new(max.saturating_add(1))
    }

    pub fn push(&mut self, question: Question) {
        self.questions.push(question);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(questions: &[Question]) -> Vec<u32> {
        questions.iter().map(|q| q.id().value()).collect()
    }

    #[test]
    fn builtin_bank_covers_every_category_and_level() {
        let bank = QuestionBank::builtin();
        for info in BUILTIN_CATEGORIES {
            for level in QuizLevel::ALL {
                assert!(
                    bank.count(&info.id(), level) > 0,
                    "{} {level} has no questions",
                    info.slug
                );
            }
        }
        assert_eq!(bank.categories().len(), BUILTIN_CATEGORIES.len());
    }

    #[test]
    fn geography_beginner_keeps_file_order() {
        let bank = QuestionBank::builtin();
        let beginner = bank.questions_for(&CategoryId::new("geography"), QuizLevel::Beginner);
        assert_eq!(ids(&beginner), (2001..=2010).collect::<Vec<_>>());
    }

    #[test]
    fn builtin_ids_are_unique() {
        let bank = QuestionBank::builtin();
        let unique: HashSet<QuestionId> = bank.questions().iter().map(Question::id).collect();
        assert_eq!(unique.len(), bank.questions().len());
    }

    #[test]
    fn invalid_entries_are_dropped() {
        let raw = r#"[
            {"id": 1, "text": "صالح", "options": ["أ", "ب"], "correctAnswerIndex": 1,
             "category": "science", "level": "beginner"},
            {"id": 2, "text": "", "options": ["أ", "ب"], "correctAnswerIndex": 0,
             "category": "science", "level": "beginner"},
            {"id": 3, "text": "خارج النطاق", "options": ["أ", "ب"], "correctAnswerIndex": 4,
             "category": "science", "level": "beginner"}
        ]"#;
        assert_eq!(ids(&parse_category("test", raw)), vec![1]);
        assert!(parse_category("test", "not json").is_empty());
    }

    #[test]
    fn custom_questions_extend_the_pool() {
        let bank = QuestionBank::builtin();
        let next = bank.next_free_id();
        assert!(!bank.contains_id(next));

        let custom = QuestionDraft {
            id: next,
            text: "سؤال جديد".into(),
            options: vec!["أ".into(), "ب".into(), "ج".into()],
            correct_answer_index: 2,
            category: CategoryId::new("puzzles"),
            level: QuizLevel::Beginner,
            difficulty: None,
            stage_id: None,
            explanation: None,
        }
        .validate()
        .unwrap();
        let duplicate = custom.clone().with_id(QuestionId::new(2001));

        let bank = bank.with_custom([custom, duplicate]);
        assert!(bank.contains_id(next));
        assert_eq!(bank.count(&CategoryId::new("puzzles"), QuizLevel::Beginner), 1);
        assert_eq!(bank.categories().last(), Some(&CategoryId::new("puzzles")));
        assert_eq!(category_name(&CategoryId::new("puzzles")), "puzzles");
        assert_eq!(category_name(&CategoryId::new("science")), "العلوم");
    }
}
