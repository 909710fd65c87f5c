mod ids;
mod level;
mod progress;
mod question;
mod stage;

pub use ids::{CategoryId, ParseIdError, QuestionId};
pub use level::{LevelParseError, QuizLevel, StageTier};
pub use progress::{Percentage, ProgressRecord, clamp_percentage};
pub use question::{DifficultyBucket, Question, QuestionDraft, QuestionError};
pub use stage::{
    STAGES_PER_LEVEL, Stage, StageId, StageIdError, StageReward, UnlockRule, stage_catalog,
    stages_for_level,
};
