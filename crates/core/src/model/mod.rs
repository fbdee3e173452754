mod bank;
mod ids;
mod mode;
mod question;

pub use ids::{QuestionId, VariantTag};

pub use bank::{Deduplicated, QuestionBank, dedup_questions};
pub use mode::{
    CategoryWeight, CategoryWeights, ConfigError, ModeTag, PassFraction, SessionConfig,
    SessionMode,
};
pub use question::{AnswerSet, DEFAULT_CATEGORY, Question, QuestionError};
