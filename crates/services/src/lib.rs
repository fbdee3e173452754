#![forbid(unsafe_code)]

pub mod catalog;
pub mod error;
pub mod sessions;

pub use quiz_core::Clock;
pub use sessions as session;

pub use catalog::{ExamSettings, PracticeSettings, QuizCatalog, VariantSettings};
pub use error::{CatalogError, SessionError};

pub use sessions::{
    Advance, EndReason, Mistake, QuestionSampler, QuizLoopService, QuizSession, SessionPhase,
    SessionPlan, SessionReport, SessionSnapshot, SessionStats, TickOutcome,
};
