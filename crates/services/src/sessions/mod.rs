mod plan;
mod progress;
mod service;
mod view;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use plan::{QuestionSampler, SessionPlan};
pub use progress::{SessionStats, pass_threshold};
pub use service::{Advance, EndReason, QuizSession, SessionPhase, TickOutcome};
pub use view::{Mistake, SessionReport, SessionSnapshot};
pub use workflow::QuizLoopService;
