//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{ConfigError, QuestionId, VariantTag};
use storage::StorageError;

use crate::sessions::SessionPhase;

/// Errors emitted while resolving quiz configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("unknown quiz variant: {0}")]
    UnknownVariant(VariantTag),
    #[error("variant {0} is listed more than once")]
    DuplicateVariant(VariantTag),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("cannot read catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors emitted by quiz sessions.
///
/// State-machine misuse never mutates the session: an operation that
/// returns an error leaves every field as it was.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no questions available for session")]
    Empty,
    #[error("cannot {op} while session is {phase}")]
    InvalidTransition {
        op: &'static str,
        phase: SessionPhase,
    },
    #[error("session is paused")]
    Paused,
    #[error("session has no timer")]
    Untimed,
    #[error("question {0} is not part of this session")]
    UnknownQuestion(QuestionId),
    #[error("option {index} does not exist on question {id}")]
    OptionOutOfRange { id: QuestionId, index: usize },
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
