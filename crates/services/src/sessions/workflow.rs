use std::sync::Arc;

use quiz_core::Clock;
use quiz_core::model::{ModeTag, VariantTag};
use storage::QuestionBankRepository;

use super::service::QuizSession;
use crate::catalog::QuizCatalog;
use crate::error::SessionError;

/// Orchestrates bank loading, configuration and session start.
#[derive(Clone)]
pub struct QuizLoopService {
    clock: Clock,
    banks: Arc<dyn QuestionBankRepository>,
    catalog: Arc<QuizCatalog>,
}

impl QuizLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        banks: Arc<dyn QuestionBankRepository>,
        catalog: Arc<QuizCatalog>,
    ) -> Self {
        Self {
            clock,
            banks,
            catalog,
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &QuizCatalog {
        &self.catalog
    }

    /// Start a new session for the given variant and mode.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` for catalog, storage or session start failures.
    pub async fn start_session(
        &self,
        variant: &VariantTag,
        mode: ModeTag,
    ) -> Result<QuizSession, SessionError> {
        let config = self.catalog.session_config(variant, mode)?;
        let bank = self.banks.load_bank(variant).await?;

        let mut session = QuizSession::new(self.clock);
        session.start_session(config, bank.questions(), &mut rand::rng())?;
        Ok(session)
    }

    /// Start the same variant and mode again with a freshly sampled sequence.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` if the session was never
    /// configured, or storage / session start failures.
    pub async fn restart(&self, session: &mut QuizSession) -> Result<(), SessionError> {
        let Some(variant) = session.config().map(|c| c.variant().clone()) else {
            return Err(SessionError::InvalidTransition {
                op: "restart",
                phase: session.phase(),
            });
        };
        let bank = self.banks.load_bank(&variant).await?;
        session.restart(bank.questions(), &mut rand::rng())?;
        Ok(())
    }
}
