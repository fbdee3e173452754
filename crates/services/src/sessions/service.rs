use chrono::{DateTime, Utc};
use rand::Rng;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};

use quiz_core::Clock;
use quiz_core::model::{AnswerSet, Question, QuestionId, SessionConfig};

use super::plan::{QuestionSampler, SessionPlan};
use super::progress::SessionStats;
use super::view::{SessionReport, SessionSnapshot};
use crate::error::SessionError;

//
// ─── STATES AND OUTCOMES ───────────────────────────────────────────────────────
//

/// Lifecycle of a quiz session. `Paused` is a flag on `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Unconfigured,
    Configured,
    Running,
    Terminated,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::Unconfigured => "unconfigured",
            SessionPhase::Configured => "configured",
            SessionPhase::Running => "running",
            SessionPhase::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Why a session terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// Advanced past the last question or finished by hand.
    Completed,
    /// The elapsed counter reached the time ceiling.
    TimeExpired,
}

/// Effect of a single `tick()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not running, paused, or untimed: nothing changed.
    Ignored,
    Counted,
    /// This tick reached the ceiling and terminated the session.
    Expired,
}

/// Effect of a successful `advance()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Moved { index: usize },
    Finished,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// The single mutable quiz session.
///
/// All related fields change together inside one operation, so the
/// invariants hold between calls: `current < questions.len()` while running,
/// answer keys are ids of session questions, and nothing but `reset` touches
/// a terminated session.
pub struct QuizSession {
    clock: Clock,
    phase: SessionPhase,
    config: Option<SessionConfig>,
    plan: Option<SessionPlan>,
    current: usize,
    answers: HashMap<QuestionId, AnswerSet>,
    elapsed_secs: u32,
    paused: bool,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    end_reason: Option<EndReason>,
}

impl Default for QuizSession {
    fn default() -> Self {
        Self::new(Clock::default())
    }
}

impl QuizSession {
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            phase: SessionPhase::Unconfigured,
            config: None,
            plan: None,
            current: 0,
            answers: HashMap::new(),
            elapsed_secs: 0,
            paused: false,
            started_at: None,
            completed_at: None,
            end_reason: None,
        }
    }

    fn invalid(&self, op: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            op,
            phase: self.phase,
        }
    }

    fn ensure_running(&self, op: &'static str) -> Result<(), SessionError> {
        if self.phase != SessionPhase::Running {
            return Err(self.invalid(op));
        }
        Ok(())
    }

    /// Select variant and mode ahead of starting.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` once a session is running or
    /// terminated; call `reset` first.
    pub fn configure(&mut self, config: SessionConfig) -> Result<(), SessionError> {
        match self.phase {
            SessionPhase::Unconfigured | SessionPhase::Configured => {
                self.config = Some(config);
                self.phase = SessionPhase::Configured;
                Ok(())
            }
            SessionPhase::Running | SessionPhase::Terminated => Err(self.invalid("configure")),
        }
    }

    /// Sample questions for the configured mode and start running.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless `Configured`, and
    /// `SessionError::Empty` when the sample is empty (the session stays
    /// `Configured`).
    pub fn start<R: Rng + ?Sized>(
        &mut self,
        pool: &[Question],
        rng: &mut R,
    ) -> Result<&SessionPlan, SessionError> {
        if self.phase != SessionPhase::Configured {
            return Err(self.invalid("start"));
        }
        let Some(config) = self.config.as_ref() else {
            return Err(self.invalid("start"));
        };

        let plan = QuestionSampler::new(config.mode()).sample(pool, rng);
        if plan.is_empty() {
            return Err(SessionError::Empty);
        }

        info!(
            variant = %config.variant(),
            mode = %config.mode().tag(),
            questions = plan.total(),
            pool = pool.len(),
            "quiz session started"
        );

        self.current = 0;
        self.answers.clear();
        self.elapsed_secs = 0;
        self.paused = false;
        self.started_at = Some(self.clock.now());
        self.completed_at = None;
        self.end_reason = None;
        self.phase = SessionPhase::Running;
        Ok(self.plan.insert(plan))
    }

    /// `configure` followed by `start`.
    ///
    /// # Errors
    ///
    /// See [`QuizSession::configure`] and [`QuizSession::start`].
    pub fn start_session<R: Rng + ?Sized>(
        &mut self,
        config: SessionConfig,
        pool: &[Question],
        rng: &mut R,
    ) -> Result<&SessionPlan, SessionError> {
        self.configure(config)?;
        self.start(pool, rng)
    }

    /// Toggle `option` in the selection for `question_id`.
    ///
    /// Returns whether the option is selected afterwards. A selection that
    /// becomes empty is dropped, leaving the question unanswered.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless running,
    /// `SessionError::Paused` while paused, and `UnknownQuestion` /
    /// `OptionOutOfRange` for ids or indices outside the session.
    pub fn set_answer(
        &mut self,
        question_id: &QuestionId,
        option: usize,
    ) -> Result<bool, SessionError> {
        self.ensure_running("answer")?;
        if self.paused {
            return Err(SessionError::Paused);
        }
        let question = self
            .questions()
            .iter()
            .find(|q| q.id() == question_id)
            .ok_or_else(|| SessionError::UnknownQuestion(question_id.clone()))?;
        if option >= question.options().len() {
            return Err(SessionError::OptionOutOfRange {
                id: question_id.clone(),
                index: option,
            });
        }

        let selection = self.answers.entry(question_id.clone()).or_default();
        let selected = selection.toggle(option);
        if selection.is_empty() {
            self.answers.remove(question_id);
        }
        Ok(selected)
    }

    /// `set_answer` on the current question.
    ///
    /// # Errors
    ///
    /// See [`QuizSession::set_answer`].
    pub fn toggle_current(&mut self, option: usize) -> Result<bool, SessionError> {
        self.ensure_running("answer")?;
        let id = self
            .current_question()
            .map(|q| q.id().clone())
            .ok_or_else(|| self.invalid("answer"))?;
        self.set_answer(&id, option)
    }

    /// Move to the next question, or terminate after the last one.
    ///
    /// Whether the current question must be answered first is up to the
    /// caller.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless running and
    /// `SessionError::Paused` while paused.
    pub fn advance(&mut self) -> Result<Advance, SessionError> {
        self.ensure_running("advance")?;
        if self.paused {
            return Err(SessionError::Paused);
        }
        if self.current + 1 >= self.total() {
            self.terminate(EndReason::Completed);
            return Ok(Advance::Finished);
        }
        self.current += 1;
        debug!(index = self.current, "advanced to next question");
        Ok(Advance::Moved {
            index: self.current,
        })
    }

    /// End a running session now, from any position.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless running and
    /// `SessionError::Paused` while paused.
    pub fn finish(&mut self) -> Result<(), SessionError> {
        self.ensure_running("finish")?;
        if self.paused {
            return Err(SessionError::Paused);
        }
        self.terminate(EndReason::Completed);
        Ok(())
    }

    /// Flip the pause flag of a timed session. Returns the new flag.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless running and
    /// `SessionError::Untimed` when the mode has no time ceiling.
    pub fn toggle_pause(&mut self) -> Result<bool, SessionError> {
        self.ensure_running("pause")?;
        if self.time_ceiling().is_none() {
            return Err(SessionError::Untimed);
        }
        self.paused = !self.paused;
        debug!(paused = self.paused, elapsed = self.elapsed_secs, "pause toggled");
        Ok(self.paused)
    }

    /// Count one elapsed second.
    ///
    /// Only a running, unpaused, timed session counts; every other call is
    /// a no-op, so a tick that arrives after termination or reset is
    /// harmless. Reaching the ceiling clamps the counter and terminates.
    pub fn tick(&mut self) -> TickOutcome {
        if self.phase != SessionPhase::Running || self.paused {
            return TickOutcome::Ignored;
        }
        let Some(ceiling) = self.time_ceiling() else {
            return TickOutcome::Ignored;
        };

        let next = self.elapsed_secs.saturating_add(1);
        if next >= ceiling {
            self.elapsed_secs = ceiling;
            self.terminate(EndReason::TimeExpired);
            TickOutcome::Expired
        } else {
            self.elapsed_secs = next;
            TickOutcome::Counted
        }
    }

    /// Drop everything and return to `Unconfigured`.
    pub fn reset(&mut self) {
        debug!(phase = %self.phase, "session reset");
        *self = Self::new(self.clock);
    }

    /// Reset and start again with the same configuration and a fresh sample.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` when no configuration was
    /// ever set, otherwise see [`QuizSession::start`].
    pub fn restart<R: Rng + ?Sized>(
        &mut self,
        pool: &[Question],
        rng: &mut R,
    ) -> Result<&SessionPlan, SessionError> {
        let config = self.config.clone().ok_or_else(|| self.invalid("restart"))?;
        self.reset();
        self.start_session(config, pool, rng)
    }

    fn terminate(&mut self, reason: EndReason) {
        let completed_at = self.clock.now();
        self.phase = SessionPhase::Terminated;
        self.paused = false;
        self.completed_at = Some(completed_at);
        self.end_reason = Some(reason);
        info!(
            reason = ?reason,
            elapsed = self.elapsed_secs,
            answered = self.answers.len(),
            "quiz session terminated"
        );
    }

    //
    // ─── ACCESSORS ─────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.phase == SessionPhase::Running
    }

    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.phase == SessionPhase::Terminated
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[must_use]
    pub fn config(&self) -> Option<&SessionConfig> {
        self.config.as_ref()
    }

    /// The last sample, while a session is running or terminated.
    #[must_use]
    pub fn plan(&self) -> Option<&SessionPlan> {
        self.plan.as_ref()
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        self.plan.as_ref().map_or(&[], |plan| plan.questions.as_slice())
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.questions().len()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.questions().get(self.current)
    }

    /// Current selection for a question, if any option is selected.
    #[must_use]
    pub fn answer_for(&self, id: &QuestionId) -> Option<&AnswerSet> {
        self.answers.get(id)
    }

    #[must_use]
    pub fn answers(&self) -> &HashMap<QuestionId, AnswerSet> {
        &self.answers
    }

    #[must_use]
    pub fn elapsed_secs(&self) -> u32 {
        self.elapsed_secs
    }

    #[must_use]
    pub fn time_ceiling(&self) -> Option<u32> {
        self.config.as_ref().and_then(|c| c.mode().time_ceiling())
    }

    /// Seconds left before the ceiling, for timed sessions.
    #[must_use]
    pub fn remaining_secs(&self) -> Option<u32> {
        self.time_ceiling()
            .map(|ceiling| ceiling.saturating_sub(self.elapsed_secs))
    }

    #[must_use]
    pub fn end_reason(&self) -> Option<EndReason> {
        self.end_reason
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Live statistics while running or after termination.
    #[must_use]
    pub fn stats(&self) -> Option<SessionStats> {
        if !matches!(self.phase, SessionPhase::Running | SessionPhase::Terminated) {
            return None;
        }
        let config = self.config.as_ref()?;
        Some(SessionStats::compute(
            self.questions(),
            &self.answers,
            config.pass_fraction(),
        ))
    }

    /// Final grading, available once terminated.
    #[must_use]
    pub fn report(&self) -> Option<SessionReport> {
        if self.phase != SessionPhase::Terminated {
            return None;
        }
        let config = self.config.as_ref()?;
        Some(SessionReport::grade(
            self.questions(),
            &self.answers,
            config.pass_fraction(),
            self.elapsed_secs,
            self.end_reason.unwrap_or(EndReason::Completed),
            self.started_at,
            self.completed_at,
        ))
    }

    /// Everything a screen needs to render the current state.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot<'_> {
        SessionSnapshot {
            phase: self.phase,
            current_question: self.current_question(),
            current_index: self.current,
            total: self.total(),
            answers_for_current: self
                .current_question()
                .and_then(|q| self.answers.get(q.id()))
                .cloned()
                .unwrap_or_default(),
            elapsed_secs: self.elapsed_secs,
            remaining_secs: self.remaining_secs(),
            paused: self.paused,
            terminated: self.is_terminated(),
            report: self.report(),
        }
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("phase", &self.phase)
            .field("questions_len", &self.total())
            .field("current", &self.current)
            .field("answers_len", &self.answers.len())
            .field("elapsed_secs", &self.elapsed_secs)
            .field("paused", &self.paused)
            .field("end_reason", &self.end_reason)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{CategoryWeights, PassFraction, SessionMode, VariantTag};
    use quiz_core::time::fixed_now;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn build_question(id: u64) -> Question {
        Question::new(
            QuestionId::from(id),
            format!("Q{id}"),
            vec!["x".into(), "y".into(), "z".into()],
            [0, 2].into(),
            None,
        )
        .unwrap()
    }

    fn pool(n: u64) -> Vec<Question> {
        (1..=n).map(build_question).collect()
    }

    fn timed_config(ceiling_secs: u32, size: usize) -> SessionConfig {
        SessionConfig::new(
            VariantTag::from("psm1"),
            SessionMode::timed_balanced(ceiling_secs, CategoryWeights::default(), size).unwrap(),
            PassFraction::new(0.85).unwrap(),
        )
    }

    fn untimed_config() -> SessionConfig {
        SessionConfig::new(
            VariantTag::from("psm1"),
            SessionMode::UntimedFull,
            PassFraction::new(0.9).unwrap(),
        )
    }

    fn running(config: SessionConfig, n: u64) -> QuizSession {
        let mut session = QuizSession::new(Clock::fixed(fixed_now()));
        let mut rng = StdRng::seed_from_u64(1);
        session.start_session(config, &pool(n), &mut rng).unwrap();
        session
    }

    #[test]
    fn start_resets_everything_and_runs() {
        let session = running(timed_config(3600, 5), 10);
        assert_eq!(session.phase(), SessionPhase::Running);
        assert_eq!(session.total(), 5);
        assert_eq!(session.current_index(), 0);
        assert!(session.answers().is_empty());
        assert_eq!(session.elapsed_secs(), 0);
        assert!(!session.is_paused());
        assert_eq!(session.started_at(), Some(fixed_now()));
    }

    #[test]
    fn empty_pool_fails_and_stays_configured() {
        let mut session = QuizSession::default();
        let mut rng = StdRng::seed_from_u64(1);
        let err = session
            .start_session(untimed_config(), &[], &mut rng)
            .unwrap_err();
        assert!(matches!(err, SessionError::Empty));
        assert_eq!(session.phase(), SessionPhase::Configured);
    }

    #[test]
    fn start_is_rejected_while_running() {
        let mut session = running(untimed_config(), 3);
        let mut rng = StdRng::seed_from_u64(2);
        let err = session.start(&pool(3), &mut rng).unwrap_err();
        assert!(matches!(err, SessionError::InvalidTransition { op: "start", .. }));
        assert!(session.configure(untimed_config()).is_err());
    }

    #[test]
    fn set_answer_toggles_membership() {
        let mut session = running(untimed_config(), 3);
        let id = session.current_question().unwrap().id().clone();

        assert!(session.set_answer(&id, 2).unwrap());
        assert!(session.set_answer(&id, 0).unwrap());
        assert_eq!(session.answer_for(&id), Some(&AnswerSet::from([0, 2])));

        assert!(!session.set_answer(&id, 2).unwrap());
        assert_eq!(session.answer_for(&id), Some(&AnswerSet::single(0)));

        assert!(!session.toggle_current(0).unwrap());
        assert_eq!(session.answer_for(&id), None);
    }

    #[test]
    fn set_answer_rejects_foreign_ids_and_bad_options() {
        let mut session = running(untimed_config(), 3);
        let err = session.set_answer(&QuestionId::from(99), 0).unwrap_err();
        assert!(matches!(err, SessionError::UnknownQuestion(_)));

        let id = session.current_question().unwrap().id().clone();
        let err = session.set_answer(&id, 3).unwrap_err();
        assert!(matches!(err, SessionError::OptionOutOfRange { index: 3, .. }));
        assert!(session.answers().is_empty());
    }

    #[test]
    fn advancing_past_last_question_terminates() {
        let mut session = running(untimed_config(), 3);
        assert_eq!(session.advance().unwrap(), Advance::Moved { index: 1 });
        assert_eq!(session.advance().unwrap(), Advance::Moved { index: 2 });
        assert_eq!(session.advance().unwrap(), Advance::Finished);
        assert!(session.is_terminated());
        assert_eq!(session.end_reason(), Some(EndReason::Completed));
        assert_eq!(session.completed_at(), Some(fixed_now()));
        assert_eq!(session.current_index(), 2);
    }

    #[test]
    fn terminated_session_is_frozen() {
        let mut session = running(untimed_config(), 1);
        let id = session.current_question().unwrap().id().clone();
        session.set_answer(&id, 0).unwrap();
        session.advance().unwrap();

        assert!(session.set_answer(&id, 1).is_err());
        assert!(session.advance().is_err());
        assert!(session.finish().is_err());
        assert!(session.toggle_pause().is_err());
        assert_eq!(session.answer_for(&id), Some(&AnswerSet::single(0)));
        assert_eq!(session.current_index(), 0);
    }

    #[test]
    fn ticks_reach_ceiling_and_expire() {
        let mut session = running(timed_config(3600, 3), 3);
        for _ in 0..3599 {
            assert_eq!(session.tick(), TickOutcome::Counted);
        }
        assert_eq!(session.elapsed_secs(), 3599);
        assert!(!session.is_terminated());
        assert_eq!(session.remaining_secs(), Some(1));

        assert_eq!(session.tick(), TickOutcome::Expired);
        assert_eq!(session.elapsed_secs(), 3600);
        assert!(session.is_terminated());
        assert_eq!(session.end_reason(), Some(EndReason::TimeExpired));

        for _ in 0..5 {
            assert_eq!(session.tick(), TickOutcome::Ignored);
        }
        assert_eq!(session.elapsed_secs(), 3600);
        assert_eq!(session.current_index(), 0);
    }

    #[test]
    fn pause_freezes_the_counter_and_input() {
        let mut session = running(timed_config(60, 3), 3);
        session.tick();
        assert!(session.toggle_pause().unwrap());

        for _ in 0..10 {
            assert_eq!(session.tick(), TickOutcome::Ignored);
        }
        assert_eq!(session.elapsed_secs(), 1);
        assert!(matches!(session.toggle_current(0), Err(SessionError::Paused)));
        assert!(matches!(session.advance(), Err(SessionError::Paused)));

        assert!(!session.toggle_pause().unwrap());
        assert_eq!(session.tick(), TickOutcome::Counted);
        assert_eq!(session.elapsed_secs(), 2);
    }

    #[test]
    fn untimed_sessions_ignore_ticks_and_pause() {
        let mut session = running(untimed_config(), 3);
        assert_eq!(session.tick(), TickOutcome::Ignored);
        assert_eq!(session.elapsed_secs(), 0);
        assert!(matches!(session.toggle_pause(), Err(SessionError::Untimed)));
        assert_eq!(session.remaining_secs(), None);
    }

    #[test]
    fn stray_tick_after_reset_is_a_no_op() {
        let mut session = running(timed_config(10, 3), 3);
        session.tick();
        session.reset();

        assert_eq!(session.tick(), TickOutcome::Ignored);
        assert_eq!(session.phase(), SessionPhase::Unconfigured);
        assert_eq!(session.elapsed_secs(), 0);
        assert_eq!(session.total(), 0);
        assert!(session.config().is_none());
        assert!(session.stats().is_none());
    }

    #[test]
    fn restart_keeps_config_and_clears_progress() {
        let mut session = running(timed_config(10, 3), 5);
        session.toggle_current(0).unwrap();
        session.tick();
        let mut rng = StdRng::seed_from_u64(3);

        let plan_len = session.restart(&pool(5), &mut rng).unwrap().total();
        assert_eq!(plan_len, 3);
        assert!(session.is_running());
        assert!(session.answers().is_empty());
        assert_eq!(session.elapsed_secs(), 0);
        assert_eq!(session.time_ceiling(), Some(10));
    }

    #[test]
    fn report_lists_mistakes_in_session_order() {
        let mut session = running(untimed_config(), 3);
        let order: Vec<QuestionId> = session.questions().iter().map(|q| q.id().clone()).collect();

        // first correct, second partially answered, third untouched
        session.toggle_current(0).unwrap();
        session.toggle_current(2).unwrap();
        session.advance().unwrap();
        session.toggle_current(0).unwrap();
        session.advance().unwrap();
        assert!(session.report().is_none());
        session.advance().unwrap();

        let report = session.report().unwrap();
        assert_eq!(report.total, 3);
        assert_eq!(report.final_score, 1);
        assert_eq!(report.pass_threshold, 3);
        assert!(!report.passed);
        assert_eq!(report.mistakes.len(), 2);
        assert_eq!(report.mistakes[0].question_id, order[1]);
        assert_eq!(report.mistakes[0].selected, vec!["x".to_owned()]);
        assert_eq!(report.mistakes[0].correct, vec!["x".to_owned(), "z".to_owned()]);
        assert_eq!(report.mistakes[1].question_id, order[2]);
        assert!(report.mistakes[1].selected.is_empty());
    }

    #[test]
    fn snapshot_reflects_current_question() {
        let mut session = running(timed_config(100, 2), 2);
        session.toggle_current(1).unwrap();
        session.tick();

        let snapshot = session.snapshot();
        assert_eq!(snapshot.current_index, 0);
        assert_eq!(snapshot.total, 2);
        assert_eq!(snapshot.answers_for_current, AnswerSet::single(1));
        assert_eq!(snapshot.elapsed_secs, 1);
        assert_eq!(snapshot.remaining_secs, Some(99));
        assert!(!snapshot.terminated);
        assert!(snapshot.report.is_none());
    }
}
