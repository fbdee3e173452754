use chrono::{DateTime, Utc};
use std::collections::HashMap;

use quiz_core::grader::is_correct_or_empty;
use quiz_core::model::{AnswerSet, PassFraction, Question, QuestionId};
use quiz_core::time::format_clock;

use super::progress::pass_threshold;
use super::service::{EndReason, SessionPhase};

/// A question the user got wrong, with both sides rendered as option text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mistake {
    pub question_id: QuestionId,
    pub prompt: String,
    pub selected: Vec<String>,
    pub correct: Vec<String>,
}

/// Final grading of a terminated session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub total: usize,
    pub final_score: usize,
    pub passed: bool,
    pub pass_threshold: usize,
    pub pass_fraction: PassFraction,
    /// In session order.
    pub mistakes: Vec<Mistake>,
    pub elapsed_secs: u32,
    pub end_reason: EndReason,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SessionReport {
    /// Unanswered questions grade as an empty selection.
    pub(crate) fn grade(
        questions: &[Question],
        answers: &HashMap<QuestionId, AnswerSet>,
        pass_fraction: PassFraction,
        elapsed_secs: u32,
        end_reason: EndReason,
        started_at: Option<DateTime<Utc>>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Self {
        let mut final_score = 0;
        let mut mistakes = Vec::new();
        for question in questions {
            let selection = answers.get(question.id());
            if is_correct_or_empty(question, selection) {
                final_score += 1;
                continue;
            }
            mistakes.push(Mistake {
                question_id: question.id().clone(),
                prompt: question.prompt().to_owned(),
                selected: selection
                    .map(|s| question.option_texts(s))
                    .unwrap_or_default(),
                correct: question.option_texts(question.answer()),
            });
        }

        let total = questions.len();
        let pass_threshold = pass_threshold(total, pass_fraction);
        Self {
            total,
            final_score,
            passed: final_score >= pass_threshold,
            pass_threshold,
            pass_fraction,
            mistakes,
            elapsed_secs,
            end_reason,
            started_at,
            completed_at,
        }
    }

    /// Elapsed timer as `mm:ss`.
    #[must_use]
    pub fn elapsed_label(&self) -> String {
        format_clock(self.elapsed_secs)
    }

    /// Wall-clock duration between start and end, when both are known.
    #[must_use]
    pub fn wall_clock(&self) -> Option<chrono::Duration> {
        Some(self.completed_at? - self.started_at?)
    }
}

/// Render-ready view of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot<'a> {
    pub phase: SessionPhase,
    pub current_question: Option<&'a Question>,
    pub current_index: usize,
    pub total: usize,
    pub answers_for_current: AnswerSet,
    pub elapsed_secs: u32,
    pub remaining_secs: Option<u32>,
    pub paused: bool,
    pub terminated: bool,
    /// Present once terminated.
    pub report: Option<SessionReport>,
}

impl SessionSnapshot<'_> {
    /// 1-based position label, e.g. `3/80`.
    #[must_use]
    pub fn position_label(&self) -> String {
        if self.total == 0 {
            return "0/0".to_owned();
        }
        format!("{}/{}", self.current_index + 1, self.total)
    }

    /// Whether the current question has a selection to advance with.
    #[must_use]
    pub fn can_advance(&self) -> bool {
        !self.terminated && !self.paused && !self.answers_for_current.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::time::fixed_now;

    fn build_question(id: u64, answer: AnswerSet) -> Question {
        Question::new(
            QuestionId::from(id),
            format!("Q{id}"),
            vec!["x".into(), "y".into(), "z".into()],
            answer,
            None,
        )
        .unwrap()
    }

    #[test]
    fn unanswered_counts_as_wrong_and_passes_at_threshold() {
        let questions: Vec<Question> = (1..=10)
            .map(|i| build_question(i, AnswerSet::single(1)))
            .collect();
        let answers: HashMap<_, _> = (1..=9)
            .map(|i| (QuestionId::from(i), AnswerSet::single(1)))
            .collect();

        let report = SessionReport::grade(
            &questions,
            &answers,
            PassFraction::new(0.85).unwrap(),
            125,
            EndReason::Completed,
            Some(fixed_now()),
            Some(fixed_now() + chrono::Duration::seconds(125)),
        );

        assert_eq!(report.final_score, 9);
        assert_eq!(report.pass_threshold, 9);
        assert!(report.passed);
        assert_eq!(report.mistakes.len(), 1);
        assert_eq!(report.mistakes[0].question_id, QuestionId::from(10));
        assert!(report.mistakes[0].selected.is_empty());
        assert_eq!(report.mistakes[0].correct, vec!["y".to_owned()]);
        assert_eq!(report.elapsed_label(), "02:05");
        assert_eq!(report.wall_clock(), Some(chrono::Duration::seconds(125)));
    }

    #[test]
    fn unreachable_answer_is_always_a_mistake() {
        let questions = vec![build_question(1, [0, 9].into())];
        let answers = HashMap::from([(QuestionId::from(1), AnswerSet::single(0))]);
        let report = SessionReport::grade(
            &questions,
            &answers,
            PassFraction::new(0.5).unwrap(),
            0,
            EndReason::TimeExpired,
            None,
            None,
        );
        assert_eq!(report.final_score, 0);
        assert_eq!(report.mistakes[0].correct, vec!["x".to_owned()]);
        assert_eq!(report.wall_clock(), None);
    }
}
