use std::collections::HashMap;

use quiz_core::grader::is_correct;
use quiz_core::model::{AnswerSet, PassFraction, Question, QuestionId};

/// Slack absorbed before rounding up, so `80 * 0.9` stays 72.
const THRESHOLD_EPSILON: f64 = 1e-9;

/// Minimum number of correct answers needed to pass: `ceil(total * fraction)`.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn pass_threshold(total: usize, fraction: PassFraction) -> usize {
    let raw = (total as f64 * fraction.value() - THRESHOLD_EPSILON).ceil();
    if raw > 0.0 { raw as usize } else { 0 }
}

/// Live statistics over a running or finished session, useful for UI.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStats {
    pub total: usize,
    /// Questions with a non-empty selection.
    pub answered: usize,
    /// Answered questions whose selection is correct.
    pub correct_so_far: usize,
    /// `correct_so_far / answered`; `None` until something is answered.
    pub running_accuracy: Option<f64>,
    /// Final correct count if the current accuracy holds.
    pub linear_projection: usize,
    /// Final correct count if every unanswered question is answered correctly.
    pub best_case_projection: usize,
    pub pass_threshold: usize,
    pub needed_to_pass: usize,
}

impl SessionStats {
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub(crate) fn compute(
        questions: &[Question],
        answers: &HashMap<QuestionId, AnswerSet>,
        fraction: PassFraction,
    ) -> Self {
        let total = questions.len();
        let mut answered = 0;
        let mut correct_so_far = 0;
        for question in questions {
            let Some(selection) = answers.get(question.id()).filter(|s| !s.is_empty()) else {
                continue;
            };
            answered += 1;
            if is_correct(question, selection) {
                correct_so_far += 1;
            }
        }

        let running_accuracy =
            (answered > 0).then(|| correct_so_far as f64 / answered as f64);
        let linear_projection = running_accuracy
            .map(|acc| (acc * total as f64).round() as usize)
            .unwrap_or(0);
        let pass_threshold = pass_threshold(total, fraction);

        Self {
            total,
            answered,
            correct_so_far,
            running_accuracy,
            linear_projection,
            best_case_projection: correct_so_far + (total - answered),
            pass_threshold,
            needed_to_pass: pass_threshold.saturating_sub(correct_so_far),
        }
    }

    /// Share of questions answered, in `[0, 1]`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress_fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.answered as f64 / self.total as f64
        }
    }

    /// Progress as a percentage rounded to one decimal.
    #[must_use]
    pub fn progress_percent(&self) -> f64 {
        round_tenth(self.progress_fraction() * 100.0)
    }

    /// Accuracy as a percentage rounded to one decimal, 0.0 when unavailable.
    #[must_use]
    pub fn accuracy_percent(&self) -> f64 {
        self.running_accuracy
            .map_or(0.0, |acc| round_tenth(acc * 100.0))
    }

    /// False once even a perfect finish would miss the threshold.
    #[must_use]
    pub fn can_still_pass(&self) -> bool {
        self.best_case_projection >= self.pass_threshold
    }
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fraction(value: f64) -> PassFraction {
        PassFraction::new(value).unwrap()
    }

    fn build_question(id: u64, answer: AnswerSet) -> Question {
        Question::new(
            QuestionId::from(id),
            format!("Q{id}"),
            vec!["a".into(), "b".into(), "c".into()],
            answer,
            None,
        )
        .unwrap()
    }

    #[test]
    fn threshold_boundaries() {
        assert_eq!(pass_threshold(80, fraction(0.9)), 72);
        assert_eq!(pass_threshold(10, fraction(0.85)), 9);
        assert_eq!(pass_threshold(80, fraction(0.85)), 68);
        assert_eq!(pass_threshold(100, fraction(0.07)), 7);
        assert_eq!(pass_threshold(0, fraction(0.9)), 0);
        assert_eq!(pass_threshold(3, fraction(1.0)), 3);
    }

    #[test]
    fn empty_session_has_no_accuracy() {
        let stats = SessionStats::compute(&[], &HashMap::new(), fraction(0.9));
        assert_eq!(stats.progress_fraction(), 0.0);
        assert_eq!(stats.running_accuracy, None);
        assert_eq!(stats.linear_projection, 0);
        assert_eq!(stats.accuracy_percent(), 0.0);
    }

    #[test]
    fn live_numbers_follow_answers() {
        let questions: Vec<Question> = (1..=10)
            .map(|i| build_question(i, AnswerSet::single(0)))
            .collect();
        let mut answers = HashMap::new();
        // 4 answered: 3 correct, 1 wrong; one empty entry does not count
        for i in 1..=3 {
            answers.insert(QuestionId::from(i), AnswerSet::single(0));
        }
        answers.insert(QuestionId::from(4), AnswerSet::single(1));
        answers.insert(QuestionId::from(5), AnswerSet::new());

        let stats = SessionStats::compute(&questions, &answers, fraction(0.85));
        assert_eq!(stats.answered, 4);
        assert_eq!(stats.correct_so_far, 3);
        assert_eq!(stats.running_accuracy, Some(0.75));
        assert_eq!(stats.linear_projection, 8);
        assert_eq!(stats.best_case_projection, 9);
        assert_eq!(stats.pass_threshold, 9);
        assert_eq!(stats.needed_to_pass, 6);
        assert_eq!(stats.progress_percent(), 40.0);
        assert_eq!(stats.accuracy_percent(), 75.0);
        assert!(stats.can_still_pass());
    }

    #[test]
    fn needed_to_pass_never_negative() {
        let questions = vec![build_question(1, AnswerSet::single(0))];
        let answers = HashMap::from([(QuestionId::from(1), AnswerSet::single(0))]);
        let stats = SessionStats::compute(&questions, &answers, fraction(0.5));
        assert_eq!(stats.pass_threshold, 1);
        assert_eq!(stats.needed_to_pass, 0);
    }
}
