//! Answer grading.
//!
//! A selection is correct when it names exactly the correct options: no
//! more, no fewer. Both sides are `AnswerSet`s, so order and repeated
//! indices never matter.

use crate::model::{AnswerSet, Question};

/// Returns true when `selection` set-equals the question's correct answer.
///
/// Total over its inputs: an empty selection is only correct for a question
/// whose answer is empty too, and an answer index past the option list can
/// never be matched by a selection made through the option list.
#[must_use]
pub fn is_correct(question: &Question, selection: &AnswerSet) -> bool {
    question.answer() == selection
}

/// Grades an optional selection, treating a missing one as empty.
#[must_use]
pub fn is_correct_or_empty(question: &Question, selection: Option<&AnswerSet>) -> bool {
    match selection {
        Some(selection) => is_correct(question, selection),
        None => question.answer().is_empty(),
    }
}
