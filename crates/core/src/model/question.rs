use std::collections::BTreeSet;

use serde::Serialize;
use thiserror::Error;

use crate::model::ids::QuestionId;

/// Bucket used for questions that carry no category label.
pub const DEFAULT_CATEGORY: &str = "uncategorized";

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyPrompt,

    #[error("question {id} has no options")]
    NoOptions { id: QuestionId },

    #[error("answer index {index} is negative")]
    NegativeAnswerIndex { index: i64 },
}

//
// ─── ANSWER SET ───────────────────────────────────────────────────────────────
//

/// Set of option indices.
///
/// Used both for the correct answer of a question and for a user's current
/// selection. Order and duplicates collapse on construction, so equality is
/// set equality.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct AnswerSet(BTreeSet<usize>);

impl AnswerSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// One-element set, the normalized form of a single-index answer.
    #[must_use]
    pub fn single(index: usize) -> Self {
        Self(BTreeSet::from([index]))
    }

    /// Inserts `index` if absent, removes it if present.
    ///
    /// Returns `true` when the index is selected after the call.
    pub fn toggle(&mut self, index: usize) -> bool {
        if self.0.remove(&index) {
            false
        } else {
            self.0.insert(index);
            true
        }
    }

    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        self.0.contains(&index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Indices in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<usize> for AnswerSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[usize; N]> for AnswerSet {
    fn from(value: [usize; N]) -> Self {
        value.into_iter().collect()
    }
}

//
// ─── QUESTION ─────────────────────────────────────────────────────────────────
//

/// A single immutable question from a bank.
///
/// The position of each option is its identity for answer purposes.
/// Serializable for export only; construction always goes through
/// [`Question::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Question {
    id: QuestionId,
    prompt: String,
    options: Vec<String>,
    answer: AnswerSet,
    category: Option<String>,
}

impl Question {
    /// Creates a validated question.
    ///
    /// Answer indices outside the option list are accepted: such a question
    /// can never be graded correct, but it does not break a session.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyPrompt` for blank text and
    /// `QuestionError::NoOptions` when `options` is empty.
    pub fn new(
        id: QuestionId,
        prompt: impl Into<String>,
        options: Vec<String>,
        answer: AnswerSet,
        category: Option<String>,
    ) -> Result<Self, QuestionError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }
        if options.is_empty() {
            return Err(QuestionError::NoOptions { id });
        }

        let category = category
            .map(|c| c.trim().to_owned())
            .filter(|c| !c.is_empty());

        Ok(Self {
            id,
            prompt,
            options,
            answer,
            category,
        })
    }

    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn answer(&self) -> &AnswerSet {
        &self.answer
    }

    #[must_use]
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    /// Category label used for stratified sampling.
    #[must_use]
    pub fn bucket(&self) -> &str {
        self.category().unwrap_or(DEFAULT_CATEGORY)
    }

    /// True when more than one option must be selected.
    #[must_use]
    pub fn is_multi_select(&self) -> bool {
        self.answer.len() > 1
    }

    /// True when some correct index points past the option list.
    #[must_use]
    pub fn has_unreachable_answer(&self) -> bool {
        self.answer.iter().any(|i| i >= self.options.len())
    }

    /// Renders a set of indices as option text, skipping unknown indices.
    #[must_use]
    pub fn option_texts(&self, indices: &AnswerSet) -> Vec<String> {
        indices
            .iter()
            .filter_map(|i| self.options.get(i).cloned())
            .collect()
    }

    pub(crate) fn with_id(mut self, id: QuestionId) -> Self {
        self.id = id;
        self
    }
}
