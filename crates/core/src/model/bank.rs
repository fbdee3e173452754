use std::collections::HashMap;

use crate::model::ids::{QuestionId, VariantTag};
use crate::model::question::Question;

/// Ordered pool of questions for one quiz variant.
///
/// Ids are unique within a bank: exact duplicates are dropped and a
/// different question reusing an id gets the composite `id|prompt` id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionBank {
    variant: VariantTag,
    questions: Vec<Question>,
    duplicates_dropped: usize,
    ids_rewritten: usize,
}

impl QuestionBank {
    #[must_use]
    pub fn new(variant: VariantTag, questions: impl IntoIterator<Item = Question>) -> Self {
        let Deduplicated {
            questions,
            duplicates_dropped,
            ids_rewritten,
        } = dedup_questions(questions);
        Self {
            variant,
            questions,
            duplicates_dropped,
            ids_rewritten,
        }
    }

    #[must_use]
    pub fn variant(&self) -> &VariantTag {
        &self.variant
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Records dropped because they repeated an id and its prompt.
    #[must_use]
    pub fn duplicates_dropped(&self) -> usize {
        self.duplicates_dropped
    }

    /// Records whose colliding id was replaced by a composite id.
    #[must_use]
    pub fn ids_rewritten(&self) -> usize {
        self.ids_rewritten
    }
}

/// Result of [`dedup_questions`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deduplicated {
    pub questions: Vec<Question>,
    pub duplicates_dropped: usize,
    pub ids_rewritten: usize,
}

/// Makes ids unique while keeping pool order.
///
/// A record repeating both id and prompt is dropped. A record reusing an id
/// with a different prompt is kept under the composite `id|prompt` id.
pub fn dedup_questions(questions: impl IntoIterator<Item = Question>) -> Deduplicated {
    let mut seen: HashMap<QuestionId, String> = HashMap::new();
    let mut kept = Vec::new();
    let mut duplicates_dropped = 0;
    let mut ids_rewritten = 0;

    for question in questions {
        let question = match seen.get(question.id()) {
            None => question,
            Some(prompt) if prompt == question.prompt() => {
                duplicates_dropped += 1;
                continue;
            }
            Some(_) => {
                let id = QuestionId::composite(question.id(), question.prompt());
                if seen.contains_key(&id) {
                    duplicates_dropped += 1;
                    continue;
                }
                ids_rewritten += 1;
                question.with_id(id)
            }
        };
        seen.insert(question.id().clone(), question.prompt().to_owned());
        kept.push(question);
    }

    Deduplicated {
        questions: kept,
        duplicates_dropped,
        ids_rewritten,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AnswerSet;

    fn question(id: u64, prompt: &str) -> Question {
        Question::new(
            QuestionId::from(id),
            prompt,
            vec!["a".into(), "b".into()],
            AnswerSet::single(0),
            None,
        )
        .unwrap()
    }

    #[test]
    fn drops_exact_duplicates() {
        let bank = QuestionBank::new(
            VariantTag::from("psm1"),
            vec![question(1, "Q1"), question(1, "Q1"), question(2, "Q2")],
        );
        assert_eq!(bank.len(), 2);
        assert_eq!(bank.duplicates_dropped(), 1);
    }

    #[test]
    fn colliding_ids_get_composite_key() {
        let bank = QuestionBank::new(
            VariantTag::from("psm1"),
            vec![question(1, "Q1"), question(1, "Other")],
        );
        assert_eq!(bank.len(), 2);
        assert_eq!(bank.ids_rewritten(), 1);
        assert_eq!(bank.questions()[1].id().as_str(), "1|Other");
    }
}
