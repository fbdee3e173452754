use quiz_core::model::{AnswerSet, Question, QuestionError, QuestionId};
use serde::Deserialize;

/// Record id as it appears in bank files.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(u64),
    Text(String),
}

/// Correct answer as it appears in bank files: one index or a list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawAnswer {
    Single(i64),
    Many(Vec<i64>),
}

/// One bank record before normalization.
#[derive(Debug, Deserialize)]
pub(crate) struct RawQuestion {
    #[serde(default)]
    id: Option<RawId>,
    question: String,
    #[serde(default)]
    options: Vec<String>,
    #[serde(default)]
    answer: Option<RawAnswer>,
    #[serde(default)]
    category: Option<String>,
    /// Legacy category field; `category` wins when both are present.
    #[serde(default, rename = "dominioAppartenenza")]
    dominio_appartenenza: Option<String>,
}

impl RawQuestion {
    /// Normalize into a domain `Question`.
    ///
    /// `position` is the 1-based record position, used as id when the record
    /// has none. A null or missing answer becomes the empty set.
    pub(crate) fn into_question(self, position: usize) -> Result<Question, QuestionError> {
        let id = match self.id {
            Some(RawId::Number(n)) => QuestionId::from(n),
            Some(RawId::Text(s)) if !s.trim().is_empty() => QuestionId::new(s.trim()),
            _ => QuestionId::positional(position),
        };

        let indices = match self.answer {
            None => Vec::new(),
            Some(RawAnswer::Single(i)) => vec![i],
            Some(RawAnswer::Many(list)) => list,
        };
        let answer = indices
            .into_iter()
            .map(|index| {
                usize::try_from(index).map_err(|_| QuestionError::NegativeAnswerIndex { index })
            })
            .collect::<Result<AnswerSet, _>>()?;

        let category = self
            .category
            .filter(|c| !c.trim().is_empty())
            .or(self.dominio_appartenenza);
        Question::new(id, self.question, self.options, answer, category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(json: &str) -> Result<Question, QuestionError> {
        serde_json::from_str::<RawQuestion>(json)
            .unwrap()
            .into_question(5)
    }

    #[test]
    fn single_index_answer_normalizes_to_set() {
        let q = decode(r#"{"id":3,"question":"Q","options":["a","b"],"answer":1}"#).unwrap();
        assert_eq!(q.answer(), &AnswerSet::single(1));
        assert_eq!(q.id().as_str(), "3");
    }

    #[test]
    fn list_answer_and_legacy_category_field() {
        let q = decode(
            r#"{"id":"x-1","question":"Q","options":["a","b","c"],"answer":[2,0,2],"dominioAppartenenza":"Ruoli Scrum"}"#,
        )
        .unwrap();
        assert_eq!(q.answer(), &AnswerSet::from([0, 2]));
        assert_eq!(q.category(), Some("Ruoli Scrum"));
    }

    #[test]
    fn both_category_fields_decode_and_category_wins() {
        let q = decode(
            r#"{"id":1,"question":"Q","options":["a"],"answer":0,"category":"A","dominioAppartenenza":"B"}"#,
        )
        .unwrap();
        assert_eq!(q.category(), Some("A"));

        let q = decode(
            r#"{"id":1,"question":"Q","options":["a"],"answer":0,"category":" ","dominioAppartenenza":"B"}"#,
        )
        .unwrap();
        assert_eq!(q.category(), Some("B"));
    }

    #[test]
    fn missing_id_and_null_answer() {
        let q = decode(r#"{"question":"Q","options":["a"],"answer":null}"#).unwrap();
        assert_eq!(q.id(), &QuestionId::positional(5));
        assert!(q.answer().is_empty());
    }

    #[test]
    fn negative_index_is_rejected() {
        let err = decode(r#"{"question":"Q","options":["a"],"answer":-1}"#).unwrap_err();
        assert_eq!(err, QuestionError::NegativeAnswerIndex { index: -1 });
    }

    #[test]
    fn missing_options_is_rejected() {
        let err = decode(r#"{"id":1,"question":"Q","answer":0}"#).unwrap_err();
        assert!(matches!(err, QuestionError::NoOptions { .. }));
    }
}
