//! Question banks stored as JSON files, one file per variant.

mod mapping;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use quiz_core::model::{QuestionBank, VariantTag};
use tracing::{info, warn};

use crate::repository::{QuestionBankRepository, StorageError};
use mapping::RawQuestion;

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Counters describing how a bank file was normalized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    pub skipped: usize,
    pub duplicates_dropped: usize,
    pub ids_rewritten: usize,
    pub unreachable_answers: usize,
}

/// Parse a bank file body.
///
/// Each record is decoded on its own; malformed records are skipped and
/// counted rather than failing the whole bank.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if the body is not a JSON array.
pub fn parse_bank(
    variant: VariantTag,
    body: &str,
) -> Result<(QuestionBank, LoadReport), StorageError> {
    let records: Vec<serde_json::Value> = serde_json::from_str(body).map_err(ser)?;

    let mut report = LoadReport::default();
    let mut questions = Vec::with_capacity(records.len());
    for (i, record) in records.into_iter().enumerate() {
        let position = i + 1;
        let decoded = serde_json::from_value::<RawQuestion>(record)
            .map_err(ser)
            .and_then(|raw| raw.into_question(position).map_err(ser));
        match decoded {
            Ok(question) => {
                if question.has_unreachable_answer() {
                    warn!(
                        variant = %variant,
                        id = %question.id(),
                        "answer index out of range, question can never be graded correct"
                    );
                    report.unreachable_answers += 1;
                }
                questions.push(question);
            }
            Err(err) => {
                warn!(variant = %variant, position, error = %err, "skipping malformed record");
                report.skipped += 1;
            }
        }
    }

    let bank = QuestionBank::new(variant, questions);
    report.loaded = bank.len();
    report.duplicates_dropped = bank.duplicates_dropped();
    report.ids_rewritten = bank.ids_rewritten();
    Ok((bank, report))
}

/// Reads banks from `<root>/<file>` for each registered variant.
#[derive(Debug, Clone)]
pub struct JsonBankRepository {
    root: PathBuf,
    files: BTreeMap<VariantTag, PathBuf>,
}

impl JsonBankRepository {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            files: BTreeMap::new(),
        }
    }

    /// Register the file (relative to the root) holding a variant's bank.
    #[must_use]
    pub fn with_file(mut self, variant: VariantTag, file: impl AsRef<Path>) -> Self {
        self.files.insert(variant, file.as_ref().to_path_buf());
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load a bank together with its normalization counters.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for unregistered variants,
    /// `StorageError::Io` if the file cannot be read and
    /// `StorageError::Serialization` if it is not a JSON array.
    pub async fn load_with_report(
        &self,
        variant: &VariantTag,
    ) -> Result<(QuestionBank, LoadReport), StorageError> {
        let file = self
            .files
            .get(variant)
            .ok_or_else(|| StorageError::NotFound(variant.clone()))?;
        let path = self.root.join(file);
        let body = tokio::fs::read_to_string(&path).await?;
        let (bank, report) = parse_bank(variant.clone(), &body)?;
        info!(
            variant = %variant,
            path = %path.display(),
            loaded = report.loaded,
            skipped = report.skipped,
            duplicates = report.duplicates_dropped,
            "question bank loaded"
        );
        Ok((bank, report))
    }
}

#[async_trait]
impl QuestionBankRepository for JsonBankRepository {
    async fn load_bank(&self, variant: &VariantTag) -> Result<QuestionBank, StorageError> {
        self.load_with_report(variant).await.map(|(bank, _)| bank)
    }

    async fn variants(&self) -> Result<Vec<VariantTag>, StorageError> {
        Ok(self.files.keys().cloned().collect())
    }
}
