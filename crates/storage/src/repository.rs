use async_trait::async_trait;
use quiz_core::model::{QuestionBank, VariantTag};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by question-bank sources.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("no question bank for variant {0}")]
    NotFound(VariantTag),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Source of question banks, one per quiz variant.
#[async_trait]
pub trait QuestionBankRepository: Send + Sync {
    /// Load the full pool for a variant.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the variant is unknown, or other
    /// storage errors if the bank cannot be read.
    async fn load_bank(&self, variant: &VariantTag) -> Result<QuestionBank, StorageError>;

    /// Variants this source can load, in a stable order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the source cannot be listed.
    async fn variants(&self) -> Result<Vec<VariantTag>, StorageError>;
}

/// Simple in-memory repository implementation for testing and embedding.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    banks: Arc<Mutex<BTreeMap<VariantTag, QuestionBank>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            banks: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    /// Store or replace the bank for its variant.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn insert_bank(&self, bank: QuestionBank) -> Result<(), StorageError> {
        let mut guard = self
            .banks
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(bank.variant().clone(), bank);
        Ok(())
    }
}

#[async_trait]
impl QuestionBankRepository for InMemoryRepository {
    async fn load_bank(&self, variant: &VariantTag) -> Result<QuestionBank, StorageError> {
        let guard = self
            .banks
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard
            .get(variant)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(variant.clone()))
    }

    async fn variants(&self) -> Result<Vec<VariantTag>, StorageError> {
        let guard = self
            .banks
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.keys().cloned().collect())
    }
}
