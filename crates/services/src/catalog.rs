//! Quiz variants and their per-mode settings.
//!
//! Pass fractions, time ceilings and category weights are data, not code:
//! they come from a JSON catalog or from the built-in defaults below.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use storage::JsonBankRepository;

use quiz_core::model::{
    CategoryWeights, ModeTag, PassFraction, SessionConfig, SessionMode, VariantTag,
};

use crate::error::CatalogError;

const DEFAULT_EXAM_SIZE: usize = 80;
const DEFAULT_EXAM_CEILING_SECS: u32 = 60 * 60;
const DEFAULT_EXAM_PASS: f64 = 0.85;
const DEFAULT_PRACTICE_PASS: f64 = 0.90;

const DEFAULT_WEIGHTS: [(&str, f64); 8] = [
    ("Scrum Framework", 20.0),
    ("Artefatti Scrum", 10.0),
    ("Ruoli Scrum", 20.0),
    ("Eventi Scrum", 15.0),
    ("Valori Scrum", 10.0),
    ("Scaling Scrum", 5.0),
    ("Adattamento Organizzativo", 5.0),
    ("Ispezione e Adattamento", 5.0),
];

/// Settings for the timed, category-balanced mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamSettings {
    pub size: usize,
    pub ceiling_secs: u32,
    pub pass_fraction: PassFraction,
    #[serde(default)]
    pub weights: CategoryWeights,
}

/// Settings for the untimed, whole-bank mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeSettings {
    pub pass_fraction: PassFraction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantSettings {
    pub tag: VariantTag,
    pub label: String,
    /// Bank file, relative to the bank directory.
    pub file: PathBuf,
    pub exam: ExamSettings,
    pub practice: PracticeSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizCatalog {
    variants: Vec<VariantSettings>,
}

impl QuizCatalog {
    /// # Errors
    ///
    /// Returns `CatalogError::DuplicateVariant` when a tag repeats.
    pub fn new(variants: Vec<VariantSettings>) -> Result<Self, CatalogError> {
        for (i, variant) in variants.iter().enumerate() {
            if variants[..i].iter().any(|prev| prev.tag == variant.tag) {
                return Err(CatalogError::DuplicateVariant(variant.tag.clone()));
            }
        }
        Ok(Self { variants })
    }

    /// The two stock variants: the Scrum guide quiz and the glossary quiz.
    ///
    /// # Errors
    ///
    /// Only fails if the built-in constants are invalid.
    pub fn builtin() -> Result<Self, CatalogError> {
        let exam = ExamSettings {
            size: DEFAULT_EXAM_SIZE,
            ceiling_secs: DEFAULT_EXAM_CEILING_SECS,
            pass_fraction: PassFraction::new(DEFAULT_EXAM_PASS)?,
            weights: CategoryWeights::new(DEFAULT_WEIGHTS)?,
        };
        let practice = PracticeSettings {
            pass_fraction: PassFraction::new(DEFAULT_PRACTICE_PASS)?,
        };

        Self::new(vec![
            VariantSettings {
                tag: VariantTag::from("psm1"),
                label: "Quiz PSM1".into(),
                file: PathBuf::from("quiz.json"),
                exam: exam.clone(),
                practice: practice.clone(),
            },
            VariantSettings {
                tag: VariantTag::from("glossario"),
                label: "Quiz Glossario".into(),
                file: PathBuf::from("newQuizGlossario.json"),
                exam,
                practice,
            },
        ])
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Parse` for malformed JSON or invalid values.
    pub fn from_json_str(body: &str) -> Result<Self, CatalogError> {
        let parsed: QuizCatalog = serde_json::from_str(body)?;
        Self::new(parsed.variants)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Io` if the file cannot be read, otherwise see
    /// [`QuizCatalog::from_json_str`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let body = std::fs::read_to_string(path)?;
        Self::from_json_str(&body)
    }

    #[must_use]
    pub fn variants(&self) -> &[VariantSettings] {
        &self.variants
    }

    #[must_use]
    pub fn variant(&self, tag: &VariantTag) -> Option<&VariantSettings> {
        self.variants.iter().find(|v| &v.tag == tag)
    }

    /// Resolve the immutable configuration for one session.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::UnknownVariant` for unlisted tags and
    /// `CatalogError::Config` for invalid exam settings.
    pub fn session_config(
        &self,
        tag: &VariantTag,
        mode: ModeTag,
    ) -> Result<SessionConfig, CatalogError> {
        let variant = self
            .variant(tag)
            .ok_or_else(|| CatalogError::UnknownVariant(tag.clone()))?;

        let (mode, pass_fraction) = match mode {
            ModeTag::TimedBalanced => (
                SessionMode::timed_balanced(
                    variant.exam.ceiling_secs,
                    variant.exam.weights.clone(),
                    variant.exam.size,
                )?,
                variant.exam.pass_fraction,
            ),
            ModeTag::UntimedFull => (SessionMode::UntimedFull, variant.practice.pass_fraction),
        };
        Ok(SessionConfig::new(variant.tag.clone(), mode, pass_fraction))
    }

    /// A JSON bank source with every variant's file registered under `root`.
    #[must_use]
    pub fn bank_repository(&self, root: impl Into<PathBuf>) -> JsonBankRepository {
        self.variants
            .iter()
            .fold(JsonBankRepository::new(root), |repo, v| {
                repo.with_file(v.tag.clone(), &v.file)
            })
    }
}
