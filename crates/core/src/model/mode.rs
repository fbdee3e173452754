use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::VariantTag;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("pass fraction must be in (0, 1], got {0}")]
    InvalidPassFraction(f64),

    #[error("session size must be > 0")]
    InvalidSessionSize,

    #[error("time ceiling must be > 0 seconds")]
    InvalidTimeCeiling,

    #[error("weight for category {category:?} must be a finite, non-negative percentage")]
    InvalidWeight { category: String },

    #[error("category {0:?} appears more than once in the weight table")]
    DuplicateCategory(String),

    #[error("unknown mode tag: {0:?}")]
    UnknownMode(String),
}

//
// ─── CATEGORY WEIGHTS ──────────────────────────────────────────────────────────
//

/// One row of a weight table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryWeight {
    pub category: String,
    pub percent: f64,
}

/// Target share of a balanced session per category, in table order.
///
/// Percentages need not sum to 100; rounding gaps are filled from the
/// remaining pool and overshoot is truncated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<CategoryWeight>", into = "Vec<CategoryWeight>")]
pub struct CategoryWeights(Vec<CategoryWeight>);

impl CategoryWeights {
    /// Builds a weight table, keeping the given iteration order.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidWeight` for negative or non-finite values
    /// and `ConfigError::DuplicateCategory` for repeated labels.
    pub fn new<S: Into<String>>(
        rows: impl IntoIterator<Item = (S, f64)>,
    ) -> Result<Self, ConfigError> {
        let rows = rows
            .into_iter()
            .map(|(category, percent)| CategoryWeight {
                category: category.into(),
                percent,
            })
            .collect::<Vec<_>>();
        Self::try_from(rows)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.0.iter().map(|w| (w.category.as_str(), w.percent))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of questions to ask from a category for a session of `size`.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn quota(percent: f64, size: usize) -> usize {
        let raw = (size as f64 * percent / 100.0).round();
        if raw.is_finite() && raw > 0.0 { raw as usize } else { 0 }
    }
}

impl TryFrom<Vec<CategoryWeight>> for CategoryWeights {
    type Error = ConfigError;

    fn try_from(rows: Vec<CategoryWeight>) -> Result<Self, Self::Error> {
        for (i, row) in rows.iter().enumerate() {
            if !row.percent.is_finite() || row.percent < 0.0 {
                return Err(ConfigError::InvalidWeight {
                    category: row.category.clone(),
                });
            }
            if rows[..i].iter().any(|prev| prev.category == row.category) {
                return Err(ConfigError::DuplicateCategory(row.category.clone()));
            }
        }
        Ok(Self(rows))
    }
}

impl From<CategoryWeights> for Vec<CategoryWeight> {
    fn from(value: CategoryWeights) -> Self {
        value.0
    }
}

//
// ─── MODE ──────────────────────────────────────────────────────────────────────
//

/// How a session selects its questions and whether it runs against a clock.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionMode {
    /// Category-weighted sample of `size` questions with a hard time ceiling.
    TimedBalanced {
        ceiling_secs: u32,
        weights: CategoryWeights,
        size: usize,
    },
    /// Every question in the bank, shuffled, no timer.
    UntimedFull,
}

impl SessionMode {
    /// # Errors
    ///
    /// Returns `ConfigError` when `size` or `ceiling_secs` is zero.
    pub fn timed_balanced(
        ceiling_secs: u32,
        weights: CategoryWeights,
        size: usize,
    ) -> Result<Self, ConfigError> {
        if size == 0 {
            return Err(ConfigError::InvalidSessionSize);
        }
        if ceiling_secs == 0 {
            return Err(ConfigError::InvalidTimeCeiling);
        }
        Ok(Self::TimedBalanced {
            ceiling_secs,
            weights,
            size,
        })
    }

    /// Time ceiling in seconds, if this mode runs a timer.
    #[must_use]
    pub fn time_ceiling(&self) -> Option<u32> {
        match self {
            SessionMode::TimedBalanced { ceiling_secs, .. } => Some(*ceiling_secs),
            SessionMode::UntimedFull => None,
        }
    }

    #[must_use]
    pub fn is_timed(&self) -> bool {
        self.time_ceiling().is_some()
    }

    #[must_use]
    pub fn tag(&self) -> ModeTag {
        match self {
            SessionMode::TimedBalanced { .. } => ModeTag::TimedBalanced,
            SessionMode::UntimedFull => ModeTag::UntimedFull,
        }
    }
}

/// String-level selector for a mode, as chosen on the selection screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModeTag {
    TimedBalanced,
    UntimedFull,
}

impl FromStr for ModeTag {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "timed-balanced" | "exam" => Ok(Self::TimedBalanced),
            "untimed-full" | "practice" => Ok(Self::UntimedFull),
            other => Err(ConfigError::UnknownMode(other.to_owned())),
        }
    }
}

impl fmt::Display for ModeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModeTag::TimedBalanced => f.write_str("timed-balanced"),
            ModeTag::UntimedFull => f.write_str("untimed-full"),
        }
    }
}

//
// ─── PASS FRACTION ─────────────────────────────────────────────────────────────
//

/// Share of questions that must be correct to pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct PassFraction(f64);

impl PassFraction {
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidPassFraction` outside `(0, 1]`.
    pub fn new(value: f64) -> Result<Self, ConfigError> {
        if !value.is_finite() || value <= 0.0 || value > 1.0 {
            return Err(ConfigError::InvalidPassFraction(value));
        }
        Ok(Self(value))
    }

    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Percentage for display, e.g. `85.0` for `0.85`.
    #[must_use]
    pub fn percent(self) -> f64 {
        self.0 * 100.0
    }
}

impl TryFrom<f64> for PassFraction {
    type Error = ConfigError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PassFraction> for f64 {
    fn from(value: PassFraction) -> Self {
        value.0
    }
}

//
// ─── SESSION CONFIG ────────────────────────────────────────────────────────────
//

/// Everything fixed at session start.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    variant: VariantTag,
    mode: SessionMode,
    pass_fraction: PassFraction,
}

impl SessionConfig {
    #[must_use]
    pub fn new(variant: VariantTag, mode: SessionMode, pass_fraction: PassFraction) -> Self {
        Self {
            variant,
            mode,
            pass_fraction,
        }
    }

    #[must_use]
    pub fn variant(&self) -> &VariantTag {
        &self.variant
    }

    #[must_use]
    pub fn mode(&self) -> &SessionMode {
        &self.mode
    }

    #[must_use]
    pub fn pass_fraction(&self) -> PassFraction {
        self.pass_fraction
    }
}
