use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use quiz_core::model::{CategoryWeights, Question, QuestionId, SessionMode, dedup_questions};

/// Selection result for a session build.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionPlan {
    pub questions: Vec<Question>,
    /// Target size for balanced sessions; `None` when the whole bank is used.
    pub requested: Option<usize>,
    /// Questions drawn per weighted category, in weight-table order.
    pub per_category: Vec<(String, usize)>,
    /// Questions drawn from the leftover pool to fill rounding gaps.
    pub backfilled: usize,
    /// Questions dropped after a rounding overshoot.
    pub truncated: usize,
}

impl SessionPlan {
    /// Total number of questions in this plan.
    #[must_use]
    pub fn total(&self) -> usize {
        self.questions.len()
    }

    /// Returns true when no questions were selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// True when the bank could not supply the requested size.
    #[must_use]
    pub fn is_short(&self) -> bool {
        self.requested.is_some_and(|n| self.questions.len() < n)
    }
}

/// Turns a question pool into a session's question sequence.
///
/// Every "random order" step is a uniform Fisher–Yates shuffle
/// (`SliceRandom::shuffle`). Nothing is seeded here: callers pass the RNG,
/// so tests can use a seeded one and sessions use the thread RNG.
pub struct QuestionSampler<'a> {
    mode: &'a SessionMode,
}

impl<'a> QuestionSampler<'a> {
    #[must_use]
    pub fn new(mode: &'a SessionMode) -> Self {
        Self { mode }
    }

    /// Build a plan from `pool`.
    ///
    /// - `UntimedFull`: the deduplicated pool in random order.
    /// - `TimedBalanced`: per-category quotas in weight-table order, then a
    ///   uniform backfill from whatever is left, then a final shuffle and
    ///   truncation to `size`.
    ///
    /// A pool smaller than the target yields a shorter plan, never an error.
    pub fn sample<R: Rng + ?Sized>(&self, pool: &[Question], rng: &mut R) -> SessionPlan {
        let deduped = dedup_questions(pool.iter().cloned());
        if deduped.duplicates_dropped > 0 || deduped.ids_rewritten > 0 {
            debug!(
                dropped = deduped.duplicates_dropped,
                rewritten = deduped.ids_rewritten,
                "pool ids deduplicated"
            );
        }
        let unique: Vec<&Question> = deduped.questions.iter().collect();
        match self.mode {
            SessionMode::UntimedFull => sample_full(unique, rng),
            SessionMode::TimedBalanced { weights, size, .. } => {
                sample_balanced(&unique, weights, *size, rng)
            }
        }
    }
}

fn sample_full<R: Rng + ?Sized>(mut unique: Vec<&Question>, rng: &mut R) -> SessionPlan {
    unique.shuffle(rng);
    debug!(selected = unique.len(), "full sample built");
    SessionPlan {
        questions: unique.into_iter().cloned().collect(),
        requested: None,
        per_category: Vec::new(),
        backfilled: 0,
        truncated: 0,
    }
}

fn sample_balanced<R: Rng + ?Sized>(
    unique: &[&Question],
    weights: &CategoryWeights,
    size: usize,
    rng: &mut R,
) -> SessionPlan {
    let mut buckets: HashMap<&str, Vec<&Question>> = HashMap::new();
    for &question in unique {
        buckets.entry(question.bucket()).or_default().push(question);
    }

    let mut used: HashSet<&QuestionId> = HashSet::new();
    let mut selected: Vec<&Question> = Vec::with_capacity(size);
    let mut per_category = Vec::with_capacity(weights.len());

    for (category, percent) in weights.iter() {
        let ask = CategoryWeights::quota(percent, size);
        let mut candidates: Vec<&Question> = buckets
            .get(category)
            .map(|bucket| {
                bucket
                    .iter()
                    .copied()
                    .filter(|q| !used.contains(q.id()))
                    .collect()
            })
            .unwrap_or_default();
        candidates.shuffle(rng);
        candidates.truncate(ask);

        used.extend(candidates.iter().map(|&q| q.id()));
        per_category.push((category.to_owned(), candidates.len()));
        selected.extend(candidates);
    }

    let mut backfilled = 0;
    if selected.len() < size {
        let mut remaining: Vec<&Question> = unique
            .iter()
            .copied()
            .filter(|q| !used.contains(q.id()))
            .collect();
        remaining.shuffle(rng);
        remaining.truncate(size - selected.len());
        backfilled = remaining.len();
        selected.extend(remaining);
    }

    selected.shuffle(rng);
    let truncated = selected.len().saturating_sub(size);
    selected.truncate(size);

    if selected.len() < size {
        warn!(
            requested = size,
            available = selected.len(),
            "question pool smaller than session size"
        );
    }
    debug!(
        selected = selected.len(),
        backfilled, truncated, "balanced sample built"
    );

    SessionPlan {
        questions: selected.into_iter().cloned().collect(),
        requested: Some(size),
        per_category,
        backfilled,
        truncated,
    }
}
