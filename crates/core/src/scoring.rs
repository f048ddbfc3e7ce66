//! Running score and per-category breakdown for one session.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::model::{Category, percentage_of};

/// Correct/total tally for a single category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryScore {
    pub correct: u32,
    pub total: u32,
}

/// Snapshot of a session's score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreSummary {
    pub score: u32,
    pub total_questions: u32,
    pub percentage: f64,
    pub categories: BTreeMap<Category, CategoryScore>,
}

/// Accumulates one `record` per resolved question.
///
/// Callers guarantee a single call per question; the aggregator does not dedupe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreAggregator {
    total_questions: u32,
    score: u32,
    categories: BTreeMap<Category, CategoryScore>,
}

impl ScoreAggregator {
    #[must_use]
    pub fn new(total_questions: u32) -> Self {
        Self {
            total_questions,
            score: 0,
            categories: BTreeMap::new(),
        }
    }

    pub fn record(&mut self, category: &Category, is_correct: bool) {
        let entry = self.categories.entry(category.clone()).or_default();
        entry.total = entry.total.saturating_add(1);
        if is_correct {
            entry.correct = entry.correct.saturating_add(1);
            self.score = self.score.saturating_add(1);
        }
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    /// Questions answered or timed out so far.
    #[must_use]
    pub fn resolved(&self) -> u32 {
        self.categories.values().map(|c| c.total).sum()
    }

    #[must_use]
    pub fn category(&self, category: &Category) -> Option<CategoryScore> {
        self.categories.get(category).copied()
    }

    #[must_use]
    pub fn summarize(&self) -> ScoreSummary {
        ScoreSummary {
            score: self.score,
            total_questions: self.total_questions,
            percentage: percentage_of(self.score, self.total_questions),
            categories: self.categories.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cat(tag: &str) -> Category {
        Category::new(tag).unwrap()
    }

    #[test]
    fn records_correct_and_incorrect_per_category() {
        let mut agg = ScoreAggregator::new(5);
        agg.record(&cat("memory"), true);
        agg.record(&cat("memory"), false);
        agg.record(&cat("logic"), true);

        assert_eq!(agg.score(), 2);
        assert_eq!(agg.resolved(), 3);
        assert_eq!(
            agg.category(&cat("memory")),
            Some(CategoryScore {
                correct: 1,
                total: 2
            })
        );
        assert_eq!(
            agg.category(&cat("logic")),
            Some(CategoryScore {
                correct: 1,
                total: 1
            })
        );
        assert!(agg.category(&cat("math")).is_none());
    }

    #[test]
    fn summary_percentage_matches_counts() {
        let mut agg = ScoreAggregator::new(5);
        for correct in [true, false, true, true, true] {
            agg.record(&cat("pattern"), correct);
        }
        let summary = agg.summarize();
        assert_eq!(summary.score, 4);
        assert_eq!(summary.total_questions, 5);
        assert_eq!(summary.percentage, 80.0);
        assert_eq!(summary.categories.len(), 1);
    }

    #[test]
    fn summarize_has_no_side_effects() {
        let mut agg = ScoreAggregator::new(2);
        agg.record(&cat("a"), true);
        let before = agg.clone();
        let _ = agg.summarize();
        let _ = agg.summarize();
        assert_eq!(agg, before);
    }

    #[test]
    fn empty_session_summarizes_to_zero() {
        let summary = ScoreAggregator::new(0).summarize();
        assert_eq!(summary.percentage, 0.0);
        assert!(summary.categories.is_empty());
    }
}
