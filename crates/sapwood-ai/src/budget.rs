//! Token usage tracking and optional budget

use crate::bridge::Completion;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared counters for one run. Safe to update from many tasks.
#[derive(Debug, Default)]
pub struct UsageTracker {
    calls: AtomicU64,
    failures: AtomicU64,
    input_tokens: AtomicU64,
    output_tokens: AtomicU64,
    /// Total token allowance; `None` means unlimited.
    budget: Option<u64>,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    pub calls: u64,
    pub failures: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub budget: Option<u64>,
}

impl UsageSnapshot {
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// Budget warning levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetWarning {
    /// Budget is healthy (< 50%)
    Healthy,
    /// Budget is getting low (50-75%)
    Warning,
    /// Budget is critically low (75-90%)
    Critical,
    /// Budget is nearly exhausted (> 90%)
    Exhausted,
}

impl UsageTracker {
    pub fn new(budget: Option<u64>) -> Self {
        UsageTracker {
            budget,
            ..UsageTracker::default()
        }
    }

    pub fn unlimited() -> Self {
        Self::new(None)
    }

    /// Record a call that returned a completion, whether or not it parsed.
    pub fn record(&self, completion: &Completion) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.input_tokens.fetch_add(completion.input_tokens, Ordering::Relaxed);
        self.output_tokens.fetch_add(completion.output_tokens, Ordering::Relaxed);
    }

    /// Record an entity or aggregate that fell back after all retries.
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn tokens_used(&self) -> u64 {
        self.input_tokens.load(Ordering::Relaxed) + self.output_tokens.load(Ordering::Relaxed)
    }

    /// Tokens left, or `None` when unlimited.
    pub fn remaining(&self) -> Option<u64> {
        self.budget.map(|b| b.saturating_sub(self.tokens_used()))
    }

    /// Once true, callers should stop issuing inference calls.
    pub fn is_exhausted(&self) -> bool {
        self.remaining() == Some(0)
    }

    /// Get usage percentage
    pub fn usage_percentage(&self) -> f32 {
        match self.budget {
            Some(0) => 100.0,
            Some(b) => (self.tokens_used() as f32 / b as f32) * 100.0,
            None => 0.0,
        }
    }

    /// Get the current warning level
    pub fn warning_level(&self) -> BudgetWarning {
        match self.usage_percentage() {
            p if p < 50.0 => BudgetWarning::Healthy,
            p if p < 75.0 => BudgetWarning::Warning,
            p if p < 90.0 => BudgetWarning::Critical,
            _ => BudgetWarning::Exhausted,
        }
    }

    pub fn snapshot(&self) -> UsageSnapshot {
        UsageSnapshot {
            calls: self.calls.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            input_tokens: self.input_tokens.load(Ordering::Relaxed),
            output_tokens: self.output_tokens.load(Ordering::Relaxed),
            budget: self.budget,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlimited_never_exhausts() {
        let tracker = UsageTracker::unlimited();
        tracker.record(&Completion::new("x", 1_000_000, 1_000_000));
        assert!(!tracker.is_exhausted());
        assert_eq!(tracker.remaining(), None);
        assert_eq!(tracker.warning_level(), BudgetWarning::Healthy);
    }

    #[test]
    fn test_budget_exhaustion() {
        let tracker = UsageTracker::new(Some(100));
        tracker.record(&Completion::new("x", 40, 20));
        assert_eq!(tracker.remaining(), Some(40));
        assert_eq!(tracker.warning_level(), BudgetWarning::Warning);
        tracker.record(&Completion::new("x", 40, 20));
        assert!(tracker.is_exhausted());
        assert_eq!(tracker.warning_level(), BudgetWarning::Exhausted);
    }

    #[test]
    fn test_snapshot_counts_failures() {
        let tracker = UsageTracker::unlimited();
        tracker.record(&Completion::new("x", 3, 2));
        tracker.record_failure();
        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.calls, 1);
        assert_eq!(snapshot.failures, 1);
        assert_eq!(snapshot.total_tokens(), 5);
    }
}
