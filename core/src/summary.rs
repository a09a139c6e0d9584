//! Derived view of today's log.
//!
//! Everything here is recomputed from the entry list and the target. There
//! are no running counters to drift out of step with the store.

use serde::Serialize;

use crate::models::{DailyTarget, Entry};

#[must_use]
pub fn total(entries: &[Entry]) -> u64 {
    entries.iter().map(|e| u64::from(e.calories())).sum()
}

#[must_use]
pub fn junk_count(entries: &[Entry]) -> usize {
    entries.iter().filter(|e| e.is_junk()).count()
}

/// Share of the target eaten so far, clamped to `[0, 100]`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn progress_percentage(total: u64, target: DailyTarget) -> f64 {
    let pct = total as f64 / f64::from(target.calories()) * 100.0;
    pct.min(100.0)
}

#[must_use]
pub fn is_over_target(total: u64, target: DailyTarget) -> bool {
    total > u64::from(target.calories())
}

/// Calories left before the target; negative once over it.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub fn remaining(total: u64, target: DailyTarget) -> i64 {
    i64::from(target.calories()) - total as i64
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySummary {
    pub total: u64,
    pub junk_count: usize,
    pub entry_count: usize,
    pub target: DailyTarget,
    pub progress_percentage: f64,
    pub over_target: bool,
    pub remaining: i64,
}

impl DailySummary {
    #[must_use]
    pub fn derive(entries: &[Entry], target: DailyTarget) -> Self {
        let total = total(entries);
        Self {
            total,
            junk_count: junk_count(entries),
            entry_count: entries.len(),
            target,
            progress_percentage: progress_percentage(total, target),
            over_target: is_over_target(total, target),
            remaining: remaining(total, target),
        }
    }

    /// "850 left" while under the target, "Over target!" otherwise.
    #[must_use]
    pub fn remaining_label(&self) -> String {
        if self.remaining > 0 {
            format!("{} left", self.remaining)
        } else {
            "Over target!".to_string()
        }
    }

    /// "1 junk item today" / "3 junk items today".
    #[must_use]
    pub fn junk_label(&self) -> String {
        let noun = if self.junk_count == 1 { "item" } else { "items" };
        format!("{} junk {noun} today", self.junk_count)
    }
}
