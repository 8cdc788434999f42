use std::collections::HashMap;

use crate::analyzers::types::{AggregationView, ViewEntry};

/// Share of `count` in `total` (0.0–1.0). Returns 0.0 for an empty total.
pub fn share(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    count as f64 / total as f64
}

/// Turns a count map into a view ordered by descending count, then label.
pub fn ranked(counts: HashMap<String, usize>) -> AggregationView {
    let mut entries: Vec<ViewEntry> = counts
        .into_iter()
        .map(|(label, count)| ViewEntry { label, count })
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    AggregationView::new(entries)
}
