//! Data types produced by the aggregation queries.

use serde::Serialize;

use crate::normalize::{Category, DataQuality, ReportingPeriod};

/// One `(label, count)` pair in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewEntry {
    pub label: String,
    pub count: usize,
}

impl ViewEntry {
    pub fn new(label: impl Into<String>, count: usize) -> Self {
        Self {
            label: label.into(),
            count,
        }
    }
}

/// A read-only categorical count table. Produced fresh per query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AggregationView {
    entries: Vec<ViewEntry>,
}

impl AggregationView {
    pub fn new(entries: Vec<ViewEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[ViewEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> usize {
        self.entries.iter().map(|e| e.count).sum()
    }

    pub fn get(&self, label: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|e| e.label == label)
            .map(|e| e.count)
    }

    pub fn labels(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.label.as_str()).collect()
    }
}

impl<'a> IntoIterator for &'a AggregationView {
    type Item = &'a ViewEntry;
    type IntoIter = std::slice::Iter<'a, ViewEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Monday..Friday counts plus the weekday to highlight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekdayView {
    pub counts: AggregationView,
    /// Highest count, first in weekday order on ties. `None` when every
    /// count is zero.
    pub peak: Option<String>,
}

/// Every view for one grade/category selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub grade: Option<String>,
    pub category: Category,
    pub period: Option<ReportingPeriod>,
    pub record_count: usize,
    pub reasons: AggregationView,
    pub weekdays: WeekdayView,
    pub weekly: AggregationView,
    /// Absent when the source table has no cumulative-score column.
    pub latest_scores: Option<AggregationView>,
    pub quality: DataQuality,
}
