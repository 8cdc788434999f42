//! Weekly trend keyed by month-relative week labels.
//!
//! A date's label is `YYYY-MM-<n>주`, where `<n>` counts 7-day blocks from
//! the first of its month (days 1–7 are week 1, 8–14 week 2, ...). Labels
//! therefore restart at every month boundary.

use chrono::{Datelike, NaiveDate};
use std::collections::HashMap;

use crate::analyzers::types::{AggregationView, ViewEntry};
use crate::normalize::{Category, NormalizedRecord};

pub fn week_label(date: NaiveDate) -> String {
    format!(
        "{}-{:02}-{}주",
        date.year(),
        date.month(),
        (date.day() - 1) / 7 + 1
    )
}

/// Every week label touched by a day in `start..=end`, in calendar order.
pub fn week_axis(start: NaiveDate, end: NaiveDate) -> Vec<String> {
    let mut axis: Vec<String> = Vec::new();
    for day in start.iter_days().take_while(|d| *d <= end) {
        let label = week_label(day);
        if axis.last() != Some(&label) {
            axis.push(label);
        }
    }
    axis
}

/// Counts dated records of one category per week over `start..=end`.
/// Weeks without records appear with a zero count.
pub fn weekly_trend<'a, I>(
    records: I,
    category: Category,
    start: NaiveDate,
    end: NaiveDate,
) -> AggregationView
where
    I: IntoIterator<Item = &'a NormalizedRecord>,
{
    let mut counts: HashMap<String, usize> = HashMap::new();
    for record in records.into_iter().filter(|r| r.category == category) {
        match record.date {
            Some(date) if date >= start && date <= end => {
                *counts.entry(week_label(date)).or_insert(0) += 1;
            }
            _ => {}
        }
    }

    AggregationView::new(
        week_axis(start, end)
            .into_iter()
            .map(|label| {
                let count = counts.get(&label).copied().unwrap_or(0);
                ViewEntry { label, count }
            })
            .collect(),
    )
}
