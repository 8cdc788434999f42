use chrono::{Datelike, Weekday};
use std::collections::{BTreeMap, HashMap};

use crate::analyzers::bucket::{bucket_index, bucket_label};
use crate::analyzers::classify::OTHER_LABEL;
use crate::analyzers::types::{AggregationView, ViewEntry, WeekdayView};
use crate::analyzers::utility::{ranked, share};
use crate::normalize::{Category, NormalizedRecord};

/// Share at or below which a reason is folded into the "other" bucket.
pub const DEFAULT_MERGE_THRESHOLD: f64 = 0.05;

/// Weekday axis, in display order.
pub static SCHOOL_DAYS: &[(Weekday, &str)] = &[
    (Weekday::Mon, "Monday"),
    (Weekday::Tue, "Tuesday"),
    (Weekday::Wed, "Wednesday"),
    (Weekday::Thu, "Thursday"),
    (Weekday::Fri, "Friday"),
];

/// Counts reason labels for one category, largest first.
///
/// With `merge_threshold`, every label whose share of the total is at or
/// below the threshold (and any fallback-labeled rows) is summed into a
/// trailing [`OTHER_LABEL`] entry, which is appended only when non-zero.
/// Dates are not consulted, so rows with invalid dates still count.
pub fn reason_distribution<'a, I>(
    records: I,
    category: Category,
    merge_threshold: Option<f64>,
) -> AggregationView
where
    I: IntoIterator<Item = &'a NormalizedRecord>,
{
    let mut counts: HashMap<String, usize> = HashMap::new();
    for record in records.into_iter().filter(|r| r.category == category) {
        *counts.entry(record.reason_label.clone()).or_insert(0) += 1;
    }

    let view = ranked(counts);
    let Some(threshold) = merge_threshold else {
        return view;
    };

    let total = view.total();
    let mut kept = Vec::new();
    let mut other = 0usize;
    for entry in view.entries() {
        if entry.label == OTHER_LABEL || share(entry.count, total) <= threshold {
            other += entry.count;
        } else {
            kept.push(entry.clone());
        }
    }
    if other > 0 {
        kept.push(ViewEntry::new(OTHER_LABEL, other));
    }
    AggregationView::new(kept)
}

/// Counts dated records of one category per school day, zero-filled.
///
/// Weekend-dated records fall outside the axis and are not counted.
pub fn weekday_distribution<'a, I>(records: I, category: Category) -> WeekdayView
where
    I: IntoIterator<Item = &'a NormalizedRecord>,
{
    let mut counts = [0usize; 5];
    for record in records.into_iter().filter(|r| r.category == category) {
        let Some(date) = record.date else { continue };
        if let Some(slot) = SCHOOL_DAYS.iter().position(|(d, _)| *d == date.weekday()) {
            counts[slot] += 1;
        }
    }

    let mut peak: Option<(usize, usize)> = None;
    for (slot, count) in counts.iter().enumerate() {
        if *count > 0 && peak.is_none_or(|(_, best)| *count > best) {
            peak = Some((slot, *count));
        }
    }

    let entries = SCHOOL_DAYS
        .iter()
        .zip(counts)
        .map(|((_, name), count)| ViewEntry::new(*name, count))
        .collect();

    WeekdayView {
        counts: AggregationView::new(entries),
        peak: peak.map(|(slot, _)| SCHOOL_DAYS[slot].1.to_string()),
    }
}

/// Picks each student's most recent dated row that carries a cumulative
/// score. On a date tie the later row in input order wins.
pub fn latest_cumulative_scores<'a, I>(records: I) -> BTreeMap<&'a str, &'a NormalizedRecord>
where
    I: IntoIterator<Item = &'a NormalizedRecord>,
{
    let mut latest: BTreeMap<&'a str, &'a NormalizedRecord> = BTreeMap::new();
    for record in records {
        let (Some(date), Some(_)) = (record.date, record.cumulative) else {
            continue;
        };
        match latest.get(record.student_id.as_str()) {
            Some(current) if current.date.is_some_and(|d| d > date) => {}
            _ => {
                latest.insert(record.student_id.as_str(), record);
            }
        }
    }
    latest
}

/// Number of students per cumulative-score bucket, in score order.
/// Empty buckets are omitted.
pub fn latest_score_distribution<'a, I>(records: I) -> AggregationView
where
    I: IntoIterator<Item = &'a NormalizedRecord>,
{
    let mut buckets: BTreeMap<usize, usize> = BTreeMap::new();
    for record in latest_cumulative_scores(records).values() {
        if let Some(score) = record.cumulative {
            *buckets.entry(bucket_index(score)).or_insert(0) += 1;
        }
    }

    AggregationView::new(
        buckets
            .into_iter()
            .map(|(idx, count)| ViewEntry::new(bucket_label(idx), count))
            .collect(),
    )
}
