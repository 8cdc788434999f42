//! Output formatting and persistence for dashboards.
//!
//! Supports pretty-printing, JSON serialization, a plain-text terminal
//! rendering, and flat CSV export of every view.

use anyhow::Result;
use serde::Serialize;
use std::fmt::Write as _;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

use crate::analyzers::types::{AggregationView, Dashboard};

/// Logs a dashboard using Rust's debug pretty-print format.
pub fn print_pretty(dashboard: &Dashboard) {
    debug!("{:#?}", dashboard);
}

/// Prints a dashboard to stdout as pretty-printed JSON.
pub fn print_json(dashboard: &Dashboard) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(dashboard)?);
    Ok(())
}

/// One flattened `(view, label, count)` row.
#[derive(Debug, Serialize)]
struct ViewRow<'a> {
    view: &'a str,
    label: &'a str,
    count: usize,
}

fn view_rows(dashboard: &Dashboard) -> Vec<ViewRow<'_>> {
    let mut views: Vec<(&str, &AggregationView)> = vec![
        ("reasons", &dashboard.reasons),
        ("weekdays", &dashboard.weekdays.counts),
        ("weekly", &dashboard.weekly),
    ];
    if let Some(latest) = &dashboard.latest_scores {
        views.push(("latest_scores", latest));
    }

    views
        .into_iter()
        .flat_map(|(view, entries)| {
            entries.into_iter().map(move |e| ViewRow {
                view,
                label: &e.label,
                count: e.count,
            })
        })
        .collect()
}

/// Writes every view of `dashboard` to a CSV file with a single header.
///
/// Overwrites the file if it exists.
pub fn write_views_csv(path: &Path, dashboard: &Dashboard) -> Result<()> {
    let rows = view_rows(dashboard);
    debug!(path = %path.display(), rows = rows.len(), "Writing CSV views");

    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    for row in &rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = rows.len(), "CSV export written");
    Ok(())
}

fn write_section(out: &mut String, title: &str, view: &AggregationView, peak: Option<&str>) {
    let _ = writeln!(out);
    let _ = writeln!(out, "## {title}");
    if view.is_empty() {
        let _ = writeln!(out, "(no records)");
        return;
    }
    let width = view
        .entries()
        .iter()
        .map(|e| e.label.chars().count())
        .max()
        .unwrap_or(0);
    for entry in view {
        let marker = if peak == Some(entry.label.as_str()) { " *" } else { "" };
        let pad = width - entry.label.chars().count();
        let _ = writeln!(
            out,
            "{}{}  {:>5}{}",
            entry.label,
            " ".repeat(pad),
            entry.count,
            marker
        );
    }
}

/// Renders a dashboard as plain text. The peak weekday is marked with `*`.
pub fn render_text(dashboard: &Dashboard) -> String {
    let mut out = String::new();
    let scope = dashboard
        .grade
        .as_deref()
        .map(|g| format!("{g}학년"))
        .unwrap_or_else(|| "전체".to_string());

    let _ = writeln!(out, "# {} {} 현황", scope, dashboard.category);
    match dashboard.period {
        Some(period) => {
            let _ = writeln!(
                out,
                "기준일: {}  반영 기간: {} ~ {}",
                period.end.format("%Y년 %m월 %d일"),
                period.start.format("%Y년 %m월 %d일"),
                period.end.format("%Y년 %m월 %d일")
            );
        }
        None => {
            let _ = writeln!(out, "기준일: 날짜 변환 실패");
        }
    }
    let _ = writeln!(out, "records in scope: {}", dashboard.record_count);

    write_section(&mut out, "Reasons", &dashboard.reasons, None);
    write_section(
        &mut out,
        "Weekdays",
        &dashboard.weekdays.counts,
        dashboard.weekdays.peak.as_deref(),
    );
    write_section(&mut out, "Weekly trend", &dashboard.weekly, None);
    if let Some(latest) = &dashboard.latest_scores {
        write_section(&mut out, "Latest cumulative score", latest, None);
    }

    let q = &dashboard.quality;
    let _ = writeln!(out);
    let _ = writeln!(out, "## Data quality");
    let _ = writeln!(
        out,
        "rows {}, dropped {}, invalid dates {}, unparseable scores {}, zero scores {}",
        q.total_rows, q.dropped_unmatched, q.invalid_dates, q.unparseable_scores, q.zero_scores
    );

    out
}
