use tracing::{info, warn};

use crate::analyzers::aggregate::{
    DEFAULT_MERGE_THRESHOLD, latest_score_distribution, reason_distribution, weekday_distribution,
};
use crate::analyzers::types::{AggregationView, Dashboard};
use crate::analyzers::weekly::weekly_trend;
use crate::normalize::{Category, Dataset};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DashboardOptions {
    pub category: Category,
    /// `None` disables the long-tail merge.
    pub merge_threshold: Option<f64>,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            category: Category::Demerit,
            merge_threshold: Some(DEFAULT_MERGE_THRESHOLD),
        }
    }
}

/// Computes every view for `grade` (or the whole school when `None`).
///
/// The weekly axis always spans the dataset-wide reporting period so that
/// grades are comparable week for week.
#[tracing::instrument(skip(dataset, options), fields(category = %options.category))]
pub fn build_dashboard(
    dataset: &Dataset,
    grade: Option<&str>,
    options: &DashboardOptions,
) -> Dashboard {
    let scope = dataset.scope(grade);
    let category = options.category;

    let reasons = reason_distribution(scope.iter().copied(), category, options.merge_threshold);
    let weekdays = weekday_distribution(scope.iter().copied(), category);

    let weekly = match dataset.period() {
        Some(period) => weekly_trend(scope.iter().copied(), category, period.start, period.end),
        None => {
            warn!("No valid record dates; weekly trend is empty");
            AggregationView::default()
        }
    };

    let latest_scores = if dataset.has_cumulative() {
        Some(latest_score_distribution(scope.iter().copied()))
    } else {
        warn!("No cumulative score column; skipping latest score distribution");
        None
    };

    info!(
        records = scope.len(),
        reasons = reasons.len(),
        weeks = weekly.len(),
        "Dashboard built"
    );

    Dashboard {
        grade: grade.map(str::to_string),
        category,
        period: dataset.period(),
        record_count: scope.len(),
        reasons,
        weekdays,
        weekly,
        latest_scores,
        quality: dataset.quality().clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::classify::ReasonClassifier;
    use crate::loader::RawRecord;
    use crate::normalize::{DateMode, Normalizer};

    fn raw(id: &str, desc: &str, score: &str, date: &str, cumulative: Option<&str>) -> RawRecord {
        RawRecord {
            student_id: Some(id.into()),
            description: Some(desc.into()),
            score: Some(score.into()),
            date: Some(date.into()),
            cumulative: cumulative.map(str::to_string),
            name: None,
        }
    }

    fn dataset(has_cumulative: bool) -> Dataset {
        let normalizer = Normalizer::new(ReasonClassifier::standard(), DateMode::Strict);
        normalizer.normalize_records(
            &[
                raw("10101", "등교시간 지각", "-1", "2025.03.04", Some("-1")),
                raw("10101", "휴대폰 미제출", "-2", "2025.03.12", Some("-3")),
                raw("10202", "슬리퍼 등하교", "-1", "2025.03.05", Some("-1")),
                raw("20101", "교육활동 도우미", "2", "2025.03.20", Some("2")),
                raw("20102", "등교시간 지각", "-1", "날짜없음", Some("-1")),
            ],
            has_cumulative,
        )
    }

    #[test]
    fn test_build_dashboard_for_grade() {
        let data = dataset(true);
        let options = DashboardOptions {
            category: Category::Demerit,
            merge_threshold: None,
        };
        let dashboard = build_dashboard(&data, Some("1"), &options);

        assert_eq!(dashboard.grade.as_deref(), Some("1"));
        assert_eq!(dashboard.record_count, 3);
        assert_eq!(dashboard.reasons.total(), 3);
        assert_eq!(dashboard.weekdays.counts.total(), 3);
        // Axis covers the school-wide period 03-04..03-20.
        assert_eq!(
            dashboard.weekly.labels(),
            vec!["2025-03-1주", "2025-03-2주", "2025-03-3주"]
        );
        let latest = dashboard.latest_scores.unwrap();
        assert_eq!(latest.total(), 2);
        assert_eq!(latest.get("-4..0"), Some(2));
    }

    #[test]
    fn test_undated_rows_count_only_in_reason_view() {
        let data = dataset(true);
        let dashboard = build_dashboard(&data, Some("2"), &DashboardOptions::default());
        assert_eq!(dashboard.reasons.total(), 1);
        assert_eq!(dashboard.weekdays.counts.total(), 0);
        assert_eq!(dashboard.weekly.total(), 0);
        assert_eq!(dashboard.quality.invalid_dates, 1);

        // 20102's only row is undated, so only 20101 has a latest score.
        let latest = dashboard.latest_scores.unwrap();
        assert_eq!(latest.total(), 1);
        assert_eq!(latest.get("1..5"), Some(1));
        assert_eq!(latest.get("-4..0"), None);
    }

    #[test]
    fn test_latest_scores_absent_without_column() {
        let dashboard = build_dashboard(&dataset(false), None, &DashboardOptions::default());
        assert!(dashboard.latest_scores.is_none());
    }

    #[test]
    fn test_repeated_builds_are_identical() {
        let data = dataset(true);
        let options = DashboardOptions::default();
        let first = serde_json::to_string(&build_dashboard(&data, None, &options)).unwrap();
        let second = serde_json::to_string(&build_dashboard(&data, None, &options)).unwrap();
        assert_eq!(first, second);
    }
}
