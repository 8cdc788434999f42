//! Record normalization: raw spreadsheet rows into typed records.
//!
//! Each [`RawRecord`] yields exactly one [`NormalizedRecord`] (unless the
//! classifier runs in drop mode and rejects it). Per-row problems never
//! fail the pass; they are reflected in the record (`date: None`,
//! `Score::Unparseable`) and tallied in [`DataQuality`].

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info};

use crate::analyzers::classify::{Classification, ReasonClassifier};
use crate::columns::{ColumnConfig, ColumnLocator, ColumnMap};
use crate::error::Result;
use crate::loader::{RawRecord, RawTable};

pub const STUDENT_ID_WIDTH: usize = 5;
pub const CANONICAL_DATE_FORMAT: &str = "%Y.%m.%d";

static LENIENT_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y%m%d",
    "%Y. %m. %d",
    "%Y.%m.%d.",
];

static LENIENT_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y.%m.%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Largest Excel serial day number (9999-12-31).
const EXCEL_SERIAL_MAX: i64 = 2_958_465;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateMode {
    /// Only the canonical `YYYY.MM.DD` form.
    Strict,
    /// Canonical form first, then common alternatives and Excel serials.
    #[default]
    Lenient,
}

/// A per-record point value. Zero and unparseable are distinct states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Score {
    Value(i64),
    Unparseable,
}

impl Score {
    pub fn value(self) -> Option<i64> {
        match self {
            Score::Value(v) => Some(v),
            Score::Unparseable => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Merit,
    Demerit,
    Other,
}

impl Category {
    /// Sign of the score decides; zero and unparseable are both `Other`.
    pub fn from_score(score: Score) -> Self {
        match score {
            Score::Value(v) if v > 0 => Category::Merit,
            Score::Value(v) if v < 0 => Category::Demerit,
            _ => Category::Other,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Merit => "상점",
            Category::Demerit => "벌점",
            Category::Other => "기타",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedRecord {
    pub student_id: String,
    pub grade: String,
    pub class_no: String,
    pub seq_no: String,
    pub name: Option<String>,
    pub description: String,
    pub date: Option<NaiveDate>,
    pub score: Score,
    pub category: Category,
    pub reason_label: String,
    pub cumulative: Option<i64>,
}

/// Left-pads with `0` to five characters. Longer values pass through.
pub fn pad_student_id(raw: &str) -> String {
    let raw = raw.trim();
    let len = raw.chars().count();
    if len >= STUDENT_ID_WIDTH {
        raw.to_string()
    } else {
        format!("{}{}", "0".repeat(STUDENT_ID_WIDTH - len), raw)
    }
}

/// Slices `[start, end)` by character, tolerating short input.
fn char_slice(s: &str, start: usize, end: usize) -> String {
    s.chars().skip(start).take(end.saturating_sub(start)).collect()
}

/// Parses a signed integer score. Integral decimals such as `-3.0` are
/// accepted; anything else is [`Score::Unparseable`].
pub fn parse_score(raw: Option<&str>) -> Score {
    let Some(text) = raw.map(str::trim).filter(|t| !t.is_empty()) else {
        return Score::Unparseable;
    };
    let text = text.strip_prefix('+').unwrap_or(text);

    if let Ok(v) = text.parse::<i64>() {
        return Score::Value(v);
    }
    match text.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 => {
            Score::Value(v as i64)
        }
        _ => Score::Unparseable,
    }
}

pub fn parse_date(raw: Option<&str>, mode: DateMode) -> Option<NaiveDate> {
    let text = raw.map(str::trim).filter(|t| !t.is_empty())?;

    if let Ok(date) = NaiveDate::parse_from_str(text, CANONICAL_DATE_FORMAT) {
        return Some(date);
    }
    if mode == DateMode::Strict {
        return None;
    }

    LENIENT_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .or_else(|| {
            LENIENT_DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| parse_excel_serial(text))
}

fn parse_excel_serial(text: &str) -> Option<NaiveDate> {
    let days = match parse_score(Some(text)) {
        Score::Value(v) if (1..=EXCEL_SERIAL_MAX).contains(&v) => v,
        _ => return None,
    };
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_signed(Duration::days(days))
}

impl NormalizedRecord {
    /// Builds a record from raw fields and an already computed reason label.
    pub fn from_raw(raw: &RawRecord, reason_label: String, date_mode: DateMode) -> Self {
        let student_id = pad_student_id(raw.student_id.as_deref().unwrap_or_default());
        let score = parse_score(raw.score.as_deref());

        NormalizedRecord {
            grade: char_slice(&student_id, 0, 1),
            class_no: char_slice(&student_id, 1, 3),
            seq_no: char_slice(&student_id, 3, 5),
            student_id,
            name: raw.name.clone(),
            description: raw.description.clone().unwrap_or_default(),
            date: parse_date(raw.date.as_deref(), date_mode),
            category: Category::from_score(score),
            score,
            reason_label,
            cumulative: parse_score(raw.cumulative.as_deref()).value(),
        }
    }
}

/// Counters for rows that were recovered rather than rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DataQuality {
    pub total_rows: usize,
    pub dropped_unmatched: usize,
    pub invalid_dates: usize,
    pub unparseable_scores: usize,
    pub zero_scores: usize,
}

/// Earliest and latest valid record date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportingPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// An immutable, fully normalized table. Each query reads from it; nothing
/// writes back.
#[derive(Debug, Clone)]
pub struct Dataset {
    records: Vec<NormalizedRecord>,
    period: Option<ReportingPeriod>,
    has_cumulative: bool,
    quality: DataQuality,
}

impl Dataset {
    pub fn new(records: Vec<NormalizedRecord>, has_cumulative: bool, quality: DataQuality) -> Self {
        let start = records.iter().filter_map(|r| r.date).min();
        let end = records.iter().filter_map(|r| r.date).max();
        let period = start.zip(end).map(|(start, end)| ReportingPeriod { start, end });
        Self {
            records,
            period,
            has_cumulative,
            quality,
        }
    }

    pub fn records(&self) -> &[NormalizedRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn period(&self) -> Option<ReportingPeriod> {
        self.period
    }

    pub fn has_cumulative(&self) -> bool {
        self.has_cumulative
    }

    pub fn quality(&self) -> &DataQuality {
        &self.quality
    }

    /// Distinct grade keys with their record counts, ascending by key.
    pub fn grade_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.records {
            *counts.entry(record.grade.clone()).or_insert(0) += 1;
        }
        counts
    }

    pub fn grades(&self) -> Vec<String> {
        self.grade_counts().into_keys().collect()
    }

    /// Records whose grade key equals `grade`. Unknown keys yield an empty view.
    pub fn select_grade(&self, grade: &str) -> Vec<&NormalizedRecord> {
        self.records.iter().filter(|r| r.grade == grade).collect()
    }

    /// `select_grade` when a grade is given, every record otherwise.
    pub fn scope(&self, grade: Option<&str>) -> Vec<&NormalizedRecord> {
        match grade {
            Some(grade) => self.select_grade(grade),
            None => self.records.iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    classifier: ReasonClassifier,
    date_mode: DateMode,
}

impl Normalizer {
    pub fn new(classifier: ReasonClassifier, date_mode: DateMode) -> Self {
        Self {
            classifier,
            date_mode,
        }
    }

    /// Resolves columns, then normalizes every row of `table`.
    ///
    /// # Errors
    ///
    /// Fails only on structural problems: a required column that cannot be
    /// located.
    #[tracing::instrument(skip_all, fields(rows = table.len()))]
    pub fn normalize(
        &self,
        table: &RawTable,
        columns: &ColumnConfig,
        locator: &dyn ColumnLocator,
    ) -> Result<Dataset> {
        let map = ColumnMap::resolve(table.headers(), columns, locator)?;
        let raws = table.project(&map);
        Ok(self.normalize_records(&raws, map.cumulative.is_some()))
    }

    pub fn normalize_records(&self, raws: &[RawRecord], has_cumulative: bool) -> Dataset {
        let mut quality = DataQuality {
            total_rows: raws.len(),
            ..DataQuality::default()
        };
        let mut records = Vec::with_capacity(raws.len());

        for (row, raw) in raws.iter().enumerate() {
            let description = raw.description.as_deref().unwrap_or_default();
            let label = match self.classifier.evaluate(description) {
                Classification::Labeled(label) => label,
                Classification::Dropped => {
                    debug!(row, description, "Row dropped: no allow-list keyword");
                    quality.dropped_unmatched += 1;
                    continue;
                }
            };

            let record = NormalizedRecord::from_raw(raw, label, self.date_mode);

            if record.date.is_none() {
                debug!(row, raw_date = ?raw.date, "Unparseable date; excluded from dated views");
                quality.invalid_dates += 1;
            }
            match record.score {
                Score::Unparseable => {
                    debug!(row, raw_score = ?raw.score, "Unparseable score; category set to other");
                    quality.unparseable_scores += 1;
                }
                Score::Value(0) => quality.zero_scores += 1,
                Score::Value(_) => {}
            }

            records.push(record);
        }

        info!(
            total = quality.total_rows,
            kept = records.len(),
            dropped = quality.dropped_unmatched,
            invalid_dates = quality.invalid_dates,
            unparseable_scores = quality.unparseable_scores,
            "Normalization complete"
        );

        Dataset::new(records, has_cumulative, quality)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::classify::OTHER_LABEL;
    use crate::columns::MarkerLocator;

    fn raw(id: &str, desc: &str, score: &str, date: &str) -> RawRecord {
        let opt = |s: &str| (!s.is_empty()).then(|| s.to_string());
        RawRecord {
            student_id: opt(id),
            description: opt(desc),
            score: opt(score),
            date: opt(date),
            cumulative: None,
            name: None,
        }
    }

    #[test]
    fn test_pad_student_id() {
        assert_eq!(pad_student_id("101"), "00101");
        assert_eq!(pad_student_id("10101"), "10101");
        assert_eq!(pad_student_id("1010123"), "1010123");
        assert_eq!(pad_student_id(""), "00000");
        for raw in ["1", "12", "123", "1234", "12345"] {
            let padded = pad_student_id(raw);
            assert_eq!(padded.len(), 5);
            assert!(padded.ends_with(raw));
        }
    }

    #[test]
    fn test_grade_class_seq_slices() {
        let row = raw("20315", "지각", "-1", "2025.03.04");
        let r = NormalizedRecord::from_raw(&row, "x".into(), DateMode::Strict);
        assert_eq!((r.grade.as_str(), r.class_no.as_str(), r.seq_no.as_str()), ("2", "03", "15"));

        // Unexpected grade characters pass through.
        let r = NormalizedRecord::from_raw(&raw("9999", "", "1", ""), "x".into(), DateMode::Strict);
        assert_eq!(r.student_id, "09999");
        assert_eq!(r.grade, "0");
    }

    #[test]
    fn test_parse_score_states() {
        assert_eq!(parse_score(Some("-3")), Score::Value(-3));
        assert_eq!(parse_score(Some("+2")), Score::Value(2));
        assert_eq!(parse_score(Some(" 4.0 ")), Score::Value(4));
        assert_eq!(parse_score(Some("0")), Score::Value(0));
        assert_eq!(parse_score(Some("1.5")), Score::Unparseable);
        assert_eq!(parse_score(Some("벌점")), Score::Unparseable);
        assert_eq!(parse_score(Some("NaN")), Score::Unparseable);
        assert_eq!(parse_score(None), Score::Unparseable);
    }

    #[test]
    fn test_zero_and_unparseable_are_both_other_but_distinct() {
        let zero = parse_score(Some("0"));
        let bad = parse_score(Some("n/a"));
        assert_eq!(Category::from_score(zero), Category::Other);
        assert_eq!(Category::from_score(bad), Category::Other);
        assert_ne!(zero, bad);
        assert_eq!(Category::from_score(Score::Value(1)), Category::Merit);
        assert_eq!(Category::from_score(Score::Value(-1)), Category::Demerit);
    }

    #[test]
    fn test_parse_date_strict_and_lenient() {
        let d = NaiveDate::from_ymd_opt(2025, 3, 4).unwrap();
        assert_eq!(parse_date(Some("2025.03.04"), DateMode::Strict), Some(d));
        assert_eq!(parse_date(Some("2025-03-04"), DateMode::Strict), None);
        assert_eq!(parse_date(Some("2025-03-04"), DateMode::Lenient), Some(d));
        assert_eq!(parse_date(Some("2025/03/04"), DateMode::Lenient), Some(d));
        assert_eq!(parse_date(Some("20250304"), DateMode::Lenient), Some(d));
        assert_eq!(parse_date(Some("2025.03.04."), DateMode::Lenient), Some(d));
        assert_eq!(parse_date(Some("2025-03-04 00:00:00"), DateMode::Lenient), Some(d));
        assert_eq!(parse_date(Some("45720"), DateMode::Lenient), Some(d));
        assert_eq!(parse_date(Some("2025.13.40"), DateMode::Lenient), None);
        assert_eq!(parse_date(Some("어제"), DateMode::Lenient), None);
        assert_eq!(parse_date(None, DateMode::Lenient), None);
    }

    #[test]
    fn test_bad_rows_survive_with_flags() {
        let normalizer = Normalizer::new(ReasonClassifier::standard(), DateMode::Strict);
        let dataset = normalizer.normalize_records(
            &[
                raw("10101", "지각", "-1", "2025.03.04"),
                raw("10102", "지각", "abc", "2025.03.04"),
                raw("10103", "지각", "0", "not a date"),
                raw("10104", "칭찬", "2", "2025.03.05"),
            ],
            false,
        );

        assert_eq!(dataset.len(), 4);
        let q = dataset.quality();
        assert_eq!(q.total_rows, 4);
        assert_eq!(q.invalid_dates, 1);
        assert_eq!(q.unparseable_scores, 1);
        assert_eq!(q.zero_scores, 1);
        assert_eq!(q.dropped_unmatched, 0);

        let records = dataset.records();
        assert_eq!(records[1].category, Category::Other);
        assert_eq!(records[1].reason_label, "등교시간 지각");
        assert_eq!(records[2].date, None);
        assert_eq!(records[3].reason_label, OTHER_LABEL);

        let period = dataset.period().unwrap();
        assert_eq!(period.start, NaiveDate::from_ymd_opt(2025, 3, 4).unwrap());
        assert_eq!(period.end, NaiveDate::from_ymd_opt(2025, 3, 5).unwrap());
    }

    #[test]
    fn test_drop_mode_removes_rows_entirely() {
        let normalizer = Normalizer::new(ReasonClassifier::allow_list_only(), DateMode::Lenient);
        let dataset = normalizer.normalize_records(
            &[
                raw("10101", "휴대폰 미제출", "-2", "2025.03.04"),
                raw("10102", "무단 외출", "-2", "2025.03.04"),
            ],
            false,
        );
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.quality().dropped_unmatched, 1);
        assert_eq!(dataset.records()[0].reason_label, "휴대폰 미제출");
    }

    #[test]
    fn test_grades_and_select_grade() {
        let normalizer = Normalizer::default();
        let dataset = normalizer.normalize_records(
            &[
                raw("30101", "지각", "-1", "2025.03.04"),
                raw("10101", "지각", "-1", "2025.03.04"),
                raw("10102", "지각", "-1", "2025.03.04"),
            ],
            false,
        );
        assert_eq!(dataset.grades(), vec!["1".to_string(), "3".to_string()]);
        assert_eq!(dataset.select_grade("1").len(), 2);
        assert!(dataset.select_grade("7").is_empty());
        assert_eq!(dataset.scope(None).len(), 3);
    }

    #[test]
    fn test_normalize_table_fails_fast_on_missing_column() {
        let table = RawTable::new(
            vec!["학번".into(), "점수".into(), "날짜".into()],
            vec![vec!["10101".into(), "-1".into(), "2025.03.04".into()]],
        )
        .unwrap();
        let result = Normalizer::default().normalize(
            &table,
            &ColumnConfig::default(),
            &MarkerLocator::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_period_absent_without_valid_dates() {
        let rows = [raw("10101", "지각", "-1", "")];
        let dataset = Normalizer::default().normalize_records(&rows, false);
        assert!(dataset.period().is_none());
    }
}
