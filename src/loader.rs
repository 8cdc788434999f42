//! Loader for point-record spreadsheets, either the workbook itself or a
//! CSV export of it.

use calamine::{DataType, Reader, open_workbook_auto};
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

use crate::columns::ColumnMap;
use crate::error::{DashboardError, Result};
use crate::normalize::CANONICAL_DATE_FORMAT;

static WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// One row as read from the source table, before any coercion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    pub student_id: Option<String>,
    pub description: Option<String>,
    pub score: Option<String>,
    pub date: Option<String>,
    pub cumulative: Option<String>,
    pub name: Option<String>,
}

/// Header row plus string cells, rows padded to the header width. Rows with
/// no content at all are not kept.
#[derive(Debug, Clone)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
            return Err(DashboardError::EmptyTable("no header row".into()));
        }
        let width = headers.len();
        let total = rows.len();
        let rows: Vec<Vec<String>> = rows
            .into_iter()
            .filter(|row| !row.iter().all(|v| v.trim().is_empty()))
            .map(|mut row| {
                row.resize(width.max(row.len()), String::new());
                row
            })
            .collect();
        if rows.len() < total {
            debug!(skipped = total - rows.len(), "Blank rows skipped");
        }
        Ok(Self { headers, rows })
    }

    /// Reads a table from disk. Workbook extensions go through
    /// [`RawTable::from_workbook`]; anything else is read as CSV.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or parsed, or has no
    /// header row.
    #[tracing::instrument(skip(path), fields(path = %path.display()))]
    pub fn from_path(path: &Path) -> Result<Self> {
        let is_workbook = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| WORKBOOK_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
        if is_workbook {
            return Self::from_workbook(path);
        }
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// Reads the first worksheet of a workbook, taking its first row as
    /// the header. Date cells come out in the canonical date format.
    pub fn from_workbook(path: &Path) -> Result<Self> {
        let mut workbook = open_workbook_auto(path)?;
        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| DashboardError::EmptyTable("workbook has no worksheets".into()))?;
        let range = workbook.worksheet_range(&sheet_name).ok_or_else(|| {
            DashboardError::EmptyTable(format!("worksheet \"{sheet_name}\" is unreadable"))
        })??;

        let mut rows_iter = range.rows();
        let headers: Vec<String> = rows_iter
            .next()
            .map(|row| row.iter().map(cell_to_string).collect())
            .unwrap_or_default();
        let rows: Vec<Vec<String>> = rows_iter
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect();

        debug!(
            sheet = %sheet_name,
            columns = headers.len(),
            rows = rows.len(),
            "Worksheet loaded"
        );
        Self::new(headers, rows)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        debug!(columns = headers.len(), rows = rows.len(), "CSV table loaded");
        Self::new(headers, rows)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Extracts the logical fields of every row. Empty cells become `None`.
    pub fn project(&self, columns: &ColumnMap) -> Vec<RawRecord> {
        self.rows
            .iter()
            .map(|row| {
                let cell = |idx: usize| {
                    row.get(idx)
                        .map(|v| v.trim())
                        .filter(|v| !v.is_empty())
                        .map(str::to_string)
                };
                RawRecord {
                    student_id: cell(columns.student_id),
                    description: cell(columns.description),
                    score: cell(columns.score),
                    date: cell(columns.date),
                    cumulative: columns.cumulative.and_then(cell),
                    name: columns.name.and_then(cell),
                }
            })
            .collect()
    }
}

fn cell_to_string(cell: &DataType) -> String {
    match cell {
        DataType::Empty => String::new(),
        DataType::DateTime(_) => cell
            .as_date()
            .map(|d| d.format(CANONICAL_DATE_FORMAT).to_string())
            .unwrap_or_else(|| cell.to_string()),
        _ => cell.to_string().trim().to_string(),
    }
}
