//! Column roles and header discovery.
//!
//! [`ColumnConfig`] names exact headers for callers that know them.
//! [`ColumnLocator`] is the fallback capability for roles left unnamed;
//! [`MarkerLocator`] implements it with ordered marker substrings.
//! [`ColumnMap::resolve`] combines the two into header positions.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::error::{DashboardError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    StudentId,
    Description,
    Score,
    Date,
    Cumulative,
    Name,
}

impl ColumnRole {
    /// Order in which roles claim columns. `Cumulative` goes first so that
    /// a "합산점수" header is taken before the generic score marker runs.
    pub const RESOLUTION_ORDER: [ColumnRole; 6] = [
        ColumnRole::Cumulative,
        ColumnRole::StudentId,
        ColumnRole::Description,
        ColumnRole::Date,
        ColumnRole::Name,
        ColumnRole::Score,
    ];

    pub fn is_required(self) -> bool {
        matches!(
            self,
            ColumnRole::StudentId | ColumnRole::Description | ColumnRole::Score | ColumnRole::Date
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ColumnRole::StudentId => "student_id",
            ColumnRole::Description => "description",
            ColumnRole::Score => "score",
            ColumnRole::Date => "date",
            ColumnRole::Cumulative => "cumulative",
            ColumnRole::Name => "name",
        }
    }
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exact header names per role. `None` means "auto-detect".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    pub student_id: Option<String>,
    pub description: Option<String>,
    pub score: Option<String>,
    pub date: Option<String>,
    pub cumulative: Option<String>,
    pub name: Option<String>,
}

impl ColumnConfig {
    pub fn get(&self, role: ColumnRole) -> Option<&str> {
        let value = match role {
            ColumnRole::StudentId => &self.student_id,
            ColumnRole::Description => &self.description,
            ColumnRole::Score => &self.score,
            ColumnRole::Date => &self.date,
            ColumnRole::Cumulative => &self.cumulative,
            ColumnRole::Name => &self.name,
        };
        value.as_deref()
    }
}

/// Finds the header position serving a role.
///
/// `claimed` holds positions already assigned to other roles; a locator
/// must not return one of them.
pub trait ColumnLocator {
    fn locate(&self, headers: &[String], role: ColumnRole, claimed: &[usize]) -> Option<usize>;

    /// Human-readable description of what was searched for, used in
    /// `MissingColumn` errors.
    fn describe(&self, role: ColumnRole) -> String;
}

/// Marker substrings per role. Overrides replace the defaults for a role
/// entirely.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerLocator {
    pub student_id: Option<Vec<String>>,
    pub description: Option<Vec<String>>,
    pub score: Option<Vec<String>>,
    pub date: Option<Vec<String>>,
    pub cumulative: Option<Vec<String>>,
    pub name: Option<Vec<String>>,
}

static DEFAULT_MARKERS: &[(ColumnRole, &[&str])] = &[
    (ColumnRole::StudentId, &["학번", "student id", "student no", "student_id"]),
    (ColumnRole::Description, &["내역", "record", "description"]),
    (ColumnRole::Score, &["점수", "score"]),
    (ColumnRole::Date, &["날짜", "일자", "date"]),
    (ColumnRole::Cumulative, &["합산점수", "누계", "cumulative", "total"]),
    (ColumnRole::Name, &["이름", "성명", "name"]),
];

impl MarkerLocator {
    pub fn markers(&self, role: ColumnRole) -> Vec<String> {
        let custom = match role {
            ColumnRole::StudentId => &self.student_id,
            ColumnRole::Description => &self.description,
            ColumnRole::Score => &self.score,
            ColumnRole::Date => &self.date,
            ColumnRole::Cumulative => &self.cumulative,
            ColumnRole::Name => &self.name,
        };
        if let Some(markers) = custom {
            return markers.clone();
        }
        DEFAULT_MARKERS
            .iter()
            .find(|(r, _)| *r == role)
            .map(|(_, markers)| markers.iter().map(|m| m.to_string()).collect())
            .unwrap_or_default()
    }
}

impl ColumnLocator for MarkerLocator {
    fn locate(&self, headers: &[String], role: ColumnRole, claimed: &[usize]) -> Option<usize> {
        let markers: Vec<String> = self
            .markers(role)
            .into_iter()
            .map(|m| m.to_lowercase())
            .collect();

        headers.iter().enumerate().find_map(|(idx, header)| {
            if claimed.contains(&idx) {
                return None;
            }
            let header = header.to_lowercase();
            markers
                .iter()
                .any(|m| header.contains(m.as_str()))
                .then_some(idx)
        })
    }

    fn describe(&self, role: ColumnRole) -> String {
        self.markers(role)
            .iter()
            .map(|m| format!("\"{m}\""))
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

/// Resolved header positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    pub student_id: usize,
    pub description: usize,
    pub score: usize,
    pub date: usize,
    pub cumulative: Option<usize>,
    pub name: Option<usize>,
}

impl ColumnMap {
    /// Resolves every role against `headers`. Explicitly named headers are
    /// claimed before any marker search runs.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::MissingColumn`] when an explicitly named
    /// header does not exist, or when a required role cannot be located,
    /// and [`DashboardError::Config`] when one header is named for two roles.
    pub fn resolve(
        headers: &[String],
        config: &ColumnConfig,
        locator: &dyn ColumnLocator,
    ) -> Result<Self> {
        let mut claimed: Vec<usize> = Vec::new();
        let mut found: Vec<(ColumnRole, Option<usize>)> = Vec::new();

        // Explicit names first, so the locator never hands their columns to
        // another role.
        for role in ColumnRole::RESOLUTION_ORDER {
            let Some(name) = config.get(role) else {
                continue;
            };
            let idx = headers.iter().position(|h| h == name).ok_or_else(|| {
                DashboardError::MissingColumn {
                    role: role.to_string(),
                    expected: format!("header \"{name}\""),
                }
            })?;
            if let Some((other, _)) = found.iter().find(|(_, p)| *p == Some(idx)) {
                return Err(DashboardError::Config(format!(
                    "header \"{name}\" is configured for both {other} and {role}"
                )));
            }
            debug!(role = %role, column = %headers[idx], idx, "Column configured");
            claimed.push(idx);
            found.push((role, Some(idx)));
        }

        for role in ColumnRole::RESOLUTION_ORDER {
            if config.get(role).is_some() {
                continue;
            }
            let position = locator.locate(headers, role, &claimed);
            match position {
                Some(idx) => {
                    debug!(role = %role, column = %headers[idx], idx, "Column resolved");
                    claimed.push(idx);
                }
                None if role.is_required() => {
                    return Err(DashboardError::MissingColumn {
                        role: role.to_string(),
                        expected: locator.describe(role),
                    });
                }
                None => debug!(role = %role, "Optional column not present"),
            }
            found.push((role, position));
        }

        let lookup = |role: ColumnRole| {
            found
                .iter()
                .find(|(r, _)| *r == role)
                .and_then(|(_, p)| *p)
        };
        let required = |role: ColumnRole| {
            lookup(role).ok_or_else(|| DashboardError::MissingColumn {
                role: role.to_string(),
                expected: locator.describe(role),
            })
        };

        Ok(ColumnMap {
            student_id: required(ColumnRole::StudentId)?,
            description: required(ColumnRole::Description)?,
            score: required(ColumnRole::Score)?,
            date: required(ColumnRole::Date)?,
            cumulative: lookup(ColumnRole::Cumulative),
            name: lookup(ColumnRole::Name),
        })
    }
}
