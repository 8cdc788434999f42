use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::analyzers::aggregate::DEFAULT_MERGE_THRESHOLD;
use crate::analyzers::classify::{
    KeywordRule, ReasonClassifier, UnmatchedMode, default_allow_list, default_rules, self_labeled,
};
use crate::columns::{ColumnConfig, MarkerLocator};
use crate::error::{DashboardError, Result};
use crate::normalize::{DateMode, Normalizer};

/// Classifier settings. Omitted tables fall back to the built-in ones.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub mode: UnmatchedMode,
    pub rules: Option<Vec<KeywordRule>>,
    pub allow_list: Option<Vec<String>>,
}

impl ClassifierConfig {
    /// Builds the classifier. In drop mode without custom rules the
    /// allow-list keywords double as labels.
    pub fn build(&self) -> ReasonClassifier {
        let allow_list = self.allow_list.clone().unwrap_or_else(default_allow_list);
        let rules = match (&self.rules, self.mode) {
            (Some(rules), _) => rules.clone(),
            (None, UnmatchedMode::DropUnmatched) => self_labeled(&allow_list),
            (None, UnmatchedMode::LabelUnmatchedAsOther) => default_rules(),
        };
        ReasonClassifier::new(rules, allow_list, self.mode)
    }
}

/// Pipeline configuration, stored as JSON on disk:
/// ```json
/// {
///   "columns": { "description": "상벌점 내역" },
///   "classifier": { "mode": "drop-unmatched" },
///   "date_mode": "lenient",
///   "merge_threshold": 0.05
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub columns: ColumnConfig,
    pub markers: MarkerLocator,
    pub classifier: ClassifierConfig,
    pub date_mode: DateMode,
    pub merge_threshold: Option<f64>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            columns: ColumnConfig::default(),
            markers: MarkerLocator::default(),
            classifier: ClassifierConfig::default(),
            date_mode: DateMode::default(),
            merge_threshold: Some(DEFAULT_MERGE_THRESHOLD),
        }
    }
}

impl DashboardConfig {
    /// Loads and validates the config from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: DashboardConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(t) = self.merge_threshold {
            if !(0.0..=1.0).contains(&t) {
                return Err(DashboardError::Config(format!(
                    "merge_threshold must be within 0.0..=1.0, got {t}"
                )));
            }
        }
        if self.classifier.rules.as_ref().is_some_and(|r| r.is_empty()) {
            return Err(DashboardError::Config("classifier.rules must not be empty".into()));
        }
        if self.classifier.allow_list.as_ref().is_some_and(|a| a.is_empty())
            && self.classifier.mode == UnmatchedMode::DropUnmatched
        {
            return Err(DashboardError::Config(
                "classifier.allow_list must not be empty in drop-unmatched mode".into(),
            ));
        }
        Ok(())
    }

    pub fn normalizer(&self) -> Normalizer {
        Normalizer::new(self.classifier.build(), self.date_mode)
    }
}
