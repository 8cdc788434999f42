//! Reason classification by ordered keyword matching.
//!
//! A description resolves to the label of the first rule (in table order)
//! whose keyword occurs in it. Matching is case-sensitive, as authored.
//! Table position decides ties, not position in the text.

use serde::{Deserialize, Serialize};

/// Label used when no rule matches, and for the long-tail merge bucket.
pub const OTHER_LABEL: &str = "기타";

/// Ordered `(keyword, label)` rules for the standard reason summary.
static REASON_RULES: &[(&str, &str)] = &[
    ("지각", "등교시간 지각"),
    ("등교시간", "등교시간 지각"),
    ("교복 전체", "교복 전체 미착용"),
    ("교복 일부", "교복 일부를 갖추어 입지 않은 경우"),
    ("슬리퍼", "슬리퍼 등하교"),
    ("후문하차", "후문하차"),
    ("급식", "급식 관련 기초 질서 위반"),
    ("태도", "수업태도가 불량한 경우"),
    ("공공질서", "공공질서를 위반"),
    ("PM", "PM 등하교"),
    ("파손", "공공기물 훼손"),
    ("불응", "정당한 지도 불응"),
    ("예의", "예의 부족한 언행"),
    ("명의도용", "명의도용"),
    ("출입금지", "출입금지 구역 출입"),
    ("휴대폰", "수업 중 휴대폰 사용"),
    ("자전거", "자전거 타고 등교"),
    ("디텐션불참", "디텐션불참"),
    ("반성문", "디텐션반성문 미제출"),
];

/// Recognised record descriptions. In allow-list mode each keyword is
/// also its own label.
static VALID_KEYWORDS: &[&str] = &[
    "교복 전체 미착용",
    "교복 일부를 갖추어 입지 않은 경우",
    "슬리퍼 등하교",
    "후문하차",
    "급식 관련 기초 질서를 지키지 않은 경우",
    "등교시간(07시50분) 지각",
    "수업태도가 불량한 경우",
    "공공질서를 위반하는 경우",
    "PM(개인이동형장치) 등하교",
    "교내에서 비품 및 공공기물 훼손(파손)",
    "교사의 정당한 지도에 불응",
    "교사에 예의를 갖추지 않은 언행",
    "명의도용",
    "교내외 학생 출입금지 구역 출입",
    "휴대폰 미제출",
    "자전거 하차 후 끌고 들어가지 않고 타고 가는 경우",
    "디텐션불참",
    "디텐션반성문미제출",
    "학교의 명예",
    "학습태도",
    "교육활동 도우미",
    "귀중품을 습득",
    "과벌점 사회봉사",
    "과벌점 교내봉사",
    "디텐션반성문제출",
    "디텐션1번 참여",
    "디텐션2번 참여",
    "디텐션3번 참여",
];

/// What happens to a description no rule matches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnmatchedMode {
    /// Keep the row and label it [`OTHER_LABEL`].
    #[default]
    LabelUnmatchedAsOther,
    /// Drop rows matching no allow-list keyword from every view.
    DropUnmatched,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub keyword: String,
    pub label: String,
}

/// Outcome of classifying one description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Labeled(String),
    /// Only produced in [`UnmatchedMode::DropUnmatched`].
    Dropped,
}

#[derive(Debug, Clone)]
pub struct ReasonClassifier {
    rules: Vec<KeywordRule>,
    allow_list: Vec<String>,
    mode: UnmatchedMode,
}

impl Default for ReasonClassifier {
    fn default() -> Self {
        Self::standard()
    }
}

impl ReasonClassifier {
    pub fn new(rules: Vec<KeywordRule>, allow_list: Vec<String>, mode: UnmatchedMode) -> Self {
        Self {
            rules,
            allow_list,
            mode,
        }
    }

    /// Standard summary table; unmatched rows are labeled [`OTHER_LABEL`].
    pub fn standard() -> Self {
        Self::new(default_rules(), default_allow_list(), UnmatchedMode::LabelUnmatchedAsOther)
    }

    /// Allow-list mode: rows must contain a recognised description and are
    /// labeled with the keyword they matched. Everything else is dropped.
    pub fn allow_list_only() -> Self {
        let allow_list = default_allow_list();
        Self::new(self_labeled(&allow_list), allow_list, UnmatchedMode::DropUnmatched)
    }

    pub fn mode(&self) -> UnmatchedMode {
        self.mode
    }

    /// First-match-wins label lookup; falls back to [`OTHER_LABEL`].
    pub fn classify(&self, description: &str) -> String {
        self.rules
            .iter()
            .find(|rule| description.contains(rule.keyword.as_str()))
            .map(|rule| rule.label.clone())
            .unwrap_or_else(|| OTHER_LABEL.to_string())
    }

    /// Whether a description passes the allow-list filter.
    pub fn is_allowed(&self, description: &str) -> bool {
        self.allow_list
            .iter()
            .any(|k| description.contains(k.as_str()))
    }

    /// Applies the configured mode: filter (when dropping), then label.
    pub fn evaluate(&self, description: &str) -> Classification {
        match self.mode {
            UnmatchedMode::DropUnmatched if !self.is_allowed(description) => {
                Classification::Dropped
            }
            _ => Classification::Labeled(self.classify(description)),
        }
    }
}

pub fn default_rules() -> Vec<KeywordRule> {
    REASON_RULES
        .iter()
        .map(|(keyword, label)| KeywordRule {
            keyword: keyword.to_string(),
            label: label.to_string(),
        })
        .collect()
}

/// Rules that label each keyword with itself.
pub fn self_labeled(keywords: &[String]) -> Vec<KeywordRule> {
    keywords
        .iter()
        .map(|k| KeywordRule {
            keyword: k.clone(),
            label: k.clone(),
        })
        .collect()
}

pub fn default_allow_list() -> Vec<String> {
    VALID_KEYWORDS.iter().map(|k| k.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_rule_in_table_wins_over_text_order() {
        let c = ReasonClassifier::standard();
        // "슬리퍼" (table position 5) appears after "태도" (position 8) in
        // the text, but the table decides.
        assert_eq!(c.classify("수업태도 불량 및 슬리퍼 착용"), "슬리퍼 등하교");
        // "지각" precedes "등교시간" in the table; same label either way.
        assert_eq!(c.classify("등교시간(07시50분) 지각"), "등교시간 지각");
    }

    #[test]
    fn test_earlier_detention_rule_wins() {
        let c = ReasonClassifier::standard();
        // "디텐션불참" is checked before "반성문".
        assert_eq!(c.classify("디텐션불참 (반성문 포함)"), "디텐션불참");
        assert_eq!(c.classify("디텐션반성문미제출"), "디텐션반성문 미제출");
    }

    #[test]
    fn test_unmatched_falls_back_to_other() {
        let c = ReasonClassifier::standard();
        assert_eq!(c.classify("봉사활동 우수"), OTHER_LABEL);
        assert_eq!(c.classify(""), OTHER_LABEL);
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let c = ReasonClassifier::standard();
        assert_eq!(c.classify("PM 등교"), "PM 등하교");
        assert_eq!(c.classify("pm 등교"), OTHER_LABEL);
    }

    #[test]
    fn test_label_mode_never_drops() {
        let c = ReasonClassifier::standard();
        assert_eq!(
            c.evaluate("알 수 없는 사유"),
            Classification::Labeled(OTHER_LABEL.to_string())
        );
    }

    #[test]
    fn test_drop_mode_filters_then_labels_with_keyword() {
        let c = ReasonClassifier::allow_list_only();
        assert_eq!(c.mode(), UnmatchedMode::DropUnmatched);
        assert_eq!(c.evaluate("알 수 없는 사유"), Classification::Dropped);
        assert_eq!(
            c.evaluate("[벌점] 휴대폰 미제출 (2교시)"),
            Classification::Labeled("휴대폰 미제출".to_string())
        );
    }

    #[test]
    fn test_drop_mode_with_custom_rules_can_still_fall_back() {
        let c = ReasonClassifier::new(
            vec![KeywordRule {
                keyword: "지각".into(),
                label: "지각".into(),
            }],
            vec!["명의도용".into(), "지각".into()],
            UnmatchedMode::DropUnmatched,
        );
        assert_eq!(
            c.evaluate("명의도용"),
            Classification::Labeled(OTHER_LABEL.to_string())
        );
        assert_eq!(c.evaluate("무단결석"), Classification::Dropped);
    }

    #[test]
    fn test_mode_serde_names() {
        let mode: UnmatchedMode = serde_json::from_str("\"drop-unmatched\"").unwrap();
        assert_eq!(mode, UnmatchedMode::DropUnmatched);
        let mode: UnmatchedMode = serde_json::from_str("\"label-unmatched-as-other\"").unwrap();
        assert_eq!(mode, UnmatchedMode::LabelUnmatchedAsOther);
    }
}
