//! Multi-dimensional document scoring.
//!
//! The scorer is a pure function of an extraction result and a versioned
//! rule table. The table is data, not logic: it is deserialized from JSON
//! and injected, so scoring rules can evolve and be tested without
//! touching the pipeline. Each of the four dimensions is computed
//! independently and clipped into [0, 999].

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use lexia_core::models::{DocumentKind, EntityKind, ExtractionResult, ScoreSet};
use lexia_core::AppError;

/// The built-in rule table shipped with the crate.
const DEFAULT_RULES: &str = include_str!("../rules/default.json");

/// Per-dimension score contributions.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
pub struct Deltas {
    #[serde(default)]
    pub relevancy: i32,
    #[serde(default)]
    pub legal_weight: i32,
    #[serde(default)]
    pub page_severity: i32,
    #[serde(default)]
    pub case_severity: i32,
}

/// A keyword class: a set of phrase patterns and the contribution applied
/// when any of them appears in the document text.
#[derive(Debug, Clone, Deserialize)]
pub struct KeywordRule {
    pub class: String,
    pub patterns: Vec<String>,
    pub adds: Deltas,
}

/// Versioned scoring rules, loaded as data.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleTable {
    pub version: String,
    kinds: HashMap<DocumentKind, Deltas>,
    keywords: Vec<KeywordRule>,
    entities: HashMap<EntityKind, Deltas>,
    /// Applied once when the document carries a concrete date.
    dated: Deltas,
}

impl RuleTable {
    /// The rule table compiled into the binary.
    pub fn builtin() -> RuleTable {
        // The companion test parses the same asset; a failure here cannot
        // reach a release build.
        serde_json::from_str(DEFAULT_RULES).expect("builtin rule table is valid JSON")
    }

    pub fn from_json(json: &str) -> Result<RuleTable, AppError> {
        let table: RuleTable = serde_json::from_str(json)?;
        Ok(table)
    }

    pub async fn from_file(path: impl AsRef<Path>) -> Result<RuleTable, AppError> {
        let json = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::from_json(&json)
    }
}

/// Pure scorer over an injected rule table.
pub struct Scorer {
    table: RuleTable,
}

impl Scorer {
    pub fn new(table: RuleTable) -> Self {
        Self { table }
    }

    /// Version of the rule table behind this scorer; stored in record
    /// provenance so re-scoring under a different table is detectable.
    pub fn rule_table_version(&self) -> &str {
        &self.table.version
    }

    /// Compute the four scores. Deterministic: identical extraction
    /// content under the same rule-table version yields an identical
    /// `ScoreSet`.
    pub fn score(&self, extraction: &ExtractionResult) -> ScoreSet {
        let mut relevancy = 0i32;
        let mut legal_weight = 0i32;
        let mut page_severity = 0i32;
        let mut case_severity = 0i32;

        let mut apply = |d: &Deltas, times: i32| {
            relevancy += d.relevancy * times;
            legal_weight += d.legal_weight * times;
            page_severity += d.page_severity * times;
            case_severity += d.case_severity * times;
        };

        if let Some(base) = self.table.kinds.get(&extraction.kind) {
            apply(base, 1);
        }

        let haystack = format!(
            "{} {} {}",
            extraction.title, extraction.summary, extraction.text
        )
        .to_lowercase();

        for rule in &self.table.keywords {
            let hit = rule
                .patterns
                .iter()
                .any(|p| haystack.contains(&p.to_lowercase()));
            if hit {
                apply(&rule.adds, 1);
            }
        }

        for entity in &extraction.entities {
            if let Some(d) = self.table.entities.get(&entity.kind) {
                apply(d, 1);
            }
        }

        if extraction.date.is_known() {
            apply(&self.table.dated, 1);
        }

        ScoreSet::clipped(relevancy, legal_weight, page_severity, case_severity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexia_core::models::{
        DocumentDate, ExtractionTier, NamedEntity, SCORE_MAX,
    };

    fn extraction(kind: DocumentKind, text: &str) -> ExtractionResult {
        ExtractionResult {
            kind,
            date: DocumentDate::Unknown,
            title: String::new(),
            summary: String::new(),
            text: text.to_string(),
            entities: Vec::new(),
            confidence: 0.9,
            tier: ExtractionTier::Tier2Vision,
        }
    }

    fn scorer() -> Scorer {
        Scorer::new(RuleTable::builtin())
    }

    #[test]
    fn test_builtin_table_parses() {
        let table = RuleTable::builtin();
        assert!(!table.version.is_empty());
        assert_eq!(table.kinds.len(), DocumentKind::ALL.len());
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let s = scorer();
        let e = extraction(DocumentKind::PoliceReport, "assault with a weapon");
        assert_eq!(s.score(&e), s.score(&e));
    }

    #[test]
    fn test_scores_always_in_range() {
        let s = scorer();
        let mut e = extraction(
            DocumentKind::PoliceReport,
            "assault weapon restraining order custody emergency eviction",
        );
        e.date = DocumentDate::parse_lenient("2024-08-04");
        for _ in 0..200 {
            e.entities
                .push(NamedEntity::new(EntityKind::CaseNumber, "24-CR-1"));
        }
        let scores = s.score(&e);
        assert!(scores.is_in_range());
        assert_eq!(scores.legal_weight, SCORE_MAX);
    }

    #[test]
    fn test_kind_base_differs() {
        let s = scorer();
        let report = s.score(&extraction(DocumentKind::PoliceReport, "routine text"));
        let other = s.score(&extraction(DocumentKind::Other, "routine text"));
        assert!(report.relevancy > other.relevancy);
        assert!(report.legal_weight > other.legal_weight);
    }

    #[test]
    fn test_keywords_are_monotonic() {
        let s = scorer();
        let plain = s.score(&extraction(DocumentKind::Correspondence, "see you tuesday"));
        let severe = s.score(&extraction(
            DocumentKind::Correspondence,
            "see you tuesday unless the restraining order says otherwise",
        ));
        assert!(severe.relevancy >= plain.relevancy);
        assert!(severe.legal_weight >= plain.legal_weight);
        assert!(severe.page_severity >= plain.page_severity);
        assert!(severe.case_severity >= plain.case_severity);
    }

    #[test]
    fn test_keyword_match_is_case_insensitive() {
        let s = scorer();
        let lower = s.score(&extraction(DocumentKind::Other, "emergency hearing"));
        let upper = s.score(&extraction(DocumentKind::Other, "EMERGENCY HEARING"));
        assert_eq!(lower, upper);
    }

    #[test]
    fn test_dated_bonus_is_the_only_date_contribution() {
        let s = scorer();
        let undated = extraction(DocumentKind::CourtFiling, "motion to dismiss");
        let mut dated = undated.clone();
        dated.date = DocumentDate::parse_lenient("2024-08-04");

        let a = s.score(&undated);
        let b = s.score(&dated);
        // Changing only the date moves each dimension by exactly the
        // dated contribution (no clipping in play at these magnitudes).
        assert_eq!(b.relevancy - a.relevancy, 25);
        assert_eq!(b.legal_weight - a.legal_weight, 40);
        assert_eq!(b.page_severity - a.page_severity, 0);
        assert_eq!(b.case_severity - a.case_severity, 15);
    }

    #[test]
    fn test_entity_contributions_accumulate() {
        let s = scorer();
        let mut e = extraction(DocumentKind::Other, "plain");
        let base = s.score(&e);
        e.entities
            .push(NamedEntity::new(EntityKind::CaseNumber, "24-CR-00123"));
        let with_case = s.score(&e);
        assert!(with_case.legal_weight > base.legal_weight);
    }

    #[test]
    fn test_custom_table_version_is_reported() {
        let json = r#"{
            "version": "test.1",
            "kinds": {},
            "keywords": [],
            "entities": {},
            "dated": {}
        }"#;
        let s = Scorer::new(RuleTable::from_json(json).unwrap());
        assert_eq!(s.rule_table_version(), "test.1");
        let scores = s.score(&extraction(DocumentKind::Other, "anything"));
        assert_eq!(scores, ScoreSet::ZERO);
    }
}
