use serde::{Deserialize, Serialize};

/// Inclusive upper bound of every score dimension.
pub const SCORE_MAX: i32 = 999;

/// Four independent integer scores in [0, 999].
///
/// Each dimension is computed independently by the scorer; no dimension
/// influences another during a single computation. Scores are a
/// deterministic function of the extraction content for a fixed rule-table
/// version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSet {
    /// How relevant the document is to the case at hand.
    pub relevancy: i32,
    /// Evidentiary/legal weight of the document class.
    pub legal_weight: i32,
    /// Fine-grained severity of what the page itself shows.
    pub page_severity: i32,
    /// Coarse severity at the case level.
    pub case_severity: i32,
}

impl ScoreSet {
    pub const ZERO: ScoreSet = ScoreSet {
        relevancy: 0,
        legal_weight: 0,
        page_severity: 0,
        case_severity: 0,
    };

    /// Build a score set, clipping every dimension into [0, SCORE_MAX].
    pub fn clipped(relevancy: i32, legal_weight: i32, page_severity: i32, case_severity: i32) -> Self {
        ScoreSet {
            relevancy: clip(relevancy),
            legal_weight: clip(legal_weight),
            page_severity: clip(page_severity),
            case_severity: clip(case_severity),
        }
    }

    pub fn is_in_range(&self) -> bool {
        [
            self.relevancy,
            self.legal_weight,
            self.page_severity,
            self.case_severity,
        ]
        .iter()
        .all(|s| (0..=SCORE_MAX).contains(s))
    }
}

fn clip(score: i32) -> i32 {
    score.clamp(0, SCORE_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clipped_bounds() {
        let scores = ScoreSet::clipped(-50, 1500, 400, SCORE_MAX);
        assert_eq!(scores.relevancy, 0);
        assert_eq!(scores.legal_weight, SCORE_MAX);
        assert_eq!(scores.page_severity, 400);
        assert_eq!(scores.case_severity, SCORE_MAX);
        assert!(scores.is_in_range());
    }

    #[test]
    fn test_zero_in_range() {
        assert!(ScoreSet::ZERO.is_in_range());
    }
}
