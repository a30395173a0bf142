//! Case/report-number detection over extracted text.
//!
//! Used for the Tier 1 cross-check (promoting numbers the vision tier
//! missed) and as keyword-class input to the scorer.

use regex::Regex;
use std::sync::LazyLock;

// Court-style docket numbers: 24-CR-01234, 2023-cv-567.
static DOCKET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b\d{2,4}-[A-Z]{1,4}-\d{3,8}\b").expect("docket pattern is valid")
});

// Labeled agency numbers: "report #240812-03", "case no. 4412".
// The number itself is capture group 1.
static LABELED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:case|report|docket|incident)\s*(?:no\.?|number|#)?\s*[:#]?\s*(\d{4,10}(?:-\d{1,4})?)\b")
        .expect("labeled-number pattern is valid")
});

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{4}-\d{2}-\d{2}|\d{1,2}/\d{1,2}/\d{4})\b").expect("date pattern is valid")
});

/// Scan text for case/report numbers, deduplicated in order of appearance.
///
/// Docket-style numbers take precedence: a labeled match whose digits are
/// part of an already-found docket number (e.g. the year prefix of
/// "Case No. 2024-CR-00123") is not reported separately.
pub fn find_case_numbers(text: &str) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();

    for m in DOCKET_RE.find_iter(text) {
        push_unique(&mut seen, m.as_str());
    }

    for caps in LABELED_RE.captures_iter(text) {
        if let Some(number) = caps.get(1) {
            let value = number.as_str();
            let part_of_docket = seen
                .iter()
                .any(|s| s.to_lowercase().contains(&value.to_lowercase()));
            if !part_of_docket {
                push_unique(&mut seen, value);
            }
        }
    }

    seen
}

fn push_unique(seen: &mut Vec<String>, value: &str) {
    let value = value.trim();
    if !seen.iter().any(|s| s.eq_ignore_ascii_case(value)) {
        seen.push(value.to_string());
    }
}

/// Find the first date-looking token in the text, if any.
pub fn find_first_date(text: &str) -> Option<&str> {
    DATE_RE.find(text).map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finds_docket_numbers() {
        let text = "State v. Alvarez, Case No. 2024-CR-00123, filed in district court.";
        let numbers = find_case_numbers(text);
        assert_eq!(numbers, vec!["2024-CR-00123"]);
    }

    #[test]
    fn test_finds_labeled_report_numbers() {
        let numbers = find_case_numbers("Incident report #240812-03 attached.");
        assert_eq!(numbers, vec!["240812-03"]);
    }

    #[test]
    fn test_dedupes_case_insensitively() {
        let text = "see 24-CV-5150 and again 24-cv-5150";
        assert_eq!(find_case_numbers(text).len(), 1);
    }

    #[test]
    fn test_year_prefix_not_reported_separately() {
        let numbers = find_case_numbers("Docket 2024-CR-00123 was consolidated.");
        assert_eq!(numbers, vec!["2024-CR-00123"]);
    }

    #[test]
    fn test_no_numbers_in_prose() {
        assert!(find_case_numbers("The witness arrived at noon.").is_empty());
    }

    #[test]
    fn test_find_first_date() {
        assert_eq!(
            find_first_date("signed on 2024-08-04 by the clerk"),
            Some("2024-08-04")
        );
        assert_eq!(find_first_date("signed 8/4/2024"), Some("8/4/2024"));
        assert_eq!(find_first_date("signed last tuesday"), None);
    }
}
