use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Upper bound on extracted titles. Longer strings are truncated, never
/// rejected.
pub const MAX_TITLE_LEN: usize = 80;

/// The fixed document-type enumeration the extraction service is asked to
/// classify into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    PoliceReport,
    CourtFiling,
    Correspondence,
    MedicalRecord,
    FinancialRecord,
    EvidencePhoto,
    Identification,
    Other,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 8] = [
        DocumentKind::PoliceReport,
        DocumentKind::CourtFiling,
        DocumentKind::Correspondence,
        DocumentKind::MedicalRecord,
        DocumentKind::FinancialRecord,
        DocumentKind::EvidencePhoto,
        DocumentKind::Identification,
        DocumentKind::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::PoliceReport => "police_report",
            DocumentKind::CourtFiling => "court_filing",
            DocumentKind::Correspondence => "correspondence",
            DocumentKind::MedicalRecord => "medical_record",
            DocumentKind::FinancialRecord => "financial_record",
            DocumentKind::EvidencePhoto => "evidence_photo",
            DocumentKind::Identification => "identification",
            DocumentKind::Other => "other",
        }
    }
}

impl Display for DocumentKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "police_report" => Ok(DocumentKind::PoliceReport),
            "court_filing" => Ok(DocumentKind::CourtFiling),
            "correspondence" => Ok(DocumentKind::Correspondence),
            "medical_record" => Ok(DocumentKind::MedicalRecord),
            "financial_record" => Ok(DocumentKind::FinancialRecord),
            "evidence_photo" => Ok(DocumentKind::EvidencePhoto),
            "identification" => Ok(DocumentKind::Identification),
            "other" => Ok(DocumentKind::Other),
            _ => Err(anyhow::anyhow!("Unknown document kind: {}", s)),
        }
    }
}

/// Calendar date of the document, or an explicit unknown marker.
///
/// A returned date string that does not parse is treated identically to an
/// explicit unknown; parsing never raises an error to the caller.
/// Serialized as an ISO date string or the literal `"unknown"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentDate {
    On(NaiveDate),
    Unknown,
}

impl Serialize for DocumentDate {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DocumentDate::On(d) => serializer.serialize_str(&d.format("%Y-%m-%d").to_string()),
            DocumentDate::Unknown => serializer.serialize_str("unknown"),
        }
    }
}

impl<'de> Deserialize<'de> for DocumentDate {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(DocumentDate::parse_lenient(&s))
    }
}

impl DocumentDate {
    /// Parse a date string from the extraction service. Accepts ISO dates
    /// and the common US forms scanners produce; anything else is Unknown.
    pub fn parse_lenient(s: &str) -> DocumentDate {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("unknown") {
            return DocumentDate::Unknown;
        }
        for format in ["%Y-%m-%d", "%m/%d/%Y", "%m-%d-%Y", "%B %d, %Y", "%d %B %Y"] {
            if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
                return DocumentDate::On(date);
            }
        }
        DocumentDate::Unknown
    }

    pub fn is_known(&self) -> bool {
        matches!(self, DocumentDate::On(_))
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            DocumentDate::On(d) => Some(*d),
            DocumentDate::Unknown => None,
        }
    }
}

impl Display for DocumentDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            DocumentDate::On(d) => write!(f, "{}", d),
            DocumentDate::Unknown => f.write_str("unknown"),
        }
    }
}

/// Classes of named-entity mentions the extractor reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Person,
    Organization,
    CaseNumber,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedEntity {
    pub kind: EntityKind,
    pub value: String,
}

impl NamedEntity {
    pub fn new(kind: EntityKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

/// Which extraction tier produced an accepted result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionTier {
    /// Local OCR first pass: raw text only, no structured fields.
    Tier1Ocr,
    /// Authoritative vision-model extraction.
    Tier2Vision,
}

impl Display for ExtractionTier {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ExtractionTier::Tier1Ocr => f.write_str("tier1_ocr"),
            ExtractionTier::Tier2Vision => f.write_str("tier2_vision"),
        }
    }
}

impl FromStr for ExtractionTier {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tier1_ocr" => Ok(ExtractionTier::Tier1Ocr),
            "tier2_vision" => Ok(ExtractionTier::Tier2Vision),
            _ => Err(anyhow::anyhow!("Unknown extraction tier: {}", s)),
        }
    }
}

/// Candidate structured output from the tiered extractor.
///
/// Owned exclusively by the pipeline invocation that produced it; never
/// shared across uploads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub kind: DocumentKind,
    pub date: DocumentDate,
    pub title: String,
    pub summary: String,
    /// Full extracted text (OCR or vision transcription).
    pub text: String,
    pub entities: Vec<NamedEntity>,
    /// Self-reported confidence in [0,1]. Forced to 0 on the Tier 1
    /// fallback path.
    pub confidence: f32,
    pub tier: ExtractionTier,
}

impl ExtractionResult {
    /// A Tier 1 fallback result: raw text only, everything structured left
    /// for mandatory operator entry.
    pub fn from_ocr_text(text: impl Into<String>) -> Self {
        ExtractionResult {
            kind: DocumentKind::Other,
            date: DocumentDate::Unknown,
            title: String::new(),
            summary: String::new(),
            text: text.into(),
            entities: Vec::new(),
            confidence: 0.0,
            tier: ExtractionTier::Tier1Ocr,
        }
    }

    /// Truncate the title to `MAX_TITLE_LEN` characters, on a char boundary.
    pub fn set_title(&mut self, title: impl Into<String>) {
        let title = title.into();
        self.title = truncate_title(&title);
    }

    /// Clamp the confidence into [0,1].
    pub fn set_confidence(&mut self, confidence: f32) {
        self.confidence = confidence.clamp(0.0, 1.0);
    }

    pub fn case_numbers(&self) -> impl Iterator<Item = &str> {
        self.entities
            .iter()
            .filter(|e| e.kind == EntityKind::CaseNumber)
            .map(|e| e.value.as_str())
    }

    /// Whether the structured fields require operator entry before the
    /// proposal may be accepted.
    pub fn needs_manual_fields(&self) -> bool {
        self.confidence == 0.0
    }
}

/// Truncate to `MAX_TITLE_LEN` characters without splitting a char.
pub fn truncate_title(title: &str) -> String {
    title.chars().take(MAX_TITLE_LEN).collect()
}
