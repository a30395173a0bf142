//! Tier 2: vision-model extraction via Anthropic's Messages API.
//!
//! One request carries the image bytes and a fixed field specification;
//! the response is parsed into an [`ExtractionResult`]. The service is a
//! black box: anything it returns that violates the field contract is
//! degraded locally (unknown date, truncated title) rather than bounced
//! back to the caller.

use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use lexia_core::models::{
    DocumentDate, DocumentKind, EntityKind, ExtractionResult, ExtractionTier, NamedEntity,
};

use crate::error::ExtractError;
use crate::mime::detect_media_type;

const API_BASE: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";

/// Vision extractor configuration
#[derive(Debug, Clone)]
pub struct VisionConfig {
    /// Anthropic API key
    pub api_key: String,
    /// Model to use
    pub model: String,
    /// Maximum tokens for the response
    pub max_tokens: u32,
    /// Per-call timeout
    pub timeout: Duration,
    /// Override the API base URL (tests, proxies)
    pub base_url: Option<String>,
}

impl VisionConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 2048,
            timeout: Duration::from_secs(90),
            base_url: None,
        }
    }
}

// Messages API request/response structures
#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<MessageParam>,
}

#[derive(Debug, Serialize)]
struct MessageParam {
    role: String,
    content: Vec<ContentBlock>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    Image { source: ImageSource },
}

#[derive(Debug, Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    source_type: String,
    media_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlockResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlockResponse {
    Text { text: String },
}

/// The structured fields the model is instructed to return.
#[derive(Debug, Deserialize)]
struct VisionFields {
    document_type: String,
    #[serde(default)]
    date: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    full_text: String,
    #[serde(default)]
    people: Vec<String>,
    #[serde(default)]
    organizations: Vec<String>,
    #[serde(default)]
    case_numbers: Vec<String>,
    #[serde(default)]
    confidence: f32,
}

/// Tier 2 extraction client.
pub struct VisionExtractor {
    http_client: reqwest::Client,
    config: VisionConfig,
}

impl VisionExtractor {
    pub fn new(config: VisionConfig) -> Result<Self, ExtractError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                ExtractError::Transport(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            http_client,
            config,
        })
    }

    /// The fixed field-specification prompt sent with every document image.
    fn extraction_prompt() -> String {
        let kinds = DocumentKind::ALL
            .iter()
            .map(|k| k.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "You are analyzing a scanned or photographed legal document. \
             Respond with a single JSON object containing exactly these fields:\n\
             - document_type: one of [{}]\n\
             - date: the document's date as YYYY-MM-DD, or \"unknown\" if not determinable\n\
             - title: a short title for the document, at most 80 characters\n\
             - summary: a 2-3 sentence summary of the document's content\n\
             - full_text: the complete text visible in the document (OCR transcription)\n\
             - people: array of person names mentioned\n\
             - organizations: array of organizations, agencies, or courts mentioned\n\
             - case_numbers: array of case, docket, or report numbers mentioned\n\
             - confidence: your confidence in this analysis as a number between 0 and 1\n\n\
             Respond with valid JSON only.",
            kinds
        )
    }

    fn base_url(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or(API_BASE)
    }

    /// Call the Messages API with the image and parse the response text.
    async fn analyze_image(&self, image_data: &[u8]) -> Result<String, ExtractError> {
        let base64_image = base64::engine::general_purpose::STANDARD.encode(image_data);
        let media_type = detect_media_type(image_data);

        let body = MessagesRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            messages: vec![MessageParam {
                role: "user".to_string(),
                content: vec![
                    ContentBlock::Image {
                        source: ImageSource {
                            source_type: "base64".to_string(),
                            media_type: media_type.to_string(),
                            data: base64_image,
                        },
                    },
                    ContentBlock::Text {
                        text: Self::extraction_prompt(),
                    },
                ],
            }],
        };

        let response = self
            .http_client
            .post(format!("{}/messages", self.base_url()))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ExtractError::Timeout(self.config.timeout)
                } else {
                    ExtractError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unreadable error body".to_string());
            return Err(ExtractError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ExtractError::Malformed(format!("response envelope: {}", e)))?;

        parsed
            .content
            .into_iter()
            .map(|b| match b {
                ContentBlockResponse::Text { text } => text,
            })
            .next()
            .ok_or_else(|| ExtractError::Malformed("response carried no text block".to_string()))
    }

    /// Parse the model's JSON, stripping markdown code fences if present.
    fn parse_fields(text: &str) -> Result<VisionFields, ExtractError> {
        let json_text = if text.contains("```json") {
            text.split("```json")
                .nth(1)
                .and_then(|s| s.split("```").next())
                .unwrap_or(text)
                .trim()
        } else if text.contains("```") {
            text.split("```")
                .nth(1)
                .and_then(|s| s.split("```").next())
                .unwrap_or(text)
                .trim()
        } else {
            text.trim()
        };

        serde_json::from_str(json_text)
            .map_err(|e| ExtractError::Malformed(format!("field payload: {}", e)))
    }

    fn fields_to_result(fields: VisionFields) -> ExtractionResult {
        let kind = fields
            .document_type
            .parse::<DocumentKind>()
            .unwrap_or(DocumentKind::Other);

        let mut entities: Vec<NamedEntity> = Vec::new();
        entities.extend(
            fields
                .people
                .into_iter()
                .map(|v| NamedEntity::new(EntityKind::Person, v)),
        );
        entities.extend(
            fields
                .organizations
                .into_iter()
                .map(|v| NamedEntity::new(EntityKind::Organization, v)),
        );
        entities.extend(
            fields
                .case_numbers
                .into_iter()
                .map(|v| NamedEntity::new(EntityKind::CaseNumber, v)),
        );

        let mut result = ExtractionResult {
            kind,
            date: DocumentDate::parse_lenient(&fields.date),
            title: String::new(),
            summary: fields.summary,
            text: fields.full_text,
            entities,
            confidence: 0.0,
            tier: ExtractionTier::Tier2Vision,
        };
        result.set_title(fields.title);
        result.set_confidence(fields.confidence);
        result
    }

    /// Run the authoritative extraction over the raw image bytes.
    pub async fn extract(&self, image_data: &[u8]) -> Result<ExtractionResult, ExtractError> {
        let start = std::time::Instant::now();

        let text = self.analyze_image(image_data).await?;
        let fields = Self::parse_fields(&text)?;
        let result = Self::fields_to_result(fields);

        tracing::info!(
            model = %self.config.model,
            kind = %result.kind,
            confidence = result.confidence,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Vision extraction complete"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor_for(server: &mockito::ServerGuard) -> VisionExtractor {
        let mut config = VisionConfig::new("sk-test-key");
        config.base_url = Some(server.url());
        config.timeout = Duration::from_secs(5);
        VisionExtractor::new(config).unwrap()
    }

    fn envelope(inner: &str) -> String {
        serde_json::json!({
            "content": [{ "type": "text", "text": inner }]
        })
        .to_string()
    }

    const FIELDS_JSON: &str = r#"{
        "document_type": "police_report",
        "date": "2024-08-04",
        "title": "Incident Report - 4th Ave Collision",
        "summary": "Two-vehicle collision report. Officer noted minor injuries.",
        "full_text": "INCIDENT REPORT 2024-CR-00123 ...",
        "people": ["J. Alvarez"],
        "organizations": ["Metro Police Department"],
        "case_numbers": ["2024-CR-00123"],
        "confidence": 0.95
    }"#;

    #[tokio::test]
    async fn test_extract_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/messages")
            .match_header("x-api-key", "sk-test-key")
            .with_status(200)
            .with_body(envelope(FIELDS_JSON))
            .create_async()
            .await;

        let result = extractor_for(&server)
            .extract(&[0xFF, 0xD8, 0xFF, 0xE0])
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(result.kind, DocumentKind::PoliceReport);
        assert!(result.date.is_known());
        assert_eq!(result.confidence, 0.95);
        assert_eq!(result.tier, ExtractionTier::Tier2Vision);
        assert_eq!(result.case_numbers().count(), 1);
    }

    #[tokio::test]
    async fn test_extract_markdown_fenced_json() {
        let fenced = format!("Here is the analysis:\n```json\n{}\n```", FIELDS_JSON);
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/messages")
            .with_status(200)
            .with_body(envelope(&fenced))
            .create_async()
            .await;

        let result = extractor_for(&server)
            .extract(&[0xFF, 0xD8, 0xFF, 0xE0])
            .await
            .unwrap();
        assert_eq!(result.kind, DocumentKind::PoliceReport);
    }

    #[tokio::test]
    async fn test_unknown_document_type_degrades_to_other() {
        let json = r#"{"document_type": "sticky_note", "confidence": 0.5}"#;
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/messages")
            .with_status(200)
            .with_body(envelope(json))
            .create_async()
            .await;

        let result = extractor_for(&server)
            .extract(&[0xFF, 0xD8, 0xFF, 0xE0])
            .await
            .unwrap();
        assert_eq!(result.kind, DocumentKind::Other);
        assert_eq!(result.date, DocumentDate::Unknown);
    }

    #[tokio::test]
    async fn test_unparseable_date_becomes_unknown() {
        let json = r#"{"document_type": "court_filing", "date": "last spring", "confidence": 0.8}"#;
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/messages")
            .with_status(200)
            .with_body(envelope(json))
            .create_async()
            .await;

        let result = extractor_for(&server)
            .extract(&[0xFF, 0xD8, 0xFF, 0xE0])
            .await
            .unwrap();
        assert_eq!(result.date, DocumentDate::Unknown);
    }

    #[tokio::test]
    async fn test_over_long_title_truncated() {
        let json = format!(
            r#"{{"document_type": "other", "title": "{}", "confidence": 0.5}}"#,
            "T".repeat(300)
        );
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/messages")
            .with_status(200)
            .with_body(envelope(&json))
            .create_async()
            .await;

        let result = extractor_for(&server)
            .extract(&[0xFF, 0xD8, 0xFF, 0xE0])
            .await
            .unwrap();
        assert_eq!(result.title.len(), 80);
    }

    #[tokio::test]
    async fn test_server_error_is_api_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/messages")
            .with_status(529)
            .with_body("overloaded")
            .create_async()
            .await;

        let err = extractor_for(&server)
            .extract(&[0xFF, 0xD8, 0xFF, 0xE0])
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Api { status: 529, .. }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_non_json_payload_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/messages")
            .with_status(200)
            .with_body(envelope("I could not read this document."))
            .create_async()
            .await;

        let err = extractor_for(&server)
            .extract(&[0xFF, 0xD8, 0xFF, 0xE0])
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Malformed(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_prompt_names_every_field() {
        let prompt = VisionExtractor::extraction_prompt();
        for field in [
            "document_type",
            "date",
            "title",
            "summary",
            "full_text",
            "people",
            "organizations",
            "case_numbers",
            "confidence",
        ] {
            assert!(prompt.contains(field), "prompt missing {}", field);
        }
        assert!(prompt.contains("police_report"));
        assert!(prompt.contains("80 characters"));
    }
}
