//! Configuration module
//!
//! Environment-driven configuration for the intake pipeline: record store,
//! object store backend, extraction tiers, and upload limits.

use std::env;

use crate::storage_types::StorageBackend;

// Common constants
const MAX_CONNECTIONS: u32 = 20;
const MAX_UPLOAD_SIZE_MB: usize = 25;
const VISION_MAX_TOKENS: u32 = 2048;
const VISION_TIMEOUT_SECS: u64 = 90;
const VISION_MAX_RETRIES: u32 = 2;
const OCR_TIMEOUT_SECS: u64 = 30;
const THUMBNAIL_MAX_DIM: u32 = 320;

/// Application configuration for the intake pipeline.
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    // Object store configuration
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO etc.)
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    // Tier 2: vision extraction service
    pub anthropic_api_key: Option<String>,
    pub vision_model: String,
    pub vision_max_tokens: u32,
    pub vision_timeout_secs: u64,
    pub vision_max_retries: u32,
    // Tier 1: local OCR engine (optional)
    pub ocr_enabled: bool,
    pub tesseract_path: String,
    pub ocr_timeout_secs: u64,
    // Upload limits
    pub max_upload_size_bytes: usize,
    pub allowed_extensions: Vec<String>,
    pub allowed_content_types: Vec<String>,
    // Scoring
    pub rule_table_path: Option<String>,
    // Thumbnails
    pub thumbnail_max_dim: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let max_upload_size_mb = env::var("MAX_UPLOAD_SIZE_MB")
            .unwrap_or_else(|_| MAX_UPLOAD_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_UPLOAD_SIZE_MB);

        let allowed_extensions = env::var("ALLOWED_EXTENSIONS")
            .unwrap_or_else(|_| "jpg,jpeg,png,webp,pdf".to_string())
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .collect();

        let allowed_content_types = env::var("ALLOWED_CONTENT_TYPES")
            .unwrap_or_else(|_| {
                "image/jpeg,image/png,image/webp,application/pdf".to_string()
            })
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .collect();

        let storage_backend = env::var("STORAGE_BACKEND")
            .ok()
            .and_then(|s| s.parse::<StorageBackend>().ok())
            .unwrap_or(StorageBackend::Local);

        let config = Config {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            storage_backend,
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_region: env::var("S3_REGION").ok().or_else(|| env::var("AWS_REGION").ok()),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL").ok(),
            anthropic_api_key: env::var("ANTHROPIC_API_KEY").ok(),
            vision_model: env::var("VISION_MODEL")
                .unwrap_or_else(|_| "claude-sonnet-4-20250514".to_string()),
            vision_max_tokens: env::var("VISION_MAX_TOKENS")
                .unwrap_or_else(|_| VISION_MAX_TOKENS.to_string())
                .parse()
                .unwrap_or(VISION_MAX_TOKENS),
            vision_timeout_secs: env::var("VISION_TIMEOUT_SECS")
                .unwrap_or_else(|_| VISION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(VISION_TIMEOUT_SECS),
            vision_max_retries: env::var("VISION_MAX_RETRIES")
                .unwrap_or_else(|_| VISION_MAX_RETRIES.to_string())
                .parse()
                .unwrap_or(VISION_MAX_RETRIES),
            ocr_enabled: env::var("OCR_ENABLED")
                .unwrap_or_else(|_| "false".to_string())
                .to_lowercase()
                .parse()
                .unwrap_or(false),
            tesseract_path: env::var("TESSERACT_PATH").unwrap_or_else(|_| "tesseract".to_string()),
            ocr_timeout_secs: env::var("OCR_TIMEOUT_SECS")
                .unwrap_or_else(|_| OCR_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(OCR_TIMEOUT_SECS),
            max_upload_size_bytes: max_upload_size_mb * 1024 * 1024,
            allowed_extensions,
            allowed_content_types,
            rule_table_path: env::var("RULE_TABLE_PATH").ok(),
            thumbnail_max_dim: env::var("THUMBNAIL_MAX_DIM")
                .unwrap_or_else(|_| THUMBNAIL_MAX_DIM.to_string())
                .parse()
                .unwrap_or(THUMBNAIL_MAX_DIM),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!("S3_BUCKET must be set for the s3 backend"));
                }
                if self.s3_region.is_none() && self.s3_endpoint.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or S3_ENDPOINT must be set for the s3 backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set for the local backend"
                    ));
                }
            }
        }

        if self.anthropic_api_key.is_none() && !self.ocr_enabled {
            tracing::warn!(
                "neither ANTHROPIC_API_KEY nor OCR_ENABLED is configured; all uploads will be \
                 rejected as unextractable"
            );
        }

        if self.max_upload_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_UPLOAD_SIZE_MB must be positive"));
        }

        Ok(())
    }

    /// Whether the Tier 2 vision extractor is configured.
    pub fn vision_configured(&self) -> bool {
        self.anthropic_api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_config() -> Config {
        Config {
            database_url: "postgres://localhost/lexia".to_string(),
            db_max_connections: MAX_CONNECTIONS,
            storage_backend: StorageBackend::Local,
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            local_storage_path: Some("/tmp/lexia".to_string()),
            local_storage_base_url: Some("http://localhost:4000/files".to_string()),
            anthropic_api_key: Some("sk-test".to_string()),
            vision_model: "claude-sonnet-4-20250514".to_string(),
            vision_max_tokens: VISION_MAX_TOKENS,
            vision_timeout_secs: VISION_TIMEOUT_SECS,
            vision_max_retries: VISION_MAX_RETRIES,
            ocr_enabled: false,
            tesseract_path: "tesseract".to_string(),
            ocr_timeout_secs: OCR_TIMEOUT_SECS,
            max_upload_size_bytes: 1024,
            allowed_extensions: vec!["jpg".to_string()],
            allowed_content_types: vec!["image/jpeg".to_string()],
            rule_table_path: None,
            thumbnail_max_dim: THUMBNAIL_MAX_DIM,
        }
    }

    #[test]
    fn test_local_backend_requires_path() {
        let mut config = local_config();
        assert!(config.validate().is_ok());
        config.local_storage_path = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_s3_backend_requires_bucket() {
        let mut config = local_config();
        config.storage_backend = StorageBackend::S3;
        assert!(config.validate().is_err());
        config.s3_bucket = Some("lexia-artifacts".to_string());
        config.s3_region = Some("us-east-1".to_string());
        assert!(config.validate().is_ok());
    }
}
