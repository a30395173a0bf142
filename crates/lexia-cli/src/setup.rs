//! Build the pipeline and its collaborators from environment config.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use lexia_core::{Config, UploadValidator};
use lexia_db::{DocumentRepository, ReviewRepository};
use lexia_extract::{OcrEngine, TesseractOcr, TieredExtractor, VisionConfig, VisionExtractor};
use lexia_pipeline::{CommitManager, IntakePipeline, ReviewService, RuleTable, Scorer};

/// The wired application: intake pipeline plus the confirmation surface.
pub struct App {
    pub pipeline: IntakePipeline,
    pub reviews: Arc<ReviewService>,
}

/// Initialize tracing for a binary.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

/// Wire every component from configuration. Applies the idempotent schema
/// so first runs work against a fresh database.
pub async fn build_app(config: &Config) -> Result<App> {
    let pool = lexia_db::connect(&config.database_url, config.db_max_connections)
        .await
        .context("Failed to connect to record store")?;
    lexia_db::apply_schema(&pool)
        .await
        .context("Failed to apply record store schema")?;

    let documents = Arc::new(DocumentRepository::new(pool.clone()));
    let review_repo = Arc::new(ReviewRepository::new(pool));

    let storage = lexia_storage::create_storage(config)
        .await
        .context("Failed to initialize object store")?;

    let rule_table = match config.rule_table_path {
        Some(ref path) => RuleTable::from_file(path)
            .await
            .with_context(|| format!("Failed to load rule table from {}", path))?,
        None => RuleTable::builtin(),
    };
    let scorer = Arc::new(Scorer::new(rule_table));

    let ocr: Option<Arc<dyn OcrEngine>> = if config.ocr_enabled {
        Some(Arc::new(TesseractOcr::new(
            config.tesseract_path.clone(),
            Duration::from_secs(config.ocr_timeout_secs),
        )))
    } else {
        None
    };

    let vision = match config.anthropic_api_key {
        Some(ref api_key) => {
            let mut vision_config = VisionConfig::new(api_key.clone());
            vision_config.model = config.vision_model.clone();
            vision_config.max_tokens = config.vision_max_tokens;
            vision_config.timeout = Duration::from_secs(config.vision_timeout_secs);
            Some(VisionExtractor::new(vision_config).context("Failed to build vision client")?)
        }
        None => None,
    };

    let extractor = TieredExtractor::new(ocr, vision, config.vision_max_retries);

    let validator = UploadValidator::new(
        config.max_upload_size_bytes,
        config.allowed_extensions.clone(),
        config.allowed_content_types.clone(),
    );

    let commit = CommitManager::new(
        storage.clone(),
        documents.clone(),
        config.thumbnail_max_dim,
        scorer.rule_table_version(),
    );

    let reviews = Arc::new(ReviewService::new(
        review_repo,
        scorer.clone(),
        commit.clone(),
    ));

    let pipeline = IntakePipeline::new(
        validator,
        documents,
        extractor,
        scorer,
        reviews.clone(),
        storage,
        commit,
    );

    Ok(App { pipeline, reviews })
}

/// Guess a declared content type from a filename extension.
pub fn content_type_from_filename(filename: &str) -> &'static str {
    match filename.rsplit('.').next().map(|e| e.to_lowercase()) {
        Some(ext) => match ext.as_str() {
            "jpg" | "jpeg" => "image/jpeg",
            "png" => "image/png",
            "webp" => "image/webp",
            "tif" | "tiff" => "image/tiff",
            "pdf" => "application/pdf",
            _ => "application/octet-stream",
        },
        None => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_from_filename() {
        assert_eq!(content_type_from_filename("scan.JPG"), "image/jpeg");
        assert_eq!(content_type_from_filename("filing.pdf"), "application/pdf");
        assert_eq!(
            content_type_from_filename("unknown.xyz"),
            "application/octet-stream"
        );
    }
}
