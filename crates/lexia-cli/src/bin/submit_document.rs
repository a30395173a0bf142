use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use lexia_cli::{build_app, content_type_from_filename, init_tracing};
use lexia_core::models::RawUpload;
use lexia_core::Config;
use lexia_pipeline::IntakeOutcome;

#[derive(Parser, Debug)]
#[command(name = "submit_document")]
#[command(about = "Submit a scanned document to the intake pipeline")]
struct Args {
    /// Path to the image or PDF to ingest
    file: PathBuf,

    /// Declared content type (guessed from the extension if omitted)
    #[arg(long)]
    content_type: Option<String>,

    /// Identifier of the submitting operator
    #[arg(long, default_value = "cli")]
    submitted_by: String,

    /// Output format: json or table (default: table)
    #[arg(long, default_value = "table")]
    format: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args = Args::parse();
    let config = Config::from_env()?;
    let app = build_app(&config).await?;

    let bytes = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let filename = args
        .file
        .file_name()
        .and_then(|n| n.to_str())
        .map(String::from)
        .unwrap_or_else(|| "upload".to_string());

    let content_type = args
        .content_type
        .clone()
        .unwrap_or_else(|| content_type_from_filename(&filename).to_string());

    let upload = RawUpload::new(bytes, content_type, args.submitted_by.clone())
        .with_filename(filename);

    match app.pipeline.ingest(upload).await {
        Ok(IntakeOutcome::PendingReview(session)) => {
            if args.format == "json" {
                println!(
                    "{}",
                    serde_json::json!({
                        "status": "pending_review",
                        "upload_id": session.upload_id,
                        "fingerprint": session.fingerprint,
                        "kind": session.proposed.kind,
                        "date": session.proposed.date.to_string(),
                        "title": session.proposed.title,
                        "confidence": session.proposed.confidence,
                        "scores": session.scores,
                    })
                );
            } else {
                println!("Pending review: {}", session.upload_id);
                println!("  kind:       {}", session.proposed.kind);
                println!("  date:       {}", session.proposed.date);
                println!("  title:      {}", session.proposed.title);
                println!("  confidence: {:.2}", session.proposed.confidence);
                println!(
                    "  scores:     relevancy {} / legal {} / page {} / case {}",
                    session.scores.relevancy,
                    session.scores.legal_weight,
                    session.scores.page_severity,
                    session.scores.case_severity
                );
                println!(
                    "Resolve with: resolve_review {} --verdict accept|edit|reject",
                    session.upload_id
                );
            }
        }
        Ok(IntakeOutcome::Duplicate(existing)) => {
            if args.format == "json" {
                println!(
                    "{}",
                    serde_json::json!({
                        "status": "duplicate",
                        "record_id": existing.id,
                        "fingerprint": existing.fingerprint,
                        "created_at": existing.created_at,
                    })
                );
            } else {
                println!(
                    "Duplicate: these bytes were already ingested as record {} on {}",
                    existing.id, existing.created_at
                );
            }
        }
        Err(e) => {
            use lexia_core::ErrorMetadata;
            eprintln!("Submission failed [{}]: {}", e.error_code(), e.client_message());
            if e.is_retryable() {
                eprintln!("This error is transient; resubmit the same file later.");
            }
            std::process::exit(1);
        }
    }

    Ok(())
}
