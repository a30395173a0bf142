use anyhow::Result;
use clap::Parser;
use uuid::Uuid;

use lexia_cli::{build_app, init_tracing};
use lexia_core::models::{DocumentDate, DocumentKind, FieldOverrides, Verdict};
use lexia_core::Config;
use lexia_pipeline::ReviewOutcome;

#[derive(Parser, Debug)]
#[command(name = "resolve_review")]
#[command(about = "List pending reviews or apply a verdict to one")]
struct Args {
    /// Upload id of the session to resolve (omit with --list)
    upload_id: Option<Uuid>,

    /// Verdict: accept, edit, or reject
    #[arg(long)]
    verdict: Option<String>,

    /// List sessions awaiting a verdict
    #[arg(long)]
    list: bool,

    /// Override the document type (with --verdict edit)
    #[arg(long)]
    kind: Option<String>,

    /// Override the document date, YYYY-MM-DD or "unknown" (with --verdict edit)
    #[arg(long)]
    date: Option<String>,

    /// Override the title (with --verdict edit)
    #[arg(long)]
    title: Option<String>,

    /// Override the summary (with --verdict edit)
    #[arg(long)]
    summary: Option<String>,

    /// Limit for --list (default: 20)
    #[arg(long, default_value = "20")]
    limit: i64,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args = Args::parse();
    let config = Config::from_env()?;
    let app = build_app(&config).await?;

    if args.list {
        let pending = app.reviews.pending(args.limit).await?;
        if pending.is_empty() {
            println!("No sessions awaiting review.");
            return Ok(());
        }
        for session in pending {
            println!(
                "{}  {}  {}  conf {:.2}  \"{}\"",
                session.upload_id,
                session.created_at.format("%Y-%m-%d %H:%M"),
                session.proposed.kind,
                session.proposed.confidence,
                session.proposed.title
            );
        }
        return Ok(());
    }

    let upload_id = args
        .upload_id
        .ok_or_else(|| anyhow::anyhow!("an upload id is required unless --list is given"))?;
    let verdict: Verdict = args
        .verdict
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("--verdict accept|edit|reject is required"))?
        .parse()
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    let overrides = FieldOverrides {
        kind: args
            .kind
            .as_deref()
            .map(|s| s.parse::<DocumentKind>())
            .transpose()
            .map_err(|e| anyhow::anyhow!("invalid --kind: {}", e))?,
        date: args.date.as_deref().map(DocumentDate::parse_lenient),
        title: args.title.clone(),
        summary: args.summary.clone(),
    };
    let overrides = if overrides.is_empty() {
        None
    } else {
        Some(overrides)
    };

    match app.reviews.resolve(upload_id, verdict, overrides).await {
        Ok(ReviewOutcome::Accepted(record)) => {
            println!("Accepted: record {} committed", record.id);
            println!("  original:  {}", record.original_url());
            if let Some(thumb) = record.thumbnail_url() {
                println!("  thumbnail: {}", thumb);
            }
        }
        Ok(ReviewOutcome::Rejected) => {
            println!("Rejected: proposal released, nothing committed.");
        }
        Ok(ReviewOutcome::PendingReview(session)) => {
            println!("Edit applied and re-scored; session re-entered review.");
            println!(
                "  kind {} / date {} / title \"{}\"",
                session.proposed.kind, session.proposed.date, session.proposed.title
            );
            println!(
                "  scores: relevancy {} / legal {} / page {} / case {}",
                session.scores.relevancy,
                session.scores.legal_weight,
                session.scores.page_severity,
                session.scores.case_severity
            );
        }
        Err(e) => {
            use lexia_core::ErrorMetadata;
            eprintln!("Resolve failed [{}]: {}", e.error_code(), e.client_message());
            std::process::exit(1);
        }
    }

    Ok(())
}
